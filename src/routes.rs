use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::error::StoreError;
use crate::favorites::Favorites;
use crate::filter;
use crate::model::{Article, ArticleId, Profile};
use crate::store::ResilientStore;
use crate::validate::{parse_skills, ArticleForm, ValidationError, DEFAULT_CATEGORY};

pub struct AppState {
    pub store: Arc<ResilientStore>,
    pub favorites: Arc<Favorites>,
    pub categories: Vec<String>,
}

impl AppState {
    fn card(&self, article: &Article) -> ArticleCard {
        ArticleCard {
            favorite: self.favorites.is_favorite(&article.id),
            published: article.published_at.format("%B %e, %Y").to_string(),
            article: article.clone(),
        }
    }

    fn cards<'a>(&self, articles: impl IntoIterator<Item = &'a Article>) -> Vec<ArticleCard> {
        articles.into_iter().map(|a| self.card(a)).collect()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/category/:category", get(category))
        .route("/search", get(search))
        .route("/article/:id", get(article_detail))
        .route("/create", get(create_form).post(create_submit))
        .route("/edit/:id", get(edit_form).post(edit_submit))
        .route("/favorites", get(favorites))
        .route("/favorites/:id", post(favorite_add))
        .route("/favorites/:id/remove", post(favorite_remove))
        .route("/profile", get(profile).post(profile_submit))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ArticleCard {
    pub article: Article,
    pub favorite: bool,
    pub published: String,
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub categories: Vec<String>,
    pub featured: Option<ArticleCard>,
    pub cards: Vec<ArticleCard>,
}

#[derive(Template)]
#[template(path = "list.html")]
pub struct ListTemplate {
    pub categories: Vec<String>,
    pub heading: String,
    pub subheading: String,
    pub empty_message: String,
    pub cards: Vec<ArticleCard>,
}

#[derive(Template)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub categories: Vec<String>,
    pub query: String,
    pub cards: Vec<ArticleCard>,
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub categories: Vec<String>,
    pub card: ArticleCard,
}

#[derive(Template)]
#[template(path = "article_form.html")]
pub struct ArticleFormTemplate {
    pub categories: Vec<String>,
    pub heading: &'static str,
    pub submit_label: &'static str,
    pub action: String,
    pub form: ArticleForm,
    pub errors: ValidationError,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub categories: Vec<String>,
    pub profile: Profile,
    pub skills: String,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub categories: Vec<String>,
    pub message: String,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<StoreError>() {
            Some(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, format!("Error: {}", self.0)).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

/// Redirect target for an article page. Ids arrive decoded from the request
/// path, so they are re-encoded before going into a `Location` header.
fn article_location(id: &ArticleId) -> String {
    format!("/article/{}", id.path_segment().unwrap_or_default())
}

fn not_found(state: &AppState, id: &ArticleId) -> Response {
    (
        StatusCode::NOT_FOUND,
        HtmlTemplate(NotFoundTemplate {
            categories: state.categories.clone(),
            message: format!("No article with id {} exists.", id),
        }),
    )
        .into_response()
}

// Route handlers
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let articles = state.store.list_articles().await;
    let mut cards = state.cards(&articles).into_iter();
    let featured = cards.next();

    HtmlTemplate(IndexTemplate {
        categories: state.categories.clone(),
        featured,
        cards: cards.collect(),
    })
}

pub async fn category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> impl IntoResponse {
    let articles = state.store.list_articles().await;
    let cards = state.cards(filter::by_category(&articles, &category));

    HtmlTemplate(ListTemplate {
        categories: state.categories.clone(),
        subheading: format!("Latest news and updates in {}", category),
        heading: category,
        empty_message: "No articles found in this category yet.".to_string(),
        cards,
    })
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let cards = if query.q.trim().is_empty() {
        Vec::new()
    } else {
        let articles = state.store.list_articles().await;
        state.cards(filter::search(&articles, &query.q))
    };

    HtmlTemplate(SearchTemplate {
        categories: state.categories.clone(),
        query: query.q,
        cards,
    })
}

pub async fn article_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = ArticleId::from(id);
    match state.store.get_article(&id).await {
        Ok(article) => Ok(HtmlTemplate(ArticleTemplate {
            categories: state.categories.clone(),
            card: state.card(&article),
        })
        .into_response()),
        Err(e) if e.is_not_found() => Ok(not_found(&state, &id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn create_form(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    HtmlTemplate(ArticleFormTemplate {
        categories: state.categories.clone(),
        heading: "Create News Article",
        submit_label: "Publish Article",
        action: "/create".to_string(),
        form: ArticleForm {
            category: DEFAULT_CATEGORY.to_string(),
            ..Default::default()
        },
        errors: ValidationError::default(),
    })
}

pub async fn create_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ArticleForm>,
) -> Result<Response, AppError> {
    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                HtmlTemplate(ArticleFormTemplate {
                    categories: state.categories.clone(),
                    heading: "Create News Article",
                    submit_label: "Publish Article",
                    action: "/create".to_string(),
                    form,
                    errors,
                }),
            )
                .into_response())
        }
    };

    state.store.create_article(fields).await?;
    Ok(Redirect::to("/").into_response())
}

pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = ArticleId::from(id);
    let article = match state.store.get_article(&id).await {
        Ok(article) => article,
        Err(e) if e.is_not_found() => return Ok(not_found(&state, &id)),
        Err(e) => return Err(e.into()),
    };

    Ok(HtmlTemplate(ArticleFormTemplate {
        categories: state.categories.clone(),
        heading: "Edit News Article",
        submit_label: "Update Article",
        action: format!("/edit/{}", id.path_segment().unwrap_or_default()),
        form: ArticleForm::from(&article),
        errors: ValidationError::default(),
    })
    .into_response())
}

pub async fn edit_submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<ArticleForm>,
) -> Result<Response, AppError> {
    let id = ArticleId::from(id);
    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                HtmlTemplate(ArticleFormTemplate {
                    categories: state.categories.clone(),
                    heading: "Edit News Article",
                    submit_label: "Update Article",
                    action: format!("/edit/{}", id.path_segment().unwrap_or_default()),
                    form,
                    errors,
                }),
            )
                .into_response())
        }
    };

    state.store.update_article(&id, fields).await?;
    Ok(Redirect::to(&article_location(&id)).into_response())
}

pub async fn favorites(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let saved = state.favorites.articles();
    let count = saved.len();

    HtmlTemplate(ListTemplate {
        categories: state.categories.clone(),
        heading: "Your Favorites".to_string(),
        subheading: format!(
            "{} saved {}",
            count,
            if count == 1 { "article" } else { "articles" }
        ),
        empty_message: "No saved articles yet".to_string(),
        cards: state.cards(&saved),
    })
}

pub async fn favorite_add(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = ArticleId::from(id);
    let article = match state.store.get_article(&id).await {
        Ok(article) => article,
        Err(e) if e.is_not_found() => return Ok(not_found(&state, &id)),
        Err(e) => return Err(e.into()),
    };

    state.favorites.add(article).await;
    Ok(Redirect::to(&article_location(&id)).into_response())
}

pub async fn favorite_remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.favorites.remove(&ArticleId::from(id)).await;
    Redirect::to("/favorites")
}

pub async fn profile(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let profile = state.store.get_profile().await;

    HtmlTemplate(ProfileTemplate {
        categories: state.categories.clone(),
        skills: profile.skills.join(", "),
        profile,
    })
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub skills: String,
}

pub async fn profile_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ProfileForm>,
) -> Result<impl IntoResponse, AppError> {
    // Experience is not editable here; keep whatever the backend has.
    let mut profile = state.store.fetch_profile().await?;
    profile.name = form.name;
    profile.title = form.title;
    profile.summary = form.summary;
    profile.skills = parse_skills(&form.skills);

    state.store.update_profile(&profile).await?;
    Ok(Redirect::to("/profile"))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
