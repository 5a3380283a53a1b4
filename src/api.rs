use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::model::{Article, ArticleId, Category, Profile};

/// Strict transport over the backend's REST collections. Every failure is
/// returned to the caller; degrade and fallback policies live in
/// [`crate::store::ResilientStore`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_articles(&self) -> Result<Vec<Article>>;
    async fn get_article(&self, id: &ArticleId) -> Result<Article>;
    async fn create_article(&self, article: &Article) -> Result<Article>;
    async fn update_article(&self, id: &ArticleId, article: &Article) -> Result<Article>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn list_saved(&self) -> Result<Vec<Article>>;
    async fn add_saved(&self, article: &Article) -> Result<()>;
    async fn remove_saved(&self, id: &ArticleId) -> Result<()>;
    async fn get_profile(&self) -> Result<Profile>;
    async fn update_profile(&self, profile: &Profile) -> Result<Profile>;
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Newsdesk/1.0")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Path of one record in a collection. Ids that cannot be kept to a
    /// single path segment never reach the backend.
    fn item_path(collection: &str, id: &ArticleId) -> Result<String> {
        match id.path_segment() {
            Some(segment) => Ok(format!("/{}/{}", collection, segment)),
            None => Err(StoreError::not_found(format!("/{}/{}", collection, id))),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        Ok(Self::check(response, path)?.json().await?)
    }

    async fn send_json<B, T>(&self, method: reqwest::Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("{} {}", method, path);
        let response = self
            .client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response, path)?.json().await?)
    }

    fn check(response: Response, path: &str) -> Result<Response> {
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(path));
        }
        Ok(response.error_for_status()?)
    }
}

#[async_trait]
impl RemoteStore for ApiClient {
    async fn list_articles(&self) -> Result<Vec<Article>> {
        self.get_json("/articles").await
    }

    async fn get_article(&self, id: &ArticleId) -> Result<Article> {
        self.get_json(&Self::item_path("articles", id)?).await
    }

    async fn create_article(&self, article: &Article) -> Result<Article> {
        self.send_json(reqwest::Method::POST, "/articles", article)
            .await
    }

    async fn update_article(&self, id: &ArticleId, article: &Article) -> Result<Article> {
        let path = Self::item_path("articles", id)?;
        self.send_json(reqwest::Method::PUT, &path, article).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.get_json("/categories").await
    }

    async fn list_saved(&self) -> Result<Vec<Article>> {
        self.get_json("/savedArticles").await
    }

    async fn add_saved(&self, article: &Article) -> Result<()> {
        debug!("POST /savedArticles ({})", article.id);
        let response = self
            .client
            .post(self.url("/savedArticles"))
            .json(article)
            .send()
            .await?;
        Self::check(response, "/savedArticles")?;
        Ok(())
    }

    async fn remove_saved(&self, id: &ArticleId) -> Result<()> {
        let path = Self::item_path("savedArticles", id)?;
        debug!("DELETE {}", path);
        let response = self.client.delete(self.url(&path)).send().await?;
        Self::check(response, &path)?;
        Ok(())
    }

    async fn get_profile(&self) -> Result<Profile> {
        self.get_json("/profile").await
    }

    async fn update_profile(&self, profile: &Profile) -> Result<Profile> {
        self.send_json(reqwest::Method::PUT, "/profile", profile)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{any, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn article_json(id: serde_json::Value, title: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": title,
            "description": "A description that is long enough to pass the form checks easily.",
            "category": "technology",
            "source": "Wire",
            "urlToImage": null,
            "publishedAt": "2024-03-01T12:00:00Z"
        })
    }

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri()).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:3001/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert_eq!(client.url("/articles"), "http://localhost:3001/articles");
    }

    mod article_tests {
        use super::*;

        #[tokio::test]
        async fn test_list_articles() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/articles"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                    article_json(json!("1"), "First story"),
                    article_json(json!(2), "Second story"),
                ])))
                .mount(&server)
                .await;

            let articles = client_for(&server).await.list_articles().await.unwrap();
            assert_eq!(articles.len(), 2);
            assert_eq!(articles[1].id, ArticleId::from(2));
        }

        #[tokio::test]
        async fn test_get_article_not_found() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/articles/999"))
                .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
                .mount(&server)
                .await;

            let err = client_for(&server)
                .await
                .get_article(&ArticleId::from("999"))
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }

        #[tokio::test]
        async fn test_server_error_is_transport() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/articles/1"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let err = client_for(&server)
                .await
                .get_article(&ArticleId::from("1"))
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::Transport(_)));
        }

        #[tokio::test]
        async fn test_undecodable_body_is_transport() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/articles"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
                .mount(&server)
                .await;

            let err = client_for(&server).await.list_articles().await.unwrap_err();
            assert!(matches!(err, StoreError::Transport(_)));
        }

        #[tokio::test]
        async fn test_create_posts_full_record() {
            let server = MockServer::start().await;
            let body = article_json(json!(1700000000000u64), "Created story");
            Mock::given(method("POST"))
                .and(path("/articles"))
                .and(body_partial_json(json!({"id": 1700000000000u64, "title": "Created story"})))
                .respond_with(ResponseTemplate::new(201).set_body_json(body.clone()))
                .expect(1)
                .mount(&server)
                .await;

            let article: Article = serde_json::from_value(body).unwrap();
            let created = client_for(&server)
                .await
                .create_article(&article)
                .await
                .unwrap();
            assert_eq!(created, article);
        }

        #[tokio::test]
        async fn test_update_puts_to_resource() {
            let server = MockServer::start().await;
            let body = article_json(json!("5"), "New Title for five");
            Mock::given(method("PUT"))
                .and(path("/articles/5"))
                .and(body_partial_json(json!({"title": "New Title for five"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
                .expect(1)
                .mount(&server)
                .await;

            let article: Article = serde_json::from_value(body).unwrap();
            let updated = client_for(&server)
                .await
                .update_article(&ArticleId::from("5"), &article)
                .await
                .unwrap();
            assert_eq!(updated.title, "New Title for five");
        }
    }

    mod saved_tests {
        use super::*;

        #[tokio::test]
        async fn test_add_and_remove_saved() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/savedArticles"))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("DELETE"))
                .and(path("/savedArticles/3"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
                .expect(1)
                .mount(&server)
                .await;

            let client = client_for(&server).await;
            let article: Article =
                serde_json::from_value(article_json(json!(3), "Saved story")).unwrap();
            client.add_saved(&article).await.unwrap();
            client.remove_saved(&article.id).await.unwrap();
        }

        #[tokio::test]
        async fn test_remove_missing_saved_is_not_found() {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .and(path("/savedArticles/8"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let err = client_for(&server)
                .await
                .remove_saved(&ArticleId::from(8))
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }

        #[tokio::test]
        async fn test_remove_saved_encodes_id_as_one_segment() {
            let server = MockServer::start().await;
            Mock::given(method("DELETE"))
                .and(path("/articles/5"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
                .expect(0)
                .mount(&server)
                .await;
            Mock::given(method("DELETE"))
                .and(path("/savedArticles/..%2Farticles%2F5"))
                .respond_with(ResponseTemplate::new(404))
                .expect(1)
                .mount(&server)
                .await;

            let err = client_for(&server)
                .await
                .remove_saved(&ArticleId::from("../articles/5"))
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }

        #[tokio::test]
        async fn test_dot_segment_ids_never_sent() {
            let server = MockServer::start().await;
            Mock::given(any())
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
                .expect(0)
                .mount(&server)
                .await;

            let client = client_for(&server).await;
            assert!(client
                .remove_saved(&ArticleId::from(".."))
                .await
                .unwrap_err()
                .is_not_found());
            assert!(client
                .get_article(&ArticleId::from("."))
                .await
                .unwrap_err()
                .is_not_found());
        }

        #[tokio::test]
        async fn test_connection_refused_is_transport() {
            let client = ApiClient::new("http://127.0.0.1:1").unwrap();
            let err = client.list_saved().await.unwrap_err();
            assert!(matches!(err, StoreError::Transport(_)));
        }
    }

    mod profile_tests {
        use super::*;

        #[tokio::test]
        async fn test_get_and_update_profile() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/profile"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"name": "Ada", "skills": ["Rust"]})),
                )
                .mount(&server)
                .await;
            Mock::given(method("PUT"))
                .and(path("/profile"))
                .and(body_partial_json(json!({"name": "Grace"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Grace"})))
                .expect(1)
                .mount(&server)
                .await;

            let client = client_for(&server).await;
            let mut profile = client.get_profile().await.unwrap();
            assert_eq!(profile.name, "Ada");
            assert_eq!(profile.skills, vec!["Rust".to_string()]);

            profile.name = "Grace".to_string();
            let updated = client.update_profile(&profile).await.unwrap();
            assert_eq!(updated.name, "Grace");
        }

        #[tokio::test]
        async fn test_list_categories() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/categories"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!(["sports", {"name": "health"}])))
                .mount(&server)
                .await;

            let categories = client_for(&server).await.list_categories().await.unwrap();
            assert_eq!(categories.len(), 2);
            assert_eq!(categories[1].0, "health");
        }
    }
}
