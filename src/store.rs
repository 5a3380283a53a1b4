use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::api::RemoteStore;
use crate::error::Result;
use crate::favorites::SavedArticles;
use crate::model::{Article, ArticleFields, ArticleId, Category, Profile};
use crate::snapshot::LocalFallbackStore;

/// Where a favorites write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    Remote,
    Fallback,
    Unchanged,
}

/// Issues article ids from the wall clock in milliseconds, bumped past the
/// last id handed out so sequential creates never collide.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> ArticleId {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        ArticleId::from(now.max(prev + 1))
    }
}

/// The backend as the rest of the application sees it: listings degrade to
/// empty results, favorites fall back to the local snapshot, and single
/// resource reads and writes propagate their errors.
pub struct ResilientStore {
    remote: Arc<dyn RemoteStore>,
    local: Arc<dyn LocalFallbackStore>,
    ids: IdGenerator,
}

impl ResilientStore {
    pub fn new(remote: Arc<dyn RemoteStore>, local: Arc<dyn LocalFallbackStore>) -> Self {
        Self {
            remote,
            local,
            ids: IdGenerator::new(),
        }
    }

    pub async fn list_articles(&self) -> Vec<Article> {
        match self.remote.list_articles().await {
            Ok(articles) => articles,
            Err(e) => {
                error!("Error fetching articles: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get_article(&self, id: &ArticleId) -> Result<Article> {
        self.remote.get_article(id).await.map_err(|e| {
            error!("Error fetching article {}: {}", id, e);
            e
        })
    }

    pub async fn create_article(&self, fields: ArticleFields) -> Result<Article> {
        let article = fields.into_article(self.ids.next(), Utc::now());
        let created = self.remote.create_article(&article).await.map_err(|e| {
            error!("Error creating article: {}", e);
            e
        })?;
        info!("Created article {}", created.id);
        Ok(created)
    }

    pub async fn update_article(&self, id: &ArticleId, fields: ArticleFields) -> Result<Article> {
        let published_at = fields.published_at.unwrap_or_else(Utc::now);
        let article = fields.into_article(id.clone(), published_at);
        let updated = self.remote.update_article(id, &article).await.map_err(|e| {
            error!("Error updating article {}: {}", id, e);
            e
        })?;
        info!("Updated article {}", id);
        Ok(updated)
    }

    pub async fn list_categories(&self) -> Vec<Category> {
        match self.remote.list_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                error!("Error fetching categories: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn list_saved(&self) -> Vec<Article> {
        match self.remote.list_saved().await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Error fetching saved articles, using local snapshot: {}", e);
                match self.local.load().await {
                    Ok(saved) => saved,
                    Err(e) => {
                        error!("Local snapshot unreadable: {}", e);
                        Vec::new()
                    }
                }
            }
        }
    }

    pub async fn save_article(&self, article: &Article) -> Result<Stored> {
        let saved = self.list_saved().await;
        if saved.iter().any(|a| a.id == article.id) {
            return Ok(Stored::Unchanged);
        }

        match self.remote.add_saved(article).await {
            Ok(()) => Ok(Stored::Remote),
            Err(e) => {
                warn!("Error saving article {}, writing local snapshot: {}", article.id, e);
                let mut local = self.load_local_for_write().await;
                if !local.iter().any(|a| a.id == article.id) {
                    local.push(article.clone());
                    self.local.store(&local).await?;
                }
                Ok(Stored::Fallback)
            }
        }
    }

    pub async fn remove_saved(&self, id: &ArticleId) -> Result<Stored> {
        match self.remote.remove_saved(id).await {
            Ok(()) => Ok(Stored::Remote),
            Err(e) => {
                warn!("Error removing article {}, writing local snapshot: {}", id, e);
                let mut local = self.load_local_for_write().await;
                local.retain(|a| &a.id != id);
                self.local.store(&local).await?;
                Ok(Stored::Fallback)
            }
        }
    }

    pub async fn get_profile(&self) -> Profile {
        self.fetch_profile().await.unwrap_or_default()
    }

    /// Strict read for callers that write the profile back: a failure here
    /// must not turn into an empty profile.
    pub async fn fetch_profile(&self) -> Result<Profile> {
        self.remote.get_profile().await.map_err(|e| {
            error!("Error fetching profile: {}", e);
            e
        })
    }

    pub async fn update_profile(&self, profile: &Profile) -> Result<Profile> {
        self.remote.update_profile(profile).await.map_err(|e| {
            error!("Error updating profile: {}", e);
            e
        })
    }

    // An unreadable snapshot is overwritten by the next fallback write.
    async fn load_local_for_write(&self) -> Vec<Article> {
        self.local.load().await.unwrap_or_else(|e| {
            warn!("Discarding unreadable local snapshot: {}", e);
            Vec::new()
        })
    }
}

#[async_trait]
impl SavedArticles for ResilientStore {
    async fn list_saved(&self) -> Result<Vec<Article>> {
        Ok(ResilientStore::list_saved(self).await)
    }

    async fn save_article(&self, article: &Article) -> Result<Stored> {
        ResilientStore::save_article(self, article).await
    }

    async fn remove_saved(&self, id: &ArticleId) -> Result<Stored> {
        ResilientStore::remove_saved(self, id).await
    }
}
