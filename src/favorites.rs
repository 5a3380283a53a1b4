use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::model::{Article, ArticleId};
use crate::store::Stored;

/// Storage the favorites cache is kept consistent with.
#[async_trait]
pub trait SavedArticles: Send + Sync {
    async fn list_saved(&self) -> Result<Vec<Article>>;
    async fn save_article(&self, article: &Article) -> Result<Stored>;
    async fn remove_saved(&self, id: &ArticleId) -> Result<Stored>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Loading,
    Ready,
}

/// User-facing outcome of a favorites change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Saved,
    Removed,
    SaveFailed,
    RemoveFailed,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::Saved => "Article saved to favorites!",
            Notice::Removed => "Article removed from favorites.",
            Notice::SaveFailed => "Failed to save article.",
            Notice::RemoveFailed => "Failed to remove article.",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Notice::SaveFailed | Notice::RemoveFailed)
    }
}

/// In-process view of the user's favorites.
///
/// The set only advances after the store call returns. When a call fails the
/// set is reloaded from [`SavedArticles::list_saved`], so it never disagrees
/// with what the store (remote or its local fallback) reports. Overlapping
/// add/remove calls are not serialized; the last response applied wins.
pub struct Favorites {
    store: Arc<dyn SavedArticles>,
    saved: RwLock<Vec<Article>>,
    state: RwLock<CacheState>,
    notices: broadcast::Sender<Notice>,
}

impl Favorites {
    pub fn new(store: Arc<dyn SavedArticles>) -> Self {
        let (notices, _) = broadcast::channel(64);
        Self {
            store,
            saved: RwLock::new(Vec::new()),
            state: RwLock::new(CacheState::Uninitialized),
            notices,
        }
    }

    pub fn state(&self) -> CacheState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub async fn initialize(&self) {
        self.set_state(CacheState::Loading);

        match self.store.list_saved().await {
            Ok(articles) => {
                info!("Loaded {} saved articles", articles.len());
                self.replace(articles);
            }
            Err(e) => error!("Failed to load saved articles: {}", e),
        }

        self.set_state(CacheState::Ready);
    }

    /// Runs [`Favorites::initialize`] in the background.
    pub fn spawn_initialize(self: &Arc<Self>) -> JoinHandle<()> {
        let favorites = Arc::clone(self);
        tokio::spawn(async move {
            favorites.initialize().await;
        })
    }

    pub fn is_favorite(&self, id: &ArticleId) -> bool {
        self.read().iter().any(|a| &a.id == id)
    }

    pub fn articles(&self) -> Vec<Article> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub async fn add(&self, article: Article) -> Notice {
        let notice = match self.store.save_article(&article).await {
            Ok(stored) => {
                if stored == Stored::Fallback {
                    warn!("Article {} saved to local snapshot only", article.id);
                }
                let mut saved = self.write();
                if !saved.iter().any(|a| a.id == article.id) {
                    saved.push(article);
                }
                Notice::Saved
            }
            Err(e) => {
                error!("Failed to save article {}: {}", article.id, e);
                self.reconcile().await;
                Notice::SaveFailed
            }
        };

        self.notify(notice);
        notice
    }

    pub async fn remove(&self, id: &ArticleId) -> Notice {
        let notice = match self.store.remove_saved(id).await {
            Ok(_) => {
                self.write().retain(|a| &a.id != id);
                Notice::Removed
            }
            Err(e) => {
                error!("Failed to remove article {}: {}", id, e);
                self.reconcile().await;
                Notice::RemoveFailed
            }
        };

        self.notify(notice);
        notice
    }

    async fn reconcile(&self) {
        match self.store.list_saved().await {
            Ok(articles) => self.replace(articles),
            Err(e) => warn!("Could not reconcile favorites: {}", e),
        }
    }

    fn replace(&self, articles: Vec<Article>) {
        let mut deduped: Vec<Article> = Vec::with_capacity(articles.len());
        for article in articles {
            if !deduped.iter().any(|a| a.id == article.id) {
                deduped.push(article);
            }
        }
        *self.write() = deduped;
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }

    fn set_state(&self, state: CacheState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Article>> {
        self.saved.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Article>> {
        self.saved.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Logs every favorites notice until the cache is dropped.
pub async fn log_notices(mut notices: broadcast::Receiver<Notice>) {
    loop {
        match notices.recv().await {
            Ok(notice) if notice.is_failure() => warn!("{}", notice.message()),
            Ok(notice) => info!("{}", notice.message()),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Dropped {} favorites notices", skipped)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
