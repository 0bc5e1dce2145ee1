//! Posts and comments, served through the query cache.
//!
//! Reads are cached per [`QueryKey`]. Mutations need a signed-in user and
//! drop the cached queries they make stale:
//!
//! | mutation         | invalidated                          |
//! |------------------|--------------------------------------|
//! | `create_post`    | every feed page                      |
//! | `update_post`    | the post, every feed page            |
//! | `delete_post`    | the post, its comments, every page   |
//! | `create_comment` | the post's comments, the post        |
//! | `delete_comment` | the post's comments, the post        |
//!
//! The cache belongs to one signed-in user; it is dropped whenever a query
//! runs under a different user than the one it was filled for.

use crate::cache::{CachedQuery, QueryCache, QueryKey};
use crate::{FeedError, FeedResult};
use auth_session::AuthRuntime;
use feed_config::FeedSettings;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use supabase_gateway::{Comment, FeedBackend, NewComment, NewPost, Post, PostUpdate};
use tokio::time::Instant;
use tracing::debug;

pub struct FeedService {
    backend: Arc<dyn FeedBackend>,
    auth: AuthRuntime,
    page_size: u32,
    cache: Mutex<QueryCache>,
    /// User the cached queries were made as.
    cache_owner: Mutex<Option<String>>,
}

/// Author id and bearer token of the signed-in user.
struct Credentials {
    user_id: String,
    access_token: String,
}

impl FeedService {
    pub fn new(backend: Arc<dyn FeedBackend>, auth: AuthRuntime, settings: &FeedSettings) -> Self {
        Self {
            backend,
            auth,
            page_size: settings.page_size.max(1),
            cache: Mutex::new(QueryCache::new(Duration::from_secs(settings.cache_ttl_secs))),
            cache_owner: Mutex::new(None),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn cached(&self, key: &QueryKey) -> Option<CachedQuery> {
        self.clear_if_user_changed();
        let hit = self.cache.lock().get(key, Instant::now());
        if hit.is_some() {
            debug!(key = ?key, "Query cache hit");
        }
        hit
    }

    fn store(&self, key: QueryKey, value: CachedQuery) {
        self.cache.lock().insert(key, value, Instant::now());
    }

    fn invalidate(&self, keys: &[QueryKey], posts_pages: bool) {
        let mut cache = self.cache.lock();
        for key in keys {
            cache.invalidate(key);
        }
        if posts_pages {
            cache.invalidate_posts_pages();
        }
        debug!(keys = ?keys, posts_pages, "Invalidated cached queries");
    }

    /// Drop every cached query.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    fn clear_if_user_changed(&self) {
        let current = self.auth.state().user.map(|user| user.id);
        let mut owner = self.cache_owner.lock();
        if *owner != current {
            debug!(from = ?*owner, to = ?current, "Signed-in user changed, clearing query cache");
            self.clear_cache();
            *owner = current;
        }
    }

    fn credentials(&self) -> FeedResult<Credentials> {
        let state = self.auth.state();
        match (state.user, state.session) {
            (Some(user), Some(session)) => Ok(Credentials {
                user_id: user.id,
                access_token: session.access_token,
            }),
            _ => Err(FeedError::NotSignedIn),
        }
    }

    /// One zero-based page of posts, newest first.
    pub async fn list_posts(&self, page: u32) -> FeedResult<Vec<Post>> {
        let key = QueryKey::Posts { page };
        if let Some(CachedQuery::Posts(posts)) = self.cached(&key) {
            return Ok(posts);
        }

        let token = self.auth.access_token();
        let posts = self
            .backend
            .list_posts(page, self.page_size, token.as_deref())
            .await?;
        self.store(key, CachedQuery::Posts(posts.clone()));
        Ok(posts)
    }

    pub async fn get_post(&self, id: &str) -> FeedResult<Post> {
        let key = QueryKey::Post(id.to_string());
        if let Some(CachedQuery::Post(post)) = self.cached(&key) {
            return Ok(post);
        }

        let token = self.auth.access_token();
        let post = self
            .backend
            .get_post(id, token.as_deref())
            .await?
            .ok_or_else(|| FeedError::PostNotFound(id.to_string()))?;
        self.store(key, CachedQuery::Post(post.clone()));
        Ok(post)
    }

    /// Comments of a post, oldest first.
    pub async fn list_comments(&self, post_id: &str) -> FeedResult<Vec<Comment>> {
        let key = QueryKey::Comments(post_id.to_string());
        if let Some(CachedQuery::Comments(comments)) = self.cached(&key) {
            return Ok(comments);
        }

        let token = self.auth.access_token();
        let comments = self
            .backend
            .list_comments(post_id, token.as_deref())
            .await?;
        self.store(key, CachedQuery::Comments(comments.clone()));
        Ok(comments)
    }

    pub async fn create_post(&self, post: NewPost) -> FeedResult<Post> {
        let credentials = self.credentials()?;
        let created = self
            .backend
            .create_post(&credentials.user_id, &post, &credentials.access_token)
            .await?;
        self.invalidate(&[], true);
        Ok(created)
    }

    pub async fn update_post(&self, id: &str, update: PostUpdate) -> FeedResult<Post> {
        if update.is_empty() {
            return Err(FeedError::EmptyUpdate);
        }
        let credentials = self.credentials()?;
        let updated = self
            .backend
            .update_post(id, &update, &credentials.access_token)
            .await?;
        self.invalidate(&[QueryKey::Post(id.to_string())], true);
        Ok(updated)
    }

    pub async fn delete_post(&self, id: &str) -> FeedResult<()> {
        let credentials = self.credentials()?;
        self.backend
            .delete_post(id, &credentials.access_token)
            .await?;
        self.invalidate(
            &[
                QueryKey::Post(id.to_string()),
                QueryKey::Comments(id.to_string()),
            ],
            true,
        );
        Ok(())
    }

    pub async fn create_comment(&self, comment: NewComment) -> FeedResult<Comment> {
        let credentials = self.credentials()?;
        let created = self
            .backend
            .create_comment(&credentials.user_id, &comment, &credentials.access_token)
            .await?;
        self.invalidate(
            &[
                QueryKey::Comments(comment.post_id.clone()),
                QueryKey::Post(comment.post_id),
            ],
            false,
        );
        Ok(created)
    }

    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> FeedResult<()> {
        let credentials = self.credentials()?;
        self.backend
            .delete_comment(comment_id, &credentials.access_token)
            .await?;
        self.invalidate(
            &[
                QueryKey::Comments(post_id.to_string()),
                QueryKey::Post(post_id.to_string()),
            ],
            false,
        );
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self, key: &QueryKey) -> bool {
        self.cache.lock().contains(key)
    }
}
