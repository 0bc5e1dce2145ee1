//! Test harness for feed service tests.

use crate::FeedService;
use async_trait::async_trait;
use auth_session::{AuthRuntime, ProvisioningConfig};
use chrono::{Duration as ChronoDuration, Utc};
use feed_config::FeedSettings;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use supabase_gateway::{
    AuthChange, AuthResponse, Comment, FeedBackend, GatewayError, GatewayResult, Identity,
    IdentityProvider, NewComment, NewPost, NewProfile, Post, PostUpdate, Profile, ProfileStore,
    Session,
};
use tokio::sync::broadcast;

pub const USER_ID: &str = "user-1";
pub const TOKEN: &str = "access-user-1";

fn unsupported() -> GatewayError {
    GatewayError::UnexpectedResponse("not used in feed tests".to_string())
}

/// Identity provider that never has a session of its own.
pub struct NoIdentity {
    events: broadcast::Sender<AuthChange>,
}

impl NoIdentity {
    fn new() -> Self {
        let (events, _) = broadcast::channel(4);
        Self { events }
    }
}

#[async_trait]
impl IdentityProvider for NoIdentity {
    async fn get_session(&self) -> GatewayResult<Option<Session>> {
        Ok(None)
    }

    async fn sign_in_with_password(&self, _: &str, _: &str) -> GatewayResult<AuthResponse> {
        Err(unsupported())
    }

    async fn sign_up(
        &self,
        _: &str,
        _: &str,
        _: serde_json::Value,
    ) -> GatewayResult<AuthResponse> {
        Err(unsupported())
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

pub struct NoProfiles;

#[async_trait]
impl ProfileStore for NoProfiles {
    async fn select_by_id(&self, _: &str, _: Option<&str>) -> GatewayResult<Option<Profile>> {
        Ok(None)
    }

    async fn insert(&self, _: &NewProfile, _: Option<&str>) -> GatewayResult<Profile> {
        Err(unsupported())
    }
}

/// One backend call, as seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListPosts { page: u32, limit: u32 },
    GetPost(String),
    ListComments(String),
    CreatePost { author_id: String, token: String },
    UpdatePost(String),
    DeletePost(String),
    CreateComment { author_id: String, post_id: String },
    DeleteComment(String),
}

fn post(id: &str, author_id: &str, title: &str) -> Post {
    let now = Utc::now();
    Post {
        id: id.to_string(),
        title: title.to_string(),
        content: format!("{} content", title),
        image_url: None,
        author_id: author_id.to_string(),
        author_username: Some("alice".to_string()),
        author_avatar_url: None,
        created_at: now,
        updated_at: now,
        comments_count: 0,
    }
}

/// Feed backend that records every call.
#[derive(Default)]
pub struct RecordingBackend {
    posts: Mutex<HashMap<String, Post>>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingBackend {
    pub fn with_post(self, id: &str) -> Self {
        self.posts
            .lock()
            .unwrap()
            .insert(id.to_string(), post(id, "someone", id));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl FeedBackend for RecordingBackend {
    async fn list_posts(
        &self,
        page: u32,
        limit: u32,
        _access_token: Option<&str>,
    ) -> GatewayResult<Vec<Post>> {
        self.record(Call::ListPosts { page, limit });
        Ok(self.posts.lock().unwrap().values().cloned().collect())
    }

    async fn get_post(&self, id: &str, _access_token: Option<&str>) -> GatewayResult<Option<Post>> {
        self.record(Call::GetPost(id.to_string()));
        Ok(self.posts.lock().unwrap().get(id).cloned())
    }

    async fn create_post(
        &self,
        author_id: &str,
        new_post: &NewPost,
        access_token: &str,
    ) -> GatewayResult<Post> {
        self.record(Call::CreatePost {
            author_id: author_id.to_string(),
            token: access_token.to_string(),
        });
        let id = format!("post-{}", self.posts.lock().unwrap().len() + 1);
        let created = post(&id, author_id, &new_post.title);
        self.posts.lock().unwrap().insert(id, created.clone());
        Ok(created)
    }

    async fn update_post(
        &self,
        id: &str,
        update: &PostUpdate,
        _access_token: &str,
    ) -> GatewayResult<Post> {
        self.record(Call::UpdatePost(id.to_string()));
        let mut posts = self.posts.lock().unwrap();
        let existing = posts.get_mut(id).ok_or_else(|| GatewayError::Rejected {
            status: 404,
            message: "not found".to_string(),
        })?;
        if let Some(title) = &update.title {
            existing.title = title.clone();
        }
        Ok(existing.clone())
    }

    async fn delete_post(&self, id: &str, _access_token: &str) -> GatewayResult<()> {
        self.record(Call::DeletePost(id.to_string()));
        self.posts.lock().unwrap().remove(id);
        Ok(())
    }

    async fn list_comments(
        &self,
        post_id: &str,
        _access_token: Option<&str>,
    ) -> GatewayResult<Vec<Comment>> {
        self.record(Call::ListComments(post_id.to_string()));
        Ok(Vec::new())
    }

    async fn create_comment(
        &self,
        author_id: &str,
        comment: &NewComment,
        _access_token: &str,
    ) -> GatewayResult<Comment> {
        self.record(Call::CreateComment {
            author_id: author_id.to_string(),
            post_id: comment.post_id.clone(),
        });
        let now = Utc::now();
        Ok(Comment {
            id: "comment-1".to_string(),
            content: comment.content.clone(),
            post_id: comment.post_id.clone(),
            author_id: author_id.to_string(),
            author_username: Some("alice".to_string()),
            author_avatar_url: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn delete_comment(&self, id: &str, _access_token: &str) -> GatewayResult<()> {
        self.record(Call::DeleteComment(id.to_string()));
        Ok(())
    }
}

pub struct TestHarness {
    pub backend: Arc<RecordingBackend>,
    pub auth: AuthRuntime,
    pub service: FeedService,
}

impl TestHarness {
    pub fn new(backend: RecordingBackend) -> Self {
        let backend = Arc::new(backend);
        let auth = AuthRuntime::new(
            Arc::new(NoIdentity::new()),
            Arc::new(NoProfiles),
            ProvisioningConfig::default(),
        );
        let settings = FeedSettings {
            page_size: 10,
            cache_ttl_secs: 60,
        };
        let service = FeedService::new(backend.clone(), auth.clone(), &settings);
        Self {
            backend,
            auth,
            service,
        }
    }

    pub async fn sign_in(&self) {
        let identity = Identity {
            id: USER_ID.to_string(),
            email: Some("a@b.com".to_string()),
        };
        let profile = Profile {
            id: USER_ID.to_string(),
            email: "a@b.com".to_string(),
            username: "alice".to_string(),
            avatar_url: None,
            created_at: Utc::now(),
        };
        let session = Session {
            access_token: TOKEN.to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + ChronoDuration::hours(1),
            user: identity,
        };
        self.auth.set_auth(Some(profile), Some(session)).await;
    }
}
