//! Feed backend: the `posts` and `comments` tables.

use crate::error::{GatewayError, GatewayResult};
use crate::rest::{eq, SupabaseRestClient};
use crate::types::{Comment, NewComment, NewPost, Post, PostUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const POSTS_TABLE: &str = "posts";
const COMMENTS_TABLE: &str = "comments";

const POST_SELECT: &str = "*,profiles:author_id(username,avatar_url),comments_count:comments(count)";
const COMMENT_SELECT: &str = "*,profiles:author_id(username,avatar_url)";

/// Posts and comments CRUD.
///
/// Mutations take the caller's access token so row-level security sees the
/// author.
#[async_trait]
pub trait FeedBackend: Send + Sync {
    /// One page of posts, newest first. `page` is zero-based.
    async fn list_posts(
        &self,
        page: u32,
        limit: u32,
        access_token: Option<&str>,
    ) -> GatewayResult<Vec<Post>>;

    async fn get_post(&self, id: &str, access_token: Option<&str>) -> GatewayResult<Option<Post>>;

    async fn create_post(
        &self,
        author_id: &str,
        post: &NewPost,
        access_token: &str,
    ) -> GatewayResult<Post>;

    async fn update_post(
        &self,
        id: &str,
        update: &PostUpdate,
        access_token: &str,
    ) -> GatewayResult<Post>;

    async fn delete_post(&self, id: &str, access_token: &str) -> GatewayResult<()>;

    /// Comments of a post, oldest first.
    async fn list_comments(
        &self,
        post_id: &str,
        access_token: Option<&str>,
    ) -> GatewayResult<Vec<Comment>>;

    async fn create_comment(
        &self,
        author_id: &str,
        comment: &NewComment,
        access_token: &str,
    ) -> GatewayResult<Comment>;

    async fn delete_comment(&self, id: &str, access_token: &str) -> GatewayResult<()>;
}

#[derive(Debug, Default, Deserialize)]
struct AuthorEmbed {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountEmbed {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct PostRow {
    id: String,
    title: String,
    content: String,
    #[serde(default)]
    image_url: Option<String>,
    author_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    profiles: Option<AuthorEmbed>,
    #[serde(default)]
    comments_count: Vec<CountEmbed>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let author = row.profiles.unwrap_or_default();
        Post {
            id: row.id,
            title: row.title,
            content: row.content,
            image_url: row.image_url,
            author_id: row.author_id,
            author_username: author.username,
            author_avatar_url: author.avatar_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            comments_count: row.comments_count.first().map(|c| c.count).unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    id: String,
    content: String,
    post_id: String,
    author_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    profiles: Option<AuthorEmbed>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        let author = row.profiles.unwrap_or_default();
        Comment {
            id: row.id,
            content: row.content,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: author.username,
            author_avatar_url: author.avatar_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Serialize)]
struct PostInsert<'a> {
    author_id: &'a str,
    #[serde(flatten)]
    post: &'a NewPost,
}

#[derive(Serialize)]
struct CommentInsert<'a> {
    author_id: &'a str,
    #[serde(flatten)]
    comment: &'a NewComment,
}

/// PostgREST range for a zero-based page.
fn page_range(page: u32, limit: u32) -> (u64, u64) {
    let offset = u64::from(page) * u64::from(limit);
    (offset, u64::from(limit))
}

#[async_trait]
impl FeedBackend for SupabaseRestClient {
    async fn list_posts(
        &self,
        page: u32,
        limit: u32,
        access_token: Option<&str>,
    ) -> GatewayResult<Vec<Post>> {
        let (offset, limit) = page_range(page, limit);
        let params = vec![
            ("select", POST_SELECT.to_string()),
            ("order", "created_at.desc".to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<PostRow> = self.select_rows(POSTS_TABLE, &params, access_token).await?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn get_post(&self, id: &str, access_token: Option<&str>) -> GatewayResult<Option<Post>> {
        let params = vec![
            ("select", POST_SELECT.to_string()),
            ("id", eq(id)),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<PostRow> = self.select_rows(POSTS_TABLE, &params, access_token).await?;
        Ok(rows.into_iter().next().map(Post::from))
    }

    async fn create_post(
        &self,
        author_id: &str,
        post: &NewPost,
        access_token: &str,
    ) -> GatewayResult<Post> {
        let body = PostInsert { author_id, post };
        let params = vec![("select", POST_SELECT.to_string())];
        let row: PostRow = self
            .insert_row(POSTS_TABLE, &body, &params, Some(access_token))
            .await?;
        tracing::info!(post_id = %row.id, "Post created");
        Ok(row.into())
    }

    async fn update_post(
        &self,
        id: &str,
        update: &PostUpdate,
        access_token: &str,
    ) -> GatewayResult<Post> {
        let params = vec![("select", POST_SELECT.to_string()), ("id", eq(id))];
        let row: Option<PostRow> = self
            .update_rows(POSTS_TABLE, update, &params, Some(access_token))
            .await?;
        // RLS filters out rows the caller does not own, so nothing comes back.
        row.map(Post::from).ok_or_else(|| {
            GatewayError::UnexpectedResponse(format!("post {} was not updated", id))
        })
    }

    async fn delete_post(&self, id: &str, access_token: &str) -> GatewayResult<()> {
        let params = vec![("id", eq(id))];
        self.delete_rows(POSTS_TABLE, &params, Some(access_token)).await?;
        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    async fn list_comments(
        &self,
        post_id: &str,
        access_token: Option<&str>,
    ) -> GatewayResult<Vec<Comment>> {
        let params = vec![
            ("select", COMMENT_SELECT.to_string()),
            ("post_id", eq(post_id)),
            ("order", "created_at.asc".to_string()),
        ];
        let rows: Vec<CommentRow> = self.select_rows(COMMENTS_TABLE, &params, access_token).await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn create_comment(
        &self,
        author_id: &str,
        comment: &NewComment,
        access_token: &str,
    ) -> GatewayResult<Comment> {
        let body = CommentInsert { author_id, comment };
        let params = vec![("select", COMMENT_SELECT.to_string())];
        let row: CommentRow = self
            .insert_row(COMMENTS_TABLE, &body, &params, Some(access_token))
            .await?;
        tracing::info!(comment_id = %row.id, post_id = %row.post_id, "Comment created");
        Ok(row.into())
    }

    async fn delete_comment(&self, id: &str, access_token: &str) -> GatewayResult<()> {
        let params = vec![("id", eq(id))];
        self.delete_rows(COMMENTS_TABLE, &params, Some(access_token))
            .await?;
        tracing::info!(comment_id = %id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_row_flattens_embeds() {
        let row: PostRow = serde_json::from_str(
            r#"{
                "id": "p1",
                "title": "Hello",
                "content": "World",
                "image_url": null,
                "author_id": "u1",
                "created_at": "2024-05-01T12:00:00+00:00",
                "updated_at": "2024-05-01T12:00:00+00:00",
                "profiles": {"username": "alice", "avatar_url": null},
                "comments_count": [{"count": 3}]
            }"#,
        )
        .unwrap();

        let post = Post::from(row);
        assert_eq!(post.author_username.as_deref(), Some("alice"));
        assert_eq!(post.comments_count, 3);
    }

    #[test]
    fn test_post_row_without_embeds() {
        let row: PostRow = serde_json::from_str(
            r#"{
                "id": "p1",
                "title": "Hello",
                "content": "World",
                "author_id": "u1",
                "created_at": "2024-05-01T12:00:00Z",
                "updated_at": "2024-05-01T12:00:00Z",
                "profiles": null
            }"#,
        )
        .unwrap();

        let post = Post::from(row);
        assert!(post.author_username.is_none());
        assert_eq!(post.comments_count, 0);
    }

    #[test]
    fn test_comment_row_flattens_author() {
        let row: CommentRow = serde_json::from_str(
            r#"{
                "id": "c1",
                "content": "Nice",
                "post_id": "p1",
                "author_id": "u2",
                "created_at": "2024-05-01T12:00:00Z",
                "updated_at": "2024-05-01T12:00:00Z",
                "profiles": {"username": "bob", "avatar_url": "https://img/bob.png"}
            }"#,
        )
        .unwrap();

        let comment = Comment::from(row);
        assert_eq!(comment.author_username.as_deref(), Some("bob"));
        assert_eq!(
            comment.author_avatar_url.as_deref(),
            Some("https://img/bob.png")
        );
    }

    #[test]
    fn test_insert_bodies_carry_author() {
        let post = NewPost {
            title: "T".to_string(),
            content: "C".to_string(),
            image_url: None,
        };
        let body = serde_json::to_value(PostInsert {
            author_id: "u1",
            post: &post,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"author_id": "u1", "title": "T", "content": "C"})
        );

        let comment = NewComment {
            post_id: "p1".to_string(),
            content: "hi".to_string(),
        };
        let body = serde_json::to_value(CommentInsert {
            author_id: "u1",
            comment: &comment,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"author_id": "u1", "post_id": "p1", "content": "hi"})
        );
    }

    #[test]
    fn test_page_range() {
        assert_eq!(page_range(0, 10), (0, 10));
        assert_eq!(page_range(3, 10), (30, 10));
    }
}
