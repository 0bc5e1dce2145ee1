//! Post commands.

use super::required;
use crate::app::App;
use crate::output::{self, OutputFormat};
use serde::Serialize;
use std::fmt;
use supabase_gateway::{Comment, NewPost, Post, PostUpdate};

fn author(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or("unknown")
}

fn timestamp(post: &Post) -> String {
    post.created_at.format("%Y-%m-%d %H:%M").to_string()
}

/// One page of the feed.
#[derive(Debug, Serialize)]
struct FeedPage {
    page: u32,
    posts: Vec<Post>,
}

impl fmt::Display for FeedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", output::heading(&format!("Posts (page {})", self.page)))?;
        if self.posts.is_empty() {
            return write!(f, "\n  No posts yet.");
        }
        for post in &self.posts {
            write!(f, "\n\n  {}", post.title)?;
            write!(f, "\n{}", output::row("ID", &post.id))?;
            write!(f, "\n{}", output::row("Author", author(&post.author_username)))?;
            write!(f, "\n{}", output::row("Posted", &timestamp(post)))?;
            write!(f, "\n{}", output::row("Comments", &post.comments_count.to_string()))?;
        }
        Ok(())
    }
}

/// A post with its comments.
#[derive(Debug, Serialize)]
struct PostDetail {
    post: Post,
    comments: Vec<Comment>,
}

impl fmt::Display for PostDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let post = &self.post;
        writeln!(f, "{}", output::heading(&post.title))?;
        writeln!(f, "{}", output::row("ID", &post.id))?;
        writeln!(f, "{}", output::row("Author", author(&post.author_username)))?;
        writeln!(f, "{}", output::row("Posted", &timestamp(post)))?;
        if let Some(image_url) = &post.image_url {
            writeln!(f, "{}", output::row("Image", image_url))?;
        }
        write!(f, "\n{}\n", post.content)?;

        write!(f, "{}", output::heading(&format!("Comments ({})", self.comments.len())))?;
        for comment in &self.comments {
            write!(
                f,
                "\n  [{}] {} ({}): {}",
                comment.id,
                author(&comment.author_username),
                comment.created_at.format("%Y-%m-%d %H:%M"),
                comment.content
            )?;
        }
        Ok(())
    }
}

/// Print a page of the feed. `page` starts at 1.
pub async fn posts_list(app: &App, page: u32, format: &OutputFormat) -> anyhow::Result<()> {
    let posts = app.feed.list_posts(page.saturating_sub(1)).await?;
    output::print(&FeedPage { page, posts }, format);
    Ok(())
}

pub async fn posts_show(app: &App, id: &str, format: &OutputFormat) -> anyhow::Result<()> {
    let (post, comments) = tokio::join!(app.feed.get_post(id), app.feed.list_comments(id));
    let detail = PostDetail {
        post: post?,
        comments: comments?,
    };
    output::print(&detail, format);
    Ok(())
}

pub async fn posts_create(
    app: &App,
    title: String,
    content: String,
    image_url: Option<String>,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let post = NewPost {
        title: required("Title", &title)?,
        content: required("Content", &content)?,
        image_url: image_url.filter(|url| !url.trim().is_empty()),
    };

    let created = app.feed.create_post(post).await?;
    match format {
        OutputFormat::Text => {
            output::print_success(&format!("Post created: {}", created.id), format);
            Ok(())
        }
        OutputFormat::Json => output::print_json(&created),
    }
}

pub async fn posts_edit(
    app: &App,
    id: &str,
    update: PostUpdate,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let update = PostUpdate {
        title: update.title.map(|t| required("Title", &t)).transpose()?,
        content: update.content.map(|c| required("Content", &c)).transpose()?,
        image_url: update.image_url,
    };

    let updated = app.feed.update_post(id, update).await?;
    match format {
        OutputFormat::Text => {
            output::print_success(&format!("Post updated: {}", updated.id), format);
            Ok(())
        }
        OutputFormat::Json => output::print_json(&updated),
    }
}

pub async fn posts_delete(app: &App, id: &str, format: &OutputFormat) -> anyhow::Result<()> {
    app.feed.delete_post(id).await?;
    output::print_success(&format!("Post deleted: {}", id), format);
    Ok(())
}
