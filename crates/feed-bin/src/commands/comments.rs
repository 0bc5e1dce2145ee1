//! Comment commands.

use super::required;
use crate::app::App;
use crate::output::{self, OutputFormat};
use supabase_gateway::NewComment;

pub async fn comments_add(
    app: &App,
    post_id: String,
    content: String,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let comment = NewComment {
        post_id,
        content: required("Comment", &content)?,
    };

    let created = app.feed.create_comment(comment).await?;
    match format {
        OutputFormat::Text => {
            output::print_success(&format!("Comment added: {}", created.id), format);
            Ok(())
        }
        OutputFormat::Json => output::print_json(&created),
    }
}

pub async fn comments_delete(
    app: &App,
    post_id: &str,
    id: &str,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    app.feed.delete_comment(post_id, id).await?;
    output::print_success(&format!("Comment deleted: {}", id), format);
    Ok(())
}
