//! CLI command implementations.

mod auth;
mod comments;
mod posts;
mod watch;

pub use auth::{login, logout, signup, status};
pub use comments::{comments_add, comments_delete};
pub use posts::{posts_create, posts_delete, posts_edit, posts_list, posts_show};
pub use watch::watch;

use anyhow::bail;
use std::io::{self, Write};

/// Trimmed value of a required field.
fn required(label: &str, value: &str) -> anyhow::Result<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("{} is required", label);
    }
    Ok(value.to_string())
}

/// Read one line from stdin after printing `label`.
fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    required(label, &line)
}

/// Read a password without echo.
fn prompt_password(label: &str) -> anyhow::Result<String> {
    let password = rpassword::prompt_password(format!("{}: ", label))?;
    if password.is_empty() {
        bail!("{} is required", label);
    }
    Ok(password)
}
