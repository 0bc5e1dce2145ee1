//! Output formatting for the CLI.

use clap::ValueEnum;
use serde::Serialize;
use serde_json::json;

/// Output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print output in the specified format.
pub fn print<T: Serialize + std::fmt::Display>(value: &T, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", value),
        },
    }
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => println!("{}", status_line("success", message)),
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => eprintln!("{}", status_line("error", message)),
    }
}

/// Print progress chatter; suppressed for JSON so stdout stays parseable.
pub fn print_progress(message: &str, format: &OutputFormat) {
    if let OutputFormat::Text = format {
        println!("{}", message);
    }
}

fn status_line(status: &str, message: &str) -> String {
    json!({ "status": status, "message": message }).to_string()
}

/// Format a table row.
pub fn row(label: &str, value: &str) -> String {
    format!("  {:<16} {}", format!("{}:", label), value)
}

pub fn divider() -> String {
    "-".repeat(50)
}

/// Format a heading followed by a divider.
pub fn heading(text: &str) -> String {
    format!("\n{}\n{}", text, divider())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_escapes_message() {
        let line = status_line("error", r#"bad "quote""#);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], r#"bad "quote""#);
    }

    #[test]
    fn row_pads_label() {
        assert_eq!(row("User", "alice"), format!("  {:<16} alice", "User:"));
    }

    #[test]
    fn heading_ends_with_divider() {
        let text = heading("Posts");
        assert!(text.starts_with("\nPosts\n"));
        assert!(text.ends_with(&divider()));
    }
}
