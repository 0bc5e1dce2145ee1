//! community-feed - command-line client for the community feed.

mod app;
mod commands;
mod output;

use app::App;
use clap::{Parser, Subcommand};
use feed_config::{init_logging, Config, Paths};
use output::OutputFormat;
use std::path::PathBuf;
use supabase_gateway::PostUpdate;
use tracing::debug;

/// Community feed client.
#[derive(Parser)]
#[command(name = "community-feed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the config value
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, session and logs (default: ~/.community-feed)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login,

    /// Create an account and its profile
    Signup,

    /// Sign out and forget the stored session
    Logout,

    /// Show the current authentication state
    Status,

    /// Print authentication changes until Ctrl-C
    Watch,

    /// Read and write posts
    Posts {
        #[command(subcommand)]
        command: PostsCommands,
    },

    /// Add and remove comments
    Comments {
        #[command(subcommand)]
        command: CommentsCommands,
    },
}

#[derive(Subcommand)]
enum PostsCommands {
    /// List one page of the feed, newest first
    List {
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
    },

    /// Show a post with its comments
    Show {
        /// Post ID
        id: String,
    },

    /// Publish a new post
    Create {
        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,

        #[arg(long)]
        image_url: Option<String>,
    },

    /// Change the title, content or image of one of your posts
    Edit {
        /// Post ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        image_url: Option<String>,
    },

    /// Delete one of your posts
    Delete {
        /// Post ID
        id: String,
    },
}

#[derive(Subcommand)]
enum CommentsCommands {
    /// Comment on a post
    Add {
        /// Post ID
        post_id: String,

        /// Comment text
        content: String,
    },

    /// Delete one of your comments
    Delete {
        /// Post ID the comment belongs to
        post_id: String,

        /// Comment ID
        id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = match cli.base_dir {
        Some(base_dir) => Paths::with_base_dir(base_dir),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;

    let config = Config::load(&paths)?;
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging("cli", level, &paths, false);

    let app = App::build(&paths, &config)?;

    let initial = app.auth.initialize().await;
    debug!(phase = ?initial.phase, "Auth state restored");

    let mut subscription = app.auth.start_listening();
    let result = dispatch(&app, cli.command, &cli.format).await;
    subscription.unsubscribe();

    result
}

async fn dispatch(app: &App, command: Commands, format: &OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Login => commands::login(app, format).await,
        Commands::Signup => commands::signup(app, format).await,
        Commands::Logout => commands::logout(app, format).await,
        Commands::Status => commands::status(app, format),
        Commands::Watch => commands::watch(app, format).await,
        Commands::Posts { command } => match command {
            PostsCommands::List { page } => commands::posts_list(app, page, format).await,
            PostsCommands::Show { id } => commands::posts_show(app, &id, format).await,
            PostsCommands::Create {
                title,
                content,
                image_url,
            } => commands::posts_create(app, title, content, image_url, format).await,
            PostsCommands::Edit {
                id,
                title,
                content,
                image_url,
            } => {
                let update = PostUpdate {
                    title,
                    content,
                    image_url,
                };
                commands::posts_edit(app, &id, update, format).await
            }
            PostsCommands::Delete { id } => commands::posts_delete(app, &id, format).await,
        },
        Commands::Comments { command } => match command {
            CommentsCommands::Add { post_id, content } => {
                commands::comments_add(app, post_id, content, format).await
            }
            CommentsCommands::Delete { post_id, id } => {
                commands::comments_delete(app, &post_id, &id, format).await
            }
        },
    }
}
