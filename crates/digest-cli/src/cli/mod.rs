//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use digest_core::api::{AdminResource, CrawlSource, LogoutReason};
use digest_core::config::{self, Config};
use digest_core::{ApiError, Session, SessionEvent};
use tokio::sync::broadcast;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;

/// Environment variable holding `EnvFilter` directives.
const LOG_ENV: &str = "DIGEST_LOG";

#[derive(Parser)]
#[command(name = "digest")]
#[command(version)]
#[command(about = "Read summarized Vietnamese news from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        /// Password (prompted on stdin if omitted)
        #[arg(long, env = "DIGEST_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log out (clear stored tokens and cached state)
    Logout,
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        /// Password (prompted on stdin if omitted)
        #[arg(long, env = "DIGEST_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Show the logged-in account
    Whoami {
        /// Fetch the profile from the server instead of the stored copy
        #[arg(long)]
        refresh: bool,
    },
    /// Change or reset the account password
    Password {
        #[command(subcommand)]
        command: PasswordCommands,
    },

    /// Show a page (or several) of the news feed
    Feed {
        /// Latest summaries instead of recommendations
        #[arg(long, conflicts_with = "search")]
        trending: bool,
        /// Search summaries
        #[arg(short, long, value_name = "QUERY")]
        search: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Print the summary text under each entry
        #[arg(short, long)]
        long: bool,
    },
    /// Vote on a summary
    Vote {
        #[arg(value_name = "SUMMARY_ID")]
        summary: String,
        #[arg(value_enum)]
        direction: VoteDirection,
    },

    /// Manage saved articles
    Bookmarks {
        #[command(subcommand)]
        command: BookmarkCommands,
    },
    /// Manage favorite keywords
    Keywords {
        #[command(subcommand)]
        command: KeywordCommands,
    },
    /// Manage search history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Read and write comments on a summary
    Comments {
        #[command(subcommand)]
        command: CommentCommands,
    },

    /// Administration (staff accounts only)
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum VoteDirection {
    Up,
    Down,
}

#[derive(clap::Subcommand)]
enum PasswordCommands {
    /// Change the password of the logged-in account
    Change,
    /// Email a password reset link
    ResetRequest {
        #[arg(value_name = "EMAIL")]
        email: String,
    },
    /// Set a new password with the token from the reset email
    ResetConfirm {
        #[arg(value_name = "TOKEN")]
        token: String,
    },
}

#[derive(clap::Subcommand)]
enum BookmarkCommands {
    /// Lists saved articles
    List,
    /// Saves an article
    Add {
        #[arg(value_name = "ARTICLE_ID")]
        article_id: String,
    },
    /// Removes a saved article
    Remove {
        #[arg(value_name = "ARTICLE_ID")]
        article_id: String,
    },
    /// Saves the article if it isn't saved, otherwise removes it
    Toggle {
        #[arg(value_name = "ARTICLE_ID")]
        article_id: String,
    },
}

#[derive(clap::Subcommand)]
enum KeywordCommands {
    /// Lists favorite keywords
    List,
    /// Adds a favorite keyword
    Add {
        #[arg(value_name = "KEYWORD")]
        keyword: String,
    },
    /// Removes a favorite keyword
    Remove {
        #[arg(value_name = "KEYWORD")]
        keyword: String,
    },
}

#[derive(clap::Subcommand)]
enum HistoryCommands {
    /// Lists recent searches
    List,
    /// Records a search
    Add {
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Forgets a search
    Remove {
        #[arg(value_name = "QUERY")]
        query: String,
    },
}

#[derive(clap::Subcommand)]
enum CommentCommands {
    /// Lists comments on a summary
    List {
        #[arg(value_name = "SUMMARY_ID")]
        summary: String,
    },
    /// Comments on a summary
    Add {
        #[arg(value_name = "SUMMARY_ID")]
        summary: String,
        #[arg(value_name = "TEXT")]
        content: String,
    },
    /// Deletes a comment
    Delete {
        #[arg(value_name = "COMMENT_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum AdminCommands {
    /// Shows dashboard statistics
    Stats,
    /// Lists a page of an admin table
    List {
        /// users, articles, summaries, comments or fav-words
        #[arg(value_name = "TABLE")]
        table: AdminResource,
        /// Page to show (defaults to the last one viewed)
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Deletes a row from an admin table
    Delete {
        #[arg(value_name = "TABLE")]
        table: AdminResource,
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Locks a user account
    Lock {
        #[arg(value_name = "USER_ID")]
        user_id: String,
    },
    /// Unlocks a user account
    Unlock {
        #[arg(value_name = "USER_ID")]
        user_id: String,
    },
    /// Starts a crawl of a news source
    Crawl {
        /// baomoi or vnexpress
        #[arg(value_name = "SOURCE")]
        source: CrawlSource,
    },
    /// Summarizes one article, or every pending article when omitted
    Summarize {
        #[arg(value_name = "ARTICLE_ID")]
        article_id: Option<String>,
    },
    /// Lists users following a keyword
    KeywordUsers {
        #[arg(value_name = "KEYWORD")]
        keyword: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print the effective configuration
    Show,
    /// Set a single config key (e.g. `page_size 20`, `log.file true`)
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("load config")?;
    let _log_guard = init_tracing(&config);

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli, config).await })
}

/// Installs the stderr subscriber, plus a daily log file when enabled.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = if config.log.file {
        let appender = tracing_appender::rolling::daily(config::paths::logs_dir(), "digest.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .try_init();

    guard
}

/// Attaches the localized message to an API error for display.
pub(crate) fn localized(session: &Session, err: ApiError) -> anyhow::Error {
    let message = session.describe(&err);
    anyhow::Error::new(err).context(message)
}

async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let command = match cli.command {
        // Config commands work even when the session can't be opened.
        Commands::Config { command } => return config_command(command, &config),
        command => command,
    };

    let session = Session::open(&config).context("open session")?;
    let mut events = session.api().subscribe();

    let result = run_command(&session, command, &config).await;
    if result.is_ok() {
        report_forced_logout(&session, &mut events);
    }
    result
}

/// Prints the session-expired notice when a secondary call ended the session
/// but the command itself still succeeded.
fn report_forced_logout(session: &Session, events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::LoggedOut { reason } = event
            && reason != LogoutReason::Requested
        {
            eprintln!("{}", session.locale().session_expired());
            return;
        }
    }
}

async fn run_command(session: &Session, command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Login { username, password } => {
            commands::auth::login(session, &username, password).await
        }
        Commands::Logout => commands::auth::logout(session),
        Commands::Register {
            username,
            email,
            password,
        } => commands::auth::register(session, &username, &email, password).await,
        Commands::Whoami { refresh } => commands::auth::whoami(session, refresh).await,
        Commands::Password { command } => match command {
            PasswordCommands::Change => commands::auth::change_password(session).await,
            PasswordCommands::ResetRequest { email } => {
                commands::auth::request_reset(session, &email).await
            }
            PasswordCommands::ResetConfirm { token } => {
                commands::auth::confirm_reset(session, &token).await
            }
        },

        Commands::Feed {
            trending,
            search,
            pages,
            long,
        } => {
            commands::feed::show(
                session,
                commands::feed::FeedOptions {
                    trending,
                    search: search.as_deref(),
                    pages,
                    long,
                },
            )
            .await
        }
        Commands::Vote { summary, direction } => {
            let is_upvote = matches!(direction, VoteDirection::Up);
            commands::feed::vote(session, &summary, is_upvote).await
        }

        Commands::Bookmarks { command } => match command {
            BookmarkCommands::List => commands::bookmarks::list(session).await,
            BookmarkCommands::Add { article_id } => {
                commands::bookmarks::add(session, &article_id).await
            }
            BookmarkCommands::Remove { article_id } => {
                commands::bookmarks::remove(session, &article_id).await
            }
            BookmarkCommands::Toggle { article_id } => {
                commands::bookmarks::toggle(session, &article_id).await
            }
        },
        Commands::Keywords { command } => match command {
            KeywordCommands::List => commands::keywords::list(session).await,
            KeywordCommands::Add { keyword } => commands::keywords::add(session, &keyword).await,
            KeywordCommands::Remove { keyword } => {
                commands::keywords::remove(session, &keyword).await
            }
        },
        Commands::History { command } => match command {
            HistoryCommands::List => commands::history::list(session).await,
            HistoryCommands::Add { query } => commands::history::add(session, &query).await,
            HistoryCommands::Remove { query } => commands::history::remove(session, &query).await,
        },
        Commands::Comments { command } => match command {
            CommentCommands::List { summary } => commands::comments::list(session, &summary).await,
            CommentCommands::Add { summary, content } => {
                commands::comments::add(session, &summary, &content).await
            }
            CommentCommands::Delete { id } => commands::comments::delete(session, &id).await,
        },

        Commands::Admin { command } => match command {
            AdminCommands::Stats => commands::admin::stats(session).await,
            AdminCommands::List {
                table,
                page,
                page_size,
            } => commands::admin::list(session, table, page, page_size).await,
            AdminCommands::Delete { table, id } => {
                commands::admin::delete(session, table, &id).await
            }
            AdminCommands::Lock { user_id } => {
                commands::admin::set_active(session, &user_id, false).await
            }
            AdminCommands::Unlock { user_id } => {
                commands::admin::set_active(session, &user_id, true).await
            }
            AdminCommands::Crawl { source } => commands::admin::crawl(session, source).await,
            AdminCommands::Summarize { article_id } => {
                commands::admin::summarize(session, article_id.as_deref()).await
            }
            AdminCommands::KeywordUsers { keyword, page } => {
                commands::admin::keyword_users(session, &keyword, page).await
            }
        },

        Commands::Config { command } => config_command(command, config),
    }
}

fn config_command(command: ConfigCommands, config: &Config) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            commands::config::path();
            Ok(())
        }
        ConfigCommands::Init => commands::config::init(),
        ConfigCommands::Show => commands::config::show(config),
        ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
    }
}
