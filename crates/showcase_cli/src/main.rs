//! Command-line frontend for the showcase core.
//!
//! # Responsibility
//! - Open the configured database and run read-only feed/detail queries.
//! - Print results as JSON for scripting and local sanity checks.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rusqlite::Connection;
use showcase_core::{
    core_version, init_logging, open_db, FeedRequest, FeedSort, ProjectService, ShowcaseConfig,
    SqliteProjectRepository, SqliteUserRepository,
};
use std::path::PathBuf;
use uuid::Uuid;

/// showcase - browse the project showcase feed
#[derive(Parser, Debug)]
#[command(name = "showcase")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database path
    #[arg(long, env = "SHOWCASE_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one feed page as JSON
    Feed(FeedArgs),

    /// Print published projects of one user as JSON
    UserProjects {
        /// Creator id
        user_id: Uuid,

        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Print one project with its members as JSON
    Show {
        /// Project id
        id: Uuid,

        /// Viewer identity, anonymous when omitted
        #[arg(long)]
        viewer: Option<Uuid>,
    },

    /// Print the core version
    Version,
}

#[derive(clap::Args, Debug)]
struct FeedArgs {
    /// Ordering mode
    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Page size, clamped into 1..=100
    #[arg(long, allow_negative_numbers = true)]
    limit: Option<i64>,

    /// Continuation token from a previous page
    #[arg(long)]
    cursor: Option<String>,

    /// First publication day of the `top` window (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last publication day of the `top` window (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Restrict to one creator
    #[arg(long)]
    author: Option<Uuid>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Top,
    New,
}

impl From<SortArg> for FeedSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Top => FeedSort::Top,
            SortArg::New => FeedSort::New,
        }
    }
}

impl FeedArgs {
    fn into_request(self) -> FeedRequest {
        FeedRequest {
            sort: self.sort.map(FeedSort::from),
            limit: self.limit,
            cursor: self.cursor,
            published_from: self.from,
            published_to: self.to,
            author: self.author,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Version => format!("showcase_core version={}", core_version()),
        Commands::Feed(args) => {
            let (config, conn) = open_session(cli.db)?;
            let service =
                ProjectService::new(SqliteProjectRepository::try_new(&conn)?, config.feed);
            let page = service.list_projects(&args.into_request())?;
            serde_json::to_string_pretty(&page)?
        }
        Commands::UserProjects { user_id, feed } => {
            let (config, conn) = open_session(cli.db)?;
            let service =
                ProjectService::new(SqliteProjectRepository::try_new(&conn)?, config.feed);
            let users = SqliteUserRepository::try_new(&conn)?;
            let page = service.list_user_projects(&users, user_id, &feed.into_request())?;
            serde_json::to_string_pretty(&page)?
        }
        Commands::Show { id, viewer } => {
            let (config, conn) = open_session(cli.db)?;
            let service =
                ProjectService::new(SqliteProjectRepository::try_new(&conn)?, config.feed);
            let detail = service
                .get_project_detail(id, viewer)?
                .with_context(|| format!("project not found: {id}"))?;
            serde_json::to_string_pretty(&detail)?
        }
    };

    println!("{output}");
    Ok(())
}

/// Loads configuration, starts file logging when configured and opens the
/// database with migrations applied.
fn open_session(db_override: Option<PathBuf>) -> Result<(ShowcaseConfig, Connection)> {
    let mut config = ShowcaseConfig::from_env().context("failed to load configuration")?;
    if let Some(db) = db_override {
        config.db_path = db;
    }
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level, log_dir).context("failed to initialize logging")?;
    }

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    info!(
        "event=cli_session module=cli status=ok page_size={}",
        config.feed.default_page_size
    );
    Ok((config, conn))
}
