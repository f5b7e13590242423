//! Command-line front end for a SQLite-backed content repository.
//!
//! # Responsibility
//! - Open one accessor session per invocation and close it on success.
//! - Print articles as JSON so output can be piped into other tools.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use contentrepo_core::{
    init_logging, ArticleContentAccessor, ArticleRecord, ContentConfig, Identity,
    SqliteRepositoryAccess, SqliteSessionProvider,
};

/// Localized article repository tool.
#[derive(Parser)]
#[command(name = "contentrepo", version, about = "Localized article repository")]
struct Cli {
    /// SQLite repository file.
    #[arg(long, global = true, env = "CONTENTREPO_DB")]
    db: Option<PathBuf>,

    /// Properties file; environment variables are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Login id the session acts for.
    #[arg(long, global = true, env = "CONTENTREPO_USER", default_value = "admin")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an article, resolving the language first.
    Read {
        path: String,

        /// Requested language; empty means fallback resolution.
        #[arg(long, default_value = "")]
        lang: String,

        /// Historical version name, e.g. `1.0`.
        #[arg(long)]
        version: Option<String>,
    },

    /// Store a new article under `<path>/<lang>`.
    Write(ArticleArgs),

    /// Check in a new version of an existing article.
    Update(ArticleArgs),

    /// Remove a node and its subtree.
    Remove { path: String },

    /// List version names of an article.
    Versions {
        path: String,

        #[arg(long, default_value = "")]
        lang: String,
    },

    /// List languages an article is available in.
    Languages { path: String },

    /// Show which path a read would load.
    Resolve {
        path: String,

        #[arg(long, default_value = "")]
        lang: String,
    },
}

#[derive(Args)]
struct ArticleArgs {
    path: String,

    /// Article language; the configured fallback when omitted.
    #[arg(long, default_value = "")]
    lang: String,

    #[arg(long)]
    title: String,

    #[arg(long, default_value = "")]
    body: String,

    /// Publish date in epoch milliseconds; now when omitted.
    #[arg(long)]
    pub_date: Option<i64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ContentConfig::from_properties_file(path)?,
        None => ContentConfig::from_env()?,
    };
    config.install_locales().map_err(anyhow::Error::msg)?;
    if let Some(log_dir) = config.log_dir() {
        let log_dir = std::env::current_dir()?.join(log_dir);
        init_logging(config.log_level(), log_dir).map_err(anyhow::Error::msg)?;
    }

    let Some(db) = cli.db.clone().or_else(|| config.repository_path()) else {
        bail!("no repository given; pass --db or set CONTENTREPO_DB");
    };
    let provider = SqliteSessionProvider::file(&db);
    let mut accessor = ArticleContentAccessor::open(&provider, &Identity::new(&cli.user), &config)
        .with_context(|| format!("failed to open repository {}", db.display()))?;

    run(&mut accessor, cli.command)?;
    accessor.close()?;
    Ok(())
}

fn run(accessor: &mut ArticleContentAccessor<SqliteRepositoryAccess>, command: Commands) -> Result<()> {
    match command {
        Commands::Read {
            path,
            lang,
            version,
        } => {
            let article = match version {
                Some(version) => accessor.read_version(&path, &lang, &version)?,
                None => accessor.read_in_language(&path, &lang)?,
            };
            print_article(&article)?;
        }

        Commands::Write(args) => {
            let article = accessor.write(
                &args.path,
                &args.lang,
                &args.title,
                &args.body,
                args.pub_date.unwrap_or_else(now_millis),
            )?;
            print_article(&article)?;
        }

        Commands::Update(args) => {
            let article = accessor.update(
                &args.path,
                &args.lang,
                &args.title,
                &args.body,
                args.pub_date.unwrap_or_else(now_millis),
            )?;
            print_article(&article)?;
        }

        Commands::Remove { path } => {
            accessor.remove(&path)?;
            println!("removed {path}");
        }

        Commands::Versions { path, lang } => {
            accessor.read_in_language(&path, &lang)?;
            for version in accessor.list_versions()? {
                println!("{version}");
            }
        }

        Commands::Languages { path } => {
            for language in accessor.available_languages(&path)? {
                println!("{language}");
            }
        }

        Commands::Resolve { path, lang } => {
            let resolution = accessor.resolve_language(&path, &lang);
            println!("{resolution:?}");
        }
    }
    Ok(())
}

fn print_article(article: &ArticleRecord) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(article)?);
    Ok(())
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
