//! `streamscout` CLI - find and resolve video streams on a page

mod cmd;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use streamscout::EngineConfig;

#[derive(Parser)]
#[command(name = "streamscout")]
#[command(about = "Resolve streaming manifests on a web page into playable qualities")]
#[command(version)]
struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.config/streamscout/config.toml)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    #[default]
    Full,
    /// JSON document on stdout
    Json,
    /// `label url` per line
    Compact,
}

/// Overrides shared by the commands that resolve playlists.
#[derive(clap::Args, Clone, Debug)]
pub struct ResolveArgs {
    /// Keep discovery order instead of sorting by height
    #[arg(long)]
    no_sort: bool,

    /// Per-fetch timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Overall deadline in seconds
    #[arg(long)]
    deadline: Option<u64>,

    /// Playlist fetches in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Full)]
    format: OutputFormat,
}

impl ResolveArgs {
    fn apply(&self, config: &mut EngineConfig) {
        if self.no_sort {
            config.sort_by_quality = false;
        }
        if let Some(secs) = self.timeout {
            config.fetch_timeout_secs = secs.max(1);
        }
        if let Some(secs) = self.deadline {
            config.deadline_secs = secs;
        }
        if let Some(n) = self.concurrency {
            config.max_concurrent_fetches = n.max(1);
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page and resolve every stream on it
    Resolve {
        /// Page URL
        url: String,

        #[command(flatten)]
        args: ResolveArgs,

        /// Title to report (default: page path)
        #[arg(long)]
        title: Option<String>,

        /// Thumbnail URL to report
        #[arg(long)]
        thumbnail: Option<String>,

        /// Duration in seconds, used for the minimum-duration check
        #[arg(long)]
        duration: Option<u64>,

        /// Category to report
        #[arg(long)]
        category: Option<String>,

        /// Include every candidate URL in the output
        #[arg(long)]
        raw_links: bool,
    },

    /// Resolve a single HLS playlist URL
    Manifest {
        /// Playlist URL
        url: String,

        #[command(flatten)]
        args: ResolveArgs,
    },

    /// List media candidates in a saved page without fetching anything
    Extract {
        /// HTML file, or `-` for stdin
        file: String,

        /// URL the page was served from, for relative links
        #[arg(short, long)]
        base: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Full)]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout stays reserved for results
    let default_level = if cli.verbose { "debug" } else { "warn" };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    }
    .context("failed to load config")?;

    match cli.command {
        Commands::Resolve {
            url,
            args,
            title,
            thumbnail,
            duration,
            category,
            raw_links,
        } => {
            args.apply(&mut config);
            let metadata = streamscout::PageMetadata {
                title,
                description: None,
                thumbnail,
                duration,
                category,
            };
            cmd::resolve::cmd_resolve(&url, config, metadata, raw_links, args.format).await?;
        }
        Commands::Manifest { url, args } => {
            args.apply(&mut config);
            cmd::manifest::cmd_manifest(&url, config, args.format).await?;
        }
        Commands::Extract { file, base, format } => {
            cmd::extract::cmd_extract(&file, &base, &config, format)?;
        }
    }

    Ok(())
}
