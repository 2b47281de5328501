//! `streamscout` - media-manifest resolution engine
//!
//! # Features
//!
//! - **Candidate extraction**: media URLs from markup, inline scripts and
//!   player `sources` lists, resolved and de-duplicated
//! - **Manifest resolution**: HLS master playlists walked down to playable
//!   media playlists, safe against cycles, bounded by a deadline
//! - **Quality normalization**: one label per stream (`1080p`, `auto`,
//!   `mp4_1`, `fallback`), one stream per label
//!
//! # Example
//!
//! ```rust,no_run
//! use streamscout::{Engine, EngineConfig, HttpFetcher, PageMetadata};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::default();
//!     let fetcher = HttpFetcher::new(&config)?;
//!     let page = "https://example.com/watch/1";
//!     let html = fetcher.fetch_page(page, config.fetch_timeout()).await?;
//!
//!     let engine = Engine::new(fetcher, config);
//!     let result = engine.scrape_markup(page, &html, PageMetadata::default()).await?;
//!     for (label, url) in result.qualities.iter() {
//!         println!("{label}: {url}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod candidate;
pub mod config;
pub mod engine;
pub mod error;
pub mod http_client;
pub mod manifest;
pub mod quality;
pub mod resolver;

pub use aggregate::{Aggregator, PageMetadata, ScrapeResult, ScrapeStatus};
pub use candidate::{classify, CandidateExtractor, CandidateKind, CandidateUrl, MediaContainer};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{ConfigError, FetchError, ParseError, ResolveError};
pub use http_client::{FetchResponse, Fetcher, HttpFetcher};
pub use manifest::{parse_manifest, ManifestNode, Resolution, VariantChild};
pub use quality::{normalize, QualityMap, QualityPolicy};
pub use resolver::{QualityHint, ResolvedStream, Resolver, StreamOrigin, WalkReport};

/// Version of streamscout
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
