use std::time::Instant;

use anyhow::{Context, Result};

use streamscout::{Engine, EngineConfig, HttpFetcher, PageMetadata, ScrapeStatus};

use super::output::print_qualities;
use crate::OutputFormat;

pub async fn cmd_resolve(
    url: &str,
    config: EngineConfig,
    metadata: PageMetadata,
    raw_links: bool,
    format: OutputFormat,
) -> Result<()> {
    let fetcher = HttpFetcher::new(&config)?;
    let start = Instant::now();

    let html = fetcher
        .fetch_page(url, config.fetch_timeout())
        .await
        .with_context(|| format!("failed to fetch page {url}"))?;

    let engine = Engine::new(fetcher, config).with_raw_links(raw_links);
    let result = engine
        .scrape_markup(url, &html, metadata)
        .await
        .with_context(|| format!("invalid page URL {url}"))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Compact => print_qualities(&result.qualities, format),
        OutputFormat::Full => {
            println!("🎬 {}", result.title);
            match result.status {
                ScrapeStatus::Ok => {}
                ScrapeStatus::NoCandidates => println!("❌ No media found on page"),
                ScrapeStatus::Partial => println!("⚠️  Deadline reached, some entries are fallbacks"),
                ScrapeStatus::TooShort => println!(
                    "⏱️  Rejected: {}s is below the minimum duration",
                    result.duration
                ),
            }
            print_qualities(&result.qualities, format);
            if !result.raw_links.is_empty() {
                println!("\n🔗 Candidates:");
                for link in &result.raw_links {
                    println!("   {link}");
                }
            }
            println!("\n⏱️  {:.0}ms", start.elapsed().as_secs_f64() * 1000.0);
        }
    }

    Ok(())
}
