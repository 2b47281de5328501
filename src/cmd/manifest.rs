use anyhow::Result;

use streamscout::{Engine, EngineConfig, HttpFetcher};

use super::output::print_qualities;
use crate::OutputFormat;

pub async fn cmd_manifest(url: &str, config: EngineConfig, format: OutputFormat) -> Result<()> {
    let fetcher = HttpFetcher::new(&config)?;
    let engine = Engine::new(fetcher, config);
    let qualities = engine.resolve_manifest(url).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&qualities)?),
        _ => print_qualities(&qualities, format),
    }
    Ok(())
}
