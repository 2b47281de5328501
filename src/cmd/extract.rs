use std::io::Read;

use anyhow::{Context, Result};

use streamscout::{CandidateExtractor, CandidateKind, EngineConfig};

use crate::OutputFormat;

pub fn cmd_extract(file: &str, base: &str, config: &EngineConfig, format: OutputFormat) -> Result<()> {
    let markup = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("failed to read {file}"))?
    };

    let extractor = CandidateExtractor::new(base, &config.ad_keywords)
        .with_context(|| format!("invalid base URL {base}"))?;
    let candidates = extractor.extract(&markup);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&candidates)?),
        OutputFormat::Compact => {
            for c in &candidates {
                println!("{}", c.url);
            }
        }
        OutputFormat::Full => {
            for c in &candidates {
                let kind = match c.kind {
                    CandidateKind::Manifest => "manifest".to_string(),
                    CandidateKind::DirectMedia(container) => container.label_prefix().to_string(),
                    CandidateKind::Unknown => "unknown".to_string(),
                };
                match &c.label {
                    Some(label) => println!("[{kind}] {} ({label})", c.url),
                    None => println!("[{kind}] {}", c.url),
                }
            }
            println!("\n({} candidates)", candidates.len());
        }
    }
    Ok(())
}
