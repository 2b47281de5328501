use streamscout::QualityMap;

use crate::OutputFormat;

pub fn print_qualities(qualities: &QualityMap, format: OutputFormat) {
    if matches!(format, OutputFormat::Compact) {
        for (label, url) in qualities.iter() {
            println!("{label} {url}");
        }
        return;
    }

    if qualities.is_empty() {
        println!("No playable streams");
        return;
    }

    let width = qualities.labels().map(str::len).max().unwrap_or(0);
    println!("\n📺 Qualities:");
    for (label, url) in qualities.iter() {
        println!("   {label:<width$}  {}", truncate_text(url, 120));
    }
}

pub fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
