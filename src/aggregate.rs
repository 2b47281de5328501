//! Final result assembly.
//!
//! Combines the normalized quality map with page metadata supplied by the
//! caller. This is where "nothing found" and "too short" become statuses
//! instead of errors.

use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::candidate::CandidateUrl;
use crate::config::EngineConfig;
use crate::quality::{normalize, QualityMap, QualityPolicy};
use crate::resolver::{ResolvedStream, StreamOrigin, WalkReport};

const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Page metadata obtained by whoever fetched the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    /// Duration in seconds.
    pub duration: Option<u64>,
    pub category: Option<String>,
}

/// Outcome class of one scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    Ok,
    /// The page contained no media candidates at all.
    NoCandidates,
    /// The deadline elapsed; some candidates are fallbacks.
    Partial,
    /// Shorter than the configured minimum; qualities were cleared.
    TooShort,
}

/// Caller-facing result.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResult {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub thumbnail: String,
    pub duration: u64,
    pub category: String,
    pub qualities: QualityMap,
    /// Every candidate considered, for diagnostics.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raw_links: Vec<String>,
    pub status: ScrapeStatus,
}

/// Builds [`ScrapeResult`]s.
#[derive(Debug, Clone)]
pub struct Aggregator {
    policy: QualityPolicy,
    min_duration_secs: u64,
    include_raw_links: bool,
}

impl Aggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            policy: QualityPolicy {
                sort_by_quality: config.sort_by_quality,
            },
            min_duration_secs: config.min_duration_secs,
            include_raw_links: false,
        }
    }

    #[must_use]
    pub fn with_raw_links(mut self, include: bool) -> Self {
        self.include_raw_links = include;
        self
    }

    pub fn aggregate(
        &self,
        page_url: &str,
        metadata: PageMetadata,
        candidates: &[CandidateUrl],
        report: WalkReport,
    ) -> ScrapeResult {
        let mut streams = report.streams;
        // Candidates cut off by the deadline still show up, as fallbacks.
        for url in &report.abandoned {
            let label = candidates
                .iter()
                .find(|c| &c.url == url)
                .and_then(|c| c.label.clone());
            streams.push(ResolvedStream {
                url: url.clone(),
                hint: None,
                origin: StreamOrigin::Fallback,
                label,
            });
        }

        let mut qualities = normalize(&streams, self.policy);
        let duration = metadata.duration.unwrap_or(0);
        let title = metadata
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| title_from_url(page_url));

        let status = if candidates.is_empty() {
            ScrapeStatus::NoCandidates
        } else if duration > 0 && duration < self.min_duration_secs {
            info!(title = %title, duration, "Rejecting video shorter than minimum duration");
            qualities.clear();
            ScrapeStatus::TooShort
        } else if report.deadline_hit {
            ScrapeStatus::Partial
        } else {
            ScrapeStatus::Ok
        };

        ScrapeResult {
            title,
            description: metadata.description,
            thumbnail: metadata.thumbnail.unwrap_or_default(),
            duration,
            category: metadata
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            qualities,
            raw_links: if self.include_raw_links {
                candidates.iter().map(|c| c.url.clone()).collect()
            } else {
                Vec::new()
            },
            status,
        }
    }
}

/// Page path, or host when the path is empty.
fn title_from_url(page_url: &str) -> String {
    match Url::parse(page_url) {
        Ok(url) if url.path() != "/" && !url.path().is_empty() => url.path().to_string(),
        Ok(url) => url.host_str().unwrap_or(page_url).to_string(),
        Err(_) => page_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::CandidateKind;
    use crate::resolver::QualityHint;

    const PAGE: &str = "https://video.example.com/watch/42";

    fn manifest(url: &str) -> CandidateUrl {
        CandidateUrl {
            url: url.into(),
            kind: CandidateKind::Manifest,
            label: None,
        }
    }

    fn leaf(url: &str, height: u64) -> ResolvedStream {
        ResolvedStream {
            url: url.into(),
            hint: Some(QualityHint::from_height(height)),
            origin: StreamOrigin::Leaf,
            label: None,
        }
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(&EngineConfig::default())
    }

    #[test]
    fn no_candidates_is_empty_but_valid() {
        let result = aggregator().aggregate(PAGE, PageMetadata::default(), &[], WalkReport::default());
        assert!(result.qualities.is_empty());
        assert_eq!(result.status, ScrapeStatus::NoCandidates);
        assert_eq!(result.title, "/watch/42");
        assert_eq!(result.category, "Uncategorized");
    }

    #[test]
    fn abandoned_candidates_become_fallbacks() {
        let candidates = [manifest("https://cdn/a.m3u8"), manifest("https://cdn/b.m3u8")];
        let report = WalkReport {
            streams: vec![leaf("https://cdn/a/720.m3u8", 720)],
            abandoned: vec!["https://cdn/b.m3u8".into()],
            deadline_hit: true,
            fetches: 2,
        };
        let result = aggregator().aggregate(PAGE, PageMetadata::default(), &candidates, report);
        assert_eq!(result.status, ScrapeStatus::Partial);
        assert_eq!(result.qualities.get("720p"), Some("https://cdn/a/720.m3u8"));
        assert_eq!(result.qualities.get("fallback"), Some("https://cdn/b.m3u8"));
    }

    #[test]
    fn short_videos_are_rejected() {
        let candidates = [manifest("https://cdn/a.m3u8")];
        let report = WalkReport {
            streams: vec![leaf("https://cdn/a/720.m3u8", 720)],
            ..WalkReport::default()
        };
        let metadata = PageMetadata {
            title: Some("Teaser".into()),
            duration: Some(30),
            ..PageMetadata::default()
        };
        let result = aggregator().aggregate(PAGE, metadata, &candidates, report);
        assert_eq!(result.status, ScrapeStatus::TooShort);
        assert!(result.qualities.is_empty());
        assert_eq!(result.title, "Teaser");
    }

    #[test]
    fn unknown_duration_is_not_rejected() {
        let candidates = [manifest("https://cdn/a.m3u8")];
        let report = WalkReport {
            streams: vec![leaf("https://cdn/a/720.m3u8", 720)],
            ..WalkReport::default()
        };
        let result = aggregator().aggregate(PAGE, PageMetadata::default(), &candidates, report);
        assert_eq!(result.status, ScrapeStatus::Ok);
        assert_eq!(result.qualities.len(), 1);
    }

    #[test]
    fn raw_links_only_when_requested() {
        let candidates = [manifest("https://cdn/a.m3u8")];
        let quiet = aggregator().aggregate(PAGE, PageMetadata::default(), &candidates, WalkReport::default());
        assert!(quiet.raw_links.is_empty());

        let verbose = aggregator().with_raw_links(true).aggregate(
            PAGE,
            PageMetadata::default(),
            &candidates,
            WalkReport::default(),
        );
        assert_eq!(verbose.raw_links, vec!["https://cdn/a.m3u8".to_string()]);
    }

    #[test]
    fn root_page_title_uses_host() {
        assert_eq!(title_from_url("https://video.example.com/"), "video.example.com");
        assert_eq!(title_from_url("not a url"), "not a url");
    }

    #[test]
    fn json_shape() {
        let candidates = [manifest("https://cdn/a.m3u8")];
        let report = WalkReport {
            streams: vec![leaf("https://cdn/a/720.m3u8", 720)],
            ..WalkReport::default()
        };
        let result = aggregator().aggregate(PAGE, PageMetadata::default(), &candidates, report);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["qualities"]["720p"], "https://cdn/a/720.m3u8");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["duration"], 0);
        assert!(json.get("raw_links").is_none());
    }
}
