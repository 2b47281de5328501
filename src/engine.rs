//! End-to-end pipeline: markup → candidates → streams → quality map.

use tracing::{info, instrument};

use crate::aggregate::{Aggregator, PageMetadata, ScrapeResult};
use crate::candidate::{CandidateExtractor, CandidateUrl};
use crate::config::EngineConfig;
use crate::http_client::Fetcher;
use crate::quality::{normalize, QualityMap, QualityPolicy};
use crate::resolver::Resolver;

/// The resolution engine bound to one fetcher and config.
pub struct Engine<F> {
    config: EngineConfig,
    resolver: Resolver<F>,
    aggregator: Aggregator,
}

impl<F: Fetcher> Engine<F> {
    pub fn new(fetcher: F, config: EngineConfig) -> Self {
        Self {
            resolver: Resolver::new(fetcher, &config),
            aggregator: Aggregator::new(&config),
            config,
        }
    }

    /// Include every considered candidate in results.
    #[must_use]
    pub fn with_raw_links(mut self, include: bool) -> Self {
        self.aggregator = self.aggregator.with_raw_links(include);
        self
    }

    pub fn resolver(&self) -> &Resolver<F> {
        &self.resolver
    }

    /// Scrape a page whose markup has already been fetched.
    #[instrument(skip(self, markup, metadata), fields(markup_len = markup.len()))]
    pub async fn scrape_markup(
        &self,
        page_url: &str,
        markup: &str,
        metadata: PageMetadata,
    ) -> Result<ScrapeResult, url::ParseError> {
        let extractor = CandidateExtractor::new(page_url, &self.config.ad_keywords)?;
        let candidates = extractor.extract(markup);
        Ok(self.scrape_candidates(page_url, &candidates, metadata).await)
    }

    /// Scrape from candidates some other component already extracted.
    pub async fn scrape_candidates(
        &self,
        page_url: &str,
        candidates: &[CandidateUrl],
        metadata: PageMetadata,
    ) -> ScrapeResult {
        if candidates.is_empty() {
            info!(page = %page_url, "No media candidates found");
        }
        let report = self.resolver.resolve(candidates).await;
        self.aggregator
            .aggregate(page_url, metadata, candidates, report)
    }

    /// Resolve one playlist URL straight to a quality map.
    pub async fn resolve_manifest(&self, url: &str) -> QualityMap {
        let report = self.resolver.resolve_url(url).await;
        normalize(
            &report.streams,
            QualityPolicy {
                sort_by_quality: self.config.sort_by_quality,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ScrapeStatus;
    use crate::resolver::tests::{master, MockFetcher, LEAF};

    const PAGE: &str = "https://video.example.com/watch/42";

    fn engine(fetcher: MockFetcher, sort: bool) -> Engine<MockFetcher> {
        let config = EngineConfig {
            sort_by_quality: sort,
            ..EngineConfig::default()
        };
        Engine::new(fetcher, config)
    }

    fn three_quality_fetcher() -> MockFetcher {
        MockFetcher::new()
            .page(
                "https://cdn.example.com/hls/master.m3u8",
                &master(&[
                    ("a/index.m3u8", Some(360)),
                    ("b/index.m3u8", Some(720)),
                    ("c/index.m3u8", Some(1080)),
                ]),
            )
            .page("https://cdn.example.com/hls/a/index.m3u8", LEAF)
            .page("https://cdn.example.com/hls/b/index.m3u8", LEAF)
            .page("https://cdn.example.com/hls/c/index.m3u8", LEAF)
    }

    #[tokio::test]
    async fn page_with_variant_playlist() {
        let markup = r#"<html><head><title>x</title></head><body>
            <script>jwplayer("p").setup({file: "https://cdn.example.com/hls/master.m3u8"});</script>
            </body></html>"#;
        let result = engine(three_quality_fetcher(), false)
            .scrape_markup(PAGE, markup, PageMetadata::default())
            .await
            .unwrap();

        let pairs: Vec<(&str, &str)> = result.qualities.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("360p", "https://cdn.example.com/hls/a/index.m3u8"),
                ("720p", "https://cdn.example.com/hls/b/index.m3u8"),
                ("1080p", "https://cdn.example.com/hls/c/index.m3u8"),
            ]
        );
        assert_eq!(result.status, ScrapeStatus::Ok);
    }

    #[tokio::test]
    async fn sorted_policy_orders_descending() {
        let map = engine(three_quality_fetcher(), true)
            .resolve_manifest("https://cdn.example.com/hls/master.m3u8")
            .await;
        let labels: Vec<&str> = map.labels().collect();
        assert_eq!(labels, vec!["1080p", "720p", "360p"]);
    }

    #[tokio::test]
    async fn differently_spelled_links_collapse() {
        let markup = r#"<video src="/media/../hls/index.m3u8"></video>
            <script>var u = "https://video.example.com/hls/index.m3u8";</script>"#;
        let fetcher = MockFetcher::new().page("https://video.example.com/hls/index.m3u8", LEAF);
        let engine = engine(fetcher, true);
        let result = engine
            .scrape_markup(PAGE, markup, PageMetadata::default())
            .await
            .unwrap();

        assert_eq!(result.qualities.len(), 1);
        assert_eq!(
            result.qualities.get("auto"),
            Some("https://video.example.com/hls/index.m3u8")
        );
        assert_eq!(engine.resolver().fetcher().calls().len(), 1);
    }

    #[tokio::test]
    async fn self_referencing_variant_yields_one_auto() {
        let url = "https://cdn.example.com/loop.m3u8";
        let fetcher = MockFetcher::new().page(url, &master(&[("loop.m3u8", Some(720))]));
        let map = engine(fetcher, true).resolve_manifest(url).await;
        let pairs: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(pairs, vec![("auto", url)]);
    }

    #[tokio::test]
    async fn page_without_media_reports_no_candidates() {
        let result = engine(MockFetcher::new(), true)
            .scrape_markup(PAGE, "<p>nothing here</p>", PageMetadata::default())
            .await
            .unwrap();
        assert!(result.qualities.is_empty());
        assert_eq!(result.status, ScrapeStatus::NoCandidates);
    }

    #[tokio::test]
    async fn mixed_direct_and_failed_manifest() {
        let markup = r#"<source src="/v/clip.mp4">
            <source src="https://dead.example.com/live.m3u8">
            <source src="/v/other.webm">"#;
        let result = engine(MockFetcher::new(), false)
            .with_raw_links(true)
            .scrape_markup(PAGE, markup, PageMetadata::default())
            .await
            .unwrap();

        assert_eq!(result.qualities.get("mp4_1"), Some("https://video.example.com/v/clip.mp4"));
        assert_eq!(result.qualities.get("webm_1"), Some("https://video.example.com/v/other.webm"));
        assert_eq!(result.qualities.get("fallback"), Some("https://dead.example.com/live.m3u8"));
        assert_eq!(result.raw_links.len(), 3);
    }

    #[tokio::test]
    async fn bad_page_url_is_an_error() {
        let result = engine(MockFetcher::new(), true)
            .scrape_markup("not a url", "<p></p>", PageMetadata::default())
            .await;
        assert!(result.is_err());
    }
}
