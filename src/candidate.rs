//! Candidate extraction from page markup.
//!
//! Purely textual: finds URL-shaped strings in markup and inline scripts,
//! classifies them by extension, resolves them against the page URL and
//! drops duplicates and ads. Nothing here touches the network.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Container family of a directly playable (non-HLS) URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaContainer {
    Mp4,
    Webm,
    Dash,
    /// Page-labeled source with no recognizable extension.
    Other,
}

impl MediaContainer {
    /// Prefix used for counter-based labels (`mp4_1`, `webm_2`, ...).
    pub fn label_prefix(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Dash => "dash",
            Self::Other => "video",
        }
    }
}

/// What a candidate URL points at, judged from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "container")]
pub enum CandidateKind {
    /// HLS playlist, needs fetching.
    Manifest,
    /// Playable as-is.
    DirectMedia(MediaContainer),
    Unknown,
}

/// A discovered absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateUrl {
    pub url: String,
    pub kind: CandidateKind,
    /// Quality label given by the page itself (player `sources` lists).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Classify a URL by the extension of its last path segment.
///
/// Query string and fragment are ignored; matching is case-insensitive.
pub fn classify(url: &str) -> CandidateKind {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let Some((_, ext)) = segment.rsplit_once('.') else {
        return CandidateKind::Unknown;
    };

    match ext.to_ascii_lowercase().as_str() {
        "m3u8" | "m3u" => CandidateKind::Manifest,
        "mp4" | "m4v" | "mov" => CandidateKind::DirectMedia(MediaContainer::Mp4),
        "webm" => CandidateKind::DirectMedia(MediaContainer::Webm),
        "mpd" => CandidateKind::DirectMedia(MediaContainer::Dash),
        _ => CandidateKind::Unknown,
    }
}

const STANDARD_HEIGHTS: [u64; 14] = [
    144, 240, 270, 288, 360, 480, 540, 576, 720, 900, 1080, 1440, 2160, 4320,
];

/// Guess a vertical resolution from markers in the URL path.
///
/// Only standard video heights count, so years and ids in paths are not
/// mistaken for qualities.
pub fn height_hint(url: &str) -> Option<u64> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    HEIGHT_IN_URL
        .captures_iter(path)
        .filter_map(|c| c[1].parse::<u64>().ok())
        .filter(|h| STANDARD_HEIGHTS.contains(h))
        .last()
}

/// Absolute `http(s)` URLs anywhere in the text.
static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s"'<>()`\\]+"#).unwrap());

/// Attribute or JSON-key references that may be relative.
static ATTR_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:src|href|file|data-src|url)["']?\s*[=:]\s*["']([^"'\s<>]+)["']"#)
        .unwrap()
});

/// Player source lists: `sources: [...]`, `videoSources = {...}`.
static SOURCE_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(?:sources|videoSources|playlist)\s*[:=]\s*(\[.*?\]|\{.*?\})").unwrap()
});

static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Height markers in media filenames: `clip-720p.mp4`, `/1080/video.mp4`.
static HEIGHT_IN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[-_/](\d{3,4})p?[-._/]").unwrap());

static SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

/// Turns markup into an ordered, de-duplicated candidate list.
pub struct CandidateExtractor {
    base: Url,
    ad_keywords: Vec<String>,
}

impl CandidateExtractor {
    pub fn new(base_url: &str, ad_keywords: &[String]) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base_url)?,
            ad_keywords: ad_keywords.iter().map(|k| k.to_lowercase()).collect(),
        })
    }

    /// Extract candidates from a full page: labeled player sources first,
    /// then every URL-shaped match in document order.
    pub fn extract(&self, markup: &str) -> Vec<CandidateUrl> {
        let document = Html::parse_document(markup);
        let scripts: Vec<String> = document
            .select(&SCRIPT)
            .map(|s| s.text().collect::<String>())
            .filter(|t| !t.trim().is_empty())
            .collect();

        let mut out = Vec::new();
        let mut seen = HashSet::new();

        for script in &scripts {
            for (raw, label) in labeled_sources(script) {
                self.push(&raw, Some(label), &mut out, &mut seen);
            }
        }
        for raw in url_matches(markup) {
            self.push(&raw, None, &mut out, &mut seen);
        }

        debug!(count = out.len(), base = %self.base, "Extracted candidates");
        out
    }

    /// Build candidates from strings some other component already found.
    pub fn from_strings<'a>(&self, raw: impl IntoIterator<Item = &'a str>) -> Vec<CandidateUrl> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for r in raw {
            self.push(&unescape(r), None, &mut out, &mut seen);
        }
        out
    }

    /// Returns `true` if any URL token equals a configured ad keyword.
    pub fn is_ad(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| self.ad_keywords.iter().any(|k| k == token))
    }

    fn push(
        &self,
        raw: &str,
        label: Option<String>,
        out: &mut Vec<CandidateUrl>,
        seen: &mut HashSet<String>,
    ) {
        let Ok(resolved) = self.base.join(raw.trim()) else {
            return;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            return;
        }

        let url = resolved.to_string();
        let kind = match (classify(&url), &label) {
            (CandidateKind::Unknown, Some(_)) => CandidateKind::DirectMedia(MediaContainer::Other),
            (CandidateKind::Unknown, None) => return,
            (kind, _) => kind,
        };
        if self.is_ad(&url) {
            debug!(url = %url, "Skipping advertising candidate");
            return;
        }
        if seen.insert(url.clone()) {
            out.push(CandidateUrl { url, kind, label });
        }
    }
}

/// Undo the escaping that JSON and HTML attributes put on URLs.
fn unescape(text: &str) -> String {
    text.replace("\\/", "/")
        .replace("\\u002F", "/")
        .replace("\\u002f", "/")
        .replace("\\u0026", "&")
        .replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Absolute and attribute URL matches in order of appearance.
fn url_matches(text: &str) -> Vec<String> {
    let text = unescape(text);
    let mut hits: Vec<(usize, String)> = ABSOLUTE_URL
        .find_iter(&text)
        .map(|m| (m.start(), m.as_str().to_string()))
        .collect();
    hits.extend(ATTR_URL.captures_iter(&text).filter_map(|c| {
        let m = c.get(1)?;
        Some((m.start(), m.as_str().to_string()))
    }));
    hits.sort_by_key(|(pos, _)| *pos);

    hits.into_iter()
        .map(|(_, raw)| raw.trim_end_matches(['.', ',', ';']).to_string())
        .collect()
}

/// `(file, label)` pairs from JSON-ish player source lists.
fn labeled_sources(script: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for caps in SOURCE_LIST.captures_iter(script) {
        let cleaned = TRAILING_COMMA.replace_all(&caps[1], "$1");
        let Ok(value) = serde_json::from_str::<Value>(&cleaned) else {
            continue;
        };
        let items = match &value {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => map
                .get("sources")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice),
            _ => continue,
        };
        for item in items {
            let file = item.get("file").and_then(Value::as_str);
            let label = item.get("label").and_then(Value::as_str);
            if let (Some(file), Some(label)) = (file, label) {
                pairs.push((unescape(file), label.trim().to_string()));
            }
        }
    }
    pairs
}
