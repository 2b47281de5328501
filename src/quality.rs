//! Quality labeling and de-duplication.
//!
//! [`normalize`] is the single place where labels are chosen. The rules:
//!
//! 1. One entry per physical URL, placed where the URL was first seen.
//!    When a URL was reached several ways, the most specific label wins:
//!    page label, then height (`720p`), then container counter (`mp4_1`),
//!    then `auto`, then `fallback`. Ties go to the first one seen.
//! 2. Container counters count per container, starting at 1, after
//!    de-duplication, so they never skip.
//! 3. A label already taken by an earlier URL gets the first free `_N`
//!    suffix, starting at `_2`.
//! 4. Optionally, entries are stable-sorted by the height in their label,
//!    highest first, with height-less labels last.

use std::cmp::{Ordering, Reverse};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::candidate::MediaContainer;
use crate::resolver::{ResolvedStream, StreamOrigin};

/// Label for a playable playlist with no quality information.
pub const AUTO_LABEL: &str = "auto";
/// Label for a URL that could not be resolved.
pub const FALLBACK_LABEL: &str = "fallback";

static LABEL_HEIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\D)(\d{3,4})(?:p|$)").unwrap());

/// Ordering and presentation choices for [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPolicy {
    pub sort_by_quality: bool,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            sort_by_quality: true,
        }
    }
}

/// Ordered label → URL map with unique keys and unique values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityMap {
    entries: Vec<(String, String)>,
}

impl QualityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, u)| u.as_str())
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.entries.iter().any(|(_, u)| u == url)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, u)| (l.as_str(), u.as_str()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    /// Insert `url` under `label`, or under the first free `label_N` if
    /// `label` is taken. Returns the label used, or `None` if the URL is
    /// already present.
    pub fn insert_unique(&mut self, label: &str, url: &str) -> Option<String> {
        if self.contains_url(url) {
            return None;
        }
        let taken: HashSet<&str> = self.labels().collect();
        let chosen = if taken.contains(label) {
            (2..)
                .map(|n| format!("{label}_{n}"))
                .find(|candidate| !taken.contains(candidate.as_str()))
                .unwrap_or_else(|| label.to_string())
        } else {
            label.to_string()
        };
        self.entries.push((chosen.clone(), url.to_string()));
        Some(chosen)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn sort_by_height(&mut self) {
        self.entries
            .sort_by(|(a, _), (b, _)| compare_heights(label_height(a), label_height(b)));
    }
}

impl Serialize for QualityMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, url) in &self.entries {
            map.serialize_entry(label, url)?;
        }
        map.end()
    }
}

/// Height embedded in a label: `720p`, `1080p60`, `HD 720p`, `480`.
pub fn label_height(label: &str) -> Option<u64> {
    LABEL_HEIGHT
        .captures(label)
        .and_then(|c| c[1].parse().ok())
}

fn compare_heights(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => Reverse(a).cmp(&Reverse(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Label source, best first.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LabelSource {
    Page(String),
    Height(u64),
    Counter(MediaContainer),
    Auto,
    Fallback,
}

impl LabelSource {
    fn of(stream: &ResolvedStream) -> Self {
        if let Some(label) = stream.label.as_deref().filter(|l| !l.trim().is_empty()) {
            return Self::Page(label.trim().to_string());
        }
        if let Some(hint) = stream.hint {
            return Self::Height(hint.height);
        }
        match stream.origin {
            StreamOrigin::Direct(container) => Self::Counter(container),
            StreamOrigin::Leaf => Self::Auto,
            StreamOrigin::Fallback => Self::Fallback,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Page(_) => 0,
            Self::Height(_) => 1,
            Self::Counter(_) => 2,
            Self::Auto => 3,
            Self::Fallback => 4,
        }
    }
}

/// Turn resolved streams into the final quality map.
pub fn normalize(streams: &[ResolvedStream], policy: QualityPolicy) -> QualityMap {
    let mut order: Vec<(&str, LabelSource)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for stream in streams {
        let source = LabelSource::of(stream);
        match index.get(stream.url.as_str()) {
            Some(&i) => {
                if source.rank() < order[i].1.rank() {
                    order[i].1 = source;
                }
            }
            None => {
                index.insert(stream.url.as_str(), order.len());
                order.push((stream.url.as_str(), source));
            }
        }
    }

    let mut counters: HashMap<MediaContainer, usize> = HashMap::new();
    let mut map = QualityMap::new();
    for (url, source) in order {
        let label = match source {
            LabelSource::Page(label) => label,
            LabelSource::Height(height) => format!("{height}p"),
            LabelSource::Counter(container) => {
                let n = counters.entry(container).or_insert(0);
                *n += 1;
                format!("{}_{n}", container.label_prefix())
            }
            LabelSource::Auto => AUTO_LABEL.to_string(),
            LabelSource::Fallback => FALLBACK_LABEL.to_string(),
        };
        map.insert_unique(&label, url);
    }

    if policy.sort_by_quality {
        map.sort_by_height();
    }
    map
}
