//! Manifest resolution walk.
//!
//! One [`Resolver::resolve`] call is one walk. A coordinator loop owns the
//! work stack and the visited set; fetches run as futures it polls, at most
//! `max_concurrent_fetches` at a time. Every URL is fetched at most once per
//! walk, which is what bounds the walk on cyclic playlists.
//!
//! Failures never escape: a URL that cannot be fetched or parsed becomes a
//! fallback stream carrying its own URL.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::candidate::{height_hint, CandidateKind, CandidateUrl, MediaContainer};
use crate::config::EngineConfig;
use crate::error::{FetchError, Result};
use crate::http_client::Fetcher;
use crate::manifest::{parse_manifest, ManifestNode, VariantChild};

/// Stand-in for an unbounded deadline, about 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Quality metadata attached to a stream by whoever referenced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityHint {
    pub height: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<u64>,
}

impl QualityHint {
    pub fn from_height(height: u64) -> Self {
        Self {
            height,
            width: None,
            bandwidth: None,
        }
    }

    fn from_variant(child: &VariantChild) -> Option<Self> {
        let resolution = child.resolution.filter(|r| r.height > 0)?;
        Some(Self {
            height: resolution.height,
            width: Some(resolution.width),
            bandwidth: Some(child.bandwidth).filter(|b| *b > 0),
        })
    }
}

/// How a terminal stream was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOrigin {
    /// A media playlist, or a playlist walk that only found cycles.
    Leaf,
    /// Fetch or parse failed; the URL is kept as-is.
    Fallback,
    /// Non-HLS media linked from the page.
    Direct(MediaContainer),
}

/// A terminal result of the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStream {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<QualityHint>,
    pub origin: StreamOrigin,
    /// Label the page itself gave this source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Everything one walk produced.
#[derive(Debug, Default)]
pub struct WalkReport {
    /// Terminal streams in the order they were produced.
    pub streams: Vec<ResolvedStream>,
    /// Candidates the deadline cut off before they produced anything.
    pub abandoned: Vec<String>,
    pub deadline_hit: bool,
    /// Number of playlist fetches issued.
    pub fetches: usize,
}

#[derive(Debug)]
struct Task {
    url: String,
    root: usize,
    depth: usize,
    hint: Option<QualityHint>,
    label: Option<String>,
}

#[derive(Debug, Default)]
struct RootState {
    fetched: bool,
    produced: usize,
    pending: usize,
    /// Part of this root's subtree was already walked by another root.
    shared: bool,
}

/// Walks candidates down to playable streams.
pub struct Resolver<F> {
    fetcher: F,
    fetch_timeout: Duration,
    deadline: Duration,
    max_concurrent: usize,
}

impl<F: Fetcher> Resolver<F> {
    pub fn new(fetcher: F, config: &EngineConfig) -> Self {
        Self {
            fetcher,
            fetch_timeout: config.fetch_timeout(),
            deadline: config.deadline(),
            max_concurrent: config.max_concurrent_fetches.max(1),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Resolve all candidates within the configured deadline.
    pub async fn resolve(&self, candidates: &[CandidateUrl]) -> WalkReport {
        let now = Instant::now();
        // Deadlines too large to represent mean "no deadline".
        let deadline = now
            .checked_add(self.deadline)
            .unwrap_or_else(|| now + FAR_FUTURE);
        self.resolve_until(candidates, deadline).await
    }

    /// Resolve a single playlist URL.
    pub async fn resolve_url(&self, url: &str) -> WalkReport {
        let candidate = CandidateUrl {
            url: url.to_string(),
            kind: CandidateKind::Manifest,
            label: None,
        };
        self.resolve(std::slice::from_ref(&candidate)).await
    }

    /// Resolve all candidates, giving up at `deadline` and keeping whatever
    /// was collected by then.
    pub async fn resolve_until(&self, candidates: &[CandidateUrl], deadline: Instant) -> WalkReport {
        let mut report = WalkReport::default();
        let mut roots: Vec<RootState> = candidates.iter().map(|_| RootState::default()).collect();
        let mut stack: Vec<Task> = Vec::new();
        let mut visited: HashMap<String, usize> = HashMap::new();

        for (root, candidate) in candidates.iter().enumerate().rev() {
            match candidate.kind {
                CandidateKind::Manifest => {
                    roots[root].pending += 1;
                    stack.push(Task {
                        url: candidate.url.clone(),
                        root,
                        depth: 0,
                        hint: None,
                        label: candidate.label.clone(),
                    });
                }
                CandidateKind::DirectMedia(_) => {
                    roots[root].produced += 1;
                }
                CandidateKind::Unknown => {}
            }
        }
        // Direct media never needs a fetch; emit it up front in page order.
        for candidate in candidates {
            if let CandidateKind::DirectMedia(container) = candidate.kind {
                report.streams.push(ResolvedStream {
                    url: candidate.url.clone(),
                    hint: height_hint(&candidate.url).map(QualityHint::from_height),
                    origin: StreamOrigin::Direct(container),
                    label: candidate.label.clone(),
                });
            }
        }

        let mut in_flight = FuturesUnordered::new();
        loop {
            while in_flight.len() < self.max_concurrent {
                let Some(task) = stack.pop() else { break };
                match visited.entry(task.url.clone()) {
                    Entry::Occupied(owner) => {
                        if *owner.get() != task.root {
                            roots[task.root].shared = true;
                        }
                        roots[task.root].pending -= 1;
                        debug!(url = %task.url, depth = task.depth, "Already visited, skipping");
                        continue;
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(task.root);
                    }
                }
                if task.depth == 0 {
                    roots[task.root].fetched = true;
                }
                report.fetches += 1;
                in_flight.push(self.visit(task));
            }

            if in_flight.is_empty() {
                break;
            }

            let next = tokio::time::timeout_at(deadline, in_flight.next()).await;
            let (task, outcome) = match next {
                Ok(Some(done)) => done,
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        in_flight = in_flight.len(),
                        queued = stack.len(),
                        "Resolution deadline elapsed, returning partial results"
                    );
                    report.deadline_hit = true;
                    break;
                }
            };

            let state = &mut roots[task.root];
            state.pending -= 1;
            match outcome {
                Ok(ManifestNode::Leaf) => {
                    state.produced += 1;
                    report.streams.push(ResolvedStream {
                        url: task.url,
                        hint: task.hint,
                        origin: StreamOrigin::Leaf,
                        label: task.label,
                    });
                }
                Ok(ManifestNode::Variant(children)) => {
                    debug!(url = %task.url, children = children.len(), "Expanding variant playlist");
                    state.pending += children.len();
                    for child in children.iter().rev() {
                        stack.push(Task {
                            url: child.url.clone(),
                            root: task.root,
                            depth: task.depth + 1,
                            hint: QualityHint::from_variant(child),
                            label: None,
                        });
                    }
                }
                Err(e) => {
                    warn!(url = %task.url, kind = e.kind(), error = %e, "Falling back to raw URL");
                    state.produced += 1;
                    report.streams.push(ResolvedStream {
                        url: task.url,
                        hint: task.hint,
                        origin: StreamOrigin::Fallback,
                        label: task.label,
                    });
                }
            }
        }

        for (candidate, state) in candidates.iter().zip(&roots) {
            if state.produced > 0 || state.shared {
                continue;
            }
            if state.pending > 0 {
                report.abandoned.push(candidate.url.clone());
            } else if state.fetched {
                // Every reference led back into this walk: surface the
                // playlist itself once rather than nothing.
                debug!(url = %candidate.url, "Playlist only references itself");
                report.streams.push(ResolvedStream {
                    url: candidate.url.clone(),
                    hint: None,
                    origin: StreamOrigin::Leaf,
                    label: candidate.label.clone(),
                });
            }
        }

        info!(
            candidates = candidates.len(),
            streams = report.streams.len(),
            fetches = report.fetches,
            abandoned = report.abandoned.len(),
            "Resolution walk finished"
        );
        report
    }

    /// Fetch and classify one playlist.
    async fn visit(&self, task: Task) -> (Task, Result<ManifestNode>) {
        let outcome = self.fetch_and_parse(&task.url).await;
        (task, outcome)
    }

    async fn fetch_and_parse(&self, url: &str) -> Result<ManifestNode> {
        let timeout = self.fetch_timeout;
        let response = tokio::time::timeout(timeout, self.fetcher.fetch(url, timeout))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                timeout,
            })??;

        if !response.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            }
            .into());
        }

        Ok(parse_manifest(&response.body, url)?)
    }
}
