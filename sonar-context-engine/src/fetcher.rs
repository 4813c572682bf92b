//! Per-request source fetching with a file cache.
//!
//! Each distinct component is fetched in full at most once per request and
//! sliced for every issue that references it. Distinct components are
//! fetched in parallel with a bounded number of outbound calls.
//!
//! Failure handling per component:
//!   * sub-timeout elapsed        → `FetchFailure::Timeout`, no retry
//!   * transient upstream/network → one retry after a backoff, then
//!                                  `FetchFailure::Unavailable`
//!   * anything else              → `FetchFailure::Unavailable`
//!
//! Failures are cached as negative entries, so the same broken file is not
//! retried for every issue on it.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::errors::SonarContextError;
use crate::locator::WindowBounds;
use crate::model::{SourceLine, SourceWindow};
use crate::source_providers::SourceProvider;

/// Why a component's source could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    Unavailable,
    Timeout,
}

/// Cached state of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    Loaded(Vec<SourceLine>),
    Failed(FetchFailure),
}

/// Request-scoped file cache keyed by component.
#[derive(Debug, Default)]
pub struct FileCache {
    entries: HashMap<String, CacheEntry>,
}

impl FileCache {
    pub fn get(&self, component: &str) -> Option<&CacheEntry> {
        self.entries.get(component)
    }

    pub fn contains(&self, component: &str) -> bool {
        self.entries.contains_key(component)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, component: String, entry: CacheEntry) {
        self.entries.entry(component).or_insert(entry);
    }
}

/// Fetch settings taken from [`EngineConfig`].
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub per_file_timeout: Duration,
    pub retry_backoff: Duration,
    pub concurrency: usize,
}

impl From<&EngineConfig> for FetchPolicy {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            per_file_timeout: cfg.per_file_timeout,
            retry_backoff: cfg.retry_backoff,
            concurrency: cfg.fetch_concurrency.max(1),
        }
    }
}

/// Fetches and windows source text for one request.
#[derive(Debug)]
pub struct SourceFetcher<'a> {
    provider: &'a SourceProvider,
    policy: FetchPolicy,
    cache: FileCache,
}

impl<'a> SourceFetcher<'a> {
    pub fn new(provider: &'a SourceProvider, policy: FetchPolicy) -> Self {
        Self {
            provider,
            policy,
            cache: FileCache::default(),
        }
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// Loads every not-yet-cached component, `policy.concurrency` at a time.
    #[instrument(name = "prefetch_sources", skip_all)]
    pub async fn prefetch<I, S>(&mut self, components: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let missing: Vec<String> = components
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .filter(|c| !self.cache.contains(c) && seen.insert(c.clone()))
            .collect();

        if missing.is_empty() {
            debug!("prefetch: every component already cached");
            return;
        }

        info!(
            components = missing.len(),
            concurrency = self.policy.concurrency,
            "fetching source files"
        );

        let provider = self.provider;
        let policy = self.policy;
        let results: Vec<(String, CacheEntry)> = stream::iter(missing)
            .map(|component| async move {
                let entry = fetch_one(provider, &component, policy).await;
                (component, entry)
            })
            .buffer_unordered(policy.concurrency)
            .collect()
            .await;

        for (component, entry) in results {
            self.cache.insert(component, entry);
        }
    }

    /// Returns the window for `bounds`, fetching the file if needed.
    pub async fn window(&mut self, bounds: &WindowBounds) -> Result<SourceWindow, FetchFailure> {
        if !self.cache.contains(&bounds.component) {
            let entry = fetch_one(self.provider, &bounds.component, self.policy).await;
            self.cache.insert(bounds.component.clone(), entry);
        }
        self.cached_window(bounds)
    }

    /// Slices an already cached component; never suspends.
    pub fn cached_window(&self, bounds: &WindowBounds) -> Result<SourceWindow, FetchFailure> {
        match self.cache.get(&bounds.component) {
            Some(CacheEntry::Loaded(lines)) => Ok(slice_window(lines, bounds)),
            Some(CacheEntry::Failed(failure)) => Err(*failure),
            None => Err(FetchFailure::Unavailable),
        }
    }
}

/// Fetches one file with the sub-timeout and the single retry.
async fn fetch_one(provider: &SourceProvider, component: &str, policy: FetchPolicy) -> CacheEntry {
    let mut attempt = 1u8;
    loop {
        let outcome = tokio::time::timeout(policy.per_file_timeout, provider.fetch_file(component));
        match outcome.await {
            Ok(Ok(lines)) => {
                debug!(component, lines = lines.len(), attempt, "source fetched");
                return CacheEntry::Loaded(lines);
            }
            Err(_) | Ok(Err(SonarContextError::Timeout)) => {
                warn!(component, timeout = ?policy.per_file_timeout, "source fetch timed out");
                return CacheEntry::Failed(FetchFailure::Timeout);
            }
            Ok(Err(err)) if attempt == 1 && is_retryable(&err) => {
                warn!(component, %err, backoff = ?policy.retry_backoff, "source fetch failed, retrying");
                tokio::time::sleep(policy.retry_backoff).await;
                attempt += 1;
            }
            Ok(Err(err)) => {
                warn!(component, %err, attempt, "source unavailable");
                return CacheEntry::Failed(FetchFailure::Unavailable);
            }
        }
    }
}

/// Network failures, throttling and server errors may pass on a second try.
fn is_retryable(err: &SonarContextError) -> bool {
    match err {
        SonarContextError::Upstream { status, .. } => {
            matches!(status, 408 | 429) || *status >= 500
        }
        other => other.is_transient(),
    }
}

/// Cuts `[from_line, to_line]` out of a file, clamped to its length.
///
/// A window that starts past the end of the file comes back empty, with
/// both bounds pinned to the last line so they never invert.
pub fn slice_window(lines: &[SourceLine], bounds: &WindowBounds) -> SourceWindow {
    let file_len = lines.iter().map(|l| l.number).max().unwrap_or(0);
    let to_line = bounds.to_line.min(file_len);
    let from_line = bounds.from_line.min(to_line);

    let window: Vec<SourceLine> = lines
        .iter()
        .filter(|l| l.number >= bounds.from_line && l.number <= to_line)
        .cloned()
        .collect();

    SourceWindow {
        component: bounds.component.clone(),
        from_line,
        to_line,
        lines: window,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::window_bounds;
    use crate::sonar::normalize::text_to_lines;

    fn file(n: u32) -> Vec<SourceLine> {
        let text = (1..=n).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        text_to_lines(&text)
    }

    #[test]
    fn window_is_clamped_to_file_length() {
        let w = slice_window(&file(20), &window_bounds("p:a", 10, 25));
        assert_eq!(w.from_line, 1);
        assert_eq!(w.to_line, 20);
        assert_eq!(w.lines.len(), 20);
        assert_eq!(w.lines.first().map(|l| l.number), Some(1));
        assert_eq!(w.lines.last().map(|l| l.number), Some(20));
    }

    #[test]
    fn window_inside_a_long_file_is_exact() {
        let w = slice_window(&file(200), &window_bounds("p:a", 100, 25));
        assert_eq!((w.from_line, w.to_line), (75, 125));
        assert_eq!(w.lines.len(), 51);
        assert_eq!(w.lines[25].text, "line 100");
    }

    #[test]
    fn window_past_end_of_file_is_empty() {
        let w = slice_window(&file(5), &window_bounds("p:a", 80, 25));
        assert!(w.lines.is_empty());
        assert_eq!((w.from_line, w.to_line), (5, 5));

        let empty = slice_window(&[], &window_bounds("p:a", 3, 25));
        assert!(empty.lines.is_empty());
        assert!(empty.from_line <= empty.to_line);
    }

    #[test]
    fn retry_policy_skips_client_errors() {
        let not_found = SonarContextError::Upstream { status: 404, body: String::new() };
        let throttled = SonarContextError::Upstream { status: 429, body: String::new() };
        let bad_gateway = SonarContextError::Upstream { status: 502, body: String::new() };
        assert!(!is_retryable(&not_found));
        assert!(is_retryable(&throttled));
        assert!(is_retryable(&bad_gateway));
        assert!(is_retryable(&SonarContextError::Transport("reset".into())));
        assert!(!is_retryable(&SonarContextError::InvalidResponse("x".into())));
    }

    #[test]
    fn cache_keeps_the_first_entry() {
        let mut cache = FileCache::default();
        cache.insert("p:a".into(), CacheEntry::Failed(FetchFailure::Timeout));
        cache.insert("p:a".into(), CacheEntry::Loaded(file(1)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("p:a"), Some(&CacheEntry::Failed(FetchFailure::Timeout)));
    }
}
