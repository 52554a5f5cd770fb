//! Caching layer for upstream weather lookups.
//!
//! Every fetch attempt is cached for a fixed TTL, including failures, so a
//! failing or nonexistent location is asked for upstream at most once per
//! window. Freshness is judged from each entry's own `cached_at`; stale
//! entries are removed just before they are replaced.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use moka::ops::compute::Op;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{CodeScheme, LocationCode, WeatherReading};
use crate::envcanada::FetchError;

/// Source of current conditions for a location.
///
/// This abstraction allows the coordinator to be tested with fake upstreams.
pub trait WeatherSource: Send + Sync {
    /// Fetch and parse current conditions for `code`.
    fn fetch(
        &self,
        code: &LocationCode,
    ) -> impl Future<Output = Result<WeatherReading, FetchError>> + Send;
}

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry, successful or not, is served before refetching.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// Outcome of one fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// When the attempt completed.
    pub cached_at: Instant,
    /// The parsed reading, or the empty reading on failure.
    pub reading: WeatherReading,
    /// Whether the fetch succeeded.
    pub success: bool,
}

impl CacheEntry {
    /// Entry for a successful fetch, stamped now.
    pub fn success(reading: WeatherReading) -> Self {
        Self {
            cached_at: Instant::now(),
            reading,
            success: true,
        }
    }

    /// Negative entry for a failed fetch, stamped now.
    pub fn failure() -> Self {
        Self {
            cached_at: Instant::now(),
            reading: WeatherReading::empty(),
            success: false,
        }
    }

    /// Time since the entry was written.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.cached_at)
    }

    /// Whether the entry may still be served.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

/// Process-wide store of fetch outcomes, one entry per location code.
pub struct WeatherCache {
    entries: MokaCache<LocationCode, Arc<CacheEntry>>,
    ttl: Duration,
}

impl WeatherCache {
    /// Create an empty cache.
    ///
    /// The underlying map has no capacity bound and no expiry of its own.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: MokaCache::builder().build(),
            ttl: config.ttl,
        }
    }

    /// Freshness window for entries.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the entry for `code`, fresh or not.
    pub async fn get(&self, code: &LocationCode) -> Option<Arc<CacheEntry>> {
        self.entries.get(code).await
    }

    /// Store `entry` for `code`, replacing any previous one.
    pub async fn insert(&self, code: LocationCode, entry: CacheEntry) {
        self.entries.insert(code, Arc::new(entry)).await;
    }

    /// Remove the entry for `code` only if it is stale when checked.
    ///
    /// The check and the removal happen under moka's per-key lock, so an
    /// entry refreshed by a concurrent request in the meantime is kept.
    pub async fn remove_if_stale(&self, code: &LocationCode) {
        let ttl = self.ttl;
        self.entries
            .entry_by_ref(code)
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if !entry.value().is_fresh(Instant::now(), ttl) => Op::Remove,
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
    }

    /// Number of entries held.
    pub async fn entry_count(&self) -> u64 {
        // moka updates its counters lazily
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    /// Remove every entry.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

/// Weather source with caching.
///
/// Wraps a `WeatherSource`, validates incoming codes, and caches every
/// fetch outcome. Callers always receive a reading; failures surface only
/// as the empty reading.
pub struct CachedWeatherClient<S> {
    source: S,
    cache: WeatherCache,
    scheme: CodeScheme,
}

impl<S: WeatherSource> CachedWeatherClient<S> {
    /// Create a new cached client.
    pub fn new(source: S, scheme: CodeScheme, cache_config: &CacheConfig) -> Self {
        Self {
            source,
            cache: WeatherCache::new(cache_config),
            scheme,
        }
    }

    /// Returns whether `code` is acceptable under the active scheme.
    pub fn validate(&self, code: &str) -> bool {
        self.scheme.validate(code)
    }

    /// Get current conditions for `code`, using the cache if fresh.
    ///
    /// Returns the empty reading for empty or invalid codes (without
    /// touching the cache) and for failed fetches (which are cached).
    pub async fn get_weather(&self, code: &str) -> WeatherReading {
        if code.is_empty() {
            info!("received request with empty location code");
            return WeatherReading::empty();
        }

        info!(code, "received request for location code");

        let location = match LocationCode::parse(code, self.scheme) {
            Ok(location) => location,
            Err(e) => {
                warn!(code, reason = e.reason(), "invalid location code");
                return WeatherReading::empty();
            }
        };

        if let Some(entry) = self.cache.get(&location).await {
            if entry.is_fresh(Instant::now(), self.cache.ttl()) {
                info!(code, success = entry.success, "found cached data; sending");
                return entry.reading.clone();
            }

            debug!(code, age = ?entry.age(Instant::now()), "cached data is stale; evicting");
            self.cache.remove_if_stale(&location).await;
        }

        info!(code, "no cached data; fetching from upstream");

        match self.source.fetch(&location).await {
            Ok(reading) => {
                info!(code, "received valid data; caching");
                self.cache
                    .insert(location, CacheEntry::success(reading.clone()))
                    .await;
                reading
            }
            Err(e) => {
                info!(
                    code,
                    error = %e,
                    retry_after = %retry_after(self.cache.ttl()),
                    "upstream lookup failed; caching empty reading"
                );
                self.cache.insert(location, CacheEntry::failure()).await;
                WeatherReading::empty()
            }
        }
    }

    /// Access the underlying source for lookups that bypass the cache.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The active validation scheme.
    pub fn scheme(&self) -> CodeScheme {
        self.scheme
    }

    /// Get cache statistics.
    pub async fn cache_entry_count(&self) -> u64 {
        self.cache.entry_count().await
    }

    /// Invalidate all cached entries.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }
}

/// Local wall-clock time at which a failed code will next be tried.
fn retry_after(ttl: Duration) -> String {
    chrono::TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| chrono::Local::now().checked_add_signed(ttl))
        .map_or_else(
            || "unknown".to_string(),
            |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(30 * 60);

    /// Fake upstream that counts calls.
    ///
    /// Codes with a configured reading succeed; everything else answers 404.
    struct FakeSource {
        readings: HashMap<String, WeatherReading>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                readings: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn with(mut self, code: &str, reading: WeatherReading) -> Self {
            self.readings.insert(code.to_string(), reading);
            self
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl WeatherSource for FakeSource {
        async fn fetch(&self, code: &LocationCode) -> Result<WeatherReading, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.readings
                .get(code.as_str())
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    status: 404,
                    body: "Not Found".into(),
                })
        }
    }

    fn clear_5c() -> WeatherReading {
        WeatherReading {
            temperature: Some(5.0),
            condition: Some("Clear".into()),
            ..Default::default()
        }
    }

    fn client(source: FakeSource) -> CachedWeatherClient<FakeSource> {
        CachedWeatherClient::new(source, CodeScheme::TwoCharSuffix, &CacheConfig::default())
    }

    fn code(s: &str) -> LocationCode {
        LocationCode::parse(s, CodeScheme::TwoCharSuffix).unwrap()
    }

    #[test]
    fn default_config() {
        assert_eq!(CacheConfig::default().ttl, TTL);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_freshness() {
        let entry = CacheEntry::success(clear_5c());
        let start = entry.cached_at;

        assert!(entry.is_fresh(start, TTL));
        assert!(entry.is_fresh(start + TTL - Duration::from_secs(1), TTL));
        assert!(!entry.is_fresh(start + TTL, TTL));
        assert_eq!(entry.age(start + Duration::from_secs(90)), Duration::from_secs(90));
    }

    #[test]
    fn failure_entry_is_empty() {
        let entry = CacheEntry::failure();
        assert!(!entry.success);
        assert!(entry.reading.is_empty());
    }

    #[tokio::test]
    async fn empty_code_skips_everything() {
        let weather = client(FakeSource::new());

        assert!(weather.get_weather("").await.is_empty());
        assert_eq!(weather.source().call_count(), 0);
        assert_eq!(weather.cache_entry_count().await, 0);
    }

    #[tokio::test]
    async fn invalid_codes_never_reach_upstream_or_cache() {
        let weather = client(FakeSource::new().with("zz-01", clear_5c()));

        for bad in ["zz-01", "on-1", "on-123", "on_12", "ön-12", "../etc"] {
            assert!(weather.get_weather(bad).await.is_empty(), "{bad}");
        }

        assert_eq!(weather.source().call_count(), 0);
        assert_eq!(weather.cache_entry_count().await, 0);
    }

    #[tokio::test]
    async fn success_is_served_from_cache() {
        let weather = client(FakeSource::new().with("on-12", clear_5c()));

        let first = weather.get_weather("on-12").await;
        let second = weather.get_weather("on-12").await;

        assert_eq!(first, clear_5c());
        assert_eq!(second, first);
        assert_eq!(weather.source().call_count(), 1);
        assert_eq!(weather.cache_entry_count().await, 1);
    }

    #[tokio::test]
    async fn failure_is_negatively_cached() {
        let weather = client(FakeSource::new());

        assert!(weather.get_weather("on-99").await.is_empty());
        assert!(weather.get_weather("on-99").await.is_empty());

        assert_eq!(weather.source().call_count(), 1);

        let entry = weather.cache.get(&code("on-99")).await.unwrap();
        assert!(!entry.success);
        assert!(entry.reading.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn success_refetched_after_ttl() {
        let weather = client(FakeSource::new().with("on-12", clear_5c()));

        weather.get_weather("on-12").await;
        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        weather.get_weather("on-12").await;
        assert_eq!(weather.source().call_count(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(weather.get_weather("on-12").await, clear_5c());
        assert_eq!(weather.source().call_count(), 2);
        assert_eq!(weather.cache_entry_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_refetched_after_ttl() {
        let weather = client(FakeSource::new());

        weather.get_weather("on-99").await;
        tokio::time::advance(TTL).await;
        weather.get_weather("on-99").await;

        assert_eq!(weather.source().call_count(), 2);
        assert_eq!(weather.cache_entry_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_replaces_entry_timestamp() {
        let weather = client(FakeSource::new().with("on-12", clear_5c()));

        weather.get_weather("on-12").await;
        let first = weather.cache.get(&code("on-12")).await.unwrap();

        tokio::time::advance(TTL + Duration::from_secs(5)).await;
        weather.get_weather("on-12").await;
        let second = weather.cache.get(&code("on-12")).await.unwrap();

        assert!(second.cached_at > first.cached_at);
        assert!(second.success);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_refreshes_keep_one_entry_per_code() {
        let weather = client(
            FakeSource::new()
                .with("on-12", clear_5c())
                .with("bc-74", clear_5c()),
        );

        for _ in 0..5 {
            weather.get_weather("on-12").await;
            weather.get_weather("bc-74").await;
            weather.get_weather("nu-01").await;
            tokio::time::advance(TTL).await;
        }

        assert_eq!(weather.source().call_count(), 15);
        assert_eq!(weather.cache_entry_count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_removal_removes_stale_entry() {
        let cache = WeatherCache::new(&CacheConfig::default());
        cache.insert(code("on-12"), CacheEntry::success(clear_5c())).await;

        tokio::time::advance(TTL).await;
        cache.remove_if_stale(&code("on-12")).await;

        assert!(cache.get(&code("on-12")).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_removal_keeps_entry_refreshed_in_between() {
        let cache = WeatherCache::new(&CacheConfig::default());
        cache.insert(code("on-12"), CacheEntry::success(clear_5c())).await;

        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        // One request saw the stale entry; another refreshes it before the
        // first gets round to evicting.
        let seen = cache.get(&code("on-12")).await.unwrap();
        assert!(!seen.is_fresh(Instant::now(), TTL));
        cache.insert(code("on-12"), CacheEntry::success(clear_5c())).await;
        cache.remove_if_stale(&code("on-12")).await;

        let kept = cache.get(&code("on-12")).await.unwrap();
        assert!(kept.cached_at > seen.cached_at);
        assert_eq!(cache.entry_count().await, 1);
    }

    #[tokio::test]
    async fn stale_removal_of_missing_code_is_a_no_op() {
        let cache = WeatherCache::new(&CacheConfig::default());
        cache.remove_if_stale(&code("on-12")).await;
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn codes_are_cached_as_received() {
        let weather = client(
            FakeSource::new()
                .with("on-12", clear_5c())
                .with("ON-12", clear_5c()),
        );

        weather.get_weather("on-12").await;
        weather.get_weather("ON-12").await;

        assert_eq!(weather.source().call_count(), 2);
        assert_eq!(weather.cache_entry_count().await, 2);
    }

    #[tokio::test]
    async fn invalidate_cache_forces_refetch() {
        let weather = client(FakeSource::new().with("on-12", clear_5c()));

        weather.get_weather("on-12").await;
        weather.invalidate_cache();
        weather.get_weather("on-12").await;

        assert_eq!(weather.source().call_count(), 2);
    }

    #[tokio::test]
    async fn numeric_scheme_is_honoured() {
        let weather = CachedWeatherClient::new(
            FakeSource::new().with("on-143", clear_5c()),
            CodeScheme::NumericRange,
            &CacheConfig::default(),
        );

        assert_eq!(weather.scheme(), CodeScheme::NumericRange);
        assert!(weather.validate("on-143"));
        assert!(!weather.validate("on-ab"));
        assert_eq!(weather.get_weather("on-143").await, clear_5c());
        assert!(weather.get_weather("on-ab").await.is_empty());
        assert_eq!(weather.source().call_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_share_the_cache() {
        let weather = Arc::new(client(
            FakeSource::new()
                .with("on-12", clear_5c())
                .with("qc-14", clear_5c()),
        ));

        let requests = ["on-12", "qc-14", "ab-30"]
            .into_iter()
            .cycle()
            .take(60)
            .map(|c| {
                let weather = Arc::clone(&weather);
                tokio::spawn(async move { (c, weather.get_weather(c).await) })
            });
        let results = futures::future::join_all(requests).await;

        for result in results {
            let (c, reading) = result.unwrap();
            if c == "ab-30" {
                assert!(reading.is_empty());
            } else {
                assert_eq!(reading, clear_5c());
            }
        }

        // Cold requests may race to fetch, but never leave duplicates.
        assert_eq!(weather.cache_entry_count().await, 3);
        assert!(weather.source().call_count() >= 3);
        assert!(weather.source().call_count() <= 60);

        let calls = weather.source().call_count();
        weather.get_weather("on-12").await;
        assert_eq!(weather.source().call_count(), calls);
    }
}
