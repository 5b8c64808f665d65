use super::{CacheError, CacheStore};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    set_success: AtomicU64,
    set_error: AtomicU64,
    delete_success: AtomicU64,
    delete_error: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hit_count: u64,
    pub miss_count: u64,
    pub set_success: u64,
    pub set_error: u64,
    pub delete_success: u64,
    pub delete_error: u64,
}

impl CacheMetrics {
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            set_success: self.set_success.load(Ordering::Relaxed),
            set_error: self.set_error.load(Ordering::Relaxed),
            delete_success: self.delete_success.load(Ordering::Relaxed),
            delete_error: self.delete_error.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl MetricsSnapshot {
    /// Prometheus text exposition, one `cache_collector` sample per counter
    #[must_use]
    pub fn render(&self, service: &str, store: &str) -> String {
        let mut out = String::new();
        out.push_str("# HELP cache_collector This represent the number of items in cache\n");
        out.push_str("# TYPE cache_collector gauge\n");
        for (metric, value) in [
            ("hit_count", self.hit_count),
            ("miss_count", self.miss_count),
            ("set_success", self.set_success),
            ("set_error", self.set_error),
            ("delete_success", self.delete_success),
            ("delete_error", self.delete_error),
        ] {
            let _ = writeln!(
                out,
                "cache_collector{{metric=\"{metric}\",service=\"{service}\",store=\"{store}\"}} {value}"
            );
        }
        out
    }
}

/// Wraps a backend and counts every operation
///
/// Backend errors on `get` are counted as misses since the resolver treats
/// them the same way.
pub struct MetricStore {
    inner: Box<dyn CacheStore>,
    metrics: CacheMetrics,
}

impl MetricStore {
    #[must_use]
    pub fn new(inner: Box<dyn CacheStore>) -> Self {
        Self {
            inner,
            metrics: CacheMetrics::default(),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}

#[async_trait]
impl CacheStore for MetricStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let result = self.inner.get(key).await;
        match &result {
            Ok(Some(_)) => bump(&self.metrics.hits),
            Ok(None) | Err(_) => bump(&self.metrics.misses),
        }
        result
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let result = self.inner.set(key, value, ttl).await;
        bump(if result.is_ok() {
            &self.metrics.set_success
        } else {
            &self.metrics.set_error
        });
        result
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let result = self.inner.delete(key).await;
        bump(if result.is_ok() {
            &self.metrics.delete_success
        } else {
            &self.metrics.delete_error
        });
        result
    }

    fn backend(&self) -> &'static str {
        self.inner.backend()
    }
}
