//! Thread-safe metrics collection system
//!
//! Provides atomic counters and mutex-protected collections for tracking
//! protocol parsing, code generation, dispatch, and demo service activity.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

const MAX_DISPATCH_SAMPLES: usize = 1000;

/// Thread-safe metrics collector using atomics and mutexes
pub struct MetricsCollector {
    // Schema and generation counters
    protocols_parsed: AtomicU64,
    generations: AtomicU64,
    files_generated: AtomicU64,

    // Dispatch counters (atomic for high frequency)
    messages_dispatched: AtomicU64,
    dispatch_failures: AtomicU64,

    // Handler durations in microseconds, bounded
    dispatch_times: Mutex<Vec<u64>>,

    // Per event kind and per failure label
    kind_stats: Mutex<HashMap<String, KindStats>>,
    failure_labels: Mutex<HashMap<String, u64>>,

    // Demo service
    sessions_created: AtomicU64,
    archives_built: AtomicU64,
    uptime_start: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            protocols_parsed: AtomicU64::new(0),
            generations: AtomicU64::new(0),
            files_generated: AtomicU64::new(0),
            messages_dispatched: AtomicU64::new(0),
            dispatch_failures: AtomicU64::new(0),
            dispatch_times: Mutex::new(Vec::new()),
            kind_stats: Mutex::new(HashMap::new()),
            failure_labels: Mutex::new(HashMap::new()),
            sessions_created: AtomicU64::new(0),
            archives_built: AtomicU64::new(0),
            uptime_start: AtomicU64::new(current_timestamp()),
        }
    }

    pub fn record_protocol_parsed(&self) {
        self.protocols_parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generation(&self, files: u64) {
        self.generations.fetch_add(1, Ordering::Relaxed);
        self.files_generated.fetch_add(files, Ordering::Relaxed);
    }

    pub fn record_dispatch_success(&self, event_kind: &str, duration: Duration) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.dispatch_times.lock() {
            times.push(duration.as_micros() as u64);
            if times.len() > MAX_DISPATCH_SAMPLES {
                times.remove(0);
            }
        }

        if let Ok(mut stats) = self.kind_stats.lock() {
            let entry = stats.entry(event_kind.to_string()).or_default();
            entry.dispatched += 1;
            entry.last_dispatch = current_timestamp();
        }
    }

    /// `label` is the failure category, e.g. `validation`
    pub fn record_dispatch_failure(&self, label: &str) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut labels) = self.failure_labels.lock() {
            *labels.entry(label.to_string()).or_insert(0) += 1;
        }
    }

    pub fn record_session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_archive_built(&self) {
        self.archives_built.fetch_add(1, Ordering::Relaxed);
    }

    // Reset all metrics (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.protocols_parsed,
            &self.generations,
            &self.files_generated,
            &self.messages_dispatched,
            &self.dispatch_failures,
            &self.sessions_created,
            &self.archives_built,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.uptime_start
            .store(current_timestamp(), Ordering::Relaxed);

        if let Ok(mut times) = self.dispatch_times.lock() {
            times.clear();
        }
        if let Ok(mut stats) = self.kind_stats.lock() {
            stats.clear();
        }
        if let Ok(mut labels) = self.failure_labels.lock() {
            labels.clear();
        }
    }

    /// Average and percentiles of handler durations, in milliseconds
    fn dispatch_time_statistics(&self) -> (f64, f64, f64, f64) {
        let Ok(times) = self.dispatch_times.lock() else {
            return (0.0, 0.0, 0.0, 0.0);
        };
        if times.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();
        let to_ms = |micros: f64| micros / 1000.0;

        let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        (
            to_ms(avg),
            to_ms(percentile(&sorted, 50.0)),
            to_ms(percentile(&sorted, 95.0)),
            to_ms(percentile(&sorted, 99.0)),
        )
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg_handler_time_ms, p50, p95, p99) = self.dispatch_time_statistics();

        let by_kind: BTreeMap<String, KindStats> = self
            .kind_stats
            .lock()
            .map(|stats| stats.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        let failures_by_label: BTreeMap<String, u64> = self
            .failure_labels
            .lock()
            .map(|labels| labels.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default();

        MetricsSnapshot {
            schema: SchemaMetrics {
                protocols_parsed: self.protocols_parsed.load(Ordering::Relaxed),
                generations: self.generations.load(Ordering::Relaxed),
                files_generated: self.files_generated.load(Ordering::Relaxed),
            },
            dispatch: DispatchMetrics {
                messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
                dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
                avg_handler_time_ms,
                handler_time_p50_ms: p50,
                handler_time_p95_ms: p95,
                handler_time_p99_ms: p99,
                by_kind,
                failures_by_label,
            },
            service: ServiceMetrics {
                sessions_created: self.sessions_created.load(Ordering::Relaxed),
                archives_built: self.archives_built.load(Ordering::Relaxed),
                uptime_seconds: now.saturating_sub(self.uptime_start.load(Ordering::Relaxed)),
            },
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct KindStats {
    pub dispatched: u64,
    pub last_dispatch: u64,
}

// Public metrics structures
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub schema: SchemaMetrics,
    pub dispatch: DispatchMetrics,
    pub service: ServiceMetrics,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct SchemaMetrics {
    pub protocols_parsed: u64,
    pub generations: u64,
    pub files_generated: u64,
}

#[derive(Debug, Serialize)]
pub struct DispatchMetrics {
    pub messages_dispatched: u64,
    pub dispatch_failures: u64,
    pub avg_handler_time_ms: f64,
    pub handler_time_p50_ms: f64,
    pub handler_time_p95_ms: f64,
    pub handler_time_p99_ms: f64,
    pub by_kind: BTreeMap<String, KindStats>,
    pub failures_by_label: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct ServiceMetrics {
    pub sessions_created: u64,
    pub archives_built: u64,
    pub uptime_seconds: u64,
}

// Helper functions
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let len = sorted_data.len();
    let index = (percentile / 100.0) * (len - 1) as f64;

    if index.fract() == 0.0 {
        sorted_data[index as usize] as f64
    } else {
        let lower_index = index.floor() as usize;
        let upper_index = index.ceil() as usize;
        let lower_value = sorted_data[lower_index] as f64;
        let upper_value = sorted_data[upper_index] as f64;

        lower_value + (upper_value - lower_value) * index.fract()
    }
}
