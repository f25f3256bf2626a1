//! Per-item processing metadata and aggregate performance statistics.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Serialize, Serializer};

use crate::cache::CacheStats;

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Timing record of one processed item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingMetadata {
    /// Title or other caller-supplied identifier
    pub item_id: String,
    pub word_count: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Words per second; 0 when no time was measured
    pub throughput: f64,
    /// True when the item was served from the dedup cache or note store
    pub cache_hit: bool,
    pub recorded_at: DateTime<Utc>,
}

impl ProcessingMetadata {
    pub fn new(item_id: impl Into<String>, word_count: usize, elapsed: Duration, cache_hit: bool) -> Self {
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 { word_count as f64 / secs } else { 0.0 };
        Self {
            item_id: item_id.into(),
            word_count,
            elapsed,
            throughput,
            cache_hit,
            recorded_at: Utc::now(),
        }
    }
}

impl fmt::Display for ProcessingMetadata {
    /// Multi-line summary for display:
    ///
    /// ```text
    /// Item: speech.txt
    /// Words: 12,345
    /// Time: 1 minute 3.5 seconds
    /// Speed: 194.4 words/sec
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Item: {}", self.item_id)?;
        writeln!(f, "Words: {}", group_thousands(self.word_count))?;
        writeln!(f, "Time: {}", format_elapsed(self.elapsed))?;
        if self.throughput >= 1.0 {
            write!(f, "Speed: {:.1} words/sec", self.throughput)
        } else {
            write!(f, "Speed: {:.0} words/ms", self.throughput * 1000.0)
        }
    }
}

fn plural(count: u64) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Human-readable duration: milliseconds below a second, then seconds,
/// minutes and hours.
///
/// ```
/// use fakecheck_core::metrics::format_elapsed;
/// use std::time::Duration;
///
/// assert_eq!(format_elapsed(Duration::from_millis(250)), "250 ms");
/// assert_eq!(format_elapsed(Duration::from_millis(12_500)), "12.50 seconds");
/// assert_eq!(format_elapsed(Duration::from_secs(60)), "1 minute");
/// assert_eq!(format_elapsed(Duration::from_secs(125)), "2 minutes 5.0 seconds");
/// assert_eq!(format_elapsed(Duration::from_secs(3_720)), "1 hour 2 minutes");
/// ```
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();
    if seconds < 1.0 {
        format!("{} ms", elapsed.as_millis())
    } else if seconds < 60.0 {
        format!("{:.2} seconds", seconds)
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0).floor() as u64;
        let rest = seconds - (minutes * 60) as f64;
        if rest < 1.0 {
            format!("{} minute{}", minutes, plural(minutes))
        } else {
            let unit = if rest == 1.0 { "second" } else { "seconds" };
            format!("{} minute{} {:.1} {}", minutes, plural(minutes), rest, unit)
        }
    } else {
        let total = elapsed.as_secs();
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        format!("{} hour{} {} minute{}", hours, plural(hours), minutes, plural(minutes))
    }
}

fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Aggregate view returned by
/// [`ProcessingManager::get_performance_stats`](crate::ProcessingManager::get_performance_stats)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    /// Items recorded since the manager was created
    pub total_processed: u64,
    pub cache_hits: u64,
    pub total_elapsed_secs: f64,
    pub avg_elapsed_secs: f64,
    /// 95th percentile over the retained history window
    pub p95_elapsed_secs: f64,
    /// Total words over total elapsed time
    pub avg_throughput: f64,
    /// Per named cache; empty when caching is disabled
    pub caches: BTreeMap<String, CacheStats>,
}

#[derive(Debug)]
struct TrackerInner {
    history: VecDeque<ProcessingMetadata>,
    total_processed: u64,
    cache_hits: u64,
    total_words: u64,
    total_elapsed: Duration,
}

/// Bounded processing history plus lifetime totals
///
/// The history keeps the most recent `capacity` records; totals cover every
/// record ever added.
#[derive(Debug)]
pub struct PerformanceTracker {
    capacity: usize,
    inner: Mutex<TrackerInner>,
}

impl PerformanceTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(TrackerInner {
                history: VecDeque::with_capacity(capacity.min(1024)),
                total_processed: 0,
                cache_hits: 0,
                total_words: 0,
                total_elapsed: Duration::ZERO,
            }),
        }
    }

    pub fn record(&self, metadata: ProcessingMetadata) {
        let mut inner = self.inner.lock();
        inner.total_processed += 1;
        inner.total_words += metadata.word_count as u64;
        inner.total_elapsed += metadata.elapsed;
        if metadata.cache_hit {
            inner.cache_hits += 1;
        }
        if inner.history.len() >= self.capacity {
            inner.history.pop_front();
        }
        inner.history.push_back(metadata);
    }

    /// Retained records, oldest first
    pub fn history(&self) -> Vec<ProcessingMetadata> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Aggregates without cache statistics; all zero before the first record
    pub fn summary(&self) -> PerformanceStats {
        let inner = self.inner.lock();
        let total_secs = inner.total_elapsed.as_secs_f64();
        let avg_elapsed_secs = if inner.total_processed == 0 {
            0.0
        } else {
            total_secs / inner.total_processed as f64
        };
        let avg_throughput = if total_secs > 0.0 {
            inner.total_words as f64 / total_secs
        } else {
            0.0
        };

        PerformanceStats {
            total_processed: inner.total_processed,
            cache_hits: inner.cache_hits,
            total_elapsed_secs: total_secs,
            avg_elapsed_secs,
            p95_elapsed_secs: p95(inner.history.iter().map(|m| m.elapsed)).as_secs_f64(),
            avg_throughput,
            caches: BTreeMap::new(),
        }
    }
}

fn p95(samples: impl Iterator<Item = Duration>) -> Duration {
    let mut sorted: Vec<Duration> = samples.collect();
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    sorted.sort();
    let index = (sorted.len() as f64 * 0.95) as usize;
    sorted[index.min(sorted.len() - 1)]
}
