// Performance optimization layer around the recommendation cache
// Applies learned-pattern post-processing and size limits to outgoing
// recommendations, tracks aggregate metrics, and runs a cancellable
// background maintenance loop for cache hygiene.

pub mod patterns;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::{fingerprint, CacheConfig, RecommendationCache};
use crate::core::clock::{Clock, SystemClock};
use crate::core::types::{
    OptimizationMetadata, ProfileOutcome, Recommendation, StudentProfile,
};
use patterns::{apply_pattern, default_patterns, find_similar_pattern, PathwayPattern};

/// Maximum career opportunities kept after generic trimming
pub const MAX_CAREER_OPPORTUNITIES: usize = 3;
/// Maximum skills kept after generic trimming
pub const MAX_SKILLS: usize = 5;
/// Window size for the running response-time average
const RESPONSE_TIME_WINDOW: usize = 1_000;

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Tick interval of the background maintenance loop
    pub maintenance_interval: Duration,
    /// Cache size above which a tick performs an expiry sweep
    pub cleanup_threshold: usize,
    pub cache: CacheConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            maintenance_interval: Duration::from_secs(60),
            cleanup_threshold: 500,
            cache: CacheConfig::default(),
        }
    }
}

/// Aggregate request-path counters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OptimizerMetrics {
    pub total_requests: u64,
    pub average_response_time: f64,
}

/// Report produced by `get_performance_insights`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceInsights {
    /// Hit percentage over all cache lookups, 0 with no lookups yet
    pub cache_hit_rate: f64,
    pub average_response_time: f64,
    pub total_requests: u64,
    pub cache_size: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Threshold-based tuning suggestions
    pub performance_recommendations: Vec<String>,
}

/// Frequency summary of outcomes for similar past students
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceReport {
    pub preferred_pathways: Vec<(String, u64)>,
    pub preferred_careers: Vec<(String, u64)>,
}

/// Best-effort maintenance work processed by the background loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceTask {
    CacheCleanup,
    PatternUpdate,
}

/// Wraps the recommendation cache with pattern-based post-processing,
/// metrics, and periodic background maintenance
///
/// Construction inside a tokio runtime starts the maintenance loop
/// immediately; outside one, call `spawn_maintenance` once a runtime is
/// available. The loop is stopped by `shutdown` (or cancelled on drop).
pub struct PerformanceOptimizer {
    config: OptimizerConfig,
    cache: Arc<Mutex<RecommendationCache>>,
    patterns: Arc<Mutex<Vec<PathwayPattern>>>,
    metrics: Arc<Mutex<OptimizerMetrics>>,
    response_times: Arc<Mutex<VecDeque<f64>>>,
    clock: Arc<dyn Clock>,
    tasks_tx: mpsc::UnboundedSender<MaintenanceTask>,
    tasks_rx: Mutex<Option<mpsc::UnboundedReceiver<MaintenanceTask>>>,
    cancel: CancellationToken,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl PerformanceOptimizer {
    pub fn new() -> Self {
        Self::with_config(OptimizerConfig::default(), Arc::new(SystemClock::new()))
    }

    pub fn with_config(config: OptimizerConfig, clock: Arc<dyn Clock>) -> Self {
        let (tasks_tx, tasks_rx) = mpsc::unbounded_channel();
        let cache = RecommendationCache::with_config(config.cache.clone(), clock.clone());

        let optimizer = Self {
            config,
            cache: Arc::new(Mutex::new(cache)),
            patterns: Arc::new(Mutex::new(default_patterns())),
            metrics: Arc::new(Mutex::new(OptimizerMetrics::default())),
            response_times: Arc::new(Mutex::new(VecDeque::with_capacity(RESPONSE_TIME_WINDOW))),
            clock,
            tasks_tx,
            tasks_rx: Mutex::new(Some(tasks_rx)),
            cancel: CancellationToken::new(),
            maintenance: Mutex::new(None),
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            optimizer.spawn_maintenance();
        }
        optimizer
    }

    /// Cached recommendation for a profile, if present and fresh
    ///
    /// Any cache fault degrades to a miss; the request path is never
    /// blocked or failed by the cache.
    pub fn get_cached_recommendation(&self, profile: &StudentProfile) -> Option<Recommendation> {
        match self.cache.lock() {
            Ok(mut cache) => cache.get(profile),
            Err(e) => {
                warn!("Cache lock unavailable, treating as miss: {}", e);
                None
            }
        }
    }

    /// Cache a recommendation for future requests (best-effort)
    pub fn cache_recommendation(&self, profile: &StudentProfile, recommendation: Recommendation) {
        match self.cache.lock() {
            Ok(mut cache) => cache.put(profile, recommendation),
            Err(e) => warn!("Cache lock unavailable, skipping cache write: {}", e),
        }
    }

    /// Apply learned-pattern and size-limiting transforms to a
    /// recommendation
    ///
    /// Pattern overrides fire on >= 2 overlapping interests; career and
    /// skill lists are truncated in original order; optimization metadata
    /// is attached. Never fails: on any internal fault the input is
    /// returned unmodified.
    pub fn optimize_recommendation_generation(
        &self,
        profile: &StudentProfile,
        base: &Recommendation,
    ) -> Recommendation {
        let started = self.clock.now();
        let mut optimized = base.clone();

        match self.patterns.lock() {
            Ok(patterns) => {
                if let Some(pattern) = find_similar_pattern(&patterns, profile) {
                    apply_pattern(&mut optimized, pattern);
                }
            }
            Err(e) => warn!("Pattern library unavailable: {}", e),
        }

        optimized
            .career_opportunities
            .truncate(MAX_CAREER_OPPORTUNITIES);
        optimized.skills_to_develop.truncate(MAX_SKILLS);

        optimized.metadata = Some(OptimizationMetadata {
            optimized: true,
            timestamp: chrono::Utc::now(),
            cache_key: fingerprint(profile),
        });

        let elapsed = self.clock.now().saturating_sub(started).as_secs_f64();
        self.record_response_time(elapsed);

        optimized
    }

    /// Count a processed request against the aggregate metrics
    pub fn note_request(&self) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.total_requests += 1;
        }
    }

    /// Fold a response time into the bounded running-average window
    pub fn record_response_time(&self, seconds: f64) {
        let average = match self.response_times.lock() {
            Ok(mut window) => {
                if window.len() >= RESPONSE_TIME_WINDOW {
                    window.pop_front();
                }
                window.push_back(seconds);
                window.iter().sum::<f64>() / window.len() as f64
            }
            Err(_) => return,
        };
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.average_response_time = average;
        }
    }

    /// Aggregate preferences of similar past students
    ///
    /// Counts pathway and career outcomes over the supplied records and
    /// reports the top five of each, most frequent first.
    pub fn predict_user_preferences(&self, records: &[ProfileOutcome]) -> PreferenceReport {
        fn top_counts(values: impl Iterator<Item = String>) -> Vec<(String, u64)> {
            let mut counts = std::collections::HashMap::new();
            for value in values {
                if !value.is_empty() {
                    *counts.entry(value).or_insert(0u64) += 1;
                }
            }
            let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
            ranked.sort_by(|(name_a, count_a), (name_b, count_b)| {
                count_b.cmp(count_a).then_with(|| name_a.cmp(name_b))
            });
            ranked.truncate(5);
            ranked
        }

        PreferenceReport {
            preferred_pathways: top_counts(records.iter().map(|r| r.target_pathway.clone())),
            preferred_careers: top_counts(records.iter().map(|r| r.career_choice.clone())),
        }
    }

    /// Queue a maintenance task for the background loop (best-effort)
    pub fn enqueue_task(&self, task: MaintenanceTask) {
        if self.tasks_tx.send(task).is_err() {
            debug!("Maintenance queue closed, dropping task {:?}", task);
        }
    }

    /// Performance insights with threshold-based tuning suggestions
    pub fn get_performance_insights(&self) -> PerformanceInsights {
        let (cache_size, cache_hits, cache_misses) = match self.cache.lock() {
            Ok(cache) => (cache.len(), cache.hits(), cache.misses()),
            Err(_) => (0, 0, 0),
        };
        let lookups = cache_hits + cache_misses;
        let cache_hit_rate = if lookups > 0 {
            cache_hits as f64 / lookups as f64 * 100.0
        } else {
            0.0
        };

        let metrics = self
            .metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default();

        let mut recommendations = Vec::new();
        if cache_hit_rate < 30.0 {
            recommendations.push(
                "Consider increasing cache TTL or improving cache key generation".to_string(),
            );
        }
        if metrics.average_response_time > 10.0 {
            recommendations.push(
                "Response time is high, consider optimizing generation or adding more caching"
                    .to_string(),
            );
        }
        if cache_size > 800 {
            recommendations
                .push("Cache size is large, consider tightening the eviction policy".to_string());
        }

        PerformanceInsights {
            cache_hit_rate,
            average_response_time: metrics.average_response_time,
            total_requests: metrics.total_requests,
            cache_size,
            cache_hits,
            cache_misses,
            performance_recommendations: recommendations,
        }
    }

    /// Start the background maintenance loop; idempotent
    ///
    /// Must be called from within a tokio runtime. Each tick drains the
    /// task queue, then sweeps the cache when it exceeds the cleanup
    /// threshold. Failures are logged and the loop keeps running until
    /// cancelled.
    pub fn spawn_maintenance(&self) {
        let mut guard = match self.maintenance.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!("Maintenance handle lock poisoned: {}", e);
                return;
            }
        };
        if guard.is_some() {
            return;
        }
        let Some(mut tasks_rx) = self.tasks_rx.lock().ok().and_then(|mut rx| rx.take()) else {
            return;
        };

        let cache = self.cache.clone();
        let patterns = self.patterns.clone();
        let cancel = self.cancel.clone();
        let interval = self.config.maintenance_interval;
        let cleanup_threshold = self.config.cleanup_threshold;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it so a fresh
            // optimizer does not sweep before any work happened.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Maintenance loop cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        while let Ok(task) = tasks_rx.try_recv() {
                            run_maintenance_task(task, &cache, &patterns);
                        }
                        match cache.lock() {
                            Ok(mut cache) => {
                                if cache.len() > cleanup_threshold {
                                    cache.sweep_expired();
                                }
                            }
                            Err(e) => error!("Maintenance sweep skipped: {}", e),
                        }
                    }
                }
            }
        });

        *guard = Some(handle);
        info!("Background maintenance started (interval {:?})", interval);
    }

    /// Cancel the maintenance loop and wait for it to finish
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.maintenance.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

fn run_maintenance_task(
    task: MaintenanceTask,
    cache: &Arc<Mutex<RecommendationCache>>,
    patterns: &Arc<Mutex<Vec<PathwayPattern>>>,
) {
    match task {
        MaintenanceTask::CacheCleanup => match cache.lock() {
            Ok(mut cache) => {
                cache.sweep_expired();
            }
            Err(e) => error!("Cache cleanup task failed: {}", e),
        },
        MaintenanceTask::PatternUpdate => match patterns.lock() {
            Ok(mut patterns) => {
                *patterns = default_patterns();
                debug!("Pattern library refreshed");
            }
            Err(e) => error!("Pattern update task failed: {}", e),
        },
    }
}

impl Default for PerformanceOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PerformanceOptimizer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
