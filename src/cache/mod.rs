// Fingerprinted TTL cache for generated recommendations
// Memoizes recommendations by a normalized profile digest so repeat
// requests skip the slow external generator entirely.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::clock::{Clock, SystemClock};
use crate::core::types::{Recommendation, StudentProfile};

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
/// Soft cap; exceeding it on insert triggers a full expiry sweep
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Normalized subset of profile fields that defines cache identity
#[derive(Serialize)]
struct NormalizedProfile<'a> {
    education_type: &'a str,
    ssc_percent: f64,
    hsc_percent: f64,
    interests: Vec<&'a str>,
    preferred_field: &'a str,
    budget: f64,
    location_preference: &'a str,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Deterministic fingerprint of a profile's normalized field subset
///
/// Identical normalized input always yields the identical key. When the
/// normalized form cannot be serialized (non-finite numbers), falls back
/// to hashing the profile's debug form; caching is best-effort and never
/// blocks the request path.
pub fn fingerprint(profile: &StudentProfile) -> String {
    let mut interests: Vec<&str> = profile.interests.iter().map(|s| s.as_str()).collect();
    interests.sort_unstable();

    let normalized = NormalizedProfile {
        education_type: &profile.education_type,
        ssc_percent: round1(profile.ssc_percent),
        hsc_percent: round1(profile.hsc_percent),
        interests,
        preferred_field: &profile.preferred_field,
        budget: round1(profile.budget),
        location_preference: &profile.location_preference,
    };

    let payload = match serde_json::to_string(&normalized) {
        Ok(json) => json,
        Err(e) => {
            warn!("Falling back to degraded cache key: {}", e);
            format!("{:?}", profile)
        }
    };

    let digest = Sha256::digest(payload.as_bytes());
    format!("{:x}", digest)
}

struct CacheEntry {
    recommendation: Recommendation,
    inserted_at: Duration,
    profile_summary: String,
}

/// TTL-based store of prior recommendations with hit/miss accounting
///
/// Entries never outlive the TTL when read: expiry is checked lazily on
/// every access and the stale entry evicted, not just during sweeps.
pub struct RecommendationCache {
    entries: HashMap<String, CacheEntry>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    hits: u64,
    misses: u64,
}

impl RecommendationCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default(), Arc::new(SystemClock::new()))
    }

    pub fn with_config(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            clock,
            hits: 0,
            misses: 0,
        }
    }

    /// Cached recommendation for a profile, if present and not expired
    ///
    /// An expired entry is evicted as a side effect of the read and the
    /// lookup counts as a miss.
    pub fn get(&mut self, profile: &StudentProfile) -> Option<Recommendation> {
        let key = fingerprint(profile);
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(&key) {
            let age = now.saturating_sub(entry.inserted_at);
            if age < self.config.ttl {
                self.hits += 1;
                debug!("Cache hit for recommendation: {}...", &key[..8]);
                return Some(entry.recommendation.clone());
            }
            debug!("Evicting expired entry for profile {}", entry.profile_summary);
            self.entries.remove(&key);
        }

        self.misses += 1;
        None
    }

    /// Insert or overwrite the cached recommendation for a profile
    ///
    /// Exceeding the soft cap triggers a full sweep that removes every
    /// expired entry.
    pub fn put(&mut self, profile: &StudentProfile, recommendation: Recommendation) {
        let key = fingerprint(profile);
        let summary = format!(
            "{}_{}_{}",
            profile.education_type,
            profile.preferred_field,
            profile.interests.len()
        );

        self.entries.insert(
            key.clone(),
            CacheEntry {
                recommendation,
                inserted_at: self.clock.now(),
                profile_summary: summary,
            },
        );

        if self.entries.len() > self.config.max_entries {
            self.sweep_expired();
        }

        debug!("Cached recommendation: {}...", &key[..8]);
    }

    /// Remove every TTL-expired entry, returning how many were dropped
    pub fn sweep_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_sub(entry.inserted_at) < ttl);
        let removed = before - self.entries.len();
        if removed > 0 {
            info!("Cleaned up {} expired cache entries", removed);
        }
        removed
    }

    /// Drop all entries regardless of age
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl Default for RecommendationCache {
    fn default() -> Self {
        Self::new()
    }
}
