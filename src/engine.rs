// Orchestrating facade over the learning and optimization core
// Wires the cache check -> generate -> learn-optimize -> perf-optimize ->
// cache-write request path and the fire-and-forget feedback path.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::core::clock::{Clock, SystemClock};
use crate::core::types::{
    ProfileOutcome, Recommendation, RecommendationFeedback, StudentProfile,
};
use crate::error::DishaResult;
use crate::optimizer::{PerformanceInsights, PerformanceOptimizer, PreferenceReport};
use crate::reinforcement::{LearningInsights, ReinforcementLearner};

/// The external LLM-backed recommendation generator
///
/// Treated as a black box: it either returns a structured recommendation
/// or an error, which the engine propagates untouched.
pub trait RecommendationGenerator: Send + Sync {
    fn generate(&self, profile: &StudentProfile) -> DishaResult<Recommendation>;
}

/// Optional supplier of accumulated profile+outcome records, used by
/// preference prediction
pub trait ProfileArchive: Send + Sync {
    fn query_similar(&self, profile: &StudentProfile) -> DishaResult<Vec<ProfileOutcome>>;
}

/// Combined learning and performance report
#[derive(Debug, Clone, Serialize)]
pub struct SystemInsights {
    pub learning: LearningInsights,
    pub performance: PerformanceInsights,
}

/// Facade owning one learner and one performance optimizer
///
/// The request path is synchronous; the optimizer's background
/// maintenance task is the only concurrent piece and is stopped by
/// `shutdown`.
pub struct PathwayEngine {
    learner: Mutex<ReinforcementLearner>,
    optimizer: PerformanceOptimizer,
    clock: Arc<dyn Clock>,
}

impl PathwayEngine {
    pub fn new(learner: ReinforcementLearner, optimizer: PerformanceOptimizer) -> Self {
        Self::with_clock(learner, optimizer, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(
        learner: ReinforcementLearner,
        optimizer: PerformanceOptimizer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            learner: Mutex::new(learner),
            optimizer,
            clock,
        }
    }

    /// Produce a recommendation for a profile
    ///
    /// A cache hit short-circuits the generator entirely. On a miss the
    /// generator runs; its failure propagates and nothing is cached or
    /// learned. A successful generation always yields a recommendation,
    /// even if every optimization step internally degrades to passthrough.
    pub fn process_request(
        &self,
        profile: &StudentProfile,
        generator: &dyn RecommendationGenerator,
    ) -> DishaResult<Recommendation> {
        let started = self.clock.now();
        self.optimizer.note_request();

        if let Some(cached) = self.optimizer.get_cached_recommendation(profile) {
            info!("Serving recommendation from cache");
            return Ok(cached);
        }

        let base = generator.generate(profile)?;
        let refined = self.optimize(profile, &base);
        self.optimizer.cache_recommendation(profile, refined.clone());

        let elapsed = self.clock.now().saturating_sub(started).as_secs_f64();
        self.optimizer.record_response_time(elapsed);

        Ok(refined)
    }

    /// Apply learned-policy and performance transforms to a base
    /// recommendation; always returns a usable recommendation
    pub fn optimize(&self, profile: &StudentProfile, base: &Recommendation) -> Recommendation {
        let learned = match self.learner.lock() {
            Ok(learner) => learner.optimize_recommendation(profile, base),
            Err(e) => {
                warn!("Learner unavailable, passing recommendation through: {}", e);
                base.clone()
            }
        };
        self.optimizer.optimize_recommendation_generation(profile, &learned)
    }

    /// Deliver user feedback to the learner; fire-and-forget, never raises
    pub fn process_feedback(
        &self,
        profile: &StudentProfile,
        recommendation: &Recommendation,
        feedback: &RecommendationFeedback,
    ) {
        match self.learner.lock() {
            Ok(mut learner) => learner.learn_from_feedback(profile, recommendation, feedback),
            Err(e) => error!("Feedback dropped, learner unavailable: {}", e),
        }
        self.optimizer.note_request();
    }

    /// Cached recommendation for a profile, if present and fresh
    pub fn get_cached_or_absent(&self, profile: &StudentProfile) -> Option<Recommendation> {
        self.optimizer.get_cached_recommendation(profile)
    }

    /// Cache a recommendation for future requests
    pub fn cache_recommendation(&self, profile: &StudentProfile, recommendation: Recommendation) {
        self.optimizer.cache_recommendation(profile, recommendation);
    }

    /// Aggregate outcomes of similar past students via the archive;
    /// archive failure degrades to an empty report
    pub fn predict_preferences(
        &self,
        profile: &StudentProfile,
        archive: &dyn ProfileArchive,
    ) -> PreferenceReport {
        match archive.query_similar(profile) {
            Ok(records) => self.optimizer.predict_user_preferences(&records),
            Err(e) => {
                warn!("Profile archive unavailable: {}", e);
                PreferenceReport::default()
            }
        }
    }

    /// Combined learning and performance report; never raises
    pub fn insights(&self) -> SystemInsights {
        let learning = match self.learner.lock() {
            Ok(learner) => learner.get_learning_insights(),
            Err(e) => {
                error!("Learner unavailable for insights: {}", e);
                LearningInsights {
                    total_learning_episodes: 0,
                    success_rate: 0.0,
                    average_reward: 0.0,
                    current_epsilon: 0.0,
                    q_table_size: 0,
                    top_performing_states: Vec::new(),
                    performance_metrics: Default::default(),
                }
            }
        };

        SystemInsights {
            learning,
            performance: self.optimizer.get_performance_insights(),
        }
    }

    /// Stop the background maintenance task
    pub async fn shutdown(&self) {
        self.optimizer.shutdown().await;
    }
}
