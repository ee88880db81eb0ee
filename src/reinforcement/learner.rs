// Feedback-driven learner for pathway recommendations
// Owns the policy table, exploration schedule, metrics, and snapshot
// persistence; orchestrates encode -> infer -> reward -> update.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{error, info, warn};

use crate::core::types::{Recommendation, RecommendationFeedback, StudentProfile};
use crate::error::DishaResult;
use crate::reinforcement::action::{RecommendationAction, ALL_ACTIONS};
use crate::reinforcement::q_learning::{Experience, ExperienceBuffer, PolicyTable};
use crate::reinforcement::reward::reward_for_feedback;
use crate::reinforcement::snapshot::{ModelSnapshot, SnapshotStore, SNAPSHOT_VERSION};
use crate::reinforcement::state::{self, PathwayState};

/// Capacity of the reward history window used for insight reporting
pub const REWARD_HISTORY_CAPACITY: usize = 1_000;

/// Q-learning hyper-parameters and persistence cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Learning rate (alpha) - how quickly new information overrides old
    pub learning_rate: f64,
    /// Discount factor (gamma) - importance of future rewards
    pub discount_factor: f64,
    /// Initial exploration rate (epsilon)
    pub initial_epsilon: f64,
    /// Multiplicative epsilon decay per learning episode
    pub epsilon_decay: f64,
    /// Exploration floor
    pub epsilon_min: f64,
    /// Persist a snapshot every this many learning episodes
    pub save_interval: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.95,
            initial_epsilon: 0.1,
            epsilon_decay: 0.995,
            epsilon_min: 0.01,
            save_interval: 100,
        }
    }
}

/// Counters describing the learner's lifetime activity
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LearningMetrics {
    pub total_recommendations: u64,
    pub positive_feedback: u64,
    pub negative_feedback: u64,
    pub average_response_time: f64,
    pub learning_episodes: u64,
}

/// Report produced by `get_learning_insights`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningInsights {
    pub total_learning_episodes: u64,
    /// Positive / (positive + negative) as a percentage, 0 with no feedback
    pub success_rate: f64,
    /// Mean of the reward history window, 0 when empty
    pub average_reward: f64,
    pub current_epsilon: f64,
    /// Distinct states with at least one recorded action
    pub q_table_size: usize,
    /// Top five states ranked by their best action value
    pub top_performing_states: Vec<(PathwayState, f64)>,
    pub performance_metrics: LearningMetrics,
}

/// Reinforcement learner adapting recommendation policy from user feedback
///
/// Starts Fresh (empty table, initial epsilon) and becomes Warm once a
/// snapshot restores a non-empty table or the first update lands. All
/// persistence failures are absorbed: the learner keeps operating in
/// memory.
pub struct ReinforcementLearner {
    config: LearnerConfig,
    policy: PolicyTable,
    experience: ExperienceBuffer,
    reward_history: VecDeque<f64>,
    epsilon: f64,
    metrics: LearningMetrics,
    store: Box<dyn SnapshotStore>,
    rng: StdRng,
}

impl ReinforcementLearner {
    /// Create a learner with default hyper-parameters, restoring any
    /// snapshot held by the store
    pub fn new(store: Box<dyn SnapshotStore>) -> Self {
        Self::with_config(LearnerConfig::default(), store)
    }

    pub fn with_config(config: LearnerConfig, store: Box<dyn SnapshotStore>) -> Self {
        Self::with_rng(config, store, StdRng::from_os_rng())
    }

    /// Construct with an explicit RNG for deterministic exploration in tests
    pub fn with_rng(config: LearnerConfig, store: Box<dyn SnapshotStore>, rng: StdRng) -> Self {
        let mut learner = Self {
            epsilon: config.initial_epsilon,
            config,
            policy: PolicyTable::new(),
            experience: ExperienceBuffer::default(),
            reward_history: VecDeque::with_capacity(REWARD_HISTORY_CAPACITY),
            metrics: LearningMetrics::default(),
            store,
            rng,
        };
        learner.restore();
        learner
    }

    /// Current exploration rate
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Whether the learner holds any learned state
    pub fn is_warm(&self) -> bool {
        !self.policy.is_empty()
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn metrics(&self) -> &LearningMetrics {
        &self.metrics
    }

    /// Epsilon-greedy action pick over the full action space for a profile
    pub fn select_action(&mut self, profile: &StudentProfile) -> RecommendationAction {
        let state = state::encode(profile);
        self.policy
            .select_action(&state, &ALL_ACTIONS, self.epsilon, &mut self.rng)
    }

    /// Learn from user feedback for a delivered recommendation
    ///
    /// Updates the policy, counters, and exploration rate, and persists a
    /// snapshot every `save_interval` episodes. Persistence failures are
    /// logged, never propagated: in-memory learning remains valid.
    pub fn learn_from_feedback(
        &mut self,
        profile: &StudentProfile,
        recommendation: &Recommendation,
        feedback: &RecommendationFeedback,
    ) {
        let state = state::encode(profile);
        let action = RecommendationAction::infer_from_pathway(&recommendation.recommended_pathway);
        let reward = reward_for_feedback(feedback);
        let next_state = self.predict_next_state(profile);

        self.policy.update(
            state,
            action,
            reward,
            &next_state,
            self.config.learning_rate,
            self.config.discount_factor,
        );

        self.experience.push(Experience {
            state,
            action,
            reward,
            next_state,
            timestamp: chrono::Utc::now(),
        });

        self.metrics.learning_episodes += 1;
        if self.reward_history.len() >= REWARD_HISTORY_CAPACITY {
            self.reward_history.pop_front();
        }
        self.reward_history.push_back(reward);

        self.metrics.total_recommendations += 1;
        if reward > 0.0 {
            self.metrics.positive_feedback += 1;
        } else if reward < 0.0 {
            self.metrics.negative_feedback += 1;
        }

        let episodes = self.metrics.learning_episodes as f64;
        self.metrics.average_response_time +=
            (feedback.response_time - self.metrics.average_response_time) / episodes;

        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);

        if self.metrics.learning_episodes % self.config.save_interval == 0 {
            if let Err(e) = self.save() {
                error!("Failed to persist model snapshot: {}", e);
            }
        }

        info!(
            "Learned from feedback: reward={:.2}, epsilon={:.3}",
            reward, self.epsilon
        );
    }

    /// Re-apply the TD update over a random sample of retained transitions
    ///
    /// Skipped entirely while fewer than `batch_size` transitions have
    /// been recorded.
    pub fn experience_replay(&mut self, batch_size: usize) {
        if self.experience.len() < batch_size {
            return;
        }
        for _ in 0..batch_size {
            let index = self.rng.random_range(0..self.experience.len());
            if let Some(exp) = self.experience.get(index) {
                let (state, action, reward, next_state) =
                    (exp.state, exp.action, exp.reward, exp.next_state);
                self.policy.update(
                    state,
                    action,
                    reward,
                    &next_state,
                    self.config.learning_rate,
                    self.config.discount_factor,
                );
            }
        }
    }

    /// Refine a base recommendation using learned preferences
    ///
    /// States without recorded actions pass the base through unchanged.
    /// Otherwise the top three actions are considered and each with a
    /// value above 0.5 applies its bounded text transform; transforms are
    /// guarded so repeated application is a no-op.
    pub fn optimize_recommendation(
        &self,
        profile: &StudentProfile,
        base: &Recommendation,
    ) -> Recommendation {
        let state = state::encode(profile);
        if !self.policy.has_state(&state) {
            return base.clone();
        }

        let mut optimized = base.clone();
        for (action, q_value) in self.policy.top_actions(&state, 3) {
            if q_value > 0.5 {
                apply_action_adjustment(&mut optimized, action, q_value);
            }
        }
        optimized
    }

    /// Insights about the learning process; total, never fails
    pub fn get_learning_insights(&self) -> LearningInsights {
        let positive = self.metrics.positive_feedback;
        let negative = self.metrics.negative_feedback;
        let total_feedback = positive + negative;
        let success_rate = if total_feedback > 0 {
            positive as f64 / total_feedback as f64 * 100.0
        } else {
            0.0
        };

        let average_reward = if self.reward_history.is_empty() {
            0.0
        } else {
            self.reward_history.iter().sum::<f64>() / self.reward_history.len() as f64
        };

        LearningInsights {
            total_learning_episodes: self.metrics.learning_episodes,
            success_rate,
            average_reward,
            current_epsilon: self.epsilon,
            q_table_size: self.policy.state_count(),
            top_performing_states: self.policy.top_states(5),
            performance_metrics: self.metrics.clone(),
        }
    }

    /// Serialize the durable state and hand it to the snapshot store
    pub fn save(&self) -> DishaResult<()> {
        let snapshot = ModelSnapshot {
            version: SNAPSHOT_VERSION,
            policy: self.policy.entries(),
            epsilon: self.epsilon,
            metrics: self.metrics.clone(),
            reward_history: self.reward_history.iter().copied().collect(),
            saved_at: chrono::Utc::now(),
        };
        let blob = snapshot.to_json()?;
        self.store.persist(&blob)
    }

    /// The successor state for the Q-update. Currently a self-transition:
    /// the next state is re-encoded from the same profile, so each feedback
    /// event trains a single state in isolation. A future multi-step
    /// variant can derive this from the student's actual subsequent request
    /// without changing `learn_from_feedback`.
    fn predict_next_state(&self, profile: &StudentProfile) -> PathwayState {
        state::encode(profile)
    }

    /// Restore from the store; any failure falls back to a Fresh learner
    fn restore(&mut self) {
        match self.store.load() {
            Ok(Some(bytes)) => match ModelSnapshot::from_json(&bytes) {
                Ok(snapshot) => {
                    self.policy = PolicyTable::from_entries(snapshot.policy);
                    self.epsilon = snapshot.epsilon;
                    self.metrics = snapshot.metrics;
                    self.reward_history = snapshot
                        .reward_history
                        .into_iter()
                        .take(REWARD_HISTORY_CAPACITY)
                        .collect();
                    info!(
                        "Model restored: {} states, epsilon={:.3}",
                        self.policy.state_count(),
                        self.epsilon
                    );
                }
                Err(e) => {
                    warn!("Ignoring unreadable model snapshot, starting fresh: {}", e);
                }
            },
            Ok(None) => {
                info!("No existing model snapshot, starting fresh");
            }
            Err(e) => {
                warn!("Failed to load model snapshot, starting fresh: {}", e);
            }
        }
    }
}

/// Bounded textual adjustment for one learned action
///
/// Guards keep the transforms idempotent: once the target token is present
/// the transform does nothing.
fn apply_action_adjustment(
    recommendation: &mut Recommendation,
    action: RecommendationAction,
    confidence: f64,
) {
    match action {
        RecommendationAction::PathwayType if confidence > 0.7 => {
            let pathway_lower = recommendation.recommended_pathway.to_lowercase();
            if pathway_lower.contains("b.sc") && confidence > 0.8 {
                recommendation.recommended_pathway = recommendation
                    .recommended_pathway
                    .replace("B.Sc", "B.Tech");
            }
        }
        RecommendationAction::LearningMode if confidence > 0.7 => {
            let pathway_lower = recommendation.recommended_pathway.to_lowercase();
            if !pathway_lower.contains("online") && confidence > 0.8 {
                recommendation
                    .recommended_pathway
                    .push_str(" (Online/Hybrid options available)");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::LearningMode;
    use crate::reinforcement::snapshot::MemoryStore;
    use std::sync::Arc;

    fn test_learner() -> ReinforcementLearner {
        ReinforcementLearner::with_rng(
            LearnerConfig::default(),
            Box::new(MemoryStore::new()),
            StdRng::seed_from_u64(99),
        )
    }

    fn sample_profile() -> StudentProfile {
        StudentProfile {
            education_type: "HSC".to_string(),
            ssc_percent: 70.0,
            hsc_percent: 82.0,
            diploma_percent: 0.0,
            interests: vec!["Programming".to_string()],
            preferred_field: "Engineering".to_string(),
            preferred_mode: LearningMode::Hybrid,
            budget: 4.0,
            location_preference: "Mumbai".to_string(),
        }
    }

    fn positive_feedback() -> RecommendationFeedback {
        RecommendationFeedback {
            rating: 5,
            response_time: 2.0,
            recommendation_used: true,
            pathway_followed: true,
            is_valid: true,
        }
    }

    #[test]
    fn test_fresh_learner_starts_empty() {
        let learner = test_learner();
        assert!(!learner.is_warm());
        assert_eq!(learner.epsilon(), 0.1);
        assert_eq!(learner.metrics().learning_episodes, 0);
    }

    #[test]
    fn test_learning_updates_policy_and_counters() {
        let mut learner = test_learner();
        let profile = sample_profile();
        let rec = Recommendation::with_pathway("B.Tech Computer Science");

        learner.learn_from_feedback(&profile, &rec, &positive_feedback());

        assert!(learner.is_warm());
        assert_eq!(learner.metrics().learning_episodes, 1);
        assert_eq!(learner.metrics().positive_feedback, 1);
        assert_eq!(learner.metrics().negative_feedback, 0);
        let state = state::encode(&profile);
        assert!(learner.policy().value(&state, RecommendationAction::PathwayType) > 0.0);
    }

    #[test]
    fn test_epsilon_decays_to_floor() {
        let mut learner = test_learner();
        let profile = sample_profile();
        let rec = Recommendation::with_pathway("B.Tech");
        let feedback = positive_feedback();

        for n in 1..=20u32 {
            learner.learn_from_feedback(&profile, &rec, &feedback);
            let expected = (0.1 * 0.995f64.powi(n as i32)).max(0.01);
            assert!((learner.epsilon() - expected).abs() < 1e-12);
        }

        for _ in 0..2_000 {
            learner.learn_from_feedback(&profile, &rec, &feedback);
        }
        assert!((learner.epsilon() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_zero_reward_counts_neither_direction() {
        let mut learner = test_learner();
        // -0.5 (rating 2) + 0.5 (used) with neutral response time = 0.0
        let feedback = RecommendationFeedback {
            rating: 2,
            response_time: 10.0,
            recommendation_used: true,
            pathway_followed: false,
            is_valid: true,
        };
        learner.learn_from_feedback(
            &sample_profile(),
            &Recommendation::with_pathway("B.Tech"),
            &feedback,
        );
        assert_eq!(learner.metrics().learning_episodes, 1);
        assert_eq!(learner.metrics().positive_feedback, 0);
        assert_eq!(learner.metrics().negative_feedback, 0);
    }

    #[test]
    fn test_optimize_without_data_is_passthrough() {
        let learner = test_learner();
        let base = Recommendation {
            recommended_pathway: "B.Sc Statistics".to_string(),
            career_opportunities: vec!["Data Analyst".to_string()],
            skills_to_develop: vec!["Statistics".to_string()],
            confidence_score: 0.6,
            metadata: None,
        };
        let optimized = learner.optimize_recommendation(&sample_profile(), &base);
        assert_eq!(optimized, base);
    }

    #[test]
    fn test_high_value_pathway_action_upgrades_degree() {
        let mut learner = test_learner();
        let profile = sample_profile();
        let state = state::encode(&profile);
        // Drive the pathway-type value above the 0.8 confidence threshold
        for _ in 0..100 {
            learner
                .policy
                .update(state, RecommendationAction::PathwayType, 1.0, &state, 0.3, 0.5);
        }
        assert!(learner.policy.value(&state, RecommendationAction::PathwayType) > 0.8);

        let base = Recommendation::with_pathway("B.Sc Computer Science -> Industry");
        let optimized = learner.optimize_recommendation(&profile, &base);
        assert_eq!(
            optimized.recommended_pathway,
            "B.Tech Computer Science -> Industry"
        );

        // Idempotent: optimizing the optimized output changes nothing
        let again = learner.optimize_recommendation(&profile, &optimized);
        assert_eq!(again, optimized);
    }

    #[test]
    fn test_learning_mode_action_appends_availability_note_once() {
        let mut learner = test_learner();
        let profile = sample_profile();
        let state = state::encode(&profile);
        for _ in 0..100 {
            learner
                .policy
                .update(state, RecommendationAction::LearningMode, 1.0, &state, 0.3, 0.5);
        }

        let base = Recommendation::with_pathway("B.Tech Computer Science");
        let optimized = learner.optimize_recommendation(&profile, &base);
        assert!(optimized
            .recommended_pathway
            .ends_with("(Online/Hybrid options available)"));

        let again = learner.optimize_recommendation(&profile, &optimized);
        assert_eq!(again.recommended_pathway, optimized.recommended_pathway);
    }

    #[test]
    fn test_only_confident_actions_apply() {
        let mut learner = test_learner();
        let profile = sample_profile();
        let state = state::encode(&profile);
        // One confident action, several below the 0.5 gate
        for _ in 0..100 {
            learner
                .policy
                .update(state, RecommendationAction::LearningMode, 1.0, &state, 0.3, 0.5);
        }
        learner
            .policy
            .update(state, RecommendationAction::PathwayType, 0.4, &state, 1.0, 0.0);
        learner
            .policy
            .update(state, RecommendationAction::SkillFocus, 0.2, &state, 1.0, 0.0);

        let base = Recommendation::with_pathway("B.Sc Physics");
        let optimized = learner.optimize_recommendation(&profile, &base);
        // Only the learning-mode transform fired; the degree swap did not
        assert_eq!(
            optimized.recommended_pathway,
            "B.Sc Physics (Online/Hybrid options available)"
        );
    }

    #[test]
    fn test_experience_replay_reinforces_recorded_transitions() {
        let mut learner = test_learner();
        let profile = sample_profile();
        let rec = Recommendation::with_pathway("B.Tech");
        for _ in 0..10 {
            learner.learn_from_feedback(&profile, &rec, &positive_feedback());
        }
        let state = state::encode(&profile);
        let before = learner.policy().value(&state, RecommendationAction::PathwayType);

        learner.experience_replay(5);
        let after = learner.policy().value(&state, RecommendationAction::PathwayType);
        assert!(after > before);
    }

    #[test]
    fn test_experience_replay_needs_enough_transitions() {
        let mut learner = test_learner();
        learner.learn_from_feedback(
            &sample_profile(),
            &Recommendation::with_pathway("B.Tech"),
            &positive_feedback(),
        );
        let state = state::encode(&sample_profile());
        let before = learner.policy().value(&state, RecommendationAction::PathwayType);

        learner.experience_replay(5);
        assert_eq!(
            learner.policy().value(&state, RecommendationAction::PathwayType),
            before
        );
    }

    #[test]
    fn test_insights_on_fresh_learner_are_zeroed() {
        let learner = test_learner();
        let insights = learner.get_learning_insights();
        assert_eq!(insights.total_learning_episodes, 0);
        assert_eq!(insights.success_rate, 0.0);
        assert_eq!(insights.average_reward, 0.0);
        assert_eq!(insights.q_table_size, 0);
        assert!(insights.top_performing_states.is_empty());
    }

    #[test]
    fn test_insights_report_success_rate_and_reward() {
        let mut learner = test_learner();
        let profile = sample_profile();
        let rec = Recommendation::with_pathway("B.Tech");
        learner.learn_from_feedback(&profile, &rec, &positive_feedback());

        let negative = RecommendationFeedback {
            rating: 1,
            response_time: 40.0,
            recommendation_used: false,
            pathway_followed: false,
            is_valid: false,
        };
        learner.learn_from_feedback(&profile, &rec, &negative);

        let insights = learner.get_learning_insights();
        assert_eq!(insights.total_learning_episodes, 2);
        assert!((insights.success_rate - 50.0).abs() < 1e-9);
        // Rewards: +2.8 and -2.1
        assert!((insights.average_reward - 0.35).abs() < 1e-9);
        assert_eq!(insights.q_table_size, 1);
        assert_eq!(insights.top_performing_states.len(), 1);
    }

    #[test]
    fn test_snapshot_round_trip_restores_warm_learner() {
        let store = Arc::new(MemoryStore::new());

        struct SharedStore(Arc<MemoryStore>);
        impl SnapshotStore for SharedStore {
            fn persist(&self, blob: &[u8]) -> DishaResult<()> {
                self.0.persist(blob)
            }
            fn load(&self) -> DishaResult<Option<Vec<u8>>> {
                self.0.load()
            }
        }

        let mut learner = ReinforcementLearner::with_rng(
            LearnerConfig::default(),
            Box::new(SharedStore(store.clone())),
            StdRng::seed_from_u64(5),
        );
        let profile = sample_profile();
        let rec = Recommendation::with_pathway("B.Tech");
        for _ in 0..3 {
            learner.learn_from_feedback(&profile, &rec, &positive_feedback());
        }
        learner.save().unwrap();
        let saved_epsilon = learner.epsilon();
        let state = state::encode(&profile);
        let saved_value = learner.policy().value(&state, RecommendationAction::PathwayType);

        let restored = ReinforcementLearner::with_rng(
            LearnerConfig::default(),
            Box::new(SharedStore(store)),
            StdRng::seed_from_u64(5),
        );
        assert!(restored.is_warm());
        assert!((restored.epsilon() - saved_epsilon).abs() < 1e-12);
        assert_eq!(
            restored.policy().value(&state, RecommendationAction::PathwayType),
            saved_value
        );
        assert_eq!(restored.metrics().learning_episodes, 3);
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_fresh() {
        let store = MemoryStore::with_blob(b"{ definitely not a snapshot".to_vec());
        let learner = ReinforcementLearner::with_rng(
            LearnerConfig::default(),
            Box::new(store),
            StdRng::seed_from_u64(1),
        );
        assert!(!learner.is_warm());
        assert_eq!(learner.epsilon(), 0.1);
    }

    #[test]
    fn test_periodic_save_hits_the_store() {
        let store = Arc::new(MemoryStore::new());

        struct SharedStore(Arc<MemoryStore>);
        impl SnapshotStore for SharedStore {
            fn persist(&self, blob: &[u8]) -> DishaResult<()> {
                self.0.persist(blob)
            }
            fn load(&self) -> DishaResult<Option<Vec<u8>>> {
                self.0.load()
            }
        }

        let config = LearnerConfig {
            save_interval: 2,
            ..Default::default()
        };
        let mut learner = ReinforcementLearner::with_rng(
            config,
            Box::new(SharedStore(store.clone())),
            StdRng::seed_from_u64(2),
        );
        let profile = sample_profile();
        let rec = Recommendation::with_pathway("B.Tech");

        learner.learn_from_feedback(&profile, &rec, &positive_feedback());
        assert!(store.load().unwrap().is_none());

        learner.learn_from_feedback(&profile, &rec, &positive_feedback());
        assert!(store.load().unwrap().is_some());
    }

    #[test]
    fn test_malformed_profile_never_panics() {
        let mut learner = test_learner();
        let profile = StudentProfile {
            ssc_percent: -50.0,
            hsc_percent: f64::NAN,
            budget: -3.0,
            preferred_field: "???".to_string(),
            ..Default::default()
        };
        let rec = Recommendation::default();
        let feedback = RecommendationFeedback {
            rating: 0,
            response_time: -1.0,
            recommendation_used: false,
            pathway_followed: false,
            is_valid: false,
        };

        learner.learn_from_feedback(&profile, &rec, &feedback);
        let _ = learner.optimize_recommendation(&profile, &rec);
        let _ = learner.select_action(&profile);
        let insights = learner.get_learning_insights();
        assert_eq!(insights.total_learning_episodes, 1);
    }
}
