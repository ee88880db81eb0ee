// Reinforcement learning components for recommendation policy
// Tabular Q-learning over discretized student profiles, adapting
// recommendations from user feedback.

pub mod action;
pub mod learner;
pub mod q_learning;
pub mod reward;
pub mod snapshot;
pub mod state;

// Re-export main components for easier access
pub use action::{RecommendationAction, ALL_ACTIONS};
pub use learner::{LearnerConfig, LearningInsights, LearningMetrics, ReinforcementLearner};
pub use q_learning::PolicyTable;
pub use reward::reward_for_feedback;
pub use snapshot::{JsonFileStore, MemoryStore, ModelSnapshot, SnapshotStore};
pub use state::{encode, PathwayState};

/// Initialize a learner persisting to the given snapshot path, using the
/// canonical hyper-parameters
pub fn initialize_learner(snapshot_path: impl Into<std::path::PathBuf>) -> ReinforcementLearner {
    ReinforcementLearner::new(Box::new(JsonFileStore::new(snapshot_path)))
}
