// Q-learning policy table for recommendation adjustment
// Sparse state/action value map with epsilon-greedy selection and the
// standard temporal-difference update.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::reinforcement::action::RecommendationAction;
use crate::reinforcement::state::PathwayState;

/// Capacity of the experience replay buffer
pub const EXPERIENCE_CAPACITY: usize = 10_000;

/// Sparse mapping from (state, action) to learned value
///
/// Absent entries read as 0.0; only updates create entries, so the table
/// size reflects states that have actually been learned on.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    table: HashMap<PathwayState, HashMap<RecommendationAction, f64>>,
}

/// One (state, action, value) triple, the unit of snapshot serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub state: PathwayState,
    pub action: RecommendationAction,
    pub value: f64,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a table from snapshot entries
    pub fn from_entries(entries: impl IntoIterator<Item = PolicyEntry>) -> Self {
        let mut table = Self::new();
        for entry in entries {
            table
                .table
                .entry(entry.state)
                .or_default()
                .insert(entry.action, entry.value);
        }
        table
    }

    /// Export every stored (state, action, value) triple
    pub fn entries(&self) -> Vec<PolicyEntry> {
        self.table
            .iter()
            .flat_map(|(state, actions)| {
                actions.iter().map(|(action, value)| PolicyEntry {
                    state: *state,
                    action: *action,
                    value: *value,
                })
            })
            .collect()
    }

    /// Stored value for a state-action pair, 0.0 when unseen
    ///
    /// Never creates an entry.
    pub fn value(&self, state: &PathwayState, action: RecommendationAction) -> f64 {
        self.table
            .get(state)
            .and_then(|actions| actions.get(&action))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether any action has been recorded for this state
    pub fn has_state(&self, state: &PathwayState) -> bool {
        self.table
            .get(state)
            .map(|actions| !actions.is_empty())
            .unwrap_or(false)
    }

    /// Number of distinct states with at least one recorded action
    pub fn state_count(&self) -> usize {
        self.table
            .values()
            .filter(|actions| !actions.is_empty())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.state_count() == 0
    }

    /// Maximum stored value over a state's actions, 0.0 when none recorded
    pub fn max_value(&self, state: &PathwayState) -> f64 {
        self.table
            .get(state)
            .and_then(|actions| {
                actions
                    .values()
                    .copied()
                    .max_by(|a, b| a.total_cmp(b))
            })
            .unwrap_or(0.0)
    }

    /// Top-n recorded actions for a state, sorted by value descending
    pub fn top_actions(
        &self,
        state: &PathwayState,
        n: usize,
    ) -> Vec<(RecommendationAction, f64)> {
        let mut actions: Vec<(RecommendationAction, f64)> = self
            .table
            .get(state)
            .map(|actions| actions.iter().map(|(a, v)| (*a, *v)).collect())
            .unwrap_or_default();

        actions.sort_by(|(_, a), (_, b)| b.total_cmp(a));
        actions.truncate(n);
        actions
    }

    /// Top-n states ranked by their best action value
    pub fn top_states(&self, n: usize) -> Vec<(PathwayState, f64)> {
        let mut states: Vec<(PathwayState, f64)> = self
            .table
            .iter()
            .filter(|(_, actions)| !actions.is_empty())
            .map(|(state, _)| (*state, self.max_value(state)))
            .collect();

        states.sort_by(|(_, a), (_, b)| b.total_cmp(a));
        states.truncate(n);
        states
    }

    /// Epsilon-greedy action selection over a candidate list
    ///
    /// With probability epsilon a candidate is drawn uniformly at random;
    /// otherwise the candidate with the maximum stored value wins, ties
    /// broken by first-encountered order. An empty candidate list falls
    /// back to `PathwayType`.
    pub fn select_action<R: Rng + ?Sized>(
        &self,
        state: &PathwayState,
        candidates: &[RecommendationAction],
        epsilon: f64,
        rng: &mut R,
    ) -> RecommendationAction {
        if candidates.is_empty() {
            return RecommendationAction::PathwayType;
        }

        if rng.random::<f64>() < epsilon {
            let index = rng.random_range(0..candidates.len());
            return candidates[index];
        }

        // Exploitation: first strictly greater value wins, so the all-zero
        // case deterministically yields the first candidate.
        let mut best = candidates[0];
        let mut best_value = self.value(state, best);
        for &action in &candidates[1..] {
            let value = self.value(state, action);
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        best
    }

    /// Temporal-difference update: Q(s,a) += alpha * (r + gamma * max_a' Q(s',a') - Q(s,a))
    ///
    /// `max_a' Q(s',a')` is 0 when the next state has no recorded actions.
    /// This is the only operation that creates entries.
    pub fn update(
        &mut self,
        state: PathwayState,
        action: RecommendationAction,
        reward: f64,
        next_state: &PathwayState,
        learning_rate: f64,
        discount_factor: f64,
    ) {
        let current_q = self.value(&state, action);
        let max_next_q = self.max_value(next_state);

        let temporal_difference = reward + discount_factor * max_next_q - current_q;
        let new_q = current_q + learning_rate * temporal_difference;

        self.table.entry(state).or_default().insert(action, new_q);
    }
}

/// A single learning transition retained for potential replay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub state: PathwayState,
    pub action: RecommendationAction,
    pub reward: f64,
    pub next_state: PathwayState,
    pub timestamp: DateTime<Utc>,
}

/// Bounded ring buffer of learning transitions; oldest entries are
/// silently dropped once capacity is reached.
#[derive(Debug, Clone)]
pub struct ExperienceBuffer {
    entries: VecDeque<Experience>,
    capacity: usize,
}

impl ExperienceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, experience: Experience) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(experience);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Experience> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.entries.iter()
    }
}

impl Default for ExperienceBuffer {
    fn default() -> Self {
        Self::new(EXPERIENCE_CAPACITY)
    }
}
