// Recommendation-adjustment actions the policy can favor
// Each action names one dimension of a recommendation the learner may tune.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed action space of the recommendation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAction {
    /// Adjust the kind of pathway (degree vs diploma vs certification)
    PathwayType,
    /// Adjust the institution tier or type
    InstitutionType,
    /// Adjust the course duration
    CourseDuration,
    /// Adjust which skills the pathway emphasizes
    SkillFocus,
    /// Adjust the career orientation of the pathway
    CareerOrientation,
    /// Adjust the delivery mode (online/offline/hybrid)
    LearningMode,
}

/// Canonical ordering of the action space, used for candidate iteration
/// and the deterministic tie-break in action selection.
pub const ALL_ACTIONS: [RecommendationAction; 6] = [
    RecommendationAction::PathwayType,
    RecommendationAction::InstitutionType,
    RecommendationAction::CourseDuration,
    RecommendationAction::SkillFocus,
    RecommendationAction::CareerOrientation,
    RecommendationAction::LearningMode,
];

impl RecommendationAction {
    /// Infer which action a delivered recommendation embodied from its
    /// pathway text. Unmatched text defaults to `PathwayType`.
    pub fn infer_from_pathway(pathway: &str) -> Self {
        let pathway = pathway.to_lowercase();

        if pathway.contains("b.tech") || pathway.contains("engineering") {
            RecommendationAction::PathwayType
        } else if pathway.contains("online") || pathway.contains("distance") {
            RecommendationAction::LearningMode
        } else if pathway.contains("certification") || pathway.contains("diploma") {
            RecommendationAction::CourseDuration
        } else {
            RecommendationAction::PathwayType
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationAction::PathwayType => "pathway_type",
            RecommendationAction::InstitutionType => "institution_type",
            RecommendationAction::CourseDuration => "course_duration",
            RecommendationAction::SkillFocus => "skill_focus",
            RecommendationAction::CareerOrientation => "career_orientation",
            RecommendationAction::LearningMode => "learning_mode",
        }
    }
}

impl fmt::Display for RecommendationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_action_from_pathway() {
        assert_eq!(
            RecommendationAction::infer_from_pathway("B.Tech Computer Science -> M.Tech"),
            RecommendationAction::PathwayType
        );
        assert_eq!(
            RecommendationAction::infer_from_pathway("Online MBA with distance electives"),
            RecommendationAction::LearningMode
        );
        assert_eq!(
            RecommendationAction::infer_from_pathway("Diploma in Graphic Design"),
            RecommendationAction::CourseDuration
        );
        // Engineering outranks the online keyword
        assert_eq!(
            RecommendationAction::infer_from_pathway("Engineering degree with online labs"),
            RecommendationAction::PathwayType
        );
        // Unmatched text falls back to pathway type
        assert_eq!(
            RecommendationAction::infer_from_pathway("B.Sc Statistics"),
            RecommendationAction::PathwayType
        );
    }

    #[test]
    fn test_action_space_is_complete() {
        assert_eq!(ALL_ACTIONS.len(), 6);
        assert_eq!(ALL_ACTIONS[0], RecommendationAction::PathwayType);
        assert_eq!(ALL_ACTIONS[5].as_str(), "learning_mode");
    }
}
