// Reward shaping for recommendation feedback
// Converts a feedback record into the scalar signal consumed by the
// Q-update. Terms are additive and independent; the sum is not clamped.

use crate::core::types::RecommendationFeedback;

/// Calculate the reward for a feedback event
///
/// Rating ladder is evaluated highest threshold first and exactly one
/// branch fires; the remaining terms are independent add-ons. The result
/// ranges roughly over [-2.1, +2.8].
pub fn reward_for_feedback(feedback: &RecommendationFeedback) -> f64 {
    let mut reward = 0.0;

    // Rating-based term
    if feedback.rating >= 4 {
        reward += 1.0;
    } else if feedback.rating >= 3 {
        reward += 0.5;
    } else if feedback.rating >= 2 {
        reward -= 0.5;
    } else {
        reward -= 1.0;
    }

    // Response time term (faster is better)
    if feedback.response_time < 5.0 {
        reward += 0.3;
    } else if feedback.response_time > 30.0 {
        reward -= 0.3;
    }

    if feedback.recommendation_used {
        reward += 0.5;
    }

    if feedback.pathway_followed {
        reward += 1.0;
    }

    if !feedback.is_valid {
        reward -= 0.8;
    }

    reward
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_case_feedback() {
        let feedback = RecommendationFeedback {
            rating: 5,
            response_time: 2.0,
            recommendation_used: true,
            pathway_followed: true,
            is_valid: true,
        };
        assert!((reward_for_feedback(&feedback) - 2.8).abs() < 1e-9);
    }

    #[test]
    fn test_poor_feedback() {
        let feedback = RecommendationFeedback {
            rating: 2,
            response_time: 40.0,
            recommendation_used: false,
            pathway_followed: false,
            is_valid: false,
        };
        assert!((reward_for_feedback(&feedback) - (-1.6)).abs() < 1e-9);
    }

    #[test]
    fn test_rating_ladder_fires_exactly_one_branch() {
        let base = RecommendationFeedback {
            rating: 3,
            response_time: 10.0,
            recommendation_used: false,
            pathway_followed: false,
            is_valid: true,
        };
        // rating 3 fires only the neutral branch
        assert!((reward_for_feedback(&base) - 0.5).abs() < 1e-9);

        let mut low = base.clone();
        low.rating = 1;
        assert!((reward_for_feedback(&low) - (-1.0)).abs() < 1e-9);

        let mut high = base.clone();
        high.rating = 4;
        assert!((reward_for_feedback(&high) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_response_time_band_edges() {
        let mut feedback = RecommendationFeedback {
            rating: 3,
            response_time: 5.0,
            ..Default::default()
        };
        // Exactly 5s and exactly 30s land in the neutral band
        assert!((reward_for_feedback(&feedback) - 0.5).abs() < 1e-9);
        feedback.response_time = 30.0;
        assert!((reward_for_feedback(&feedback) - 0.5).abs() < 1e-9);
        feedback.response_time = 30.01;
        assert!((reward_for_feedback(&feedback) - 0.2).abs() < 1e-9);
    }
}
