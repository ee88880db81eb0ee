// Learned-pattern library for recommendation post-processing
// Small fixed set of interest clusters with pathways that historically
// worked for them; a pattern fires when at least two interests overlap.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::core::types::{Recommendation, StudentProfile};

/// Minimum interest overlap for a pattern to apply
pub const MIN_INTEREST_OVERLAP: usize = 2;

/// An interest cluster mapped to a known successful pathway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathwayPattern {
    pub common_interests: Vec<String>,
    pub successful_pathway: String,
    pub common_careers: Vec<String>,
}

static COMMON_PATTERNS: Lazy<Vec<PathwayPattern>> = Lazy::new(|| {
    vec![
        PathwayPattern {
            common_interests: vec![
                "programming".to_string(),
                "web development".to_string(),
                "software".to_string(),
            ],
            successful_pathway: "B.Tech Computer Science -> M.Tech -> Industry".to_string(),
            common_careers: vec![
                "Software Engineer".to_string(),
                "Web Developer".to_string(),
                "Full Stack Developer".to_string(),
            ],
        },
        PathwayPattern {
            common_interests: vec![
                "data science".to_string(),
                "analytics".to_string(),
                "machine learning".to_string(),
            ],
            successful_pathway: "B.Sc Statistics -> M.Sc Data Science -> Industry".to_string(),
            common_careers: vec![
                "Data Scientist".to_string(),
                "Data Analyst".to_string(),
                "Business Analyst".to_string(),
            ],
        },
    ]
});

/// The built-in pattern set
pub fn default_patterns() -> Vec<PathwayPattern> {
    COMMON_PATTERNS.clone()
}

/// Find the first pattern sharing at least `MIN_INTEREST_OVERLAP`
/// interests with the profile, case-insensitively
pub fn find_similar_pattern<'a>(
    patterns: &'a [PathwayPattern],
    profile: &StudentProfile,
) -> Option<&'a PathwayPattern> {
    let interests: Vec<String> = profile.interests.iter().map(|i| i.to_lowercase()).collect();

    patterns.iter().find(|pattern| {
        let overlap = pattern
            .common_interests
            .iter()
            .filter(|pi| interests.iter().any(|i| i == &pi.to_lowercase()))
            .count();
        overlap >= MIN_INTEREST_OVERLAP
    })
}

/// Override pathway and career fields with the pattern's known-good values
pub fn apply_pattern(recommendation: &mut Recommendation, pattern: &PathwayPattern) {
    if !pattern.successful_pathway.is_empty() {
        recommendation.recommended_pathway = pattern.successful_pathway.clone();
    }
    if !pattern.common_careers.is_empty() {
        recommendation.career_opportunities = pattern.common_careers.iter().take(3).cloned().collect();
    }
}
