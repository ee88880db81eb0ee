use serde::{Deserialize, Serialize};

/// Preferred mode of study for a student
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LearningMode {
    Online,
    Offline,
    #[default]
    Hybrid,
}

impl LearningMode {
    /// Numeric code used by the state encoding
    pub fn code(&self) -> u8 {
        match self {
            LearningMode::Online => 0,
            LearningMode::Offline => 1,
            LearningMode::Hybrid => 2,
        }
    }
}

/// Academic and interest profile of a student
///
/// Immutable input to the core. Percentages are 0-100 with 0 meaning
/// "not applicable" (e.g. no HSC score yet); budget is in lakhs per year.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StudentProfile {
    pub education_type: String,
    pub ssc_percent: f64,
    pub hsc_percent: f64,
    pub diploma_percent: f64,
    pub interests: Vec<String>,
    pub preferred_field: String,
    pub preferred_mode: LearningMode,
    pub budget: f64,
    pub location_preference: String,
}

/// Metadata attached to a recommendation by the performance optimizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationMetadata {
    pub optimized: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub cache_key: String,
}

/// A structured pathway recommendation
///
/// Produced by the external generator and refined by the learning and
/// optimization layers before it reaches the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub recommended_pathway: String,
    pub career_opportunities: Vec<String>,
    pub skills_to_develop: Vec<String>,
    pub confidence_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OptimizationMetadata>,
}

impl Recommendation {
    /// Create a recommendation carrying only a pathway description
    pub fn with_pathway(pathway: impl Into<String>) -> Self {
        Self {
            recommended_pathway: pathway.into(),
            ..Default::default()
        }
    }
}

/// User feedback for a delivered recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationFeedback {
    /// Rating on a 1-5 scale
    pub rating: u8,
    /// Time the recommendation took to produce, in seconds
    pub response_time: f64,
    /// Whether the student acted on the recommendation
    pub recommendation_used: bool,
    /// Whether the student enrolled in the recommended pathway
    pub pathway_followed: bool,
    /// Whether the recommendation passed validation
    pub is_valid: bool,
}

impl Default for RecommendationFeedback {
    fn default() -> Self {
        Self {
            rating: 3,
            response_time: 0.0,
            recommendation_used: false,
            pathway_followed: false,
            is_valid: true,
        }
    }
}

/// Outcome record for a past student, supplied by the profile archive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOutcome {
    pub profile: StudentProfile,
    pub target_pathway: String,
    pub career_choice: String,
}
