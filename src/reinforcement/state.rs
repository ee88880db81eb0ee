// State representation for the recommendation policy
// Discretizes a student profile into the small state space the Q-table is
// indexed by, so near-identical students share learned values.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::StudentProfile;

/// Interest keyword sets, checked in priority order: technical wins over
/// business, business over creative.
static TECH_INTERESTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "programming",
        "software",
        "web development",
        "cybersecurity",
        "data science",
        "ai",
        "machine learning",
    ]
});

static BUSINESS_INTERESTS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["management", "marketing", "finance", "entrepreneurship"]);

static CREATIVE_INTERESTS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["design", "art", "music", "writing"]);

static TIER1_CITIES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "mumbai",
        "delhi",
        "bangalore",
        "chennai",
        "hyderabad",
        "pune",
        "kolkata",
    ]
});

static TIER2_CITIES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "ahmedabad", "jaipur", "surat", "lucknow", "kanpur", "nagpur", "indore",
    ]
});

/// Discretized encoding of a student profile
///
/// Every field is guaranteed to stay within its declared range; two profiles
/// that produce the same band/category/code values map to the identical state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathwayState {
    /// Academic band from the ssc/hsc average, 0..=3
    pub academic_band: u8,
    /// 0 technical, 1 business, 2 creative, 3 other
    pub interest_category: u8,
    /// Budget band from budget/2, 0..=3
    pub budget_band: u8,
    /// 0 tier-1 city, 1 tier-2 city, 2 other
    pub location_tier: u8,
    /// Preferred field code, 0..=7 with 7 = other
    pub field_code: u8,
    /// 0 online, 1 offline, 2 hybrid
    pub mode_code: u8,
}

impl PathwayState {
    /// The zero state used as a safe default
    pub fn zero() -> Self {
        Self {
            academic_band: 0,
            interest_category: 0,
            budget_band: 0,
            location_tier: 0,
            field_code: 0,
            mode_code: 0,
        }
    }
}

impl fmt::Display for PathwayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}_{}",
            self.academic_band,
            self.interest_category,
            self.budget_band,
            self.location_tier,
            self.field_code,
            self.mode_code
        )
    }
}

/// Encode a student profile into its discrete policy state
///
/// Pure and total: missing or out-of-range fields fall back to the lowest
/// band or the "other" code instead of failing.
pub fn encode(profile: &StudentProfile) -> PathwayState {
    PathwayState {
        academic_band: academic_band(profile.ssc_percent, profile.hsc_percent),
        interest_category: categorize_interests(&profile.interests),
        budget_band: budget_band(profile.budget),
        location_tier: location_tier(&profile.location_preference),
        field_code: field_code(&profile.preferred_field),
        mode_code: profile.preferred_mode.code(),
    }
}

/// Band the ssc/hsc average into four 25-point buckets
fn academic_band(ssc: f64, hsc: f64) -> u8 {
    let avg = if hsc > 0.0 { (ssc + hsc) / 2.0 } else { ssc };
    if !avg.is_finite() || avg <= 0.0 {
        return 0;
    }
    ((avg / 25.0) as u8).min(3)
}

/// First-match interest categorization, case-insensitive substring
fn categorize_interests(interests: &[String]) -> u8 {
    let lowered: Vec<String> = interests.iter().map(|i| i.to_lowercase()).collect();
    let matches_any = |keywords: &[&str]| {
        lowered
            .iter()
            .any(|interest| keywords.iter().any(|kw| interest.contains(kw)))
    };

    if matches_any(&TECH_INTERESTS) {
        0
    } else if matches_any(&BUSINESS_INTERESTS) {
        1
    } else if matches_any(&CREATIVE_INTERESTS) {
        2
    } else {
        3
    }
}

fn budget_band(budget: f64) -> u8 {
    if !budget.is_finite() || budget <= 0.0 {
        return 0;
    }
    ((budget / 2.0) as u8).min(3)
}

fn location_tier(location: &str) -> u8 {
    let location_lower = location.to_lowercase();
    if TIER1_CITIES.iter().any(|city| location_lower.contains(city)) {
        0
    } else if TIER2_CITIES.iter().any(|city| location_lower.contains(city)) {
        1
    } else {
        2
    }
}

fn field_code(field: &str) -> u8 {
    match field.to_lowercase().as_str() {
        "engineering" => 0,
        "science" => 1,
        "commerce" => 2,
        "arts" => 3,
        "management" => 4,
        "design" => 5,
        "medicine" => 6,
        _ => 7,
    }
}
