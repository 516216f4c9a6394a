use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::characteristics::CharacteristicMap;
use super::comparison::ComparisonMatrix;
use super::similarity::SimilarityBreakdown;

pub const FDA_510K_DATABASE_URL: &str =
    "https://www.accessdata.fda.gov/scripts/cdrh/cfdocs/cfpmn/pmn.cfm";

/// One analyzed predicate candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateMatch {
    pub clearance_number: String,
    pub device_name: String,
    pub intended_use: String,
    pub product_code: String,
    pub clearance_date: String,
    pub applicant: String,
    /// Similarity score clamped to [0, 1]
    pub confidence_score: f64,
    pub similarity_breakdown: SimilarityBreakdown,
    pub similarity_reasons: Vec<String>,
    pub technological_characteristics: CharacteristicMap,
    pub comparison_matrix: ComparisonMatrix,
    pub testing_recommendations: Vec<String>,
    pub regulatory_considerations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub device_description: String,
    pub intended_use: String,
    pub product_code: Option<String>,
    pub device_class: Option<String>,
    pub technology_characteristics: Vec<String>,
    pub target_characteristics: CharacteristicMap,
    pub search_terms: Vec<String>,
    pub searched_at: DateTime<Utc>,
    pub top_assessment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStatistics {
    /// Matches returned in this result
    pub total_predicates_found: usize,
    /// Candidates pulled from the data source before scoring and truncation
    pub candidates_screened: usize,
    pub high_confidence_matches: usize,
    pub medium_confidence_matches: usize,
    pub low_confidence_matches: usize,
    pub average_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub title: String,
    pub url: String,
    pub description: String,
    pub accessed_at: DateTime<Utc>,
}

impl SourceCitation {
    pub fn database(accessed_at: DateTime<Utc>) -> Self {
        Self {
            title: "FDA 510(k) Premarket Notification Database".to_string(),
            url: FDA_510K_DATABASE_URL.to_string(),
            description: "Cleared 510(k) submissions searched for predicate candidates"
                .to_string(),
            accessed_at,
        }
    }

    pub fn clearance(m: &PredicateMatch, accessed_at: DateTime<Utc>) -> Self {
        Self {
            title: format!("510(k) {}: {}", m.clearance_number, m.device_name),
            url: format!("{}?ID={}", FDA_510K_DATABASE_URL, m.clearance_number),
            description: format!("Cleared {} for {}", m.clearance_date, m.applicant),
            accessed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateSearchResult {
    pub search_summary: SearchSummary,
    pub predicates: Vec<PredicateMatch>,
    pub search_statistics: SearchStatistics,
    pub recommendations: Vec<String>,
    /// Mean confidence of the returned matches, 0 when there are none
    pub confidence_score: f64,
    pub sources: Vec<SourceCitation>,
}

impl PredicateSearchResult {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn best_match(&self) -> Option<&PredicateMatch> {
        self.predicates.first()
    }
}
