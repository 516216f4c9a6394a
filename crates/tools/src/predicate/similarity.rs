//! Weighted keyword-overlap scoring of a predicate candidate against a target device.

use chrono::{Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::characteristics::taxonomy_terms;
use super::keywords::{coverage, extract_keywords, jaccard};
use crate::fda::PredicateCandidate;

pub const NAME_WEIGHT: f64 = 0.25;
pub const INTENDED_USE_WEIGHT: f64 = 0.40;
pub const CROSS_WEIGHT: f64 = 0.20;
pub const TECHNOLOGY_WEIGHT: f64 = 0.15;

/// Components at or below this raw ratio produce no reason
pub const REASON_THRESHOLD: f64 = 0.1;

pub const RECENCY_WINDOW_MONTHS: u32 = 60;
pub const RECENCY_BONUS: f64 = 1.10;

/// Raw (unweighted) overlap ratios, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
    pub name: f64,
    pub intended_use: f64,
    pub cross: f64,
    pub technology: f64,
}

impl SimilarityBreakdown {
    pub fn weighted_sum(&self) -> f64 {
        self.name * NAME_WEIGHT
            + self.intended_use * INTENDED_USE_WEIGHT
            + self.cross * CROSS_WEIGHT
            + self.technology * TECHNOLOGY_WEIGHT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Weighted sum with the recency bonus applied. Not clamped, so a recent
    /// near-perfect match can land slightly above 1.0.
    pub score: f64,
    pub breakdown: SimilarityBreakdown,
    pub reasons: Vec<String>,
    pub recent_clearance: bool,
}

impl SimilarityScore {
    /// Score bounded to [0, 1] for persistence and display
    pub fn clamped(&self) -> f64 {
        self.score.clamp(0.0, 1.0)
    }
}

/// Keyword sets of the target device, computed once per search
#[derive(Debug, Clone)]
pub struct TargetProfile {
    description: BTreeSet<String>,
    intended_use: BTreeSet<String>,
    technology: BTreeSet<String>,
}

impl TargetProfile {
    pub fn new(description: &str, intended_use: &str) -> Self {
        let description_kw = extract_keywords(description);
        let intended_use_kw = extract_keywords(intended_use);
        let taxonomy = taxonomy_terms();
        let technology = description_kw
            .union(&intended_use_kw)
            .filter(|kw| taxonomy.contains(*kw))
            .cloned()
            .collect();
        Self {
            description: description_kw,
            intended_use: intended_use_kw,
            technology,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    reference_date: NaiveDate,
    taxonomy: BTreeSet<String>,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(Utc::now().date_naive())
    }
}

impl SimilarityScorer {
    /// `reference_date` anchors the recency bonus
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            taxonomy: taxonomy_terms(),
        }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn score(
        &self,
        target_description: &str,
        target_intended_use: &str,
        candidate: &PredicateCandidate,
    ) -> SimilarityScore {
        let profile = TargetProfile::new(target_description, target_intended_use);
        self.score_profile(&profile, candidate)
    }

    pub fn score_profile(
        &self,
        target: &TargetProfile,
        candidate: &PredicateCandidate,
    ) -> SimilarityScore {
        let name_kw = extract_keywords(&candidate.device_name);
        let use_kw = extract_keywords(&candidate.intended_use);
        let candidate_tech: BTreeSet<String> = name_kw
            .union(&use_kw)
            .filter(|kw| self.taxonomy.contains(*kw))
            .cloned()
            .collect();

        let breakdown = SimilarityBreakdown {
            name: jaccard(&target.description, &name_kw),
            intended_use: jaccard(&target.intended_use, &use_kw),
            cross: coverage(&target.description, &use_kw),
            technology: coverage(&target.technology, &candidate_tech),
        };

        let mut reasons = Vec::new();
        if breakdown.name > REASON_THRESHOLD {
            reasons.push(format!(
                "Device name overlap {:.0}% ({})",
                breakdown.name * 100.0,
                shared(&target.description, &name_kw)
            ));
        }
        if breakdown.intended_use > REASON_THRESHOLD {
            reasons.push(format!(
                "Intended use overlap {:.0}% ({})",
                breakdown.intended_use * 100.0,
                shared(&target.intended_use, &use_kw)
            ));
        }
        if breakdown.cross > REASON_THRESHOLD {
            reasons.push(format!(
                "Device description matches predicate intended use ({})",
                shared(&target.description, &use_kw)
            ));
        }
        if breakdown.technology > REASON_THRESHOLD {
            reasons.push(format!(
                "Shared technological characteristics ({})",
                shared(&target.technology, &candidate_tech)
            ));
        }

        let mut score = breakdown.weighted_sum();
        let recent_clearance = match candidate.clearance_date() {
            Some(date) if self.is_recent(date) => {
                score *= RECENCY_BONUS;
                reasons.push(format!("Recent clearance ({}) within the last 5 years", date));
                true
            }
            _ => false,
        };

        SimilarityScore {
            score,
            breakdown,
            reasons,
            recent_clearance,
        }
    }

    fn is_recent(&self, date: NaiveDate) -> bool {
        self.reference_date
            .checked_sub_months(Months::new(RECENCY_WINDOW_MONTHS))
            .map_or(false, |cutoff| date >= cutoff)
    }
}

fn shared(a: &BTreeSet<String>, b: &BTreeSet<String>) -> String {
    a.intersection(b).cloned().collect::<Vec<_>>().join(", ")
}
