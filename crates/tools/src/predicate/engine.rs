use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::characteristics::{extract_technological_characteristics, CharacteristicMap};
use super::comparison::{build_comparison_matrix, RiskLevel, TargetText};
use super::ranking::{
    no_predicates_recommendations, rank_matches, recommendations, search_statistics,
    NO_PREDICATES_FOUND,
};
use super::similarity::{SimilarityScorer, TargetProfile};
use super::types::{
    PredicateMatch, PredicateSearchResult, SearchSummary, SourceCitation,
};
use crate::fda::PredicateCandidate;

/// Predicates older than this should be confirmed as still legally marketed
const PREDICATE_AGE_WARNING_MONTHS: u32 = 120;

/// The device a submission is being prepared for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetDevice {
    pub description: String,
    pub intended_use: String,
    pub product_code: Option<String>,
    pub device_class: Option<String>,
    pub technology_characteristics: Vec<String>,
}

impl TargetDevice {
    pub fn new(description: impl Into<String>, intended_use: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            intended_use: intended_use.into(),
            ..Default::default()
        }
    }

    pub fn with_product_code(mut self, code: impl Into<String>) -> Self {
        self.product_code = Some(code.into());
        self
    }

    pub fn with_device_class(mut self, class: impl Into<String>) -> Self {
        self.device_class = Some(class.into());
        self
    }

    pub fn with_technology(mut self, terms: impl IntoIterator<Item = String>) -> Self {
        self.technology_characteristics.extend(terms);
        self
    }

    pub fn characteristics(&self) -> CharacteristicMap {
        extract_technological_characteristics(
            &self.description,
            &self.intended_use,
            &self.technology_characteristics,
        )
    }

    fn text(&self) -> TargetText<'_> {
        TargetText {
            description: &self.description,
            intended_use: &self.intended_use,
        }
    }
}

/// Scores, compares and ranks predicate candidates for one target device
#[derive(Debug, Clone)]
pub struct PredicateMatcher {
    scorer: SimilarityScorer,
    min_similarity: f64,
}

impl PredicateMatcher {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self {
            scorer: SimilarityScorer::new(reference_date),
            min_similarity: 0.0,
        }
    }

    /// Candidates must score strictly above `min_similarity` to be kept. The
    /// check uses the score before clamping.
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn analyze(&self, target: &TargetDevice, candidate: &PredicateCandidate) -> PredicateMatch {
        let profile = TargetProfile::new(&target.description, &target.intended_use);
        self.analyze_with(target, &profile, &target.characteristics(), candidate)
            .1
    }

    fn analyze_with(
        &self,
        target: &TargetDevice,
        profile: &TargetProfile,
        target_characteristics: &CharacteristicMap,
        candidate: &PredicateCandidate,
    ) -> (f64, PredicateMatch) {
        let similarity = self.scorer.score_profile(profile, candidate);
        let candidate_characteristics =
            extract_technological_characteristics(&candidate.device_name, &candidate.intended_use, &[]);
        let matrix = build_comparison_matrix(
            target_characteristics,
            &candidate_characteristics,
            target.text(),
        );
        let regulatory_considerations =
            self.regulatory_considerations(target, candidate, matrix.risk_assessment);

        let raw_score = similarity.score;
        let matched = PredicateMatch {
            clearance_number: candidate.clearance_number.clone(),
            device_name: candidate.device_name.clone(),
            intended_use: candidate.intended_use.clone(),
            product_code: candidate.product_code.clone(),
            clearance_date: candidate.clearance_date.clone(),
            applicant: candidate.applicant.clone(),
            confidence_score: similarity.clamped(),
            similarity_breakdown: similarity.breakdown,
            similarity_reasons: similarity.reasons,
            technological_characteristics: candidate_characteristics,
            testing_recommendations: matrix.testing_recommendations.clone(),
            comparison_matrix: matrix,
            regulatory_considerations,
        };
        (raw_score, matched)
    }

    fn regulatory_considerations(
        &self,
        target: &TargetDevice,
        candidate: &PredicateCandidate,
        risk: RiskLevel,
    ) -> Vec<String> {
        let mut notes = Vec::new();

        let cutoff = self
            .scorer
            .reference_date()
            .checked_sub_months(Months::new(PREDICATE_AGE_WARNING_MONTHS));
        if let (Some(cleared), Some(cutoff)) = (candidate.clearance_date(), cutoff) {
            if cleared < cutoff {
                notes.push(format!(
                    "Predicate cleared {} is over 10 years old; verify it is still legally marketed",
                    cleared
                ));
            }
        }

        if let Some(requested) = target.product_code.as_deref().map(str::trim) {
            let actual = candidate.product_code.trim();
            if !requested.is_empty() && !actual.is_empty() && !actual.eq_ignore_ascii_case(requested)
            {
                notes.push(format!(
                    "Product code {} differs from requested {}; justify equivalence across product codes",
                    actual, requested
                ));
            }
        }

        match risk {
            RiskLevel::High => notes.push(
                "High-risk technological differences; request a Pre-Submission (Q-Sub) meeting with FDA"
                    .to_string(),
            ),
            RiskLevel::Medium => notes.push(
                "Provide performance data addressing the identified technological differences"
                    .to_string(),
            ),
            RiskLevel::Low => {}
        }
        notes
    }

    /// Analyze every candidate and assemble the top `max_results` into a result
    pub fn evaluate(
        &self,
        target: &TargetDevice,
        candidates: &[PredicateCandidate],
        search_terms: Vec<String>,
        max_results: usize,
    ) -> PredicateSearchResult {
        let now = Utc::now();
        let profile = TargetProfile::new(&target.description, &target.intended_use);
        let target_characteristics = target.characteristics();

        let mut matches: Vec<PredicateMatch> = candidates
            .iter()
            .map(|c| self.analyze_with(target, &profile, &target_characteristics, c))
            .filter(|(raw_score, _)| *raw_score > self.min_similarity)
            .map(|(_, m)| m)
            .collect();
        debug!(
            screened = candidates.len(),
            kept = matches.len(),
            "Scored predicate candidates"
        );

        rank_matches(&mut matches);
        matches.truncate(max_results);

        if matches.is_empty() {
            return self.build_empty(target, target_characteristics, search_terms, candidates.len(), now);
        }

        let statistics = search_statistics(&matches, candidates.len());
        let recommendations = recommendations(&matches);
        let top_assessment = matches
            .first()
            .map(|m| m.comparison_matrix.substantial_equivalence_assessment.clone())
            .unwrap_or_default();

        let mut sources = vec![SourceCitation::database(now)];
        sources.extend(matches.iter().map(|m| SourceCitation::clearance(m, now)));

        PredicateSearchResult {
            search_summary: summary(target, target_characteristics, search_terms, top_assessment, now),
            confidence_score: statistics.average_confidence,
            search_statistics: statistics,
            predicates: matches,
            recommendations,
            sources,
        }
    }

    /// Well-formed result for a search that produced no usable predicates
    pub fn empty_result(&self, target: &TargetDevice, search_terms: Vec<String>) -> PredicateSearchResult {
        self.build_empty(target, target.characteristics(), search_terms, 0, Utc::now())
    }

    fn build_empty(
        &self,
        target: &TargetDevice,
        target_characteristics: CharacteristicMap,
        search_terms: Vec<String>,
        screened: usize,
        now: DateTime<Utc>,
    ) -> PredicateSearchResult {
        PredicateSearchResult {
            search_summary: summary(
                target,
                target_characteristics,
                search_terms,
                NO_PREDICATES_FOUND.to_string(),
                now,
            ),
            predicates: Vec::new(),
            search_statistics: search_statistics(&[], screened),
            recommendations: no_predicates_recommendations(),
            confidence_score: 0.0,
            sources: vec![SourceCitation::database(now)],
        }
    }
}

fn summary(
    target: &TargetDevice,
    target_characteristics: CharacteristicMap,
    search_terms: Vec<String>,
    top_assessment: String,
    searched_at: DateTime<Utc>,
) -> SearchSummary {
    SearchSummary {
        device_description: target.description.clone(),
        intended_use: target.intended_use.clone(),
        product_code: target.product_code.clone(),
        device_class: target.device_class.clone(),
        technology_characteristics: target.technology_characteristics.clone(),
        target_characteristics,
        search_terms,
        searched_at,
        top_assessment,
    }
}
