//! Ordering, statistics and overall recommendations for analyzed predicates.

use std::cmp::Ordering;

use super::comparison::RiskLevel;
use super::types::{PredicateMatch, SearchStatistics};

pub const HIGH_CONFIDENCE: f64 = 0.7;
pub const MEDIUM_CONFIDENCE: f64 = 0.5;
/// Score above which a match counts towards "multiple strong options"
pub const STRONG_OPTION: f64 = 0.6;
const STRONG_OPTION_COUNT: usize = 3;

pub const NO_PREDICATES_FOUND: &str =
    "No predicate devices found; consider the De Novo classification pathway";

/// Confidence descending, clearance number as a stable tiebreak
pub fn rank_matches(matches: &mut [PredicateMatch]) {
    matches.sort_by(|a, b| {
        b.confidence_score
            .partial_cmp(&a.confidence_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.clearance_number.cmp(&b.clearance_number))
    });
}

pub fn overall_confidence(matches: &[PredicateMatch]) -> f64 {
    if matches.is_empty() {
        return 0.0;
    }
    matches.iter().map(|m| m.confidence_score).sum::<f64>() / matches.len() as f64
}

pub fn search_statistics(matches: &[PredicateMatch], candidates_screened: usize) -> SearchStatistics {
    let mut stats = SearchStatistics {
        total_predicates_found: matches.len(),
        candidates_screened,
        average_confidence: overall_confidence(matches),
        ..Default::default()
    };
    for m in matches {
        if m.confidence_score >= HIGH_CONFIDENCE {
            stats.high_confidence_matches += 1;
        } else if m.confidence_score >= MEDIUM_CONFIDENCE {
            stats.medium_confidence_matches += 1;
        } else {
            stats.low_confidence_matches += 1;
        }
    }
    stats
}

/// Recommendations over matches already sorted by [`rank_matches`]
pub fn recommendations(matches: &[PredicateMatch]) -> Vec<String> {
    let Some(best) = matches.first() else {
        return no_predicates_recommendations();
    };

    let mut out = Vec::new();
    if best.confidence_score >= HIGH_CONFIDENCE {
        out.push(format!(
            "Strong predicate candidates identified; {} ({}) is the leading candidate",
            best.clearance_number, best.device_name
        ));
    } else if best.confidence_score >= MEDIUM_CONFIDENCE {
        out.push(
            "Moderate predicate candidates identified; analyze technological differences further"
                .to_string(),
        );
    } else {
        out.push(
            "Weak predicate matches only; broaden the search terms or revisit the device description"
                .to_string(),
        );
    }

    let strong = matches
        .iter()
        .filter(|m| m.confidence_score >= STRONG_OPTION)
        .count();
    if strong >= STRONG_OPTION_COUNT {
        out.push(format!(
            "{} candidates score at or above {:.1}; multiple strong predicate options exist",
            strong, STRONG_OPTION
        ));
    }

    if matches
        .iter()
        .all(|m| m.comparison_matrix.risk_assessment == RiskLevel::High)
    {
        out.push(
            "All candidates carry high-risk differences; plan for clinical studies".to_string(),
        );
    }

    for requirement in consistent_requirements(matches) {
        out.push(format!("Consistent testing requirement: {}", requirement));
    }
    out
}

/// Testing recommendations shared by at least half of the matches, in first-seen order
fn consistent_requirements(matches: &[PredicateMatch]) -> Vec<String> {
    let mut seen: Vec<(&str, usize)> = Vec::new();
    for m in matches {
        for rec in &m.testing_recommendations {
            match seen.iter_mut().find(|(name, _)| *name == rec.as_str()) {
                Some((_, count)) => *count += 1,
                None => seen.push((rec.as_str(), 1)),
            }
        }
    }
    seen.into_iter()
        .filter(|(_, count)| count * 2 >= matches.len())
        .map(|(name, _)| name.to_string())
        .collect()
}

pub fn no_predicates_recommendations() -> Vec<String> {
    vec![
        NO_PREDICATES_FOUND.to_string(),
        "Broaden the search with alternative device names or a related product code".to_string(),
        "Request a Pre-Submission (Q-Sub) meeting to confirm the regulatory pathway".to_string(),
    ]
}
