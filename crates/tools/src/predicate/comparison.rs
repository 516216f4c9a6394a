//! Side-by-side comparison of target and predicate characteristics.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::characteristics::{
    is_unspecified, split_terms, CharacteristicCategory, CharacteristicMap,
};
use super::keywords::NormalizedText;

/// Terms that mark a device as high risk wherever they appear
pub const HIGH_RISK_KEYWORDS: &[&str] = &[
    "implantable",
    "life sustaining",
    "invasive",
    "surgical",
    "cardiovascular",
    "neurological",
    "spinal",
];

const IMPLANT_KEYWORDS: &[&str] = &["implant", "implantable", "implanted"];

const SOFTWARE_KEYWORDS: &[&str] = &[
    "software",
    "algorithm",
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "ai",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityLevel {
    Identical,
    Similar,
    Different,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalCharacteristic {
    pub category: CharacteristicCategory,
    pub target_value: String,
    pub candidate_value: String,
    pub similarity: SimilarityLevel,
    pub impact: Impact,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMatrix {
    pub similarities: Vec<TechnicalCharacteristic>,
    pub differences: Vec<TechnicalCharacteristic>,
    pub risk_assessment: RiskLevel,
    pub testing_recommendations: Vec<String>,
    pub substantial_equivalence_assessment: String,
    pub confidence_score: f64,
}

impl ComparisonMatrix {
    pub fn high_impact_differences(&self) -> usize {
        self.count_impact(Impact::High)
    }

    pub fn medium_impact_differences(&self) -> usize {
        self.count_impact(Impact::Medium)
    }

    fn count_impact(&self, impact: Impact) -> usize {
        self.differences.iter().filter(|d| d.impact == impact).count()
    }
}

/// What is known about the target beyond its characteristic map
#[derive(Debug, Clone, Copy)]
pub struct TargetText<'a> {
    pub description: &'a str,
    pub intended_use: &'a str,
}

pub fn build_comparison_matrix(
    target: &CharacteristicMap,
    candidate: &CharacteristicMap,
    text: TargetText<'_>,
) -> ComparisonMatrix {
    let combined = NormalizedText::from_parts([text.description, text.intended_use]);
    let description = NormalizedText::new(text.description);
    let high_risk_text = combined.contains_any(HIGH_RISK_KEYWORDS);

    let mut similarities = Vec::new();
    let mut differences = Vec::new();

    for category in CharacteristicCategory::ALL {
        let target_value = value_of(target, category);
        let candidate_value = value_of(candidate, category);
        if is_unspecified(target_value) && is_unspecified(candidate_value) {
            continue;
        }

        let characteristic = compare(category, target_value, candidate_value, high_risk_text);
        if characteristic.similarity == SimilarityLevel::Different {
            differences.push(characteristic);
        } else {
            similarities.push(characteristic);
        }
    }

    let high = differences.iter().filter(|d| d.impact == Impact::High).count();
    let medium = differences.iter().filter(|d| d.impact == Impact::Medium).count();

    let mut risk_assessment = if high >= 2 {
        RiskLevel::High
    } else if high == 1 || medium >= 3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    if high >= 1 && description.contains_any(HIGH_RISK_KEYWORDS) {
        risk_assessment = RiskLevel::High;
    }

    let software_target = !is_unspecified(value_of(target, CharacteristicCategory::Software))
        || combined.contains_any(SOFTWARE_KEYWORDS);
    let testing_recommendations = testing_recommendations(
        &differences,
        software_target,
        high_risk_text,
        combined.contains_any(IMPLANT_KEYWORDS),
    );

    let substantial_equivalence_assessment =
        equivalence_narrative(similarities.len(), differences.len(), high);
    let confidence_score = confidence(similarities.len(), differences.len(), high);

    ComparisonMatrix {
        similarities,
        differences,
        risk_assessment,
        testing_recommendations,
        substantial_equivalence_assessment,
        confidence_score,
    }
}

fn value_of(map: &CharacteristicMap, category: CharacteristicCategory) -> &str {
    map.get(&category).map(String::as_str).unwrap_or("")
}

fn compare(
    category: CharacteristicCategory,
    target_value: &str,
    candidate_value: &str,
    high_risk_text: bool,
) -> TechnicalCharacteristic {
    let label = category.label();
    let (similarity, impact, justification) = if target_value == candidate_value {
        (
            SimilarityLevel::Identical,
            Impact::None,
            format!("Identical {}: {}", label, target_value),
        )
    } else if is_unspecified(target_value) || is_unspecified(candidate_value) {
        let (specified, side) = if is_unspecified(target_value) {
            (candidate_value, "predicate")
        } else {
            (target_value, "subject device")
        };
        (
            SimilarityLevel::Different,
            Impact::Medium,
            format!(
                "Only the {} specifies {} ({}); equivalence cannot be assessed",
                side, label, specified
            ),
        )
    } else {
        let target_terms = split_terms(target_value);
        let candidate_terms = split_terms(candidate_value);
        let overlap: Vec<String> = target_terms.intersection(&candidate_terms).cloned().collect();
        if overlap.is_empty() {
            // high-risk targets escalate every disjoint category, not just the low ones
            let impact = if high_risk_text {
                Impact::High
            } else {
                category_impact(category)
            };
            (
                SimilarityLevel::Different,
                impact,
                format!(
                    "Different {}: subject uses {}, predicate uses {}",
                    label, target_value, candidate_value
                ),
            )
        } else {
            (
                SimilarityLevel::Similar,
                Impact::Low,
                format!("Similar {}: both use {}", label, overlap.join(", ")),
            )
        }
    };

    TechnicalCharacteristic {
        category,
        target_value: target_value.to_string(),
        candidate_value: candidate_value.to_string(),
        similarity,
        impact,
        justification,
    }
}

fn category_impact(category: CharacteristicCategory) -> Impact {
    match category {
        CharacteristicCategory::Materials
        | CharacteristicCategory::Implantation
        | CharacteristicCategory::Sterilization => Impact::High,
        CharacteristicCategory::EnergySource
        | CharacteristicCategory::Software
        | CharacteristicCategory::Measurement => Impact::Medium,
        CharacteristicCategory::Connectivity => Impact::Low,
    }
}

fn testing_recommendations(
    differences: &[TechnicalCharacteristic],
    software_target: bool,
    high_risk_text: bool,
    implantable: bool,
) -> Vec<String> {
    let mut recommendations: Vec<&'static str> = Vec::new();
    let mut push = |items: &[&'static str]| {
        for item in items {
            if !recommendations.contains(item) {
                recommendations.push(*item);
            }
        }
    };

    for difference in differences {
        match difference.category {
            CharacteristicCategory::Materials => push(&[
                "Biocompatibility testing per ISO 10993",
                "Material characterization and comparison",
            ]),
            CharacteristicCategory::Software => push(&[
                "Software verification and validation per IEC 62304",
                "Cybersecurity assessment",
            ]),
            CharacteristicCategory::Connectivity => push(&[
                "EMC testing per IEC 60601-1-2",
                "Wireless coexistence and performance testing",
            ]),
            CharacteristicCategory::Sterilization => push(&[
                "Sterilization validation",
                "Packaging integrity testing",
            ]),
            CharacteristicCategory::EnergySource => push(&[
                "Electrical safety testing per IEC 60601-1",
                "Battery safety and performance testing",
            ]),
            CharacteristicCategory::Implantation | CharacteristicCategory::Measurement => {}
        }
    }
    if software_target {
        push(&[
            "Software verification and validation per IEC 62304",
            "Cybersecurity assessment",
        ]);
    }
    if high_risk_text {
        push(&["Clinical evaluation"]);
    }
    if implantable {
        push(&[
            "Long-term biocompatibility testing",
            "Mechanical fatigue and wear testing",
            "MRI safety assessment",
        ]);
    }

    recommendations.into_iter().map(str::to_string).collect()
}

fn equivalence_narrative(similarities: usize, differences: usize, high: usize) -> String {
    let text = if high >= 2 {
        "Substantial equivalence unlikely: multiple high-impact differences; consider the De Novo pathway"
    } else if high == 1 {
        "Substantial equivalence possible but requires strong justification for the high-impact difference"
    } else if differences > similarities * 2 {
        "Substantial equivalence questionable; additional testing likely required"
    } else if similarities >= differences {
        "Strong potential for substantial equivalence"
    } else {
        "Moderate potential for substantial equivalence"
    };
    text.to_string()
}

fn confidence(similarities: usize, differences: usize, high: usize) -> f64 {
    let total = similarities + differences;
    if total == 0 {
        return 0.0;
    }
    let raw = (similarities as f64 - (high * 2) as f64) / total as f64;
    raw.clamp(0.0, 1.0)
}
