//! FDA device classification: a keyword heuristic confirmed, when possible,
//! by the FDA product classification database.

use anyhow::Result;
use common::OperationTimer;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::fda::{
    normalize_device_class, roman_device_class, ClassificationRecord, FdaDataSource, FdaError,
};
use crate::predicate::keywords::{ranked_keywords, NormalizedText};
use crate::{Tool, ToolHealth, ToolInput, ToolOutput, ToolSpec};

pub const TOOL_NAME: &str = "device_classification";

const CLASS_III_INDICATORS: &[&str] = &[
    "life sustaining",
    "life supporting",
    "implantable",
    "implanted",
    "pacemaker",
    "defibrillator",
    "heart valve",
    "neurostimulator",
    "ventricular assist",
    "artificial heart",
    "cardiovascular",
    "neurological",
];

const CLASS_II_INDICATORS: &[&str] = &[
    "monitor",
    "monitoring",
    "diagnostic",
    "surgical",
    "powered",
    "electrical",
    "software",
    "sensor",
    "infusion",
    "ultrasound",
    "imaging",
    "catheter",
    "wireless",
    "laser",
];

const CLASS_I_INDICATORS: &[&str] = &[
    "bandage",
    "tongue depressor",
    "examination glove",
    "stethoscope",
    "elastic",
    "wheelchair",
    "toothbrush",
    "walker",
    "manual",
    "non invasive",
];

const FDA_CONFIRMED_CONFIDENCE: f64 = 0.9;
const NO_INDICATOR_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// "I", "II" or "III"
    pub device_class: String,
    pub product_codes: Vec<String>,
    pub regulation_numbers: Vec<String>,
    pub confidence: f64,
    /// Weighted indicator count: 3 per class III hit, 2 per class II, 1 per class I
    pub risk_score: u32,
    pub reasoning: Vec<String>,
    pub regulatory_pathway: String,
    pub cfr_references: Vec<String>,
    pub fda_confirmed: bool,
    pub sources: Vec<String>,
}

/// Outcome of the keyword heuristic alone
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicClass {
    pub class: u8,
    pub confidence: f64,
    pub risk_score: u32,
    pub reasoning: Vec<String>,
}

pub fn heuristic_classification(description: &str, intended_use: &str) -> HeuristicClass {
    let text = NormalizedText::from_parts([description, intended_use]);
    let class_iii = text.matches(CLASS_III_INDICATORS);
    let class_ii = text.matches(CLASS_II_INDICATORS);
    let class_i = text.matches(CLASS_I_INDICATORS);

    let risk_score = (class_iii.len() * 3 + class_ii.len() * 2 + class_i.len()) as u32;
    let (class, hits) = if !class_iii.is_empty() {
        (3, &class_iii)
    } else if !class_ii.is_empty() {
        (2, &class_ii)
    } else if !class_i.is_empty() {
        (1, &class_i)
    } else {
        return HeuristicClass {
            class: 2,
            confidence: NO_INDICATOR_CONFIDENCE,
            risk_score,
            reasoning: vec![
                "No classification indicators found; assuming Class II pending FDA confirmation"
                    .to_string(),
            ],
        };
    };

    let confidence = (0.5 + 0.1 * hits.len() as f64).min(0.85);
    HeuristicClass {
        class,
        confidence,
        risk_score,
        reasoning: vec![format!(
            "Class {} indicators in description: {}",
            roman_device_class(&class.to_string()),
            hits.join(", ")
        )],
    }
}

pub fn regulatory_pathway(class: u8) -> &'static str {
    match class {
        1 => "510(k) exempt (general controls)",
        2 => "510(k) premarket notification",
        _ => "Premarket approval (PMA)",
    }
}

fn cfr_references(class: u8, regulation_numbers: &[String]) -> Vec<String> {
    let mut refs = vec!["21 CFR Part 860 (medical device classification procedures)".to_string()];
    refs.push(
        match class {
            1 => "21 CFR Part 807 Subpart E (exemptions from premarket notification)",
            2 => "21 CFR Part 807 Subpart E (premarket notification)",
            _ => "21 CFR Part 814 (premarket approval)",
        }
        .to_string(),
    );
    refs.extend(regulation_numbers.iter().map(|r| format!("21 CFR {}", r)));
    refs
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Classifies a device and names its regulatory pathway
pub struct DeviceClassificationTool {
    source: Arc<dyn FdaDataSource>,
}

impl DeviceClassificationTool {
    pub fn new(source: Arc<dyn FdaDataSource>) -> Self {
        Self { source }
    }

    pub async fn classify(&self, input: &ToolInput) -> Result<ClassificationResult, ToolError> {
        let description = input.require_str("device_description")?;
        let intended_use = input.require_str("intended_use")?;
        let device_type = input.get_str("device_type");

        let heuristic = heuristic_classification(description, intended_use);
        let mut reasoning = heuristic.reasoning.clone();
        let mut sources = vec!["Keyword classification heuristic".to_string()];

        let lookup_name = device_type
            .map(str::to_string)
            .or_else(|| ranked_keywords(description, 1).into_iter().next());
        let records = match lookup_name.as_deref() {
            Some(name) => self.lookup(name, &mut reasoning).await?,
            None => Vec::new(),
        };

        let mut product_codes = Vec::new();
        let mut regulation_numbers = Vec::new();
        for record in &records {
            push_unique(&mut product_codes, &record.product_code);
            push_unique(&mut regulation_numbers, &record.regulation_number);
        }

        // most restrictive class listed by FDA wins
        let fda_class = records
            .iter()
            .filter_map(|r| normalize_device_class(&r.device_class))
            .filter_map(|c| c.parse::<u8>().ok())
            .max();

        let (class, confidence, fda_confirmed) = match fda_class {
            Some(class) => {
                if class != heuristic.class {
                    reasoning.push(format!(
                        "FDA classification (Class {}) overrides heuristic estimate (Class {})",
                        roman_device_class(&class.to_string()),
                        roman_device_class(&heuristic.class.to_string())
                    ));
                } else {
                    reasoning.push("FDA classification database confirms heuristic estimate".to_string());
                }
                sources.push("FDA Product Classification Database".to_string());
                (class, FDA_CONFIRMED_CONFIDENCE, true)
            }
            None => (heuristic.class, heuristic.confidence, false),
        };

        Ok(ClassificationResult {
            device_class: roman_device_class(&class.to_string()),
            cfr_references: cfr_references(class, &regulation_numbers),
            product_codes,
            regulation_numbers,
            confidence,
            risk_score: heuristic.risk_score,
            reasoning,
            regulatory_pathway: regulatory_pathway(class).to_string(),
            fda_confirmed,
            sources,
        })
    }

    /// Only a "no match" answer falls back to the heuristic; outages propagate
    async fn lookup(
        &self,
        name: &str,
        reasoning: &mut Vec<String>,
    ) -> Result<Vec<ClassificationRecord>, FdaError> {
        match self.source.lookup_device_classification(Some(name), None).await {
            Ok(records) => {
                debug!(device = name, count = records.len(), "FDA classification records found");
                Ok(records)
            }
            Err(e) if e.is_not_found() => {
                reasoning.push(format!("No FDA classification record found for '{}'", name));
                Ok(Vec::new())
            }
            Err(e) => {
                warn!(device = name, error = %e, "FDA classification lookup failed");
                Err(e)
            }
        }
    }
}

#[async_trait::async_trait]
impl Tool for DeviceClassificationTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_NAME.to_string(),
            description: "Estimate FDA device class and regulatory pathway".to_string(),
            usage: "device_classification {device_description, intended_use, device_type?}"
                .to_string(),
            examples: vec![
                r#"{"device_description": "Adhesive bandage", "intended_use": "Cover minor cuts"}"#
                    .to_string(),
            ],
            input_schema: json!({
                "type": "object",
                "required": ["device_description", "intended_use"],
                "properties": {
                    "device_description": {"type": "string"},
                    "intended_use": {"type": "string"},
                    "device_type": {"type": "string"}
                }
            }),
        }
    }

    async fn execute(&self, input: ToolInput) -> Result<ToolOutput> {
        let mut timer = OperationTimer::new("device_classification");
        let result = self.classify(&input).await;
        if let Ok(classification) = &result {
            timer.add_field("device_class", &classification.device_class);
            timer.add_field("fda_confirmed", classification.fda_confirmed);
        }
        timer.finish_with_result(&result);

        let classification = result?;
        Ok(ToolOutput::ok(serde_json::to_value(&classification)?)
            .with_metadata("device_class", classification.device_class.clone())
            .with_metadata("regulatory_pathway", classification.regulatory_pathway.clone()))
    }

    async fn check_health(&self) -> Option<ToolHealth> {
        Some(match self.source.ping().await {
            Ok(()) => ToolHealth::healthy("FDA data source reachable"),
            Err(e) => ToolHealth::unhealthy(format!("FDA data source unreachable: {}", e)),
        })
    }
}
