//! Fixed taxonomy of technological characteristics and the lookup that maps
//! free text onto it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::keywords::NormalizedText;

/// Value recorded for a category with no matching keyword
pub const NOT_SPECIFIED: &str = "not specified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicCategory {
    Materials,
    EnergySource,
    Connectivity,
    Software,
    Sterilization,
    Implantation,
    Measurement,
}

impl CharacteristicCategory {
    pub const ALL: [CharacteristicCategory; 7] = [
        Self::Materials,
        Self::EnergySource,
        Self::Connectivity,
        Self::Software,
        Self::Sterilization,
        Self::Implantation,
        Self::Measurement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Materials => "materials",
            Self::EnergySource => "energy_source",
            Self::Connectivity => "connectivity",
            Self::Software => "software",
            Self::Sterilization => "sterilization",
            Self::Implantation => "implantation",
            Self::Measurement => "measurement",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::EnergySource => "energy source",
            other => other.as_str(),
        }
    }

    /// Keyword table, in the order matches are reported
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Materials => &[
                "titanium",
                "stainless steel",
                "cobalt chromium",
                "cobalt chrome",
                "nitinol",
                "peek",
                "uhmwpe",
                "polyethylene",
                "polyurethane",
                "polypropylene",
                "silicone",
                "ptfe",
                "polymer",
                "ceramic",
                "hydroxyapatite",
                "hydrogel",
                "collagen",
                "latex",
                "nylon",
                "plastic",
                "alloy",
            ],
            Self::EnergySource => &[
                "battery",
                "rechargeable",
                "lithium",
                "ac power",
                "mains power",
                "electrical",
                "electric",
                "radiofrequency",
                "laser",
                "ultrasonic",
                "pneumatic",
                "solar",
                "inductive charging",
                "manual",
            ],
            Self::Connectivity => &[
                "wireless",
                "bluetooth",
                "wifi",
                "wi fi",
                "cellular",
                "telemetry",
                "nfc",
                "rfid",
                "usb",
                "ethernet",
                "network",
                "internet",
                "cloud",
                "remote monitoring",
            ],
            Self::Software => &[
                "software",
                "firmware",
                "algorithm",
                "artificial intelligence",
                "machine learning",
                "deep learning",
                "neural network",
                "ai",
                "mobile app",
                "app",
            ],
            Self::Sterilization => &[
                "sterile",
                "sterilized",
                "sterilization",
                "ethylene oxide",
                "eto",
                "gamma irradiation",
                "irradiation",
                "autoclave",
                "steam",
                "single use",
                "reusable",
                "disposable",
            ],
            Self::Implantation => &[
                "implant",
                "implantable",
                "implanted",
                "pacemaker",
                "subcutaneous",
                "transcatheter",
                "intravascular",
                "endovascular",
                "intraocular",
                "absorbable",
                "bioresorbable",
            ],
            Self::Measurement => &[
                "sensor",
                "monitor",
                "monitoring",
                "measurement",
                "measure",
                "glucose",
                "blood pressure",
                "heart rate",
                "ecg",
                "ekg",
                "electrocardiogram",
                "spo2",
                "oxygen saturation",
                "pulse oximetry",
                "temperature",
                "imaging",
            ],
        }
    }
}

impl fmt::Display for CharacteristicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category -> comma-joined matched terms (or [`NOT_SPECIFIED`])
pub type CharacteristicMap = BTreeMap<CharacteristicCategory, String>;

/// Map free text onto the characteristic taxonomy
pub fn extract_technological_characteristics(
    description: &str,
    intended_use: &str,
    extra_terms: &[String],
) -> CharacteristicMap {
    let text = NormalizedText::from_parts(
        [description, intended_use]
            .into_iter()
            .chain(extra_terms.iter().map(String::as_str)),
    );

    CharacteristicCategory::ALL
        .iter()
        .map(|category| {
            let found = text.matches(category.keywords());
            let value = if found.is_empty() {
                NOT_SPECIFIED.to_string()
            } else {
                found.join(", ")
            };
            (*category, value)
        })
        .collect()
}

/// Every single-word taxonomy keyword, across all categories
pub fn taxonomy_terms() -> BTreeSet<String> {
    CharacteristicCategory::ALL
        .iter()
        .flat_map(|category| category.keywords().iter())
        .filter(|keyword| !keyword.contains(' '))
        .map(|keyword| keyword.to_string())
        .collect()
}

/// Split a characteristic value back into its terms
pub fn split_terms(value: &str) -> BTreeSet<String> {
    if is_unspecified(value) {
        return BTreeSet::new();
    }
    value
        .split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

pub fn is_unspecified(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case(NOT_SPECIFIED)
}
