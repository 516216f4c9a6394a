//! FDA data source contract.
//!
//! The predicate search and classification tools only talk to the FDA through
//! [`FdaDataSource`]. [`OpenFdaClient`] is the HTTP implementation against the
//! public openFDA API; [`StaticFdaSource`] serves a fixed in-memory catalogue.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod client;
mod static_source;

pub use client::OpenFdaClient;
pub use static_source::StaticFdaSource;

/// FDA data source errors
#[derive(Debug, Error)]
pub enum FdaError {
    /// The query was valid but matched nothing
    #[error("No matching FDA records found for {query}")]
    NotFound { query: String },

    #[error("FDA API rate limit exceeded (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("FDA API returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("FDA API transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode FDA API response: {0}")]
    Decode(String),

    #[error("Invalid FDA query: {0}")]
    InvalidQuery(String),
}

impl FdaError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A previously cleared device returned by a predicate search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateCandidate {
    /// 510(k) number, e.g. `K193456`
    pub clearance_number: String,
    pub device_name: String,
    pub intended_use: String,
    pub product_code: String,
    /// ISO date (`YYYY-MM-DD`); `YYYYMMDD` is also accepted
    pub clearance_date: String,
    pub applicant: String,
}

impl PredicateCandidate {
    pub fn clearance_date(&self) -> Option<NaiveDate> {
        parse_fda_date(&self.clearance_date)
    }
}

/// Search parameters for [`FdaDataSource::search_predicates`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredicateQuery {
    pub search_terms: Vec<String>,
    pub product_code: Option<String>,
    pub device_class: Option<String>,
    pub limit: usize,
}

impl PredicateQuery {
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("terms [{}]", self.search_terms.join(", "))];
        if let Some(code) = &self.product_code {
            parts.push(format!("product code {}", code));
        }
        if let Some(class) = &self.device_class {
            parts.push(format!("class {}", class));
        }
        parts.join(", ")
    }
}

/// Device classification entry from the FDA product classification database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// "1", "2", "3" (openFDA form) or "U"/"N" for unclassified
    pub device_class: String,
    pub product_code: String,
    pub regulation_number: String,
    pub device_name: String,
}

#[async_trait]
pub trait FdaDataSource: Send + Sync {
    /// Fails with [`FdaError::NotFound`] when nothing matches
    async fn search_predicates(
        &self,
        query: &PredicateQuery,
    ) -> Result<Vec<PredicateCandidate>, FdaError>;

    /// Fails with [`FdaError::NotFound`] when nothing matches
    async fn lookup_device_classification(
        &self,
        device_name: Option<&str>,
        product_code: Option<&str>,
    ) -> Result<Vec<ClassificationRecord>, FdaError>;

    /// Cheap reachability probe
    async fn ping(&self) -> Result<(), FdaError>;
}

/// Parse `YYYY-MM-DD` or `YYYYMMDD`
pub fn parse_fda_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

/// Normalize a device class to openFDA's digit form ("II", "Class 2" -> "2")
pub fn normalize_device_class(raw: &str) -> Option<String> {
    let cleaned = raw.trim().to_ascii_uppercase();
    let cleaned = cleaned.strip_prefix("CLASS").unwrap_or(&cleaned).trim();
    match cleaned {
        "1" | "I" => Some("1".to_string()),
        "2" | "II" => Some("2".to_string()),
        "3" | "III" => Some("3".to_string()),
        _ => None,
    }
}

/// Roman numeral form used in reports ("2" -> "II")
pub fn roman_device_class(class: &str) -> String {
    match normalize_device_class(class).as_deref() {
        Some("1") => "I".to_string(),
        Some("2") => "II".to_string(),
        Some("3") => "III".to_string(),
        _ => class.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("II", Some("2"))]
    #[case("class ii", Some("2"))]
    #[case("Class 3", Some("3"))]
    #[case("1", Some("1"))]
    #[case("IV", None)]
    #[case("", None)]
    fn test_normalize_device_class(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_device_class(raw).as_deref(), expected);
    }

    #[test]
    fn test_parse_fda_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 14);
        assert_eq!(parse_fda_date("2021-03-14"), expected);
        assert_eq!(parse_fda_date("20210314"), expected);
        assert_eq!(parse_fda_date("14/03/2021"), None);
    }

    #[test]
    fn test_roman_device_class() {
        assert_eq!(roman_device_class("2"), "II");
        assert_eq!(roman_device_class("U"), "U");
    }
}
