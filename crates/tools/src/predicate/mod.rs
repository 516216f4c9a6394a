//! Predicate search and comparison engine.
//!
//! Candidates from an [`FdaDataSource`](crate::fda::FdaDataSource) are scored
//! against the target device by keyword overlap ([`similarity`]), compared
//! characteristic by characteristic ([`comparison`]) and ranked with overall
//! statistics and recommendations ([`ranking`]). [`PredicateMatcher`] ties
//! these together.

pub mod characteristics;
pub mod comparison;
pub mod engine;
pub mod keywords;
pub mod ranking;
pub mod similarity;
pub mod types;

pub use characteristics::{
    extract_technological_characteristics, CharacteristicCategory, CharacteristicMap,
    NOT_SPECIFIED,
};
pub use comparison::{
    build_comparison_matrix, ComparisonMatrix, Impact, RiskLevel, SimilarityLevel,
    TechnicalCharacteristic,
};
pub use engine::{PredicateMatcher, TargetDevice};
pub use keywords::{extract_keywords, ranked_keywords};
pub use similarity::{SimilarityBreakdown, SimilarityScore, SimilarityScorer};
pub use types::{
    PredicateMatch, PredicateSearchResult, SearchStatistics, SearchSummary, SourceCitation,
};
