use async_trait::async_trait;

use super::{ClassificationRecord, FdaDataSource, FdaError, PredicateCandidate, PredicateQuery};

/// In-memory FDA catalogue.
///
/// A candidate matches when any search term occurs in its device name or
/// intended use (case-insensitive) and the product code, if given, is equal.
/// Candidates carry no device class, so the class filter is ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticFdaSource {
    candidates: Vec<PredicateCandidate>,
    classifications: Vec<ClassificationRecord>,
}

impl StaticFdaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = PredicateCandidate>) -> Self {
        self.candidates.extend(candidates);
        self
    }

    pub fn with_classifications(
        mut self,
        records: impl IntoIterator<Item = ClassificationRecord>,
    ) -> Self {
        self.classifications.extend(records);
        self
    }
}

#[async_trait]
impl FdaDataSource for StaticFdaSource {
    async fn search_predicates(
        &self,
        query: &PredicateQuery,
    ) -> Result<Vec<PredicateCandidate>, FdaError> {
        let terms: Vec<String> = query
            .search_terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let matches: Vec<PredicateCandidate> = self
            .candidates
            .iter()
            .filter(|c| {
                query
                    .product_code
                    .as_deref()
                    .map_or(true, |code| c.product_code.eq_ignore_ascii_case(code))
            })
            .filter(|c| {
                if terms.is_empty() {
                    return true;
                }
                let haystack = format!("{} {}", c.device_name, c.intended_use).to_lowercase();
                terms.iter().any(|t| haystack.contains(t.as_str()))
            })
            .take(query.limit.max(1))
            .cloned()
            .collect();

        if matches.is_empty() {
            return Err(FdaError::NotFound {
                query: query.describe(),
            });
        }
        Ok(matches)
    }

    async fn lookup_device_classification(
        &self,
        device_name: Option<&str>,
        product_code: Option<&str>,
    ) -> Result<Vec<ClassificationRecord>, FdaError> {
        let name = device_name.map(str::to_lowercase);
        let records: Vec<ClassificationRecord> = self
            .classifications
            .iter()
            .filter(|r| product_code.map_or(true, |code| r.product_code.eq_ignore_ascii_case(code)))
            .filter(|r| {
                name.as_deref().map_or(true, |n| {
                    let device = r.device_name.to_lowercase();
                    device.contains(n) || n.contains(device.as_str())
                })
            })
            .cloned()
            .collect();

        if records.is_empty() {
            return Err(FdaError::NotFound {
                query: format!("device {:?}, product code {:?}", device_name, product_code),
            });
        }
        Ok(records)
    }

    async fn ping(&self) -> Result<(), FdaError> {
        Ok(())
    }
}
