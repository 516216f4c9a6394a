use async_trait::async_trait;
use common::FdaApiConfig;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    normalize_device_class, ClassificationRecord, FdaDataSource, FdaError, PredicateCandidate,
    PredicateQuery,
};

const PREMARKET_ENDPOINT: &str = "/device/510k.json";
const CLASSIFICATION_ENDPOINT: &str = "/device/classification.json";
const MAX_LIMIT: usize = 1000;

/// HTTP client for the openFDA device endpoints
#[derive(Debug, Clone)]
pub struct OpenFdaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenFdaSection {
    #[serde(default)]
    device_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PremarketRecord {
    #[serde(default)]
    k_number: Option<String>,
    #[serde(default)]
    device_name: Option<String>,
    #[serde(default)]
    applicant: Option<String>,
    #[serde(default)]
    decision_date: Option<String>,
    #[serde(default)]
    product_code: Option<String>,
    #[serde(default)]
    statement_or_summary: Option<String>,
    #[serde(default)]
    openfda: OpenFdaSection,
}

#[derive(Debug, Deserialize)]
struct ClassificationEntry {
    #[serde(default)]
    device_class: Option<String>,
    #[serde(default)]
    product_code: Option<String>,
    #[serde(default)]
    regulation_number: Option<String>,
    #[serde(default)]
    device_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<PremarketRecord> for PredicateCandidate {
    fn from(record: PremarketRecord) -> Self {
        let device_name = non_empty(record.device_name).unwrap_or_default();
        let intended_use = non_empty(record.statement_or_summary)
            .or_else(|| non_empty(record.openfda.device_name))
            .unwrap_or_else(|| device_name.clone());
        Self {
            clearance_number: non_empty(record.k_number).unwrap_or_default(),
            device_name,
            intended_use,
            product_code: non_empty(record.product_code).unwrap_or_default(),
            clearance_date: non_empty(record.decision_date).unwrap_or_default(),
            applicant: non_empty(record.applicant).unwrap_or_default(),
        }
    }
}

impl From<ClassificationEntry> for ClassificationRecord {
    fn from(entry: ClassificationEntry) -> Self {
        Self {
            device_class: non_empty(entry.device_class).unwrap_or_default(),
            product_code: non_empty(entry.product_code).unwrap_or_default(),
            regulation_number: non_empty(entry.regulation_number).unwrap_or_default(),
            device_name: non_empty(entry.device_name).unwrap_or_default(),
        }
    }
}

/// Strip anything that could break out of a quoted openFDA term
fn sanitize_term(term: &str) -> String {
    term.chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect::<String>()
        .trim()
        .to_string()
}

impl OpenFdaClient {
    pub fn new(config: &FdaApiConfig) -> Result<Self, FdaError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// openFDA `search` expression for a predicate query
    pub fn build_predicate_search(query: &PredicateQuery) -> Result<String, FdaError> {
        let terms: Vec<String> = query
            .search_terms
            .iter()
            .map(|t| sanitize_term(t))
            .filter(|t| !t.is_empty())
            .map(|t| format!("device_name:\"{}\"", t))
            .collect();

        let mut clauses = Vec::new();
        if !terms.is_empty() {
            clauses.push(format!("({})", terms.join(" OR ")));
        }
        if let Some(code) = query.product_code.as_deref().map(sanitize_term) {
            if !code.is_empty() {
                clauses.push(format!("product_code:\"{}\"", code.to_ascii_uppercase()));
            }
        }
        if let Some(raw) = query.device_class.as_deref() {
            let class = normalize_device_class(raw).ok_or_else(|| {
                FdaError::InvalidQuery(format!("unknown device class '{}'", raw))
            })?;
            clauses.push(format!("openfda.device_class:\"{}\"", class));
        }

        if terms.is_empty() && query.product_code.is_none() {
            return Err(FdaError::InvalidQuery(
                "a predicate search needs search terms or a product code".to_string(),
            ));
        }
        Ok(clauses.join(" AND "))
    }

    /// openFDA `search` expression for a classification lookup
    pub fn build_classification_search(
        device_name: Option<&str>,
        product_code: Option<&str>,
    ) -> Result<String, FdaError> {
        let mut clauses = Vec::new();
        if let Some(code) = product_code.map(sanitize_term).filter(|c| !c.is_empty()) {
            clauses.push(format!("product_code:\"{}\"", code.to_ascii_uppercase()));
        }
        if let Some(name) = device_name.map(sanitize_term).filter(|n| !n.is_empty()) {
            clauses.push(format!("device_name:\"{}\"", name));
        }
        if clauses.is_empty() {
            return Err(FdaError::InvalidQuery(
                "a classification lookup needs a device name or product code".to_string(),
            ));
        }
        Ok(clauses.join(" AND "))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<T>, FdaError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut params: Vec<(&str, String)> =
            vec![("limit", limit.clamp(1, MAX_LIMIT).to_string())];
        if let Some(search) = search {
            params.push(("search", search.to_string()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }

        debug!(url = %url, search = ?search, limit, "Querying openFDA");
        let response = self.http.get(&url).query(&params).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FdaError::NotFound {
                query: search.unwrap_or("<all>").to_string(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            warn!(retry_after_secs = ?retry_after_secs, "openFDA rate limit hit");
            return Err(FdaError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or(body);
            return Err(FdaError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: ApiResponse<T> =
            serde_json::from_str(&body).map_err(|e| FdaError::Decode(e.to_string()))?;
        Ok(parsed.results)
    }
}

#[async_trait]
impl FdaDataSource for OpenFdaClient {
    async fn search_predicates(
        &self,
        query: &PredicateQuery,
    ) -> Result<Vec<PredicateCandidate>, FdaError> {
        let search = Self::build_predicate_search(query)?;
        let records: Vec<PremarketRecord> =
            self.fetch(PREMARKET_ENDPOINT, Some(&search), query.limit).await?;

        let candidates: Vec<PredicateCandidate> = records
            .into_iter()
            .map(PredicateCandidate::from)
            .filter(|c| !c.clearance_number.is_empty())
            .collect();

        if candidates.is_empty() {
            return Err(FdaError::NotFound {
                query: query.describe(),
            });
        }
        debug!(count = candidates.len(), "openFDA returned predicate candidates");
        Ok(candidates)
    }

    async fn lookup_device_classification(
        &self,
        device_name: Option<&str>,
        product_code: Option<&str>,
    ) -> Result<Vec<ClassificationRecord>, FdaError> {
        let search = Self::build_classification_search(device_name, product_code)?;
        let entries: Vec<ClassificationEntry> =
            self.fetch(CLASSIFICATION_ENDPOINT, Some(&search), 10).await?;

        if entries.is_empty() {
            return Err(FdaError::NotFound { query: search });
        }
        Ok(entries.into_iter().map(ClassificationRecord::from).collect())
    }

    async fn ping(&self) -> Result<(), FdaError> {
        self.fetch::<serde_json::Value>(PREMARKET_ENDPOINT, None, 1)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(terms: &[&str]) -> PredicateQuery {
        PredicateQuery {
            search_terms: terms.iter().map(|t| t.to_string()).collect(),
            product_code: None,
            device_class: None,
            limit: 10,
        }
    }

    #[test]
    fn test_predicate_search_expression() {
        let mut q = query(&["pacemaker", "wireless"]);
        q.product_code = Some("dxy".to_string());
        q.device_class = Some("III".to_string());

        let search = OpenFdaClient::build_predicate_search(&q).unwrap();
        assert_eq!(
            search,
            "(device_name:\"pacemaker\" OR device_name:\"wireless\") AND product_code:\"DXY\" AND openfda.device_class:\"3\""
        );
    }

    #[test]
    fn test_predicate_search_strips_quotes() {
        let search = OpenFdaClient::build_predicate_search(&query(&["stent\" OR x:\"y"])).unwrap();
        assert_eq!(search, "(device_name:\"stent OR xy\")");
    }

    #[test]
    fn test_predicate_search_requires_terms_or_code() {
        assert!(matches!(
            OpenFdaClient::build_predicate_search(&query(&[])),
            Err(FdaError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_unknown_device_class_is_invalid() {
        let mut q = query(&["catheter"]);
        q.device_class = Some("V".to_string());
        assert!(OpenFdaClient::build_predicate_search(&q).is_err());
    }

    #[test]
    fn test_intended_use_fallbacks() {
        let record: PremarketRecord = serde_json::from_value(serde_json::json!({
            "k_number": "K201234",
            "device_name": "Infusion Pump",
            "openfda": {"device_name": "Pump, Infusion"}
        }))
        .unwrap();
        let candidate = PredicateCandidate::from(record);
        assert_eq!(candidate.intended_use, "Pump, Infusion");
        assert_eq!(candidate.product_code, "");
    }
}
