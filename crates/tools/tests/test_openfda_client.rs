use common::FdaApiConfig;
use serde_json::json;
use tools::{FdaDataSource, FdaError, OpenFdaClient, PredicateQuery};
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn client(server: &MockServer, api_key: Option<&str>) -> OpenFdaClient {
    let config = FdaApiConfig {
        base_url: server.uri(),
        api_key: api_key.map(str::to_string),
        request_timeout_secs: 5,
        ..Default::default()
    };
    OpenFdaClient::new(&config).expect("client")
}

fn pacemaker_query() -> PredicateQuery {
    PredicateQuery {
        search_terms: vec!["pacemaker".to_string()],
        product_code: Some("DXY".to_string()),
        device_class: None,
        limit: 30,
    }
}

#[tokio::test]
async fn test_search_predicates_maps_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device/510k.json"))
        .and(query_param("limit", "30"))
        .and(query_param(
            "search",
            "(device_name:\"pacemaker\") AND product_code:\"DXY\"",
        ))
        .and(query_param("api_key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"results": {"total": 2}},
            "results": [
                {
                    "k_number": "K213456",
                    "device_name": "Cardiac Rhythm Pacemaker System",
                    "applicant": "Acme Medical",
                    "decision_date": "2021-06-01",
                    "product_code": "DXY",
                    "statement_or_summary": "Treatment of bradycardia via rhythm regulation",
                    "openfda": {"device_name": "Pacemaker"}
                },
                {
                    "device_name": "Record without a clearance number"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let candidates = client(&server, Some("secret"))
        .search_predicates(&pacemaker_query())
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.clearance_number, "K213456");
    assert_eq!(c.intended_use, "Treatment of bradycardia via rhythm regulation");
    assert_eq!(c.applicant, "Acme Medical");
    assert_eq!(
        c.clearance_date(),
        chrono::NaiveDate::from_ymd_opt(2021, 6, 1)
    );
}

#[tokio::test]
async fn test_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device/510k.json"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "NOT_FOUND", "message": "No matches found!"}
        })))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .search_predicates(&pacemaker_query())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_empty_results_are_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device/510k.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .search_predicates(&pacemaker_query())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "42"))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .search_predicates(&pacemaker_query())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FdaError::RateLimited {
            retry_after_secs: Some(42)
        }
    ));
}

#[tokio::test]
async fn test_server_error_carries_api_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"code": "SERVER_ERROR", "message": "Elasticsearch unavailable"}
        })))
        .mount(&server)
        .await;

    match client(&server, None).ping().await {
        Err(FdaError::Http { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Elasticsearch unavailable");
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .search_predicates(&pacemaker_query())
        .await
        .unwrap_err();
    assert!(matches!(err, FdaError::Decode(_)));
}

#[tokio::test]
async fn test_classification_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device/classification.json"))
        .and(query_param("search", "product_code:\"DXY\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "device_class": "3",
                "product_code": "DXY",
                "regulation_number": "870.3610",
                "device_name": "Implantable Pacemaker Pulse Generator"
            }]
        })))
        .mount(&server)
        .await;

    let records = client(&server, None)
        .lookup_device_classification(None, Some("dxy"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].device_class, "3");
    assert_eq!(records[0].regulation_number, "870.3610");
}

#[tokio::test]
async fn test_ping_succeeds_against_healthy_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device/510k.json"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{}]})))
        .mount(&server)
        .await;

    assert!(client(&server, None).ping().await.is_ok());
}
