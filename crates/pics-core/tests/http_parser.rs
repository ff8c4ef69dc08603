//! Integration tests for HttpConditionParser.
//!
//! Uses wiremock for HTTP mocking. Covers the batch contract, bearer auth,
//! status mapping (400/429/5xx) and retry behaviour.

use pics_core::{
    Applicability, ConditionParser, EngineConfig, FilterRequest, FilterService,
    HttpConditionParser, ParserConfig, ParserError, PicsItem, SpecData,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn parser_config(mock_server: &MockServer, max_retries: u32) -> ParserConfig {
    ParserConfig {
        url: Some(mock_server.uri()),
        token: Some("test-token".to_string()),
        timeout_secs: 5,
        max_retries,
    }
}

fn parsed(antecedent: &str, then: &str) -> serde_json::Value {
    json!({"antecedent": antecedent, "then": then, "else": "N/A", "references": []})
}

#[tokio::test]
async fn test_parse_batch_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse/batch"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({"expressions": ["when A.1", "when A.2"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [parsed("A.1", "M"), parsed("A.2", "O")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let parser = HttpConditionParser::new(&parser_config(&mock_server, 0)).unwrap();
    let results = parser
        .parse_batch(&["when A.1".to_string(), "when A.2".to_string()])
        .await
        .expect("batch failed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[1].antecedent, "A.2");
    assert_eq!(results[1].then_value, "O");
}

#[tokio::test]
async fn test_parse_one_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse"))
        .and(body_json(json!({"expression": "needs PC_X"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(parsed("PC_X", "R")))
        .mount(&mock_server)
        .await;

    let parser = HttpConditionParser::new(&parser_config(&mock_server, 0)).unwrap();
    let result = parser.parse_one("needs PC_X").await.unwrap();
    assert_eq!(result.antecedent, "PC_X");
    assert_eq!(result.else_value, "N/A");
}

#[tokio::test]
async fn test_429_retries_then_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse/batch"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/parse/batch"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"results": [parsed("A.1", "M")]})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let parser = HttpConditionParser::new(&parser_config(&mock_server, 2)).unwrap();
    let results = parser.parse_batch(&["x".to_string()]).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_400_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad expression"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let parser = HttpConditionParser::new(&parser_config(&mock_server, 3)).unwrap();
    let err = parser.parse_one("???").await.unwrap_err();
    match err {
        ParserError::InvalidResponse { message } => assert!(message.contains("bad expression")),
        other => panic!("expected InvalidResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_5xx_exhausts_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse/batch"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let parser = HttpConditionParser::new(&parser_config(&mock_server, 1)).unwrap();
    let err = parser.parse_batch(&["x".to_string()]).await.unwrap_err();
    assert!(matches!(err, ParserError::Network { .. }));
}

#[tokio::test]
async fn test_service_resolves_through_http_parser() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/parse/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [parsed("A.4 OR A.5", "M")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = EngineConfig::default()
        .with_parser_url(mock_server.uri())
        .with_parser_token("test-token");
    let service = FilterService::from_config(config).unwrap();

    let spec: SpecData = serde_json::from_value(json!({
        "test_cases": [
            {"test_id": "T1", "applicability_condition": "C1"},
            {"test_id": "T2", "applicability_condition": "C1"}
        ],
        "c_conditions": [
            {"condition_id": "C1", "definition": "Mandatory for devices with A.4 or A.5"}
        ]
    }))
    .unwrap();
    let request = FilterRequest::inline(vec![PicsItem::new("A.5", true)], spec);

    let result = service.filter(&request).await.unwrap();
    assert_eq!(result.matched_test_ids, vec!["T1", "T2"]);
    assert_eq!(
        result.report("T2").unwrap().evaluation_result,
        Applicability::Mandatory
    );
    assert_eq!(result.metadata.fallback.parser_calls, 1);
    assert_eq!(result.metadata.fallback.cache_misses, 1);
}
