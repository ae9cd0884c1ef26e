// Integration tests for the paginated GRC records client.
// Run with: cargo test -p vmaster-connect --test api_client

use httpmock::prelude::*;

use vmaster_connect::{ConnectError, GrcApiClient};

fn mock_record(id: &str, rollup: &str, updated_ms: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "updated": updated_ms,
        "fields": {
            "rollup_name": rollup,
            "supplier_name": format!("Supplier {id}"),
            "erp_group": "1200 - Print Services",
            "status": "Active Supplier"
        }
    })
}

fn page_response(content: Vec<serde_json::Value>, number: u64, total_pages: u64) -> serde_json::Value {
    serde_json::json!({
        "content": content,
        "page": { "number": number, "totalPages": total_pages }
    })
}

fn client_for(server: &MockServer) -> GrcApiClient {
    GrcApiClient::new(
        server.base_url(),
        "token-123".into(),
        "wf1".into(),
        "st1".into(),
    )
}

#[test]
fn pagination_walks_every_page() {
    let server = MockServer::start();

    let page0 = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v2/records")
            .query_param("workflow-id", "wf1")
            .query_param("step-id", "st1")
            .query_param("page", "0");
        then.status(200).json_body(page_response(
            vec![
                mock_record("r1", "ACME CORP", 1_706_000_000_000),
                mock_record("r2", "WIDGET CO", 1_706_000_100_000),
            ],
            0,
            2,
        ));
    });

    let page1 = server.mock(|when, then| {
        when.method(GET).path("/api/v2/records").query_param("page", "1");
        then.status(200).json_body(page_response(
            vec![mock_record("r3", "ACME CORP", 1_706_000_200_000)],
            1,
            2,
        ));
    });

    let fetch = client_for(&server).fetch_suppliers(true).unwrap();

    page0.assert();
    page1.assert();
    assert_eq!(fetch.records.len(), 3);
    assert_eq!(fetch.skipped, 0);
    assert_eq!(fetch.records[0].record_id, "r1");
    assert_eq!(fetch.records[2].record_id, "r3");
    assert!(fetch.records[0].updated.is_some());
}

#[test]
fn empty_first_page_yields_no_records() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/api/v2/records");
        then.status(200).json_body(page_response(vec![], 0, 1));
    });

    let fetch = client_for(&server).fetch_suppliers(true).unwrap();
    assert!(fetch.records.is_empty());
}

#[test]
fn broken_records_are_skipped_not_fatal() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/api/v2/records");
        then.status(200).json_body(page_response(
            vec![
                mock_record("r1", "ACME CORP", 1_706_000_000_000),
                serde_json::json!({"fields": {"supplier_name": "No Id Corp"}}),
            ],
            0,
            1,
        ));
    });

    let fetch = client_for(&server).fetch_suppliers(true).unwrap();
    assert_eq!(fetch.records.len(), 1);
    assert_eq!(fetch.skipped, 1);
}

#[test]
fn missing_content_array_is_fatal() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/api/v2/records");
        then.status(200).json_body(serde_json::json!({"unexpected": true}));
    });

    let err = client_for(&server).fetch_suppliers(true).unwrap_err();
    assert!(matches!(err, ConnectError::Upstream { .. }));
}

#[test]
fn auth_rejection_fails_without_retry() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/v2/records");
        then.status(401)
            .json_body(serde_json::json!({"message": "bad token"}));
    });

    let err = client_for(&server).fetch_suppliers(true).unwrap_err();
    assert!(matches!(err, ConnectError::Auth { status: 401, .. }));
    assert_eq!(mock.hits(), 1);
}

#[test]
fn server_errors_exhaust_retries() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/v2/records");
        then.status(429)
            .header("retry-after", "0")
            .json_body(serde_json::json!({"message": "slow down"}));
    });

    let err = client_for(&server).fetch_suppliers(true).unwrap_err();
    assert!(matches!(err, ConnectError::Http { .. }));
    // 1 initial + 3 retries
    assert_eq!(mock.hits(), 4);
}
