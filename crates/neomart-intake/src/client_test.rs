use serde_json::json;

use super::*;

#[test]
fn new_rejects_unparseable_endpoint() {
    let err = OrderClient::new("not a url", 30, DEFAULT_USER_AGENT, None).unwrap_err();
    assert!(matches!(err, SubmitError::InvalidEndpoint { .. }));
}

#[test]
fn new_rejects_non_http_scheme() {
    let err = OrderClient::new("ftp://orders.example.com", 30, DEFAULT_USER_AGENT, None)
        .unwrap_err();
    match err {
        SubmitError::InvalidEndpoint { endpoint, reason } => {
            assert_eq!(endpoint, "ftp://orders.example.com");
            assert!(reason.contains("ftp"), "reason: {reason}");
        }
        other => panic!("expected InvalidEndpoint, got {other:?}"),
    }
}

#[test]
fn new_keeps_endpoint_path() {
    let client = OrderClient::new(
        "https://api.example.com/functions/v1/create-order",
        30,
        DEFAULT_USER_AGENT,
        Some("anon-key"),
    )
    .expect("client construction should not fail");
    assert_eq!(client.endpoint().path(), "/functions/v1/create-order");
}

#[test]
fn from_config_requires_intake_url() {
    let config = AppConfig {
        env: neomart_core::Environment::Test,
        log_level: "info".to_owned(),
        order_intake_url: None,
        api_key: None,
        request_timeout_secs: 30,
        user_agent: String::new(),
        default_delivery_cost: 5000,
        stores_path: None,
        submit_max_retries: 0,
        submit_retry_backoff_base_ms: 1000,
        idempotency_ttl_secs: 86_400,
    };
    let err = OrderClient::from_config(&config).unwrap_err();
    match err {
        SubmitError::InvalidEndpoint { reason, .. } => {
            assert!(reason.contains("NEOMART_ORDER_INTAKE_URL"));
        }
        other => panic!("expected InvalidEndpoint, got {other:?}"),
    }
}

#[test]
fn rejection_message_prefers_error_field() {
    let msg = rejection_message(
        StatusCode::BAD_REQUEST,
        r#"{"error":"missing customer_phone","message":"bad request"}"#,
    );
    assert_eq!(msg, "missing customer_phone");
}

#[test]
fn rejection_message_reads_nested_error_object() {
    let msg = rejection_message(
        StatusCode::CONFLICT,
        r#"{"error":{"code":"23505","message":"duplicate idempotency key"}}"#,
    );
    assert_eq!(msg, "duplicate idempotency key");
}

#[test]
fn rejection_message_falls_back_to_message_field() {
    let msg = rejection_message(StatusCode::FORBIDDEN, r#"{"message":"invalid api key"}"#);
    assert_eq!(msg, "invalid api key");
}

#[test]
fn rejection_message_uses_status_for_non_json_body() {
    let msg = rejection_message(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
    assert_eq!(msg, "HTTP 500: Internal Server Error");
}

#[test]
fn rejection_message_ignores_blank_error() {
    let msg = rejection_message(StatusCode::BAD_GATEWAY, r#"{"error":"   "}"#);
    assert_eq!(msg, "HTTP 502: Bad Gateway");
}

#[test]
fn acceptance_reads_orders_list() {
    let acceptance = OrderAcceptance {
        payload: json!({
            "success": true,
            "message": "created",
            "orders": [
                { "order_code": "ORD-250101-AB12", "id": 1 },
                { "orderCode": "ORD-250101-CD34", "id": 2 }
            ]
        }),
    };
    assert_eq!(acceptance.message(), Some("created"));
    assert_eq!(acceptance.confirmed_orders().len(), 2);
    assert_eq!(
        acceptance.order_codes(),
        vec!["ORD-250101-AB12".to_owned(), "ORD-250101-CD34".to_owned()]
    );
}

#[test]
fn acceptance_reads_single_order_object() {
    let acceptance = OrderAcceptance {
        payload: json!({ "success": true, "order": { "order_code": "ORD-250101-AB12" } }),
    };
    assert_eq!(acceptance.order_codes(), vec!["ORD-250101-AB12".to_owned()]);
}

#[test]
fn acceptance_falls_back_to_top_level_fields() {
    let acceptance = OrderAcceptance {
        payload: json!({ "success": true, "order_code": "ORD-250101-AB12" }),
    };
    assert_eq!(acceptance.confirmed_orders().len(), 1);
    assert_eq!(acceptance.order_codes(), vec!["ORD-250101-AB12".to_owned()]);
}

#[test]
fn acceptance_without_codes_is_empty() {
    let acceptance = OrderAcceptance {
        payload: json!({ "success": true }),
    };
    assert!(acceptance.order_codes().is_empty());
    assert_eq!(acceptance.message(), None);
}
