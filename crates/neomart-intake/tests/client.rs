//! Integration tests for `OrderClient` using wiremock HTTP mocks.

use chrono::Utc;
use neomart_core::{LineItem, Order};
use neomart_intake::{
    submit_with_retry, FailureKind, IdempotencyLedger, OrderClient, OrderParser, SubmitError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTAKE_PATH: &str = "/functions/v1/create-order";

fn test_client(base_url: &str) -> OrderClient {
    OrderClient::new(
        &format!("{base_url}{INTAKE_PATH}"),
        30,
        "neomart-test/0.1",
        Some("test-key"),
    )
    .expect("client construction should not fail")
}

fn sample_order() -> Order {
    let mut order = Order::new(5000, Utc::now());
    order.customer_name = "أحمد".to_owned();
    order.customer_phone = "07701234567".to_owned();
    order.customer_address = "بغداد، الكرادة".to_owned();
    order.customer_city = "بغداد".to_owned();
    order.main_store_name = "متجر الأمل".to_owned();
    order.items.push(LineItem {
        product_id: "prod-1".to_owned(),
        product_name: "قلم".to_owned(),
        quantity: 2,
        price: 1500,
        discounted_price: None,
        assigned_store_id: None,
        main_store_name: "متجر الأمل".to_owned(),
    });
    order.recompute_totals();
    order
}

#[tokio::test]
async fn submit_returns_acceptance_on_success() {
    let server = MockServer::start().await;
    let order = sample_order();

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "message": "تم إنشاء الطلب",
            "orders": [{ "order_code": order.order_code }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let acceptance = client.submit(&order).await.expect("order should be accepted");

    assert_eq!(acceptance.message(), Some("تم إنشاء الطلب"));
    assert_eq!(acceptance.order_codes(), vec![order.order_code.clone()]);
}

#[tokio::test]
async fn submit_sends_json_headers_and_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .and(header("content-type", "application/json"))
        .and(header("apikey", "test-key"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client
        .submit(&sample_order())
        .await
        .expect("headers should match the mock");
}

#[tokio::test]
async fn submit_body_carries_order_fields() {
    let server = MockServer::start().await;
    let order = sample_order();

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .and(body_partial_json(serde_json::json!({
            "order_code": order.order_code,
            "idempotency_key": order.idempotency_key,
            "customer_phone": "07701234567",
            "subtotal": 3000,
            "delivery_cost": 5000,
            "total_amount": 8000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client
        .submit(&order)
        .await
        .expect("body should match the mock");
}

#[tokio::test]
async fn application_rejection_is_not_a_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "error": "duplicate idempotency key"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.submit(&sample_order()).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Rejected);
    assert!(err.is_duplicate());
    match err {
        SubmitError::ApplicationRejected { message } => {
            assert_eq!(message, "duplicate idempotency key");
        }
        other => panic!("expected ApplicationRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_with_html_body_reports_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>boom</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.submit(&sample_order()).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Server);
    match err {
        SubmitError::ServerRejected { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("500"), "message: {message}");
        }
        other => panic!("expected ServerRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn client_error_uses_body_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "customer_phone is required"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.submit(&sample_order()).await.unwrap_err();

    match err {
        SubmitError::ServerRejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "customer_phone is required");
        }
        other => panic!("expected ServerRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn success_status_with_non_json_body_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.submit(&sample_order()).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Protocol);
    assert!(matches!(err, SubmitError::InvalidResponse { .. }));
}

#[tokio::test]
async fn success_status_without_success_flag_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "created"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.submit(&sample_order()).await.unwrap_err();

    match err {
        SubmitError::ApplicationRejected { message } => assert_eq!(message, "created"),
        other => panic!("expected ApplicationRejected, got {other:?}"),
    }
}

/// Serves one connection: reads the full request, writes `response`, closes.
async fn serve_raw_once(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.expect("read request");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }
        socket.write_all(response).await.expect("write response");
        socket.shutdown().await.ok();
    });
    format!("http://{addr}")
}

fn request_complete(request: &[u8]) -> bool {
    let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}

#[tokio::test]
async fn truncated_error_body_falls_back_to_status_message() {
    let base = serve_raw_once(
        b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\nConnection: close\r\n\r\nabc",
    )
    .await;

    let client = test_client(&base);
    let err = client.submit(&sample_order()).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Server);
    match err {
        SubmitError::ServerRejected { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "HTTP 500: Internal Server Error");
        }
        other => panic!("expected ServerRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn truncated_success_body_is_invalid_response() {
    let base = serve_raw_once(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\nConnection: close\r\n\r\n{\"succ",
    )
    .await;

    let client = test_client(&base);
    let err = client.submit(&sample_order()).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Protocol);
    assert!(matches!(err, SubmitError::InvalidResponse { .. }));
}

#[tokio::test]
async fn unreachable_endpoint_is_connectivity_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = test_client(&format!("http://{addr}"));
    let err = client.submit(&sample_order()).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Connectivity);
    assert!(matches!(err, SubmitError::Network(_)));
}

#[tokio::test]
async fn submit_all_reports_partial_success() {
    let server = MockServer::start().await;
    let accepted = sample_order();
    let rejected = sample_order();

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .and(body_partial_json(serde_json::json!({
            "order_code": accepted.order_code
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .and(body_partial_json(serde_json::json!({
            "order_code": rejected.order_code
        })))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let outcomes = client
        .submit_all(&[accepted.clone(), rejected.clone()])
        .await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].order_code, accepted.order_code);
    assert_eq!(outcomes[0].idempotency_key, accepted.idempotency_key);
    assert!(outcomes[0].result.is_ok());
    assert_eq!(outcomes[1].order_code, rejected.order_code);
    assert!(matches!(
        outcomes[1].result,
        Err(SubmitError::ServerRejected { status: 503, .. })
    ));
}

#[tokio::test]
async fn send_order_from_text_parses_then_submits() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .and(body_partial_json(serde_json::json!({
            "customer_name": "سارة",
            "customer_phone": "07801112233"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = "الاسم: سارة\nالهاتف: 07801112233\nالعنوان: بغداد، المنصور\n\
                1. قلم، كمية 2، السعر 1500، متجر: متجر الأمل";
    let client = test_client(&server.uri());
    let (parsed, _acceptance) =
        neomart_intake::send_order_from_text(&client, &OrderParser::default(), text)
            .await
            .expect("parse and submit should succeed");

    assert_eq!(parsed.order.items.len(), 1);
    assert!(parsed.issues.is_empty());
}

#[tokio::test]
async fn retried_submission_reuses_ledger_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let ledger = IdempotencyLedger::default();
    let order = sample_order();

    submit_with_retry(&client, &ledger, &order, 2, 0)
        .await
        .expect("second attempt should be accepted");

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 2);
    let keys: Vec<String> = requests
        .iter()
        .map(|r| {
            let body: serde_json::Value = r.body_json().expect("json body");
            body["idempotency_key"].as_str().expect("key").to_owned()
        })
        .collect();
    assert_eq!(keys[0], keys[1]);
    assert_eq!(ledger.len(), 1);

    let again = ledger.key_for(&order.order_code, Utc::now());
    assert_eq!(again, keys[0]);
}

#[tokio::test]
async fn retried_submission_stops_on_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(INTAKE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "message": "out of stock"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = submit_with_retry(&client, &IdempotencyLedger::default(), &sample_order(), 3, 0)
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::ApplicationRejected { .. }));
}
