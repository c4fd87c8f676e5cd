//! Integration tests for the WebSocket gateway
//!
//! Each test binds a gateway to an ephemeral port and drives it with a
//! real WebSocket client connection.
//!
//! To run these tests:
//! ```
//! cargo test --test gateway_integration
//! ```

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{build_service, sample_markets, TestHarness};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use cryptotrade_core::gateway::{sign_token, Gateway};

const SECRET: &str = "gateway-test-secret";

type ClientWs = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Bind the gateway on an ephemeral port and return its ws:// base URL
async fn start_gateway(harness: &TestHarness, broadcast_interval: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let gateway = Arc::new(Gateway::new(
        harness.service.clone(),
        harness.publisher.clone(),
        SECRET.to_string(),
        broadcast_interval,
    ));
    tokio::spawn(gateway.serve(listener));
    format!("ws://{}", addr)
}

/// Next text frame parsed as JSON, with a timeout
async fn next_json(ws: &mut ClientWs) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended unexpectedly")
            .expect("frame error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("frame is not JSON");
        }
    }
}

/// Read frames until one satisfies the predicate
async fn next_matching(ws: &mut ClientWs, predicate: impl Fn(&Value) -> bool) -> Value {
    loop {
        let frame = next_json(ws).await;
        if predicate(&frame) {
            return frame;
        }
    }
}

// ============================================================================
// Connection and Broadcast
// ============================================================================

#[tokio::test]
async fn test_connect_acks_then_broadcasts_markets() {
    let harness = build_service(sample_markets());
    let url = start_gateway(&harness, Duration::from_millis(100)).await;

    let (mut ws, _) = connect_async(format!("{}/ws", url)).await.unwrap();

    let ack = next_json(&mut ws).await;
    assert_eq!(ack["event"], "connected");
    assert_eq!(ack["data"]["ok"], true);

    let markets = next_matching(&mut ws, |frame| frame["event"] == "markets").await;
    let entries = markets["data"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["symbol"], "BTC");
}

#[tokio::test]
async fn test_health_probe_over_the_socket() {
    let harness = build_service(sample_markets());
    let url = start_gateway(&harness, Duration::from_secs(3600)).await;

    let (mut ws, _) = connect_async(format!("{}/ws", url)).await.unwrap();
    next_json(&mut ws).await; // connected ack

    ws.send(Message::Text("health".to_string())).await.unwrap();

    // the health reply is the only frame without an event field
    let health = next_matching(&mut ws, |frame| frame.get("event").is_none()).await;
    assert_eq!(health["ok"], true);
    assert_eq!(health["service"], "cryptotrade-core-test");
    assert!(health["ts"].as_i64().unwrap() > 0);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_token_subscribes_the_user_lane() {
    let harness = build_service(sample_markets());
    let url = start_gateway(&harness, Duration::from_secs(3600)).await;

    let token = sign_token(SECRET, "user-1", Utc::now().timestamp() + 3600).unwrap();
    let (mut ws, _) = connect_async(format!("{}/ws?token={}", url, token))
        .await
        .unwrap();
    next_json(&mut ws).await; // connected ack

    harness.service.buy("user-1", "DEMO", "BTC", 1.0).await.unwrap();

    let frame = next_matching(&mut ws, |frame| frame["event"] == "portfolio").await;
    assert_eq!(frame["data"]["mode"], "DEMO");
    let cash = frame["data"]["portfolio"]["cashUSD"]
        .as_str()
        .unwrap()
        .parse::<f64>()
        .unwrap();
    assert_eq!(cash, 50000.0);
}

#[tokio::test]
async fn test_invalid_token_downgrades_to_public_stream() {
    let harness = build_service(sample_markets());
    let url = start_gateway(&harness, Duration::from_millis(50)).await;

    let (mut ws, _) = connect_async(format!("{}/ws?token=not-a-real-token", url))
        .await
        .unwrap();
    next_json(&mut ws).await; // connected ack

    harness.service.buy("user-1", "DEMO", "BTC", 1.0).await.unwrap();

    // the public stream keeps flowing, but no user event leaks through
    let deadline = tokio::time::Instant::now() + Duration::from_millis(400);
    while tokio::time::Instant::now() < deadline {
        let frame = match timeout(Duration::from_millis(100), ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => serde_json::from_str::<Value>(&text).unwrap(),
            _ => continue,
        };
        assert_ne!(frame["event"], "portfolio", "user event leaked to an unauthenticated client");
        assert_ne!(frame["event"], "wallet");
    }
}
