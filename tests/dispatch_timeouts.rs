//! Priority-derived deadlines and backend error passthrough.

use std::net::SocketAddr;
use std::time::Duration;

mod common;

async fn operator_and_base(gateway_addr: SocketAddr) -> (reqwest::Client, String, String) {
    let base = format!("http://{gateway_addr}");
    let client = common::client();
    let token = common::operator_token(&client, &base).await;
    (client, base, token)
}

#[tokio::test]
async fn low_priority_times_out_where_high_priority_survives() {
    let backend_addr: SocketAddr = "127.0.0.1:29401".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29402".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    // Backend answers after 1.5s; the base budget is 1s, so priority 1-5
    // times out while 6-10 (twice the budget) gets the answer.
    common::start_programmable_backend(backend_addr, || async {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        (200, r#"{"slow": true}"#.to_string())
    })
    .await;

    let mut config = common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap());
    config.backend.request_timeout_secs = 1;
    let shutdown = common::spawn_gateway(config).await;

    let (client, base, token) = operator_and_base(gateway_addr).await;

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&token)
        .json(&serde_json::json!({"operation": "predict", "data": {}, "priority": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 504, "base budget exceeded");

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&token)
        .json(&serde_json::json!({"operation": "predict", "data": {}, "priority": 8}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200, "doubled budget covers the slow answer");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["result"]["slow"], true);

    // Both dispatches were recorded, one per outcome.
    let res = client
        .get(format!("{base}/analytics"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let analytics: serde_json::Value = res.json().await.unwrap();
    assert_eq!(analytics["total_requests"], 2);
    assert_eq!(analytics["successful_requests"], 1);
    assert_eq!(analytics["failed_requests"], 1);

    shutdown.trigger();
}

#[tokio::test]
async fn backend_error_status_passes_through() {
    let backend_addr: SocketAddr = "127.0.0.1:29403".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29404".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    common::start_programmable_backend(backend_addr, || async {
        (503, r#"{"error": "model overloaded"}"#.to_string())
    })
    .await;

    let shutdown =
        common::spawn_gateway(common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap()))
            .await;

    let (client, base, token) = operator_and_base(gateway_addr).await;

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&token)
        .json(&serde_json::json!({"operation": "analyze", "data": {}, "priority": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503, "backend status is passed through");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("503"));

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_backend_is_502() {
    // Nothing listens on the backend port.
    let backend_addr: SocketAddr = "127.0.0.1:29405".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29406".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    let shutdown =
        common::spawn_gateway(common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap()))
            .await;

    let (client, base, token) = operator_and_base(gateway_addr).await;

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&token)
        .json(&serde_json::json!({"operation": "predict", "data": {}, "priority": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    let res = client
        .get(format!("{base}/analytics"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let analytics: serde_json::Value = res.json().await.unwrap();
    assert_eq!(analytics["failed_requests"], 1);

    shutdown.trigger();
}
