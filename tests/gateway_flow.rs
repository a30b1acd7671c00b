//! End-to-end tests for the gateway control plane.

use std::net::SocketAddr;
use std::time::Duration;

mod common;

async fn issue_key(
    client: &reqwest::Client,
    base: &str,
    token: &str,
    owner: &str,
    permissions: &[&str],
) -> String {
    let res = client
        .post(format!("{base}/auth/api-key"))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "name": owner,
            "permissions": permissions,
            "expires_in_hours": 1,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200, "key issuance must succeed");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["name"], owner);
    assert_eq!(body["expires_in_hours"], 1);
    body["api_key"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn login_issue_process_analytics_flow() {
    let backend_addr: SocketAddr = "127.0.0.1:29301".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29302".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    common::start_mock_backend(backend_addr, r#"{"prediction": 0.87}"#).await;
    let shutdown =
        common::spawn_gateway(common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap()))
            .await;

    let base = format!("http://{gateway_addr}");
    let client = common::client();
    let token = common::operator_token(&client, &base).await;

    let api_key = issue_key(&client, &base, &token, "alice", &["ai:read", "ai:write"]).await;
    assert!(api_key.starts_with("agw_"), "keys carry the agw_ prefix");

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&api_key)
        .json(&serde_json::json!({
            "operation": "predict",
            "data": {"series": [1, 2, 3]},
            "priority": 5,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(
        res.headers().get("x-request-id").is_some(),
        "responses carry a request id"
    );
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["prediction"], 0.87);
    assert_eq!(body["processed_by"], "127.0.0.1");
    assert!(body["response_time_ms"].is_u64());

    let res = client
        .get(format!("{base}/analytics"))
        .bearer_auth(&api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["total_requests"], 1);
    assert_eq!(body["successful_requests"], 1);
    assert_eq!(body["active_api_keys"], 1);

    // Public endpoints need no credential.
    let res = client.get(format!("{base}/status")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["service"], "aegis-gateway");
    assert_eq!(body["status"], "ok");
    assert!(body["operations"]
        .as_array()
        .unwrap()
        .iter()
        .any(|op| op == "predict"));

    shutdown.trigger();
}

#[tokio::test]
async fn unauthenticated_and_bogus_tokens_are_rejected() {
    let backend_addr: SocketAddr = "127.0.0.1:29303".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29304".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    common::start_mock_backend(backend_addr, "{}").await;
    let shutdown =
        common::spawn_gateway(common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap()))
            .await;

    let base = format!("http://{gateway_addr}");
    let client = common::client();
    let body = serde_json::json!({"operation": "predict", "data": {}, "priority": 5});

    let res = client
        .post(format!("{base}/process"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401, "missing credential");

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth("agw_definitely-not-issued")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401, "unknown credential");

    let res = client
        .get(format!("{base}/analytics"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    shutdown.trigger();
}

#[tokio::test]
async fn wrong_operator_password_is_rejected() {
    let backend_addr: SocketAddr = "127.0.0.1:29305".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29306".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    common::start_mock_backend(backend_addr, "{}").await;
    let shutdown =
        common::spawn_gateway(common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap()))
            .await;

    let client = common::client();
    let res = client
        .post(format!("http://{gateway_addr}/auth/login"))
        .json(&serde_json::json!({
            "username": common::OPERATOR_USER,
            "password": "not-the-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);

    shutdown.trigger();
}

#[tokio::test]
async fn read_only_key_cannot_process_or_administer() {
    let backend_addr: SocketAddr = "127.0.0.1:29307".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29308".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    common::start_mock_backend(backend_addr, "{}").await;
    let shutdown =
        common::spawn_gateway(common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap()))
            .await;

    let base = format!("http://{gateway_addr}");
    let client = common::client();
    let token = common::operator_token(&client, &base).await;
    let read_key = issue_key(&client, &base, &token, "reader", &["ai:read"]).await;

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&read_key)
        .json(&serde_json::json!({"operation": "predict", "data": {}, "priority": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403, "ai:read must not grant ai:write");

    // A non-admin key cannot mint more keys or flip the kill switch.
    let res = client
        .post(format!("{base}/auth/api-key"))
        .bearer_auth(&read_key)
        .json(&serde_json::json!({"name": "evil", "permissions": ["admin"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = client
        .post(format!("{base}/disable"))
        .bearer_auth(&read_key)
        .json(&serde_json::json!({"disable": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    shutdown.trigger();
}

#[tokio::test]
async fn rate_limit_rejects_with_429() {
    let backend_addr: SocketAddr = "127.0.0.1:29309".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29310".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    common::start_mock_backend(backend_addr, "{}").await;
    let mut config = common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap());
    config.rate_limit.max_requests = 3;
    config.rate_limit.window_secs = 60;
    let shutdown = common::spawn_gateway(config).await;

    let base = format!("http://{gateway_addr}");
    let client = common::client();
    let token = common::operator_token(&client, &base).await;
    let key = issue_key(&client, &base, &token, "hammer", &["ai:read", "ai:write"]).await;

    let body = serde_json::json!({"operation": "predict", "data": {}, "priority": 5});
    for i in 0..3 {
        let res = client
            .post(format!("{base}/process"))
            .bearer_auth(&key)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200, "request {i} within the window");
    }

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&key)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 429);

    // Rejected requests never reached the backend.
    let res = client
        .get(format!("{base}/analytics"))
        .bearer_auth(&key)
        .send()
        .await
        .unwrap();
    let analytics: serde_json::Value = res.json().await.unwrap();
    assert_eq!(analytics["total_requests"], 3);

    shutdown.trigger();
}

#[tokio::test]
async fn kill_switch_gates_processing() {
    let backend_addr: SocketAddr = "127.0.0.1:29311".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29312".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    common::start_mock_backend(backend_addr, "{}").await;
    let shutdown =
        common::spawn_gateway(common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap()))
            .await;

    let base = format!("http://{gateway_addr}");
    let client = common::client();
    let token = common::operator_token(&client, &base).await;
    let key = issue_key(&client, &base, &token, "alice", &["ai:read", "ai:write"]).await;
    let body = serde_json::json!({"operation": "analyze", "data": {"text": "hi"}, "priority": 5});

    let res = client
        .post(format!("{base}/disable"))
        .bearer_auth(&token)
        .json(&serde_json::json!({"disable": true, "reason": "planned maintenance"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let disabled: serde_json::Value = res.json().await.unwrap();
    assert_eq!(disabled["flag"]["disabled_by"], common::OPERATOR_USER);

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&key)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    let rejected: serde_json::Value = res.json().await.unwrap();
    assert!(rejected["error"]
        .as_str()
        .unwrap()
        .contains("planned maintenance"));

    let res = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(res.status(), 200, "liveness stays 200 while disabled");
    let health: serde_json::Value = res.json().await.unwrap();
    assert_eq!(health["status"], "disabled");

    // Pre-dispatch rejection: counters untouched.
    let res = client
        .get(format!("{base}/analytics"))
        .bearer_auth(&key)
        .send()
        .await
        .unwrap();
    let analytics: serde_json::Value = res.json().await.unwrap();
    assert_eq!(analytics["total_requests"], 0);

    let res = client
        .post(format!("{base}/disable"))
        .bearer_auth(&token)
        .json(&serde_json::json!({"disable": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&key)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200, "traffic resumes after re-enable");

    shutdown.trigger();
}

#[tokio::test]
async fn revoked_key_stops_working() {
    let backend_addr: SocketAddr = "127.0.0.1:29313".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29314".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    common::start_mock_backend(backend_addr, "{}").await;
    let shutdown =
        common::spawn_gateway(common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap()))
            .await;

    let base = format!("http://{gateway_addr}");
    let client = common::client();
    let token = common::operator_token(&client, &base).await;
    let key = issue_key(&client, &base, &token, "temp", &["ai:write"]).await;

    let res = client
        .delete(format!("{base}/auth/api-key/{key}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["revoked"], true);

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&key)
        .json(&serde_json::json!({"operation": "predict", "data": {}, "priority": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    shutdown.trigger();
}

#[tokio::test]
async fn malformed_priority_is_400() {
    let backend_addr: SocketAddr = "127.0.0.1:29315".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:29316".parse().unwrap();
    let state = tempfile::tempdir().unwrap();

    common::start_mock_backend(backend_addr, "{}").await;
    let shutdown =
        common::spawn_gateway(common::test_config(gateway_addr, backend_addr, state.path().to_str().unwrap()))
            .await;

    let base = format!("http://{gateway_addr}");
    let client = common::client();
    let token = common::operator_token(&client, &base).await;

    let res = client
        .post(format!("{base}/process"))
        .bearer_auth(&token)
        .json(&serde_json::json!({"operation": "predict", "data": {}, "priority": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    shutdown.trigger();
    // Give the graceful shutdown a beat before the temp dir drops.
    tokio::time::sleep(Duration::from_millis(50)).await;
}
