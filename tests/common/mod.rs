//! Shared utilities for gateway integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use aegis_gateway::auth::StaticIdentityProvider;
use aegis_gateway::lifecycle::Shutdown;
use aegis_gateway::{Gateway, GatewayConfig, HttpServer};

pub const OPERATOR_USER: &str = "ops";
pub const OPERATOR_PASS: &str = "wrench-kayak-42";

/// Start a simple mock AI backend that returns a fixed JSON response.
#[allow(dead_code)]
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a programmable mock backend whose status and body come from a
/// closure evaluated per connection.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Config template pointing at a mock backend, with the periodic probe off
/// so tests control exactly what traffic the backend sees.
pub fn test_config(gateway_addr: SocketAddr, backend_addr: SocketAddr, state_dir: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = gateway_addr.to_string();
    config.backend.base_url = format!("http://{backend_addr}");
    config.auth.token_secret = "integration-test-secret".into();
    config.auth.admin_username = OPERATOR_USER.into();
    config.auth.admin_password = OPERATOR_PASS.into();
    config.health_check.enabled = false;
    config.storage.state_dir = state_dir.to_string();
    config
}

/// Build and spawn a full gateway; returns the shutdown handle keeping it up.
pub async fn spawn_gateway(config: GatewayConfig) -> Arc<Shutdown> {
    let bind = config.listener.bind_address.clone();
    let gateway = Arc::new(Gateway::new(&config).await.unwrap());
    let identity = Arc::new(StaticIdentityProvider::from_config(&config.auth));
    let server = HttpServer::new(config, gateway, identity);
    let listener = TcpListener::bind(&bind).await.unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, &server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

/// Non-pooled client so nothing leaks between test servers.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Log in as the test operator and return the session token.
#[allow(dead_code)]
pub async fn operator_token(client: &reqwest::Client, base: &str) -> String {
    let res = client
        .post(format!("{base}/auth/login"))
        .json(&serde_json::json!({
            "username": OPERATOR_USER,
            "password": OPERATOR_PASS,
        }))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(res.status(), 200, "operator login must succeed");
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}
