//! End-to-end tests for the redirect server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use tokio::net::TcpListener;

use redirect_server::config::ServerConfig;
use redirect_server::http::HttpServer;
use redirect_server::lifecycle::Shutdown;
use redirect_server::redirects::RedirectEngine;

/// Spawn a server with the given rules on an ephemeral port. The
/// returned `Shutdown` must stay alive for the server's lifetime.
async fn spawn_server(rules: &str) -> (SocketAddr, Shutdown) {
    let mut config = ServerConfig::default();
    config.redirects.rules = Some(rules.to_string());

    let (engine, _report) = RedirectEngine::from_rules_text(rules);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(config, Arc::new(engine));
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    // Give the server a moment to start accepting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

fn location(res: &reqwest::Response) -> &str {
    res.headers()
        .get("location")
        .expect("missing Location header")
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn matched_rule_issues_307_with_params_and_query() {
    let (addr, _shutdown) = spawn_server("GET /old/:id /new/:id").await;

    let res = client()
        .get(format!("http://{addr}/old/42?x=1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 307);
    assert_eq!(location(&res), format!("https://{addr}/new/42?x=1"));
}

#[tokio::test]
async fn rule_without_method_column_matches_every_method() {
    let (addr, _shutdown) = spawn_server("/a /b").await;
    let client = client();

    for method in [Method::POST, Method::GET, Method::DELETE] {
        let res = client
            .request(method.clone(), format!("http://{addr}/a"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 307, "method {method} should redirect");
        assert_eq!(location(&res), format!("https://{addr}/b"));
    }
}

#[tokio::test]
async fn absolute_destination_redirects_to_external_host() {
    let (addr, _shutdown) = spawn_server("/gh https://example.com/target").await;

    let res = client()
        .get(format!("http://{addr}/gh"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 307);
    assert_eq!(location(&res), "https://example.com/target");
}

#[tokio::test]
async fn method_restricted_rule_lets_other_methods_through() {
    let (addr, _shutdown) = spawn_server("POST /only-post /landed").await;
    let client = client();

    let res = client
        .get(format!("http://{addr}/only-post"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let res = client
        .post(format!("http://{addr}/only-post"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 307);
    assert_eq!(location(&res), format!("https://{addr}/landed"));
}

#[tokio::test]
async fn unmatched_request_falls_through_to_next_handler() {
    let (addr, _shutdown) = spawn_server("/old /new").await;

    let res = client()
        .get(format!("http://{addr}/completely-unrelated"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    assert!(res.headers().get("location").is_none());
    assert_eq!(res.text().await.unwrap(), "Not Found");
}

#[tokio::test]
async fn malformed_line_does_not_break_valid_rules() {
    // Line 2 has a method column but no destination.
    let (addr, _shutdown) = spawn_server("/ok /fine\nGET /missing-destination").await;

    let res = client()
        .get(format!("http://{addr}/ok"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 307);
    assert_eq!(location(&res), format!("https://{addr}/fine"));
}

#[tokio::test]
async fn forwarded_host_controls_destination_host_and_scheme() {
    let (addr, _shutdown) = spawn_server("/a /b").await;

    let res = client()
        .get(format!("http://{addr}/a"))
        .header("X-Forwarded-Host", "localhost:3000")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 307);
    assert_eq!(location(&res), "http://localhost:3000/b");
}

#[tokio::test]
async fn legacy_social_image_endpoint_redirects_externally() {
    let (addr, _shutdown) = spawn_server("").await;

    let res = client()
        .get(format!("http://{addr}/img/social"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 302);
    assert!(location(&res).starts_with("https://res.cloudinary.com/"));
}

#[tokio::test]
async fn shutdown_trigger_stops_the_server() {
    let mut config = ServerConfig::default();
    config.redirects.rules = Some("/a /b".to_string());

    let (engine, _report) = RedirectEngine::from_rules_text("/a /b");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let server = HttpServer::new(config, Arc::new(engine));
    let handle = tokio::spawn(async move { server.run(listener, receiver).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let res = client()
        .get(format!("http://{addr}/a"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 307);

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop after shutdown was triggered")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn reflect_redirect_page_serves_client_side_script() {
    let (addr, _shutdown) = spawn_server("").await;

    let res = client()
        .get(format!("http://{addr}/rr?url=https://example.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert!(body.contains("window.location.replace"));
}
