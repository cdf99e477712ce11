//! End-to-end tests of the HTTP preview server against a live listener.

use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};
use tempfile::TempDir;

use custom_scss::app::App;
use custom_scss::config::{Config, DbConfig, DocumentsConfig, ServerConfig};
use custom_scss::server::run_server_with_resolver;
use custom_scss_core::compiler::CompilerOptions;

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn test_config(tmp: &TempDir, port: u16) -> Config {
    Config {
        db: DbConfig {
            path: PathBuf::from(format!("{}/data/scss.sqlite", tmp.path().display())),
        },
        compiler: CompilerOptions::default(),
        documents: DocumentsConfig {
            default_value: "/* default */".to_string(),
        },
        server: ServerConfig {
            bind: format!("127.0.0.1:{}", port),
        },
    }
}

/// Start a server in the background and return its base URL.
async fn start_server(tmp: &TempDir) -> String {
    let port = find_free_port();
    let cfg = test_config(tmp, port);
    let app = App::open(&cfg).await.unwrap();
    let resolver = app.resolver.clone();
    let bind = cfg.server.bind.clone();

    tokio::spawn(async move {
        run_server_with_resolver(&bind, resolver).await.ok();
    });

    wait_for_server(port).await;
    format!("http://127.0.0.1:{}", port)
}

const NESTED: &str = ".nav { a { color: red; } }";
const BROKEN: &str = ".nav { a { color: red; }";

#[tokio::test]
async fn test_health() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_css_before_save_is_default() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;

    let resp = reqwest::get(format!("{}/documents/site/css", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/css"));
    assert_eq!(resp.text().await.unwrap(), "/* default */");
}

#[tokio::test]
async fn test_commit_then_css_and_source() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/documents/site/commit", base))
        .json(&json!({ "mode": "scss", "raw_source": NESTED }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["mode"], "scss");
    assert_eq!(body["state"], "committed");
    assert_eq!(body["mode_persisted"], true);
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));

    let css = reqwest::get(format!("{}/documents/site/css", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(css.contains(".nav a"), "got: {}", css);

    let source = reqwest::get(format!("{}/documents/site/source", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(source, NESTED);
}

#[tokio::test]
async fn test_commit_compile_error_is_422() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/documents/site/commit", base))
        .json(&json!({ "mode": "scss", "raw_source": NESTED }))
        .send()
        .await
        .unwrap();
    let before = reqwest::get(format!("{}/documents/site/css", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/documents/site/commit", base))
        .json(&json!({ "raw_source": BROKEN }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "compile_error");
    assert!(!body["error"]["message"].as_str().unwrap().is_empty());

    let after = reqwest::get(format!("{}/documents/site/css", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_preview_falls_back_to_saved_css() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/documents/site/commit", base))
        .json(&json!({ "mode": "scss", "raw_source": NESTED }))
        .send()
        .await
        .unwrap();
    let saved = reqwest::get(format!("{}/documents/site/css", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/documents/site/preview", base))
        .json(&json!({ "raw_source": BROKEN }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["superseded"], false);
    assert_eq!(body["css"].as_str().unwrap(), saved);
    assert!(body["fallback"]["message"].is_string());

    // Preview did not write.
    let revisions: Value = reqwest::get(format!("{}/documents/site/revisions", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(revisions["revisions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_preview_with_invalid_mode_reports_rejection() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/documents/site/preview", base))
        .json(&json!({ "mode": "less", "raw_source": "a { b: c; }" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["mode"], "none");
    assert_eq!(body["css"], "a { b: c; }");
    assert!(body["rejected"][0].as_str().unwrap().contains("less"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    for path in ["preview", "commit"] {
        let resp = client
            .post(format!("{}/documents/site/{}", base, path))
            .header("content-type", "application/json")
            .body("{\"mode\": ")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{}", path);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(!body["error"]["message"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_mistyped_body_is_bad_request_and_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/documents/site/commit", base))
        .json(&json!({ "mode": 5, "raw_source": NESTED }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = client
        .post(format!("{}/documents/site/preview", base))
        .body(r#"{"raw_source": "a {}"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = reqwest::get(format!("{}/documents/site/revisions", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_revisions_not_found_before_save() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;

    let resp = reqwest::get(format!("{}/documents/site/revisions", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_events_stream_receives_preview() {
    let tmp = TempDir::new().unwrap();
    let base = start_server(&tmp).await;
    let client = reqwest::Client::new();

    let events = client
        .get(format!("{}/documents/site/events", base))
        .send()
        .await
        .unwrap();
    assert_eq!(events.status(), 200);
    let mut chunks = events.bytes_stream();

    client
        .post(format!("{}/documents/other/preview", base))
        .json(&json!({ "raw_source": "ignored { x: y; }" }))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/documents/site/preview", base))
        .json(&json!({ "mode": "scss", "raw_source": NESTED }))
        .send()
        .await
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), async {
        let mut buf = String::new();
        while let Some(chunk) = chunks.next().await {
            buf.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
            if buf.contains(".nav a") {
                break;
            }
        }
        buf
    })
    .await
    .expect("no css event within 5 seconds");

    assert!(received.contains("event: css"));
    assert!(received.contains(".nav a"));
    assert!(!received.contains("ignored"));
}
