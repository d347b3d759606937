//! Poll → notify → click the link → target gone, against a real config file.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;

use beta_watcher::error::{AppError, Result};
use beta_watcher::models::{AvailabilitySignal, CheckResult};
use beta_watcher::pipeline::{WatchSettings, Watcher};
use beta_watcher::server::{AppState, router};
use beta_watcher::services::{
    NotifyOptions, Notifier, StatusClassifier, TargetRegistry, TokenService,
};
use beta_watcher::storage::{ConfigStore, LocalConfigStore};
use beta_watcher::utils::http::Fetcher;

const APP_A: &str = "https://testflight.apple.com/join/AAAA";
const APP_B: &str = "https://testflight.apple.com/join/BBBB";

struct Pages(HashMap<&'static str, &'static str>);

#[async_trait]
impl Fetcher for Pages {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.0
            .get(url)
            .map(|html| html.to_string())
            .ok_or_else(|| AppError::fetch(url, "HTTP status 404 Not Found"))
    }
}

#[derive(Default)]
struct Inbox(Mutex<Vec<String>>);

#[async_trait]
impl Notifier for Inbox {
    async fn send(&self, _title: &str, message: &str, _options: &NotifyOptions) -> bool {
        self.0.lock().unwrap().push(message.to_string());
        true
    }
}

fn link_path(message: &str) -> String {
    let start = message.find("/delete?").expect("message carries a removal link");
    message[start..].trim().to_string()
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, String) {
    let response = router(state.clone())
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_open_beta_link_removes_target_exactly_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[otp]
secret = "integration"
validity_minutes = 5

[[targets]]
name = "AppA"
url = "{APP_A}"

[[targets]]
name = "AppB"
url = "{APP_B}"
"#
        ),
    )
    .unwrap();

    let store = Arc::new(LocalConfigStore::new(&path));
    let registry = Arc::new(TargetRegistry::load(store.clone()).await.unwrap());
    let tokens = Arc::new(TokenService::new("integration", 5 * 60 * 1000).unwrap());
    let inbox = Arc::new(Inbox::default());
    let fetcher = Arc::new(Pages(HashMap::from([
        (
            APP_A,
            r#"<div class="beta-status"><span>This beta is full.</span></div>"#,
        ),
        (APP_B, "<html><body>New layout</body></html>"),
    ])));

    let watcher = Watcher::new(
        registry.clone(),
        tokens.clone(),
        fetcher,
        inbox.clone(),
        StatusClassifier::new().unwrap(),
        WatchSettings {
            interval: Duration::from_secs(30),
            public_url: "http://localhost:3000".to_string(),
            notify: NotifyOptions::default(),
            dry_run: false,
        },
    );

    let report = watcher.run_cycle().await;
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].signal(), AvailabilitySignal::Full);
    assert!(matches!(report.outcomes[1].result, CheckResult::Open { .. }));

    let messages = inbox.0.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    let link = link_path(&messages[0]);

    let state = AppState {
        tokens: tokens.clone(),
        registry: registry.clone(),
    };

    // A wrong token does nothing.
    let tampered = link.replacen("otp=", "otp=zz", 1);
    let (status, _) = get(&state, &tampered).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(registry.len().await, 2);

    let (status, body) = get(&state, &link).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("AppB"));

    let (status, _) = get(&state, &link).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The file on disk reflects the removal and keeps the other sections.
    let table = store.read().await.unwrap();
    let saved = table["targets"].as_array().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["url"].as_str(), Some(APP_A));
    assert_eq!(table["otp"]["secret"].as_str(), Some("integration"));
}
