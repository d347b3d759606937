//! HTTP surface: an info page and the one-click removal link.
//!
//! The removal link carries no session; the one-time token in its query is
//! the whole authorization.

pub mod handlers;
pub mod pages;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::error::Result;
use crate::services::{TargetRegistry, TokenService};

use self::handlers::{delete_target, home};

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub registry: Arc<TargetRegistry>,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/delete", get(delete_target))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::models::Target;
    use crate::storage::MemoryConfigStore;
    use crate::utils::revocation_link;

    const APP_B: &str = "https://testflight.apple.com/join/BBBB";

    fn state_with(store: Arc<MemoryConfigStore>) -> AppState {
        let registry = TargetRegistry::with_targets(
            vec![
                Target::new("AppA", "https://testflight.apple.com/join/AAAA"),
                Target::new("AppB", APP_B),
            ],
            store,
        );
        AppState {
            tokens: Arc::new(TokenService::new("secret", 300_000).unwrap()),
            registry: Arc::new(registry),
        }
    }

    fn delete_uri(token: &str, url: &str) -> String {
        let link = revocation_link("http://localhost", token, url).unwrap();
        link.trim_start_matches("http://localhost").to_string()
    }

    async fn request(state: &AppState, uri: &str) -> (StatusCode, String) {
        let response = router(state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_home_page() {
        let state = state_with(Arc::new(MemoryConfigStore::default()));
        let (status, body) = request(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("TestFlight Watcher"));
    }

    #[tokio::test]
    async fn test_valid_token_removes_target_once() {
        let state = state_with(Arc::new(MemoryConfigStore::default()));
        let token = state.tokens.issue(APP_B);
        let uri = delete_uri(&token, APP_B);

        let (status, body) = request(&state, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("AppB"));
        assert!(state.registry.get(APP_B).await.is_none());
        assert_eq!(state.registry.len().await, 1);

        let (status, body) = request(&state, &uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("invalid"));
    }

    #[tokio::test]
    async fn test_wrong_token_is_forbidden() {
        let state = state_with(Arc::new(MemoryConfigStore::default()));
        let token = state.tokens.issue(APP_B);
        let wrong = if token == "000000" { "111111" } else { "000000" };

        let (status, _) = request(&state, &delete_uri(wrong, APP_B)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(state.registry.len().await, 2);
        assert!(state.tokens.is_pending(APP_B));
    }

    #[tokio::test]
    async fn test_missing_params_are_forbidden() {
        let state = state_with(Arc::new(MemoryConfigStore::default()));
        state.tokens.issue(APP_B);

        let (status, _) = request(&state, "/delete").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = request(&state, "/delete?otp=abcdef").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(state.registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_malformed_query_is_forbidden() {
        let state = state_with(Arc::new(MemoryConfigStore::default()));
        let token = state.tokens.issue(APP_B);

        let uri = format!("/delete?otp={token}&otp=000000&url={APP_B}");
        let (status, body) = request(&state, &uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("invalid"));
        assert_eq!(state.registry.len().await, 2);
        assert!(state.tokens.is_pending(APP_B));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_reported() {
        let state = state_with(Arc::new(MemoryConfigStore::failing(toml::Table::new())));
        let token = state.tokens.issue(APP_B);

        let (status, _) = request(&state, &delete_uri(&token, APP_B)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.registry.get(APP_B).await.is_some());
    }

    #[tokio::test]
    async fn test_serve_shuts_down() {
        let state = state_with(Arc::new(MemoryConfigStore::default()));
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let result = serve(addr, state, async {}).await;
        assert!(result.is_ok());
    }
}
