//! Route handlers.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use serde::Deserialize;

use super::{AppState, pages};

/// Query of a removal link. Both fields are optional, and an unparsable query
/// is rejected like a wrong token, so a mangled link gets the same answer.
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub otp: Option<String>,
    pub url: Option<String>,
}

pub async fn home() -> Html<String> {
    Html(pages::home())
}

/// `GET /delete?otp=<token>&url=<target>`
pub async fn delete_target(
    State(state): State<AppState>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> (StatusCode, Html<String>) {
    let query = match query {
        Ok(Query(query)) => query,
        Err(e) => {
            log::warn!("Malformed removal request: {e}");
            return (StatusCode::FORBIDDEN, Html(pages::invalid_token()));
        }
    };
    let (Some(otp), Some(url)) = (query.otp, query.url) else {
        log::warn!("Removal request without token or url");
        return (StatusCode::FORBIDDEN, Html(pages::invalid_token()));
    };

    if !state.tokens.verify(&otp, &url) {
        log::warn!("Rejected removal request for {url}");
        return (StatusCode::FORBIDDEN, Html(pages::invalid_token()));
    }

    match state.registry.remove(&url).await {
        Ok(Some(target)) => (
            StatusCode::OK,
            Html(pages::removed(&target.name, &target.url)),
        ),
        Ok(None) => {
            log::info!("Verified removal for {url}, which was no longer watched");
            (StatusCode::OK, Html(pages::removed(&url, &url)))
        }
        Err(e) => {
            log::error!("Removal of {url} verified but not persisted: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(pages::internal_error()),
            )
        }
    }
}
