mod polls;
mod sessions;
mod vote;

pub use sessions::SessionRegistry;

use axum::{
    Json, Router,
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::debug;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::Poll;
use crate::share::ShareLinkCodec;
use crate::store::PollStore;
use crate::voting::{PollResults, calculate_results};

/// Header carrying the visitor's vote session token.
pub const SESSION_HEADER: HeaderName = HeaderName::from_static("x-vote-session");

pub struct AppState {
    pub store: PollStore,
    pub codec: ShareLinkCodec,
    sessions: SessionRegistry,
}

impl AppState {
    pub fn new(store: PollStore, codec: ShareLinkCodec) -> Arc<Self> {
        Arc::new(Self {
            store,
            codec,
            sessions: SessionRegistry::default(),
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/polls", get(polls::list_polls).post(polls::create_poll))
        .route("/api/polls/:id", get(polls::get_poll))
        .route("/api/polls/:id/share", get(polls::share_poll))
        .route("/api/polls/:id/vote", post(vote::cast_vote))
        .route("/api/open", get(vote::open_link))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

// Token from the request, or a fresh one for a first-time visitor
fn session_token(headers: &HeaderMap) -> Uuid {
    headers
        .get(&SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .unwrap_or_else(|| {
            let token = Uuid::new_v4();
            debug!("Issuing vote session {}", token);
            token
        })
}

fn with_session(token: Uuid, body: impl IntoResponse) -> Response {
    let mut response = body.into_response();
    if let Ok(value) = HeaderValue::from_str(&token.to_string()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PollBody {
    poll: Poll,
    results: PollResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    has_voted: Option<bool>,
}

impl PollBody {
    fn new(poll: Poll) -> Self {
        let results = calculate_results(&poll);
        Self {
            poll,
            results,
            has_voted: None,
        }
    }

    fn voted(mut self, has_voted: bool) -> Self {
        self.has_voted = Some(has_voted);
        self
    }

    fn json(self) -> Json<Self> {
        Json(self)
    }
}

#[cfg(test)]
mod tests;
