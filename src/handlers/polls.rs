use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{AppState, PollBody, session_token, with_session};
use crate::error::ApiError;
use crate::models::PollId;
use crate::share::{ShareMode, parse_reference};
use crate::view::{Event, View, transition};

#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub title: String,
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    pub mode: Option<ShareMode>,
}

pub(super) fn parse_path_id(raw: &str) -> Result<PollId, ApiError> {
    parse_reference(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// GET /api/polls
pub async fn list_polls(State(state): State<Arc<AppState>>) -> Response {
    let polls = state.store.list_polls().await;
    Json(json!({ "polls": polls })).into_response()
}

/// POST /api/polls
pub async fn create_poll(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePollRequest>,
) -> Result<Response, ApiError> {
    let poll = state.store.create_poll(&request.title, &request.options).await?;

    let reference = state.codec.encode_reference(poll.id);
    let inline = state
        .codec
        .link(&poll, ShareMode::Inline)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let view = transition(&View::Create, Event::PollCreated(poll.id));
    let body = json!({
        "next": view,
        "poll": poll,
        "links": {
            "reference": reference.as_str(),
            "inline": inline.as_str(),
        },
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// GET /api/polls/:id
pub async fn get_poll(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let id = parse_path_id(&id)?;
    let token = session_token(&headers);

    let poll = state.store.get_poll(id).await?;
    let has_voted = state.sessions.has_voted(token, id).await;

    Ok(with_session(token, PollBody::new(poll).voted(has_voted).json()))
}

/// GET /api/polls/:id/share?mode=inline|reference
pub async fn share_poll(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ShareQuery>,
) -> Result<Response, ApiError> {
    let id = parse_path_id(&id)?;
    let mode = query.mode.unwrap_or(ShareMode::Reference);

    let poll = state.store.get_poll(id).await?;
    let url = state
        .codec
        .link(&poll, mode)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({ "url": url.as_str(), "mode": mode })).into_response())
}
