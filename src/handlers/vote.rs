use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::HeaderMap,
    response::Response,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::polls::parse_path_id;
use super::{AppState, PollBody, session_token, with_session};
use crate::error::ApiError;
use crate::share::{Resolution, ShareMode};
use crate::store::VoteSession;
use crate::view::{Event, View, transition};

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option: usize,
}

#[derive(Debug, Serialize)]
struct OpenBody {
    #[serde(flatten)]
    view: View,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<ShareMode>,
    #[serde(flatten)]
    poll: Option<PollBody>,
}

/// POST /api/polls/:id/vote
pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<VoteRequest>,
) -> Result<Response, ApiError> {
    let id = parse_path_id(&id)?;
    let token = session_token(&headers);

    // Only the visitor's own session is locked while the store works.
    let poll = match state.sessions.get(token).await {
        Some(session) => {
            let mut session = session.lock().await;
            state.store.vote(&mut session, id, request.option).await
        }
        None => {
            let mut session = VoteSession::new();
            let result = state.store.vote(&mut session, id, request.option).await;
            if result.is_ok() {
                state.sessions.insert(token, session).await;
            }
            result
        }
    };

    match poll {
        Ok(poll) => {
            info!("Vote on poll {} for option {}", id, request.option);
            Ok(with_session(token, PollBody::new(poll).voted(true).json()))
        }
        Err(e) => Ok(with_session(token, ApiError::from(e))),
    }
}

/// GET /api/open?poll=<blob> or ?id=<poll id>
///
/// Resolves a share link into the view the visitor should land on.
pub async fn open_link(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let token = session_token(&headers);
    let resolution = state
        .codec
        .resolve(query.as_deref().unwrap_or(""), &state.store)
        .await;

    let body = match resolution {
        Resolution::Home { notice } => {
            let event = match notice {
                Some(notice) => Event::LinkFailed(notice),
                None => Event::GoHome,
            };
            OpenBody {
                view: transition(&View::default(), event),
                mode: None,
                poll: None,
            }
        }
        Resolution::Poll { poll, mode } => {
            let id = poll.id;
            let has_voted = state.sessions.has_voted(token, id).await;
            let mut view = transition(&View::default(), Event::OpenPoll(id));
            if has_voted {
                view = transition(&view, Event::AlreadyVoted(id));
            }
            OpenBody {
                view,
                mode: Some(mode),
                poll: Some(PollBody::new(poll).voted(has_voted)),
            }
        }
    };

    with_session(token, Json(body))
}

