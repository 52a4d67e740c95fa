use super::polls::{CreatePollRequest, ShareQuery, create_poll, get_poll, list_polls, share_poll};
use super::vote::{VoteRequest, cast_vote, open_link};
use super::*;
use crate::db::MemoryStorage;
use axum::{
    body::to_bytes,
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
};
use serde_json::Value;

async fn state() -> Arc<AppState> {
    let store = PollStore::open(Arc::new(MemoryStorage::new())).await;
    let codec = ShareLinkCodec::new("https://polls.example/").unwrap();
    AppState::new(store, codec)
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn session_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(SESSION_HEADER, HeaderValue::from_str(token).unwrap());
    headers
}

async fn create(state: &Arc<AppState>, title: &str, options: &[&str]) -> Value {
    let request = CreatePollRequest {
        title: title.to_string(),
        options: options.iter().map(|s| s.to_string()).collect(),
    };
    let response = create_poll(State(state.clone()), Json(request)).await.into_response();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn vote(state: &Arc<AppState>, id: &str, token: &str, option: usize) -> Response {
    cast_vote(
        State(state.clone()),
        Path(id.to_string()),
        session_headers(token),
        Json(VoteRequest { option }),
    )
    .await
    .into_response()
}

#[tokio::test]
async fn create_returns_poll_and_links() {
    let state = state().await;
    let body = create(&state, "Pizza?", &["Yes", "No"]).await;

    let id = body["poll"]["id"].as_u64().unwrap();
    assert_eq!(body["poll"]["totalVotes"], 0);
    assert_eq!(body["next"]["view"], "home");
    assert_eq!(
        body["links"]["reference"],
        format!("https://polls.example/?id={}", id)
    );
    assert!(body["links"]["inline"]
        .as_str()
        .unwrap()
        .starts_with("https://polls.example/?poll="));
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let state = state().await;
    let request = CreatePollRequest {
        title: "Q".to_string(),
        options: vec!["only".to_string(), " ".to_string()],
    };
    let response = create_poll(State(state.clone()), Json(request)).await.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let listed = body_json(list_polls(State(state)).await).await;
    assert_eq!(listed["polls"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn vote_flow_over_http() {
    let state = state().await;
    let body = create(&state, "Color?", &["Red", "Blue"]).await;
    let id = body["poll"]["id"].as_u64().unwrap().to_string();
    let token = Uuid::new_v4().to_string();

    let response = vote(&state, &id, &token, 1).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(&SESSION_HEADER).unwrap().to_str().unwrap(),
        token
    );
    let body = body_json(response).await;
    assert_eq!(body["poll"]["totalVotes"], 1);
    assert_eq!(body["results"]["tallies"][1]["votes"], 1);
    assert_eq!(body["hasVoted"], true);

    let again = vote(&state, &id, &token, 0).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let out_of_range = vote(&state, &id, &Uuid::new_v4().to_string(), 7).await;
    assert_eq!(out_of_range.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing = vote(&state, "424242", &token, 0).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let malformed = vote(&state, "abc", &token, 0).await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let read = get_poll(State(state.clone()), Path(id), session_headers(&token))
        .await
        .into_response();
    let read = body_json(read).await;
    assert_eq!(read["poll"]["totalVotes"], 1);
    assert_eq!(read["hasVoted"], true);
}

#[tokio::test]
async fn get_issues_session_for_new_visitor() {
    let state = state().await;
    let body = create(&state, "Q", &["a", "b"]).await;
    let id = body["poll"]["id"].as_u64().unwrap().to_string();

    let response = get_poll(State(state), Path(id), HeaderMap::new())
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let token = response.headers().get(&SESSION_HEADER).unwrap().to_str().unwrap();
    assert!(Uuid::parse_str(token).is_ok());
    assert_eq!(body_json(response).await["hasVoted"], false);
}

#[tokio::test]
async fn share_defaults_to_reference() {
    let state = state().await;
    let body = create(&state, "Q", &["a", "b"]).await;
    let id = body["poll"]["id"].as_u64().unwrap();

    let response = share_poll(
        State(state.clone()),
        Path(id.to_string()),
        Query(ShareQuery { mode: None }),
    )
    .await
    .into_response();
    let body = body_json(response).await;
    assert_eq!(body["mode"], "reference");
    assert_eq!(body["url"], format!("https://polls.example/?id={}", id));

    let response = share_poll(
        State(state),
        Path(id.to_string()),
        Query(ShareQuery {
            mode: Some(crate::share::ShareMode::Inline),
        }),
    )
    .await
    .into_response();
    assert_eq!(body_json(response).await["mode"], "inline");
}

#[tokio::test]
async fn open_reference_link_shows_live_results() {
    let state = state().await;
    let body = create(&state, "Color?", &["Red", "Blue"]).await;
    let id = body["poll"]["id"].as_u64().unwrap();
    let voter = Uuid::new_v4().to_string();
    vote(&state, &id.to_string(), &voter, 1).await;

    // A different visitor lands on the vote view.
    let response = open_link(
        State(state.clone()),
        RawQuery(Some(format!("id={}", id))),
        HeaderMap::new(),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["view"], "vote");
    assert_eq!(body["pollId"], id);
    assert_eq!(body["mode"], "reference");
    assert_eq!(body["poll"]["totalVotes"], 1);
    assert!(body["results"]["summary"]
        .as_str()
        .unwrap()
        .starts_with("Blue: 1 vote (100.0%)\nRed: 0 votes (0.0%)"));

    // The voter goes straight to the results.
    let response = open_link(
        State(state),
        RawQuery(Some(format!("id={}", id))),
        session_headers(&voter),
    )
    .await;
    assert_eq!(body_json(response).await["view"], "results");
}

#[tokio::test]
async fn open_bad_link_lands_home_with_notice() {
    let state = state().await;

    let response = open_link(State(state.clone()), RawQuery(Some("id=999".to_string())), HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["view"], "home");
    assert_eq!(body["notice"], "Poll not found.");
    assert!(body.get("poll").is_none());

    let response = open_link(State(state), RawQuery(None), HeaderMap::new()).await;
    let body = body_json(response).await;
    assert_eq!(body["view"], "home");
    assert!(body.get("notice").is_none());
}

#[tokio::test]
async fn open_inline_link_creates_local_copy() {
    let state = state().await;
    let body = create(&state, "Pizza?", &["Yes", "No"]).await;
    let inline = body["links"]["inline"].as_str().unwrap().to_string();
    let original_id = body["poll"]["id"].as_u64().unwrap();

    let query = inline.split_once('?').unwrap().1.to_string();
    let response = open_link(State(state.clone()), RawQuery(Some(query)), HeaderMap::new()).await;
    let body = body_json(response).await;
    assert_eq!(body["view"], "vote");
    assert_eq!(body["mode"], "inline");
    assert_eq!(body["poll"]["title"], "Pizza?");
    assert_eq!(body["poll"]["totalVotes"], 0);

    let copy_id = body["poll"]["id"].as_u64().unwrap();
    assert_ne!(copy_id, original_id);

    let response = vote(&state, &copy_id.to_string(), &Uuid::new_v4().to_string(), 0).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejected_votes_do_not_open_sessions() {
    let state = state().await;
    for _ in 0..50 {
        let response = cast_vote(
            State(state.clone()),
            Path("999".to_string()),
            HeaderMap::new(),
            Json(VoteRequest { option: 0 }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    assert_eq!(state.sessions.len().await, 0);

    let body = create(&state, "Q", &["a", "b"]).await;
    let id = body["poll"]["id"].as_u64().unwrap().to_string();
    let token = Uuid::new_v4().to_string();
    assert_eq!(vote(&state, &id, &token, 5).await.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(state.sessions.len().await, 0);

    assert_eq!(vote(&state, &id, &token, 0).await.status(), StatusCode::OK);
    assert_eq!(state.sessions.len().await, 1);
    assert_eq!(vote(&state, &id, &token, 1).await.status(), StatusCode::CONFLICT);
}
