//! Which screen a visitor is on.
//!
//! A closed set of views and a pure transition function. Nothing here knows
//! about storage or links; callers translate their outcomes into [`Event`]s.

use serde::Serialize;

use crate::models::PollId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum View {
    Home {
        #[serde(skip_serializing_if = "Option::is_none")]
        notice: Option<String>,
    },
    Create,
    Vote {
        #[serde(rename = "pollId")]
        poll_id: PollId,
    },
    Results {
        #[serde(rename = "pollId")]
        poll_id: PollId,
    },
}

impl Default for View {
    fn default() -> Self {
        View::Home { notice: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StartCreate,
    Cancel,
    PollCreated(PollId),
    OpenPoll(PollId),
    LinkFailed(String),
    VoteRecorded(PollId),
    AlreadyVoted(PollId),
    GoHome,
}

pub fn transition(current: &View, event: Event) -> View {
    match (current, event) {
        // Navigation that works from anywhere
        (_, Event::GoHome) => View::default(),
        (_, Event::OpenPoll(poll_id)) => View::Vote { poll_id },
        (_, Event::LinkFailed(notice)) => View::Home {
            notice: Some(notice),
        },

        (View::Home { .. }, Event::StartCreate) => View::Create,
        (View::Create, Event::Cancel) => View::default(),
        // The draft is discarded and the new poll shows up in the list.
        (View::Create, Event::PollCreated(_)) => View::default(),

        (View::Vote { poll_id }, Event::VoteRecorded(id) | Event::AlreadyVoted(id))
            if *poll_id == id =>
        {
            View::Results { poll_id: id }
        }
        (View::Results { .. }, Event::Cancel) => View::default(),

        (state, _) => state.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_flow_returns_home() {
        let view = transition(&View::default(), Event::StartCreate);
        assert_eq!(view, View::Create);
        let view = transition(&view, Event::PollCreated(PollId::from(1)));
        assert_eq!(view, View::Home { notice: None });
    }

    #[test]
    fn vote_flow_ends_on_results() {
        let id = PollId::from(5);
        let view = transition(&View::default(), Event::OpenPoll(id));
        assert_eq!(view, View::Vote { poll_id: id });
        assert_eq!(
            transition(&view, Event::VoteRecorded(id)),
            View::Results { poll_id: id }
        );
        assert_eq!(
            transition(&view, Event::AlreadyVoted(id)),
            View::Results { poll_id: id }
        );
    }

    #[test]
    fn events_for_other_polls_are_ignored() {
        let view = View::Vote {
            poll_id: PollId::from(5),
        };
        assert_eq!(transition(&view, Event::VoteRecorded(PollId::from(6))), view);
        assert_eq!(transition(&View::Create, Event::VoteRecorded(PollId::from(6))), View::Create);
        assert_eq!(transition(&view, Event::StartCreate), view);
    }

    #[test]
    fn failed_link_shows_notice_from_anywhere() {
        let view = transition(&View::Create, Event::LinkFailed("Poll not found.".to_string()));
        assert_eq!(
            view,
            View::Home {
                notice: Some("Poll not found.".to_string())
            }
        );
        assert_eq!(transition(&view, Event::GoHome), View::default());
    }

    #[test]
    fn serializes_with_view_tag() {
        let json = serde_json::to_value(View::Results {
            poll_id: PollId::from(3),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"view": "results", "pollId": 3}));
        let json = serde_json::to_value(View::default()).unwrap();
        assert_eq!(json, serde_json::json!({"view": "home"}));
    }
}
