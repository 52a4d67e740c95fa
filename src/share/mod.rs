//! Share links.
//!
//! A poll can be shared in two ways, and callers pick one on purpose:
//!
//! - **Inline** (`?poll=<blob>`): the title and option texts travel inside the
//!   link as base64url-encoded JSON. Opening the link builds a brand new poll
//!   with its own id and zero votes, so every opener counts alone. No shared
//!   backend is needed.
//! - **Reference** (`?id=<poll id>`): only the id travels. Opening the link
//!   looks the poll up in the store, so every opener sees and adds to the same
//!   tally.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ShareError;
use crate::models::{IdAllocator, Poll, PollDraft, PollId};
use crate::store::PollStore;

pub const INLINE_PARAM: &str = "poll";
pub const REFERENCE_PARAM: &str = "id";

lazy_static! {
    static ref POLL_ID_RE: Regex = Regex::new(r"^[0-9]{1,20}$").expect("valid poll id pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    Inline,
    Reference,
}

/// What a share link points at, before anything is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedLink {
    Inline(String),
    Reference(String),
    Home,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Poll { poll: Poll, mode: ShareMode },
    Home { notice: Option<String> },
}

#[derive(Debug, Clone)]
pub struct ShareLinkCodec {
    base: Url,
}

impl ShareLinkCodec {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base_url)?,
        })
    }

    pub fn link(&self, poll: &Poll, mode: ShareMode) -> Result<Url, ShareError> {
        match mode {
            ShareMode::Inline => self.encode_inline(&poll.draft()),
            ShareMode::Reference => Ok(self.encode_reference(poll.id)),
        }
    }

    pub fn encode_inline(&self, draft: &PollDraft) -> Result<Url, ShareError> {
        let json = serde_json::to_vec(draft).map_err(|e| ShareError::MalformedBlob(e.to_string()))?;
        Ok(self.with_param(INLINE_PARAM, &URL_SAFE_NO_PAD.encode(json)))
    }

    pub fn encode_reference(&self, id: PollId) -> Url {
        self.with_param(REFERENCE_PARAM, &id.to_string())
    }

    fn with_param(&self, name: &str, value: &str) -> Url {
        let mut url = self.base.clone();
        url.set_fragment(None);
        url.query_pairs_mut().clear().append_pair(name, value);
        url
    }

    /// Accepts a full URL, a bare query string (`?id=7`, `id=7`) or an empty
    /// string. When both parameters are present the reference wins.
    pub fn parse(&self, input: &str) -> SharedLink {
        let input = input.trim();
        let query = match Url::parse(input) {
            Ok(url) => url.query().unwrap_or("").to_string(),
            Err(_) => input.trim_start_matches('?').to_string(),
        };

        let mut inline = None;
        let mut reference = None;
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if name == REFERENCE_PARAM && reference.is_none() {
                reference = Some(value.into_owned());
            } else if name == INLINE_PARAM && inline.is_none() {
                inline = Some(value.into_owned());
            }
        }

        match (reference, inline) {
            (Some(id), _) => SharedLink::Reference(id),
            (None, Some(blob)) => SharedLink::Inline(blob),
            (None, None) => SharedLink::Home,
        }
    }

    /// Opens a share link. Never fails: anything unusable falls back to the
    /// home view with a notice for the visitor.
    ///
    /// An inline poll is handed to the store as an unlisted local copy so
    /// the opener can vote on it.
    pub async fn resolve(&self, input: &str, store: &PollStore) -> Resolution {
        match self.parse(input) {
            SharedLink::Home => Resolution::Home { notice: None },
            SharedLink::Inline(blob) => match decode_inline(&blob, store.ids()) {
                Ok(poll) => {
                    debug!("Opened inline poll as local copy {}", poll.id);
                    store.adopt(poll.clone()).await;
                    Resolution::Poll {
                        poll,
                        mode: ShareMode::Inline,
                    }
                }
                Err(e) => {
                    warn!("Ignoring inline share link: {}", e);
                    home_with("This poll link is damaged.")
                }
            },
            SharedLink::Reference(raw) => {
                let id = match parse_reference(&raw) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("Ignoring reference share link: {}", e);
                        return home_with("This poll link is not valid.");
                    }
                };
                match store.get_poll(id).await {
                    Ok(poll) => Resolution::Poll {
                        poll,
                        mode: ShareMode::Reference,
                    },
                    Err(e) => {
                        warn!("Shared poll could not be opened: {}", e);
                        home_with("Poll not found.")
                    }
                }
            }
        }
    }
}

fn home_with(notice: &str) -> Resolution {
    Resolution::Home {
        notice: Some(notice.to_string()),
    }
}

pub fn decode_draft(blob: &str) -> Result<PollDraft, ShareError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(blob.trim().trim_end_matches('='))
        .map_err(|e| ShareError::MalformedBlob(e.to_string()))?;
    let draft: PollDraft =
        serde_json::from_slice(&bytes).map_err(|e| ShareError::MalformedBlob(e.to_string()))?;
    Ok(PollDraft::normalized(&draft.title, &draft.options)?)
}

/// Builds a fresh poll from an inline blob: new id, zero votes, created now.
pub fn decode_inline(blob: &str, ids: &IdAllocator) -> Result<Poll, ShareError> {
    let draft = decode_draft(blob)?;
    Ok(Poll::new(ids.next(), draft))
}

pub fn parse_reference(raw: &str) -> Result<PollId, ShareError> {
    let raw = raw.trim();
    if !POLL_ID_RE.is_match(raw) {
        return Err(ShareError::MalformedId(raw.to_string()));
    }
    raw.parse::<PollId>()
        .map_err(|_| ShareError::MalformedId(raw.to_string()))
}
