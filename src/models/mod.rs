use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::PollError;

/// Identifier of a poll. Allocated from a millisecond clock, so ordering by id
/// is ordering by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(u64);

impl PollId {
    /// Largest id the store accepts. Far past any millisecond clock reading,
    /// and low enough that the allocator can always add one.
    pub const MAX: PollId = PollId(i64::MAX as u64);

    // Storage key for this poll
    pub fn storage_key(self) -> String {
        format!("{}{}", POLL_KEY_PREFIX, self.0)
    }
}

impl From<u64> for PollId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PollId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(PollId)
    }
}

pub const POLL_KEY_PREFIX: &str = "poll:";

/// Hands out strictly increasing poll ids.
///
/// Ids follow the wall clock in milliseconds. Two polls created in the same
/// millisecond (or after the clock stepped backwards) get `last + 1` instead.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> PollId {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return PollId(candidate),
                Err(actual) => last = actual,
            }
        }
    }

    /// Make sure every future id is greater than `seen`.
    pub fn observe(&self, seen: PollId) {
        self.last.fetch_max(seen.0, Ordering::AcqRel);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    options: Vec<PollOption>,
    total_votes: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    votes: u64,
}

impl PollOption {
    pub fn votes(&self) -> u64 {
        self.votes
    }
}

/// Title and option texts of a poll, without any tallies. This is what
/// inline share links carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDraft {
    pub title: String,
    pub options: Vec<String>,
}

impl PollDraft {
    /// Trims the title and options, drops blank options and checks that a
    /// usable poll remains.
    pub fn normalized(title: &str, raw_options: &[String]) -> Result<Self, PollError> {
        let title = title.trim();
        let options: Vec<String> = raw_options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if title.is_empty() {
            return Err(PollError::Validation("the poll needs a title".to_string()));
        }
        if options.len() < MIN_OPTIONS {
            return Err(PollError::Validation(format!(
                "the poll needs at least {} options, got {}",
                MIN_OPTIONS,
                options.len()
            )));
        }

        Ok(Self {
            title: title.to_string(),
            options,
        })
    }
}

pub const MIN_OPTIONS: usize = 2;

impl Poll {
    pub fn new(id: PollId, draft: PollDraft) -> Self {
        let options = draft
            .options
            .into_iter()
            .map(|text| PollOption { text, votes: 0 })
            .collect();

        Self {
            id,
            title: draft.title,
            options,
            total_votes: 0,
            created_at: Utc::now(),
        }
    }

    pub fn options(&self) -> &[PollOption] {
        &self.options
    }

    pub fn total_votes(&self) -> u64 {
        self.total_votes
    }

    pub fn draft(&self) -> PollDraft {
        PollDraft {
            title: self.title.clone(),
            options: self.options.iter().map(|o| o.text.clone()).collect(),
        }
    }

    /// Adds one vote to the option at `index`.
    pub fn record_vote(&mut self, index: usize) -> Result<(), PollError> {
        let len = self.options.len();
        let option = self
            .options
            .get_mut(index)
            .ok_or(PollError::InvalidOption { index, len })?;
        option.votes += 1;
        self.total_votes += 1;
        Ok(())
    }

    /// Parses a persisted record. The stored `totalVotes` is ignored in favour
    /// of the per-option counts.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut poll: Poll = serde_json::from_str(raw)?;
        poll.total_votes = poll.options.iter().map(|o| o.votes).sum();
        Ok(poll)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
