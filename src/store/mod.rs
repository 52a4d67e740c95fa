//! The poll store: the one place polls are created, read and voted on.
//!
//! The store keeps every poll it knows about in memory, most recent first,
//! and mirrors changes to a [`PollStorage`] backend on a best-effort basis.
//! When the backend misbehaves the store logs it and keeps serving from
//! memory, so a flaky backend never blocks a vote. A poll whose latest write
//! failed stays authoritative in memory and is written again on the next
//! read or vote.

mod session;

pub use session::VoteSession;

use log::{debug, info, warn};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::{Lookup, PollStorage};
use crate::error::{PollError, StorageError};
use crate::models::{IdAllocator, MIN_OPTIONS, POLL_KEY_PREFIX, Poll, PollDraft, PollId};

/// Inline copies kept around for voting before the oldest is dropped.
pub const MAX_ADOPTED: usize = 256;

#[derive(Default)]
struct Cache {
    // Most recent first.
    listed: Vec<Poll>,
    // Opened from inline links and not voted on yet. Oldest first.
    adopted: VecDeque<Poll>,
    // Polls whose latest change never reached the backend.
    unsynced: HashSet<PollId>,
}

impl Cache {
    fn find(&self, id: PollId) -> Option<&Poll> {
        self.listed
            .iter()
            .find(|p| p.id == id)
            .or_else(|| self.adopted.iter().find(|p| p.id == id))
    }

    // Replace in place, or insert keeping newest-first order. An adopted copy
    // becomes a listed poll here.
    fn upsert(&mut self, poll: Poll) {
        self.adopted.retain(|p| p.id != poll.id);
        if let Some(existing) = self.listed.iter_mut().find(|p| p.id == poll.id) {
            *existing = poll;
        } else {
            let pos = self.listed.partition_point(|p| p.id > poll.id);
            self.listed.insert(pos, poll);
        }
    }
}

pub struct PollStore {
    storage: Arc<dyn PollStorage>,
    // Held across storage calls so mutations never interleave.
    cache: Mutex<Cache>,
    ids: IdAllocator,
}

impl PollStore {
    /// Waits for the backend to become ready and loads every persisted poll.
    /// A backend that is not ready, or fails to list its contents, yields an
    /// empty store rather than an error.
    pub async fn open(storage: Arc<dyn PollStorage>) -> Self {
        let ids = IdAllocator::new();
        let mut polls = Vec::new();

        match storage.ready().await {
            Ok(()) => match storage.load_all(POLL_KEY_PREFIX).await {
                Ok(records) => {
                    for (key, value) in records {
                        match decode_record(&key, &value) {
                            Ok(poll) => polls.push(poll),
                            Err(e) => warn!("Skipping unreadable record: {}", e),
                        }
                    }
                }
                Err(e) => warn!("Could not load polls from {} storage: {}", storage.name(), e),
            },
            Err(e) => warn!(
                "{} storage is not ready, starting with no persisted polls: {}",
                storage.name(),
                e
            ),
        }

        polls.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(newest) = polls.first() {
            ids.observe(newest.id);
        }
        info!("Loaded {} poll(s) from {} storage", polls.len(), storage.name());

        Self {
            storage,
            cache: Mutex::new(Cache {
                listed: polls,
                ..Cache::default()
            }),
            ids,
        }
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub async fn create_poll(&self, title: &str, raw_options: &[String]) -> Result<Poll, PollError> {
        let draft = PollDraft::normalized(title, raw_options)?;

        let mut cache = self.cache.lock().await;
        let poll = Poll::new(self.ids.next(), draft);
        self.persist(&mut cache, &poll).await;
        cache.listed.insert(0, poll.clone());

        info!("Created poll {} with {} options", poll.id, poll.options().len());
        Ok(poll)
    }

    /// Polls created here or voted on here, most recently created first.
    /// Inline copies nobody has voted on are not listed.
    pub async fn list_polls(&self) -> Vec<Poll> {
        self.cache.lock().await.listed.clone()
    }

    pub async fn get_poll(&self, id: PollId) -> Result<Poll, PollError> {
        let mut cache = self.cache.lock().await;
        self.resolve(&mut cache, id)
            .await
            .ok_or(PollError::NotFound(id))
    }

    /// Records one vote for `option_index`. Nothing changes when the poll is
    /// unknown, the index is out of range or `session` already voted on it.
    pub async fn vote(
        &self,
        session: &mut VoteSession,
        id: PollId,
        option_index: usize,
    ) -> Result<Poll, PollError> {
        let mut cache = self.cache.lock().await;
        let mut poll = self
            .resolve(&mut cache, id)
            .await
            .ok_or(PollError::NotFound(id))?;

        let len = poll.options().len();
        if option_index >= len {
            return Err(PollError::InvalidOption {
                index: option_index,
                len,
            });
        }
        if session.has_voted(id) {
            return Err(PollError::AlreadyVoted(id));
        }

        poll.record_vote(option_index)?;
        self.persist(&mut cache, &poll).await;
        cache.upsert(poll.clone());
        session.mark_voted(id);

        debug!(
            "Vote recorded on poll {} option {} ({} total)",
            id,
            option_index,
            poll.total_votes()
        );
        Ok(poll)
    }

    /// Keeps a poll that did not come from this store (a decoded inline
    /// link) in memory so it can be read and voted on. It is listed and
    /// reaches the backend with its first vote. Only the newest
    /// [`MAX_ADOPTED`] copies are kept.
    pub async fn adopt(&self, poll: Poll) {
        let mut cache = self.cache.lock().await;
        if cache.find(poll.id).is_some() {
            return;
        }
        cache.adopted.push_back(poll);
        while cache.adopted.len() > MAX_ADOPTED {
            if let Some(dropped) = cache.adopted.pop_front() {
                debug!("Dropping unvoted inline copy {}", dropped.id);
            }
        }
    }

    // An unsynced poll is served from memory and written again. Otherwise the
    // persisted copy wins, with memory as the fallback.
    async fn resolve(&self, cache: &mut Cache, id: PollId) -> Option<Poll> {
        if cache.unsynced.contains(&id) {
            if let Some(poll) = cache.find(id).cloned() {
                if self.persist(cache, &poll).await {
                    info!(
                        "Poll {} written to {} storage after an earlier failure",
                        id,
                        self.storage.name()
                    );
                }
                return Some(poll);
            }
        }

        let key = id.storage_key();
        match self.storage.get(&key).await {
            Lookup::Found(raw) => match decode_record(&key, &raw) {
                Ok(poll) => {
                    self.ids.observe(poll.id);
                    cache.upsert(poll.clone());
                    return Some(poll);
                }
                Err(e) => warn!("Falling back to memory for poll {}: {}", id, e),
            },
            Lookup::Missing => debug!("Poll {} not in {} storage", id, self.storage.name()),
            Lookup::Unavailable(e) => warn!(
                "{} storage unavailable while reading poll {}, using memory: {}",
                self.storage.name(),
                id,
                e
            ),
        }

        cache.find(id).cloned()
    }

    // Returns whether the backend now holds `poll`, and tracks it as unsynced
    // when it does not.
    async fn persist(&self, cache: &mut Cache, poll: &Poll) -> bool {
        let written = match poll.to_json() {
            Ok(value) => match self.storage.put(&poll.id.storage_key(), &value).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        "Poll {} kept in memory only, {} storage write failed: {}",
                        poll.id,
                        self.storage.name(),
                        e
                    );
                    false
                }
            },
            Err(e) => {
                warn!("Could not serialize poll {}: {}", poll.id, e);
                false
            }
        };

        if written {
            cache.unsynced.remove(&poll.id);
        } else {
            cache.unsynced.insert(poll.id);
        }
        written
    }
}

fn decode_record(key: &str, raw: &str) -> Result<Poll, StorageError> {
    let corrupt = |reason: String| StorageError::Corrupt {
        key: key.to_string(),
        reason,
    };

    let poll = Poll::from_json(raw).map_err(|e| corrupt(e.to_string()))?;
    if poll.id.storage_key() != key {
        return Err(corrupt(format!("record holds poll {}", poll.id)));
    }
    if poll.id > PollId::MAX {
        return Err(corrupt(format!("poll id {} is out of range", poll.id)));
    }
    if poll.options().len() < MIN_OPTIONS {
        return Err(corrupt(format!("only {} option(s)", poll.options().len())));
    }

    // Title and option texts must already be in their normalized form.
    let draft = poll.draft();
    match PollDraft::normalized(&draft.title, &draft.options) {
        Ok(normalized) if normalized == draft => Ok(poll),
        Ok(_) => Err(corrupt("blank or untrimmed text".to_string())),
        Err(e) => Err(corrupt(e.to_string())),
    }
}
