//! Vote sessions keyed by the client token.
//!
//! A token only gets an entry once it has cast a vote, so visitors who just
//! browse cost nothing. Entries idle for longer than the ttl are dropped when
//! the registry fills up, and past that the least recently seen one goes.

use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::PollId;
use crate::store::VoteSession;

pub const MAX_SESSIONS: usize = 10_000;
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry {
    session: Arc<Mutex<VoteSession>>,
    last_seen: Instant,
}

pub struct SessionRegistry {
    entries: Mutex<HashMap<Uuid, Entry>>,
    capacity: usize,
    ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(MAX_SESSIONS, SESSION_TTL)
    }
}

impl SessionRegistry {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// The session for `token`, if it has voted before.
    pub async fn get(&self, token: Uuid) -> Option<Arc<Mutex<VoteSession>>> {
        let mut entries = self.entries.lock().await;
        entries.get_mut(&token).map(|entry| {
            entry.last_seen = Instant::now();
            entry.session.clone()
        })
    }

    pub async fn has_voted(&self, token: Uuid, id: PollId) -> bool {
        match self.get(token).await {
            Some(session) => session.lock().await.has_voted(id),
            None => false,
        }
    }

    /// Stores the session a first-time voter just used.
    pub async fn insert(&self, token: Uuid, session: VoteSession) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(&token) {
            // Two first votes raced on the same token.
            entry.last_seen = Instant::now();
            entry.session.lock().await.merge(session);
            return;
        }

        if entries.len() >= self.capacity {
            self.evict(&mut entries);
        }
        entries.insert(
            token,
            Entry {
                session: Arc::new(Mutex::new(session)),
                last_seen: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn evict(&self, entries: &mut HashMap<Uuid, Entry>) {
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_seen) <= self.ttl);

        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(token, _)| *token);
            if let Some(token) = oldest {
                entries.remove(&token);
            }
        }
        debug!("Evicted {} vote session(s)", before - entries.len());
    }
}
