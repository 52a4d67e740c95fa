use std::collections::HashSet;

use crate::models::PollId;

/// Polls a single visitor has already voted in.
///
/// The store consults it to allow one vote per poll, but it lives with the
/// caller and can simply be thrown away. It keeps honest visitors from
/// double-clicking, nothing more.
#[derive(Debug, Default, Clone)]
pub struct VoteSession {
    voted: HashSet<PollId>,
}

impl VoteSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_voted(&self, poll_id: PollId) -> bool {
        self.voted.contains(&poll_id)
    }

    pub(crate) fn mark_voted(&mut self, poll_id: PollId) {
        self.voted.insert(poll_id);
    }

    pub(crate) fn merge(&mut self, other: VoteSession) {
        self.voted.extend(other.voted);
    }
}
