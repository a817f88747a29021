//! Barrier — a named rendezvous over the shared store.
//!
//! Each participant publishes the highest round it has reached at
//! `<name>.<index>`. A round is complete once every participant's entry is
//! at or past it. Nothing here waits: callers poll
//! [`Barrier::round_reached`] once per tick and retry on the next one.
//!
//! There is no timeout and no quorum override. A participant that never
//! reports holds every other participant at the same round forever.

use crate::store::SharedStore;
use tracing::debug;

/// A non-blocking barrier identified by `(name, participants)`.
#[derive(Debug, Clone)]
pub struct Barrier {
    store: SharedStore,
    name: String,
    index: usize,
    participants: usize,
    round: i64,
}

impl Barrier {
    /// Join barrier `name` as participant `index` of `participants`.
    ///
    /// The local round starts at whatever this participant last published.
    pub fn new(store: SharedStore, name: impl Into<String>, index: usize, participants: usize) -> Self {
        let name = name.into();
        let round = store.get_integer(&format!("{}.{}", name, index));
        Self {
            store,
            name,
            index,
            participants,
            round,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn participants(&self) -> usize {
        self.participants
    }

    /// The round this participant has announced.
    pub fn round(&self) -> i64 {
        self.round
    }

    fn key(&self, index: usize) -> String {
        format!("{}.{}", self.name, index)
    }

    /// Announce arrival at `round`. Rounds never move backwards.
    pub fn arrive(&mut self, round: i64) {
        if round <= self.round {
            return;
        }
        self.round = round;
        self.store.set(self.key(self.index), round);
        debug!(
            "{}: participant {} arrived at round {}",
            self.name, self.index, round
        );
    }

    /// Announce arrival at the next round.
    pub fn next(&mut self) {
        self.arrive(self.round + 1);
    }

    /// Round announced by participant `index`, as of the local replica.
    pub fn round_of(&self, index: usize) -> i64 {
        self.store.get_integer(&self.key(index))
    }

    /// Number of participants at or past `round`.
    pub fn arrivals(&self, round: i64) -> usize {
        (0..self.participants)
            .filter(|i| self.round_of(*i) >= round)
            .count()
    }

    /// Participants that have not yet reached `round`.
    pub fn pending(&self, round: i64) -> Vec<usize> {
        (0..self.participants)
            .filter(|i| self.round_of(*i) < round)
            .collect()
    }

    /// Whether every participant has reached `round`. Always false with no participants.
    pub fn round_reached(&self, round: i64) -> bool {
        self.participants > 0 && self.arrivals(round) == self.participants
    }

    /// Whether every participant has reached this participant's round.
    pub fn is_done(&self) -> bool {
        self.round_reached(self.round)
    }

    /// Change position and participant count, keeping the announced round.
    pub fn resize(&mut self, index: usize, participants: usize) {
        if index != self.index {
            self.index = index;
            self.store.set(self.key(index), self.round);
        }
        self.participants = participants;
    }
}
