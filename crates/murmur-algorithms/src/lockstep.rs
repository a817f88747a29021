//! Shared bookkeeping for behaviors that move a group one step at a time.
//!
//! A [`LockStep`] freezes the group's member list when it is created, so
//! every member keeps the slot it started with for the whole sequence.
//! Steps are gated by a [`Barrier`] with one participant per frozen member.
//!
//! Rounds on a barrier never go backwards, and a barrier name is usually
//! reused by every sequence flown on the same group. A new sequence
//! therefore counts its rounds from the last round this participant
//! announced: step `s` completes at round `base + s + 1`. Members that all
//! finished the previous sequence share the same base. A member that was
//! cut off mid-sequence starts from a lower base and runs offset from the
//! others; use a fresh `barrier` argument to rule that out.

use murmur_core::barrier::Barrier;
use murmur_core::group::{find_member_index, Group};
use murmur_core::status::{AlgorithmStatus, StatusFlag};
use murmur_core::store::SharedStore;
use murmur_core::types::AgentId;
use tracing::{debug, info, warn};

/// Upper bound on the steps of one lock-step sequence.
pub const MAX_STEPS: usize = 10_000;

pub struct LockStep {
    group: Box<dyn Group>,
    agent: AgentId,
    members: Vec<AgentId>,
    index: Option<usize>,
    barrier: Option<Barrier>,
    base: i64,
    step: usize,
    last_step: usize,
    withdrawn: bool,
}

impl LockStep {
    /// Freeze `group` and join barrier `barrier_name` if `agent` is a
    /// member. `participants` caps how many leading members take part.
    pub fn new(
        store: &SharedStore,
        group: Box<dyn Group>,
        agent: &AgentId,
        barrier_name: &str,
        participants: Option<usize>,
        last_step: usize,
    ) -> Self {
        let members = group.members().to_vec();
        let count = participants.map_or(members.len(), |p| p.min(members.len()));
        let index = find_member_index(agent, &members).filter(|i| *i < count);
        let barrier = index.map(|i| Barrier::new(store.clone(), barrier_name, i, count));
        let base = barrier.as_ref().map_or(0, Barrier::round);
        if index.is_none() {
            warn!(agent = %agent, group = %group.prefix(), "not taking part in lock-step sequence");
        }
        Self {
            group,
            agent: agent.clone(),
            members,
            index,
            barrier,
            base,
            step: 0,
            last_step,
            withdrawn: false,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn last_step(&self) -> usize {
        self.last_step
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn members(&self) -> &[AgentId] {
        &self.members
    }

    pub fn group_prefix(&self) -> &str {
        self.group.prefix()
    }

    /// Barrier round that completes `step`.
    pub fn round_for(&self, step: usize) -> i64 {
        self.base + step as i64 + 1
    }

    pub fn is_participating(&self) -> bool {
        self.index.is_some() && !self.withdrawn
    }

    /// Whether every participant has finished the final step.
    pub fn is_finished(&self) -> bool {
        match &self.barrier {
            Some(barrier) => barrier.round_reached(self.round_for(self.last_step)),
            None => false,
        }
    }

    /// Whether this agent has arrived but peers have not. Updates `Waiting`.
    pub fn poll(&self, status: &mut AlgorithmStatus) -> bool {
        let (true, Some(barrier)) = (self.is_participating(), &self.barrier) else {
            return false;
        };
        let round = self.round_for(self.step);
        let waiting = barrier.round() >= round && !barrier.round_reached(round);
        if waiting {
            debug!(
                agent = %self.agent,
                step = self.step,
                pending = ?barrier.pending(round),
                "waiting for group"
            );
        }
        status.set(StatusFlag::Waiting, waiting);
        waiting
    }

    /// Move to the next step once the whole group finished this one.
    /// Membership is re-read here, between rounds, and nowhere else.
    pub fn advance(&mut self, status: &mut AlgorithmStatus) -> bool {
        if !self.is_participating() || self.step >= self.last_step {
            return false;
        }
        let round = self.round_for(self.step);
        if !self.barrier.as_ref().is_some_and(|b| b.round_reached(round)) {
            return false;
        }

        self.step += 1;
        status.set(StatusFlag::Waiting, false);
        debug!(agent = %self.agent, step = self.step, "group advanced");

        self.group.sync();
        if !self.group.is_member(&self.agent) {
            self.withdrawn = true;
            status.set(StatusFlag::Paused, true);
            status.set(StatusFlag::Waiting, false);
            info!(agent = %self.agent, group = %self.group.prefix(), step = self.step, "left group, withdrawing");
        }
        true
    }

    /// Announce that this agent finished the current step. Returns whether
    /// the whole group has.
    pub fn arrive(&mut self) -> bool {
        let round = self.round_for(self.step);
        match self.barrier.as_mut() {
            Some(barrier) => {
                barrier.arrive(round);
                barrier.round_reached(round)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::group::FixedListGroup;

    fn group(store: &SharedStore, members: &[&str]) -> Box<dyn Group> {
        let mut group = FixedListGroup::new("group.pair", store.clone());
        let ids: Vec<AgentId> = members.iter().map(|m| AgentId::from(*m)).collect();
        group.add_members(&ids);
        group.write();
        Box::new(group)
    }

    #[test]
    fn next_sequence_counts_past_the_last_one() {
        let store = SharedStore::new();
        let agent = AgentId::from("agent.0");
        let mut status = AlgorithmStatus::for_algorithm("test", "agent.0");

        let mut first = LockStep::new(&store, group(&store, &["agent.0"]), &agent, "barrier.pair", None, 1);
        assert!(first.arrive());
        assert!(first.advance(&mut status));
        assert!(first.arrive());
        assert!(first.is_finished());

        let second = LockStep::new(&store, group(&store, &["agent.0"]), &agent, "barrier.pair", None, 1);
        assert_eq!(second.step(), 0);
        assert_eq!(second.round_for(0), 3);
        assert!(!second.is_finished());
    }

    #[test]
    fn participants_cap_excludes_trailing_members() {
        let store = SharedStore::new();
        let late = AgentId::from("agent.2");
        let lock = LockStep::new(
            &store,
            group(&store, &["agent.0", "agent.1", "agent.2"]),
            &late,
            "barrier.cap",
            Some(2),
            3,
        );
        assert_eq!(lock.index(), None);
        assert!(!lock.is_participating());
    }
}
