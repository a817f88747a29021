//! Groups — named, ordered subsets of agents.
//!
//! A group's member list is a cache of what the store held at the last
//! [`Group::sync`]. The index of a member in that list is what callers use
//! to assign roles, so callers that need a stable role for a whole
//! sequence must keep their own copy instead of re-reading after each sync.
//!
//! Store layout under a group prefix such as `group.escorts`:
//! - `<prefix>.type` — [`GroupKind`] tag
//! - `<prefix>.size` — member count
//! - fixed list: `<prefix>.members.<i>` — the i-th agent id
//! - transient: `<prefix>.members.<agent-id>` — 1 while the agent is a member

use crate::store::SharedStore;
use crate::types::AgentId;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Position of `id` in `members`, or `None` when it is not a member.
///
/// Callers treat `None` as "not currently participating" and withdraw
/// from any shared computation.
pub fn find_member_index(id: &AgentId, members: &[AgentId]) -> Option<usize> {
    members.iter().position(|m| m == id)
}

/// Group representations understood by [`GroupFactoryRepository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKind {
    /// An explicitly ordered list.
    FixedList = 0,
    /// A membership set agents join and leave; ordered by agent id.
    Transient = 1,
}

impl GroupKind {
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(GroupKind::FixedList),
            1 => Some(GroupKind::Transient),
            _ => None,
        }
    }

    pub fn tag(self) -> i64 {
        self as i64
    }
}

/// A named, ordered subset of agents backed by the store.
pub trait Group: Send {
    /// The group's store prefix (e.g. `group.escorts`).
    fn prefix(&self) -> &str;

    fn kind(&self) -> GroupKind;

    /// Append members to the cache, skipping ones already present.
    fn add_members(&mut self, members: &[AgentId]);

    fn clear_members(&mut self);

    /// The cached, ordered member list.
    fn members(&self) -> &[AgentId];

    fn is_member(&self, id: &AgentId) -> bool {
        self.members().contains(id)
    }

    fn size(&self) -> usize {
        self.members().len()
    }

    /// Re-derive the member list from the store.
    fn sync(&mut self);

    /// Persist the cached member list to the store.
    fn write(&self);

    /// Index of `id` in the cached list.
    fn index_of(&self, id: &AgentId) -> Option<usize> {
        find_member_index(id, self.members())
    }
}

fn push_unique(list: &mut Vec<AgentId>, members: &[AgentId]) {
    for member in members {
        if !list.contains(member) {
            list.push(member.clone());
        }
    }
}

/// A group whose order is exactly the order members were listed in.
pub struct FixedListGroup {
    prefix: String,
    store: SharedStore,
    members: Vec<AgentId>,
}

impl FixedListGroup {
    /// Bind to `prefix` and load whatever the store currently holds.
    pub fn new(prefix: impl Into<String>, store: SharedStore) -> Self {
        let mut group = Self {
            prefix: prefix.into(),
            store,
            members: Vec::new(),
        };
        group.sync();
        group
    }
}

impl Group for FixedListGroup {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn kind(&self) -> GroupKind {
        GroupKind::FixedList
    }

    fn add_members(&mut self, members: &[AgentId]) {
        push_unique(&mut self.members, members);
    }

    fn clear_members(&mut self) {
        self.members.clear();
    }

    fn members(&self) -> &[AgentId] {
        &self.members
    }

    /// A list with an empty slot below `size` is incomplete; the previous
    /// cache is kept so no later member shifts into the gap.
    fn sync(&mut self) {
        let size = self.store.get_integer(&format!("{}.size", self.prefix)).max(0) as usize;
        let mut members = Vec::with_capacity(size);
        for i in 0..size {
            let id = self.store.get_string(&format!("{}.members.{}", self.prefix, i));
            if id.is_empty() {
                warn!("{}: member slot {} of {} is empty, keeping previous list", self.prefix, i, size);
                return;
            }
            members.push(AgentId::new(id));
        }
        debug!("{}: synced {} members", self.prefix, members.len());
        self.members = members;
    }

    fn write(&self) {
        self.store
            .set(format!("{}.type", self.prefix), GroupKind::FixedList.tag());
        self.store.clear_prefix(&format!("{}.members", self.prefix));
        for (i, member) in self.members.iter().enumerate() {
            self.store
                .set(format!("{}.members.{}", self.prefix, i), member.as_str());
        }
        self.store
            .set(format!("{}.size", self.prefix), self.members.len() as i64);
    }
}

/// A group agents join and leave independently; members are ordered by id.
pub struct TransientGroup {
    prefix: String,
    store: SharedStore,
    members: Vec<AgentId>,
}

impl TransientGroup {
    pub fn new(prefix: impl Into<String>, store: SharedStore) -> Self {
        let mut group = Self {
            prefix: prefix.into(),
            store,
            members: Vec::new(),
        };
        group.sync();
        group
    }
}

impl Group for TransientGroup {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn kind(&self) -> GroupKind {
        GroupKind::Transient
    }

    fn add_members(&mut self, members: &[AgentId]) {
        push_unique(&mut self.members, members);
        self.members.sort();
    }

    fn clear_members(&mut self) {
        self.members.clear();
    }

    fn members(&self) -> &[AgentId] {
        &self.members
    }

    fn sync(&mut self) {
        self.members = self
            .store
            .to_map_stripped(&format!("{}.members", self.prefix))
            .into_iter()
            .filter(|(_, flag)| flag.is_true())
            .map(|(id, _)| AgentId::new(id))
            .collect();
        debug!("{}: synced {} members", self.prefix, self.members.len());
    }

    fn write(&self) {
        self.store
            .set(format!("{}.type", self.prefix), GroupKind::Transient.tag());
        self.store.clear_prefix(&format!("{}.members", self.prefix));
        for member in &self.members {
            self.store
                .set(format!("{}.members.{}", self.prefix, member), 1);
        }
        self.store
            .set(format!("{}.size", self.prefix), self.members.len() as i64);
    }
}

/// Builds a group bound to a prefix in a store.
pub type GroupConstructor = fn(String, SharedStore) -> Box<dyn Group>;

/// Resolves groups from the type tag stored at their prefix.
pub struct GroupFactoryRepository {
    store: SharedStore,
    factories: BTreeMap<GroupKind, GroupConstructor>,
}

impl GroupFactoryRepository {
    /// A repository with the fixed-list and transient kinds registered.
    pub fn new(store: SharedStore) -> Self {
        let mut repo = Self {
            store,
            factories: BTreeMap::new(),
        };
        repo.add(GroupKind::FixedList, |prefix, store| {
            Box::new(FixedListGroup::new(prefix, store))
        });
        repo.add(GroupKind::Transient, |prefix, store| {
            Box::new(TransientGroup::new(prefix, store))
        });
        repo
    }

    pub fn add(&mut self, kind: GroupKind, factory: GroupConstructor) {
        self.factories.insert(kind, factory);
    }

    /// Create the group described at `prefix`. Missing or unknown tags yield `None`.
    pub fn create(&self, prefix: &str) -> Option<Box<dyn Group>> {
        let tag_key = format!("{}.type", prefix);
        let Some(tag) = self.store.get(&tag_key) else {
            warn!("no group type at {}", tag_key);
            return None;
        };
        match GroupKind::from_tag(tag.to_integer()) {
            Some(kind) => self.create_kind(kind, prefix),
            None => {
                warn!("unknown group type {} at {}", tag, tag_key);
                None
            }
        }
    }

    /// Create a group of an explicit kind at `prefix`.
    pub fn create_kind(&self, kind: GroupKind, prefix: &str) -> Option<Box<dyn Group>> {
        self.factories
            .get(&kind)
            .map(|factory| factory(prefix.to_string(), self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<AgentId> {
        names.iter().map(|n| AgentId::from(*n)).collect()
    }

    #[test]
    fn member_index_follows_list_order() {
        let members = ids(&["agent.4", "agent.1", "agent.7"]);
        assert_eq!(find_member_index(&"agent.1".into(), &members), Some(1));
        assert_eq!(find_member_index(&"agent.9".into(), &members), None);
    }

    #[test]
    fn fixed_list_round_trips_through_store() {
        let store = SharedStore::new();
        let mut group = FixedListGroup::new("group.a", store.clone());
        group.add_members(&ids(&["agent.2", "agent.0", "agent.2"]));
        assert_eq!(group.size(), 2);
        group.write();

        let other = FixedListGroup::new("group.a", store.clone());
        assert_eq!(other.members(), &ids(&["agent.2", "agent.0"])[..]);
        assert_eq!(other.index_of(&"agent.0".into()), Some(1));
        assert_eq!(store.get_integer("group.a.size"), 2);
    }

    #[test]
    fn cache_is_stale_until_sync() {
        let store = SharedStore::new();
        let mut writer = FixedListGroup::new("group.a", store.clone());
        writer.add_members(&ids(&["agent.0", "agent.1"]));
        writer.write();

        let mut reader = FixedListGroup::new("group.a", store.clone());
        writer.clear_members();
        writer.add_members(&ids(&["agent.1"]));
        writer.write();

        assert_eq!(reader.index_of(&"agent.0".into()), Some(0));
        reader.sync();
        assert_eq!(reader.index_of(&"agent.0".into()), None);
        assert_eq!(reader.index_of(&"agent.1".into()), Some(0));
    }

    #[test]
    fn list_with_a_gap_keeps_previous_roles() {
        let store = SharedStore::new();
        let mut writer = FixedListGroup::new("group.gap", store.clone());
        writer.add_members(&ids(&["agent.0", "agent.1", "agent.2"]));
        writer.write();

        let mut reader = FixedListGroup::new("group.gap", store.clone());
        store.set("group.gap.members.1", "");
        reader.sync();
        assert_eq!(reader.members(), &ids(&["agent.0", "agent.1", "agent.2"])[..]);
        assert_eq!(reader.index_of(&"agent.2".into()), Some(2));

        store.set("group.gap.members.1", "agent.5");
        reader.sync();
        assert_eq!(reader.index_of(&"agent.5".into()), Some(1));
        assert_eq!(reader.index_of(&"agent.2".into()), Some(2));
    }

    #[test]
    fn transient_members_are_sorted_and_leave() {
        let store = SharedStore::new();
        store.set("group.t.type", 1);
        store.set("group.t.members.agent.3", 1);
        store.set("group.t.members.agent.1", 1);
        store.set("group.t.members.agent.2", 0);

        let repo = GroupFactoryRepository::new(store.clone());
        let mut group = repo.create("group.t").expect("transient group");
        assert_eq!(group.kind(), GroupKind::Transient);
        assert_eq!(group.members(), &ids(&["agent.1", "agent.3"])[..]);

        store.set("group.t.members.agent.1", 0);
        group.sync();
        assert_eq!(group.members(), &ids(&["agent.3"])[..]);
    }

    #[test]
    fn repository_needs_a_known_tag() {
        let store = SharedStore::new();
        let repo = GroupFactoryRepository::new(store.clone());
        assert!(repo.create("group.none").is_none());

        store.set("group.odd.type", 9);
        assert!(repo.create("group.odd").is_none());

        store.set("group.list.type", 0);
        store.set("group.list.size", 1);
        store.set("group.list.members.0", "agent.5");
        let group = repo.create("group.list").expect("fixed list group");
        assert!(group.is_member(&"agent.5".into()));
    }
}
