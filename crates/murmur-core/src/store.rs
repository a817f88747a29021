//! SharedStore — the key/value substrate agents coordinate through.
//!
//! Agents never talk to each other directly. Each agent owns a store
//! handle; writes are buffered locally and handed to a [`Transport`] on
//! [`SharedStore::flush`]. Reads only ever see the local replica, so
//! everything built on top must tolerate stale peer state.
//!
//! Keys are dotted paths (`agent.0.algorithm`, `group.alpha.members.1`).
//! Prefix-scoped helpers take the scope without a trailing dot.

use crate::types::{KnowledgeMap, Value};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};
use uuid::Uuid;

/// One buffered write. `None` removes the key on the receiving side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub key: String,
    pub value: Option<Value>,
}

/// Carries flushed write batches to peer replicas.
pub trait Transport: Send + Sync {
    /// Deliver a batch originating from the store with id `origin`.
    fn send(&self, origin: Uuid, updates: &[Update]);
}

#[derive(Default)]
struct StoreState {
    records: BTreeMap<String, Value>,
    modified: BTreeMap<String, Option<Value>>,
}

struct StoreInner {
    id: Uuid,
    state: ReentrantMutex<RefCell<StoreState>>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
}

/// A cloneable handle to one agent's replica of the shared store.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<StoreInner>,
}

/// Exclusive scope over a store. Re-entrant: the holder may keep using
/// the store, other threads block until the guard drops.
pub struct StoreGuard<'a> {
    _guard: ReentrantMutexGuard<'a, RefCell<StoreState>>,
}

fn scoped(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('.') {
        prefix.to_string()
    } else {
        format!("{}.", prefix)
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStore")
            .field("id", &self.inner.id)
            .field("records", &self.len())
            .field("pending", &self.pending_updates())
            .finish()
    }
}

impl SharedStore {
    /// Create an empty store with no transport attached.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                id: Uuid::new_v4(),
                state: ReentrantMutex::new(RefCell::new(StoreState::default())),
                transport: RwLock::new(None),
            }),
        }
    }

    /// Unique id of this replica.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Whether two handles point at the same replica.
    pub fn same_replica(&self, other: &SharedStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn set_transport(&self, transport: Arc<dyn Transport>) {
        *self.inner.transport.write() = Some(transport);
    }

    /// Take the exclusive scope lock for the lifetime of the guard.
    pub fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            _guard: self.inner.state.lock(),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let guard = self.inner.state.lock();
        let state = guard.borrow();
        f(&state)
    }

    fn write<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let guard = self.inner.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    // --- Reads ---

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read(|s| s.records.get(key).cloned())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.read(|s| s.records.contains_key(key))
    }

    /// Integer at `key`, 0 when absent.
    pub fn get_integer(&self, key: &str) -> i64 {
        self.get(key).map(|v| v.to_integer()).unwrap_or(0)
    }

    /// Double at `key`, 0.0 when absent.
    pub fn get_double(&self, key: &str) -> f64 {
        self.get(key).map(|v| v.to_double()).unwrap_or(0.0)
    }

    /// String at `key`, empty when absent.
    pub fn get_string(&self, key: &str) -> String {
        self.get(key).map(|v| v.to_string()).unwrap_or_default()
    }

    /// Double array at `key`, empty when absent.
    pub fn get_doubles(&self, key: &str) -> Vec<f64> {
        self.get(key).map(|v| v.to_doubles()).unwrap_or_default()
    }

    /// All records whose key starts with `prefix.`, keys unchanged.
    pub fn to_map(&self, prefix: &str) -> KnowledgeMap {
        let scope = scoped(prefix);
        self.read(|s| {
            s.records
                .range(scope.clone()..)
                .take_while(|(k, _)| k.starts_with(&scope))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
    }

    /// All records under `prefix.`, with that prefix stripped from the keys.
    pub fn to_map_stripped(&self, prefix: &str) -> KnowledgeMap {
        let scope = scoped(prefix);
        self.read(|s| {
            s.records
                .range(scope.clone()..)
                .take_while(|(k, _)| k.starts_with(&scope))
                .map(|(k, v)| (k[scope.len()..].to_string(), v.clone()))
                .collect()
        })
    }

    pub fn keys(&self, prefix: &str) -> Vec<String> {
        self.to_map(prefix).into_keys().collect()
    }

    pub fn len(&self) -> usize {
        self.read(|s| s.records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every record in the replica.
    pub fn snapshot(&self) -> KnowledgeMap {
        self.read(|s| s.records.clone())
    }

    pub fn to_json(&self) -> crate::error::Result<serde_json::Value> {
        Ok(serde_json::to_value(self.snapshot())?)
    }

    // --- Writes ---

    /// Write a value and buffer it for the next flush.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        trace!("set {} = {}", key, value);
        self.write(|s| {
            s.records.insert(key.clone(), value.clone());
            s.modified.insert(key, Some(value));
        });
    }

    /// Write a value that stays in this replica only.
    pub fn set_local(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        self.write(|s| {
            s.records.insert(key, value);
        });
    }

    /// Remove a key and buffer the removal for the next flush.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.write(|s| {
            let old = s.records.remove(key);
            if old.is_some() {
                s.modified.insert(key.to_string(), None);
            }
            old
        })
    }

    /// Remove a key from this replica only.
    pub fn remove_local(&self, key: &str) -> Option<Value> {
        self.write(|s| s.records.remove(key))
    }

    /// Remove every key under `prefix.`; returns how many were removed.
    pub fn clear_prefix(&self, prefix: &str) -> usize {
        self.clear_prefix_with(prefix, true)
    }

    /// Like [`clear_prefix`](Self::clear_prefix) but without buffering.
    pub fn clear_prefix_local(&self, prefix: &str) -> usize {
        self.clear_prefix_with(prefix, false)
    }

    fn clear_prefix_with(&self, prefix: &str, buffered: bool) -> usize {
        let keys = self.keys(prefix);
        self.write(|s| {
            for key in &keys {
                s.records.remove(key);
                if buffered {
                    s.modified.insert(key.clone(), None);
                }
            }
        });
        keys.len()
    }

    /// Add `delta` to the integer at `key` and return the new value.
    pub fn increment(&self, key: &str, delta: i64) -> i64 {
        let next = self.get_integer(key) + delta;
        self.set(key, next);
        next
    }

    // --- Distribution ---

    /// Number of buffered updates awaiting a flush.
    pub fn pending_updates(&self) -> usize {
        self.read(|s| s.modified.len())
    }

    /// Hand every buffered update to the transport as one batch.
    ///
    /// Returns the batch size. Without a transport the batch is dropped.
    pub fn flush(&self) -> usize {
        let batch: Vec<Update> = self.write(|s| {
            std::mem::take(&mut s.modified)
                .into_iter()
                .map(|(key, value)| Update { key, value })
                .collect()
        });
        if batch.is_empty() {
            return 0;
        }

        let transport = self.inner.transport.read().clone();
        match transport {
            Some(transport) => {
                debug!("flushing {} updates from {}", batch.len(), self.inner.id);
                transport.send(self.inner.id, &batch);
            }
            None => trace!("no transport, discarding {} updates", batch.len()),
        }
        batch.len()
    }

    /// Apply a batch received from a peer. Remote writes are never re-buffered.
    pub fn apply_remote(&self, updates: &[Update]) {
        self.write(|s| {
            for update in updates {
                match &update.value {
                    Some(value) => {
                        s.records.insert(update.key.clone(), value.clone());
                    }
                    None => {
                        s.records.remove(&update.key);
                    }
                }
            }
        });
    }
}

/// In-process transport connecting several replicas.
///
/// Every flushed batch is applied to all other attached stores. There is
/// no ordering or delivery guarantee beyond "applied before `send` returns".
#[derive(Default)]
pub struct LoopbackFabric {
    stores: Mutex<Vec<Weak<StoreInner>>>,
}

impl LoopbackFabric {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a store: its flushes now reach every other attached store.
    pub fn attach(self: &Arc<Self>, store: &SharedStore) {
        self.stores.lock().push(Arc::downgrade(&store.inner));
        store.set_transport(self.clone());
    }

    /// Number of live attached stores.
    pub fn len(&self) -> usize {
        self.stores
            .lock()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for LoopbackFabric {
    fn send(&self, origin: Uuid, updates: &[Update]) {
        let peers: Vec<SharedStore> = {
            let mut stores = self.stores.lock();
            stores.retain(|w| w.strong_count() > 0);
            stores
                .iter()
                .filter_map(Weak::upgrade)
                .filter(|inner| inner.id != origin)
                .map(|inner| SharedStore { inner })
                .collect()
        };
        for peer in peers {
            peer.apply_remote(updates);
        }
    }
}
