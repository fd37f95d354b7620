//! Persistence contract for the vessel world
//!
//! The core only talks to a [`Store`]: ordered predicate queries, lookups by
//! id, and an explicit commit. Writes are staged per handle and become
//! visible to other handles on `commit`; `rollback` drops them, so one
//! failed logical operation never leaves a half-written graph behind.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::world::{Message, Vessel, VesselId};

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

pub type MessageId = i64;

pub trait Store {
    /// Vessels matching `predicate`, in id order.
    fn find(&self, predicate: &dyn Fn(&Vessel) -> bool) -> Vec<Vessel>;

    fn get(&self, id: VesselId) -> Option<Vessel>;

    fn exists(&self, predicate: &dyn Fn(&Vessel) -> bool) -> bool {
        !self.find(predicate).is_empty()
    }

    fn count(&self) -> usize;

    /// Stage an insert or update.
    fn put(&mut self, vessel: Vessel);

    /// Messages hosted by `host_id`, oldest first.
    fn messages(&self, host_id: VesselId) -> Vec<Message>;

    /// Stage a new message.
    fn append(&mut self, message: Message);

    fn next_vessel_id(&self) -> VesselId;

    fn next_message_id(&self) -> MessageId;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self);

    /// Re-synchronise with what other handles have committed.
    fn refresh(&mut self) -> Result<()>;

    /// A private in-memory view of everything this handle can see, staged
    /// writes included. Writes to the fork never reach this store; a fork
    /// must not be committed.
    fn fork(&self) -> Result<MemoryStore> {
        copy_world(self)
    }
}

/// Copy every vessel and message `store` can see into a fresh world.
pub fn copy_world<S: Store + ?Sized>(store: &S) -> Result<MemoryStore> {
    let mut world = MemoryStore::new();
    for vessel in store.find(&|_| true) {
        for message in store.messages(vessel.id()) {
            world.append(message);
        }
        world.put(vessel);
    }
    world.commit()?;
    Ok(world)
}

/// Committed rows
#[derive(Debug, Default, Clone)]
pub(crate) struct Tables {
    pub vessels: BTreeMap<VesselId, Vessel>,
    pub messages: Vec<Message>,
}

impl Tables {
    pub fn absorb(&mut self, staged: Staged) {
        self.vessels.extend(staged.vessels);
        self.messages.extend(staged.messages);
    }
}

/// Uncommitted writes layered over a [`Tables`]
#[derive(Debug, Default, Clone)]
pub(crate) struct Staged {
    pub vessels: BTreeMap<VesselId, Vessel>,
    pub messages: Vec<Message>,
}

impl Staged {
    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty() && self.messages.is_empty()
    }

    pub fn find(&self, tables: &Tables, predicate: &dyn Fn(&Vessel) -> bool) -> Vec<Vessel> {
        let mut out: Vec<Vessel> = tables
            .vessels
            .iter()
            .map(|(id, committed)| self.vessels.get(id).unwrap_or(committed))
            .filter(|v| predicate(v))
            .cloned()
            .collect();
        out.extend(
            self.vessels
                .iter()
                .filter(|(id, _)| !tables.vessels.contains_key(id))
                .map(|(_, v)| v)
                .filter(|v| predicate(v))
                .cloned(),
        );
        out.sort_by_key(|v| v.id());
        out
    }

    pub fn get(&self, tables: &Tables, id: VesselId) -> Option<Vessel> {
        self.vessels
            .get(&id)
            .or_else(|| tables.vessels.get(&id))
            .cloned()
    }

    pub fn count(&self, tables: &Tables) -> usize {
        tables.vessels.len()
            + self
                .vessels
                .keys()
                .filter(|id| !tables.vessels.contains_key(id))
                .count()
    }

    pub fn messages(&self, tables: &Tables, host_id: VesselId) -> Vec<Message> {
        tables
            .messages
            .iter()
            .chain(self.messages.iter())
            .filter(|m| m.host_id() == host_id)
            .cloned()
            .collect()
    }

    pub fn next_vessel_id(&self, tables: &Tables) -> VesselId {
        let committed = tables.vessels.keys().next_back().copied();
        let staged = self.vessels.keys().next_back().copied();
        committed.max(staged).map_or(1, |id| id.max(0) + 1)
    }

    pub fn next_message_id(&self, tables: &Tables) -> MessageId {
        tables
            .messages
            .iter()
            .chain(self.messages.iter())
            .map(|m| m.id())
            .max()
            .map_or(1, |id| id + 1)
    }
}
