//! In-process store
//!
//! Committed tables live behind a shared `Rc<RefCell<_>>`. Cloning a
//! `MemoryStore` yields another handle onto the same world with its own
//! staging area, which is how several sessions share one universe.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::{MessageId, Staged, Store, Tables};
use crate::error::Result;
use crate::world::{Message, Vessel, VesselId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: Rc<RefCell<Tables>>,
    staged: Staged,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A detached world seeded with `tables` and pending `staged` writes.
    pub(crate) fn from_parts(tables: Tables, staged: Staged) -> Self {
        Self {
            committed: Rc::new(RefCell::new(tables)),
            staged,
        }
    }

    /// Whether this handle has writes not yet committed.
    pub fn is_dirty(&self) -> bool {
        !self.staged.is_empty()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            committed: Rc::clone(&self.committed),
            staged: Staged::default(),
        }
    }
}

impl Store for MemoryStore {
    fn find(&self, predicate: &dyn Fn(&Vessel) -> bool) -> Vec<Vessel> {
        self.staged.find(&self.committed.borrow(), predicate)
    }

    fn get(&self, id: VesselId) -> Option<Vessel> {
        self.staged.get(&self.committed.borrow(), id)
    }

    fn count(&self) -> usize {
        self.staged.count(&self.committed.borrow())
    }

    fn put(&mut self, vessel: Vessel) {
        self.staged.vessels.insert(vessel.id(), vessel);
    }

    fn messages(&self, host_id: VesselId) -> Vec<Message> {
        self.staged.messages(&self.committed.borrow(), host_id)
    }

    fn append(&mut self, message: Message) {
        self.staged.messages.push(message);
    }

    fn next_vessel_id(&self) -> VesselId {
        self.staged.next_vessel_id(&self.committed.borrow())
    }

    fn next_message_id(&self) -> MessageId {
        self.staged.next_message_id(&self.committed.borrow())
    }

    fn commit(&mut self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let staged = std::mem::take(&mut self.staged);
        debug!(
            vessels = staged.vessels.len(),
            messages = staged.messages.len(),
            "committing to memory store"
        );
        self.committed.borrow_mut().absorb(staged);
        Ok(())
    }

    /// Shares the committed tables and copies only the staged layer.
    fn fork(&self) -> Result<MemoryStore> {
        Ok(MemoryStore {
            committed: Rc::clone(&self.committed),
            staged: self.staged.clone(),
        })
    }

    fn rollback(&mut self) {
        self.staged = Staged::default();
    }

    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }
}
