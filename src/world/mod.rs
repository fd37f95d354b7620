//! The vessel world: entities, their containment graph and message logs

pub mod forum;
pub mod graph;
pub mod names;
pub mod vessel;

pub use forum::{Message, MessageKind};
pub use graph::Graph;
pub use vessel::{Flag, Vessel, VesselId};

use tracing::info;

use crate::error::Result;
use crate::store::Store;

/// Id of the vessel every fresh world starts with.
pub const GENESIS_ID: VesselId = 1;

/// Seed an empty store with the library, a single unlocked paradox.
/// Returns whether anything was written.
pub fn genesis(store: &mut dyn Store) -> Result<bool> {
    if store.count() > 0 {
        return Ok(false);
    }
    let library = Vessel::create(GENESIS_ID, "library", Some(GENESIS_ID), Some(GENESIS_ID))?;
    info!(id = GENESIS_ID, "seeding empty world");
    store.put(library);
    store.commit()?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_genesis_once() {
        let mut store = MemoryStore::new();
        assert!(genesis(&mut store).unwrap());
        assert!(!genesis(&mut store).unwrap());
        let library = store.get(GENESIS_ID).unwrap();
        assert!(library.is_paradox());
        assert!(!library.is_locked());
    }
}
