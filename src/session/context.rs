//! Session identity and nesting state
//!
//! A session is either a ghost standing in a bare location or embodied as a
//! vessel, whose container is then the effective location. Nested programs
//! push frames; the frame stack is what the depth guard counts.

use serde::Serialize;

use crate::error::{ParadoxError, Result};
use crate::store::Store;
use crate::world::VesselId;

/// One level of nested program or spell execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Effective location when the frame was pushed
    pub location: Option<VesselId>,
    /// What is running, for logs
    pub label: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionContext {
    vessel: Option<VesselId>,
    location: VesselId,
    frames: Vec<Frame>,
    last_rendered: Option<VesselId>,
}

impl SessionContext {
    /// A ghost standing in `location`.
    pub fn new(location: VesselId) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    pub fn vessel(&self) -> Option<VesselId> {
        self.vessel
    }

    pub fn is_embodied(&self) -> bool {
        self.vessel.is_some()
    }

    /// Embody `vessel`; `None` turns the session back into a ghost.
    pub fn set_vessel(&mut self, vessel: Option<VesselId>) {
        self.vessel = vessel;
    }

    /// The ghost's own location.
    pub fn location(&self) -> VesselId {
        self.location
    }

    pub fn set_location(&mut self, location: VesselId) {
        self.location = location;
    }

    /// Where the session effectively stands: the embodied vessel's
    /// container, or the ghost's location.
    pub fn effective_location(&self, store: &dyn Store) -> Option<VesselId> {
        match self.vessel {
            Some(id) => store.get(id).map(|v| v.parent_id()),
            None => Some(self.location),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn in_program(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Enter a nested execution, refusing to go past `max_depth`.
    pub fn push_frame(&mut self, frame: Frame, max_depth: usize) -> Result<()> {
        if self.frames.len() >= max_depth {
            return Err(ParadoxError::RecursionLimit(max_depth));
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn clear_frames(&mut self) {
        self.frames.clear();
    }

    /// Whether narration is due for `location`, i.e. it differs from the
    /// last one rendered.
    pub fn needs_render(&self, location: Option<VesselId>) -> bool {
        location.is_some() && location != self.last_rendered
    }

    pub fn mark_rendered(&mut self, location: Option<VesselId>) {
        self.last_rendered = location;
    }

    pub fn prompt(&self, store: &dyn Store) -> String {
        let mut prompt = match self.vessel {
            Some(id) => {
                let parent = store
                    .get(id)
                    .map_or_else(|| "None".to_string(), |v| v.parent_id().to_string());
                format!("{}@{}", id, parent)
            }
            None => format!("None@{}", self.location),
        };
        if self.in_program() {
            prompt = format!("(program:{}){}", self.depth(), prompt);
        }
        format!("{}> ", prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::world::Vessel;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.put(Vessel::create(1, "library", None, None).unwrap());
        store.put(Vessel::create(2, "red cat", Some(1), None).unwrap());
        store
    }

    fn frame() -> Frame {
        Frame {
            location: Some(1),
            label: "test".to_string(),
        }
    }

    #[test]
    fn test_prompt() {
        let store = store();
        let mut ctx = SessionContext::new(1);
        assert_eq!(ctx.prompt(&store), "None@1> ");
        ctx.set_vessel(Some(2));
        assert_eq!(ctx.prompt(&store), "2@1> ");
        ctx.push_frame(frame(), 8).unwrap();
        assert_eq!(ctx.prompt(&store), "(program:1)2@1> ");
    }

    #[test]
    fn test_effective_location() {
        let store = store();
        let mut ctx = SessionContext::new(1);
        assert_eq!(ctx.effective_location(&store), Some(1));
        ctx.set_vessel(Some(2));
        assert_eq!(ctx.effective_location(&store), Some(1));
        ctx.set_vessel(Some(99));
        assert_eq!(ctx.effective_location(&store), None);
    }

    #[test]
    fn test_depth_guard() {
        let mut ctx = SessionContext::new(1);
        ctx.push_frame(frame(), 2).unwrap();
        ctx.push_frame(frame(), 2).unwrap();
        match ctx.push_frame(frame(), 2) {
            Err(ParadoxError::RecursionLimit(2)) => {}
            other => panic!("Expected recursion limit, got {:?}", other),
        }
        assert_eq!(ctx.depth(), 2);
        ctx.clear_frames();
        assert!(!ctx.in_program());
    }

    #[test]
    fn test_render_cache() {
        let mut ctx = SessionContext::new(1);
        assert!(ctx.needs_render(Some(1)));
        ctx.mark_rendered(Some(1));
        assert!(!ctx.needs_render(Some(1)));
        assert!(ctx.needs_render(Some(4)));
        assert!(!ctx.needs_render(None));
    }
}
