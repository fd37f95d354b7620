//! Context narration shown after a command moves the session

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::store::Store;
use crate::wildcard::{self, Scope};
use crate::world::forum;
use crate::world::{Graph, Vessel};

pub struct Narrator<'a> {
    store: &'a dyn Store,
    clock: Clock,
    config: &'a SessionConfig,
}

impl<'a> Narrator<'a> {
    pub fn new(store: &'a dyn Store, clock: Clock, config: &'a SessionConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    fn note(&self, scope: Scope, location: &Vessel) -> Result<Option<String>> {
        if location.raw_note().trim().is_empty() {
            return Ok(None);
        }
        let text = wildcard::expand(
            self.store,
            self.clock,
            scope,
            location.raw_note(),
            true,
            self.config.text_limits(),
        )?;
        let marked = Graph::new(self.store).mark_up(location, &text);
        Ok(Some(marked.trim().to_string()))
    }

    fn forum(&self, location: &Vessel) -> Vec<String> {
        forum::recent(self.store, location.id(), self.config.forum_size)
            .iter()
            .map(|m| m.render(self.store, &self.clock))
            .collect()
    }

    /// Narration for a vessel standing in its container.
    pub fn embodied(&self, scope: Scope, vessel: &Vessel, location: &Vessel, show_forum: bool) -> Result<Vec<String>> {
        let graph = Graph::new(self.store);
        let article = if location.owner_id() == vessel.id() {
            "your"
        } else {
            "the"
        };
        let paradox = if location.is_paradox() { "Paradox" } else { "" };
        let head = format!(
            "You are the {} in {} {} {}",
            vessel.full_name_with_id(),
            article,
            location.full_name_with_id(),
            paradox
        );

        let mut lines = vec![String::new(), head.trim().to_string()];
        if let Some(note) = self.note(scope, location)? {
            lines.push(String::new());
            lines.push(note);
        }
        let messages = self.forum(location);
        if show_forum && !messages.is_empty() {
            lines.push(String::new());
            lines.extend(messages);
        }

        let visible: Vec<Vessel> = graph
            .visible(location)
            .into_iter()
            .filter(|v| v.id() != vessel.id() && v.parent_id() != vessel.id())
            .collect();
        if !visible.is_empty() {
            lines.push(String::new());
            lines.push("You can see:".to_string());
            for v in visible.iter().take(self.config.num_visible) {
                lines.push(format!(" - {}", v.full_name_with_id()));
            }
            if visible.len() > self.config.num_visible {
                lines.push(format!(
                    "And {} more vessels (use *look* to see all)",
                    visible.len() - self.config.num_visible
                ));
            }
        }
        lines.push(String::new());
        Ok(lines)
    }

    /// Narration for a ghost.
    pub fn ghost(&self, scope: Scope, location: &Vessel, show_forum: bool) -> Result<Vec<String>> {
        let mut lines = vec![format!(
            "You are a ghost in the {}",
            location.full_name_with_id()
        )];
        if let Some(note) = self.note(scope, location)? {
            lines.push(String::new());
            lines.push(note);
        }
        let messages = self.forum(location);
        if show_forum && !messages.is_empty() {
            lines.push(String::new());
            lines.push(format!("Last {} messages", self.config.forum_size));
            lines.extend(messages);
        }
        lines.push(String::new());
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn world() -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut library = Vessel::create(1, "library", None, None).unwrap();
        library.set_note("Dusty shelves around the <(vessel.name)>.").unwrap();
        store.put(library);
        store.put(Vessel::create(2, "red cat", Some(1), Some(2)).unwrap());
        for (id, name) in [(3, "ball"), (4, "lamp"), (5, "desk")] {
            store.put(Vessel::create(id, name, Some(1), None).unwrap());
        }
        store.put(Vessel::create(6, "yarn", Some(2), None).unwrap());
        store.commit().unwrap();
        store
    }

    fn scope(vessel: Option<i64>) -> Scope {
        Scope {
            vessel,
            location: Some(1),
            target: None,
        }
    }

    #[test]
    fn test_embodied_narration() {
        let store = world();
        let config = SessionConfig {
            num_visible: 2,
            ..SessionConfig::default()
        };
        let narrator = Narrator::new(&store, Clock::with_offset_hours(0).unwrap(), &config);
        let cat = store.get(2).unwrap();
        let library = store.get(1).unwrap();
        let lines = narrator.embodied(scope(Some(2)), &cat, &library, true).unwrap();
        assert_eq!(lines[1], "You are the red cat (ID: 2) in the library (ID: 1) Paradox");
        assert_eq!(lines[3], "Dusty shelves around the cat.");
        assert!(lines.contains(&"You can see:".to_string()));
        assert!(lines.contains(&" - ball (ID: 3)".to_string()));
        assert!(!lines.iter().any(|l| l.contains("red cat (ID: 2)") && l.starts_with(" - ")));
        assert!(lines.contains(&"And 1 more vessels (use *look* to see all)".to_string()));
    }

    #[test]
    fn test_ghost_narration_with_forum() {
        let mut store = world();
        forum::post(&mut store, 1, 2, "hello").unwrap();
        store.commit().unwrap();
        let config = SessionConfig::default();
        let narrator = Narrator::new(&store, Clock::with_offset_hours(0).unwrap(), &config);
        let library = store.get(1).unwrap();
        let lines = narrator.ghost(scope(None), &library, true).unwrap();
        assert_eq!(lines[0], "You are a ghost in the library (ID: 1)");
        assert_eq!(lines[2], "Dusty shelves around the ghost.");
        assert_eq!(lines[4], "Last 5 messages");
        assert!(lines[5].ends_with("The red cat (ID: 2) said 'hello.'"));

        let quiet = narrator.ghost(scope(None), &library, false).unwrap();
        assert!(!quiet.iter().any(|l| l.contains("said")));
    }

    #[test]
    fn test_note_expanded_before_markup() {
        let mut store = world();
        let mut library = store.get(1).unwrap();
        library.set_note("The lamp is number <(find('lamp').id)>.").unwrap();
        store.put(library);
        store.commit().unwrap();
        let config = SessionConfig::default();
        let narrator = Narrator::new(&store, Clock::with_offset_hours(0).unwrap(), &config);
        let library = store.get(1).unwrap();
        let lines = narrator.ghost(scope(None), &library, false).unwrap();
        assert_eq!(lines[2], "The [lamp] is number 4.");
    }
}
