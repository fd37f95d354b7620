//! Containment graph queries
//!
//! Parent and owner edges are plain ids into the store, so a vessel may sit
//! inside itself or inside a longer loop. Every walk keeps a visited set and
//! a hard step bound, and stops at the first revisit.

use std::collections::HashSet;

use rand::seq::SliceRandom;

use crate::store::Store;
use crate::world::names::split_vessel_name;
use crate::world::{Vessel, VesselId};

/// Minimum rating for a paradox to be listed in the atlas.
pub const ATLAS_MIN_RATING: u8 = 50;

const RATING_SIGNALS: usize = 9;

pub struct Graph<'a> {
    store: &'a dyn Store,
}

/// Pick from `candidates` the best match for free text: exact attr and
/// name, then name only, then attr only. Comparisons ignore case.
pub fn match_vessel(candidates: &[Vessel], text: &str) -> Option<Vessel> {
    let (attr, name) = split_vessel_name(&text.to_lowercase());
    if name.is_empty() {
        return None;
    }
    let eq = |a: &str, b: &str| a.eq_ignore_ascii_case(b);
    candidates
        .iter()
        .find(|v| eq(v.name(), &name) && eq(v.attr(), &attr))
        .or_else(|| candidates.iter().find(|v| eq(v.name(), &name)))
        .or_else(|| candidates.iter().find(|v| eq(v.attr(), &name)))
        .cloned()
}

fn parse_id(text: &str) -> Option<VesselId> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl<'a> Graph<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a dyn Store {
        self.store
    }

    pub fn get(&self, id: VesselId) -> Option<Vessel> {
        self.store.get(id)
    }

    pub fn parent(&self, v: &Vessel) -> Option<Vessel> {
        self.store.get(v.parent_id())
    }

    pub fn owner(&self, v: &Vessel) -> Option<Vessel> {
        self.store.get(v.owner_id())
    }

    pub fn universe(&self) -> Vec<Vessel> {
        self.store.find(&|_| true)
    }

    /// Silent containers only reveal what they or their owner own.
    fn audible(container: Option<&Vessel>, candidate: &Vessel) -> bool {
        match container {
            Some(c) if c.is_silent() => {
                candidate.owner_id() == c.owner_id() || candidate.owner_id() == c.id()
            }
            _ => true,
        }
    }

    pub fn siblings(&self, v: &Vessel) -> Vec<Vessel> {
        let (id, parent_id) = (v.id(), v.parent_id());
        let container = self.parent(v);
        self.store
            .find(&|c| {
                c.parent_id() == parent_id && c.id() != parent_id && c.id() != id && !c.name().is_empty()
            })
            .into_iter()
            .filter(|c| Self::audible(container.as_ref(), c))
            .collect()
    }

    pub fn children(&self, v: &Vessel) -> Vec<Vessel> {
        let id = v.id();
        self.store
            .find(&|c| c.parent_id() == id && c.id() != id && !c.name().is_empty())
            .into_iter()
            .filter(|c| Self::audible(Some(v), c))
            .collect()
    }

    /// Siblings then children, first occurrence wins.
    pub fn visible(&self, v: &Vessel) -> Vec<Vessel> {
        let mut seen = HashSet::new();
        self.siblings(v)
            .into_iter()
            .chain(self.children(v))
            .filter(|c| c.id() != v.id() && seen.insert(c.id()))
            .collect()
    }

    pub fn tunnels(&self) -> Vec<Vessel> {
        self.store.find(&|c| c.is_tunnel())
    }

    /// Programs that may be cast from anywhere.
    pub fn spells(&self) -> Vec<Vessel> {
        self.store.find(&|c| {
            c.name() == "spell" && !c.program().is_empty() && c.is_locked() && !c.attr().is_empty()
        })
    }

    pub fn atlas(&self) -> Vec<Vessel> {
        self.store
            .find(&|c| c.is_paradox() && c.id() >= 1 && !c.is_hidden() && c.is_locked())
            .into_iter()
            .filter(|c| self.rating(c) >= ATLAS_MIN_RATING)
            .collect()
    }

    /// Tunnels `v` can reach: those named in its note, or every tunnel when
    /// `v` is one.
    fn reachable_tunnels(&self, v: &Vessel) -> Vec<Vessel> {
        let note = v.raw_note().to_lowercase();
        let tunnels = self.tunnels();
        if v.is_tunnel() {
            return tunnels;
        }
        tunnels
            .into_iter()
            .filter(|t| {
                let full = t.full_name().to_lowercase();
                !full.is_empty() && note.contains(&full)
            })
            .collect()
    }

    pub fn find_visible(&self, v: &Vessel, text: &str) -> Option<Vessel> {
        if text.trim().is_empty() {
            return None;
        }
        let mut candidates = self.visible(v);
        candidates.extend(self.reachable_tunnels(v));
        if let Some(id) = parse_id(text) {
            return candidates.into_iter().find(|c| c.id() == id);
        }
        match_vessel(&candidates, text)
    }

    pub fn find_child(&self, v: &Vessel, text: &str) -> Option<Vessel> {
        if text.trim().is_empty() {
            return None;
        }
        match_vessel(&self.children(v), text)
    }

    /// Look anywhere in the universe; numeric text is an id.
    pub fn find_distant(&self, text: &str) -> Option<Vessel> {
        if text.trim().is_empty() {
            return None;
        }
        if let Some(id) = parse_id(text) {
            return self.store.get(id);
        }
        match_vessel(&self.universe(), text)
    }

    /// The paradox at the root of `v`'s ancestry, or the last distinct
    /// vessel before the walk would revisit one.
    pub fn stem(&self, v: &Vessel) -> Vessel {
        let bound = self.store.count() + 1;
        let mut visited = HashSet::from([v.id()]);
        let mut current = v.clone();
        for _ in 0..bound {
            if current.is_paradox() {
                break;
            }
            match self.parent(&current) {
                Some(parent) if visited.insert(parent.id()) => current = parent,
                _ => break,
            }
        }
        current
    }

    /// Hops from `v` to its stem.
    pub fn depth(&self, v: &Vessel) -> usize {
        let bound = self.store.count() + 1;
        let mut visited = HashSet::from([v.id()]);
        let mut current = v.clone();
        let mut hops = 0;
        while hops < bound && !current.is_paradox() {
            match self.parent(&current) {
                Some(parent) if visited.insert(parent.id()) => {
                    current = parent;
                    hops += 1;
                }
                _ => break,
            }
        }
        hops
    }

    /// Share of the nine quality signals that hold, as a percentage.
    pub fn rating(&self, v: &Vessel) -> u8 {
        let signals = [
            !v.raw_note().trim().is_empty(),
            !v.attr().trim().is_empty(),
            !v.program().trim().is_empty(),
            !self.children(v).is_empty(),
            v.is_paradox(),
            v.is_locked(),
            v.is_hidden(),
            v.is_silent(),
            v.is_tunnel(),
        ];
        let held = signals.iter().filter(|s| **s).count();
        (held * 100 / RATING_SIGNALS) as u8
    }

    /// The note with tunnels marked `|name|` and visible vessels `[name]`,
    /// prefixed with `^` when programmed.
    pub fn note(&self, v: &Vessel) -> String {
        self.mark_up(v, v.raw_note())
    }

    /// Apply the note markup of `v` to already rendered `text`.
    pub fn mark_up(&self, v: &Vessel, text: &str) -> String {
        let mut note = text.to_string();
        let mut tagged = HashSet::new();
        let marked = self
            .tunnels()
            .into_iter()
            .map(|t| (t, '|', '|'))
            .chain(self.visible(v).into_iter().map(|c| (c, '[', ']')));
        for (vessel, open, close) in marked {
            if !tagged.insert(vessel.id()) {
                continue;
            }
            let full = vessel.full_name();
            if full.chars().count() <= 2 {
                continue;
            }
            let caret = if vessel.program().is_empty() { "" } else { "^" };
            note = note.replace(&full, &format!("{}{}{}{}", caret, open, full, close));
        }
        note
    }

    pub fn random(&self) -> Option<Vessel> {
        self.universe().choose(&mut rand::thread_rng()).cloned()
    }

    pub fn random_child(&self, v: &Vessel) -> Option<Vessel> {
        self.children(v).choose(&mut rand::thread_rng()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::world::Flag;

    fn put(store: &mut MemoryStore, id: VesselId, text: &str, parent: VesselId) -> Vessel {
        let v = Vessel::create(id, text, Some(parent), None).unwrap();
        store.put(v.clone());
        v
    }

    fn world() -> MemoryStore {
        let mut store = MemoryStore::new();
        put(&mut store, 1, "library", 1);
        put(&mut store, 2, "red door", 1);
        put(&mut store, 3, "small box", 1);
        put(&mut store, 4, "blue marble", 3);
        store
    }

    #[test]
    fn test_siblings_and_children() {
        let store = world();
        let g = Graph::new(&store);
        let door = store.get(2).unwrap();
        let ids: Vec<_> = g.siblings(&door).iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![3]);
        let box_ = store.get(3).unwrap();
        let ids: Vec<_> = g.children(&box_).iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![4]);
    }

    #[test]
    fn test_visible_excludes_self_and_dupes() {
        let store = world();
        let g = Graph::new(&store);
        let library = store.get(1).unwrap();
        let ids: Vec<_> = g.visible(&library).iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![2, 3]);
        let box_ = store.get(3).unwrap();
        let ids: Vec<_> = g.visible(&box_).iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn test_silent_container_filters() {
        let mut store = world();
        let mut library = store.get(1).unwrap();
        library.set_flag(Flag::Silent, true).unwrap();
        store.put(library);
        let mut stranger = Vessel::create(5, "odd stranger", Some(1), Some(3)).unwrap();
        stranger.set_note("hello").unwrap();
        store.put(stranger);
        let g = Graph::new(&store);
        let door = store.get(2).unwrap();
        let ids: Vec<_> = g.siblings(&door).iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_find_priority() {
        let mut store = world();
        put(&mut store, 5, "door", 1);
        put(&mut store, 6, "red lamp", 1);
        let g = Graph::new(&store);
        let box_ = store.get(3).unwrap();
        assert_eq!(g.find_visible(&box_, "the red door").unwrap().id(), 2);
        assert_eq!(g.find_visible(&box_, "door").unwrap().id(), 5);
        assert_eq!(g.find_visible(&box_, "red").unwrap().id(), 2);
        assert_eq!(g.find_visible(&box_, "4").unwrap().id(), 4);
        assert!(g.find_visible(&box_, "").is_none());
        assert!(g.find_visible(&box_, "1").is_none());
        assert_eq!(g.find_child(&box_, "marble").unwrap().id(), 4);
        assert_eq!(g.find_distant("1").unwrap().id(), 1);
        assert_eq!(g.find_distant("Blue Marble").unwrap().id(), 4);
    }

    #[test]
    fn test_find_visible_through_tunnel_note() {
        let mut store = world();
        let mut gate = Vessel::create(7, "far gate", Some(7), None).unwrap();
        gate.set_flag(Flag::Tunnel, true).unwrap();
        store.put(gate);
        let mut door = store.get(2).unwrap();
        door.set_note("It leads to the far gate.").unwrap();
        store.put(door.clone());
        let g = Graph::new(&store);
        assert_eq!(g.find_visible(&door, "far gate").unwrap().id(), 7);
        let box_ = store.get(3).unwrap();
        assert!(g.find_visible(&box_, "far gate").is_none());
    }

    #[test]
    fn test_stem_and_depth_terminate_on_cycles() {
        let mut store = MemoryStore::new();
        put(&mut store, 1, "first ring", 2);
        put(&mut store, 2, "second ring", 3);
        put(&mut store, 3, "third ring", 1);
        put(&mut store, 4, "pebble", 1);
        let g = Graph::new(&store);
        let pebble = store.get(4).unwrap();
        assert_eq!(g.stem(&pebble).id(), 3);
        assert_eq!(g.depth(&pebble), 3);
        let first = store.get(1).unwrap();
        assert_eq!(g.stem(&first).id(), 3);
        assert_eq!(g.depth(&first), 2);
    }

    #[test]
    fn test_stem_finds_paradox() {
        let store = world();
        let g = Graph::new(&store);
        let marble = store.get(4).unwrap();
        assert_eq!(g.stem(&marble).id(), 1);
        assert_eq!(g.depth(&marble), 2);
        let library = store.get(1).unwrap();
        assert_eq!(g.stem(&library).id(), 1);
        assert_eq!(g.depth(&library), 0);
    }

    #[test]
    fn test_rating_monotonic() {
        let mut store = world();
        let g = Graph::new(&store);
        let door = store.get(2).unwrap();
        let base = g.rating(&door);
        assert_eq!(base, 11);
        let mut door = door;
        door.set_note("a note").unwrap();
        door.set_flag(Flag::Hidden, true).unwrap();
        store.put(door.clone());
        let g = Graph::new(&store);
        let raised = g.rating(&door);
        assert!(raised > base);
        assert!(raised <= 100);
    }

    #[test]
    fn test_atlas_and_spells() {
        let mut store = world();
        let mut library = store.get(1).unwrap();
        library.set_note("the great library").unwrap();
        library.set_program("look").unwrap();
        library.set_flag(Flag::Locked, true).unwrap();
        store.put(library);
        let mut spell = Vessel::create(8, "warm spell", Some(1), None).unwrap();
        spell.set_program("say hi").unwrap();
        spell.set_flag(Flag::Locked, true).unwrap();
        store.put(spell);
        put(&mut store, 9, "spell", 1);
        let g = Graph::new(&store);
        let atlas: Vec<_> = g.atlas().iter().map(|v| v.id()).collect();
        assert_eq!(atlas, vec![1]);
        let spells: Vec<_> = g.spells().iter().map(|v| v.id()).collect();
        assert_eq!(spells, vec![8]);
    }

    #[test]
    fn test_note_markup() {
        let mut store = world();
        let mut gate = Vessel::create(7, "far gate", Some(7), None).unwrap();
        gate.set_flag(Flag::Tunnel, true).unwrap();
        store.put(gate);
        let mut door = store.get(2).unwrap();
        door.set_note("Past the small box lies the far gate.").unwrap();
        store.put(door.clone());
        let g = Graph::new(&store);
        assert_eq!(g.note(&door), "Past the [small box] lies the |far gate|.");
    }
}
