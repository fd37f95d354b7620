//! Built-in verbs

use std::collections::BTreeMap;

use tracing::info;

use crate::error::{ParadoxError, Result};
use crate::output::{InspectReport, Report};
use crate::security::validator::{describe_program, SCRIPT_TAG};
use crate::security::{encode_script, ensure_container_owner, ensure_owner, ensure_unlocked, ProgramKind};
use crate::session::engine::Session;
use crate::session::help;
use crate::wildcard::Scope;
use crate::world::names::split_vessel_name;
use crate::world::{forum, Flag, Graph, Vessel};

fn no_such(name: &str) -> ParadoxError {
    ParadoxError::NotFound(format!("There is no {} here", name))
}

fn names(vessels: &[Vessel]) -> Vec<String> {
    vessels.iter().map(Vessel::full_name_with_id).collect()
}

impl Session {
    fn container(&self, actor: &Vessel) -> Result<Vessel> {
        self.store.get(actor.parent_id()).ok_or_else(|| {
            ParadoxError::NotFound(format!("Vessel {} could not be found", actor.parent_id()))
        })
    }

    fn ghost_location(&self) -> Option<Vessel> {
        self.store.get(self.context.location())
    }

    pub(crate) fn look(&mut self) -> Result<()> {
        let vessels = {
            let graph = Graph::new(self.store.as_ref());
            let seen = match self.actor() {
                Ok(actor) => graph.parent(&actor).map(|p| graph.visible(&p)),
                Err(_) => self.ghost_location().map(|l| graph.children(&l)),
            };
            seen.unwrap_or_default()
        };
        self.emit_report(&Report::Listing {
            heading: "You can see:".to_string(),
            vessels: names(&vessels),
        });
        Ok(())
    }

    pub(crate) fn forum(&mut self) -> Result<()> {
        let actor = self.actor()?;
        let lines: Vec<String> = forum::forum(self.store.as_ref(), actor.parent_id())
            .iter()
            .map(|m| m.render(self.store.as_ref(), &self.clock))
            .collect();
        if lines.is_empty() {
            self.emit("No messages");
        } else {
            self.emit("");
            self.emit_all(lines);
        }
        Ok(())
    }

    pub(crate) fn inspect(&mut self, name: Option<&str>) -> Result<()> {
        let report = {
            let graph = Graph::new(self.store.as_ref());
            let nearby = match (self.actor(), name) {
                (Ok(actor), Some(name)) => graph.find_visible(&actor, name),
                (Ok(actor), None) => graph.parent(&actor),
                (Err(_), Some(name)) => self
                    .ghost_location()
                    .and_then(|l| graph.find_visible(&l, name)),
                (Err(_), None) => self.ghost_location(),
            };
            let vessel = nearby
                .or_else(|| name.and_then(|n| graph.find_distant(n)))
                .ok_or_else(|| {
                    ParadoxError::NotFound(format!(
                        "Vessel {} could not be found",
                        name.unwrap_or_default()
                    ))
                })?;
            self.inspect_report(&graph, &vessel)
        };
        self.emit_report(&Report::Inspect(report));
        Ok(())
    }

    fn inspect_report(&self, graph: &Graph<'_>, vessel: &Vessel) -> InspectReport {
        let stem = graph.stem(vessel);
        let flags: BTreeMap<String, bool> = Flag::ALL
            .iter()
            .map(|f| (f.to_string(), vessel.flag(*f)))
            .collect();
        InspectReport {
            id: vessel.id(),
            full_name: vessel.full_name(),
            full_name_with_id: vessel.full_name_with_id(),
            owner: graph
                .owner(vessel)
                .map_or_else(|| vessel.owner_id().to_string(), |o| o.full_name_with_id()),
            rating: graph.rating(vessel),
            paradox: vessel.is_paradox(),
            depth: graph.depth(vessel),
            stem: stem.full_name(),
            stem_vessel: stem.to_string(),
            note: graph.note(vessel),
            program: describe_program(vessel.program()),
            flags,
            siblings: names(&graph.siblings(vessel)),
            children: names(&graph.children(vessel)),
            visible: names(&graph.visible(vessel)),
            forum: forum::forum(graph.store(), vessel.id())
                .iter()
                .map(|m| m.render(graph.store(), &self.clock))
                .collect(),
        }
    }

    pub(crate) fn create(&mut self, name: &str) -> Result<()> {
        let (parent, owner) = {
            let graph = Graph::new(self.store.as_ref());
            match self.actor() {
                Ok(actor) => {
                    if let Some(existing) = graph.find_visible(&actor, name) {
                        return Err(ParadoxError::InvalidArgument(format!(
                            "There is already a {} here",
                            existing.name()
                        )));
                    }
                    (actor.parent_id(), actor.id())
                }
                Err(_) => {
                    let location = self.context.location();
                    let existing = self
                        .ghost_location()
                        .and_then(|l| graph.find_child(&l, name));
                    if let Some(existing) = existing {
                        return Err(ParadoxError::InvalidArgument(format!(
                            "There is already a {} here",
                            existing.name()
                        )));
                    }
                    (location, location)
                }
            }
        };
        let vessel = Vessel::create(self.store.next_vessel_id(), name, Some(parent), Some(owner))?;
        info!(id = vessel.id(), name = %vessel.full_name(), parent, "created vessel");
        self.emit(format!("Created a {}", vessel.full_name_with_id()));
        self.store.put(vessel);
        Ok(())
    }

    pub(crate) fn become_vessel(&mut self, name: &str) -> Result<()> {
        let target = {
            let graph = Graph::new(self.store.as_ref());
            match self.actor() {
                Ok(actor) => graph.find_visible(&actor, name),
                Err(_) => self.ghost_location().and_then(|l| graph.find_child(&l, name)),
            }
        }
        .ok_or_else(|| no_such(name))?;
        self.context.set_vessel(Some(target.id()));
        self.emit(format!("You are now the {}", target.full_name_with_id()));
        Ok(())
    }

    pub(crate) fn enter(&mut self, name: &str) -> Result<()> {
        let mut actor = self.actor()?;
        let target = Graph::new(self.store.as_ref())
            .find_visible(&actor, name)
            .ok_or_else(|| no_such(name))?;
        actor.set_parent(target.id())?;
        self.emit(format!("Entering the {}", target.full_name_with_id()));
        self.store.put(actor);
        Ok(())
    }

    pub(crate) fn leave(&mut self) -> Result<()> {
        let mut actor = self.actor()?;
        let parent = self.container(&actor)?;
        if parent.is_paradox() {
            return Err(ParadoxError::InvalidArgument(format!(
                "You cannot leave the {}, it is a paradox",
                parent.full_name_with_id()
            )));
        }
        let grandparent = self.container(&parent)?;
        actor.set_parent(grandparent.id())?;
        self.emit(format!(
            "Leaving the {} and entering the {}",
            parent.full_name_with_id(),
            grandparent.full_name_with_id()
        ));
        self.store.put(actor);
        Ok(())
    }

    pub(crate) fn fold(&mut self) -> Result<()> {
        let mut actor = self.actor()?;
        actor.fold()?;
        info!(id = actor.id(), "folded");
        self.emit(format!("The {} is now its own container", actor.full_name_with_id()));
        self.store.put(actor);
        Ok(())
    }

    pub(crate) fn warp(&mut self, name: &str) -> Result<()> {
        let mut actor = self.actor()?;
        let target = match name.parse::<i64>() {
            Ok(id) => self.store.get(id),
            Err(_) => {
                let graph = Graph::new(self.store.as_ref());
                graph
                    .find_visible(&actor, name)
                    .or_else(|| graph.find_distant(name))
            }
        }
        .ok_or_else(|| ParadoxError::NotFound("Target vessel not found".to_string()))?;
        actor.set_parent(target.id())?;
        self.emit(format!("Warping to {}", target.full_name_with_id()));
        self.store.put(actor);
        Ok(())
    }

    pub(crate) fn note(&mut self, text: &str) -> Result<()> {
        let actor = self.actor()?;
        let mut container = self.container(&actor)?;
        ensure_container_owner(&actor, &container)?;
        container.set_note(text)?;
        self.emit(format!("Updated the note of the {}", container.full_name_with_id()));
        self.store.put(container);
        Ok(())
    }

    /// Store a program on the container. `%% <source>` stores a script.
    pub(crate) fn program(&mut self, text: &str) -> Result<()> {
        let actor = self.actor()?;
        let mut container = self.container(&actor)?;
        ensure_container_owner(&actor, &container)?;
        let text = text.trim();
        let stored = match text.strip_prefix(SCRIPT_TAG) {
            Some(source) => encode_script(source),
            None => text.to_string(),
        };
        container.set_program(&stored)?;
        self.emit(format!(
            "Updated the program of the {}",
            container.full_name_with_id()
        ));
        self.store.put(container);
        Ok(())
    }

    pub(crate) fn transform(&mut self, text: &str) -> Result<()> {
        let mut actor = self.actor()?;
        let (attr, name) = split_vessel_name(text);
        actor.set_names(&attr, &name)?;
        self.emit(format!("You are now the {}", actor.full_name_with_id()));
        self.store.put(actor);
        Ok(())
    }

    pub(crate) fn set_flag(&mut self, flag: Flag, value: bool) -> Result<()> {
        let actor = self.actor()?;
        let mut container = self.container(&actor)?;
        ensure_container_owner(&actor, &container)?;
        container.set_flag(flag, value)?;
        self.emit(format!(
            "The {} flag of the {} is now {}",
            flag,
            container.full_name_with_id(),
            value
        ));
        self.store.put(container);
        Ok(())
    }

    pub(crate) fn take(&mut self, name: &str) -> Result<()> {
        let actor = self.actor()?;
        let mut target = Graph::new(self.store.as_ref())
            .find_visible(&actor, name)
            .ok_or_else(|| no_such(name))?;
        ensure_unlocked(&target)?;
        ensure_owner(&actor, &target)?;
        target.set_parent(actor.id())?;
        self.emit(format!("You took the {}", target.full_name()));
        self.store.put(target);
        Ok(())
    }

    pub(crate) fn drop_vessel(&mut self, name: &str) -> Result<()> {
        let actor = self.actor()?;
        let mut target = Graph::new(self.store.as_ref())
            .find_child(&actor, name)
            .ok_or_else(|| ParadoxError::NotFound(format!("You have no {}", name)))?;
        ensure_unlocked(&self.container(&actor)?)?;
        target.set_parent(actor.parent_id())?;
        self.emit(format!("You dropped the {}", target.full_name()));
        self.store.put(target);
        Ok(())
    }

    pub(crate) fn use_vessel(&mut self, name: &str) -> Result<()> {
        let actor = self.actor()?;
        let target = Graph::new(self.store.as_ref())
            .find_visible(&actor, name)
            .ok_or_else(|| no_such(name))?;
        if target.program().trim().is_empty() {
            return Err(ParadoxError::NotFound(format!(
                "The {} has no program",
                target.full_name()
            )));
        }
        let program = self.resolve_program(target.program(), self.scope())?;
        self.run_nested(
            format!("use {}", target.full_name_with_id()),
            program,
            None,
            "Programs",
        )
    }

    pub(crate) fn cast(&mut self, spell: &str, target: Option<&str>) -> Result<()> {
        let caster = self.actor()?;
        let (program, target) = {
            let graph = Graph::new(self.store.as_ref());
            let spell_vessel = graph
                .spells()
                .into_iter()
                .find(|s| s.full_name() == spell)
                .ok_or_else(|| ParadoxError::NotFound(format!("The {} does not exist", spell)))?;
            let target = match target {
                Some(name) => graph.find_visible(&caster, name).ok_or_else(|| {
                    ParadoxError::NotFound(format!("Target {} does not exist", name))
                })?,
                None => caster.clone(),
            };
            (spell_vessel.program().to_string(), target)
        };
        let scope = Scope {
            target: Some(target.id()),
            ..self.scope()
        };
        let resolved = self.resolve_program(&program, scope)?;
        let shown = match &resolved {
            ProgramKind::Wildcard(line) => line.clone(),
            ProgramKind::Script(_) => "script".to_string(),
        };
        self.emit(format!(
            "casting the {} ({} -> {}) onto the {}",
            spell,
            describe_program(&program),
            shown,
            target.full_name_with_id()
        ));
        self.cast_onto(&caster, &target, spell, resolved)
    }

    fn post(&mut self, text: &str) -> Result<()> {
        let actor = self.actor()?;
        let message = forum::post(self.store.as_mut(), actor.parent_id(), actor.id(), text)?;
        let rendered = message.render(self.store.as_ref(), &self.clock);
        self.emit(rendered);
        Ok(())
    }

    pub(crate) fn say(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.post(text)
    }

    pub(crate) fn emote(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.post(&format!("me {}", text.trim()))
    }

    pub(crate) fn signal(&mut self) -> Result<()> {
        let parent = self.actor()?.parent_id();
        self.post(&parent.to_string())
    }

    pub(crate) fn locate(&mut self, name: &str) -> Result<()> {
        let found = Graph::new(self.store.as_ref())
            .find_distant(name)
            .ok_or_else(|| ParadoxError::NotFound(format!("{} not found", name)))?;
        self.emit(format!("Found {}", found.full_name_with_id()));
        Ok(())
    }

    pub(crate) fn help(&mut self, topic: Option<&str>) -> Result<()> {
        let lines = help::help(topic, &self.registry);
        self.emit_all(lines);
        Ok(())
    }

    pub(crate) fn commands(&mut self) -> Result<()> {
        if self.registry.is_empty() {
            self.emit("No registered commands");
            return Ok(());
        }
        let lines: Vec<String> = self
            .registry
            .iter()
            .map(|c| match &c.help {
                Some(help) => format!(" - {}: {}", c.name, help),
                None => format!(" - {}", c.name),
            })
            .collect();
        self.emit_all(lines);
        Ok(())
    }
}
