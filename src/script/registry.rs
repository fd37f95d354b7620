//! Commands registered by scripts at runtime
//!
//! Kept apart from the built-in verbs: a registered name can never shadow a
//! built-in, and dispatch consults the registry only after the built-ins.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::error::{ParadoxError, Result};
use crate::security::ensure_allowed_name;
use crate::session::command::is_builtin;
use crate::world::VesselId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredCommand {
    pub name: String,
    /// Script source the handler function lives in
    pub source: String,
    pub function: String,
    pub help: Option<String>,
    pub author: Option<VesselId>,
}

#[derive(Debug, Default, Clone)]
pub struct Registry {
    commands: BTreeMap<String, RegisteredCommand>,
}

fn valid_verb(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user command.
    pub fn register(&mut self, command: RegisteredCommand) -> Result<()> {
        ensure_allowed_name(&command.name)?;
        if is_builtin(&command.name) {
            return Err(ParadoxError::PermissionDenied(format!(
                "'{}' is a built-in command",
                command.name
            )));
        }
        if !valid_verb(&command.name) {
            return Err(ParadoxError::InvalidArgument(format!(
                "'{}' is not a valid command name",
                command.name
            )));
        }
        info!(name = %command.name, function = %command.function, "registering command");
        self.commands.insert(command.name.clone(), command);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredCommand> {
        self.commands.get(name)
    }

    pub fn help(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|c| c.help.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredCommand> {
        self.commands.values()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}
