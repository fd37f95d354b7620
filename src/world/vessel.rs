//! The vessel model
//!
//! Fields are crate-private: every write from outside the crate goes through
//! a setter that enforces the lock rule and the naming bounds.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ParadoxError, Result};
use crate::world::names::split_vessel_name;

pub type VesselId = i64;

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 15;
pub const MAX_FULL_NAME_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    pub(crate) id: VesselId,
    pub(crate) name: String,
    pub(crate) attr: String,
    pub(crate) parent_id: VesselId,
    pub(crate) owner_id: VesselId,
    pub(crate) raw_note: String,
    pub(crate) program: String,
    pub(crate) locked: bool,
    pub(crate) hidden: bool,
    pub(crate) silent: bool,
    pub(crate) tunnel: bool,
    pub(crate) created: DateTime<Utc>,
}

/// The four boolean flags a vessel carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    Locked,
    Hidden,
    Silent,
    Tunnel,
}

impl Flag {
    pub const ALL: [Flag; 4] = [Flag::Hidden, Flag::Locked, Flag::Silent, Flag::Tunnel];
}

impl FromStr for Flag {
    type Err = ParadoxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().trim_start_matches("is_") {
            "locked" => Ok(Flag::Locked),
            "hidden" => Ok(Flag::Hidden),
            "silent" => Ok(Flag::Silent),
            "tunnel" => Ok(Flag::Tunnel),
            _ => Err(ParadoxError::InvalidArgument(format!("Invalid attribute: {}", s))),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Locked => write!(f, "Locked"),
            Flag::Hidden => write!(f, "Hidden"),
            Flag::Silent => write!(f, "Silent"),
            Flag::Tunnel => write!(f, "Tunnel"),
        }
    }
}

fn check_word(kind: &str, value: &str) -> Result<()> {
    let len = value.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(ParadoxError::Validation(format!(
            "Vessel {} has to be between {} and {} characters",
            kind, MIN_NAME_LEN, MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Validate a (attr, name) pair against the naming bounds.
pub fn validate_names(attr: &str, name: &str) -> Result<()> {
    check_word("name", name)?;
    if !attr.is_empty() {
        check_word("attribute", attr)?;
    }
    let full = format!("{} {}", attr, name);
    if full.trim().chars().count() > MAX_FULL_NAME_LEN {
        return Err(ParadoxError::Validation(format!(
            "The vessel attribute and name has to be at most {} characters combined",
            MAX_FULL_NAME_LEN
        )));
    }
    Ok(())
}

impl Vessel {
    /// Build a vessel from free text such as "a benchmark tool".
    ///
    /// `parent` defaults to the vessel itself and `owner` to the parent.
    pub fn create(
        id: VesselId,
        text: &str,
        parent: Option<VesselId>,
        owner: Option<VesselId>,
    ) -> Result<Self> {
        let (attr, name) = split_vessel_name(text);
        Self::with_names(id, &attr, &name, parent, owner)
    }

    pub fn with_names(
        id: VesselId,
        attr: &str,
        name: &str,
        parent: Option<VesselId>,
        owner: Option<VesselId>,
    ) -> Result<Self> {
        validate_names(attr, name)?;
        let parent_id = parent.unwrap_or(id);
        Ok(Self {
            id,
            name: name.to_string(),
            attr: attr.to_string(),
            parent_id,
            owner_id: owner.unwrap_or(parent_id),
            raw_note: String::new(),
            program: String::new(),
            locked: false,
            hidden: false,
            silent: false,
            tunnel: false,
            created: Utc::now(),
        })
    }

    pub fn id(&self) -> VesselId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn parent_id(&self) -> VesselId {
        self.parent_id
    }

    pub fn owner_id(&self) -> VesselId {
        self.owner_id
    }

    pub fn raw_note(&self) -> &str {
        &self.raw_note
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::Locked => self.locked,
            Flag::Hidden => self.hidden,
            Flag::Silent => self.silent,
            Flag::Tunnel => self.tunnel,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn is_tunnel(&self) -> bool {
        self.tunnel
    }

    /// A paradox contains itself.
    pub fn is_paradox(&self) -> bool {
        self.parent_id == self.id
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.attr, self.name).trim().to_string()
    }

    pub fn full_name_with_id(&self) -> String {
        format!("{} (ID: {})", self.full_name(), self.id)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.locked {
            return Err(ParadoxError::Locked(self.full_name_with_id()));
        }
        Ok(())
    }

    /// Rename the vessel; both parts are validated before anything changes.
    pub fn set_names(&mut self, attr: &str, name: &str) -> Result<()> {
        self.ensure_writable()?;
        validate_names(attr, name)?;
        self.attr = attr.to_string();
        self.name = name.to_string();
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let attr = self.attr.clone();
        self.set_names(&attr, name)
    }

    pub fn set_attr(&mut self, attr: &str) -> Result<()> {
        let name = self.name.clone();
        self.set_names(attr, &name)
    }

    pub fn set_note(&mut self, note: &str) -> Result<()> {
        self.ensure_writable()?;
        self.raw_note = note.to_string();
        Ok(())
    }

    pub fn set_program(&mut self, program: &str) -> Result<()> {
        self.ensure_writable()?;
        self.program = program.to_string();
        Ok(())
    }

    pub fn set_parent(&mut self, parent: VesselId) -> Result<()> {
        self.ensure_writable()?;
        self.parent_id = parent;
        Ok(())
    }

    pub fn set_owner(&mut self, owner: VesselId) -> Result<()> {
        self.ensure_writable()?;
        self.owner_id = owner;
        Ok(())
    }

    /// Folding makes the vessel its own container.
    pub fn fold(&mut self) -> Result<()> {
        let id = self.id;
        self.set_parent(id)
    }

    /// Put back ownership and lock state saved before a cast lifted them.
    pub(crate) fn restore_access(&mut self, owner: VesselId, locked: bool) {
        self.owner_id = owner;
        self.locked = locked;
    }

    /// Clearing `locked` is the only write a locked vessel accepts.
    pub fn set_flag(&mut self, flag: Flag, value: bool) -> Result<()> {
        if flag != Flag::Locked {
            self.ensure_writable()?;
        }
        match flag {
            Flag::Locked => self.locked = value,
            Flag::Hidden => self.hidden = value,
            Flag::Silent => self.silent = value,
            Flag::Tunnel => self.tunnel = value,
        }
        Ok(())
    }
}

impl fmt::Display for Vessel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Vessel '{}' (ID: {})>", self.full_name(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_splits_text() {
        let v = Vessel::create(7, "a benchmark tool", Some(3), None).unwrap();
        assert_eq!(v.name(), "tool");
        assert_eq!(v.attr(), "benchmark");
        assert_eq!(v.parent_id(), 3);
        assert_eq!(v.owner_id(), 3);
        assert_eq!(v.full_name_with_id(), "benchmark tool (ID: 7)");
    }

    #[test]
    fn test_defaults_to_paradox() {
        let v = Vessel::create(4, "library", None, None).unwrap();
        assert!(v.is_paradox());
        assert_eq!(v.owner_id(), 4);
    }

    #[test]
    fn test_name_bounds() {
        assert!(Vessel::create(1, "ab", None, None).is_err());
        assert!(Vessel::create(1, "abcdefghijklmnop", None, None).is_err());
        assert!(Vessel::create(1, "abc", None, None).is_ok());
        assert!(Vessel::create(1, "xy abc", None, None).is_err());
    }

    #[test]
    fn test_full_name_bound() {
        assert!(validate_names("abcdefghijklmno", "abcdefghijklmn").is_ok());
        assert!(validate_names("abcdefghijklmno", "abcdefghijklmno").is_err());
    }

    #[test]
    fn test_locked_blocks_writes() {
        let mut v = Vessel::create(2, "red door", None, None).unwrap();
        v.set_flag(Flag::Locked, true).unwrap();
        assert!(v.set_note("hello").is_err());
        assert!(v.set_flag(Flag::Hidden, true).is_err());
        assert!(v.set_parent(9).is_err());
        assert_eq!(v.raw_note(), "");
        assert!(!v.is_hidden());

        v.set_flag(Flag::Locked, false).unwrap();
        v.set_note("hello").unwrap();
        assert_eq!(v.raw_note(), "hello");
    }

    #[test]
    fn test_fold_makes_paradox() {
        let mut v = Vessel::create(5, "small box", Some(1), None).unwrap();
        assert!(!v.is_paradox());
        v.fold().unwrap();
        assert!(v.is_paradox());
    }

    #[test]
    fn test_rename_is_atomic() {
        let mut v = Vessel::create(5, "small box", Some(1), None).unwrap();
        assert!(v.set_names("tiny", "xy").is_err());
        assert_eq!(v.full_name(), "small box");
    }

    #[test]
    fn test_flag_parse() {
        assert_eq!("is_locked".parse::<Flag>().unwrap(), Flag::Locked);
        assert_eq!("tunnel".parse::<Flag>().unwrap(), Flag::Tunnel);
        assert!("is_open".parse::<Flag>().is_err());
    }
}
