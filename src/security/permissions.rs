//! Ownership and lock checks

use crate::error::{ParadoxError, Result};
use crate::world::Vessel;

/// The actor may write `target` if it owns it or is it.
pub fn ensure_owner(actor: &Vessel, target: &Vessel) -> Result<()> {
    if target.owner_id() == actor.id() || target.id() == actor.id() {
        return Ok(());
    }
    Err(ParadoxError::PermissionDenied(format!(
        "You do not own the {}",
        target.full_name_with_id()
    )))
}

/// Authoring a container's note or program needs strict ownership.
pub fn ensure_container_owner(actor: &Vessel, container: &Vessel) -> Result<()> {
    if container.owner_id() == actor.id() {
        return Ok(());
    }
    Err(ParadoxError::PermissionDenied(format!(
        "You do not own the {}",
        container.full_name_with_id()
    )))
}

pub fn ensure_unlocked(target: &Vessel) -> Result<()> {
    if target.is_locked() {
        return Err(ParadoxError::Locked(target.full_name_with_id()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Flag;

    #[test]
    fn test_owner_or_self() {
        let actor = Vessel::create(2, "red cat", Some(1), None).unwrap();
        let owned = Vessel::create(3, "ball", Some(1), Some(2)).unwrap();
        let other = Vessel::create(4, "door", Some(1), Some(1)).unwrap();
        assert!(ensure_owner(&actor, &owned).is_ok());
        assert!(ensure_owner(&actor, &actor).is_ok());
        match ensure_owner(&actor, &other) {
            Err(ParadoxError::PermissionDenied(msg)) => {
                assert_eq!(msg, "You do not own the door (ID: 4)")
            }
            other => panic!("Expected permission denied, got {:?}", other),
        }
    }

    #[test]
    fn test_container_owner_is_strict() {
        let actor = Vessel::create(2, "red cat", Some(2), Some(1)).unwrap();
        assert!(ensure_container_owner(&actor, &actor).is_err());
        let room = Vessel::create(5, "room", Some(1), Some(2)).unwrap();
        assert!(ensure_container_owner(&actor, &room).is_ok());
    }

    #[test]
    fn test_unlocked() {
        let mut door = Vessel::create(4, "door", Some(1), None).unwrap();
        assert!(ensure_unlocked(&door).is_ok());
        door.set_flag(Flag::Locked, true).unwrap();
        match ensure_unlocked(&door) {
            Err(ParadoxError::Locked(name)) => assert_eq!(name, "door (ID: 4)"),
            other => panic!("Expected locked, got {:?}", other),
        }
    }
}
