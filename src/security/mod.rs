//! Capability checks shared by native commands and the script sandbox

pub mod permissions;
pub mod validator;

pub use permissions::{ensure_container_owner, ensure_owner, ensure_unlocked};
pub use validator::{classify_program, encode_script, ensure_allowed_name, ensure_not_raw, ProgramKind};
