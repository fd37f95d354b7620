//! Script sandbox for programs tagged as script code
//!
//! Programs stored as `%%<base64>` run here instead of being expanded as
//! wildcard text.

pub mod host;
pub mod registry;
pub mod sandbox;

pub use host::{apply_set, Effect, ScriptContext, SetValue, VesselHandle};
pub use registry::{RegisteredCommand, Registry};
pub use sandbox::{Sandbox, ScriptResult};
