//! Session engine: identity, dispatch, nested programs and narration

pub mod command;
pub mod context;
pub mod engine;
mod handlers;
pub mod help;
pub mod narration;
pub mod runner;

pub use command::{parse, Command};
pub use context::{Frame, SessionContext};
pub use engine::Session;
pub use runner::{read_script, run_file, run_lines};
