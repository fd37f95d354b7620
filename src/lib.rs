//! Paradox - a multi-user world of nested vessels
//!
//! Vessels contain, own and describe one another. A session acts as one of
//! them (or as a ghost), typing commands whose text may embed sandboxed
//! wildcard expressions; vessels may carry programs, either wildcard text
//! or scripts run in a budgeted sandbox.
//!
//! # Example
//!
//! ```no_run
//! use paradox::{MemoryStore, Session, SessionConfig};
//!
//! let mut session = Session::new(Box::new(MemoryStore::new()), SessionConfig::default()).unwrap();
//! session.execute("create a red cat").unwrap();
//! session.execute("become cat").unwrap();
//! for line in session.take_output() {
//!     println!("{}", line);
//! }
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod output;
pub mod repl;
pub mod script;
pub mod security;
pub mod session;
pub mod store;
pub mod wildcard;
pub mod world;

pub use clock::Clock;
pub use config::{ScriptLimits, SessionConfig};
pub use error::{ParadoxError, Result};
pub use output::{format_output, OutputFormat};
pub use session::{read_script, run_file, run_lines, Session};
pub use store::{MemoryStore, Store};
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
pub use world::{Graph, Vessel, VesselId};
