//! Error types for Paradox

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParadoxError {
    #[error("Invalid vessel: {0}")]
    Validation(String),

    #[error("{0} is undefined")]
    Undefined(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Template error: {0}")]
    Eval(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("The {0} is locked and may not be modified")]
    Locked(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Maximum program depth ({0}) exceeded, aborting")]
    RecursionLimit(usize),

    #[error("Maximum steps per command ({0}) exceeded, aborting")]
    StepLimit(usize),

    #[error("Script exceeded its instruction budget of {0} operations")]
    ScriptTimeout(u64),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParadoxError {
    /// Resource exhaustion unwinds the whole nested program chain.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParadoxError::RecursionLimit(_)
                | ParadoxError::StepLimit(_)
                | ParadoxError::ScriptTimeout(_)
        )
    }

    /// Failures that strict sessions raise instead of reporting.
    pub fn is_strict(&self) -> bool {
        matches!(
            self,
            ParadoxError::UnknownCommand(_)
                | ParadoxError::Undefined(_)
                | ParadoxError::Parse(_)
                | ParadoxError::Eval(_)
        )
    }

    /// Failures raised while expanding wildcards.
    pub fn is_template(&self) -> bool {
        matches!(
            self,
            ParadoxError::Undefined(_) | ParadoxError::Parse(_) | ParadoxError::Eval(_)
        )
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for ParadoxError {
    fn from(e: rusqlite::Error) -> Self {
        ParadoxError::Store(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ParadoxError>;
