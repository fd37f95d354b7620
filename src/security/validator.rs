//! Program classification and name screening
//!
//! Program text is either wildcard text, which resolves to a command line,
//! or a tagged script: `%%` followed by the base64 of its source.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{ParadoxError, Result};

/// Leading marker of a raw host-execution line. Never honoured from programs.
pub const RAW_EXEC_MARKER: char = '!';

/// Prefix tagging a program as script code.
pub const SCRIPT_TAG: &str = "%%";

/// Names scripts may never read, write or register, whatever the allow-list says.
pub const DENIED_NAMES: [&str; 16] = [
    "eval",
    "exec",
    "import",
    "system",
    "shell",
    "spawn",
    "open",
    "env",
    "globals",
    "locals",
    "vars",
    "dir",
    "getattr",
    "setattr",
    "builtins",
    "process",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramKind {
    /// Wildcard text resolving to a command line
    Wildcard(String),
    /// Decoded script source
    Script(String),
}

/// Wrap script source in its stored form.
pub fn encode_script(source: &str) -> String {
    format!("{}{}", SCRIPT_TAG, STANDARD.encode(source.trim().as_bytes()))
}

pub fn classify_program(program: &str) -> Result<ProgramKind> {
    let Some(encoded) = program.trim().strip_prefix(SCRIPT_TAG) else {
        return Ok(ProgramKind::Wildcard(program.to_string()));
    };
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ParadoxError::InvalidArgument(format!("corrupt script program: {}", e)))?;
    let source = String::from_utf8(bytes)
        .map_err(|e| ParadoxError::InvalidArgument(format!("corrupt script program: {}", e)))?;
    Ok(ProgramKind::Script(source))
}

/// Human-readable form of a stored program.
pub fn describe_program(program: &str) -> String {
    match classify_program(program) {
        Ok(ProgramKind::Script(source)) => format!("{} {}", SCRIPT_TAG, source),
        _ => program.to_string(),
    }
}

/// Reject resolved program text that asks for raw host execution.
pub fn ensure_not_raw(resolved: &str, what: &str) -> Result<()> {
    if resolved.trim_start().starts_with(RAW_EXEC_MARKER) {
        return Err(ParadoxError::PermissionDenied(format!(
            "{} cannot invoke raw execution",
            what
        )));
    }
    Ok(())
}

/// Private (`_`-prefixed) and deny-listed names are off limits to scripts.
pub fn ensure_allowed_name(name: &str) -> Result<()> {
    let lowered = name.to_lowercase();
    if lowered.starts_with('_') || DENIED_NAMES.contains(&lowered.as_str()) {
        return Err(ParadoxError::PermissionDenied(format!(
            "access to '{}' is not allowed",
            name
        )));
    }
    Ok(())
}
