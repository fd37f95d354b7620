//! Session configuration
//!
//! Defaults, optionally overlaid by a JSON file, then by command-line flags.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ParadoxError, Result};
use crate::wildcard::{TextLimits, DEFAULT_MAX_TEXT_SIZE};

/// Resource ceilings for the script sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLimits {
    /// Instruction budget per script run
    pub max_operations: u64,
    /// Largest string a script may build, in bytes
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_call_levels: usize,
    /// Captured `print`/`debug` lines kept per run
    pub max_output_lines: usize,
    /// Effects (`issue`, `set`, `register`) one run may queue
    pub max_effects: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_operations: 50_000,
            max_string_size: 4096,
            max_array_size: 1024,
            max_call_levels: 16,
            max_output_lines: 256,
            max_effects: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Deepest nesting of program and spell frames
    pub max_depth: usize,
    /// Steps one input line may trigger, nested programs and issued lines included
    pub max_steps: usize,
    /// Messages shown in narration
    pub forum_size: usize,
    /// Vessels listed in narration before "And N more"
    pub num_visible: usize,
    /// Raise unknown commands and wildcard failures instead of reporting them
    pub strict: bool,
    /// Skip prompts and narration
    pub headless: bool,
    pub max_template_passes: usize,
    /// Most bytes one wildcard expansion may produce
    pub max_text_size: usize,
    pub script: ScriptLimits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_steps: 1024,
            forum_size: 5,
            num_visible: 5,
            strict: false,
            headless: false,
            max_template_passes: 16,
            max_text_size: DEFAULT_MAX_TEXT_SIZE,
            script: ScriptLimits::default(),
        }
    }
}

impl SessionConfig {
    pub fn text_limits(&self) -> TextLimits {
        TextLimits {
            max_passes: self.max_template_passes,
            max_text_size: self.max_text_size,
        }
    }

    /// Load a JSON config file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading session config from {:?}", path);
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            ParadoxError::InvalidArgument(format!("invalid config {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.forum_size, 5);
        assert_eq!(config.script.max_operations, 50_000);
        assert_eq!(config.script.max_effects, 64);
        assert_eq!(config.max_steps, 1024);
        assert_eq!(config.text_limits().max_text_size, 16_384);
        assert!(!config.strict);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_depth": 3, "script": {{"max_operations": 100}}}}"#).unwrap();
        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.num_visible, 5);
        assert_eq!(config.script.max_operations, 100);
        assert_eq!(config.script.max_string_size, 4096);
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        match SessionConfig::load(file.path()) {
            Err(ParadoxError::InvalidArgument(msg)) => assert!(msg.contains("invalid config")),
            other => panic!("Expected invalid argument, got {:?}", other),
        }
    }
}
