//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

use crate::config::SessionConfig;
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "paradox")]
#[command(author, version, about = "A world of nested vessels, explored one command at a time", long_about = None)]
pub struct Args {
    /// SQLite world file; an in-memory world is used when omitted
    #[arg(long, env = "PARADOX_DB")]
    pub db: Option<PathBuf>,

    /// Start as a ghost in this vessel
    #[arg(long, value_name = "ID")]
    pub location: Option<i64>,

    /// Start embodied as this vessel
    #[arg(long, value_name = "ID")]
    pub vessel: Option<i64>,

    /// Run this command line and exit (repeatable, run in order)
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    pub commands: Vec<String>,

    /// Run the command lines of a file and exit
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Raise unknown commands and wildcard errors instead of reporting them
    #[arg(long)]
    pub strict: bool,

    /// Skip prompts and narration
    #[arg(long)]
    pub headless: bool,

    /// Print inspect and look reports as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbose logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// JSON file with session settings
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Deepest program nesting allowed
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,
}

impl Args {
    /// Defaults, then the config file, then flags.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };
        if self.strict {
            config.strict = true;
        }
        if self.headless {
            config.headless = true;
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = depth;
        }
        Ok(config)
    }

    /// Whether the run is a batch rather than an interactive session.
    pub fn is_batch(&self) -> bool {
        !self.commands.is_empty() || self.file.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_flags() {
        let args = Args::parse_from(["paradox", "-c", "look", "--command", "print hi", "--strict"]);
        assert_eq!(args.commands, vec!["look", "print hi"]);
        assert!(args.is_batch());
        let config = args.session_config().unwrap();
        assert!(config.strict);
        assert!(!config.headless);
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paradox.json");
        std::fs::write(&path, r#"{"max_depth": 3, "headless": true}"#).unwrap();
        let args = Args::parse_from([
            "paradox",
            "--config",
            path.to_str().unwrap(),
            "--max-depth",
            "5",
        ]);
        let config = args.session_config().unwrap();
        assert_eq!(config.max_depth, 5);
        assert!(config.headless);
        assert!(!args.is_batch());
    }
}
