//! Command lines parsed into verbs

use crate::error::{ParadoxError, Result};
use crate::security::validator::RAW_EXEC_MARKER;
use crate::world::names::clean_vessel_name;
use crate::world::Flag;

/// Verbs handled natively. Scripts may not register these names.
pub const BUILTIN_VERBS: [&str; 26] = [
    "look", "forum", "inspect", "create", "become", "enter", "leave", "fold", "warp", "note",
    "program", "transform", "set", "take", "drop", "use", "cast", "say", "emote", "signal",
    "print", "locate", "help", "commands", "exit", "eof",
];

/// Verbs whose argument text is stored verbatim, never pre-expanded.
pub const VERBATIM_VERBS: [&str; 2] = ["note", "program"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_VERBS.contains(&name.to_lowercase().as_str())
}

/// The verb of a line, lowercased.
pub fn verb(line: &str) -> String {
    line.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Look,
    Forum,
    Inspect(Option<String>),
    Create(String),
    Become(String),
    Enter(String),
    Leave,
    Fold,
    Warp(String),
    Note(String),
    Program(String),
    Transform(String),
    Set { flag: Flag, value: bool },
    Take(String),
    Drop(String),
    Use(String),
    Cast { spell: String, target: Option<String> },
    Say(String),
    Emote(String),
    Signal,
    Print(String),
    Locate(String),
    Help(Option<String>),
    Commands,
    Exit,
    /// Anything else; resolved against registered commands at dispatch
    User { name: String, args: String },
}

impl Command {
    /// Commands that need an embodied vessel.
    pub fn needs_vessel(&self) -> bool {
        !matches!(
            self,
            Command::Look
                | Command::Inspect(_)
                | Command::Create(_)
                | Command::Become(_)
                | Command::Locate(_)
                | Command::Print(_)
                | Command::Help(_)
                | Command::Commands
                | Command::Exit
                | Command::User { .. }
        )
    }
}

fn no_arguments(name: &str, args: &str, command: Command) -> Result<Command> {
    if !args.is_empty() {
        return Err(ParadoxError::InvalidArgument(format!(
            "{} takes no arguments",
            name
        )));
    }
    Ok(command)
}

fn parse_set(args: &str) -> Result<Command> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [attr, value] = parts.as_slice() else {
        return Err(ParadoxError::InvalidArgument(
            "Usage: set is_<locked|hidden|silent|tunnel> <true|false>".to_string(),
        ));
    };
    if !attr.to_lowercase().starts_with("is_") {
        return Err(ParadoxError::InvalidArgument(format!(
            "Invalid attribute: {}",
            attr
        )));
    }
    let flag: Flag = attr.parse()?;
    let value = match value.to_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => {
            return Err(ParadoxError::InvalidArgument(format!(
                "Invalid value: {}",
                value
            )))
        }
    };
    Ok(Command::Set { flag, value })
}

fn parse_cast(args: &str) -> Command {
    for separator in [" onto ", " on "] {
        if let Some((spell, target)) = args.split_once(separator) {
            return Command::Cast {
                spell: clean_vessel_name(spell),
                target: Some(clean_vessel_name(target)),
            };
        }
    }
    Command::Cast {
        spell: clean_vessel_name(args),
        target: None,
    }
}

/// Parse one resolved command line.
pub fn parse(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.starts_with(RAW_EXEC_MARKER) {
        return Err(ParadoxError::PermissionDenied(
            "Raw execution is not available".to_string(),
        ));
    }
    let (head, args) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let name = head.to_lowercase();
    let arg = || args.to_string();
    let command = match name.as_str() {
        "look" => no_arguments("Look", args, Command::Look)?,
        "forum" => no_arguments("Forum", args, Command::Forum)?,
        "inspect" => Command::Inspect((!args.is_empty()).then(arg)),
        "create" => Command::Create(arg()),
        "become" => Command::Become(arg()),
        "enter" => Command::Enter(arg()),
        "leave" => no_arguments("Leave", args, Command::Leave)?,
        "fold" => no_arguments("Fold", args, Command::Fold)?,
        "warp" => Command::Warp(clean_vessel_name(args)),
        "note" => Command::Note(arg()),
        "program" => Command::Program(arg()),
        "transform" => Command::Transform(arg()),
        "set" => parse_set(args)?,
        "take" => Command::Take(arg()),
        "drop" => Command::Drop(arg()),
        "use" => Command::Use(arg()),
        "cast" => parse_cast(args),
        "say" => Command::Say(arg()),
        "emote" => Command::Emote(arg()),
        "signal" => no_arguments("Signal", args, Command::Signal)?,
        "print" => Command::Print(arg()),
        "locate" => Command::Locate(arg()),
        "help" => {
            let topic = args.strip_prefix("with ").unwrap_or(args).trim();
            Command::Help((!topic.is_empty()).then(|| topic.to_lowercase()))
        }
        "commands" => no_arguments("Commands", args, Command::Commands)?,
        "exit" | "eof" => Command::Exit,
        _ => Command::User {
            name: name.clone(),
            args: arg(),
        },
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_verbs() {
        assert_eq!(parse("look").unwrap(), Command::Look);
        assert_eq!(parse("  LEAVE ").unwrap(), Command::Leave);
        assert_eq!(parse("EOF").unwrap(), Command::Exit);
        assert_eq!(
            parse("create a benchmark tool").unwrap(),
            Command::Create("a benchmark tool".to_string())
        );
        assert_eq!(parse("inspect").unwrap(), Command::Inspect(None));
    }

    #[test]
    fn test_no_argument_verbs() {
        match parse("look around") {
            Err(ParadoxError::InvalidArgument(msg)) => assert_eq!(msg, "Look takes no arguments"),
            other => panic!("Expected invalid argument, got {:?}", other),
        }
        assert!(parse("signal now").is_err());
    }

    #[test]
    fn test_set() {
        assert_eq!(
            parse("set is_locked TRUE").unwrap(),
            Command::Set {
                flag: Flag::Locked,
                value: true
            }
        );
        match parse("set is_locked maybe") {
            Err(ParadoxError::InvalidArgument(msg)) => assert_eq!(msg, "Invalid value: maybe"),
            other => panic!("Expected invalid argument, got {:?}", other),
        }
        match parse("set name bob") {
            Err(ParadoxError::InvalidArgument(msg)) => assert_eq!(msg, "Invalid attribute: name"),
            other => panic!("Expected invalid argument, got {:?}", other),
        }
        assert!(parse("set is_locked").is_err());
    }

    #[test]
    fn test_cast() {
        assert_eq!(
            parse("cast the vanish spell onto the benchmark note").unwrap(),
            Command::Cast {
                spell: "vanish spell".to_string(),
                target: Some("benchmark note".to_string())
            }
        );
        assert_eq!(
            parse("cast petunia spell on a cat").unwrap(),
            Command::Cast {
                spell: "petunia spell".to_string(),
                target: Some("cat".to_string())
            }
        );
        assert_eq!(
            parse("cast the vanish spell").unwrap(),
            Command::Cast {
                spell: "vanish spell".to_string(),
                target: None
            }
        );
    }

    #[test]
    fn test_help_topics() {
        assert_eq!(
            parse("help with Wildcards").unwrap(),
            Command::Help(Some("wildcards".to_string()))
        );
        assert_eq!(parse("help").unwrap(), Command::Help(None));
    }

    #[test]
    fn test_raw_and_user_verbs() {
        match parse("!ls") {
            Err(ParadoxError::PermissionDenied(_)) => {}
            other => panic!("Expected permission denied, got {:?}", other),
        }
        assert_eq!(
            parse("dance wildly").unwrap(),
            Command::User {
                name: "dance".to_string(),
                args: "wildly".to_string()
            }
        );
    }

    #[test]
    fn test_builtin_names() {
        assert!(is_builtin("look"));
        assert!(is_builtin("EOF"));
        assert!(!is_builtin("dance"));
        assert_eq!(verb("  Note hello"), "note");
        assert!(!Command::Look.needs_vessel());
        assert!(Command::Leave.needs_vessel());
    }
}
