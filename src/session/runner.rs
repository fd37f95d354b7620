//! Batch execution of command lines

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::session::engine::Session;

/// Run `lines` in order, echoing each behind the prompt unless the session
/// is headless. Stops early once a line ends the session.
pub fn run_lines<I, S>(session: &mut Session, lines: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut transcript = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if !session.config().headless {
            transcript.push(format!("{}{}", session.prompt(), line));
        }
        let outcome = session.execute(line);
        transcript.extend(session.take_output());
        if outcome? {
            debug!("session finished");
            break;
        }
    }
    Ok(transcript)
}

/// The command lines of a file. Blank lines and `#` comments are skipped.
pub fn read_script(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

pub fn run_file(session: &mut Session, path: &Path) -> Result<Vec<String>> {
    run_lines(session, read_script(path)?)
}
