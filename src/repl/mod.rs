//! REPL module for interactive mode

#[cfg(feature = "repl")]
pub mod interactive;

#[cfg(feature = "repl")]
pub use interactive::run_repl;

#[cfg(not(feature = "repl"))]
pub use plain::run_repl;

/// Line loop over stdin for builds without the line editor.
#[cfg(not(feature = "repl"))]
mod plain {
    use std::io::{self, BufRead, Write};

    use crate::error::Result;
    use crate::session::Session;

    pub fn run_repl(mut session: Session) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        session.look_around()?;
        for line in session.take_output() {
            writeln!(stdout, "{}", line)?;
        }
        loop {
            write!(stdout, "{}", session.prompt())?;
            stdout.flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            let outcome = session.execute(&line);
            for out in session.take_output() {
                writeln!(stdout, "{}", out)?;
            }
            match outcome {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => eprintln!("Error: {}", e),
            }
        }
        Ok(())
    }
}
