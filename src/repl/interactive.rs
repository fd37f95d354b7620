//! Interactive REPL implementation

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::error::{ParadoxError, Result};
use crate::session::Session;

pub fn run_repl(mut session: Session) -> Result<()> {
    let mut rl = DefaultEditor::new().map_err(|e| ParadoxError::Io(std::io::Error::other(e)))?;

    println!("Paradox v{}", env!("CARGO_PKG_VERSION"));
    session.look_around()?;
    print_lines(&mut session);

    loop {
        let readline = rl.readline(&session.prompt());
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                let outcome = session.execute(line);
                print_lines(&mut session);
                match outcome {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                debug!("end of input");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

fn print_lines(session: &mut Session) {
    for line in session.take_output() {
        println!("{}", line);
    }
}
