//! Paradox CLI - explore and build a world of nested vessels

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use paradox::cli::Args;
use paradox::store::Store;
use paradox::{read_script, run_lines, MemoryStore, OutputFormat, Session};

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "paradox=debug" } else { "paradox=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "sqlite")]
fn open_store(args: &Args) -> anyhow::Result<Box<dyn Store>> {
    match &args.db {
        Some(path) => {
            let store = paradox::SqliteStore::open(path)
                .with_context(|| format!("opening world {}", path.display()))?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(MemoryStore::new())),
    }
}

#[cfg(not(feature = "sqlite"))]
fn open_store(args: &Args) -> anyhow::Result<Box<dyn Store>> {
    if args.db.is_some() {
        anyhow::bail!("SQLite support not enabled. Rebuild with --features sqlite");
    }
    Ok(Box::new(MemoryStore::new()))
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = args.session_config()?;
    let store = open_store(&args)?;

    let mut session = Session::new(store, config)?;
    if let Some(location) = args.location {
        session = session.at(location)?;
    }
    if let Some(vessel) = args.vessel {
        session = session.embodied(vessel)?;
    }
    if args.json {
        session = session.with_format(OutputFormat::Json);
    }

    if !args.is_batch() {
        return Ok(paradox::repl::run_repl(session)?);
    }

    let mut lines = Vec::new();
    if let Some(path) = &args.file {
        lines.extend(read_script(path).with_context(|| format!("reading {}", path.display()))?);
    }
    lines.extend(args.commands.iter().cloned());

    // Output is printed per line; a strict failure ends the batch.
    for line in &lines {
        for out in run_lines(&mut session, [line])? {
            println!("{}", out);
        }
        if session.is_finished() {
            break;
        }
    }
    Ok(())
}
