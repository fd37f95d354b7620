//! End-to-end command flows against an in-process world

use paradox::store::Store;
use paradox::world::forum;
use paradox::{MemoryStore, ScriptLimits, Session, SessionConfig};

fn config() -> SessionConfig {
    SessionConfig {
        headless: true,
        script: ScriptLimits {
            max_operations: 5_000,
            ..ScriptLimits::default()
        },
        ..SessionConfig::default()
    }
}

fn session_on(store: MemoryStore, config: SessionConfig) -> Session {
    Session::new(Box::new(store), config).unwrap().at(1).unwrap()
}

fn session() -> Session {
    session_on(MemoryStore::new(), config())
}

fn run(s: &mut Session, line: &str) -> Vec<String> {
    s.execute(line).unwrap();
    s.take_output()
}

fn run_all(s: &mut Session, lines: &[&str]) {
    for line in lines {
        run(s, line);
    }
}

/// A red cat (2) standing in the library.
fn cat() -> Session {
    let mut s = session();
    run_all(&mut s, &["create red cat", "become red cat"]);
    s
}

#[test]
fn test_create_benchmark_tool() {
    let mut s = cat();
    assert_eq!(run(&mut s, "create a benchmark tool"), vec!["Created a benchmark tool (ID: 3)"]);
    let tool = s.store().get(3).unwrap();
    assert_eq!(tool.name(), "tool");
    assert_eq!(tool.attr(), "benchmark");
    assert_eq!(tool.parent_id(), 1);
    assert_eq!(tool.owner_id(), 2);
}

#[test]
fn test_note_with_wildcard_narrated() {
    let config = SessionConfig {
        headless: false,
        ..config()
    };
    let mut s = session_on(MemoryStore::new(), config);
    run_all(&mut s, &["create red cat", "become red cat", "create wooden box", "enter box"]);
    run(&mut s, "note A box holding the <(vessel.name)>.");
    assert_eq!(s.store().get(3).unwrap().raw_note(), "A box holding the <(vessel.name)>.");

    run(&mut s, "leave");
    let out = run(&mut s, "enter box");
    assert_eq!(out[0], "Entering the wooden box (ID: 3)");
    assert!(out.contains(&"You are the red cat (ID: 2) in your wooden box (ID: 3)".to_string()));
    assert!(out.contains(&"A box holding the cat.".to_string()));
}

#[test]
fn test_wildcards_in_command_lines() {
    let mut s = cat();
    assert_eq!(run(&mut s, "print I am <(vessel.full_name)> in <(vessel.parent.name)>"), vec!["I am red cat in library"]);
    assert_eq!(run(&mut s, "print <( 2 ** 10 )>"), vec!["1024"]);
    let out = run(&mut s, "print <( 2 ** 2000 )>");
    assert!(out[0].starts_with("Template Error:"), "{:?}", out);
    let out = run(&mut s, "print <(__import__)>");
    assert!(out[0].starts_with("Template Error:"), "{:?}", out);
}

#[test]
fn test_recursion_limit_keeps_prior_writes() {
    let mut s = cat();
    run_all(&mut s, &["create echo box", "enter box"]);
    run(&mut s, r#"program %% issue("say tick"); issue("use box");"#);
    run(&mut s, "leave");

    let out = run(&mut s, "use box");
    assert_eq!(out.last().unwrap(), "Maximum program depth (8) exceeded, aborting");
    assert_eq!(forum::forum(s.store(), 1).len(), 8);
    assert_eq!(s.prompt(), "2@1> ");
    assert!(!s.context().in_program());

    // the session carries on normally afterwards
    assert_eq!(run(&mut s, "print still here"), vec!["still here"]);
}

#[test]
fn test_step_budget_stops_fan_out() {
    let config = SessionConfig {
        max_steps: 5,
        ..config()
    };
    let mut s = session_on(MemoryStore::new(), config);
    run_all(&mut s, &["create red cat", "become red cat", "create echo box", "enter box"]);
    run(&mut s, r#"program %% for i in 0..6 { issue("say tick"); }"#);
    run(&mut s, "leave");

    let out = run(&mut s, "use box");
    assert_eq!(out.last().unwrap(), "Maximum steps per command (5) exceeded, aborting");
    assert_eq!(forum::forum(s.store(), 1).len(), 4);
    assert!(!s.context().in_program());
    assert_eq!(run(&mut s, "print still here"), vec!["still here"]);
}

#[test]
fn test_script_effect_quota() {
    let mut config = config();
    config.script.max_effects = 3;
    let mut s = session_on(MemoryStore::new(), config);
    run_all(&mut s, &["create red cat", "become red cat", "create echo box", "enter box"]);
    run(&mut s, r#"program %% for i in 0..4 { issue("say tick"); }"#);
    run(&mut s, "leave");

    let out = run(&mut s, "use box");
    assert!(out[0].contains("at most 3 effects"), "{:?}", out);
    assert!(forum::forum(s.store(), 1).is_empty());
}

#[test]
fn test_wildcard_program_recursion() {
    let config = SessionConfig {
        max_depth: 3,
        ..config()
    };
    let mut s = session_on(MemoryStore::new(), config);
    run_all(&mut s, &["create red cat", "become red cat", "create mirror", "enter mirror"]);
    run(&mut s, "program use mirror");
    run(&mut s, "leave");
    let out = run(&mut s, "use mirror");
    assert_eq!(
        out,
        vec![
            "(program:1)2@1> use mirror",
            "(program:2)2@1> use mirror",
            "(program:3)2@1> use mirror",
            "Maximum program depth (3) exceeded, aborting",
        ]
    );
}

/// The cat crafts a locked "vanish spell" whose program is `program`.
fn with_spell(program: &str) -> Session {
    let mut s = cat();
    run_all(&mut s, &["create vanish spell", "enter spell"]);
    run(&mut s, &format!("program {}", program));
    run_all(&mut s, &["set is_locked true", "leave"]);
    s
}

#[test]
fn test_cast_on_self() {
    let mut s = with_spell("print <(vessel.name)> meets <(target.name)>");
    let out = run(&mut s, "cast the vanish spell");
    assert_eq!(
        out,
        vec![
            "casting the vanish spell (print <(vessel.name)> meets <(target.name)> -> print cat meets cat) onto the red cat (ID: 2)",
            "(program:1)2@1> print cat meets cat",
            "cat meets cat",
        ]
    );
    assert_eq!(run(&mut s, "cast the missing spell"), vec!["The missing spell does not exist"]);
    assert_eq!(run(&mut s, "cast vanish spell onto ghost"), vec!["Target ghost does not exist"]);
}

#[test]
fn test_cast_onto_locked_target_restores_state() {
    let mut s = with_spell("transform a shiny stone");
    run_all(&mut s, &["create grey stone", "enter stone", "set is_locked true", "leave"]);
    let stone = s.store().get(4).unwrap();
    assert!(stone.is_locked());
    assert_eq!(stone.owner_id(), 2);

    let out = run(&mut s, "cast vanish spell onto the stone");
    assert_eq!(out[1], "(program:1)4@1> transform a shiny stone");
    assert_eq!(out[2], "You are now the shiny stone (ID: 4)");

    let stone = s.store().get(4).unwrap();
    assert_eq!(stone.full_name(), "shiny stone");
    assert!(stone.is_locked());
    assert_eq!(stone.owner_id(), 2);
    assert_eq!(s.prompt(), "2@1> ");
}

#[test]
fn test_cast_restores_caster_after_failure() {
    let mut s = with_spell("enter nowhere");
    run(&mut s, "create grey stone");
    let out = run(&mut s, "cast vanish spell onto stone");
    assert_eq!(out.last().unwrap(), "There is no nowhere here");
    assert_eq!(s.prompt(), "2@1> ");

    let mut s = with_spell("cast vanish spell");
    let out = run(&mut s, "cast vanish spell");
    assert_eq!(out.last().unwrap(), "Maximum program depth (8) exceeded, aborting");
    assert_eq!(s.prompt(), "2@1> ");
}

#[test]
fn test_failed_cast_restores_locked_target() {
    for (spell, failure) in [
        ("%% loop { }", "Script exceeded its instruction budget of 5000 operations"),
        ("enter nowhere", "There is no nowhere here"),
    ] {
        let mut s = with_spell(spell);
        run_all(&mut s, &["create grey stone", "enter stone", "set is_locked true", "leave"]);

        let out = run(&mut s, "cast vanish spell onto the stone");
        assert_eq!(out.last().unwrap(), failure);
        let stone = s.store().get(4).unwrap();
        assert!(stone.is_locked());
        assert_eq!(stone.owner_id(), 2);
        assert_eq!(s.prompt(), "2@1> ");
    }
}

#[test]
fn test_spell_cannot_run_raw() {
    let mut s = with_spell("!whoami");
    let out = run(&mut s, "cast vanish spell");
    assert_eq!(out[1], "Spells cannot invoke raw execution");
}

#[test]
fn test_script_program_registers_command() {
    let mut s = cat();
    run_all(&mut s, &["create music box", "enter box"]);
    run(
        &mut s,
        r#"program %% fn greet(who) { print("hello " + who); } register("greet", Fn("greet"), "Greets someone"); print("ready");"#,
    );
    run(&mut s, "leave");
    assert_eq!(run(&mut s, "use box"), vec!["ready"]);
    assert_eq!(run(&mut s, "greet world"), vec!["hello world"]);
    assert_eq!(run(&mut s, "commands"), vec![" - greet: Greets someone"]);
    assert_eq!(run(&mut s, "help greet"), vec!["Greets someone"]);
    let out = run(&mut s, "inspect box");
    assert!(out.iter().any(|l| l.starts_with("Program: \"%% fn greet")), "{:?}", out);
}

#[test]
fn test_script_effects_and_ownership() {
    let mut s = cat();
    run_all(&mut s, &["create music box", "create rubber ball", "enter box"]);
    run(
        &mut s,
        r#"program %% let ball = search("ball")[0]; set(ball, "note", "bouncy"); issue("say done");"#,
    );
    run(&mut s, "leave");
    let out = run(&mut s, "use box");
    assert!(out[0].ends_with("The red cat (ID: 2) said 'done.'"));
    assert_eq!(s.store().get(4).unwrap().raw_note(), "bouncy");

    run(&mut s, "enter box");
    run(&mut s, r#"program %% set(search("library")[0], "note", "mine now");"#);
    run(&mut s, "leave");
    let out = run(&mut s, "use box");
    assert!(out[0].contains("You do not own the library (ID: 1)"), "{:?}", out);
    assert_eq!(s.store().get(1).unwrap().raw_note(), "");
}

#[test]
fn test_script_timeout_stops_output() {
    let mut s = cat();
    run_all(&mut s, &["create music box", "enter box"]);
    run(&mut s, r#"program %% print("start"); loop { } print("never");"#);
    run(&mut s, "leave");
    let out = run(&mut s, "use box");
    assert_eq!(
        out,
        vec![
            "start",
            "Script exceeded its instruction budget of 5000 operations",
        ]
    );
}

#[test]
fn test_two_sessions_share_world() {
    let store = MemoryStore::new();
    let mut alice = session_on(store.clone(), config());
    let mut bob = session_on(store, config());

    run_all(&mut alice, &["create red cat", "become cat"]);
    assert_eq!(run(&mut bob, "become cat"), vec!["You are now the red cat (ID: 2)"]);
    run(&mut alice, "say hello bob");
    let out = run(&mut bob, "forum");
    assert!(out[1].ends_with("said 'hello bob.'"));
}

#[test]
fn test_silent_container_hides_forum() {
    let mut s = cat();
    run_all(&mut s, &["create quiet room", "enter room", "say hush"]);
    assert_eq!(run(&mut s, "forum").len(), 2);
    run(&mut s, "set is_silent true");
    assert_eq!(run(&mut s, "forum"), vec!["No messages"]);
}

#[cfg(feature = "sqlite")]
#[test]
fn test_sqlite_world_persists() {
    use paradox::SqliteStore;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("world.db");
    {
        let store = SqliteStore::open(&path).unwrap();
        let mut s = Session::new(Box::new(store), config()).unwrap().at(1).unwrap();
        run_all(&mut s, &["create red cat", "become cat", "say persisted"]);
    }
    let store = SqliteStore::open(&path).unwrap();
    let mut s = Session::new(Box::new(store), config()).unwrap().at(1).unwrap();
    assert_eq!(run(&mut s, "locate cat"), vec!["Found red cat (ID: 2)"]);
    assert_eq!(forum::forum(s.store(), 1).len(), 1);
}
