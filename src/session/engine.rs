//! The session: one acting identity processing command lines
//!
//! Every line is resolved through the wildcard sandbox, parsed, dispatched
//! and committed as one step. Nested programs and script effects run as
//! further steps, each committing on its own, so a fatal abort deep in a
//! chain keeps whatever earlier steps already wrote.

use rand::seq::SliceRandom;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::{ParadoxError, Result};
use crate::output::{format_output, OutputFormat, Report};
use crate::script::{apply_set, Effect, RegisteredCommand, Registry, Sandbox, ScriptContext, ScriptResult};
use crate::security::{classify_program, ensure_not_raw, ProgramKind};
use crate::session::command::{self, Command, VERBATIM_VERBS};
use crate::session::context::{Frame, SessionContext};
use crate::session::narration::Narrator;
use crate::store::Store;
use crate::wildcard::{self, Scope};
use crate::world::{genesis, Vessel, VesselId, GENESIS_ID};

pub(crate) fn no_vessel() -> ParadoxError {
    ParadoxError::NotFound(
        "You do not have a vessel.\nYou need to create something first and then become it"
            .to_string(),
    )
}

pub struct Session {
    pub(crate) store: Box<dyn Store>,
    pub(crate) config: SessionConfig,
    pub(crate) clock: Clock,
    pub(crate) context: SessionContext,
    pub(crate) registry: Registry,
    pub(crate) sandbox: Sandbox,
    pub(crate) format: OutputFormat,
    output: Vec<String>,
    /// Steps taken for the current input line
    steps: usize,
    pub(crate) finished: bool,
}

impl Session {
    /// Open a session on `store`, seeding an empty world first. The session
    /// starts as a ghost in a random unlocked vessel.
    pub fn new(mut store: Box<dyn Store>, config: SessionConfig) -> Result<Self> {
        genesis(store.as_mut())?;
        let open = store.find(&|v| !v.is_locked());
        let location = open
            .choose(&mut rand::thread_rng())
            .map_or(GENESIS_ID, Vessel::id);
        debug!(location, "session opened");
        Ok(Self {
            store,
            sandbox: Sandbox::new(config.script.clone()),
            config,
            clock: Clock::local(),
            context: SessionContext::new(location),
            registry: Registry::new(),
            format: OutputFormat::Human,
            output: Vec::new(),
            steps: 0,
            finished: false,
        })
    }

    /// Stand as a ghost in `location`.
    pub fn at(mut self, location: VesselId) -> Result<Self> {
        if self.store.get(location).is_none() {
            return Err(ParadoxError::NotFound(format!(
                "Vessel {} could not be found",
                location
            )));
        }
        self.context = SessionContext::new(location);
        Ok(self)
    }

    /// Start embodied as `vessel`.
    pub fn embodied(mut self, vessel: VesselId) -> Result<Self> {
        let found = self.store.get(vessel).ok_or_else(|| {
            ParadoxError::NotFound(format!("Vessel {} could not be found", vessel))
        })?;
        self.context.set_vessel(Some(found.id()));
        Ok(self)
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn prompt(&self) -> String {
        self.context.prompt(self.store.as_ref())
    }

    /// Lines produced since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn emit(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            self.output.push(text);
            return;
        }
        self.output.extend(text.lines().map(str::to_string));
    }

    pub(crate) fn emit_all(&mut self, lines: Vec<String>) {
        self.output.extend(lines);
    }

    pub(crate) fn emit_report(&mut self, report: &Report) {
        let text = format_output(report, &self.format);
        self.emit(text);
    }

    fn report(&mut self, e: &ParadoxError) {
        let text = match e {
            ParadoxError::Eval(msg) => format!("Template Error: {}", msg),
            e if e.is_template() => format!("Template Error: {}", e),
            e => e.to_string(),
        };
        self.emit(text);
    }

    /// The vessel the session acts as.
    pub(crate) fn actor(&self) -> Result<Vessel> {
        self.context
            .vessel()
            .and_then(|id| self.store.get(id))
            .ok_or_else(no_vessel)
    }

    pub(crate) fn effective_location(&self) -> Option<VesselId> {
        self.context.effective_location(self.store.as_ref())
    }

    pub(crate) fn scope(&self) -> Scope {
        Scope {
            vessel: self.context.vessel(),
            location: self.effective_location(),
            target: None,
        }
    }

    pub(crate) fn script_context(&self, target: Option<VesselId>) -> ScriptContext {
        ScriptContext {
            actor: self.context.vessel(),
            location: self.effective_location(),
            target,
            clock: self.clock,
            text: self.config.text_limits(),
        }
    }

    pub(crate) fn expand(&self, text: &str, scope: Scope) -> Result<String> {
        wildcard::expand(
            self.store.as_ref(),
            self.clock,
            scope,
            text,
            true,
            self.config.text_limits(),
        )
    }

    /// Process one input line. Returns whether the session is over.
    ///
    /// Only strict-mode failures come back as `Err`; everything else is
    /// reported into the output.
    pub fn execute(&mut self, line: &str) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(self.finished);
        }
        self.store.refresh()?;
        self.steps = 0;
        debug!(line, prompt = %self.prompt(), "dispatching");

        if let Err(e) = self.step(line) {
            self.context.clear_frames();
            self.store.rollback();
            if !e.is_fatal() {
                return Err(e);
            }
            error!(error = %e, "nested execution aborted");
            self.report(&e);
        }

        self.store.refresh()?;
        if !self.finished && !self.config.headless {
            let show_forum = command::verb(line) != "forum";
            self.narrate(show_forum)?;
        }
        Ok(self.finished)
    }

    /// Narrate the current location, as a fresh interactive session does
    /// before its first prompt.
    pub fn look_around(&mut self) -> Result<()> {
        self.store.refresh()?;
        if self.config.headless {
            return Ok(());
        }
        self.narrate(true)
    }

    /// Run one line and commit it. Failures are reported here unless they
    /// must unwind further: fatal ones always, strict ones in strict mode.
    pub(crate) fn step(&mut self, line: &str) -> Result<()> {
        self.steps += 1;
        if self.steps > self.config.max_steps {
            return Err(ParadoxError::StepLimit(self.config.max_steps));
        }
        match self.run_line(line) {
            Ok(()) => self.store.commit(),
            Err(e) => {
                self.store.rollback();
                if e.is_fatal() || (self.config.strict && e.is_strict()) {
                    return Err(e);
                }
                debug!(error = %e, line, "command failed");
                self.report(&e);
                Ok(())
            }
        }
    }

    fn run_line(&mut self, line: &str) -> Result<()> {
        let resolved = self.resolve(line)?;
        if resolved.trim().is_empty() {
            return Ok(());
        }
        let command = command::parse(&resolved)?;
        self.dispatch(command)
    }

    /// Expand the wildcards of a raw line, except for verbs whose argument
    /// is stored as written.
    fn resolve(&self, line: &str) -> Result<String> {
        if VERBATIM_VERBS.contains(&command::verb(line).as_str()) {
            return Ok(line.to_string());
        }
        self.expand(line, self.scope())
    }

    fn narrate(&mut self, show_forum: bool) -> Result<()> {
        let location = self.effective_location();
        if !self.context.needs_render(location) {
            return Ok(());
        }
        let Some(here) = location.and_then(|id| self.store.get(id)) else {
            return Ok(());
        };
        let narration = {
            let narrator = Narrator::new(self.store.as_ref(), self.clock, &self.config);
            match self.context.vessel().and_then(|id| self.store.get(id)) {
                Some(vessel) => narrator.embodied(self.scope(), &vessel, &here, show_forum),
                None => narrator.ghost(self.scope(), &here, show_forum),
            }
        };
        self.context.mark_rendered(location);
        match narration {
            Ok(lines) => self.emit_all(lines),
            Err(e) if self.config.strict && e.is_strict() => return Err(e),
            Err(e) => self.report(&e),
        }
        Ok(())
    }

    /// Classify a stored program and, for wildcard programs, resolve it to
    /// the command line it stands for.
    pub(crate) fn resolve_program(&self, program: &str, scope: Scope) -> Result<ProgramKind> {
        match classify_program(program)? {
            ProgramKind::Wildcard(text) => Ok(ProgramKind::Wildcard(self.expand(&text, scope)?)),
            script => Ok(script),
        }
    }

    /// Run a resolved program one frame deeper.
    pub(crate) fn run_nested(
        &mut self,
        label: String,
        program: ProgramKind,
        target: Option<VesselId>,
        what: &str,
    ) -> Result<()> {
        if let ProgramKind::Wildcard(line) = &program {
            ensure_not_raw(line, what)?;
        }
        self.store.commit()?;
        let frame = Frame {
            location: self.effective_location(),
            label,
        };
        self.context.push_frame(frame, self.config.max_depth)?;
        debug!(depth = self.context.depth(), "entering program");
        let outcome = match program {
            ProgramKind::Wildcard(line) => {
                let echo = format!("{}{}", self.prompt(), line);
                self.emit(echo);
                self.step(&line)
            }
            ProgramKind::Script(source) => {
                let result = self.sandbox.run(self.store.as_ref(), self.script_context(target), &source);
                self.apply_script(result, &source)
            }
        };
        self.context.pop_frame();
        outcome
    }

    /// Replay what a finished script asked for, in order.
    pub(crate) fn apply_script(&mut self, result: ScriptResult, source: &str) -> Result<()> {
        self.emit_all(result.output);
        if let Some(e) = result.error {
            return Err(e);
        }
        let actor = self.context.vessel();
        for effect in result.effects {
            match effect {
                Effect::Issue(line) => self.step(&line)?,
                Effect::Set { target, key, value } => {
                    let actor = actor.ok_or_else(no_vessel)?;
                    apply_set(self.store.as_mut(), actor, target, &key, &value)?;
                    self.store.commit()?;
                }
                Effect::Register {
                    name,
                    function,
                    help,
                } => self.registry.register(RegisteredCommand {
                    name,
                    source: source.to_string(),
                    function,
                    help,
                    author: actor,
                })?,
            }
        }
        Ok(())
    }

    /// Dispatch to a script-registered command.
    pub(crate) fn run_registered(&mut self, name: &str, args: &str) -> Result<()> {
        let command = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| ParadoxError::UnknownCommand(name.to_string()))?;
        self.store.commit()?;
        let frame = Frame {
            location: self.effective_location(),
            label: format!("command {}", name),
        };
        self.context.push_frame(frame, self.config.max_depth)?;
        let result = self
            .sandbox
            .call(self.store.as_ref(), self.script_context(None), &command, args);
        let outcome = self.apply_script(result, &command.source);
        self.context.pop_frame();
        outcome
    }

    /// Run `program` acting as `target`, then put back the caster and the
    /// target's ownership and lock whatever the outcome.
    pub(crate) fn cast_onto(
        &mut self,
        caster: &Vessel,
        target: &Vessel,
        spell: &str,
        program: ProgramKind,
    ) -> Result<()> {
        let (owner, locked) = (target.owner_id(), target.is_locked());
        if owner == caster.id() && locked {
            let mut lifted = target.clone();
            lifted.restore_access(target.id(), false);
            self.store.put(lifted);
            self.store.commit()?;
        }
        info!(spell, caster = caster.id(), target = target.id(), "casting");

        self.context.set_vessel(Some(target.id()));
        let outcome = self.run_nested(format!("spell {}", spell), program, Some(target.id()), "Spells");
        self.context.set_vessel(Some(caster.id()));

        self.store.rollback();
        let restored = match self.store.get(target.id()) {
            Some(mut current) if current.owner_id() != owner || current.is_locked() != locked => {
                current.restore_access(owner, locked);
                self.store.put(current);
                self.store.commit()
            }
            _ => Ok(()),
        };
        outcome.and(restored)
    }

    pub(crate) fn dispatch(&mut self, command: Command) -> Result<()> {
        if command.needs_vessel() && self.actor().is_err() {
            return Err(no_vessel());
        }
        match command {
            Command::Look => self.look(),
            Command::Forum => self.forum(),
            Command::Inspect(name) => self.inspect(name.as_deref()),
            Command::Create(name) => self.create(&name),
            Command::Become(name) => self.become_vessel(&name),
            Command::Enter(name) => self.enter(&name),
            Command::Leave => self.leave(),
            Command::Fold => self.fold(),
            Command::Warp(name) => self.warp(&name),
            Command::Note(text) => self.note(&text),
            Command::Program(text) => self.program(&text),
            Command::Transform(name) => self.transform(&name),
            Command::Set { flag, value } => self.set_flag(flag, value),
            Command::Take(name) => self.take(&name),
            Command::Drop(name) => self.drop_vessel(&name),
            Command::Use(name) => self.use_vessel(&name),
            Command::Cast { spell, target } => self.cast(&spell, target.as_deref()),
            Command::Say(text) => self.say(&text),
            Command::Emote(text) => self.emote(&text),
            Command::Signal => self.signal(),
            Command::Print(text) => {
                if !text.is_empty() {
                    self.emit(text);
                }
                Ok(())
            }
            Command::Locate(name) => self.locate(&name),
            Command::Help(topic) => self.help(topic.as_deref()),
            Command::Commands => self.commands(),
            Command::Exit => {
                self.finished = true;
                Ok(())
            }
            Command::User { name, args } => self.run_registered(&name, &args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn session(strict: bool) -> Session {
        let config = SessionConfig {
            strict,
            ..SessionConfig::default()
        };
        Session::new(Box::new(MemoryStore::new()), config)
            .unwrap()
            .at(GENESIS_ID)
            .unwrap()
    }

    #[test]
    fn test_new_seeds_world() {
        let s = session(false);
        assert_eq!(s.store().count(), 1);
        assert_eq!(s.prompt(), "None@1> ");
        assert!(!s.is_finished());
    }

    #[test]
    fn test_narration_once_per_location() {
        let mut s = session(false);
        s.execute("print hi").unwrap();
        let out = s.take_output();
        assert_eq!(out[0], "hi");
        assert!(out.contains(&"You are a ghost in the library (ID: 1)".to_string()));
        s.execute("print again").unwrap();
        assert_eq!(s.take_output(), vec!["again"]);
    }

    #[test]
    fn test_unknown_command_reported_or_raised() {
        let mut s = session(false);
        s.execute("dance").unwrap();
        assert!(s.take_output().contains(&"Unknown command: dance".to_string()));

        let mut s = session(true);
        match s.execute("dance") {
            Err(ParadoxError::UnknownCommand(name)) => assert_eq!(name, "dance"),
            other => panic!("Expected unknown command, got {:?}", other),
        }
    }

    #[test]
    fn test_template_error_blocks_dispatch() {
        let mut s = session(false);
        s.execute("create <(nothing)> box").unwrap();
        let out = s.take_output();
        assert_eq!(out[0], "Template Error: 'nothing' is undefined");
        assert_eq!(s.store().count(), 1);
    }

    #[test]
    fn test_needs_vessel() {
        let mut s = session(false);
        s.execute("leave").unwrap();
        let out = s.take_output();
        assert_eq!(out[0], "You do not have a vessel.");
        assert_eq!(out[1], "You need to create something first and then become it");
    }

    #[test]
    fn test_step_limit_is_fatal() {
        match ParadoxError::StepLimit(4) {
            e if e.is_fatal() => assert_eq!(e.to_string(), "Maximum steps per command (4) exceeded, aborting"),
            other => panic!("Expected fatal step limit, got {:?}", other),
        }
    }

    #[test]
    fn test_exit() {
        let mut s = session(false);
        assert!(s.execute("exit").unwrap());
        assert!(s.is_finished());
        assert!(s.take_output().is_empty());
    }

    #[test]
    fn test_headless_skips_narration() {
        let config = SessionConfig {
            headless: true,
            ..SessionConfig::default()
        };
        let mut s = Session::new(Box::new(MemoryStore::new()), config).unwrap();
        s.execute("print quiet").unwrap();
        assert_eq!(s.take_output(), vec!["quiet"]);
    }
}
