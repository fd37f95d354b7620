//! Host functions exposed to scripts
//!
//! Scripts never touch the live store. Each run gets a private fork of the world
//! and a queue of effects; reads go through the same capability lookup as
//! wildcards, and writes are checked against the fork, then queued for
//! the session to replay once the script finishes cleanly.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, FnPtr, Map, INT};

use crate::clock::Clock;
use crate::config::ScriptLimits;
use crate::error::{ParadoxError, Result};
use crate::security::{ensure_allowed_name, ensure_owner};
use crate::session::command::is_builtin;
use crate::store::{MemoryStore, Store};
use crate::wildcard::{self, Evaluator, Scope, TextLimits, Value};
use crate::world::{Flag, Graph, VesselId};

pub type HostResult<T> = std::result::Result<T, Box<EvalAltResult>>;

/// Attribute keys `set` accepts.
pub const SET_KEYS: [&str; 8] = [
    "name", "attr", "note", "program", "locked", "hidden", "silent", "tunnel",
];

const TEXT_KEYS: [&str; 4] = ["name", "attr", "note", "program"];

/// Opaque reference to a vessel, the only way scripts hold one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VesselHandle {
    pub id: VesselId,
}

impl fmt::Display for VesselHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Vessel {}>", self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    Text(String),
    Flag(bool),
}

impl SetValue {
    fn from_dynamic(key: &str, value: Dynamic) -> HostResult<Self> {
        if TEXT_KEYS.contains(&key) {
            let text = value
                .into_string()
                .map_err(|t| format!("'{}' expects a string, got {}", key, t))?;
            return Ok(SetValue::Text(text));
        }
        let flag = value
            .as_bool()
            .map_err(|t| format!("'{}' expects a bool, got {}", key, t))?;
        Ok(SetValue::Flag(flag))
    }
}

/// Something a script asked the session to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Run a command line as the acting vessel
    Issue(String),
    Set {
        target: VesselId,
        key: String,
        value: SetValue,
    },
    Register {
        name: String,
        function: String,
        help: Option<String>,
    },
}

/// Who a script runs as and where
#[derive(Debug, Clone, Copy)]
pub struct ScriptContext {
    pub actor: Option<VesselId>,
    pub location: Option<VesselId>,
    pub target: Option<VesselId>,
    pub clock: Clock,
    pub text: TextLimits,
}

impl ScriptContext {
    pub fn scope(&self) -> Scope {
        Scope {
            vessel: self.actor,
            location: self.location,
            target: self.target,
        }
    }
}

pub(crate) struct HostState {
    pub world: MemoryStore,
    pub ctx: ScriptContext,
    pub limits: ScriptLimits,
    pub output: Vec<String>,
    pub effects: Vec<Effect>,
}

/// Write one attribute on `target` as `actor`. Shared by scripts, against
/// their fork, and by the session when replaying effects.
pub fn apply_set(
    store: &mut dyn Store,
    actor: VesselId,
    target: VesselId,
    key: &str,
    value: &SetValue,
) -> Result<()> {
    ensure_allowed_name(key)?;
    let actor = store
        .get(actor)
        .ok_or_else(|| ParadoxError::NotFound("You do not have a vessel.".to_string()))?;
    let mut vessel = store
        .get(target)
        .ok_or_else(|| ParadoxError::NotFound(format!("Vessel {} could not be found", target)))?;
    ensure_owner(&actor, &vessel)?;
    match (key, value) {
        ("name", SetValue::Text(text)) => vessel.set_name(text)?,
        ("attr", SetValue::Text(text)) => vessel.set_attr(text)?,
        ("note", SetValue::Text(text)) => vessel.set_note(text)?,
        ("program", SetValue::Text(text)) => vessel.set_program(text)?,
        (key, SetValue::Flag(on)) if SET_KEYS.contains(&key) => {
            vessel.set_flag(key.parse::<Flag>()?, *on)?
        }
        _ => {
            return Err(ParadoxError::InvalidArgument(format!(
                "Invalid attribute: {}",
                key
            )))
        }
    }
    store.put(vessel);
    Ok(())
}

impl HostState {
    pub fn new(store: &dyn Store, ctx: ScriptContext, limits: ScriptLimits) -> Result<Self> {
        Ok(Self {
            world: store.fork()?,
            ctx,
            limits,
            output: Vec::new(),
            effects: Vec::new(),
        })
    }

    /// Queue an effect for the session, refusing once the run's quota is spent.
    pub fn queue(&mut self, effect: Effect) -> HostResult<()> {
        if self.effects.len() >= self.limits.max_effects {
            return Err(format!(
                "a script may queue at most {} effects",
                self.limits.max_effects
            )
            .into());
        }
        self.effects.push(effect);
        Ok(())
    }

    /// Capture a line of script output, dropping anything past the cap.
    pub fn emit(&mut self, line: &str) {
        if self.output.len() < self.limits.max_output_lines {
            self.output.push(line.to_string());
        }
    }

    fn expand(&self, text: &str) -> HostResult<String> {
        wildcard::expand(
            &self.world,
            self.ctx.clock,
            self.ctx.scope(),
            text,
            true,
            self.ctx.text,
        )
        .map_err(host_error)
    }
}

fn host_error(e: ParadoxError) -> Box<EvalAltResult> {
    e.to_string().into()
}

fn handle(id: Option<VesselId>) -> Dynamic {
    id.map_or(Dynamic::UNIT, |id| Dynamic::from(VesselHandle { id }))
}

/// Convert a wildcard value into a script value. Vessels become handles.
pub fn to_dynamic(value: Value) -> Dynamic {
    match value {
        Value::None | Value::Ghost | Value::Builtin(_) => Dynamic::UNIT,
        Value::Bool(b) => b.into(),
        Value::Int(n) => n.into(),
        Value::Float(f) => f.into(),
        Value::Str(s) => s.into(),
        Value::List(items) => Dynamic::from_array(items.into_iter().map(to_dynamic).collect()),
        Value::Map(map) => Dynamic::from_map(
            map.into_iter()
                .map(|(k, v)| (k.into(), to_dynamic(v)))
                .collect(),
        ),
        Value::Vessel(id) => Dynamic::from(VesselHandle { id }),
    }
}

fn display(value: &Dynamic) -> String {
    match value.clone().try_cast::<VesselHandle>() {
        Some(handle) => handle.to_string(),
        None => value.to_string(),
    }
}

/// Replace each `{key}` in `template` with the matching entry of `values`.
pub fn format_template(template: &str, values: &Map) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), &display(value))
    })
}

fn register_command(
    state: &Rc<RefCell<HostState>>,
    name: &str,
    function: &FnPtr,
    help: Option<String>,
) -> HostResult<()> {
    ensure_allowed_name(name).map_err(host_error)?;
    if is_builtin(name) {
        return Err(format!("'{}' is a built-in command", name).into());
    }
    if function.is_curried() {
        return Err("curried functions cannot be registered".into());
    }
    state.borrow_mut().queue(Effect::Register {
        name: name.to_lowercase(),
        function: function.fn_name().to_string(),
        help,
    })
}

/// Install the host API into `engine`.
pub(crate) fn register_host(engine: &mut Engine, state: &Rc<RefCell<HostState>>) {
    engine
        .register_type_with_name::<VesselHandle>("Vessel")
        .register_get("id", |v: &mut VesselHandle| v.id)
        .register_fn("to_string", |v: &mut VesselHandle| v.to_string())
        .register_fn("to_debug", |v: &mut VesselHandle| v.to_string())
        .register_fn("==", |a: VesselHandle, b: VesselHandle| a == b)
        .register_fn("!=", |a: VesselHandle, b: VesselHandle| a != b);

    let s = Rc::clone(state);
    engine.register_fn("me", move || handle(s.borrow().ctx.actor));

    let s = Rc::clone(state);
    engine.register_fn("here", move || handle(s.borrow().ctx.location));

    let s = Rc::clone(state);
    engine.register_fn("render", move || -> HostResult<String> {
        let st = s.borrow();
        let Some(here) = st.ctx.location.and_then(|id| st.world.get(id)) else {
            return Ok(String::new());
        };
        let text = st.expand(here.raw_note())?;
        Ok(Graph::new(&st.world).mark_up(&here, &text))
    });

    let s = Rc::clone(state);
    engine.register_fn("render", move |text: &str| -> HostResult<String> {
        s.borrow().expand(text)
    });

    let s = Rc::clone(state);
    engine.register_fn("search", move |text: &str| -> Array {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Array::new();
        }
        s.borrow()
            .world
            .find(&|v| v.full_name().to_lowercase().contains(&needle))
            .into_iter()
            .map(|v| Dynamic::from(VesselHandle { id: v.id() }))
            .collect()
    });

    let s = Rc::clone(state);
    engine.register_fn("issue", move |line: &str| -> HostResult<()> {
        s.borrow_mut().queue(Effect::Issue(line.to_string()))
    });

    let s = Rc::clone(state);
    engine.register_fn("register", move |name: &str, function: FnPtr| {
        register_command(&s, name, &function, None)
    });

    let s = Rc::clone(state);
    engine.register_fn(
        "register",
        move |name: &str, function: FnPtr, help: &str| {
            register_command(&s, name, &function, Some(help.to_string()))
        },
    );

    engine.register_fn("format", |template: &str, values: Map| {
        format_template(template, &values)
    });

    let s = Rc::clone(state);
    engine.register_fn("clock", move || -> HostResult<Dynamic> {
        let facts = s.borrow().ctx.clock.now();
        let json = serde_json::to_value(facts).map_err(|e| e.to_string())?;
        Ok(to_dynamic(Value::from_json(json)))
    });

    let s = Rc::clone(state);
    engine.register_fn(
        "get",
        move |vessel: VesselHandle, key: &str| -> HostResult<Dynamic> {
            ensure_allowed_name(key).map_err(host_error)?;
            let st = s.borrow();
            let evaluator = Evaluator::new(&st.world, st.ctx.clock, st.ctx.scope());
            evaluator
                .lookup(&Value::Vessel(vessel.id), &Value::Str(key.to_string()))
                .map(to_dynamic)
                .map_err(host_error)
        },
    );

    let s = Rc::clone(state);
    engine.register_fn(
        "set",
        move |vessel: VesselHandle, key: &str, value: Dynamic| -> HostResult<()> {
            ensure_allowed_name(key).map_err(host_error)?;
            let value = SetValue::from_dynamic(key, value)?;
            let mut st = s.borrow_mut();
            let actor = st.ctx.actor.ok_or("You do not have a vessel.")?;
            apply_set(&mut st.world, actor, vessel.id, key, &value).map_err(host_error)?;
            st.queue(Effect::Set {
                target: vessel.id,
                key: key.to_string(),
                value,
            })
        },
    );

    let s = Rc::clone(state);
    engine.register_fn("repeat", move |text: &str, times: INT| -> HostResult<String> {
        let limit = s.borrow().limits.max_string_size;
        let times = usize::try_from(times).map_err(|_| "repeat count must not be negative")?;
        let size = text.len().saturating_mul(times);
        if size > limit {
            return Err(format!(
                "repeat would produce {} bytes, above the {} byte limit",
                size, limit
            )
            .into());
        }
        Ok(text.repeat(times))
    });
}
