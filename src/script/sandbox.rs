//! Script sandbox
//!
//! Every run builds a fresh rhai engine holding only the allow-listed
//! packages and the host API. A progress callback enforces the instruction
//! budget; rhai's own limits bound strings, arrays and call depth.

use std::cell::RefCell;
use std::rc::Rc;

use rhai::packages::{
    BasicArrayPackage, BasicMapPackage, CorePackage, LogicPackage, MoreStringPackage, Package,
};
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, Scope, INT};
use tracing::{debug, warn};

use crate::config::ScriptLimits;
use crate::error::ParadoxError;
use crate::script::host::{register_host, Effect, HostState, ScriptContext};
use crate::script::registry::RegisteredCommand;
use crate::store::Store;

/// Keywords switched off in every sandbox.
const DISABLED_SYMBOLS: [&str; 2] = ["eval", "import"];

/// What a script run left behind
#[derive(Debug, Default)]
pub struct ScriptResult {
    /// Captured `print`/`debug` lines
    pub output: Vec<String>,
    /// Queued effects; always empty when the run failed
    pub effects: Vec<Effect>,
    pub error: Option<ParadoxError>,
}

impl ScriptResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Sandbox {
    limits: ScriptLimits,
}

fn script_error(err: Box<EvalAltResult>, budget: u64) -> ParadoxError {
    match *err {
        EvalAltResult::ErrorTerminated(..) | EvalAltResult::ErrorTooManyOperations(..) => {
            ParadoxError::ScriptTimeout(budget)
        }
        other => ParadoxError::Script(other.to_string()),
    }
}

impl Sandbox {
    pub fn new(limits: ScriptLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ScriptLimits {
        &self.limits
    }

    fn engine(&self, state: &Rc<RefCell<HostState>>) -> Engine {
        let mut engine = Engine::new_raw();
        engine.register_global_module(CorePackage::new().as_shared_module());
        engine.register_global_module(LogicPackage::new().as_shared_module());
        engine.register_global_module(BasicArrayPackage::new().as_shared_module());
        engine.register_global_module(BasicMapPackage::new().as_shared_module());
        engine.register_global_module(MoreStringPackage::new().as_shared_module());
        for symbol in DISABLED_SYMBOLS {
            engine.disable_symbol(symbol);
        }

        engine
            .set_max_string_size(self.limits.max_string_size)
            .set_max_array_size(self.limits.max_array_size)
            .set_max_map_size(self.limits.max_array_size)
            .set_max_call_levels(self.limits.max_call_levels)
            .set_max_expr_depths(64, 32);

        let budget = self.limits.max_operations;
        engine.on_progress(move |ops| {
            if ops > budget {
                Some(Dynamic::from(budget as INT))
            } else {
                None
            }
        });

        let out = Rc::clone(state);
        engine.on_print(move |line| out.borrow_mut().emit(line));
        let out = Rc::clone(state);
        engine.on_debug(move |line, _, _| out.borrow_mut().emit(line));

        register_host(&mut engine, state);
        engine
    }

    fn execute<F>(&self, store: &dyn Store, ctx: ScriptContext, body: F) -> ScriptResult
    where
        F: FnOnce(&Engine) -> Result<(), Box<EvalAltResult>>,
    {
        let state = match HostState::new(store, ctx, self.limits.clone()) {
            Ok(state) => Rc::new(RefCell::new(state)),
            Err(e) => {
                return ScriptResult {
                    error: Some(e),
                    ..ScriptResult::default()
                }
            }
        };
        let engine = self.engine(&state);
        let outcome = body(&engine);
        drop(engine);

        let mut st = state.borrow_mut();
        let output = std::mem::take(&mut st.output);
        match outcome {
            Ok(()) => {
                let effects = std::mem::take(&mut st.effects);
                debug!(effects = effects.len(), lines = output.len(), "script finished");
                ScriptResult {
                    output,
                    effects,
                    error: None,
                }
            }
            Err(err) => {
                let error = script_error(err, self.limits.max_operations);
                warn!(%error, "script aborted");
                ScriptResult {
                    output,
                    effects: Vec::new(),
                    error: Some(error),
                }
            }
        }
    }

    /// Run `source` top to bottom.
    pub fn run(&self, store: &dyn Store, ctx: ScriptContext, source: &str) -> ScriptResult {
        self.execute(store, ctx, |engine| engine.run(source))
    }

    /// Call a registered command's function with the text typed after it.
    /// Functions taking no parameters are called without it.
    pub fn call(
        &self,
        store: &dyn Store,
        ctx: ScriptContext,
        command: &RegisteredCommand,
        args: &str,
    ) -> ScriptResult {
        self.execute(store, ctx, |engine| {
            let ast = engine.compile(&command.source)?;
            let arity = ast
                .iter_functions()
                .find(|f| f.name == command.function)
                .map(|f| f.params.len())
                .ok_or_else(|| format!("function '{}' is not defined", command.function))?;
            let mut scope = Scope::new();
            let options = CallFnOptions::new().eval_ast(false);
            let result = if arity == 0 {
                engine.call_fn_with_options::<Dynamic>(options, &mut scope, &ast, &command.function, ())
            } else {
                engine.call_fn_with_options::<Dynamic>(
                    options,
                    &mut scope,
                    &ast,
                    &command.function,
                    (args.to_string(),),
                )
            };
            result.map(|_| ())
        })
    }
}
