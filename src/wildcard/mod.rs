//! Wildcard expressions: a small sandboxed expression language embedded
//! in notes, programs and command lines as `<( expr )>`.

pub mod ast;
pub mod eval;
pub mod filters;
pub mod grammar;
pub mod template;
pub mod value;

pub use eval::{Evaluator, Scope, DEFAULT_MAX_TEXT_SIZE};
pub use grammar::parse_expression;
pub use template::{has_wildcard, Template, DEFAULT_MAX_PASSES};
pub use value::Value;

use crate::clock::Clock;
use crate::error::Result;
use crate::store::Store;

/// How far one expansion may go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    pub max_passes: usize,
    pub max_text_size: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            max_text_size: DEFAULT_MAX_TEXT_SIZE,
        }
    }
}

/// Expand every wildcard in `text` as seen from `scope`.
pub fn expand(
    store: &dyn Store,
    clock: Clock,
    scope: Scope,
    text: &str,
    recursive: bool,
    limits: TextLimits,
) -> Result<String> {
    let evaluator = Evaluator::new(store, clock, scope).with_max_text_size(limits.max_text_size);
    Template::new(evaluator)
        .with_max_passes(limits.max_passes)
        .expand(text, recursive)
}
