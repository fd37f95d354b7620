//! Finding and expanding `<( ... )>` wildcards inside free text

use crate::error::{ParadoxError, Result};
use crate::wildcard::eval::{too_large, Evaluator};
use crate::wildcard::grammar::parse_expression;

pub const OPEN: &str = "<(";
pub const CLOSE: &str = ")>";

/// Raw template syntax that is removed before expansion.
const LEGACY_DELIMITERS: [&str; 5] = ["{{", "}}", "{%", "%}", "##"];

pub const DEFAULT_MAX_PASSES: usize = 16;

pub fn has_wildcard(text: &str) -> bool {
    text.find(OPEN)
        .is_some_and(|start| text[start + OPEN.len()..].contains(CLOSE))
}

pub fn strip_legacy(text: &str) -> String {
    LEGACY_DELIMITERS
        .iter()
        .fold(text.to_string(), |acc, d| acc.replace(d, ""))
}

pub struct Template<'a> {
    evaluator: Evaluator<'a>,
    max_passes: usize,
}

impl<'a> Template<'a> {
    pub fn new(evaluator: Evaluator<'a>) -> Self {
        Self {
            evaluator,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// One pass: every wildcard in `text` replaced by its value.
    pub fn render_once(&self, text: &str) -> Result<String> {
        let text = strip_legacy(text);
        if !has_wildcard(&text) {
            return Ok(text);
        }
        self.evaluator.trace(&text);

        let mut out = String::with_capacity(text.len());
        let mut rest = text.as_str();
        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let body_start = start + OPEN.len();
            let (value, consumed) = self.expand_one(&rest[body_start..])?;
            out.push_str(&value);
            rest = &rest[body_start + consumed..];
        }
        out.push_str(rest);
        if out.len() > self.evaluator.max_text_size() {
            return Err(too_large(out.len(), self.evaluator.max_text_size()));
        }
        Ok(out)
    }

    /// Evaluate the wildcard at the head of `body`. The closing delimiter is
    /// the first `)>` whose prefix parses; returns the text and bytes used.
    fn expand_one(&self, body: &str) -> Result<(String, usize)> {
        let mut first_error = None;
        for (end, _) in body.match_indices(CLOSE) {
            match parse_expression(&body[..end]) {
                Ok(expr) => {
                    let value = self.evaluator.evaluate(&expr)?;
                    return Ok((self.evaluator.render(&value), end + CLOSE.len()));
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        Err(first_error
            .unwrap_or_else(|| ParadoxError::Parse(format!("unterminated wildcard: {}", OPEN))))
    }

    /// Expand `text`, re-expanding the output until it stops changing when
    /// `recursive` is set.
    pub fn expand(&self, text: &str, recursive: bool) -> Result<String> {
        let mut current = self.render_once(text)?;
        if !recursive {
            return Ok(current);
        }
        for _ in 1..self.max_passes {
            let next = self.render_once(&current)?;
            if next == current {
                break;
            }
            current = next;
        }
        Ok(current)
    }
}
