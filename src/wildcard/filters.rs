//! The closed set of `|filter` transforms

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rand::seq::SliceRandom;

use crate::error::{ParadoxError, Result};
use crate::wildcard::ast::BinOp;
use crate::wildcard::eval::{too_large, Evaluator};
use crate::wildcard::value::Value;

pub const FILTERS: [&str; 25] = [
    "length",
    "count",
    "first",
    "last",
    "random",
    "join",
    "map",
    "lformat",
    "lower",
    "upper",
    "title",
    "capitalize",
    "trim",
    "string",
    "int",
    "float",
    "abs",
    "round",
    "default",
    "reverse",
    "sort",
    "sum",
    "list",
    "replace",
    "unique",
];

/// Positional argument `idx`, or the keyword `name`.
fn arg<'v>(
    args: &'v [Value],
    kwargs: &'v BTreeMap<String, Value>,
    idx: usize,
    name: &str,
) -> Option<&'v Value> {
    args.get(idx).or_else(|| kwargs.get(name))
}

fn items(ev: &Evaluator, filter: &str, subject: Value) -> Result<Vec<Value>> {
    match subject {
        Value::List(items) => Ok(items),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Map(map) => Ok(map.into_keys().map(Value::Str).collect()),
        other => Err(ParadoxError::Eval(format!(
            "filter '{}' expects a sequence, got {}",
            filter,
            ev.render(&other)
        ))),
    }
}

/// Project each item through `attribute=` when given.
fn project(ev: &Evaluator, items: Vec<Value>, attribute: Option<&Value>) -> Result<Vec<Value>> {
    match attribute {
        Some(key) => items.iter().map(|i| ev.lookup(i, key)).collect(),
        None => Ok(items),
    }
}

/// Fail before building text that would pass the evaluator's ceiling.
fn ensure_fits(ev: &Evaluator, size: usize) -> Result<()> {
    if size > ev.max_text_size() {
        return Err(too_large(size, ev.max_text_size()));
    }
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Value::Str(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Str(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}

/// Apply filter `name` to `subject`.
pub fn apply(
    ev: &Evaluator,
    name: &str,
    subject: Value,
    args: &[Value],
    kwargs: &BTreeMap<String, Value>,
) -> Result<Value> {
    let text = |v: &Value| ev.render(v);

    let value = match name {
        "length" | "count" => {
            let len = match &subject {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                other => {
                    return Err(ParadoxError::Eval(format!(
                        "object of type '{}' has no length",
                        other.type_name()
                    )))
                }
            };
            Value::Int(len as i64)
        }
        "first" => items(ev, name, subject)?.into_iter().next().unwrap_or(Value::None),
        "last" => items(ev, name, subject)?.pop().unwrap_or(Value::None),
        "random" => items(ev, name, subject)?
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or(Value::None),
        "join" => {
            let sep = arg(args, kwargs, 0, "d").map(text).unwrap_or_default();
            let items = project(ev, items(ev, name, subject)?, kwargs.get("attribute"))?;
            let parts: Vec<String> = items.iter().map(text).collect();
            let size = parts.iter().map(String::len).sum::<usize>()
                + sep.len().saturating_mul(parts.len().saturating_sub(1));
            ensure_fits(ev, size)?;
            Value::Str(parts.join(&sep))
        }
        "map" => {
            let items = items(ev, name, subject)?;
            match (kwargs.get("attribute"), args.first()) {
                (Some(key), _) => Value::List(project(ev, items, Some(key))?),
                (None, Some(Value::Str(filter))) => {
                    let empty = BTreeMap::new();
                    let rest = args.get(1..).unwrap_or_default();
                    Value::List(
                        items
                            .into_iter()
                            .map(|i| apply(ev, filter, i, rest, &empty))
                            .collect::<Result<Vec<_>>>()?,
                    )
                }
                _ => {
                    return Err(ParadoxError::Eval(
                        "map needs attribute= or a filter name".into(),
                    ))
                }
            }
        }
        "lformat" => {
            let template = arg(args, kwargs, 0, "format")
                .map(text)
                .ok_or_else(|| ParadoxError::Eval("lformat needs a format string".into()))?;
            let slots = template.matches("{}").count();
            let fill = |item: &Value| -> Result<Value> {
                let item = text(item);
                ensure_fits(ev, template.len() + slots.saturating_mul(item.len()))?;
                Ok(Value::Str(template.replace("{}", &item)))
            };
            match subject {
                Value::List(items) => Value::List(items.iter().map(fill).collect::<Result<Vec<_>>>()?),
                other => fill(&other)?,
            }
        }
        "lower" => Value::Str(text(&subject).to_lowercase()),
        "upper" => Value::Str(text(&subject).to_uppercase()),
        "title" => Value::Str(title(&text(&subject))),
        "capitalize" => Value::Str(capitalize(&text(&subject))),
        "trim" => Value::Str(text(&subject).trim().to_string()),
        "string" => Value::Str(text(&subject)),
        "int" => match to_int(&subject) {
            Some(n) => Value::Int(n),
            None => arg(args, kwargs, 0, "default").cloned().unwrap_or(Value::Int(0)),
        },
        "float" => match to_float(&subject) {
            Some(f) => Value::Float(f),
            None => arg(args, kwargs, 0, "default").cloned().unwrap_or(Value::Float(0.0)),
        },
        "abs" => match subject {
            Value::Int(n) => Value::Int(
                n.checked_abs()
                    .ok_or_else(|| ParadoxError::Eval("integer overflow".into()))?,
            ),
            Value::Float(f) => Value::Float(f.abs()),
            other => {
                return Err(ParadoxError::Eval(format!(
                    "bad operand type for abs(): '{}'",
                    other.type_name()
                )))
            }
        },
        "round" => {
            let f = subject.as_f64().ok_or_else(|| {
                ParadoxError::Eval(format!("cannot round '{}'", subject.type_name()))
            })?;
            let precision = arg(args, kwargs, 0, "precision")
                .and_then(Value::as_i64)
                .unwrap_or(0)
                .clamp(0, 15) as i32;
            let scale = 10f64.powi(precision);
            Value::Float((f * scale).round() / scale)
        }
        "default" => {
            let fallback = arg(args, kwargs, 0, "default_value")
                .cloned()
                .unwrap_or(Value::Str(String::new()));
            let boolean = arg(args, kwargs, 1, "boolean").is_some_and(Value::is_truthy);
            let missing = matches!(subject, Value::None | Value::Ghost);
            if missing || (boolean && !subject.is_truthy()) {
                fallback
            } else {
                subject
            }
        }
        "reverse" => match subject {
            Value::Str(s) => Value::Str(s.chars().rev().collect()),
            other => {
                let mut items = items(ev, name, other)?;
                items.reverse();
                Value::List(items)
            }
        },
        "sort" => {
            let reverse = arg(args, kwargs, 0, "reverse").is_some_and(Value::is_truthy);
            let items = items(ev, name, subject)?;
            let keys = project(ev, items.clone(), kwargs.get("attribute"))?;
            let mut keyed: Vec<(Value, Value)> = keys.into_iter().zip(items).collect();
            for pair in keyed.windows(2) {
                ev.compare_order(&pair[0].0, &pair[1].0)?;
            }
            keyed.sort_by(|a, b| ev.compare_order(&a.0, &b.0).unwrap_or(Ordering::Equal));
            if reverse {
                keyed.reverse();
            }
            Value::List(keyed.into_iter().map(|(_, v)| v).collect())
        }
        "sum" => {
            let start = arg(args, kwargs, 1, "start").cloned().unwrap_or(Value::Int(0));
            let items = project(ev, items(ev, name, subject)?, arg(args, kwargs, 0, "attribute"))?;
            items
                .into_iter()
                .try_fold(start, |acc, item| ev.combine(BinOp::Add, acc, item))?
        }
        "list" => Value::List(items(ev, name, subject)?),
        "unique" => {
            let mut seen: Vec<Value> = Vec::new();
            for item in items(ev, name, subject)? {
                if !seen.iter().any(|s| s.loose_eq(&item)) {
                    seen.push(item);
                }
            }
            Value::List(seen)
        }
        "replace" => {
            let old = arg(args, kwargs, 0, "old")
                .map(text)
                .ok_or_else(|| ParadoxError::Eval("replace needs the text to replace".into()))?;
            let new = arg(args, kwargs, 1, "new").map(text).unwrap_or_default();
            let source = text(&subject);
            let limit = match arg(args, kwargs, 2, "count").and_then(Value::as_i64) {
                Some(n) if n >= 0 => n as usize,
                _ => usize::MAX,
            };
            let hits = source.matches(old.as_str()).take(limit).count();
            ensure_fits(
                ev,
                (source.len() - hits * old.len()).saturating_add(hits.saturating_mul(new.len())),
            )?;
            Value::Str(source.replacen(&old, &new, limit))
        }
        other => return Err(ParadoxError::Eval(format!("no filter named '{}'", other))),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use crate::clock::Clock;
    use crate::error::ParadoxError;
    use crate::store::{MemoryStore, Store};
    use crate::wildcard::eval::{Evaluator, Scope};
    use crate::wildcard::grammar::parse_expression;
    use crate::wildcard::value::Value;
    use crate::world::Vessel;

    fn world() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.put(Vessel::create(1, "library", None, None).unwrap());
        store.put(Vessel::create(2, "residences", Some(1), None).unwrap());
        store.put(Vessel::create(3, "blue house", Some(2), None).unwrap());
        store.put(Vessel::create(4, "old tower", Some(2), None).unwrap());
        store
    }

    fn eval(store: &MemoryStore, src: &str) -> crate::error::Result<Value> {
        let scope = Scope {
            vessel: Some(2),
            location: Some(1),
            target: None,
        };
        let ev = Evaluator::new(store, Clock::with_offset_hours(0).unwrap(), scope);
        ev.evaluate(&parse_expression(src)?)
    }

    fn string(store: &MemoryStore, src: &str) -> String {
        match eval(store, src).unwrap() {
            Value::Str(s) => s,
            other => panic!("Expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_map_join() {
        let store = world();
        assert_eq!(
            string(
                &store,
                "find('residences').children|map(attribute='full_name')|join(', ')"
            ),
            "blue house, old tower"
        );
        assert_eq!(
            string(&store, "vessel.children|join('/', attribute='name')"),
            "house/tower"
        );
    }

    #[test]
    fn test_lformat() {
        let store = world();
        assert_eq!(
            string(
                &store,
                "vessel.children|map(attribute='name')|lformat('- {}')|join(' ')"
            ),
            "- house - tower"
        );
    }

    #[test]
    fn test_sequences() {
        let store = world();
        assert_eq!(eval(&store, "[3, 1, 2]|sort").unwrap(), eval(&store, "[1, 2, 3]").unwrap());
        assert_eq!(eval(&store, "[3, 1, 2]|sort(true)|first").unwrap(), Value::Int(3));
        assert_eq!(eval(&store, "[1, 2, 3]|sum").unwrap(), Value::Int(6));
        assert_eq!(eval(&store, "'abc'|reverse").unwrap(), Value::Str("cba".into()));
        assert_eq!(eval(&store, "vessel.children|length").unwrap(), Value::Int(2));
        assert_eq!(eval(&store, "[1, 1, 2]|unique|count").unwrap(), Value::Int(2));
        assert_eq!(eval(&store, "[]|last").unwrap(), Value::None);
        assert!(eval(&store, "[1, 'a']|sort").is_err());
    }

    #[test]
    fn test_strings_and_numbers() {
        let store = world();
        assert_eq!(string(&store, "'hello world'|title"), "Hello World");
        assert_eq!(string(&store, "'hELLO'|capitalize"), "Hello");
        assert_eq!(string(&store, "'  x '|trim|upper"), "X");
        assert_eq!(string(&store, "'a-b-c'|replace('-', '+', 1)"), "a+b-c");
        assert_eq!(eval(&store, "'42'|int + 1").unwrap(), Value::Int(43));
        assert_eq!(eval(&store, "'x'|int(7)").unwrap(), Value::Int(7));
        assert_eq!(eval(&store, "-3|abs").unwrap(), Value::Int(-3));
        assert_eq!(eval(&store, "(-3)|abs").unwrap(), Value::Int(3));
        assert_eq!(eval(&store, "2.567|round(2)").unwrap(), Value::Float(2.57));
        assert_eq!(string(&store, "none|default('empty')"), "empty");
        assert_eq!(string(&store, "''|default('empty', true)"), "empty");
    }

    #[test]
    fn test_growth_stops_at_ceiling() {
        let store = world();
        let grow = "|replace('x', 'xxxxxxxxxx')";
        let four = format!("('x'{})|length", grow.repeat(4));
        assert_eq!(eval(&store, &four).unwrap(), Value::Int(10_000));
        match eval(&store, &format!("('x'{})|length", grow.repeat(5))) {
            Err(ParadoxError::Eval(msg)) => {
                assert_eq!(msg, "result of 100000 bytes exceeds the 16384 byte limit")
            }
            other => panic!("Expected size error, got {:?}", other),
        }
        let wide = format!("'{}'|lformat('{{}}{{}}')", "y".repeat(9000));
        assert!(matches!(eval(&store, &wide), Err(ParadoxError::Eval(_))));
        let joined = format!("'{}'|join('{}')", "z".repeat(200), "-".repeat(100));
        assert!(matches!(eval(&store, &joined), Err(ParadoxError::Eval(_))));
    }

    #[test]
    fn test_unknown_filter() {
        let store = world();
        match eval(&store, "vessel|attr('__class__')") {
            Err(ParadoxError::Eval(msg)) => assert!(msg.contains("attr")),
            other => panic!("Expected unknown filter error, got {:?}", other),
        }
        assert_eq!(store.count(), 4);
    }
}
