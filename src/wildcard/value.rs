//! Runtime values for wildcard evaluation
//!
//! Vessels travel through expressions as bare ids. Reading anything off one
//! goes through [`Exposed::lookup`], which answers only a closed set of keys.

use std::collections::BTreeMap;

use crate::error::{ParadoxError, Result};
use crate::world::VesselId;

/// Keys a vessel answers to from wildcard text.
pub const VESSEL_KEYS: [&str; 32] = [
    "id",
    "name",
    "attr",
    "note",
    "raw_note",
    "program",
    "parent",
    "owner",
    "parent_id",
    "owner_id",
    "created",
    "locked",
    "hidden",
    "silent",
    "tunnel",
    "children",
    "siblings",
    "visible",
    "num_children",
    "num_siblings",
    "num_visible",
    "stem",
    "paradox",
    "depth",
    "rating",
    "full_name",
    "full_name_with_id",
    "random",
    "random_child",
    "forum",
    "is_paradox",
    "owned",
];

/// Host functions callable from wildcard text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Find,
    Nataniev,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Vessel(VesselId),
    Ghost,
    Builtin(Builtin),
}

/// Something wildcard text may read keys from.
pub trait Exposed {
    fn lookup(&self, key: &str) -> Result<Value>;
}

pub fn undefined(key: &str) -> ParadoxError {
    ParadoxError::Undefined(format!("'{}'", key))
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Vessel(_) => "vessel",
            Value::Ghost => "ghost",
            Value::Builtin(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None | Value::Ghost => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Vessel(_) | Value::Builtin(_) => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Structural equality, with ints and floats compared numerically.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            _ => self == other,
        }
    }

    /// Bytes of text held, counting every string nested in lists and maps.
    pub fn text_size(&self) -> usize {
        match self {
            Value::Str(s) => s.len(),
            Value::List(items) => items.iter().map(Value::text_size).sum(),
            Value::Map(map) => map.iter().map(|(k, v)| k.len() + v.text_size()).sum(),
            _ => 0,
        }
    }
}

impl Exposed for BTreeMap<String, Value> {
    fn lookup(&self, key: &str) -> Result<Value> {
        self.get(key).cloned().ok_or_else(|| undefined(key))
    }
}

impl Exposed for Vec<Value> {
    fn lookup(&self, key: &str) -> Result<Value> {
        let index: i64 = key.parse().map_err(|_| undefined(key))?;
        let len = self.len() as i64;
        let index = if index < 0 { index + len } else { index };
        if !(0..len).contains(&index) {
            return Err(ParadoxError::Eval(format!("list index {} out of range", key)));
        }
        Ok(self[index as usize].clone())
    }
}

/// What a ghost answers to.
pub struct GhostView;

impl Exposed for GhostView {
    fn lookup(&self, key: &str) -> Result<Value> {
        match key {
            "name" | "full_name" => Ok(Value::Str("ghost".to_string())),
            "attr" | "note" | "raw_note" | "program" => Ok(Value::Str(String::new())),
            "id" | "parent_id" | "owner_id" | "random" | "random_child" => Ok(Value::None),
            "parent" | "owner" | "stem" => Ok(Value::Ghost),
            "locked" | "hidden" | "silent" | "tunnel" | "paradox" | "is_paradox" => {
                Ok(Value::Bool(false))
            }
            "children" | "siblings" | "visible" | "owned" | "forum" => Ok(Value::List(Vec::new())),
            "num_children" | "num_siblings" | "num_visible" | "depth" | "rating" => Ok(Value::Int(0)),
            _ => Err(undefined(key)),
        }
    }
}
