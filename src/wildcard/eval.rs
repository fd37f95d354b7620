//! Wildcard expression evaluator

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::clock::Clock;
use crate::error::{ParadoxError, Result};
use crate::store::Store;
use crate::wildcard::ast::*;
use crate::wildcard::filters;
use crate::wildcard::value::{undefined, Builtin, Exposed, GhostView, Value, VESSEL_KEYS};
use crate::world::forum;
use crate::world::{Graph, Vessel, VesselId};

/// Largest magnitude either side of `**` may have.
pub const MAX_POWER_OPERAND: f64 = 1024.0;

/// Most bytes of text one expression or rendered line may hold.
pub const DEFAULT_MAX_TEXT_SIZE: usize = 16_384;

/// Names always bound in wildcard text. `target` joins them while casting.
pub const GLOBALS: [&str; 10] = [
    "vessel",
    "location",
    "universe",
    "atlas",
    "spells",
    "tunnels",
    "time",
    "nataniev",
    "find",
    "target",
];

/// Who is asking: the acting vessel, where it stands, and the cast target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub vessel: Option<VesselId>,
    pub location: Option<VesselId>,
    pub target: Option<VesselId>,
}

impl Scope {
    pub fn is_bound(&self, name: &str) -> bool {
        match name {
            "target" => self.target.is_some(),
            _ => GLOBALS.contains(&name),
        }
    }
}

pub struct Evaluator<'a> {
    graph: Graph<'a>,
    clock: Clock,
    scope: Scope,
    max_text_size: usize,
}

/// A vessel seen through its closed key set.
pub struct VesselView<'g, 'a> {
    graph: &'g Graph<'a>,
    clock: &'g Clock,
    vessel: Vessel,
}

fn vessels(list: Vec<Vessel>) -> Value {
    Value::List(list.into_iter().map(|v| Value::Vessel(v.id())).collect())
}

fn vessel_or_none(v: Option<Vessel>) -> Value {
    v.map_or(Value::None, |v| Value::Vessel(v.id()))
}

impl Exposed for VesselView<'_, '_> {
    fn lookup(&self, key: &str) -> Result<Value> {
        if !VESSEL_KEYS.contains(&key) {
            return Err(undefined(key));
        }
        let g = self.graph;
        let v = &self.vessel;
        let value = match key {
            "id" => Value::Int(v.id()),
            "name" => Value::Str(v.name().to_string()),
            "attr" => Value::Str(v.attr().to_string()),
            "note" => Value::Str(g.note(v)),
            "raw_note" => Value::Str(v.raw_note().to_string()),
            "program" => Value::Str(v.program().to_string()),
            "parent" => vessel_or_none(g.parent(v)),
            "owner" => vessel_or_none(g.owner(v)),
            "parent_id" => Value::Int(v.parent_id()),
            "owner_id" => Value::Int(v.owner_id()),
            "created" => Value::Str(self.clock.to_str(v.created())),
            "locked" => Value::Bool(v.is_locked()),
            "hidden" => Value::Bool(v.is_hidden()),
            "silent" => Value::Bool(v.is_silent()),
            "tunnel" => Value::Bool(v.is_tunnel()),
            "paradox" | "is_paradox" => Value::Bool(v.is_paradox()),
            "children" => vessels(g.children(v)),
            "siblings" => vessels(g.siblings(v)),
            "visible" => vessels(g.visible(v)),
            "owned" => {
                let id = v.id();
                vessels(g.store().find(&|c| c.owner_id() == id && c.id() != id))
            }
            "num_children" => Value::Int(g.children(v).len() as i64),
            "num_siblings" => Value::Int(g.siblings(v).len() as i64),
            "num_visible" => Value::Int(g.visible(v).len() as i64),
            "stem" => Value::Vessel(g.stem(v).id()),
            "depth" => Value::Int(g.depth(v) as i64),
            "rating" => Value::Int(i64::from(g.rating(v))),
            "full_name" => Value::Str(v.full_name()),
            "full_name_with_id" => Value::Str(v.full_name_with_id()),
            "random" => vessel_or_none(g.random()),
            "random_child" => vessel_or_none(g.random_child(v)),
            "forum" => Value::List(
                forum::forum(g.store(), v.id())
                    .into_iter()
                    .map(|m| {
                        let mut entry = BTreeMap::new();
                        entry.insert("id".to_string(), Value::Int(m.id()));
                        entry.insert("host_id".to_string(), Value::Int(m.host_id()));
                        entry.insert("from_id".to_string(), Value::Int(m.from_id()));
                        entry.insert("message".to_string(), Value::Str(m.text().to_string()));
                        entry.insert(
                            "timestamp".to_string(),
                            Value::Str(self.clock.to_str(m.timestamp())),
                        );
                        Value::Map(entry)
                    })
                    .collect(),
            ),
            _ => return Err(undefined(key)),
        };
        Ok(value)
    }
}

fn type_error(op: &str, l: &Value, r: &Value) -> ParadoxError {
    ParadoxError::Eval(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op,
        l.type_name(),
        r.type_name()
    ))
}

pub(crate) fn too_large(size: usize, limit: usize) -> ParadoxError {
    ParadoxError::Eval(format!(
        "result of {} bytes exceeds the {} byte limit",
        size, limit
    ))
}

fn overflow() -> ParadoxError {
    ParadoxError::Eval("integer overflow".to_string())
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(store: &'a dyn Store, clock: Clock, scope: Scope) -> Self {
        Self {
            graph: Graph::new(store),
            clock,
            scope,
            max_text_size: DEFAULT_MAX_TEXT_SIZE,
        }
    }

    pub fn with_max_text_size(mut self, max_text_size: usize) -> Self {
        self.max_text_size = max_text_size;
        self
    }

    pub fn max_text_size(&self) -> usize {
        self.max_text_size
    }

    pub fn graph(&self) -> &Graph<'a> {
        &self.graph
    }

    /// Refuse a value carrying more text than the size ceiling.
    pub fn bounded(&self, value: Value) -> Result<Value> {
        let size = value.text_size();
        if size > self.max_text_size {
            return Err(too_large(size, self.max_text_size));
        }
        Ok(value)
    }

    /// Refuse any free identifier outside the bound set before evaluating.
    pub fn check_names(&self, expr: &Expr) -> Result<()> {
        match expr.free_names().into_iter().find(|n| !self.scope.is_bound(n)) {
            Some(name) => Err(undefined(&name)),
            None => Ok(()),
        }
    }

    /// Check then evaluate an expression.
    pub fn evaluate(&self, expr: &Expr) -> Result<Value> {
        self.check_names(expr)?;
        self.eval(expr)
    }

    fn vessel_value(&self, id: Option<VesselId>) -> Value {
        match id.and_then(|id| self.graph.get(id)) {
            Some(v) => Value::Vessel(v.id()),
            None => Value::Ghost,
        }
    }

    fn name(&self, name: &str) -> Result<Value> {
        if !self.scope.is_bound(name) {
            return Err(undefined(name));
        }
        let value = match name {
            "vessel" => self.vessel_value(self.scope.vessel),
            "location" => self.vessel_value(self.scope.location),
            "target" => self.vessel_value(self.scope.target),
            "universe" => vessels(self.graph.universe()),
            "atlas" => vessels(self.graph.atlas()),
            "spells" => vessels(self.graph.spells()),
            "tunnels" => vessels(self.graph.tunnels()),
            "time" => self.clock_facts(&self.clock)?,
            "nataniev" => Value::Builtin(Builtin::Nataniev),
            "find" => Value::Builtin(Builtin::Find),
            _ => return Err(undefined(name)),
        };
        Ok(value)
    }

    fn clock_facts(&self, clock: &Clock) -> Result<Value> {
        let json = serde_json::to_value(clock.now())
            .map_err(|e| ParadoxError::Eval(format!("clock facts: {}", e)))?;
        Ok(Value::from_json(json))
    }

    /// The mediated key lookup shared by `a.b` and `a[b]`.
    pub fn lookup(&self, base: &Value, key: &Value) -> Result<Value> {
        let key = match key {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            other => return Err(undefined(&self.render(other))),
        };
        match base {
            Value::Vessel(id) => match self.graph.get(*id) {
                Some(vessel) => VesselView {
                    graph: &self.graph,
                    clock: &self.clock,
                    vessel,
                }
                .lookup(&key),
                None => GhostView.lookup(&key),
            },
            Value::Ghost => GhostView.lookup(&key),
            Value::Map(map) => map.lookup(&key),
            Value::List(items) => items.lookup(&key),
            Value::Str(s) => {
                let chars: Vec<Value> = s.chars().map(|c| Value::Str(c.to_string())).collect();
                chars.lookup(&key)
            }
            _ => Err(undefined(&key)),
        }
    }

    pub fn call(&self, callee: &Value, args: &[Value]) -> Result<Value> {
        let Value::Builtin(builtin) = callee else {
            return Err(ParadoxError::Eval(format!(
                "'{}' object is not callable",
                callee.type_name()
            )));
        };
        let [arg] = args else {
            return Err(ParadoxError::Eval(format!(
                "{:?} takes exactly one argument",
                builtin
            )));
        };
        match builtin {
            Builtin::Find => {
                let text = match arg {
                    Value::Int(n) => n.to_string(),
                    other => self.render(other),
                };
                Ok(vessel_or_none(self.graph.find_distant(&text)))
            }
            Builtin::Nataniev => {
                let hours = arg
                    .as_i64()
                    .or_else(|| arg.as_f64().map(|f| f as i64))
                    .ok_or_else(|| ParadoxError::Eval("nataniev expects an hour offset".into()))?;
                self.clock_facts(&Clock::with_offset_hours(hours)?)
            }
        }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::Str(s.clone()),
            }),
            Expr::List(items) => items
                .iter()
                .map(|e| self.eval(e))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Expr::Name(name) => self.name(name),
            Expr::Attr(base, key) => {
                let base = self.eval(base)?;
                self.lookup(&base, &Value::Str(key.clone()))
            }
            Expr::Index(base, key) => {
                let base = self.eval(base)?;
                let key = self.eval(key)?;
                self.lookup(&base, &key)
            }
            Expr::Call(callee, args) => {
                let callee = self.eval(callee)?;
                if args.iter().any(|a| a.name.is_some()) {
                    return Err(ParadoxError::Eval(
                        "keyword arguments are only accepted by filters".into(),
                    ));
                }
                let args = args
                    .iter()
                    .map(|a| self.eval(&a.value))
                    .collect::<Result<Vec<_>>>()?;
                self.call(&callee, &args)
            }
            Expr::Filter(base, name, args) => {
                let subject = self.eval(base)?;
                let mut positional = Vec::new();
                let mut named = BTreeMap::new();
                for arg in args {
                    let value = self.eval(&arg.value)?;
                    match &arg.name {
                        Some(n) => {
                            named.insert(n.clone(), value);
                        }
                        None => positional.push(value),
                    }
                }
                filters::apply(self, name, subject, &positional, &named)
                    .and_then(|v| self.bounded(v))
            }
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(ParadoxError::Eval(format!(
                    "bad operand type for unary -: '{}'",
                    other.type_name()
                ))),
            },
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.is_truthy())),
            Expr::And(l, r) => {
                let left = self.eval(l)?;
                if left.is_truthy() {
                    self.eval(r)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(l, r) => {
                let left = self.eval(l)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(r)
                }
            }
            Expr::Cond {
                then,
                test,
                otherwise,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(then)
                } else {
                    match otherwise {
                        Some(e) => self.eval(e),
                        None => Ok(Value::Str(String::new())),
                    }
                }
            }
            Expr::Binary(op, l, r) => {
                let left = self.eval(l)?;
                let right = self.eval(r)?;
                self.combine(*op, left, right)
            }
            Expr::Compare(first, rest) => {
                let mut left = self.eval(first)?;
                for (op, e) in rest {
                    let right = self.eval(e)?;
                    if !self.compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
        }
    }

    pub(crate) fn combine(&self, op: BinOp, left: Value, right: Value) -> Result<Value> {
        use Value::{Float, Int};

        if op == BinOp::Concat {
            let text = format!("{}{}", self.render(&left), self.render(&right));
            return self.bounded(Value::Str(text));
        }
        if op == BinOp::Pow {
            return self.power(left, right);
        }

        match (op, &left, &right) {
            (BinOp::Add, Value::Str(a), Value::Str(b)) => {
                return self.bounded(Value::Str(format!("{}{}", a, b)))
            }
            (BinOp::Add, Value::List(a), Value::List(b)) => {
                return self.bounded(Value::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => {}
        }

        if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
            return match op {
                BinOp::Add => a.checked_add(b).map(Int).ok_or_else(overflow),
                BinOp::Sub => a.checked_sub(b).map(Int).ok_or_else(overflow),
                BinOp::Mul => a.checked_mul(b).map(Int).ok_or_else(overflow),
                BinOp::Div if b == 0 => Err(ParadoxError::Eval("division by zero".into())),
                BinOp::Div => Ok(Float(a as f64 / b as f64)),
                BinOp::FloorDiv | BinOp::Mod if b == 0 => {
                    Err(ParadoxError::Eval("integer division or modulo by zero".into()))
                }
                BinOp::FloorDiv => floor_div(a, b).map(Int).ok_or_else(overflow),
                BinOp::Mod => floor_mod(a, b).map(Int).ok_or_else(overflow),
                BinOp::Pow | BinOp::Concat => Err(type_error("operator", &left, &right)),
            };
        }

        let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
            return Err(type_error("arithmetic", &left, &right));
        };
        match op {
            BinOp::Add => Ok(Float(a + b)),
            BinOp::Sub => Ok(Float(a - b)),
            BinOp::Mul => Ok(Float(a * b)),
            BinOp::Div | BinOp::FloorDiv | BinOp::Mod if b == 0.0 => {
                Err(ParadoxError::Eval("float division by zero".into()))
            }
            BinOp::Div => Ok(Float(a / b)),
            BinOp::FloorDiv => Ok(Float((a / b).floor())),
            BinOp::Mod => Ok(Float(a - b * (a / b).floor())),
            BinOp::Pow | BinOp::Concat => Err(type_error("operator", &left, &right)),
        }
    }

    fn power(&self, left: Value, right: Value) -> Result<Value> {
        let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
            return Err(type_error("**", &left, &right));
        };
        if a.abs() > MAX_POWER_OPERAND || b.abs() > MAX_POWER_OPERAND {
            return Err(ParadoxError::Eval(
                "use of the ** operator is restricted to numbers below 1024".into(),
            ));
        }
        match (left.as_i64(), right.as_i64()) {
            (Some(base), Some(exp)) if exp >= 0 => base
                .checked_pow(exp as u32)
                .map(Value::Int)
                .ok_or_else(overflow),
            _ => Ok(Value::Float(a.powf(b))),
        }
    }

    pub(crate) fn compare_order(&self, left: &Value, right: &Value) -> Result<Ordering> {
        match (left, right) {
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            _ => match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => a
                    .partial_cmp(&b)
                    .ok_or_else(|| ParadoxError::Eval("cannot order NaN".into())),
                _ => Err(type_error("comparison", left, right)),
            },
        }
    }

    fn contains(&self, container: &Value, needle: &Value) -> Result<bool> {
        match container {
            Value::List(items) => Ok(items.iter().any(|i| i.loose_eq(needle))),
            Value::Map(map) => Ok(matches!(needle, Value::Str(k) if map.contains_key(k))),
            Value::Str(hay) => match needle {
                Value::Str(n) => Ok(hay.contains(n.as_str())),
                other => Err(type_error("in", other, container)),
            },
            other => Err(ParadoxError::Eval(format!(
                "argument of type '{}' is not iterable",
                other.type_name()
            ))),
        }
    }

    fn compare(&self, op: CmpOp, left: &Value, right: &Value) -> Result<bool> {
        Ok(match op {
            CmpOp::Eq => left.loose_eq(right),
            CmpOp::Ne => !left.loose_eq(right),
            CmpOp::Lt => self.compare_order(left, right)? == Ordering::Less,
            CmpOp::Le => self.compare_order(left, right)? != Ordering::Greater,
            CmpOp::Gt => self.compare_order(left, right)? == Ordering::Greater,
            CmpOp::Ge => self.compare_order(left, right)? != Ordering::Less,
            CmpOp::In => self.contains(right, left)?,
            CmpOp::NotIn => !self.contains(right, left)?,
        })
    }

    fn repr(&self, value: &Value) -> String {
        match value {
            Value::Str(s) => format!("'{}'", s.replace('\'', "\\'")),
            other => self.render(other),
        }
    }

    /// Text form of a value as it lands in the rendered line.
    pub fn render(&self, value: &Value) -> String {
        match value {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.clone(),
            Value::List(items) => format!(
                "[{}]",
                items.iter().map(|i| self.repr(i)).collect::<Vec<_>>().join(", ")
            ),
            Value::Map(map) => format!(
                "{{{}}}",
                map.iter()
                    .map(|(k, v)| format!("'{}': {}", k, self.repr(v)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Value::Vessel(id) => match self.graph.get(*id) {
                Some(v) => v.to_string(),
                None => "<Ghost Vessel>".to_string(),
            },
            Value::Ghost => "<Ghost Vessel>".to_string(),
            Value::Builtin(b) => format!("<function {:?}>", b).to_lowercase(),
        }
    }

    pub(crate) fn trace(&self, source: &str) {
        debug!(source, vessel = ?self.scope.vessel, "evaluating wildcard");
    }
}
