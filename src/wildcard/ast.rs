//! AST for wildcard expressions

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

/// A call or filter argument, optionally named (`attribute='name'`).
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    List(Vec<Expr>),
    Name(String),
    /// `a.b`, resolved through the same lookup as `a['b']`
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Arg>),
    Filter(Box<Expr>, String, Vec<Arg>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Chained comparison: `a < b < c`
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cond {
        then: Box<Expr>,
        test: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },
}

impl Expr {
    /// Every free identifier, including those in branches never taken.
    pub fn free_names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Name(n) => {
                out.insert(n.clone());
            }
            Expr::List(items) => items.iter().for_each(|e| e.collect_names(out)),
            Expr::Attr(base, _) | Expr::Neg(base) | Expr::Not(base) => base.collect_names(out),
            Expr::Index(base, key) => {
                base.collect_names(out);
                key.collect_names(out);
            }
            Expr::Call(base, args) | Expr::Filter(base, _, args) => {
                base.collect_names(out);
                args.iter().for_each(|a| a.value.collect_names(out));
            }
            Expr::Binary(_, l, r) | Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_names(out);
                r.collect_names(out);
            }
            Expr::Compare(first, rest) => {
                first.collect_names(out);
                rest.iter().for_each(|(_, e)| e.collect_names(out));
            }
            Expr::Cond {
                then,
                test,
                otherwise,
            } => {
                then.collect_names(out);
                test.collect_names(out);
                if let Some(e) = otherwise {
                    e.collect_names(out);
                }
            }
        }
    }
}
