//! Pest grammar parser for wildcard expressions

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use crate::error::{ParadoxError, Result};
use crate::wildcard::ast::*;

#[derive(Parser)]
#[grammar = "../grammar/wildcard.pest"]
pub struct WildcardParser;

/// Parse the text between `<(` and `)>` into an expression.
pub fn parse_expression(input: &str) -> Result<Expr> {
    let pairs = WildcardParser::parse(Rule::wildcard, input)
        .map_err(|e| ParadoxError::Parse(e.to_string()))?;

    let wildcard = pairs
        .into_iter()
        .next()
        .ok_or_else(|| ParadoxError::Parse("Empty expression".to_string()))?;

    let expr = next(&mut wildcard.into_inner(), "expression")?;
    parse_expr(expr)
}

fn next<'i>(pairs: &mut impl Iterator<Item = Pair<'i, Rule>>, what: &str) -> Result<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| ParadoxError::Parse(format!("Expected {}", what)))
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_and | Rule::kw_or | Rule::kw_not | Rule::kw_in | Rule::kw_if | Rule::kw_else
    )
}

/// Inner pairs with the keyword tokens dropped.
fn significant<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

// ============================================================================
// Boolean layer
// ============================================================================

fn parse_expr(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = significant(pair);
    let then = parse_or(next(&mut inner, "expression")?)?;

    let Some(test) = inner.next() else {
        return Ok(then);
    };
    let test = parse_or(test)?;
    let otherwise = inner.next().map(parse_expr).transpose()?.map(Box::new);

    Ok(Expr::Cond {
        then: Box::new(then),
        test: Box::new(test),
        otherwise,
    })
}

fn parse_or(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = significant(pair);
    let mut left = parse_and(next(&mut inner, "operand of 'or'")?)?;
    for right in inner {
        left = Expr::Or(Box::new(left), Box::new(parse_and(right)?));
    }
    Ok(left)
}

fn parse_and(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = significant(pair);
    let mut left = parse_not(next(&mut inner, "operand of 'and'")?)?;
    for right in inner {
        left = Expr::And(Box::new(left), Box::new(parse_not(right)?));
    }
    Ok(left)
}

fn parse_not(pair: Pair<Rule>) -> Result<Expr> {
    let inner = next(&mut significant(pair), "operand of 'not'")?;
    match inner.as_rule() {
        Rule::not_expr => Ok(Expr::Not(Box::new(parse_not(inner)?))),
        Rule::comparison => parse_comparison(inner),
        rule => Err(ParadoxError::Parse(format!("Unexpected rule: {:?}", rule))),
    }
}

fn parse_comparison(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let first = parse_concat(next(&mut inner, "comparison operand")?)?;

    let mut rest = Vec::new();
    while let Some(op) = inner.next() {
        let op = parse_cmp_op(op)?;
        let operand = parse_concat(next(&mut inner, "right side of comparison")?)?;
        rest.push((op, operand));
    }

    if rest.is_empty() {
        Ok(first)
    } else {
        Ok(Expr::Compare(Box::new(first), rest))
    }
}

fn parse_cmp_op(pair: Pair<Rule>) -> Result<CmpOp> {
    let op = pair.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
    match op.as_str() {
        "==" => Ok(CmpOp::Eq),
        "!=" => Ok(CmpOp::Ne),
        "<" => Ok(CmpOp::Lt),
        "<=" => Ok(CmpOp::Le),
        ">" => Ok(CmpOp::Gt),
        ">=" => Ok(CmpOp::Ge),
        "in" => Ok(CmpOp::In),
        "not in" => Ok(CmpOp::NotIn),
        _ => Err(ParadoxError::Parse(format!("Unknown operator: {}", op))),
    }
}

// ============================================================================
// Arithmetic layer
// ============================================================================

fn parse_concat(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let mut left = parse_additive(next(&mut inner, "operand of '~'")?)?;
    for right in inner {
        left = Expr::Binary(BinOp::Concat, Box::new(left), Box::new(parse_additive(right)?));
    }
    Ok(left)
}

/// Fold `operand (op operand)*` left to right.
fn fold_binary(
    mut inner: Pairs<Rule>,
    operand: fn(Pair<Rule>) -> Result<Expr>,
) -> Result<Expr> {
    let mut left = operand(next(&mut inner, "operand")?)?;
    while let Some(op) = inner.next() {
        let op = match op.as_str() {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "//" => BinOp::FloorDiv,
            "%" => BinOp::Mod,
            "**" => BinOp::Pow,
            other => return Err(ParadoxError::Parse(format!("Unknown operator: {}", other))),
        };
        let right = operand(next(&mut inner, "right operand")?)?;
        left = Expr::Binary(op, Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_additive(pair: Pair<Rule>) -> Result<Expr> {
    fold_binary(pair.into_inner(), parse_term)
}

fn parse_term(pair: Pair<Rule>) -> Result<Expr> {
    fold_binary(pair.into_inner(), parse_power)
}

fn parse_power(pair: Pair<Rule>) -> Result<Expr> {
    fold_binary(pair.into_inner(), parse_unary)
}

fn parse_unary(pair: Pair<Rule>) -> Result<Expr> {
    let mut negations = 0;
    let mut operand = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::neg_op => negations += 1,
            Rule::filtered => operand = Some(parse_filtered(inner)?),
            rule => return Err(ParadoxError::Parse(format!("Unexpected rule: {:?}", rule))),
        }
    }
    let mut expr = operand.ok_or_else(|| ParadoxError::Parse("Expected operand".to_string()))?;
    for _ in 0..negations {
        expr = Expr::Neg(Box::new(expr));
    }
    Ok(expr)
}

// ============================================================================
// Postfix layer
// ============================================================================

fn parse_filtered(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = parse_postfix(next(&mut inner, "filter subject")?)?;
    for filter in inner {
        let mut parts = filter.into_inner();
        let name = next(&mut parts, "filter name")?.as_str().to_string();
        let args = match parts.next() {
            Some(args) => parse_call_args(args)?,
            None => Vec::new(),
        };
        expr = Expr::Filter(Box::new(expr), name, args);
    }
    Ok(expr)
}

fn parse_postfix(pair: Pair<Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = parse_primary(next(&mut inner, "primary expression")?)?;
    for suffix in inner {
        expr = match suffix.as_rule() {
            Rule::attr_access => {
                let key = next(&mut suffix.into_inner(), "attribute name")?;
                Expr::Attr(Box::new(expr), key.as_str().to_string())
            }
            Rule::subscript => {
                let key = next(&mut suffix.into_inner(), "subscript")?;
                Expr::Index(Box::new(expr), Box::new(parse_expr(key)?))
            }
            Rule::call_args => Expr::Call(Box::new(expr), parse_call_args(suffix)?),
            rule => return Err(ParadoxError::Parse(format!("Unexpected rule: {:?}", rule))),
        };
    }
    Ok(expr)
}

fn parse_call_args(pair: Pair<Rule>) -> Result<Vec<Arg>> {
    let mut args = Vec::new();
    for arg in pair.into_inner() {
        let inner = next(&mut arg.into_inner(), "argument")?;
        match inner.as_rule() {
            Rule::kwarg => {
                let mut parts = inner.into_inner();
                let name = next(&mut parts, "argument name")?.as_str().to_string();
                let value = parse_expr(next(&mut parts, "argument value")?)?;
                args.push(Arg {
                    name: Some(name),
                    value,
                });
            }
            _ => args.push(Arg {
                name: None,
                value: parse_expr(inner)?,
            }),
        }
    }
    Ok(args)
}

fn parse_primary(pair: Pair<Rule>) -> Result<Expr> {
    let inner = next(&mut pair.into_inner(), "primary expression")?;
    match inner.as_rule() {
        Rule::literal => Ok(Expr::Literal(parse_literal(inner)?)),
        Rule::list => inner
            .into_inner()
            .map(parse_expr)
            .collect::<Result<Vec<_>>>()
            .map(Expr::List),
        Rule::ident => Ok(Expr::Name(inner.as_str().to_string())),
        Rule::expr => parse_expr(inner),
        rule => Err(ParadoxError::Parse(format!("Unexpected rule: {:?}", rule))),
    }
}

// ============================================================================
// Literals
// ============================================================================

fn parse_literal(pair: Pair<Rule>) -> Result<Literal> {
    let inner = next(&mut pair.into_inner(), "literal")?;
    match inner.as_rule() {
        Rule::int => inner
            .as_str()
            .parse()
            .map(Literal::Int)
            .map_err(|_| ParadoxError::Parse(format!("Invalid integer: {}", inner.as_str()))),
        Rule::float => inner
            .as_str()
            .parse()
            .map(Literal::Float)
            .map_err(|_| ParadoxError::Parse(format!("Invalid number: {}", inner.as_str()))),
        Rule::boolean => Ok(Literal::Bool(inner.as_str().eq_ignore_ascii_case("true"))),
        Rule::none => Ok(Literal::None),
        Rule::string => {
            let body = inner.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
            Ok(Literal::Str(unescape(body)))
        }
        rule => Err(ParadoxError::Parse(format!("Invalid literal: {:?}", rule))),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Expr {
        Expr::Literal(Literal::Int(n))
    }

    #[test]
    fn test_parse_attribute_chain() {
        let expr = parse_expression("vessel.parent.name").unwrap();
        match expr {
            Expr::Attr(base, key) => {
                assert_eq!(key, "name");
                assert_eq!(*base, Expr::Attr(Box::new(Expr::Name("vessel".into())), "parent".into()));
            }
            _ => panic!("Expected attribute access"),
        }
    }

    #[test]
    fn test_parse_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinOp::Add,
                Box::new(int(1)),
                Box::new(Expr::Binary(BinOp::Mul, Box::new(int(2)), Box::new(int(3))))
            )
        );
    }

    #[test]
    fn test_parse_power_and_floor_div() {
        match parse_expression("2 ** 10 // 3").unwrap() {
            Expr::Binary(BinOp::FloorDiv, left, _) => match *left {
                Expr::Binary(BinOp::Pow, _, _) => {}
                other => panic!("Expected power, got {:?}", other),
            },
            other => panic!("Expected floor division, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_filters_with_kwargs() {
        let expr =
            parse_expression("find('residences').children|map(attribute='full_name')|join(', ')")
                .unwrap();
        match expr {
            Expr::Filter(base, name, args) => {
                assert_eq!(name, "join");
                assert_eq!(args.len(), 1);
                match *base {
                    Expr::Filter(_, inner, inner_args) => {
                        assert_eq!(inner, "map");
                        assert_eq!(inner_args[0].name.as_deref(), Some("attribute"));
                    }
                    _ => panic!("Expected map filter"),
                }
            }
            _ => panic!("Expected join filter"),
        }
    }

    #[test]
    fn test_parse_conditional_with_membership() {
        let expr = parse_expression(
            "'warp '~vessel.random.id if ('warpgate key' in vessel.children|map(attribute='full_name')) else 'print no key'",
        )
        .unwrap();
        match expr {
            Expr::Cond {
                then,
                test,
                otherwise,
            } => {
                assert!(matches!(*then, Expr::Binary(BinOp::Concat, _, _)));
                match *test {
                    Expr::Compare(_, ref rest) => assert_eq!(rest[0].0, CmpOp::In),
                    _ => panic!("Expected membership test"),
                }
                assert!(otherwise.is_some());
            }
            _ => panic!("Expected conditional"),
        }
    }

    #[test]
    fn test_parse_not_in_and_logic() {
        let expr = parse_expression("not a and b not in c or true").unwrap();
        match expr {
            Expr::Or(left, right) => {
                assert_eq!(*right, Expr::Literal(Literal::Bool(true)));
                match *left {
                    Expr::And(l, r) => {
                        assert!(matches!(*l, Expr::Not(_)));
                        match *r {
                            Expr::Compare(_, rest) => assert_eq!(rest[0].0, CmpOp::NotIn),
                            _ => panic!("Expected not in"),
                        }
                    }
                    _ => panic!("Expected and"),
                }
            }
            _ => panic!("Expected or"),
        }
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_expression("None").unwrap(), Expr::Literal(Literal::None));
        assert_eq!(parse_expression("TRUE").unwrap(), Expr::Literal(Literal::Bool(true)));
        assert_eq!(parse_expression("2.5").unwrap(), Expr::Literal(Literal::Float(2.5)));
        assert_eq!(
            parse_expression(r#""a\"b""#).unwrap(),
            Expr::Literal(Literal::Str("a\"b".into()))
        );
        assert_eq!(
            parse_expression("[1, 2,]").unwrap(),
            Expr::List(vec![int(1), int(2)])
        );
        assert_eq!(parse_expression("-3").unwrap(), Expr::Neg(Box::new(int(3))));
    }

    #[test]
    fn test_parse_keyword_prefix_identifiers() {
        assert_eq!(parse_expression("index").unwrap(), Expr::Name("index".into()));
        assert_eq!(parse_expression("nonesuch").unwrap(), Expr::Name("nonesuch".into()));
    }

    #[test]
    fn test_parse_errors() {
        match parse_expression("vessel.") {
            Err(ParadoxError::Parse(_)) => {}
            other => panic!("Expected parse error, got {:?}", other),
        }
        assert!(parse_expression("").is_err());
        assert!(parse_expression("1 +").is_err());
    }

    #[test]
    fn test_free_names() {
        let expr = parse_expression("vessel.name if secret else find(other)|length").unwrap();
        let names: Vec<_> = expr.free_names().into_iter().collect();
        assert_eq!(names, vec!["find", "other", "secret", "vessel"]);
    }
}
