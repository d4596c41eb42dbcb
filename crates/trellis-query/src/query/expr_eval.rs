// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

//! Expression evaluation over a per-record getter bundle.
//!
//! The bundle exposes only the lookups the current edge record supports;
//! everything an implementation does not override is an error, so a
//! clause evaluated in the wrong position fails instead of guessing.

use crate::query::expr::{ArithOp, Expr, LogicOp, RelOp, UnaryOp};
use trellis_common::core::schema::PropType;
use trellis_common::core::value::Value;
use trellis_common::{Result, TrellisError};

/// Lookup capabilities for one edge record.
///
/// Implementations borrow the record's data for the duration of one
/// evaluation; they never outlive the hop that produced it.
pub trait Getters {
    fn edge_dst_id(&self, edge: &str) -> Result<Value> {
        Err(TrellisError::Semantic {
            message: format!("no edge `{}' in scope here", edge),
        })
    }

    fn src_tag_prop(&self, tag: &str, prop: &str) -> Result<Value> {
        Err(TrellisError::Semantic {
            message: format!("no source vertex in scope for $^.{}.{}", tag, prop),
        })
    }

    fn dst_tag_prop(&self, tag: &str, prop: &str) -> Result<Value> {
        Err(TrellisError::Semantic {
            message: format!("no destination vertex in scope for $$.{}.{}", tag, prop),
        })
    }

    fn alias_prop(&self, edge: &str, prop: &str) -> Result<Value> {
        Err(TrellisError::Semantic {
            message: format!("no edge `{}' in scope for {}.{}", edge, edge, prop),
        })
    }

    fn variable_prop(&self, prop: &str) -> Result<Value> {
        Err(TrellisError::Semantic {
            message: format!("no variable input in scope for ${}", prop),
        })
    }

    fn input_prop(&self, prop: &str) -> Result<Value> {
        Err(TrellisError::Semantic {
            message: format!("no pipe input in scope for $-.{}", prop),
        })
    }
}

/// Evaluation context with no record in scope; FROM-clause literals use it.
pub struct NoGetters;

impl Getters for NoGetters {}

pub fn eval(expr: &Expr, getters: &dyn Getters) -> Result<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Unary { op, operand } => eval_unary(*op, eval(operand, getters)?),
        Expr::Arithmetic { left, op, right } => {
            eval_arithmetic(eval(left, getters)?, *op, eval(right, getters)?)
        }
        Expr::Relational { left, op, right } => {
            eval_relational(&eval(left, getters)?, *op, &eval(right, getters)?)
        }
        Expr::Logical { left, op, right } => {
            let l = eval(left, getters)?.as_bool()?;
            // Both sides evaluate; a logical clause must not hide a bad
            // operand behind short-circuiting.
            let r = eval(right, getters)?.as_bool()?;
            Ok(Value::Bool(match op {
                LogicOp::And => l && r,
                LogicOp::Or => l || r,
            }))
        }
        Expr::FunctionCall { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, getters)?);
            }
            eval_function(name, &values)
        }
        Expr::TypeCast { target, operand } => eval_type_cast(*target, eval(operand, getters)?),
        Expr::EdgeDstId { edge } => getters.edge_dst_id(edge),
        Expr::EdgeSrcId { edge } => getters.alias_prop(edge, trellis_common::core::schema::SRC),
        Expr::EdgeRank { edge } => getters.alias_prop(edge, trellis_common::core::schema::RANK),
        Expr::EdgeTypeId { edge } => getters.alias_prop(edge, trellis_common::core::schema::TYPE),
        Expr::AliasProp { edge, prop } => getters.alias_prop(edge, prop),
        Expr::SrcTagProp { tag, prop } => getters.src_tag_prop(tag, prop),
        Expr::DstTagProp { tag, prop } => getters.dst_tag_prop(tag, prop),
        Expr::VariableProp { prop, .. } => getters.variable_prop(prop),
        Expr::InputProp { prop } => getters.input_prop(prop),
    }
}

fn eval_unary(op: UnaryOp, v: Value) -> Result<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!v.as_bool()?)),
        UnaryOp::Negate => match v {
            Value::Int(i) => Ok(Value::Int(-i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(TrellisError::Type {
                expected: "numeric".to_string(),
                actual: other.kind().to_string(),
            }),
        },
    }
}

fn eval_arithmetic(left: Value, op: ArithOp, right: Value) -> Result<Value> {
    // String concatenation is the one non-numeric arithmetic form.
    if op == ArithOp::Add
        && let (Value::Str(l), Value::Str(r)) = (&left, &right)
    {
        return Ok(Value::Str(format!("{}{}", l, r)));
    }

    if let (Value::Int(l), Value::Int(r)) = (&left, &right) {
        let (l, r) = (*l, *r);
        return match op {
            ArithOp::Add => Ok(Value::Int(l.wrapping_add(r))),
            ArithOp::Sub => Ok(Value::Int(l.wrapping_sub(r))),
            ArithOp::Mul => Ok(Value::Int(l.wrapping_mul(r))),
            ArithOp::Div | ArithOp::Mod if r == 0 => Err(TrellisError::Data {
                message: "division by zero".to_string(),
            }),
            ArithOp::Div => Ok(Value::Int(l / r)),
            ArithOp::Mod => Ok(Value::Int(l % r)),
        };
    }

    let (l, r) = (left.as_float()?, right.as_float()?);
    match op {
        ArithOp::Add => Ok(Value::Float(l + r)),
        ArithOp::Sub => Ok(Value::Float(l - r)),
        ArithOp::Mul => Ok(Value::Float(l * r)),
        ArithOp::Div => Ok(Value::Float(l / r)),
        ArithOp::Mod => Ok(Value::Float(l % r)),
    }
}

fn eval_relational(left: &Value, op: RelOp, right: &Value) -> Result<Value> {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (Value::Int(l), Value::Int(r)) => l.cmp(r),
        (Value::Str(l), Value::Str(r)) => l.cmp(r),
        (Value::Bool(l), Value::Bool(r)) => {
            return match op {
                RelOp::Eq => Ok(Value::Bool(l == r)),
                RelOp::NotEq => Ok(Value::Bool(l != r)),
                _ => Err(TrellisError::Type {
                    expected: "ordered operands".to_string(),
                    actual: "bool".to_string(),
                }),
            };
        }
        _ => {
            let (l, r) = (left.as_float()?, right.as_float()?);
            l.partial_cmp(&r).ok_or_else(|| TrellisError::Data {
                message: "cannot compare NaN".to_string(),
            })?
        }
    };

    Ok(Value::Bool(match op {
        RelOp::Eq => ordering == Ordering::Equal,
        RelOp::NotEq => ordering != Ordering::Equal,
        RelOp::Lt => ordering == Ordering::Less,
        RelOp::LtEq => ordering != Ordering::Greater,
        RelOp::Gt => ordering == Ordering::Greater,
        RelOp::GtEq => ordering != Ordering::Less,
    }))
}

fn eval_type_cast(target: PropType, v: Value) -> Result<Value> {
    match target {
        PropType::Int | PropType::Vid => match v {
            Value::Int(i) => Ok(Value::Int(i)),
            Value::Float(f) => Ok(Value::Int(f as i64)),
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                TrellisError::Type {
                    expected: "int".to_string(),
                    actual: format!("string \"{}\"", s),
                }
            }),
            _ => unreachable!("Value has no other variants"),
        },
        PropType::Float | PropType::Double => match v {
            Value::Int(i) => Ok(Value::Float(i as f64)),
            Value::Float(f) => Ok(Value::Float(f)),
            Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                TrellisError::Type {
                    expected: "double".to_string(),
                    actual: format!("string \"{}\"", s),
                }
            }),
            other => Err(TrellisError::Type {
                expected: "numeric".to_string(),
                actual: other.kind().to_string(),
            }),
        },
        PropType::Bool => Ok(Value::Bool(v.as_bool()?)),
        PropType::String => Ok(Value::Str(v.to_string())),
        other => Err(TrellisError::Unimplemented {
            feature: format!("cast to {}", other),
        }),
    }
}

/// The fixed built-in function set.
fn eval_function(name: &str, args: &[Value]) -> Result<Value> {
    match name {
        // `near' resolves in the FROM clause, where its comma-joined id
        // list is split into start vertices; elsewhere it is identity.
        "near" => one_arg(name, args)?.as_str().map(|s| Value::Str(s.to_string())),
        "abs" => match one_arg(name, args)? {
            Value::Int(i) => Ok(Value::Int(i.abs())),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            other => Err(TrellisError::Type {
                expected: "numeric".to_string(),
                actual: other.kind().to_string(),
            }),
        },
        "floor" => Ok(Value::Float(one_arg(name, args)?.as_float()?.floor())),
        "ceil" => Ok(Value::Float(one_arg(name, args)?.as_float()?.ceil())),
        "upper" => Ok(Value::Str(one_arg(name, args)?.as_str()?.to_uppercase())),
        "lower" => Ok(Value::Str(one_arg(name, args)?.as_str()?.to_lowercase())),
        other => Err(TrellisError::Semantic {
            message: format!("unknown function `{}'", other),
        }),
    }
}

fn one_arg<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value> {
    if args.len() != 1 {
        return Err(TrellisError::Semantic {
            message: format!("{}() requires 1 argument", name),
        });
    }
    Ok(&args[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(left: Expr, op: RelOp, right: Expr) -> Expr {
        Expr::Relational {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    #[test]
    fn test_arithmetic() {
        let e = Expr::Arithmetic {
            left: Box::new(Expr::literal(6i64)),
            op: ArithOp::Mul,
            right: Box::new(Expr::literal(7i64)),
        };
        assert_eq!(eval(&e, &NoGetters).unwrap(), Value::Int(42));

        let e = Expr::Arithmetic {
            left: Box::new(Expr::literal(1i64)),
            op: ArithOp::Add,
            right: Box::new(Expr::literal(0.5)),
        };
        assert_eq!(eval(&e, &NoGetters).unwrap(), Value::Float(1.5));

        let e = Expr::Arithmetic {
            left: Box::new(Expr::literal(1i64)),
            op: ArithOp::Div,
            right: Box::new(Expr::literal(0i64)),
        };
        assert!(eval(&e, &NoGetters).is_err());
    }

    #[test]
    fn test_relational_and_logical() {
        let gt = rel(Expr::literal(5i64), RelOp::Gt, Expr::literal(3i64));
        assert_eq!(eval(&gt, &NoGetters).unwrap(), Value::Bool(true));

        let mixed = rel(Expr::literal(2i64), RelOp::LtEq, Expr::literal(2.0));
        assert_eq!(eval(&mixed, &NoGetters).unwrap(), Value::Bool(true));

        let and = Expr::Logical {
            left: Box::new(gt),
            op: LogicOp::And,
            right: Box::new(rel(
                Expr::literal("a"),
                RelOp::Lt,
                Expr::literal("b"),
            )),
        };
        assert_eq!(eval(&and, &NoGetters).unwrap(), Value::Bool(true));

        let bad = rel(Expr::literal("a"), RelOp::Lt, Expr::literal(1i64));
        assert!(eval(&bad, &NoGetters).is_err());
    }

    #[test]
    fn test_type_cast() {
        let e = Expr::TypeCast {
            target: PropType::Int,
            operand: Box::new(Expr::literal(" 12 ")),
        };
        assert_eq!(eval(&e, &NoGetters).unwrap(), Value::Int(12));

        let e = Expr::TypeCast {
            target: PropType::String,
            operand: Box::new(Expr::literal(7i64)),
        };
        assert_eq!(eval(&e, &NoGetters).unwrap(), Value::Str("7".to_string()));

        let e = Expr::TypeCast {
            target: PropType::Timestamp,
            operand: Box::new(Expr::literal(7i64)),
        };
        assert!(matches!(
            eval(&e, &NoGetters),
            Err(TrellisError::Unimplemented { .. })
        ));
    }

    #[test]
    fn test_functions() {
        let e = Expr::FunctionCall {
            name: "abs".to_string(),
            args: vec![Expr::literal(-3i64)],
        };
        assert_eq!(eval(&e, &NoGetters).unwrap(), Value::Int(3));

        let e = Expr::FunctionCall {
            name: "upper".to_string(),
            args: vec![Expr::literal("go")],
        };
        assert_eq!(eval(&e, &NoGetters).unwrap(), Value::Str("GO".to_string()));

        let e = Expr::FunctionCall {
            name: "nope".to_string(),
            args: vec![],
        };
        assert!(eval(&e, &NoGetters).is_err());
    }

    #[test]
    fn test_record_refs_fail_without_scope() {
        let e = Expr::AliasProp {
            edge: "like".to_string(),
            prop: "rating".to_string(),
        };
        assert!(matches!(
            eval(&e, &NoGetters),
            Err(TrellisError::Semantic { .. })
        ));
    }
}
