// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

use std::collections::HashSet;
use std::fmt;
use trellis_common::core::schema::{self, PropType};
use trellis_common::core::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Mod, // %
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelOp {
    Eq,    // ==
    NotEq, // !=
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// Expression tree as handed over by the parser.
///
/// Property references name graph entities textually; preparation maps
/// them onto ids under the session space before the first hop.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Arithmetic {
        left: Box<Expr>,
        op: ArithOp,
        right: Box<Expr>,
    },
    Relational {
        left: Box<Expr>,
        op: RelOp,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: LogicOp,
        right: Box<Expr>,
    },
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    TypeCast {
        target: PropType,
        operand: Box<Expr>,
    },
    /// `edge._dst`
    EdgeDstId { edge: String },
    /// `edge._src`
    EdgeSrcId { edge: String },
    /// `edge._rank`
    EdgeRank { edge: String },
    /// `edge._type`
    EdgeTypeId { edge: String },
    /// `edge.prop`
    AliasProp { edge: String, prop: String },
    /// `$^.tag.prop`
    SrcTagProp { tag: String, prop: String },
    /// `$$.tag.prop`
    DstTagProp { tag: String, prop: String },
    /// `$var.prop`
    VariableProp { var: String, prop: String },
    /// `$-.prop`
    InputProp { prop: String },
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelOp::Eq => "==",
            RelOp::NotEq => "!=",
            RelOp::Lt => "<",
            RelOp::LtEq => "<=",
            RelOp::Gt => ">",
            RelOp::GtEq => ">=",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LogicOp::And => "&&",
                LogicOp::Or => "||",
            }
        )
    }
}

// The textual form doubles as the default column name and as the
// pushdown serialization, so it must stay parseable: parenthesized
// compounds, quoted string literals.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Str(s)) => write!(f, "\"{}\"", s),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "!({})", operand),
                UnaryOp::Negate => write!(f, "-({})", operand),
            },
            Expr::Arithmetic { left, op, right } => write!(f, "({}{}{})", left, op, right),
            Expr::Relational { left, op, right } => write!(f, "({}{}{})", left, op, right),
            Expr::Logical { left, op, right } => write!(f, "({}{}{})", left, op, right),
            Expr::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::TypeCast { target, operand } => write!(f, "({}){}", target, operand),
            Expr::EdgeDstId { edge } => write!(f, "{}._dst", edge),
            Expr::EdgeSrcId { edge } => write!(f, "{}._src", edge),
            Expr::EdgeRank { edge } => write!(f, "{}._rank", edge),
            Expr::EdgeTypeId { edge } => write!(f, "{}._type", edge),
            Expr::AliasProp { edge, prop } => write!(f, "{}.{}", edge, prop),
            Expr::SrcTagProp { tag, prop } => write!(f, "$^.{}.{}", tag, prop),
            Expr::DstTagProp { tag, prop } => write!(f, "$$.{}.{}", tag, prop),
            Expr::VariableProp { var, prop } => write!(f, "${}.{}", var, prop),
            Expr::InputProp { prop } => write!(f, "$-.{}", prop),
        }
    }
}

/// Property references gathered from the WHERE and YIELD trees.
///
/// Drives step-out prop selection, the destination fetch decision and the
/// reverse-mode edge fetch. Edge id references register under the
/// reserved column they read so the final hop requests them.
#[derive(Debug, Default)]
pub struct PropDeps {
    pub src_tag_props: Vec<(String, String)>,
    pub dst_tag_props: Vec<(String, String)>,
    /// (edge name, prop name); includes reserved columns.
    pub alias_props: Vec<(String, String)>,
    pub variables: HashSet<String>,
    pub variable_props: Vec<String>,
    pub input_props: Vec<String>,
}

impl PropDeps {
    pub fn collect(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Unary { operand, .. } | Expr::TypeCast { operand, .. } => self.collect(operand),
            Expr::Arithmetic { left, right, .. }
            | Expr::Relational { left, right, .. }
            | Expr::Logical { left, right, .. } => {
                self.collect(left);
                self.collect(right);
            }
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    self.collect(arg);
                }
            }
            Expr::EdgeDstId { edge } => self.add_alias_prop(edge, schema::DST),
            Expr::EdgeSrcId { edge } => self.add_alias_prop(edge, schema::SRC),
            Expr::EdgeRank { edge } => self.add_alias_prop(edge, schema::RANK),
            Expr::EdgeTypeId { edge } => self.add_alias_prop(edge, schema::TYPE),
            Expr::AliasProp { edge, prop } => self.add_alias_prop(edge, prop),
            Expr::SrcTagProp { tag, prop } => {
                self.src_tag_props.push((tag.clone(), prop.clone()));
            }
            Expr::DstTagProp { tag, prop } => {
                self.dst_tag_props.push((tag.clone(), prop.clone()));
            }
            Expr::VariableProp { var, prop } => {
                self.variables.insert(var.clone());
                self.variable_props.push(prop.clone());
            }
            Expr::InputProp { prop } => self.input_props.push(prop.clone()),
        }
    }

    fn add_alias_prop(&mut self, edge: &str, prop: &str) {
        let entry = (edge.to_string(), prop.to_string());
        if !self.alias_props.contains(&entry) {
            self.alias_props.push(entry);
        }
    }

    /// Tag names referenced from either side of the traversal.
    pub fn tag_names(&self) -> HashSet<&str> {
        self.src_tag_props
            .iter()
            .chain(self.dst_tag_props.iter())
            .map(|(tag, _)| tag.as_str())
            .collect()
    }

    pub fn has_src_tag_props(&self) -> bool {
        !self.src_tag_props.is_empty()
    }

    pub fn has_dst_tag_props(&self) -> bool {
        !self.dst_tag_props.is_empty()
    }

    pub fn has_variable_props(&self) -> bool {
        !self.variable_props.is_empty()
    }

    pub fn has_input_props(&self) -> bool {
        !self.input_props.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textual_forms() {
        let filter = Expr::Relational {
            left: Box::new(Expr::AliasProp {
                edge: "like".to_string(),
                prop: "rating".to_string(),
            }),
            op: RelOp::Gt,
            right: Box::new(Expr::literal(3i64)),
        };
        assert_eq!(filter.to_string(), "(like.rating>3)");

        let col = Expr::SrcTagProp {
            tag: "person".to_string(),
            prop: "name".to_string(),
        };
        assert_eq!(col.to_string(), "$^.person.name");

        assert_eq!(
            Expr::EdgeDstId {
                edge: "friend".to_string()
            }
            .to_string(),
            "friend._dst"
        );
        assert_eq!(
            Expr::InputProp {
                prop: "id".to_string()
            }
            .to_string(),
            "$-.id"
        );
        assert_eq!(
            Expr::TypeCast {
                target: PropType::Int,
                operand: Box::new(Expr::literal("5")),
            }
            .to_string(),
            "(int)\"5\""
        );
    }

    #[test]
    fn test_dep_collection() {
        let mut deps = PropDeps::default();
        deps.collect(&Expr::Logical {
            left: Box::new(Expr::Relational {
                left: Box::new(Expr::SrcTagProp {
                    tag: "person".to_string(),
                    prop: "age".to_string(),
                }),
                op: RelOp::Gt,
                right: Box::new(Expr::literal(20i64)),
            }),
            op: LogicOp::And,
            right: Box::new(Expr::AliasProp {
                edge: "like".to_string(),
                prop: "rating".to_string(),
            }),
        });
        deps.collect(&Expr::EdgeRank {
            edge: "like".to_string(),
        });

        assert_eq!(deps.src_tag_props, vec![("person".into(), "age".into())]);
        assert_eq!(
            deps.alias_props,
            vec![
                ("like".to_string(), "rating".to_string()),
                ("like".to_string(), schema::RANK.to_string()),
            ]
        );
        assert!(!deps.has_dst_tag_props());
        assert!(deps.tag_names().contains("person"));
    }
}
