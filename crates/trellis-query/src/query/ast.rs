// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

//! Syntax tree of a GO statement as produced by the parser.
//!
//! The parser itself lives upstream; the executor only consumes these
//! shapes and never re-tokenizes query text.

use crate::query::expr::Expr;
use std::fmt;

#[derive(Clone, Debug)]
pub struct GoStatement {
    pub step: Option<StepClause>,
    pub from: FromClause,
    pub over: OverClause,
    pub where_clause: Option<WhereClause>,
    pub yield_clause: Option<YieldClause>,
}

#[derive(Clone, Copy, Debug)]
pub struct StepClause {
    pub steps: u32,
    pub upto: bool,
}

/// Start-set source: literal vid expressions, or a column reference into
/// the pipe (`$-.col`) or a named variable (`$var.col`).
#[derive(Clone, Debug)]
pub enum FromClause {
    Vids(Vec<Expr>),
    Ref(Expr),
}

#[derive(Clone, Debug)]
pub struct OverClause {
    pub edges: Vec<OverEdge>,
    pub reversely: bool,
}

#[derive(Clone, Debug)]
pub enum OverEdge {
    /// `OVER *`
    All,
    Edge { name: String, alias: Option<String> },
}

#[derive(Clone, Debug)]
pub struct WhereClause {
    pub filter: Expr,
}

#[derive(Clone, Debug)]
pub struct YieldClause {
    pub columns: Vec<YieldColumn>,
    pub distinct: bool,
}

#[derive(Clone, Debug)]
pub struct YieldColumn {
    pub expr: Expr,
    pub alias: Option<String>,
    /// Aggregate wrapper name, when the parser saw one. GO rejects it.
    pub agg_fun: Option<String>,
}

impl YieldColumn {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            alias: None,
            agg_fun: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }
}

impl fmt::Display for GoStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GO")?;
        if let Some(step) = &self.step {
            write!(f, " {} STEPS", step.steps)?;
            if step.upto {
                write!(f, " UPTO")?;
            }
        }
        match &self.from {
            FromClause::Vids(vids) => {
                write!(f, " FROM ")?;
                for (i, vid) in vids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", vid)?;
                }
            }
            FromClause::Ref(expr) => write!(f, " FROM {}", expr)?,
        }
        write!(f, " OVER ")?;
        for (i, edge) in self.over.edges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match edge {
                OverEdge::All => write!(f, "*")?,
                OverEdge::Edge { name, alias } => {
                    write!(f, "{}", name)?;
                    if let Some(alias) = alias {
                        write!(f, " AS {}", alias)?;
                    }
                }
            }
        }
        if self.over.reversely {
            write!(f, " REVERSELY")?;
        }
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {}", where_clause.filter)?;
        }
        if let Some(yield_clause) = &self.yield_clause {
            write!(f, " YIELD")?;
            if yield_clause.distinct {
                write!(f, " DISTINCT")?;
            }
            for (i, col) in yield_clause.columns.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, " {}", col.expr)?;
                if let Some(alias) = &col.alias {
                    write!(f, " AS {}", alias)?;
                }
            }
        }
        Ok(())
    }
}
