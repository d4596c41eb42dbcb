// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

use crate::query::expr::Expr;

/// Serializes a WHERE predicate for shard-side evaluation.
///
/// Storage sees source-vertex tags and the edge rows it is about to
/// return, so references to those are pushable. Destination tags and
/// pipe/variable columns only exist executor-side; a predicate touching
/// any of them stays local.
pub struct PushdownFilter;

impl PushdownFilter {
    /// Returns the serialized predicate, or `None` when the filter must
    /// be evaluated locally. The textual expression form is the wire
    /// format; shards parse it back.
    pub fn generate(filter: &Expr) -> Option<String> {
        if Self::is_pushable(filter) {
            Some(filter.to_string())
        } else {
            None
        }
    }

    fn is_pushable(expr: &Expr) -> bool {
        match expr {
            Expr::Literal(_)
            | Expr::EdgeDstId { .. }
            | Expr::EdgeSrcId { .. }
            | Expr::EdgeRank { .. }
            | Expr::EdgeTypeId { .. }
            | Expr::AliasProp { .. }
            | Expr::SrcTagProp { .. } => true,
            Expr::DstTagProp { .. } | Expr::VariableProp { .. } | Expr::InputProp { .. } => false,
            Expr::Unary { operand, .. } | Expr::TypeCast { operand, .. } => {
                Self::is_pushable(operand)
            }
            Expr::Arithmetic { left, right, .. }
            | Expr::Relational { left, right, .. }
            | Expr::Logical { left, right, .. } => {
                Self::is_pushable(left) && Self::is_pushable(right)
            }
            Expr::FunctionCall { args, .. } => args.iter().all(Self::is_pushable),
        }
    }
}
