// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

use serde::{Deserialize, Serialize};
use trellis_common::core::id::VertexId;

/// One strongly typed cell of a terminal response.
///
/// The variant is chosen by the declared column type, falling back to the
/// runtime kind of the value for columns typed unknown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ColumnValue {
    Bool(bool),
    Integer(i64),
    Id(VertexId),
    SinglePrecision(f32),
    DoublePrecision(f64),
    Str(String),
    Timestamp(i64),
}

/// One row of a terminal response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub columns: Vec<ColumnValue>,
}

/// Terminal query result handed back to the session layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub column_names: Vec<String>,
    pub rows: Vec<Row>,
}

impl ExecutionResponse {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
