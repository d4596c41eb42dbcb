// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

//! Row sets flowing between pipelined executors.

use fxhash::FxHashMap;
use std::sync::Arc;
use trellis_common::core::id::VertexId;
use trellis_common::core::schema::{PropType, Schema};
use trellis_common::core::value::Value;
use trellis_common::{Result, TrellisError};
use trellis_store::codec;

/// Output of one pipeline stage: named columns over schema-encoded rows.
///
/// An empty result still carries its column names so downstream stages
/// can shape their own empty output.
#[derive(Clone, Debug)]
pub struct InterimResult {
    column_names: Vec<String>,
    schema: Arc<Schema>,
    rows: Vec<Vec<u8>>,
}

impl InterimResult {
    /// An empty result with column names only.
    pub fn new(column_names: Vec<String>) -> Self {
        Self {
            column_names,
            schema: Arc::new(Schema::default()),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(column_names: Vec<String>, schema: Schema, rows: Vec<Vec<u8>>) -> Self {
        Self {
            column_names,
            schema: Arc::new(schema),
            rows,
        }
    }

    /// Encodes value tuples against `schema`.
    pub fn from_values(
        column_names: Vec<String>,
        schema: Schema,
        values: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut rows = Vec::with_capacity(values.len());
        for row in &values {
            rows.push(codec::encode(row, &schema)?);
        }
        Ok(Self::from_rows(column_names, schema, rows))
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn has_data(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Declared type of a column; `Unknown` when the column is absent.
    pub fn column_type(&self, column: &str) -> PropType {
        self.schema.field_type(column).unwrap_or(PropType::Unknown)
    }

    pub fn decode_row(&self, index: usize) -> Result<Vec<Value>> {
        let row = self.rows.get(index).ok_or_else(|| TrellisError::Data {
            message: format!("row {} out of bounds", index),
        })?;
        codec::decode(row, &self.schema)
    }

    /// Reads `column` as a vertex-id list. The column must be declared
    /// integral.
    pub fn vids(&self, column: &str) -> Result<Vec<VertexId>> {
        match self.column_type(column) {
            PropType::Int | PropType::Vid => {}
            other => {
                return Err(TrellisError::Semantic {
                    message: format!(
                        "column `{}' is {}, but a vertex id column must be integral",
                        column, other
                    ),
                });
            }
        }

        let mut vids = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            vids.push(codec::read_prop(row, &self.schema, column)?.as_int()?);
        }
        Ok(vids)
    }
}

/// Row lookup over an interim result, keyed by one vertex-id column.
///
/// Duplicate ids keep their first row.
#[derive(Clone, Debug)]
pub struct VidIndex {
    result: Arc<InterimResult>,
    by_vid: FxHashMap<VertexId, usize>,
}

impl VidIndex {
    pub fn build(result: Arc<InterimResult>, column: &str) -> Result<Self> {
        let vids = result.vids(column)?;
        let mut by_vid = FxHashMap::default();
        for (row, vid) in vids.into_iter().enumerate() {
            by_vid.entry(vid).or_insert(row);
        }
        Ok(Self { result, by_vid })
    }

    pub fn column_with_vid(&self, vid: VertexId, column: &str) -> Result<Value> {
        let row = *self.by_vid.get(&vid).ok_or_else(|| TrellisError::Data {
            message: format!("no input row for vertex {}", vid),
        })?;
        let values = self.result.decode_row(row)?;
        let index = self
            .result
            .schema()
            .field_index(column)
            .ok_or_else(|| TrellisError::Data {
                message: format!("no column `{}' in input", column),
            })?;
        Ok(values[index].clone())
    }

    pub fn column_type(&self, column: &str) -> PropType {
        self.result.column_type(column)
    }
}
