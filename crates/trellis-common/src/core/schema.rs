// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

use crate::api::error::Result;
use crate::core::id::{EdgeType, SpaceId, TagId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Reserved edge columns understood by every storage shard.
pub const SRC: &str = "_SRC";
pub const DST: &str = "_DST";
pub const TYPE: &str = "_TYPE";
pub const RANK: &str = "_RANK";

/// Returns true for the columns storage materializes on every edge row.
pub fn is_reserved_prop(name: &str) -> bool {
    matches!(name, SRC | DST | TYPE | RANK)
}

/// Storage-declared type of a schema field.
///
/// Only the first six kinds are evaluable by the executor. The trailing
/// kinds are reserved by the wire format; the codec refuses to decode
/// them until their layout is specified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PropType {
    Bool,
    Int,
    Vid,
    Float,
    Double,
    String,
    Timestamp,
    Year,
    YearMonth,
    Date,
    DateTime,
    Path,
    Unknown,
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropType::Bool => "bool",
            PropType::Int => "int",
            PropType::Vid => "vid",
            PropType::Float => "float",
            PropType::Double => "double",
            PropType::String => "string",
            PropType::Timestamp => "timestamp",
            PropType::Year => "year",
            PropType::YearMonth => "yearmonth",
            PropType::Date => "date",
            PropType::DateTime => "datetime",
            PropType::Path => "path",
            PropType::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// One named, typed field at a stable index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub prop_type: PropType,
}

/// Ordered field list with stable indices.
///
/// Shared between the row codec, the storage responses that carry schema
/// sidecars, and the holders that decode cached payloads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Builder-style append, used by response assembly and tests.
    pub fn with_field(mut self, name: &str, prop_type: PropType) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            prop_type,
        });
        self
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_type(&self, name: &str) -> Option<PropType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.prop_type)
    }
}

/// Name↔id mapping and schema lookup, scoped by space.
///
/// Backed by the meta service in production; tests install an in-memory
/// implementation.
pub trait SchemaRegistry: Send + Sync {
    fn tag_id(&self, space: SpaceId, name: &str) -> Result<TagId>;

    fn tag_name(&self, space: SpaceId, tag: TagId) -> Result<String>;

    /// Resolves an edge name to its forward (positive) type id.
    fn edge_type(&self, space: SpaceId, name: &str) -> Result<EdgeType>;

    fn edge_name(&self, space: SpaceId, edge_type: EdgeType) -> Result<String>;

    fn tag_schema(&self, space: SpaceId, tag: TagId) -> Option<Arc<Schema>>;

    /// Schema of an edge type; callers pass the absolute (positive) id.
    fn edge_schema(&self, space: SpaceId, edge_type: EdgeType) -> Option<Arc<Schema>>;

    /// Every edge name defined in the space, for `OVER *` expansion.
    fn all_edges(&self, space: SpaceId) -> Result<Vec<String>>;
}
