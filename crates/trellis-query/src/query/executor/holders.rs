// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

//! Per-query side tables: traversal lineage and cached property payloads.

use fxhash::FxHashMap;
use std::sync::Arc;
use trellis_common::core::id::{EdgeType, TagId, VertexId};
use trellis_common::core::schema::{self, PropType, Schema};
use trellis_common::core::value::Value;
use trellis_common::{Result, TrellisError};
use trellis_store::codec;
use trellis_store::wire::{EdgePropResponse, QueryResponse};

/// Maps any intermediate-hop vertex back to the start vertex it grew
/// from, so final rows can reach the prior stage's columns.
#[derive(Debug, Default)]
pub struct BackTracker {
    mapping: FxHashMap<VertexId, VertexId>,
}

impl BackTracker {
    /// Records `dst` as reached from `src`. The stored root is `src`'s
    /// own root, so lookups never walk chains. A vertex reached from two
    /// roots keeps the first.
    pub fn add(&mut self, src: VertexId, dst: VertexId) {
        let root = self.get(src);
        self.mapping.entry(dst).or_insert(root);
    }

    /// The originating start vertex; identity for unseen ids.
    pub fn get(&self, vid: VertexId) -> VertexId {
        *self.mapping.get(&vid).unwrap_or(&vid)
    }
}

type TagPayload = (Arc<Schema>, Vec<u8>);

/// Destination-tag payloads fetched ahead of projection.
#[derive(Debug, Default)]
pub struct VertexHolder {
    data: FxHashMap<VertexId, FxHashMap<TagId, TagPayload>>,
}

impl VertexHolder {
    /// Drains one vertex-props response body into the holder.
    pub fn add(&mut self, resp: &QueryResponse) {
        let mut schemas: FxHashMap<TagId, Arc<Schema>> = FxHashMap::default();
        for (tag_id, schema) in &resp.vertex_schema {
            schemas.insert(*tag_id, Arc::new(schema.clone()));
        }

        for vdata in &resp.vertices {
            let mut tags = FxHashMap::default();
            for td in &vdata.tag_data {
                if let Some(schema) = schemas.get(&td.tag_id) {
                    tags.insert(td.tag_id, (schema.clone(), td.data.clone()));
                }
            }
            self.data.insert(vdata.vertex_id, tags);
        }
    }

    /// Reads one property. A vertex or tag the fetch did not return
    /// falls back to the tag's default; a property missing from the
    /// schema is an error.
    pub fn get(&self, vid: VertexId, tag: TagId, prop: &str) -> Result<Value> {
        let Some(tags) = self.data.get(&vid) else {
            return self.default_prop(tag, prop);
        };
        let Some((schema, row)) = tags.get(&tag) else {
            return self.default_prop(tag, prop);
        };
        codec::read_prop(row, schema, prop)
    }

    pub fn prop_type(&self, vid: VertexId, tag: TagId, prop: &str) -> PropType {
        let schema = self
            .data
            .get(&vid)
            .and_then(|tags| tags.get(&tag))
            .map(|(schema, _)| schema.clone())
            .or_else(|| self.any_schema_of(tag));
        schema
            .and_then(|s| s.field_type(prop))
            .unwrap_or(PropType::Unknown)
    }

    fn default_prop(&self, tag: TagId, prop: &str) -> Result<Value> {
        match self.any_schema_of(tag) {
            Some(schema) => codec::default_prop(&schema, prop),
            None => Err(TrellisError::Data {
                message: format!("unknown vertex tag {}", tag),
            }),
        }
    }

    fn any_schema_of(&self, tag: TagId) -> Option<Arc<Schema>> {
        self.data
            .values()
            .find_map(|tags| tags.get(&tag))
            .map(|(schema, _)| schema.clone())
    }
}

type EdgeRef = (VertexId, VertexId, EdgeType);

/// Edge payloads fetched by the reverse-mode second round-trip, keyed by
/// (src, dst, absolute type).
#[derive(Debug, Default)]
pub struct EdgeHolder {
    edges: FxHashMap<EdgeRef, (Arc<Schema>, Vec<u8>)>,
    schemas: FxHashMap<EdgeType, Arc<Schema>>,
}

impl EdgeHolder {
    /// Accumulates one edge-props response. Rows identify themselves
    /// through the reserved `_SRC`/`_DST`/`_TYPE` columns; rows missing
    /// any of them are skipped. Each row is re-encoded against the
    /// holder's canonical schema for that type.
    pub fn add(&mut self, resp: &EdgePropResponse) -> Result<()> {
        let Some(schema) = &resp.schema else {
            return Ok(());
        };
        if resp.data.is_empty() {
            return Ok(());
        }
        let schema = Arc::new(schema.clone());

        for row in &resp.data {
            let (Ok(src), Ok(dst), Ok(ty)) = (
                codec::read_prop(row, &schema, schema::SRC),
                codec::read_prop(row, &schema, schema::DST),
                codec::read_prop(row, &schema, schema::TYPE),
            ) else {
                continue;
            };

            let values = codec::decode(row, &schema).map_err(|_| TrellisError::Data {
                message: "get prop failed when adding edge".to_string(),
            })?;
            let encoded = codec::encode(&values, &schema)?;

            let key = (src.as_int()?, dst.as_int()?, ty.as_int()? as EdgeType);
            self.edges.insert(key, (schema.clone(), encoded));
            self.schemas.insert(key.2, schema.clone());
        }
        Ok(())
    }

    /// Reads one property of a fully keyed edge. A missing edge is an
    /// error, never a default: the second round-trip was supposed to
    /// bring it in.
    pub fn get(&self, src: VertexId, dst: VertexId, ty: EdgeType, prop: &str) -> Result<Value> {
        let Some((schema, row)) = self.edges.get(&(src, dst, ty)) else {
            return Err(TrellisError::Data {
                message: format!(
                    "edge holder has no edge src: {}, dst: {}, type: {}",
                    src, dst, ty
                ),
            });
        };
        codec::read_prop(row, schema, prop).map_err(|_| TrellisError::Data {
            message: format!("prop not found: `{}'", prop),
        })
    }

    /// Default for an edge type whose rows were fetched. When the type
    /// never produced a row the reverse side has no schema: the reserved
    /// id columns default to 0, anything else is an error.
    pub fn default_prop(&self, ty: EdgeType, prop: &str) -> Result<Value> {
        match self.schemas.get(&ty) {
            Some(schema) => codec::default_prop(schema, prop),
            None if matches!(prop, schema::SRC | schema::DST | schema::RANK) => Ok(Value::Int(0)),
            None => Err(TrellisError::Data {
                message: format!("get default prop `{}' failed for edge type {}", prop, ty),
            }),
        }
    }

    pub fn prop_type(&self, ty: EdgeType, prop: &str) -> PropType {
        self.schemas
            .get(&ty)
            .and_then(|s| s.field_type(prop))
            .unwrap_or(PropType::Unknown)
    }
}
