// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

//! Bodies exchanged with the storage shards.
//!
//! One fan-out call returns one `RpcResponse` aggregating the per-shard
//! bodies; row payloads inside the bodies are codec-encoded against the
//! schema sidecars they travel with.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trellis_common::core::id::{EdgeType, TagId, VertexId};
use trellis_common::core::schema::Schema;

/// Who owns a requested property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropOwner {
    Source,
    Dest,
    Edge,
}

/// Schema scope of a requested property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropId {
    Tag(TagId),
    Edge(EdgeType),
}

/// One property a fan-out call asks storage to return.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropDef {
    pub owner: PropOwner,
    pub name: String,
    pub id: PropId,
}

impl PropDef {
    pub fn source(name: &str, tag: TagId) -> Self {
        Self {
            owner: PropOwner::Source,
            name: name.to_string(),
            id: PropId::Tag(tag),
        }
    }

    pub fn dest(name: &str, tag: TagId) -> Self {
        Self {
            owner: PropOwner::Dest,
            name: name.to_string(),
            id: PropId::Tag(tag),
        }
    }

    pub fn edge(name: &str, edge_type: EdgeType) -> Self {
        Self {
            owner: PropOwner::Edge,
            name: name.to_string(),
            id: PropId::Edge(edge_type),
        }
    }
}

/// Encoded tag payload attached to one vertex.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TagData {
    pub tag_id: TagId,
    pub data: Vec<u8>,
}

/// One traversed edge: destination plus the requested props as an
/// encoded row.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub dst: VertexId,
    pub props: Vec<u8>,
}

/// Edges of one type leaving one vertex.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EdgeData {
    pub edge_type: EdgeType,
    pub edges: Vec<EdgeRecord>,
}

/// Per-vertex slice of a neighbors or vertex-props response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VertexData {
    pub vertex_id: VertexId,
    pub tag_data: Vec<TagData>,
    pub edge_data: Vec<EdgeData>,
}

/// Body of `get_neighbors` and `get_vertex_props`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub vertices: Vec<VertexData>,
    /// Schema of each tag payload in `vertices[..].tag_data`.
    pub vertex_schema: HashMap<TagId, Schema>,
    /// Schema of each edge row in `vertices[..].edge_data`, keyed by the
    /// signed type the request named.
    pub edge_schema: HashMap<EdgeType, Schema>,
    /// Row-count hint used to pre-size result buffers.
    pub total_edges: Option<i64>,
}

/// Body of `get_edge_props`: a row set over one schema. Rows carry the
/// reserved `_SRC`/`_DST`/`_TYPE`/`_RANK` columns alongside the requested
/// props.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EdgePropResponse {
    pub schema: Option<Schema>,
    pub data: Vec<Vec<u8>>,
}

pub type PartId = i32;

/// Per-host latency sample attached to a fan-out response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostLatency {
    pub host: String,
    pub latency_us: u64,
    pub total_latency_us: u64,
}

/// Aggregated fan-out result.
///
/// `completeness` is the integer percentage of shards that answered;
/// callers decide whether a partial answer is acceptable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    pub responses: Vec<T>,
    pub completeness: u32,
    pub failed_parts: Vec<(PartId, i32)>,
    pub host_latency: Vec<HostLatency>,
}

impl<T> RpcResponse<T> {
    /// A fully successful response.
    pub fn ok(responses: Vec<T>) -> Self {
        Self {
            responses,
            completeness: 100,
            failed_parts: Vec::new(),
            host_latency: Vec::new(),
        }
    }
}
