// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

use crate::wire::{EdgePropResponse, PropDef, QueryResponse, RpcResponse};
use async_trait::async_trait;
use trellis_common::Result;
use trellis_common::core::id::{EdgeKey, EdgeType, SpaceId, VertexId};

/// Client side of the storage fleet.
///
/// Each call scatters across the shards owning the addressed partitions
/// and gathers one aggregated response; partial shard failure is reported
/// through `RpcResponse::completeness` rather than an `Err`. An `Err`
/// means the fan-out itself failed.
///
/// Cancellation and per-call timeouts live at this layer; the executor
/// inherits whatever semantics the implementation provides.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Expand one hop from `vertices` along `edge_types`, returning the
    /// requested props per traversed edge. `filter` is an optional
    /// serialized predicate evaluated shard-side before rows are
    /// returned.
    async fn get_neighbors(
        &self,
        space: SpaceId,
        vertices: Vec<VertexId>,
        edge_types: Vec<EdgeType>,
        filter: Option<String>,
        return_props: Vec<PropDef>,
    ) -> Result<RpcResponse<QueryResponse>>;

    /// Fetch tag props for the given vertices.
    async fn get_vertex_props(
        &self,
        space: SpaceId,
        vertices: Vec<VertexId>,
        return_props: Vec<PropDef>,
    ) -> Result<RpcResponse<QueryResponse>>;

    /// Fetch edge props for fully keyed edges. All keys in one call must
    /// share one (positive) edge type.
    async fn get_edge_props(
        &self,
        space: SpaceId,
        edge_keys: Vec<EdgeKey>,
        return_props: Vec<PropDef>,
    ) -> Result<RpcResponse<EdgePropResponse>>;
}
