// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

pub mod client;
pub mod codec;
pub mod wire;

pub use client::StorageClient;
pub use wire::{
    EdgeData, EdgePropResponse, EdgeRecord, HostLatency, PropDef, PropId, PropOwner, QueryResponse,
    RpcResponse, TagData, VertexData,
};
