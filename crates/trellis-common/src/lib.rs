// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

pub mod api {
    pub mod error;
}

pub mod config;

pub mod core {
    pub mod id;
    pub mod schema;
    pub mod value;
}

// Re-exports for convenience
pub use api::error::{Result, TrellisError};
pub use config::QueryConfig;
pub use core::id::{EdgeKey, EdgeRanking, EdgeType, SpaceId, TagId, VertexId};
pub use core::schema::{FieldDef, PropType, Schema, SchemaRegistry};
pub use core::value::Value;
