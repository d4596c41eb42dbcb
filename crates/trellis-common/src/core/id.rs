// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

use serde::{Deserialize, Serialize};

/// Vertex identifier. Raw 64-bit signed, assigned by the application.
pub type VertexId = i64;

/// Tag identifier, relative to a space.
pub type TagId = i32;

/// Space (tenant graph namespace) identifier.
pub type SpaceId = i32;

/// Signed edge-type id. Positive ids name the forward direction of a
/// logical edge; the negation names its reverse view.
pub type EdgeType = i32;

/// Ranking discriminator between parallel edges of one type.
pub type EdgeRanking = i64;

/// Key of one logical edge instance.
///
/// `edge_type` is always stored positive when the key addresses edge
/// payload caches; traversal state carries the signed form.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct EdgeKey {
    pub src: VertexId,
    pub dst: VertexId,
    pub edge_type: EdgeType,
    pub ranking: EdgeRanking,
}

impl EdgeKey {
    pub fn new(src: VertexId, dst: VertexId, edge_type: EdgeType, ranking: EdgeRanking) -> Self {
        Self {
            src,
            dst,
            edge_type,
            ranking,
        }
    }
}
