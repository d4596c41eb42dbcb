// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrellisError {
    #[error("Syntax error: {message}")]
    Syntax { message: String },

    #[error("Semantic error: {message}")]
    Semantic { message: String },

    /// Tag name not known under the current space
    #[error("Tag `{tag}' not found")]
    TagNotFound { tag: String },

    /// Edge name not known under the current space
    #[error("Edge `{edge}' not found")]
    EdgeNotFound { edge: String },

    /// Storage fan-out failed entirely, or a continuation raised
    #[error("Storage error: {message}")]
    Rpc { message: String },

    /// A row or property the query requires is absent and has no default
    #[error("Data error: {message}")]
    Data { message: String },

    #[error("Type error: expected {expected}, got {actual}")]
    Type { expected: String, actual: String },

    #[error("`{feature}' not supported yet")]
    Unimplemented { feature: String },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TrellisError>;
