// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

pub mod core;
pub mod go;
pub mod holders;

use crate::query::interim::InterimResult;
use crate::types::ExecutionResponse;
use self::go::GoExecutor;
use std::sync::Arc;
use trellis_common::Result;

/// Statement executors, dispatched by tag.
///
/// Every traversal statement supports the same capability set: prepare,
/// execute, accept the prior stage's result, surface the terminal
/// response. GO is the only traversal implemented in this crate; other
/// statement kinds slot in as further variants.
pub enum Statement {
    Go(GoExecutor),
}

impl Statement {
    /// Pre-execution validation that does not need pipeline inputs.
    pub fn prepare(&mut self) -> Result<()> {
        match self {
            // Clause preparation for GO depends on the interim result a
            // pipe may feed later, so it all happens inside execute().
            Statement::Go(_) => Ok(()),
        }
    }

    pub async fn execute(&mut self) -> Result<()> {
        match self {
            Statement::Go(exec) => exec.execute().await,
        }
    }

    /// Hands over the previous pipeline stage's output.
    pub fn feed_result(&mut self, result: Arc<InterimResult>) {
        match self {
            Statement::Go(exec) => exec.feed_result(result),
        }
    }

    /// Takes the terminal response; only valid after a successful
    /// execute() with no downstream consumer installed.
    pub fn setup_response(&mut self) -> Result<ExecutionResponse> {
        match self {
            Statement::Go(exec) => exec.setup_response(),
        }
    }
}
