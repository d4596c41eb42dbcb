// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

use std::time::Duration;

/// Runtime switches for the query engine.
///
/// One record threaded through the execution context; nothing here is
/// process-global. The defaults are the production values, tests flip
/// individual flags per case.
#[derive(Clone, Debug)]
pub struct QueryConfig {
    /// Push the WHERE predicate down to storage on the final hop of a
    /// forward traversal (default: true)
    pub filter_pushdown: bool,

    /// Dump per-hop latency detail for every traversal request
    /// (default: false)
    pub trace_traversal: bool,

    /// Wall-clock budget for a single query (default: 30s)
    pub query_timeout: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            filter_pushdown: true,
            trace_traversal: false,
            query_timeout: Duration::from_secs(30),
        }
    }
}
