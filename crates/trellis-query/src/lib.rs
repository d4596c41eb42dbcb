// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

pub mod query;
pub mod types;

pub use query::executor::core::{ExecutionContext, VariableHolder};
pub use query::executor::go::GoExecutor;
pub use query::executor::Statement;
pub use query::interim::{InterimResult, VidIndex};
pub use types::{ColumnValue, ExecutionResponse, Row};
