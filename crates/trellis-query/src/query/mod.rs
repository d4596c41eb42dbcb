// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

pub mod ast;
pub mod executor;
pub mod expr;
pub mod expr_eval;
pub mod interim;
pub mod pushdown;
