// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

use crate::query::interim::InterimResult;
use chrono::FixedOffset;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use trellis_common::config::QueryConfig;
use trellis_common::core::id::SpaceId;
use trellis_common::core::schema::SchemaRegistry;
use trellis_store::client::StorageClient;

/// Named interim results visible to the current session.
#[derive(Default)]
pub struct VariableHolder {
    vars: RwLock<HashMap<String, Arc<InterimResult>>>,
}

impl VariableHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, result: Arc<InterimResult>) {
        self.vars.write().insert(name.to_string(), result);
    }

    pub fn get(&self, name: &str) -> Option<Arc<InterimResult>> {
        self.vars.read().get(name).cloned()
    }
}

/// Everything a statement executor needs from its surroundings: the
/// session space, the storage fleet, the schema registry, session
/// variables and the runtime switches. Shared by value (`Arc`) between
/// the executors of one pipeline.
pub struct ExecutionContext {
    space: SpaceId,
    storage: Arc<dyn StorageClient>,
    schema: Arc<dyn SchemaRegistry>,
    variables: VariableHolder,
    config: QueryConfig,
    timezone: FixedOffset,
}

impl ExecutionContext {
    pub fn new(
        space: SpaceId,
        storage: Arc<dyn StorageClient>,
        schema: Arc<dyn SchemaRegistry>,
    ) -> Self {
        Self {
            space,
            storage,
            schema,
            variables: VariableHolder::new(),
            config: QueryConfig::default(),
            timezone: FixedOffset::east_opt(0).expect("zero offset is valid"),
        }
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn space(&self) -> SpaceId {
        self.space
    }

    pub fn storage(&self) -> &Arc<dyn StorageClient> {
        &self.storage
    }

    pub fn schema(&self) -> &Arc<dyn SchemaRegistry> {
        &self.schema
    }

    pub fn variables(&self) -> &VariableHolder {
        &self.variables
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Session timezone.
    // TODO: thread into timestamp column rendering once the codec
    // decodes TIMESTAMP fields.
    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }
}
