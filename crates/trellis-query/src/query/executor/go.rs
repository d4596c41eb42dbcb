// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

//! The GO traversal executor.
//!
//! Advances one hop per storage round-trip: intermediate hops request
//! only destinations, the final hop requests every property the WHERE
//! and YIELD trees reference, then projection runs over the last
//! response. Reverse traversals key a second edge-props round-trip off
//! the ranks in the final response, because the first query flowed from
//! the reverse direction.

use crate::query::ast::{FromClause, GoStatement, OverEdge, YieldColumn};
use crate::query::executor::core::ExecutionContext;
use crate::query::executor::holders::{BackTracker, EdgeHolder, VertexHolder};
use crate::query::expr::{Expr, PropDeps};
use crate::query::expr_eval::{self, Getters, NoGetters};
use crate::query::interim::{InterimResult, VidIndex};
use crate::query::pushdown::PushdownFilter;
use crate::types::{ColumnValue, ExecutionResponse, Row};
use anyhow::anyhow;
use futures::future::try_join_all;
use fxhash::{FxHashMap, FxHashSet, FxHasher};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use trellis_common::core::id::{EdgeKey, EdgeType, TagId, VertexId};
use trellis_common::core::schema::{self, PropType, Schema};
use trellis_common::core::value::Value;
use trellis_common::{Result, TrellisError};
use trellis_store::codec;
use trellis_store::wire::{PropDef, QueryResponse, RpcResponse};

/// Consumer installed by a downstream pipeline stage. When present, the
/// executor emits an interim result instead of a terminal response.
pub type OnResult = Box<dyn FnOnce(InterimResult) -> Result<()> + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FromKind {
    Instant,
    Pipe,
    Variable,
}

pub struct GoExecutor {
    ctx: Arc<ExecutionContext>,
    stmt: GoStatement,
    inputs: Option<Arc<InterimResult>>,
    on_result: Option<OnResult>,
    resp: Option<ExecutionResponse>,

    steps: u32,
    cur_step: u32,
    reversely: bool,
    over_all: bool,
    distinct: bool,
    distinct_pushdown: bool,
    from_kind: FromKind,
    var_name: Option<String>,
    col_name: Option<String>,
    starts: Vec<VertexId>,
    edge_types: Vec<EdgeType>,
    /// Alias (or bare name) → signed edge type, as registered by OVER.
    edge_aliases: HashMap<String, EdgeType>,
    /// Referenced tag name → id under the session space.
    tag_ids: HashMap<String, TagId>,
    yields: Vec<YieldColumn>,
    filter: Option<Expr>,
    pushdown_filter: Option<String>,
    deps: PropDeps,

    back_tracker: Option<BackTracker>,
    vertex_holder: Option<VertexHolder>,
    edge_holder: Option<EdgeHolder>,
    index: Option<VidIndex>,

    deadline: Option<Instant>,
}

impl GoExecutor {
    pub fn new(stmt: GoStatement, ctx: Arc<ExecutionContext>) -> Self {
        Self {
            ctx,
            stmt,
            inputs: None,
            on_result: None,
            resp: None,
            steps: 1,
            cur_step: 1,
            reversely: false,
            over_all: false,
            distinct: false,
            distinct_pushdown: false,
            from_kind: FromKind::Instant,
            var_name: None,
            col_name: None,
            starts: Vec::new(),
            edge_types: Vec::new(),
            edge_aliases: HashMap::new(),
            tag_ids: HashMap::new(),
            yields: Vec::new(),
            filter: None,
            pushdown_filter: None,
            deps: PropDeps::default(),
            back_tracker: None,
            vertex_holder: None,
            edge_holder: None,
            index: None,
            deadline: None,
        }
    }

    /// Installs the downstream consumer, switching output to pipe mode.
    pub fn set_on_result(&mut self, on_result: OnResult) {
        self.on_result = Some(on_result);
    }

    /// Accepts the previous pipeline stage's output.
    pub fn feed_result(&mut self, result: Arc<InterimResult>) {
        self.inputs = Some(result);
    }

    /// Takes the terminal response staged by a successful execution.
    pub fn setup_response(&mut self) -> Result<ExecutionResponse> {
        self.resp
            .take()
            .ok_or_else(|| TrellisError::Internal(anyhow!("no response staged")))
    }

    /// Whether DISTINCT could run shard-side for this query. Purely
    /// local when source-side and destination-side dependencies coexist.
    pub fn distinct_pushdown(&self) -> bool {
        self.distinct_pushdown
    }

    pub async fn execute(&mut self) -> Result<()> {
        info!(statement = %self.stmt, "executing GO");
        self.deadline = Some(Instant::now() + self.ctx.config().query_timeout);

        self.prepare_clauses()?;
        self.setup_starts()?;
        if self.starts.is_empty() {
            return self.on_empty_inputs();
        }
        if self.distinct {
            let mut seen = FxHashSet::default();
            self.starts.retain(|vid| seen.insert(*vid));
        }

        loop {
            let resp = self.step_out().await?;
            if self.is_final_step() {
                return self.maybe_finish(resp).await;
            }
            let dsts = self.collect_dst_ids(&resp);
            if dsts.is_empty() {
                return self.on_empty_inputs();
            }
            self.starts = dsts;
            self.cur_step += 1;
        }
    }

    fn is_final_step(&self) -> bool {
        self.cur_step >= self.steps
    }

    fn check_deadline(&self) -> Result<()> {
        if let Some(deadline) = self.deadline
            && Instant::now() > deadline
        {
            return Err(TrellisError::Rpc {
                message: format!(
                    "query timed out after {:?}",
                    self.ctx.config().query_timeout
                ),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Clause preparation
    // ------------------------------------------------------------------

    fn prepare_clauses(&mut self) -> Result<()> {
        let status = self.prepare_clauses_inner();
        if let Err(e) = &status {
            error!(error = %e, "GO preparation failed");
        }
        status
    }

    fn prepare_clauses_inner(&mut self) -> Result<()> {
        self.prepare_step()?;
        self.prepare_from()?;
        self.prepare_over()?;
        self.prepare_where()?;
        self.prepare_yield()?;
        self.prepare_needed_props()?;
        self.prepare_distinct()?;
        Ok(())
    }

    fn prepare_step(&mut self) -> Result<()> {
        if let Some(clause) = &self.stmt.step {
            if clause.upto {
                return Err(TrellisError::Syntax {
                    message: "`UPTO' not supported yet".to_string(),
                });
            }
            self.steps = clause.steps;
        }
        if self.steps != 1 {
            self.back_tracker = Some(BackTracker::default());
        }
        Ok(())
    }

    fn prepare_from(&mut self) -> Result<()> {
        match &self.stmt.from {
            FromClause::Ref(expr) => {
                let (kind, var, col) = match expr {
                    Expr::InputProp { prop } => (FromKind::Pipe, None, prop.clone()),
                    Expr::VariableProp { var, prop } => {
                        (FromKind::Variable, Some(var.clone()), prop.clone())
                    }
                    _ => {
                        return Err(TrellisError::Semantic {
                            message: "FROM references must name a pipe or variable column"
                                .to_string(),
                        });
                    }
                };
                if col == "*" {
                    return Err(TrellisError::Semantic {
                        message: "can not use `*' to reference a vertex id column".to_string(),
                    });
                }
                self.from_kind = kind;
                self.var_name = var;
                self.col_name = Some(col);
            }
            FromClause::Vids(exprs) => {
                for expr in exprs.clone() {
                    let value = expr_eval::eval(&expr, &NoGetters)?;
                    if let Expr::FunctionCall { name, .. } = &expr
                        && name == "near"
                    {
                        for part in value.as_str()?.split(',') {
                            let part = part.trim();
                            if part.is_empty() {
                                continue;
                            }
                            let vid = part.parse::<VertexId>().map_err(|_| {
                                TrellisError::Semantic {
                                    message: "vertex id should be of type integer".to_string(),
                                }
                            })?;
                            self.starts.push(vid);
                        }
                        continue;
                    }
                    match value {
                        Value::Int(vid) => self.starts.push(vid),
                        _ => {
                            return Err(TrellisError::Semantic {
                                message: "vertex id should be of type integer".to_string(),
                            });
                        }
                    }
                }
                self.from_kind = FromKind::Instant;
            }
        }
        Ok(())
    }

    fn prepare_over(&mut self) -> Result<()> {
        self.reversely = self.stmt.over.reversely;
        if self.reversely {
            self.edge_holder = Some(EdgeHolder::default());
        }

        for edge in self.stmt.over.edges.clone() {
            match edge {
                OverEdge::All => {
                    self.over_all = true;
                    return self.prepare_over_all();
                }
                OverEdge::Edge { name, alias } => {
                    let ty = self
                        .ctx
                        .schema()
                        .edge_type(self.ctx.space(), &name)
                        .map_err(|_| TrellisError::EdgeNotFound { edge: name.clone() })?;
                    let ty = if self.reversely { -ty } else { ty };
                    self.edge_types.push(ty);
                    self.add_edge_alias(alias.unwrap_or(name), ty)?;
                }
            }
        }
        Ok(())
    }

    fn prepare_over_all(&mut self) -> Result<()> {
        let space = self.ctx.space();
        for name in self.ctx.schema().all_edges(space)? {
            let ty = self.ctx.schema().edge_type(space, &name)?;
            let ty = if self.reversely { -ty } else { ty };
            self.edge_types.push(ty);
            self.add_edge_alias(name, ty)?;
        }
        Ok(())
    }

    fn add_edge_alias(&mut self, alias: String, ty: EdgeType) -> Result<()> {
        if self.edge_aliases.insert(alias.clone(), ty).is_some() {
            return Err(TrellisError::Semantic {
                message: format!("edge alias({}) was dup", alias),
            });
        }
        Ok(())
    }

    fn prepare_where(&mut self) -> Result<()> {
        if let Some(clause) = &self.stmt.where_clause {
            self.deps.collect(&clause.filter);
            self.pushdown_filter = PushdownFilter::generate(&clause.filter);
            self.filter = Some(clause.filter.clone());
        }
        Ok(())
    }

    fn prepare_yield(&mut self) -> Result<()> {
        if let Some(clause) = &self.stmt.yield_clause {
            for col in &clause.columns {
                if col.agg_fun.is_some() {
                    return Err(TrellisError::Syntax {
                        message: "do not support aggregated query without group by".to_string(),
                    });
                }
            }
            self.yields = clause.columns.clone();
        }
        Ok(())
    }

    fn prepare_needed_props(&mut self) -> Result<()> {
        for col in &self.yields {
            self.deps.collect(&col.expr);
        }

        if self.deps.has_variable_props() {
            if self.from_kind != FromKind::Variable {
                return Err(TrellisError::Semantic {
                    message: "a variable must be referred in FROM before used in WHERE or YIELD"
                        .to_string(),
                });
            }
            if self.deps.variables.len() > 1 {
                return Err(TrellisError::Semantic {
                    message: "only one variable allowed to use".to_string(),
                });
            }
            if let Some(var) = self.deps.variables.iter().next()
                && Some(var) != self.var_name.as_ref()
            {
                return Err(TrellisError::Semantic {
                    message: format!(
                        "variable name not match: `{}' vs. `{}'",
                        var,
                        self.var_name.as_deref().unwrap_or("")
                    ),
                });
            }
        }

        if self.deps.has_input_props() && self.from_kind != FromKind::Pipe {
            return Err(TrellisError::Semantic {
                message: "`$-' must be referred in FROM before used in WHERE or YIELD".to_string(),
            });
        }

        let tags: Vec<String> = self
            .deps
            .tag_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        for tag in tags {
            let id = self
                .ctx
                .schema()
                .tag_id(self.ctx.space(), &tag)
                .map_err(|_| TrellisError::TagNotFound { tag: tag.clone() })?;
            self.tag_ids.insert(tag, id);
        }
        Ok(())
    }

    fn prepare_distinct(&mut self) -> Result<()> {
        if let Some(clause) = &self.stmt.yield_clause {
            self.distinct = clause.distinct;
            self.distinct_pushdown = !((self.deps.has_src_tag_props()
                || !self.deps.alias_props.is_empty())
                && self.deps.has_dst_tag_props());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Start-set resolution
    // ------------------------------------------------------------------

    fn setup_starts(&mut self) -> Result<()> {
        // Literal vertex ids
        if !self.starts.is_empty() {
            return Ok(());
        }

        let inputs = match self.from_kind {
            FromKind::Variable => {
                let var = self.var_name.clone().unwrap_or_default();
                Some(self.ctx.variables().get(&var).ok_or_else(|| {
                    TrellisError::Semantic {
                        message: format!("variable `{}' not defined", var),
                    }
                })?)
            }
            FromKind::Pipe => self.inputs.clone(),
            FromKind::Instant => None,
        };

        // No error happened, but we are having empty inputs
        let Some(inputs) = inputs else {
            return Ok(());
        };
        if !inputs.has_data() {
            return Ok(());
        }

        let col = self
            .col_name
            .clone()
            .ok_or_else(|| TrellisError::Internal(anyhow!("input column name missing")))?;
        self.starts = inputs.vids(&col)?;
        self.index = Some(VidIndex::build(inputs, &col)?);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Hop loop
    // ------------------------------------------------------------------

    /// Props storage must return for the current hop. Intermediate hops
    /// need only the destination to advance.
    fn step_out_props(&self) -> Result<Vec<PropDef>> {
        let mut props = Vec::new();
        for &ty in &self.edge_types {
            props.push(PropDef::edge(schema::DST, ty));
            // Reverse traversal needs the rank to key the edge fetch
            // after the final hop.
            if self.is_final_step() && self.reversely {
                props.push(PropDef::edge(schema::RANK, ty));
            }
        }
        if !self.is_final_step() {
            return Ok(props);
        }

        for (tag, prop) in &self.deps.src_tag_props {
            let tag_id = self
                .tag_ids
                .get(tag)
                .ok_or_else(|| TrellisError::Semantic {
                    message: format!("no schema found for `{}'", tag),
                })?;
            props.push(PropDef::source(prop, *tag_id));
        }

        if self.reversely {
            return Ok(props);
        }
        for (edge, prop) in &self.deps.alias_props {
            if prop == schema::DST {
                continue;
            }
            let ty = self
                .edge_aliases
                .get(edge)
                .ok_or_else(|| TrellisError::EdgeNotFound { edge: edge.clone() })?;
            props.push(PropDef::edge(prop, *ty));
        }
        Ok(props)
    }

    async fn step_out(&mut self) -> Result<RpcResponse<QueryResponse>> {
        self.check_deadline()?;
        let props = self.step_out_props()?;
        let filter = if self.ctx.config().filter_pushdown && self.is_final_step() && !self.reversely
        {
            // Reverse traversal evaluates the filter locally: the rows
            // the shards see flow from the reverse direction.
            self.pushdown_filter.clone()
        } else {
            None
        };

        let started = Instant::now();
        let result = self
            .ctx
            .storage()
            .get_neighbors(
                self.ctx.space(),
                self.starts.clone(),
                self.edge_types.clone(),
                filter,
                props,
            )
            .await
            .map_err(|e| TrellisError::Rpc {
                message: format!("exception when handling out-bounds/in-bounds: {}", e),
            })?;

        if result.completeness == 0 {
            return Err(TrellisError::Rpc {
                message: "get neighbors failed".to_string(),
            });
        } else if result.completeness != 100 {
            // Storage is best-effort across shards; keep going with what
            // answered and let the caller see the shortfall in the logs.
            warn!(
                completeness = result.completeness,
                "get neighbors partially failed"
            );
            for &(part, code) in &result.failed_parts {
                error!(part, code, "failed part");
            }
        }
        if self.ctx.config().trace_traversal {
            info!(
                step = self.cur_step,
                vertices = self.starts.len(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "step finished"
            );
            for host in &result.host_latency {
                info!(
                    host = %host.host,
                    latency_us = host.latency_us,
                    total_latency_us = host.total_latency_us,
                    "host latency"
                );
            }
        }
        Ok(result)
    }

    /// Unique destinations of this hop. On intermediate hops each edge
    /// also records its lineage so projection can find the root later.
    fn collect_dst_ids(&mut self, rpc: &RpcResponse<QueryResponse>) -> Vec<VertexId> {
        let track = !self.is_final_step();
        let mut set = FxHashSet::default();
        for resp in &rpc.responses {
            for vdata in &resp.vertices {
                for edata in &vdata.edge_data {
                    for edge in &edata.edges {
                        if track && let Some(bt) = self.back_tracker.as_mut() {
                            bt.add(vdata.vertex_id, edge.dst);
                        }
                        set.insert(edge.dst);
                    }
                }
            }
        }
        set.into_iter().collect()
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    async fn maybe_finish(&mut self, rpc: RpcResponse<QueryResponse>) -> Result<()> {
        let require_dst_props = self.deps.has_dst_tag_props();
        let require_edge_props = !self.deps.alias_props.is_empty();

        // Forward traversal with no destination props, or reverse with
        // nothing to fetch at all, projects straight off the response.
        if (!require_dst_props && !self.reversely)
            || (self.reversely
                && !require_dst_props
                && !require_edge_props
                && !(self.over_all && self.yields.is_empty()))
        {
            return self.finish(rpc);
        }

        let dst_ids = self.collect_dst_ids(&rpc);
        // Reaching the dead end
        if dst_ids.is_empty() {
            return self.on_empty_inputs();
        }

        if !self.reversely || (require_dst_props && !require_edge_props) {
            return self.fetch_vertex_props(dst_ids, rpc).await;
        }

        self.fetch_edge_props(rpc, dst_ids).await
    }

    /// Reverse-mode second round-trip: key every observed edge by its
    /// forward identity and fetch the referenced props per positive
    /// type, in parallel.
    async fn fetch_edge_props(
        &mut self,
        rpc: RpcResponse<QueryResponse>,
        dst_ids: Vec<VertexId>,
    ) -> Result<()> {
        self.check_deadline()?;

        let mut keys_by_type: FxHashMap<EdgeType, Vec<EdgeKey>> = FxHashMap::default();
        for resp in &rpc.responses {
            for vdata in &resp.vertices {
                for edata in &vdata.edge_data {
                    let Some(edge_schema) = resp.edge_schema.get(&edata.edge_type) else {
                        continue;
                    };
                    for edge in &edata.edges {
                        let rank = codec::read_prop(&edge.props, edge_schema, schema::RANK)
                            .and_then(|v| v.as_int())
                            .map_err(|_| TrellisError::Data {
                                message: "get rank error when going reversely".to_string(),
                            })?;
                        let ty = edata.edge_type.abs();
                        // The edge seen from the reverse side: our dst is
                        // the forward source.
                        keys_by_type
                            .entry(ty)
                            .or_default()
                            .push(EdgeKey::new(edge.dst, vdata.vertex_id, ty, rank));
                    }
                }
            }
        }

        let mut props_by_type: FxHashMap<EdgeType, Vec<PropDef>> = FxHashMap::default();
        for (edge, prop) in &self.deps.alias_props {
            let ty = self
                .edge_aliases
                .get(edge)
                .ok_or_else(|| TrellisError::Semantic {
                    message: format!("no schema found for `{}'", edge),
                })?;
            let ty = ty.abs();
            props_by_type
                .entry(ty)
                .or_default()
                .push(PropDef::edge(prop, ty));
        }

        let storage = self.ctx.storage().clone();
        let space = self.ctx.space();
        let futures: Vec<_> = keys_by_type
            .into_iter()
            .map(|(ty, keys)| {
                let props = props_by_type.get(&ty).cloned().unwrap_or_default();
                storage.get_edge_props(space, keys, props)
            })
            .collect();

        let results = try_join_all(futures)
            .await
            .map_err(|e| TrellisError::Rpc {
                message: format!("exception when getting edge props in reverse traversal: {}", e),
            })?;

        let holder = self
            .edge_holder
            .as_mut()
            .ok_or_else(|| TrellisError::Internal(anyhow!("edge holder missing in reverse mode")))?;
        for result in &results {
            for resp in &result.responses {
                holder.add(resp)?;
            }
        }

        if self.deps.has_dst_tag_props() {
            return self.fetch_vertex_props(dst_ids, rpc).await;
        }
        self.finish(rpc)
    }

    fn dst_props(&self) -> Result<Vec<PropDef>> {
        let mut props = Vec::new();
        for (tag, prop) in &self.deps.dst_tag_props {
            let tag_id = self
                .tag_ids
                .get(tag)
                .ok_or_else(|| TrellisError::Semantic {
                    message: format!("no schema found for `{}'", tag),
                })?;
            props.push(PropDef::dest(prop, *tag_id));
        }
        Ok(props)
    }

    async fn fetch_vertex_props(
        &mut self,
        ids: Vec<VertexId>,
        rpc: RpcResponse<QueryResponse>,
    ) -> Result<()> {
        self.check_deadline()?;
        let props = self.dst_props()?;
        let result = self
            .ctx
            .storage()
            .get_vertex_props(self.ctx.space(), ids, props)
            .await
            .map_err(|e| TrellisError::Rpc {
                message: format!("exception when getting destination vertices: {}", e),
            })?;

        if result.completeness == 0 {
            return Err(TrellisError::Rpc {
                message: "get dest props failed".to_string(),
            });
        } else if result.completeness != 100 {
            warn!(
                completeness = result.completeness,
                "get dest props partially failed"
            );
            for &(part, code) in &result.failed_parts {
                error!(part, code, "failed part");
            }
        }

        let holder = self.vertex_holder.get_or_insert_with(VertexHolder::default);
        for resp in &result.responses {
            holder.add(resp);
        }
        self.finish(rpc)
    }

    // ------------------------------------------------------------------
    // Projection and output
    // ------------------------------------------------------------------

    fn finish(&mut self, rpc: RpcResponse<QueryResponse>) -> Result<()> {
        // A bare `OVER *` shows one destination column per edge type.
        if self.over_all && self.yields.is_empty() {
            let names = self.edge_names()?;
            if names.is_empty() {
                return Err(TrellisError::Semantic {
                    message: "get edge name failed".to_string(),
                });
            }
            self.yields = names
                .into_iter()
                .map(|edge| YieldColumn::new(Expr::EdgeDstId { edge }))
                .collect();
        }

        match self.on_result.take() {
            Some(on_result) => {
                let outputs = self.setup_interim_result(&rpc)?;
                on_result(outputs)?;
            }
            None => {
                let started = Instant::now();
                let column_names = self.result_column_names();
                let rows = self.to_response_rows(&rpc)?;
                if self.ctx.config().trace_traversal {
                    info!(
                        elapsed_us = started.elapsed().as_micros() as u64,
                        rows = rows.len(),
                        "processed storage response"
                    );
                }
                self.resp = Some(ExecutionResponse { column_names, rows });
            }
        }
        Ok(())
    }

    fn on_empty_inputs(&mut self) -> Result<()> {
        let column_names = self.result_column_names();
        match self.on_result.take() {
            Some(on_result) => on_result(InterimResult::new(column_names)),
            None => {
                if self.resp.is_none() {
                    self.resp = Some(ExecutionResponse {
                        column_names,
                        rows: Vec::new(),
                    });
                }
                Ok(())
            }
        }
    }

    fn edge_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.edge_types.len());
        for &ty in &self.edge_types {
            names.push(self.ctx.schema().edge_name(self.ctx.space(), ty.abs())?);
        }
        Ok(names)
    }

    fn result_column_names(&self) -> Vec<String> {
        self.yields
            .iter()
            .map(|col| match &col.alias {
                Some(alias) => alias.clone(),
                None => col.expr.to_string(),
            })
            .collect()
    }

    fn to_response_rows(&self, rpc: &RpcResponse<QueryResponse>) -> Result<Vec<Row>> {
        let total: i64 = rpc
            .responses
            .iter()
            .filter_map(|r| r.total_edges)
            .sum();
        let mut rows = Vec::with_capacity(total.max(0) as usize);
        self.process_final_result(rpc, |record, col_types| {
            let mut columns = Vec::with_capacity(record.len());
            for (value, ty) in record.iter().zip(col_types) {
                columns.push(to_column_value(*ty, value)?);
            }
            rows.push(Row { columns });
            Ok(())
        })?;
        if self.ctx.config().trace_traversal {
            info!(rows = rows.len(), "total rows");
        }
        Ok(rows)
    }

    fn setup_interim_result(&self, rpc: &RpcResponse<QueryResponse>) -> Result<InterimResult> {
        let column_names = self.result_column_names();
        let mut schema: Option<Schema> = None;
        let mut rows: Vec<Vec<u8>> = Vec::new();

        self.process_final_result(rpc, |record, col_types| {
            if schema.is_none() {
                if record.len() != col_types.len() {
                    return Err(TrellisError::Internal(anyhow!(
                        "record size {} != column type size {}",
                        record.len(),
                        col_types.len()
                    )));
                }
                schema = Some(infer_schema(&record, &column_names, col_types));
            }
            let schema = schema.as_ref().ok_or_else(|| {
                TrellisError::Internal(anyhow!("interim schema missing"))
            })?;
            rows.push(codec::encode(&record, schema)?);
            Ok(())
        })?;

        Ok(match schema {
            Some(schema) => InterimResult::from_rows(column_names, schema, rows),
            None => InterimResult::new(column_names),
        })
    }

    /// Walks every edge record of the final response, applies the
    /// filter, evaluates the yields and hands each surviving tuple to
    /// `on_row` together with the inferred column types.
    fn process_final_result<F>(&self, rpc: &RpcResponse<QueryResponse>, mut on_row: F) -> Result<()>
    where
        F: FnMut(Vec<Value>, &[PropType]) -> Result<()>,
    {
        let col_types: Vec<PropType> = self
            .yields
            .iter()
            .map(|col| self.column_type_of(&col.expr))
            .collect();

        let mut uniq: FxHashSet<u64> = FxHashSet::default();

        for resp in &rpc.responses {
            for vdata in &resp.vertices {
                for edata in &vdata.edge_data {
                    let cur_schema = resp.edge_schema.get(&edata.edge_type);
                    for edge in &edata.edges {
                        let getters = RecordGetters {
                            exec: self,
                            src_id: vdata.vertex_id,
                            dst_id: edge.dst,
                            edge_type: edata.edge_type,
                            edge_row: &edge.props,
                            edge_schema: cur_schema,
                            edge_schemas: &resp.edge_schema,
                            tag_data: &vdata.tag_data,
                            tag_schemas: &resp.vertex_schema,
                        };

                        if let Some(filter) = &self.filter {
                            let keep = expr_eval::eval(filter, &getters)?.as_bool()?;
                            if !keep {
                                continue;
                            }
                        }

                        let mut record = Vec::with_capacity(self.yields.len());
                        for col in &self.yields {
                            record.push(expr_eval::eval(&col.expr, &getters)?);
                        }

                        if self.distinct {
                            let mut hasher = FxHasher::default();
                            record.hash(&mut hasher);
                            if !uniq.insert(hasher.finish()) {
                                continue;
                            }
                        }

                        on_row(record, &col_types)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn prop_from_interim(&self, vid: VertexId, prop: &str) -> Result<Value> {
        let root = match &self.back_tracker {
            Some(bt) => bt.get(vid),
            None => vid,
        };
        self.index
            .as_ref()
            .ok_or_else(|| TrellisError::Internal(anyhow!("input index not built")))?
            .column_with_vid(root, prop)
    }

    /// Declared type of a projection column, resolved from schemas where
    /// one applies; unknown otherwise and the runtime value decides at
    /// serialization.
    fn column_type_of(&self, expr: &Expr) -> PropType {
        let space = self.ctx.space();
        match expr {
            Expr::Literal(_)
            | Expr::FunctionCall { .. }
            | Expr::Unary { .. }
            | Expr::Arithmetic { .. } => PropType::Unknown,
            Expr::TypeCast { target, .. } => *target,
            Expr::Relational { .. } | Expr::Logical { .. } => PropType::Bool,
            Expr::EdgeDstId { .. } | Expr::EdgeSrcId { .. } => PropType::Vid,
            Expr::EdgeRank { .. } | Expr::EdgeTypeId { .. } => PropType::Int,
            Expr::SrcTagProp { tag, prop } | Expr::DstTagProp { tag, prop } => self
                .tag_ids
                .get(tag)
                .and_then(|tag_id| self.ctx.schema().tag_schema(space, *tag_id))
                .and_then(|schema| schema.field_type(prop))
                .unwrap_or(PropType::Unknown),
            Expr::AliasProp { edge, prop } => self
                .ctx
                .schema()
                .edge_type(space, edge)
                .ok()
                .and_then(|ty| self.ctx.schema().edge_schema(space, ty.abs()))
                .and_then(|schema| schema.field_type(prop))
                .unwrap_or(PropType::Unknown),
            Expr::VariableProp { prop, .. } | Expr::InputProp { prop } => self
                .index
                .as_ref()
                .map(|index| index.column_type(prop))
                .unwrap_or(PropType::Unknown),
        }
    }
}

/// Getter bundle for one edge record of the final response. Borrows the
/// record and the executor's side tables for a single evaluation.
struct RecordGetters<'a> {
    exec: &'a GoExecutor,
    src_id: VertexId,
    dst_id: VertexId,
    edge_type: EdgeType,
    edge_row: &'a [u8],
    edge_schema: Option<&'a Schema>,
    edge_schemas: &'a HashMap<EdgeType, Schema>,
    tag_data: &'a [trellis_store::wire::TagData],
    tag_schemas: &'a HashMap<TagId, Schema>,
}

impl Getters for RecordGetters<'_> {
    fn edge_dst_id(&self, edge: &str) -> Result<Value> {
        if self.exec.edge_types.len() > 1 {
            let ty = self
                .exec
                .edge_aliases
                .get(edge)
                .ok_or_else(|| TrellisError::Semantic {
                    message: format!("get edge type for `{}' failed", edge),
                })?;
            if *ty != self.edge_type {
                return Ok(Value::Int(0));
            }
        }
        Ok(Value::Int(if self.exec.reversely {
            self.src_id
        } else {
            self.dst_id
        }))
    }

    fn src_tag_prop(&self, tag: &str, prop: &str) -> Result<Value> {
        let tag_id = self
            .exec
            .tag_ids
            .get(tag)
            .ok_or_else(|| TrellisError::Semantic {
                message: format!("get tag id for `{}' failed", tag),
            })?;

        let Some(td) = self.tag_data.iter().find(|td| td.tag_id == *tag_id) else {
            // The vertex does not carry the tag; default from its schema.
            let schema = self
                .exec
                .ctx
                .schema()
                .tag_schema(self.exec.ctx.space(), *tag_id)
                .ok_or_else(|| TrellisError::Semantic {
                    message: format!("no tag schema for `{}'", tag),
                })?;
            return codec::default_prop(&schema, prop);
        };

        let schema = self
            .tag_schemas
            .get(tag_id)
            .ok_or_else(|| TrellisError::Data {
                message: format!("no schema for tag `{}' in response", tag),
            })?;
        codec::read_prop(&td.data, schema, prop).map_err(|_| TrellisError::Data {
            message: format!("get prop({}.{}) failed", tag, prop),
        })
    }

    fn dst_tag_prop(&self, tag: &str, prop: &str) -> Result<Value> {
        let tag_id = self
            .exec
            .tag_ids
            .get(tag)
            .ok_or_else(|| TrellisError::Semantic {
                message: format!("get tag id for `{}' failed", tag),
            })?;
        self.exec
            .vertex_holder
            .as_ref()
            .ok_or_else(|| TrellisError::Internal(anyhow!("vertex holder not populated")))?
            .get(self.dst_id, *tag_id, prop)
    }

    fn alias_prop(&self, edge: &str, prop: &str) -> Result<Value> {
        let ty = self
            .exec
            .edge_aliases
            .get(edge)
            .ok_or_else(|| TrellisError::Semantic {
                message: format!("get edge type for `{}' failed", edge),
            })?;

        if self.exec.reversely {
            let holder = self
                .exec
                .edge_holder
                .as_ref()
                .ok_or_else(|| TrellisError::Internal(anyhow!("edge holder not populated")))?;
            if self.edge_type != *ty {
                return holder.default_prop(ty.abs(), prop);
            }
            // The holder keys by forward identity: our dst is the
            // forward source.
            return holder.get(self.dst_id, self.src_id, self.edge_type.abs(), prop);
        }

        if self.edge_type != *ty {
            let schema = self
                .edge_schemas
                .get(ty)
                .ok_or_else(|| TrellisError::Data {
                    message: format!("get schema failed for `{}'", edge),
                })?;
            return codec::default_prop(schema, prop);
        }
        let schema = self.edge_schema.ok_or_else(|| TrellisError::Data {
            message: format!("get schema failed for `{}'", edge),
        })?;
        codec::read_prop(self.edge_row, schema, prop).map_err(|_| TrellisError::Data {
            message: format!("get prop({}.{}) failed", edge, prop),
        })
    }

    fn variable_prop(&self, prop: &str) -> Result<Value> {
        self.exec.prop_from_interim(self.src_id, prop)
    }

    fn input_prop(&self, prop: &str) -> Result<Value> {
        self.exec.prop_from_interim(self.src_id, prop)
    }
}

/// Chooses the terminal cell representation for one value.
fn to_column_value(ty: PropType, value: &Value) -> Result<ColumnValue> {
    Ok(match ty {
        PropType::Bool => ColumnValue::Bool(value.as_bool()?),
        PropType::Int => ColumnValue::Integer(value.as_int()?),
        PropType::Timestamp => ColumnValue::Timestamp(value.as_int()?),
        PropType::Vid => ColumnValue::Id(value.as_int()?),
        PropType::Double => ColumnValue::DoublePrecision(value.as_float()?),
        PropType::Float => ColumnValue::SinglePrecision(value.as_float()? as f32),
        PropType::String => ColumnValue::Str(value.as_str()?.to_string()),
        // Unknown column types take the runtime kind of the value.
        _ => match value {
            Value::Bool(b) => ColumnValue::Bool(*b),
            Value::Int(i) => ColumnValue::Integer(*i),
            Value::Float(f) => ColumnValue::DoublePrecision(*f),
            Value::Str(s) => ColumnValue::Str(s.clone()),
            _ => unreachable!("Value has no other variants"),
        },
    })
}

/// Interim schema from the first yielded row: declared types where the
/// expressions had one, runtime kinds elsewhere. Timestamp columns
/// materialize as their integer payload.
fn infer_schema(record: &[Value], names: &[String], col_types: &[PropType]) -> Schema {
    let mut schema = Schema::default();
    for ((value, name), ty) in record.iter().zip(names).zip(col_types) {
        let resolved = match ty {
            PropType::Bool
            | PropType::Int
            | PropType::Vid
            | PropType::Float
            | PropType::Double
            | PropType::String => *ty,
            PropType::Timestamp => PropType::Int,
            _ => match value {
                Value::Bool(_) => PropType::Bool,
                Value::Int(_) => PropType::Int,
                Value::Float(_) => PropType::Double,
                Value::Str(_) => PropType::String,
                _ => unreachable!("Value has no other variants"),
            },
        };
        schema = schema.with_field(name, resolved);
    }
    schema
}
