// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Trellis Team

//! In-memory storage fleet and schema registry for executor tests.
//!
//! One `TestBackend` plays both collaborator roles: it owns the graph,
//! answers the three fan-out calls over it, and resolves names to ids.
//! Shard failure is simulated by dropping the vertices a "failed" shard
//! would have owned and lowering the reported completeness.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use trellis_common::core::id::{EdgeKey, EdgeType, SpaceId, TagId, VertexId};
use trellis_common::core::schema::{self, PropType, Schema, SchemaRegistry};
use trellis_common::core::value::Value;
use trellis_common::{Result, TrellisError};
use trellis_query::query::ast::{
    FromClause, GoStatement, OverClause, OverEdge, StepClause, WhereClause, YieldClause,
    YieldColumn,
};
use trellis_query::query::expr::Expr;
use trellis_query::{ColumnValue, ExecutionContext, ExecutionResponse, GoExecutor, InterimResult};
use trellis_store::client::StorageClient;
use trellis_store::wire::{
    EdgeData, EdgePropResponse, EdgeRecord, PropDef, PropId, PropOwner, QueryResponse, RpcResponse,
    TagData, VertexData,
};
use trellis_store::codec;

pub struct StoredEdge {
    pub src: VertexId,
    pub dst: VertexId,
    pub edge_type: EdgeType,
    pub rank: i64,
    pub props: HashMap<String, Value>,
}

#[derive(Clone, Default)]
pub struct Fault {
    pub completeness: u32,
    pub failed_parts: Vec<(i32, i32)>,
    pub drop_vertices: HashSet<VertexId>,
}

#[derive(Default)]
pub struct TestBackend {
    space: SpaceId,
    tags: HashMap<String, TagId>,
    tag_schemas: HashMap<TagId, Arc<Schema>>,
    edges: HashMap<String, EdgeType>,
    edge_schemas: HashMap<EdgeType, Arc<Schema>>,
    vertices: HashMap<VertexId, HashMap<TagId, HashMap<String, Value>>>,
    stored_edges: Vec<StoredEdge>,

    pub neighbors_fault: Mutex<Option<Fault>>,
    /// Pushdown filter string of every get_neighbors call, in order.
    pub filters_seen: Mutex<Vec<Option<String>>>,
    /// Requested props of every get_neighbors call, in order.
    pub props_seen: Mutex<Vec<Vec<PropDef>>>,
}

impl TestBackend {
    pub fn new(space: SpaceId) -> Self {
        Self {
            space,
            ..Default::default()
        }
    }

    pub fn space(&self) -> SpaceId {
        self.space
    }

    pub fn add_tag(&mut self, name: &str, id: TagId, fields: &[(&str, PropType)]) {
        self.tags.insert(name.to_string(), id);
        let mut schema = Schema::default();
        for (field, ty) in fields {
            schema = schema.with_field(field, *ty);
        }
        self.tag_schemas.insert(id, Arc::new(schema));
    }

    pub fn add_edge_type(&mut self, name: &str, ty: EdgeType, fields: &[(&str, PropType)]) {
        assert!(ty > 0, "edge types register under their forward id");
        self.edges.insert(name.to_string(), ty);
        let mut schema = Schema::default();
        for (field, field_ty) in fields {
            schema = schema.with_field(field, *field_ty);
        }
        self.edge_schemas.insert(ty, Arc::new(schema));
    }

    pub fn add_vertex(&mut self, vid: VertexId, tag: &str, props: &[(&str, Value)]) {
        let tag_id = self.tags[tag];
        self.vertices.entry(vid).or_default().insert(
            tag_id,
            props
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        );
    }

    pub fn add_edge(&mut self, src: VertexId, dst: VertexId, edge: &str, props: &[(&str, Value)]) {
        self.add_ranked_edge(src, dst, edge, 0, props);
    }

    pub fn add_ranked_edge(
        &mut self,
        src: VertexId,
        dst: VertexId,
        edge: &str,
        rank: i64,
        props: &[(&str, Value)],
    ) {
        self.stored_edges.push(StoredEdge {
            src,
            dst,
            edge_type: self.edges[edge],
            rank,
            props: props
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        });
    }

    fn reserved_type(name: &str) -> Option<PropType> {
        match name {
            schema::SRC | schema::DST => Some(PropType::Vid),
            schema::TYPE | schema::RANK => Some(PropType::Int),
            _ => None,
        }
    }

    /// Response-side schema for the requested edge props of one signed
    /// type: reserved columns get their fixed types, the rest come from
    /// the edge's declared schema.
    fn edge_response_schema(&self, ty: EdgeType, props: &[&PropDef]) -> Schema {
        let declared = &self.edge_schemas[&ty.abs()];
        let mut schema = Schema::default();
        for prop in props {
            let field_ty = Self::reserved_type(&prop.name)
                .or_else(|| declared.field_type(&prop.name))
                .unwrap_or(PropType::Unknown);
            schema = schema.with_field(&prop.name, field_ty);
        }
        schema
    }

    fn edge_row(
        &self,
        response_schema: &Schema,
        vid: VertexId,
        neighbor: VertexId,
        ty: EdgeType,
        stored: &StoredEdge,
    ) -> Vec<u8> {
        let values: Vec<Value> = response_schema
            .fields()
            .iter()
            .map(|field| match field.name.as_str() {
                schema::SRC => Value::Int(vid),
                schema::DST => Value::Int(neighbor),
                schema::TYPE => Value::Int(ty as i64),
                schema::RANK => Value::Int(stored.rank),
                name => stored
                    .props
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| codec::default_value(field.prop_type).unwrap()),
            })
            .collect();
        codec::encode(&values, response_schema).unwrap()
    }

    /// Edges visible from `vid` along the signed type `ty`: forward
    /// edges leave it, reverse edges arrive at it and show their source
    /// as the neighbor.
    fn visible_edges(&self, vid: VertexId, ty: EdgeType) -> Vec<(&StoredEdge, VertexId)> {
        self.stored_edges
            .iter()
            .filter_map(|e| {
                if ty > 0 && e.edge_type == ty && e.src == vid {
                    Some((e, e.dst))
                } else if ty < 0 && e.edge_type == -ty && e.dst == vid {
                    Some((e, e.src))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl StorageClient for TestBackend {
    async fn get_neighbors(
        &self,
        _space: SpaceId,
        vertices: Vec<VertexId>,
        edge_types: Vec<EdgeType>,
        filter: Option<String>,
        return_props: Vec<PropDef>,
    ) -> Result<RpcResponse<QueryResponse>> {
        self.filters_seen.lock().push(filter);
        self.props_seen.lock().push(return_props.clone());

        let fault = self.neighbors_fault.lock().clone();
        let dropped = fault
            .as_ref()
            .map(|f| f.drop_vertices.clone())
            .unwrap_or_default();

        let mut resp = QueryResponse::default();
        let mut total_edges = 0i64;

        // Request-order props per scope.
        let mut edge_props: HashMap<EdgeType, Vec<&PropDef>> = HashMap::new();
        let mut src_props: HashMap<TagId, Vec<&PropDef>> = HashMap::new();
        for prop in &return_props {
            match (prop.owner, prop.id) {
                (PropOwner::Edge, PropId::Edge(ty)) => {
                    edge_props.entry(ty).or_default().push(prop);
                }
                (PropOwner::Source, PropId::Tag(tag)) => {
                    src_props.entry(tag).or_default().push(prop);
                }
                _ => {}
            }
        }

        for (&ty, props) in &edge_props {
            resp.edge_schema
                .insert(ty, self.edge_response_schema(ty, props));
        }
        for (&tag, props) in &src_props {
            let declared = &self.tag_schemas[&tag];
            let mut schema = Schema::default();
            for prop in props {
                schema = schema.with_field(
                    &prop.name,
                    declared.field_type(&prop.name).unwrap_or(PropType::Unknown),
                );
            }
            resp.vertex_schema.insert(tag, schema);
        }

        for vid in vertices {
            if dropped.contains(&vid) {
                continue;
            }
            let mut vdata = VertexData {
                vertex_id: vid,
                ..Default::default()
            };

            for (&tag, _) in &src_props {
                let Some(tag_values) = self.vertices.get(&vid).and_then(|tags| tags.get(&tag))
                else {
                    continue;
                };
                let response_schema = &resp.vertex_schema[&tag];
                let values: Vec<Value> = response_schema
                    .fields()
                    .iter()
                    .map(|field| {
                        tag_values
                            .get(&field.name)
                            .cloned()
                            .unwrap_or_else(|| codec::default_value(field.prop_type).unwrap())
                    })
                    .collect();
                vdata.tag_data.push(TagData {
                    tag_id: tag,
                    data: codec::encode(&values, response_schema).unwrap(),
                });
            }

            for &ty in &edge_types {
                let Some(response_schema) = resp.edge_schema.get(&ty) else {
                    continue;
                };
                let mut edata = EdgeData {
                    edge_type: ty,
                    ..Default::default()
                };
                for (stored, neighbor) in self.visible_edges(vid, ty) {
                    edata.edges.push(EdgeRecord {
                        dst: neighbor,
                        props: self.edge_row(response_schema, vid, neighbor, ty, stored),
                    });
                    total_edges += 1;
                }
                vdata.edge_data.push(edata);
            }
            resp.vertices.push(vdata);
        }
        resp.total_edges = Some(total_edges);

        let mut rpc = RpcResponse::ok(vec![resp]);
        if let Some(fault) = fault {
            rpc.completeness = fault.completeness;
            rpc.failed_parts = fault.failed_parts;
        }
        Ok(rpc)
    }

    async fn get_vertex_props(
        &self,
        _space: SpaceId,
        vertices: Vec<VertexId>,
        return_props: Vec<PropDef>,
    ) -> Result<RpcResponse<QueryResponse>> {
        let mut dst_props: HashMap<TagId, Vec<&PropDef>> = HashMap::new();
        for prop in &return_props {
            if let (PropOwner::Dest, PropId::Tag(tag)) = (prop.owner, prop.id) {
                dst_props.entry(tag).or_default().push(prop);
            }
        }

        let mut resp = QueryResponse::default();
        for (&tag, props) in &dst_props {
            let declared = &self.tag_schemas[&tag];
            let mut schema = Schema::default();
            for prop in props {
                schema = schema.with_field(
                    &prop.name,
                    declared.field_type(&prop.name).unwrap_or(PropType::Unknown),
                );
            }
            resp.vertex_schema.insert(tag, schema);
        }

        for vid in vertices {
            let Some(tags) = self.vertices.get(&vid) else {
                continue;
            };
            let mut vdata = VertexData {
                vertex_id: vid,
                ..Default::default()
            };
            for (&tag, _) in &dst_props {
                let Some(tag_values) = tags.get(&tag) else {
                    continue;
                };
                let response_schema = &resp.vertex_schema[&tag];
                let values: Vec<Value> = response_schema
                    .fields()
                    .iter()
                    .map(|field| {
                        tag_values
                            .get(&field.name)
                            .cloned()
                            .unwrap_or_else(|| codec::default_value(field.prop_type).unwrap())
                    })
                    .collect();
                vdata.tag_data.push(TagData {
                    tag_id: tag,
                    data: codec::encode(&values, response_schema).unwrap(),
                });
            }
            if !vdata.tag_data.is_empty() {
                resp.vertices.push(vdata);
            }
        }
        Ok(RpcResponse::ok(vec![resp]))
    }

    async fn get_edge_props(
        &self,
        _space: SpaceId,
        edge_keys: Vec<EdgeKey>,
        return_props: Vec<PropDef>,
    ) -> Result<RpcResponse<EdgePropResponse>> {
        let Some(ty) = edge_keys.first().map(|k| k.edge_type) else {
            return Ok(RpcResponse::ok(vec![EdgePropResponse::default()]));
        };

        // Reserved identity columns come first; requested props follow,
        // minus any reserved names already present.
        let mut reserved: Vec<PropDef> = [schema::SRC, schema::DST, schema::TYPE, schema::RANK]
            .iter()
            .map(|name| PropDef::edge(name, ty))
            .collect();
        for prop in &return_props {
            if !schema::is_reserved_prop(&prop.name) {
                reserved.push(prop.clone());
            }
        }
        let refs: Vec<&PropDef> = reserved.iter().collect();
        let response_schema = self.edge_response_schema(ty, &refs);

        let mut data = Vec::new();
        for key in &edge_keys {
            let Some(stored) = self.stored_edges.iter().find(|e| {
                e.edge_type == key.edge_type
                    && e.src == key.src
                    && e.dst == key.dst
                    && e.rank == key.ranking
            }) else {
                continue;
            };
            data.push(self.edge_row(&response_schema, key.src, key.dst, ty, stored));
        }

        Ok(RpcResponse::ok(vec![EdgePropResponse {
            schema: Some(response_schema),
            data,
        }]))
    }
}

impl SchemaRegistry for TestBackend {
    fn tag_id(&self, _space: SpaceId, name: &str) -> Result<TagId> {
        self.tags
            .get(name)
            .copied()
            .ok_or_else(|| TrellisError::TagNotFound {
                tag: name.to_string(),
            })
    }

    fn tag_name(&self, _space: SpaceId, tag: TagId) -> Result<String> {
        self.tags
            .iter()
            .find(|(_, id)| **id == tag)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| TrellisError::TagNotFound {
                tag: tag.to_string(),
            })
    }

    fn edge_type(&self, _space: SpaceId, name: &str) -> Result<EdgeType> {
        self.edges
            .get(name)
            .copied()
            .ok_or_else(|| TrellisError::EdgeNotFound {
                edge: name.to_string(),
            })
    }

    fn edge_name(&self, _space: SpaceId, edge_type: EdgeType) -> Result<String> {
        self.edges
            .iter()
            .find(|(_, ty)| **ty == edge_type)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| TrellisError::EdgeNotFound {
                edge: edge_type.to_string(),
            })
    }

    fn tag_schema(&self, _space: SpaceId, tag: TagId) -> Option<Arc<Schema>> {
        self.tag_schemas.get(&tag).cloned()
    }

    fn edge_schema(&self, _space: SpaceId, edge_type: EdgeType) -> Option<Arc<Schema>> {
        self.edge_schemas.get(&edge_type).cloned()
    }

    fn all_edges(&self, _space: SpaceId) -> Result<Vec<String>> {
        // Stable order keeps `OVER *` column order deterministic.
        let mut names: Vec<(EdgeType, String)> = self
            .edges
            .iter()
            .map(|(name, ty)| (*ty, name.clone()))
            .collect();
        names.sort();
        Ok(names.into_iter().map(|(_, name)| name).collect())
    }
}

pub fn context(backend: &Arc<TestBackend>) -> Arc<ExecutionContext> {
    Arc::new(ExecutionContext::new(
        backend.space(),
        backend.clone() as Arc<dyn StorageClient>,
        backend.clone() as Arc<dyn SchemaRegistry>,
    ))
}

// ----------------------------------------------------------------------
// Statement construction helpers
// ----------------------------------------------------------------------

pub struct Go {
    stmt: GoStatement,
}

impl Go {
    pub fn from_vids(vids: &[VertexId]) -> Self {
        Self::from_exprs(vids.iter().map(|vid| Expr::literal(*vid)).collect())
    }

    pub fn from_exprs(exprs: Vec<Expr>) -> Self {
        Self::with_from(FromClause::Vids(exprs))
    }

    pub fn from_pipe(col: &str) -> Self {
        Self::with_from(FromClause::Ref(Expr::InputProp {
            prop: col.to_string(),
        }))
    }

    pub fn from_var(var: &str, col: &str) -> Self {
        Self::with_from(FromClause::Ref(Expr::VariableProp {
            var: var.to_string(),
            prop: col.to_string(),
        }))
    }

    fn with_from(from: FromClause) -> Self {
        Self {
            stmt: GoStatement {
                step: None,
                from,
                over: OverClause {
                    edges: Vec::new(),
                    reversely: false,
                },
                where_clause: None,
                yield_clause: None,
            },
        }
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.stmt.step = Some(StepClause { steps, upto: false });
        self
    }

    pub fn upto(mut self, steps: u32) -> Self {
        self.stmt.step = Some(StepClause { steps, upto: true });
        self
    }

    pub fn over(mut self, edge: &str) -> Self {
        self.stmt.over.edges.push(OverEdge::Edge {
            name: edge.to_string(),
            alias: None,
        });
        self
    }

    pub fn over_all(mut self) -> Self {
        self.stmt.over.edges.push(OverEdge::All);
        self
    }

    pub fn reversely(mut self) -> Self {
        self.stmt.over.reversely = true;
        self
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.stmt.where_clause = Some(WhereClause { filter });
        self
    }

    pub fn yields(mut self, columns: Vec<YieldColumn>) -> Self {
        self.stmt
            .yield_clause
            .get_or_insert_with(|| YieldClause {
                columns: Vec::new(),
                distinct: false,
            })
            .columns = columns;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.stmt
            .yield_clause
            .get_or_insert_with(|| YieldClause {
                columns: Vec::new(),
                distinct: false,
            })
            .distinct = true;
        self
    }

    pub fn build(self) -> GoStatement {
        self.stmt
    }
}

pub fn edge_dst(edge: &str) -> Expr {
    Expr::EdgeDstId {
        edge: edge.to_string(),
    }
}

pub fn edge_rank(edge: &str) -> Expr {
    Expr::EdgeRank {
        edge: edge.to_string(),
    }
}

pub fn alias_prop(edge: &str, prop: &str) -> Expr {
    Expr::AliasProp {
        edge: edge.to_string(),
        prop: prop.to_string(),
    }
}

pub fn src_prop(tag: &str, prop: &str) -> Expr {
    Expr::SrcTagProp {
        tag: tag.to_string(),
        prop: prop.to_string(),
    }
}

pub fn dst_prop(tag: &str, prop: &str) -> Expr {
    Expr::DstTagProp {
        tag: tag.to_string(),
        prop: prop.to_string(),
    }
}

pub fn input_prop(prop: &str) -> Expr {
    Expr::InputProp {
        prop: prop.to_string(),
    }
}

pub fn var_prop(var: &str, prop: &str) -> Expr {
    Expr::VariableProp {
        var: var.to_string(),
        prop: prop.to_string(),
    }
}

// ----------------------------------------------------------------------
// Execution helpers
// ----------------------------------------------------------------------

pub async fn run_terminal(
    stmt: GoStatement,
    ctx: Arc<ExecutionContext>,
) -> Result<ExecutionResponse> {
    let mut exec = GoExecutor::new(stmt, ctx);
    exec.execute().await?;
    exec.setup_response()
}

pub async fn run_pipe(stmt: GoStatement, ctx: Arc<ExecutionContext>) -> Result<InterimResult> {
    let captured: Arc<Mutex<Option<InterimResult>>> = Arc::new(Mutex::new(None));
    let sink = captured.clone();
    let mut exec = GoExecutor::new(stmt, ctx);
    exec.set_on_result(Box::new(move |result| {
        *sink.lock() = Some(result);
        Ok(())
    }));
    exec.execute().await?;
    captured
        .lock()
        .take()
        .ok_or_else(|| TrellisError::Data {
            message: "pipe consumer never ran".to_string(),
        })
}

/// Flattens integer-typed cells (Integer/Id/Timestamp) for set
/// comparisons; panics on anything else.
pub fn int_rows(resp: &ExecutionResponse) -> Vec<Vec<i64>> {
    resp.rows
        .iter()
        .map(|row| {
            row.columns
                .iter()
                .map(|col| match col {
                    ColumnValue::Integer(i) | ColumnValue::Id(i) | ColumnValue::Timestamp(i) => *i,
                    other => panic!("expected integer cell, got {:?}", other),
                })
                .collect()
        })
        .collect()
}

pub fn sorted_int_rows(resp: &ExecutionResponse) -> Vec<Vec<i64>> {
    let mut rows = int_rows(resp);
    rows.sort();
    rows
}
