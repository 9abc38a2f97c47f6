//! Executable plan nodes handed to the runtime.
//!
//! A node has linked children, which run as separate pipeline stages, and inline
//! nodes, which are fused into the node's own execution loop. At most one inline node
//! of each type is kept. Nodes are built once by lowering and are read-only afterwards.

use super::schema::NodeSchema;
use crate::expression::Expr;
use crate::physical::{JoinKind, LimitOffset, RangeBound, ScanDirection};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier of a plan node, unique within one compiled plan
pub type PlanNodeId = u32;

/// Plan node type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanNodeType {
    SeqScan,
    IndexScan,
    NestLoop,
    NestLoopIndex,
}

impl PlanNodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanNodeType::SeqScan => "SEQSCAN",
            PlanNodeType::IndexScan => "INDEXSCAN",
            PlanNodeType::NestLoop => "NESTLOOP",
            PlanNodeType::NestLoopIndex => "NESTLOOPINDEX",
        }
    }
}

impl fmt::Display for PlanNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific payload of a plan node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeDetail {
    SeqScan {
        table: String,
        predicate: Option<Expr>,
    },
    IndexScan {
        table: String,
        index: String,
        direction: ScanDirection,
        /// One expression per equality-matched key column
        search_keys: Vec<Expr>,
        /// Trailing range bound on the next key column
        range: Option<RangeBound>,
        /// Residual predicate evaluated on every fetched row
        predicate: Option<Expr>,
    },
    NestLoop {
        join_type: JoinKind,
        join_predicate: Expr,
    },
    NestLoopIndex {
        join_type: JoinKind,
        join_predicate: Expr,
    },
}

impl NodeDetail {
    pub fn node_type(&self) -> PlanNodeType {
        match self {
            NodeDetail::SeqScan { .. } => PlanNodeType::SeqScan,
            NodeDetail::IndexScan { .. } => PlanNodeType::IndexScan,
            NodeDetail::NestLoop { .. } => PlanNodeType::NestLoop,
            NodeDetail::NestLoopIndex { .. } => PlanNodeType::NestLoopIndex,
        }
    }

    /// Scan predicate, if this is a scan
    pub fn predicate(&self) -> Option<&Expr> {
        match self {
            NodeDetail::SeqScan { predicate, .. } | NodeDetail::IndexScan { predicate, .. } => {
                predicate.as_ref()
            }
            _ => None,
        }
    }

    pub fn join_predicate(&self) -> Option<&Expr> {
        match self {
            NodeDetail::NestLoop { join_predicate, .. } | NodeDetail::NestLoopIndex { join_predicate, .. } => {
                Some(join_predicate)
            }
            _ => None,
        }
    }

    /// Single-line summary used by debug output.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        match self {
            NodeDetail::SeqScan { table, predicate } => {
                parts.push(format!("table={}", table));
                if let Some(p) = predicate {
                    parts.push(format!("predicate={}", p));
                }
            }
            NodeDetail::IndexScan {
                table,
                index,
                direction,
                search_keys,
                range,
                predicate,
            } => {
                parts.push(format!("table={}", table));
                parts.push(format!("index={}", index));
                parts.push(format!("direction={:?}", direction));
                let keys: Vec<String> = search_keys.iter().map(|k| k.to_string()).collect();
                parts.push(format!("keys=[{}]", keys.join(", ")));
                if let Some(range) = range {
                    parts.push(format!("range={} {}", range.op.symbol(), range.bound));
                }
                if let Some(p) = predicate {
                    parts.push(format!("predicate={}", p));
                }
            }
            NodeDetail::NestLoop {
                join_type,
                join_predicate,
            }
            | NodeDetail::NestLoopIndex {
                join_type,
                join_predicate,
            } => {
                parts.push(format!("joinType={}", join_type));
                parts.push(format!("predicate={}", join_predicate));
            }
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    id: PlanNodeId,
    node_type: PlanNodeType,
    schema: NodeSchema,
    detail: NodeDetail,
    inline_nodes: Vec<PlanNode>,
    children: Vec<PlanNode>,
    limit_offset: Option<LimitOffset>,
    is_inline: bool,
}

impl PlanNode {
    pub fn new(id: PlanNodeId, detail: NodeDetail, schema: NodeSchema) -> Self {
        Self {
            id,
            node_type: detail.node_type(),
            schema,
            detail,
            inline_nodes: Vec::new(),
            children: Vec::new(),
            limit_offset: None,
            is_inline: false,
        }
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn node_type(&self) -> PlanNodeType {
        self.node_type
    }

    pub fn schema(&self) -> &NodeSchema {
        &self.schema
    }

    pub fn detail(&self) -> &NodeDetail {
        &self.detail
    }

    pub fn children(&self) -> &[PlanNode] {
        &self.children
    }

    pub fn inline_nodes(&self) -> &[PlanNode] {
        &self.inline_nodes
    }

    pub fn inline_node(&self, node_type: PlanNodeType) -> Option<&PlanNode> {
        self.inline_nodes.iter().find(|n| n.node_type == node_type)
    }

    pub fn limit_offset(&self) -> Option<&LimitOffset> {
        self.limit_offset.as_ref()
    }

    /// True when this node runs fused inside its parent.
    pub fn is_inline(&self) -> bool {
        self.is_inline
    }

    pub(crate) fn add_child(&mut self, child: PlanNode) {
        self.children.push(child);
    }

    /// Registers `node` as inline; an existing inline node of the same type is replaced.
    pub(crate) fn add_inline(&mut self, mut node: PlanNode) {
        node.is_inline = true;
        match self.inline_nodes.iter_mut().find(|n| n.node_type == node.node_type) {
            Some(slot) => *slot = node,
            None => self.inline_nodes.push(node),
        }
    }

    pub(crate) fn set_limit_offset(&mut self, limit_offset: Option<LimitOffset>) {
        self.limit_offset = limit_offset;
    }

    pub(crate) fn set_schema(&mut self, schema: NodeSchema) {
        self.schema = schema;
    }

    pub(crate) fn detail_mut(&mut self) -> &mut NodeDetail {
        &mut self.detail
    }

    /// Number of nodes in this tree, inline nodes included.
    pub fn node_count(&self) -> usize {
        1 + self
            .inline_nodes
            .iter()
            .chain(&self.children)
            .map(PlanNode::node_count)
            .sum::<usize>()
    }

    /// Finds a node by id anywhere in this tree.
    pub fn find(&self, id: PlanNodeId) -> Option<&PlanNode> {
        if self.id == id {
            return Some(self);
        }
        self.inline_nodes
            .iter()
            .chain(&self.children)
            .find_map(|n| n.find(id))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a plan tree and checks the structural invariants the runtime relies on.
    pub fn from_json(json: &str) -> Result<Self> {
        let node: PlanNode = serde_json::from_str(json)?;
        let mut ids = HashSet::new();
        node.check_structure(&mut ids)?;
        Ok(node)
    }

    fn check_structure(&self, ids: &mut HashSet<PlanNodeId>) -> Result<()> {
        if self.node_type != self.detail.node_type() {
            return Err(Error::Serialization(format!(
                "plan node {} is tagged {} but carries {} detail",
                self.id,
                self.node_type,
                self.detail.node_type()
            )));
        }
        if !ids.insert(self.id) {
            return Err(Error::Serialization(format!("duplicate plan node id {}", self.id)));
        }
        let mut inline_types = HashSet::new();
        for inline in &self.inline_nodes {
            if !inline_types.insert(inline.node_type) {
                return Err(Error::Serialization(format!(
                    "plan node {} has more than one inline {} node",
                    self.id, inline.node_type
                )));
            }
            inline.check_structure(ids)?;
        }
        for child in &self.children {
            child.check_structure(ids)?;
        }
        Ok(())
    }
}
