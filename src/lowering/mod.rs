//! Plan Lowering Engine
//!
//! Turns a winning physical operator tree into executable plan nodes in one bottom-up
//! pass. Index joins are fused: the inner index scan is inlined into the join node and
//! its residual predicate is rebased onto the inner table index. Node ids are assigned
//! in post-order starting at 1, so lowering the same tree twice gives the same result.

pub mod schema;

use crate::expression::{Expr, INNER_TABLE_INDEX};
use crate::physical::{JoinCore, JoinKind, PhysicalOperator};
use crate::plan::{NodeDetail, PlanNode, PlanNodeId, PlanNodeType};
use crate::{Error, Result};
use tracing::debug;

pub use schema::{join_output_schema, scan_output_schema};

/// Lowers `op` with a fresh id counter.
pub fn lower(op: &PhysicalOperator) -> Result<PlanNode> {
    PlanLowerer::new().lower(op)
}

/// Lowering state for one compilation
#[derive(Debug)]
pub struct PlanLowerer {
    next_id: PlanNodeId,
}

impl Default for PlanLowerer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanLowerer {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    pub fn lower(&mut self, op: &PhysicalOperator) -> Result<PlanNode> {
        check_supported(op)?;

        let node = match op {
            PhysicalOperator::SeqScan(scan) => {
                let detail = NodeDetail::SeqScan {
                    table: scan.table.name.clone(),
                    predicate: scan.filter.clone(),
                };
                let mut node = PlanNode::new(self.allocate_id(), detail, scan_output_schema(scan));
                node.set_limit_offset(scan.limit_offset.clone());
                node
            }
            PhysicalOperator::IndexScan(s) => {
                let path = s.access_path();
                let residual = s.scan.filter.clone().into_iter().chain(path.residual_predicate());
                let detail = NodeDetail::IndexScan {
                    table: s.scan.table.name.clone(),
                    index: s.index().name.clone(),
                    direction: path.direction,
                    search_keys: path.index_exprs.clone(),
                    range: path.range.clone(),
                    predicate: Expr::conjunction(residual),
                };
                let mut node = PlanNode::new(self.allocate_id(), detail, scan_output_schema(&s.scan));
                node.set_limit_offset(s.scan.limit_offset.clone());
                node
            }
            PhysicalOperator::NestLoopJoin(join) => {
                let outer = self.lower(&join.outer)?;
                let inner = self.lower(&join.inner)?;
                let detail = NodeDetail::NestLoop {
                    join_type: join.kind,
                    join_predicate: join.condition.clone(),
                };
                let schema = join_output_schema(&outer, &inner);
                let mut node = PlanNode::new(self.allocate_id(), detail, schema);
                node.add_child(outer);
                node.add_child(inner);
                node.set_limit_offset(join.limit_offset.clone());
                node
            }
            PhysicalOperator::NestLoopIndexJoin(j) => self.lower_index_join(&j.join)?,
        };

        crate::log_lowering!(node);
        Ok(node)
    }

    fn lower_index_join(&mut self, join: &JoinCore) -> Result<PlanNode> {
        let outer = self.lower(&join.outer)?;
        let inner = self.lower(&join.inner)?;
        if inner.node_type() != PlanNodeType::IndexScan {
            return Err(Error::Internal(format!(
                "inner input of index join did not lower to an index scan (got {})",
                inner.node_type()
            )));
        }
        let inner = rebase_inline_scan(inner);

        let detail = NodeDetail::NestLoopIndex {
            join_type: join.kind,
            join_predicate: join.condition.clone(),
        };
        let schema = join_output_schema(&outer, &inner);
        let mut node = PlanNode::new(self.allocate_id(), detail, schema);
        node.add_child(outer);
        node.add_inline(inner);
        node.set_limit_offset(join.limit_offset.clone());
        debug!(
            node_id = node.id(),
            inline_scan = node.inline_nodes().len(),
            "Fused index scan into nested loop index join"
        );
        Ok(node)
    }

    fn allocate_id(&mut self) -> PlanNodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Retags the residual predicate and schema of an inlined index scan to the inner side.
/// Search keys and range bounds are evaluated against the outer row and stay as they are.
fn rebase_inline_scan(mut scan: PlanNode) -> PlanNode {
    if let NodeDetail::IndexScan { predicate, .. } = scan.detail_mut() {
        *predicate = predicate.as_ref().map(|p| p.with_table_index(INNER_TABLE_INDEX));
    }
    let schema = scan.schema().retagged(INNER_TABLE_INDEX);
    scan.set_schema(schema);
    scan
}

/// Rejects operator shapes the executable plan model cannot express.
fn check_supported(op: &PhysicalOperator) -> Result<()> {
    let (join, supported): (&JoinCore, &[JoinKind]) = match op {
        PhysicalOperator::NestLoopIndexJoin(j) => (&j.join, &[JoinKind::Inner, JoinKind::Left][..]),
        PhysicalOperator::NestLoopJoin(join) => (join, &[JoinKind::Inner, JoinKind::Left, JoinKind::Full][..]),
        _ => return Ok(()),
    };

    if !join.variables.is_empty() {
        return Err(Error::PlannerFallback(format!(
            "{} with {} correlation variable(s) is not supported",
            op.name(),
            join.variables.len()
        )));
    }
    if !supported.contains(&join.kind) {
        return Err(Error::PlannerFallback(format!(
            "{} does not support {} joins",
            op.name(),
            join.kind
        )));
    }
    Ok(())
}
