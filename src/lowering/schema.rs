//! Output schema assembly for lowered nodes.

use crate::expression::OUTER_TABLE_INDEX;
use crate::physical::ScanCore;
use crate::plan::{NodeSchema, PlanNode};

/// Schema of a scan node: its projected columns. A scan with an explicit projection
/// materialises its own columns; otherwise it passes the table row through.
pub fn scan_output_schema(scan: &ScanCore) -> NodeSchema {
    let schema = NodeSchema::from_fields(&scan.row_type(), OUTER_TABLE_INDEX);
    if scan.projection.is_some() {
        NodeSchema::explicit(schema.columns().to_vec())
    } else {
        schema
    }
}

/// Schema of a lowered join: the lowered outer node's columns tagged 0 followed by the
/// inner node's columns tagged 1. Both halves come from the nodes the runtime actually
/// executes, so column offsets match what the linked outer child produces. The result
/// is always explicit.
pub fn join_output_schema(outer: &PlanNode, inner: &PlanNode) -> NodeSchema {
    NodeSchema::join(outer.schema(), inner.schema())
}
