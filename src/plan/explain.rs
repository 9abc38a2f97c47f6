//! Indented debug rendering of executable plan trees.

use super::node::PlanNode;
use std::fmt::Write;

/// Renders `node` and everything below it.
///
/// ```text
/// * NESTLOOPINDEX[3] joinType=inner predicate=$0.id = $1.customer_id
///   |Schema: [$0.id BIGINT, $1.id BIGINT]
///   |Inline Plannodes: 1
///   |  * INDEXSCAN[2] table=orders index=orders_customer ...
///   * SEQSCAN[1] table=customers
/// ```
pub fn render(node: &PlanNode) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_node(node, "", &mut out);
    out
}

fn write_node(node: &PlanNode, spacer: &str, out: &mut String) -> std::fmt::Result {
    let detail = node.detail().describe();
    if detail.is_empty() {
        writeln!(out, "{}* {}[{}]", spacer, node.node_type(), node.id())?;
    } else {
        writeln!(out, "{}* {}[{}] {}", spacer, node.node_type(), node.id(), detail)?;
    }

    let info = format!("{}  |", spacer);
    let schema_kind = if node.schema().is_significant() { "" } else { " (passthrough)" };
    writeln!(out, "{}Schema{}: {}", info, schema_kind, node.schema())?;

    if let Some(clause) = node.limit_offset() {
        let limit = clause.limit.as_ref().map(|e| e.to_string()).unwrap_or_else(|| "none".into());
        let offset = clause.offset.as_ref().map(|e| e.to_string()).unwrap_or_else(|| "0".into());
        writeln!(out, "{}Limit: {} Offset: {}", info, limit, offset)?;
    }

    if !node.inline_nodes().is_empty() {
        writeln!(out, "{}Inline Plannodes: {}", info, node.inline_nodes().len())?;
        let inline_spacer = format!("{}  ", info);
        for inline in node.inline_nodes() {
            write_node(inline, &inline_spacer, out)?;
        }
    }

    let child_spacer = format!("{}  ", spacer);
    for child in node.children() {
        write_node(child, &child_spacer, out)?;
    }
    Ok(())
}
