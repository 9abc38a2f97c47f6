//! Executable plan model consumed by the runtime.

pub mod explain;
pub mod node;
pub mod schema;

pub use explain::render;
pub use node::{NodeDetail, PlanNode, PlanNodeId, PlanNodeType};
pub use schema::{NodeSchema, SchemaColumn};
