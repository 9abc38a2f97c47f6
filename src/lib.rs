//! Physical plan compilation for the Lightning SQL engine.
//!
//! The crate sits between the cost-based search engine and the runtime. The search
//! engine asks operators for their self cost while it explores alternatives; once a
//! winner is fixed, [`lowering`] turns it into executable [`plan`] nodes, fusing index
//! scans into index joins and rebasing the column references they carry.

pub mod catalog;
pub mod config;
pub mod error;
pub mod expression;
pub mod logging;
pub mod lowering;
pub mod physical;
pub mod plan;
pub mod planner;

pub use catalog::{Column, ColumnType, Index, Table};
pub use config::{ConfigPreset, CostModelConfig, PlannerConfig};
pub use error::{Error, Result};
pub use expression::{ComparisonOp, Expr, ExprKind, Value, INNER_TABLE_INDEX, OUTER_TABLE_INDEX};
pub use lowering::{lower, PlanLowerer};
pub use physical::{
    AccessPath, CostEstimate, CostModel, DefaultMetadataQuery, JoinCore, JoinKind, LimitOffset, MetadataQuery,
    PhysicalOperator, ScanCore,
};
pub use plan::{NodeSchema, PlanNode, PlanNodeType};
pub use planner::{CompiledPlan, FallbackStrategy, PhysicalPlanner, PlanStrategy};
