//! Physical Operator Layer
//!
//! This module holds everything the external search engine touches while it explores
//! plan alternatives:
//! - Immutable physical operators with trait sets and pushed-down limits
//! - Access paths describing how an index answers a predicate
//! - The index cost model and per-operator self cost
//! - The metadata-query seam used for row-count estimates

pub mod access_path;
pub mod cost;
pub mod cost_model;
pub mod metadata;
pub mod operator;
pub mod traits;

pub use access_path::{AccessPath, RangeBound, ScanDirection};
pub use cost::CostEstimate;
pub use cost_model::{CostModel, IndexCostBreakdown};
pub use metadata::{DefaultMetadataQuery, MetadataQuery};
pub use operator::{
    CorrelationId, IndexJoin, IndexScan, JoinCore, JoinKind, LimitOffset, PhysicalOperator, RelField, ScanCore,
};
pub use traits::{Collation, Distribution, FieldCollation, SortDirection, TraitSet};
