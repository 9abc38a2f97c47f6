//! Top-level compile boundary.
//!
//! `PhysicalPlanner` costs and lowers a winning operator tree. A recoverable fallback
//! error hands the tree to a configured [`FallbackStrategy`]; internal errors are
//! logged and returned as they are. Nothing here retries.

use crate::config::PlannerConfig;
use crate::lowering::PlanLowerer;
use crate::logging::CompileTimer;
use crate::physical::{CostEstimate, CostModel, DefaultMetadataQuery, MetadataQuery, PhysicalOperator};
use crate::plan::PlanNode;
use crate::{Error, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// How a compiled plan was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanStrategy {
    CostBased,
    Fallback,
}

/// Result of compiling one operator tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledPlan {
    pub root: PlanNode,
    /// Cumulative cost of the operator tree
    pub cost: CostEstimate,
    pub strategy: PlanStrategy,
}

/// Alternate plan generation used when the cost-based path cannot lower a shape
pub trait FallbackStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Produces a plan for `op`; `reason` is the fallback error that triggered it.
    fn compile(&self, op: &PhysicalOperator, reason: &Error) -> Result<PlanNode>;
}

pub struct PhysicalPlanner {
    config: PlannerConfig,
    cost_model: CostModel,
    metadata: Arc<dyn MetadataQuery>,
    fallback: Option<Arc<dyn FallbackStrategy>>,
    pool: Option<rayon::ThreadPool>,
}

impl PhysicalPlanner {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        config.validate()?;

        let pool = if config.parallelism > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.parallelism)
                .thread_name(|i| format!("lightning-plan-{}", i))
                .build()
                .map_err(|e| Error::Configuration(format!("failed to build planner pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        info!(
            allow_fallback = config.allow_fallback,
            parallelism = config.parallelism,
            "Physical planner created"
        );

        Ok(Self {
            cost_model: CostModel::new(config.cost.clone()),
            metadata: Arc::new(DefaultMetadataQuery::new(config.cost.clone())),
            fallback: None,
            pool,
            config,
        })
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataQuery>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackStrategy>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    pub fn metadata(&self) -> &dyn MetadataQuery {
        self.metadata.as_ref()
    }

    pub fn self_cost(&self, op: &PhysicalOperator) -> CostEstimate {
        op.self_cost(self.metadata.as_ref(), &self.cost_model)
    }

    pub fn cumulative_cost(&self, op: &PhysicalOperator) -> CostEstimate {
        op.cumulative_cost(self.metadata.as_ref(), &self.cost_model)
    }

    /// Lowers `op` without costing it or falling back.
    pub fn lower(&self, op: &PhysicalOperator) -> Result<PlanNode> {
        PlanLowerer::new().lower(op)
    }

    pub fn compile(&self, op: &PhysicalOperator) -> Result<CompiledPlan> {
        let timer = CompileTimer::new(op.name());
        let result = self.compile_inner(op);
        timer.complete(&result);
        result
    }

    fn compile_inner(&self, op: &PhysicalOperator) -> Result<CompiledPlan> {
        let cost = self.cumulative_cost(op);
        debug!(operator = op.name(), cost = %cost, "Compiling operator tree");

        match self.lower(op) {
            Ok(root) => Ok(CompiledPlan {
                root,
                cost,
                strategy: PlanStrategy::CostBased,
            }),
            Err(e) if e.is_recoverable() && self.config.allow_fallback => match &self.fallback {
                Some(strategy) => {
                    crate::log_fallback!(op.name(), e);
                    let root = strategy.compile(op, &e)?;
                    debug!(strategy = strategy.name(), root = root.id(), "Fallback plan produced");
                    Ok(CompiledPlan {
                        root,
                        cost,
                        strategy: PlanStrategy::Fallback,
                    })
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Compiles independent operator trees concurrently. Each tree is compiled on a
    /// single thread; results keep the input order.
    pub fn compile_batch(&self, ops: &[Arc<PhysicalOperator>]) -> Vec<Result<CompiledPlan>> {
        let run = || ops.par_iter().map(|op| self.compile(op)).collect::<Vec<_>>();
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}
