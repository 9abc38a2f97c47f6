//! Row-count estimation and per-operator self cost.

use super::cost::CostEstimate;
use super::cost_model::CostModel;
use super::operator::PhysicalOperator;
use crate::config::CostModelConfig;
use tracing::trace;

/// Supplies row-count estimates for operators.
///
/// Implementations may approximate or cache; the planner only reads them.
pub trait MetadataQuery: Send + Sync {
    fn row_count(&self, op: &PhysicalOperator) -> f64;
}

/// Row-count estimator backed by the statistics stored on catalog tables
#[derive(Debug, Clone, Default)]
pub struct DefaultMetadataQuery {
    model: CostModel,
}

impl DefaultMetadataQuery {
    pub fn new(config: CostModelConfig) -> Self {
        Self {
            model: CostModel::new(config),
        }
    }

    fn unlimited_rows(&self, op: &PhysicalOperator) -> f64 {
        match op {
            PhysicalOperator::SeqScan(scan) => {
                let rows = scan.table.row_count;
                if scan.filter.is_some() {
                    rows * self.model.config().default_filter_selectivity
                } else {
                    rows
                }
            }
            PhysicalOperator::IndexScan(s) => {
                let rows = s.scan.table.row_count;
                rows * self.model.match_fraction(s.index(), s.access_path(), rows)
            }
            PhysicalOperator::NestLoopJoin(join) => self.row_count(&join.outer) * self.row_count(&join.inner),
            PhysicalOperator::NestLoopIndexJoin(j) => {
                self.row_count(&j.join.outer) * self.row_count(&j.join.inner)
            }
        }
    }
}

impl MetadataQuery for DefaultMetadataQuery {
    fn row_count(&self, op: &PhysicalOperator) -> f64 {
        let rows = self.unlimited_rows(op);
        match op.limit_offset().and_then(|clause| clause.literal_limit()) {
            Some(limit) => rows.min(limit.max(0) as f64),
            None => rows,
        }
    }
}

impl PhysicalOperator {
    /// Cost of this operator alone, excluding its inputs.
    pub fn self_cost(&self, mq: &dyn MetadataQuery, model: &CostModel) -> CostEstimate {
        let config = model.config();
        let cost = match self {
            PhysicalOperator::SeqScan(scan) => {
                let rows = mq.row_count(self);
                CostEstimate::new(rows, scan.table.row_count * config.base_unit_cost, 0.0)
            }
            PhysicalOperator::IndexScan(s) => {
                let table_rows = s.scan.table.row_count;
                let per_row = model.index_cost(s.index(), s.access_path(), &s.scan.traits.collation, table_rows);
                CostEstimate::new(mq.row_count(self), table_rows * per_row, 0.0)
            }
            PhysicalOperator::NestLoopJoin(join) => {
                let outer = mq.row_count(&join.outer);
                let inner = mq.row_count(&join.inner);
                CostEstimate::new(outer * inner, outer * inner * config.per_row_predicate_cost, 0.0)
            }
            PhysicalOperator::NestLoopIndexJoin(j) => {
                let outer = mq.row_count(&j.join.outer);
                let inner = mq.row_count(&j.join.inner);
                // index_cost takes the size of the indexed relation
                let indexed_rows = match j.join.inner.scan_core() {
                    Some(scan) => scan.table.row_count,
                    None => inner,
                };
                let per_lookup =
                    model.index_cost(j.index(), j.access_path(), &j.join.traits.collation, indexed_rows);
                CostEstimate::new(outer * inner, outer * per_lookup, 0.0)
            }
        };
        trace!(operator = self.name(), cost = %cost, "self cost");
        cost
    }

    /// Self cost of this operator plus the cumulative cost of every input.
    pub fn cumulative_cost(&self, mq: &dyn MetadataQuery, model: &CostModel) -> CostEstimate {
        self.inputs()
            .into_iter()
            .fold(self.self_cost(mq, model), |acc, input| acc.plus(&input.cumulative_cost(mq, model)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, ColumnType, Index, Table};
    use crate::expression::Expr;
    use crate::physical::{AccessPath, JoinCore, JoinKind, ScanCore};
    use std::sync::Arc;

    struct FixedRows {
        outer: f64,
        inner: f64,
    }

    impl MetadataQuery for FixedRows {
        fn row_count(&self, op: &PhysicalOperator) -> f64 {
            match op {
                PhysicalOperator::SeqScan(_) => self.outer,
                PhysicalOperator::IndexScan(_) => self.inner,
                _ => self.outer * self.inner,
            }
        }
    }

    fn table(name: &str, rows: f64) -> Arc<Table> {
        Arc::new(
            Table::new(
                name,
                vec![
                    Column::new("a", ColumnType::BigInt),
                    Column::new("b", ColumnType::BigInt),
                ],
            )
            .with_row_count(rows),
        )
    }

    fn index_join(selectivity: f64) -> PhysicalOperator {
        let outer = Arc::new(PhysicalOperator::seq_scan(ScanCore::new(table("r", 1000.0))).unwrap());
        let index = Arc::new(Index::new("s_ab", "s", vec![0, 1]));
        let path = Arc::new(
            AccessPath::new()
                .with_equality(Expr::column(0, 0, "a", ColumnType::BigInt))
                .with_equality(Expr::column(0, 1, "b", ColumnType::BigInt))
                .with_selectivity(selectivity),
        );
        let inner = Arc::new(
            PhysicalOperator::index_scan(ScanCore::new(table("s", 500.0)), Arc::clone(&index), Arc::clone(&path))
                .unwrap(),
        );
        let condition = Expr::eq(
            Expr::column(0, 0, "a", ColumnType::BigInt),
            Expr::column(1, 0, "a", ColumnType::BigInt),
        );
        PhysicalOperator::nest_loop_index_join(
            JoinCore::new(outer, inner, condition, JoinKind::Inner),
            Some(index),
            Some(path),
        )
        .unwrap()
    }

    #[test]
    fn test_index_join_self_cost() {
        let op = index_join(0.01);
        let mq = FixedRows { outer: 1000.0, inner: 5.0 };
        let cost = op.self_cost(&mq, &CostModel::default());
        assert!((cost.cpu() - 10.0).abs() < 1e-9);
        assert_eq!(cost.network(), 0.0);
        assert_eq!(cost.rows(), 5000.0);
    }

    #[test]
    fn test_unique_index_join_costs_less() {
        let mq = DefaultMetadataQuery::default();
        let model = CostModel::default();
        let plain = index_join(0.01);
        let unique = match &plain {
            PhysicalOperator::NestLoopIndexJoin(j) => {
                let index = Arc::new((**j.index()).clone().unique());
                PhysicalOperator::nest_loop_index_join(j.join.clone(), Some(index), Some(Arc::clone(j.access_path())))
                    .unwrap()
            }
            _ => unreachable!(),
        };

        let plain_cost = plain.self_cost(&mq, &model);
        let unique_cost = unique.self_cost(&mq, &model);
        assert!(unique_cost.is_cheaper_than(&plain_cost));
        // a fully matched unique key reads one of the 500 indexed rows per lookup
        assert!((unique_cost.cpu() - 1000.0 / 500.0).abs() < 1e-9);
        assert!((plain_cost.cpu() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_nest_loop_self_cost() {
        let op = index_join(0.01);
        let join = op.join_core().unwrap().clone();
        let nlj = PhysicalOperator::nest_loop_join(join);
        let mq = FixedRows { outer: 100.0, inner: 20.0 };
        let cost = nlj.self_cost(&mq, &CostModel::default());
        assert_eq!(cost.cpu(), 2000.0);
        assert_eq!(cost.network(), 0.0);
    }

    #[test]
    fn test_index_join_cheaper_than_nest_loop() {
        let op = index_join(0.01);
        let nlj = PhysicalOperator::nest_loop_join(op.join_core().unwrap().clone());
        let mq = DefaultMetadataQuery::default();
        let model = CostModel::default();
        assert!(op.self_cost(&mq, &model).is_cheaper_than(&nlj.self_cost(&mq, &model)));
    }

    #[test]
    fn test_default_row_counts() {
        let mq = DefaultMetadataQuery::default();
        let op = index_join(0.01);
        let inputs = op.inputs();
        assert_eq!(mq.row_count(inputs[0]), 1000.0);
        assert!((mq.row_count(inputs[1]) - 5.0).abs() < 1e-9);
        assert!((mq.row_count(&op) - 5000.0).abs() < 1e-6);

        let filtered = PhysicalOperator::seq_scan(ScanCore::new(table("r", 1000.0)).with_filter(Expr::param(0)))
            .unwrap();
        assert!((mq.row_count(&filtered) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_literal_limit_caps_rows() {
        let mq = DefaultMetadataQuery::default();
        let op = index_join(0.01).copy_with_limit_offset(None, Some(Expr::int(10)));
        assert_eq!(mq.row_count(&op), 10.0);

        let parameterised = index_join(0.01).copy_with_limit_offset(None, Some(Expr::param(0)));
        assert!((mq.row_count(&parameterised) - 5000.0).abs() < 1e-6);
    }

    #[test]
    fn test_cumulative_cost_includes_inputs() {
        let op = index_join(0.01);
        let mq = DefaultMetadataQuery::default();
        let model = CostModel::default();
        let total = op.cumulative_cost(&mq, &model);
        assert!(total.total() > op.self_cost(&mq, &model).total());
    }
}
