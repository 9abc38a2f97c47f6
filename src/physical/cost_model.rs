//! Access-Path Index Cost Model
//!
//! Estimates the cost of probing an index once along a given access path. Every
//! equality-matched key column compounds the selectivity, a trailing range scans a
//! fraction of what is left, and an ordering the index cannot deliver costs a sort.

use super::access_path::AccessPath;
use super::traits::Collation;
use crate::catalog::Index;
use crate::config::CostModelConfig;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Index cost split into its components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexCostBreakdown {
    /// Fraction of the index read per lookup
    pub fraction: f64,
    pub scan_cost: f64,
    pub residual_cost: f64,
    pub sort_cost: f64,
    /// Sum of the components after the floor is applied
    pub total: f64,
}

/// Cost model for index access paths
#[derive(Debug, Clone, Default)]
pub struct CostModel {
    config: CostModelConfig,
}

impl CostModel {
    pub fn new(config: CostModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CostModelConfig {
        &self.config
    }

    /// Estimated cost of one lookup of `index` along `access_path`.
    ///
    /// `input_rows` is the number of rows in the indexed relation. The result is never
    /// below `min_cost_per_row`.
    pub fn index_cost(
        &self,
        index: &Index,
        access_path: &AccessPath,
        requested: &Collation,
        input_rows: f64,
    ) -> f64 {
        self.index_cost_breakdown(index, access_path, requested, input_rows).total
    }

    pub fn index_cost_breakdown(
        &self,
        index: &Index,
        access_path: &AccessPath,
        requested: &Collation,
        input_rows: f64,
    ) -> IndexCostBreakdown {
        let input_rows = if input_rows.is_finite() { input_rows.max(0.0) } else { 0.0 };
        let fraction = self.match_fraction(index, access_path, input_rows);

        let scan_cost = self.config.base_unit_cost * fraction;
        let residual_cost =
            access_path.other_exprs.len() as f64 * self.config.residual_filter_cost * fraction;

        let delivered = access_path.delivered_ordering(index);
        let sort_cost = if delivered.satisfies(requested) {
            0.0
        } else {
            self.sort_cost(input_rows * fraction)
        };

        let total = (scan_cost + residual_cost + sort_cost).max(self.config.min_cost_per_row);
        trace!(
            index = %index.name,
            fraction,
            scan_cost,
            residual_cost,
            sort_cost,
            total,
            "index cost"
        );

        IndexCostBreakdown {
            fraction,
            scan_cost,
            residual_cost,
            sort_cost,
            total,
        }
    }

    /// Fraction of the index that matches one lookup, in `[0, 1]`.
    pub fn match_fraction(&self, index: &Index, access_path: &AccessPath, input_rows: f64) -> f64 {
        if !access_path.has_key_match() {
            return 1.0;
        }

        let equality_keys = access_path.equality_key_count();
        let mut fraction = match access_path.selectivity {
            Some(selectivity) => selectivity,
            None => self.config.equality_selectivity.powi(equality_keys as i32),
        };

        if let Some(range) = &access_path.range {
            fraction *= range.selectivity.unwrap_or(self.config.default_range_fraction);
        }

        // A fully matched unique key returns at most one row.
        if index.unique && equality_keys >= index.key_width() && input_rows > 1.0 {
            fraction = fraction.min(1.0 / input_rows);
        }

        if fraction.is_nan() {
            1.0
        } else {
            fraction.clamp(0.0, 1.0)
        }
    }

    /// n·log2(n) cost of sorting `rows` rows.
    pub fn sort_cost(&self, rows: f64) -> f64 {
        if rows <= 1.0 {
            return 0.0;
        }
        self.config.sort_penalty_factor * rows * rows.log2() * self.config.base_unit_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ComparisonOp, Expr};
    use crate::physical::access_path::{RangeBound, ScanDirection};
    use crate::physical::traits::{FieldCollation, SortDirection};

    fn two_key_index() -> Index {
        Index::new("orders_cust_date", "orders", vec![1, 3])
    }

    fn full_match() -> AccessPath {
        AccessPath::new().with_equality(Expr::param(0)).with_equality(Expr::param(1))
    }

    #[test]
    fn test_full_equality_match() {
        let model = CostModel::default();
        let cost = model.index_cost(&two_key_index(), &full_match(), &Collation::empty(), 1000.0);
        assert!((cost - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_more_equality_keys_is_cheaper() {
        let model = CostModel::default();
        let index = two_key_index();
        let one = AccessPath::new().with_equality(Expr::param(0));
        let one_cost = model.index_cost(&index, &one, &Collation::empty(), 1000.0);
        let two_cost = model.index_cost(&index, &full_match(), &Collation::empty(), 1000.0);
        assert!(two_cost < one_cost);
    }

    #[test]
    fn test_statistics_selectivity_wins() {
        let model = CostModel::default();
        let path = full_match().with_selectivity(0.5);
        let breakdown = model.index_cost_breakdown(&two_key_index(), &path, &Collation::empty(), 10.0);
        assert_eq!(breakdown.fraction, 0.5);
    }

    #[test]
    fn test_range_fraction() {
        let model = CostModel::default();
        let index = two_key_index();
        let range = AccessPath::new()
            .with_equality(Expr::param(0))
            .with_range(RangeBound::new(ComparisonOp::GreaterThan, Expr::int(7)));
        let breakdown = model.index_cost_breakdown(&index, &range, &Collation::empty(), 100.0);
        assert!((breakdown.fraction - 0.025).abs() < 1e-12);

        let known = AccessPath::new()
            .with_range(RangeBound::new(ComparisonOp::LessThan, Expr::int(7)).with_selectivity(0.5));
        let breakdown = model.index_cost_breakdown(&index, &known, &Collation::empty(), 100.0);
        assert!((breakdown.fraction - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_key_match_is_full_scan() {
        let model = CostModel::default();
        let cost = model.index_cost(&two_key_index(), &AccessPath::new(), &Collation::empty(), 1000.0);
        assert_eq!(cost, 1.0);
    }

    #[test]
    fn test_unique_full_match_returns_one_row() {
        let model = CostModel::default();
        let index = Index::new("pk", "orders", vec![0]).unique();
        let path = AccessPath::new().with_equality(Expr::param(0));
        let breakdown = model.index_cost_breakdown(&index, &path, &Collation::empty(), 10_000.0);
        assert!((breakdown.fraction - 0.0001).abs() < 1e-12);
    }

    #[test]
    fn test_sort_penalty_when_order_not_delivered() {
        let model = CostModel::default();
        let index = two_key_index();
        let path = AccessPath::new().with_equality(Expr::param(0));
        let natural = Collation::new(vec![FieldCollation::new(1, SortDirection::Ascending)]);
        let other = Collation::new(vec![FieldCollation::new(2, SortDirection::Ascending)]);

        let ordered = model.index_cost_breakdown(&index, &path, &natural, 10_000.0);
        assert_eq!(ordered.sort_cost, 0.0);

        let unordered = model.index_cost_breakdown(&index, &path, &other, 10_000.0);
        let matched: f64 = 1000.0;
        assert!((unordered.sort_cost - matched * matched.log2()).abs() < 1e-6);
        assert!(unordered.total > ordered.total);
    }

    #[test]
    fn test_backward_scan_delivers_descending_order() {
        let model = CostModel::default();
        let index = two_key_index();
        let path = AccessPath::new()
            .with_equality(Expr::param(0))
            .with_direction(ScanDirection::Backward);
        let descending = Collation::new(vec![FieldCollation::new(1, SortDirection::Descending)]);
        let breakdown = model.index_cost_breakdown(&index, &path, &descending, 10_000.0);
        assert_eq!(breakdown.sort_cost, 0.0);
    }

    #[test]
    fn test_floor_and_non_negative() {
        let model = CostModel::default();
        let path = full_match().with_selectivity(0.0);
        let cost = model.index_cost(&two_key_index(), &path, &Collation::empty(), 1000.0);
        assert_eq!(cost, model.config().min_cost_per_row);

        let cost = model.index_cost(&two_key_index(), &full_match(), &Collation::empty(), f64::NAN);
        assert!(cost >= 0.0);
    }

    #[test]
    fn test_residual_filters_add_cost() {
        let model = CostModel::new(CostModelConfig {
            residual_filter_cost: 1.0,
            ..CostModelConfig::default()
        });
        let path = full_match().with_residual(Expr::param(3)).with_residual(Expr::param(4));
        let breakdown = model.index_cost_breakdown(&two_key_index(), &path, &Collation::empty(), 1000.0);
        assert!((breakdown.residual_cost - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_sort_cost() {
        let model = CostModel::default();
        assert_eq!(model.sort_cost(1.0), 0.0);
        assert_eq!(model.sort_cost(0.0), 0.0);
        assert_eq!(model.sort_cost(8.0), 24.0);
    }
}
