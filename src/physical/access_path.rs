//! How a particular index answers part of a predicate.
//!
//! Access paths are produced by logical-to-physical conversion and are read-only
//! inputs here.

use super::traits::Collation;
use crate::catalog::Index;
use crate::expression::{ComparisonOp, Expr};
use serde::{Deserialize, Serialize};

/// Direction the index is walked in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanDirection {
    #[default]
    Forward,
    Backward,
}

/// Trailing range predicate on the first key column not matched by equality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeBound {
    pub op: ComparisonOp,
    pub bound: Expr,
    /// Fraction of the remaining key range selected, when statistics know it
    pub selectivity: Option<f64>,
}

impl RangeBound {
    pub fn new(op: ComparisonOp, bound: Expr) -> Self {
        Self {
            op,
            bound,
            selectivity: None,
        }
    }

    pub fn with_selectivity(mut self, selectivity: f64) -> Self {
        self.selectivity = Some(selectivity);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessPath {
    /// Search key expressions, one per leading key column matched by equality
    pub index_exprs: Vec<Expr>,
    pub range: Option<RangeBound>,
    /// Filters the index cannot answer, evaluated on every fetched row
    pub other_exprs: Vec<Expr>,
    pub direction: ScanDirection,
    /// Statistics-derived selectivity of the whole key match
    pub selectivity: Option<f64>,
}

impl AccessPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_equality(mut self, search_key: Expr) -> Self {
        self.index_exprs.push(search_key);
        self
    }

    pub fn with_range(mut self, range: RangeBound) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_residual(mut self, filter: Expr) -> Self {
        self.other_exprs.push(filter);
        self
    }

    pub fn with_direction(mut self, direction: ScanDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_selectivity(mut self, selectivity: f64) -> Self {
        self.selectivity = Some(selectivity);
        self
    }

    pub fn equality_key_count(&self) -> usize {
        self.index_exprs.len()
    }

    /// True when at least one key column restricts the scan.
    pub fn has_key_match(&self) -> bool {
        !self.index_exprs.is_empty() || self.range.is_some()
    }

    pub fn residual_predicate(&self) -> Option<Expr> {
        Expr::conjunction(self.other_exprs.iter().cloned())
    }

    /// Ordering of rows produced by walking `index` along this path.
    pub fn delivered_ordering(&self, index: &Index) -> Collation {
        let natural = index.natural_ordering();
        match self.direction {
            ScanDirection::Forward => natural,
            ScanDirection::Backward => natural.reversed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnType;
    use crate::physical::traits::SortDirection;

    #[test]
    fn test_key_counts() {
        let path = AccessPath::new();
        assert_eq!(path.equality_key_count(), 0);
        assert!(!path.has_key_match());

        let path = path.with_range(RangeBound::new(ComparisonOp::GreaterThan, Expr::int(5)));
        assert!(path.has_key_match());
        assert_eq!(path.equality_key_count(), 0);

        let path = AccessPath::new().with_equality(Expr::param(0)).with_equality(Expr::param(1));
        assert_eq!(path.equality_key_count(), 2);
    }

    #[test]
    fn test_residual_conjunction() {
        let a = Expr::column(0, 2, "status", ColumnType::Varchar);
        let path = AccessPath::new()
            .with_residual(Expr::eq(a.clone(), Expr::int(1)))
            .with_residual(Expr::eq(a, Expr::int(2)));
        let residual = path.residual_predicate().unwrap();
        assert_eq!(residual.column_refs().len(), 2);
        assert!(AccessPath::new().residual_predicate().is_none());
    }

    #[test]
    fn test_backward_scan_reverses_ordering() {
        let index = Index::new("idx", "t", vec![0, 3]);
        let path = AccessPath::new().with_direction(ScanDirection::Backward);
        let ordering = path.delivered_ordering(&index);
        assert_eq!(ordering.fields()[0].direction, SortDirection::Descending);
        assert_eq!(ordering.fields()[1].column, 3);
    }
}
