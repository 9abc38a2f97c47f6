#![allow(dead_code)]

use lightning_planner::catalog::{Column, ColumnType, Index, Table};
use lightning_planner::expression::{ComparisonOp, Expr};
use lightning_planner::physical::{
    AccessPath, JoinCore, JoinKind, MetadataQuery, PhysicalOperator, RelField, ScanCore,
};
use std::sync::Arc;

pub fn init_test_logging() {
    lightning_planner::logging::init_logging(tracing::Level::WARN, false);
}

pub fn customers() -> Arc<Table> {
    Arc::new(
        Table::new(
            "customers",
            vec![
                Column::new("id", ColumnType::BigInt).not_null(),
                Column::new("name", ColumnType::Varchar),
                Column::new("region", ColumnType::Varchar),
            ],
        )
        .with_row_count(1000.0),
    )
}

pub fn orders() -> Arc<Table> {
    Arc::new(
        Table::new(
            "orders",
            vec![
                Column::new("id", ColumnType::BigInt).not_null(),
                Column::new("customer_id", ColumnType::BigInt).not_null(),
                Column::new("status", ColumnType::Integer),
                Column::new("total", ColumnType::Decimal),
            ],
        )
        .with_row_count(50_000.0),
    )
}

/// Two-column non-unique index on `orders(customer_id, status)`
pub fn orders_customer_status() -> Arc<Index> {
    Arc::new(Index::new("orders_customer_status", "orders", vec![1, 2]))
}

pub fn customers_scan() -> Arc<PhysicalOperator> {
    Arc::new(PhysicalOperator::seq_scan(ScanCore::new(customers())).expect("valid scan"))
}

/// `$0.id = $1.customer_id`
pub fn join_condition() -> Expr {
    Expr::eq(
        Expr::column(0, 0, "id", ColumnType::BigInt),
        Expr::column(1, 1, "customer_id", ColumnType::BigInt),
    )
}

/// Residual filter on the inner scan as written before fusion: `$0.total > 100`
pub fn inner_filter() -> Expr {
    Expr::compare(
        ComparisonOp::GreaterThan,
        Expr::column(0, 3, "total", ColumnType::Decimal),
        Expr::int(100),
    )
}

/// Access path matching both key columns by equality
pub fn full_match_path(selectivity: Option<f64>) -> Arc<AccessPath> {
    let mut path = AccessPath::new()
        .with_equality(Expr::column(0, 0, "id", ColumnType::BigInt))
        .with_equality(Expr::param(0));
    if let Some(s) = selectivity {
        path = path.with_selectivity(s);
    }
    Arc::new(path)
}

pub fn orders_index_scan(path: Arc<AccessPath>, filter: Option<Expr>) -> Arc<PhysicalOperator> {
    let mut scan = ScanCore::new(orders());
    if let Some(f) = filter {
        scan = scan.with_filter(f);
    }
    Arc::new(PhysicalOperator::index_scan(scan, orders_customer_status(), path).expect("valid index scan"))
}

/// customers ⋈ orders through `orders_customer_status`
pub fn index_join(kind: JoinKind) -> PhysicalOperator {
    index_join_over(customers_scan(), kind)
}

/// Index join probing `orders_customer_status` once per row of `outer`
pub fn index_join_over(outer: Arc<PhysicalOperator>, kind: JoinKind) -> PhysicalOperator {
    let path = full_match_path(Some(0.01));
    let inner = orders_index_scan(Arc::clone(&path), Some(inner_filter()));
    PhysicalOperator::nest_loop_index_join(
        JoinCore::new(outer, inner, join_condition(), kind),
        Some(orders_customer_status()),
        Some(path),
    )
    .expect("valid index join")
}

/// Plain nested loop joining `outer` with a filtered scan of orders
pub fn nest_loop_over(outer: Arc<PhysicalOperator>, kind: JoinKind) -> PhysicalOperator {
    let inner = Arc::new(
        PhysicalOperator::seq_scan(ScanCore::new(orders()).with_filter(inner_filter())).expect("valid scan"),
    );
    PhysicalOperator::nest_loop_join(JoinCore::new(outer, inner, join_condition(), kind))
}

/// Copy of a join with a boolean `$marker` system field appended to its row type
pub fn with_marker(op: &PhysicalOperator) -> PhysicalOperator {
    let marker = vec![RelField::new("$marker", ColumnType::Boolean, false)];
    match op {
        PhysicalOperator::NestLoopIndexJoin(j) => PhysicalOperator::nest_loop_index_join(
            j.join.clone().with_system_fields(marker),
            Some(Arc::clone(j.index())),
            Some(Arc::clone(j.access_path())),
        )
        .expect("valid index join"),
        PhysicalOperator::NestLoopJoin(join) => {
            PhysicalOperator::nest_loop_join(join.clone().with_system_fields(marker))
        }
        other => other.clone(),
    }
}

/// Index join whose inner side is a sequential scan
pub fn index_join_with_seq_inner() -> PhysicalOperator {
    let inner = Arc::new(PhysicalOperator::seq_scan(ScanCore::new(orders())).expect("valid scan"));
    PhysicalOperator::nest_loop_index_join(
        JoinCore::new(customers_scan(), inner, join_condition(), JoinKind::Inner),
        Some(orders_customer_status()),
        Some(full_match_path(None)),
    )
    .expect("construction does not inspect the inner input")
}

/// Left-deep chain of `depth` index joins over the customers scan
pub fn index_join_chain(depth: usize) -> PhysicalOperator {
    let mut current = customers_scan();
    for _ in 0..depth {
        let path = full_match_path(None);
        let inner = orders_index_scan(Arc::clone(&path), Some(inner_filter()));
        let join = PhysicalOperator::nest_loop_index_join(
            JoinCore::new(current, inner, join_condition(), JoinKind::Inner),
            Some(orders_customer_status()),
            Some(path),
        )
        .expect("valid index join");
        current = Arc::new(join);
    }
    Arc::try_unwrap(current).unwrap_or_else(|shared| (*shared).clone())
}

/// Metadata query returning fixed estimates per operator kind
pub struct FixedRowCounts {
    pub scan: f64,
    pub index_scan: f64,
}

impl MetadataQuery for FixedRowCounts {
    fn row_count(&self, op: &PhysicalOperator) -> f64 {
        match op {
            PhysicalOperator::SeqScan(_) => self.scan,
            PhysicalOperator::IndexScan(_) => self.index_scan,
            _ => op.inputs().iter().map(|input| self.row_count(input)).product(),
        }
    }
}
