//! Cost estimates compared by the external search engine.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Estimated cost of one operator.
///
/// Plans are compared on `cpu + network` only; `rows` is advisory and never breaks
/// a tie. All components are clamped to finite, non-negative values on construction,
/// which keeps the comparison a total order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostEstimate {
    rows: f64,
    cpu: f64,
    network: f64,
}

impl CostEstimate {
    pub fn new(rows: f64, cpu: f64, network: f64) -> Self {
        Self {
            rows: sanitize(rows),
            cpu: sanitize(cpu),
            network: sanitize(network),
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn rows(&self) -> f64 {
        self.rows
    }

    pub fn cpu(&self) -> f64 {
        self.cpu
    }

    pub fn network(&self) -> f64 {
        self.network
    }

    /// The value plans are ranked by.
    pub fn total(&self) -> f64 {
        self.cpu + self.network
    }

    pub fn is_cheaper_than(&self, other: &CostEstimate) -> bool {
        self.cmp(other) == Ordering::Less
    }

    /// Component-wise sum, used when accumulating a subtree.
    pub fn plus(&self, other: &CostEstimate) -> CostEstimate {
        CostEstimate::new(self.rows + other.rows, self.cpu + other.cpu, self.network + other.network)
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else if value.is_infinite() {
        f64::MAX
    } else {
        value
    }
}

impl PartialEq for CostEstimate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CostEstimate {}

impl PartialOrd for CostEstimate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CostEstimate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total().total_cmp(&other.total())
    }
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{:.2} rows, {:.4} cpu, {:.4} network}}",
            self.rows, self.cpu, self.network
        )
    }
}
