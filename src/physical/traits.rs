//! Physical properties attached to every operator: output ordering and distribution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Ordering on a single output column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldCollation {
    pub column: usize,
    pub direction: SortDirection,
}

impl FieldCollation {
    pub fn new(column: usize, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

/// Ordered list of sort keys. Empty means "no particular order".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collation {
    fields: Vec<FieldCollation>,
}

impl Collation {
    pub fn new(fields: Vec<FieldCollation>) -> Self {
        Self { fields }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[FieldCollation] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn reversed(&self) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|f| FieldCollation::new(f.column, f.direction.reverse()))
                .collect(),
        }
    }

    /// True when rows in this order are also in `required` order.
    pub fn satisfies(&self, required: &Collation) -> bool {
        required.fields.len() <= self.fields.len()
            && required.fields.iter().zip(&self.fields).all(|(r, s)| r == s)
    }
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let dir = match field.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            write!(f, "{} {}", field.column, dir)?;
        }
        f.write_str("]")
    }
}

/// Data distribution of an operator's output
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distribution {
    /// All rows on one site
    #[default]
    Single,
    /// Rows hash-partitioned on the given columns
    HashPartitioned(Vec<usize>),
    /// Every site holds every row
    Replicated,
    Any,
}

/// Trait set carried by every physical operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitSet {
    pub collation: Collation,
    pub distribution: Distribution,
}

impl TraitSet {
    pub fn new(collation: Collation, distribution: Distribution) -> Self {
        Self {
            collation,
            distribution,
        }
    }

    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = collation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asc(column: usize) -> FieldCollation {
        FieldCollation::new(column, SortDirection::Ascending)
    }

    #[test]
    fn test_prefix_satisfies() {
        let delivered = Collation::new(vec![asc(0), asc(1)]);
        assert!(delivered.satisfies(&Collation::empty()));
        assert!(delivered.satisfies(&Collation::new(vec![asc(0)])));
        assert!(!delivered.satisfies(&Collation::new(vec![asc(1)])));
        assert!(!delivered.satisfies(&Collation::new(vec![asc(0), asc(1), asc(2)])));
    }

    #[test]
    fn test_reversed_does_not_satisfy_forward() {
        let delivered = Collation::new(vec![asc(0)]);
        assert!(!delivered.reversed().satisfies(&delivered));
        assert!(delivered.reversed().reversed().satisfies(&delivered));
    }

    #[test]
    fn test_display() {
        let c = Collation::new(vec![asc(2), FieldCollation::new(0, SortDirection::Descending)]);
        assert_eq!(c.to_string(), "[2 ASC, 0 DESC]");
    }
}
