//! Output schemas of executable plan nodes.

use crate::catalog::ColumnType;
use crate::expression::{INNER_TABLE_INDEX, OUTER_TABLE_INDEX};
use crate::physical::RelField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One output column: name, type and the input it originates from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub ty: ColumnType,
    /// Table index of the input this column is read from
    pub table_idx: usize,
}

impl SchemaColumn {
    pub fn new(name: impl Into<String>, ty: ColumnType, table_idx: usize) -> Self {
        Self {
            name: name.into(),
            ty,
            table_idx,
        }
    }
}

impl fmt::Display for SchemaColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{} {}", self.table_idx, self.name, self.ty)
    }
}

/// Ordered output columns of a plan node.
///
/// A significant schema is materialised by the node itself. A non-significant one is
/// a passthrough of the node's input and carries no positional guarantees of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSchema {
    columns: Vec<SchemaColumn>,
    significant: bool,
}

impl NodeSchema {
    pub fn passthrough(columns: Vec<SchemaColumn>) -> Self {
        Self {
            columns,
            significant: false,
        }
    }

    pub fn explicit(columns: Vec<SchemaColumn>) -> Self {
        Self {
            columns,
            significant: true,
        }
    }

    /// Passthrough schema built from an operator row type.
    pub fn from_fields(fields: &[RelField], table_idx: usize) -> Self {
        Self::passthrough(
            fields
                .iter()
                .map(|field| SchemaColumn::new(field.name.clone(), field.ty, table_idx))
                .collect(),
        )
    }

    /// Explicit join schema: outer columns tagged 0 followed by inner columns tagged 1.
    pub fn join(outer: &NodeSchema, inner: &NodeSchema) -> Self {
        let outer_columns = outer.retagged(OUTER_TABLE_INDEX).columns;
        let inner_columns = inner.retagged(INNER_TABLE_INDEX).columns;
        Self::explicit(outer_columns.into_iter().chain(inner_columns).collect())
    }

    /// Copy of this schema with every column tagged `table_idx`.
    pub fn retagged(&self, table_idx: usize) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| SchemaColumn::new(c.name.clone(), c.ty, table_idx))
                .collect(),
            significant: self.significant,
        }
    }

    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_significant(&self) -> bool {
        self.significant
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for NodeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", column)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str], table_idx: usize) -> Vec<SchemaColumn> {
        names
            .iter()
            .map(|n| SchemaColumn::new(*n, ColumnType::Integer, table_idx))
            .collect()
    }

    #[test]
    fn test_join_concatenates_and_tags() {
        let outer = NodeSchema::passthrough(cols(&["a", "b"], 5));
        let inner = NodeSchema::passthrough(cols(&["c", "d", "e"], 0));
        let joined = NodeSchema::join(&outer, &inner);

        assert!(joined.is_significant());
        assert_eq!(joined.width(), 5);
        let names: Vec<&str> = joined.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
        assert!(joined.columns()[..2].iter().all(|c| c.table_idx == 0));
        assert!(joined.columns()[2..].iter().all(|c| c.table_idx == 1));
    }

    #[test]
    fn test_from_fields() {
        let fields = vec![
            RelField::new("id", ColumnType::BigInt, false),
            RelField::new("name", ColumnType::Varchar, true),
        ];
        let schema = NodeSchema::from_fields(&fields, 0);
        assert!(!schema.is_significant());
        assert_eq!(schema.column_index("NAME"), Some(1));
        assert_eq!(schema.to_string(), "[$0.id BIGINT, $0.name VARCHAR]");
    }
}
