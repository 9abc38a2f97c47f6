//! Read-only catalog snapshots consumed by the planner.
//!
//! Tables and indexes are published once and then shared between planning threads
//! behind `Arc`. Nothing in this crate mutates them.

use crate::physical::{Collation, FieldCollation, SortDirection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column data types known to the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    Integer,
    BigInt,
    Float,
    Decimal,
    Varchar,
    Timestamp,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Float => "FLOAT",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Timestamp => "TIMESTAMP",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Table snapshot with the statistics captured when the query was planned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    /// Offset of the partitioning column, if the table is partitioned
    pub partition_key: Option<usize>,
    /// Estimated number of rows
    pub row_count: f64,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            partition_key: None,
            row_count: 0.0,
        }
    }

    pub fn with_row_count(mut self, rows: f64) -> Self {
        self.row_count = rows.max(0.0);
        self
    }

    pub fn with_partition_key(mut self, column: usize) -> Self {
        self.partition_key = Some(column);
        self
    }

    pub fn column(&self, offset: usize) -> Option<&Column> {
        self.columns.get(offset)
    }

    pub fn column_offset(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Index descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    /// Name of the indexed table
    pub table: String,
    /// Key columns as offsets into the table's column list, most significant first
    pub key_columns: Vec<usize>,
    pub unique: bool,
}

impl Index {
    pub fn new(name: impl Into<String>, table: impl Into<String>, key_columns: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            key_columns,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn key_width(&self) -> usize {
        self.key_columns.len()
    }

    /// Order in which a forward scan of the index returns rows.
    pub fn natural_ordering(&self) -> Collation {
        Collation::new(
            self.key_columns
                .iter()
                .map(|&column| FieldCollation::new(column, SortDirection::Ascending))
                .collect(),
        )
    }
}
