//! Predicate expressions
//!
//! Expressions are plain owned values. Column references carry a table index that
//! says which input of a fused plan they read from: `0` for the outer (driving) side
//! and `1` for the inner (index) side. Changing those tags always produces a new
//! tree; nothing in this module mutates an expression in place.

use crate::catalog::ColumnType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Table index of the outer (driving) side of a fused join.
pub const OUTER_TABLE_INDEX: usize = 0;
/// Table index of the inner (index) side of a fused join.
pub const INNER_TABLE_INDEX: usize = 1;

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "'{}'", v),
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Like,
    NotLike,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "<>",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEqual => ">=",
            ComparisonOp::Like => "LIKE",
            ComparisonOp::NotLike => "NOT LIKE",
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(
            self,
            ComparisonOp::LessThan
                | ComparisonOp::LessThanOrEqual
                | ComparisonOp::GreaterThan
                | ComparisonOp::GreaterThanOrEqual
        )
    }
}

/// Node kinds, used to query a tree for subexpressions of one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprKind {
    ColumnRef,
    Literal,
    Parameter,
    Comparison,
    And,
    Or,
    Not,
    Function,
}

/// Typed expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Reference to a column of one of the plan inputs
    ColumnRef {
        table_idx: usize,
        column_idx: usize,
        name: String,
        ty: ColumnType,
    },
    Literal(Value),
    /// Runtime statement parameter, resolved by the executor
    Parameter { index: usize, ty: ColumnType },
    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Function {
        name: String,
        args: Vec<Expr>,
        ty: ColumnType,
    },
}

impl Expr {
    pub fn column(table_idx: usize, column_idx: usize, name: impl Into<String>, ty: ColumnType) -> Self {
        Expr::ColumnRef {
            table_idx,
            column_idx,
            name: name.into(),
            ty,
        }
    }

    pub fn literal(value: Value) -> Self {
        Expr::Literal(value)
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Value::Integer(value))
    }

    pub fn param(index: usize) -> Self {
        Expr::Parameter {
            index,
            ty: ColumnType::BigInt,
        }
    }

    pub fn compare(op: ComparisonOp, left: Expr, right: Expr) -> Self {
        Expr::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::compare(ComparisonOp::Equal, left, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    pub fn not(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    /// Folds a list of predicates into a left-deep conjunction.
    pub fn conjunction(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs.into_iter().reduce(Expr::and)
    }

    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::ColumnRef { .. } => ExprKind::ColumnRef,
            Expr::Literal(_) => ExprKind::Literal,
            Expr::Parameter { .. } => ExprKind::Parameter,
            Expr::Comparison { .. } => ExprKind::Comparison,
            Expr::And(..) => ExprKind::And,
            Expr::Or(..) => ExprKind::Or,
            Expr::Not(_) => ExprKind::Not,
            Expr::Function { .. } => ExprKind::Function,
        }
    }

    pub fn value_type(&self) -> ColumnType {
        match self {
            Expr::ColumnRef { ty, .. } | Expr::Parameter { ty, .. } | Expr::Function { ty, .. } => *ty,
            Expr::Literal(value) => match value {
                Value::Null | Value::Integer(_) => ColumnType::BigInt,
                Value::Boolean(_) => ColumnType::Boolean,
                Value::Float(_) => ColumnType::Float,
                Value::String(_) => ColumnType::Varchar,
            },
            Expr::Comparison { .. } | Expr::And(..) | Expr::Or(..) | Expr::Not(_) => ColumnType::Boolean,
        }
    }

    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::ColumnRef { .. } | Expr::Literal(_) | Expr::Parameter { .. } => Vec::new(),
            Expr::Comparison { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::And(left, right) | Expr::Or(left, right) => vec![left.as_ref(), right.as_ref()],
            Expr::Not(inner) => vec![inner.as_ref()],
            Expr::Function { args, .. } => args.iter().collect(),
        }
    }

    /// Every subexpression of `kind`, including `self`, in pre-order.
    pub fn find_all_subexpressions_of_kind(&self, kind: ExprKind) -> Vec<&Expr> {
        let mut found = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            if expr.kind() == kind {
                found.push(expr);
            }
            // reversed so the leftmost child is visited first
            stack.extend(expr.children().into_iter().rev());
        }
        found
    }

    pub fn column_refs(&self) -> Vec<&Expr> {
        self.find_all_subexpressions_of_kind(ExprKind::ColumnRef)
    }

    /// Table indexes of all column references, in pre-order.
    pub fn table_indexes(&self) -> Vec<usize> {
        self.column_refs()
            .into_iter()
            .filter_map(|expr| match expr {
                Expr::ColumnRef { table_idx, .. } => Some(*table_idx),
                _ => None,
            })
            .collect()
    }

    /// Returns a copy of the tree with every column reference tagged with `table_idx`.
    pub fn with_table_index(&self, table_idx: usize) -> Expr {
        self.map_column_refs(&|column| match column {
            Expr::ColumnRef {
                column_idx, name, ty, ..
            } => Expr::ColumnRef {
                table_idx,
                column_idx: *column_idx,
                name: name.clone(),
                ty: *ty,
            },
            other => other.clone(),
        })
    }

    fn map_column_refs(&self, f: &dyn Fn(&Expr) -> Expr) -> Expr {
        match self {
            Expr::ColumnRef { .. } => f(self),
            Expr::Literal(_) | Expr::Parameter { .. } => self.clone(),
            Expr::Comparison { op, left, right } => Expr::Comparison {
                op: *op,
                left: Box::new(left.map_column_refs(f)),
                right: Box::new(right.map_column_refs(f)),
            },
            Expr::And(left, right) => Expr::and(left.map_column_refs(f), right.map_column_refs(f)),
            Expr::Or(left, right) => Expr::or(left.map_column_refs(f), right.map_column_refs(f)),
            Expr::Not(inner) => Expr::not(inner.map_column_refs(f)),
            Expr::Function { name, args, ty } => Expr::Function {
                name: name.clone(),
                args: args.iter().map(|arg| arg.map_column_refs(f)).collect(),
                ty: *ty,
            },
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::ColumnRef { table_idx, name, .. } => write!(f, "${}.{}", table_idx, name),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Parameter { index, .. } => write!(f, "?{}", index),
            Expr::Comparison { op, left, right } => write!(f, "{} {} {}", left, op.symbol(), right),
            Expr::And(left, right) => write!(f, "({} AND {})", left, right),
            Expr::Or(left, right) => write!(f, "({} OR {})", left, right),
            Expr::Not(inner) => write!(f, "NOT {}", inner),
            Expr::Function { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}
