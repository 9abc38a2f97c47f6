//! Physical Operator Model
//!
//! Operators are persistent values. Inputs are shared through `Arc`, so copying an
//! operator with a new condition or a pushed-down limit allocates one node and reuses
//! every unchanged subtree. Alternative trees explored by the search engine can never
//! interfere with each other.

use super::access_path::AccessPath;
use super::traits::TraitSet;
use crate::catalog::{ColumnType, Index, Table};
use crate::expression::{Expr, Value};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Join types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Full => "full",
            JoinKind::Semi => "semi",
            JoinKind::Anti => "anti",
        }
    }

    /// Semi and anti joins only emit outer columns.
    pub fn projects_inner(&self) -> bool {
        !matches!(self, JoinKind::Semi | JoinKind::Anti)
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a correlation variable bound by a join
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub u32);

/// A typed, named field of an operator's output row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelField {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl RelField {
    pub fn new(name: impl Into<String>, ty: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable,
        }
    }

    fn into_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Pushed-down LIMIT / OFFSET. Both are expressions so statement parameters survive
/// until execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitOffset {
    pub offset: Option<Expr>,
    pub limit: Option<Expr>,
}

impl LimitOffset {
    pub fn new(offset: Option<Expr>, limit: Option<Expr>) -> Option<Self> {
        if offset.is_none() && limit.is_none() {
            None
        } else {
            Some(Self { offset, limit })
        }
    }

    /// Limit value when it is a literal, ignoring parameters.
    pub fn literal_limit(&self) -> Option<i64> {
        match &self.limit {
            Some(Expr::Literal(value)) => value.as_i64(),
            _ => None,
        }
    }

    /// Evaluates limit and offset against the statement parameters.
    ///
    /// Returns `(limit, offset)`; a missing limit means unlimited and a missing offset
    /// is zero.
    pub fn resolve(&self, params: &[Value]) -> Result<(Option<i64>, i64)> {
        let limit = self
            .limit
            .as_ref()
            .map(|expr| Self::evaluate(expr, params, "limit"))
            .transpose()?;
        let offset = self
            .offset
            .as_ref()
            .map(|expr| Self::evaluate(expr, params, "offset"))
            .transpose()?
            .unwrap_or(0);
        Ok((limit, offset))
    }

    fn evaluate(expr: &Expr, params: &[Value], what: &str) -> Result<i64> {
        let value = match expr {
            Expr::Literal(value) => value,
            Expr::Parameter { index, .. } => params.get(*index).ok_or_else(|| {
                Error::Parameter(format!(
                    "{} refers to parameter {} but only {} supplied",
                    what,
                    index,
                    params.len()
                ))
            })?,
            other => {
                return Err(Error::Parameter(format!(
                    "{} must be a literal or parameter, got {}",
                    what, other
                )))
            }
        };
        let resolved = value
            .as_i64()
            .ok_or_else(|| Error::Parameter(format!("{} is not an integer: {}", what, value)))?;
        if resolved < 0 {
            return Err(Error::Parameter(format!("{} must not be negative: {}", what, resolved)));
        }
        Ok(resolved)
    }
}

/// State shared by the scan variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanCore {
    pub traits: TraitSet,
    pub table: Arc<Table>,
    /// Projected table column offsets; `None` returns every column
    pub projection: Option<Vec<usize>>,
    /// Filter evaluated on each scanned row. Column references use table index 0.
    pub filter: Option<Expr>,
    pub limit_offset: Option<LimitOffset>,
}

impl ScanCore {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            traits: TraitSet::default(),
            table,
            projection: None,
            filter: None,
            limit_offset: None,
        }
    }

    pub fn with_projection(mut self, columns: Vec<usize>) -> Self {
        self.projection = Some(columns);
        self
    }

    pub fn with_filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_traits(mut self, traits: TraitSet) -> Self {
        self.traits = traits;
        self
    }

    /// Table column offsets produced by this scan, in output order.
    pub fn output_columns(&self) -> Vec<usize> {
        match &self.projection {
            Some(columns) => columns.clone(),
            None => (0..self.table.columns.len()).collect(),
        }
    }

    pub fn row_type(&self) -> Vec<RelField> {
        self.output_columns()
            .into_iter()
            .filter_map(|offset| self.table.column(offset))
            .map(|c| RelField::new(c.name.clone(), c.ty, c.nullable))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if let Some(columns) = &self.projection {
            if let Some(bad) = columns.iter().find(|&&c| c >= self.table.columns.len()) {
                return Err(Error::Configuration(format!(
                    "projection column {} out of range for table {}",
                    bad, self.table.name
                )));
            }
        }
        Ok(())
    }
}

/// State shared by the join variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinCore {
    pub traits: TraitSet,
    pub outer: Arc<PhysicalOperator>,
    pub inner: Arc<PhysicalOperator>,
    /// Join predicate. Outer columns use table index 0, inner columns table index 1.
    pub condition: Expr,
    pub kind: JoinKind,
    pub variables: BTreeSet<CorrelationId>,
    /// Extra fields appended to the row type, e.g. semi-join markers
    pub system_fields: Vec<RelField>,
    pub limit_offset: Option<LimitOffset>,
}

impl JoinCore {
    pub fn new(
        outer: Arc<PhysicalOperator>,
        inner: Arc<PhysicalOperator>,
        condition: Expr,
        kind: JoinKind,
    ) -> Self {
        Self {
            traits: TraitSet::default(),
            outer,
            inner,
            condition,
            kind,
            variables: BTreeSet::new(),
            system_fields: Vec::new(),
            limit_offset: None,
        }
    }

    pub fn with_traits(mut self, traits: TraitSet) -> Self {
        self.traits = traits;
        self
    }

    pub fn with_variables(mut self, variables: impl IntoIterator<Item = CorrelationId>) -> Self {
        self.variables = variables.into_iter().collect();
        self
    }

    pub fn with_system_fields(mut self, fields: Vec<RelField>) -> Self {
        self.system_fields = fields;
        self
    }

    pub fn row_type(&self) -> Vec<RelField> {
        let outer_nullable = matches!(self.kind, JoinKind::Right | JoinKind::Full);
        let inner_nullable = matches!(self.kind, JoinKind::Left | JoinKind::Full);

        let mut fields: Vec<RelField> = self
            .outer
            .row_type()
            .into_iter()
            .map(|f| if outer_nullable { f.into_nullable() } else { f })
            .collect();
        if self.kind.projects_inner() {
            fields.extend(
                self.inner
                    .row_type()
                    .into_iter()
                    .map(|f| if inner_nullable { f.into_nullable() } else { f }),
            );
        }
        fields.extend(self.system_fields.iter().cloned());
        fields
    }

    fn rebuild(&self, children: Vec<Arc<PhysicalOperator>>, condition: Expr, kind: JoinKind) -> Result<Self> {
        let [outer, inner]: [Arc<PhysicalOperator>; 2] = children.try_into().map_err(|given: Vec<_>| {
            Error::Internal(format!("join copy needs exactly 2 inputs, got {}", given.len()))
        })?;
        Ok(Self {
            traits: self.traits.clone(),
            outer,
            inner,
            condition,
            kind,
            variables: self.variables.clone(),
            system_fields: self.system_fields.clone(),
            limit_offset: None,
        })
    }
}

/// Index scan payload: the scanned index and how it is used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexScan {
    pub scan: ScanCore,
    index: Arc<Index>,
    access_path: Arc<AccessPath>,
}

impl IndexScan {
    pub fn index(&self) -> &Arc<Index> {
        &self.index
    }

    pub fn access_path(&self) -> &Arc<AccessPath> {
        &self.access_path
    }

    fn validate(&self) -> Result<()> {
        self.scan.validate()?;
        if self.index.table != self.scan.table.name {
            return Err(Error::Configuration(format!(
                "index {} belongs to {}, not {}",
                self.index.name, self.index.table, self.scan.table.name
            )));
        }
        let path = &self.access_path;
        let matched = path.equality_key_count() + usize::from(path.range.is_some());
        if matched > self.index.key_width() {
            return Err(Error::Configuration(format!(
                "access path matches {} key columns but index {} has {}",
                matched,
                self.index.name,
                self.index.key_width()
            )));
        }
        Ok(())
    }
}

/// Nested-loop join whose inner side is looked up through an index.
///
/// The index descriptor and access path are fixed by the physical choice and are
/// carried unchanged through every copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexJoin {
    pub join: JoinCore,
    index: Arc<Index>,
    access_path: Arc<AccessPath>,
}

impl IndexJoin {
    /// Fails with a configuration error unless both the index and access path are given.
    pub fn new(join: JoinCore, index: Option<Arc<Index>>, access_path: Option<Arc<AccessPath>>) -> Result<Self> {
        let index = index.ok_or_else(|| Error::Configuration("Inner index is null".into()))?;
        let access_path = access_path.ok_or_else(|| Error::Configuration("Inner access path is null".into()))?;
        Ok(Self {
            join,
            index,
            access_path,
        })
    }

    pub fn index(&self) -> &Arc<Index> {
        &self.index
    }

    pub fn access_path(&self) -> &Arc<AccessPath> {
        &self.access_path
    }
}

/// Physical query operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhysicalOperator {
    /// Full table scan with optional filter
    SeqScan(ScanCore),
    IndexScan(IndexScan),
    /// Nested loop join with an arbitrary inner side
    NestLoopJoin(JoinCore),
    /// Nested loop join probing an index on the inner side
    NestLoopIndexJoin(IndexJoin),
}

impl PhysicalOperator {
    pub fn seq_scan(scan: ScanCore) -> Result<Self> {
        scan.validate()?;
        Ok(PhysicalOperator::SeqScan(scan))
    }

    pub fn index_scan(scan: ScanCore, index: Arc<Index>, access_path: Arc<AccessPath>) -> Result<Self> {
        let index_scan = IndexScan {
            scan,
            index,
            access_path,
        };
        index_scan.validate()?;
        Ok(PhysicalOperator::IndexScan(index_scan))
    }

    pub fn nest_loop_join(join: JoinCore) -> Self {
        PhysicalOperator::NestLoopJoin(join)
    }

    pub fn nest_loop_index_join(
        join: JoinCore,
        index: Option<Arc<Index>>,
        access_path: Option<Arc<AccessPath>>,
    ) -> Result<Self> {
        IndexJoin::new(join, index, access_path).map(PhysicalOperator::NestLoopIndexJoin)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PhysicalOperator::SeqScan(_) => "SeqScan",
            PhysicalOperator::IndexScan(_) => "IndexScan",
            PhysicalOperator::NestLoopJoin(_) => "NestLoopJoin",
            PhysicalOperator::NestLoopIndexJoin(_) => "NestLoopIndexJoin",
        }
    }

    pub fn traits(&self) -> &TraitSet {
        match self {
            PhysicalOperator::SeqScan(scan) => &scan.traits,
            PhysicalOperator::IndexScan(s) => &s.scan.traits,
            PhysicalOperator::NestLoopJoin(join) => &join.traits,
            PhysicalOperator::NestLoopIndexJoin(j) => &j.join.traits,
        }
    }

    pub fn limit_offset(&self) -> Option<&LimitOffset> {
        match self {
            PhysicalOperator::SeqScan(scan) => scan.limit_offset.as_ref(),
            PhysicalOperator::IndexScan(s) => s.scan.limit_offset.as_ref(),
            PhysicalOperator::NestLoopJoin(join) => join.limit_offset.as_ref(),
            PhysicalOperator::NestLoopIndexJoin(j) => j.join.limit_offset.as_ref(),
        }
    }

    pub fn join_core(&self) -> Option<&JoinCore> {
        match self {
            PhysicalOperator::NestLoopJoin(join) => Some(join),
            PhysicalOperator::NestLoopIndexJoin(j) => Some(&j.join),
            _ => None,
        }
    }

    pub fn scan_core(&self) -> Option<&ScanCore> {
        match self {
            PhysicalOperator::SeqScan(scan) => Some(scan),
            PhysicalOperator::IndexScan(s) => Some(&s.scan),
            _ => None,
        }
    }

    pub fn inputs(&self) -> Vec<&Arc<PhysicalOperator>> {
        match self.join_core() {
            Some(join) => vec![&join.outer, &join.inner],
            None => Vec::new(),
        }
    }

    pub fn row_type(&self) -> Vec<RelField> {
        match self {
            PhysicalOperator::SeqScan(scan) => scan.row_type(),
            PhysicalOperator::IndexScan(s) => s.scan.row_type(),
            PhysicalOperator::NestLoopJoin(join) => join.row_type(),
            PhysicalOperator::NestLoopIndexJoin(j) => j.join.row_type(),
        }
    }

    /// Copies a join with new inputs, condition and join kind.
    ///
    /// Traits, correlation variables, system fields and, for index joins, the index
    /// descriptor and access path are carried over unchanged. A pushed-down limit is
    /// dropped since it may not hold for the new shape; reattach it with
    /// [`copy_with_limit_offset`](Self::copy_with_limit_offset).
    pub fn copy(&self, children: Vec<Arc<PhysicalOperator>>, condition: Expr, kind: JoinKind) -> Result<Self> {
        match self {
            PhysicalOperator::NestLoopJoin(join) => {
                Ok(PhysicalOperator::NestLoopJoin(join.rebuild(children, condition, kind)?))
            }
            PhysicalOperator::NestLoopIndexJoin(j) => Ok(PhysicalOperator::NestLoopIndexJoin(IndexJoin {
                join: j.join.rebuild(children, condition, kind)?,
                index: Arc::clone(&j.index),
                access_path: Arc::clone(&j.access_path),
            })),
            other => Err(Error::Internal(format!(
                "copy with new inputs is only defined for joins, not {}",
                other.name()
            ))),
        }
    }

    /// Returns a new operator carrying the given limit/offset. Everything else,
    /// inputs included, is shared with `self`.
    pub fn copy_with_limit_offset(&self, offset: Option<Expr>, limit: Option<Expr>) -> Self {
        let clause = LimitOffset::new(offset, limit);
        let mut copy = self.clone();
        match &mut copy {
            PhysicalOperator::SeqScan(scan) => scan.limit_offset = clause,
            PhysicalOperator::IndexScan(s) => s.scan.limit_offset = clause,
            PhysicalOperator::NestLoopJoin(join) => join.limit_offset = clause,
            PhysicalOperator::NestLoopIndexJoin(j) => j.join.limit_offset = clause,
        }
        copy
    }

    pub fn with_traits(&self, traits: TraitSet) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            PhysicalOperator::SeqScan(scan) => scan.traits = traits,
            PhysicalOperator::IndexScan(s) => s.scan.traits = traits,
            PhysicalOperator::NestLoopJoin(join) => join.traits = traits,
            PhysicalOperator::NestLoopIndexJoin(j) => j.join.traits = traits,
        }
        copy
    }

    /// Re-checks the construction rules of every operator in the tree.
    pub fn validate(&self) -> Result<()> {
        match self {
            PhysicalOperator::SeqScan(scan) => scan.validate(),
            PhysicalOperator::IndexScan(s) => s.validate(),
            PhysicalOperator::NestLoopJoin(_) | PhysicalOperator::NestLoopIndexJoin(_) => {
                self.inputs().into_iter().try_for_each(|input| input.validate())
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses an operator tree and validates it like the constructors do.
    pub fn from_json(json: &str) -> Result<Self> {
        let op: PhysicalOperator = serde_json::from_str(json)?;
        op.validate()?;
        Ok(op)
    }

    /// One-line description of this operator (inputs not included).
    pub fn explain(&self) -> String {
        let mut items: Vec<(&str, String)> = Vec::new();
        match self {
            PhysicalOperator::SeqScan(scan) => {
                items.push(("table", scan.table.name.clone()));
                if let Some(filter) = &scan.filter {
                    items.push(("filter", filter.to_string()));
                }
            }
            PhysicalOperator::IndexScan(s) => {
                items.push(("table", s.scan.table.name.clone()));
                items.push(("index", s.index.name.clone()));
                items.push(("keys", s.access_path.equality_key_count().to_string()));
                if let Some(filter) = &s.scan.filter {
                    items.push(("filter", filter.to_string()));
                }
            }
            PhysicalOperator::NestLoopJoin(join) => {
                items.push(("condition", join.condition.to_string()));
                items.push(("joinType", join.kind.to_string()));
            }
            PhysicalOperator::NestLoopIndexJoin(j) => {
                items.push(("condition", j.join.condition.to_string()));
                items.push(("joinType", j.join.kind.to_string()));
                items.push(("innerIndex", j.index.name.clone()));
            }
        }
        if let Some(clause) = self.limit_offset() {
            if let Some(offset) = &clause.offset {
                items.push(("offset", offset.to_string()));
            }
            if let Some(limit) = &clause.limit {
                items.push(("limit", limit.to_string()));
            }
        }
        let body: Vec<String> = items.into_iter().map(|(k, v)| format!("{}=[{}]", k, v)).collect();
        format!("{}({})", self.name(), body.join(", "))
    }

    /// Multi-line description of the whole operator tree.
    pub fn explain_tree(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.explain());
        out.push('\n');
        for input in self.inputs() {
            input.explain_into(out, depth + 1);
        }
    }
}
