//! Row predicates and the filter operator.

use std::cmp::Ordering;

use crate::error::{HeapScanError, Result};
use crate::executor::PhysicalOperator;
use crate::types::{Row, Value};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Gt,
    Lt,
    Eq,
    Gte,
    Lte,
    Neq,
}

impl ComparisonOp {
    /// Parses a comparison operator from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ">" => Some(ComparisonOp::Gt),
            "<" => Some(ComparisonOp::Lt),
            "=" => Some(ComparisonOp::Eq),
            ">=" => Some(ComparisonOp::Gte),
            "<=" => Some(ComparisonOp::Lte),
            "<>" | "!=" => Some(ComparisonOp::Neq),
            _ => None,
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Gt => ordering == Ordering::Greater,
            ComparisonOp::Lt => ordering == Ordering::Less,
            ComparisonOp::Eq => ordering == Ordering::Equal,
            ComparisonOp::Gte => ordering != Ordering::Less,
            ComparisonOp::Lte => ordering != Ordering::Greater,
            ComparisonOp::Neq => ordering != Ordering::Equal,
        }
    }
}

/// `column <op> literal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: ComparisonOp,
    pub value: Value,
}

impl Predicate {
    #[must_use]
    pub fn new(column: impl Into<String>, op: ComparisonOp, value: Value) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    /// Evaluates the predicate against a row.
    ///
    /// NULL and values of incomparable types never qualify.
    ///
    /// # Errors
    ///
    /// Returns an error if the row has no such column.
    pub fn evaluate(&self, row: &Row) -> Result<bool> {
        let value = row.get(&self.column).ok_or_else(|| {
            HeapScanError::ExecutionError(format!("Unknown column '{}' in predicate", self.column))
        })?;
        let (lhs, rhs) = promote_for_comparison(value.clone(), self.value.clone());
        Ok(lhs.compare(&rhs).is_some_and(|ordering| self.op.holds(ordering)))
    }
}

/// Promotes values for cross-type comparison (Int64 vs Float64).
#[allow(clippy::cast_precision_loss)]
fn promote_for_comparison(a: Value, b: Value) -> (Value, Value) {
    match (&a, &b) {
        (Value::Int64(n), Value::Float64(_)) => (Value::Float64(*n as f64), b),
        (Value::Float64(_), Value::Int64(n)) => (a, Value::Float64(*n as f64)),
        _ => (a, b),
    }
}

/// Passes through the child's rows that satisfy a predicate.
pub struct FilterOperator {
    child: Box<dyn PhysicalOperator>,
    predicate: Predicate,
}

impl FilterOperator {
    /// Creates a new filter operator with the given child and predicate.
    #[must_use]
    pub fn new(child: Box<dyn PhysicalOperator>, predicate: Predicate) -> Self {
        FilterOperator { child, predicate }
    }
}

impl PhysicalOperator for FilterOperator {
    fn next(&mut self) -> Result<Option<Row>> {
        while let Some(row) = self.child.next()? {
            if self.predicate.evaluate(&row)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn rescan(&mut self) -> Result<()> {
        self.child.rescan()
    }

    fn close(&mut self) {
        self.child.close();
    }
}
