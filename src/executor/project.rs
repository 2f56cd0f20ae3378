//! Project operator.

use crate::error::{HeapScanError, Result};
use crate::executor::PhysicalOperator;
use crate::types::Row;

/// Keeps a subset of the child's columns.
pub struct ProjectOperator {
    child: Box<dyn PhysicalOperator>,
    columns: Vec<String>,
}

impl ProjectOperator {
    /// Creates a new project operator with the given child and output columns.
    #[must_use]
    pub fn new(child: Box<dyn PhysicalOperator>, columns: Vec<String>) -> Self {
        ProjectOperator { child, columns }
    }

    /// Returns the column names that will be in the output.
    #[must_use]
    pub fn output_columns(&self) -> &[String] {
        &self.columns
    }
}

impl PhysicalOperator for ProjectOperator {
    fn next(&mut self) -> Result<Option<Row>> {
        let Some(input_row) = self.child.next()? else {
            return Ok(None);
        };
        let mut output_row = Row::new();
        for column in &self.columns {
            let value = input_row.get(column).ok_or_else(|| {
                HeapScanError::ExecutionError(format!("Unknown column '{column}' in projection"))
            })?;
            output_row.set(column.clone(), value.clone());
        }
        Ok(Some(output_row))
    }

    fn rescan(&mut self) -> Result<()> {
        self.child.rescan()
    }

    fn close(&mut self) {
        self.child.close();
    }
}
