//! Table scan operator.

use std::collections::VecDeque;

use crate::error::Result;
use crate::executor::{
    PhysicalOperator, Predicate, Qualification, ScanStrategy, SeqScanState, TupleSlot,
};
use crate::types::{Row, Value};

/// Turns scan slots into rows, optionally applying a scan predicate.
///
/// With a predicate, every fetched slot is marked `Passed` or `Failed`
/// before any of its batch is returned; failed rows are skipped.
pub struct ScanOperator {
    scan: SeqScanState,
    columns: Vec<String>,
    predicate: Option<Predicate>,
    pending: VecDeque<Row>,
}

impl ScanOperator {
    /// Creates a scan operator producing rows keyed by `columns`.
    #[must_use]
    pub fn new(scan: SeqScanState, columns: Vec<String>) -> Self {
        ScanOperator {
            scan,
            columns,
            predicate: None,
            pending: VecDeque::new(),
        }
    }

    /// Evaluates `predicate` on every fetched slot.
    #[must_use]
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// The underlying scan state.
    #[must_use]
    pub fn scan(&self) -> &SeqScanState {
        &self.scan
    }

    /// Fetches the next slot or batch and queues its qualifying rows.
    /// Returns false at end of table.
    fn refill(&mut self) -> Result<bool> {
        let slots: &mut [TupleSlot] = match self.scan.strategy() {
            ScanStrategy::Single => match self.scan.next_slot()? {
                Some(slot) => std::slice::from_mut(slot),
                None => return Ok(false),
            },
            ScanStrategy::Batched { .. } => {
                if self.scan.fill_batch()? == 0 {
                    return Ok(false);
                }
                self.scan.batch_mut()
            }
        };

        for slot in slots {
            let row = to_row(&self.columns, slot.values()?);
            if let Some(predicate) = &self.predicate {
                let passed = predicate.evaluate(&row)?;
                slot.set_qualification(if passed {
                    Qualification::Passed
                } else {
                    Qualification::Failed
                });
                if !passed {
                    continue;
                }
            }
            self.pending.push_back(row);
        }
        Ok(true)
    }
}

fn to_row(columns: &[String], values: Vec<Value>) -> Row {
    let mut row = Row::new();
    for (name, value) in columns.iter().zip(values) {
        row.set(name.clone(), value);
    }
    row
}

impl PhysicalOperator for ScanOperator {
    fn next(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            if !self.refill()? {
                return Ok(None);
            }
        }
    }

    fn rescan(&mut self) -> Result<()> {
        self.pending.clear();
        self.scan.reinitialize()
    }

    fn close(&mut self) {
        self.pending.clear();
        self.scan.shutdown();
    }
}
