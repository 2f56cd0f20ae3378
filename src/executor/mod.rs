//! Executor module for pull-based query execution.
//!
//! The core is the sequential scan ([`SeqScanState`]), which drives a
//! [`TableScanCursor`] either one tuple at a time or in fixed-size batches
//! of reusable [`TupleSlot`]s. Row operators ([`ScanOperator`],
//! [`FilterOperator`], [`ProjectOperator`]) sit on top of it and are pulled
//! by their parent through [`PhysicalOperator::next`].

mod access;
mod filter;
mod project;
mod scan;
mod seq_scan;
mod slot;

pub use access::{AccessMethod, ScanDirection, ScanTuple, TableScanCursor};
pub use filter::{ComparisonOp, FilterOperator, Predicate};
pub use project::ProjectOperator;
pub use scan::ScanOperator;
pub use seq_scan::{BatchPhase, ScanPhase, ScanStrategy, SeqScanState};
pub use slot::{Qualification, SlotPool, TupleSlot};

use crate::error::{HeapScanError, Result};
use crate::types::Row;

/// Default number of slots in a batched scan.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Configuration of one sequential scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Single-row or batched fetch.
    pub strategy: ScanStrategy,
    /// Direction the cursor walks the table.
    pub direction: ScanDirection,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            strategy: ScanStrategy::Batched {
                capacity: DEFAULT_BATCH_SIZE,
            },
            direction: ScanDirection::Forward,
        }
    }
}

impl ScanConfig {
    /// Creates a batched forward scan configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a single-row forward scan configuration.
    #[must_use]
    pub fn single_row() -> Self {
        Self {
            strategy: ScanStrategy::Single,
            ..Self::default()
        }
    }

    /// Switches to batched fetch with `batch_size` slots.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.strategy = ScanStrategy::Batched {
            capacity: batch_size,
        };
        self
    }

    /// Sets the scan direction.
    #[must_use]
    pub fn with_direction(mut self, direction: ScanDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a batched strategy has zero capacity.
    pub fn validate(&self) -> Result<()> {
        if self.strategy.capacity() == 0 {
            return Err(HeapScanError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Trait for physical operators in the execution pipeline.
pub trait PhysicalOperator {
    /// Returns the next row, or None if exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the input fails or a predicate cannot be evaluated.
    fn next(&mut self) -> Result<Option<Row>>;

    /// Restarts the operator from its first row.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying scan is closed or cannot rewind.
    fn rescan(&mut self) -> Result<()>;

    /// Releases the operator's resources. Safe to call more than once.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.strategy.capacity(), DEFAULT_BATCH_SIZE);
        assert_eq!(config.direction, ScanDirection::Forward);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ScanConfig::single_row().with_direction(ScanDirection::Backward);
        assert_eq!(config.strategy, ScanStrategy::Single);
        assert_eq!(config.direction, ScanDirection::Backward);

        let config = ScanConfig::single_row().with_batch_size(8);
        assert_eq!(config.strategy, ScanStrategy::Batched { capacity: 8 });
    }

    #[test]
    fn test_zero_batch_rejected() {
        let config = ScanConfig::new().with_batch_size(0);
        assert!(matches!(
            config.validate(),
            Err(HeapScanError::InvalidConfig(_))
        ));
    }
}
