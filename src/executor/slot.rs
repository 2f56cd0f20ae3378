//! Reusable tuple slots.
//!
//! A [`TupleSlot`] holds at most one tuple: a copied descriptor plus its
//! own pin on the tuple's page. Slots live in a [`SlotPool`] allocated
//! once per scan; storing into a slot takes a pin and clearing it
//! releases that pin exactly once.

use crate::error::{HeapScanError, Result};
use crate::executor::access::ScanTuple;
use crate::storage::buffer_pool::PinnedPage;
use crate::storage::heap::{RecordId, TupleDescriptor};
use crate::types::Value;

/// Predicate status of a slot's tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Qualification {
    /// No predicate has looked at the tuple yet.
    #[default]
    Unevaluated,
    Passed,
    Failed,
}

/// Holder for one borrowed tuple.
#[derive(Debug, Default)]
pub struct TupleSlot {
    contents: Option<(TupleDescriptor, PinnedPage)>,
    qualification: Qualification,
}

impl TupleSlot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_none()
    }

    #[must_use]
    pub fn descriptor(&self) -> Option<&TupleDescriptor> {
        self.contents.as_ref().map(|(desc, _)| desc)
    }

    #[must_use]
    pub fn page(&self) -> Option<&PinnedPage> {
        self.contents.as_ref().map(|(_, page)| page)
    }

    #[must_use]
    pub fn rid(&self) -> Option<RecordId> {
        self.descriptor().map(|desc| desc.rid)
    }

    #[must_use]
    pub fn qualification(&self) -> Qualification {
        self.qualification
    }

    /// Records the outcome of a predicate. Ignored on an empty slot.
    pub fn set_qualification(&mut self, qualification: Qualification) {
        if !self.is_empty() {
            self.qualification = qualification;
        }
    }

    /// Decodes the held tuple's values.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is empty or the tuple cannot be decoded.
    pub fn values(&self) -> Result<Vec<Value>> {
        let (desc, page) = self
            .contents
            .as_ref()
            .ok_or_else(|| HeapScanError::ExecutionError("read of an empty slot".into()))?;
        desc.values(page)
    }
}

/// Fixed-capacity array of slots with store/release accounting.
#[derive(Debug)]
pub struct SlotPool {
    slots: Vec<TupleSlot>,
    stores: u64,
    releases: u64,
}

impl SlotPool {
    /// Allocates `capacity` empty slots.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero capacity and `ResourceExhaustion`
    /// if the slots cannot be allocated.
    pub fn allocate(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(HeapScanError::InvalidConfig(
                "slot pool capacity must be at least 1".into(),
            ));
        }
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(|e| {
            HeapScanError::ResourceExhaustion(format!("slot pool of {capacity} slots: {e}"))
        })?;
        slots.resize_with(capacity, TupleSlot::default);
        Ok(Self {
            slots,
            stores: 0,
            releases: 0,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slots(&self) -> &[TupleSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [TupleSlot] {
        &mut self.slots
    }

    /// Installs a tuple into slot `idx`, taking a pin on its page.
    ///
    /// # Errors
    ///
    /// Returns an error if `idx` is out of range or the slot is occupied.
    pub fn store(&mut self, idx: usize, tuple: ScanTuple<'_>) -> Result<()> {
        let slot = self.slots.get_mut(idx).ok_or_else(|| {
            HeapScanError::ExecutionError(format!("slot {idx} out of range"))
        })?;
        if !slot.is_empty() {
            return Err(HeapScanError::ExecutionError(format!(
                "slot {idx} must be cleared before store"
            )));
        }
        slot.contents = Some((*tuple.descriptor, tuple.page.share()));
        slot.qualification = Qualification::Unevaluated;
        self.stores += 1;
        Ok(())
    }

    /// Empties slot `idx`, releasing its page pin if it held a tuple.
    pub fn clear(&mut self, idx: usize) {
        if let Some(slot) = self.slots.get_mut(idx) {
            slot.qualification = Qualification::Unevaluated;
            if slot.contents.take().is_some() {
                self.releases += 1;
            }
        }
    }

    /// Empties slots `start..capacity`.
    pub fn clear_from(&mut self, start: usize) {
        for idx in start..self.slots.len() {
            self.clear(idx);
        }
    }

    /// Empties every slot.
    pub fn clear_all(&mut self) {
        self.clear_from(0);
    }

    /// Number of non-empty slots.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    /// Tuples stored since allocation.
    #[must_use]
    pub fn stores(&self) -> u64 {
        self.stores
    }

    /// Pins released by clearing since allocation.
    #[must_use]
    pub fn releases(&self) -> u64 {
        self.releases
    }
}
