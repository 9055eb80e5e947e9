//! Handle Registry
//!
//! A bounded pool of small integer indices, one per open dataset handle.
//!
//! ## Slot Lifecycle
//! ```text
//! acquire(None)      → lowest free index
//! acquire(Some(i))   → exactly i, or HandleInUse / HandleOutOfRange
//! drop(HandleSlot)   → index is free again
//! ```
//!
//! The registry is cheap to clone; clones share the same pool.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Result, SddsError};

#[derive(Debug)]
struct RegistryState {
    max_index: usize,
    in_use: BTreeSet<usize>,
}

/// Shared pool of handle indices `0..=max_index`
#[derive(Debug, Clone)]
pub struct HandleRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl HandleRegistry {
    pub fn new(max_index: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryState {
                max_index,
                in_use: BTreeSet::new(),
            })),
        }
    }

    /// Highest assignable index
    pub fn max_index(&self) -> usize {
        self.inner.lock().max_index
    }

    /// Reserve an index, the lowest free one when `index` is `None`
    pub fn acquire(&self, index: Option<usize>) -> Result<HandleSlot> {
        let mut state = self.inner.lock();
        let max_index = state.max_index;

        let index = match index {
            Some(i) if i > max_index => {
                return Err(SddsError::HandleOutOfRange { index: i, max_index })
            }
            Some(i) if state.in_use.contains(&i) => return Err(SddsError::HandleInUse(i)),
            Some(i) => i,
            None => (0..=max_index)
                .find(|i| !state.in_use.contains(i))
                .ok_or(SddsError::ResourceExhausted { max_index })?,
        };

        state.in_use.insert(index);
        trace!(index, "Acquired handle slot");
        Ok(HandleSlot {
            index,
            registry: Arc::clone(&self.inner),
        })
    }

    /// True when `index` is currently held
    pub fn is_in_use(&self, index: usize) -> bool {
        self.inner.lock().in_use.contains(&index)
    }

    /// Number of indices currently held
    pub fn in_use(&self) -> usize {
        self.inner.lock().in_use.len()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// An acquired index; released when dropped
#[derive(Debug)]
pub struct HandleSlot {
    index: usize,
    registry: Arc<Mutex<RegistryState>>,
}

impl HandleSlot {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for HandleSlot {
    fn drop(&mut self) {
        self.registry.lock().in_use.remove(&self.index);
        trace!(index = self.index, "Released handle slot");
    }
}
