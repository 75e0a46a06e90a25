//! # In-memory physical address space

use crate::{MapError, PhysMapRo};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// A sparse physical address space made of non-overlapping byte regions.
///
/// Used by tests to lay out synthetic table graphs and by hosts that load
/// memory images from files.
///
/// ```rust
/// use acpi_view::{PhysMapRo, PhysRegions};
///
/// let mut memory = PhysRegions::new();
/// memory.insert(0x1000, vec![1, 2, 3, 4]);
/// assert_eq!(memory.map_ro(0x1001, 2).unwrap(), &[2, 3]);
/// assert!(memory.map_ro(0x1002, 4).is_err());
/// ```
#[derive(Debug, Default, Clone)]
pub struct PhysRegions {
    regions: BTreeMap<u64, Vec<u8>>,
}

impl PhysRegions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regions: BTreeMap::new(),
        }
    }

    /// Place `bytes` at `base`, replacing any region that starts there.
    pub fn insert(&mut self, base: u64, bytes: Vec<u8>) {
        log::trace!("Mapped region 0x{base:x}+0x{:x}", bytes.len());
        self.regions.insert(base, bytes);
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl PhysMapRo for PhysRegions {
    fn map_ro(&self, paddr: u64, len: usize) -> Result<&[u8], MapError> {
        let (&base, bytes) = self
            .regions
            .range(..=paddr)
            .next_back()
            .ok_or(MapError::Unmapped(paddr))?;
        let start = usize::try_from(paddr - base).map_err(|_| MapError::Overflow { paddr, len })?;
        if start >= bytes.len() {
            return Err(MapError::Unmapped(paddr));
        }
        let end = start
            .checked_add(len)
            .ok_or(MapError::Overflow { paddr, len })?;
        bytes.get(start..end).ok_or(MapError::OutOfBounds { paddr, len })
    }
}
