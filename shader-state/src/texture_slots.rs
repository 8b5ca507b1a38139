//! Texture unit pool
//!
//! Fixed-capacity pool of texture binding slots. Allocation is first-fit:
//! the lowest free index always wins, so the same sequence of calls yields
//! the same slots every run.

use hashbrown::HashMap;

/// Pool of texture units keyed by sampler name.
///
/// Invariant: a slot index is held by at most one name, and `usage[slot]`
/// is set iff some name holds `slot`.
#[derive(Debug, Clone)]
pub struct TextureSlots {
    usage: Vec<bool>,
    assignments: HashMap<String, u32>,
}

impl TextureSlots {
    /// Capacity used when the context cannot report its unit count
    pub const DEFAULT_CAPACITY: u32 = 32;

    pub fn new(capacity: u32) -> Self {
        Self {
            usage: vec![false; capacity as usize],
            assignments: HashMap::new(),
        }
    }

    /// Number of slots in the pool. Also the "no slot available" sentinel value.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.usage.len() as u32
    }

    /// Resize the pool, dropping every allocation
    pub fn resize(&mut self, capacity: u32) {
        self.usage = vec![false; capacity as usize];
        self.assignments.clear();
    }

    /// Slot currently held by `name`
    pub fn slot(&self, name: &str) -> Option<u32> {
        self.assignments.get(name).copied()
    }

    /// Lowest free slot, `None` if the pool is exhausted
    pub fn find_available(&self) -> Option<u32> {
        self.usage.iter().position(|used| !used).map(|slot| slot as u32)
    }

    /// Allocate a slot for `name`.
    ///
    /// Returns the existing slot if `name` already holds one, or `None` when
    /// the pool is exhausted.
    pub fn allocate(&mut self, name: &str) -> Option<u32> {
        if let Some(slot) = self.slot(name) {
            return Some(slot);
        }
        let slot = self.find_available()?;
        self.usage[slot as usize] = true;
        self.assignments.insert(name.to_owned(), slot);
        Some(slot)
    }

    /// Release the slot held by `name`, returning it
    pub fn release(&mut self, name: &str) -> Option<u32> {
        let slot = self.assignments.remove(name)?;
        if let Some(used) = self.usage.get_mut(slot as usize) {
            *used = false;
        }
        Some(slot)
    }

    /// Drop every allocation regardless of who holds it
    pub fn reset(&mut self) {
        self.usage.fill(false);
        self.assignments.clear();
    }

    /// Recompute the usage bitmap from the name map
    pub fn rebuild_usage(&mut self) {
        self.usage.fill(false);
        for &slot in self.assignments.values() {
            if let Some(used) = self.usage.get_mut(slot as usize) {
                *used = true;
            }
        }
    }

    /// Whether `slot` is currently held
    pub fn is_used(&self, slot: u32) -> bool {
        self.usage.get(slot as usize).copied().unwrap_or(false)
    }

    /// Number of held slots
    pub fn in_use(&self) -> usize {
        self.assignments.len()
    }

    /// Iterate `(name, slot)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.assignments.iter().map(|(name, &slot)| (name.as_str(), slot))
    }
}

impl Default for TextureSlots {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
