//! Pending update queues
//!
//! Updates accepted by the queue calls wait here until the next flush. Each
//! queue keeps FIFO order and holds at most one entry per name: a newer
//! update for a name that is still pending overwrites it in place.

use hashbrown::HashMap;

use super::{BufferBinding, TextureBinding};
use crate::context::{BufferKind, UniformLocation};
use crate::uniform::UniformValue;

/// An entry addressable by name inside a [`NamedQueue`]
pub(crate) trait PendingEntry {
    fn name(&self) -> &str;
}

/// A uniform value waiting to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct UniformUpdate {
    pub name: String,
    pub value: UniformValue,
    /// Resolved at queue time when a program was active; otherwise resolved at flush
    pub location: Option<UniformLocation>,
}

/// A buffer binding waiting to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBuffer {
    pub name: String,
    pub binding: BufferBinding,
}

impl PendingEntry for UniformUpdate {
    fn name(&self) -> &str {
        &self.name
    }
}

impl PendingEntry for TextureBinding {
    fn name(&self) -> &str {
        &self.name
    }
}

impl PendingEntry for PendingBuffer {
    fn name(&self) -> &str {
        &self.name
    }
}

/// FIFO queue coalesced by name
#[derive(Debug)]
pub(crate) struct NamedQueue<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for NamedQueue<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: PendingEntry> NamedQueue<T> {
    /// Enqueue `entry`, replacing a pending entry of the same name in place.
    ///
    /// Returns `true` if an existing entry was replaced.
    pub fn push(&mut self, entry: T) -> bool {
        if let Some(&idx) = self.index.get(entry.name()) {
            self.entries[idx] = entry;
            return true;
        }
        self.index.insert(entry.name().to_owned(), self.entries.len());
        self.entries.push(entry);
        false
    }

    /// Remove the entry for `name`, keeping the order of the rest
    pub fn remove(&mut self, name: &str) -> Option<T> {
        let idx = self.index.remove(name)?;
        let entry = self.entries.remove(idx);
        for slot in self.index.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(entry)
    }

    /// Drain every entry in FIFO order
    pub fn take(&mut self) -> Vec<T> {
        self.index.clear();
        std::mem::take(&mut self.entries)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

/// The four queues drained by a flush
#[derive(Debug, Default)]
pub(crate) struct PendingUpdates {
    pub uniforms: NamedQueue<UniformUpdate>,
    pub textures: NamedQueue<TextureBinding>,
    pub uniform_buffers: NamedQueue<PendingBuffer>,
    pub storage_buffers: NamedQueue<PendingBuffer>,
}

impl PendingUpdates {
    pub fn buffers_mut(&mut self, kind: BufferKind) -> &mut NamedQueue<PendingBuffer> {
        match kind {
            BufferKind::Uniform => &mut self.uniform_buffers,
            BufferKind::Storage => &mut self.storage_buffers,
        }
    }

    pub fn buffers(&self, kind: BufferKind) -> &NamedQueue<PendingBuffer> {
        match kind {
            BufferKind::Uniform => &self.uniform_buffers,
            BufferKind::Storage => &self.storage_buffers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.uniforms.is_empty()
            && self.textures.is_empty()
            && self.uniform_buffers.is_empty()
            && self.storage_buffers.is_empty()
    }

    pub fn clear(&mut self) {
        self.uniforms.clear();
        self.textures.clear();
        self.uniform_buffers.clear();
        self.storage_buffers.clear();
    }
}
