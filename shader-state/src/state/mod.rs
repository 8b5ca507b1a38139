//! State manager bookkeeping
//!
//! The cached snapshot of what the graphics context has been told, the
//! pending queues that feed the next flush, and the performance counters.

mod cache;
mod pending;
mod stats;

pub(crate) use cache::StateCache;
pub use pending::{PendingBuffer, UniformUpdate};
pub(crate) use pending::PendingUpdates;
pub(crate) use stats::FoldMarks;
pub use stats::{FrameCounters, PerformanceStats};

use hashbrown::HashMap;

use crate::context::{BufferId, BufferKind, ProgramId, TextureHandle, TextureTarget};
use crate::uniform::UniformValue;

/// A texture bound (or about to be bound) to a slot under a sampler name
#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub name: String,
    pub texture: TextureHandle,
    pub slot: u32,
    pub target: TextureTarget,
    /// Not yet sent to the context
    pub dirty: bool,
}

impl TextureBinding {
    /// Whether this binding already describes `texture` on `target`
    #[inline]
    pub fn matches(&self, texture: TextureHandle, target: TextureTarget) -> bool {
        self.texture == texture && self.target == target
    }
}

/// A buffer routed to an indexed binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferBinding {
    pub buffer: BufferId,
    pub binding: u32,
}

/// Snapshot of the state believed to be applied for one program.
///
/// Values are recorded when queued, before the flush that sends them.
/// Texture and buffer entries are this program's sampler and block routing;
/// what the shared units and binding points hold is tracked separately.
#[derive(Debug, Clone, Default)]
pub struct ShaderState {
    pub program: ProgramId,
    pub uniforms: HashMap<String, UniformValue>,
    pub textures: HashMap<String, TextureBinding>,
    pub uniform_buffers: HashMap<String, BufferBinding>,
    pub storage_buffers: HashMap<String, BufferBinding>,
}

impl ShaderState {
    pub(crate) fn buffers(&self, kind: BufferKind) -> &HashMap<String, BufferBinding> {
        match kind {
            BufferKind::Uniform => &self.uniform_buffers,
            BufferKind::Storage => &self.storage_buffers,
        }
    }

    pub(crate) fn buffers_mut(&mut self, kind: BufferKind) -> &mut HashMap<String, BufferBinding> {
        match kind {
            BufferKind::Uniform => &mut self.uniform_buffers,
            BufferKind::Storage => &mut self.storage_buffers,
        }
    }

    /// Fold `newer` into `self`, letting `newer` win on name clashes
    pub(crate) fn absorb(&mut self, newer: ShaderState) {
        self.uniforms.extend(newer.uniforms);
        self.textures.extend(newer.textures);
        self.uniform_buffers.extend(newer.uniform_buffers);
        self.storage_buffers.extend(newer.storage_buffers);
    }

    pub fn is_empty(&self) -> bool {
        self.uniforms.is_empty()
            && self.textures.is_empty()
            && self.uniform_buffers.is_empty()
            && self.storage_buffers.is_empty()
    }
}
