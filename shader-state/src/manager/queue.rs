//! Queue entry points
//!
//! Every queue call diffs against the cache first. Accepted changes are
//! staged for the next flush and written to the program's snapshot straight
//! away. Texture units and buffer binding points are diffed against what
//! the last flush actually submitted, whichever program it was for.

use super::ShaderStateManager;
use crate::context::{BufferId, BufferKind, GraphicsContext, TextureHandle, TextureResource, TextureTarget};
use crate::state::{BufferBinding, PendingBuffer, TextureBinding, UniformUpdate};
use crate::uniform::UniformValue;

impl ShaderStateManager {
    /// Stage a uniform value.
    ///
    /// Dropped if the active program already holds an equal value. A name
    /// that is already pending keeps its queue position and takes the new value.
    pub fn queue_uniform_update<G: GraphicsContext + ?Sized>(
        &mut self,
        ctx: &G,
        name: &str,
        value: impl Into<UniformValue>,
    ) {
        let value = value.into();

        if self.cache.uniform_matches(name, &value) {
            self.stats.avoided_state_changes += 1;
            if self.log_state_changes {
                tracing::debug!(uniform = name, "Uniform unchanged, skipping");
            }
            return;
        }

        let location = self.resolve_location(ctx, name);
        if self.log_state_changes {
            tracing::debug!(
                uniform = name,
                kind = ?value.kind(),
                resolved = location.is_some(),
                "Queued uniform update"
            );
        }

        self.cache.set_uniform(name, value.clone());
        self.pending.uniforms.push(UniformUpdate {
            name: name.to_owned(),
            value,
            location,
        });
    }

    /// Stage a texture for the sampler `name`.
    ///
    /// The sampler keeps its slot across rebinds. When the pool is exhausted
    /// the binding is neither staged nor cached.
    pub fn queue_texture_binding(&mut self, name: &str, texture: TextureHandle, target: TextureTarget) {
        if self.texture_is_current(name, texture, target) {
            self.stats.avoided_state_changes += 1;
            if self.log_state_changes {
                tracing::debug!(sampler = name, texture = texture.0, "Texture unchanged, skipping");
            }
            return;
        }

        let Some(slot) = self.allocate_texture_slot(name) else {
            tracing::warn!(
                sampler = name,
                capacity = self.slots.capacity(),
                "No texture slot available, binding dropped"
            );
            return;
        };

        if self.log_state_changes {
            tracing::debug!(sampler = name, texture = texture.0, slot, "Queued texture binding");
        }

        let binding = TextureBinding {
            name: name.to_owned(),
            texture,
            slot,
            target,
            dirty: true,
        };
        self.cache.set_texture(binding.clone());
        self.pending.textures.push(binding);
    }

    /// Stage `texture` for the sampler `name`. Invalid textures are ignored.
    pub fn queue_texture<T: TextureResource + ?Sized>(&mut self, name: &str, texture: &T) {
        if !texture.is_valid() {
            return;
        }
        self.queue_texture_binding(name, texture.texture_handle(), texture.target());
    }

    /// Stage a uniform buffer for the block `name` at `binding`
    pub fn queue_uniform_buffer_binding(&mut self, name: &str, buffer: BufferId, binding: u32) {
        self.queue_buffer_binding(BufferKind::Uniform, name, buffer, binding);
    }

    /// Stage a storage buffer for the block `name` at `binding`
    pub fn queue_storage_buffer_binding(&mut self, name: &str, buffer: BufferId, binding: u32) {
        self.queue_buffer_binding(BufferKind::Storage, name, buffer, binding);
    }

    fn queue_buffer_binding(&mut self, kind: BufferKind, name: &str, buffer: BufferId, binding: u32) {
        let binding = BufferBinding { buffer, binding };

        if self.buffer_is_current(kind, name, binding) {
            self.stats.avoided_state_changes += 1;
            return;
        }

        if self.log_state_changes {
            tracing::debug!(
                block = name,
                ?kind,
                buffer = buffer.0,
                binding = binding.binding,
                "Queued buffer binding"
            );
        }

        self.cache.set_buffer(kind, name, binding);
        self.pending.buffers_mut(kind).push(PendingBuffer {
            name: name.to_owned(),
            binding,
        });
    }

    /// Whether binding `texture` for `name` would change nothing.
    ///
    /// A pending bind is what the next flush will send. Otherwise the active
    /// program must already point the sampler at the slot and the unit must
    /// still hold the texture, since another program may have rebound it.
    fn texture_is_current(&self, name: &str, texture: TextureHandle, target: TextureTarget) -> bool {
        if let Some(pending) = self.pending.textures.get(name) {
            return pending.matches(texture, target);
        }
        self.cache.texture_matches(name, texture, target)
            && self
                .slots
                .slot(name)
                .is_some_and(|slot| self.cache.unit_holds(slot, texture, target))
    }

    /// Same as [`Self::texture_is_current`] for block routing and binding points
    fn buffer_is_current(&self, kind: BufferKind, name: &str, binding: BufferBinding) -> bool {
        if let Some(pending) = self.pending.buffers(kind).get(name) {
            return pending.binding == binding;
        }
        self.cache.buffer(kind, name) == Some(&binding)
            && self.cache.binding_point(kind, binding.binding) == Some(binding.buffer)
    }

    // ------------------------------------------------------------------
    // Texture slots
    // ------------------------------------------------------------------

    /// Slot for `name`, allocating the lowest free one if it has none.
    ///
    /// `None` means the pool is exhausted.
    pub fn allocate_texture_slot(&mut self, name: &str) -> Option<u32> {
        if let Some(slot) = self.slots.slot(name) {
            return Some(slot);
        }
        let slot = self.slots.allocate(name)?;
        self.frame.texture_slot_allocations += 1;
        self.stats.texture_slot_optimizations += 1;
        Some(slot)
    }

    /// Lowest free slot without allocating it
    pub fn find_available_texture_slot(&self) -> Option<u32> {
        self.slots.find_available()
    }

    /// Free `name`'s slot.
    ///
    /// Its cached binding and any pending bind are dropped with it, so the
    /// next queue for `name` always goes through.
    pub fn release_texture_slot(&mut self, name: &str) -> Option<u32> {
        let slot = self.slots.release(name)?;
        self.cache.forget_texture(name);
        self.pending.textures.remove(name);
        if self.log_state_changes {
            tracing::debug!(sampler = name, slot, "Released texture slot");
        }
        Some(slot)
    }

    /// Free every slot and forget all texture bindings
    pub fn reset_texture_slots(&mut self) {
        self.slots.reset();
        self.cache.clear_textures();
        self.pending.textures.clear();
    }
}
