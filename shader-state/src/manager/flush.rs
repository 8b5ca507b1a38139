//! Flush and frame lifecycle
//!
//! A flush drains the four queues in a fixed order: uniforms, textures,
//! uniform buffers, storage buffers. Entries that cannot be resolved
//! against the active program are dropped, never retried.

use super::ShaderStateManager;
use crate::context::{BufferKind, GraphicsContext};
use crate::state::{BufferBinding, FrameCounters};

impl ShaderStateManager {
    /// Start a frame: per-frame counters go back to zero
    pub fn begin_frame(&mut self) {
        self.frame = FrameCounters::default();
        self.marks = Default::default();
        self.frame_active = true;
    }

    /// Flush, then fold the frame into the cumulative stats
    pub fn end_frame<G: GraphicsContext + ?Sized>(&mut self, ctx: &mut G) {
        self.flush_pending_updates(ctx);
        self.marks.fold(&self.frame, &mut self.stats);
        self.frame_active = false;

        if self.log_state_changes {
            tracing::debug!(
                state_changes = self.frame.state_changes,
                batched_uniforms = self.frame.batched_uniforms,
                texture_slots = self.frame.texture_slot_allocations,
                "Frame complete"
            );
        }
    }

    #[inline]
    pub fn is_frame_active(&self) -> bool {
        self.frame_active
    }

    /// Send every pending update to the context.
    ///
    /// Without an active program nothing is sent and the queues are kept.
    pub fn flush_pending_updates<G: GraphicsContext + ?Sized>(&mut self, ctx: &mut G) {
        if self.cache.program().is_none() {
            if self.log_state_changes && self.has_pending_updates() {
                tracing::debug!("No active shader, deferring pending updates");
            }
            return;
        }

        self.flush_uniforms(ctx);
        self.flush_textures(ctx);
        self.flush_buffers(ctx, BufferKind::Uniform);
        self.flush_buffers(ctx, BufferKind::Storage);
    }

    fn flush_uniforms<G: GraphicsContext + ?Sized>(&mut self, ctx: &mut G) {
        let updates = self.pending.uniforms.take();
        if updates.is_empty() {
            return;
        }

        let mut applied = 0u32;
        for update in updates {
            let location = match update.location {
                Some(location) => Some(location),
                None => self.resolve_location(&*ctx, &update.name),
            };
            let Some(location) = location else {
                if self.log_state_changes {
                    tracing::debug!(uniform = %update.name, "Uniform not found in program, skipped");
                }
                continue;
            };
            if update.value.apply(ctx, location) {
                applied += 1;
            }
        }

        self.frame.batched_uniforms += applied;
        self.frame.state_changes += applied;
        self.stats.batched_uniforms += u64::from(applied);

        if self.log_state_changes {
            tracing::debug!(count = applied, "Flushed uniform updates");
        }
    }

    fn flush_textures<G: GraphicsContext + ?Sized>(&mut self, ctx: &mut G) {
        let bindings = self.pending.textures.take();
        if bindings.is_empty() {
            return;
        }

        let capacity = self.slots.capacity();
        let mut bound = 0u32;
        for binding in bindings {
            if binding.slot >= capacity {
                tracing::warn!(
                    sampler = %binding.name,
                    slot = binding.slot,
                    capacity,
                    "Texture slot out of range, binding skipped"
                );
                continue;
            }

            // Unit already holds it from another program: only the sampler changes
            if !self.cache.unit_holds(binding.slot, binding.texture, binding.target) {
                ctx.active_texture(binding.slot);
                ctx.bind_texture(binding.target, binding.texture);
                self.cache.set_unit(binding.slot, binding.texture, binding.target);
            }
            if let Some(location) = self.resolve_location(&*ctx, &binding.name) {
                ctx.set_uniform_i32(location, binding.slot as i32);
            }
            self.cache.mark_texture_clean(&binding.name);
            bound += 1;
        }

        self.frame.state_changes += bound;

        if self.log_state_changes {
            tracing::debug!(count = bound, "Flushed texture bindings");
        }
    }

    fn flush_buffers<G: GraphicsContext + ?Sized>(&mut self, ctx: &mut G, kind: BufferKind) {
        let buffers = self.pending.buffers_mut(kind).take();
        if buffers.is_empty() {
            return;
        }

        let program = self.cache.program();
        let mut bound = 0u32;
        for pending in buffers {
            let Some(block) = ctx.block_index(program, kind, &pending.name) else {
                if self.log_state_changes {
                    tracing::debug!(block = %pending.name, ?kind, "Block not found in program, skipped");
                }
                continue;
            };
            let BufferBinding { buffer, binding } = pending.binding;
            if self.cache.binding_point(kind, binding) != Some(buffer) {
                ctx.bind_buffer_base(kind, binding, buffer);
                self.cache.set_binding_point(kind, binding, buffer);
            }
            ctx.bind_block(program, kind, block, binding);
            bound += 1;
        }

        self.frame.state_changes += bound;

        if self.log_state_changes {
            tracing::debug!(count = bound, ?kind, "Flushed buffer bindings");
        }
    }
}
