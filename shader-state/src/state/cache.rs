//! State cache
//!
//! Uniform values, sampler assignments and block routings belong to the
//! program object, so each program keeps its own snapshot. Switching away
//! parks the outgoing snapshot; switching back restores it.
//!
//! Texture units and indexed buffer binding points are context state shared
//! by every program. Those are tracked once, as last submitted.

use hashbrown::HashMap;

use super::{BufferBinding, ShaderState, TextureBinding};
use crate::context::{BufferId, BufferKind, ProgramId, TextureHandle, TextureTarget};
use crate::uniform::UniformValue;

#[derive(Debug, Default)]
pub(crate) struct StateCache {
    current: ShaderState,
    retained: HashMap<ProgramId, ShaderState>,
    /// Texture unit -> what the last flush bound there
    units: HashMap<u32, (TextureHandle, TextureTarget)>,
    /// Indexed binding point -> buffer the last flush attached
    binding_points: HashMap<(BufferKind, u32), BufferId>,
}

impl StateCache {
    #[inline]
    pub fn program(&self) -> ProgramId {
        self.current.program
    }

    #[inline]
    pub fn state(&self) -> &ShaderState {
        &self.current
    }

    /// Make `program` current.
    ///
    /// State recorded while no program was bound carries over into `program`.
    pub fn switch_program(&mut self, program: ProgramId) {
        let outgoing = std::mem::take(&mut self.current);
        let mut incoming = self.retained.remove(&program).unwrap_or_default();
        if outgoing.program.is_none() {
            incoming.absorb(outgoing);
        } else {
            self.retained.insert(outgoing.program, outgoing);
        }
        incoming.program = program;
        self.current = incoming;
    }

    /// Drop everything recorded for `program`.
    ///
    /// Returns `true` if it was the current program, which leaves no program bound.
    pub fn forget_program(&mut self, program: ProgramId) -> bool {
        self.retained.remove(&program);
        if !program.is_none() && self.current.program == program {
            self.current = ShaderState::default();
            return true;
        }
        false
    }

    /// Number of programs with a parked snapshot
    #[cfg(test)]
    pub fn retained_programs(&self) -> usize {
        self.retained.len()
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.current.uniforms.get(name)
    }

    /// Whether `value` is already what the current program holds for `name`
    pub fn uniform_matches(&self, name: &str, value: &UniformValue) -> bool {
        self.uniform(name).is_some_and(|cached| cached.approx_eq(value))
    }

    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.current.uniforms.insert(name.to_owned(), value);
    }

    pub fn texture(&self, name: &str) -> Option<&TextureBinding> {
        self.current.textures.get(name)
    }

    pub fn texture_matches(&self, name: &str, texture: TextureHandle, target: TextureTarget) -> bool {
        self.texture(name).is_some_and(|cached| cached.matches(texture, target))
    }

    pub fn set_texture(&mut self, binding: TextureBinding) {
        self.current.textures.insert(binding.name.clone(), binding);
    }

    pub fn mark_texture_clean(&mut self, name: &str) {
        if let Some(binding) = self.current.textures.get_mut(name) {
            binding.dirty = false;
        }
    }

    /// Forget `name`'s texture in every snapshot.
    ///
    /// Slots are global, so a released slot invalidates parked programs too.
    pub fn forget_texture(&mut self, name: &str) {
        self.current.textures.remove(name);
        for state in self.retained.values_mut() {
            state.textures.remove(name);
        }
    }

    pub fn clear_textures(&mut self) {
        self.current.textures.clear();
        for state in self.retained.values_mut() {
            state.textures.clear();
        }
    }

    pub fn buffer(&self, kind: BufferKind, name: &str) -> Option<&BufferBinding> {
        self.current.buffers(kind).get(name)
    }

    pub fn set_buffer(&mut self, kind: BufferKind, name: &str, binding: BufferBinding) {
        self.current.buffers_mut(kind).insert(name.to_owned(), binding);
    }

    #[inline]
    pub fn unit(&self, slot: u32) -> Option<(TextureHandle, TextureTarget)> {
        self.units.get(&slot).copied()
    }

    pub fn unit_holds(&self, slot: u32, texture: TextureHandle, target: TextureTarget) -> bool {
        self.unit(slot) == Some((texture, target))
    }

    pub fn set_unit(&mut self, slot: u32, texture: TextureHandle, target: TextureTarget) {
        self.units.insert(slot, (texture, target));
    }

    #[inline]
    pub fn binding_point(&self, kind: BufferKind, binding: u32) -> Option<BufferId> {
        self.binding_points.get(&(kind, binding)).copied()
    }

    pub fn set_binding_point(&mut self, kind: BufferKind, binding: u32, buffer: BufferId) {
        self.binding_points.insert((kind, binding), buffer);
    }

    pub fn clear(&mut self) {
        self.current = ShaderState::default();
        self.retained.clear();
        self.units.clear();
        self.binding_points.clear();
    }
}
