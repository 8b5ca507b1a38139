//! Shared test utilities for unit tests

use std::cell::Cell;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use hashbrown::HashMap;

use crate::context::{
    BlockIndex, BufferId, BufferKind, GraphicsContext, ProgramId, ShaderResource, TextureHandle,
    TextureResource, TextureTarget, UniformLocation,
};
use crate::uniform::UniformValue;

// ============================================================================
// Recording Graphics Context
// ============================================================================

/// One driver call observed by [`RecordingContext`]
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    UseProgram(ProgramId),
    Uniform(UniformLocation, UniformValue),
    ActiveTexture(u32),
    BindTexture(TextureTarget, TextureHandle),
    BindBufferBase {
        kind: BufferKind,
        binding: u32,
        buffer: BufferId,
    },
    BindBlock {
        program: ProgramId,
        kind: BufferKind,
        block: BlockIndex,
        binding: u32,
    },
}

/// Graphics double that records every state-changing call.
///
/// Uniform and block lookups resolve by name only, for any program; names
/// that were never declared resolve to `None`.
pub struct RecordingContext {
    pub calls: Vec<GlCall>,
    pub max_texture_units: Option<u32>,
    pub current_program: ProgramId,
    uniforms: HashMap<String, i32>,
    blocks: HashMap<String, u32>,
    location_queries: Cell<u32>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            max_texture_units: Some(16),
            current_program: ProgramId::NONE,
            uniforms: HashMap::new(),
            blocks: HashMap::new(),
            location_queries: Cell::new(0),
        }
    }

    /// Declare uniforms; locations are assigned in order starting at 0
    pub fn with_uniforms(mut self, names: &[&str]) -> Self {
        for name in names {
            let next = self.uniforms.len() as i32;
            self.uniforms.entry((*name).to_string()).or_insert(next);
        }
        self
    }

    /// Declare uniform/storage blocks; indices are assigned in order starting at 0
    pub fn with_blocks(mut self, names: &[&str]) -> Self {
        for name in names {
            let next = self.blocks.len() as u32;
            self.blocks.entry((*name).to_string()).or_insert(next);
        }
        self
    }

    pub fn with_max_texture_units(mut self, units: Option<u32>) -> Self {
        self.max_texture_units = units;
        self
    }

    pub fn location_of(&self, name: &str) -> UniformLocation {
        UniformLocation(self.uniforms[name])
    }

    pub fn block_of(&self, name: &str) -> BlockIndex {
        BlockIndex(self.blocks[name])
    }

    /// How many times `uniform_location` was called
    pub fn location_queries(&self) -> u32 {
        self.location_queries.get()
    }

    /// Uniform calls only, in order
    pub fn uniform_calls(&self) -> Vec<(UniformLocation, UniformValue)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                GlCall::Uniform(loc, value) => Some((*loc, value.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of `use_program` calls
    pub fn program_switches(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, GlCall::UseProgram(_)))
            .count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsContext for RecordingContext {
    fn max_texture_units(&self) -> Option<u32> {
        self.max_texture_units
    }

    fn current_program(&self) -> ProgramId {
        self.current_program
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current_program = program;
        self.calls.push(GlCall::UseProgram(program));
    }

    fn uniform_location(&self, _program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.location_queries.set(self.location_queries.get() + 1);
        self.uniforms.get(name).map(|&loc| UniformLocation(loc))
    }

    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32) {
        self.calls.push(GlCall::Uniform(location, UniformValue::Int(value)));
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.calls.push(GlCall::Uniform(location, UniformValue::Float(value)));
    }

    fn set_uniform_vec2(&mut self, location: UniformLocation, value: Vec2) {
        self.calls.push(GlCall::Uniform(location, UniformValue::Vec2(value)));
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: Vec3) {
        self.calls.push(GlCall::Uniform(location, UniformValue::Vec3(value)));
    }

    fn set_uniform_vec4(&mut self, location: UniformLocation, value: Vec4) {
        self.calls.push(GlCall::Uniform(location, UniformValue::Vec4(value)));
    }

    fn set_uniform_mat3(&mut self, location: UniformLocation, value: &Mat3) {
        self.calls.push(GlCall::Uniform(location, UniformValue::Mat3(*value)));
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        self.calls.push(GlCall::Uniform(location, UniformValue::Mat4(*value)));
    }

    fn set_uniform_f32_array(&mut self, location: UniformLocation, values: &[f32]) {
        self.calls.push(GlCall::Uniform(location, values.into()));
    }

    fn set_uniform_i32_array(&mut self, location: UniformLocation, values: &[i32]) {
        self.calls.push(GlCall::Uniform(location, values.into()));
    }

    fn set_uniform_vec3_array(&mut self, location: UniformLocation, values: &[Vec3]) {
        self.calls.push(GlCall::Uniform(location, values.into()));
    }

    fn set_uniform_vec4_array(&mut self, location: UniformLocation, values: &[Vec4]) {
        self.calls.push(GlCall::Uniform(location, values.into()));
    }

    fn set_uniform_mat4_array(&mut self, location: UniformLocation, values: &[Mat4]) {
        self.calls.push(GlCall::Uniform(location, values.into()));
    }

    fn active_texture(&mut self, slot: u32) {
        self.calls.push(GlCall::ActiveTexture(slot));
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: TextureHandle) {
        self.calls.push(GlCall::BindTexture(target, texture));
    }

    fn block_index(&self, _program: ProgramId, _kind: BufferKind, name: &str) -> Option<BlockIndex> {
        self.blocks.get(name).map(|&index| BlockIndex(index))
    }

    fn bind_buffer_base(&mut self, kind: BufferKind, binding: u32, buffer: BufferId) {
        self.calls.push(GlCall::BindBufferBase {
            kind,
            binding,
            buffer,
        });
    }

    fn bind_block(&mut self, program: ProgramId, kind: BufferKind, block: BlockIndex, binding: u32) {
        self.calls.push(GlCall::BindBlock {
            program,
            kind,
            block,
            binding,
        });
    }
}

// ============================================================================
// Test Resources
// ============================================================================

/// Shader double with an explicit validity flag
#[derive(Debug, Clone, Copy)]
pub struct TestShader {
    pub program: ProgramId,
    pub valid: bool,
}

impl TestShader {
    pub fn new(program: u32) -> Self {
        Self {
            program: ProgramId(program),
            valid: true,
        }
    }

    /// A shader whose link failed but still carries an id
    pub fn broken(program: u32) -> Self {
        Self {
            program: ProgramId(program),
            valid: false,
        }
    }
}

impl ShaderResource for TestShader {
    fn program_id(&self) -> ProgramId {
        self.program
    }

    fn is_valid(&self) -> bool {
        self.valid && !self.program.is_none()
    }
}

/// Texture double
#[derive(Debug, Clone, Copy)]
pub struct TestTexture {
    pub handle: TextureHandle,
    pub target: TextureTarget,
}

impl TestTexture {
    pub fn new(handle: u32) -> Self {
        Self {
            handle: TextureHandle(handle),
            target: TextureTarget::Texture2D,
        }
    }

    pub fn cube(handle: u32) -> Self {
        Self {
            handle: TextureHandle(handle),
            target: TextureTarget::CubeMap,
        }
    }
}

impl TextureResource for TestTexture {
    fn texture_handle(&self) -> TextureHandle {
        self.handle
    }

    fn target(&self) -> TextureTarget {
        self.target
    }
}
