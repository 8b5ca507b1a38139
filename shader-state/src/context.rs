//! Graphics context seam
//!
//! The manager never talks to a driver directly. Everything it needs from the
//! graphics API goes through [`GraphicsContext`], plus the two resource traits
//! that describe shaders and textures handed in by the renderer.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// Linked shader program identifier. `0` means "no program".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

impl ProgramId {
    /// No program bound
    pub const NONE: ProgramId = ProgramId(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Handle to a texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    /// Null texture (binding it unbinds the unit)
    pub const NULL: TextureHandle = TextureHandle(0);
}

/// Handle to a buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferId(pub u32);

/// Resolved uniform location within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Resolved uniform/storage block index within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockIndex(pub u32);

/// Texture target kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum TextureTarget {
    /// 2D texture (default)
    #[default]
    Texture2D = 0x0DE1,
    /// 3D texture
    Texture3D = 0x806F,
    /// Cube map
    CubeMap = 0x8513,
    /// 2D texture array
    Texture2DArray = 0x8C1A,
    /// Cube map array
    CubeMapArray = 0x9009,
}

impl TextureTarget {
    /// Map a raw GL target enum, falling back to 2D for unknown values.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0x0DE1 => TextureTarget::Texture2D,
            0x806F => TextureTarget::Texture3D,
            0x8513 => TextureTarget::CubeMap,
            0x8C1A => TextureTarget::Texture2DArray,
            0x9009 => TextureTarget::CubeMapArray,
            _ => TextureTarget::Texture2D,
        }
    }

    /// Raw GL target enum
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Which indexed buffer binding a block refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Uniform buffer object (uniform block)
    Uniform,
    /// Shader storage buffer object (storage block)
    Storage,
}

/// Driver-facing operations used by the state manager.
///
/// Calls are synchronous and fail silently at the driver level, the same way
/// GL does; errors are observed through the driver's own error query, never
/// through these methods.
pub trait GraphicsContext {
    /// Number of texture image units, `None` if the query is unavailable
    fn max_texture_units(&self) -> Option<u32>;

    /// Program the driver currently has bound
    fn current_program(&self) -> ProgramId;

    /// Bind a program for subsequent uniform and draw calls
    fn use_program(&mut self, program: ProgramId);

    /// Look up a uniform location, `None` if the program has no such uniform
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32);
    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32);
    fn set_uniform_vec2(&mut self, location: UniformLocation, value: Vec2);
    fn set_uniform_vec3(&mut self, location: UniformLocation, value: Vec3);
    fn set_uniform_vec4(&mut self, location: UniformLocation, value: Vec4);
    fn set_uniform_mat3(&mut self, location: UniformLocation, value: &Mat3);
    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4);
    fn set_uniform_f32_array(&mut self, location: UniformLocation, values: &[f32]);
    fn set_uniform_i32_array(&mut self, location: UniformLocation, values: &[i32]);
    fn set_uniform_vec3_array(&mut self, location: UniformLocation, values: &[Vec3]);
    fn set_uniform_vec4_array(&mut self, location: UniformLocation, values: &[Vec4]);
    fn set_uniform_mat4_array(&mut self, location: UniformLocation, values: &[Mat4]);

    /// Select the active texture unit
    fn active_texture(&mut self, slot: u32);

    /// Bind a texture to the active unit
    fn bind_texture(&mut self, target: TextureTarget, texture: TextureHandle);

    /// Look up a uniform or storage block, `None` if the program does not declare it
    fn block_index(&self, program: ProgramId, kind: BufferKind, name: &str) -> Option<BlockIndex>;

    /// Bind a buffer to an indexed binding point
    fn bind_buffer_base(&mut self, kind: BufferKind, binding: u32, buffer: BufferId);

    /// Route a program's block to a binding point
    fn bind_block(&mut self, program: ProgramId, kind: BufferKind, block: BlockIndex, binding: u32);
}

/// A shader program as seen by the state manager.
///
/// Two shaders are the same state iff their program ids match.
pub trait ShaderResource {
    fn program_id(&self) -> ProgramId;

    /// Whether the program linked and is still alive
    fn is_valid(&self) -> bool {
        !self.program_id().is_none()
    }
}

/// A texture as seen by the state manager.
pub trait TextureResource {
    fn texture_handle(&self) -> TextureHandle;

    fn target(&self) -> TextureTarget {
        TextureTarget::Texture2D
    }

    fn is_valid(&self) -> bool {
        self.texture_handle() != TextureHandle::NULL
    }
}

impl ShaderResource for ProgramId {
    fn program_id(&self) -> ProgramId {
        *self
    }
}
