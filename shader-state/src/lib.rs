//! Shader State - GPU state-change minimizer
//!
//! Tracks the uniform, texture and buffer bindings that have been submitted
//! to the graphics context and only forwards the ones that actually change.
//!
//! # Architecture
//!
//! **caller** → [`ShaderStateManager`] (diff + staging) → [`GraphicsContext`] (driver calls)
//!
//! - Queue calls are compared against the state cache; unchanged values are dropped
//! - Accepted changes are staged in per-kind pending queues and cached optimistically
//! - [`ShaderStateManager::flush_pending_updates`] replays the queues in FIFO order
//! - Texture units come from a fixed [`TextureSlots`] pool sized from the context
//!
//! The manager is single-threaded and owned by the renderer. The
//! [`ShaderMemoryMonitor`] is the only type here meant to be shared across threads.

pub mod config;
mod context;
mod error;
mod manager;
pub mod memory_monitor;
mod state;
#[cfg(test)]
pub mod test_utils;
mod texture_slots;
mod uniform;

pub use config::{Config, MemoryConfig, StateConfig};
pub use context::{
    BlockIndex, BufferId, BufferKind, GraphicsContext, ProgramId, ShaderResource, TextureHandle,
    TextureResource, TextureTarget, UniformLocation,
};
pub use error::ConfigError;
pub use manager::ShaderStateManager;
pub use memory_monitor::{ShaderMemoryInfo, ShaderMemoryMonitor, ShaderMemoryStats};
pub use state::{
    BufferBinding, FrameCounters, PendingBuffer, PerformanceStats, ShaderState, TextureBinding,
    UniformUpdate,
};
pub use texture_slots::TextureSlots;
pub use uniform::{UNIFORM_EPSILON, UniformKind, UniformValue};
