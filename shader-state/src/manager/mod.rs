//! Shader state manager
//!
//! Owns the state cache, the pending queues, the texture slot pool and the
//! counters. The graphics context is passed into each call that needs it,
//! so the manager never holds a borrow of the renderer.

mod flush;
mod queue;


use hashbrown::HashMap;

use crate::config::StateConfig;
use crate::context::{
    BufferId, BufferKind, GraphicsContext, ProgramId, ShaderResource, TextureHandle, TextureTarget,
    UniformLocation,
};
use crate::state::{
    BufferBinding, FoldMarks, FrameCounters, PendingUpdates, PerformanceStats, ShaderState,
    StateCache, TextureBinding, UniformUpdate,
};
use crate::texture_slots::TextureSlots;
use crate::uniform::UniformValue;

/// Deduplicating, batching front end for shader state changes.
///
/// Single-threaded: owned by the render loop, not shared.
#[derive(Debug)]
pub struct ShaderStateManager {
    config: StateConfig,
    initialized: bool,
    log_state_changes: bool,

    cache: StateCache,
    pending: PendingUpdates,
    slots: TextureSlots,
    /// Uniform locations for the active program, `None` entries are known misses
    locations: HashMap<String, Option<UniformLocation>>,
    /// Explicit program registry, keyed by id
    registry: HashMap<ProgramId, String>,

    frame: FrameCounters,
    stats: PerformanceStats,
    marks: FoldMarks,
    frame_active: bool,
}

impl ShaderStateManager {
    pub fn new(config: StateConfig) -> Self {
        Self {
            log_state_changes: config.log_state_changes,
            slots: TextureSlots::new(config.fallback_texture_slots),
            config,
            initialized: false,
            cache: StateCache::default(),
            pending: PendingUpdates::default(),
            locations: HashMap::new(),
            registry: HashMap::new(),
            frame: FrameCounters::default(),
            stats: PerformanceStats::default(),
            marks: FoldMarks::default(),
            frame_active: false,
        }
    }

    /// Size the texture slot pool from the context. Calling it again is a no-op.
    pub fn initialize<G: GraphicsContext + ?Sized>(&mut self, ctx: &G) {
        if self.initialized {
            return;
        }

        let capacity = match ctx.max_texture_units().filter(|&units| units > 0) {
            Some(units) => units,
            None => {
                tracing::warn!(
                    fallback = self.config.fallback_texture_slots,
                    "Context did not report texture units, using fallback slot count"
                );
                self.config.fallback_texture_slots
            }
        };
        self.slots.resize(capacity);
        self.initialized = true;

        tracing::info!(texture_slots = capacity, "Shader state manager initialized");
    }

    /// Drop all cached state, queues and slot allocations. Idempotent.
    pub fn shutdown(&mut self) {
        let was_initialized = self.initialized;

        self.pending.clear();
        self.cache.clear();
        self.slots.reset();
        self.locations.clear();
        self.registry.clear();
        self.frame_active = false;
        self.initialized = false;

        if was_initialized {
            tracing::info!("Shader state manager shut down");
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ------------------------------------------------------------------
    // Program activation
    // ------------------------------------------------------------------

    /// Make `shader` the active program.
    ///
    /// Invalid shaders are ignored. Activating the program that is already
    /// active is counted as an avoided change and issues nothing.
    pub fn set_active_shader<G, S>(&mut self, ctx: &mut G, shader: &S)
    where
        G: GraphicsContext + ?Sized,
        S: ShaderResource + ?Sized,
    {
        if !shader.is_valid() {
            if self.log_state_changes {
                tracing::debug!(
                    program = shader.program_id().0,
                    "Ignoring invalid shader activation"
                );
            }
            return;
        }
        self.activate(ctx, shader.program_id());
    }

    /// Activate a program by raw id. Id 0 is ignored.
    pub fn set_active_shader_by_id<G: GraphicsContext + ?Sized>(
        &mut self,
        ctx: &mut G,
        program: ProgramId,
    ) {
        self.activate(ctx, program);
    }

    /// Activate a registered program by name. Lowest id wins if names repeat.
    ///
    /// Returns `false` if no program is registered under `name`.
    pub fn set_active_shader_by_name<G: GraphicsContext + ?Sized>(
        &mut self,
        ctx: &mut G,
        name: &str,
    ) -> bool {
        let Some(program) = self.program_by_name(name) else {
            tracing::debug!(shader = name, "No registered shader with this name");
            return false;
        };
        self.activate(ctx, program);
        true
    }

    fn activate<G: GraphicsContext + ?Sized>(&mut self, ctx: &mut G, program: ProgramId) {
        if program.is_none() {
            return;
        }

        if program == self.cache.program() {
            self.stats.avoided_state_changes += 1;
            return;
        }

        // Outgoing program's updates go out before the switch
        self.flush_pending_updates(ctx);

        let previous = self.cache.program();
        ctx.use_program(program);
        self.cache.switch_program(program);
        self.locations.clear();
        self.frame.state_changes += 1;

        if self.log_state_changes {
            tracing::debug!(from = previous.0, to = program.0, "Switched shader program");
        }
    }

    #[inline]
    pub fn active_program(&self) -> ProgramId {
        self.cache.program()
    }

    pub fn is_shader_active(&self, program: ProgramId) -> bool {
        !program.is_none() && self.cache.program() == program
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Register a program under a name so it can be activated by name.
    ///
    /// Re-registering an id replaces its name. Id 0 is ignored.
    pub fn register_shader(&mut self, program: ProgramId, name: impl Into<String>) {
        if program.is_none() {
            return;
        }
        let name = name.into();
        tracing::debug!(program = program.0, shader = %name, "Registered shader");
        self.registry.insert(program, name);
    }

    /// Forget a program.
    ///
    /// If it is the active program, no program is active afterwards and its
    /// pending updates are discarded.
    pub fn unregister_shader(&mut self, program: ProgramId) {
        self.registry.remove(&program);
        if self.cache.forget_program(program) {
            self.pending.clear();
            self.locations.clear();
            tracing::debug!(program = program.0, "Unregistered the active shader");
        }
    }

    pub fn registered_shader_name(&self, program: ProgramId) -> Option<&str> {
        self.registry.get(&program).map(String::as_str)
    }

    fn program_by_name(&self, name: &str) -> Option<ProgramId> {
        self.registry
            .iter()
            .filter(|(_, registered)| registered.as_str() == name)
            .map(|(&program, _)| program)
            .min()
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Check that the context still has the cached program bound.
    ///
    /// Something outside the manager switching programs shows up here.
    pub fn validate_state<G: GraphicsContext + ?Sized>(&self, ctx: &G) -> bool {
        let bound = ctx.current_program();
        let cached = self.cache.program();
        if bound != cached {
            tracing::warn!(
                bound = bound.0,
                cached = cached.0,
                "Shader state mismatch: context program differs from cache"
            );
            return false;
        }
        true
    }

    pub fn set_log_state_changes(&mut self, enabled: bool) {
        self.log_state_changes = enabled;
    }

    #[inline]
    pub fn log_state_changes(&self) -> bool {
        self.log_state_changes
    }

    /// State changes issued so far this frame
    #[inline]
    pub fn state_change_count(&self) -> u32 {
        self.frame.state_changes
    }

    pub fn reset_state_change_count(&mut self) {
        self.frame.state_changes = 0;
        self.marks.state_changes = 0;
    }

    #[inline]
    pub fn performance_stats(&self) -> &PerformanceStats {
        &self.stats
    }

    pub fn reset_performance_stats(&mut self) {
        self.stats = PerformanceStats::default();
    }

    #[inline]
    pub fn frame_counters(&self) -> &FrameCounters {
        &self.frame
    }

    // ------------------------------------------------------------------
    // Cache and queue inspection
    // ------------------------------------------------------------------

    /// Cached snapshot for the active program
    pub fn current_state(&self) -> &ShaderState {
        self.cache.state()
    }

    pub fn cached_uniform(&self, name: &str) -> Option<&UniformValue> {
        self.cache.uniform(name)
    }

    pub fn cached_texture(&self, name: &str) -> Option<&TextureBinding> {
        self.cache.texture(name)
    }

    pub fn cached_buffer(&self, kind: BufferKind, name: &str) -> Option<&BufferBinding> {
        self.cache.buffer(kind, name)
    }

    /// Texture and target last bound to unit `slot`, whichever program bound it
    pub fn bound_texture(&self, slot: u32) -> Option<(TextureHandle, TextureTarget)> {
        self.cache.unit(slot)
    }

    /// Buffer last attached to the indexed binding point
    pub fn bound_buffer(&self, kind: BufferKind, binding: u32) -> Option<BufferId> {
        self.cache.binding_point(kind, binding)
    }

    pub fn texture_slot(&self, name: &str) -> Option<u32> {
        self.slots.slot(name)
    }

    pub fn texture_slots(&self) -> &TextureSlots {
        &self.slots
    }

    pub fn pending_uniform_count(&self) -> usize {
        self.pending.uniforms.len()
    }

    pub fn pending_texture_count(&self) -> usize {
        self.pending.textures.len()
    }

    pub fn pending_buffer_count(&self, kind: BufferKind) -> usize {
        self.pending.buffers(kind).len()
    }

    /// Queued uniform updates in send order
    pub fn pending_uniforms(&self) -> impl Iterator<Item = &UniformUpdate> {
        self.pending.uniforms.iter()
    }

    pub fn pending_uniform(&self, name: &str) -> Option<&UniformUpdate> {
        self.pending.uniforms.get(name)
    }

    pub fn has_pending_updates(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Location for `name` in the active program, queried once per program.
    ///
    /// Without an active program nothing is resolved or cached.
    fn resolve_location<G: GraphicsContext + ?Sized>(
        &mut self,
        ctx: &G,
        name: &str,
    ) -> Option<UniformLocation> {
        let program = self.cache.program();
        if program.is_none() {
            return None;
        }
        if let Some(&cached) = self.locations.get(name) {
            return cached;
        }
        let location = ctx.uniform_location(program, name);
        self.locations.insert(name.to_owned(), location);
        location
    }
}

impl Default for ShaderStateManager {
    fn default() -> Self {
        Self::new(StateConfig::default())
    }
}
