//! Shader memory monitoring
//!
//! Tracks estimated GPU memory per shader program, decides which programs
//! count as active, and suggests unload candidates when the total crosses a
//! threshold. Programs are registered and unregistered explicitly by id; the
//! monitor never owns or frees a shader itself.
//!
//! All methods take `&self` and the monitor is `Send + Sync`, so it can sit
//! in an `Arc` shared between the render thread and a resource loader.
//! Callbacks are invoked with no lock held and may call back into the monitor.

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use hashbrown::HashMap;

use crate::config::MemoryConfig;
use crate::context::ProgramId;

/// Size assumed for a program when detailed tracking is on and no real
/// figure has been reported yet
const ESTIMATED_PROGRAM_BYTES: usize = 2048;
const ESTIMATED_UNIFORM_BYTES: usize = 1024;
const ESTIMATED_TEXTURE_BYTES: usize = 512;

/// How many programs `memory_stats` lists as top consumers
const TOP_CONSUMERS: usize = 5;

/// Called with `(current_bytes, threshold_bytes)` when the threshold is exceeded
pub type ThresholdCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Called once per program suggested for unloading
pub type UnloadCallback = Arc<dyn Fn(ProgramId) + Send + Sync>;

/// Memory record for one program
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderMemoryInfo {
    pub name: String,
    pub program_size: usize,
    pub uniform_size: usize,
    pub texture_size: usize,
    pub total_memory: usize,
    pub last_accessed: Instant,
    pub access_count: u64,
    /// Accessed within the active window at the last optimization pass
    pub active: bool,
}

/// Aggregate memory statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderMemoryStats {
    pub total_shader_memory: usize,
    pub total_uniform_memory: usize,
    pub total_texture_memory: usize,
    /// Highest combined total ever observed
    pub peak_memory_usage: usize,
    pub active_shaders: usize,
    pub inactive_shaders: usize,
    /// Share of total memory held by inactive programs, 0.0 to 1.0
    pub memory_fragmentation: f32,
    /// Largest programs first
    pub top_memory_consumers: Vec<ProgramId>,
}

struct Tracking {
    shaders: HashMap<ProgramId, ShaderMemoryInfo>,
    config: MemoryConfig,
    last_optimization: Instant,
    last_report: Instant,
    on_threshold: Option<ThresholdCallback>,
    on_unload: Option<UnloadCallback>,
}

impl Tracking {
    fn total_memory(&self) -> usize {
        self.shaders.values().map(|info| info.total_memory).sum()
    }

    /// Programs ordered by ascending priority, ties broken by id
    fn by_priority(&self, now: Instant) -> Vec<ProgramId> {
        let mut ranked: Vec<(u64, ProgramId)> = self
            .shaders
            .iter()
            .map(|(&program, info)| (priority(info, now), program))
            .collect();
        ranked.sort_unstable();
        ranked.into_iter().map(|(_, program)| program).collect()
    }
}

/// Access count, decayed by whole minutes since the last access
fn priority(info: &ShaderMemoryInfo, now: Instant) -> u64 {
    let idle_secs = now.saturating_duration_since(info.last_accessed).as_secs();
    if idle_secs == 0 {
        return info.access_count;
    }
    info.access_count / (idle_secs / 60 + 1)
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| {
        tracing::warn!(lock = what, "Shader memory monitor mutex poisoned; continuing");
        e.into_inner()
    })
}

/// Thread-safe per-program memory tracker.
///
/// Lock order is tracking, then stats. Neither lock is held across a callback.
pub struct ShaderMemoryMonitor {
    tracking: Mutex<Tracking>,
    stats: Mutex<ShaderMemoryStats>,
}

impl std::fmt::Debug for ShaderMemoryMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tracking = lock(&self.tracking, "tracking");
        f.debug_struct("ShaderMemoryMonitor")
            .field("shaders", &tracking.shaders.len())
            .field("threshold_bytes", &tracking.config.threshold_bytes)
            .finish()
    }
}

impl ShaderMemoryMonitor {
    /// Create a monitor whose optimization and report timers start at `now`
    pub fn new(config: MemoryConfig, now: Instant) -> Self {
        tracing::info!(
            threshold_mb = config.threshold_bytes / (1024 * 1024),
            "Shader memory monitor initialized"
        );
        Self {
            tracking: Mutex::new(Tracking {
                shaders: HashMap::new(),
                config,
                last_optimization: now,
                last_report: now,
                on_threshold: None,
                on_unload: None,
            }),
            stats: Mutex::new(ShaderMemoryStats::default()),
        }
    }

    /// Start tracking `program`. Re-registering resets its record.
    pub fn register_shader(&self, program: ProgramId, name: impl Into<String>, now: Instant) {
        if program.is_none() {
            return;
        }
        let name = name.into();
        let mut tracking = lock(&self.tracking, "tracking");

        let (program_size, uniform_size, texture_size, total_memory) =
            if tracking.config.detailed_tracking {
                let total =
                    ESTIMATED_PROGRAM_BYTES + ESTIMATED_UNIFORM_BYTES + ESTIMATED_TEXTURE_BYTES;
                (total * 6 / 10, total * 3 / 10, total / 10, total)
            } else {
                (0, 0, 0, 0)
            };

        tracing::info!(
            program = program.0,
            shader = %name,
            estimated_kb = total_memory / 1024,
            "Registered shader for memory monitoring"
        );

        tracking.shaders.insert(
            program,
            ShaderMemoryInfo {
                name,
                program_size,
                uniform_size,
                texture_size,
                total_memory,
                last_accessed: now,
                access_count: 1,
                active: true,
            },
        );
    }

    pub fn unregister_shader(&self, program: ProgramId) -> Option<ShaderMemoryInfo> {
        let removed = lock(&self.tracking, "tracking").shaders.remove(&program);
        if let Some(info) = &removed {
            tracing::info!(program = program.0, shader = %info.name, "Unregistered shader from memory monitoring");
        }
        removed
    }

    /// Note a use of `program`. It becomes active immediately.
    pub fn record_access(&self, program: ProgramId, now: Instant) {
        let mut tracking = lock(&self.tracking, "tracking");
        if let Some(info) = tracking.shaders.get_mut(&program) {
            info.last_accessed = now;
            info.access_count += 1;
            info.active = true;
        }
    }

    /// Replace the estimate for `program` with measured sizes
    pub fn update_memory_usage(
        &self,
        program: ProgramId,
        program_size: usize,
        uniform_size: usize,
        texture_size: usize,
    ) {
        let mut tracking = lock(&self.tracking, "tracking");
        if let Some(info) = tracking.shaders.get_mut(&program) {
            info.program_size = program_size;
            info.uniform_size = uniform_size;
            info.texture_size = texture_size;
            info.total_memory = program_size + uniform_size + texture_size;
        }
    }

    /// Recompute active flags against the active window and refresh the stats
    pub fn optimize(&self, now: Instant) {
        let mut tracking = lock(&self.tracking, "tracking");
        let window = Duration::from_secs(tracking.config.active_window_secs);
        for info in tracking.shaders.values_mut() {
            info.active = now.saturating_duration_since(info.last_accessed) < window;
        }

        let total = tracking.total_memory();
        let mut stats = lock(&self.stats, "stats");
        refresh_stats(&tracking, &mut stats);

        tracing::info!(total_kb = total / 1024, "Shader memory optimization completed");
    }

    /// Programs idle for longer than `max_idle`, by id
    pub fn unused_shaders(&self, max_idle: Duration, now: Instant) -> Vec<ProgramId> {
        let tracking = lock(&self.tracking, "tracking");
        let mut unused: Vec<ProgramId> = tracking
            .shaders
            .iter()
            .filter(|(_, info)| now.saturating_duration_since(info.last_accessed) > max_idle)
            .map(|(&program, _)| program)
            .collect();
        unused.sort_unstable();
        unused
    }

    /// All programs, least valuable first.
    ///
    /// Priority is the access count divided by whole minutes idle plus one.
    pub fn low_priority_shaders(&self, now: Instant) -> Vec<ProgramId> {
        lock(&self.tracking, "tracking").by_priority(now)
    }

    /// Lowest-priority programs whose combined size reaches `target_bytes`.
    ///
    /// Returns every program if even all of them fall short.
    pub fn suggest_for_unload(&self, target_bytes: usize, now: Instant) -> Vec<ProgramId> {
        let tracking = lock(&self.tracking, "tracking");
        let mut suggestions = Vec::new();
        let mut freed = 0usize;
        for program in tracking.by_priority(now) {
            let Some(info) = tracking.shaders.get(&program) else {
                continue;
            };
            suggestions.push(program);
            freed += info.total_memory;
            if freed >= target_bytes {
                break;
            }
        }
        suggestions
    }

    /// Current aggregate statistics
    pub fn memory_stats(&self) -> ShaderMemoryStats {
        let tracking = lock(&self.tracking, "tracking");
        let mut stats = lock(&self.stats, "stats");
        refresh_stats(&tracking, &mut stats);
        stats.clone()
    }

    pub fn shader_info(&self, program: ProgramId) -> Option<ShaderMemoryInfo> {
        lock(&self.tracking, "tracking").shaders.get(&program).cloned()
    }

    pub fn total_memory_usage(&self) -> usize {
        lock(&self.tracking, "tracking").total_memory()
    }

    /// Bytes tracked for `program`, 0 if unknown
    pub fn shader_memory_usage(&self, program: ProgramId) -> usize {
        lock(&self.tracking, "tracking")
            .shaders
            .get(&program)
            .map_or(0, |info| info.total_memory)
    }

    pub fn tracked_shaders(&self) -> usize {
        lock(&self.tracking, "tracking").shaders.len()
    }

    pub fn memory_threshold(&self) -> usize {
        lock(&self.tracking, "tracking").config.threshold_bytes
    }

    pub fn set_memory_threshold(&self, bytes: usize) {
        lock(&self.tracking, "tracking").config.threshold_bytes = bytes;
        tracing::info!(threshold_mb = bytes / (1024 * 1024), "Shader memory threshold set");
    }

    pub fn set_threshold_callback(&self, callback: impl Fn(usize, usize) + Send + Sync + 'static) {
        lock(&self.tracking, "tracking").on_threshold = Some(Arc::new(callback));
    }

    pub fn set_unload_callback(&self, callback: impl Fn(ProgramId) + Send + Sync + 'static) {
        lock(&self.tracking, "tracking").on_unload = Some(Arc::new(callback));
    }

    pub fn set_auto_optimization(&self, enabled: bool) {
        lock(&self.tracking, "tracking").config.auto_optimize = enabled;
    }

    /// Only affects programs registered afterwards
    pub fn set_detailed_tracking(&self, enabled: bool) {
        lock(&self.tracking, "tracking").config.detailed_tracking = enabled;
    }

    /// Forget every program, both callbacks and the statistics
    pub fn clear(&self) {
        let mut tracking = lock(&self.tracking, "tracking");
        tracking.shaders.clear();
        tracking.on_threshold = None;
        tracking.on_unload = None;
        *lock(&self.stats, "stats") = ShaderMemoryStats::default();
        tracing::info!("Shader memory monitor cleared");
    }

    /// Periodic tick.
    ///
    /// Runs optimization and the memory report when their intervals have
    /// elapsed, then checks the threshold.
    pub fn update(&self, now: Instant) {
        let (optimize, report) = {
            let mut tracking = lock(&self.tracking, "tracking");
            let config = &tracking.config;
            let optimize = config.auto_optimize
                && now.saturating_duration_since(tracking.last_optimization)
                    >= Duration::from_secs(config.optimization_interval_secs);
            let report = now.saturating_duration_since(tracking.last_report)
                >= Duration::from_secs(config.report_interval_secs);
            if optimize {
                tracking.last_optimization = now;
            }
            if report {
                tracking.last_report = now;
            }
            (optimize, report)
        };

        if optimize {
            self.optimize(now);
        }
        if report {
            self.log_report();
        }
        self.check_threshold(now);
    }

    fn check_threshold(&self, now: Instant) {
        let (current, threshold, on_threshold, on_unload) = {
            let tracking = lock(&self.tracking, "tracking");
            (
                tracking.total_memory(),
                tracking.config.threshold_bytes,
                tracking.on_threshold.clone(),
                tracking.on_unload.clone(),
            )
        };

        if current <= threshold {
            return;
        }

        tracing::warn!(
            current_kb = current / 1024,
            threshold_kb = threshold / 1024,
            "Shader memory above threshold"
        );

        if let Some(callback) = on_threshold {
            callback(current, threshold);
        }

        if let Some(callback) = on_unload {
            // Aim for 80% of the threshold
            let target = current.saturating_sub(threshold - threshold / 5);
            for program in self.suggest_for_unload(target, now) {
                callback(program);
            }
        }
    }

    fn log_report(&self) {
        let tracking = lock(&self.tracking, "tracking");
        let active = tracking.shaders.values().filter(|info| info.active).count();
        tracing::info!(
            total_kb = tracking.total_memory() / 1024,
            active_shaders = active,
            inactive_shaders = tracking.shaders.len() - active,
            threshold_mb = tracking.config.threshold_bytes / (1024 * 1024),
            "Shader memory report"
        );
    }
}

fn refresh_stats(tracking: &Tracking, stats: &mut ShaderMemoryStats) {
    let peak = stats.peak_memory_usage;
    *stats = ShaderMemoryStats {
        peak_memory_usage: peak,
        ..Default::default()
    };

    let mut consumers: Vec<(usize, ProgramId)> = Vec::with_capacity(tracking.shaders.len());
    let mut total = 0usize;
    let mut inactive_memory = 0usize;
    for (&program, info) in &tracking.shaders {
        total += info.total_memory;
        stats.total_shader_memory += info.program_size;
        stats.total_uniform_memory += info.uniform_size;
        stats.total_texture_memory += info.texture_size;
        if info.active {
            stats.active_shaders += 1;
        } else {
            stats.inactive_shaders += 1;
            inactive_memory += info.total_memory;
        }
        consumers.push((info.total_memory, program));
    }

    consumers.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    stats.top_memory_consumers = consumers
        .into_iter()
        .take(TOP_CONSUMERS)
        .map(|(_, program)| program)
        .collect();

    stats.peak_memory_usage = stats.peak_memory_usage.max(total);
    if total > 0 {
        stats.memory_fragmentation = inactive_memory as f32 / total as f32;
    }
}
