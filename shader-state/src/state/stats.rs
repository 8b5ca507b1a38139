//! Performance counters
//!
//! Frame counters are zeroed by `begin_frame`. Cumulative stats survive
//! frames and are only zeroed on request.

/// Cumulative performance statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceStats {
    /// State changes issued to the context, folded in at each frame end
    pub total_state_changes: u64,
    /// Queue or activate calls that were dropped because nothing changed
    pub avoided_state_changes: u64,
    /// Uniform updates sent by flushes
    pub batched_uniforms: u64,
    /// New texture slot allocations
    pub texture_slot_optimizations: u64,
    /// Smoothed uniforms-per-frame: `avg = (avg + frame) / 2`
    pub average_batch_size: f32,
}

impl PerformanceStats {
    /// Blend one frame's uniform batch into the running average.
    ///
    /// Frames that sent no uniforms leave the average alone.
    pub(crate) fn blend_batch(&mut self, frame_batched: u32) {
        if frame_batched > 0 {
            self.average_batch_size = (self.average_batch_size + frame_batched as f32) / 2.0;
        }
    }
}

/// Per-frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCounters {
    /// Program switches, uniform sends, texture and buffer binds this frame
    pub state_changes: u32,
    /// Uniform updates sent this frame
    pub batched_uniforms: u32,
    /// New texture slots allocated this frame
    pub texture_slot_allocations: u32,
}

/// Tracks how much of the frame counters has already reached the totals,
/// so a repeated `end_frame` never counts the same change twice
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FoldMarks {
    pub state_changes: u32,
    pub batched_uniforms: u32,
}

impl FoldMarks {
    /// Move the unfolded part of `frame` into `stats`
    pub fn fold(&mut self, frame: &FrameCounters, stats: &mut PerformanceStats) {
        let changes = frame.state_changes.saturating_sub(self.state_changes);
        stats.total_state_changes += u64::from(changes);
        self.state_changes = frame.state_changes;

        let batched = frame.batched_uniforms.saturating_sub(self.batched_uniforms);
        stats.blend_batch(batched);
        self.batched_uniforms = frame.batched_uniforms;
    }
}
