use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ViewerStatus {
    Idle,
    Advancing,
    Paused,
    Completed,
}

impl Default for ViewerStatus {
    fn default() -> Self {
        ViewerStatus::Idle
    }
}

/// Rendering projection of a single segment in the bar.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum SegmentPhase {
    Completed,
    Active(f32),
    Pending,
}

#[derive(Debug, Clone)]
pub struct SegmentState {
    pub status: ViewerStatus,
    pub step_index: usize,
    pub step_count: usize,
    pub step_duration_ms: u64,
    pub active_ms: u64,
    /// Time accumulated from earlier advancement windows; combines with
    /// `running_anchor` to compute the true elapsed time in this segment.
    pub active_ms_baseline: u64,
    pub running_anchor: Option<Instant>,
}

impl SegmentState {
    pub fn new(step_count: usize, step_duration_ms: u64) -> Self {
        Self {
            status: ViewerStatus::Idle,
            step_index: 0,
            step_count,
            step_duration_ms,
            active_ms: 0,
            active_ms_baseline: 0,
            running_anchor: None,
        }
    }

    pub fn current_active_ms(&self) -> u64 {
        if let (ViewerStatus::Advancing, Some(anchor)) = (self.status, self.running_anchor) {
            self.active_ms_baseline
                .saturating_add(anchor.elapsed().as_millis() as u64)
        } else {
            self.active_ms
        }
    }

    pub fn sync_active_from_anchor(&mut self) {
        if let (ViewerStatus::Advancing, Some(anchor)) = (self.status, self.running_anchor) {
            self.active_ms = self
                .active_ms_baseline
                .saturating_add(anchor.elapsed().as_millis() as u64);
        }
    }

    /// Fractional completion of the active segment, linear in elapsed time.
    pub fn progress(&self) -> f32 {
        (self.current_active_ms() as f32 / self.step_duration_ms as f32).min(1.0)
    }

    /// Always equals `step_duration_ms * (1 - progress)` up to rounding.
    pub fn remaining_ms(&self) -> u64 {
        self.step_duration_ms
            .saturating_sub(self.current_active_ms())
    }

    pub fn begin_segment(&mut self, step_index: usize, now: Instant) {
        self.step_index = step_index;
        self.active_ms = 0;
        self.active_ms_baseline = 0;
        self.running_anchor = Some(now);
        self.status = ViewerStatus::Advancing;
    }

    /// Segment switch while the viewer is held paused: progress resets but
    /// advancement waits for the release.
    pub fn begin_segment_paused(&mut self, step_index: usize) {
        self.step_index = step_index;
        self.active_ms = 0;
        self.active_ms_baseline = 0;
        self.running_anchor = None;
        self.status = ViewerStatus::Paused;
    }

    pub fn pause(&mut self) {
        self.sync_active_from_anchor();
        self.status = ViewerStatus::Paused;
        self.running_anchor = None;
        self.active_ms_baseline = self.active_ms;
    }

    pub fn resume(&mut self, now: Instant) {
        self.active_ms_baseline = self.active_ms;
        self.running_anchor = Some(now);
        self.status = ViewerStatus::Advancing;
    }

    /// Natural terminal transition: the last segment ran out.
    pub fn complete(&mut self) {
        self.active_ms = self.step_duration_ms;
        self.active_ms_baseline = self.active_ms;
        self.running_anchor = None;
        self.status = ViewerStatus::Completed;
    }

    /// External dismissal mid-story; freezes progress where it is.
    pub fn dismiss(&mut self) {
        self.sync_active_from_anchor();
        self.active_ms_baseline = self.active_ms;
        self.running_anchor = None;
        self.status = ViewerStatus::Completed;
    }

    pub fn segment_phase(&self, index: usize) -> SegmentPhase {
        if index < self.step_index {
            SegmentPhase::Completed
        } else if index == self.step_index {
            SegmentPhase::Active(self.progress())
        } else {
            SegmentPhase::Pending
        }
    }

    pub fn phases(&self) -> Vec<SegmentPhase> {
        (0..self.step_count)
            .map(|index| self.segment_phase(index))
            .collect()
    }
}
