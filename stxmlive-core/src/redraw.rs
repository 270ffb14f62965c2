//! Coalesces redraw requests into at most one flush per frame interval.
//!
//! State mutation is never batched; only the derived drawing work
//! (projections, histogram, labels) waits for the next flush.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Frame interval for ordinary displays.
pub const DISPLAY_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Longer coalescing window for constrained devices.
pub const CONSTRAINED_FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// How aggressively redraws are coalesced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedrawProfile {
    /// One flush per display frame.
    #[default]
    Display,
    /// One flush per constrained-device window.
    Constrained,
}

impl RedrawProfile {
    #[must_use]
    pub fn interval(self) -> Duration {
        match self {
            RedrawProfile::Display => DISPLAY_FRAME_INTERVAL,
            RedrawProfile::Constrained => CONSTRAINED_FRAME_INTERVAL,
        }
    }
}

/// Kind of derived drawing work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawKind {
    /// Grid rasters (colors changed for every cell).
    Grids,
    Projections,
    Histogram,
    Labels,
}

/// Set of pending redraw kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedrawSet {
    pub grids: bool,
    pub projections: bool,
    pub histogram: bool,
    pub labels: bool,
}

impl RedrawSet {
    /// Every kind set.
    #[must_use]
    pub fn all() -> Self {
        Self {
            grids: true,
            projections: true,
            histogram: true,
            labels: true,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn contains(&self, kind: RedrawKind) -> bool {
        match kind {
            RedrawKind::Grids => self.grids,
            RedrawKind::Projections => self.projections,
            RedrawKind::Histogram => self.histogram,
            RedrawKind::Labels => self.labels,
        }
    }

    fn insert(&mut self, kind: RedrawKind) {
        match kind {
            RedrawKind::Grids => self.grids = true,
            RedrawKind::Projections => self.projections = true,
            RedrawKind::Histogram => self.histogram = true,
            RedrawKind::Labels => self.labels = true,
        }
    }
}

/// Dirty-flag-and-coalesce scheduler.
///
/// Requests accumulate until [`poll`](Self::poll) is called at least one frame
/// interval after the previous flush; they are then returned together.
#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    interval: Duration,
    pending: RedrawSet,
    last_flush: Option<Instant>,
    requests: u64,
    flushes: u64,
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new(RedrawProfile::default())
    }
}

impl RedrawScheduler {
    #[must_use]
    pub fn new(profile: RedrawProfile) -> Self {
        Self {
            interval: profile.interval(),
            pending: RedrawSet::default(),
            last_flush: None,
            requests: 0,
            flushes: 0,
        }
    }

    /// Change the coalescing window.
    pub fn set_profile(&mut self, profile: RedrawProfile) {
        self.interval = profile.interval();
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Mark `kind` as needing a redraw.
    pub fn request(&mut self, kind: RedrawKind) {
        self.pending.insert(kind);
        self.requests += 1;
    }

    /// Mark every kind as needing a redraw.
    pub fn request_all(&mut self) {
        self.pending = RedrawSet::all();
        self.requests += 1;
    }

    /// Pending work, without consuming it.
    #[must_use]
    pub fn pending(&self) -> RedrawSet {
        self.pending
    }

    /// Take the pending set if a frame interval has elapsed since the last flush.
    ///
    /// Returns an empty set when nothing is pending or the window is still open.
    pub fn poll(&mut self, now: Instant) -> RedrawSet {
        if self.pending.is_empty() {
            return RedrawSet::default();
        }
        if let Some(last) = self.last_flush {
            if now.saturating_duration_since(last) < self.interval {
                return RedrawSet::default();
            }
        }
        self.last_flush = Some(now);
        self.flushes += 1;
        std::mem::take(&mut self.pending)
    }

    /// Earliest instant at which pending work can be flushed.
    #[must_use]
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        Some(self.last_flush.map_or(now, |last| (last + self.interval).max(now)))
    }

    /// `(requests, flushes)` since creation.
    #[must_use]
    pub fn counters(&self) -> (u64, u64) {
        (self.requests, self.flushes)
    }
}
