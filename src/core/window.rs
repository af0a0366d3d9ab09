//! # Render Window
//!
//! Half-open `[start, end)` range of logical indices that are materialized.
//!
//! ```text
//! logical:  0 ─────────── start ════════ selected ════════ end ─────── len
//!                           │◀─ T ─▶│                │◀─ T ─▶│
//!                            rerender zone          rerender zone
//! ```
//!
//! Invariant: `start <= end <= len` and `end - start <= size`.

use std::fmt;

/// Messages rendered at a time.
pub const DEFAULT_WINDOW_SIZE: usize = 400;
/// Distance from a window edge at which the window is recentered.
pub const DEFAULT_THRESHOLD: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    ZeroSize,
    ThresholdTooLarge { threshold: usize, size: usize },
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::ZeroSize => write!(f, "render window size must be positive"),
            WindowError::ThresholdTooLarge { threshold, size } => write!(
                f,
                "render threshold {threshold} must be less than half the window size {size}"
            ),
        }
    }
}

impl std::error::Error for WindowError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderWindow {
    size: usize,
    threshold: usize,
    start: usize,
    end: usize,
}

impl Default for RenderWindow {
    fn default() -> Self {
        Self {
            size: DEFAULT_WINDOW_SIZE,
            threshold: DEFAULT_THRESHOLD,
            start: 0,
            end: 0,
        }
    }
}

impl RenderWindow {
    pub fn new(size: usize, threshold: usize) -> Result<Self, WindowError> {
        if size == 0 {
            return Err(WindowError::ZeroSize);
        }
        if threshold.saturating_mul(2) >= size {
            return Err(WindowError::ThresholdTooLarge { threshold, size });
        }
        Ok(Self {
            size,
            threshold,
            start: 0,
            end: 0,
        })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    /// Number of materialized indices.
    pub fn occupancy(&self) -> usize {
        self.end - self.start
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.range().contains(&idx)
    }

    /// Recenter on `selected`. With `check_for_changed`, an unchanged start
    /// reports no change and leaves the window alone.
    pub fn update(&mut self, selected: usize, len: usize, check_for_changed: bool) -> bool {
        let new_start = selected.saturating_sub(self.size / 2);
        if check_for_changed && new_start == self.start {
            return false;
        }
        self.start = new_start.min(len);
        self.end = (self.start + self.size).min(len);
        true
    }

    /// The selection is close to an edge that does not abut the list ends.
    pub fn should_rerender(&self, selected: usize, len: usize) -> bool {
        let near_top = selected < self.start + self.threshold && self.start != 0;
        let near_bottom = self.end <= selected + self.threshold && self.end != len;
        near_top || near_bottom
    }

    /// Room for `incoming` messages appended at the end. Grows `end` by the
    /// returned count, which the caller materializes from the batch head.
    pub fn append(&mut self, incoming: usize) -> usize {
        let take = incoming.min(self.size.saturating_sub(self.occupancy()));
        self.end += take;
        take
    }

    /// `incoming` messages were inserted before index 0. Shifts the window
    /// and returns how many to materialize from the batch tail.
    ///
    /// Only a window that touched the old head can grow upwards; any other
    /// window would leave a gap between the batch and its first row.
    pub fn prepend(&mut self, incoming: usize) -> usize {
        let touched_head = self.start == 0;
        self.start += incoming;
        self.end += incoming;
        if !touched_head {
            return 0;
        }
        let take = incoming.min(self.size.saturating_sub(self.occupancy()));
        self.start -= take;
        take
    }

    pub fn reset(&mut self) {
        self.start = 0;
        self.end = 0;
    }
}
