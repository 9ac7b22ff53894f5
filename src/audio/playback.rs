//! Gapless playback scheduling for streamed speech fragments.

use std::collections::BTreeMap;

/// Where a fragment landed on the output clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledFragment {
    pub id: u64,
    /// Output clock time the fragment was scheduled at.
    pub scheduled_at: f64,
    pub start: f64,
    pub end: f64,
}

impl ScheduledFragment {
    /// Seconds from scheduling until the fragment finishes playing.
    pub fn remaining(&self) -> f64 {
        (self.end - self.scheduled_at).max(0.0)
    }
}

/// Serializes fragments on the output clock.
///
/// Each fragment starts at the later of the current clock time and the end of
/// the previously scheduled fragment, so fragments never overlap.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    next_start: f64,
    next_id: u64,
    playing: BTreeMap<u64, f64>,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a fragment of `duration` seconds, given the clock reads `now`.
    pub fn schedule(&mut self, now: f64, duration: f64) -> ScheduledFragment {
        let start = now.max(self.next_start);
        let end = start + duration.max(0.0);
        self.next_start = end;

        let id = self.next_id;
        self.next_id += 1;
        self.playing.insert(id, end);

        ScheduledFragment {
            id,
            scheduled_at: now,
            start,
            end,
        }
    }

    /// Mark a fragment as finished. Returns `true` when nothing is left playing.
    pub fn finish(&mut self, id: u64) -> bool {
        self.playing.remove(&id);
        self.playing.is_empty()
    }

    /// Whether any scheduled fragment has not finished yet.
    pub fn is_speaking(&self) -> bool {
        !self.playing.is_empty()
    }

    /// Drop all state, for a fresh output clock.
    pub fn reset(&mut self) {
        self.next_start = 0.0;
        self.playing.clear();
    }
}
