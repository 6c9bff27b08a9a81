// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bridge from trace events to the `tracing` crate.
//!
//! Per-comment events are logged at `TRACE`, frame summaries and lifecycle
//! transitions at `DEBUG`, all under the `danmaku::frame` target so they can
//! be filtered separately from the engine's own logging.

use danmaku_core::trace::{
    AdmitEvent, ExpireEvent, LifecycleEvent, PlaceEvent, TickEvent, TickSummary, TraceSink,
};

/// A [`TraceSink`] that forwards every event to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Creates the bridge.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TraceSink for TracingSink {
    fn on_tick(&mut self, e: &TickEvent) {
        tracing::trace!(
            target: "danmaku::frame",
            frame = e.frame_index,
            now = e.now,
            current_time = e.current_time,
            rate = e.rate,
            live = e.live,
            "tick"
        );
    }

    fn on_admit(&mut self, e: &AdmitEvent) {
        tracing::trace!(
            target: "danmaku::frame",
            frame = e.frame_index,
            id = e.id.get(),
            mode = %e.mode,
            timestamp = e.timestamp,
            "admit"
        );
    }

    fn on_place(&mut self, e: &PlaceEvent) {
        match e.lane {
            Some(lane) => tracing::trace!(
                target: "danmaku::frame",
                frame = e.frame_index,
                id = e.id.get(),
                mode = %e.mode,
                lane,
                y = ?e.y,
                "place"
            ),
            None => tracing::trace!(
                target: "danmaku::frame",
                frame = e.frame_index,
                id = e.id.get(),
                mode = %e.mode,
                "no free lane"
            ),
        }
    }

    fn on_expire(&mut self, e: &ExpireEvent) {
        tracing::trace!(
            target: "danmaku::frame",
            frame = e.frame_index,
            id = e.id.get(),
            mode = %e.mode,
            elapsed = e.elapsed,
            reason = ?e.reason,
            "expire"
        );
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        tracing::debug!(
            target: "danmaku::frame",
            kind = ?e.kind,
            now = e.now,
            current_time = e.current_time,
            "lifecycle"
        );
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        if s.dropped > 0 {
            tracing::debug!(
                target: "danmaku::frame",
                frame = s.frame_index,
                dropped = s.dropped,
                placed = s.placed,
                "comments without a lane this frame"
            );
        }
        tracing::trace!(
            target: "danmaku::frame",
            frame = s.frame_index,
            admitted = s.admitted,
            skipped = s.skipped,
            placed = s.placed,
            expired = s.expired,
            rendered = s.rendered,
            live = s.live,
            "summary"
        );
    }
}
