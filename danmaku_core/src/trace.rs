// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! scheduler and lifecycle controller call as they work. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use alloc::rc::Rc;
use core::cell::RefCell;

use crate::comment::{CommentId, Mode};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which lifecycle operation ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    /// The frame loop started.
    Play,
    /// The frame loop stopped.
    Pause,
    /// The live set and lanes were reset and the cursor repositioned.
    Seek,
    /// Visibility turned on.
    Show,
    /// Visibility turned off.
    Hide,
    /// The live set was wiped.
    Clear,
    /// The viewport or display duration changed.
    Resize,
    /// The instance was torn down.
    Destroy,
}

/// Why a comment left the live set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExpireReason {
    /// A fixed comment outlived the display duration.
    Elapsed,
    /// A scrolling comment moved fully past the far edge.
    OffScreen,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted at the start of every frame.
#[derive(Clone, Copy, Debug)]
pub struct TickEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Wall-clock seconds.
    pub now: f64,
    /// Current time on the canonical timeline.
    pub current_time: f64,
    /// Effective playback rate.
    pub rate: f64,
    /// Live comments carried in from the previous frame.
    pub live: usize,
}

/// Emitted when a comment is admitted into the live set.
#[derive(Clone, Copy, Debug)]
pub struct AdmitEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Admitted comment.
    pub id: CommentId,
    /// Its mode.
    pub mode: Mode,
    /// Its canonical timestamp.
    pub timestamp: f64,
}

/// Emitted after lane allocation for an admitted comment.
#[derive(Clone, Copy, Debug)]
pub struct PlaceEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Allocated comment.
    pub id: CommentId,
    /// Its mode.
    pub mode: Mode,
    /// Lane index, or `None` when every lane was occupied.
    pub lane: Option<usize>,
    /// Lane coordinate, or `None` when unplaced.
    pub y: Option<f64>,
}

/// Emitted when a comment leaves the live set on its own.
#[derive(Clone, Copy, Debug)]
pub struct ExpireEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Expired comment.
    pub id: CommentId,
    /// Its mode.
    pub mode: Mode,
    /// Rate-adjusted seconds since arrival.
    pub elapsed: f64,
    /// What triggered the expiry.
    pub reason: ExpireReason,
}

/// Emitted for each lifecycle operation that changed state.
#[derive(Clone, Copy, Debug)]
pub struct LifecycleEvent {
    /// Which operation ran.
    pub kind: LifecycleKind,
    /// Wall-clock seconds.
    pub now: f64,
    /// Current time on the canonical timeline.
    pub current_time: f64,
}

/// Per-frame counts, emitted at the end of every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Wall-clock seconds.
    pub now: f64,
    /// Current time on the canonical timeline.
    pub current_time: f64,
    /// Comments admitted this frame.
    pub admitted: usize,
    /// Comments passed over by the drain as too old.
    pub skipped: usize,
    /// Admitted comments that found a lane.
    pub placed: usize,
    /// Admitted comments that found no lane.
    pub dropped: usize,
    /// Comments expired this frame.
    pub expired: usize,
    /// Comments rendered this frame.
    pub rendered: usize,
    /// Live comments after the frame.
    pub live: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the start of a frame.
    fn on_tick(&mut self, e: &TickEvent) {
        _ = e;
    }

    /// Called when a comment is admitted.
    fn on_admit(&mut self, e: &AdmitEvent) {
        _ = e;
    }

    /// Called after lane allocation.
    fn on_place(&mut self, e: &PlaceEvent) {
        _ = e;
    }

    /// Called when a comment expires.
    fn on_expire(&mut self, e: &ExpireEvent) {
        _ = e;
    }

    /// Called after a lifecycle operation.
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        _ = e;
    }

    /// Called with the per-frame summary.
    fn on_tick_summary(&mut self, s: &TickSummary) {
        _ = s;
    }
}

/// Shares one sink between the engine and the host, e.g. to read a recording
/// back while the engine keeps running.
impl<T: TraceSink + ?Sized> TraceSink for Rc<RefCell<T>> {
    fn on_tick(&mut self, e: &TickEvent) {
        self.borrow_mut().on_tick(e);
    }

    fn on_admit(&mut self, e: &AdmitEvent) {
        self.borrow_mut().on_admit(e);
    }

    fn on_place(&mut self, e: &PlaceEvent) {
        self.borrow_mut().on_place(e);
    }

    fn on_expire(&mut self, e: &ExpireEvent) {
        self.borrow_mut().on_expire(e);
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.borrow_mut().on_lifecycle(e);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.borrow_mut().on_tick_summary(s);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        Self::from_option(Some(sink))
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::from_option(None)
    }

    /// Creates a tracer from an optional sink.
    #[inline]
    #[must_use]
    pub fn from_option(sink: Option<&'a mut dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`TickEvent`].
    #[inline]
    pub fn tick(&mut self, e: &TickEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_tick(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`AdmitEvent`].
    #[inline]
    pub fn admit(&mut self, e: &AdmitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_admit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PlaceEvent`].
    #[inline]
    pub fn place(&mut self, e: &PlaceEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_place(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ExpireEvent`].
    #[inline]
    pub fn expire(&mut self, e: &ExpireEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_expire(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LifecycleEvent`].
    #[inline]
    pub fn lifecycle(&mut self, e: &LifecycleEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_lifecycle(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TickSummary`].
    #[inline]
    pub fn tick_summary(&mut self, s: &TickSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_tick_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tick() -> TickEvent {
        TickEvent {
            frame_index: 42,
            now: 1000.0,
            current_time: 12.5,
            rate: 1.0,
            live: 3,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_tick(&sample_tick());
        sink.on_lifecycle(&LifecycleEvent {
            kind: LifecycleKind::Seek,
            now: 0.0,
            current_time: 0.0,
        });
        sink.on_tick_summary(&TickSummary::default());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.tick(&sample_tick());
        tracer.tick_summary(&TickSummary::default());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            ticks: Vec<u64>,
            placed: Vec<Option<usize>>,
        }
        impl TraceSink for RecordingSink {
            fn on_tick(&mut self, e: &TickEvent) {
                self.ticks.push(e.frame_index);
            }
            fn on_place(&mut self, e: &PlaceEvent) {
                self.placed.push(e.lane);
            }
        }

        let mut sink = RecordingSink {
            ticks: Vec::new(),
            placed: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.tick(&sample_tick());
        tracer.place(&PlaceEvent {
            frame_index: 42,
            id: CommentId(7),
            mode: Mode::Top,
            lane: None,
            y: None,
        });
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.ticks, &[42]);
        assert_eq!(sink.placed, &[None]);
    }
}
