// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] writes one line per event, prefixed with a bracketed
//! tag, to any [`Write`] implementation (stderr by default).

use std::io::{self, Write};

use danmaku_core::trace::{
    AdmitEvent, ExpireEvent, LifecycleEvent, PlaceEvent, TickEvent, TickSummary, TraceSink,
};

/// A [`TraceSink`] that prints each event as a single line.
///
/// Write errors are ignored.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    comments: bool,
}

impl<W: Write> core::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("writer", &"Write")
            .field("comments", &self.comments)
            .finish()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(io::stderr()))
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to `writer`.
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            comments: true,
        }
    }

    /// Suppresses per-comment lines (`admit`, `place`, `expire`), keeping
    /// only frame and lifecycle output.
    #[must_use]
    pub fn frames_only(mut self) -> Self {
        self.comments = false;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_tick(&mut self, e: &TickEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] frame={} now={:.3} t={:.3} rate={} live={}",
            e.frame_index, e.now, e.current_time, e.rate, e.live,
        );
    }

    fn on_admit(&mut self, e: &AdmitEvent) {
        if !self.comments {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[admit] frame={} id={} mode={} ts={:.3}",
            e.frame_index,
            e.id.get(),
            e.mode,
            e.timestamp,
        );
    }

    fn on_place(&mut self, e: &PlaceEvent) {
        if !self.comments {
            return;
        }
        match (e.lane, e.y) {
            (Some(lane), Some(y)) => {
                let _ = writeln!(
                    self.writer,
                    "[place] frame={} id={} mode={} lane={lane} y={y}",
                    e.frame_index,
                    e.id.get(),
                    e.mode,
                );
            }
            _ => {
                let _ = writeln!(
                    self.writer,
                    "[place] frame={} id={} mode={} lane=none",
                    e.frame_index,
                    e.id.get(),
                    e.mode,
                );
            }
        }
    }

    fn on_expire(&mut self, e: &ExpireEvent) {
        if !self.comments {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[expire] frame={} id={} mode={} elapsed={:.3} reason={:?}",
            e.frame_index,
            e.id.get(),
            e.mode,
            e.elapsed,
            e.reason,
        );
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        let _ = writeln!(
            self.writer,
            "[{:?}] now={:.3} t={:.3}",
            e.kind, e.now, e.current_time,
        );
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} admitted={} skipped={} placed={} dropped={} expired={} rendered={} live={}",
            s.frame_index,
            s.admitted,
            s.skipped,
            s.placed,
            s.dropped,
            s.expired,
            s.rendered,
            s.live,
        );
    }
}
