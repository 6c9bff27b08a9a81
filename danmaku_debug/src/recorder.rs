// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use danmaku_core::comment::{CommentId, Mode};
use danmaku_core::trace::{
    AdmitEvent, ExpireEvent, ExpireReason, LifecycleEvent, LifecycleKind, PlaceEvent, TickEvent,
    TickSummary, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TICK: u8 = 1;
const TAG_ADMIT: u8 = 2;
const TAG_PLACE: u8 = 3;
const TAG_EXPIRE: u8 = 4;
const TAG_LIFECYCLE: u8 = 5;
const TAG_TICK_SUMMARY: u8 = 6;

const LIFECYCLE_KINDS: [LifecycleKind; 8] = [
    LifecycleKind::Play,
    LifecycleKind::Pause,
    LifecycleKind::Seek,
    LifecycleKind::Show,
    LifecycleKind::Hide,
    LifecycleKind::Clear,
    LifecycleKind::Resize,
    LifecycleKind::Destroy,
];

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_usize(&mut self, v: usize) {
        self.write_u64(v as u64);
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_option_usize(&mut self, v: Option<usize>) {
        self.write_u8(u8::from(v.is_some()));
        self.write_usize(v.unwrap_or(0));
    }

    fn write_option_f64(&mut self, v: Option<f64>) {
        self.write_u8(u8::from(v.is_some()));
        self.write_f64(v.unwrap_or(0.0));
    }

    fn write_comment(&mut self, frame_index: u64, id: CommentId, mode: Mode) {
        self.write_u64(frame_index);
        self.write_u64(id.get());
        self.write_mode(mode);
    }

    fn write_mode(&mut self, mode: Mode) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "mode index is always below four"
        )]
        self.write_u8(mode.index() as u8);
    }

    fn write_reason(&mut self, reason: ExpireReason) {
        self.write_u8(match reason {
            ExpireReason::Elapsed => 0,
            ExpireReason::OffScreen => 1,
        });
    }

    fn write_lifecycle_kind(&mut self, kind: LifecycleKind) {
        let tag = LIFECYCLE_KINDS.iter().position(|k| *k == kind).unwrap_or(0);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "lifecycle table has eight entries"
        )]
        self.write_u8(tag as u8);
    }
}

impl TraceSink for RecorderSink {
    fn on_tick(&mut self, e: &TickEvent) {
        self.write_u8(TAG_TICK);
        self.write_u64(e.frame_index);
        self.write_f64(e.now);
        self.write_f64(e.current_time);
        self.write_f64(e.rate);
        self.write_usize(e.live);
    }

    fn on_admit(&mut self, e: &AdmitEvent) {
        self.write_u8(TAG_ADMIT);
        self.write_comment(e.frame_index, e.id, e.mode);
        self.write_f64(e.timestamp);
    }

    fn on_place(&mut self, e: &PlaceEvent) {
        self.write_u8(TAG_PLACE);
        self.write_comment(e.frame_index, e.id, e.mode);
        self.write_option_usize(e.lane);
        self.write_option_f64(e.y);
    }

    fn on_expire(&mut self, e: &ExpireEvent) {
        self.write_u8(TAG_EXPIRE);
        self.write_comment(e.frame_index, e.id, e.mode);
        self.write_f64(e.elapsed);
        self.write_reason(e.reason);
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.write_u8(TAG_LIFECYCLE);
        self.write_lifecycle_kind(e.kind);
        self.write_f64(e.now);
        self.write_f64(e.current_time);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.write_u8(TAG_TICK_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_f64(s.now);
        self.write_f64(s.current_time);
        for count in [
            s.admitted, s.skipped, s.placed, s.dropped, s.expired, s.rendered, s.live,
        ] {
            self.write_usize(count);
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`TickEvent`].
    Tick(TickEvent),
    /// An [`AdmitEvent`].
    Admit(AdmitEvent),
    /// A [`PlaceEvent`].
    Place(PlaceEvent),
    /// An [`ExpireEvent`].
    Expire(ExpireEvent),
    /// A [`LifecycleEvent`].
    Lifecycle(LifecycleEvent),
    /// A [`TickSummary`].
    TickSummary(TickSummary),
}

impl RecordedEvent {
    /// Frame counter the event belongs to. Lifecycle events happen between
    /// frames and have none.
    #[must_use]
    pub fn frame_index(&self) -> Option<u64> {
        match self {
            Self::Tick(e) => Some(e.frame_index),
            Self::Admit(e) => Some(e.frame_index),
            Self::Place(e) => Some(e.frame_index),
            Self::Expire(e) => Some(e.frame_index),
            Self::Lifecycle(_) => None,
            Self::TickSummary(s) => Some(s.frame_index),
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_bytes8(&mut self) -> Option<[u8; 8]> {
        if self.remaining() < 8 {
            return None;
        }
        let v = self.data[self.pos..self.pos + 8].try_into().ok()?;
        self.pos += 8;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.read_bytes8().map(u64::from_le_bytes)
    }

    fn read_usize(&mut self) -> Option<usize> {
        usize::try_from(self.read_u64()?).ok()
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_bytes8().map(f64::from_le_bytes)
    }

    fn read_option_usize(&mut self) -> Option<Option<usize>> {
        let present = self.read_u8()?;
        let val = self.read_usize()?;
        Some((present != 0).then_some(val))
    }

    fn read_option_f64(&mut self) -> Option<Option<f64>> {
        let present = self.read_u8()?;
        let val = self.read_f64()?;
        Some((present != 0).then_some(val))
    }

    fn read_mode(&mut self) -> Option<Mode> {
        Mode::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_reason(&mut self) -> Option<ExpireReason> {
        Some(match self.read_u8()? {
            0 => ExpireReason::Elapsed,
            _ => ExpireReason::OffScreen,
        })
    }

    fn read_lifecycle_kind(&mut self) -> Option<LifecycleKind> {
        LIFECYCLE_KINDS.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_tick(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Tick(TickEvent {
            frame_index: self.read_u64()?,
            now: self.read_f64()?,
            current_time: self.read_f64()?,
            rate: self.read_f64()?,
            live: self.read_usize()?,
        }))
    }

    fn decode_admit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Admit(AdmitEvent {
            frame_index: self.read_u64()?,
            id: CommentId::from_raw(self.read_u64()?),
            mode: self.read_mode()?,
            timestamp: self.read_f64()?,
        }))
    }

    fn decode_place(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Place(PlaceEvent {
            frame_index: self.read_u64()?,
            id: CommentId::from_raw(self.read_u64()?),
            mode: self.read_mode()?,
            lane: self.read_option_usize()?,
            y: self.read_option_f64()?,
        }))
    }

    fn decode_expire(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Expire(ExpireEvent {
            frame_index: self.read_u64()?,
            id: CommentId::from_raw(self.read_u64()?),
            mode: self.read_mode()?,
            elapsed: self.read_f64()?,
            reason: self.read_reason()?,
        }))
    }

    fn decode_lifecycle(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Lifecycle(LifecycleEvent {
            kind: self.read_lifecycle_kind()?,
            now: self.read_f64()?,
            current_time: self.read_f64()?,
        }))
    }

    fn decode_tick_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickSummary(TickSummary {
            frame_index: self.read_u64()?,
            now: self.read_f64()?,
            current_time: self.read_f64()?,
            admitted: self.read_usize()?,
            skipped: self.read_usize()?,
            placed: self.read_usize()?,
            dropped: self.read_usize()?,
            expired: self.read_usize()?,
            rendered: self.read_usize()?,
            live: self.read_usize()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_TICK => self.decode_tick(),
            TAG_ADMIT => self.decode_admit(),
            TAG_PLACE => self.decode_place(),
            TAG_EXPIRE => self.decode_expire(),
            TAG_LIFECYCLE => self.decode_lifecycle(),
            TAG_TICK_SUMMARY => self.decode_tick_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use danmaku_core::Size;
    use danmaku_core::backend::HeadlessBackend;
    use danmaku_core::clock::{Clock, ManualClock};
    use danmaku_core::comment::CommentSpec;
    use danmaku_core::engine::Danmaku;
    use danmaku_core::options::Options;
    use danmaku_core::tick::ManualTickPort;

    fn sample_place(lane: Option<usize>) -> PlaceEvent {
        PlaceEvent {
            frame_index: 12,
            id: CommentId::from_raw(40),
            mode: Mode::Bottom,
            lane,
            y: lane.map(|l| 300.0 - 25.0 * (l as f64 + 1.0)),
        }
    }

    #[test]
    fn unplaced_comment_keeps_missing_lane() {
        let mut rec = RecorderSink::new();
        rec.on_place(&sample_place(Some(2)));
        rec.on_place(&sample_place(None));

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        match (&events[0], &events[1]) {
            (RecordedEvent::Place(placed), RecordedEvent::Place(dropped)) => {
                assert_eq!(placed.lane, Some(2));
                assert_eq!(placed.y, Some(225.0));
                assert_eq!(placed.mode, Mode::Bottom);
                assert_eq!(placed.id, CommentId::from_raw(40));
                assert_eq!(dropped.lane, None);
                assert_eq!(dropped.y, None);
            }
            other => panic!("expected two Place events, got {other:?}"),
        }
    }

    #[test]
    fn every_lifecycle_kind_survives_decoding() {
        let mut rec = RecorderSink::new();
        for (i, kind) in LIFECYCLE_KINDS.iter().enumerate() {
            rec.on_lifecycle(&LifecycleEvent {
                kind: *kind,
                now: i as f64,
                current_time: 0.5,
            });
        }
        let kinds: Vec<LifecycleKind> = decode(rec.as_bytes())
            .filter_map(|e| match e {
                RecordedEvent::Lifecycle(e) => Some(e.kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, LIFECYCLE_KINDS);
    }

    #[test]
    fn truncated_record_stops_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_expire(&ExpireEvent {
            frame_index: 3,
            id: CommentId::from_raw(1),
            mode: Mode::Top,
            elapsed: 4.2,
            reason: ExpireReason::Elapsed,
        });
        rec.on_expire(&ExpireEvent {
            frame_index: 3,
            id: CommentId::from_raw(2),
            mode: Mode::Rtl,
            elapsed: 6.0,
            reason: ExpireReason::OffScreen,
        });
        let bytes = rec.into_bytes();
        let cut = &bytes[..bytes.len() - 3];
        let events: Vec<_> = decode(cut).collect();
        assert_eq!(events.len(), 1, "the partial second record is dropped");
        assert!(matches!(
            events[0],
            RecordedEvent::Expire(ExpireEvent {
                reason: ExpireReason::Elapsed,
                ..
            })
        ));
    }

    #[test]
    fn unknown_tag_stops_iteration() {
        let events: Vec<_> = decode(&[0xff, 1, 2, 3]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn records_a_running_engine() {
        let rec = Rc::new(RefCell::new(RecorderSink::new()));
        let wall = ManualClock::new(0.0);
        let mut engine = Danmaku::new(
            Options::default(),
            Clock::unbound(wall.clone()),
            HeadlessBackend::new(Size::new(500.0, 300.0)),
            ManualTickPort::new(),
        );
        engine.set_trace_sink(Some(Box::new(Rc::clone(&rec))));
        engine.emit(CommentSpec::new("hello"));
        engine.emit(CommentSpec::new("pinned").mode("top"));
        for frame in 1..=3 {
            wall.set(f64::from(frame) * 0.1);
            let handle = engine.port_mut().take_pending().unwrap();
            engine.on_tick(handle).unwrap();
        }
        engine.pause();

        let events: Vec<_> = decode(rec.borrow().as_bytes()).collect();
        let count = |f: fn(&RecordedEvent) -> bool| events.iter().filter(|e| f(e)).count();
        assert_eq!(count(|e| matches!(e, RecordedEvent::Tick(_))), 3);
        assert_eq!(count(|e| matches!(e, RecordedEvent::Admit(_))), 2);
        assert_eq!(count(|e| matches!(e, RecordedEvent::Place(_))), 2);
        assert_eq!(count(|e| matches!(e, RecordedEvent::TickSummary(_))), 3);
        assert!(matches!(
            events.last(),
            Some(RecordedEvent::Lifecycle(LifecycleEvent {
                kind: LifecycleKind::Pause,
                ..
            }))
        ));

        let summaries: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::TickSummary(s) => Some(s.frame_index),
                _ => None,
            })
            .collect();
        assert_eq!(summaries, [1, 2, 3]);
    }
}
