// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Per-comment events carry no clock reading of their own; they are stamped
//! with the wall-clock time of the frame they belong to and laid out on one
//! track per mode.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use danmaku_core::comment::Mode;

use crate::recorder::{RecordedEvent, decode};

/// Track for frame-level and lifecycle events.
const SCHEDULER_TID: u64 = 0;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Wall-clock seconds are converted to microseconds.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut frame_ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Tick(e) => {
                frame_ts = seconds_to_us(e.now);
                events.push(json!({
                    "ph": "i",
                    "name": "Tick",
                    "cat": "Scheduler",
                    "ts": frame_ts,
                    "pid": 0,
                    "tid": SCHEDULER_TID,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "current_time": e.current_time,
                        "rate": e.rate,
                        "live": e.live,
                    }
                }));
            }
            RecordedEvent::Admit(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Admit",
                    "cat": "Comment",
                    "ts": frame_ts,
                    "pid": 0,
                    "tid": mode_tid(e.mode),
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "id": e.id.get(),
                        "mode": e.mode.as_str(),
                        "timestamp": e.timestamp,
                    }
                }));
            }
            RecordedEvent::Place(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": if e.lane.is_some() { "Place" } else { "NoLane" },
                    "cat": "Comment",
                    "ts": frame_ts,
                    "pid": 0,
                    "tid": mode_tid(e.mode),
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "id": e.id.get(),
                        "lane": e.lane,
                        "y": e.y,
                    }
                }));
            }
            RecordedEvent::Expire(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Expire",
                    "cat": "Comment",
                    "ts": frame_ts,
                    "pid": 0,
                    "tid": mode_tid(e.mode),
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "id": e.id.get(),
                        "elapsed": e.elapsed,
                        "reason": format!("{:?}", e.reason),
                    }
                }));
            }
            RecordedEvent::Lifecycle(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.kind),
                    "cat": "Lifecycle",
                    "ts": seconds_to_us(e.now),
                    "pid": 0,
                    "tid": SCHEDULER_TID,
                    "s": "p",
                    "args": {
                        "current_time": e.current_time,
                    }
                }));
            }
            RecordedEvent::TickSummary(s) => {
                let ts = seconds_to_us(s.now);
                events.push(json!({
                    "ph": "i",
                    "name": "TickSummary",
                    "cat": "Summary",
                    "ts": ts,
                    "pid": 0,
                    "tid": SCHEDULER_TID,
                    "s": "g",
                    "args": {
                        "frame_index": s.frame_index,
                        "admitted": s.admitted,
                        "skipped": s.skipped,
                        "placed": s.placed,
                        "dropped": s.dropped,
                        "expired": s.expired,
                        "rendered": s.rendered,
                    }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "Live",
                    "ts": ts,
                    "pid": 0,
                    "args": {
                        "live": s.live,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn seconds_to_us(seconds: f64) -> f64 {
    seconds * 1_000_000.0
}

fn mode_tid(mode: Mode) -> u64 {
    mode.index() as u64 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use danmaku_core::comment::CommentId;
    use danmaku_core::trace::{
        LifecycleEvent, LifecycleKind, PlaceEvent, TickEvent, TickSummary, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_tick(&TickEvent {
            frame_index: 1,
            now: 2.5,
            current_time: 10.0,
            rate: 1.0,
            live: 0,
        });
        rec.on_place(&PlaceEvent {
            frame_index: 1,
            id: CommentId::from_raw(7),
            mode: Mode::Top,
            lane: None,
            y: None,
        });
        rec.on_tick_summary(&TickSummary {
            frame_index: 1,
            now: 2.5,
            current_time: 10.0,
            admitted: 1,
            dropped: 1,
            live: 1,
            ..TickSummary::default()
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4, "summary adds a counter event");

        assert_eq!(parsed[0]["name"], "Tick");
        assert_eq!(parsed[0]["ts"], 2_500_000.0);

        // Comment events inherit the frame's timestamp.
        assert_eq!(parsed[1]["name"], "NoLane");
        assert_eq!(parsed[1]["ts"], 2_500_000.0);
        assert_eq!(parsed[1]["tid"], 3);
        assert!(parsed[1]["args"]["lane"].is_null());

        assert_eq!(parsed[2]["args"]["dropped"], 1);
        assert_eq!(parsed[3]["ph"], "C");
        assert_eq!(parsed[3]["args"]["live"], 1);
    }

    #[test]
    fn lifecycle_events_use_their_own_clock() {
        let mut rec = RecorderSink::new();
        rec.on_lifecycle(&LifecycleEvent {
            kind: LifecycleKind::Seek,
            now: 0.25,
            current_time: 42.0,
        });
        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["name"], "Seek");
        assert_eq!(parsed[0]["cat"], "Lifecycle");
        assert_eq!(parsed[0]["ts"], 250_000.0);
        assert_eq!(parsed[0]["args"]["current_time"], 42.0);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
