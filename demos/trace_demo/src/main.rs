// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated playback that exercises the tracing and diagnostics pipeline.
//!
//! Binds an engine to a simulated media element, loads a generated timeline
//! and pumps 60 Hz frames through a headless backend for twenty seconds of
//! wall time. Along the way it emits live comments, seeks, changes the
//! playback rate, pauses, and hides. Every trace event goes to a
//! [`RecorderSink`], to the `tracing` bridge, and (frames only) to a
//! [`PrettyPrintSink`]; the recording is exported as Chrome trace JSON.
//!
//! Set `RUST_LOG=danmaku::frame=trace` to see per-comment events.

use std::cell::RefCell;
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use danmaku_core::Size;
use danmaku_core::backend::HeadlessBackend;
use danmaku_core::clock::{Clock, ManualClock, ManualMedia};
use danmaku_core::comment::CommentSpec;
use danmaku_core::engine::{Danmaku, MediaEvent};
use danmaku_core::options::Options;
use danmaku_core::tick::ManualTickPort;
use danmaku_core::trace::{
    AdmitEvent, ExpireEvent, LifecycleEvent, PlaceEvent, TickEvent, TickSummary, TraceSink,
};

use danmaku_debug::log::TracingSink;
use danmaku_debug::pretty::PrettyPrintSink;
use danmaku_debug::recorder::RecorderSink;

const FRAME_RATE: u32 = 60;
const SECONDS: u32 = 20;
const VIEWPORT: Size = Size::new(1280.0, 720.0);
const TIMELINE_LEN: usize = 400;
const TIMELINE_SPAN: f64 = 40.0;

const PHRASES: [&str; 8] = [
    "first",
    "here it comes",
    "wwwwwwww",
    "this part again",
    "lol",
    "the drop at 0:32 though",
    "88888888",
    "who's watching in 2026",
];

/// Forwards every event to several sinks.
struct Fanout(Vec<Box<dyn TraceSink>>);

impl TraceSink for Fanout {
    fn on_tick(&mut self, e: &TickEvent) {
        self.0.iter_mut().for_each(|s| s.on_tick(e));
    }

    fn on_admit(&mut self, e: &AdmitEvent) {
        self.0.iter_mut().for_each(|s| s.on_admit(e));
    }

    fn on_place(&mut self, e: &PlaceEvent) {
        self.0.iter_mut().for_each(|s| s.on_place(e));
    }

    fn on_expire(&mut self, e: &ExpireEvent) {
        self.0.iter_mut().for_each(|s| s.on_expire(e));
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.0.iter_mut().for_each(|s| s.on_lifecycle(e));
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.0.iter_mut().for_each(|sink| sink.on_tick_summary(s));
    }
}

/// Deterministic timeline: show times spread over [`TIMELINE_SPAN`], mostly
/// right-to-left with some fixed and left-to-right comments.
fn timeline() -> Vec<CommentSpec> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    (0..TIMELINE_LEN)
        .map(|i| {
            let roll = next();
            let mode = match roll % 10 {
                0 => "top",
                1 => "bottom",
                2 => "ltr",
                _ => "rtl",
            };
            let time = (next() % 10_000) as f64 / 10_000.0 * TIMELINE_SPAN;
            CommentSpec::new(PHRASES[i % PHRASES.len()])
                .mode(mode)
                .at(time)
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // -- sinks -------------------------------------------------------------
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    let fanout = Fanout(vec![
        Box::new(Rc::clone(&recorder)),
        Box::new(TracingSink::new()),
        Box::new(PrettyPrintSink::with_writer(std::io::stdout()).frames_only()),
    ]);

    // -- engine ------------------------------------------------------------
    let wall = ManualClock::new(1000.0);
    let media = ManualMedia::new();
    media.set_paused(true);
    let mut engine = Danmaku::new(
        Options::default().with_comments(timeline()),
        Clock::bound(wall.clone(), media.clone()),
        HeadlessBackend::new(VIEWPORT)
            .with_metrics(14.0, 28.0)
            .without_call_log(),
        ManualTickPort::new(),
    );
    engine.set_trace_sink(Some(Box::new(fanout)));

    media.set_paused(false);
    engine.handle_media_event(MediaEvent::Playing);

    // -- simulated loop ----------------------------------------------------
    let dt = 1.0 / f64::from(FRAME_RATE);
    let frames = SECONDS * FRAME_RATE;
    let mut totals = TickSummary::default();

    for frame in 0..frames {
        let t = f64::from(frame) * dt;
        script(t, dt, &mut engine, &media);

        wall.advance(dt);
        media.advance(dt);

        if let Some(handle) = engine.port_mut().take_pending()
            && let Some(summary) = engine.on_tick(handle)
        {
            totals.admitted += summary.admitted;
            totals.skipped += summary.skipped;
            totals.placed += summary.placed;
            totals.dropped += summary.dropped;
            totals.expired += summary.expired;
            totals.frame_index = summary.frame_index;
        }
    }

    let backend = engine.destroy();
    tracing::info!(
        frames = totals.frame_index,
        admitted = totals.admitted,
        skipped = totals.skipped,
        placed = totals.placed,
        dropped = totals.dropped,
        expired = totals.expired,
        left_on_stage = backend.visual_count(),
        "playback finished"
    );

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    danmaku_debug::chrome::export(recorder.borrow().as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({} frames)", totals.frame_index);
}

/// Host-side events, keyed to wall time since the start of playback.
fn script(
    t: f64,
    dt: f64,
    engine: &mut Danmaku<HeadlessBackend, ManualTickPort>,
    media: &ManualMedia,
) {
    let at = |mark: f64| t <= mark && mark < t + dt;

    if at(3.0) {
        for text in ["live one", "live two", "live three"] {
            engine.emit(CommentSpec::new(text));
        }
        engine.emit(CommentSpec::new("pinned notice").mode("top"));
    }
    if at(6.0) {
        tracing::info!("seeking to 25s");
        media.set_time(25.0);
        engine.handle_media_event(MediaEvent::Seeking);
    }
    if at(9.0) {
        tracing::info!("playback rate 2x");
        media.set_rate(2.0);
    }
    if at(11.0) {
        media.set_paused(true);
        engine.handle_media_event(MediaEvent::Pause);
    }
    if at(12.0) {
        media.set_paused(false);
        engine.handle_media_event(MediaEvent::Playing);
    }
    if at(13.0) {
        engine.hide();
    }
    if at(14.0) {
        engine.show();
        if engine.set_speed(0.0).is_err() {
            tracing::info!(speed = engine.speed(), "kept previous speed");
        }
        engine.set_speed(200.0).expect("valid speed");
    }
    if at(16.0) {
        media.set_rate(1.0);
        media.set_time(5.0);
        engine.handle_media_event(MediaEvent::Seeking);
    }
}
