// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle controller.
//!
//! [`Danmaku`] owns the timeline, the scheduler, the clock, a [`Backend`] and
//! a [`TickPort`]. Its state is a [`PlaybackState`] crossed with a visibility
//! flag:
//!
//! | Operation | Hidden | Visible |
//! |---|---|---|
//! | [`play`](Danmaku::play) | no-op | starts the frame loop unless playing |
//! | [`pause`](Danmaku::pause) | no-op | stops the frame loop if playing |
//! | [`seek`](Danmaku::seek) | resets | resets (bound clock only) |
//! | [`hide`](Danmaku::hide) | no-op | pause, clear, hide |
//! | [`show`](Danmaku::show) | show, then seek + play unless media paused | no-op |
//!
//! The frame loop holds at most one pending [`TickHandle`]. The host hands
//! fired handles to [`on_tick`](Danmaku::on_tick); a handle that is not the
//! pending one (cancelled, or from before a pause) is ignored.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use serde_json::Value;

use crate::backend::Backend;
use crate::clock::{Clock, MediaClock};
use crate::comment::{Comment, CommentId, CommentSpec};
use crate::error::ConfigError;
use crate::options::{DEFAULT_SPEED, Options, validate_speed};
use crate::scheduler::FrameScheduler;
use crate::tick::{TickHandle, TickPort};
use crate::timeline::Timeline;
use crate::trace::{LifecycleEvent, LifecycleKind, TickSummary, TraceSink, Tracer};

/// Whether the frame loop is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// Never started.
    #[default]
    Stopped,
    /// A tick is pending or running.
    Playing,
    /// Started, then paused.
    Paused,
}

/// Playback notifications from a bound media element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaEvent {
    /// Playback was requested.
    Play,
    /// Playback actually started or resumed.
    Playing,
    /// Playback was paused.
    Pause,
    /// Playback stalled waiting for data.
    Waiting,
    /// The playback position jumped.
    Seeking,
}

impl MediaEvent {
    /// Every event, in subscription order.
    pub const ALL: [Self; 5] = [
        Self::Play,
        Self::Pause,
        Self::Playing,
        Self::Waiting,
        Self::Seeking,
    ];

    /// DOM event name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Playing => "playing",
            Self::Pause => "pause",
            Self::Waiting => "waiting",
            Self::Seeking => "seeking",
        }
    }

    /// Parses a DOM event name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

/// A comment overlay instance.
pub struct Danmaku<B: Backend, P: TickPort> {
    backend: B,
    port: P,
    clock: Clock,
    timeline: Timeline,
    scheduler: FrameScheduler,
    speed: f64,
    state: PlaybackState,
    visible: bool,
    pending: Option<TickHandle>,
    next_id: u64,
    sink: Option<Box<dyn TraceSink>>,
}

impl<B: Backend, P: TickPort> fmt::Debug for Danmaku<B, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Danmaku")
            .field("clock", &self.clock)
            .field("state", &self.state)
            .field("visible", &self.visible)
            .field("speed", &self.speed)
            .field("pending", &self.pending)
            .field("timeline", &self.timeline.len())
            .field("live", &self.scheduler.live().len())
            .finish_non_exhaustive()
    }
}

fn tracer(sink: &mut Option<Box<dyn TraceSink>>) -> Tracer<'_> {
    match sink {
        Some(sink) => Tracer::new(&mut **sink),
        None => Tracer::none(),
    }
}

impl<B: Backend, P: TickPort> Danmaku<B, P> {
    /// Creates an instance and, unless a bound media clock is paused, starts
    /// playing.
    ///
    /// The backend is initialized and sized to its container. An unusable
    /// `options.speed` falls back to [`DEFAULT_SPEED`]. Loaded comments are
    /// sorted by show time; on an unbound clock they all arrive now.
    pub fn new(options: Options, clock: Clock, backend: B, port: P) -> Self {
        let speed = validate_speed(options.speed).unwrap_or_else(|err| {
            tracing::warn!(%err, "using default speed");
            DEFAULT_SPEED
        });
        let mut this = Self {
            backend,
            port,
            clock,
            timeline: Timeline::new(),
            scheduler: FrameScheduler::new(),
            speed,
            state: PlaybackState::Stopped,
            visible: true,
            pending: None,
            next_id: 0,
            sink: None,
        };
        this.backend.init();
        this.resize();

        let arrival = this.clock.now();
        let comments: Vec<Comment> = options
            .comments
            .into_iter()
            .map(|spec| {
                let id = this.allocate_id();
                Comment::from_spec(id, spec, arrival)
            })
            .collect();
        this.timeline.load(comments);
        tracing::debug!(
            comments = this.timeline.len(),
            bound = this.clock.is_bound(),
            speed,
            "danmaku created"
        );

        if !this.clock.is_media_paused() {
            this.seek();
            this.play();
        }
        this
    }

    /// Installs a trace sink for frame-loop instrumentation.
    ///
    /// Events are only delivered when the `trace` feature is enabled.
    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.sink = sink;
    }

    /// The rendering backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The rendering backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The tick port.
    #[must_use]
    pub fn port(&self) -> &P {
        &self.port
    }

    /// The tick port, mutably.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// The clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// The timeline.
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Live comments, in admission order.
    #[must_use]
    pub fn live(&self) -> &[Comment] {
        self.scheduler.live()
    }

    /// The frame scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Playback state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether the frame loop is running.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Whether comments are shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The pending tick request, if any.
    #[must_use]
    pub fn pending_tick(&self) -> Option<TickHandle> {
        self.pending
    }

    /// Scroll speed in pixels per second.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Sets the scroll speed.
    ///
    /// Rejects non-positive and non-finite values and keeps the previous
    /// speed. Once the viewport has a width, the display duration follows.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), ConfigError> {
        let speed = validate_speed(speed).inspect_err(|err| {
            tracing::debug!(%err, "speed rejected");
        })?;
        self.speed = speed;
        let viewport = self.scheduler.viewport();
        if viewport.width > 0.0 {
            self.scheduler.set_layout(viewport, speed);
        }
        Ok(())
    }

    /// Starts the frame loop.
    ///
    /// No-op while hidden or already playing. On a bound clock every live
    /// comment is re-anchored to the media position first.
    pub fn play(&mut self) {
        if !self.visible || self.state == PlaybackState::Playing {
            return;
        }
        self.state = PlaybackState::Playing;
        self.scheduler.resync(&self.clock);
        self.pending = Some(self.port.request_tick());
        self.lifecycle(LifecycleKind::Play);
    }

    /// Stops the frame loop.
    ///
    /// No-op while hidden or not playing.
    pub fn pause(&mut self) {
        if !self.visible || self.state != PlaybackState::Playing {
            return;
        }
        self.state = PlaybackState::Paused;
        if let Some(handle) = self.pending.take() {
            self.port.cancel_tick(handle);
        }
        self.lifecycle(LifecycleKind::Pause);
    }

    /// Resynchronizes with the bound media position.
    ///
    /// Clears the live set, discards all lane state, and moves the timeline
    /// cursor to the media's current time. No-op on an unbound clock.
    pub fn seek(&mut self) {
        if !self.clock.is_bound() {
            return;
        }
        self.scheduler.clear(&mut self.backend);
        self.timeline.seek(self.clock.current_time());
        self.lifecycle(LifecycleKind::Seek);
    }

    /// Makes comments visible again and, unless a bound media clock is
    /// paused, seeks and plays.
    pub fn show(&mut self) {
        if self.visible {
            return;
        }
        self.visible = true;
        self.lifecycle(LifecycleKind::Show);
        if self.clock.is_media_paused() {
            return;
        }
        self.seek();
        self.play();
    }

    /// Pauses, clears and hides.
    pub fn hide(&mut self) {
        if !self.visible {
            return;
        }
        self.pause();
        self.clear();
        self.visible = false;
        self.lifecycle(LifecycleKind::Hide);
    }

    /// Removes every live comment and discards all lane state. The timeline
    /// is untouched.
    pub fn clear(&mut self) {
        self.scheduler.clear(&mut self.backend);
        self.lifecycle(LifecycleKind::Clear);
    }

    /// Re-reads the container size, resizes the stage and recomputes the
    /// display duration.
    pub fn resize(&mut self) {
        let size = self.backend.container_size();
        self.backend.resize(size);
        self.scheduler.set_layout(size, self.speed);
        self.lifecycle(LifecycleKind::Resize);
    }

    /// Adds a comment.
    ///
    /// On an unbound clock it is appended and shows up on the next frame. On
    /// a bound clock a comment without a show time is due immediately; one
    /// with a show time is inserted in order.
    pub fn emit(&mut self, spec: CommentSpec) -> CommentId {
        let id = self.allocate_id();
        let comment = Comment::from_spec(id, spec, self.clock.now());
        let index = self.timeline.insert(comment, &self.clock);
        tracing::trace!(id = id.get(), index, "emit");
        id
    }

    /// Adds a comment from a JSON payload.
    ///
    /// A payload that is not a JSON object, or that does not deserialize, is
    /// ignored and `None` is returned.
    pub fn emit_value(&mut self, value: &Value) -> Option<CommentId> {
        match CommentSpec::from_value(value) {
            Ok(spec) => Some(self.emit(spec)),
            Err(err) => {
                tracing::debug!(%err, "ignoring comment payload");
                None
            }
        }
    }

    /// Dispatches a media element notification.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Play | MediaEvent::Playing => self.play(),
            MediaEvent::Pause | MediaEvent::Waiting => self.pause(),
            MediaEvent::Seeking => self.seek(),
        }
    }

    /// Runs one frame for a fired tick request and schedules the next.
    ///
    /// Returns `None` without doing anything when `handle` is not the pending
    /// request.
    pub fn on_tick(&mut self, handle: TickHandle) -> Option<TickSummary> {
        if self.pending != Some(handle) {
            tracing::trace!(handle = handle.0, "stale tick ignored");
            return None;
        }
        self.pending = None;
        let summary = self.scheduler.tick(
            &self.clock,
            &mut self.timeline,
            &mut self.backend,
            &mut tracer(&mut self.sink),
        );
        if self.state == PlaybackState::Playing {
            self.pending = Some(self.port.request_tick());
        }
        Some(summary)
    }

    /// Pauses, clears, detaches the media clock and hands back the backend
    /// for teardown.
    pub fn destroy(mut self) -> B {
        self.pause();
        self.clear();
        self.lifecycle(LifecycleKind::Destroy);
        let detached: Option<Box<dyn MediaClock>> = self.clock.detach();
        tracing::debug!(was_bound = detached.is_some(), "danmaku destroyed");
        self.backend
    }

    fn allocate_id(&mut self) -> CommentId {
        let id = CommentId(self.next_id);
        self.next_id += 1;
        id
    }

    fn lifecycle(&mut self, kind: LifecycleKind) {
        tracing::debug!(?kind, visible = self.visible, state = ?self.state, "lifecycle");
        tracer(&mut self.sink).lifecycle(&LifecycleEvent {
            kind,
            now: self.clock.now(),
            current_time: self.clock.current_time(),
        });
    }
}
