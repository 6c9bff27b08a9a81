// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame driver.
//!
//! [`FrameScheduler::tick`] runs one synchronous pass over the live set:
//!
//! 1. `framing` on the backend.
//! 2. Expiry, walking the live set from the back so removals are in place.
//! 3. Admission, draining due comments from the [`Timeline`]. On a bound
//!    clock each admitted comment's arrival is rebased to the media
//!    position.
//! 4. `setup` on the backend with the whole admitted batch; measured sizes
//!    are written back to the timeline.
//! 5. Lane allocation for every admitted comment. Comments that find no lane
//!    stay live (and expire on schedule) but are never drawn.
//! 6. Motion and `render` for every placed comment.
//!
//! Expiry, allocation and motion all measure a comment's age as
//! `current_time - timestamp` on the canonical timeline. On a bound clock
//! that is media time, so positions follow the media across rate changes and
//! stalls; on an unbound clock it is wall time since arrival.
//!
//! A pass depends only on the clock readings and the stored state, so two
//! passes at the same clock readings draw the same frame.

use alloc::vec::Vec;

use kurbo::Size;

use crate::backend::Backend;
use crate::clock::Clock;
use crate::comment::{Comment, Mode};
use crate::motion::position_x;
use crate::timeline::Timeline;
use crate::trace::{
    AdmitEvent, ExpireEvent, ExpireReason, PlaceEvent, TickEvent, TickSummary, Tracer,
};
use crate::track::{TrackAllocator, TrackParams};

/// Display duration before the first layout, in seconds.
pub const DEFAULT_DURATION: f64 = 4.0;

/// Live comment set, lane state and layout.
#[derive(Clone, Debug)]
pub struct FrameScheduler {
    live: Vec<Comment>,
    tracks: TrackAllocator,
    viewport: Size,
    duration: f64,
    frame_index: u64,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    /// Creates a scheduler with an empty live set and a zero viewport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: Vec::new(),
            tracks: TrackAllocator::new(),
            viewport: Size::ZERO,
            duration: DEFAULT_DURATION,
            frame_index: 0,
        }
    }

    /// Comments currently live, in admission order.
    #[must_use]
    pub fn live(&self) -> &[Comment] {
        &self.live
    }

    /// Lane state.
    #[must_use]
    pub fn tracks(&self) -> &TrackAllocator {
        &self.tracks
    }

    /// Viewport size.
    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Display duration `D`: seconds for a scrolling comment to cross the
    /// viewport at rate 1.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of frames run so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Sets the viewport and derives the display duration as
    /// `width / speed`.
    ///
    /// Lane state is left alone; the allocator rebuilds a table on its own
    /// when the lane count changes.
    pub fn set_layout(&mut self, viewport: Size, speed: f64) {
        self.viewport = viewport;
        self.duration = viewport.width / speed;
    }

    /// Removes every live comment through [`Backend::clear`] and discards
    /// all lane state.
    pub fn clear<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        backend.clear(&self.live);
        self.live.clear();
        self.tracks.reset();
    }

    /// Re-anchors every live comment's arrival to the bound media position.
    ///
    /// Does nothing on an unbound clock.
    pub fn resync(&mut self, clock: &Clock) {
        if !clock.is_bound() {
            return;
        }
        for comment in &mut self.live {
            comment.arrival = clock.arrival_for(comment.show_time());
        }
    }

    /// Runs one frame.
    pub fn tick<B: Backend + ?Sized>(
        &mut self,
        clock: &Clock,
        timeline: &mut Timeline,
        backend: &mut B,
        tracer: &mut Tracer<'_>,
    ) -> TickSummary {
        backend.framing();

        let now = clock.now();
        let current_time = clock.current_time();
        let rate = clock.playback_rate();
        self.frame_index += 1;
        let frame_index = self.frame_index;
        let mut summary = TickSummary {
            frame_index,
            now,
            current_time,
            ..TickSummary::default()
        };
        tracer.tick(&TickEvent {
            frame_index,
            now,
            current_time,
            rate,
            live: self.live.len(),
        });

        for i in (0..self.live.len()).rev() {
            let comment = &self.live[i];
            let elapsed = current_time - clock.timestamp_of(comment);
            let Some(reason) = self.expiry(comment, elapsed) else {
                continue;
            };
            let comment = self.live.remove(i);
            backend.remove(&comment);
            summary.expired += 1;
            tracer.expire(&ExpireEvent {
                frame_index,
                id: comment.id(),
                mode: comment.mode(),
                elapsed,
                reason,
            });
        }

        let mut indices = Vec::new();
        let mut batch = Vec::new();
        let mut drain = timeline.drain(clock, current_time, self.duration);
        for (index, mut comment) in drain.by_ref() {
            if clock.is_bound() {
                comment.arrival = clock.arrival_for(comment.show_time());
            }
            tracer.admit(&AdmitEvent {
                frame_index,
                id: comment.id(),
                mode: comment.mode(),
                timestamp: clock.timestamp_of(&comment),
            });
            indices.push(index);
            batch.push(comment);
        }
        summary.skipped = drain.skipped();
        summary.admitted = batch.len();

        if !batch.is_empty() {
            backend.setup(&mut batch);
        }

        let params = TrackParams {
            current_time,
            duration: self.duration,
            viewport: self.viewport,
        };
        for (index, mut comment) in indices.into_iter().zip(batch) {
            let size = comment.size().unwrap_or(Size::ZERO);
            if comment.size().is_some() {
                timeline.record_size(index, size);
            }
            let start_time = clock.timestamp_of(&comment);
            let placement = self
                .tracks
                .allocate(comment.mode(), start_time, size, &params);
            comment.y = placement.map(|p| p.y);
            if placement.is_some() {
                summary.placed += 1;
            } else {
                summary.dropped += 1;
                tracing::trace!(id = comment.id().get(), mode = %comment.mode(), "no free lane");
            }
            tracer.place(&PlaceEvent {
                frame_index,
                id: comment.id(),
                mode: comment.mode(),
                lane: placement.map(|p| p.lane),
                y: comment.y,
            });
            self.live.push(comment);
        }

        let width = self.viewport.width;
        for comment in &mut self.live {
            if comment.y.is_none() {
                continue;
            }
            let progress = (current_time - clock.timestamp_of(comment)) / self.duration;
            comment.x = position_x(comment.mode(), width, comment.width(), progress);
            backend.render(comment);
            summary.rendered += 1;
        }

        summary.live = self.live.len();
        tracer.tick_summary(&summary);
        summary
    }

    fn expiry(&self, comment: &Comment, elapsed: f64) -> Option<ExpireReason> {
        let width = self.viewport.width;
        let x = position_x(comment.mode(), width, comment.width(), elapsed / self.duration);
        match comment.mode() {
            Mode::Top | Mode::Bottom => (elapsed > self.duration).then_some(ExpireReason::Elapsed),
            Mode::Ltr => (x > width).then_some(ExpireReason::OffScreen),
            Mode::Rtl => (x + comment.width() < 0.0).then_some(ExpireReason::OffScreen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, HeadlessBackend};
    use crate::clock::{ManualClock, ManualMedia};
    use crate::comment::{CommentId, CommentSpec};
    use alloc::vec;

    struct Rig {
        wall: ManualClock,
        clock: Clock,
        timeline: Timeline,
        backend: HeadlessBackend,
        scheduler: FrameScheduler,
    }

    impl Rig {
        fn unbound(viewport: Size, speed: f64) -> Self {
            let wall = ManualClock::new(0.0);
            let mut scheduler = FrameScheduler::new();
            scheduler.set_layout(viewport, speed);
            Self {
                clock: Clock::unbound(wall.clone()),
                wall,
                timeline: Timeline::new(),
                backend: HeadlessBackend::new(viewport),
                scheduler,
            }
        }

        fn emit(&mut self, id: u64, spec: CommentSpec) -> CommentId {
            let c = Comment::from_spec(CommentId(id), spec, self.clock.now());
            self.timeline.insert(c, &self.clock);
            CommentId(id)
        }

        fn tick(&mut self) -> TickSummary {
            self.scheduler.tick(
                &self.clock,
                &mut self.timeline,
                &mut self.backend,
                &mut Tracer::none(),
            )
        }

        fn live(&self, id: CommentId) -> Option<&Comment> {
            self.scheduler.live().iter().find(|c| c.id() == id)
        }
    }

    #[test]
    fn duration_is_width_over_speed() {
        let mut s = FrameScheduler::new();
        assert_eq!(s.duration(), DEFAULT_DURATION);
        s.set_layout(Size::new(500.0, 300.0), 100.0);
        assert_eq!(s.duration(), 5.0);
    }

    #[test]
    fn emitted_comment_scrolls_across() {
        let mut rig = Rig::unbound(Size::new(500.0, 300.0), 100.0);
        rig.wall.set(-0.001);
        let id = rig.emit(0, CommentSpec::new("abcde"));
        rig.wall.set(0.0);
        rig.tick();
        let c = rig.live(id).unwrap();
        assert_eq!(c.width(), 50.0);
        assert!((c.x() - (500.0 - 0.1)).abs() < 1e-9, "x = {}", c.x());
    }

    #[test]
    fn frame_order_is_framing_remove_setup_render() {
        let mut rig = Rig::unbound(Size::new(100.0, 100.0), 100.0);
        rig.emit(0, CommentSpec::new("a").mode("top"));
        rig.wall.set(0.5);
        rig.tick();
        rig.emit(1, CommentSpec::new("b").mode("top"));
        rig.wall.set(1.2);
        rig.backend.take_calls();
        rig.tick();
        let calls = rig.backend.take_calls();
        let kinds: Vec<&str> = calls
            .iter()
            .map(|c| match c {
                BackendCall::Framing => "framing",
                BackendCall::Remove(_) => "remove",
                BackendCall::Setup(_) => "setup",
                BackendCall::Render(..) => "render",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["framing", "remove", "setup", "render"]);
    }

    #[test]
    fn fixed_comment_expires_after_duration() {
        let mut rig = Rig::unbound(Size::new(400.0, 100.0), 100.0);
        let id = rig.emit(0, CommentSpec::new("x").mode("bottom"));
        rig.wall.set(0.1);
        rig.tick();
        let c = rig.live(id).unwrap();
        assert_eq!(c.x(), 195.0);
        assert_eq!(c.y(), Some(75.0));
        rig.wall.set(4.0);
        assert_eq!(rig.tick().expired, 0, "elapsed == D is still visible");
        rig.wall.set(4.01);
        assert_eq!(rig.tick().expired, 1);
        assert!(rig.scheduler.live().is_empty());
        assert!(!rig.backend.has_visual(id));
    }

    #[test]
    fn scrolling_comments_expire_past_the_far_edge() {
        let mut rig = Rig::unbound(Size::new(100.0, 100.0), 100.0);
        let rtl = rig.emit(0, CommentSpec::new("ab"));
        let ltr = rig.emit(1, CommentSpec::new("ab").mode("ltr"));
        rig.wall.set(0.01);
        assert_eq!(rig.tick().placed, 2);
        // D = 1 s; a 20 px comment needs 1.2 s to fully leave.
        rig.wall.set(1.19);
        assert_eq!(rig.tick().expired, 0);
        rig.wall.set(1.21);
        assert_eq!(rig.tick().expired, 2);
        assert!(rig.live(rtl).is_none() && rig.live(ltr).is_none());
    }

    #[test]
    fn unplaced_comments_stay_live_until_expiry() {
        let mut rig = Rig::unbound(Size::new(100.0, 50.0), 100.0);
        for id in 0..3 {
            rig.emit(id, CommentSpec::new("t").mode("top"));
        }
        rig.wall.set(0.01);
        let summary = rig.tick();
        assert_eq!((summary.placed, summary.dropped), (2, 1));
        let dropped = rig.live(CommentId(2)).unwrap();
        assert_eq!(dropped.y(), None);
        let drew_dropped = rig
            .backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::Render(id, _) if *id == CommentId(2)));
        assert!(!drew_dropped, "unplaced comment must not be rendered");
        assert_eq!(summary.rendered, 2);

        rig.wall.set(1.02);
        assert_eq!(rig.tick().expired, 3);
    }

    #[test]
    fn expiry_is_monotonic_in_time() {
        let mut rig = Rig::unbound(Size::new(200.0, 100.0), 100.0);
        let id = rig.emit(0, CommentSpec::new("abc"));
        rig.wall.set(0.01);
        rig.tick();
        let comment = rig.live(id).unwrap().clone();
        let mut seen = false;
        for step in 0..400 {
            let elapsed = f64::from(step) * 0.01;
            let expired = rig.scheduler.expiry(&comment, elapsed).is_some();
            assert!(!seen || expired, "expiry reverted at {elapsed}");
            seen |= expired;
        }
        assert!(seen);
    }

    #[test]
    fn setup_receives_whole_batch_once() {
        let mut rig = Rig::unbound(Size::new(500.0, 300.0), 100.0);
        for id in 0..3 {
            rig.emit(id, CommentSpec::new("x"));
        }
        rig.wall.set(0.1);
        rig.tick();
        let setups: Vec<_> = rig
            .backend
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::Setup(_)))
            .collect();
        assert_eq!(
            setups,
            vec![&BackendCall::Setup(vec![CommentId(0), CommentId(1), CommentId(2)])]
        );
    }

    #[test]
    fn bound_admission_anchors_arrival_to_media() {
        let media = ManualMedia::new();
        let wall = ManualClock::new(1000.0);
        let clock = Clock::bound(wall.clone(), media.clone());
        let mut timeline = Timeline::new();
        timeline.load(vec![Comment::from_spec(
            CommentId(0),
            CommentSpec::new("late").at(2.0),
            0.0,
        )]);
        let mut backend = HeadlessBackend::new(Size::new(500.0, 300.0));
        let mut scheduler = FrameScheduler::new();
        scheduler.set_layout(Size::new(500.0, 300.0), 100.0);

        media.set_time(3.0);
        scheduler.tick(&clock, &mut timeline, &mut backend, &mut Tracer::none());
        let c = &scheduler.live()[0];
        assert_eq!(c.arrival(), 999.0, "one media second already elapsed");
        assert_eq!(c.x(), 400.0);
        assert_eq!(
            timeline.comments()[0].size(),
            Some(Size::new(40.0, 25.0)),
            "measured size persisted"
        );
    }

    #[test]
    fn resync_follows_media_after_pause() {
        let media = ManualMedia::new();
        let wall = ManualClock::new(0.0);
        let clock = Clock::bound(wall.clone(), media.clone());
        let mut timeline = Timeline::new();
        timeline.load(vec![Comment::from_spec(
            CommentId(0),
            CommentSpec::new("x").at(0.5),
            0.0,
        )]);
        let mut backend = HeadlessBackend::new(Size::new(500.0, 300.0));
        let mut scheduler = FrameScheduler::new();
        scheduler.set_layout(Size::new(500.0, 300.0), 100.0);
        media.set_time(1.0);
        wall.set(1.0);
        scheduler.tick(&clock, &mut timeline, &mut backend, &mut Tracer::none());

        // Wall time moves on while the media is paused.
        wall.set(50.0);
        scheduler.resync(&clock);
        scheduler.tick(&clock, &mut timeline, &mut backend, &mut Tracer::none());
        let c = &scheduler.live()[0];
        assert_eq!(c.arrival(), 49.5);
        assert_eq!(c.x(), 450.0);
    }

    #[test]
    fn bound_motion_follows_media_across_rate_changes() {
        let media = ManualMedia::new();
        let wall = ManualClock::new(0.0);
        let clock = Clock::bound(wall.clone(), media.clone());
        let mut timeline = Timeline::new();
        timeline.load(vec![Comment::from_spec(
            CommentId(0),
            CommentSpec::new("x").at(0.5),
            0.0,
        )]);
        let mut backend = HeadlessBackend::new(Size::new(500.0, 300.0));
        let mut scheduler = FrameScheduler::new();
        scheduler.set_layout(Size::new(500.0, 300.0), 100.0);
        let mut tick = |scheduler: &mut FrameScheduler| {
            scheduler.tick(&clock, &mut timeline, &mut backend, &mut Tracer::none());
            scheduler.live()[0].x()
        };

        media.set_rate(2.0);
        media.set_time(1.0);
        assert_eq!(tick(&mut scheduler), 450.0);

        // Half a wall second at rate 2 is one media second.
        wall.advance(0.5);
        media.advance(0.5);
        assert_eq!(tick(&mut scheduler), 350.0);

        // Slowing down keeps the position and the speed per media second.
        media.set_rate(0.5);
        assert_eq!(tick(&mut scheduler), 350.0);
        wall.advance(2.0);
        media.advance(2.0);
        assert_eq!(tick(&mut scheduler), 250.0);
    }

    #[test]
    fn clear_resets_live_set_and_lanes() {
        let mut rig = Rig::unbound(Size::new(500.0, 300.0), 100.0);
        rig.emit(0, CommentSpec::new("x").mode("top"));
        rig.wall.set(0.1);
        rig.tick();
        assert!(!rig.scheduler.tracks().lanes(Mode::Top).is_empty());
        rig.scheduler.clear(&mut rig.backend);
        assert!(rig.scheduler.live().is_empty());
        assert!(rig.scheduler.tracks().lanes(Mode::Top).is_empty());
        assert_eq!(rig.backend.visual_count(), 0);
    }

    #[test]
    fn identical_clock_readings_draw_identical_frames() {
        let mut rig = Rig::unbound(Size::new(500.0, 300.0), 100.0);
        rig.emit(0, CommentSpec::new("one"));
        rig.emit(1, CommentSpec::new("two").mode("ltr"));
        rig.wall.set(0.7);
        rig.tick();
        let first: Vec<_> = rig.scheduler.live().iter().map(Comment::position).collect();
        rig.tick();
        let second: Vec<_> = rig.scheduler.live().iter().map(Comment::position).collect();
        assert_eq!(first, second);
    }
}
