// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clock adapter.
//!
//! [`Clock`] combines a [`WallClock`] (always present, drives motion) with an
//! optional bound [`MediaClock`] (drives admission and placement):
//!
//! ```text
//! current_time  = media.current_time()   if bound, else wall.now()
//! playback_rate = media.playback_rate()  if bound, else 1
//! ```
//!
//! All reads are side-effect free.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use crate::comment::Comment;

/// An external, seekable, rate-variable time source (e.g. media playback).
pub trait MediaClock {
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Current playback rate (1.0 = real time).
    fn playback_rate(&self) -> f64;

    /// Whether playback is paused.
    fn is_paused(&self) -> bool;
}

/// Monotonic wall-clock source, in seconds.
pub trait WallClock {
    /// Current wall-clock time in seconds.
    fn now(&self) -> f64;
}

/// Time and rate source for the scheduler.
pub struct Clock {
    wall: Box<dyn WallClock>,
    media: Option<Box<dyn MediaClock>>,
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("now", &self.wall.now())
            .field("bound", &self.media.is_some())
            .finish()
    }
}

impl Clock {
    /// Creates a clock with no external time source.
    #[must_use]
    pub fn unbound(wall: impl WallClock + 'static) -> Self {
        Self {
            wall: Box::new(wall),
            media: None,
        }
    }

    /// Creates a clock bound to an external media clock.
    #[must_use]
    pub fn bound(wall: impl WallClock + 'static, media: impl MediaClock + 'static) -> Self {
        Self {
            wall: Box::new(wall),
            media: Some(Box::new(media)),
        }
    }

    /// Wall-clock seconds.
    #[inline]
    #[must_use]
    pub fn now(&self) -> f64 {
        self.wall.now()
    }

    /// Current time: media position when bound, wall-clock otherwise.
    #[must_use]
    pub fn current_time(&self) -> f64 {
        match &self.media {
            Some(media) => media.current_time(),
            None => self.wall.now(),
        }
    }

    /// Current playback rate.
    ///
    /// Always positive: a bound clock reporting a non-positive or non-finite
    /// rate reads as 1.
    #[must_use]
    pub fn playback_rate(&self) -> f64 {
        match &self.media {
            Some(media) => {
                let rate = media.playback_rate();
                if rate > 0.0 && rate.is_finite() {
                    rate
                } else {
                    1.0
                }
            }
            None => 1.0,
        }
    }

    /// Whether an external media clock is attached.
    #[inline]
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.media.is_some()
    }

    /// Whether the bound media clock is paused. Always `false` when unbound.
    #[must_use]
    pub fn is_media_paused(&self) -> bool {
        self.media.as_ref().is_some_and(|m| m.is_paused())
    }

    /// Canonical timestamp of a comment: its show time on a bound clock
    /// (0 when unset), its arrival time otherwise.
    #[must_use]
    pub fn timestamp_of(&self, comment: &Comment) -> f64 {
        if self.is_bound() {
            comment.show_time()
        } else {
            comment.arrival
        }
    }

    /// Wall-clock arrival time that keeps motion continuous for a comment
    /// with the given show time.
    #[must_use]
    pub fn arrival_for(&self, show_time: f64) -> f64 {
        self.now() - (self.current_time() - show_time)
    }

    /// Detaches and returns the media clock, leaving the clock unbound.
    pub fn detach(&mut self) -> Option<Box<dyn MediaClock>> {
        self.media.take()
    }
}

/// A settable wall clock shared between the host and the engine.
///
/// Clones share the same underlying time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Rc<Cell<f64>>);

impl ManualClock {
    /// Creates a clock reading `now` seconds.
    #[must_use]
    pub fn new(now: f64) -> Self {
        Self(Rc::new(Cell::new(now)))
    }

    /// Sets the current time.
    pub fn set(&self, now: f64) {
        self.0.set(now);
    }

    /// Advances the current time by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        self.0.set(self.0.get() + dt);
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> f64 {
        self.0.get()
    }
}

#[derive(Debug)]
struct MediaState {
    time: Cell<f64>,
    rate: Cell<f64>,
    paused: Cell<bool>,
}

/// A settable media clock shared between the host and the engine.
///
/// Clones share the same underlying state. Starts at time 0, rate 1,
/// playing.
#[derive(Clone, Debug)]
pub struct ManualMedia(Rc<MediaState>);

impl Default for ManualMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualMedia {
    /// Creates a playing media clock at time 0 and rate 1.
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(MediaState {
            time: Cell::new(0.0),
            rate: Cell::new(1.0),
            paused: Cell::new(false),
        }))
    }

    /// Jumps to the given position.
    pub fn set_time(&self, time: f64) {
        self.0.time.set(time);
    }

    /// Advances playback by `dt` wall seconds at the current rate. Does
    /// nothing while paused.
    pub fn advance(&self, dt: f64) {
        if !self.0.paused.get() {
            self.0.time.set(self.0.time.get() + dt * self.0.rate.get());
        }
    }

    /// Sets the playback rate.
    pub fn set_rate(&self, rate: f64) {
        self.0.rate.set(rate);
    }

    /// Pauses or resumes playback.
    pub fn set_paused(&self, paused: bool) {
        self.0.paused.set(paused);
    }
}

impl MediaClock for ManualMedia {
    fn current_time(&self) -> f64 {
        self.0.time.get()
    }

    fn playback_rate(&self) -> f64 {
        self.0.rate.get()
    }

    fn is_paused(&self) -> bool {
        self.0.paused.get()
    }
}

/// Wall clock reading seconds since the Unix epoch.
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl WallClock for SystemClock {
    fn now(&self) -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64())
    }
}
