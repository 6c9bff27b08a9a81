// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backends for danmaku.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`DomBackend`]: one positioned `<div>` per comment
//! - [`CanvasBackend`]: comments pre-rasterized and blitted onto a `<canvas>`
//! - [`RafTickPort`]: `requestAnimationFrame` (or `setTimeout`) frame pacing
//! - [`ElementClock`] and [`MediaBinding`]: synchronization with a `<video>`
//!   or `<audio>` element
//! - [`Player`]: all of the above wired to one engine

#![no_std]

extern crate alloc;

mod canvas;
mod dom;
mod media;
mod player;
mod raf;
pub mod style;

pub use canvas::CanvasBackend;
pub use danmaku_core::backend::Backend;
pub use dom::DomBackend;
pub use media::{ElementClock, MediaBinding, PerformanceClock};
pub use player::{Player, WebDanmaku};
pub use raf::{FrameSource, RafTickPort, TIMEOUT_INTERVAL_MS};

/// Returns the current time from `performance.now()`, in seconds.
#[must_use]
pub fn now() -> f64 {
    raf::performance_now() / 1000.0
}
