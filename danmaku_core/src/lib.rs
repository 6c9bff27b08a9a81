// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduling and collision-avoidance engine for time-synchronized comment
//! overlays.
//!
//! `danmaku_core` decides, for every animation frame, which comments are
//! visible, which horizontal lane each one occupies, and where it sits on
//! screen. Drawing is delegated to a [`Backend`](backend::Backend); frame
//! pacing is delegated to a [`TickPort`](tick::TickPort). The crate is
//! `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   TickPort (host refresh callback)
//!       │
//!       ▼
//!   Danmaku::on_tick() ──► FrameScheduler::tick()
//!                              │
//!          ┌───────────────────┼──────────────────────┐
//!          ▼                   ▼                      ▼
//!   expire live set    Timeline::drain() ──►   TrackAllocator::allocate()
//!          │                   │                      │
//!          └──────────► Backend::{remove, setup, render} ◄┘
//! ```
//!
//! **[`comment`]**: Comment model, display modes and the emit payload.
//!
//! **[`clock`]**: Clock adapter over an optional bound media clock and a
//! wall clock.
//!
//! **[`timeline`]**: Show-time ordered comment store with a forward-only
//! admission cursor.
//!
//! **[`track`]**: First-fit lane allocator that keeps comments sharing a
//! lane from overlapping.
//!
//! **[`motion`]**: Horizontal position as a function of elapsed progress.
//!
//! **[`scheduler`]**: Per-tick expiry, admission, allocation and motion.
//!
//! **[`engine`]**: Lifecycle controller: play, pause, seek, show, hide,
//! resize, emit and destroy.
//!
//! **[`backend`]**: The [`Backend`](backend::Backend) contract and a
//! headless implementation.
//!
//! **[`tick`]**: The [`TickPort`](tick::TickPort) request/cancel contract.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies and
//!   adds [`SystemClock`](clock::SystemClock).
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod backend;
pub mod clock;
pub mod comment;
pub mod engine;
pub mod error;
pub mod motion;
pub mod options;
pub mod scheduler;
pub mod tick;
pub mod timeline;
pub mod trace;
pub mod track;

pub use kurbo::{Point, Size};
