// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! First-fit lane allocation.
//!
//! The viewport is cut into horizontal lanes, one table per [`Mode`]. The
//! lane height is the height of the comment being placed, so a table is
//! rebuilt whenever a comment of a different height would change the lane
//! count. Each lane remembers only its most recent occupant.
//!
//! A lane is free when:
//!
//! - it has no occupant, or
//! - the occupant's visible window has ended, or
//! - for scrolling modes, the occupant and the incoming comment have
//!   disjoint horizontal extents right now.
//!
//! All times are on the canonical timeline (media time when bound), where a
//! visible window is `D` long. At playback rate `r` that is `D / r` seconds
//! of wall time. Scrolling comments all move at `W / D` pixels per canonical
//! second whatever the rate, so two extents that are disjoint at placement
//! stay disjoint for the rest of the shared window, across rate changes too.
//!
//! Placement is greedy: lanes are scanned in index order and the first free
//! one wins. There is no backtracking, and a comment that finds no lane is
//! never retried.

use alloc::vec::Vec;

use kurbo::Size;

use crate::comment::Mode;
use crate::motion::Span;

/// Footprint of the most recent occupant of a lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lane {
    /// Canonical timestamp at which the occupant started.
    pub start_time: f64,
    /// Canonical time at which the occupant's visible window ends.
    pub end_time: f64,
    /// Occupant width.
    pub width: f64,
    /// Occupant height.
    pub height: f64,
}

impl Lane {
    fn progress(&self, current_time: f64, duration: f64) -> f64 {
        (current_time - self.start_time) / duration
    }
}

/// Frame-level inputs to allocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackParams {
    /// Current time on the canonical timeline.
    pub current_time: f64,
    /// Display duration `D` in canonical seconds.
    pub duration: f64,
    /// Viewport size.
    pub viewport: Size,
}

/// A successful allocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Lane index within the mode's table.
    pub lane: usize,
    /// Vertical coordinate of the lane's top edge.
    pub y: f64,
}

/// Per-mode lane tables.
#[derive(Clone, Debug, Default)]
pub struct TrackAllocator {
    lanes: [Vec<Option<Lane>>; 4],
}

impl TrackAllocator {
    /// Creates an allocator with no lane state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lane table for `mode`. Empty until the first allocation.
    #[must_use]
    pub fn lanes(&self, mode: Mode) -> &[Option<Lane>] {
        &self.lanes[mode.index()]
    }

    /// Discards all lane state for every mode.
    pub fn reset(&mut self) {
        for table in &mut self.lanes {
            table.clear();
        }
    }

    /// Assigns a lane to a comment of `size` starting at `start_time`.
    ///
    /// Returns `None` when every lane is occupied, or when the comment is
    /// taller than the viewport or has no usable height.
    pub fn allocate(
        &mut self,
        mode: Mode,
        start_time: f64,
        size: Size,
        params: &TrackParams,
    ) -> Option<Placement> {
        let height = size.height;
        let viewport_height = params.viewport.height;
        if !(height > 0.0 && height.is_finite() && viewport_height.is_finite()) {
            return None;
        }
        let count = lane_count(viewport_height, height);

        let table = &mut self.lanes[mode.index()];
        if table.len() != count {
            table.clear();
            table.resize(count, None);
        }

        let lane = table
            .iter()
            .position(|lane| is_free(lane.as_ref(), mode, start_time, size.width, params))?;

        table[lane] = Some(Lane {
            start_time,
            end_time: start_time + params.duration,
            width: size.width,
            height,
        });

        let index = lane as f64;
        let y = match mode {
            Mode::Bottom => viewport_height - (index + 1.0) * height,
            _ => index * height,
        };
        Some(Placement { lane, y })
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "float-to-int casts saturate; a negative ratio yields no lanes"
)]
fn lane_count(viewport_height: f64, lane_height: f64) -> usize {
    (viewport_height / lane_height) as usize
}

fn is_free(
    lane: Option<&Lane>,
    mode: Mode,
    start_time: f64,
    width: f64,
    params: &TrackParams,
) -> bool {
    let Some(lane) = lane else {
        return true;
    };
    let ct = params.current_time;
    if ct >= lane.end_time {
        return true;
    }
    if !mode.is_scrolling() {
        return false;
    }
    let duration = params.duration;
    let viewport_width = params.viewport.width;
    let occupant = Span::at(mode, viewport_width, lane.width, lane.progress(ct, duration));
    let incoming = Span::at(mode, viewport_width, width, (ct - start_time) / duration);
    !occupant.overlaps(incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::position_x;

    fn params(ct: f64) -> TrackParams {
        TrackParams {
            current_time: ct,
            duration: 5.0,
            viewport: Size::new(500.0, 100.0),
        }
    }

    #[test]
    fn fixed_lanes_fill_then_fail() {
        let mut tracks = TrackAllocator::new();
        let size = Size::new(40.0, 30.0);
        let p = params(0.0);
        let ys: Vec<Option<f64>> = (0..4)
            .map(|_| tracks.allocate(Mode::Top, 0.0, size, &p).map(|pl| pl.y))
            .collect();
        assert_eq!(ys, [Some(0.0), Some(30.0), Some(60.0), None]);
        assert_eq!(tracks.lanes(Mode::Top).len(), 3);
    }

    #[test]
    fn fixed_lane_frees_after_window() {
        let mut tracks = TrackAllocator::new();
        let size = Size::new(40.0, 50.0);
        for _ in 0..2 {
            tracks.allocate(Mode::Top, 0.0, size, &params(0.0));
        }
        assert_eq!(tracks.allocate(Mode::Top, 4.9, size, &params(4.9)), None);
        let placed = tracks.allocate(Mode::Top, 5.0, size, &params(5.0));
        assert_eq!(placed, Some(Placement { lane: 0, y: 0.0 }));
    }

    #[test]
    fn fixed_lane_window_is_canonical_duration() {
        // At rate 2, media time 2.5 is only halfway through the window.
        let mut tracks = TrackAllocator::new();
        let size = Size::new(40.0, 100.0);
        assert!(tracks.allocate(Mode::Top, 0.0, size, &params(0.0)).is_some());
        assert_eq!(tracks.allocate(Mode::Top, 2.5, size, &params(2.5)), None);
        assert!(tracks.allocate(Mode::Top, 5.0, size, &params(5.0)).is_some());
        let lane = tracks.lanes(Mode::Top)[0].expect("occupied");
        assert_eq!((lane.start_time, lane.end_time), (5.0, 10.0));
    }

    #[test]
    fn wide_occupant_blocks_lane_until_clear() {
        // A 300 px occupant in a 500 px viewport is still across the entry
        // edge at half progress.
        let mut tracks = TrackAllocator::new();
        let wide = Size::new(300.0, 100.0);
        let narrow = Size::new(50.0, 100.0);
        assert!(tracks.allocate(Mode::Rtl, 0.0, wide, &params(0.0)).is_some());
        assert_eq!(tracks.allocate(Mode::Rtl, 2.5, narrow, &params(2.5)), None);
        assert!(tracks.allocate(Mode::Rtl, 3.5, narrow, &params(3.5)).is_some());
    }

    #[test]
    fn bottom_lanes_count_up_from_the_edge() {
        let mut tracks = TrackAllocator::new();
        let size = Size::new(40.0, 30.0);
        let p = params(0.0);
        let a = tracks.allocate(Mode::Bottom, 0.0, size, &p);
        let b = tracks.allocate(Mode::Bottom, 0.0, size, &p);
        assert_eq!(a, Some(Placement { lane: 0, y: 70.0 }));
        assert_eq!(b, Some(Placement { lane: 1, y: 40.0 }));
    }

    #[test]
    fn close_scrolling_comments_take_separate_lanes() {
        let mut tracks = TrackAllocator::new();
        let size = Size::new(100.0, 25.0);
        let first = tracks.allocate(Mode::Rtl, 0.0, size, &params(0.0));
        let second = tracks.allocate(Mode::Rtl, 0.1, size, &params(0.1));
        assert_eq!(first.map(|p| p.lane), Some(0));
        assert_eq!(second.map(|p| p.lane), Some(1));
    }

    #[test]
    fn scrolling_lane_reused_once_occupant_clears_entry() {
        let mut tracks = TrackAllocator::new();
        let size = Size::new(100.0, 25.0);
        tracks.allocate(Mode::Rtl, 0.0, size, &params(0.0));
        // At speed 100 px/s, a 100 px comment has cleared the right edge after 1 s.
        let late = tracks.allocate(Mode::Rtl, 1.0, size, &params(1.0));
        assert_eq!(late.map(|p| p.lane), Some(0));
        let early = tracks.allocate(Mode::Rtl, 1.5, size, &params(1.5));
        assert_eq!(early.map(|p| p.lane), Some(1));
    }

    #[test]
    fn modes_have_independent_tables() {
        let mut tracks = TrackAllocator::new();
        let size = Size::new(100.0, 100.0);
        let p = params(0.0);
        assert!(tracks.allocate(Mode::Rtl, 0.0, size, &p).is_some());
        assert!(tracks.allocate(Mode::Ltr, 0.0, size, &p).is_some());
        assert!(tracks.allocate(Mode::Top, 0.0, size, &p).is_some());
        assert!(tracks.allocate(Mode::Rtl, 0.0, size, &p).is_none());
    }

    #[test]
    fn height_change_rebuilds_table() {
        let mut tracks = TrackAllocator::new();
        let p = params(0.0);
        tracks.allocate(Mode::Top, 0.0, Size::new(10.0, 50.0), &p);
        assert_eq!(tracks.lanes(Mode::Top).len(), 2);
        let placed = tracks.allocate(Mode::Top, 0.0, Size::new(10.0, 20.0), &p);
        assert_eq!(tracks.lanes(Mode::Top).len(), 5);
        assert_eq!(placed.map(|p| p.lane), Some(0), "stale occupancy discarded");
    }

    #[test]
    fn unusable_heights_are_rejected() {
        let mut tracks = TrackAllocator::new();
        let p = params(0.0);
        assert_eq!(tracks.allocate(Mode::Rtl, 0.0, Size::new(10.0, 0.0), &p), None);
        assert_eq!(tracks.allocate(Mode::Rtl, 0.0, Size::new(10.0, 101.0), &p), None);
        assert_eq!(tracks.allocate(Mode::Rtl, 0.0, Size::new(10.0, f64::NAN), &p), None);
    }

    #[test]
    fn reset_forgets_occupants() {
        let mut tracks = TrackAllocator::new();
        let size = Size::new(10.0, 100.0);
        let p = params(0.0);
        tracks.allocate(Mode::Top, 0.0, size, &p);
        tracks.reset();
        assert!(tracks.lanes(Mode::Top).is_empty());
        assert!(tracks.allocate(Mode::Top, 0.0, size, &p).is_some());
    }

    #[test]
    fn shared_lanes_never_overlap() {
        // Arrivals every 0.3 s with varied widths; for each mode, check every
        // pair that landed in the same lane at sampled times in their shared
        // window.
        for mode in [Mode::Rtl, Mode::Ltr] {
            let mut tracks = TrackAllocator::new();
            let mut placed: Vec<(usize, f64, f64)> = Vec::new();
            for i in 0..40_u32 {
                let start = f64::from(i) * 0.3;
                let width = 40.0 + f64::from((i * 37) % 120);
                let size = Size::new(width, 20.0);
                if let Some(pl) = tracks.allocate(mode, start, size, &params(start)) {
                    placed.push((pl.lane, start, width));
                }
            }
            assert!(placed.len() > 10);
            for (i, a) in placed.iter().enumerate() {
                for b in &placed[i + 1..] {
                    if a.0 != b.0 || b.1 >= a.1 + 5.0 {
                        continue;
                    }
                    for step in 0..=20 {
                        let t = b.1 + (a.1 + 5.0 - b.1) * f64::from(step) / 20.0;
                        let sa = Span::at(mode, 500.0, a.2, (t - a.1) / 5.0);
                        let sb = Span::at(mode, 500.0, b.2, (t - b.1) / 5.0);
                        let apart = sa.right <= sb.left + 1e-9 || sb.right <= sa.left + 1e-9;
                        assert!(apart, "{mode} lane {} overlaps at t={t}", a.0);
                    }
                }
            }
        }
    }

    #[test]
    fn incoming_extent_matches_motion() {
        let span = Span::at(Mode::Ltr, 500.0, 80.0, 0.0);
        assert_eq!(span.left, position_x(Mode::Ltr, 500.0, 80.0, 0.0));
        assert_eq!(span.right, 0.0);
    }
}
