// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Horizontal motion.
//!
//! A scrolling comment travels the viewport width over the display duration.
//! With progress `p = elapsed / duration`:
//!
//! ```text
//! ltr:        x = -w + W * p
//! rtl:        x =  W - W * p
//! top/bottom: x = (W - w) / 2
//! ```
//!
//! where `W` is the viewport width and `w` the comment width. Progress may
//! exceed 1; expiry is decided by the scheduler, not clamped here.

use crate::comment::Mode;

/// Horizontal coordinate of a comment's left edge.
#[must_use]
pub fn position_x(mode: Mode, viewport_width: f64, width: f64, progress: f64) -> f64 {
    match mode {
        Mode::Ltr => -width + viewport_width * progress,
        Mode::Rtl => viewport_width - viewport_width * progress,
        Mode::Top | Mode::Bottom => (viewport_width - width) / 2.0,
    }
}

/// Horizontal extent `[left, right)` occupied at the given progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    /// Left edge.
    pub left: f64,
    /// Right edge.
    pub right: f64,
}

impl Span {
    /// Extent of a comment of `width` at `progress`.
    #[must_use]
    pub fn at(mode: Mode, viewport_width: f64, width: f64, progress: f64) -> Self {
        let left = position_x(mode, viewport_width, width, progress);
        Self {
            left,
            right: left + width,
        }
    }

    /// Whether two extents share any horizontal space.
    #[must_use]
    pub fn overlaps(self, other: Self) -> bool {
        self.left < other.right && other.left < self.right
    }
}
