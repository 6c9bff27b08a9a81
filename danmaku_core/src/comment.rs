// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Comment model.
//!
//! A [`Comment`] is a single annotation. It is created from a [`CommentSpec`]
//! (the emit/load payload), gets its [`Mode`] normalized exactly once at
//! creation, and is identified by a [`CommentId`] that backends use to key
//! their visual handles.
//!
//! Measured size is written once by the backend during setup and never
//! recomputed. The current position is owned by the scheduler.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Size};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::SpecError;

/// Backend-interpreted style properties (CSS for DOM, context properties for
/// canvas).
pub type Style = BTreeMap<String, String>;

/// Motion and placement category of a comment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Scrolls from the left edge to the right edge.
    Ltr,
    /// Scrolls from the right edge to the left edge.
    #[default]
    Rtl,
    /// Fixed, horizontally centered, lanes numbered from the top.
    Top,
    /// Fixed, horizontally centered, lanes numbered from the bottom.
    Bottom,
}

impl Mode {
    /// All modes, in lane-table order.
    pub const ALL: [Self; 4] = [Self::Ltr, Self::Rtl, Self::Top, Self::Bottom];

    /// Normalizes a raw mode string.
    ///
    /// Matches `ltr`, `top` and `bottom` case-insensitively; everything else
    /// (including `rtl`, empty, or garbage) becomes [`Mode::Rtl`].
    #[must_use]
    pub fn format(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("ltr") => Self::Ltr,
            Some(s) if s.eq_ignore_ascii_case("top") => Self::Top,
            Some(s) if s.eq_ignore_ascii_case("bottom") => Self::Bottom,
            _ => Self::Rtl,
        }
    }

    /// Returns `true` for the horizontally scrolling modes.
    #[inline]
    #[must_use]
    pub const fn is_scrolling(self) -> bool {
        matches!(self, Self::Ltr | Self::Rtl)
    }

    /// Index into per-mode tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Ltr => 0,
            Self::Rtl => 1,
            Self::Top => 2,
            Self::Bottom => 3,
        }
    }

    /// Lowercase name, as accepted by [`Mode::format`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a comment within one engine instance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommentId(pub(crate) u64);

impl CommentId {
    /// Returns the raw id value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Rebuilds an id from a value returned by [`get`](Self::get), e.g. when
    /// decoding a recording.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommentId({})", self.0)
    }
}

/// Emit/load payload for a comment.
///
/// Every field is optional on the wire. `mode` is kept raw here and
/// normalized when the [`Comment`] is created. Non-string `text` values are
/// stringified; a missing or `null` text becomes empty.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommentSpec {
    /// Text content.
    #[serde(deserialize_with = "lenient_text")]
    pub text: String,
    /// Raw mode string.
    pub mode: Option<String>,
    /// Show time in seconds on the bound media timeline.
    pub time: Option<f64>,
    /// Backend style properties.
    pub style: Option<Style>,
}

impl CommentSpec {
    /// Creates a spec with the given text and all other fields unset.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Sets the raw mode string.
    #[must_use]
    pub fn mode(mut self, mode: &str) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Sets the show time.
    #[must_use]
    pub fn at(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    /// Adds one style property.
    #[must_use]
    pub fn style(mut self, key: &str, value: &str) -> Self {
        self.style
            .get_or_insert_with(Style::new)
            .insert(key.into(), value.into());
        self
    }

    /// Parses a payload from a JSON value.
    ///
    /// Anything other than a JSON object is rejected with
    /// [`SpecError::NotARecord`].
    pub fn from_value(value: &Value) -> Result<Self, SpecError> {
        if !value.is_object() {
            return Err(SpecError::NotARecord);
        }
        Self::deserialize(value).map_err(|e| SpecError::Json(e.to_string()))
    }

    /// Parses a JSON array of payloads, e.g. a saved timeline.
    pub fn parse_list(json: &str) -> Result<Vec<Self>, SpecError> {
        serde_json::from_str(json).map_err(|e| SpecError::Json(e.to_string()))
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}

/// A single comment instance.
#[derive(Clone, Debug)]
pub struct Comment {
    id: CommentId,
    text: Rc<str>,
    mode: Mode,
    time: Option<f64>,
    style: Option<Rc<Style>>,
    /// Wall-clock seconds at which motion starts.
    pub(crate) arrival: f64,
    size: Option<Size>,
    pub(crate) x: f64,
    /// Vertical coordinate of the assigned lane; `None` when allocation
    /// failed or has not run.
    pub(crate) y: Option<f64>,
}

impl Comment {
    pub(crate) fn from_spec(id: CommentId, spec: CommentSpec, arrival: f64) -> Self {
        Self {
            id,
            text: spec.text.into(),
            mode: Mode::format(spec.mode.as_deref()),
            time: spec.time,
            style: spec.style.map(Rc::new),
            arrival,
            size: None,
            x: 0.0,
            y: None,
        }
    }

    /// Returns the comment's identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> CommentId {
        self.id
    }

    /// Returns the text content.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the normalized mode.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the show time, if any.
    #[inline]
    #[must_use]
    pub fn time(&self) -> Option<f64> {
        self.time
    }

    /// Show time used for timeline ordering. Missing show times sort as 0.
    #[inline]
    #[must_use]
    pub fn show_time(&self) -> f64 {
        self.time.unwrap_or(0.0)
    }

    pub(crate) fn set_time(&mut self, time: f64) {
        self.time = Some(time);
    }

    /// Returns the style properties, if any.
    #[must_use]
    pub fn style(&self) -> Option<&Style> {
        self.style.as_deref()
    }

    /// Returns the wall-clock time at which motion starts.
    #[inline]
    #[must_use]
    pub fn arrival(&self) -> f64 {
        self.arrival
    }

    /// Returns the measured size, once a backend has set it.
    #[inline]
    #[must_use]
    pub fn size(&self) -> Option<Size> {
        self.size
    }

    /// Measured width, or zero before measurement.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.size.map_or(0.0, |s| s.width)
    }

    /// Measured height, or zero before measurement.
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.size.map_or(0.0, |s| s.height)
    }

    /// Records the measured size.
    ///
    /// The first assignment wins; later calls are ignored and return `false`.
    pub fn set_size(&mut self, size: Size) -> bool {
        if self.size.is_some() {
            return false;
        }
        self.size = Some(size);
        true
    }

    /// Current horizontal coordinate.
    #[inline]
    #[must_use]
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Lane coordinate, or `None` if the comment was not placed.
    #[inline]
    #[must_use]
    pub fn y(&self) -> Option<f64> {
        self.y
    }

    /// Current on-screen position, or `None` if the comment is not rendered.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        self.y.map(|y| Point::new(self.x, y))
    }
}
