// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interpretation of per-comment style maps.
//!
//! The DOM backend treats a comment's style as CSS declarations; the canvas
//! backend reads a fixed set of text properties from it. Both accept
//! camel-case keys (`fontSize`) as well as CSS names (`font-size`).

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;

use danmaku_core::comment::Style;

/// Converts a camel-case style key to its CSS property name.
///
/// Keys that are already hyphenated, or all lowercase, pass through.
pub(crate) fn css_property_name(key: &str) -> Cow<'_, str> {
    if !key.bytes().any(|b| b.is_ascii_uppercase()) {
        return Cow::Borrowed(key);
    }
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

/// Parses a leading CSS length in pixels, e.g. `"16px"` → 16.
pub(crate) fn parse_px(raw: &str) -> Option<f64> {
    raw.trim().strip_suffix("px")?.trim().parse().ok()
}

/// Font sizes that relative units resolve against, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontContext {
    /// Computed font size of the document root (`rem`).
    pub root: f64,
    /// Computed font size of the container (`em` and `%`).
    pub container: f64,
}

impl Default for FontContext {
    fn default() -> Self {
        Self {
            root: 16.0,
            container: 16.0,
        }
    }
}

impl FontContext {
    /// Resolves a font size with an optional `px`, `%`, `em` or `rem` unit.
    ///
    /// A bare number is pixels. Returns `None` when no number can be read.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<f64> {
        let raw = raw.trim();
        let split = raw
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(raw.len());
        let (number, unit) = raw.split_at(split);
        let size: f64 = number.parse().ok()?;
        Some(match unit.trim() {
            "%" => size / 100.0 * self.container,
            "em" => size * self.container,
            "rem" => size * self.root,
            _ => size,
        })
    }
}

/// Vertical anchor of the rasterized text relative to the lane coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Baseline {
    /// Text hangs below the lane coordinate.
    #[default]
    Top,
    /// Text is centered on the lane coordinate.
    Middle,
    /// Text sits on the lane coordinate.
    Bottom,
}

impl Baseline {
    /// Fraction of the text height to shift upward when drawing.
    #[must_use]
    pub fn anchor(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Middle => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

/// Text drawing properties for the canvas backend.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels.
    pub font_size: f64,
    /// CSS font family list.
    pub font_family: String,
    /// Fill color.
    pub fill: String,
    /// Stroke color.
    pub stroke: String,
    /// Stroke width in pixels; zero disables the stroke.
    pub line_width: f64,
    /// Vertical anchor.
    pub baseline: Baseline,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            font_family: "sans-serif".into(),
            fill: "#000000".into(),
            stroke: "#000000".into(),
            line_width: 0.0,
            baseline: Baseline::Top,
        }
    }
}

impl TextStyle {
    /// Reads the text properties out of a comment style map.
    ///
    /// Recognized keys are `fontSize`, `fontFamily`, `fill` (or
    /// `fillStyle`), `strokeStyle`, `lineWidth` and `textBaseline`. Unknown
    /// keys are ignored and unreadable values keep their defaults.
    #[must_use]
    pub fn from_style(style: Option<&Style>, fonts: FontContext) -> Self {
        let mut text = Self::default();
        let Some(style) = style else {
            return text;
        };
        let get = |camel: &str| lookup(style, camel);
        if let Some(size) = get("fontSize").and_then(|v| fonts.resolve(v)) {
            text.font_size = size;
        }
        if let Some(family) = get("fontFamily") {
            text.font_family = family.into();
        }
        if let Some(fill) = get("fill").or_else(|| get("fillStyle")) {
            text.fill = fill.into();
        }
        if let Some(stroke) = get("strokeStyle") {
            text.stroke = stroke.into();
        }
        if let Some(width) = get("lineWidth").and_then(|v| v.trim().parse::<f64>().ok()) {
            text.line_width = width.max(0.0);
        }
        text.baseline = match get("textBaseline") {
            Some("middle") => Baseline::Middle,
            Some("bottom") => Baseline::Bottom,
            _ => Baseline::Top,
        };
        text
    }

    /// The CSS `font` shorthand for this style.
    #[must_use]
    pub fn font(&self) -> String {
        format!("{}px {}", self.font_size, self.font_family)
    }
}

fn lookup<'a>(style: &'a Style, camel: &str) -> Option<&'a str> {
    style
        .get(camel)
        .or_else(|| style.get(css_property_name(camel).as_ref()))
        .map(String::as_str)
}

/// Line heights per CSS font, measured once per font.
#[derive(Clone, Debug, Default)]
pub struct FontHeightCache {
    heights: BTreeMap<String, f64>,
}

impl FontHeightCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached height for `font`, measuring it on first use.
    pub fn get_or_measure(&mut self, font: &str, measure: impl FnOnce() -> f64) -> f64 {
        if let Some(height) = self.heights.get(font) {
            return *height;
        }
        let height = measure();
        self.heights.insert(font.into(), height);
        height
    }

    /// Number of fonts measured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    /// Returns `true` if nothing has been measured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}
