// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction options.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Deserializer};

use crate::comment::CommentSpec;
use crate::error::{ConfigError, SpecError};

/// Default scroll speed in pixels per second.
pub const DEFAULT_SPEED: f64 = 144.0;

/// Which rendering backend a host should construct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// One positioned element per comment.
    #[default]
    Dom,
    /// Immediate-mode 2D canvas.
    Canvas,
}

impl EngineKind {
    /// Parses a backend name case-insensitively.
    ///
    /// Unknown names select [`EngineKind::Dom`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("canvas") {
            Self::Canvas
        } else {
            Self::Dom
        }
    }
}

impl<'de> Deserialize<'de> for EngineKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Dom, Self::parse))
    }
}

/// Engine construction options.
///
/// Deserializes from JSON with every field optional:
///
/// ```
/// use danmaku_core::options::{EngineKind, Options};
///
/// let options = Options::from_json(r#"{ "speed": 200, "engine": "Canvas" }"#).unwrap();
/// assert_eq!(options.speed, 200.0);
/// assert_eq!(options.engine, EngineKind::Canvas);
/// assert!(options.comments.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Initial timeline.
    pub comments: Vec<CommentSpec>,
    /// Scroll speed in pixels per second.
    pub speed: f64,
    /// Backend selector.
    pub engine: EngineKind,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            comments: Vec::new(),
            speed: DEFAULT_SPEED,
            engine: EngineKind::Dom,
        }
    }
}

impl Options {
    /// Parses options from JSON.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        serde_json::from_str(json).map_err(|e| SpecError::Json(e.to_string()))
    }

    /// Sets the initial timeline.
    #[must_use]
    pub fn with_comments(mut self, comments: Vec<CommentSpec>) -> Self {
        self.comments = comments;
        self
    }

    /// Sets the scroll speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }
}

/// Checks that a scroll speed is usable.
pub fn validate_speed(speed: f64) -> Result<f64, ConfigError> {
    if speed > 0.0 && speed.is_finite() {
        Ok(speed)
    } else {
        Err(ConfigError::InvalidSpeed(speed))
    }
}
