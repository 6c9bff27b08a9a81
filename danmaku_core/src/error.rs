// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Nothing on the per-frame path returns an error; these cover configuration
//! and payload parsing at the edges.

use alloc::string::String;

use thiserror::Error;

/// Rejected configuration value.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Scroll speed must be a positive, finite number of pixels per second.
    #[error("speed must be positive and finite, got {0}")]
    InvalidSpeed(f64),
}

/// Malformed comment payload.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    /// The payload was not a JSON object.
    #[error("comment payload is not a record")]
    NotARecord,
    /// The payload was an object but did not deserialize.
    #[error("invalid comment payload: {0}")]
    Json(String),
}
