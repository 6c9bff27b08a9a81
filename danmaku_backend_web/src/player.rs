// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser host wiring.
//!
//! [`Player`] owns an engine with the backend selected by
//! [`Options::engine`], a [`RafTickPort`] that feeds it frames, and (when a
//! media element is given) a [`MediaBinding`] that forwards playback events.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

use danmaku_core::backend::Backend;
use danmaku_core::clock::Clock;
use danmaku_core::comment::{CommentId, CommentSpec};
use danmaku_core::engine::Danmaku;
use danmaku_core::error::ConfigError;
use danmaku_core::options::{EngineKind, Options};
use wasm_bindgen::JsValue;
use web_sys::{HtmlElement, HtmlMediaElement};

use crate::canvas::CanvasBackend;
use crate::dom::DomBackend;
use crate::media::{ElementClock, MediaBinding, PerformanceClock};
use crate::raf::{FrameSource, RafTickPort};

/// The engine type a [`Player`] drives.
pub type WebDanmaku = Danmaku<Box<dyn Backend>, RafTickPort>;

type Shared = Rc<RefCell<Option<WebDanmaku>>>;

/// A comment overlay mounted in the page.
///
/// Tick and media callbacks hold only weak references to the engine, so
/// dropping the player (or calling [`destroy`](Self::destroy)) stops
/// everything.
pub struct Player {
    engine: Shared,
    binding: Option<MediaBinding>,
}

impl core::fmt::Debug for Player {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Player")
            .field(
                "mounted",
                &self.engine.try_borrow().map_or(true, |e| e.is_some()),
            )
            .field("binding", &self.binding)
            .finish()
    }
}

impl Player {
    /// Mounts an overlay in `container`, optionally synchronized to `media`.
    ///
    /// Unless `media` is paused, playback starts right away.
    pub fn mount(
        options: Options,
        container: HtmlElement,
        media: Option<HtmlMediaElement>,
        source: FrameSource,
    ) -> Result<Self, JsValue> {
        let backend: Box<dyn Backend> = match options.engine {
            EngineKind::Dom => Box::new(DomBackend::new(container)?),
            EngineKind::Canvas => Box::new(CanvasBackend::new(container)?),
        };
        let clock = match &media {
            Some(media) => Clock::bound(PerformanceClock, ElementClock::new(media.clone())),
            None => Clock::unbound(PerformanceClock),
        };

        let engine: Shared = Rc::new(RefCell::new(None));
        let weak = Rc::downgrade(&engine);
        let port = RafTickPort::new(source, move |handle| {
            with_engine(&weak, |e| e.on_tick(handle));
        });
        // The first tick is only requested here, never fired, so the engine
        // can be stored afterwards.
        let danmaku = Danmaku::new(options, clock, backend, port);
        *engine.borrow_mut() = Some(danmaku);

        let binding = match media {
            Some(media) => {
                let weak = Rc::downgrade(&engine);
                Some(MediaBinding::bind(&media, move |event| {
                    with_engine(&weak, |e| e.handle_media_event(event));
                })?)
            }
            None => None,
        };

        Ok(Self { engine, binding })
    }

    /// Runs `f` on the engine. Returns `None` once destroyed, or when called
    /// re-entrantly from inside a frame.
    pub fn with<R>(&self, f: impl FnOnce(&mut WebDanmaku) -> R) -> Option<R> {
        with_engine(&Rc::downgrade(&self.engine), f)
    }

    /// Adds a comment.
    pub fn emit(&self, spec: CommentSpec) -> Option<CommentId> {
        self.with(|e| e.emit(spec))
    }

    /// Adds a comment from a JSON object. Malformed payloads are ignored.
    pub fn emit_json(&self, json: &str) -> Option<CommentId> {
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        self.with(|e| e.emit_value(&value)).flatten()
    }

    /// Shows comments again.
    pub fn show(&self) {
        self.with(WebDanmaku::show);
    }

    /// Hides and clears comments.
    pub fn hide(&self) {
        self.with(WebDanmaku::hide);
    }

    /// Resynchronizes with the media position.
    pub fn seek(&self) {
        self.with(WebDanmaku::seek);
    }

    /// Re-reads the container size.
    pub fn resize(&self) {
        self.with(WebDanmaku::resize);
    }

    /// Removes every comment on screen.
    pub fn clear(&self) {
        self.with(WebDanmaku::clear);
    }

    /// Scroll speed in pixels per second.
    #[must_use]
    pub fn speed(&self) -> Option<f64> {
        self.with(|e| e.speed())
    }

    /// Sets the scroll speed. Returns `None` once destroyed.
    pub fn set_speed(&self, speed: f64) -> Option<Result<(), ConfigError>> {
        self.with(|e| e.set_speed(speed))
    }

    /// Whether comments are shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.with(|e| e.is_visible()).unwrap_or(false)
    }

    /// Unbinds media events, stops the frame loop and removes the stage from
    /// the container.
    pub fn destroy(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(mut binding) = self.binding.take() {
            binding.unbind();
        }
        if let Some(engine) = take_engine(&self.engine) {
            // Dropping the backend detaches its stage.
            drop(engine.destroy());
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Takes the engine out of its slot for teardown.
///
/// While a frame or media callback holds the engine the slot cannot be
/// emptied; the engine then lives until that callback's strong reference is
/// released, and its backend and tick port are dropped without `destroy`.
fn take_engine<T>(slot: &RefCell<Option<T>>) -> Option<T> {
    match slot.try_borrow_mut() {
        Ok(mut engine) => engine.take(),
        Err(_) => {
            tracing::warn!("player torn down from inside an engine callback; skipping destroy");
            None
        }
    }
}

fn with_engine<R>(
    weak: &Weak<RefCell<Option<WebDanmaku>>>,
    f: impl FnOnce(&mut WebDanmaku) -> R,
) -> Option<R> {
    let shared = weak.upgrade()?;
    let mut slot = shared.try_borrow_mut().ok()?;
    slot.as_mut().map(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_engine_empties_the_slot_once() {
        let slot = RefCell::new(Some(7_u32));
        assert_eq!(take_engine(&slot), Some(7));
        assert_eq!(take_engine(&slot), None);
    }

    #[test]
    fn take_engine_leaves_a_borrowed_slot_alone() {
        let slot = RefCell::new(Some(7_u32));
        {
            let _in_callback = slot.borrow_mut();
            assert_eq!(take_engine(&slot), None);
        }
        assert_eq!(*slot.borrow(), Some(7), "engine survives for the callback");
    }
}
