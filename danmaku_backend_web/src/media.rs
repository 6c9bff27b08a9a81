// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `HTMLMediaElement` clock and event binding.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Event, HtmlMediaElement};

use danmaku_core::clock::{MediaClock, WallClock};
use danmaku_core::engine::MediaEvent;

/// Wall clock backed by `performance.now()`, in seconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerformanceClock;

impl WallClock for PerformanceClock {
    fn now(&self) -> f64 {
        crate::now()
    }
}

/// A [`MediaClock`] that reads a `<video>` or `<audio>` element.
#[derive(Clone, Debug)]
pub struct ElementClock {
    media: HtmlMediaElement,
}

impl ElementClock {
    /// Wraps `media`.
    #[must_use]
    pub fn new(media: HtmlMediaElement) -> Self {
        Self { media }
    }
}

impl MediaClock for ElementClock {
    fn current_time(&self) -> f64 {
        self.media.current_time()
    }

    fn playback_rate(&self) -> f64 {
        self.media.playback_rate()
    }

    fn is_paused(&self) -> bool {
        self.media.paused()
    }
}

type EventClosure = Closure<dyn FnMut(Event)>;

/// Listeners for every [`MediaEvent`] on one media element.
///
/// Dropping the binding, or calling [`unbind`](Self::unbind), removes every
/// listener.
pub struct MediaBinding {
    media: HtmlMediaElement,
    listeners: Vec<(MediaEvent, EventClosure)>,
}

impl MediaBinding {
    /// Subscribes `handler` to `play`, `playing`, `pause`, `waiting` and
    /// `seeking` on `media`.
    ///
    /// On error, listeners added so far are removed again.
    pub fn bind(
        media: &HtmlMediaElement,
        handler: impl FnMut(MediaEvent) + 'static,
    ) -> Result<Self, JsValue> {
        let handler: Rc<RefCell<dyn FnMut(MediaEvent)>> = Rc::new(RefCell::new(handler));
        let mut binding = Self {
            media: media.clone(),
            listeners: Vec::with_capacity(MediaEvent::ALL.len()),
        };
        for event in MediaEvent::ALL {
            let handler = Rc::clone(&handler);
            let closure = Closure::wrap(Box::new(move |_event: Event| {
                handler.borrow_mut()(event);
            }) as Box<dyn FnMut(Event)>);
            media.add_event_listener_with_callback(event.name(), closure.as_ref().unchecked_ref())?;
            binding.listeners.push((event, closure));
        }
        Ok(binding)
    }

    /// The bound element.
    #[must_use]
    pub fn media(&self) -> &HtmlMediaElement {
        &self.media
    }

    /// Removes every listener. Later media events are not delivered.
    pub fn unbind(&mut self) {
        for (event, closure) in self.listeners.drain(..) {
            let _ = self
                .media
                .remove_event_listener_with_callback(event.name(), closure.as_ref().unchecked_ref());
        }
    }
}

impl Drop for MediaBinding {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl core::fmt::Debug for MediaBinding {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MediaBinding")
            .field("media", &"HtmlMediaElement")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
