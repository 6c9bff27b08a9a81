// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` tick port.
//!
//! [`RafTickPort`] turns each [`TickPort::request_tick`] into a single
//! browser callback. When it fires, the port hands the matching
//! [`TickHandle`] to the host callback, which forwards it to
//! [`Danmaku::on_tick`](danmaku_core::engine::Danmaku::on_tick). Hosts
//! without `requestAnimationFrame` (workers, some embedded views) can use
//! [`FrameSource::Timeout`], a `setTimeout` fallback at roughly 60 Hz.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use danmaku_core::tick::{TickHandle, TickPort};

// Direct global bindings instead of `web_sys::Window` methods, so the
// Window object is not fetched on every frame.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);

    #[wasm_bindgen(js_name = "setTimeout")]
    fn set_timeout(callback: &JsValue, delay_ms: f64) -> i32;

    #[wasm_bindgen(js_name = "clearTimeout")]
    fn clear_timeout(id: i32);
}

/// Delay between frames for [`FrameSource::Timeout`], in milliseconds.
pub const TIMEOUT_INTERVAL_MS: f64 = 50.0 / 3.0;

/// Which browser primitive schedules frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameSource {
    /// `requestAnimationFrame`, paced to the display.
    #[default]
    AnimationFrame,
    /// `setTimeout` every [`TIMEOUT_INTERVAL_MS`].
    Timeout,
}

impl FrameSource {
    fn schedule(self, callback: &JsValue) -> i32 {
        match self {
            Self::AnimationFrame => request_animation_frame(callback),
            Self::Timeout => set_timeout(callback, TIMEOUT_INTERVAL_MS),
        }
    }

    fn cancel(self, id: i32) {
        match self {
            Self::AnimationFrame => cancel_animation_frame(id),
            Self::Timeout => clear_timeout(id),
        }
    }
}

type FrameClosure = Closure<dyn FnMut()>;

/// A [`TickPort`] backed by `requestAnimationFrame` or `setTimeout`.
///
/// At most one browser callback is outstanding. Requesting a new tick while
/// one is pending replaces it. Dropping the port cancels the pending
/// callback.
pub struct RafTickPort {
    inner: Rc<PortInner>,
}

struct PortInner {
    source: FrameSource,

    /// The JS closure handed to the browser.
    ///
    /// Holds only a weak reference back to this struct, so dropping the port
    /// frees both.
    closure: RefCell<Option<FrameClosure>>,

    /// Receives each fired handle.
    callback: RefCell<Box<dyn FnMut(TickHandle)>>,

    /// Last handle issued.
    next: Cell<u64>,

    /// The pending handle and the browser id it was scheduled under.
    pending: Cell<Option<(TickHandle, i32)>>,
}

impl RafTickPort {
    /// Creates a port that delivers fired handles to `callback`.
    ///
    /// Nothing is scheduled until the first [`request_tick`](TickPort::request_tick).
    pub fn new(source: FrameSource, callback: impl FnMut(TickHandle) + 'static) -> Self {
        let inner = Rc::new(PortInner {
            source,
            closure: RefCell::new(None),
            callback: RefCell::new(Box::new(callback)),
            next: Cell::new(0),
            pending: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let closure = Closure::wrap(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Some((handle, _)) = inner.pending.take() else {
                return;
            };
            // The callback may request the next tick; that only touches
            // `pending` and `closure`, never `callback`.
            inner.callback.borrow_mut()(handle);
        }) as Box<dyn FnMut()>);
        *inner.closure.borrow_mut() = Some(closure);

        Self { inner }
    }

    /// The frame source in use.
    #[must_use]
    pub fn source(&self) -> FrameSource {
        self.inner.source
    }

    /// Returns `true` while a browser callback is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        let pending = self.inner.pending.get();
        pending.is_some()
    }

    fn cancel_pending(&self) {
        if let Some((_, id)) = self.inner.pending.take() {
            self.inner.source.cancel(id);
        }
    }
}

impl TickPort for RafTickPort {
    fn request_tick(&mut self) -> TickHandle {
        self.cancel_pending();
        let handle = TickHandle(self.inner.next.get() + 1);
        self.inner.next.set(handle.0);
        if let Some(ref closure) = *self.inner.closure.borrow() {
            let id = self.inner.source.schedule(closure.as_ref().unchecked_ref());
            self.inner.pending.set(Some((handle, id)));
        }
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        match self.inner.pending.get() {
            Some((pending, _)) if pending == handle => self.cancel_pending(),
            _ => {}
        }
    }
}

impl Drop for RafTickPort {
    fn drop(&mut self) {
        self.cancel_pending();
        // Drop the JS closure so it doesn't leak.
        self.inner.closure.borrow_mut().take();
    }
}

impl core::fmt::Debug for RafTickPort {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RafTickPort")
            .field("source", &self.inner.source)
            .field("next", &self.inner.next.get())
            .field("pending", &self.inner.pending.get())
            .finish_non_exhaustive()
    }
}
