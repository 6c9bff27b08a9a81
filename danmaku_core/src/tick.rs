// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame pacing port.
//!
//! The engine never loops on its own. While playing it keeps at most one
//! pending tick request with the host's [`TickPort`]; when the host's refresh
//! callback fires it hands the [`TickHandle`] back to
//! [`Danmaku::on_tick`](crate::engine::Danmaku::on_tick), which runs one
//! frame and requests the next. Pausing cancels the pending request.

/// Identifies one tick request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickHandle(pub u64);

/// Host-provided refresh scheduling.
pub trait TickPort {
    /// Requests a single callback at the next refresh opportunity.
    fn request_tick(&mut self) -> TickHandle;

    /// Cancels a pending request. Unknown or already-fired handles are
    /// ignored.
    fn cancel_tick(&mut self, handle: TickHandle);
}

/// A tick port driven by hand.
///
/// Requests queue up as pending handles; the host decides when to deliver
/// them with [`take_pending`](Self::take_pending).
#[derive(Clone, Debug, Default)]
pub struct ManualTickPort {
    next: u64,
    pending: Option<TickHandle>,
    requested: u64,
    cancelled: u64,
}

impl ManualTickPort {
    /// Creates a port with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The pending request, if any.
    #[must_use]
    pub fn pending(&self) -> Option<TickHandle> {
        self.pending
    }

    /// Removes and returns the pending request, as a refresh callback would.
    pub fn take_pending(&mut self) -> Option<TickHandle> {
        self.pending.take()
    }

    /// Total number of requests made.
    #[must_use]
    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Total number of pending requests cancelled.
    #[must_use]
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl TickPort for ManualTickPort {
    fn request_tick(&mut self) -> TickHandle {
        self.next += 1;
        self.requested += 1;
        let handle = TickHandle(self.next);
        self.pending = Some(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            self.cancelled += 1;
        }
    }
}
