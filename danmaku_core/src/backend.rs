// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for rendering integrations.
//!
//! The engine never draws. Each rendering integration implements
//! [`Backend`] and owns one visual handle per live comment, keyed by
//! [`CommentId`]. The engine calls into the backend at fixed points of the
//! frame loop:
//!
//! ```text
//! construction: init, resize
//! every tick:   framing, remove*, setup(batch), render*
//! lifecycle:    clear (seek, hide, clear, destroy), resize
//! ```
//!
//! [`HeadlessBackend`] measures text with fixed per-character metrics and
//! records every call, for tests and offline simulation.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Point, Size};

use crate::comment::{Comment, CommentId};

/// Draws comments for the engine.
///
/// # Frame loop pseudocode
///
/// ```rust,ignore
/// fn tick(backend: &mut impl Backend) {
///     backend.framing();
///     for expired in live.drain_expired() {
///         backend.remove(&expired);
///     }
///     backend.setup(&mut admitted); // measures each comment
///     for comment in live.placed() {
///         backend.render(comment);
///     }
/// }
/// ```
pub trait Backend {
    /// Prepares the stage. Called once, before the first [`resize`](Self::resize).
    fn init(&mut self) {}

    /// Current size of the container the stage lives in.
    fn container_size(&self) -> Size;

    /// Adjusts the stage to the given size.
    fn resize(&mut self, size: Size);

    /// Removes every visual for `comments` and wipes the stage.
    fn clear(&mut self, comments: &[Comment]);

    /// Per-tick surface preparation.
    fn framing(&mut self) {}

    /// Creates visual handles for a batch of newly admitted comments.
    ///
    /// Must call [`Comment::set_size`] on every comment whose size is unset.
    fn setup(&mut self, batch: &mut [Comment]);

    /// Shows `comment` at its current position.
    fn render(&mut self, comment: &Comment);

    /// Destroys the visual handle for `comment`.
    fn remove(&mut self, comment: &Comment);
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn init(&mut self) {
        (**self).init();
    }

    fn container_size(&self) -> Size {
        (**self).container_size()
    }

    fn resize(&mut self, size: Size) {
        (**self).resize(size);
    }

    fn clear(&mut self, comments: &[Comment]) {
        (**self).clear(comments);
    }

    fn framing(&mut self) {
        (**self).framing();
    }

    fn setup(&mut self, batch: &mut [Comment]) {
        (**self).setup(batch);
    }

    fn render(&mut self, comment: &Comment) {
        (**self).render(comment);
    }

    fn remove(&mut self, comment: &Comment) {
        (**self).remove(comment);
    }
}

/// A backend call recorded by [`HeadlessBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    /// [`Backend::init`].
    Init,
    /// [`Backend::resize`] with the new size.
    Resize(Size),
    /// [`Backend::clear`] with the number of comments cleared.
    Clear(usize),
    /// [`Backend::framing`].
    Framing,
    /// [`Backend::setup`] with the batch, in order.
    Setup(Vec<CommentId>),
    /// [`Backend::render`] with the drawn position.
    Render(CommentId, Point),
    /// [`Backend::remove`].
    Remove(CommentId),
}

/// A backend with no surface.
///
/// Text is measured as `chars * char_width` by `line_height`. Visual handles
/// are entries in a map from [`CommentId`] to the last rendered position
/// (`None` until first rendered).
#[derive(Clone, Debug)]
pub struct HeadlessBackend {
    container: Size,
    stage: Size,
    char_width: f64,
    line_height: f64,
    visuals: BTreeMap<CommentId, Option<Point>>,
    calls: Vec<BackendCall>,
    record: bool,
}

impl HeadlessBackend {
    /// Creates a backend whose container has the given size.
    ///
    /// Defaults to 10 px per character and a 25 px line height.
    #[must_use]
    pub fn new(container: Size) -> Self {
        Self {
            container,
            stage: Size::ZERO,
            char_width: 10.0,
            line_height: 25.0,
            visuals: BTreeMap::new(),
            calls: Vec::new(),
            record: true,
        }
    }

    /// Sets the text metrics.
    #[must_use]
    pub fn with_metrics(mut self, char_width: f64, line_height: f64) -> Self {
        self.char_width = char_width;
        self.line_height = line_height;
        self
    }

    /// Disables the call log, for long simulations.
    #[must_use]
    pub fn without_call_log(mut self) -> Self {
        self.record = false;
        self
    }

    /// Changes the container size reported to the engine.
    pub fn set_container_size(&mut self, size: Size) {
        self.container = size;
    }

    /// Current stage size, as last set by [`Backend::resize`].
    #[must_use]
    pub fn stage_size(&self) -> Size {
        self.stage
    }

    /// Size a comment with this text measures to.
    #[must_use]
    pub fn measure(&self, text: &str) -> Size {
        let chars = text.chars().count() as f64;
        Size::new(chars * self.char_width, self.line_height)
    }

    /// Recorded calls, oldest first.
    #[must_use]
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Takes and clears the call log.
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        core::mem::take(&mut self.calls)
    }

    /// Number of live visual handles.
    #[must_use]
    pub fn visual_count(&self) -> usize {
        self.visuals.len()
    }

    /// Whether a visual handle exists for `id`.
    #[must_use]
    pub fn has_visual(&self, id: CommentId) -> bool {
        self.visuals.contains_key(&id)
    }

    /// Last rendered position of `id`.
    #[must_use]
    pub fn rendered_position(&self, id: CommentId) -> Option<Point> {
        self.visuals.get(&id).copied().flatten()
    }

    fn log(&mut self, call: BackendCall) {
        if self.record {
            self.calls.push(call);
        }
    }
}

impl Backend for HeadlessBackend {
    fn init(&mut self) {
        self.log(BackendCall::Init);
    }

    fn container_size(&self) -> Size {
        self.container
    }

    fn resize(&mut self, size: Size) {
        self.stage = size;
        self.log(BackendCall::Resize(size));
    }

    fn clear(&mut self, comments: &[Comment]) {
        self.visuals.clear();
        self.log(BackendCall::Clear(comments.len()));
    }

    fn framing(&mut self) {
        self.log(BackendCall::Framing);
    }

    fn setup(&mut self, batch: &mut [Comment]) {
        for comment in batch.iter_mut() {
            if comment.size().is_none() {
                let size = self.measure(comment.text());
                comment.set_size(size);
            }
            self.visuals.insert(comment.id(), None);
        }
        if self.record {
            self.calls
                .push(BackendCall::Setup(batch.iter().map(Comment::id).collect()));
        }
    }

    fn render(&mut self, comment: &Comment) {
        let Some(position) = comment.position() else {
            return;
        };
        if let Some(slot) = self.visuals.get_mut(&comment.id()) {
            *slot = Some(position);
        }
        self.log(BackendCall::Render(comment.id(), position));
    }

    fn remove(&mut self, comment: &Comment) {
        self.visuals.remove(&comment.id());
        self.log(BackendCall::Remove(comment.id()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::CommentSpec;
    use alloc::vec;

    fn comment(id: u64, text: &str) -> Comment {
        Comment::from_spec(CommentId(id), CommentSpec::new(text), 0.0)
    }

    #[test]
    fn setup_measures_unsized_comments_only() {
        let mut backend = HeadlessBackend::new(Size::new(640.0, 360.0)).with_metrics(8.0, 20.0);
        let mut sized = comment(1, "abc");
        sized.set_size(Size::new(1.0, 2.0));
        let mut batch = vec![comment(0, "hello"), sized];
        backend.setup(&mut batch);
        assert_eq!(batch[0].size(), Some(Size::new(40.0, 20.0)));
        assert_eq!(batch[1].size(), Some(Size::new(1.0, 2.0)));
        assert_eq!(backend.visual_count(), 2);
        assert_eq!(
            backend.calls(),
            &[BackendCall::Setup(vec![CommentId(0), CommentId(1)])]
        );
    }

    #[test]
    fn unplaced_comments_are_not_drawn() {
        let mut backend = HeadlessBackend::new(Size::new(640.0, 360.0));
        let mut batch = vec![comment(0, "x")];
        backend.setup(&mut batch);
        backend.take_calls();
        backend.render(&batch[0]);
        assert!(backend.calls().is_empty());
        assert_eq!(backend.rendered_position(CommentId(0)), None);
    }

    #[test]
    fn remove_and_clear_drop_visuals() {
        let mut backend = HeadlessBackend::new(Size::new(640.0, 360.0));
        let mut batch = vec![comment(0, "a"), comment(1, "b"), comment(2, "c")];
        backend.setup(&mut batch);
        backend.remove(&batch[1]);
        assert!(!backend.has_visual(CommentId(1)));
        assert_eq!(backend.visual_count(), 2);
        backend.clear(&batch);
        assert_eq!(backend.visual_count(), 0);
    }

    #[test]
    fn boxed_backend_forwards() {
        let mut backend: Box<dyn Backend> = Box::new(HeadlessBackend::new(Size::new(3.0, 4.0)));
        backend.resize(Size::new(3.0, 4.0));
        assert_eq!(backend.container_size(), Size::new(3.0, 4.0));
    }
}
