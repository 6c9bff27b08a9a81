// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM element backend.
//!
//! Each live comment is an absolutely positioned `<div>` inside a stage
//! element, moved every frame with a CSS `translate`. Elements are keyed by
//! [`CommentId`] and created in batches through a `DocumentFragment`.

use alloc::collections::BTreeMap;
use alloc::format;

use danmaku_core::Size;
use danmaku_core::backend::Backend;
use danmaku_core::comment::{Comment, CommentId};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use web_sys::{Document, HtmlElement};

use crate::style::css_property_name;

/// Renders comments as positioned DOM elements.
pub struct DomBackend {
    container: HtmlElement,
    stage: HtmlElement,
    elements: BTreeMap<CommentId, HtmlElement>,
}

impl core::fmt::Debug for DomBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomBackend")
            .field("container", &"HtmlElement")
            .field("stage", &"HtmlElement")
            .field("elements_len", &self.elements.len())
            .finish()
    }
}

impl DomBackend {
    /// Creates a backend whose stage will live inside `container`.
    ///
    /// The stage is attached by [`Backend::init`] and detached on drop.
    pub fn new(container: HtmlElement) -> Result<Self, JsValue> {
        let doc = owner_document(&container)?;
        let stage: HtmlElement = doc.create_element("div")?.unchecked_into();
        let s = stage.style();
        let _ = s.set_property("position", "relative");
        let _ = s.set_property("overflow", "hidden");
        let _ = s.set_property("pointer-events", "none");
        Ok(Self {
            container,
            stage,
            elements: BTreeMap::new(),
        })
    }

    /// Returns a reference to the stage element.
    #[must_use]
    pub fn stage(&self) -> &HtmlElement {
        &self.stage
    }

    /// Returns the element showing `id`, if it is live.
    #[must_use]
    pub fn get_element(&self, id: CommentId) -> Option<&HtmlElement> {
        self.elements.get(&id)
    }

    fn create_element(doc: &Document, comment: &Comment) -> Result<HtmlElement, JsValue> {
        let el: HtmlElement = doc.create_element("div")?.unchecked_into();
        el.set_text_content(Some(comment.text()));
        let s = el.style();
        let _ = s.set_property("position", "absolute");
        let _ = s.set_property("left", "0");
        let _ = s.set_property("top", "0");
        let _ = s.set_property("white-space", "pre");
        let _ = s.set_property("will-change", "transform");
        if let Some(style) = comment.style() {
            for (key, value) in style {
                let _ = s.set_property(&css_property_name(key), value);
            }
        }
        Ok(el)
    }
}

impl Backend for DomBackend {
    fn init(&mut self) {
        let _ = self.container.append_child(&self.stage);
    }

    fn container_size(&self) -> Size {
        Size::new(
            f64::from(self.container.offset_width()),
            f64::from(self.container.offset_height()),
        )
    }

    fn resize(&mut self, size: Size) {
        let s = self.stage.style();
        let _ = s.set_property("width", &format!("{}px", size.width));
        let _ = s.set_property("height", &format!("{}px", size.height));
    }

    fn clear(&mut self, _comments: &[Comment]) {
        self.elements.clear();
        self.stage.set_inner_html("");
    }

    fn setup(&mut self, batch: &mut [Comment]) {
        let Ok(doc) = owner_document(&self.stage) else {
            return;
        };
        let fragment = doc.create_document_fragment();
        for comment in batch.iter() {
            if let Ok(el) = Self::create_element(&doc, comment) {
                let _ = fragment.append_child(&el);
                self.elements.insert(comment.id(), el);
            }
        }
        // Elements must be in the document before they can be measured.
        let _ = self.stage.append_child(&fragment);
        for comment in batch.iter_mut() {
            let size = match self.elements.get(&comment.id()) {
                Some(el) => Size::new(f64::from(el.offset_width()), f64::from(el.offset_height())),
                None => Size::ZERO,
            };
            comment.set_size(size);
        }
    }

    fn render(&mut self, comment: &Comment) {
        let (Some(el), Some(position)) = (self.elements.get(&comment.id()), comment.position())
        else {
            return;
        };
        let _ = el.style().set_property(
            "transform",
            &format!("translate({}px, {}px)", position.x, position.y),
        );
    }

    fn remove(&mut self, comment: &Comment) {
        if let Some(el) = self.elements.remove(&comment.id()) {
            el.remove();
        }
    }
}

impl Drop for DomBackend {
    fn drop(&mut self) {
        self.stage.remove();
    }
}

fn owner_document(el: &HtmlElement) -> Result<Document, JsValue> {
    el.owner_document()
        .ok_or_else(|| JsValue::from_str("element has no owner document"))
}
