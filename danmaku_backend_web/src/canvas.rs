// Copyright 2026 the Danmaku Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 2D canvas backend.
//!
//! Every admitted comment is rasterized once into its own offscreen canvas.
//! Each frame the stage is cleared in [`Backend::framing`] and every placed
//! comment is blitted at its position. Both the stage and the offscreen
//! canvases are scaled by the device pixel ratio.

use alloc::collections::BTreeMap;
use alloc::format;

use danmaku_core::Size;
use danmaku_core::backend::Backend;
use danmaku_core::comment::{Comment, CommentId};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement};

use crate::style::{FontContext, FontHeightCache, TextStyle, parse_px};

/// A comment rasterized to an offscreen canvas.
struct Sprite {
    canvas: HtmlCanvasElement,
    size: Size,
    anchor: f64,
}

/// Renders comments onto a single `<canvas>`.
pub struct CanvasBackend {
    container: HtmlElement,
    stage: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    dpr: f64,
    viewport: Size,
    fonts: FontContext,
    heights: FontHeightCache,
    sprites: BTreeMap<CommentId, Sprite>,
}

impl core::fmt::Debug for CanvasBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CanvasBackend")
            .field("dpr", &self.dpr)
            .field("viewport", &self.viewport)
            .field("fonts", &self.fonts)
            .field("cached_fonts", &self.heights.len())
            .field("sprites_len", &self.sprites.len())
            .finish_non_exhaustive()
    }
}

impl CanvasBackend {
    /// Creates a backend whose canvas will live inside `container`.
    ///
    /// Reads the device pixel ratio and the computed font sizes of the
    /// document root and the container, which relative `fontSize` values
    /// resolve against.
    pub fn new(container: HtmlElement) -> Result<Self, JsValue> {
        let doc = container
            .owner_document()
            .ok_or_else(|| JsValue::from_str("container has no owner document"))?;
        let stage: HtmlCanvasElement = doc.create_element("canvas")?.unchecked_into();
        let context = context_2d(&stage)?;
        let s = stage.style();
        let _ = s.set_property("position", "relative");
        let _ = s.set_property("pointer-events", "none");

        let window = web_sys::window();
        let dpr = window
            .as_ref()
            .map(web_sys::Window::device_pixel_ratio)
            .filter(|r| *r > 0.0)
            .unwrap_or(1.0);
        let defaults = FontContext::default();
        let computed = |el: Option<web_sys::Element>| -> Option<f64> {
            let style = window.as_ref()?.get_computed_style(&el?).ok()??;
            parse_px(&style.get_property_value("font-size").ok()?)
        };
        let fonts = FontContext {
            root: computed(doc.document_element()).unwrap_or(defaults.root),
            container: computed(Some(container.clone().into())).unwrap_or(defaults.container),
        };

        Ok(Self {
            container,
            stage,
            context,
            dpr,
            viewport: Size::ZERO,
            fonts,
            heights: FontHeightCache::new(),
            sprites: BTreeMap::new(),
        })
    }

    /// Returns a reference to the stage canvas.
    #[must_use]
    pub fn stage(&self) -> &HtmlCanvasElement {
        &self.stage
    }

    /// The device pixel ratio the stage is scaled by.
    #[must_use]
    pub fn device_pixel_ratio(&self) -> f64 {
        self.dpr
    }

    fn rasterize(&mut self, doc: &Document, comment: &mut Comment) -> Result<Sprite, JsValue> {
        let text = TextStyle::from_style(comment.style(), self.fonts);
        let font = text.font();
        self.context.set_font(&font);
        let metrics = self.context.measure_text(comment.text())?;
        let height = self.heights.get_or_measure(&font, || {
            metrics.font_bounding_box_ascent() + metrics.font_bounding_box_descent()
        });
        let measured = Size::new(
            metrics.width() + text.line_width,
            height + text.line_width,
        );
        comment.set_size(measured);
        let size = comment.size().unwrap_or(measured);

        let canvas: HtmlCanvasElement = doc.create_element("canvas")?.unchecked_into();
        let (w, h) = device_pixels(size, self.dpr);
        canvas.set_width(w);
        canvas.set_height(h);
        let ctx = context_2d(&canvas)?;
        ctx.scale(self.dpr, self.dpr)?;
        ctx.set_font(&font);
        ctx.set_text_baseline("top");
        let inset = text.line_width / 2.0;
        if text.line_width > 0.0 {
            ctx.set_line_width(text.line_width);
            ctx.set_stroke_style_str(&text.stroke);
            ctx.stroke_text(comment.text(), inset, inset)?;
        }
        ctx.set_fill_style_str(&text.fill);
        ctx.fill_text(comment.text(), inset, inset)?;

        Ok(Sprite {
            canvas,
            size,
            anchor: text.baseline.anchor(),
        })
    }
}

impl Backend for CanvasBackend {
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
        self.viewport = size;
        let (w, h) = device_pixels(size, self.dpr);
        // Setting the backing size resets the context transform.
        self.stage.set_width(w);
        self.stage.set_height(h);
        let _ = self
            .context
            .set_transform(self.dpr, 0.0, 0.0, self.dpr, 0.0, 0.0);
        let s = self.stage.style();
        let _ = s.set_property("width", &format!("{}px", size.width));
        let _ = s.set_property("height", &format!("{}px", size.height));
    }

    fn clear(&mut self, _comments: &[Comment]) {
        self.sprites.clear();
        self.framing();
    }

    fn framing(&mut self) {
        self.context
            .clear_rect(0.0, 0.0, self.viewport.width, self.viewport.height);
    }

    fn setup(&mut self, batch: &mut [Comment]) {
        let Some(doc) = self.stage.owner_document() else {
            return;
        };
        for comment in batch.iter_mut() {
            match self.rasterize(&doc, comment) {
                Ok(sprite) => {
                    self.sprites.insert(comment.id(), sprite);
                }
                Err(_) => {
                    comment.set_size(Size::ZERO);
                }
            }
        }
    }

    fn render(&mut self, comment: &Comment) {
        let (Some(sprite), Some(position)) = (self.sprites.get(&comment.id()), comment.position())
        else {
            return;
        };
        let _ = self
            .context
            .draw_image_with_html_canvas_element_and_dw_and_dh(
                &sprite.canvas,
                position.x,
                position.y - sprite.anchor * sprite.size.height,
                sprite.size.width,
                sprite.size.height,
            );
    }

    fn remove(&mut self, comment: &Comment) {
        self.sprites.remove(&comment.id());
    }
}

impl Drop for CanvasBackend {
    fn drop(&mut self) {
        self.stage.remove();
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

/// Backing-store size for a CSS size at the given pixel ratio.
fn device_pixels(size: Size, dpr: f64) -> (u32, u32) {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "canvas dimensions are small, non-negative and rounded up"
    )]
    let to_px = |v: f64| (v * dpr).ceil().max(0.0) as u32;
    (to_px(size.width), to_px(size.height))
}
