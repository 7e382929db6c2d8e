// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Canvas`] over a tiny-skia pixmap.

use kurbo::{Affine, BezPath, Circle, PathEl, Point, Rect, RoundedRect, Shape};
use lamina_core::canvas::{Canvas, Color, Image, Paint, PaintStyle, glyph_advance};
use tiny_skia::{
    FillRule, FilterQuality, Mask, PathBuilder, Pattern, Pixmap, PixmapRef, SpreadMode, Stroke,
    Transform,
};

const TOLERANCE: f64 = 0.1;

#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia works in f32; canvas coordinates fit comfortably"
)]
fn f32_of(v: f64) -> f32 {
    v as f32
}

fn to_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs().map(f32_of);
    Transform::from_row(a, b, c, d, e, f)
}

fn to_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn to_paint(paint: &Paint) -> tiny_skia::Paint<'static> {
    let mut out = tiny_skia::Paint::default();
    out.set_color(to_color(paint.color));
    out.anti_alias = paint.anti_alias;
    out
}

/// Converts a kurbo path. Returns `None` for paths tiny-skia rejects, such
/// as empty ones.
fn to_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(f32_of(p.x), f32_of(p.y)),
            PathEl::LineTo(p) => builder.line_to(f32_of(p.x), f32_of(p.y)),
            PathEl::QuadTo(p1, p2) => {
                builder.quad_to(f32_of(p1.x), f32_of(p1.y), f32_of(p2.x), f32_of(p2.y));
            }
            PathEl::CurveTo(p1, p2, p3) => builder.cubic_to(
                f32_of(p1.x),
                f32_of(p1.y),
                f32_of(p2.x),
                f32_of(p2.y),
                f32_of(p3.x),
                f32_of(p3.y),
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

fn is_integer_translation(affine: Affine) -> bool {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0 && e.fract() == 0.0 && f.fract() == 0.0
}

#[derive(Clone)]
struct State {
    transform: Affine,
    clip: Option<Mask>,
}

/// A software canvas drawing into an RGBA pixmap.
///
/// Clips are kept as anti-aliased coverage masks, so clipping to
/// pixel-aligned rectangles is exact. Text is drawn as one box per glyph
/// using the placeholder metrics from [`lamina_core::canvas::text_bounds`].
pub struct SkiaCanvas {
    pixmap: Pixmap,
    state: State,
    stack: Vec<State>,
}

impl std::fmt::Debug for SkiaCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkiaCanvas")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("transform", &self.state.transform)
            .field("clipped", &self.state.clip.is_some())
            .field("save_count", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl SkiaCanvas {
    /// Creates a transparent canvas, or `None` if the size is zero or too
    /// large.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            pixmap: Pixmap::new(width, height)?,
            state: State {
                transform: Affine::IDENTITY,
                clip: None,
            },
            stack: Vec::new(),
        })
    }

    /// The backing pixmap.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Drops every saved state, the transform, and the clip. Pixels are
    /// kept.
    pub fn reset_state(&mut self) {
        self.stack.clear();
        self.state = State {
            transform: Affine::IDENTITY,
            clip: None,
        };
    }

    fn clip_shape(&mut self, path: Option<tiny_skia::Path>) {
        let transform = to_transform(self.state.transform);
        let (w, h) = (self.pixmap.width(), self.pixmap.height());
        let Some(path) = path else {
            // An empty shape leaves nothing visible.
            self.state.clip = Mask::new(w, h);
            return;
        };
        match &mut self.state.clip {
            Some(mask) => mask.intersect_path(&path, FillRule::Winding, true, transform),
            None => {
                if let Some(mut mask) = Mask::new(w, h) {
                    mask.fill_path(&path, FillRule::Winding, true, transform);
                    self.state.clip = Some(mask);
                }
            }
        }
    }

    fn draw_shape(&mut self, path: Option<tiny_skia::Path>, paint: &Paint) {
        let Some(path) = path else {
            return;
        };
        let transform = to_transform(self.state.transform);
        let sk_paint = to_paint(paint);
        let clip = self.state.clip.as_ref();
        match paint.style {
            PaintStyle::Fill => {
                self.pixmap
                    .fill_path(&path, &sk_paint, FillRule::Winding, transform, clip);
            }
            PaintStyle::Stroke(width) => {
                let stroke = Stroke {
                    width: f32_of(width),
                    ..Stroke::default()
                };
                self.pixmap
                    .stroke_path(&path, &sk_paint, &stroke, transform, clip);
            }
        }
    }
}

impl Canvas for SkiaCanvas {
    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn save_count(&self) -> usize {
        self.stack.len()
    }

    fn transform(&mut self, affine: Affine) {
        self.state.transform *= affine;
    }

    fn reset_transform(&mut self) {
        self.state.transform = Affine::IDENTITY;
    }

    fn total_matrix(&self) -> Affine {
        self.state.transform
    }

    fn clear(&mut self, color: Color) {
        self.pixmap.fill(to_color(color));
    }

    fn clip_rect(&mut self, rect: Rect) {
        let path = if rect.is_zero_area() {
            None
        } else {
            to_path(&rect.to_path(TOLERANCE))
        };
        self.clip_shape(path);
    }

    fn clip_rrect(&mut self, rrect: RoundedRect) {
        let path = if rrect.rect().is_zero_area() {
            None
        } else {
            to_path(&rrect.to_path(TOLERANCE))
        };
        self.clip_shape(path);
    }

    fn clip_circle(&mut self, circle: Circle) {
        let path = if circle.radius <= 0.0 {
            None
        } else {
            to_path(&circle.to_path(TOLERANCE))
        };
        self.clip_shape(path);
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.draw_shape(to_path(&rect.to_path(TOLERANCE)), paint);
    }

    fn draw_rrect(&mut self, rrect: RoundedRect, paint: &Paint) {
        self.draw_shape(to_path(&rrect.to_path(TOLERANCE)), paint);
    }

    fn draw_circle(&mut self, circle: Circle, paint: &Paint) {
        self.draw_shape(to_path(&circle.to_path(TOLERANCE)), paint);
    }

    fn draw_path(&mut self, path: &BezPath, paint: &Paint) {
        self.draw_shape(to_path(path), paint);
    }

    fn draw_image_rect(&mut self, image: &Image, src: Rect, dst: Rect) {
        if src.is_zero_area() || dst.is_zero_area() {
            return;
        }
        let Some(pixels) = PixmapRef::from_bytes(image.pixels(), image.width(), image.height())
        else {
            return;
        };
        let local = Affine::translate(dst.origin().to_vec2())
            * Affine::scale_non_uniform(dst.width() / src.width(), dst.height() / src.height())
            * Affine::translate(-src.origin().to_vec2());
        // Whole-pixel copies sample exactly; anything else is filtered.
        let quality = if is_integer_translation(self.state.transform * local) {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bilinear
        };
        let mut paint = tiny_skia::Paint::default();
        paint.shader = Pattern::new(
            pixels,
            SpreadMode::Pad,
            quality,
            1.0,
            to_transform(local),
        );
        let Some(rect) = tiny_skia::Rect::from_ltrb(
            f32_of(dst.x0),
            f32_of(dst.y0),
            f32_of(dst.x1),
            f32_of(dst.y1),
        ) else {
            return;
        };
        self.pixmap.fill_rect(
            rect,
            &paint,
            to_transform(self.state.transform),
            self.state.clip.as_ref(),
        );
    }

    fn draw_text(&mut self, text: &str, origin: Point, font_size: f64, paint: &Paint) {
        let advance = glyph_advance(font_size);
        let mut glyphs = BezPath::new();
        let mut x = origin.x;
        for ch in text.chars() {
            if !ch.is_whitespace() {
                let glyph = Rect::new(
                    x + advance * 0.1,
                    origin.y - font_size * 0.7,
                    x + advance * 0.9,
                    origin.y,
                );
                glyphs.extend(glyph.path_elements(TOLERANCE));
            }
            x += advance;
        }
        self.draw_shape(to_path(&glyphs), &Paint::fill(paint.color));
    }
}
