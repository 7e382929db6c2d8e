// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing capability the engine records into and plays back onto.
//!
//! [`Canvas`] is implemented by the [`PictureRecorder`](crate::picture::PictureRecorder)
//! and by backends. Everything the engine draws, including debug overlays,
//! goes through these primitives.

use alloc::sync::Arc;
use core::fmt;

use kurbo::{Affine, BezPath, Circle, Point, Rect, RoundedRect};

use crate::picture::Picture;

/// A straight (non-premultiplied) RGBA color.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba8(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb8(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb8(255, 255, 255);

    /// Creates a color from straight RGBA channels.
    #[must_use]
    pub const fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba8(r, g, b, 255)
    }

    /// Returns the same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// Whether a shape is filled or outlined.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PaintStyle {
    /// Fill the interior.
    Fill,
    /// Stroke the outline with the given width.
    Stroke(f64),
}

/// How a primitive is drawn.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Paint {
    /// Source color.
    pub color: Color,
    /// Fill or stroke.
    pub style: PaintStyle,
    /// Whether edges are anti-aliased.
    pub anti_alias: bool,
}

impl Paint {
    /// A solid fill.
    #[must_use]
    pub const fn fill(color: Color) -> Self {
        Self {
            color,
            style: PaintStyle::Fill,
            anti_alias: true,
        }
    }

    /// A solid stroke.
    #[must_use]
    pub const fn stroke(color: Color, width: f64) -> Self {
        Self {
            color,
            style: PaintStyle::Stroke(width),
            anti_alias: true,
        }
    }

    /// Returns this paint with anti-aliasing turned off.
    #[must_use]
    pub const fn aliased(self) -> Self {
        Self {
            anti_alias: false,
            ..self
        }
    }

    /// Grows `bounds` to cover what this paint actually touches.
    #[must_use]
    pub fn inflate(&self, bounds: Rect) -> Rect {
        match self.style {
            PaintStyle::Fill => bounds,
            PaintStyle::Stroke(width) => bounds.inflate(width * 0.5, width * 0.5),
        }
    }
}

impl Default for Paint {
    fn default() -> Self {
        Self::fill(Color::BLACK)
    }
}

/// An immutable raster image with premultiplied RGBA8 pixels.
///
/// Cloning shares the pixel storage.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl Image {
    /// Wraps premultiplied RGBA8 pixel data.
    ///
    /// # Panics
    ///
    /// Panics if `pixels` is not exactly `width * height * 4` bytes.
    #[must_use]
    pub fn new(width: u32, height: u32, pixels: Arc<[u8]>) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize * 4,
            "image pixel buffer does not match its dimensions"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Premultiplied RGBA8 pixel data, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The image's extent as a rectangle at the origin.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Returns the premultiplied pixel at `(x, y)`, if in bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Approximate extent of a run of text drawn at `origin` (the baseline
/// start).
///
/// Glyph shaping is out of scope, so every glyph is treated as a box
/// `0.6 * font_size` wide with an ascent of `0.8 * font_size` and a descent
/// of `0.2 * font_size`. Backends that draw placeholder glyphs use the same
/// metrics so recorded bounds match what is drawn.
#[must_use]
pub fn text_bounds(text: &str, origin: Point, font_size: f64) -> Rect {
    let advance = glyph_advance(font_size);
    let width = text.chars().count() as f64 * advance;
    Rect::new(
        origin.x,
        origin.y - font_size * 0.8,
        origin.x + width,
        origin.y + font_size * 0.2,
    )
}

/// Horizontal advance of one placeholder glyph.
#[must_use]
pub fn glyph_advance(font_size: f64) -> f64 {
    font_size * 0.6
}

/// A 2D drawing target with a save/restore state stack.
///
/// Transforms compose in the usual pre-multiplied way: a call to
/// [`transform`](Self::transform) applies `affine` to everything drawn
/// afterwards, before the transforms already in effect.
pub trait Canvas {
    /// Pushes the current transform and clip.
    fn save(&mut self);

    /// Pops the transform and clip pushed by the matching [`save`](Self::save).
    fn restore(&mut self);

    /// Number of saved states currently on the stack.
    fn save_count(&self) -> usize;

    /// Concatenates `affine` onto the current transform.
    fn transform(&mut self, affine: Affine);

    /// Replaces the current transform with the identity.
    fn reset_transform(&mut self);

    /// The transform from local coordinates to the canvas's device space.
    fn total_matrix(&self) -> Affine;

    /// Translates subsequent drawing.
    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform(Affine::translate((dx, dy)));
    }

    /// Fills the entire target with `color`, ignoring transform and clip.
    fn clear(&mut self, color: Color);

    /// Intersects the clip with a rectangle in local coordinates.
    fn clip_rect(&mut self, rect: Rect);

    /// Intersects the clip with a rounded rectangle.
    fn clip_rrect(&mut self, rrect: RoundedRect);

    /// Intersects the clip with a circle.
    fn clip_circle(&mut self, circle: Circle);

    /// Draws a rectangle.
    fn draw_rect(&mut self, rect: Rect, paint: &Paint);

    /// Draws a rounded rectangle.
    fn draw_rrect(&mut self, rrect: RoundedRect, paint: &Paint);

    /// Draws a circle.
    fn draw_circle(&mut self, circle: Circle, paint: &Paint);

    /// Draws an arbitrary path.
    fn draw_path(&mut self, path: &BezPath, paint: &Paint);

    /// Draws `image` with its top-left corner at `origin`.
    fn draw_image(&mut self, image: &Image, origin: Point) {
        self.draw_image_rect(image, image.bounds(), image.bounds() + origin.to_vec2());
    }

    /// Draws the `src` region of `image` scaled into `dst`.
    fn draw_image_rect(&mut self, image: &Image, src: Rect, dst: Rect);

    /// Draws a single line of text with its baseline starting at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point, font_size: f64, paint: &Paint);

    /// Plays `picture` back onto this canvas.
    ///
    /// Recorders override this to nest the picture instead of flattening it.
    fn draw_picture(&mut self, picture: &Arc<Picture>) {
        picture.playback(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroke_inflates_by_half_width() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(Paint::fill(Color::BLACK).inflate(r), r);
        assert_eq!(
            Paint::stroke(Color::BLACK, 4.0).inflate(r),
            Rect::new(8.0, 8.0, 22.0, 22.0)
        );
    }

    #[test]
    fn text_bounds_cover_every_glyph() {
        let b = text_bounds("abcd", Point::new(0.0, 10.0), 10.0);
        assert_eq!(b, Rect::new(0.0, 2.0, 24.0, 12.0));
    }

    #[test]
    fn image_pixel_lookup() {
        let mut data = alloc::vec![0_u8; 2 * 2 * 4];
        data[12..16].copy_from_slice(&[1, 2, 3, 4]);
        let image = Image::new(2, 2, data.into());
        assert_eq!(image.pixel(1, 1), Some([1, 2, 3, 4]));
        assert_eq!(image.pixel(2, 0), None);
    }
}
