// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The closed set of node kinds the pipeline dispatches on.

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use kurbo::{BezPath, Size};

use super::layout::{BoxConstraints, MeasureMode};
use crate::canvas::{Canvas, Color, Image, Paint};
use crate::error::NodeError;

/// Geometry drawn by a [`NodeKind::Shape`], fitted to the node's box.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeGeometry {
    /// Fills the box.
    Rect,
    /// Fills the box with rounded corners.
    RoundedRect(f64),
    /// The largest circle centered in the box.
    Circle,
    /// An arbitrary path in the node's local coordinates.
    Path(BezPath),
}

/// Text content of a [`NodeKind::Text`].
///
/// Glyph shaping is left to the canvas; layout only needs the size from the
/// node's measure function.
#[derive(Clone, Debug, PartialEq)]
pub struct TextContent {
    /// The string to draw on a single line.
    pub text: String,
    /// Font size in logical pixels.
    pub font_size: f64,
    /// Text color.
    pub color: Color,
}

/// Host-provided drawing for a [`NodeKind::Custom`] node.
pub trait CustomPaint {
    /// Size the node wants within `constraints`.
    ///
    /// The default takes the smallest allowed size.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the pipeline logs the error and lays the
    /// node out at the smallest allowed size.
    fn layout(&self, constraints: BoxConstraints) -> Result<Size, NodeError> {
        Ok(constraints.smallest())
    }

    /// Draws the node's content in its local coordinates.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the pipeline logs the error and leaves the
    /// rest of the frame intact.
    fn paint(&self, canvas: &mut dyn Canvas, size: Size) -> Result<(), NodeError>;

    /// Whether the drawing is expensive enough to cache even when it has
    /// few commands.
    fn is_complex(&self) -> bool {
        false
    }
}

/// Adapts a closure into a [`CustomPaint`].
pub struct PaintFn<F>(pub F);

impl<F> CustomPaint for PaintFn<F>
where
    F: Fn(&mut dyn Canvas, Size) -> Result<(), NodeError>,
{
    fn paint(&self, canvas: &mut dyn Canvas, size: Size) -> Result<(), NodeError> {
        (self.0)(canvas, size)
    }
}

impl<F> fmt::Debug for PaintFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PaintFn")
    }
}

/// What a node is.
pub enum NodeKind {
    /// Lays out children in a flow along its style's axis. The only kind
    /// that may have children.
    Group,
    /// A filled geometric shape.
    Shape {
        /// The geometry.
        geometry: ShapeGeometry,
        /// How it is drawn.
        paint: Paint,
    },
    /// A single line of text.
    Text(TextContent),
    /// A raster image, stretched to the node's box.
    Image(Image),
    /// Host-provided layout and painting.
    Custom(Box<dyn CustomPaint>),
}

impl NodeKind {
    /// Builds a filled shape.
    #[must_use]
    pub fn shape(geometry: ShapeGeometry, color: Color) -> Self {
        Self::Shape {
            geometry,
            paint: Paint::fill(color),
        }
    }

    /// Builds a text node.
    #[must_use]
    pub fn text(text: impl Into<String>, font_size: f64, color: Color) -> Self {
        Self::Text(TextContent {
            text: text.into(),
            font_size,
            color,
        })
    }

    /// Builds a custom node from a paint closure.
    #[must_use]
    pub fn custom<F>(paint: F) -> Self
    where
        F: Fn(&mut dyn Canvas, Size) -> Result<(), NodeError> + 'static,
    {
        Self::Custom(Box::new(PaintFn(paint)))
    }

    /// Whether nodes of this kind may have children.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Group)
    }

    /// A short name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Group => "Group",
            Self::Shape { .. } => "Shape",
            Self::Text(_) => "Text",
            Self::Image(_) => "Image",
            Self::Custom(_) => "Custom",
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => f.write_str("Group"),
            Self::Shape { geometry, paint } => f
                .debug_struct("Shape")
                .field("geometry", geometry)
                .field("paint", paint)
                .finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Image(image) => f.debug_tuple("Image").field(image).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Default text metrics used when a text node has no measure function.
///
/// Matches the placeholder glyph metrics of
/// [`text_bounds`](crate::canvas::text_bounds).
pub(crate) fn estimate_text(
    text: &TextContent,
    width: f64,
    width_mode: MeasureMode,
) -> Size {
    let advance = crate::canvas::glyph_advance(text.font_size);
    let natural = text.text.chars().count() as f64 * advance;
    let w = match width_mode {
        MeasureMode::Exactly => width,
        MeasureMode::AtMost => natural.min(width),
        MeasureMode::Undefined => natural,
    };
    Size::new(w, text.font_size)
}
