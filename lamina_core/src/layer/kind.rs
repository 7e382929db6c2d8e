// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer variants.

use alloc::sync::Arc;

use kurbo::{Affine, Circle, Rect, RoundedRect, Vec2};

use crate::picture::Picture;

/// Caching hints attached to a picture layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PictureHints {
    /// The picture is expected to change soon; caching it is wasted work.
    pub will_change: bool,
    /// The picture is expensive to draw even if it has few commands.
    pub is_complex: bool,
}

/// Leaf content of a picture layer.
#[derive(Clone, Debug, Default)]
pub struct PictureLayer {
    /// The recording, or `None` while it is still being recorded.
    pub picture: Option<Arc<Picture>>,
    /// Offset of the picture within the parent layer.
    pub offset: Vec2,
    /// Caching hints.
    pub hints: PictureHints,
}

/// What a layer does to its children, or what it draws if it is a leaf.
///
/// Every variant except [`Picture`](Self::Picture) is a container.
#[derive(Clone, Debug)]
pub enum LayerKind {
    /// Groups children without changing them.
    Container,
    /// Translates children. Repaint boundaries own one of these.
    Offset(Vec2),
    /// Applies an arbitrary affine transform to children.
    Transform(Affine),
    /// Clips children to a rectangle.
    ClipRect(Rect),
    /// Clips children to a rounded rectangle.
    ClipRRect(RoundedRect),
    /// Clips children to a circle.
    ClipCircle(Circle),
    /// Draws a recorded picture.
    Picture(PictureLayer),
}

impl LayerKind {
    /// Whether this layer may have children.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        !matches!(self, Self::Picture(_))
    }

    /// A short name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Container => "Container",
            Self::Offset(_) => "Offset",
            Self::Transform(_) => "Transform",
            Self::ClipRect(_) => "ClipRect",
            Self::ClipRRect(_) => "ClipRRect",
            Self::ClipCircle(_) => "ClipCircle",
            Self::Picture(_) => "Picture",
        }
    }
}
