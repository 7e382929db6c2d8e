// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed node style, change classification, and per-field observers.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;
use kurbo::Affine;

use crate::canvas::Color;
use crate::id::NodeId;

/// A length that is either fixed or decided by layout.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dimension {
    /// Sized by content and constraints.
    #[default]
    Auto,
    /// A fixed length in logical pixels.
    Points(f64),
}

impl Dimension {
    /// The fixed length, if any.
    #[must_use]
    pub const fn points(self) -> Option<f64> {
        match self {
            Self::Auto => None,
            Self::Points(v) => Some(v),
        }
    }
}

/// How a node is placed inside its parent group.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Position {
    /// Placed by the parent's flow.
    #[default]
    Flow,
    /// Placed at a fixed offset from the parent's content box, outside the
    /// flow.
    Absolute {
        /// Distance from the parent's left content edge.
        left: f64,
        /// Distance from the parent's top content edge.
        top: f64,
    },
}

/// Main axis of a group's flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    /// Children stack top to bottom.
    #[default]
    Column,
    /// Children stack left to right.
    Row,
}

/// Visual and layout properties of a node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Style {
    /// Box width.
    pub width: Dimension,
    /// Box height.
    pub height: Dimension,
    /// Placement inside the parent.
    pub position: Position,
    /// Flow direction for children.
    pub axis: Axis,
    /// Inset applied on all four sides of the content box.
    pub padding: f64,
    /// Space between consecutive flow children.
    pub gap: f64,
    /// Fill behind the node's content.
    pub background: Option<Color>,
    /// Corner radius for the background and the clip.
    pub corner_radius: f64,
    /// Clip children and content to the node's box.
    pub clip: bool,
    /// Paint transform applied around the node's box origin.
    #[cfg_attr(feature = "serde", serde(skip, default = "identity"))]
    pub transform: Affine,
    /// Whether the node paints at all. Hidden nodes still take up space.
    pub visible: bool,
    /// Give the node its own layer so it can repaint independently.
    pub repaint_boundary: bool,
    /// Hint that the node's pictures change often and should not be cached.
    pub will_change: bool,
}

#[cfg(feature = "serde")]
fn identity() -> Affine {
    Affine::IDENTITY
}

impl Style {
    /// The default style.
    pub const DEFAULT: Self = Self {
        width: Dimension::Auto,
        height: Dimension::Auto,
        position: Position::Flow,
        axis: Axis::Column,
        padding: 0.0,
        gap: 0.0,
        background: None,
        corner_radius: 0.0,
        clip: false,
        transform: Affine::IDENTITY,
        visible: true,
        repaint_boundary: false,
        will_change: false,
    };

    /// Whether both dimensions are fixed, making the node's size independent
    /// of its content.
    #[must_use]
    pub const fn has_fixed_size(&self) -> bool {
        self.width.points().is_some() && self.height.points().is_some()
    }

    /// Fields whose values differ between `self` and `other`.
    #[must_use]
    pub fn diff(&self, other: &Self) -> StyleChanges {
        let mut changes = StyleChanges::empty();
        let pairs = [
            (StyleField::Width, self.width != other.width),
            (StyleField::Height, self.height != other.height),
            (StyleField::Position, self.position != other.position),
            (StyleField::Axis, self.axis != other.axis),
            (StyleField::Padding, self.padding != other.padding),
            (StyleField::Gap, self.gap != other.gap),
            (StyleField::Background, self.background != other.background),
            (StyleField::CornerRadius, self.corner_radius != other.corner_radius),
            (StyleField::Clip, self.clip != other.clip),
            (StyleField::Transform, self.transform != other.transform),
            (StyleField::Visible, self.visible != other.visible),
            (StyleField::RepaintBoundary, self.repaint_boundary != other.repaint_boundary),
            (StyleField::WillChange, self.will_change != other.will_change),
        ];
        for (field, changed) in pairs {
            if changed {
                changes.insert(field.flag());
            }
        }
        changes
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Names one field of [`Style`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleField {
    /// [`Style::width`].
    Width,
    /// [`Style::height`].
    Height,
    /// [`Style::position`].
    Position,
    /// [`Style::axis`].
    Axis,
    /// [`Style::padding`].
    Padding,
    /// [`Style::gap`].
    Gap,
    /// [`Style::background`].
    Background,
    /// [`Style::corner_radius`].
    CornerRadius,
    /// [`Style::clip`].
    Clip,
    /// [`Style::transform`].
    Transform,
    /// [`Style::visible`].
    Visible,
    /// [`Style::repaint_boundary`].
    RepaintBoundary,
    /// [`Style::will_change`].
    WillChange,
}

impl StyleField {
    /// Every field, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::Width,
        Self::Height,
        Self::Position,
        Self::Axis,
        Self::Padding,
        Self::Gap,
        Self::Background,
        Self::CornerRadius,
        Self::Clip,
        Self::Transform,
        Self::Visible,
        Self::RepaintBoundary,
        Self::WillChange,
    ];

    /// What a change to this field invalidates.
    #[must_use]
    pub const fn effect(self) -> StyleEffect {
        match self {
            Self::Width | Self::Height | Self::Position => StyleEffect::ParentLayout,
            Self::Axis | Self::Padding | Self::Gap => StyleEffect::Layout,
            Self::Background
            | Self::CornerRadius
            | Self::Clip
            | Self::Transform
            | Self::WillChange => StyleEffect::Paint,
            Self::Visible => StyleEffect::ParentPaint,
            Self::RepaintBoundary => StyleEffect::Compositing,
        }
    }

    /// This field as a one-element [`StyleChanges`].
    #[must_use]
    pub const fn flag(self) -> StyleChanges {
        match self {
            Self::Width => StyleChanges::WIDTH,
            Self::Height => StyleChanges::HEIGHT,
            Self::Position => StyleChanges::POSITION,
            Self::Axis => StyleChanges::AXIS,
            Self::Padding => StyleChanges::PADDING,
            Self::Gap => StyleChanges::GAP,
            Self::Background => StyleChanges::BACKGROUND,
            Self::CornerRadius => StyleChanges::CORNER_RADIUS,
            Self::Clip => StyleChanges::CLIP,
            Self::Transform => StyleChanges::TRANSFORM,
            Self::Visible => StyleChanges::VISIBLE,
            Self::RepaintBoundary => StyleChanges::REPAINT_BOUNDARY,
            Self::WillChange => StyleChanges::WILL_CHANGE,
        }
    }
}

/// What a style change invalidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleEffect {
    /// The node's own size may change, so its parent must lay out again.
    ParentLayout,
    /// Only the arrangement inside the node changes.
    Layout,
    /// Only the node's pixels change.
    Paint,
    /// Whether the node is painted at all changes, which its parent decides.
    ParentPaint,
    /// Whether the node owns a layer changes.
    Compositing,
}

bitflags! {
    /// A set of changed [`StyleField`]s.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct StyleChanges: u16 {
        /// [`Style::width`].
        const WIDTH = 1 << 0;
        /// [`Style::height`].
        const HEIGHT = 1 << 1;
        /// [`Style::position`].
        const POSITION = 1 << 2;
        /// [`Style::axis`].
        const AXIS = 1 << 3;
        /// [`Style::padding`].
        const PADDING = 1 << 4;
        /// [`Style::gap`].
        const GAP = 1 << 5;
        /// [`Style::background`].
        const BACKGROUND = 1 << 6;
        /// [`Style::corner_radius`].
        const CORNER_RADIUS = 1 << 7;
        /// [`Style::clip`].
        const CLIP = 1 << 8;
        /// [`Style::transform`].
        const TRANSFORM = 1 << 9;
        /// [`Style::visible`].
        const VISIBLE = 1 << 10;
        /// [`Style::repaint_boundary`].
        const REPAINT_BOUNDARY = 1 << 11;
        /// [`Style::will_change`].
        const WILL_CHANGE = 1 << 12;
    }
}

impl StyleChanges {
    /// Whether any changed field has the given effect.
    #[must_use]
    pub fn has_effect(self, effect: StyleEffect) -> bool {
        self.fields().any(|f| f.effect() == effect)
    }

    /// The changed fields, in declaration order.
    pub fn fields(self) -> impl Iterator<Item = StyleField> {
        StyleField::ALL
            .into_iter()
            .filter(move |f| self.contains(f.flag()))
    }
}

/// A callback fired after a watched style field changes value.
pub type StyleObserver = Box<dyn FnMut(NodeId, StyleField, &Style)>;

/// Handle for removing a style observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// The observers registered on one node.
#[derive(Default)]
pub(crate) struct StyleObservers {
    next_id: u32,
    entries: Vec<(ObserverId, StyleField, StyleObserver)>,
}

impl StyleObservers {
    pub(crate) fn add(&mut self, field: StyleField, observer: StyleObserver) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, field, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(e, _, _)| *e != id);
        self.entries.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn notify(&mut self, node: NodeId, changes: StyleChanges, style: &Style) {
        for (_, field, observer) in &mut self.entries {
            if changes.contains(field.flag()) {
                observer(node, *field, style);
            }
        }
    }
}

impl fmt::Debug for StyleObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleObservers")
            .field("count", &self.entries.len())
            .finish_non_exhaustive()
    }
}
