// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Box constraints, the measure capability, and the layout pass.

use kurbo::{Shape, Size, Vec2};

use super::kind::{NodeKind, ShapeGeometry, estimate_text};
use super::style::{Axis, Position, Style};
use super::tree::NodeTree;
use crate::error::NodeError;
use crate::id::INVALID;

/// Minimum and maximum size a parent allows a child to take.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxConstraints {
    /// Smallest allowed width.
    pub min_width: f64,
    /// Largest allowed width; may be infinite.
    pub max_width: f64,
    /// Smallest allowed height.
    pub min_height: f64,
    /// Largest allowed height; may be infinite.
    pub max_height: f64,
}

impl BoxConstraints {
    /// No limits at all.
    pub const UNBOUNDED: Self = Self {
        min_width: 0.0,
        max_width: f64::INFINITY,
        min_height: 0.0,
        max_height: f64::INFINITY,
    };

    /// Exactly `size`.
    #[must_use]
    pub const fn tight(size: Size) -> Self {
        Self {
            min_width: size.width,
            max_width: size.width,
            min_height: size.height,
            max_height: size.height,
        }
    }

    /// Anything from zero up to `size`.
    #[must_use]
    pub const fn loose(size: Size) -> Self {
        Self {
            min_width: 0.0,
            max_width: size.width,
            min_height: 0.0,
            max_height: size.height,
        }
    }

    /// Whether exactly one size satisfies the constraints.
    #[must_use]
    pub fn is_tight(&self) -> bool {
        self.min_width >= self.max_width && self.min_height >= self.max_height
    }

    /// Clamps `size` into the allowed range.
    #[must_use]
    pub fn constrain(&self, size: Size) -> Size {
        Size::new(
            size.width.clamp(self.min_width, self.max_width.max(self.min_width)),
            size.height.clamp(self.min_height, self.max_height.max(self.min_height)),
        )
    }

    /// The smallest allowed size.
    #[must_use]
    pub const fn smallest(&self) -> Size {
        Size::new(self.min_width, self.min_height)
    }

    /// Narrows one or both axes to a fixed length, clamped into range.
    #[must_use]
    pub fn tighten(&self, width: Option<f64>, height: Option<f64>) -> Self {
        let mut c = *self;
        if let Some(w) = width {
            let w = w.clamp(self.min_width, self.max_width.max(self.min_width));
            c.min_width = w;
            c.max_width = w;
        }
        if let Some(h) = height {
            let h = h.clamp(self.min_height, self.max_height.max(self.min_height));
            c.min_height = h;
            c.max_height = h;
        }
        c
    }

    /// The width to offer a measure function and how to interpret it.
    #[must_use]
    pub fn width_mode(&self) -> (f64, MeasureMode) {
        mode(self.min_width, self.max_width)
    }

    /// The height to offer a measure function and how to interpret it.
    #[must_use]
    pub fn height_mode(&self) -> (f64, MeasureMode) {
        mode(self.min_height, self.max_height)
    }
}

fn mode(min: f64, max: f64) -> (f64, MeasureMode) {
    if min >= max {
        (max, MeasureMode::Exactly)
    } else if max.is_finite() {
        (max, MeasureMode::AtMost)
    } else {
        (0.0, MeasureMode::Undefined)
    }
}

/// How a measure function should treat an offered length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeasureMode {
    /// No limit; report the natural length.
    Undefined,
    /// The length is fixed.
    Exactly,
    /// The length is an upper bound.
    AtMost,
}

/// Reports the intrinsic size of a leaf node.
///
/// The layout pass does not care which engine answers; any closure of the
/// right shape is a measure function.
pub trait Measure {
    /// Returns the node's size for the offered lengths.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the pipeline logs the error and uses the
    /// smallest allowed size.
    fn measure(
        &self,
        width: f64,
        width_mode: MeasureMode,
        height: f64,
        height_mode: MeasureMode,
    ) -> Result<Size, NodeError>;
}

impl<F> Measure for F
where
    F: Fn(f64, MeasureMode, f64, MeasureMode) -> Result<Size, NodeError>,
{
    fn measure(
        &self,
        width: f64,
        width_mode: MeasureMode,
        height: f64,
        height_mode: MeasureMode,
    ) -> Result<Size, NodeError> {
        self(width, width_mode, height, height_mode)
    }
}

fn style_constraints(style: &Style, constraints: BoxConstraints) -> BoxConstraints {
    constraints.tighten(style.width.points(), style.height.points())
}

impl NodeTree {
    /// Lays out a child on behalf of its parent.
    ///
    /// The child becomes its own relayout boundary when it has no parent or
    /// when the parent will not read its size; otherwise it inherits the
    /// parent's boundary. Layout is skipped when the child is clean and the
    /// constraints are unchanged.
    pub(crate) fn layout_as_child(
        &mut self,
        idx: u32,
        constraints: BoxConstraints,
        parent_uses_size: bool,
    ) {
        let i = idx as usize;
        let parent = self.parent[i];
        let boundary = if !parent_uses_size || parent == INVALID {
            idx
        } else {
            self.relayout_boundary[parent as usize]
        };
        assert!(boundary != INVALID, "missing relayout boundary");

        if !self.needs_layout[i] && self.constraints[i] == Some(constraints) {
            if boundary != self.relayout_boundary[i] {
                self.relayout_boundary[i] = boundary;
                self.propagate_relayout_boundary(idx);
            }
            return;
        }

        let previous = self.relayout_boundary[i];
        if previous != INVALID && previous != boundary {
            self.clean_child_relayout_boundaries(idx);
        }
        self.relayout_boundary[i] = boundary;
        self.constraints[i] = Some(constraints);
        self.parent_uses_size[i] = parent_uses_size;
        self.perform_layout(idx, constraints);
        self.needs_layout[i] = false;
        self.mark_needs_paint(idx);
    }

    /// Re-runs layout for a relayout boundary with the constraints it was
    /// last given.
    pub(crate) fn layout_without_resize(&mut self, idx: u32) {
        let i = idx as usize;
        assert!(
            self.relayout_boundary[i] == idx,
            "missing relayout boundary"
        );
        let Some(constraints) = self.constraints[i] else {
            panic!("relayout boundary {idx} was never laid out");
        };
        self.perform_layout(idx, constraints);
        self.needs_layout[i] = false;
        self.mark_needs_paint(idx);
    }

    /// Forgets inherited boundaries below `idx` so they are recomputed the
    /// next time each child is laid out.
    pub(crate) fn clean_child_relayout_boundaries(&mut self, idx: u32) {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.clean_relayout_boundary(child);
            child = self.next_sibling[child as usize];
        }
    }

    pub(crate) fn clean_relayout_boundary(&mut self, idx: u32) {
        if self.relayout_boundary[idx as usize] != idx {
            self.relayout_boundary[idx as usize] = INVALID;
            self.clean_child_relayout_boundaries(idx);
        }
    }

    fn propagate_relayout_boundary(&mut self, idx: u32) {
        let boundary = self.relayout_boundary[idx as usize];
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            let c = child as usize;
            if self.relayout_boundary[c] != child && self.relayout_boundary[c] != boundary {
                self.relayout_boundary[c] = boundary;
                self.propagate_relayout_boundary(child);
            }
            child = self.next_sibling[c];
        }
    }

    fn perform_layout(&mut self, idx: u32, constraints: BoxConstraints) {
        let size = if self.kind[idx as usize].is_container() {
            self.layout_group(idx, constraints)
        } else {
            self.layout_leaf(idx, constraints)
        };
        tracing::trace!(node = idx, width = size.width, height = size.height, "laid out");
        self.size[idx as usize] = size;
    }

    fn layout_leaf(&mut self, idx: u32, constraints: BoxConstraints) -> Size {
        let i = idx as usize;
        let own = style_constraints(&self.style[i], constraints);
        let (width, width_mode) = own.width_mode();
        let (height, height_mode) = own.height_mode();
        let measured = match &self.measure[i] {
            Some(measure) => measure.measure(width, width_mode, height, height_mode),
            None => match &self.kind[i] {
                NodeKind::Text(text) => Ok(estimate_text(text, width, width_mode)),
                NodeKind::Image(image) => Ok(Size::new(
                    f64::from(image.width()),
                    f64::from(image.height()),
                )),
                NodeKind::Custom(custom) => custom.layout(own),
                NodeKind::Shape {
                    geometry: ShapeGeometry::Path(path),
                    ..
                } => {
                    let bounds = path.bounding_box();
                    Ok(Size::new(bounds.x1.max(0.0), bounds.y1.max(0.0)))
                }
                NodeKind::Shape { .. } | NodeKind::Group => Ok(own.smallest()),
            },
        };
        match measured {
            Ok(size) => own.constrain(size),
            Err(err) => {
                tracing::warn!(node = idx, %err, "measure failed; using the smallest allowed size");
                own.smallest()
            }
        }
    }

    fn layout_group(&mut self, idx: u32, constraints: BoxConstraints) -> Size {
        let i = idx as usize;
        let own = style_constraints(&self.style[i], constraints);
        let Style {
            axis, padding, gap, ..
        } = self.style[i];
        let inner = Size::new(
            (own.max_width - 2.0 * padding).max(0.0),
            (own.max_height - 2.0 * padding).max(0.0),
        );

        let mut main = 0.0_f64;
        let mut cross = 0.0_f64;
        let mut in_flow = 0_usize;
        let mut child = self.first_child[i];
        while child != INVALID {
            let c = child as usize;
            let position = self.style[c].position;
            let fixed = (self.style[c].width.points(), self.style[c].height.points());
            match position {
                Position::Absolute { left, top } => {
                    let child_constraints = BoxConstraints::loose(inner).tighten(fixed.0, fixed.1);
                    self.layout_as_child(child, child_constraints, false);
                    self.offset[c] = Vec2::new(padding + left, padding + top);
                }
                Position::Flow => {
                    if in_flow > 0 {
                        main += gap;
                    }
                    let child_constraints = match fixed {
                        (Some(w), Some(h)) => BoxConstraints::tight(Size::new(w, h)),
                        _ => {
                            let remaining = match axis {
                                Axis::Column => {
                                    Size::new(inner.width, (inner.height - main).max(0.0))
                                }
                                Axis::Row => {
                                    Size::new((inner.width - main).max(0.0), inner.height)
                                }
                            };
                            BoxConstraints::loose(remaining).tighten(fixed.0, fixed.1)
                        }
                    };
                    let uses_size = !child_constraints.is_tight();
                    self.layout_as_child(child, child_constraints, uses_size);
                    let size = self.size[c];
                    match axis {
                        Axis::Column => {
                            self.offset[c] = Vec2::new(padding, padding + main);
                            main += size.height;
                            cross = cross.max(size.width);
                        }
                        Axis::Row => {
                            self.offset[c] = Vec2::new(padding + main, padding);
                            main += size.width;
                            cross = cross.max(size.height);
                        }
                    }
                    in_flow += 1;
                }
            }
            child = self.next_sibling[c];
        }

        let content = match axis {
            Axis::Column => Size::new(cross, main),
            Axis::Row => Size::new(main, cross),
        };
        own.constrain(Size::new(
            content.width + 2.0 * padding,
            content.height + 2.0 * padding,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_follow_constraints() {
        let tight = BoxConstraints::tight(Size::new(10.0, 20.0));
        assert_eq!(tight.width_mode(), (10.0, MeasureMode::Exactly));
        let loose = BoxConstraints::loose(Size::new(10.0, 20.0));
        assert_eq!(loose.height_mode(), (20.0, MeasureMode::AtMost));
        assert_eq!(
            BoxConstraints::UNBOUNDED.width_mode(),
            (0.0, MeasureMode::Undefined)
        );
    }

    #[test]
    fn constrain_clamps_both_axes() {
        let c = BoxConstraints {
            min_width: 5.0,
            max_width: 10.0,
            min_height: 0.0,
            max_height: f64::INFINITY,
        };
        assert_eq!(c.constrain(Size::new(1.0, 100.0)), Size::new(5.0, 100.0));
        assert_eq!(c.constrain(Size::new(50.0, 1.0)), Size::new(10.0, 1.0));
    }

    #[test]
    fn tighten_clamps_into_range() {
        let c = BoxConstraints::loose(Size::new(10.0, 10.0)).tighten(Some(50.0), None);
        assert_eq!(c.min_width, 10.0);
        assert_eq!(c.max_width, 10.0);
        assert_eq!(c.max_height, 10.0);
        assert!(!c.is_tight());
    }
}
