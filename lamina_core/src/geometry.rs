// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small geometry helpers on top of `kurbo`.

use kurbo::{Affine, Rect};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Unions `rect` into an optional accumulator, ignoring zero-area inputs.
#[must_use]
pub fn union_opt(acc: Option<Rect>, rect: Rect) -> Option<Rect> {
    if rect.is_zero_area() {
        return acc;
    }
    Some(match acc {
        Some(acc) => acc.union(rect),
        None => rect,
    })
}

/// Intersects two rectangles, collapsing a non-overlapping result to
/// [`Rect::ZERO`].
#[must_use]
pub fn intersect_or_zero(a: Rect, b: Rect) -> Rect {
    let r = a.intersect(b);
    if r.is_zero_area() { Rect::ZERO } else { r }
}

/// Returns the linear part of `affine`, dropping its translation.
#[must_use]
pub fn linear_part(affine: Affine) -> Affine {
    affine.with_translation(kurbo::Vec2::ZERO)
}

/// Rounds a rectangle outward to whole pixels.
#[must_use]
pub fn round_out(rect: Rect) -> Rect {
    Rect::new(
        rect.x0.floor(),
        rect.y0.floor(),
        rect.x1.ceil(),
        rect.y1.ceil(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_skips_empty() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(union_opt(None, Rect::ZERO), None);
        assert_eq!(union_opt(Some(a), Rect::ZERO), Some(a));
        assert_eq!(
            union_opt(Some(a), Rect::new(2.0, 2.0, 3.0, 3.0)),
            Some(Rect::new(0.0, 0.0, 3.0, 3.0))
        );
    }

    #[test]
    fn disjoint_intersection_is_zero() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        let b = Rect::new(5.0, 5.0, 6.0, 6.0);
        assert_eq!(intersect_or_zero(a, b), Rect::ZERO);
    }

    #[test]
    fn round_out_covers_fractional_edges() {
        assert_eq!(
            round_out(Rect::new(0.5, 1.2, 2.1, 3.0)),
            Rect::new(0.0, 1.0, 3.0, 3.0)
        );
    }

    #[test]
    fn linear_part_drops_translation() {
        let a = Affine::new([2.0, 0.0, 0.0, 2.0, 5.0, 7.0]);
        assert_eq!(linear_part(a), Affine::scale(2.0));
    }
}
