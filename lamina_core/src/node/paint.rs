// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Painting a node and its inline descendants.

use alloc::format;

use kurbo::{Affine, Circle, Point, RoundedRect, Shape, Vec2};

use super::kind::{NodeKind, ShapeGeometry};
use super::tree::NodeTree;
use crate::canvas::{Canvas, Color, Paint, text_bounds};
use crate::debug::{DebugFlags, debug_flags};
use crate::id::INVALID;
use crate::painting::{PaintingContext, local_bounds};

const NODE_BOUNDS_COLOR: Color = Color::rgba8(0, 160, 255, 192);
const NODE_ID_COLOR: Color = Color::rgba8(255, 0, 160, 255);
const TEXT_LINE_COLOR: Color = Color::rgba8(0, 200, 80, 192);
const PATH_BOUNDS_COLOR: Color = Color::rgba8(160, 0, 255, 192);
const NODE_ID_FONT_SIZE: f64 = 8.0;

/// Paints `idx` at `offset` into `ctx`.
///
/// Repaint-boundary children are composited by
/// [`PaintingContext::paint_child`]; everything else lands in the current
/// recording.
pub(crate) fn paint_node(
    nodes: &mut NodeTree,
    idx: u32,
    ctx: &mut PaintingContext<'_>,
    offset: Vec2,
) {
    let i = idx as usize;
    debug_assert!(!nodes.needs_layout[i], "painting node {idx} with stale layout");
    nodes.needs_paint[i] = false;
    let style = &nodes.style[i];
    if !style.visible {
        return;
    }
    let transform = style.transform;
    let needs_compositing = nodes.needs_compositing[i];
    if style.will_change {
        ctx.set_will_change_hint();
    }
    if let NodeKind::Custom(custom) = &nodes.kind[i] {
        if custom.is_complex() {
            ctx.set_is_complex_hint();
        }
    }

    if transform == Affine::IDENTITY {
        paint_clipped(nodes, idx, ctx, offset);
    } else {
        ctx.push_transform(needs_compositing, offset, transform, |ctx, offset| {
            paint_clipped(nodes, idx, ctx, offset);
        });
    }
}

fn paint_clipped(nodes: &mut NodeTree, idx: u32, ctx: &mut PaintingContext<'_>, offset: Vec2) {
    let i = idx as usize;
    let (clip, radius) = (nodes.style[i].clip, nodes.style[i].corner_radius);
    if !clip {
        paint_contents(nodes, idx, ctx, offset);
        return;
    }
    let bounds = local_bounds(nodes.size[i]);
    let needs_compositing = nodes.needs_compositing[i];
    if radius > 0.0 {
        let clip = RoundedRect::from_rect(bounds, radius);
        ctx.push_clip_rrect(needs_compositing, offset, clip, |ctx, offset| {
            paint_contents(nodes, idx, ctx, offset);
        });
    } else {
        ctx.push_clip_rect(needs_compositing, offset, bounds, |ctx, offset| {
            paint_contents(nodes, idx, ctx, offset);
        });
    }
}

fn paint_contents(nodes: &mut NodeTree, idx: u32, ctx: &mut PaintingContext<'_>, offset: Vec2) {
    let i = idx as usize;
    let size = nodes.size[i];
    let rect = local_bounds(size) + offset;
    let flags = debug_flags();

    {
        let style = &nodes.style[i];
        if let Some(color) = style.background {
            let canvas = ctx.canvas();
            if style.corner_radius > 0.0 {
                let rrect = RoundedRect::from_rect(rect, style.corner_radius);
                canvas.draw_rrect(rrect, &Paint::fill(color));
            } else {
                canvas.draw_rect(rect, &Paint::fill(color));
            }
        }
    }

    match &nodes.kind[i] {
        NodeKind::Group => {}
        NodeKind::Shape { geometry, paint } => {
            let canvas = ctx.canvas();
            match geometry {
                ShapeGeometry::Rect => canvas.draw_rect(rect, paint),
                ShapeGeometry::RoundedRect(radius) => {
                    canvas.draw_rrect(RoundedRect::from_rect(rect, *radius), paint);
                }
                ShapeGeometry::Circle => {
                    let radius = size.width.min(size.height) / 2.0;
                    canvas.draw_circle(Circle::new(rect.center(), radius), paint);
                }
                ShapeGeometry::Path(path) => {
                    canvas.save();
                    canvas.translate(offset.x, offset.y);
                    canvas.draw_path(path, paint);
                    if flags.contains(DebugFlags::PATH_BOUNDS) {
                        canvas.draw_rect(
                            path.bounding_box(),
                            &Paint::stroke(PATH_BOUNDS_COLOR, 1.0),
                        );
                    }
                    canvas.restore();
                }
            }
        }
        NodeKind::Text(text) => {
            let origin = Point::new(offset.x, offset.y + text.font_size * 0.8);
            let canvas = ctx.canvas();
            canvas.draw_text(&text.text, origin, text.font_size, &Paint::fill(text.color));
            if flags.contains(DebugFlags::TEXT_LINE_BOUNDS) {
                canvas.draw_rect(
                    text_bounds(&text.text, origin, text.font_size),
                    &Paint::stroke(TEXT_LINE_COLOR, 1.0),
                );
            }
        }
        NodeKind::Image(image) => {
            ctx.canvas().draw_image_rect(image, image.bounds(), rect);
        }
        NodeKind::Custom(custom) => {
            let canvas = ctx.canvas();
            let depth = canvas.save_count();
            canvas.save();
            canvas.translate(offset.x, offset.y);
            if let Err(err) = custom.paint(canvas, size) {
                tracing::warn!(node = idx, %err, "custom paint failed");
            }
            while canvas.save_count() > depth {
                canvas.restore();
            }
        }
    }

    let mut child = nodes.first_child[i];
    while child != INVALID {
        let child_offset = offset + nodes.offset[child as usize];
        ctx.paint_child(nodes, child, child_offset);
        child = nodes.next_sibling[child as usize];
    }

    if flags.contains(DebugFlags::NODE_BOUNDS) {
        ctx.canvas()
            .draw_rect(rect, &Paint::stroke(NODE_BOUNDS_COLOR, 1.0));
    }
    if flags.contains(DebugFlags::NODE_ID) {
        let origin = Point::new(rect.x0 + 1.0, rect.y0 + NODE_ID_FONT_SIZE);
        ctx.canvas().draw_text(
            &format!("{idx}"),
            origin,
            NODE_ID_FONT_SIZE,
            &Paint::fill(NODE_ID_COLOR),
        );
    }
}
