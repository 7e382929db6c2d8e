// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented text dumps of the node tree and the layer tree.
//!
//! One line per node or layer, children indented by two spaces under their
//! parent. The format is for people and may change.

use std::fmt::Write;

use lamina_core::id::{LayerId, NodeId};
use lamina_core::layer::{LayerKind, LayerTree};
use lamina_core::node::NodeTree;
use lamina_core::pipeline::RenderPipeline;

/// Dumps the pipeline's node tree from its root.
///
/// Each line shows the node kind, slot index, size, offset in the parent,
/// and any dirty or boundary flags.
#[must_use]
pub fn dump_nodes(pipeline: &RenderPipeline) -> String {
    let mut out = String::new();
    match pipeline.root() {
        Some(root) => dump_node(pipeline.nodes(), root, 0, &mut out),
        None => out.push_str("(no root)\n"),
    }
    out
}

fn dump_node(nodes: &NodeTree, id: NodeId, depth: usize, out: &mut String) {
    let size = nodes.size(id);
    let offset = nodes.offset(id);
    let _ = write!(
        out,
        "{:indent$}{} #{} {}x{} at ({}, {})",
        "",
        nodes.kind(id).name(),
        id.index(),
        size.width,
        size.height,
        offset.x,
        offset.y,
        indent = depth * 2,
    );
    if nodes.is_boundary(id) {
        out.push_str(" [boundary]");
    }
    if nodes.needs_layout(id) {
        out.push_str(" [needs-layout]");
    }
    if nodes.needs_paint(id) {
        out.push_str(" [needs-paint]");
    }
    out.push('\n');
    for child in nodes.children(id) {
        dump_node(nodes, child, depth + 1, out);
    }
}

/// Dumps a layer tree from its root.
///
/// Each line shows the layer variant with its parameters and the paint
/// bounds from the last preroll.
#[must_use]
pub fn dump_layers(layers: &LayerTree) -> String {
    let mut out = String::new();
    match layers.root() {
        Some(root) => dump_layer(layers, root, 0, &mut out),
        None => out.push_str("(no root)\n"),
    }
    out
}

fn dump_layer(layers: &LayerTree, id: LayerId, depth: usize, out: &mut String) {
    let _ = write!(out, "{:indent$}", "", indent = depth * 2);
    let _ = match layers.kind(id) {
        LayerKind::Container => write!(out, "Container"),
        LayerKind::Offset(v) => write!(out, "Offset({}, {})", v.x, v.y),
        LayerKind::Transform(t) => write!(out, "Transform({:?})", t.as_coeffs()),
        LayerKind::ClipRect(r) => {
            write!(out, "ClipRect({}, {}, {}, {})", r.x0, r.y0, r.x1, r.y1)
        }
        LayerKind::ClipRRect(r) => {
            let rect = r.rect();
            write!(out, "ClipRRect({}, {}, {}, {})", rect.x0, rect.y0, rect.x1, rect.y1)
        }
        LayerKind::ClipCircle(c) => {
            write!(out, "ClipCircle({}, {} r={})", c.center.x, c.center.y, c.radius)
        }
        LayerKind::Picture(p) => {
            let _ = write!(out, "Picture");
            match &p.picture {
                Some(picture) => write!(
                    out,
                    " {:?} ops={} at ({}, {})",
                    picture.id(),
                    picture.draw_op_count(),
                    p.offset.x,
                    p.offset.y,
                ),
                None => write!(out, " (recording)"),
            }
        }
    };
    let b = layers.paint_bounds(id);
    let _ = write!(out, " bounds=({}, {})-({}, {})", b.x0, b.y0, b.x1, b.y1);
    if let LayerKind::Picture(p) = layers.kind(id) {
        if p.hints.will_change {
            out.push_str(" [will-change]");
        }
        if p.hints.is_complex {
            out.push_str(" [complex]");
        }
    }
    out.push('\n');
    for child in layers.children(id) {
        dump_layer(layers, child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Size, Vec2};
    use lamina_core::canvas::{Canvas, Color, Paint};
    use lamina_core::layer::PictureLayer;
    use lamina_core::node::{BoxConstraints, Dimension, NodeKind, ShapeGeometry, Style};
    use lamina_core::picture::PictureRecorder;
    use lamina_core::time::HostTime;

    use super::*;

    #[test]
    fn empty_trees() {
        assert_eq!(dump_nodes(&RenderPipeline::new()), "(no root)\n");
        assert_eq!(dump_layers(&LayerTree::new()), "(no root)\n");
    }

    #[test]
    fn nodes_are_indented_under_their_parent() {
        let mut pipeline = RenderPipeline::new();
        let root = pipeline.create_node(NodeKind::Group, Style::default());
        let child = pipeline.create_node(
            NodeKind::shape(ShapeGeometry::Rect, Color::BLACK),
            Style {
                width: Dimension::Points(4.0),
                height: Dimension::Points(2.0),
                ..Style::default()
            },
        );
        pipeline.append_child(root, child);
        pipeline.set_root(Some(root));
        pipeline.set_root_constraints(BoxConstraints::tight(Size::new(10.0, 10.0)));

        let dirty = dump_nodes(&pipeline);
        assert!(dirty.contains("[needs-layout]"), "got: {dirty}");

        pipeline.flush(HostTime(0));
        let dump = dump_nodes(&pipeline);
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines.len(), 2, "got: {dump}");
        assert!(lines[0].starts_with("Group #"), "got: {dump}");
        assert!(lines[0].contains("10x10 at (0, 0) [boundary]"), "got: {dump}");
        assert!(lines[1].starts_with("  Shape #"), "got: {dump}");
        assert!(lines[1].contains("4x2"), "got: {dump}");
    }

    #[test]
    fn layers_show_kind_and_bounds() {
        let mut rec = PictureRecorder::new();
        rec.draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &Paint::default());
        let mut layers = LayerTree::new();
        let root = layers.create_layer(LayerKind::Offset(Vec2::new(3.0, 0.0)));
        let picture = layers.create_layer(LayerKind::Picture(PictureLayer {
            picture: Some(std::sync::Arc::new(rec.finish())),
            ..PictureLayer::default()
        }));
        layers.set_root(Some(root));
        layers.append_child(root, picture);
        layers.preroll(&mut lamina_core::layer::NoCache, kurbo::Affine::IDENTITY);

        let dump = dump_layers(&layers);
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines[0], "Offset(3, 0) bounds=(3, 0)-(8, 5)");
        assert!(lines[1].starts_with("  Picture PictureId("), "got: {dump}");
        assert!(lines[1].ends_with("ops=1 at (0, 0) bounds=(0, 0)-(5, 5)"), "got: {dump}");
    }
}
