// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recoverable error types.
//!
//! Broken structural invariants (illegal tree mutation, stale handles,
//! re-entrant recording) are programming errors and panic. The types here
//! cover failures that come from outside the engine: user measure and paint
//! callbacks, and backend surfaces.

use alloc::string::String;

/// A failure reported by user code attached to a node.
///
/// The pipeline logs these at the failing node and carries on with the rest
/// of the frame.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    /// A measure callback could not produce a size.
    #[error("measure failed: {0}")]
    Measure(String),
    /// A custom painter failed while drawing.
    #[error("paint failed: {0}")]
    Paint(String),
}

/// A failure reported by a drawing surface.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// The requested size is zero or exceeds what the backend supports.
    #[error("invalid surface size {width}x{height}")]
    InvalidSize {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// A readback rectangle falls outside the surface.
    #[error("readback rectangle out of bounds")]
    OutOfBounds,
    /// The backend could not complete the operation.
    #[error("backend failure: {0}")]
    Backend(String),
}
