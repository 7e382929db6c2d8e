// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostics for Lamina.
//!
//! - [`pretty::PrettyPrintSink`] writes one human-readable line per trace
//!   event.
//! - [`recorder::RecorderSink`] records events into a compact byte buffer,
//!   and [`recorder::decode`] plays them back.
//! - [`chrome::export`] turns a recording into Chrome Trace Event Format
//!   JSON.
//! - [`dump`] renders the node tree and layer tree as indented text.

pub mod chrome;
pub mod dump;
pub mod pretty;
pub mod recorder;
