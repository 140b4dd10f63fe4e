#![forbid(unsafe_code)]

//! Geometric primitives shared by the dockpane layout engine.
//!
//! Everything here is measured in integer pixels with a top-left origin.
//! Positions are signed so that intermediate drag math can go negative
//! before clamping.

pub mod geometry;

pub use geometry::{Location, Orientation, Point, Rect, Side, Size};
