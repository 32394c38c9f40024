//! Point cloud viewer with screen-space normal reconstruction.
//!
//! Clouds that arrive without normal channels are rasterised from the current
//! viewpoint into depth and identity images, per-pixel normals are estimated
//! from depth differences, and the estimates are aggregated back onto the
//! points they belong to. Clouds that already carry normals are never touched.

pub mod engine;
