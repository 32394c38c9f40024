//! Cloud ingestion from PLY and LAS/LAZ sources.
//!
//! Loaders decide `has_normals` from the source format at load time and hand
//! out dense file-order identities. A loader failure surfaces as an error the
//! caller downgrades to an empty cloud; the pipeline treats an empty cloud as
//! nothing to do.

/// Coordinate bounds tracking for framing and recentring.
pub mod bounds;

/// LAS/LAZ ingestion with axis swap and bounds recentring.
pub mod las_cloud;

/// PLY parsing: header-driven property order, ascii and binary little-endian bodies.
pub mod ply;

use std::error::Error;
use std::path::Path;

use crate::engine::point_cloud::PointCloud;

/// Load a cloud, dispatching on the file extension.
pub fn load_cloud(path: &Path) -> Result<PointCloud, Box<dyn Error>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "ply" => ply::load_ply(path),
        "las" | "laz" => las_cloud::load_las(path),
        other => Err(format!("unsupported point cloud format: .{other}").into()),
    }
}
