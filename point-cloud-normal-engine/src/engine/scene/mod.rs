//! Renderable scene content built from cloud data.

/// Point-list and normal-overlay mesh construction.
pub mod cloud_mesh;
