//! Engine modules for cloud storage, navigation, reconstruction and display.

/// Orbit camera navigation and the viewpoint description consumed by the pipeline.
pub mod camera;

/// Reconstruction compute stages: visibility rasterisation, per-pixel normal
/// estimation, identity-indexed aggregation and the cycle orchestrator.
pub mod compute;

/// Application assembly for the interactive viewer.
pub mod core;

/// Cloud ingestion from PLY and LAS/LAZ sources.
pub mod loading;

/// Point and cloud storage shared by every other module.
pub mod point_cloud;

/// Renderable mesh construction for points and normal overlays.
pub mod scene;

/// Runtime systems: display mode switching and reconstruction triggering.
pub mod systems;
