//! Camera navigation and the viewpoint description for reconstruction.

/// Orbit camera resource and controller system for scene navigation.
pub mod orbit_camera;

/// View/projection pair describing the camera used for one reconstruction cycle.
pub mod viewpoint;
