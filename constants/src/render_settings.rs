use bevy::prelude::*;

/// Vertical field of view of the viewer camera (degrees).
pub const CAMERA_FOV_DEGREES: f32 = 45.0;

/// Viewer camera clip planes.
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 100.0;

/// World-space length of the normal overlay segments.
pub const NORMAL_OVERLAY_LENGTH: f32 = 0.05;

pub const WINDOW_TITLE: &str = "Depth Buffer Normal Reconstruction";

pub const CLEAR_COLOUR: Color = Color::srgb(0.08, 0.08, 0.10);
