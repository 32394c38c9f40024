/// Shared tunables and sentinels for the screen-space normal reconstruction pipeline.
use bevy::math::Vec3;

/// Identity buffer sentinel: no point covers this pixel.
pub const ID_NONE: i32 = -1;

/// Cleared depth value (normalised device depth at the far plane).
pub const DEPTH_FAR: f32 = 1.0;

/// Default reconstruction target resolution (pixels).
pub const DEFAULT_TARGET_WIDTH: usize = 256;
pub const DEFAULT_TARGET_HEIGHT: usize = 256;

/// Default enlarged footprint radius for the splat pass (pixels).
pub const DEFAULT_SPLAT_RADIUS: u32 = 3;

/// Default footprint radius for the reference pass (zero = a single pixel).
pub const DEFAULT_REFERENCE_FOOTPRINT: u32 = 0;

/// Normal carried by points the reconstruction has not reached.
pub const UNKNOWN_NORMAL: Vec3 = Vec3::new(0.0, 0.0, 1.0);

/// Tangent cross products shorter than this are treated as collinear samples.
pub const MIN_TANGENT_CROSS_LENGTH: f32 = 1e-12;

/// Per-element tolerance when polling a viewpoint for changes.
pub const VIEWPOINT_EPSILON: f32 = 1e-5;
