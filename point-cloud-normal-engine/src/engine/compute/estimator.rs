use std::sync::atomic::{AtomicU32, Ordering};

use bevy::math::{Mat4, Vec3, Vec4};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use constants::reconstruction::{DEPTH_FAR, ID_NONE, MIN_TANGENT_CROSS_LENGTH};

use crate::engine::camera::viewpoint::Viewpoint;
use crate::engine::compute::visibility::VisibilityBuffers;

/// Which identity buffer owns a pixel's contribution.
///
/// `Splat` attributes an estimate to whichever point the splat pass shows at
/// the pixel, giving dense coverage. `Reference` only attributes where the
/// true-footprint pass placed a point, giving strict ownership at the cost of
/// far fewer contributions. Both are valid; one is chosen per cycle and
/// applied to every pixel of that cycle, because the two differ materially at
/// cloud boundaries and large splat radii.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionMode {
    #[default]
    Splat,
    Reference,
}

/// Per-identity accumulation slots for the estimation scatter-add.
///
/// Sums are stored as float bit patterns in atomic cells so concurrent pixel
/// workers can add into the same identity without locks; this is the only
/// shared mutable state inside a cycle. The accumulator persists across the
/// passes of one cycle, then is reduced and cleared.
pub struct NormalAccumulator {
    sum_x: Vec<AtomicU32>,
    sum_y: Vec<AtomicU32>,
    sum_z: Vec<AtomicU32>,
    counts: Vec<AtomicU32>,
}

impl NormalAccumulator {
    pub fn new(capacity: usize) -> Self {
        let zeroes = || (0..capacity).map(|_| AtomicU32::new(0)).collect();
        Self {
            sum_x: zeroes(),
            sum_y: zeroes(),
            sum_z: zeroes(),
            counts: (0..capacity).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// One slot per point identity.
    pub fn capacity(&self) -> usize {
        self.counts.len()
    }

    pub fn clear(&self) {
        for slot in 0..self.capacity() {
            self.sum_x[slot].store(0, Ordering::Relaxed);
            self.sum_y[slot].store(0, Ordering::Relaxed);
            self.sum_z[slot].store(0, Ordering::Relaxed);
            self.counts[slot].store(0, Ordering::Relaxed);
        }
    }

    /// Atomically add one estimate into an identity's slot.
    pub fn add(&self, id: i32, normal: Vec3) {
        let slot = id as usize;
        atomic_add_f32(&self.sum_x[slot], normal.x);
        atomic_add_f32(&self.sum_y[slot], normal.y);
        atomic_add_f32(&self.sum_z[slot], normal.z);
        self.counts[slot].fetch_add(1, Ordering::Relaxed);
    }

    pub fn sum(&self, id: i32) -> Vec3 {
        let slot = id as usize;
        Vec3::new(
            f32::from_bits(self.sum_x[slot].load(Ordering::Relaxed)),
            f32::from_bits(self.sum_y[slot].load(Ordering::Relaxed)),
            f32::from_bits(self.sum_z[slot].load(Ordering::Relaxed)),
        )
    }

    pub fn count(&self, id: i32) -> u32 {
        self.counts[id as usize].load(Ordering::Relaxed)
    }
}

/// Float addition on an atomic cell via compare-exchange.
fn atomic_add_f32(cell: &AtomicU32, value: f32) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = (f32::from_bits(current) + value).to_bits();
        match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

/// Estimate a local surface normal at every covered pixel of the splat pass
/// and accumulate it into the owning identity's slot.
///
/// The kernel is an order-independent parallel map over pixels. A pixel is
/// skipped, contributing nothing, when:
/// - its splat identity is empty, or a +x/+y neighbour is empty or reads the
///   far plane (cloud boundaries and background, the dominant case),
/// - the pixel and both neighbours carry one single identity (a splat that
///   only sees itself holds no neighbourhood information),
/// - the tangent cross product is degenerate (collinear samples),
/// - reference attribution is selected and no reference point owns the pixel.
///
/// Surviving estimates are oriented towards the camera before accumulation,
/// fixing the sign ambiguity of the cross product.
pub fn estimate_normals(
    accumulator: &NormalAccumulator,
    reference: &VisibilityBuffers,
    splat: &VisibilityBuffers,
    viewpoint: &Viewpoint,
    attribution: AttributionMode,
) {
    let width = splat.width();
    let height = splat.height();
    if width == 0 || height == 0 {
        return;
    }

    let inverse_view_projection = viewpoint.view_projection().inverse();
    let camera_position = viewpoint.camera_position();

    (0..width * height).into_par_iter().for_each(|index| {
        let x = index % width;
        let y = index / width;

        let centre_id = splat.id_at(x, y);
        if centre_id == ID_NONE {
            return;
        }
        if x + 1 >= width || y + 1 >= height {
            return;
        }

        let right_id = splat.id_at(x + 1, y);
        let down_id = splat.id_at(x, y + 1);
        if right_id == ID_NONE || down_id == ID_NONE {
            return;
        }
        if right_id == centre_id && down_id == centre_id {
            return;
        }

        let centre_depth = splat.depth_at(x, y);
        let right_depth = splat.depth_at(x + 1, y);
        let down_depth = splat.depth_at(x, y + 1);
        if centre_depth >= DEPTH_FAR || right_depth >= DEPTH_FAR || down_depth >= DEPTH_FAR {
            return;
        }

        let centre = unproject_pixel(&inverse_view_projection, x, y, centre_depth, width, height);
        let right = unproject_pixel(&inverse_view_projection, x + 1, y, right_depth, width, height);
        let down = unproject_pixel(&inverse_view_projection, x, y + 1, down_depth, width, height);

        let cross = (right - centre).cross(down - centre);
        if cross.length_squared() < MIN_TANGENT_CROSS_LENGTH {
            return;
        }
        let mut normal = cross.normalize();
        if normal.dot(camera_position - centre) < 0.0 {
            normal = -normal;
        }

        let owner = match attribution {
            AttributionMode::Splat => centre_id,
            AttributionMode::Reference => {
                let reference_id = reference.id_at(x, y);
                if reference_id == ID_NONE {
                    return;
                }
                reference_id
            }
        };

        accumulator.add(owner, normal);
    });
}

/// Reconstruct the world-space position seen at a pixel centre from its
/// stored depth and the inverse view-projection.
fn unproject_pixel(
    inverse_view_projection: &Mat4,
    x: usize,
    y: usize,
    depth: f32,
    width: usize,
    height: usize,
) -> Vec3 {
    let ndc_x = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
    let ndc_y = 1.0 - (y as f32 + 0.5) / height as f32 * 2.0;
    let homogeneous = *inverse_view_projection * Vec4::new(ndc_x, ndc_y, depth, 1.0);
    homogeneous.truncate() / homogeneous.w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_float_addition_accumulates() {
        let cell = AtomicU32::new(0);
        for _ in 0..10 {
            atomic_add_f32(&cell, 0.5);
        }
        assert_eq!(f32::from_bits(cell.load(Ordering::Relaxed)), 5.0);
    }

    #[test]
    fn accumulator_tracks_sums_and_counts_per_slot() {
        let accumulator = NormalAccumulator::new(3);
        accumulator.add(1, Vec3::new(0.0, 0.0, 1.0));
        accumulator.add(1, Vec3::new(0.0, 1.0, 0.0));
        accumulator.add(2, Vec3::X);

        assert_eq!(accumulator.count(0), 0);
        assert_eq!(accumulator.count(1), 2);
        assert_eq!(accumulator.count(2), 1);
        assert_eq!(accumulator.sum(1), Vec3::new(0.0, 1.0, 1.0));
        assert_eq!(accumulator.sum(2), Vec3::X);
    }

    #[test]
    fn clear_resets_every_slot() {
        let accumulator = NormalAccumulator::new(2);
        accumulator.add(0, Vec3::Z);
        accumulator.clear();

        assert_eq!(accumulator.count(0), 0);
        assert_eq!(accumulator.sum(0), Vec3::ZERO);
    }

    #[test]
    fn unprojection_inverts_projection() {
        let viewpoint =
            Viewpoint::perspective(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, 45.0, 1.0, 0.1, 100.0);
        let world = Vec3::new(0.2, -0.3, 0.5);
        let clip = viewpoint.view_projection() * world.extend(1.0);
        let ndc = clip.truncate() / clip.w;

        // Feed the exact ndc back through the pixel-centre convention.
        let width = 256usize;
        let height = 256usize;
        let x = ((ndc.x + 1.0) * 0.5 * width as f32 - 0.5).round() as usize;
        let y = ((1.0 - ndc.y) * 0.5 * height as f32 - 0.5).round() as usize;

        let inverse = viewpoint.view_projection().inverse();
        let recovered = unproject_pixel(&inverse, x, y, ndc.z, width, height);

        // Pixel-centre quantisation keeps this close, not exact.
        assert!((recovered - world).length() < 0.02);
    }
}
