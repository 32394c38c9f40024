use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use constants::reconstruction::{DEPTH_FAR, ID_NONE};

use crate::engine::camera::viewpoint::Viewpoint;
use crate::engine::point_cloud::PointCloud;

/// Aligned depth + identity image pair for one rasterisation pass.
///
/// Each pixel stores the normalised device depth (32-bit float) and exact
/// identity of the nearest point covering it, packed into one atomic cell so
/// the depth test and the identity write cannot be torn apart by concurrent
/// writers. Equal-depth collisions resolve to the lower identity, which keeps
/// repeated passes over the same input bit-stable.
///
/// Buffers are sized once per target resolution and cleared at the start of
/// every cycle; they carry no state across cycles.
pub struct VisibilityBuffers {
    width: usize,
    height: usize,
    cells: Vec<AtomicU64>,
}

impl VisibilityBuffers {
    pub fn new(width: usize, height: usize) -> Self {
        let cells = (0..width * height)
            .map(|_| AtomicU64::new(pack(DEPTH_FAR, ID_NONE)))
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reset every pixel to far depth and the empty identity.
    pub fn clear(&self) {
        let empty = pack(DEPTH_FAR, ID_NONE);
        for cell in &self.cells {
            cell.store(empty, Ordering::Relaxed);
        }
    }

    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        let cell = self.cells[y * self.width + x].load(Ordering::Relaxed);
        depth_from_bits((cell >> 32) as u32)
    }

    pub fn id_at(&self, x: usize, y: usize) -> i32 {
        let cell = self.cells[y * self.width + x].load(Ordering::Relaxed);
        cell as u32 as i32
    }

    /// Depth-test write: the pixel keeps whichever of the stored and offered
    /// (depth, identity) pairs is nearer.
    fn write_if_nearer(&self, x: usize, y: usize, depth: f32, id: i32) {
        self.cells[y * self.width + x].fetch_min(pack(depth, id), Ordering::Relaxed);
    }
}

/// Map a float depth onto bits whose unsigned order matches the float order,
/// so an atomic integer minimum implements the depth test.
fn depth_to_bits(depth: f32) -> u32 {
    let bits = depth.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    }
}

fn depth_from_bits(bits: u32) -> f32 {
    if bits & 0x8000_0000 != 0 {
        f32::from_bits(bits & 0x7FFF_FFFF)
    } else {
        f32::from_bits(!bits)
    }
}

fn pack(depth: f32, id: i32) -> u64 {
    ((depth_to_bits(depth) as u64) << 32) | id as u32 as u64
}

/// Rasterise every point of a cloud into a visibility buffer pair.
///
/// Each point projects to a single pixel which its footprint square of
/// half-width `footprint_radius` is centred on; a radius of zero is the true
/// one-pixel footprint of the reference pass, larger radii are the splat
/// pass. The whole footprint shares the centre depth. Points behind the
/// camera or outside the depth range are culled; footprint pixels falling
/// off the target are clipped per pixel.
pub fn rasterise_points(
    target: &VisibilityBuffers,
    cloud: &PointCloud,
    viewpoint: &Viewpoint,
    footprint_radius: u32,
) {
    let view_projection = viewpoint.view_projection();
    let width = target.width() as i32;
    let height = target.height() as i32;
    let radius = footprint_radius as i32;

    cloud.points().par_iter().for_each(|point| {
        let clip = view_projection * point.position.extend(1.0);
        if clip.w <= 0.0 {
            return;
        }
        let ndc = clip.truncate() / clip.w;
        if ndc.z < -1.0 || ndc.z > 1.0 {
            return;
        }

        let pixel_x = ((ndc.x + 1.0) * 0.5 * width as f32).floor() as i32;
        let pixel_y = ((1.0 - ndc.y) * 0.5 * height as f32).floor() as i32;

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let x = pixel_x + dx;
                let y = pixel_y + dy;
                if x >= 0 && x < width && y >= 0 && y < height {
                    target.write_if_nearer(x as usize, y as usize, ndc.z, point.id);
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Vec3;
    use crate::engine::point_cloud::Point;

    fn test_viewpoint() -> Viewpoint {
        Viewpoint::perspective(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO, 45.0, 1.0, 0.1, 100.0)
    }

    #[test]
    fn depth_bits_preserve_ordering() {
        let depths = [-1.0f32, -0.25, 0.0, 0.5, 0.75, 1.0];
        for pair in depths.windows(2) {
            assert!(depth_to_bits(pair[0]) < depth_to_bits(pair[1]));
        }
        for depth in depths {
            assert_eq!(depth_from_bits(depth_to_bits(depth)), depth);
        }
    }

    #[test]
    fn cleared_buffers_read_the_sentinels() {
        let buffers = VisibilityBuffers::new(4, 4);
        buffers.clear();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(buffers.id_at(x, y), ID_NONE);
                assert_eq!(buffers.depth_at(x, y), DEPTH_FAR);
            }
        }
    }

    #[test]
    fn nearer_point_wins_the_pixel() {
        let buffers = VisibilityBuffers::new(2, 2);
        buffers.clear();
        buffers.write_if_nearer(0, 0, 0.8, 5);
        buffers.write_if_nearer(0, 0, 0.3, 9);
        buffers.write_if_nearer(0, 0, 0.6, 2);

        assert_eq!(buffers.id_at(0, 0), 9);
        assert_eq!(buffers.depth_at(0, 0), 0.3);
    }

    #[test]
    fn equal_depth_resolves_to_the_lower_identity() {
        let buffers = VisibilityBuffers::new(1, 1);
        buffers.clear();
        buffers.write_if_nearer(0, 0, 0.5, 7);
        buffers.write_if_nearer(0, 0, 0.5, 3);
        buffers.write_if_nearer(0, 0, 0.5, 11);

        assert_eq!(buffers.id_at(0, 0), 3);
    }

    #[test]
    fn rasterised_point_lands_at_the_projected_pixel() {
        let mut cloud = PointCloud::new();
        cloud.push(Point::new(Vec3::ZERO));

        let buffers = VisibilityBuffers::new(64, 64);
        buffers.clear();
        rasterise_points(&buffers, &cloud, &test_viewpoint(), 0);

        // A point on the view axis projects to the image centre.
        assert_eq!(buffers.id_at(32, 32), 0);
        assert!(buffers.depth_at(32, 32) < DEPTH_FAR);

        let covered: usize = (0..64 * 64)
            .filter(|i| buffers.id_at(i % 64, i / 64) != ID_NONE)
            .count();
        assert_eq!(covered, 1);
    }

    #[test]
    fn footprints_clip_at_the_target_edge() {
        let mut cloud = PointCloud::new();
        // Far off to the left so most of the splat square is off-screen.
        cloud.push(Point::new(Vec3::new(-1.65, 0.0, 0.0)));

        let buffers = VisibilityBuffers::new(64, 64);
        buffers.clear();
        rasterise_points(&buffers, &cloud, &test_viewpoint(), 4);

        let covered: usize = (0..64 * 64)
            .filter(|i| buffers.id_at(i % 64, i / 64) != ID_NONE)
            .count();
        assert!(covered > 0);
    }

    #[test]
    fn points_behind_the_camera_are_culled() {
        let mut cloud = PointCloud::new();
        cloud.push(Point::new(Vec3::new(0.0, 0.0, 10.0)));

        let buffers = VisibilityBuffers::new(16, 16);
        buffers.clear();
        rasterise_points(&buffers, &cloud, &test_viewpoint(), 2);

        let covered: usize = (0..16 * 16)
            .filter(|i| buffers.id_at(i % 16, i / 16) != ID_NONE)
            .count();
        assert_eq!(covered, 0);
    }
}
