use std::error::Error;
use std::path::Path;

use image::{Rgb, RgbImage};

use constants::reconstruction::ID_NONE;

use crate::engine::compute::visibility::VisibilityBuffers;
use crate::engine::point_cloud::PointCloud;

/// Write the depth channel of a visibility pass as a greyscale PNG.
/// Normalised device depth [-1, 1] maps to [0, 255]; empty pixels read white.
pub fn export_depth_map(buffers: &VisibilityBuffers, path: &Path) -> Result<(), Box<dyn Error>> {
    let img = RgbImage::from_fn(buffers.width() as u32, buffers.height() as u32, |x, y| {
        let depth = buffers.depth_at(x as usize, y as usize);
        let level = (((depth + 1.0) * 0.5).clamp(0.0, 1.0) * 255.0) as u8;
        Rgb([level, level, level])
    });
    img.save(path)?;
    println!("Saved {} (depth map)", path.display());
    Ok(())
}

/// Write the identity channel of a visibility pass as a PNG, spreading
/// identities over the palette so adjacent ids stay distinguishable. Empty
/// pixels are black.
pub fn export_id_map(buffers: &VisibilityBuffers, path: &Path) -> Result<(), Box<dyn Error>> {
    let img = RgbImage::from_fn(buffers.width() as u32, buffers.height() as u32, |x, y| {
        let id = buffers.id_at(x as usize, y as usize);
        if id == ID_NONE {
            return Rgb([0, 0, 0]);
        }
        let hash = (id as u32).wrapping_mul(2_654_435_761);
        Rgb([
            (hash >> 16) as u8,
            (hash >> 8) as u8,
            hash as u8 | 0x40,
        ])
    });
    img.save(path)?;
    println!("Saved {} (identity map)", path.display());
    Ok(())
}

/// Write a per-pixel normal map PNG: each covered pixel shows the current
/// normal of the point visible there, encoded as `n * 0.5 + 0.5`.
pub fn export_normal_map(
    buffers: &VisibilityBuffers,
    cloud: &PointCloud,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let img = RgbImage::from_fn(buffers.width() as u32, buffers.height() as u32, |x, y| {
        let id = buffers.id_at(x as usize, y as usize);
        match cloud.get_by_id(id) {
            Some(point) => {
                let encoded = point.normal * 0.5 + 0.5;
                Rgb([
                    (encoded.x.clamp(0.0, 1.0) * 255.0) as u8,
                    (encoded.y.clamp(0.0, 1.0) * 255.0) as u8,
                    (encoded.z.clamp(0.0, 1.0) * 255.0) as u8,
                ])
            }
            None => Rgb([0, 0, 0]),
        }
    });
    img.save(path)?;
    println!("Saved {} (normal map)", path.display());
    Ok(())
}
