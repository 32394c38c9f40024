use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use bevy::math::Vec3;
use indicatif::{ProgressBar, ProgressStyle};
use las::Reader;
use rayon::prelude::*;

use crate::engine::loading::bounds::CloudBounds;
use crate::engine::point_cloud::{Point, PointCloud};

/// Load a LAS/LAZ cloud.
///
/// Coordinates are swapped from the Z-up survey convention to the engine's
/// Y-up convention and recentred on the cloud's bounds, since survey data
/// sits at projected coordinates far from the origin. LAS has no normal
/// channels, so the result always reports `has_normals == false`.
pub fn load_las(path: &Path) -> Result<PointCloud, Box<dyn Error>> {
    let file = File::open(path)
        .map_err(|e| format!("could not open {}: {e}", path.display()))?;
    let mut reader = Reader::new(BufReader::new(file))?;
    let total_points = reader.header().number_of_points() as usize;

    println!("Reading {} points from {}", total_points, path.display());

    let pb = ProgressBar::new(total_points as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} points ({percent}%) {msg}")
            .unwrap()
            .progress_chars("▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Loading points");

    let mut raw: Vec<([f64; 3], Vec3)> = Vec::with_capacity(total_points);
    for (index, point_result) in reader.points().enumerate() {
        let point = point_result?;

        let colour = point
            .color
            .map(|c| {
                Vec3::new(
                    c.red as f32 / 65535.0,
                    c.green as f32 / 65535.0,
                    c.blue as f32 / 65535.0,
                )
            })
            .unwrap_or(Vec3::ONE);

        // Survey Z-up to engine Y-up.
        raw.push(([point.x, point.z, -point.y], colour));

        if index % 50_000 == 0 {
            pb.set_position(index as u64);
        }
    }
    pb.finish_with_message("Points loaded");

    let bounds = raw
        .par_chunks(25_000)
        .map(|chunk| {
            let mut local_bounds = CloudBounds::new();
            for ([x, y, z], _) in chunk {
                local_bounds.update(*x, *y, *z);
            }
            local_bounds
        })
        .reduce_with(|mut a, b| {
            a.merge(&b);
            a
        })
        .unwrap_or_default();

    let centre_x = (bounds.min_x + bounds.max_x) * 0.5;
    let centre_y = (bounds.min_y + bounds.max_y) * 0.5;
    let centre_z = (bounds.min_z + bounds.max_z) * 0.5;

    let mut cloud = PointCloud::new();
    for ([x, y, z], colour) in raw {
        let position = Vec3::new(
            (x - centre_x) as f32,
            (y - centre_y) as f32,
            (z - centre_z) as f32,
        );
        cloud.push(Point::new(position).with_colour(colour));
    }
    cloud.set_has_normals(false);

    Ok(cloud)
}
