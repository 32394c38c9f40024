use bevy::prelude::*;
use bevy::{render::mesh::PrimitiveTopology, render::render_asset::RenderAssetUsages};

use crate::engine::point_cloud::PointCloud;

/// Build a point-list mesh carrying the cloud's positions and colours.
pub fn create_cloud_point_mesh(cloud: &PointCloud) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::PointList, RenderAssetUsages::default());

    let positions: Vec<[f32; 3]> = cloud
        .points()
        .iter()
        .map(|point| point.position.to_array())
        .collect();
    let colours: Vec<[f32; 4]> = cloud
        .points()
        .iter()
        .map(|point| [point.colour.x, point.colour.y, point.colour.z, 1.0])
        .collect();

    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colours);
    mesh
}

/// Build the normal overlay: one line segment per point, from the point along
/// its current normal, coloured by direction (`n * 0.5 + 0.5`).
pub fn create_normal_line_mesh(cloud: &PointCloud, length: f32) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default());

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(cloud.points_amount() * 2);
    let mut colours: Vec<[f32; 4]> = Vec::with_capacity(cloud.points_amount() * 2);

    for point in cloud.points() {
        let tip = point.position + point.normal * length;
        positions.push(point.position.to_array());
        positions.push(tip.to_array());

        let encoded = point.normal * 0.5 + 0.5;
        let colour = [encoded.x, encoded.y, encoded.z, 1.0];
        colours.push(colour);
        colours.push(colour);
    }

    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colours);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::point_cloud::Point;
    use bevy::math::Vec3;

    #[test]
    fn point_mesh_has_one_vertex_per_point() {
        let mut cloud = PointCloud::new();
        cloud.push(Point::new(Vec3::ZERO));
        cloud.push(Point::new(Vec3::X));

        let mesh = create_cloud_point_mesh(&cloud);
        assert_eq!(mesh.count_vertices(), 2);
    }

    #[test]
    fn normal_mesh_has_two_vertices_per_point() {
        let mut cloud = PointCloud::new();
        cloud.push(Point::new(Vec3::ZERO));
        cloud.push(Point::new(Vec3::X));
        cloud.push(Point::new(Vec3::Y));

        let mesh = create_normal_line_mesh(&cloud, 0.1);
        assert_eq!(mesh.count_vertices(), 6);
    }
}
