/// Point cloud coordinate bounds tracking.
use bevy::math::Vec3;

use crate::engine::point_cloud::PointCloud;

#[derive(Debug, Clone)]
pub struct CloudBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl CloudBounds {
    /// Create new bounds initialised to infinity values.
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
            min_z: f64::INFINITY,
            max_z: f64::NEG_INFINITY,
        }
    }

    /// Update bounds with a new point.
    pub fn update(&mut self, x: f64, y: f64, z: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }

    /// Merge another bounds into this one.
    pub fn merge(&mut self, other: &CloudBounds) {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
        self.min_z = self.min_z.min(other.min_z);
        self.max_z = self.max_z.max(other.max_z);
    }

    /// Bounds of an already loaded cloud.
    pub fn from_cloud(cloud: &PointCloud) -> Self {
        let mut bounds = Self::new();
        for point in cloud.points() {
            bounds.update(
                point.position.x as f64,
                point.position.y as f64,
                point.position.z as f64,
            );
        }
        bounds
    }

    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite() && self.max_x.is_finite()
    }

    pub fn centre(&self) -> Vec3 {
        Vec3::new(
            ((self.max_x + self.min_x) * 0.5) as f32,
            ((self.max_y + self.min_y) * 0.5) as f32,
            ((self.max_z + self.min_z) * 0.5) as f32,
        )
    }

    pub fn size(&self) -> Vec3 {
        Vec3::new(
            (self.max_x - self.min_x) as f32,
            (self.max_y - self.min_y) as f32,
            (self.max_z - self.min_z) as f32,
        )
    }
}

impl Default for CloudBounds {
    fn default() -> Self {
        Self::new()
    }
}
