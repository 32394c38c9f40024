use bevy::math::Vec3;
use constants::reconstruction::{ID_NONE, UNKNOWN_NORMAL};

/// A single point of a cloud.
///
/// The identity doubles as the point's index inside its cloud, so it can be
/// used directly as an offset into identity-indexed buffers. A freshly built
/// point carries the unknown-normal sentinel until reconstruction (or the
/// source file) supplies a real one.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: i32,
    pub position: Vec3,
    pub normal: Vec3,
    pub colour: Vec3,
}

impl Point {
    /// Create a point at a position with default attributes. The identity is
    /// assigned by the cloud when the point is inserted.
    pub fn new(position: Vec3) -> Self {
        Self {
            id: ID_NONE,
            position,
            normal: UNKNOWN_NORMAL,
            colour: Vec3::ONE,
        }
    }

    pub fn with_colour(mut self, colour: Vec3) -> Self {
        self.colour = colour;
        self
    }

    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = normal;
        self
    }
}

/// Ordered point collection with dense identities.
///
/// Identities are handed out in insertion order, so `id == index` holds for
/// every point and loaders get file-order identities for free. `has_normals`
/// records whether the source format supplied normal channels; when it did,
/// the stored normals are ground truth and the reconstruction pipeline must
/// leave them untouched.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    points: Vec<Point>,
    has_normals: bool,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a point, assigning the next dense identity.
    pub fn push(&mut self, mut point: Point) {
        point.id = self.points.len() as i32;
        self.points.push(point);
    }

    pub fn points_amount(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn get_by_id(&self, id: i32) -> Option<&Point> {
        if id < 0 {
            return None;
        }
        self.points.get(id as usize)
    }

    pub fn has_normals(&self) -> bool {
        self.has_normals
    }

    /// Record whether the source format supplied normal channels. Loaders set
    /// this once at load time.
    pub fn set_has_normals(&mut self, has_normals: bool) {
        self.has_normals = has_normals;
    }

    /// Overwrite one point's normal. Returns false when the identity is out
    /// of range.
    pub fn set_normal(&mut self, id: i32, normal: Vec3) -> bool {
        if id < 0 {
            return false;
        }
        match self.points.get_mut(id as usize) {
            Some(point) => {
                point.normal = normal;
                true
            }
            None => false,
        }
    }

    /// Translate every point by the same offset. Identities are untouched.
    pub fn translate(&mut self, offset: Vec3) {
        for point in &mut self.points {
            point.position += offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_dense_identities() {
        let mut cloud = PointCloud::new();
        cloud.push(Point::new(Vec3::ZERO));
        cloud.push(Point::new(Vec3::X));
        cloud.push(Point::new(Vec3::Y));

        assert_eq!(cloud.points_amount(), 3);
        for (index, point) in cloud.points().iter().enumerate() {
            assert_eq!(point.id, index as i32);
        }
    }

    #[test]
    fn get_by_id_rejects_out_of_range() {
        let mut cloud = PointCloud::new();
        cloud.push(Point::new(Vec3::ZERO));

        assert!(cloud.get_by_id(0).is_some());
        assert!(cloud.get_by_id(1).is_none());
        assert!(cloud.get_by_id(-1).is_none());
    }

    #[test]
    fn new_points_carry_the_unknown_normal() {
        let point = Point::new(Vec3::X);
        assert_eq!(point.normal, UNKNOWN_NORMAL);
        assert_eq!(point.colour, Vec3::ONE);
    }

    #[test]
    fn set_normal_targets_one_identity() {
        let mut cloud = PointCloud::new();
        cloud.push(Point::new(Vec3::ZERO));
        cloud.push(Point::new(Vec3::X));

        assert!(cloud.set_normal(1, Vec3::Y));
        assert_eq!(cloud.get_by_id(0).unwrap().normal, UNKNOWN_NORMAL);
        assert_eq!(cloud.get_by_id(1).unwrap().normal, Vec3::Y);
        assert!(!cloud.set_normal(7, Vec3::Z));
    }
}
