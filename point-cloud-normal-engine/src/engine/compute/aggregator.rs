use bevy::math::Vec3;
use rayon::prelude::*;

use crate::engine::compute::estimator::NormalAccumulator;

/// One normal per point identity, reduced from the accumulator.
///
/// The array is dense and indexed by identity, matching the cloud's
/// `id == index` invariant. `None` marks an identity whose contribution
/// count stayed at zero — typically a fully occluded point — whose previous
/// normal must be retained.
pub struct AggregatedNormals {
    normals: Vec<Option<Vec3>>,
    covered: usize,
}

impl AggregatedNormals {
    pub fn len(&self) -> usize {
        self.normals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    pub fn get(&self, id: i32) -> Option<Vec3> {
        if id < 0 {
            return None;
        }
        self.normals.get(id as usize).copied().flatten()
    }

    pub fn normals(&self) -> &[Option<Vec3>] {
        &self.normals
    }

    /// Identities that received at least one contribution.
    pub fn covered(&self) -> usize {
        self.covered
    }

    /// Identities no splat pixel ever reached.
    pub fn uncovered(&self) -> usize {
        self.normals.len() - self.covered
    }
}

/// Reduce the accumulator to one averaged, normalised vector per identity.
///
/// Sums whose average cancels below the normalisation threshold are treated
/// the same as uncovered identities: the previous normal stands.
pub fn aggregate_normals(accumulator: &NormalAccumulator) -> AggregatedNormals {
    let normals: Vec<Option<Vec3>> = (0..accumulator.capacity())
        .into_par_iter()
        .map(|slot| {
            let id = slot as i32;
            let count = accumulator.count(id);
            if count == 0 {
                return None;
            }
            (accumulator.sum(id) / count as f32).try_normalize()
        })
        .collect();

    let covered = normals.iter().filter(|normal| normal.is_some()).count();

    AggregatedNormals { normals, covered }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_and_normalises_covered_slots() {
        let accumulator = NormalAccumulator::new(2);
        accumulator.add(0, Vec3::new(0.0, 0.0, 2.0));
        accumulator.add(0, Vec3::new(0.0, 2.0, 0.0));

        let aggregated = aggregate_normals(&accumulator);
        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated.covered(), 1);
        assert_eq!(aggregated.uncovered(), 1);

        let normal = aggregated.get(0).unwrap();
        let expected = Vec3::new(0.0, 1.0, 1.0).normalize();
        assert!(normal.abs_diff_eq(expected, 1e-6));
        assert!(aggregated.get(1).is_none());
    }

    #[test]
    fn cancelling_contributions_leave_the_slot_uncovered() {
        let accumulator = NormalAccumulator::new(1);
        accumulator.add(0, Vec3::Z);
        accumulator.add(0, -Vec3::Z);

        let aggregated = aggregate_normals(&accumulator);
        assert!(aggregated.get(0).is_none());
        assert_eq!(aggregated.covered(), 0);
    }
}
