use std::error::Error;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use constants::reconstruction::{
    DEFAULT_REFERENCE_FOOTPRINT, DEFAULT_SPLAT_RADIUS, DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH,
};

use crate::engine::camera::viewpoint::Viewpoint;
use crate::engine::compute::aggregator::aggregate_normals;
use crate::engine::compute::estimator::{AttributionMode, NormalAccumulator, estimate_normals};
use crate::engine::compute::visibility::{VisibilityBuffers, rasterise_points};
use crate::engine::point_cloud::PointCloud;

/// Tunables for one reconstruction pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructionSettings {
    /// Reconstruction target resolution in pixels.
    pub target_width: usize,
    pub target_height: usize,
    /// Footprint radius of the reference pass (zero = a single pixel).
    pub reference_footprint: u32,
    /// Enlarged footprint radius of the splat pass.
    pub splat_radius: u32,
    /// Which identity buffer owns a pixel's contribution.
    pub attribution: AttributionMode,
}

impl Default for ReconstructionSettings {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            reference_footprint: DEFAULT_REFERENCE_FOOTPRINT,
            splat_radius: DEFAULT_SPLAT_RADIUS,
            attribution: AttributionMode::default(),
        }
    }
}

/// Load settings from a JSON file.
pub fn load_settings(path: &Path) -> Result<ReconstructionSettings, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Lifecycle of the normals attached to a cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalState {
    /// The source file supplied normals; the pipeline never runs.
    GroundTruth,
    /// No usable normals for the current viewpoint; a cycle is due.
    Stale,
    /// Normals computed for the last seen viewpoint.
    Fresh,
}

/// The screen-space normal reconstruction pipeline for one cloud.
///
/// Owns every buffer it needs — two visibility pairs and the per-identity
/// accumulator — and reallocates them only when the target resolution or the
/// point count changes. The cloud itself is borrowed per cycle; this pipeline
/// instance is its single writer. A cycle is synchronous: `run_cycle_if_needed`
/// returns only after write-back, and once started a cycle always runs to
/// completion.
pub struct NormalReconstruction {
    settings: ReconstructionSettings,
    reference: VisibilityBuffers,
    splat: VisibilityBuffers,
    accumulator: NormalAccumulator,
    state: NormalState,
    last_viewpoint: Option<Viewpoint>,
    /// Master switch bounding recomputation cost; when off, cycles are skipped.
    pub recompute_enabled: bool,
    cycles_run: usize,
    last_covered: usize,
    last_uncovered: usize,
}

impl NormalReconstruction {
    pub fn new(settings: ReconstructionSettings) -> Self {
        let reference = VisibilityBuffers::new(settings.target_width, settings.target_height);
        let splat = VisibilityBuffers::new(settings.target_width, settings.target_height);
        Self {
            settings,
            reference,
            splat,
            accumulator: NormalAccumulator::new(0),
            state: NormalState::Stale,
            last_viewpoint: None,
            recompute_enabled: true,
            cycles_run: 0,
            last_covered: 0,
            last_uncovered: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ReconstructionSettings::default())
    }

    pub fn settings(&self) -> &ReconstructionSettings {
        &self.settings
    }

    pub fn state(&self) -> NormalState {
        self.state
    }

    /// Completed cycles since construction.
    pub fn cycles_run(&self) -> usize {
        self.cycles_run
    }

    /// Covered / uncovered identity counts of the most recent cycle.
    pub fn last_coverage(&self) -> (usize, usize) {
        (self.last_covered, self.last_uncovered)
    }

    pub fn reference_buffers(&self) -> &VisibilityBuffers {
        &self.reference
    }

    pub fn splat_buffers(&self) -> &VisibilityBuffers {
        &self.splat
    }

    /// Change the splat footprint and mark the current normals stale.
    pub fn set_splat_radius(&mut self, splat_radius: u32) {
        self.settings.splat_radius = splat_radius;
        self.request_recompute();
    }

    /// Resize the reconstruction target, reallocating the visibility buffers.
    pub fn resize_target(&mut self, width: usize, height: usize) {
        if width == self.settings.target_width && height == self.settings.target_height {
            return;
        }
        self.settings.target_width = width;
        self.settings.target_height = height;
        self.reference = VisibilityBuffers::new(width, height);
        self.splat = VisibilityBuffers::new(width, height);
        self.request_recompute();
    }

    /// Manual override: mark the normals stale regardless of current state.
    /// Ground-truth clouds still skip the cycle itself.
    pub fn request_recompute(&mut self) {
        self.state = NormalState::Stale;
    }

    /// Whether the cloud currently carries usable normals, either from its
    /// source file or from a completed reconstruction.
    pub fn has_valid_normals(&self, cloud: &PointCloud) -> bool {
        cloud.has_normals() || self.state == NormalState::Fresh
    }

    fn is_stale(&self, viewpoint: &Viewpoint) -> bool {
        match self.state {
            NormalState::Stale => true,
            NormalState::GroundTruth => false,
            NormalState::Fresh => match &self.last_viewpoint {
                Some(last) => !last.approx_eq(viewpoint),
                None => true,
            },
        }
    }

    /// Reallocate the accumulator when the point count changes.
    fn ensure_capacity(&mut self, points_amount: usize) {
        if self.accumulator.capacity() != points_amount {
            self.accumulator = NormalAccumulator::new(points_amount);
        }
    }

    /// Configuration problems are fatal to the cycle and must surface before
    /// any rasterisation touches the buffers.
    fn validate_configuration(&self, points_amount: usize) -> Result<(), Box<dyn Error>> {
        if self.settings.target_width == 0 || self.settings.target_height == 0 {
            return Err(format!(
                "reconstruction target has a zero dimension ({}x{})",
                self.settings.target_width, self.settings.target_height
            )
            .into());
        }
        let buffers_match = |buffers: &VisibilityBuffers| {
            buffers.width() == self.settings.target_width
                && buffers.height() == self.settings.target_height
        };
        if !buffers_match(&self.reference) || !buffers_match(&self.splat) {
            return Err("visibility buffers are not sized to the reconstruction target".into());
        }
        if self.accumulator.capacity() != points_amount {
            return Err(format!(
                "accumulator holds {} slots for {} points",
                self.accumulator.capacity(),
                points_amount
            )
            .into());
        }
        Ok(())
    }

    /// Run one reconstruction cycle when one is due; returns whether it ran.
    ///
    /// Skips without touching anything when the cloud is ground truth, when
    /// the cloud is empty (a failed load is an empty cloud, not a crash),
    /// when recomputation is disabled, or when nothing is stale for this
    /// viewpoint. Otherwise the full sequence runs synchronously:
    /// clear → rasterise reference and splat → estimate → aggregate →
    /// write back, with a hard barrier between stages.
    pub fn run_cycle_if_needed(
        &mut self,
        cloud: &mut PointCloud,
        viewpoint: &Viewpoint,
    ) -> Result<bool, Box<dyn Error>> {
        if cloud.has_normals() {
            // Ground truth must never be overwritten.
            self.state = NormalState::GroundTruth;
            return Ok(false);
        }
        if cloud.is_empty() {
            return Ok(false);
        }
        if !self.recompute_enabled {
            return Ok(false);
        }
        if !self.is_stale(viewpoint) {
            return Ok(false);
        }

        self.ensure_capacity(cloud.points_amount());
        self.validate_configuration(cloud.points_amount())?;

        self.reference.clear();
        self.splat.clear();
        self.accumulator.clear();

        rasterise_points(
            &self.reference,
            cloud,
            viewpoint,
            self.settings.reference_footprint,
        );
        rasterise_points(&self.splat, cloud, viewpoint, self.settings.splat_radius);

        estimate_normals(
            &self.accumulator,
            &self.reference,
            &self.splat,
            viewpoint,
            self.settings.attribution,
        );

        let aggregated = aggregate_normals(&self.accumulator);

        for (id, normal) in aggregated.normals().iter().enumerate() {
            if let Some(normal) = normal {
                cloud.set_normal(id as i32, *normal);
            }
        }

        self.last_covered = aggregated.covered();
        self.last_uncovered = aggregated.uncovered();
        self.last_viewpoint = Some(*viewpoint);
        self.state = NormalState::Fresh;
        self.cycles_run += 1;

        println!(
            "Reconstruction cycle {}: {} points covered, {} without splat coverage",
            self.cycles_run, self.last_covered, self.last_uncovered
        );

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_the_shared_constants() {
        let settings = ReconstructionSettings::default();
        assert_eq!(settings.target_width, DEFAULT_TARGET_WIDTH);
        assert_eq!(settings.splat_radius, DEFAULT_SPLAT_RADIUS);
        assert_eq!(settings.attribution, AttributionMode::Splat);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings = ReconstructionSettings {
            target_width: 128,
            target_height: 64,
            reference_footprint: 1,
            splat_radius: 5,
            attribution: AttributionMode::Reference,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let restored: ReconstructionSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.target_width, 128);
        assert_eq!(restored.splat_radius, 5);
        assert_eq!(restored.attribution, AttributionMode::Reference);
    }

    #[test]
    fn resize_reallocates_the_visibility_buffers() {
        let mut pipeline = NormalReconstruction::with_defaults();
        pipeline.resize_target(32, 16);
        assert_eq!(pipeline.reference_buffers().width(), 32);
        assert_eq!(pipeline.splat_buffers().height(), 16);
        assert_eq!(pipeline.state(), NormalState::Stale);
    }
}
