use std::path::Path;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use constants::render_settings::{CAMERA_FAR, CAMERA_FOV_DEGREES, CAMERA_NEAR, NORMAL_OVERLAY_LENGTH};

use crate::engine::camera::viewpoint::Viewpoint;
use crate::engine::compute::debug_export;
use crate::engine::compute::reconstruction::NormalReconstruction;
use crate::engine::point_cloud::PointCloud;
use crate::engine::scene::cloud_mesh::create_normal_line_mesh;

/// The cloud under display and the pipeline that reconstructs its normals.
///
/// The cloud is owned here, on the application side, and lent to the pipeline
/// for the duration of each cycle.
#[derive(Resource)]
pub struct ReconstructionContext {
    pub cloud: PointCloud,
    pub pipeline: NormalReconstruction,
}

/// Handles of the meshes built from the cloud, plus a refresh flag raised
/// after a completed cycle.
#[derive(Resource, Default)]
pub struct CloudMeshHandles {
    pub points: Option<Handle<Mesh>>,
    pub normal_lines: Option<Handle<Mesh>>,
    pub normals_dirty: bool,
}

/// Flag a recomputation whenever the viewer camera moves.
pub fn trigger_reconstruction(
    camera_query: Query<&GlobalTransform, (With<Camera3d>, Changed<GlobalTransform>)>,
    mut context: ResMut<ReconstructionContext>,
) {
    if camera_query.single().is_ok() {
        context.pipeline.request_recompute();
    }
}

/// Run a reconstruction cycle when the pipeline reports one is due.
///
/// The viewpoint is assembled from the live camera transform and the window
/// aspect ratio; a completed cycle raises the mesh refresh flag.
pub fn run_reconstruction(
    mut context: ResMut<ReconstructionContext>,
    mut mesh_state: ResMut<CloudMeshHandles>,
    camera_query: Query<&GlobalTransform, With<Camera3d>>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let Ok(camera_transform) = camera_query.single() else {
        return;
    };
    let Ok(window) = windows.single() else {
        return;
    };

    let aspect = window.width() / window.height().max(1.0);
    let view = camera_transform.compute_matrix().inverse();
    let projection =
        Mat4::perspective_rh_gl(CAMERA_FOV_DEGREES.to_radians(), aspect, CAMERA_NEAR, CAMERA_FAR);
    let viewpoint = Viewpoint::new(view, projection, CAMERA_NEAR, CAMERA_FAR);

    let ReconstructionContext { cloud, pipeline } = &mut *context;
    match pipeline.run_cycle_if_needed(cloud, &viewpoint) {
        Ok(true) => mesh_state.normals_dirty = true,
        Ok(false) => {}
        Err(error) => eprintln!("Reconstruction cycle aborted: {error}"),
    }
}

/// Rebuild the normal overlay mesh after a completed cycle.
pub fn refresh_normal_overlay(
    mut mesh_state: ResMut<CloudMeshHandles>,
    context: Res<ReconstructionContext>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    if !mesh_state.normals_dirty {
        return;
    }
    let Some(handle) = mesh_state.normal_lines.clone() else {
        return;
    };
    if let Some(mesh) = meshes.get_mut(&handle) {
        *mesh = create_normal_line_mesh(&context.cloud, NORMAL_OVERLAY_LENGTH);
        mesh_state.normals_dirty = false;
    }
}

/// Pipeline control keys.
///
/// R requests a recompute, Tab toggles automatic recomputation, numpad +/-
/// grow and shrink the splat footprint, and I/O/P export the identity, normal
/// and depth maps of the last splat pass.
pub fn reconstruction_keyboard_system(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut context: ResMut<ReconstructionContext>,
) {
    if keyboard.just_pressed(KeyCode::KeyR) {
        context.pipeline.request_recompute();
        println!("Recompute requested");
    }

    if keyboard.just_pressed(KeyCode::Tab) {
        let enabled = !context.pipeline.recompute_enabled;
        context.pipeline.recompute_enabled = enabled;
        println!(
            "Automatic recompute: {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    if keyboard.just_pressed(KeyCode::NumpadAdd) {
        let radius = context.pipeline.settings().splat_radius + 1;
        context.pipeline.set_splat_radius(radius);
        println!("Splat radius: {radius} px");
    }
    if keyboard.just_pressed(KeyCode::NumpadSubtract) {
        let radius = context.pipeline.settings().splat_radius.saturating_sub(1);
        context.pipeline.set_splat_radius(radius);
        println!("Splat radius: {radius} px");
    }

    if keyboard.just_pressed(KeyCode::KeyI) {
        let result =
            debug_export::export_id_map(context.pipeline.splat_buffers(), Path::new("id_map.png"));
        if let Err(error) = result {
            eprintln!("Could not export identity map: {error}");
        }
    }
    if keyboard.just_pressed(KeyCode::KeyO) {
        let result = debug_export::export_normal_map(
            context.pipeline.splat_buffers(),
            &context.cloud,
            Path::new("normal_map.png"),
        );
        if let Err(error) = result {
            eprintln!("Could not export normal map: {error}");
        }
    }
    if keyboard.just_pressed(KeyCode::KeyP) {
        let result = debug_export::export_depth_map(
            context.pipeline.splat_buffers(),
            Path::new("depth_map.png"),
        );
        if let Err(error) = result {
            eprintln!("Could not export depth map: {error}");
        }
    }
}
