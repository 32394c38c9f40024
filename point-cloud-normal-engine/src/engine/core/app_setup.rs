use std::path::{Path, PathBuf};

use bevy::prelude::*;
use bevy::window::PresentMode;

use constants::render_settings::{CLEAR_COLOUR, NORMAL_OVERLAY_LENGTH, WINDOW_TITLE};

use crate::engine::camera::orbit_camera::{OrbitCamera, camera_controller};
use crate::engine::compute::reconstruction::{
    NormalReconstruction, ReconstructionSettings, load_settings,
};
use crate::engine::loading::bounds::CloudBounds;
use crate::engine::loading::load_cloud;
use crate::engine::point_cloud::PointCloud;
use crate::engine::scene::cloud_mesh::{create_cloud_point_mesh, create_normal_line_mesh};
use crate::engine::systems::display_mode::{
    DisplayModeState, NormalOverlay, display_mode_system, update_normal_overlay_visibility,
};
use crate::engine::systems::reconstruction_trigger::{
    CloudMeshHandles, ReconstructionContext, reconstruction_keyboard_system,
    refresh_normal_overlay, run_reconstruction, trigger_reconstruction,
};

/// Optional settings file picked up from the working directory.
const SETTINGS_PATH: &str = "reconstruction_settings.json";

/// Build the viewer application around a cloud file.
pub fn create_app(cloud_path: Option<PathBuf>) -> App {
    let context = build_context(cloud_path.as_deref());
    let orbit = if context.cloud.is_empty() {
        OrbitCamera::default()
    } else {
        OrbitCamera::framing(&CloudBounds::from_cloud(&context.cloud))
    };

    let mut app = App::new();
    app.add_plugins(create_default_plugins())
        .insert_resource(ClearColor(CLEAR_COLOUR))
        .init_resource::<DisplayModeState>()
        .init_resource::<CloudMeshHandles>()
        .insert_resource(orbit)
        .insert_resource(context)
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (
                camera_controller,
                trigger_reconstruction,
                run_reconstruction,
                refresh_normal_overlay,
                display_mode_system,
                update_normal_overlay_visibility,
                reconstruction_keyboard_system,
            ),
        );

    app
}

/// Load the cloud and assemble the reconstruction pipeline.
///
/// A failed load degrades to an empty cloud: the viewer still opens and the
/// pipeline treats zero points as nothing to do.
fn build_context(cloud_path: Option<&Path>) -> ReconstructionContext {
    let cloud = match cloud_path {
        Some(path) => match load_cloud(path) {
            Ok(cloud) => cloud,
            Err(error) => {
                eprintln!("Could not load {}: {error}", path.display());
                PointCloud::new()
            }
        },
        None => {
            eprintln!("No cloud file given; starting with an empty scene");
            PointCloud::new()
        }
    };

    let settings = if Path::new(SETTINGS_PATH).exists() {
        match load_settings(Path::new(SETTINGS_PATH)) {
            Ok(settings) => {
                println!("Loaded reconstruction settings from {SETTINGS_PATH}");
                settings
            }
            Err(error) => {
                eprintln!("Ignoring {SETTINGS_PATH}: {error}");
                ReconstructionSettings::default()
            }
        }
    } else {
        ReconstructionSettings::default()
    };

    ReconstructionContext {
        cloud,
        pipeline: NormalReconstruction::new(settings),
    }
}

/// Spawn the camera and the cloud meshes.
fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    context: Res<ReconstructionContext>,
    mut mesh_state: ResMut<CloudMeshHandles>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 0.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let unlit = StandardMaterial {
        unlit: true,
        cull_mode: None,
        ..default()
    };

    let point_mesh = meshes.add(create_cloud_point_mesh(&context.cloud));
    mesh_state.points = Some(point_mesh.clone());
    commands.spawn((
        Mesh3d(point_mesh),
        MeshMaterial3d(materials.add(unlit.clone())),
    ));

    let line_mesh = meshes.add(create_normal_line_mesh(&context.cloud, NORMAL_OVERLAY_LENGTH));
    mesh_state.normal_lines = Some(line_mesh.clone());
    commands.spawn((
        Mesh3d(line_mesh),
        MeshMaterial3d(materials.add(unlit)),
        NormalOverlay,
        Visibility::Hidden,
    ));

    println!(
        "Viewing {} points (normals {})",
        context.cloud.points_amount(),
        if context.cloud.has_normals() {
            "supplied by the source"
        } else {
            "reconstructed per viewpoint"
        }
    );
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(Window {
            title: WINDOW_TITLE.to_string(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    };

    DefaultPlugins.set(window_config)
}
