use bevy::prelude::*;

/// How the loaded cloud is presented. Purely a display concern; the
/// reconstruction pipeline neither reads nor writes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayMode {
    Points = 0,
    PointsWithNormals = 1,
}

#[derive(Resource, Clone)]
pub struct DisplayModeState {
    pub current_mode: DisplayMode,
}

impl Default for DisplayModeState {
    fn default() -> Self {
        Self {
            current_mode: DisplayMode::Points,
        }
    }
}

/// Marks the normal overlay entity so its visibility can follow the mode.
#[derive(Component)]
pub struct NormalOverlay;

/// Toggle the normal overlay with N.
pub fn display_mode_system(
    mut display_state: ResMut<DisplayModeState>,
    keyboard: Res<ButtonInput<KeyCode>>,
) {
    if keyboard.just_pressed(KeyCode::KeyN) {
        display_state.current_mode = match display_state.current_mode {
            DisplayMode::Points => DisplayMode::PointsWithNormals,
            DisplayMode::PointsWithNormals => DisplayMode::Points,
        };
        println!("Display mode: {:?}", display_state.current_mode);
    }
}

/// Keep the overlay entity's visibility in step with the display mode.
pub fn update_normal_overlay_visibility(
    display_state: Res<DisplayModeState>,
    mut overlay_query: Query<&mut Visibility, With<NormalOverlay>>,
) {
    for mut visibility in &mut overlay_query {
        *visibility = if display_state.current_mode == DisplayMode::PointsWithNormals {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
    }
}
