use bevy::input::mouse::MouseScrollUnit;
use bevy::{
    input::mouse::{MouseMotion, MouseWheel},
    math::EulerRot,
    prelude::*,
};

use crate::engine::loading::bounds::CloudBounds;

/// Orbit camera state: the viewer circles a focus point at a distance.
#[derive(Resource)]
pub struct OrbitCamera {
    pub focus_point: Vec3,
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl OrbitCamera {
    /// Frame a loaded cloud so it fills a comfortable part of the view.
    pub fn framing(bounds: &CloudBounds) -> Self {
        let size = bounds.size();
        Self {
            focus_point: bounds.centre(),
            distance: (size.length() * 1.5).max(1.0),
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            focus_point: Vec3::ZERO,
            distance: 4.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

/// Drive the viewer camera from mouse and keyboard input.
///
/// Left drag orbits, the wheel dollies, WASD pans the focus point in the view
/// plane and Q/E move it vertically. Shift and Ctrl scale the pan speed.
pub fn camera_controller(
    mut camera_query: Query<&mut Transform, With<Camera3d>>,
    mut orbit: ResMut<OrbitCamera>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut scroll_events: EventReader<MouseWheel>,
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
) {
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    let mouse_delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    if mouse_button.pressed(MouseButton::Left) && mouse_delta != Vec2::ZERO {
        let yaw_sens = 0.0035;
        let pitch_sens = 0.0030;
        orbit.yaw -= mouse_delta.x * yaw_sens;
        orbit.pitch = (orbit.pitch - mouse_delta.y * pitch_sens).clamp(-1.55, 1.55);
    }

    let mut scroll_accum = 0.0;
    for ev in scroll_events.read() {
        scroll_accum += match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y * 0.05,
        };
    }
    if scroll_accum.abs() > f32::EPSILON {
        orbit.distance = (orbit.distance * (1.0 - scroll_accum * 0.1)).clamp(0.05, 500.0);
    }

    let rotation = Quat::from_euler(EulerRot::YXZ, orbit.yaw, orbit.pitch, 0.0);

    let mut move_input = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        move_input.z -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        move_input.z += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        move_input.x += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        move_input.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyE) {
        move_input.y += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyQ) {
        move_input.y -= 1.0;
    }

    if move_input != Vec3::ZERO {
        let forward = (rotation * Vec3::Z).normalize();
        let right = (rotation * Vec3::X).normalize();

        let mut speed = (orbit.distance * 0.5).clamp(0.2, 50.0);
        if keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]) {
            speed *= 3.5;
        }
        if keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]) {
            speed *= 0.25;
        }

        let world_delta = right * move_input.x + Vec3::Y * move_input.y + forward * move_input.z;
        orbit.focus_point += world_delta.normalize() * speed * time.delta_secs();
    }

    camera_transform.translation = orbit.focus_point + rotation * Vec3::new(0.0, 0.0, orbit.distance);
    camera_transform.rotation = rotation;
}
