//! Shared configuration constants for the normal reconstruction viewer.

pub mod reconstruction;
pub mod render_settings;
