//! Application assembly for the interactive viewer.

/// Window configuration, resource setup and system registration.
pub mod app_setup;
