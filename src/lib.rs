//! Finder tag toggling for the file playing in an external media player.
/// Application directory resolution.
pub mod app_dirs;
/// Persistent settings and the tag catalog.
pub mod config;
/// Tracing setup.
pub mod logging;
/// Player liveness, current-file probing and playback control.
pub mod player;
/// Subprocess execution seam.
pub mod process;
/// Service wiring from settings.
pub mod services;
/// Active file tracking, reconciliation and tag toggling.
pub mod session;
/// Tag model and extended-attribute storage.
pub mod tags;
