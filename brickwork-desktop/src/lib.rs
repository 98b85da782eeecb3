//! Components of the `brickwork` command-line renderer.
//!
//! This is not a general-purpose library. It exists as a library, separate from the binary
//! target in this package, so that its pieces can be tested on their own.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

mod config_files;
pub use config_files::{SettingsArgs, load_config};
mod environment_map;
pub use environment_map::load_environment_map;
pub mod logging;
pub mod record;
mod scene_source;
pub use scene_source::{LiveScene, SceneSource};
mod state_files;
pub use state_files::{
    read_camera_file, read_settings_file, write_camera_file, write_settings_file,
};
