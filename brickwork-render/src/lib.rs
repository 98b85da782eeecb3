//! Camera, path-tracing integrator, and frame composition for [`brickwork`] scenes.
//!
//! A [`Renderer`] turns a [`Scene`](brickwork::scene::Scene) seen through a
//! [`Camera`](camera::Camera) into an RGBA image, one frame at a time. Successive frames
//! may be combined, either by averaging while the camera holds still (accumulation) or
//! by blending each frame with the previous one reprojected through the camera's motion.
//!
//! ## Package features
//!
//! This package, `brickwork-render`, defines the following feature flags:
//!
//! * `"auto-threads"` (enabled by default):
//!   Render the rows of each frame in parallel, using [`rayon`]’s global thread pool.
//!   This feature does not affect the public API, only performance and dependencies.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]
// Lenience for tests.
#![cfg_attr(test,
    allow(clippy::float_cmp), // deterministic tests
)]

// -------------------------------------------------------------------------------------------------

pub mod camera;

mod flaws;
pub use flaws::Flaws;

pub mod history;
pub mod integrator;
pub mod overlay;
pub mod persist;

mod renderer;
pub use renderer::{RenderInfo, Renderer, Rendering};


// -------------------------------------------------------------------------------------------------

/// An error indicating that a [`Renderer`] could not produce a frame.
#[derive(Clone, Debug, Eq, Hash, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum RenderError {
    /// The camera's viewport has no pixels.
    #[displaydoc("viewport {width}×{height} contains no pixels")]
    EmptyViewport {
        #[allow(missing_docs)]
        width: u32,
        #[allow(missing_docs)]
        height: u32,
    },

    /// The camera's viewport has more pixels than can be addressed in memory.
    #[displaydoc("viewport {width}×{height} is too large")]
    ViewportTooLarge {
        #[allow(missing_docs)]
        width: u32,
        #[allow(missing_docs)]
        height: u32,
    },
}

impl std::error::Error for RenderError {}
