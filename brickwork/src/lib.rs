//! Brickwork is a renderer for scenes made of sparse voxel worlds.
//!
//! This crate defines the world model and the ray queries that a path tracer needs.
//! (Cameras, image composition, and the command-line program are kept in other crates.)
//!
//! ## Data model
//!
//! * A [`Scene`] owns a list of [`VoxelWorld`]s and the [`MaterialTable`] that their
//!   voxels refer to.
//! * A [`VoxelWorld`] occupies the unit cube `[0, 1]³` of its own local space and is
//!   placed in the scene by a position, rotation, and scale. Inside, it is a sparse grid of
//!   [`Brick`]s; each brick is a dense 8×8×8 block of voxels, and is only allocated once
//!   something is stored in it.
//! * A voxel is a [`PackedVoxel`]: 24 bits of color and an 8-bit material index, with
//!   zero meaning empty.
//! * [`Light`]s and the [`Environment`] provide illumination; [`Settings`] collects every
//!   option that affects how a frame is rendered.
//!
//! [`shapes`] draws spheres, boxes, and lines into a world.
//!
//! ## Ray queries
//!
//! [`Scene::find_nearest()`] and friends trace a [`Ray`] through every active world
//! and fill in a [`Hit`], from which surface normals, texture coordinates, and material
//! properties can be obtained.
//!
//! ## Crate features
//!
//! * `save`: Enable [`serde`] serialization of [`Settings`] and related types.
//! * `vox`: Enable importing MagicaVoxel `.vox` files into a [`Scene`].
//!
//! ## Dependencies and global state
//!
//! `brickwork` has no global state. However, it does write log messages using the [`log`]
//! crate and is therefore subject to that global configuration, and its parallel
//! algorithms use the global [`rayon`] thread pool.
//!
//! [`Brick`]: crate::brick::Brick
//! [`Environment`]: crate::environment::Environment
//! [`Hit`]: crate::hit::Hit
//! [`Light`]: crate::light::Light
//! [`MaterialTable`]: crate::material::MaterialTable
//! [`PackedVoxel`]: crate::math::PackedVoxel
//! [`Ray`]: crate::raycast::Ray
//! [`Scene`]: crate::scene::Scene
//! [`Scene::find_nearest()`]: crate::scene::Scene::find_nearest
//! [`Settings`]: crate::settings::Settings
//! [`VoxelWorld`]: crate::world::VoxelWorld
#![cfg_attr(
    not(feature = "save"),
    doc = "[`serde`]: https://docs.rs/serde/1.0.204/serde/"
)]
// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]
// Lenience for tests.
#![cfg_attr(test,
    allow(clippy::float_cmp), // deterministic tests
    allow(clippy::redundant_clone), // prefer regularity over efficiency
)]

pub mod automata;
pub mod brick;
pub mod debug_lines;
pub mod environment;
pub mod hit;
#[cfg(feature = "vox")]
pub mod import;
pub mod light;
pub mod material;
pub mod math;
pub mod scene;
pub mod settings;
pub mod shapes;
pub mod world;

/// Algorithm for raycasting through voxel grids.
pub mod raycast {
    pub use brickwork_base::raycast::*;
}

/// Tools that we could imagine being in the Rust standard library, but aren't.
pub mod util {
    pub use brickwork_base::util::*;
}

/// Re-export the version of the `euclid` vector math library we're using.
pub use euclid;
