//! This library is an internal component of [`brickwork`],
//! which defines some core mathematical types and functions.
//! Do not depend on this library; use only [`brickwork`] instead.
//!
//! [`brickwork`]: ../brickwork/index.html

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]
#![warn(clippy::missing_inline_in_public_items)]

/// Do not use this module directly; its contents are re-exported from `brickwork`.
pub mod math;

/// Do not use this module directly; its contents are re-exported from `brickwork`.
pub mod raycast;

/// Do not use this module directly; its contents are re-exported from `brickwork`.
pub mod util;

// reexport for convenience of our tests
#[doc(hidden)]
pub use euclid;
