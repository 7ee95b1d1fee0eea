#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Two-view geometry: recovering epipolar geometry, camera candidates and 3D
//! structure from 2D correspondences.
//!
//! - [`estimate_fundamental_normalized`]: fundamental matrix from 8 or more correspondences
//! - [`estimate_fundamental_robust`]: the same under outliers, with RANSAC
//! - [`compute_epipole`]: epipoles of a fundamental matrix
//! - [`decompose_essential`]: the four pose candidates of an essential matrix
//! - [`triangulate`]: 3D points from two cameras
//! - [`estimate_projection_matrix`]: camera matrix from 2D-3D correspondences

/// Small fixed-size linear algebra helpers.
pub mod linalg;

mod camera;
pub use camera::*;

mod epipole;
pub use epipole::*;

mod error;
pub use error::TwoViewError;

mod essential;
pub use essential::*;

mod fundamental;
pub use fundamental::*;

mod normalize;
pub use normalize::*;

mod ransac;
pub use ransac::*;

mod robust;
pub use robust::*;

mod triangulation;
pub use triangulation::*;

#[cfg(test)]
mod test_utils;
