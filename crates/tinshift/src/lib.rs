//! Triangulated datum-shift meshes stored in GeoPackage containers.
//!
//! A mesh is a triangulated irregular network of calibration vertices, each
//! carrying horizontal target coordinates and/or vertical corrections. This
//! crate opens such meshes, locates the triangle covering a query point and
//! interpolates the corrections with barycentric weights.
//!
//! # Example
//!
//! ```no_run
//! use glam::DVec3;
//! use tinshift::{OpenOptions, ShiftEvaluator, TinShiftEvaluator};
//!
//! # fn main() -> tinshift::Result<()> {
//! let mut eval = TinShiftEvaluator::open("mesh.gpkg", &OpenOptions::from_env())?;
//! match eval.forward(DVec3::new(0.5, 0.75, 1000.0))? {
//!     Some(out) => println!("{out}"),
//!     None => println!("outside the mesh"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Layout
//!
//! - [`MeshStore`]: opens the container and streams candidate triangles
//! - [`TriangleLocator`]: finds the triangle for a point, with a one-entry
//!   cache and a nearest-triangle fallback
//! - [`TinShiftEvaluator`]: applies the corrections forward or inverse
//! - [`MeshBuilder`]: writes meshes, from code or from the JSON TIN format
//!
//! Lookups are synchronous and must not be shared across threads without
//! external serialisation; open one evaluator per thread instead.

mod access;
mod builder;
mod config;
mod error;
mod evaluator;
mod json;
mod store;

pub mod geometry;
pub mod locator;
pub mod metadata;
pub mod source;

pub use access::AccessPath;
pub use builder::{MeshBuilder, VertexRecord};
pub use config::{NETWORK_ENV, NETWORK_TIMEOUT_ENV, OpenOptions};
pub use error::{Error, Result};
pub use evaluator::{NOT_TRANSFORMABLE, ShiftEvaluator, TinShiftEvaluator};
pub use locator::{Direction, TriangleLocator};
pub use metadata::{FallbackStrategy, MeshMetadata, VerticalEncoding};
pub use store::MeshStore;

pub use tinshift_decode::DecodeError;
