//! Decode point geometries stored in TIN shift GeoPackages.
//!
//! Mesh vertices are stored as GeoPackage point blobs: an 8-byte GeoPackage
//! header, a WKB byte-order marker and geometry type, then two IEEE-754
//! doubles (X, Y). All functions are pure and synchronous.
//!
//! # Design principles
//!
//! - **Host independent**: Coordinates are read with an explicit byte order,
//!   never by reinterpreting memory
//! - **Strict**: Any blob that is not exactly [`POINT_LEN`] bytes is an error
//!
//! # Key functions
//!
//! - [`unpack_point`]: Decode a little-endian point blob
//! - [`unpack_point_with`]: Decode with an explicit stored byte order
//! - [`unpack_triangle`]: Decode the three corners of a triangle row
//! - [`pack_point`]: Encode a point blob (mesh authoring and tests)

mod error;

pub mod point;

pub use error::{DecodeError, DecodeResult};
pub use point::{
    ByteOrder, POINT_LEN, POINT_PREFIX_LEN, pack_point, pack_point_with, unpack_point,
    unpack_point_with, unpack_triangle,
};
