//! GeoPackage point geometry unpacking and packing.

use glam::DVec2;

use crate::error::{DecodeError, DecodeResult};

/// Size of the GeoPackage binary header for a geometry without envelope.
const GPKG_HEADER_LEN: usize = 8;

/// Bytes preceding the coordinates: GeoPackage header, WKB byte order, WKB type.
pub const POINT_PREFIX_LEN: usize = GPKG_HEADER_LEN + 1 + 4;

/// Total size of a two-dimensional point blob.
pub const POINT_LEN: usize = POINT_PREFIX_LEN + 2 * size_of::<f64>();

const WKB_POINT: u32 = 1;

/// Byte order of the coordinate words inside a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Order used by mesh containers.
    pub const STORED: Self = Self::LittleEndian;

    fn read_f64(self, word: [u8; 8]) -> f64 {
        match self {
            Self::LittleEndian => f64::from_le_bytes(word),
            Self::BigEndian => f64::from_be_bytes(word),
        }
    }

    fn flag_bit(self) -> u8 {
        match self {
            Self::LittleEndian => 1,
            Self::BigEndian => 0,
        }
    }
}

/// Unpack a point blob whose coordinates are stored little-endian.
///
/// The 13-byte prefix is not interpreted; only the length is checked.
pub fn unpack_point(blob: &[u8]) -> DecodeResult<DVec2> {
    unpack_point_with(blob, ByteOrder::STORED)
}

/// Unpack a point blob whose coordinates are stored in `order`.
pub fn unpack_point_with(blob: &[u8], order: ByteOrder) -> DecodeResult<DVec2> {
    if blob.len() != POINT_LEN {
        return Err(DecodeError::InvalidPointLength {
            expected: POINT_LEN,
            actual: blob.len(),
        });
    }

    let mut x = [0u8; 8];
    let mut y = [0u8; 8];
    x.copy_from_slice(&blob[POINT_PREFIX_LEN..POINT_PREFIX_LEN + 8]);
    y.copy_from_slice(&blob[POINT_PREFIX_LEN + 8..POINT_LEN]);

    Ok(DVec2::new(order.read_f64(x), order.read_f64(y)))
}

/// Unpack the three corner blobs of a triangle.
///
/// Fails on the first corner with a bad length.
pub fn unpack_triangle(blobs: [&[u8]; 3]) -> DecodeResult<[DVec2; 3]> {
    Ok([
        unpack_point(blobs[0])?,
        unpack_point(blobs[1])?,
        unpack_point(blobs[2])?,
    ])
}

/// Pack a point into a little-endian GeoPackage blob.
#[must_use]
pub fn pack_point(point: DVec2, srs_id: i32) -> [u8; POINT_LEN] {
    pack_point_with(point, srs_id, ByteOrder::STORED)
}

/// Pack a point into a GeoPackage blob using `order` for every word.
///
/// The header flags and the WKB byte-order marker are set to match `order`,
/// and no envelope is written.
#[must_use]
pub fn pack_point_with(point: DVec2, srs_id: i32, order: ByteOrder) -> [u8; POINT_LEN] {
    let mut blob = [0u8; POINT_LEN];
    blob[0] = b'G';
    blob[1] = b'P';
    blob[2] = 0;
    blob[3] = order.flag_bit();

    let (srs, wkb_type, x, y) = match order {
        ByteOrder::LittleEndian => (
            srs_id.to_le_bytes(),
            WKB_POINT.to_le_bytes(),
            point.x.to_le_bytes(),
            point.y.to_le_bytes(),
        ),
        ByteOrder::BigEndian => (
            srs_id.to_be_bytes(),
            WKB_POINT.to_be_bytes(),
            point.x.to_be_bytes(),
            point.y.to_be_bytes(),
        ),
    };
    blob[4..GPKG_HEADER_LEN].copy_from_slice(&srs);
    blob[GPKG_HEADER_LEN] = order.flag_bit();
    blob[GPKG_HEADER_LEN + 1..POINT_PREFIX_LEN].copy_from_slice(&wkb_type);
    blob[POINT_PREFIX_LEN..POINT_PREFIX_LEN + 8].copy_from_slice(&x);
    blob[POINT_PREFIX_LEN + 8..].copy_from_slice(&y);
    blob
}
