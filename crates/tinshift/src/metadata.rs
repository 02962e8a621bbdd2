//! Mesh metadata: the JSON header, the vertex extent and the vertex schema.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use glam::DVec2;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Marker required in the `file_type` key.
pub const FILE_TYPE: &str = "triangulation_file";
/// Supported `format_version` prefix.
pub const SUPPORTED_VERSION_PREFIX: &str = "1.";
/// `md_standard_uri` identifying the metadata row.
pub const METADATA_STANDARD_URI: &str = "https://proj.org";

/// Strategy used when no triangle contains the query point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackStrategy {
    #[default]
    None,
    /// Use the triangle with the closest edge.
    NearestSide,
    /// Use the triangle with the closest centroid.
    NearestCentroid,
}

impl FallbackStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NearestSide => "nearest_side",
            Self::NearestCentroid => "nearest_centroid",
        }
    }
}

impl FromStr for FallbackStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "nearest_side" => Ok(Self::NearestSide),
            "nearest_centroid" => Ok(Self::NearestCentroid),
            _ => Err(Error::Metadata("invalid fallback_strategy".into())),
        }
    }
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How vertical corrections are stored per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalEncoding {
    /// `source_z` and `target_z` columns; the correction is their difference.
    Paired,
    /// An `offset_z` column holding the signed correction.
    Offset,
}

impl fmt::Display for VerticalEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Paired => "source_z/target_z",
            Self::Offset => "offset_z",
        })
    }
}

/// Axis-aligned extent of the mesh vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: DVec2,
    pub max: DVec2,
}

impl BoundingBox {
    /// Build a bounding box, rejecting empty or inverted extents.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn new(min: DVec2, max: DVec2) -> Result<Self> {
        // Written negated so NaN extents are rejected too.
        if !(min.x < max.x) || !(min.y < max.y) {
            return Err(Error::Metadata("Invalid bounding box of vertices table".into()));
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[must_use]
    pub fn clamp(&self, p: DVec2) -> DVec2 {
        p.clamp(self.min, self.max)
    }
}

/// Range of horizontal shifts (target minus source) over all vertices.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShiftBounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl ShiftBounds {
    #[must_use]
    pub fn midpoint(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }
}

/// The validated JSON header stored in `gpkg_metadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub horizontal: bool,
    pub vertical: bool,
    /// Zero when the mesh has no horizontal component.
    pub shift: ShiftBounds,
    pub fallback: FallbackStrategy,
    /// Present whenever `fallback` is not `None`.
    pub num_vertices: Option<NonZeroU32>,
    pub input_crs: Option<String>,
    pub output_crs: Option<String>,
}

impl Header {
    /// Parse and validate the metadata document.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::Metadata(format!("Cannot parse JSON metadata: {e}")))?;
        let Value::Object(j) = value else {
            return Err(Error::Metadata("JSON metadata is not an object".into()));
        };

        if req_string(&j, "file_type")? != FILE_TYPE {
            return Err(Error::Metadata("File is not of the expected type".into()));
        }

        let version = req_string(&j, "format_version")?;
        if !version.starts_with(SUPPORTED_VERSION_PREFIX) {
            return Err(Error::Metadata(format!(
                "format_version = {version} is not supported"
            )));
        }

        let mut horizontal = false;
        let mut vertical = false;
        for component in req_array(&j, "transformed_components")? {
            match component.as_str() {
                Some("horizontal") => horizontal = true,
                Some("vertical") => vertical = true,
                Some(other) => {
                    return Err(Error::Metadata(format!(
                        "transformed_components[] = {other} is not handled"
                    )));
                }
                None => {
                    return Err(Error::Metadata(
                        "transformed_components[] item is not a string".into(),
                    ));
                }
            }
        }

        let shift = if horizontal {
            ShiftBounds {
                min: DVec2::new(req_f64(&j, "min_shift_x")?, req_f64(&j, "min_shift_y")?),
                max: DVec2::new(req_f64(&j, "max_shift_x")?, req_f64(&j, "max_shift_y")?),
            }
        } else {
            ShiftBounds::default()
        };

        let fallback = match opt_string(&j, "fallback_strategy")? {
            Some(s) => s.parse()?,
            None => FallbackStrategy::None,
        };

        let num_vertices = if fallback == FallbackStrategy::None {
            None
        } else {
            let n = req_i64(&j, "num_vertices")?;
            let n = u32::try_from(n)
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or_else(|| Error::Metadata("invalid value for num_vertices".into()))?;
            Some(n)
        };

        Ok(Self {
            horizontal,
            vertical,
            shift,
            fallback,
            num_vertices,
            input_crs: opt_string(&j, "input_crs")?.map(str::to_owned),
            output_crs: opt_string(&j, "output_crs")?.map(str::to_owned),
        })
    }
}

fn missing(key: &str) -> Error {
    Error::Metadata(format!("Missing \"{key}\" key"))
}

fn wrong_type(key: &str, expected: &str) -> Error {
    Error::Metadata(format!("The value of \"{key}\" should be {expected}"))
}

fn opt_string<'a>(j: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match j.get(key) {
        None => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or_else(|| wrong_type(key, "a string")),
    }
}

fn req_string<'a>(j: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    opt_string(j, key)?.ok_or_else(|| missing(key))
}

fn req_f64(j: &Map<String, Value>, key: &str) -> Result<f64> {
    j.get(key)
        .ok_or_else(|| missing(key))?
        .as_f64()
        .ok_or_else(|| wrong_type(key, "a number"))
}

/// An integer, also accepted when written as an integral float such as `100.0`.
#[allow(clippy::cast_possible_truncation)]
fn req_i64(j: &Map<String, Value>, key: &str) -> Result<i64> {
    let value = j.get(key).ok_or_else(|| missing(key))?;
    value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() <= f64::from(u32::MAX))
                .map(|f| f as i64)
        })
        .ok_or_else(|| wrong_type(key, "an integer"))
}

fn req_array<'a>(j: &'a Map<String, Value>, key: &str) -> Result<&'a Vec<Value>> {
    j.get(key)
        .ok_or_else(|| missing(key))?
        .as_array()
        .ok_or_else(|| wrong_type(key, "an array"))
}

/// Correction columns found in the vertices table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexSchema {
    pub source_z: bool,
    pub target_x: bool,
    pub target_y: bool,
    pub target_z: bool,
    pub offset_z: bool,
}

impl VertexSchema {
    /// Record which known correction columns are present. Other names are ignored.
    pub fn from_columns<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut schema = Self::default();
        for name in names {
            match name {
                "source_z" => schema.source_z = true,
                "target_x" => schema.target_x = true,
                "target_y" => schema.target_y = true,
                "target_z" => schema.target_z = true,
                "offset_z" => schema.offset_z = true,
                _ => {}
            }
        }
        schema
    }

    /// Check the columns against the header and pick the vertical encoding.
    ///
    /// Paired `source_z`/`target_z` is preferred when both exist.
    pub fn validate(&self, header: &Header) -> Result<Option<VerticalEncoding>> {
        if header.horizontal && !self.target_x {
            return Err(Error::Schema("target_x field missing in table vertices".into()));
        }
        if header.horizontal && !self.target_y {
            return Err(Error::Schema("target_y field missing in table vertices".into()));
        }
        if !header.vertical {
            return Ok(None);
        }
        if self.source_z && self.target_z {
            Ok(Some(VerticalEncoding::Paired))
        } else if self.offset_z {
            Ok(Some(VerticalEncoding::Offset))
        } else {
            Err(Error::Schema(
                "(source_z and target_z) or offset_z fields missing in table vertices".into(),
            ))
        }
    }
}

/// Everything known about a mesh once it has been opened.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshMetadata {
    pub horizontal: bool,
    /// `Some` iff the mesh carries a vertical component.
    pub vertical: Option<VerticalEncoding>,
    pub shift: ShiftBounds,
    pub fallback: FallbackStrategy,
    pub num_vertices: Option<NonZeroU32>,
    pub bbox: BoundingBox,
    pub input_crs: Option<String>,
    pub output_crs: Option<String>,
}

impl MeshMetadata {
    #[must_use]
    pub fn new(header: Header, bbox: BoundingBox, vertical: Option<VerticalEncoding>) -> Self {
        Self {
            horizontal: header.horizontal,
            vertical,
            shift: header.shift,
            fallback: header.fallback,
            num_vertices: header.num_vertices,
            bbox,
            input_crs: header.input_crs,
            output_crs: header.output_crs,
        }
    }
}
