//! Conversion from the JSON TIN exchange format.
//!
//! The JSON document carries the same header keys as the GeoPackage
//! metadata plus the mesh itself: `vertices_columns` names the columns of
//! each row in `vertices`, `triangles_columns` those of each row in
//! `triangles`. Triangle rows index into `vertices`, zero-based.

use glam::DVec2;
use serde_json::{Map, Value};

use crate::builder::{MeshBuilder, VertexRecord};
use crate::error::{Error, Result};
use crate::metadata::{FILE_TYPE, FallbackStrategy, SUPPORTED_VERSION_PREFIX, VerticalEncoding};

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidMesh(message.into())
}

/// Positions of the known columns in a vertex row.
#[derive(Debug)]
struct VertexColumns {
    source_x: usize,
    source_y: usize,
    target: Option<(usize, usize)>,
    heights: Option<(usize, usize)>,
    offset_z: Option<usize>,
    len: usize,
}

impl VertexColumns {
    fn parse(names: &[Value]) -> Result<Self> {
        let position = |wanted: &str| names.iter().position(|n| n.as_str() == Some(wanted));
        let required = |wanted: &str| {
            position(wanted).ok_or_else(|| invalid(format!("vertices_columns lacks {wanted}")))
        };
        let pair = |a: &str, b: &str| position(a).zip(position(b));
        Ok(Self {
            source_x: required("source_x")?,
            source_y: required("source_y")?,
            target: pair("target_x", "target_y"),
            heights: pair("source_z", "target_z"),
            offset_z: position("offset_z"),
            len: names.len(),
        })
    }

    fn record(&self, index: usize, row: &[f64]) -> Result<VertexRecord> {
        if row.len() != self.len {
            return Err(invalid(format!(
                "vertex {index} has {} values, expected {}",
                row.len(),
                self.len
            )));
        }
        Ok(VertexRecord {
            source: DVec2::new(row[self.source_x], row[self.source_y]),
            target: self.target.map(|(x, y)| DVec2::new(row[x], row[y])),
            source_z: self.heights.map(|(s, _)| row[s]),
            target_z: self.heights.map(|(_, t)| row[t]),
            offset_z: self.offset_z.map(|o| row[o]),
        })
    }
}

impl MeshBuilder {
    /// Build a mesh from a JSON TIN document.
    pub fn from_json_tin(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| invalid(format!("cannot parse JSON: {e}")))?;
        let Value::Object(j) = value else {
            return Err(invalid("JSON TIN is not an object"));
        };

        if string(&j, "file_type")? != Some(FILE_TYPE) {
            return Err(invalid("file_type is not triangulation_file"));
        }
        let version = string(&j, "format_version")?.unwrap_or_default();
        if !version.starts_with(SUPPORTED_VERSION_PREFIX) {
            return Err(invalid(format!("format_version = {version} is not supported")));
        }

        let mut horizontal = false;
        let mut vertical = false;
        for component in array(&j, "transformed_components")? {
            match component.as_str() {
                Some("horizontal") => horizontal = true,
                Some("vertical") => vertical = true,
                _ => return Err(invalid(format!("unknown transformed component {component}"))),
            }
        }

        let columns = VertexColumns::parse(array(&j, "vertices_columns")?)?;
        if horizontal && columns.target.is_none() {
            return Err(invalid("horizontal component needs target_x and target_y columns"));
        }
        let encoding = match (vertical, columns.heights, columns.offset_z) {
            (false, _, _) => None,
            (true, Some(_), _) => Some(VerticalEncoding::Paired),
            (true, None, Some(_)) => Some(VerticalEncoding::Offset),
            (true, None, None) => {
                return Err(invalid(
                    "vertical component needs source_z and target_z, or offset_z columns",
                ));
            }
        };

        let corner_columns = array(&j, "triangles_columns")?;
        let corner_positions = ["idx_vertex1", "idx_vertex2", "idx_vertex3"].map(|name| {
            corner_columns
                .iter()
                .position(|n| n.as_str() == Some(name))
                .ok_or_else(|| invalid(format!("triangles_columns lacks {name}")))
        });
        let [c1, c2, c3] = corner_positions;
        let corners = [c1?, c2?, c3?];

        let mut builder = MeshBuilder::new()
            .horizontal(horizontal)
            .vertical(encoding);
        if let Some(fallback) = string(&j, "fallback_strategy")? {
            builder = builder.fallback(fallback.parse::<FallbackStrategy>()?);
        }
        if let (Some(input), Some(output)) =
            (string(&j, "input_crs")?, string(&j, "output_crs")?)
        {
            builder = builder.crs(input, output);
        }

        for (i, row) in array(&j, "vertices")?.iter().enumerate() {
            let values = row
                .as_array()
                .and_then(|r| r.iter().map(Value::as_f64).collect::<Option<Vec<_>>>())
                .ok_or_else(|| invalid(format!("vertex {i} is not an array of numbers")))?;
            builder.push_vertex(columns.record(i, &values)?);
        }

        for (i, row) in array(&j, "triangles")?.iter().enumerate() {
            let indices = row
                .as_array()
                .and_then(|r| {
                    r.iter()
                        .map(|v| v.as_u64().and_then(|n| usize::try_from(n).ok()))
                        .collect::<Option<Vec<_>>>()
                })
                .filter(|r| r.len() == corner_columns.len())
                .ok_or_else(|| invalid(format!("triangle {i} is not a row of vertex indices")))?;
            builder.push_triangle(corners.map(|c| indices[c]));
        }

        tracing::debug!(
            vertices = builder.vertices().len(),
            triangles = builder.triangles().len(),
            "parsed JSON TIN"
        );
        Ok(builder)
    }
}

fn string<'a>(j: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match j.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| invalid(format!("{key} should be a string"))),
    }
}

fn array<'a>(j: &'a Map<String, Value>, key: &str) -> Result<&'a [Value]> {
    j.get(key)
        .ok_or_else(|| invalid(format!("missing {key}")))?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| invalid(format!("{key} should be an array")))
}
