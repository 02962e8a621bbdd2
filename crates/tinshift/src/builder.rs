//! Authoring of mesh containers.
//!
//! [`MeshBuilder`] collects vertices and triangles in memory and writes them
//! as a GeoPackage that [`MeshStore`](crate::MeshStore) can open: the
//! standard GeoPackage system tables, the metadata header, the `vertices`
//! and `triangles_def` tables and an R*Tree over triangle extents.

use std::path::Path;

use glam::DVec2;
use rusqlite::types::Value;
use rusqlite::{Connection, Transaction, params, params_from_iter};
use serde_json::json;
use tinshift_decode::pack_point;

use crate::error::{Error, Result};
use crate::metadata::{
    FILE_TYPE, FallbackStrategy, METADATA_STANDARD_URI, ShiftBounds, VerticalEncoding,
};

/// `application_id` of a GeoPackage ("GPKG").
const GPKG_APPLICATION_ID: i32 = 0x4750_4B47;
/// `user_version` of a GeoPackage 1.3 file.
const GPKG_USER_VERSION: i32 = 10300;

const FORMAT_VERSION: &str = "1.0";

const SYSTEM_TABLES: &str = "
CREATE TABLE gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);
CREATE TABLE gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER
);
CREATE TABLE gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    PRIMARY KEY (table_name, column_name)
);
CREATE TABLE gpkg_metadata (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    md_scope TEXT NOT NULL DEFAULT 'dataset',
    md_standard_uri TEXT NOT NULL,
    mime_type TEXT NOT NULL DEFAULT 'text/xml',
    metadata TEXT NOT NULL DEFAULT ''
);
INSERT INTO gpkg_spatial_ref_sys VALUES
    ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', NULL),
    ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', NULL);
CREATE TABLE triangles_def (
    fid INTEGER PRIMARY KEY,
    idx_vertex1 INTEGER NOT NULL,
    idx_vertex2 INTEGER NOT NULL,
    idx_vertex3 INTEGER NOT NULL
);
CREATE VIRTUAL TABLE rtree_triangles_geom USING rtree(id, minx, maxx, miny, maxy);
";

/// One calibration vertex.
///
/// Only the values required by the mesh's declared components are written.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexRecord {
    pub source: DVec2,
    pub target: Option<DVec2>,
    pub source_z: Option<f64>,
    pub target_z: Option<f64>,
    pub offset_z: Option<f64>,
}

impl VertexRecord {
    #[must_use]
    pub fn new(source: DVec2) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: DVec2) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn with_heights(mut self, source_z: f64, target_z: f64) -> Self {
        self.source_z = Some(source_z);
        self.target_z = Some(target_z);
        self
    }

    #[must_use]
    pub fn with_offset_z(mut self, offset_z: f64) -> Self {
        self.offset_z = Some(offset_z);
        self
    }
}

/// In-memory mesh that can be written as a GeoPackage.
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    vertices: Vec<VertexRecord>,
    triangles: Vec<[usize; 3]>,
    horizontal: bool,
    vertical: Option<VerticalEncoding>,
    fallback: FallbackStrategy,
    num_vertices: Option<u32>,
    srs_id: i32,
    input_crs: Option<String>,
    output_crs: Option<String>,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            horizontal: false,
            vertical: None,
            fallback: FallbackStrategy::None,
            num_vertices: None,
            srs_id: -1,
            input_crs: None,
            output_crs: None,
        }
    }
}

impl MeshBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a horizontal component; every vertex then needs a target.
    #[must_use]
    pub fn horizontal(mut self, enabled: bool) -> Self {
        self.horizontal = enabled;
        self
    }

    /// Declare a vertical component stored with `encoding`.
    #[must_use]
    pub fn vertical(mut self, encoding: Option<VerticalEncoding>) -> Self {
        self.vertical = encoding;
        self
    }

    #[must_use]
    pub fn fallback(mut self, strategy: FallbackStrategy) -> Self {
        self.fallback = strategy;
        self
    }

    /// Override the vertex count advertised in the header.
    ///
    /// It sizes the initial fallback radius; defaults to the actual count.
    #[must_use]
    pub fn num_vertices(mut self, count: u32) -> Self {
        self.num_vertices = Some(count);
        self
    }

    /// SRS id recorded for the vertex geometries. Defaults to -1 (undefined).
    #[must_use]
    pub fn srs_id(mut self, srs_id: i32) -> Self {
        self.srs_id = srs_id;
        self
    }

    #[must_use]
    pub fn crs(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.input_crs = Some(input.into());
        self.output_crs = Some(output.into());
        self
    }

    /// Add a vertex and return its index.
    pub fn push_vertex(&mut self, vertex: VertexRecord) -> usize {
        self.vertices.push(vertex);
        self.vertices.len() - 1
    }

    /// Add a triangle by zero-based vertex indices.
    pub fn push_triangle(&mut self, corners: [usize; 3]) {
        self.triangles.push(corners);
    }

    #[must_use]
    pub fn with_vertices(mut self, vertices: impl IntoIterator<Item = VertexRecord>) -> Self {
        self.vertices.extend(vertices);
        self
    }

    #[must_use]
    pub fn with_triangles(mut self, triangles: impl IntoIterator<Item = [usize; 3]>) -> Self {
        self.triangles.extend(triangles);
        self
    }

    #[must_use]
    pub fn vertices(&self) -> &[VertexRecord] {
        &self.vertices
    }

    #[must_use]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Write the mesh to `path`, replacing any existing file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.validate()?;

        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut conn = Connection::open(path)?;
        conn.pragma_update(None, "application_id", GPKG_APPLICATION_ID)?;
        conn.pragma_update(None, "user_version", GPKG_USER_VERSION)?;

        let tx = conn.transaction()?;
        tx.execute_batch(SYSTEM_TABLES)?;
        self.write_srs(&tx)?;
        self.write_vertices(&tx)?;
        self.write_triangles(&tx)?;
        tx.execute(
            "INSERT INTO gpkg_metadata (md_scope, md_standard_uri, mime_type, metadata) \
             VALUES ('dataset', ?1, 'application/json', ?2)",
            params![METADATA_STANDARD_URI, self.header_json()],
        )?;
        tx.commit()?;

        tracing::debug!(
            path = %path.display(),
            vertices = self.vertices.len(),
            triangles = self.triangles.len(),
            "wrote mesh"
        );
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() || self.triangles.is_empty() {
            return Err(Error::InvalidMesh("mesh has no triangles".into()));
        }
        for (i, corners) in self.triangles.iter().enumerate() {
            if let Some(&bad) = corners.iter().find(|&&c| c >= self.vertices.len()) {
                return Err(Error::InvalidMesh(format!(
                    "triangle {i} references vertex {bad}, but there are only {} vertices",
                    self.vertices.len()
                )));
            }
        }
        for (i, v) in self.vertices.iter().enumerate() {
            if self.horizontal && v.target.is_none() {
                return Err(Error::InvalidMesh(format!("vertex {i} has no target position")));
            }
            let complete = match self.vertical {
                Some(VerticalEncoding::Paired) => v.source_z.is_some() && v.target_z.is_some(),
                Some(VerticalEncoding::Offset) => v.offset_z.is_some(),
                None => true,
            };
            if !complete {
                return Err(Error::InvalidMesh(format!("vertex {i} has no vertical values")));
            }
        }
        if self.num_vertices == Some(0) {
            return Err(Error::InvalidMesh("num_vertices must be positive".into()));
        }
        let (min, max) = self.extent();
        if min.x >= max.x || min.y >= max.y {
            return Err(Error::InvalidMesh("vertex extent is empty".into()));
        }
        Ok(())
    }

    fn extent(&self) -> (DVec2, DVec2) {
        self.vertices.iter().fold(
            (DVec2::splat(f64::INFINITY), DVec2::splat(f64::NEG_INFINITY)),
            |(min, max), v| (min.min(v.source), max.max(v.source)),
        )
    }

    /// Range of `target - source` over all vertices.
    #[must_use]
    pub fn shift_bounds(&self) -> ShiftBounds {
        let shifts = self
            .vertices
            .iter()
            .filter_map(|v| v.target.map(|t| t - v.source));
        let mut bounds: Option<ShiftBounds> = None;
        for shift in shifts {
            bounds = Some(match bounds {
                Some(b) => ShiftBounds {
                    min: b.min.min(shift),
                    max: b.max.max(shift),
                },
                None => ShiftBounds {
                    min: shift,
                    max: shift,
                },
            });
        }
        bounds.unwrap_or_default()
    }

    fn header_json(&self) -> String {
        let mut components = Vec::new();
        if self.horizontal {
            components.push("horizontal");
        }
        if self.vertical.is_some() {
            components.push("vertical");
        }

        let mut header = json!({
            "file_type": FILE_TYPE,
            "format_version": FORMAT_VERSION,
            "transformed_components": components,
            "fallback_strategy": self.fallback.as_str(),
            "num_vertices": self
                .num_vertices
                .unwrap_or_else(|| u32::try_from(self.vertices.len()).unwrap_or(u32::MAX)),
        });
        if self.horizontal {
            let shift = self.shift_bounds();
            header["min_shift_x"] = json!(shift.min.x);
            header["min_shift_y"] = json!(shift.min.y);
            header["max_shift_x"] = json!(shift.max.x);
            header["max_shift_y"] = json!(shift.max.y);
        }
        if let Some(crs) = &self.input_crs {
            header["input_crs"] = json!(crs);
        }
        if let Some(crs) = &self.output_crs {
            header["output_crs"] = json!(crs);
        }
        header.to_string()
    }

    fn write_srs(&self, tx: &Transaction<'_>) -> Result<()> {
        if self.srs_id > 0 {
            let name = self.input_crs.as_deref().unwrap_or("unknown");
            tx.execute(
                "INSERT INTO gpkg_spatial_ref_sys VALUES (?1, ?2, 'NONE', ?2, 'undefined', NULL)",
                params![name, self.srs_id],
            )?;
        }
        Ok(())
    }

    /// Correction columns written for each vertex.
    fn value_columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::new();
        if self.horizontal {
            columns.extend(["target_x", "target_y"]);
        }
        match self.vertical {
            Some(VerticalEncoding::Paired) => columns.extend(["source_z", "target_z"]),
            Some(VerticalEncoding::Offset) => columns.push("offset_z"),
            None => {}
        }
        columns
    }

    fn write_vertices(&self, tx: &Transaction<'_>) -> Result<()> {
        let columns = self.value_columns();
        let mut ddl = String::from("CREATE TABLE vertices (fid INTEGER PRIMARY KEY, geom POINT");
        for column in &columns {
            ddl.push_str(&format!(", {column} DOUBLE"));
        }
        ddl.push(')');
        tx.execute_batch(&ddl)?;

        let (min, max) = self.extent();
        tx.execute(
            "INSERT INTO gpkg_contents \
             (table_name, data_type, identifier, min_x, min_y, max_x, max_y, srs_id) \
             VALUES ('vertices', 'features', 'vertices', ?1, ?2, ?3, ?4, ?5)",
            params![min.x, min.y, max.x, max.y, self.srs_id],
        )?;
        tx.execute(
            "INSERT INTO gpkg_geometry_columns VALUES ('vertices', 'geom', 'POINT', ?1, 0, 0)",
            params![self.srs_id],
        )?;

        let placeholders = (0..columns.len()).fold(String::new(), |mut s, i| {
            s.push_str(&format!(", ?{}", i + 3));
            s
        });
        let sql = format!(
            "INSERT INTO vertices (fid, geom{}) VALUES (?1, ?2{placeholders})",
            columns.iter().fold(String::new(), |s, c| s + ", " + c),
        );
        let mut stmt = tx.prepare(&sql)?;
        for (fid, v) in (1_i64..).zip(&self.vertices) {
            let mut values = vec![
                Value::Integer(fid),
                Value::Blob(pack_point(v.source, self.srs_id).to_vec()),
            ];
            for column in &columns {
                let value = match *column {
                    "target_x" => v.target.map(|t| t.x),
                    "target_y" => v.target.map(|t| t.y),
                    "source_z" => v.source_z,
                    "target_z" => v.target_z,
                    _ => v.offset_z,
                };
                values.push(value.map_or(Value::Null, Value::Real));
            }
            stmt.execute(params_from_iter(values))?;
        }
        Ok(())
    }

    fn write_triangles(&self, tx: &Transaction<'_>) -> Result<()> {
        let mut triangle = tx.prepare(
            "INSERT INTO triangles_def (fid, idx_vertex1, idx_vertex2, idx_vertex3) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let mut rtree = tx.prepare(
            "INSERT INTO rtree_triangles_geom (id, minx, maxx, miny, maxy) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (fid, corners) in (1_i64..).zip(&self.triangles) {
            // Vertex fids are one-based.
            let [a, b, c] = corners.map(|i| i64::try_from(i + 1).unwrap_or(i64::MAX));
            triangle.execute(params![fid, a, b, c])?;

            let [p, q, r] = corners.map(|i| self.vertices[i].source);
            let min = p.min(q).min(r);
            let max = p.max(q).max(r);
            rtree.execute(params![fid, min.x, max.x, min.y, max.y])?;
        }
        Ok(())
    }
}
