//! GeoPackage-backed triangle store.

use std::ops::ControlFlow;

use glam::DVec2;
use rusqlite::{Connection, Row, params};

use crate::access::{AccessPath, Container, open_container};
use crate::config::OpenOptions;
use crate::error::{Error, Result};
use crate::metadata::{
    BoundingBox, Header, METADATA_STANDARD_URI, MeshMetadata, VerticalEncoding, VertexSchema,
};
use crate::source::{SearchWindow, TriangleRow, TriangleSource, VerticalValues};

/// An opened mesh container with its validated metadata.
///
/// The connection, any temporary backing file and the cached triangle
/// statement are released when the store drops.
#[derive(Debug)]
pub struct MeshStore {
    container: Container,
    metadata: MeshMetadata,
    schema: VertexSchema,
    query: String,
}

impl MeshStore {
    /// Open and validate the mesh at `location`.
    pub fn open(location: &str, options: &OpenOptions) -> Result<Self> {
        let container = open_container(location, options)?;

        let header = read_header(&container.conn)?;
        let bbox = read_extent(&container.conn)?;
        let schema = read_schema(&container.conn)?;
        let vertical = schema.validate(&header)?;
        let metadata = MeshMetadata::new(header, bbox, vertical);

        let query = candidate_query(&metadata);
        container
            .conn
            .prepare_cached(&query)
            .map_err(Error::QueryPreparation)?;

        tracing::debug!(
            location,
            access = ?container.access(),
            backing = ?container.backing_path(),
            horizontal = metadata.horizontal,
            vertical = ?metadata.vertical,
            fallback = %metadata.fallback,
            "mesh ready"
        );

        Ok(Self {
            container,
            metadata,
            schema,
            query,
        })
    }

    /// Correction columns present in the vertices table.
    #[must_use]
    pub fn schema(&self) -> &VertexSchema {
        &self.schema
    }

    /// How the container was reached.
    #[must_use]
    pub fn access(&self) -> AccessPath {
        self.container.access()
    }

    fn read_row(&self, row: &Row<'_>) -> rusqlite::Result<TriangleRow> {
        let blob = |i: usize| -> rusqlite::Result<Vec<u8>> {
            Ok(row.get::<_, Option<Vec<u8>>>(i)?.unwrap_or_default())
        };
        let corners = |first: usize| -> rusqlite::Result<[f64; 3]> {
            let value = |i: usize| -> rusqlite::Result<f64> {
                Ok(row.get::<_, Option<f64>>(i)?.unwrap_or_default())
            };
            Ok([value(first)?, value(first + 1)?, value(first + 2)?])
        };

        let geometry = [blob(0)?, blob(1)?, blob(2)?];
        let mut next = 3;

        let target = if self.metadata.horizontal {
            let xs = corners(next)?;
            let ys = corners(next + 3)?;
            next += 6;
            Some([
                DVec2::new(xs[0], ys[0]),
                DVec2::new(xs[1], ys[1]),
                DVec2::new(xs[2], ys[2]),
            ])
        } else {
            None
        };

        let vertical = match self.metadata.vertical {
            Some(VerticalEncoding::Paired) => Some(VerticalValues::Paired {
                source: corners(next)?,
                target: corners(next + 3)?,
            }),
            Some(VerticalEncoding::Offset) => Some(VerticalValues::Offset(corners(next)?)),
            None => None,
        };

        Ok(TriangleRow {
            geometry,
            target,
            vertical,
        })
    }
}

impl TriangleSource for MeshStore {
    fn metadata(&self) -> &MeshMetadata {
        &self.metadata
    }

    fn visit_candidates<F>(&mut self, window: &SearchWindow, mut visitor: F) -> Result<()>
    where
        F: FnMut(TriangleRow) -> Result<ControlFlow<()>>,
    {
        let mut stmt = self.container.conn.prepare_cached(&self.query)?;
        let mut rows = stmt.query(params![window.min.x, window.max.x, window.min.y, window.max.y])?;
        while let Some(row) = rows.next()? {
            if visitor(self.read_row(row)?)?.is_break() {
                break;
            }
        }
        Ok(())
    }
}

fn read_header(conn: &Connection) -> Result<Header> {
    let cannot = |e: rusqlite::Error| Error::Metadata(format!("Cannot get metadata: {e}"));
    let mut stmt = conn
        .prepare("SELECT metadata FROM gpkg_metadata WHERE md_standard_uri = ?1")
        .map_err(cannot)?;
    let documents = stmt
        .query_map([METADATA_STANDARD_URI], |row| row.get::<_, Option<String>>(0))
        .map_err(cannot)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(cannot)?;

    match documents.as_slice() {
        [Some(text)] => Header::from_json(text),
        _ => Err(Error::Metadata(
            "Cannot get metadata in gpkg_metadata table".into(),
        )),
    }
}

fn read_extent(conn: &Connection) -> Result<BoundingBox> {
    let cannot = |e: rusqlite::Error| {
        Error::Metadata(format!("Cannot get bounding box of vertices table: {e}"))
    };
    let mut stmt = conn
        .prepare(
            "SELECT min_x, min_y, max_x, max_y FROM gpkg_contents \
             WHERE table_name = 'vertices'",
        )
        .map_err(cannot)?;
    let extents = stmt
        .query_map([], |row| {
            Ok([
                row.get::<_, Option<f64>>(0)?,
                row.get::<_, Option<f64>>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
            ])
        })
        .map_err(cannot)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(cannot)?;

    match extents.as_slice() {
        [[Some(min_x), Some(min_y), Some(max_x), Some(max_y)]] => BoundingBox::new(
            DVec2::new(*min_x, *min_y),
            DVec2::new(*max_x, *max_y),
        ),
        _ => Err(Error::Metadata(
            "Cannot get bounding box of vertices table".into(),
        )),
    }
}

fn read_schema(conn: &Connection) -> Result<VertexSchema> {
    let cannot =
        |e: rusqlite::Error| Error::Schema(format!("Cannot get definition of table vertices: {e}"));
    let mut stmt = conn.prepare("PRAGMA table_info(vertices)").map_err(cannot)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(cannot)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(cannot)?;
    if names.is_empty() {
        return Err(Error::Schema("Cannot get definition of table vertices".into()));
    }

    let schema = VertexSchema::from_columns(names.iter().map(String::as_str));
    tracing::debug!(columns = ?names, "inspected vertices table");
    Ok(schema)
}

/// Correction columns to fetch for each corner, in row order.
fn requested_columns(metadata: &MeshMetadata) -> Vec<&'static str> {
    let mut columns = Vec::new();
    if metadata.horizontal {
        columns.extend(["target_x", "target_y"]);
    }
    match metadata.vertical {
        Some(VerticalEncoding::Paired) => columns.extend(["source_z", "target_z"]),
        Some(VerticalEncoding::Offset) => columns.push("offset_z"),
        None => {}
    }
    columns
}

/// Build the triangle query.
///
/// Row layout: the three corner geometries, then for each requested column
/// its value at corners 1, 2 and 3. Parameters are the window's
/// `min_x, max_x, min_y, max_y`.
fn candidate_query(metadata: &MeshMetadata) -> String {
    let mut sql =
        String::from("SELECT v1.geom AS v1_geom, v2.geom AS v2_geom, v3.geom AS v3_geom");
    for column in requested_columns(metadata) {
        for corner in ["v1", "v2", "v3"] {
            sql.push_str(&format!(", {corner}.{column} AS {corner}_{column}"));
        }
    }
    sql.push_str(
        " FROM triangles_def \
         LEFT JOIN vertices v1 ON idx_vertex1 = v1.fid \
         LEFT JOIN vertices v2 ON idx_vertex2 = v2.fid \
         LEFT JOIN vertices v3 ON idx_vertex3 = v3.fid \
         WHERE triangles_def.fid IN (\
         SELECT id FROM rtree_triangles_geom \
         WHERE maxx >= ?1 AND minx <= ?2 AND maxy >= ?3 AND miny <= ?4)",
    );
    sql
}
