//! Mesh fixtures shared by the integration tests.

#![allow(dead_code, clippy::cast_precision_loss)]

use std::path::{Path, PathBuf};

use glam::DVec2;
use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;
use tinshift::{MeshBuilder, VertexRecord};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// A mesh written into its own temporary directory.
pub struct MeshFile {
    _dir: TempDir,
    pub path: PathBuf,
}

impl MeshFile {
    pub fn write(builder: &MeshBuilder) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.gpkg");
        builder.write(&path).unwrap();
        Self { _dir: dir, path }
    }

    pub fn location(&self) -> &str {
        self.path.to_str().unwrap()
    }

    pub fn connect(&self) -> Connection {
        Connection::open(&self.path).unwrap()
    }

    /// Rewrite the JSON metadata header in place.
    pub fn edit_header(&self, edit: impl FnOnce(&mut Value)) {
        let conn = self.connect();
        let text: String = conn
            .query_row("SELECT metadata FROM gpkg_metadata", [], |row| row.get(0))
            .unwrap();
        let mut header: Value = serde_json::from_str(&text).unwrap();
        edit(&mut header);
        conn.execute("UPDATE gpkg_metadata SET metadata = ?1", [header.to_string()])
            .unwrap();
    }

    pub fn bytes(&self) -> Vec<u8> {
        std::fs::read(&self.path).unwrap()
    }
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Corners (0,0), (0,1), (1,1) of the reference triangle.
pub const REFERENCE: [DVec2; 3] = [
    DVec2::new(0.0, 0.0),
    DVec2::new(0.0, 1.0),
    DVec2::new(1.0, 1.0),
];

/// Reference triangle with horizontal targets only.
pub fn horizontal_triangle() -> MeshBuilder {
    MeshBuilder::new()
        .horizontal(true)
        .crs("EPSG:2393", "EPSG:3067")
        .with_vertices([
            VertexRecord::new(REFERENCE[0]).with_target(DVec2::new(101.0, 101.0)),
            VertexRecord::new(REFERENCE[1]).with_target(DVec2::new(100.0, 101.0)),
            VertexRecord::new(REFERENCE[2]).with_target(DVec2::new(100.0, 100.0)),
        ])
        .with_triangles([[0, 1, 2]])
}

/// Offsets 0.1, 0.2, 0.5 at the reference corners.
pub const OFFSETS: [f64; 3] = [0.1, 0.2, 0.5];

/// `size` x `size` cells of `spacing` units, each split into two triangles,
/// every vertex shifted by `shift` and raised by `dz`.
pub fn grid(size: usize, spacing: f64, shift: DVec2, dz: f64) -> MeshBuilder {
    let mut builder = MeshBuilder::new()
        .horizontal(true)
        .vertical(Some(tinshift::VerticalEncoding::Offset));
    let n = size + 1;
    for j in 0..n {
        for i in 0..n {
            let source = DVec2::new(i as f64, j as f64) * spacing;
            builder.push_vertex(
                VertexRecord::new(source)
                    .with_target(source + shift)
                    .with_offset_z(dz),
            );
        }
    }
    for j in 0..size {
        for i in 0..size {
            let a = j * n + i;
            builder.push_triangle([a, a + 1, a + n]);
            builder.push_triangle([a + 1, a + n + 1, a + n]);
        }
    }
    builder
}
