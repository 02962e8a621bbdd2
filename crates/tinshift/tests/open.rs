//! Opening meshes through each access path, and the errors raised for
//! containers that cannot be used.

mod common;

use common::{MeshFile, horizontal_triangle};
use glam::{DVec2, DVec3};
use serde_json::json;
use tinshift::{
    AccessPath, Error, FallbackStrategy, MeshBuilder, MeshStore, OpenOptions, ShiftEvaluator,
    TinShiftEvaluator, VerticalEncoding, VertexRecord, source::TriangleSource,
};

fn open_err(location: &str) -> Error {
    MeshStore::open(location, &OpenOptions::new()).unwrap_err()
}

#[test]
fn local_file_metadata() {
    let mesh = MeshFile::write(&horizontal_triangle());
    let store = MeshStore::open(mesh.location(), &OpenOptions::new()).unwrap();
    assert_eq!(store.access(), AccessPath::Local);

    let metadata = store.metadata();
    assert!(metadata.horizontal);
    assert_eq!(metadata.vertical, None);
    assert_eq!(metadata.fallback, FallbackStrategy::None);
    assert_eq!(metadata.bbox.min, DVec2::ZERO);
    assert_eq!(metadata.bbox.max, DVec2::ONE);
    assert_eq!(metadata.shift.min, DVec2::splat(99.0));
    assert_eq!(metadata.shift.max, DVec2::splat(101.0));
    assert_eq!(metadata.input_crs.as_deref(), Some("EPSG:2393"));
    assert_eq!(metadata.output_crs.as_deref(), Some("EPSG:3067"));
    assert!(store.schema().target_x && store.schema().target_y);
}

#[test]
fn embedded_resource_opens_like_a_file() {
    let mesh = MeshFile::write(&horizontal_triangle());
    let options = OpenOptions::new().with_resource("builtin/reference.gpkg", mesh.bytes());
    drop(mesh);

    let store = MeshStore::open("builtin/reference.gpkg", &options).unwrap();
    assert_eq!(store.access(), AccessPath::Embedded);

    let mut eval = TinShiftEvaluator::new(tinshift::TriangleLocator::new(store));
    let out = eval.forward(DVec3::new(0.5, 0.75, 0.0)).unwrap().unwrap();
    assert!((out - DVec3::new(100.25, 100.5, 0.0)).length() < 1e-9);
}

#[test]
fn missing_container_is_an_open_error() {
    let err = open_err("/definitely/not/here.gpkg");
    assert!(matches!(err, Error::Open { .. }), "{err:?}");
}

#[test]
fn non_database_file_fails_metadata_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.gpkg");
    std::fs::write(&path, vec![0x5a; 4096]).unwrap();
    let err = open_err(common::path_str(&path));
    assert!(matches!(err, Error::Metadata(_)), "{err:?}");
}

#[test]
fn metadata_errors() {
    let cases: [(&str, fn(&mut serde_json::Value)); 6] = [
        ("File is not of the expected type", |h| {
            h["file_type"] = json!("grid");
        }),
        ("format_version = 2.0 is not supported", |h| {
            h["format_version"] = json!("2.0");
        }),
        ("Missing \"min_shift_x\" key", |h| {
            h.as_object_mut().unwrap().remove("min_shift_x");
        }),
        ("The value of \"max_shift_y\" should be a number", |h| {
            h["max_shift_y"] = json!("far");
        }),
        ("invalid fallback_strategy", |h| {
            h["fallback_strategy"] = json!("nearest_vertex");
        }),
        ("transformed_components[] = depth is not handled", |h| {
            h["transformed_components"] = json!(["horizontal", "depth"]);
        }),
    ];
    for (message, edit) in cases {
        let mesh = MeshFile::write(&horizontal_triangle());
        mesh.edit_header(edit);
        let err = open_err(mesh.location());
        let Error::Metadata(actual) = &err else {
            panic!("expected metadata error for {message:?}, got {err:?}");
        };
        assert!(actual.contains(message), "{actual} should contain {message}");
    }
}

#[test]
fn fallback_requires_a_vertex_count() {
    let mesh = MeshFile::write(&horizontal_triangle().fallback(FallbackStrategy::NearestSide));
    mesh.edit_header(|h| {
        h.as_object_mut().unwrap().remove("num_vertices");
    });
    let err = open_err(mesh.location());
    assert!(err.to_string().contains("Missing \"num_vertices\" key"), "{err}");

    mesh.edit_header(|h| h["num_vertices"] = json!(0));
    let err = open_err(mesh.location());
    assert!(err.to_string().contains("invalid value for num_vertices"), "{err}");

    // Without a fallback the count is not needed.
    mesh.edit_header(|h| h["fallback_strategy"] = json!("none"));
    assert!(MeshStore::open(mesh.location(), &OpenOptions::new()).is_ok());
}

#[test]
fn metadata_row_must_exist() {
    let mesh = MeshFile::write(&horizontal_triangle());
    mesh.connect()
        .execute("DELETE FROM gpkg_metadata", [])
        .unwrap();
    let err = open_err(mesh.location());
    assert!(
        err.to_string().contains("Cannot get metadata in gpkg_metadata table"),
        "{err}"
    );
}

#[test]
fn degenerate_extent_is_rejected() {
    let mesh = MeshFile::write(&horizontal_triangle());
    mesh.connect()
        .execute("UPDATE gpkg_contents SET max_x = min_x", [])
        .unwrap();
    let err = open_err(mesh.location());
    assert!(matches!(err, Error::Metadata(_)), "{err:?}");
    assert!(err.to_string().contains("Invalid bounding box"), "{err}");
}

#[test]
fn missing_correction_columns_are_schema_errors() {
    let mesh = MeshFile::write(&horizontal_triangle());
    mesh.connect()
        .execute_batch("ALTER TABLE vertices DROP COLUMN target_y")
        .unwrap();
    let err = open_err(mesh.location());
    let Error::Schema(message) = &err else {
        panic!("expected schema error, got {err:?}");
    };
    assert_eq!(message, "target_y field missing in table vertices");

    let vertical = MeshBuilder::new()
        .vertical(Some(VerticalEncoding::Offset))
        .with_vertices(common::REFERENCE.map(|c| VertexRecord::new(c).with_offset_z(1.0)))
        .with_triangles([[0, 1, 2]]);
    let mesh = MeshFile::write(&vertical);
    mesh.connect()
        .execute_batch("ALTER TABLE vertices DROP COLUMN offset_z")
        .unwrap();
    let err = open_err(mesh.location());
    assert!(matches!(err, Error::Schema(_)), "{err:?}");
}

#[test]
fn missing_spatial_index_fails_query_preparation() {
    let mesh = MeshFile::write(&horizontal_triangle());
    mesh.connect()
        .execute_batch("DROP TABLE rtree_triangles_geom")
        .unwrap();
    let err = open_err(mesh.location());
    assert!(matches!(err, Error::QueryPreparation(_)), "{err:?}");
}

#[test]
fn corrupt_geometry_surfaces_per_lookup() {
    let mesh = MeshFile::write(&horizontal_triangle());
    mesh.connect()
        .execute("UPDATE vertices SET geom = x'0102030405' WHERE fid = 2", [])
        .unwrap();
    let mut eval = TinShiftEvaluator::open(mesh.location(), &OpenOptions::new()).unwrap();
    let err = eval.forward(DVec3::new(0.5, 0.75, 0.0)).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err:?}");
    // Points the index does not reach are still plain misses.
    assert_eq!(eval.forward(DVec3::new(5.0, 5.0, 0.0)).unwrap(), None);
}

#[test]
fn dangling_vertex_reference_is_a_decode_error() {
    let mesh = MeshFile::write(&horizontal_triangle());
    mesh.connect()
        .execute("DELETE FROM vertices WHERE fid = 3", [])
        .unwrap();
    let mut eval = TinShiftEvaluator::open(mesh.location(), &OpenOptions::new()).unwrap();
    let err = eval.forward(DVec3::new(0.5, 0.75, 0.0)).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err:?}");
}

#[test]
fn json_tin_converts_to_an_equivalent_mesh() {
    let doc = json!({
        "file_type": "triangulation_file",
        "format_version": "1.0",
        "transformed_components": ["horizontal", "vertical"],
        "fallback_strategy": "nearest_side",
        "vertices_columns": ["source_x", "source_y", "target_x", "target_y", "offset_z"],
        "triangles_columns": ["idx_vertex1", "idx_vertex2", "idx_vertex3"],
        "vertices": [[0, 0, 101, 101, 0.1], [0, 1, 100, 101, 0.2], [1, 1, 100, 100, 0.5]],
        "triangles": [[0, 1, 2]]
    });
    let builder = MeshBuilder::from_json_tin(&doc.to_string()).unwrap();
    let mesh = MeshFile::write(&builder);
    let mut eval = TinShiftEvaluator::open(mesh.location(), &OpenOptions::new()).unwrap();
    assert_eq!(eval.metadata().fallback, FallbackStrategy::NearestSide);
    assert_eq!(eval.metadata().num_vertices.map(|n| n.get()), Some(3));

    let out = eval.forward(DVec3::new(0.5, 0.75, 1000.0)).unwrap().unwrap();
    assert!((out - DVec3::new(100.25, 100.5, 1000.325)).length() < 1e-9);
}
