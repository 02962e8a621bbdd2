//! Convert a JSON TIN file into a GeoPackage mesh.
//!
//! Run: `cargo run -p tinshift --bin tinshift-convert -- <input.json> <output.gpkg>`
//!
//! The output file is replaced if it exists. The written mesh is reopened
//! and its metadata printed, so a successful run also validates it.

use std::env;
use std::fs;
use std::process::ExitCode;

use tinshift::{MeshBuilder, MeshStore, OpenOptions, source::TriangleSource};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let (Some(input), Some(output)) = (args.get(1), args.get(2)) else {
        eprintln!("usage: tinshift-convert <input.json> <output.gpkg>");
        return ExitCode::FAILURE;
    };

    match convert(input, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tinshift-convert: {e}");
            ExitCode::FAILURE
        }
    }
}

fn convert(input: &str, output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(input)?;
    let builder = MeshBuilder::from_json_tin(&text)?;
    builder.write(output)?;

    let store = MeshStore::open(output, &OpenOptions::new())?;
    let metadata = store.metadata();
    println!(
        "Wrote {output}: {} vertices, {} triangles",
        builder.vertices().len(),
        builder.triangles().len()
    );
    println!(
        "  horizontal: {}, vertical: {}",
        metadata.horizontal,
        metadata
            .vertical
            .map_or_else(|| "none".to_string(), |v| v.to_string())
    );
    println!(
        "  extent: ({}, {}) - ({}, {})",
        metadata.bbox.min.x, metadata.bbox.min.y, metadata.bbox.max.x, metadata.bbox.max.y
    );
    Ok(())
}
