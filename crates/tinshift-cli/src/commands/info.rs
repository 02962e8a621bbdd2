//! `tinshift info`: print what a mesh declares.

use anyhow::{Context, Result};
use clap::Args;
use tinshift::{MeshStore, OpenOptions, source::TriangleSource};

#[derive(Args)]
pub struct InfoArgs {
    /// Mesh location: file path, registered resource or URL
    pub mesh: String,
}

pub fn execute(args: &InfoArgs, options: &OpenOptions) -> Result<()> {
    let store = MeshStore::open(&args.mesh, options)
        .with_context(|| format!("cannot open {}", args.mesh))?;
    let metadata = store.metadata();

    let mut components = Vec::new();
    if metadata.horizontal {
        components.push("horizontal");
    }
    if metadata.vertical.is_some() {
        components.push("vertical");
    }

    println!("Mesh: {} ({:?})", args.mesh, store.access());
    println!("  Components: {}", components.join(", "));
    if let Some(encoding) = metadata.vertical {
        println!("  Vertical encoding: {encoding}");
    }
    println!(
        "  Extent: ({}, {}) - ({}, {})",
        metadata.bbox.min.x, metadata.bbox.min.y, metadata.bbox.max.x, metadata.bbox.max.y
    );
    if metadata.horizontal {
        println!(
            "  Shift: x [{}, {}], y [{}, {}]",
            metadata.shift.min.x, metadata.shift.max.x, metadata.shift.min.y, metadata.shift.max.y
        );
    }
    print!("  Fallback: {}", metadata.fallback);
    match metadata.num_vertices {
        Some(n) => println!(" ({n} vertices)"),
        None => println!(),
    }
    if let Some(crs) = &metadata.input_crs {
        println!("  Input CRS: {crs}");
    }
    if let Some(crs) = &metadata.output_crs {
        println!("  Output CRS: {crs}");
    }
    Ok(())
}
