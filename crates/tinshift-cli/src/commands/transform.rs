//! `tinshift transform`: apply a mesh to coordinates.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use clap::Args;
use glam::DVec3;
use tinshift::{NOT_TRANSFORMABLE, OpenOptions, ShiftEvaluator, TinShiftEvaluator};

#[derive(Args)]
pub struct TransformArgs {
    /// Mesh location: file path, registered resource or URL
    pub mesh: String,

    /// Apply the mesh in the inverse direction
    #[arg(short, long)]
    pub inverse: bool,

    /// Coordinates as `x,y[,z]`. Read from stdin as `x y [z]` lines if omitted.
    #[arg(allow_negative_numbers = true)]
    pub coords: Vec<String>,
}

pub fn execute(args: &TransformArgs, options: &OpenOptions) -> Result<()> {
    let mut eval = TinShiftEvaluator::open(&args.mesh, options)
        .with_context(|| format!("cannot open {}", args.mesh))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.coords.is_empty() {
        for (n, line) in io::stdin().lock().lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let coord = parse_coord(line.split_whitespace())
                .with_context(|| format!("line {}", n + 1))?;
            write_coord(&mut out, apply(&mut eval, coord, args.inverse)?)?;
        }
    } else {
        for text in &args.coords {
            let coord = parse_coord(text.split(','))?;
            write_coord(&mut out, apply(&mut eval, coord, args.inverse)?)?;
        }
    }
    Ok(())
}

fn apply(eval: &mut impl ShiftEvaluator, coord: DVec3, inverse: bool) -> Result<DVec3> {
    let result = if inverse {
        eval.inverse(coord)?
    } else {
        eval.forward(coord)?
    };
    if result.is_none() {
        tracing::info!(x = coord.x, y = coord.y, "coordinate not transformable");
    }
    Ok(result.unwrap_or(NOT_TRANSFORMABLE))
}

/// Parse two or three numbers; a missing z is zero.
fn parse_coord<'a>(mut fields: impl Iterator<Item = &'a str>) -> Result<DVec3> {
    let mut values = [0.0; 3];
    let mut count = 0;
    for field in fields.by_ref().take(3) {
        values[count] = field
            .trim()
            .parse()
            .with_context(|| format!("invalid number {field:?}"))?;
        count += 1;
    }
    if count < 2 {
        bail!("expected x and y, got {count} value(s)");
    }
    if fields.next().is_some() {
        bail!("expected at most three values");
    }
    Ok(DVec3::from_array(values))
}

fn write_coord(out: &mut impl Write, coord: DVec3) -> io::Result<()> {
    writeln!(out, "{} {} {}", coord.x, coord.y, coord.z)
}
