//! Command line tool for inspecting TIN shift meshes and transforming
//! coordinates with them.

mod commands;

use clap::{Parser, Subcommand};
use tinshift::OpenOptions;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "tinshift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Apply triangulated datum-shift meshes", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Allow fetching meshes over HTTP(S)
    #[arg(long, global = true)]
    network: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show mesh metadata
    Info(commands::info::InfoArgs),
    /// Transform coordinates
    Transform(commands::transform::TransformArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut options = OpenOptions::from_env();
    if cli.network {
        options = options.with_network(true);
    }

    match cli.command {
        Commands::Info(args) => commands::info::execute(&args, &options),
        Commands::Transform(args) => commands::transform::execute(&args, &options),
    }
}
