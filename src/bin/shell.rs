//! mapkv Shell Binary
//!
//! Interactive console over a single container file.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use mapkv::shell::Shell;
use mapkv::{Config, Container, OpenMode};
use tracing_subscriber::{fmt, EnvFilter};

/// mapkv Shell
#[derive(Parser, Debug)]
#[command(name = "mapkv-shell")]
#[command(about = "Interactive console for a mapkv container file")]
#[command(version)]
struct Args {
    /// Container file (created if missing and opened writable)
    path: PathBuf,

    /// Open mode flags: r = read, w = read-write, t = truncate
    #[arg(short, long, default_value = "rw")]
    mode: String,

    /// Name index bucket count
    #[arg(short, long, default_value = "32")]
    buckets: usize,
}

fn main() {
    // Initialize tracing/logging (stderr keeps stdout clean for entry data)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,mapkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    println!("mapkv console v{}", mapkv::VERSION);

    let config = Config::builder()
        .path(&args.path)
        .mode(OpenMode::parse(&args.mode))
        .bucket_count(args.buckets)
        .build();

    let container = match Container::open(config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Unable to open {}: {}", args.path.display(), e);
            std::process::exit(1);
        }
    };

    let mut shell = Shell::new(container);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    if let Err(e) = shell.run(stdin.lock(), &mut stdout, &mut stderr) {
        tracing::error!("Console I/O error: {}", e);
    }

    if let Err(e) = shell.into_container().close() {
        tracing::error!("Failed to close container: {}", e);
        std::process::exit(1);
    }
}
