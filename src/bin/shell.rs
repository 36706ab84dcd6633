//! scull Shell Binary
//!
//! Provisions a set of scull devices and drives them from a command script.

use std::fs::File;
use std::io::{self, BufReader};

use clap::Parser;
use scull::config::{DEFAULT_NR_DEVS, DEFAULT_QSET, DEFAULT_QUANTUM};
use scull::shell::Session;
use scull::{Config, DeviceRegistry};
use tracing_subscriber::{fmt, EnvFilter};

/// scull Shell
#[derive(Parser, Debug)]
#[command(name = "scull-shell")]
#[command(about = "Drive in-memory scull devices from a command script")]
#[command(version)]
struct Args {
    /// Quantum size in bytes
    #[arg(short, long, default_value_t = DEFAULT_QUANTUM)]
    quantum: usize,

    /// Quanta per quantum set
    #[arg(short = 's', long, default_value_t = DEFAULT_QSET)]
    qset: usize,

    /// Number of devices to create
    #[arg(short, long, default_value_t = DEFAULT_NR_DEVS)]
    nr_devs: u32,

    /// Major number (0 = dynamic)
    #[arg(long, default_value_t = 0)]
    major: u32,

    /// First minor number
    #[arg(long, default_value_t = 0)]
    minor: u32,

    /// Extra module-style parameters (name=value), applied after the flags
    #[arg(short, long = "param")]
    params: Vec<String>,

    /// Read commands from this file instead of stdin
    script: Option<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scull=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("scull shell v{}", scull::VERSION);

    // Build config from args
    let mut builder = Config::builder()
        .quantum(args.quantum)
        .qset(args.qset)
        .nr_devs(args.nr_devs)
        .major(args.major)
        .minor(args.minor);

    for param in &args.params {
        let applied = match param.split_once('=') {
            Some((name, value)) => builder.param(name.trim(), value.trim()),
            None => {
                tracing::error!("Parameter {:?} is not name=value", param);
                std::process::exit(2);
            }
        };
        builder = match applied {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("{}", e);
                std::process::exit(2);
            }
        };
    }

    let registry = match DeviceRegistry::new(builder.build()) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to create devices: {}", e);
            std::process::exit(1);
        }
    };

    let mut session = Session::new(registry);
    let stdout = io::stdout();
    let mut output = stdout.lock();

    let result = match &args.script {
        Some(path) => match File::open(path) {
            Ok(file) => session.run(BufReader::new(file), &mut output),
            Err(e) => {
                tracing::error!("Cannot open script {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => session.run(io::stdin().lock(), &mut output),
    };

    if let Err(e) = result {
        tracing::error!("Session error: {}", e);
        std::process::exit(1);
    }
}
