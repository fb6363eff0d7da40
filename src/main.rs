//! cuda-devctl: CUDA device selection and cache reclamation.
//!
//! Thin CLI over the library: list visible devices, activate one with
//! range validation, flush the caching allocator, or report the active
//! device's memory usage.

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tracing::info;

use cuda_devctl::gpu::device::{current_device, detect_devices, set_device, Device};
use cuda_devctl::gpu::memory::{empty_cache, mem_info};

#[derive(Parser, Debug)]
#[command(name = "cuda-devctl", about = "CUDA device selection and cache reclamation")]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List visible CUDA devices.
    List {
        /// Emit the inventory as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate and activate a device (accepts "1" or "cuda:1").
    Select {
        /// Device to activate.
        device: String,
    },

    /// Release unused cached memory on the active device.
    Flush,

    /// Show the active device and its memory usage.
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "cuda_devctl=debug"
    } else {
        "cuda_devctl=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("cuda-devctl v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::List { json } => {
            let devices = detect_devices()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else if devices.is_empty() {
                println!("no CUDA devices visible");
            } else {
                for device in &devices {
                    println!(
                        "cuda:{}  {}  cc {}.{}  {:.1}/{:.1} GiB free",
                        device.id,
                        device.name,
                        device.compute_capability.0,
                        device.compute_capability.1,
                        gib(device.free_mem),
                        gib(device.total_mem),
                    );
                }
            }
        }

        Command::Select { device } => {
            let device: Device = device.parse()?;
            let id = device
                .index()
                .ok_or_else(|| anyhow!("select requires a CUDA device, got {device}"))?;
            set_device(id)?;
            println!("active device: cuda:{id}");
        }

        Command::Flush => {
            empty_cache()?;
            println!("released unused cached device memory");
        }

        Command::Status => {
            let id = current_device()?;
            let mem = mem_info()?;
            println!("active device: cuda:{id}");
            println!(
                "memory: {:.1} GiB used / {:.1} GiB total",
                gib(mem.used()),
                gib(mem.total)
            );
        }
    }

    Ok(())
}

fn gib(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}
