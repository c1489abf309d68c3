// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use qa_camera::backends::camera::get_backend;
use qa_camera::capture::CaptureOptions;
use qa_camera::config::Config;
use qa_camera::gateway::SupabaseGateway;
use qa_camera::storage::log_file_path;
use qa_camera::terminal::{self, TerminalContext};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod cli;

#[derive(Parser)]
#[command(name = "qa-camera")]
#[command(about = "Photograph furniture products and catalog them by SKU and serial number")]
#[command(version = qa_camera::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Use a still image instead of a camera device (no value: test pattern)
    #[arg(long, global = true, value_name = "IMAGE", num_args = 0..=1, default_missing_value = "")]
    virtual_camera: Option<PathBuf>,

    /// Configuration file (default: ./qa-camera.toml, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive terminal interface (default)
    Terminal,

    /// List available cameras
    List,

    /// Take a photo
    Photo {
        /// Output file or directory (default: ~/Pictures/qa-camera/)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List SKU options
    Skus,

    /// Log a product with photos
    Log {
        /// Product SKU
        #[arg(long)]
        sku: String,

        /// Serial number
        #[arg(long)]
        serial: String,

        /// Product name (default: the SKU's display name)
        #[arg(long)]
        name: Option<String>,

        /// Description
        #[arg(long)]
        description: Option<String>,

        /// Attach an existing image file (repeatable)
        #[arg(long = "photo", value_name = "FILE")]
        photos: Vec<PathBuf>,

        /// Number of photos to take with the camera
        #[arg(long, default_value = "0")]
        capture: usize,
    },

    /// Browse cataloged products
    Gallery {
        /// Filter by SKU, name or serial number
        #[arg(short, long)]
        search: Option<String>,

        /// Show photos for a product id
        #[arg(short, long)]
        product: Option<Uuid>,
    },

    /// Create catalog tables and the photo bucket
    Setup,
}

/// Log to stderr, or to a file while the terminal interface owns the screen
fn init_logging(to_file: bool) {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=qa_camera=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    if to_file {
        let path = log_file_path();
        let file = path
            .parent()
            .map(std::fs::create_dir_all)
            .transpose()
            .and_then(|_| std::fs::File::create(&path));
        match file {
            Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
            // Without a log file, logging stays off rather than corrupting the screen
            Err(_) => builder.with_writer(std::io::sink).init(),
        }
    } else {
        builder.with_writer(std::io::stderr).init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Terminal);
    init_logging(matches!(command, Commands::Terminal));

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load(path)?;
            config.apply_env(|name| std::env::var(name).ok());
            config
        }
        None => Config::load_default()?,
    };

    let backend = get_backend(cli.virtual_camera);
    let options = CaptureOptions::from(&config.camera);
    let gateway = || SupabaseGateway::from_config(&config.gateway);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        match command {
            Commands::Terminal => {
                terminal::run(TerminalContext {
                    gateway: gateway().map_err(|e| e.to_string()),
                    backend,
                    capture: options,
                })
                .await
            }
            Commands::List => cli::list_cameras(backend.as_ref()),
            Commands::Photo { output } => cli::take_photo(backend, options, output).await,
            Commands::Skus => cli::list_skus(&gateway()?).await,
            Commands::Log {
                sku,
                serial,
                name,
                description,
                photos,
                capture,
            } => {
                let args = cli::LogArgs {
                    sku,
                    serial_number: serial,
                    name,
                    description,
                    photos,
                    capture,
                };
                cli::log_product(&gateway()?, backend, options, args).await
            }
            Commands::Gallery { search, product } => {
                cli::show_gallery(&gateway()?, search, product).await
            }
            Commands::Setup => cli::setup(&gateway()?).await,
        }
    })
}
