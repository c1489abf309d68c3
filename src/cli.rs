// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking a photo
//! - Logging a product with photos
//! - Browsing the catalog and setting it up

use qa_camera::backends::camera::CameraBackend;
use qa_camera::capture::{CaptureController, CaptureEvent, CaptureOptions, CaptureOutcome};
use qa_camera::constants::capture::CLI_WARMUP;
use qa_camera::entry::ProductForm;
use qa_camera::gallery::Gallery;
use qa_camera::gateway::{CatalogGateway, SupabaseGateway};
use qa_camera::pipelines::photo::{CapturedImage, PhotoEncoder};
use qa_camera::storage::default_photo_dir;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Fields for a non-interactive product entry
pub struct LogArgs {
    pub sku: String,
    pub serial_number: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub photos: Vec<PathBuf>,
    pub capture: usize,
}

/// List all available cameras
pub fn list_cameras(backend: &dyn CameraBackend) -> CliResult {
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({}):", backend.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        println!("      Facing: {}", camera.facing.display_name());
        if let Some(info) = &camera.device_info {
            println!("      Driver: {}", info.driver);
        }
        println!();
    }

    Ok(())
}

/// Ctrl+C sets the returned flag
fn install_stop_flag() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;
    Ok(stop_flag)
}

/// Open the camera, wait for readiness and take one still
async fn capture_one(
    backend: &Arc<dyn CameraBackend>,
    options: &CaptureOptions,
    stop: &AtomicBool,
) -> Result<CapturedImage, Box<dyn std::error::Error>> {
    let (mut controller, mut events) = CaptureController::new(Arc::clone(backend), options.clone());
    controller.open().await;

    loop {
        if stop.load(Ordering::SeqCst) {
            controller.close();
            return Err("Cancelled".into());
        }

        match tokio::time::timeout(Duration::from_millis(100), events.recv()).await {
            Ok(Some(CaptureEvent::Error(reason))) => return Err(reason.user_message().into()),
            Ok(Some(CaptureEvent::Streaming { format })) => println!("Streaming: {}", format),
            Ok(Some(CaptureEvent::Ready(_))) => break,
            Ok(Some(_)) => {}
            Ok(None) => return Err("Camera stopped unexpectedly".into()),
            Err(_) => {}
        }
    }

    tokio::time::sleep(CLI_WARMUP).await;
    if stop.load(Ordering::SeqCst) {
        controller.close();
        return Err("Cancelled".into());
    }

    match controller.capture().await {
        CaptureOutcome::Captured { width, height } => println!("Captured {}x{}", width, height),
        CaptureOutcome::Failed(e) => return Err(e.into()),
        CaptureOutcome::NotReady => return Err("Camera not ready".into()),
    }

    while let Ok(event) = events.try_recv() {
        if let CaptureEvent::ImageReady(image) = event {
            return Ok(image);
        }
    }
    Err("Capture produced no image".into())
}

/// Take a photo and save it as JPEG
pub async fn take_photo(
    backend: Arc<dyn CameraBackend>,
    options: CaptureOptions,
    output: Option<PathBuf>,
) -> CliResult {
    let stop = install_stop_flag()?;

    println!("Capturing... (press Ctrl+C to cancel)");
    let image = capture_one(&backend, &options, &stop).await?;

    // A file path is written as given; a directory gets a timestamped name
    if let Some(path) = output.as_ref()
        && !path.is_dir()
    {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &image.data).await?;
        println!("Photo saved: {}", path.display());
        return Ok(());
    }

    let output_dir = output.unwrap_or_else(default_photo_dir);
    let path = PhotoEncoder::new(options.jpeg_quality)
        .save(&image, &output_dir)
        .await?;
    println!("Photo saved: {}", path.display());
    Ok(())
}

/// Print the SKU reference list
pub async fn list_skus(gateway: &SupabaseGateway) -> CliResult {
    let skus = gateway.list_skus().await?;
    if skus.is_empty() {
        println!("No SKUs defined.");
        return Ok(());
    }
    for sku in skus {
        println!("  {:<16} {}", sku.key, sku.display_name);
    }
    Ok(())
}

/// Create a product from arguments, attaching files and camera shots
pub async fn log_product(
    gateway: &SupabaseGateway,
    backend: Arc<dyn CameraBackend>,
    options: CaptureOptions,
    args: LogArgs,
) -> CliResult {
    let mut form = ProductForm::new();
    if let Err(e) = form.load_skus(gateway).await {
        eprintln!("Warning: {}", e);
    }

    form.select_sku(&args.sku);
    form.serial_number = args.serial_number;
    if let Some(name) = args.name {
        form.name = name;
    }
    if let Some(description) = args.description {
        form.description = description;
    }

    // Fail before touching the network or the camera
    form.validate()?;

    for path in args.photos {
        form.add_from_file(path).await?;
    }

    if args.capture > 0 {
        let stop = install_stop_flag()?;
        for shot in 1..=args.capture {
            println!("Shot {}/{} (press Ctrl+C to cancel)", shot, args.capture);
            let image = capture_one(&backend, &options, &stop).await?;
            form.add_captured(image);
        }
    }

    println!("Saving product with {} photo(s)...", form.photos().len());
    let report = form.submit(gateway).await?;

    println!("{}", report.summary());
    println!("  id: {}", report.product.id);
    for photo in &report.linked {
        println!("  {}", photo.photo_url);
    }
    for failure in &report.failed {
        eprintln!("  photo {} failed: {}", failure.index + 1, failure.message);
    }
    Ok(())
}

/// List products, optionally filtered, and one product's photos
pub async fn show_gallery(
    gateway: &SupabaseGateway,
    search: Option<String>,
    product: Option<Uuid>,
) -> CliResult {
    let mut gallery = Gallery::new();
    gallery.refresh(gateway).await;
    if let Some(e) = gallery.error() {
        return Err(e.into());
    }

    if let Some(term) = search {
        gallery.set_search(term);
    }

    let products = gallery.filtered();
    if products.is_empty() {
        println!("No products found.");
    }
    for p in products {
        println!(
            "  {}  {:<14} {:<16} {}",
            p.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
            p.sku,
            p.serial_number,
            p.title()
        );
        println!("      id: {}", p.id);
    }

    if let Some(id) = product {
        gallery.select(gateway, id).await;
        if let Some(e) = gallery.error() {
            return Err(e.into());
        }
        println!();
        println!("Photos ({}):", gallery.photos().len());
        for photo in gallery.photos() {
            println!(
                "  {}  {}",
                photo.taken_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                photo.photo_url
            );
        }
    }
    Ok(())
}

/// Create tables, indexes and the photo bucket
pub async fn setup(gateway: &SupabaseGateway) -> CliResult {
    println!("Setting up catalog at {}", gateway.base_url());

    let steps = gateway.setup().await;
    let mut failed = 0;
    for step in &steps {
        match &step.result {
            Ok(()) => println!("  ✓ {}", step.name),
            Err(e) => {
                failed += 1;
                println!("  ✗ {}: {}", step.name, e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} setup steps failed", failed, steps.len()).into());
    }
    println!("Setup complete.");
    Ok(())
}
