// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use qa_camera::Config;
use qa_camera::capture::CaptureOptions;
use qa_camera::constants::CameraFacing;
use std::collections::HashMap;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.gateway.bucket, "product-photos");
    assert!(
        config.gateway.credentials().is_err(),
        "Credentials must never have a built-in default"
    );
    assert_eq!(config.camera.facing, CameraFacing::Back);
    assert_eq!(config.camera.ready_timeout(), Duration::from_secs(3));
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.gateway.url = Some("https://demo.supabase.co".into());
    config.camera.device = Some("/dev/video2".into());
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[camera]\nfacing = \"front\"\njpeg_quality = 250\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.camera.facing, CameraFacing::Front);
    assert_eq!(config.camera.jpeg_quality(), 100);
    assert_eq!(config.camera.width, 1920);
    assert_eq!(config.gateway.bucket, "product-photos");
}

#[test]
fn test_env_overrides_file_values() {
    let env: HashMap<&str, &str> = [
        ("SUPABASE_URL", "https://fallback.supabase.co"),
        ("QA_CAMERA_GATEWAY_URL", "https://primary.supabase.co"),
        ("SUPABASE_ANON_KEY", "anon-key"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config.gateway.api_key = Some("from-file".into());
    config.apply_env(|name| env.get(name).map(|v| v.to_string()));

    assert_eq!(
        config.gateway.credentials().unwrap(),
        ("https://primary.supabase.co", "anon-key")
    );
}

#[test]
fn test_capture_options_follow_camera_config() {
    let mut config = Config::default();
    config.camera.ready_timeout_ms = 500;
    config.camera.width = 640;

    let options = CaptureOptions::from(&config.camera);
    assert_eq!(options.ready_timeout, Duration::from_millis(500));
    assert_eq!(options.request.width, 640);
    assert_eq!(options.jpeg_quality, 90);
}
