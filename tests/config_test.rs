//! Integration tests for configuration loading and validation.

use clipforge::config::{load_config, load_config_or_default, validate_config, Config};
use clipforge_common::{Format, FrameRate, Resolution};
use std::fs;
use tempfile::tempdir;

fn write_config(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let temp = tempdir().unwrap();
    let path = temp.path().join("clipforge.toml");
    fs::write(&path, content).unwrap();
    (temp, path)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn empty_file_is_default_config() {
    let (_temp, path) = write_config("");
    let config = load_config(&path).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.engine.event_buffer, 256);
    assert_eq!(config.limits.max_input_bytes, 500 * 1024 * 1024);
    assert_eq!(config.defaults.quality, 3);
}

#[test]
fn all_sections_parse() {
    let (_temp, path) = write_config(
        r#"
[engine]
multi_threaded_core = "/opt/ffmpeg-mt/bin/ffmpeg"
single_threaded_core = "ffmpeg"
force_single_thread = true
event_buffer = 64

[limits]
max_input_bytes = 1048576
accepted_types = ["video/mp4"]

[defaults]
format = "webm"
resolution = "1080p-vertical"
quality = 4
frame_rate = "60"
start_time = "00:00:05"
end_time = "00:00:20"
aspect_ratio = "9:16"
"#,
    );

    let config = load_config(&path).unwrap();
    assert_eq!(config.engine.multi_threaded_core, "/opt/ffmpeg-mt/bin/ffmpeg");
    assert!(config.engine.force_single_thread);
    assert_eq!(config.engine.event_buffer, 64);
    assert_eq!(config.limits.accepted_types, vec!["video/mp4"]);
    assert_eq!(config.defaults.format, Format::Webm);
    assert_eq!(config.defaults.resolution, Resolution::Vertical1080);
    assert_eq!(config.defaults.frame_rate, FrameRate::Fps60);
    assert_eq!(config.defaults.start_time, "00:00:05");
    assert_eq!(config.defaults.aspect_ratio.as_deref(), Some("9:16"));
}

#[test]
fn missing_file_is_an_error() {
    let err = load_config(std::path::Path::new("/nonexistent/clipforge.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn explicit_path_wins() {
    let (_temp, path) = write_config("[engine]\nevent_buffer = 8\n");
    let config = load_config_or_default(Some(&path)).unwrap();
    assert_eq!(config.engine.event_buffer, 8);
}

#[test]
fn unknown_format_is_rejected() {
    let (_temp, path) = write_config("[defaults]\nformat = \"flv\"\n");
    assert!(load_config(&path).is_err());
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn default_config_has_no_warnings() {
    assert!(validate_config(&Config::default()).unwrap().is_empty());
}

#[test]
fn hard_errors() {
    let mut config = Config::default();
    config.engine.event_buffer = 0;
    assert!(validate_config(&config).is_err());

    let mut config = Config::default();
    config.engine.single_threaded_core = "  ".into();
    assert!(validate_config(&config).is_err());

    let mut config = Config::default();
    config.limits.max_input_bytes = 0;
    assert!(validate_config(&config).is_err());

    let mut config = Config::default();
    config.defaults.start_time = "00:02:00".into();
    config.defaults.end_time = "00:01:00".into();
    assert!(validate_config(&config).is_err());
}

#[test]
fn warnings() {
    let mut config = Config::default();
    config.limits.accepted_types.push("image/gif".into());
    config.limits.accepted_types.push("text/plain".into());
    config.defaults.quality = 9;
    config.defaults.aspect_ratio = Some("3:2".into());

    let warnings = validate_config(&config).unwrap();
    assert_eq!(warnings.len(), 3, "{warnings:?}");
    assert!(warnings[0].contains("text/plain"));
    assert!(warnings[1].contains("quality 9"));
    assert!(warnings[2].contains("3:2"));
}

#[test]
fn original_aspect_ratio_is_not_a_warning() {
    let mut config = Config::default();
    config.defaults.aspect_ratio = Some("original".into());
    assert!(validate_config(&config).unwrap().is_empty());
}
