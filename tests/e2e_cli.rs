//! CLI end-to-end tests
//!
//! Tests for the clipforge command-line interface. None of these need an
//! ffmpeg binary.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the clipforge binary
#[allow(deprecated)]
fn clipforge_cmd() -> Command {
    Command::cargo_bin("clipforge").unwrap()
}

/// Write a config file into a fresh temp dir.
fn config_file(content: &str) -> (TempDir, PathBuf) {
    let temp = tempdir().unwrap();
    let path = temp.path().join("clipforge.toml");
    fs::write(&path, content).unwrap();
    (temp, path)
}

/// `clipforge args` with an empty config so host config files never leak in.
fn args_cmd(config: &Path) -> Command {
    let mut cmd = clipforge_cmd();
    cmd.args(["--config", config.to_str().unwrap(), "args"]);
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = clipforge_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = clipforge_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("clipforge"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = clipforge_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("clipforge "));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = clipforge_cmd();
    cmd.arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("ffprobe"));
}

#[test]
fn test_cli_process_help() {
    let mut cmd = clipforge_cmd();
    cmd.args(["process", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Convert a single file"))
        .stdout(predicate::str::contains("--timeout"));
}

#[test]
fn test_cli_args_mp4_720p_trimmed() {
    let (_temp, config) = config_file("");
    args_cmd(&config)
        .args([
            "clip.mp4",
            "--format",
            "mp4",
            "--resolution",
            "720p",
            "--quality",
            "3",
            "--fps",
            "30",
            "--start",
            "00:00:10",
            "--end",
            "00:01:30",
            "--single-thread",
        ])
        .assert()
        .success()
        .stdout(predicate::eq(
            "ffmpeg -ss 00:00:10 -to 00:01:30 -i input.mp4 -vf scale=1280:-2 -r 30 \
             -c:v libx264 -crf 18 -preset fast -threads 1 -refs 1 -x264opts rc-lookahead=20 \
             -movflags +faststart -c:a aac -b:a 128k -y output.mp4\n",
        ));
}

#[test]
fn test_cli_args_gif() {
    let (_temp, config) = config_file("");
    args_cmd(&config)
        .args(["clip.mov", "--format", "gif", "--fps", "60", "--resolution", "480p"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-vf fps=10,scale=854:-2"))
        .stdout(predicate::str::contains("-an -y output.gif"))
        .stdout(predicate::str::contains(" -r ").not());
}

#[test]
fn test_cli_args_square_crop_is_quoted() {
    let (_temp, config) = config_file("");
    args_cmd(&config)
        .args(["clip.mp4", "--aspect", "1:1", "--resolution", "1080p"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "-vf 'crop=min(iw\\,ih*1.0000):min(ih\\,iw/1.0000),scale=1920:-2'",
        ));
}

#[test]
fn test_cli_args_preset_with_override() {
    let (_temp, config) = config_file("");
    args_cmd(&config)
        .args(["clip.mkv", "--preset", "whatsapp", "--format", "webm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("scale=854:-2"))
        .stdout(predicate::str::contains("-r 24"))
        .stdout(predicate::str::contains("-c:v libvpx-vp9 -crf 33"))
        .stdout(predicate::str::contains("output.webm"));
}

#[test]
fn test_cli_args_uses_config_defaults() {
    let (_temp, config) = config_file(
        r#"
[defaults]
format = "mkv"
quality = 1
"#,
    );
    args_cmd(&config)
        .arg("clip.mp4")
        .assert()
        .success()
        .stdout(predicate::str::contains("-crf 28"))
        .stdout(predicate::str::contains("output.mkv"));
}

#[test]
fn test_cli_args_rejects_malformed_trim() {
    let (_temp, config) = config_file("");
    args_cmd(&config)
        .args(["clip.mp4", "--start", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("start time must be HH:MM:SS"));
}

#[test]
fn test_cli_args_rejects_end_before_start() {
    let (_temp, config) = config_file("");
    args_cmd(&config)
        .args(["clip.mp4", "--start", "00:01:00", "--end", "00:00:30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("End time must be after start time"));
}

#[test]
fn test_cli_args_rejects_bad_values() {
    let (_temp, config) = config_file("");
    args_cmd(&config)
        .args(["clip.mp4", "--quality", "5"])
        .assert()
        .failure();
    args_cmd(&config)
        .args(["clip.mp4", "--format", "flv"])
        .assert()
        .failure();
}

#[test]
fn test_cli_presets() {
    let mut cmd = clipforge_cmd();
    cmd.arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("youtube"))
        .stdout(predicate::str::contains("instagram"))
        .stdout(predicate::str::contains("1080p-vertical"))
        .stdout(predicate::str::contains("whatsapp"))
        .stdout(predicate::str::contains("custom"));
}

#[test]
fn test_cli_validate_config() {
    let (_temp, config) = config_file(
        r#"
[engine]
force_single_thread = true

[limits]
max_input_bytes = 104857600
"#,
    );
    let mut cmd = clipforge_cmd();
    cmd.args(["validate", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Force single thread: true"))
        .stdout(predicate::str::contains("100 MB"));
}

#[test]
fn test_cli_validate_warns_on_unknown_type() {
    let (_temp, config) = config_file(
        r#"
[limits]
accepted_types = ["video/mp4", "application/x-shockwave-flash"]
"#,
    );
    let mut cmd = clipforge_cmd();
    cmd.args(["validate", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Unknown accepted MIME type: application/x-shockwave-flash",
        ));
}

#[test]
fn test_cli_validate_rejects_zero_buffer() {
    let (_temp, config) = config_file("[engine]\nevent_buffer = 0\n");
    let mut cmd = clipforge_cmd();
    cmd.args(["validate", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("event_buffer"));
}

#[test]
fn test_cli_validate_rejects_unparseable_config() {
    let (_temp, config) = config_file("[engine\n");
    let mut cmd = clipforge_cmd();
    cmd.args(["validate", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_cli_process_nonexistent_file() {
    let (_temp, config) = config_file("");
    let mut cmd = clipforge_cmd();
    cmd.args([
        "--config",
        config.to_str().unwrap(),
        "process",
        "/nonexistent/path/clip.mp4",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_process_missing_engine_core() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("clip.mp4");
    fs::write(&input, b"not really a video").unwrap();
    let config = temp.path().join("clipforge.toml");
    fs::write(
        &config,
        r#"
[engine]
multi_threaded_core = "/nonexistent/bin/ffmpeg"
single_threaded_core = "/nonexistent/bin/ffmpeg"
"#,
    )
    .unwrap();

    let mut cmd = clipforge_cmd();
    cmd.args([
        "--config",
        config.to_str().unwrap(),
        "process",
        input.to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load ffmpeg"));
}
