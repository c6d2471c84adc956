//! Engine backed by a local ffmpeg process.
//!
//! The engine's private storage is a temporary directory that is removed when
//! the engine is dropped. `exec` runs ffmpeg inside that directory with
//! machine-readable progress on stderr:
//!
//! ```text
//! ffmpeg -hide_banner -nostats -progress pipe:2 -nostdin <compiled args>
//! ```
//!
//! `out_time_us=` lines are converted against the span being written (see
//! [`ProgressParser`]); every other non-progress line is relayed as a log
//! line, decoded lossily.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::engine::{Build, Engine, EngineEvent, EngineLoader, EventSink};
use crate::error::EngineError;

/// Arguments placed before every compiled sequence.
const GLOBAL_ARGS: [&str; 5] = ["-hide_banner", "-nostats", "-progress", "pipe:2", "-nostdin"];

/// Prefix of the engine storage directory.
const STORAGE_PREFIX: &str = "clipforge-";

/// Loads [`FfmpegEngine`]s.
///
/// The core location is either a path to an ffmpeg binary or a name looked
/// up on `PATH`. Both builds use the same binary; the build only decides the
/// capability the session reports and thus the thread hint in the arguments.
#[derive(Debug, Default, Clone)]
pub struct FfmpegLoader;

impl FfmpegLoader {
    pub fn new() -> Self {
        Self
    }
}

/// Resolve a core location to an executable path.
pub fn locate(core: &str) -> Result<PathBuf, EngineError> {
    let candidate = Path::new(core);
    if candidate.components().count() > 1 {
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        return Err(EngineError::load(format!("{core} does not exist")));
    }
    which::which(core).map_err(|_| EngineError::load(format!("{core} not found on PATH")))
}

#[async_trait]
impl EngineLoader for FfmpegLoader {
    async fn load(&self, build: Build, core: &str) -> Result<Arc<dyn Engine>, EngineError> {
        let program = locate(core)?;

        let output = Command::new(&program)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| EngineError::load(format!("failed to run {}: {e}", program.display())))?;
        if !output.status.success() {
            return Err(EngineError::load(format!(
                "{} -version exited with {}",
                program.display(),
                output.status
            )));
        }
        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();

        let storage = tempfile::Builder::new()
            .prefix(STORAGE_PREFIX)
            .tempdir()
            .map_err(|e| EngineError::load(format!("failed to create engine storage: {e}")))?;

        tracing::debug!(
            "ffmpeg {} build at {} ({}), storage {}",
            build,
            program.display(),
            version,
            storage.path().display()
        );

        Ok(Arc::new(FfmpegEngine {
            program,
            version,
            storage,
            current: Mutex::new(None),
        }))
    }
}

/// A loaded ffmpeg binary with private file storage.
#[derive(Debug)]
pub struct FfmpegEngine {
    program: PathBuf,
    version: String,
    storage: TempDir,
    current: Mutex<Option<CancellationToken>>,
}

impl FfmpegEngine {
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// First line of `ffmpeg -version`.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn storage(&self) -> &Path {
        self.storage.path()
    }

    /// Map a storage name to a path, refusing anything but a plain file name.
    fn resolve(&self, name: &str) -> Result<PathBuf, EngineError> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(|c: char| c == '/' || c == '\\');
        if !plain {
            return Err(EngineError::InvalidName(name.to_string()));
        }
        Ok(self.storage.path().join(name))
    }
}

fn not_found_or_io(name: &str, e: std::io::Error) -> EngineError {
    if e.kind() == std::io::ErrorKind::NotFound {
        EngineError::NotFound(name.to_string())
    } else {
        EngineError::Io(e)
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn write_file(&self, name: &str, data: Bytes) -> Result<(), EngineError> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn exec(&self, args: &[String], events: EventSink) -> Result<(), EngineError> {
        let token = CancellationToken::new();
        let _run = RunSlot::claim(&self.current, token.clone());

        let mut child = Command::new(&self.program)
            .args(GLOBAL_ARGS)
            .args(args)
            .current_dir(self.storage.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::exec(format!("failed to spawn ffmpeg: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::exec("ffmpeg stderr not captured"))?;
        let mut stderr = BufReader::new(stderr);
        let mut buf = Vec::new();
        let mut parser = ProgressParser::for_args(args);

        loop {
            buf.clear();
            tokio::select! {
                _ = token.cancelled() => {
                    if let Err(e) = child.kill().await {
                        tracing::debug!("Failed to kill ffmpeg: {}", e);
                    }
                    return Err(EngineError::Aborted);
                }
                read = stderr.read_until(b'\n', &mut buf) => {
                    if read? == 0 {
                        break;
                    }
                    // Metadata tags are echoed as-is and need not be UTF-8.
                    let line = String::from_utf8_lossy(&buf);
                    if let Some(event) = parser.parse(&line) {
                        let _ = events.send(event);
                    }
                }
            }
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(EngineError::exec(format!("ffmpeg exited with {status}")))
        }
    }

    async fn read_file(&self, name: &str) -> Result<Bytes, EngineError> {
        let path = self.resolve(name)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or_io(name, e))?;
        Ok(Bytes::from(data))
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or_io(name, e))
    }

    /// Cancel the current run. A polled `exec` kills the child itself; a
    /// dropped one takes the child down through `kill_on_drop`.
    async fn abort(&self) {
        if let Some(token) = self.current.lock().take() {
            token.cancel();
        }
    }
}

/// Holds the cancellation token of the running `exec` and clears it on
/// every way out.
struct RunSlot<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
}

impl<'a> RunSlot<'a> {
    fn claim(slot: &'a Mutex<Option<CancellationToken>>, token: CancellationToken) -> Self {
        *slot.lock() = Some(token);
        Self { slot }
    }
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

/// Turns ffmpeg stderr lines into [`EngineEvent`]s.
///
/// Progress is measured against the span ffmpeg will actually write: the
/// `-ss`/`-to` window when both precede the input, otherwise the input
/// `Duration:` minus the start offset.
#[derive(Debug, Default)]
pub struct ProgressParser {
    duration_us: Option<u64>,
    start_us: u64,
}

impl ProgressParser {
    /// Parser that already knows the output duration.
    pub fn with_duration_secs(secs: f64) -> Self {
        Self {
            duration_us: Some((secs * 1_000_000.0) as u64),
            start_us: 0,
        }
    }

    /// Parser seeded from the trim flags placed before `-i`.
    pub fn for_args(args: &[String]) -> Self {
        let (start, end) = input_trim(args);
        let start_us = start.unwrap_or(0);
        let duration_us = end.map(|end| end.saturating_sub(start_us));
        Self {
            duration_us,
            start_us,
        }
    }

    pub fn duration_us(&self) -> Option<u64> {
        self.duration_us
    }

    /// Interpret one line. Progress keys other than the elapsed time are
    /// swallowed; anything else is a log line.
    pub fn parse(&mut self, line: &str) -> Option<EngineEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if let Some(rest) = line.strip_prefix("Duration:") {
            if self.duration_us.is_none() {
                self.duration_us = rest
                    .split(',')
                    .next()
                    .and_then(|ts| parse_timestamp(ts.trim()))
                    .map(|total| total.saturating_sub(self.start_us));
            }
            return Some(EngineEvent::Log(line.to_string()));
        }

        if let Some((key, value)) = line.split_once('=') {
            if is_progress_key(key) {
                return self.progress(key, value.trim());
            }
        }

        Some(EngineEvent::Log(line.to_string()))
    }

    fn progress(&self, key: &str, value: &str) -> Option<EngineEvent> {
        match key {
            // out_time_ms is microseconds too, despite the name.
            "out_time_us" | "out_time_ms" => {
                let elapsed: i64 = value.parse().ok()?;
                let duration = self.duration_us.filter(|d| *d > 0)?;
                Some(EngineEvent::Progress(elapsed as f64 / duration as f64))
            }
            "progress" if value == "end" => Some(EngineEvent::Progress(1.0)),
            _ => None,
        }
    }
}

/// Start and end of the `-ss`/`-to` input options, in microseconds.
fn input_trim(args: &[String]) -> (Option<u64>, Option<u64>) {
    let mut start = None;
    let mut end = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-i" => break,
            "-ss" => start = iter.next().and_then(|v| parse_timestamp(v)),
            "-to" => end = iter.next().and_then(|v| parse_timestamp(v)),
            _ => {}
        }
    }
    (start, end)
}

fn is_progress_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse `HH:MM:SS[.frac]` into microseconds.
fn parse_timestamp(ts: &str) -> Option<u64> {
    let mut parts = ts.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some((hours * 3600 + minutes * 60) * 1_000_000 + (seconds * 1_000_000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_then_progress() {
        let mut parser = ProgressParser::default();

        assert_eq!(
            parser.parse("  Duration: 00:01:40.00, start: 0.000000, bitrate: 1205 kb/s"),
            Some(EngineEvent::Log(
                "Duration: 00:01:40.00, start: 0.000000, bitrate: 1205 kb/s".into()
            ))
        );
        assert_eq!(parser.duration_us(), Some(100_000_000));

        assert_eq!(
            parser.parse("out_time_us=25000000"),
            Some(EngineEvent::Progress(0.25))
        );
        assert_eq!(parser.parse("progress=continue"), None);
        assert_eq!(parser.parse("progress=end"), Some(EngineEvent::Progress(1.0)));
    }

    #[test]
    fn progress_without_duration_is_dropped() {
        let mut parser = ProgressParser::default();
        assert_eq!(parser.parse("out_time_us=5000000"), None);
        assert_eq!(parser.parse("out_time_us=N/A"), None);
    }

    #[test]
    fn other_progress_keys_are_swallowed() {
        let mut parser = ProgressParser::with_duration_secs(10.0);
        assert_eq!(parser.parse("frame=120"), None);
        assert_eq!(parser.parse("bitrate=N/A"), None);
        assert_eq!(parser.parse("speed=2.01x"), None);
        assert_eq!(
            parser.parse("out_time_ms=5000000"),
            Some(EngineEvent::Progress(0.5))
        );
    }

    #[test]
    fn free_text_is_logged() {
        let mut parser = ProgressParser::default();
        assert_eq!(parser.parse(""), None);
        assert_eq!(
            parser.parse("Stream mapping:"),
            Some(EngineEvent::Log("Stream mapping:".into()))
        );
        assert_eq!(
            parser.parse("[libx264 @ 0x5581] crf=18.0 qcomp=0.60"),
            Some(EngineEvent::Log("[libx264 @ 0x5581] crf=18.0 qcomp=0.60".into()))
        );
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn trimmed_window_is_the_progress_span() {
        let mut parser = ProgressParser::for_args(&args(&[
            "-ss", "00:00:10", "-to", "00:01:30", "-i", "input.mp4", "-y", "output.mp4",
        ]));
        assert_eq!(parser.duration_us(), Some(80_000_000));

        parser.parse("Duration: 00:01:40.00, start: 0.000000, bitrate: 1205 kb/s");
        assert_eq!(parser.duration_us(), Some(80_000_000));
        assert_eq!(
            parser.parse("out_time_us=40000000"),
            Some(EngineEvent::Progress(0.5))
        );
    }

    #[test]
    fn start_only_trim_subtracts_from_duration() {
        let mut parser =
            ProgressParser::for_args(&args(&["-ss", "00:00:20", "-i", "input.mp4", "output.mp4"]));
        assert_eq!(parser.duration_us(), None);

        parser.parse("Duration: 00:01:40.00, start: 0.000000, bitrate: 1205 kb/s");
        assert_eq!(parser.duration_us(), Some(80_000_000));
        assert_eq!(
            parser.parse("out_time_us=20000000"),
            Some(EngineEvent::Progress(0.25))
        );
    }

    #[test]
    fn trim_after_input_is_ignored() {
        let parser =
            ProgressParser::for_args(&args(&["-i", "input.mp4", "-to", "00:00:05", "output.mp4"]));
        assert_eq!(parser.duration_us(), None);
    }

    #[test]
    fn timestamps() {
        assert_eq!(parse_timestamp("00:00:01.50"), Some(1_500_000));
        assert_eq!(parse_timestamp("01:00:00"), Some(3_600_000_000));
        assert_eq!(parse_timestamp("N/A"), None);
        assert_eq!(parse_timestamp("00:00:01:00"), None);
    }

    #[test]
    fn locate_missing_core() {
        assert!(matches!(
            locate("nonexistent_core_12345"),
            Err(EngineError::Load(_))
        ));
        assert!(matches!(
            locate("/nonexistent/dir/ffmpeg"),
            Err(EngineError::Load(_))
        ));
    }

    fn engine() -> FfmpegEngine {
        FfmpegEngine {
            program: PathBuf::from("ffmpeg"),
            version: String::new(),
            storage: tempfile::tempdir().unwrap(),
            current: Mutex::new(None),
        }
    }

    #[tokio::test]
    async fn storage_round_trip() {
        let engine = engine();
        engine
            .write_file("input.mp4", Bytes::from_static(b"data"))
            .await
            .unwrap();
        assert!(engine.storage().join("input.mp4").exists());
        assert_eq!(
            engine.read_file("input.mp4").await.unwrap(),
            Bytes::from_static(b"data")
        );
        engine.delete_file("input.mp4").await.unwrap();
        assert!(matches!(
            engine.read_file("input.mp4").await,
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            engine.delete_file("input.mp4").await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rejects_path_like_names() {
        let engine = engine();
        for name in ["", ".", "..", "../escape.mp4", "dir/file.mp4", "dir\\file.mp4"] {
            assert!(
                matches!(
                    engine.write_file(name, Bytes::new()).await,
                    Err(EngineError::InvalidName(_))
                ),
                "{name:?} accepted"
            );
        }
    }

    /// Write an executable stand-in for ffmpeg that answers `-version` and
    /// otherwise runs `body`.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        let script = format!(
            "#!/bin/sh\nif [ \"$1\" = \"-version\" ]; then echo 'ffmpeg version test'; exit 0; fi\n{body}\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exec_relays_non_utf8_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let core = fake_ffmpeg(
            dir.path(),
            r"printf '    title           : Caf\351 Ol\351\n' >&2
printf 'progress=end\n' >&2
exit 0",
        );

        let engine = FfmpegLoader::new()
            .load(Build::SingleThreaded, core.to_str().unwrap())
            .await
            .unwrap();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        engine
            .exec(&args(&["-i", "input.mp4", "output.mp4"]), tx)
            .await
            .unwrap();

        assert_eq!(
            drain(rx),
            vec![
                EngineEvent::Log("title           : Caf\u{FFFD} Ol\u{FFFD}".into()),
                EngineEvent::Progress(1.0),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exec_reports_progress_over_trimmed_window() {
        let dir = tempfile::tempdir().unwrap();
        let core = fake_ffmpeg(
            dir.path(),
            "echo '  Duration: 00:01:40.00, start: 0.000000, bitrate: 1205 kb/s' >&2
echo 'out_time_us=40000000' >&2
echo 'progress=continue' >&2
exit 0",
        );

        let engine = FfmpegLoader::new()
            .load(Build::SingleThreaded, core.to_str().unwrap())
            .await
            .unwrap();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        engine
            .exec(
                &args(&["-ss", "00:00:10", "-to", "00:01:30", "-i", "input.mp4", "output.mp4"]),
                tx,
            )
            .await
            .unwrap();

        let progress: Vec<f64> = drain(rx)
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Progress(p) => Some(p),
                EngineEvent::Log(_) => None,
            })
            .collect();
        assert_eq!(progress, vec![0.5]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_exec_releases_cancel_token() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FfmpegEngine {
            program: fake_ffmpeg(dir.path(), "echo 'Invalid argument' >&2\nexit 1"),
            ..engine()
        };

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let err = engine.exec(&args(&["output.mp4"]), tx).await.unwrap_err();
        assert!(matches!(err, EngineError::Exec(_)), "{err:?}");
        assert!(engine.current.lock().is_none());
        assert_eq!(drain(rx), vec![EngineEvent::Log("Invalid argument".into())]);
    }

    #[tokio::test]
    async fn spawn_failure_releases_cancel_token() {
        let engine = FfmpegEngine {
            program: PathBuf::from("/nonexistent/bin/ffmpeg"),
            ..engine()
        };
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        assert!(matches!(
            engine.exec(&args(&["output.mp4"]), tx).await,
            Err(EngineError::Exec(_))
        ));
        assert!(engine.current.lock().is_none());
    }

    #[tokio::test]
    async fn storage_removed_on_drop() {
        let engine = engine();
        let dir = engine.storage().to_path_buf();
        assert!(dir.exists());
        drop(engine);
        assert!(!dir.exists());
    }
}
