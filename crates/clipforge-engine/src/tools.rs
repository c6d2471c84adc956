//! Local transcoder discovery.

use std::path::PathBuf;
use std::process::Command;

use serde::Serialize;

use crate::error::EngineError;

/// Tools reported by [`check_tools`].
pub const KNOWN_TOOLS: [&str; 2] = ["ffmpeg", "ffprobe"];

/// Information about an external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of the tool's `-version` output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Check whether a tool runs and report its version.
///
/// # Example
///
/// ```no_run
/// use clipforge_engine::tools::check_tool;
///
/// let info = check_tool("ffmpeg");
/// if info.available {
///     println!("ffmpeg version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str) -> ToolInfo {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => ToolInfo {
            name: name.to_string(),
            available: true,
            version: String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string()),
            path: which::which(name).ok(),
        },
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check every tool in [`KNOWN_TOOLS`].
pub fn check_tools() -> Vec<ToolInfo> {
    KNOWN_TOOLS.iter().map(|name| check_tool(name)).collect()
}

/// Require that a tool is on `PATH`, returning its location.
pub fn require_tool(name: &str) -> Result<PathBuf, EngineError> {
    which::which(name).map_err(|_| EngineError::load(format!("{name} not found on PATH")))
}
