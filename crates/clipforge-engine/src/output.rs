//! Run inputs, owned outputs and size reporting.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use clipforge_common::paths::{engine_input_name, mime_for_name};
use clipforge_common::size::format_file_size;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// MIME type assumed when a name has no recognizable extension.
const FALLBACK_MIME: &str = "application/octet-stream";

/// A media file handed to a run.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Original file name; only its extension matters to the engine.
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
    /// Media duration, when the caller knows it. Enables end-time validation.
    pub duration_secs: Option<u64>,
}

impl InputFile {
    /// Wrap in-memory bytes, guessing the MIME type from the name.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime_type = mime_for_name(&name).unwrap_or(FALLBACK_MIME).to_string();
        Self {
            name,
            mime_type,
            data: data.into(),
            duration_secs: None,
        }
    }

    /// Read a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| EngineError::InvalidName(path.display().to_string()))?;
        let data = tokio::fs::read(path).await?;
        Ok(Self::new(name, data))
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_duration(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Name the file is stored under inside the engine.
    pub fn engine_name(&self) -> String {
        engine_input_name(&self.name)
    }
}

/// Ownership of the most recent run's result.
///
/// Deliberately not `Clone`: the session holds exactly one, and releasing it
/// means dropping it.
#[derive(Debug)]
pub struct OutputHandle {
    id: u64,
    name: String,
    mime_type: String,
    data: Bytes,
    original_bytes: u64,
}

impl OutputHandle {
    pub(crate) fn new(
        id: u64,
        name: String,
        mime_type: String,
        data: Bytes,
        original_bytes: u64,
    ) -> Self {
        Self {
            id,
            name,
            mime_type,
            data,
            original_bytes,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The output bytes. Cheap: `Bytes` is reference-counted.
    pub fn data(&self) -> Bytes {
        self.data.clone()
    }

    pub fn info(&self) -> OutputInfo {
        OutputInfo {
            id: self.id,
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size: SizeReport {
                original_bytes: self.original_bytes,
                output_bytes: self.data.len() as u64,
            },
        }
    }
}

/// Description of an output, safe to copy around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub id: u64,
    pub name: String,
    pub mime_type: String,
    pub size: SizeReport,
}

/// Input vs output size comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeReport {
    pub original_bytes: u64,
    pub output_bytes: u64,
}

impl SizeReport {
    /// Percentage saved relative to the input. Negative when the output grew.
    pub fn reduction_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        let original = self.original_bytes as f64;
        (original - self.output_bytes as f64) / original * 100.0
    }

    pub fn has_reduction(&self) -> bool {
        self.reduction_percent() > 0.0
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            format_file_size(self.original_bytes),
            format_file_size(self.output_bytes)
        )?;
        if self.has_reduction() {
            write!(f, " ({:.1}% smaller)", self.reduction_percent())?;
        }
        Ok(())
    }
}
