use clipforge_av::InputLimits;
use clipforge_common::ProcessOptions;
use clipforge_engine::SessionConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration file.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Engine loading and event settings.
    #[serde(default)]
    pub engine: SessionConfig,

    /// Input size and type limits.
    #[serde(default)]
    pub limits: InputLimits,

    /// Options used when the command line does not set them.
    #[serde(default)]
    pub defaults: ProcessOptions,
}
