mod types;

pub use types::*;

use anyhow::{Context, Result};
use clipforge_av::{aspect, validate::validate_trim, InputLimits};
use clipforge_common::Container;
use std::path::Path;

/// Locations searched, in order, when no config file is given.
pub const DEFAULT_PATHS: [&str; 3] = [
    "./clipforge.toml",
    "~/.config/clipforge/config.toml",
    "/etc/clipforge/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    for warning in validate_config(&config)? {
        tracing::warn!("{}", warning);
    }

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration.
///
/// Returns warnings for settings that work but are probably unintended.
pub fn validate_config(config: &Config) -> Result<Vec<String>> {
    let engine = &config.engine;
    if engine.event_buffer == 0 {
        anyhow::bail!("engine.event_buffer cannot be 0");
    }
    if engine.multi_threaded_core.trim().is_empty() {
        anyhow::bail!("engine.multi_threaded_core cannot be empty");
    }
    if engine.single_threaded_core.trim().is_empty() {
        anyhow::bail!("engine.single_threaded_core cannot be empty");
    }

    if config.limits.max_input_bytes == 0 {
        anyhow::bail!("limits.max_input_bytes cannot be 0");
    }

    let defaults = &config.defaults;
    validate_trim(&defaults.start_time, &defaults.end_time, None)
        .context("Invalid trim window in [defaults]")?;

    let mut warnings = Vec::new();

    let known_types = known_mime_types();
    for mime in &config.limits.accepted_types {
        if !known_types.iter().any(|k| k.eq_ignore_ascii_case(mime)) {
            warnings.push(format!("Unknown accepted MIME type: {mime}"));
        }
    }

    if !(1..=4).contains(&defaults.quality) {
        warnings.push(format!(
            "defaults.quality {} is outside 1-4 and will use tier 2",
            defaults.quality
        ));
    }

    if let Some(name) = defaults.aspect_ratio.as_deref() {
        if name != aspect::ORIGINAL && aspect::ratio_for(name).is_none() {
            warnings.push(format!("Unknown aspect ratio {name:?} will not crop"));
        }
    }

    Ok(warnings)
}

fn known_mime_types() -> Vec<String> {
    let mut known = InputLimits::default().accepted_types;
    for container in Container::ALL {
        let mime = container.mime_type().to_string();
        if !known.contains(&mime) {
            known.push(mime);
        }
    }
    known
}
