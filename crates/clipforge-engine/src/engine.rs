//! Transcoding engine abstraction and capability-aware loading.
//!
//! An [`Engine`] is a loaded transcoder with private file storage: bytes go in
//! through [`Engine::write_file`], a single [`Engine::exec`] turns them into an
//! output file, and [`Engine::read_file`] hands the result back. Progress and
//! log lines are pushed into an [`EventSink`] while `exec` runs.
//!
//! [`EngineLoader`] produces engines for one of two builds. [`attempt_load`]
//! applies the fallback policy: the multi-threaded build is tried first only
//! when the host can share memory between threads, and a failure there falls
//! back silently to the single-threaded build.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use clipforge_common::Capability;
use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::session::SessionConfig;

/// Event emitted by an engine during `exec`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Completion ratio, nominally in `[0, 1]`. Engines may overshoot.
    Progress(f64),
    /// One free-text log line.
    Log(String),
}

/// Channel an engine pushes [`EngineEvent`]s into.
pub type EventSink = mpsc::UnboundedSender<EngineEvent>;

/// A loaded transcoding engine.
///
/// Each call may fail independently. Names passed to the file operations are
/// plain names inside the engine's private storage, never host paths.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Store `data` under `name`, replacing any previous file.
    async fn write_file(&self, name: &str, data: Bytes) -> Result<(), EngineError>;

    /// Execute one argument sequence to completion.
    async fn exec(&self, args: &[String], events: EventSink) -> Result<(), EngineError>;

    /// Read back a stored file.
    async fn read_file(&self, name: &str) -> Result<Bytes, EngineError>;

    /// Remove a stored file.
    async fn delete_file(&self, name: &str) -> Result<(), EngineError>;

    /// Ask an in-flight `exec` to stop.
    ///
    /// The caller may drop the `exec` future right after this returns, so an
    /// implementation must not depend on that future being polled again.
    async fn abort(&self);
}

/// Which engine build to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Build {
    /// Build that needs shared memory between threads.
    MultiThreaded,
    /// Build that runs on a single thread anywhere.
    SingleThreaded,
}

impl Build {
    /// Capability a session gains when this build loads.
    pub fn capability(self) -> Capability {
        match self {
            Self::MultiThreaded => Capability::MultiThreaded,
            Self::SingleThreaded => Capability::SingleThreaded,
        }
    }

    /// Core location configured for this build.
    pub fn core_location(self, config: &SessionConfig) -> &str {
        match self {
            Self::MultiThreaded => &config.multi_threaded_core,
            Self::SingleThreaded => &config.single_threaded_core,
        }
    }
}

impl fmt::Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiThreaded => f.write_str("multi-threaded"),
            Self::SingleThreaded => f.write_str("single-threaded"),
        }
    }
}

/// Loads engine builds from a core location.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Load `build` from `core`.
    async fn load(&self, build: Build, core: &str) -> Result<Arc<dyn Engine>, EngineError>;
}

/// What the host offers the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEnvironment {
    /// Whether threads can share memory, which the multi-threaded build needs.
    pub shared_memory: bool,
    /// Logical CPUs visible to this process.
    pub logical_cpus: usize,
}

impl HostEnvironment {
    /// Probe the current host.
    ///
    /// A single logical CPU gains nothing from the multi-threaded build, so it
    /// is reported as lacking shared memory.
    pub fn detect() -> Self {
        let logical_cpus = num_cpus::get();
        Self {
            shared_memory: logical_cpus > 1,
            logical_cpus,
        }
    }

    /// Host that only supports the single-threaded build.
    pub fn single_threaded() -> Self {
        Self {
            shared_memory: false,
            logical_cpus: 1,
        }
    }

    /// Host that supports both builds.
    pub fn multi_threaded(logical_cpus: usize) -> Self {
        Self {
            shared_memory: true,
            logical_cpus,
        }
    }
}

/// Result of [`attempt_load`].
pub enum LoadOutcome {
    /// An engine is available at the given capability.
    Loaded {
        engine: Arc<dyn Engine>,
        capability: Capability,
    },
    /// Every applicable build failed.
    Failed { reason: String },
}

impl fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded { engine, capability } => f
                .debug_struct("Loaded")
                .field("engine", &engine.name())
                .field("capability", capability)
                .finish(),
            Self::Failed { reason } => f.debug_struct("Failed").field("reason", reason).finish(),
        }
    }
}

/// Builds to try, in order, for a host and configuration.
pub fn build_order(host: &HostEnvironment, config: &SessionConfig) -> Vec<Build> {
    if host.shared_memory && !config.force_single_thread {
        vec![Build::MultiThreaded, Build::SingleThreaded]
    } else {
        vec![Build::SingleThreaded]
    }
}

/// Load an engine, falling back from the multi-threaded build when it fails.
///
/// The fallback is silent to callers: only a failure of every applicable build
/// yields [`LoadOutcome::Failed`], whose reason lists each attempt.
pub async fn attempt_load(
    loader: &dyn EngineLoader,
    host: &HostEnvironment,
    config: &SessionConfig,
) -> LoadOutcome {
    let mut failures = Vec::new();

    for build in build_order(host, config) {
        let core = build.core_location(config);
        tracing::debug!("Loading {} engine from {}", build, core);

        match loader.load(build, core).await {
            Ok(engine) => {
                tracing::info!("Loaded {} engine ({})", build, engine.name());
                return LoadOutcome::Loaded {
                    engine,
                    capability: build.capability(),
                };
            }
            Err(e) => {
                if build == Build::MultiThreaded {
                    tracing::warn!(
                        "Multi-threaded engine failed to load, falling back to single-threaded: {}",
                        e
                    );
                }
                failures.push(format!("{build}: {e}"));
            }
        }
    }

    let reason = failures.join("; ");
    tracing::error!("Engine load failed: {}", reason);
    LoadOutcome::Failed { reason }
}
