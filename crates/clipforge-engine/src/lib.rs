//! # clipforge-engine
//!
//! Lifecycle and run protocol for an asynchronously loaded transcoding engine.
//!
//! This crate provides:
//!
//! - **Engine seam** ([`Engine`], [`EngineLoader`]) -- the opaque engine as an
//!   async interface with an event stream, so session logic runs against a
//!   mock as easily as against a real binary.
//! - **Capability probing** ([`attempt_load`]) -- multi-threaded build first
//!   when the host allows it, single-threaded fallback otherwise.
//! - **Cleanup tracking** ([`ResourceLedger`]) -- every engine-side file a run
//!   creates is removed, whatever the outcome.
//! - **Progress relay** ([`ProgressChannel`]) -- bounded percentages and log
//!   lines fanned out to observers.
//! - **Session** ([`EngineSession`]) -- the state machine tying it together:
//!   `load`, `run`, `cancel`, `reset`.
//! - **Backends** ([`FfmpegLoader`], [`MockEngine`]) -- a local ffmpeg process
//!   engine and a scriptable in-memory engine.

pub mod engine;
mod error;
pub mod ledger;
pub mod mock;
pub mod output;
pub mod process;
pub mod progress;
pub mod session;
pub mod tools;

// ---- Re-exports for convenience ----

pub use engine::{
    attempt_load, Build, Engine, EngineEvent, EngineLoader, EventSink, HostEnvironment,
    LoadOutcome,
};
pub use error::{EngineError, SessionError};
pub use ledger::ResourceLedger;
pub use mock::{MockEngine, MockLoader, MockScript};
pub use output::{InputFile, OutputHandle, OutputInfo, SizeReport};
pub use process::{FfmpegEngine, FfmpegLoader, ProgressParser};
pub use progress::{percent_from_ratio, ProgressChannel, SessionEvent};
pub use session::{EngineSession, Phase, SessionConfig, SessionSnapshot};
pub use tools::{check_tools, ToolInfo};
