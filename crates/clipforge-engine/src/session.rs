//! The engine session state machine.
//!
//! One [`EngineSession`] owns one engine handle and at most one output. It
//! moves through [`Phase`]s:
//!
//! ```text
//! Uninitialized --load--> Loading --ok--> Ready --run--> Running --ok--> Done
//!                            |                              |
//!                            +--both builds fail--> Failed <+--error/cancel
//!
//! Done | Failed --reset--> Ready (engine loaded) | Uninitialized
//! ```
//!
//! Every path out of `Running` lands in exactly `Done` or `Failed`, including
//! a run future dropped mid-flight. Engine-side files created by a run are
//! removed whatever the outcome.
//!
//! All methods take `&self`; share a session across tasks with an `Arc` so one
//! task can `cancel()` while another awaits `run()`.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use clipforge_av::validate::validate_trim;
use clipforge_av::{compile, effective_container, output_file_name, InputLimits};
use clipforge_common::{Capability, ProcessOptions};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::engine::{attempt_load, Engine, EngineEvent, EngineLoader, HostEnvironment, LoadOutcome};
use crate::error::SessionError;
use crate::ledger::ResourceLedger;
use crate::output::{InputFile, OutputHandle, OutputInfo};
use crate::progress::{percent_from_ratio, ProgressChannel, SessionEvent, DEFAULT_EVENT_BUFFER};

/// Default core location for both builds: an `ffmpeg` on `PATH`.
pub const DEFAULT_CORE: &str = "ffmpeg";

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
    Running,
    Done,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Whether a load or run is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Loading | Self::Running)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine settings for a session (`[engine]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the multi-threaded build is loaded from.
    pub multi_threaded_core: String,
    /// Where the single-threaded build is loaded from.
    pub single_threaded_core: String,
    /// Skip the multi-threaded build even when the host supports it.
    pub force_single_thread: bool,
    /// Broadcast capacity for session events.
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            multi_threaded_core: DEFAULT_CORE.to_string(),
            single_threaded_core: DEFAULT_CORE.to_string(),
            force_single_thread: false,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Observable session state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub capability: Capability,
    /// 0-100.
    pub progress: u8,
    pub last_log: Option<String>,
    /// Present only in `Failed`.
    pub last_error: Option<String>,
    pub output: Option<OutputInfo>,
    pub output_size_bytes: Option<u64>,
}

#[derive(Debug)]
struct SessionState {
    phase: Phase,
    capability: Capability,
    progress: u8,
    last_log: Option<String>,
    last_error: Option<String>,
    output: Option<OutputHandle>,
    cancel: Option<CancellationToken>,
    next_output_id: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Uninitialized,
            capability: Capability::Unknown,
            progress: 0,
            last_log: None,
            last_error: None,
            output: None,
            cancel: None,
            next_output_id: 1,
        }
    }
}

/// Everything a run needs once it has been admitted.
struct RunTicket {
    engine: Arc<dyn Engine>,
    capability: Capability,
    cancel: CancellationToken,
    output_id: u64,
}

/// Moves the session out of a busy phase if the owning future is dropped.
struct InterruptGuard<'a> {
    session: &'a EngineSession,
    from: Phase,
    to: Phase,
    armed: bool,
}

impl<'a> InterruptGuard<'a> {
    fn new(session: &'a EngineSession, from: Phase, to: Phase) -> Self {
        Self {
            session,
            from,
            to,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.interrupt(self.from, self.to);
        }
    }
}

/// A transcoding engine session.
pub struct EngineSession {
    loader: Arc<dyn EngineLoader>,
    host: HostEnvironment,
    config: SessionConfig,
    limits: InputLimits,
    engine: RwLock<Option<Arc<dyn Engine>>>,
    state: Mutex<SessionState>,
    events: ProgressChannel,
}

impl EngineSession {
    /// Create a session for the detected host with default input limits.
    ///
    /// # Panics
    ///
    /// Panics if `config.event_buffer` is zero.
    pub fn new(loader: Arc<dyn EngineLoader>, config: SessionConfig) -> Self {
        let events = ProgressChannel::new(config.event_buffer);
        Self {
            loader,
            host: HostEnvironment::detect(),
            config,
            limits: InputLimits::default(),
            engine: RwLock::new(None),
            state: Mutex::new(SessionState::default()),
            events,
        }
    }

    pub fn with_host(mut self, host: HostEnvironment) -> Self {
        self.host = host;
        self
    }

    pub fn with_limits(mut self, limits: InputLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn limits(&self) -> &InputLimits {
        &self.limits
    }

    pub fn host(&self) -> &HostEnvironment {
        &self.host
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn capability(&self) -> Capability {
        self.state.lock().capability
    }

    pub fn progress(&self) -> u8 {
        self.state.lock().progress
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.read().is_some()
    }

    /// Bytes of the current output, if any.
    pub fn output_data(&self) -> Option<Bytes> {
        self.state.lock().output.as_ref().map(OutputHandle::data)
    }

    pub fn output_info(&self) -> Option<OutputInfo> {
        self.state.lock().output.as_ref().map(OutputHandle::info)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        let output = state.output.as_ref().map(OutputHandle::info);
        SessionSnapshot {
            phase: state.phase,
            capability: state.capability,
            progress: state.progress,
            last_log: state.last_log.clone(),
            last_error: state.last_error.clone(),
            output_size_bytes: output.as_ref().map(|o| o.size.output_bytes),
            output,
        }
    }

    /// Load the engine, once.
    ///
    /// Calling `load` on a session that already holds an engine returns the
    /// frozen capability without loading again.
    pub async fn load(&self) -> Result<Capability, SessionError> {
        {
            let mut state = self.state.lock();
            if state.phase.is_busy() {
                return Err(SessionError::Busy(state.phase));
            }
            if self.engine.read().is_some() {
                return Ok(state.capability);
            }
            if state.phase == Phase::Failed {
                return Err(SessionError::InvalidState {
                    operation: "load",
                    phase: state.phase,
                });
            }
            state.phase = Phase::Loading;
        }
        self.events.phase(Phase::Loading);
        tracing::info!("Loading engine");

        let mut guard = InterruptGuard::new(self, Phase::Loading, Phase::Uninitialized);
        let outcome = attempt_load(self.loader.as_ref(), &self.host, &self.config).await;
        guard.disarm();

        match outcome {
            LoadOutcome::Loaded { engine, capability } => {
                *self.engine.write() = Some(engine);
                {
                    let mut state = self.state.lock();
                    state.capability = capability;
                    state.phase = Phase::Ready;
                }
                self.events.phase(Phase::Ready);
                tracing::info!("Engine ready ({})", capability);
                Ok(capability)
            }
            LoadOutcome::Failed { reason } => {
                {
                    let mut state = self.state.lock();
                    state.phase = Phase::Failed;
                    state.last_error = Some(reason.clone());
                }
                self.events.phase(Phase::Failed);
                Err(SessionError::Load(reason))
            }
        }
    }

    /// Convert one input with one option set.
    ///
    /// Allowed from `Ready` and from `Done`, where the previous output is
    /// released first. Validation failures are returned before anything
    /// changes; a call while `Running` is rejected with
    /// [`SessionError::Busy`] and leaves the in-flight run alone.
    pub async fn run(
        &self,
        input: InputFile,
        options: ProcessOptions,
    ) -> Result<OutputInfo, SessionError> {
        let ticket = self.admit(&input, &options)?;
        let mut guard = InterruptGuard::new(self, Phase::Running, Phase::Failed);

        let input_name = input.engine_name();
        let output_name = output_file_name(&input_name, options.format);
        let result = self
            .execute(&ticket, &input, &input_name, &output_name, &options)
            .await;
        guard.disarm();

        match result {
            Ok(data) => {
                let mime_type = effective_container(&input_name, options.format)
                    .mime_type()
                    .to_string();
                let handle =
                    OutputHandle::new(ticket.output_id, output_name, mime_type, data, input.size());
                let info = handle.info();
                {
                    let mut state = self.state.lock();
                    state.output = Some(handle);
                    state.progress = 100;
                    state.phase = Phase::Done;
                    state.cancel = None;
                }
                self.events.emit(SessionEvent::OutputReady {
                    id: info.id,
                    name: info.name.clone(),
                    bytes: info.size.output_bytes,
                });
                self.events.phase(Phase::Done);
                tracing::info!("Run finished: {} ({})", info.name, info.size);
                Ok(info)
            }
            Err(e) => {
                match &e {
                    SessionError::Cancelled => tracing::warn!("Run cancelled"),
                    other => tracing::error!("Run failed: {}", other),
                }
                {
                    let mut state = self.state.lock();
                    state.phase = Phase::Failed;
                    state.last_error = Some(e.to_string());
                    state.cancel = None;
                }
                self.events.phase(Phase::Failed);
                Err(e)
            }
        }
    }

    /// Request cancellation of the in-flight run.
    ///
    /// Returns `false` when nothing is running. The run itself resolves to
    /// [`SessionError::Cancelled`] once the engine acknowledges the abort.
    pub fn cancel(&self) -> bool {
        let state = self.state.lock();
        match (state.phase, &state.cancel) {
            (Phase::Running, Some(token)) => {
                tracing::warn!("Cancellation requested");
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Release the output and clear error and progress.
    ///
    /// Returns the phase the session landed in: `Ready` when an engine is
    /// loaded, `Uninitialized` otherwise.
    pub fn reset(&self) -> Result<Phase, SessionError> {
        let (next, released) = {
            let mut state = self.state.lock();
            if state.phase.is_busy() {
                return Err(SessionError::Busy(state.phase));
            }
            let next = if self.engine.read().is_some() {
                Phase::Ready
            } else {
                state.capability = Capability::Unknown;
                Phase::Uninitialized
            };
            state.phase = next;
            state.progress = 0;
            state.last_log = None;
            state.last_error = None;
            state.cancel = None;
            (next, state.output.take())
        };

        if let Some(output) = released {
            self.release(output);
        }
        self.events.phase(next);
        tracing::info!("Session reset to {}", next);
        Ok(next)
    }

    /// Check phase and input, then move to `Running`.
    fn admit(&self, input: &InputFile, options: &ProcessOptions) -> Result<RunTicket, SessionError> {
        let (ticket, released) = {
            let mut state = self.state.lock();
            match state.phase {
                Phase::Ready | Phase::Done => {}
                Phase::Loading | Phase::Running => return Err(SessionError::Busy(state.phase)),
                Phase::Uninitialized => return Err(SessionError::NotReady),
                Phase::Failed => {
                    return Err(SessionError::InvalidState {
                        operation: "run",
                        phase: state.phase,
                    })
                }
            }

            self.limits.check(input.size(), &input.mime_type)?;
            validate_trim(&options.start_time, &options.end_time, input.duration_secs)?;

            let engine = self.engine.read().clone().ok_or(SessionError::NotReady)?;

            let cancel = CancellationToken::new();
            let output_id = state.next_output_id;
            state.next_output_id += 1;
            state.phase = Phase::Running;
            state.progress = 0;
            state.last_log = None;
            state.last_error = None;
            state.cancel = Some(cancel.clone());

            let ticket = RunTicket {
                engine,
                capability: state.capability,
                cancel,
                output_id,
            };
            (ticket, state.output.take())
        };

        if let Some(output) = released {
            self.release(output);
        }
        self.events.phase(Phase::Running);
        self.events.progress(0);
        tracing::info!("Run started: {} ({} bytes)", input.name, input.size());
        Ok(ticket)
    }

    async fn execute(
        &self,
        ticket: &RunTicket,
        input: &InputFile,
        input_name: &str,
        output_name: &str,
        options: &ProcessOptions,
    ) -> Result<Bytes, SessionError> {
        let engine = &ticket.engine;
        let mut ledger = ResourceLedger::new(Arc::clone(engine));

        let result = async {
            ledger.record(input_name);
            engine
                .write_file(input_name, input.data.clone())
                .await
                .map_err(|e| SessionError::execution(format!("writing input: {e}"), self.last_log()))?;

            if ticket.cancel.is_cancelled() {
                return Err(SessionError::Cancelled);
            }

            let args = compile(input_name, options, ticket.capability);
            ledger.record(output_name);
            self.exec(engine.as_ref(), &args, &ticket.cancel).await?;

            engine
                .read_file(output_name)
                .await
                .map_err(|e| SessionError::execution(format!("reading output: {e}"), self.last_log()))
        }
        .await;

        let failed = ledger.clear().await;
        if failed > 0 {
            tracing::debug!("{} engine file(s) could not be removed", failed);
        }
        result
    }

    /// Run the engine, relaying its events until it finishes or is cancelled.
    async fn exec(
        &self,
        engine: &dyn Engine,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut exec = engine.exec(args, tx);

        let finished = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break None,
                Some(event) = rx.recv() => self.relay(event),
                result = &mut exec => break Some(result),
            }
        };

        if finished.is_none() {
            engine.abort().await;
        }
        drop(exec);
        while let Ok(event) = rx.try_recv() {
            self.relay(event);
        }

        match finished {
            None => Err(SessionError::Cancelled),
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(SessionError::execution(e.to_string(), self.last_log())),
        }
    }

    fn relay(&self, event: EngineEvent) {
        match event {
            EngineEvent::Progress(ratio) => {
                let percent = percent_from_ratio(ratio);
                self.state.lock().progress = percent;
                self.events.progress(percent);
            }
            EngineEvent::Log(line) => {
                tracing::trace!("engine: {}", line);
                self.state.lock().last_log = Some(line.clone());
                self.events.log(line);
            }
        }
    }

    fn last_log(&self) -> String {
        self.state.lock().last_log.clone().unwrap_or_default()
    }

    fn release(&self, output: OutputHandle) {
        let id = output.id();
        drop(output);
        self.events.emit(SessionEvent::OutputReleased { id });
        tracing::debug!("Released output {}", id);
    }

    fn interrupt(&self, from: Phase, to: Phase) {
        {
            let mut state = self.state.lock();
            if state.phase != from {
                return;
            }
            state.phase = to;
            state.cancel = None;
            if to == Phase::Failed {
                state.last_error = Some(format!("{from} interrupted"));
            }
        }
        tracing::warn!("Session interrupted while {}", from);
        self.events.phase(to);
    }
}

impl fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("host", &self.host)
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish()
    }
}
