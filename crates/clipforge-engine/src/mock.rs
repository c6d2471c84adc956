//! Scriptable in-memory engine.
//!
//! Used by this crate's tests and by downstream tests that need a session
//! without a transcoder installed. Every call is recorded so tests can assert
//! on the exact protocol a session followed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::engine::{Build, Engine, EngineEvent, EngineLoader, EventSink};
use crate::error::EngineError;

/// How a [`MockEngine`] behaves.
#[derive(Debug, Clone)]
pub struct MockScript {
    /// Progress ratios emitted during `exec`, in order.
    pub progress: Vec<f64>,
    /// Log lines emitted during `exec`, after the progress ratios.
    pub logs: Vec<String>,
    /// Bytes written to the output name (the last `exec` argument).
    pub output: Bytes,
    pub fail_write: bool,
    /// When set, `exec` fails with this message after emitting its events.
    pub fail_exec: Option<String>,
    pub fail_read: bool,
    pub fail_delete: bool,
    /// `exec` blocks until `abort` is called.
    pub hang: bool,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            progress: vec![0.25, 0.5, 1.0],
            logs: vec!["mock: done".to_string()],
            output: Bytes::from_static(b"mock output"),
            fail_write: false,
            fail_exec: None,
            fail_read: false,
            fail_delete: false,
            hang: false,
        }
    }
}

impl MockScript {
    /// Script whose `exec` never finishes on its own.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// Script whose `exec` fails with `message`.
    pub fn failing_exec(message: impl Into<String>) -> Self {
        Self {
            fail_exec: Some(message.into()),
            ..Self::default()
        }
    }
}

/// In-memory [`Engine`] driven by a [`MockScript`].
#[derive(Debug)]
pub struct MockEngine {
    script: MockScript,
    files: Mutex<BTreeMap<String, Bytes>>,
    calls: Mutex<Vec<String>>,
    exec_args: Mutex<Vec<Vec<String>>>,
    aborts: AtomicUsize,
    exec_started: Notify,
    abort_requested: Notify,
}

impl MockEngine {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            files: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            exec_args: Mutex::new(Vec::new()),
            aborts: AtomicUsize::new(0),
            exec_started: Notify::new(),
            abort_requested: Notify::new(),
        }
    }

    /// Names currently stored.
    pub fn files(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    /// Every call made so far, e.g. `"write input.mp4"` or `"exec"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Argument sequences passed to `exec`.
    pub fn exec_args(&self) -> Vec<Vec<String>> {
        self.exec_args.lock().clone()
    }

    pub fn abort_count(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    /// Wait until `exec` has been entered.
    pub async fn wait_for_exec(&self) {
        self.exec_started.notified().await;
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn write_file(&self, name: &str, data: Bytes) -> Result<(), EngineError> {
        self.record(format!("write {name}"));
        if self.script.fail_write {
            return Err(EngineError::Io(std::io::Error::other("mock write failure")));
        }
        self.files.lock().insert(name.to_string(), data);
        Ok(())
    }

    async fn exec(&self, args: &[String], events: EventSink) -> Result<(), EngineError> {
        self.record("exec".to_string());
        self.exec_args.lock().push(args.to_vec());
        self.exec_started.notify_one();

        for ratio in &self.script.progress {
            let _ = events.send(EngineEvent::Progress(*ratio));
            tokio::task::yield_now().await;
        }
        for line in &self.script.logs {
            let _ = events.send(EngineEvent::Log(line.clone()));
            tokio::task::yield_now().await;
        }

        if self.script.hang {
            self.abort_requested.notified().await;
            return Err(EngineError::Aborted);
        }

        if let Some(message) = &self.script.fail_exec {
            return Err(EngineError::exec(message.clone()));
        }

        let output = args
            .last()
            .ok_or_else(|| EngineError::exec("no output name"))?;
        self.files
            .lock()
            .insert(output.clone(), self.script.output.clone());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Bytes, EngineError> {
        self.record(format!("read {name}"));
        if self.script.fail_read {
            return Err(EngineError::Io(std::io::Error::other("mock read failure")));
        }
        self.files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        self.record(format!("delete {name}"));
        if self.script.fail_delete {
            return Err(EngineError::Io(std::io::Error::other("mock delete failure")));
        }
        self.files
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(name.to_string()))
    }

    async fn abort(&self) {
        self.record("abort".to_string());
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.abort_requested.notify_one();
    }
}

/// [`EngineLoader`] producing [`MockEngine`]s, with per-build failures.
#[derive(Debug, Default)]
pub struct MockLoader {
    script: MockScript,
    fail_multi_threaded: bool,
    fail_single_threaded: bool,
    attempts: Mutex<Vec<Build>>,
    loaded: Mutex<Option<Arc<MockEngine>>>,
}

impl MockLoader {
    /// Loader whose engines follow `script`.
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Loader whose multi-threaded build always fails.
    pub fn failing_multi_threaded() -> Self {
        Self {
            fail_multi_threaded: true,
            ..Self::default()
        }
    }

    /// Loader on which every build fails.
    pub fn failing_all() -> Self {
        Self {
            fail_multi_threaded: true,
            fail_single_threaded: true,
            ..Self::default()
        }
    }

    /// Builds requested so far, in order.
    pub fn attempts(&self) -> Vec<Build> {
        self.attempts.lock().clone()
    }

    /// The most recently loaded engine.
    pub fn engine(&self) -> Option<Arc<MockEngine>> {
        self.loaded.lock().clone()
    }
}

#[async_trait]
impl EngineLoader for MockLoader {
    async fn load(&self, build: Build, core: &str) -> Result<Arc<dyn Engine>, EngineError> {
        self.attempts.lock().push(build);

        let fails = match build {
            Build::MultiThreaded => self.fail_multi_threaded,
            Build::SingleThreaded => self.fail_single_threaded,
        };
        if fails {
            return Err(EngineError::load(format!("mock {build} core {core} unavailable")));
        }

        let engine = Arc::new(MockEngine::new(self.script.clone()));
        *self.loaded.lock() = Some(Arc::clone(&engine));
        Ok(engine)
    }
}
