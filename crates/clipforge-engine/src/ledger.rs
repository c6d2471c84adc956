//! Run-scoped record of engine-side files.
//!
//! A name is recorded *before* the operation that may create it, so a failing
//! write still leaves something to clean up. Deletion failures are swallowed:
//! a file that cannot be removed must never change a run's outcome.

use std::sync::Arc;

use crate::engine::Engine;

/// Engine-private file names created during one run.
pub struct ResourceLedger {
    engine: Arc<dyn Engine>,
    entries: Vec<String>,
}

impl ResourceLedger {
    /// Create an empty ledger for `engine`.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            entries: Vec::new(),
        }
    }

    /// Record a name. Recording the same name twice is a no-op.
    pub fn record(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.entries.contains(&name) {
            self.entries.push(name);
        }
    }

    /// Names recorded so far, in recording order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delete every recorded file and empty the ledger.
    ///
    /// Returns how many deletions failed; failures are logged at debug level.
    pub async fn clear(&mut self) -> usize {
        let mut failed = 0;
        for name in std::mem::take(&mut self.entries) {
            if let Err(e) = self.engine.delete_file(&name).await {
                tracing::debug!("Ignoring cleanup failure for {}: {}", name, e);
                failed += 1;
            }
        }
        failed
    }
}

impl Drop for ResourceLedger {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }

        let entries = std::mem::take(&mut self.entries);
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(
                "No runtime to clean up {} engine file(s): {:?}",
                entries.len(),
                entries
            );
            return;
        };

        let engine = Arc::clone(&self.engine);
        handle.spawn(async move {
            for name in entries {
                if let Err(e) = engine.delete_file(&name).await {
                    tracing::debug!("Ignoring cleanup failure for {}: {}", name, e);
                }
            }
        });
    }
}

impl std::fmt::Debug for ResourceLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLedger")
            .field("engine", &self.engine.name())
            .field("entries", &self.entries)
            .finish()
    }
}
