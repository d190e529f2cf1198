//! Recorder backends.
//!
//! | Backend          | Storage                                                  |
//! |------------------|----------------------------------------------------------|
//! | [`MemBackend`]   | in-process tables behind a shared handle (tests, demos)  |
//! | [`TracingBackend`] | one `debug` event per datum; nothing persisted         |

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::datum::Datum;
use crate::OutputResult;

/// Trait implemented by every storage backend.
pub trait RecBackend: Send {
    fn name(&self) -> &'static str;

    /// Receive a batch of validated datums, in record order.
    fn notify(&mut self, data: &[Datum]) -> OutputResult<()>;

    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }

    /// Flush and release resources.  Called once by `Recorder::close`.
    fn close(&mut self) -> OutputResult<()> {
        self.flush()
    }
}

// ── MemBackend ────────────────────────────────────────────────────────────────

type Tables = BTreeMap<String, Vec<Datum>>;

/// Keeps every datum in memory, grouped by table.
///
/// The backend itself is moved into the recorder; keep a [`MemHandle`] from
/// [`handle`][Self::handle] to read the tables afterwards.
#[derive(Default)]
pub struct MemBackend {
    tables: Arc<Mutex<Tables>>,
}

/// Shared read access to a [`MemBackend`]'s tables.
#[derive(Clone, Default)]
pub struct MemHandle {
    tables: Arc<Mutex<Tables>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MemHandle {
        MemHandle { tables: Arc::clone(&self.tables) }
    }
}

impl RecBackend for MemBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn notify(&mut self, data: &[Datum]) -> OutputResult<()> {
        let mut tables = self.tables.lock();
        for d in data {
            tables.entry(d.table().to_owned()).or_default().push(d.clone());
        }
        Ok(())
    }
}

impl MemHandle {
    /// A copy of every row recorded into `table` so far.
    pub fn rows(&self, table: &str) -> Vec<Datum> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    pub fn count(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, Vec::len)
    }

    pub fn tables(&self) -> Vec<String> {
        self.tables.lock().keys().cloned().collect()
    }
}

// ── TracingBackend ────────────────────────────────────────────────────────────

/// Emits each datum as a `debug` event on the `fc_output::datum` target.
#[derive(Default)]
pub struct TracingBackend {
    seen: u64,
}

impl TracingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecBackend for TracingBackend {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn notify(&mut self, data: &[Datum]) -> OutputResult<()> {
        for d in data {
            debug!(target: "fc_output::datum", table = d.table(), datum = %d);
        }
        self.seen += data.len() as u64;
        Ok(())
    }

    fn close(&mut self) -> OutputResult<()> {
        debug!(target: "fc_output::datum", total = self.seen, "tracing backend closed");
        Ok(())
    }
}
