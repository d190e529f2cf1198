//! `Recorder`: buffers datums and fans them out to backends.
//!
//! # Schemas
//!
//! The first datum recorded for a table fixes its column names and value
//! kinds.  Later datums for the same table must carry the same columns in the
//! same order with the same kinds; anything else is rejected before it reaches
//! a backend.
//!
//! # Buffering
//!
//! Datums are held until `dump_count` have accumulated, then handed to every
//! backend in one `notify` call.  `flush` forces a hand-off; `close` flushes
//! and closes every backend, after which recording fails with
//! `OutputError::Closed`.

use std::collections::HashMap;

use tracing::debug;

use crate::backend::RecBackend;
use crate::datum::{Datum, DatumBuilder};
use crate::value::ValueKind;
use crate::{OutputError, OutputResult};

/// Default number of datums buffered before backends are notified.
pub const DEFAULT_DUMP_COUNT: usize = 10_000;

type Schema = Vec<(String, ValueKind)>;

pub struct Recorder {
    backends:   Vec<Box<dyn RecBackend>>,
    buffer:     Vec<Datum>,
    dump_count: usize,
    schemas:    HashMap<String, Schema>,
    recorded:   u64,
    closed:     bool,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::with_dump_count(DEFAULT_DUMP_COUNT)
    }

    /// A recorder that notifies backends every `n` datums (minimum 1).
    pub fn with_dump_count(n: usize) -> Self {
        Self {
            backends:   Vec::new(),
            buffer:     Vec::new(),
            dump_count: n.max(1),
            schemas:    HashMap::new(),
            recorded:   0,
            closed:     false,
        }
    }

    pub fn register_backend(&mut self, backend: Box<dyn RecBackend>) {
        debug!(backend = backend.name(), "recorder backend registered");
        self.backends.push(backend);
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Start a row for `table`.
    pub fn new_datum(&mut self, table: &str) -> DatumBuilder<'_> {
        DatumBuilder::new(self, table)
    }

    /// Total datums accepted so far.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Datums waiting for the next backend notification.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn accept(&mut self, datum: Datum) -> OutputResult<()> {
        if self.closed {
            return Err(OutputError::Closed);
        }
        self.check_schema(&datum)?;
        self.buffer.push(datum);
        self.recorded += 1;
        if self.buffer.len() >= self.dump_count {
            self.notify()?;
        }
        Ok(())
    }

    /// Hand every buffered datum to the backends and flush them.
    pub fn flush(&mut self) -> OutputResult<()> {
        self.notify()?;
        for b in &mut self.backends {
            b.flush()?;
        }
        Ok(())
    }

    /// Flush and close every backend.  Idempotent.
    pub fn close(&mut self) -> OutputResult<()> {
        if self.closed {
            return Ok(());
        }
        self.notify()?;
        for b in &mut self.backends {
            b.close()?;
        }
        self.closed = true;
        debug!(recorded = self.recorded, "recorder closed");
        Ok(())
    }

    fn notify(&mut self) -> OutputResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let data = std::mem::take(&mut self.buffer);
        for b in &mut self.backends {
            b.notify(&data)?;
        }
        Ok(())
    }

    fn check_schema(&mut self, datum: &Datum) -> OutputResult<()> {
        if datum.vals().is_empty() {
            return Err(OutputError::EmptyDatum(datum.table().to_owned()));
        }
        let Some(schema) = self.schemas.get(datum.table()) else {
            let schema = datum.vals().iter().map(|(c, v)| (c.clone(), v.kind())).collect();
            self.schemas.insert(datum.table().to_owned(), schema);
            return Ok(());
        };

        let same_cols = schema.len() == datum.vals().len()
            && schema.iter().zip(datum.vals()).all(|((sc, _), (dc, _))| sc == dc);
        if !same_cols {
            return Err(OutputError::SchemaMismatch {
                table:    datum.table().to_owned(),
                expected: schema.iter().map(|(c, _)| c.clone()).collect(),
                got:      datum.vals().iter().map(|(c, _)| c.clone()).collect(),
            });
        }
        for ((col, kind), (_, v)) in schema.iter().zip(datum.vals()) {
            if *kind != v.kind() {
                return Err(OutputError::TypeMismatch {
                    table:    datum.table().to_owned(),
                    column:   col.clone(),
                    expected: *kind,
                    got:      v.kind(),
                });
            }
        }
        Ok(())
    }
}
