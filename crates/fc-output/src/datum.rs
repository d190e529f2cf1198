//! `Datum` rows and the builder agents use to fill them.

use std::fmt;

use crate::recorder::Recorder;
use crate::value::Value;
use crate::OutputResult;

/// One row destined for a named table.
#[derive(Clone, Debug, PartialEq)]
pub struct Datum {
    table: String,
    vals:  Vec<(String, Value)>,
}

impl Datum {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), vals: Vec::new() }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns in insertion order.
    pub fn vals(&self) -> &[(String, Value)] {
        &self.vals
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.vals.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub(crate) fn push(&mut self, column: String, val: Value) {
        self.vals.push((column, val));
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.table)?;
        for (i, (c, v)) in self.vals.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}={v}")?;
        }
        f.write_str("}")
    }
}

/// Fluent builder returned by [`Recorder::new_datum`].
///
/// ```rust,ignore
/// rec.new_datum("AgentExit")
///     .add_val("AgentId", id)
///     .add_val("ExitTime", now)
///     .record()?;
/// ```
#[must_use = "a datum is only stored once `record` is called"]
pub struct DatumBuilder<'a> {
    rec:   &'a mut Recorder,
    datum: Datum,
}

impl<'a> DatumBuilder<'a> {
    pub(crate) fn new(rec: &'a mut Recorder, table: &str) -> Self {
        Self { rec, datum: Datum::new(table) }
    }

    pub fn add_val(mut self, column: &str, val: impl Into<Value>) -> Self {
        self.datum.push(column.to_owned(), val.into());
        self
    }

    /// Validate against the table schema and queue for the backends.
    pub fn record(self) -> OutputResult<()> {
        self.rec.accept(self.datum)
    }
}
