//! `fc-output`: the recorder collaborator for the rust_fc simulator.
//!
//! The simulator and its agents describe output as rows of typed values
//! addressed to named tables; how those rows are stored is a backend concern.
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`value`]    | `Value`, `ValueKind`                                     |
//! | [`datum`]    | `Datum`, `DatumBuilder`                                  |
//! | [`recorder`] | `Recorder` (schema checks, buffering, fan-out)           |
//! | [`backend`]  | `RecBackend` trait, `MemBackend`, `TracingBackend`       |
//!
//! # Usage
//!
//! ```rust,ignore
//! let mem = MemBackend::new();
//! let rows = mem.handle();
//! let mut rec = Recorder::new();
//! rec.register_backend(Box::new(mem));
//! rec.new_datum("Info").add_val("Duration", 120u64).record()?;
//! rec.close()?;
//! assert_eq!(rows.count("Info"), 1);
//! ```

pub mod backend;
pub mod datum;
pub mod error;
pub mod recorder;
pub mod value;


pub use backend::{MemBackend, MemHandle, RecBackend, TracingBackend};
pub use datum::{Datum, DatumBuilder};
pub use error::{OutputError, OutputResult};
pub use recorder::{Recorder, DEFAULT_DUMP_COUNT};
pub use value::{Value, ValueKind};
