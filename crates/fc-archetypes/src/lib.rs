//! `fc-archetypes`: facility archetypes built on the `fc-sim` agent contract.
//!
//! | Archetype   | Trades                                   | Time listener |
//! |-------------|------------------------------------------|---------------|
//! | [`Source`]  | bids one commodity up to a throughput    | no            |
//! | [`Sink`]    | requests any of several commodities      | no            |
//! | [`Reactor`] | requests fresh assemblies, bids spent    | yes           |
//! | [`Mixer`]   | requests N streams, bids the blend       | yes           |
//!
//! Every archetype is configured by a serde struct so a scenario file can
//! describe it:
//!
//! ```toml
//! [source]
//! out_commod = "uox"
//! recipe     = "fresh_uox"
//! throughput = 10.0
//! ```

pub mod mixer;
pub mod reactor;
pub mod sink;
pub mod source;

#[cfg(test)]
mod tests;

pub use mixer::{normalize_ratios, Mixer, MixerConfig, MixerStream};
pub use reactor::{Reactor, ReactorConfig};
pub use sink::{Sink, SinkConfig};
pub use source::{Source, SourceConfig};

/// Stand-in for "no limit" in configuration.  Finite so it can be used as a
/// request or bid quantity.
pub const UNBOUNDED: f64 = 1e299;

pub(crate) fn unbounded() -> f64 {
    UNBOUNDED
}
