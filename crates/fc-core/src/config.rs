//! Run configuration.
//!
//! `SimInfo` is typically written in a small TOML file next to the scenario
//! and loaded with [`SimInfo::load`]:
//!
//! ```toml
//! duration = 120
//! seed     = 20
//!
//! [solver]
//! kind            = "greedy"
//! time_limit_secs = 30.0
//! ```
//!
//! Every field except `duration` has a default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::tolerance::{EPS, EPS_RSRC};
use crate::{FcError, FcResult, SimClock, Tick};

/// Default step length: one twelfth of a Julian year, in seconds.
pub const DEFAULT_DT_SECS: u64 = 2_629_846;

/// Which matching strategy the exchange uses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Self-contained greedy heuristic.  Always available.
    #[default]
    Greedy,
    /// Mixed-integer program solved by HiGHS (`optimize` feature).  Falls
    /// back to greedy when unavailable or unconverged.
    Optimize,
}

/// Exchange solver settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub kind: SolverKind,

    /// Wall-clock budget for one optimize solve.
    pub time_limit_secs: f64,

    /// When `false`, exclusive requests and bids are treated as divisible.
    pub exclusive_orders: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind:             SolverKind::Greedy,
            time_limit_secs:  60.0,
            exclusive_orders: true,
        }
    }
}

/// Top-level simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimInfo {
    /// Number of time steps to simulate.  Ticks run `0..duration`.
    pub duration: u64,

    /// Simulated seconds per tick.
    #[serde(default = "default_dt")]
    pub dt_secs: u64,

    /// Master RNG seed.  The same seed always produces identical results.
    #[serde(default)]
    pub seed: u64,

    /// Generic floating-point tolerance.
    #[serde(default = "default_eps")]
    pub eps: f64,

    /// Tolerance on resource quantities.
    #[serde(default = "default_eps_rsrc")]
    pub eps_rsrc: f64,

    #[serde(default)]
    pub solver: SolverConfig,
}

fn default_dt() -> u64 {
    DEFAULT_DT_SECS
}

fn default_eps() -> f64 {
    EPS
}

fn default_eps_rsrc() -> f64 {
    EPS_RSRC
}

impl SimInfo {
    /// A configuration with defaults for everything but the duration.
    pub fn new(duration: u64) -> Self {
        Self {
            duration,
            dt_secs:  DEFAULT_DT_SECS,
            seed:     0,
            eps:      EPS,
            eps_rsrc: EPS_RSRC,
            solver:   SolverConfig::default(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> FcResult<Self> {
        let info: SimInfo = toml::from_str(s).map_err(|e| FcError::Parse(e.to_string()))?;
        info.validate()?;
        Ok(info)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> FcResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> FcResult<()> {
        if self.duration == 0 {
            return Err(FcError::Config("duration must be at least one time step".into()));
        }
        if self.dt_secs == 0 {
            return Err(FcError::Config("dt_secs must be positive".into()));
        }
        if !(self.eps > 0.0 && self.eps_rsrc > 0.0) {
            return Err(FcError::Config(format!(
                "tolerances must be positive (eps={}, eps_rsrc={})",
                self.eps, self.eps_rsrc
            )));
        }
        if !(self.solver.time_limit_secs > 0.0) {
            return Err(FcError::Config(format!(
                "solver time limit must be positive, got {}",
                self.solver.time_limit_secs
            )));
        }
        Ok(())
    }

    /// The tick at which the simulation ends (exclusive upper bound).
    #[inline]
    pub fn end_tick(&self) -> Tick {
        Tick(self.duration)
    }

    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.dt_secs)
    }
}
