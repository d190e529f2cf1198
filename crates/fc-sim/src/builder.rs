//! Fluent builder for constructing a [`Sim`].

use std::sync::Arc;

use fc_core::{SimInfo, Tick};
use fc_output::{RecBackend, Recorder};
use fc_resource::Composition;

use crate::agent::Agent;
use crate::context::Context;
use crate::{Sim, SimError, SimResult};

/// Fluent builder for [`Sim`].
///
/// # Inputs
///
/// | Method               | Default                                   |
/// |----------------------|-------------------------------------------|
/// | `.prototype(n, a)`   | none; every deployed name must be added   |
/// | `.recipe(n, c)`      | none                                      |
/// | `.deploy(n, t)`      | nothing is built                          |
/// | `.backend(b)`        | no backends (rows are validated, dropped) |
/// | `.recorder(r)`       | `Recorder::new()`                         |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(SimInfo::new(120))
///     .recipe("uox", uox)
///     .prototype("mine", Box::new(Source::new("uox", "uox", 1e4)))
///     .deploy("mine", Tick(0))
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    info:        SimInfo,
    recorder:    Recorder,
    prototypes:  Vec<(String, Box<dyn Agent>)>,
    recipes:     Vec<(String, Arc<Composition>)>,
    deployments: Vec<(String, Tick)>,
}

impl SimBuilder {
    pub fn new(info: SimInfo) -> Self {
        Self {
            info,
            recorder:    Recorder::new(),
            prototypes:  Vec::new(),
            recipes:     Vec::new(),
            deployments: Vec::new(),
        }
    }

    pub fn prototype(mut self, name: impl Into<String>, agent: Box<dyn Agent>) -> Self {
        self.prototypes.push((name.into(), agent));
        self
    }

    pub fn recipe(mut self, name: impl Into<String>, comp: Arc<Composition>) -> Self {
        self.recipes.push((name.into(), comp));
        self
    }

    /// Build one agent from `prototype` at step `t`.
    pub fn deploy(mut self, prototype: impl Into<String>, t: Tick) -> Self {
        self.deployments.push((prototype.into(), t));
        self
    }

    pub fn backend(mut self, backend: Box<dyn RecBackend>) -> Self {
        self.recorder.register_backend(backend);
        self
    }

    /// Replace the recorder.  Backends added earlier are dropped.
    pub fn recorder(mut self, recorder: Recorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Validate the configuration, fill the registries and queue the initial
    /// deployments.
    pub fn build(self) -> SimResult<Sim> {
        self.info.validate()?;
        let mut ctx = Context::new(self.info, self.recorder);
        for (name, comp) in self.recipes {
            ctx.add_recipe(name, comp)?;
        }
        for (name, proto) in self.prototypes {
            ctx.add_prototype(name, proto)?;
        }
        for (name, t) in self.deployments {
            if !ctx.prototypes().contains(&name) {
                return Err(SimError::UnknownPrototype(name));
            }
            ctx.scheduler_mut().schedule_build(name, None, t)?;
        }
        Ok(Sim::new(ctx))
    }
}
