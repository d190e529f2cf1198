//! `Sink`: accepts any of several commodities into a bounded inventory.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fc_core::{FcError, FcResult, EPS_RSRC};
use fc_exchange::{RequestPortfolio, Trade, Trader, TraderCtx};
use fc_resource::{Composition, Material, ResourceBuf};
use fc_sim::{Agent, AgentCtx, SimResult};

use crate::unbounded;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    pub in_commods: Vec<String>,

    /// One preference per commodity.  Empty means 1.0 for all.
    #[serde(default)]
    pub in_commod_prefs: Vec<f64>,

    #[serde(default)]
    pub recipe: Option<String>,

    #[serde(default = "unbounded")]
    pub capacity: f64,

    #[serde(default)]
    pub lifetime: Option<u64>,
}

impl SinkConfig {
    pub fn new<S: Into<String>>(in_commods: impl IntoIterator<Item = S>) -> Self {
        Self {
            in_commods:      in_commods.into_iter().map(Into::into).collect(),
            in_commod_prefs: Vec::new(),
            recipe:          None,
            capacity:        unbounded(),
            lifetime:        None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Sink {
    cfg:       SinkConfig,
    prefs:     Vec<f64>,
    comp:      Arc<Composition>,
    inventory: ResourceBuf<Material>,
}

impl Sink {
    pub fn new(cfg: SinkConfig) -> Self {
        let inventory = ResourceBuf::with_capacity(cfg.capacity);
        Self { cfg, prefs: Vec::new(), comp: Composition::vacuum(), inventory }
    }
}

impl Agent for Sink {
    fn spec(&self) -> &'static str {
        "Sink"
    }

    fn clone_agent(&self) -> Box<dyn Agent> {
        Box::new(self.clone())
    }

    fn enter(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        let n = self.cfg.in_commods.len();
        if n == 0 {
            return Err(FcError::Config("sink has no input commodities".into()).into());
        }
        self.prefs = match self.cfg.in_commod_prefs.len() {
            0 => vec![1.0; n],
            m if m == n => self.cfg.in_commod_prefs.clone(),
            m => {
                return Err(FcError::Config(format!(
                    "sink has {m} commodity preferences for {n} commodities"
                ))
                .into());
            }
        };
        if let Some(name) = &self.cfg.recipe {
            self.comp = ctx.recipe(name)?;
        }
        Ok(())
    }

    fn lifetime(&self) -> Option<u64> {
        self.cfg.lifetime
    }

    fn material_trader(&mut self) -> Option<&mut dyn Trader<Material>> {
        Some(self)
    }
}

impl Trader<Material> for Sink {
    fn get_requests(&mut self, ctx: &TraderCtx<'_>) -> FcResult<Vec<RequestPortfolio<Material>>> {
        let space = self.inventory.space();
        if space <= EPS_RSRC {
            return Ok(Vec::new());
        }
        let target = Material::descriptor(space, Arc::clone(&self.comp));
        let mut port = RequestPortfolio::new();
        let mut alts = Vec::with_capacity(self.cfg.in_commods.len());
        for (commod, &pref) in self.cfg.in_commods.iter().zip(&self.prefs) {
            alts.push(port.add_request(&target, ctx.agent, commod.as_str(), pref, false)?);
        }
        port.add_alternatives(&alts)?;
        port.add_default_constraint();
        Ok(vec![port])
    }

    fn accept_trades(&mut self, responses: Vec<(Trade<Material>, Material)>, _ctx: &TraderCtx<'_>) -> FcResult<()> {
        for (_, m) in responses {
            self.inventory.push(m)?;
        }
        Ok(())
    }
}
