//! `Source`: supplies one commodity, up to a throughput per step.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use fc_core::{FcError, FcResult, EPS_RSRC};
use fc_exchange::{BidPortfolio, CapacityConstraint, CommodityRequests, Trade, Trader, TraderCtx};
use fc_resource::{Composition, Material};
use fc_sim::{Agent, AgentCtx, SimResult};

use crate::unbounded;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub out_commod: String,

    /// Recipe of the material supplied.  Without one the source ships
    /// whatever composition the requester asked for.
    #[serde(default)]
    pub recipe: Option<String>,

    /// Maximum quantity shipped per exchange.
    #[serde(default = "unbounded")]
    pub throughput: f64,

    /// Total quantity the source can ever ship.
    #[serde(default = "unbounded")]
    pub inventory_size: f64,

    #[serde(default)]
    pub lifetime: Option<u64>,
}

impl SourceConfig {
    pub fn new(out_commod: impl Into<String>) -> Self {
        Self {
            out_commod:     out_commod.into(),
            recipe:         None,
            throughput:     unbounded(),
            inventory_size: unbounded(),
            lifetime:       None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Source {
    cfg:       SourceConfig,
    comp:      Option<Arc<Composition>>,
    remaining: f64,
}

impl Source {
    pub fn new(cfg: SourceConfig) -> Self {
        let remaining = cfg.inventory_size;
        Self { cfg, comp: None, remaining }
    }

    /// Most that can be shipped in the current exchange.
    fn available(&self) -> f64 {
        self.cfg.throughput.min(self.remaining)
    }
}

impl Agent for Source {
    fn spec(&self) -> &'static str {
        "Source"
    }

    fn clone_agent(&self) -> Box<dyn Agent> {
        Box::new(self.clone())
    }

    fn enter(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        if self.cfg.throughput.is_nan() || self.cfg.inventory_size.is_nan() {
            return Err(FcError::Config(format!("source '{}' has a NaN limit", self.cfg.out_commod)).into());
        }
        if let Some(name) = &self.cfg.recipe {
            self.comp = Some(ctx.recipe(name)?);
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

impl Trader<Material> for Source {
    fn get_bids(
        &mut self,
        requests: &CommodityRequests<Material>,
        ctx:      &TraderCtx<'_>,
    ) -> FcResult<Vec<BidPortfolio<Material>>> {
        let Some(reqs) = requests.get(&self.cfg.out_commod) else { return Ok(Vec::new()) };
        let max = self.available();
        if max <= 0.0 {
            debug!(agent = %ctx.agent, commodity = %self.cfg.out_commod, "nothing to offer");
            return Ok(Vec::new());
        }

        let mut port = BidPortfolio::new();
        for r in reqs {
            let comp = self.comp.clone().unwrap_or_else(|| Arc::clone(r.target().comp()));
            port.add_bid(r, &Material::descriptor(max.min(r.qty()), comp), ctx.agent, false)?;
        }
        port.add_constraint(CapacityConstraint::new(max));
        Ok(vec![port])
    }

    fn get_trades(
        &mut self,
        trades: &[Trade<Material>],
        ctx:    &TraderCtx<'_>,
    ) -> FcResult<Vec<(Trade<Material>, Material)>> {
        let total: f64 = trades.iter().map(|t| t.amt).sum();
        if total - self.available() > EPS_RSRC {
            return Err(FcError::invariant(format!(
                "{} asked to ship {total} of '{}' with only {} available",
                ctx.agent,
                self.cfg.out_commod,
                self.available()
            )));
        }
        self.remaining -= total;
        trades
            .iter()
            .map(|t| {
                let comp = self.comp.clone().unwrap_or_else(|| Arc::clone(t.request.target().comp()));
                Ok((t.clone(), Material::create(ctx.ids, t.amt, comp)?))
            })
            .collect()
    }
}
