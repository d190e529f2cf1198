//! `Mixer`: blends several input streams in fixed mass ratios.
//!
//! Each stream has its own buffer and accepts any of a set of commodities.
//! Every Tick the mixer blends as much as it can:
//!
//! ```text
//! qty = min(throughput, output space, min_i(stream_i / ratio_i))
//! ```
//!
//! taking `ratio_i * qty` from each stream, and bids the blend on
//! `out_commod`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fc_core::{FcError, FcResult, EPS, EPS_RSRC};
use fc_exchange::{BidPortfolio, CapacityConstraint, CommodityRequests, RequestPortfolio, Trade, Trader, TraderCtx};
use fc_resource::{Composition, Material, Resource, ResourceBuf};
use fc_sim::{Agent, AgentCtx, SimResult, TimeListener};

use crate::unbounded;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MixerStream {
    /// Mass fraction of this stream in the blend, before normalisation.
    pub ratio:    f64,
    #[serde(default = "unbounded")]
    pub buf_size: f64,
    /// Accepted commodities and their preferences.
    pub commods:  BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    pub streams:      Vec<MixerStream>,
    pub out_commod:   String,
    #[serde(default = "unbounded")]
    pub out_buf_size: f64,
    #[serde(default = "unbounded")]
    pub throughput:   f64,
    #[serde(default)]
    pub lifetime:     Option<u64>,
}

/// Rescale `ratios` to sum to one.
///
/// Returns `true` and logs a warning when rescaling was needed.  All-zero
/// ratios become uniform.
pub fn normalize_ratios(ratios: &mut [f64]) -> bool {
    let sum: f64 = ratios.iter().sum();
    let off = (sum - 1.0).abs() > EPS;
    if off {
        warn!(sum, "mixing ratios do not sum to 1; renormalizing");
    }
    if sum != 0.0 {
        for r in ratios.iter_mut() {
            *r /= sum;
        }
    } else {
        let n = ratios.len() as f64;
        for r in ratios.iter_mut() {
            *r = 1.0 / n;
        }
    }
    off
}

#[derive(Clone, Debug)]
pub struct Mixer {
    cfg:       MixerConfig,
    ratios:    Vec<f64>,
    streams:   Vec<ResourceBuf<Material>>,
    /// Which stream each input commodity feeds.
    stream_of: BTreeMap<String, usize>,
    output:    ResourceBuf<Material>,
}

impl Mixer {
    pub fn new(cfg: MixerConfig) -> Self {
        let streams = cfg.streams.iter().map(|s| ResourceBuf::with_capacity(s.buf_size)).collect();
        let output = ResourceBuf::with_capacity(cfg.out_buf_size);
        Self { cfg, ratios: Vec::new(), streams, stream_of: BTreeMap::new(), output }
    }

    /// Normalised mixing ratios, available after entry.
    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }

    fn merge(pieces: Vec<Material>) -> FcResult<Option<Material>> {
        let mut iter = pieces.into_iter();
        let Some(mut first) = iter.next() else { return Ok(None) };
        for m in iter {
            first.absorb(m)?;
        }
        Ok(Some(first))
    }
}

impl Agent for Mixer {
    fn spec(&self) -> &'static str {
        "Mixer"
    }

    fn clone_agent(&self) -> Box<dyn Agent> {
        Box::new(self.clone())
    }

    fn enter(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        if self.cfg.streams.is_empty() {
            return Err(FcError::Config("mixer has no input streams".into()).into());
        }
        self.stream_of.clear();
        for (i, s) in self.cfg.streams.iter().enumerate() {
            for commod in s.commods.keys() {
                if self.stream_of.insert(commod.clone(), i).is_some() {
                    return Err(FcError::Config(format!("commodity '{commod}' feeds more than one mixer stream")).into());
                }
            }
        }
        self.ratios = self.cfg.streams.iter().map(|s| s.ratio).collect();
        if normalize_ratios(&mut self.ratios) {
            debug!(agent = %ctx.agent(), ratios = ?self.ratios, "mixing ratios rescaled");
        }
        Ok(())
    }

    fn lifetime(&self) -> Option<u64> {
        self.cfg.lifetime
    }

    fn time_listener(&mut self) -> Option<&mut dyn TimeListener> {
        Some(self)
    }

    fn material_trader(&mut self) -> Option<&mut dyn Trader<Material>> {
        Some(self)
    }
}

impl TimeListener for Mixer {
    fn tick(&mut self, ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        let mut qty = self.cfg.throughput.min(self.output.space());
        for (buf, &r) in self.streams.iter().zip(&self.ratios) {
            if r > 0.0 {
                qty = qty.min(buf.quantity() / r);
            }
        }
        if qty <= EPS_RSRC {
            return Ok(());
        }

        let eps = ctx.info().eps_rsrc;
        let mut pieces = Vec::new();
        for (buf, &r) in self.streams.iter_mut().zip(&self.ratios) {
            if r > 0.0 {
                pieces.extend(buf.pop_qty_eps(r * qty, eps, ctx.ids())?);
            }
        }
        if let Some(blend) = Self::merge(pieces)? {
            debug!(agent = %ctx.agent(), qty = blend.quantity(), "mixed");
            self.output.push(blend)?;
        }
        Ok(())
    }

    fn tock(&mut self, _ctx: &mut AgentCtx<'_>) -> SimResult<()> {
        Ok(())
    }
}

impl Trader<Material> for Mixer {
    /// One portfolio per stream with room, its commodities as alternatives.
    fn get_requests(&mut self, ctx: &TraderCtx<'_>) -> FcResult<Vec<RequestPortfolio<Material>>> {
        let mut ports = Vec::new();
        for (stream, buf) in self.cfg.streams.iter().zip(&self.streams) {
            let space = buf.space();
            if space <= EPS_RSRC || stream.commods.is_empty() {
                continue;
            }
            let target = Material::descriptor(space, Composition::vacuum());
            let mut port = RequestPortfolio::new();
            let mut alts = Vec::with_capacity(stream.commods.len());
            for (commod, &pref) in &stream.commods {
                alts.push(port.add_request(&target, ctx.agent, commod.as_str(), pref, false)?);
            }
            port.add_alternatives(&alts)?;
            port.add_default_constraint();
            ports.push(port);
        }
        Ok(ports)
    }

    fn get_bids(
        &mut self,
        requests: &CommodityRequests<Material>,
        ctx:      &TraderCtx<'_>,
    ) -> FcResult<Vec<BidPortfolio<Material>>> {
        let Some(reqs) = requests.get(&self.cfg.out_commod) else { return Ok(Vec::new()) };
        let held = self.output.quantity();
        if held <= EPS_RSRC {
            return Ok(Vec::new());
        }
        let comp = Arc::clone(self.output.peek()?.comp());
        let mut port = BidPortfolio::new();
        for r in reqs {
            port.add_bid(r, &Material::descriptor(held.min(r.qty()), Arc::clone(&comp)), ctx.agent, false)?;
        }
        port.add_constraint(CapacityConstraint::new(held));
        Ok(vec![port])
    }

    fn get_trades(
        &mut self,
        trades: &[Trade<Material>],
        ctx:    &TraderCtx<'_>,
    ) -> FcResult<Vec<(Trade<Material>, Material)>> {
        let mut out = Vec::with_capacity(trades.len());
        for t in trades {
            let pieces = self.output.pop_qty_eps(t.amt, EPS_RSRC, ctx.ids)?;
            let m = Self::merge(pieces)?
                .ok_or_else(|| FcError::invariant(format!("mixer output empty for trade of {}", t.amt)))?;
            out.push((t.clone(), m));
        }
        Ok(out)
    }

    fn accept_trades(&mut self, responses: Vec<(Trade<Material>, Material)>, _ctx: &TraderCtx<'_>) -> FcResult<()> {
        for (t, m) in responses {
            let i = self
                .stream_of
                .get(t.commodity())
                .copied()
                .ok_or_else(|| FcError::Value(format!("mixer received unsupported commodity '{}'", t.commodity())))?;
            self.streams[i].push(m)?;
        }
        Ok(())
    }
}
