//! `AgentArena`: the live agents of a run, keyed by id.
//!
//! Agents refer to each other (parent, trading partners) only by `AgentId`
//! and look each other up here.  Iteration is in ascending id order, which is
//! build order, so every phase visits agents deterministically.

use std::collections::BTreeMap;

use fc_core::{AgentId, Tick};
use fc_exchange::{Trader, TraderRegistry};
use fc_resource::{Material, Product};

use crate::agent::Agent;

#[derive(Copy, Clone, Debug, Default)]
struct Capabilities {
    listener: bool,
    material: bool,
    product:  bool,
}

pub struct AgentSlot {
    pub agent:      Box<dyn Agent>,
    pub prototype:  String,
    pub parent:     Option<AgentId>,
    pub enter_time: Tick,
    caps:           Capabilities,
}

impl AgentSlot {
    pub fn new(mut agent: Box<dyn Agent>, prototype: String, parent: Option<AgentId>, enter_time: Tick) -> Self {
        let caps = Capabilities {
            listener: agent.time_listener().is_some(),
            material: agent.material_trader().is_some(),
            product:  agent.product_trader().is_some(),
        };
        Self { agent, prototype, parent, enter_time, caps }
    }
}

#[derive(Default)]
pub struct AgentArena {
    slots: BTreeMap<AgentId, AgentSlot>,
}

impl AgentArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: AgentId, slot: AgentSlot) {
        self.slots.insert(id, slot);
    }

    pub fn remove(&mut self, id: AgentId) -> Option<AgentSlot> {
        self.slots.remove(&id)
    }

    pub fn get(&self, id: AgentId) -> Option<&AgentSlot> {
        self.slots.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentSlot> {
        self.slots.get_mut(&id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.slots.keys().copied().collect()
    }

    /// Agents that take part in Tick and Tock.
    pub fn listeners(&self) -> Vec<AgentId> {
        self.slots.iter().filter(|(_, s)| s.caps.listener).map(|(&id, _)| id).collect()
    }

    pub fn children(&self, parent: AgentId) -> Vec<AgentId> {
        self.slots
            .iter()
            .filter(|(_, s)| s.parent == Some(parent))
            .map(|(&id, _)| id)
            .collect()
    }

    /// Live agents built from `prototype`.
    pub fn count_prototype(&self, prototype: &str) -> usize {
        self.slots.values().filter(|s| s.prototype == prototype).count()
    }
}

impl TraderRegistry<Material> for AgentArena {
    fn trader_ids(&self) -> Vec<AgentId> {
        self.slots.iter().filter(|(_, s)| s.caps.material).map(|(&id, _)| id).collect()
    }

    fn trader_mut(&mut self, id: AgentId) -> Option<&mut dyn Trader<Material>> {
        self.slots.get_mut(&id)?.agent.material_trader()
    }
}

impl TraderRegistry<Product> for AgentArena {
    fn trader_ids(&self) -> Vec<AgentId> {
        self.slots.iter().filter(|(_, s)| s.caps.product).map(|(&id, _)| id).collect()
    }

    fn trader_mut(&mut self, id: AgentId) -> Option<&mut dyn Trader<Product>> {
        self.slots.get_mut(&id)?.agent.product_trader()
    }
}
