//! Prototype and recipe registries.
//!
//! Both are name-keyed, write-once maps: registering a name twice is a
//! `FcError::Key`, and nothing registered can be replaced afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use fc_core::{FcError, FcResult};
use fc_resource::Composition;

use crate::agent::Agent;

/// Configured agents from which new agents are cloned at build time.
#[derive(Default)]
pub struct PrototypeRegistry {
    protos: BTreeMap<String, Box<dyn Agent>>,
}

impl PrototypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, proto: Box<dyn Agent>) -> FcResult<()> {
        let name = name.into();
        if self.protos.contains_key(&name) {
            return Err(FcError::Key(format!("prototype '{name}' is already registered")));
        }
        self.protos.insert(name, proto);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.protos.contains_key(name)
    }

    /// A fresh agent cloned from the named prototype.
    pub fn instantiate(&self, name: &str) -> Option<Box<dyn Agent>> {
        self.protos.get(name).map(|p| p.clone_agent())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.protos.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.protos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }
}

/// Named material compositions.
#[derive(Clone, Debug, Default)]
pub struct RecipeRegistry {
    recipes: BTreeMap<String, Arc<Composition>>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, comp: Arc<Composition>) -> FcResult<()> {
        let name = name.into();
        if self.recipes.contains_key(&name) {
            return Err(FcError::Key(format!("recipe '{name}' is already registered")));
        }
        self.recipes.insert(name, comp);
        Ok(())
    }

    pub fn get(&self, name: &str) -> FcResult<Arc<Composition>> {
        self.recipes
            .get(name)
            .cloned()
            .ok_or_else(|| FcError::Key(format!("no recipe named '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
