use crate::{ConfigError, StatKind};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Capacity limits of one storage building type.
///
/// Limits at or below zero are disabled. `min_exempt_stacks` protects a
/// single oversized but legitimate stack from being evicted by the
/// aggregate limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityDescriptor {
    pub stat: StatKind,
    pub per_item_limit: f32,
    pub aggregate_limit: f32,
    pub min_exempt_stacks: u32,
    pub max_stacks: u32,
}

impl Default for CapacityDescriptor {
    fn default() -> Self {
        Self {
            stat: StatKind::Mass,
            per_item_limit: 0.0,
            aggregate_limit: 0.0,
            min_exempt_stacks: 1,
            max_stacks: 2,
        }
    }
}

impl CapacityDescriptor {
    pub fn per_item_limit(&self) -> Option<f32> {
        (self.per_item_limit > 0.0).then_some(self.per_item_limit)
    }

    pub fn aggregate_limit(&self) -> Option<f32> {
        (self.aggregate_limit > 0.0).then_some(self.aggregate_limit)
    }

    fn validate(&self, storage: &str) -> Result<(), ConfigError> {
        if self.max_stacks == 0 {
            return Err(ConfigError::ZeroMaxStacks {
                storage: storage.to_string(),
            });
        }
        for (field, value) in [
            ("per_item_limit", self.per_item_limit),
            ("aggregate_limit", self.aggregate_limit),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteLimit {
                    storage: storage.to_string(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Descriptors keyed by storage building type, as resolved from the mod's
/// data files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityTable {
    pub storages: BTreeMap<String, CapacityDescriptor>,
}

impl CapacityTable {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let table: CapacityTable = serde_json::from_str(raw)?;
        table.validate()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading capacity table {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("parsing capacity table {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storages
            .iter()
            .try_for_each(|(name, descriptor)| descriptor.validate(name))
    }

    pub fn get(&self, storage: &str) -> Option<&CapacityDescriptor> {
        self.storages.get(storage)
    }
}
