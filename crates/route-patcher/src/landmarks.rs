use crate::{LocalSlot, MethodRef};
use deepstore_core::{ConfigError, ENTRY_POINT_NAME, ENTRY_POINT_OWNER};
use serde::{Deserialize, Serialize};

/// Where the interesting values live in the host's search routine.
///
/// Defaults describe `StoreUtility::TryFindBestBetterStoreCellFor(thing,
/// carrier, map, currentPriority, faction, out foundCell, needAccurateResult)`:
/// the copy of `currentPriority` sits in local 1 and the per-slot-group
/// priority in local 7.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Landmarks {
    pub routine: String,
    pub priority_local: LocalSlot,
    pub slot_priority_local: LocalSlot,
    pub item_arg: u16,
    pub map_arg: u16,
    pub current_priority_arg: u16,
    pub entry_point: MethodRef,
}

impl Default for Landmarks {
    fn default() -> Self {
        Self {
            routine: "StoreUtility::TryFindBestBetterStoreCellFor".into(),
            priority_local: LocalSlot(1),
            slot_priority_local: LocalSlot(7),
            item_arg: 0,
            map_arg: 2,
            current_priority_arg: 3,
            entry_point: MethodRef::new(ENTRY_POINT_OWNER, ENTRY_POINT_NAME),
        }
    }
}

impl Landmarks {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let landmarks: Landmarks = serde_json::from_str(raw)?;
        landmarks.validate()?;
        Ok(landmarks)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.priority_local == self.slot_priority_local {
            return Err(ConfigError::AliasedLocals(self.priority_local.0));
        }
        Ok(())
    }
}
