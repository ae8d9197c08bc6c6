use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage priority as the host's placement search sees it.
///
/// Ordering follows the host: a higher variant is a better store.
/// `Unstored` doubles as the "not a valid store for this item" sentinel.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum StoragePriority {
    #[default]
    Unstored,
    Low,
    Normal,
    Preferred,
    Important,
    Critical,
}

impl StoragePriority {
    pub fn is_unstored(self) -> bool {
        self == StoragePriority::Unstored
    }
}

impl fmt::Display for StoragePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoragePriority::Unstored => "unstored",
            StoragePriority::Low => "low",
            StoragePriority::Normal => "normal",
            StoragePriority::Preferred => "preferred",
            StoragePriority::Important => "important",
            StoragePriority::Critical => "critical",
        };
        f.write_str(name)
    }
}
