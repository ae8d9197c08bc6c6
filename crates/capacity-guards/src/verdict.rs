use deepstore_core::{RejectReason, StoragePriority};
use serde::{Deserialize, Serialize};

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Verdict {
    Admissible,
    Rejected {
        priority: StoragePriority,
        reason: RejectReason,
    },
}

impl Verdict {
    pub(crate) fn reject(reason: RejectReason) -> Self {
        Verdict::Rejected {
            priority: StoragePriority::Unstored,
            reason,
        }
    }

    pub fn is_admissible(self) -> bool {
        matches!(self, Verdict::Admissible)
    }

    pub fn reason(self) -> Option<RejectReason> {
        match self {
            Verdict::Admissible => None,
            Verdict::Rejected { reason, .. } => Some(reason),
        }
    }

    /// Fold the verdict into the host's by-reference priority. Returns
    /// `true` when the location is over capacity.
    pub fn apply(self, priority: &mut StoragePriority) -> bool {
        match self {
            Verdict::Admissible => false,
            Verdict::Rejected { priority: forced, .. } => {
                *priority = forced;
                true
            }
        }
    }
}
