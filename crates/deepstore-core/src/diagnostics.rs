use crate::Cell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

/// Why a location was declared unable to hold an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The item alone exceeds the per-item limit.
    TooHeavy,
    /// Aggregate stat over the cell limit with enough stacks present.
    OverAggregate,
    /// Stack-count ceiling reached.
    OverStackCount,
    /// Bare slot group already holding some other storable thing.
    OrphanedPile,
}

impl RejectReason {
    pub const ALL: [RejectReason; 4] = [
        RejectReason::TooHeavy,
        RejectReason::OverAggregate,
        RejectReason::OverStackCount,
        RejectReason::OrphanedPile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::TooHeavy => "too_heavy",
            RejectReason::OverAggregate => "over_aggregate",
            RejectReason::OverStackCount => "over_stack_count",
            RejectReason::OrphanedPile => "orphaned_pile",
        }
    }
}

/// Instrumentation stage that failed to find its landmark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatchPhase {
    Anchor,
    SlotPriorityStore,
    Comparison,
}

impl PatchPhase {
    pub const ALL: [PatchPhase; 3] = [
        PatchPhase::Anchor,
        PatchPhase::SlotPriorityStore,
        PatchPhase::Comparison,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PatchPhase::Anchor => "anchor",
            PatchPhase::SlotPriorityStore => "slot_priority_store",
            PatchPhase::Comparison => "comparison",
        }
    }

    /// Zero-based ordinal, matching the numbering in failure messages.
    pub fn ordinal(self) -> u8 {
        match self {
            PatchPhase::Anchor => 0,
            PatchPhase::SlotPriorityStore => 1,
            PatchPhase::Comparison => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Rejected {
        item: String,
        stack_count: u32,
        cell: Cell,
        reason: RejectReason,
    },
    PatchFailed {
        routine: String,
        phase: PatchPhase,
        detail: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Rejected {
                item,
                stack_count,
                cell,
                reason,
            } => {
                let what = match reason {
                    RejectReason::TooHeavy => "is too heavy for storage at",
                    RejectReason::OverAggregate => "is over weight capacity at",
                    RejectReason::OverStackCount => "is over capacity at",
                    RejectReason::OrphanedPile => {
                        "is not in a storage building and there is already a thing at"
                    }
                };
                write!(f, "{stack_count}x {item} {what} {cell}")
            }
            Diagnostic::PatchFailed {
                routine,
                phase,
                detail,
            } => write!(
                f,
                "{routine} transpile failed({}): {detail}",
                phase.ordinal()
            ),
        }
    }
}

/// Where diagnostics go. Injected so the policy stays free of globals.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn emit(&self, diagnostic: &Diagnostic) {
        (**self).emit(diagnostic)
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Arc<S> {
    fn emit(&self, diagnostic: &Diagnostic) {
        (**self).emit(diagnostic)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Debug category for removal warnings. Off by default: an overfull
    /// cell is re-evaluated on every hauling search and would flood the log.
    pub warn_on_removal: bool,
}

/// Production sink writing through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    config: DiagnosticsConfig,
}

impl TracingSink {
    pub fn new(config: DiagnosticsConfig) -> Self {
        Self { config }
    }
}

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::Rejected { cell, reason, .. } => {
                if self.config.warn_on_removal {
                    warn!(%cell, reason = reason.as_str(), "deepstore: {diagnostic}");
                } else {
                    debug!(%cell, reason = reason.as_str(), "deepstore: {diagnostic}");
                }
            }
            Diagnostic::PatchFailed { phase, .. } => {
                error!(phase = phase.as_str(), "deepstore: {diagnostic}");
            }
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: &Diagnostic) {}
}

/// Keeps every diagnostic in memory, mostly for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn rejections(&self) -> Vec<RejectReason> {
        self.entries()
            .into_iter()
            .filter_map(|d| match d {
                Diagnostic::Rejected { reason, .. } => Some(reason),
                Diagnostic::PatchFailed { .. } => None,
            })
            .collect()
    }

    pub fn patch_failures(&self) -> Vec<PatchPhase> {
        self.entries()
            .into_iter()
            .filter_map(|d| match d {
                Diagnostic::PatchFailed { phase, .. } => Some(phase),
                Diagnostic::Rejected { .. } => None,
            })
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic.clone());
    }
}
