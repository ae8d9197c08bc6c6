use crate::{Instruction, Label, Landmarks, LocalKind, LocalSlot, OpCode, Routine};
use chrono::{DateTime, Utc};
use deepstore_core::{Diagnostic, DiagnosticSink, PatchPhase};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Instructions added by a fully successful patch: five around the guard
/// call, two after the comparison.
pub const INJECTED_INSTRUCTIONS: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchFailure {
    #[error("no store into priority local {local}")]
    AnchorNotFound { local: LocalSlot },
    #[error("no store into slot group priority local {local}")]
    SlotPriorityStoreNotFound { local: LocalSlot },
    #[error("no `ldloc {local}; ldarg {arg}; bgt` comparison")]
    ComparisonNotFound { local: LocalSlot, arg: u16 },
    #[error("no free local slot for the guard flag ({locals} locals declared)")]
    FrameFull { locals: usize },
}

impl PatchFailure {
    pub fn phase(&self) -> PatchPhase {
        match self {
            PatchFailure::AnchorNotFound { .. } | PatchFailure::FrameFull { .. } => {
                PatchPhase::Anchor
            }
            PatchFailure::SlotPriorityStoreNotFound { .. } => PatchPhase::SlotPriorityStore,
            PatchFailure::ComparisonNotFound { .. } => PatchPhase::Comparison,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub routine: String,
    pub applied_at: DateTime<Utc>,
    /// Boolean local holding the guard's verdict.
    pub flag_local: Option<LocalSlot>,
    /// Original index of the priority store the call was injected after.
    pub anchor_index: Option<usize>,
    /// Original index of the `bgt` the flag test was injected after.
    pub comparison_index: Option<usize>,
    pub injected: usize,
    pub failures: Vec<PatchFailure>,
}

impl PatchReport {
    fn new(routine: &str) -> Self {
        Self {
            routine: routine.to_string(),
            applied_at: Utc::now(),
            flag_local: None,
            anchor_index: None,
            comparison_index: None,
            injected: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub routine: Routine,
    pub report: PatchReport,
}

/// One-shot rewrite of the store-cell search.
///
/// A missing landmark never aborts: the failure is reported and everything
/// is still copied through, so the worst case is the host's own behaviour.
#[derive(Debug, Clone, Default)]
pub struct Patcher {
    landmarks: Landmarks,
}

impl Patcher {
    pub fn new(landmarks: Landmarks) -> Self {
        Self { landmarks }
    }

    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    pub fn patch(&self, mut routine: Routine, sink: &dyn DiagnosticSink) -> PatchOutcome {
        let code = std::mem::take(&mut routine.body);
        let mut out = Vec::with_capacity(code.len() + INJECTED_INSTRUCTIONS);
        let mut report = PatchReport::new(&routine.name);
        let lm = &self.landmarks;
        let mut cursor = 0;

        // Phase 1: right after `storagePriority = currentPriority`, call the
        // guard and keep its answer in a fresh local.
        let mut anchor = None;
        while cursor < code.len() {
            let instr = &code[cursor];
            out.push(instr.clone());
            cursor += 1;
            if instr.is_stloc(lm.priority_local) {
                anchor = Some(cursor - 1);
                break;
            }
        }
        match anchor {
            Some(at) => match routine.declare_local(LocalKind::Bool) {
                Some(flag) => {
                    let call = self.guard_call(flag);
                    report.injected += call.len();
                    out.extend(call);
                    report.flag_local = Some(flag);
                    report.anchor_index = Some(at);
                }
                None => {
                    let locals = routine.locals.len();
                    self.fail(&mut report, sink, PatchFailure::FrameFull { locals });
                }
            },
            None => self.fail(
                &mut report,
                sink,
                PatchFailure::AnchorNotFound {
                    local: lm.priority_local,
                },
            ),
        }

        // Phase 2: run up to the store of the slot group's priority. The
        // store itself is left for phase 3 to copy.
        let mut found = false;
        while cursor < code.len() {
            if code[cursor].is_stloc(lm.slot_priority_local) {
                found = true;
                break;
            }
            out.push(code[cursor].clone());
            cursor += 1;
        }
        if !found {
            self.fail(
                &mut report,
                sink,
                PatchFailure::SlotPriorityStoreNotFound {
                    local: lm.slot_priority_local,
                },
            );
        }

        // Phase 3: `priority <= currentPriority` compiles to
        // `ldloc priority; ldarg currentPriority; bgt keep_looking`. Also
        // keep looking while the flag is set.
        found = false;
        while cursor < code.len() {
            if let Some(target) = self.match_comparison(&code[cursor..]) {
                out.extend_from_slice(&code[cursor..cursor + 3]);
                report.comparison_index = Some(cursor + 2);
                cursor += 3;
                if let Some(flag) = report.flag_local {
                    out.push(Instruction::ldloc(flag));
                    out.push(Instruction::branch(OpCode::BrTrue, target));
                    report.injected += 2;
                }
                found = true;
                break;
            }
            out.push(code[cursor].clone());
            cursor += 1;
        }
        if !found {
            self.fail(
                &mut report,
                sink,
                PatchFailure::ComparisonNotFound {
                    local: lm.slot_priority_local,
                    arg: lm.current_priority_arg,
                },
            );
        }

        // Phase 4: tail.
        out.extend_from_slice(&code[cursor..]);
        routine.body = out;

        if report.is_complete() {
            info!(
                routine = %routine.name,
                injected = report.injected,
                "deepstore: instrumented store cell search"
            );
        }
        debug!(listing = %routine.listing(), "deepstore: patched body");

        PatchOutcome { routine, report }
    }

    /// `flag = over_capacity(map, thing, ref storagePriority)`
    fn guard_call(&self, flag: LocalSlot) -> [Instruction; 5] {
        let lm = &self.landmarks;
        [
            Instruction::ldarg(lm.map_arg),
            Instruction::ldarg(lm.item_arg),
            Instruction::ldloca(lm.priority_local),
            Instruction::call(lm.entry_point.clone()),
            Instruction::stloc(flag),
        ]
    }

    fn match_comparison(&self, window: &[Instruction]) -> Option<Label> {
        let lm = &self.landmarks;
        match window {
            [load, arg, cmp, ..]
                if load.is_ldloc(lm.slot_priority_local)
                    && arg.is_ldarg(lm.current_priority_arg)
                    && cmp.opcode == OpCode::Bgt =>
            {
                cmp.branch_target()
            }
            _ => None,
        }
    }

    fn fail(&self, report: &mut PatchReport, sink: &dyn DiagnosticSink, failure: PatchFailure) {
        sink.emit(&Diagnostic::PatchFailed {
            routine: report.routine.clone(),
            phase: failure.phase(),
            detail: failure.to_string(),
        });
        report.failures.push(failure);
    }
}
