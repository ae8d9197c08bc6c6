//! Instrumentation of the host's store-cell search routine.
//!
//! The host compiles the search itself, so the only way to make it honour
//! capacity limits is to rewrite its instruction list once at start-up:
//! call the capacity guard right after the current priority is copied into
//! its local, and let the "good enough, stop searching" comparison fall
//! through when the guard reported the cell as over capacity.

pub mod instruction;
pub mod landmarks;
pub mod patcher;
pub mod session;
#[cfg(test)]
mod tests;

pub use instruction::{
    Instruction, Label, LocalKind, LocalSlot, MethodRef, OpCode, Operand, Routine,
};
pub use landmarks::Landmarks;
pub use patcher::{PatchFailure, PatchOutcome, PatchReport, Patcher, INJECTED_INSTRUCTIONS};
pub use session::{PatchSession, SessionError};
