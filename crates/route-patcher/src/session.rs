use crate::{Landmarks, PatchReport, Patcher, Routine};
use deepstore_core::DiagnosticSink;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("routine {0} was already instrumented in this process")]
    AlreadyPatched(String),
}

/// Start-up instrumentation for one host process.
///
/// Each routine is rewritten at most once; the patcher is not meant to run
/// over its own output.
pub struct PatchSession<S> {
    patcher: Patcher,
    sink: S,
    patched: HashSet<String>,
    reports: Vec<PatchReport>,
}

impl<S: DiagnosticSink> PatchSession<S> {
    pub fn new(landmarks: Landmarks, sink: S) -> Self {
        Self {
            patcher: Patcher::new(landmarks),
            sink,
            patched: HashSet::new(),
            reports: Vec::new(),
        }
    }

    pub fn instrument(&mut self, routine: Routine) -> Result<Routine, SessionError> {
        if !self.patched.insert(routine.name.clone()) {
            return Err(SessionError::AlreadyPatched(routine.name));
        }
        let outcome = self.patcher.patch(routine, &self.sink);
        self.reports.push(outcome.report);
        Ok(outcome.routine)
    }

    pub fn is_patched(&self, routine: &str) -> bool {
        self.patched.contains(routine)
    }

    pub fn reports(&self) -> &[PatchReport] {
        &self.reports
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
