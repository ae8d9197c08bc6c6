use crate::StoreMetrics;
use deepstore_core::{Diagnostic, DiagnosticSink};

/// Counts diagnostics, then hands them to `inner`.
pub struct MetricsSink<S> {
    metrics: StoreMetrics,
    inner: S,
}

impl<S: DiagnosticSink> MetricsSink<S> {
    pub fn new(metrics: StoreMetrics, inner: S) -> Self {
        Self { metrics, inner }
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: DiagnosticSink> DiagnosticSink for MetricsSink<S> {
    fn emit(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::Rejected { reason, .. } => self.metrics.observe_rejection(*reason),
            Diagnostic::PatchFailed { phase, .. } => self.metrics.observe_patch_failure(*phase),
        }
        self.inner.emit(diagnostic);
    }
}
