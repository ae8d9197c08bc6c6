use deepstore_core::{PatchPhase, RejectReason};
use prometheus::{IntCounterVec, Opts, Registry};

pub struct StoreMetrics {
    pub rejections_total: IntCounterVec,
    pub patch_failures_total: IntCounterVec,
}

impl StoreMetrics {
    pub fn new(registry: &Registry) -> anyhow::Result<Self> {
        let rejections_total = IntCounterVec::new(
            Opts::new(
                "deepstore_rejections_total",
                "Storage cells declared over capacity, by reason",
            ),
            &["reason"],
        )?;
        let patch_failures_total = IntCounterVec::new(
            Opts::new(
                "deepstore_patch_failures_total",
                "Instrumentation landmarks not found, by phase",
            ),
            &["phase"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;
        registry.register(Box::new(patch_failures_total.clone()))?;

        // Pre-create every series so dashboards see zeros instead of gaps.
        for reason in RejectReason::ALL {
            rejections_total.with_label_values(&[reason.as_str()]);
        }
        for phase in PatchPhase::ALL {
            patch_failures_total.with_label_values(&[phase.as_str()]);
        }

        Ok(Self {
            rejections_total,
            patch_failures_total,
        })
    }

    pub fn observe_rejection(&self, reason: RejectReason) {
        self.rejections_total
            .with_label_values(&[reason.as_str()])
            .inc();
    }

    pub fn observe_patch_failure(&self, phase: PatchPhase) {
        self.patch_failures_total
            .with_label_values(&[phase.as_str()])
            .inc();
    }

    pub fn rejections(&self, reason: RejectReason) -> u64 {
        self.rejections_total
            .with_label_values(&[reason.as_str()])
            .get()
    }

    pub fn patch_failures(&self, phase: PatchPhase) -> u64 {
        self.patch_failures_total
            .with_label_values(&[phase.as_str()])
            .get()
    }
}
