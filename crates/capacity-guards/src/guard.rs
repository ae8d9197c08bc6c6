use crate::Verdict;
use deepstore_core::{
    CapacityDescriptor, Cell, Diagnostic, DiagnosticSink, ItemId, RejectReason, StorageMap,
    StoragePriority,
};

/// Admission policy for storage cells with a capacity concept the host
/// search does not know about.
pub struct CapacityGuard<S> {
    sink: S,
}

impl<S: DiagnosticSink> CapacityGuard<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Decide whether `item` may stay where it is at `current` priority.
    pub fn evaluate<M>(&self, map: &M, item: ItemId, current: StoragePriority) -> Verdict
    where
        M: StorageMap + ?Sized,
    {
        // Already picked up: nothing to evict.
        if !map.is_spawned(item) {
            return Verdict::Admissible;
        }
        // Not in storage, so it cannot be over capacity anywhere.
        if current.is_unstored() {
            return Verdict::Admissible;
        }

        let cell = map.position(item);
        let verdict = match map.capacity_at(cell) {
            None => check_bare_slot(map, item, cell),
            Some(descriptor) => check_descriptor(map, item, cell, descriptor),
        };

        if let Some(reason) = verdict.reason() {
            self.sink.emit(&Diagnostic::Rejected {
                item: map.label(item),
                stack_count: map.stack_count(item),
                cell,
                reason,
            });
        }
        verdict
    }

    /// Host-shaped entry point: forces `priority` to `Unstored` and returns
    /// `true` when the location can no longer hold `item`.
    pub fn over_capacity<M>(&self, map: &M, item: ItemId, priority: &mut StoragePriority) -> bool
    where
        M: StorageMap + ?Sized,
    {
        self.evaluate(map, item, *priority).apply(priority)
    }
}

/// Slot group without a descriptor, typically what is left after a storage
/// building was destroyed. Only the first storable thing on the cell counts.
fn check_bare_slot<M>(map: &M, item: ItemId, cell: Cell) -> Verdict
where
    M: StorageMap + ?Sized,
{
    match map
        .things_at(cell)
        .iter()
        .copied()
        .find(|&thing| map.ever_storable(thing))
    {
        Some(first) if first != item => Verdict::reject(RejectReason::OrphanedPile),
        _ => Verdict::Admissible,
    }
}

fn check_descriptor<M>(map: &M, item: ItemId, cell: Cell, d: &CapacityDescriptor) -> Verdict
where
    M: StorageMap + ?Sized,
{
    if let Some(limit) = d.per_item_limit() {
        if map.stat_value(item, d.stat) > limit {
            return Verdict::reject(RejectReason::TooHeavy);
        }
    }

    let aggregate_limit = d.aggregate_limit();
    let mut total = 0.0f32;
    let mut stacks = 0u32;

    // One pass over one snapshot: the candidate check has to happen per
    // occupant, things stacked before it are the ones that count.
    for &other in map.things_at(cell) {
        if other == item {
            return Verdict::Admissible;
        }
        if !map.ever_storable(other) {
            continue;
        }
        stacks += 1;
        if let Some(limit) = aggregate_limit {
            total += map.stat_value(other, d.stat) * map.stack_count(other) as f32;
            if total > limit && stacks >= d.min_exempt_stacks {
                return Verdict::reject(RejectReason::OverAggregate);
            }
        }
        // Still fires when min_exempt_stacks > max_stacks.
        if stacks >= d.max_stacks {
            return Verdict::reject(RejectReason::OverStackCount);
        }
    }
    Verdict::Admissible
}
