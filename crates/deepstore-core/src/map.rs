use crate::{CapacityDescriptor, Cell, ItemId, StatKind};

/// Read-only view of the host world consumed by the capacity policy.
///
/// Everything here is owned by the host. Implementations hand out snapshots;
/// nothing in this workspace mutates occupant lists.
pub trait StorageMap {
    /// `false` once the thing has been despawned or picked up.
    fn is_spawned(&self, item: ItemId) -> bool;

    fn position(&self, item: ItemId) -> Cell;

    /// Descriptor of the container owning the slot group at `cell`.
    ///
    /// `None` for bare slot groups, including the ones left behind after a
    /// storage building was destroyed.
    fn capacity_at(&self, cell: Cell) -> Option<&CapacityDescriptor>;

    /// Everything physically present at `cell`, in the host's index order.
    fn things_at(&self, cell: Cell) -> &[ItemId];

    fn ever_storable(&self, item: ItemId) -> bool;

    fn stack_count(&self, item: ItemId) -> u32;

    fn stat_value(&self, item: ItemId, stat: StatKind) -> f32;

    /// Human readable name for diagnostics.
    fn label(&self, item: ItemId) -> String;
}
