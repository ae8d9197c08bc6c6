use crate::{CapacityDescriptor, Cell, ItemId, StatKind, StorageMap};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Thing {
    pub cell: Cell,
    pub spawned: bool,
    pub storable: bool,
    pub stack_count: u32,
    pub mass: f32,
    pub bulk: f32,
    pub label: String,
}

/// In-memory map for tests: things are indexed per cell in insertion order.
#[derive(Debug, Default)]
pub struct GridMap {
    things: HashMap<ItemId, Thing>,
    index: HashMap<Cell, Vec<ItemId>>,
    storage: HashMap<Cell, CapacityDescriptor>,
    next_id: u64,
}

impl GridMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage(mut self, cell: Cell, descriptor: CapacityDescriptor) -> Self {
        self.storage.insert(cell, descriptor);
        self
    }

    pub fn set_storage(&mut self, cell: Cell, descriptor: CapacityDescriptor) {
        self.storage.insert(cell, descriptor);
    }

    pub fn spawn(&mut self, cell: Cell, label: &str, stack_count: u32, mass: f32) -> ItemId {
        self.spawn_thing(Thing {
            cell,
            spawned: true,
            storable: true,
            stack_count,
            mass,
            bulk: mass,
            label: label.to_string(),
        })
    }

    /// Chunks, filth and the like: present on the cell but never storable.
    pub fn spawn_debris(&mut self, cell: Cell, label: &str) -> ItemId {
        self.spawn_thing(Thing {
            cell,
            spawned: true,
            storable: false,
            stack_count: 1,
            mass: 20.0,
            bulk: 20.0,
            label: label.to_string(),
        })
    }

    pub fn spawn_thing(&mut self, thing: Thing) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        if thing.spawned {
            self.index.entry(thing.cell).or_default().push(id);
        }
        self.things.insert(id, thing);
        id
    }

    pub fn despawn(&mut self, item: ItemId) {
        if let Some(thing) = self.things.get_mut(&item) {
            thing.spawned = false;
            if let Some(list) = self.index.get_mut(&thing.cell) {
                list.retain(|other| *other != item);
            }
        }
    }

    fn thing(&self, item: ItemId) -> Option<&Thing> {
        self.things.get(&item)
    }
}

impl StorageMap for GridMap {
    fn is_spawned(&self, item: ItemId) -> bool {
        self.thing(item).is_some_and(|t| t.spawned)
    }

    fn position(&self, item: ItemId) -> Cell {
        self.thing(item).map_or(Cell::new(0, 0), |t| t.cell)
    }

    fn capacity_at(&self, cell: Cell) -> Option<&CapacityDescriptor> {
        self.storage.get(&cell)
    }

    fn things_at(&self, cell: Cell) -> &[ItemId] {
        self.index.get(&cell).map_or(&[], |v| v.as_slice())
    }

    fn ever_storable(&self, item: ItemId) -> bool {
        self.thing(item).is_some_and(|t| t.storable)
    }

    fn stack_count(&self, item: ItemId) -> u32 {
        self.thing(item).map_or(0, |t| t.stack_count)
    }

    fn stat_value(&self, item: ItemId, stat: StatKind) -> f32 {
        self.thing(item).map_or(0.0, |t| match stat {
            StatKind::Mass => t.mass,
            StatKind::Bulk => t.bulk,
        })
    }

    fn label(&self, item: ItemId) -> String {
        self.thing(item)
            .map_or_else(|| format!("thing#{}", item.0), |t| t.label.clone())
    }
}
