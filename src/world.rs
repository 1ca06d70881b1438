use crate::archetype::{Archetype, ArchetypeId};
use crate::component::{component_id, Component};
use crate::entity::{EntityData, EntityId};
use crate::HashMap;
use index_pool::IndexPool;
use std::any;
use std::collections::hash_map;

/// Index of the always-present archetype with the empty component set,
/// the home of freshly created entities.
const EMPTY_ARCHETYPE: usize = 0;

/// A container of entities and their components.
///
/// Owns every archetype and the mapping from entity id to its storage
/// location; adding or removing a component migrates the entity between
/// archetypes.
pub struct World {
    /// `None` marks a freed id awaiting reuse.
    entities: Vec<Option<EntityData>>,
    id_pool: IndexPool,
    pub(crate) archetypes: Vec<Archetype>,
    archetypes_by_id: HashMap<ArchetypeId, usize>,
}

impl World {
    /// Creates an empty world.
    pub fn new() -> World {
        let empty = Archetype::new(ArchetypeId::empty());
        let mut archetypes_by_id = HashMap::default();
        archetypes_by_id.insert(empty.id().clone(), EMPTY_ARCHETYPE);

        World {
            entities: Vec::new(),
            id_pool: IndexPool::new(),
            archetypes: vec![empty],
            archetypes_by_id,
        }
    }

    /// Creates a new component-less entity and returns its identifier.
    /// Freed identifiers are reused before the id space grows.
    pub fn new_entity(&mut self) -> EntityId {
        let id = EntityId(self.id_pool.new_id());
        let slot = self.archetypes[EMPTY_ARCHETYPE].new_slot(id);
        self.set_entity_data(
            id,
            EntityData {
                archetype: EMPTY_ARCHETYPE,
                slot,
            },
        );
        id
    }

    /// Deletes an entity and all its components. The freed slot is
    /// backfilled by the archetype's last slot. Panics if `id` is not valid.
    pub fn delete_entity(&mut self, id: EntityId) {
        let data = self.entity_data(id);

        let arch = &mut self.archetypes[data.archetype];
        arch.destruct_slot(data.slot);
        if let Some(moved) = arch.swap_remove(data.slot) {
            // The displaced entity now lives where the deleted one was.
            self.entities[moved.to_index()] = Some(EntityData {
                archetype: data.archetype,
                slot: data.slot,
            });
        }

        self.entities[id.to_index()] = None;
        let _ = self.id_pool.return_id(id.to_index());
    }

    /// Attaches `value` to the entity as component `C`, migrating the
    /// entity to the archetype extended with `C`.
    ///
    /// Returns a mutable reference to the stored value. The reference
    /// borrows the world, so it cannot be held across a later structural
    /// change (another `add`, `remove` or `delete_entity`) — such a change
    /// may reallocate or reorder the underlying storage.
    ///
    /// Panics if `id` is not valid or the entity already has `C`.
    pub fn add<C: Component>(&mut self, id: EntityId, value: C) -> &mut C {
        #[cold]
        #[inline(never)]
        fn already_present(name: &str) -> ! {
            panic!("component {name} is already present on the entity");
        }

        let data = self.entity_data(id);
        let cid = component_id::<C>();

        let src_id = self.archetypes[data.archetype].id();
        if src_id.contains(cid) {
            already_present(any::type_name::<C>());
        }
        let target_id = src_id.with(cid);
        let target = self.get_or_create_archetype(target_id);

        let (src, dst) = two_archetypes(&mut self.archetypes, data.archetype, target);
        let dst_slot = dst.new_slot(id);
        src.move_components_to(data.slot, dst, dst_slot);
        if let Some(moved) = src.swap_remove(data.slot) {
            self.entities[moved.to_index()] = Some(EntityData {
                archetype: data.archetype,
                slot: data.slot,
            });
        }
        self.set_entity_data(
            id,
            EntityData {
                archetype: target,
                slot: dst_slot,
            },
        );
        log::trace!("{id:?}: attach {}", any::type_name::<C>());

        // Safety: `C` is a row of the target schema, and its cell at
        // `dst_slot` is the one left unconstructed by the migration.
        unsafe {
            let ptr = self.archetypes[target].component_ptr(cid, dst_slot) as *mut C;
            ptr.write(value);
            &mut *ptr
        }
    }

    /// Detaches component `C` from the entity, migrating the entity to the
    /// archetype without `C`, and returns the detached value.
    ///
    /// Panics if `id` is not valid or the entity has no `C`.
    pub fn remove<C: Component>(&mut self, id: EntityId) -> C {
        #[cold]
        #[inline(never)]
        fn not_present(name: &str) -> ! {
            panic!("component {name} is not present on the entity");
        }

        let data = self.entity_data(id);
        let cid = component_id::<C>();

        let src_id = self.archetypes[data.archetype].id();
        if !src_id.contains(cid) {
            not_present(any::type_name::<C>());
        }
        let target_id = src_id.without(cid);
        let target = self.get_or_create_archetype(target_id);

        let (src, dst) = two_archetypes(&mut self.archetypes, data.archetype, target);
        let dst_slot = dst.new_slot(id);
        // Safety: the entity has `C` and `data.slot` is live; the cell is
        // moved out here and not touched again before the swap-remove
        // recycles it.
        let value = unsafe { (src.component_ptr(cid, data.slot) as *mut C).read() };
        src.move_components_to(data.slot, dst, dst_slot);
        if let Some(moved) = src.swap_remove(data.slot) {
            self.entities[moved.to_index()] = Some(EntityData {
                archetype: data.archetype,
                slot: data.slot,
            });
        }
        self.set_entity_data(
            id,
            EntityData {
                archetype: target,
                slot: dst_slot,
            },
        );
        log::trace!("{id:?}: detach {}", any::type_name::<C>());

        value
    }

    /// Creates a new entity carrying a copy of every component of `id`.
    /// Panics if `id` is not valid.
    pub fn duplicate_entity(&mut self, id: EntityId) -> EntityId {
        let data = self.entity_data(id);
        let new_id = EntityId(self.id_pool.new_id());

        let arch = &mut self.archetypes[data.archetype];
        let dst_slot = arch.new_slot(new_id);
        arch.clone_slot(data.slot, dst_slot);

        self.set_entity_data(
            new_id,
            EntityData {
                archetype: data.archetype,
                slot: dst_slot,
            },
        );
        new_id
    }

    /// Returns `true` if the entity has component `C`.
    /// Invalid ids have no components.
    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        self.entity_data_opt(id).map_or(false, |data| {
            self.archetypes[data.archetype].id().contains(component_id::<C>())
        })
    }

    /// Returns a reference to the component `C` of the entity.
    pub fn get<C: Component>(&self, id: EntityId) -> Option<&C> {
        let data = self.entity_data_opt(id)?;
        self.archetypes[data.archetype].get(data.slot)
    }

    /// Returns a mutable reference to the component `C` of the entity.
    pub fn get_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        let data = self.entity_data_opt(id)?;
        self.archetypes[data.archetype].get_mut(data.slot)
    }

    /// Returns `true` if `id` refers to a live entity.
    pub fn is_valid(&self, id: EntityId) -> bool {
        self.entity_data_opt(id).is_some()
    }

    /// Returns the number of live entities.
    pub fn entity_count(&self) -> usize {
        self.archetypes.iter().map(Archetype::len).sum()
    }

    /// Returns the number of archetypes holding at least one component
    /// row. The built-in empty archetype is not counted.
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len() - 1
    }

    /// Sums, over all archetypes, component rows times live slots.
    pub fn component_count(&self) -> usize {
        self.archetypes
            .iter()
            .map(|arch| arch.id().len() * arch.len())
            .sum()
    }

    /// Returns an iterator over all live entity ids.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .enumerate()
            .filter_map(|(i, data)| data.map(|_| EntityId(i)))
    }

    /// Deletes every live entity. Registered archetypes are retained.
    pub fn clear(&mut self) {
        for arch in &mut self.archetypes {
            arch.clear();
        }
        self.entities.clear();
        self.id_pool = IndexPool::new();
    }

    fn get_or_create_archetype(&mut self, id: ArchetypeId) -> usize {
        match self.archetypes_by_id.entry(id) {
            hash_map::Entry::Occupied(e) => *e.get(),
            hash_map::Entry::Vacant(e) => {
                let arch_id = self.archetypes.len();
                log::debug!("creating archetype {:?}", e.key());
                self.archetypes.push(Archetype::new(e.key().clone()));
                e.insert(arch_id);
                arch_id
            }
        }
    }

    fn entity_data_opt(&self, id: EntityId) -> Option<EntityData> {
        self.entities.get(id.to_index()).copied().flatten()
    }

    fn entity_data(&self, id: EntityId) -> EntityData {
        #[cold]
        #[inline(never)]
        fn invalid_entity(id: EntityId) -> ! {
            panic!("invalid entity id {id:?}");
        }

        match self.entity_data_opt(id) {
            Some(data) => data,
            None => invalid_entity(id),
        }
    }

    fn set_entity_data(&mut self, id: EntityId, data: EntityData) {
        let index = id.to_index();
        if index == self.entities.len() {
            self.entities.push(Some(data));
        } else {
            self.entities[index] = Some(data);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        World::new()
    }
}

/// Returns disjoint mutable references to two distinct archetypes.
fn two_archetypes(
    archetypes: &mut [Archetype],
    a: usize,
    b: usize,
) -> (&mut Archetype, &mut Archetype) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = archetypes.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = archetypes.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
