pub(crate) mod row;

use crate::component::{component_id, component_info, Component, ComponentId};
use crate::entity::EntityId;
use row::Row;
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};

const MAX_IDS_ON_STACK: usize = 8;

/// Canonical identity of an archetype: the sorted, duplicate-free set of
/// its component ids. Two archetypes are the same iff their ids are equal
/// as sets; subset reasoning is reserved for views.
#[derive(Clone, Eq)]
pub struct ArchetypeId {
    sorted_ids: SmallVec<[ComponentId; MAX_IDS_ON_STACK]>,
    hash_val: u64,
}

impl ArchetypeId {
    /// The empty component set.
    pub fn empty() -> ArchetypeId {
        ArchetypeId::from_ids([])
    }

    /// Canonicalizes an arbitrary list of component ids into a set identity.
    pub fn from_ids(ids: impl IntoIterator<Item = ComponentId>) -> ArchetypeId {
        let mut sorted_ids: SmallVec<[ComponentId; MAX_IDS_ON_STACK]> =
            ids.into_iter().collect();
        sorted_ids.sort_unstable();
        sorted_ids.dedup();

        let mut hasher = ahash::AHasher::default();
        sorted_ids.hash(&mut hasher);
        let hash_val = hasher.finish();

        ArchetypeId {
            sorted_ids,
            hash_val,
        }
    }

    /// Returns this set extended with `id`.
    pub fn with(&self, id: ComponentId) -> ArchetypeId {
        ArchetypeId::from_ids(self.sorted_ids.iter().copied().chain([id]))
    }

    /// Returns this set with `id` removed.
    pub fn without(&self, id: ComponentId) -> ArchetypeId {
        ArchetypeId::from_ids(self.sorted_ids.iter().copied().filter(|&v| v != id))
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.sorted_ids.binary_search(&id).is_ok()
    }

    /// Returns `true` if every id in `ids` is a member of this set.
    pub fn contains_all(&self, ids: &[ComponentId]) -> bool {
        ids.iter().all(|&id| self.contains(id))
    }

    /// The component ids of the set, in sorted order.
    pub fn components(&self) -> &[ComponentId] {
        &self.sorted_ids
    }

    /// Returns the number of component types in the set.
    pub fn len(&self) -> usize {
        self.sorted_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_ids.is_empty()
    }
}

impl PartialEq for ArchetypeId {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_ids == other.sorted_ids
    }
}

impl Hash for ArchetypeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_val.hash(state);
    }
}

impl fmt::Debug for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.sorted_ids.iter()).finish()
    }
}

/// Columnar storage for all entities sharing one exact component set.
///
/// Owns one [Row] per component type plus the implicit entity-identity
/// column. Slot `i` across all rows describes one entity; storage is dense,
/// so slots `0..len` are exactly the live ones.
pub struct Archetype {
    id: ArchetypeId,
    /// Parallel to `id.components()`.
    rows: Vec<Row>,
    /// The identity column.
    entities: Vec<EntityId>,
    capacity: usize,
}

impl Archetype {
    pub(crate) fn new(id: ArchetypeId) -> Archetype {
        let rows = id
            .components()
            .iter()
            .map(|&cid| Row::new(component_info(cid)))
            .collect();

        Archetype {
            id,
            rows,
            entities: Vec::new(),
            capacity: 0,
        }
    }

    pub fn id(&self) -> &ArchetypeId {
        &self.id
    }

    /// Returns the number of live slots.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// The identity column: which entity occupies each live slot.
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub(crate) fn entity_at(&self, slot: usize) -> EntityId {
        self.entities[slot]
    }

    fn row_index(&self, id: ComponentId) -> Option<usize> {
        self.id.components().binary_search(&id).ok()
    }

    /// Allocates a slot for `entity` at the end of every column, growing
    /// all rows (capacity doubling, from 0 to 1) when full. The identity
    /// column records `entity` immediately; the component cells are left
    /// uninitialized for the caller to fill.
    pub(crate) fn new_slot(&mut self, entity: EntityId) -> usize {
        if self.entities.len() == self.capacity {
            let new_capacity = if self.capacity == 0 { 1 } else { self.capacity * 2 };
            self.set_capacity(new_capacity);
        }

        let slot = self.entities.len();
        self.entities.push(entity);
        slot
    }

    fn set_capacity(&mut self, new_capacity: usize) {
        let len = self.entities.len();
        for row in &mut self.rows {
            row.set_capacity(self.capacity, new_capacity, len);
        }
        self.capacity = new_capacity;
    }

    /// Removes `slot` by relocating the last live slot into it, keeping
    /// storage dense. The caller must already have destructed the slot's
    /// component cells or moved them out. Returns the id of the displaced
    /// entity when `slot` was not the last one, so its location record can
    /// be patched. Shrinks capacity (halving, never below 1) when half or
    /// more of it is unused.
    pub(crate) fn swap_remove(&mut self, slot: usize) -> Option<EntityId> {
        let last = self.entities.len() - 1;
        if slot != last {
            for row in &mut self.rows {
                // Safety: `last` is live, `slot` has been vacated by the caller.
                unsafe { row.relocate(last, slot) };
            }
        }
        self.entities.swap_remove(slot);

        if self.capacity > 1 && self.entities.len() <= self.capacity / 2 {
            self.set_capacity(self.capacity / 2);
        }

        (slot != last).then(|| self.entities[slot])
    }

    /// Destroys every component cell at `slot` without touching the slot
    /// bookkeeping.
    pub(crate) fn destruct_slot(&mut self, slot: usize) {
        debug_assert!(slot < self.entities.len());
        for row in &mut self.rows {
            // Safety: every slot below `len` holds live values.
            unsafe { row.drop_at(slot) };
        }
    }

    /// Moves every component present in **both** archetypes from
    /// `src_slot` into the already-allocated, uninitialized `dst_slot`.
    /// Components present only in `self` are left for the caller to
    /// destruct or move out; components present only in `dst` are left for
    /// the caller to construct.
    pub(crate) fn move_components_to(
        &mut self,
        src_slot: usize,
        dst: &mut Archetype,
        dst_slot: usize,
    ) {
        for (src_row, &cid) in self.rows.iter_mut().zip(self.id.sorted_ids.iter()) {
            if let Some(dst_idx) = dst.row_index(cid) {
                unsafe {
                    let src_ptr = src_row.ptr_at(src_slot);
                    let dst_ptr = dst.rows[dst_idx].ptr_at(dst_slot);
                    (src_row.info().move_fn)(src_ptr, dst_ptr);
                }
            }
        }
    }

    /// Copy-constructs every component cell of `src_slot` into the
    /// already-allocated, uninitialized `dst_slot` of the same archetype.
    pub(crate) fn clone_slot(&mut self, src_slot: usize, dst_slot: usize) {
        debug_assert_ne!(src_slot, dst_slot);
        for row in &mut self.rows {
            unsafe {
                let src = row.ptr_at(src_slot);
                let dst = row.ptr_at(dst_slot);
                (row.info().copy_fn)(src, dst);
            }
        }
    }

    /// Returns a pointer to the cell of component `id` at `slot`.
    ///
    /// Safety: `slot` must be within capacity. Panics if `id` is not part
    /// of the archetype's schema.
    pub(crate) unsafe fn component_ptr(&self, id: ComponentId, slot: usize) -> *mut u8 {
        let idx = self
            .row_index(id)
            .expect("component is not part of the archetype schema");
        self.rows[idx].ptr_at(slot)
    }

    /// Returns a reference to the component `C` at `slot`, or `None` if
    /// `C` is not part of the archetype's schema or the slot is not live.
    pub fn get<C: Component>(&self, slot: usize) -> Option<&C> {
        let idx = self.row_index(component_id::<C>())?;
        if slot >= self.entities.len() {
            return None;
        }
        // Safety: the row stores `C` elements and `slot` is live.
        Some(unsafe { &*(self.rows[idx].ptr_at(slot) as *const C) })
    }

    /// Returns a mutable reference to the component `C` at `slot`.
    pub fn get_mut<C: Component>(&mut self, slot: usize) -> Option<&mut C> {
        let idx = self.row_index(component_id::<C>())?;
        if slot >= self.entities.len() {
            return None;
        }
        // Safety: the row stores `C` elements and `slot` is live.
        Some(unsafe { &mut *(self.rows[idx].ptr_at(slot) as *mut C) })
    }

    /// Destroys all live slots, keeping buffers allocated.
    pub(crate) fn clear(&mut self) {
        for slot in 0..self.entities.len() {
            for row in &mut self.rows {
                // Safety: every slot below `len` holds live values.
                unsafe { row.drop_at(slot) };
            }
        }
        self.entities.clear();
    }
}

impl Drop for Archetype {
    fn drop(&mut self) {
        self.clear();
        for row in &mut self.rows {
            // Safety: buffers were last allocated with `self.capacity` and
            // `clear` destructed every live value.
            unsafe { row.release(self.capacity) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_archetype() -> (Archetype, ComponentId) {
        let cid = component_id::<u32>();
        (Archetype::new(ArchetypeId::from_ids([cid])), cid)
    }

    fn push(arch: &mut Archetype, cid: ComponentId, entity: usize, value: u32) -> usize {
        let slot = arch.new_slot(EntityId(entity));
        unsafe { (arch.component_ptr(cid, slot) as *mut u32).write(value) };
        slot
    }

    #[test]
    fn archetype_id_is_a_canonical_set() {
        let a = ArchetypeId::from_ids([3, 1, 2]);
        let b = ArchetypeId::from_ids([1, 2, 3, 3]);

        assert_eq!(a, b);
        assert_eq!(a.components(), &[1, 2, 3]);
        assert!(a.contains(2));
        assert!(!a.contains(4));
        assert!(a.contains_all(&[3, 1]));
        assert_eq!(a.without(2).components(), &[1, 3]);
        assert_eq!(a.with(0).components(), &[0, 1, 2, 3]);
    }

    #[test]
    fn swap_remove_relocates_the_last_slot() {
        let (mut arch, cid) = u32_archetype();
        for i in 0..4 {
            push(&mut arch, cid, i, i as u32 * 10);
        }

        let moved = arch.swap_remove(1);
        assert_eq!(moved, Some(EntityId(3)));
        assert_eq!(arch.len(), 3);
        assert_eq!(arch.get::<u32>(1), Some(&30));
        assert_eq!(arch.entity_at(1), EntityId(3));

        // Removing the last slot displaces nobody.
        assert_eq!(arch.swap_remove(2), None);
        assert_eq!(arch.len(), 2);
    }

    #[test]
    fn capacity_doubles_and_halves() {
        let (mut arch, cid) = u32_archetype();
        assert_eq!(arch.capacity(), 0);

        for i in 0..5 {
            push(&mut arch, cid, i, i as u32);
        }
        assert_eq!(arch.capacity(), 8);

        arch.swap_remove(0);
        // 4 live out of 8: halves.
        assert_eq!(arch.capacity(), 4);

        arch.swap_remove(0);
        assert_eq!(arch.capacity(), 4);
        arch.swap_remove(0);
        assert_eq!(arch.capacity(), 2);
        arch.swap_remove(0);
        assert_eq!(arch.capacity(), 1);
        arch.swap_remove(0);
        // Never shrinks below one slot.
        assert_eq!(arch.capacity(), 1);
        assert_eq!(arch.len(), 0);
    }

    #[test]
    fn values_survive_reallocation() {
        let (mut arch, cid) = u32_archetype();
        for i in 0..33 {
            push(&mut arch, cid, i, i as u32 * 7);
        }
        for i in 0..33 {
            assert_eq!(arch.get::<u32>(i), Some(&(i as u32 * 7)));
        }
    }
}
