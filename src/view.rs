use crate::archetype::Archetype;
use crate::component::{component_id, Component, ComponentId};
use crate::entity::EntityId;
use crate::world::World;
use smallvec::SmallVec;
use std::marker::PhantomData;

/// A set of component types a view streams over.
///
/// Implemented for tuples of one to four distinct component types.
pub trait ViewQuery {
    /// Shared component references produced per entity.
    type Refs<'w>;
    /// Mutable component references produced per entity.
    type RefsMut<'w>;

    /// The predicate: ids of the required component types.
    fn component_ids() -> SmallVec<[ComponentId; 4]>;

    /// Safety: every predicate id must be a row of `arch` and `slot` must
    /// be live.
    unsafe fn fetch(arch: &Archetype, slot: usize) -> Self::Refs<'_>;

    /// Safety: as [fetch](Self::fetch); additionally the predicate ids
    /// must be distinct, so the produced references cannot alias.
    unsafe fn fetch_mut(arch: &mut Archetype, slot: usize) -> Self::RefsMut<'_>;
}

macro_rules! impl_view_query {
    ($($c:ident),+) => {
        impl<$($c: Component),+> ViewQuery for ($($c,)+) {
            type Refs<'w> = ($(&'w $c,)+);
            type RefsMut<'w> = ($(&'w mut $c,)+);

            fn component_ids() -> SmallVec<[ComponentId; 4]> {
                smallvec::smallvec![$(component_id::<$c>()),+]
            }

            unsafe fn fetch(arch: &Archetype, slot: usize) -> Self::Refs<'_> {
                ($(&*(arch.component_ptr(component_id::<$c>(), slot) as *const $c),)+)
            }

            unsafe fn fetch_mut(arch: &mut Archetype, slot: usize) -> Self::RefsMut<'_> {
                ($(&mut *(arch.component_ptr(component_id::<$c>(), slot) as *mut $c),)+)
            }
        }
    };
}

impl_view_query!(C1);
impl_view_query!(C1, C2);
impl_view_query!(C1, C2, C3);
impl_view_query!(C1, C2, C3, C4);

/// A read-only view over every entity whose archetype contains all
/// component types of `Q`.
///
/// The matching archetypes are collected once at construction; the view
/// borrows the world for its whole lifetime, so no structural change can
/// invalidate the iteration.
pub struct View<'w, Q: ViewQuery> {
    world: &'w World,
    matching: Vec<usize>,
    _q: PhantomData<Q>,
}

impl<'w, Q: ViewQuery> View<'w, Q> {
    /// Returns the number of entities the view matches.
    pub fn count(&self) -> usize {
        self.matching
            .iter()
            .map(|&i| self.world.archetypes[i].len())
            .sum()
    }

    /// Invokes `visitor` for every matching entity.
    pub fn for_each(&self, mut visitor: impl FnMut(EntityId, Q::Refs<'_>)) {
        for &arch_idx in &self.matching {
            let arch = &self.world.archetypes[arch_idx];
            for slot in 0..arch.len() {
                // Safety: the archetype matched the predicate; dense
                // storage makes every slot below `len` live.
                let refs = unsafe { Q::fetch(arch, slot) };
                visitor(arch.entity_at(slot), refs);
            }
        }
    }

    /// Invokes `visitor` for the first matching entity, if any.
    /// Returns `false` when no entity matches.
    pub fn first(&self, visitor: impl FnOnce(EntityId, Q::Refs<'_>)) -> bool {
        for &arch_idx in &self.matching {
            let arch = &self.world.archetypes[arch_idx];
            if !arch.is_empty() {
                // Safety: as in `for_each`.
                let refs = unsafe { Q::fetch(arch, 0) };
                visitor(arch.entity_at(0), refs);
                return true;
            }
        }
        false
    }
}

/// A mutable view over every entity whose archetype contains all
/// component types of `Q`.
pub struct ViewMut<'w, Q: ViewQuery> {
    world: &'w mut World,
    matching: Vec<usize>,
    _q: PhantomData<Q>,
}

impl<'w, Q: ViewQuery> ViewMut<'w, Q> {
    /// Returns the number of entities the view matches.
    pub fn count(&self) -> usize {
        self.matching
            .iter()
            .map(|&i| self.world.archetypes[i].len())
            .sum()
    }

    /// Invokes `visitor` for every matching entity.
    pub fn for_each(&mut self, mut visitor: impl FnMut(EntityId, Q::RefsMut<'_>)) {
        for &arch_idx in &self.matching {
            let arch = &mut self.world.archetypes[arch_idx];
            for slot in 0..arch.len() {
                let entity = arch.entity_at(slot);
                // Safety: as in `View::for_each`; the predicate ids were
                // checked distinct at construction.
                let refs = unsafe { Q::fetch_mut(arch, slot) };
                visitor(entity, refs);
            }
        }
    }

    /// Invokes `visitor` for the first matching entity, if any.
    /// Returns `false` when no entity matches.
    pub fn first(&mut self, visitor: impl FnOnce(EntityId, Q::RefsMut<'_>)) -> bool {
        for &arch_idx in &self.matching {
            let arch = &mut self.world.archetypes[arch_idx];
            if !arch.is_empty() {
                let entity = arch.entity_at(0);
                // Safety: as in `for_each`.
                let refs = unsafe { Q::fetch_mut(arch, 0) };
                visitor(entity, refs);
                return true;
            }
        }
        false
    }
}

impl World {
    /// Creates a read-only view over all entities that have every
    /// component type of `Q`.
    pub fn view<Q: ViewQuery>(&self) -> View<Q> {
        let ids = checked_predicate::<Q>();
        View {
            matching: matching_archetypes(self, &ids),
            world: self,
            _q: PhantomData,
        }
    }

    /// Creates a mutable view over all entities that have every component
    /// type of `Q`.
    pub fn view_mut<Q: ViewQuery>(&mut self) -> ViewMut<Q> {
        let ids = checked_predicate::<Q>();
        ViewMut {
            matching: matching_archetypes(self, &ids),
            world: self,
            _q: PhantomData,
        }
    }
}

fn checked_predicate<Q: ViewQuery>() -> SmallVec<[ComponentId; 4]> {
    #[cold]
    #[inline(never)]
    fn duplicate_component() -> ! {
        panic!("view predicate lists the same component type twice");
    }

    let ids = Q::component_ids();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        duplicate_component();
    }
    ids
}

fn matching_archetypes(world: &World, ids: &[ComponentId]) -> Vec<usize> {
    world
        .archetypes
        .iter()
        .enumerate()
        .filter(|(_, arch)| arch.id().contains_all(ids))
        .map(|(i, _)| i)
        .collect()
}
