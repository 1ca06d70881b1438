use crate::component::Component;
use crate::entity::EntityId;
use crate::world::World;

/// An immutable entry of an entity in a [World].
/// Provides convenient access to the entity's components.
pub struct Entry<'a> {
    world: &'a World,
    id: EntityId,
}

impl<'a> Entry<'a> {
    /// Returns the underlying entity id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns `true` if the entity has component `C`.
    pub fn has<C: Component>(&self) -> bool {
        self.world.has::<C>(self.id)
    }

    /// Returns a reference to the component `C` of the entity.
    pub fn get<C: Component>(&self) -> Option<&'a C> {
        self.world.get(self.id)
    }
}

/// A mutable entry of an entity in a [World].
/// Provides convenient access and structural mutation for one entity.
pub struct EntryMut<'a> {
    world: &'a mut World,
    id: EntityId,
}

impl EntryMut<'_> {
    /// Returns the underlying entity id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns `true` if the entity has component `C`.
    pub fn has<C: Component>(&self) -> bool {
        self.world.has::<C>(self.id)
    }

    /// Returns a reference to the component `C` of the entity.
    pub fn get<C: Component>(&self) -> Option<&C> {
        self.world.get(self.id)
    }

    /// Returns a mutable reference to the component `C` of the entity.
    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.world.get_mut(self.id)
    }

    /// Attaches `value` to the entity as component `C`.
    /// Panics if the entity already has `C`.
    pub fn add<C: Component>(&mut self, value: C) -> &mut C {
        self.world.add(self.id, value)
    }

    /// Detaches component `C` from the entity and returns it.
    /// Panics if the entity has no `C`.
    pub fn remove<C: Component>(&mut self) -> C {
        self.world.remove(self.id)
    }

    /// Creates a new entity carrying a copy of every component of this one.
    pub fn duplicate(&mut self) -> EntityId {
        self.world.duplicate_entity(self.id)
    }

    /// Deletes the entity and all its components.
    pub fn destroy(self) {
        self.world.delete_entity(self.id);
    }
}

impl World {
    /// Returns an immutable entry of the specified entity.
    pub fn entry(&self, id: EntityId) -> Option<Entry> {
        self.is_valid(id).then(|| Entry { world: self, id })
    }

    /// Returns a mutable entry of the specified entity.
    pub fn entry_mut(&mut self, id: EntityId) -> Option<EntryMut> {
        self.is_valid(id).then(move || EntryMut { world: self, id })
    }
}
