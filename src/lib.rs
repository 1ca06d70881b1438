//! An archetype-based container for entity component data.
//!
//! An entity is an opaque identifier for an object. Each entity carries an
//! arbitrary set of components; all entities sharing the same exact set are
//! stored together in an archetype, one contiguous column per component
//! type, which keeps bulk iteration cache-friendly. Attaching or detaching
//! a component migrates the entity between archetypes; views stream over
//! every archetype containing a requested set of component types.
//!
//! Any `Clone + 'static` type is a component. The storage engine never
//! inspects component contents: construction, relocation and destruction
//! go through per-type operations resolved once on first use.
//!
//! The world is strictly single-threaded: all operations run to completion
//! on the calling thread, and component references obtained from it follow
//! the usual borrow rules.
//!
//! # Examples
//!
//! ```
//! use entity_world::World;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Position {
//!     x: f32,
//!     y: f32,
//! }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Velocity {
//!     x: f32,
//!     y: f32,
//! }
//!
//! let mut world = World::new();
//!
//! let player = world.new_entity();
//! world.add(player, Position { x: 0.0, y: 0.0 });
//! world.add(player, Velocity { x: 1.0, y: 2.0 });
//!
//! let scenery = world.new_entity();
//! world.add(scenery, Position { x: 5.0, y: 5.0 });
//!
//! world.view_mut::<(Position, Velocity)>().for_each(|_entity, (pos, vel)| {
//!     pos.x += vel.x;
//!     pos.y += vel.y;
//! });
//!
//! assert_eq!(world.get::<Position>(player), Some(&Position { x: 1.0, y: 2.0 }));
//! assert_eq!(world.get::<Position>(scenery), Some(&Position { x: 5.0, y: 5.0 }));
//!
//! world.remove::<Velocity>(player);
//! assert!(!world.has::<Velocity>(player));
//!
//! world.delete_entity(scenery);
//! assert_eq!(world.entity_count(), 1);
//! ```

#[cfg(test)]
mod tests;

mod archetype;
mod component;
mod entity;
mod entry;
mod view;
mod world;

pub use archetype::{Archetype, ArchetypeId};
pub use component::{component_id, Component, ComponentId};
pub use entity::EntityId;
pub use entry::{Entry, EntryMut};
pub use view::{View, ViewMut, ViewQuery};
pub use world::World;

pub(crate) type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
