use crate::World;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Eq, PartialEq)]
struct Comp1 {
    a: u32,
    b: [u32; 4],
}

impl Comp1 {
    fn new() -> Self {
        let mut rng = rand::thread_rng();
        Comp1 {
            a: rng.gen(),
            b: [rng.gen(), rng.gen(), rng.gen(), rng.gen()],
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct Comp2 {
    a: Vec<Comp1>,
    b: [usize; 16],
}

impl Comp2 {
    fn new() -> Self {
        let mut rng = rand::thread_rng();

        let a: Vec<Comp1> = (0..rng.gen_range(0..16)).map(|_| Comp1::new()).collect();
        let b: Vec<usize> = (0..16).map(|_| rng.gen()).collect();

        Comp2 {
            a,
            b: b.try_into().unwrap(),
        }
    }
}

/// Counts live instances across clones, moves and drops.
struct Tracked {
    live: Arc<AtomicUsize>,
    payload: u64,
}

impl Tracked {
    fn new(live: &Arc<AtomicUsize>, payload: u64) -> Self {
        live.fetch_add(1, Ordering::Relaxed);
        Tracked {
            live: live.clone(),
            payload,
        }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        Tracked::new(&self.live, self.payload)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn counts_follow_creation_and_deletion() {
    let mut world = World::new();
    let mut rng = rand::thread_rng();
    let mut alive = Vec::new();
    let mut created = 0usize;
    let mut deleted = 0usize;

    for _ in 0..200 {
        if alive.is_empty() || rng.gen_bool(0.6) {
            alive.push(world.new_entity());
            created += 1;
        } else {
            let id = alive.swap_remove(rng.gen_range(0..alive.len()));
            world.delete_entity(id);
            deleted += 1;
        }
        assert_eq!(world.entity_count(), created - deleted);
    }
}

#[test]
fn deleted_ids_are_reused_before_the_id_space_grows() {
    let mut world = World::new();
    let ids: Vec<_> = (0..5).map(|_| world.new_entity()).collect();

    world.delete_entity(ids[1]);
    world.delete_entity(ids[3]);
    assert!(!world.is_valid(ids[1]));
    assert!(!world.is_valid(ids[3]));

    let a = world.new_entity();
    let b = world.new_entity();
    assert!([ids[1], ids[3]].contains(&a));
    assert!([ids[1], ids[3]].contains(&b));
    assert_ne!(a, b);

    // Only once the freed ids are exhausted does the id space grow.
    assert_eq!(world.new_entity().to_index(), 5);
}

#[test]
fn add_remove_migration_scenario() {
    #[derive(Debug, Clone, Eq, PartialEq)]
    struct Component1 {
        value: u32,
    }
    #[derive(Debug, Clone, Eq, PartialEq)]
    struct Component2 {
        value: u32,
    }

    init_logs();
    let mut world = World::new();

    let e1 = world.new_entity();
    assert_eq!(world.entity_count(), 1);
    assert_eq!(world.archetype_count(), 0);

    world.add(e1, Component1 { value: 1 });
    assert_eq!(world.entity_count(), 1);
    assert_eq!(world.archetype_count(), 1);
    assert_eq!(world.component_count(), 1);
    assert_eq!(world.get::<Component1>(e1).unwrap().value, 1);

    world.add(e1, Component2 { value: 2 });
    assert_eq!(world.archetype_count(), 2);
    assert_eq!(world.component_count(), 2);

    world.remove::<Component1>(e1);
    assert_eq!(world.archetype_count(), 3);
    assert_eq!(world.component_count(), 1);
    assert!(!world.has::<Component1>(e1));
    assert_eq!(world.get::<Component2>(e1).unwrap().value, 2);
}

#[test]
fn adding_a_component_creates_at_most_one_archetype() {
    let mut world = World::new();

    let first = world.new_entity();
    world.add(first, Comp1::new());
    assert_eq!(world.archetype_count(), 1);

    // The target archetype already exists for the second entity.
    let second = world.new_entity();
    let archetypes = world.archetype_count();
    let components = world.component_count();
    world.add(second, Comp1::new());
    assert_eq!(world.archetype_count(), archetypes);
    assert_eq!(world.component_count(), components + 1);
}

#[test]
fn values_round_trip_across_migrations() {
    let mut world = World::new();
    let e = world.new_entity();

    let c1 = Comp1::new();
    let c2 = Comp2::new();
    world.add(e, c1.clone());
    world.add(e, c2.clone());

    let removed = world.remove::<Comp1>(e);
    assert_eq!(removed, c1);
    world.add(e, removed);

    assert_eq!(world.get::<Comp1>(e), Some(&c1));
    assert_eq!(world.get::<Comp2>(e), Some(&c2));
}

#[test]
fn deletion_preserves_siblings() {
    let mut world = World::new();
    let mut expected = Vec::new();

    for _ in 0..8 {
        let value = Comp1::new();
        let id = world.new_entity();
        world.add(id, value.clone());
        expected.push((id, value));
    }

    // Deleting a non-last slot backfills it with the archetype's last one.
    let (deleted, _) = expected.remove(3);
    world.delete_entity(deleted);

    for (id, value) in &expected {
        assert_eq!(world.get::<Comp1>(*id), Some(value));
    }
}

#[test]
fn views_match_supersets() {
    let mut world = World::new();

    let with1 = world.new_entity();
    world.add(with1, Comp1::new());

    let only2 = world.new_entity();
    world.add(only2, Comp2::new());

    let with_both = world.new_entity();
    world.add(with_both, Comp1::new());
    world.add(with_both, Comp2::new());

    let view = world.view::<(Comp1,)>();
    assert_eq!(view.count(), 2);

    let mut seen = Vec::new();
    view.for_each(|entity, (_c1,)| seen.push(entity));
    seen.sort_unstable();
    let mut expected = vec![with1, with_both];
    expected.sort_unstable();
    assert_eq!(seen, expected);

    assert_eq!(world.view::<(Comp1, Comp2)>().count(), 1);
}

#[test]
fn matching_is_monotonic_under_addition() {
    let mut world = World::new();
    let e = world.new_entity();
    world.add(e, Comp1::new());
    assert_eq!(world.view::<(Comp1,)>().count(), 1);

    // Gaining a component never loses an already-satisfied predicate.
    world.add(e, Comp2::new());
    assert_eq!(world.view::<(Comp1,)>().count(), 1);
    assert_eq!(world.view::<(Comp1, Comp2)>().count(), 1);
}

#[test]
fn mutable_views_write_through() {
    #[derive(Debug, Clone, Eq, PartialEq)]
    struct Counter {
        value: u64,
    }

    let mut world = World::new();
    let ids: Vec<_> = (0u64..4)
        .map(|i| {
            let id = world.new_entity();
            world.add(id, Counter { value: i });
            id
        })
        .collect();

    world
        .view_mut::<(Counter,)>()
        .for_each(|_, (counter,)| counter.value += 100);

    for (i, id) in ids.iter().enumerate() {
        assert_eq!(world.get::<Counter>(*id).unwrap().value, i as u64 + 100);
    }
}

#[test]
fn first_stops_at_a_single_match() {
    #[derive(Debug, Clone, Eq, PartialEq)]
    struct ActiveCamera {
        fov: u32,
    }

    let mut world = World::new();
    assert!(!world.view::<(ActiveCamera,)>().first(|_, _| {}));

    let camera = world.new_entity();
    world.add(camera, ActiveCamera { fov: 60 });
    let _ = world.new_entity();

    let mut found = None;
    let view = world.view::<(ActiveCamera,)>();
    assert!(view.first(|entity, (cam,)| found = Some((entity, cam.fov))));
    assert_eq!(found, Some((camera, 60)));
}

#[test]
fn migration_does_not_leak_or_double_drop() {
    init_logs();
    let live = Arc::new(AtomicUsize::new(0));
    let mut world = World::new();

    let e = world.new_entity();
    world.add(e, Tracked::new(&live, 7));
    world.add(e, Comp1::new());
    world.add(e, Comp2::new());
    assert_eq!(live.load(Ordering::Relaxed), 1);
    assert_eq!(world.get::<Tracked>(e).unwrap().payload, 7);

    let value = world.remove::<Tracked>(e);
    assert_eq!(live.load(Ordering::Relaxed), 1);
    drop(value);
    assert_eq!(live.load(Ordering::Relaxed), 0);

    world.add(e, Tracked::new(&live, 8));
    world.delete_entity(e);
    assert_eq!(live.load(Ordering::Relaxed), 0);
}

#[test]
fn world_teardown_releases_components() {
    let live = Arc::new(AtomicUsize::new(0));
    let mut world = World::new();

    for i in 0..10 {
        let id = world.new_entity();
        world.add(id, Tracked::new(&live, i));
        if i % 2 == 0 {
            world.add(id, Comp1::new());
        }
    }
    assert_eq!(live.load(Ordering::Relaxed), 10);

    drop(world);
    assert_eq!(live.load(Ordering::Relaxed), 0);
}

#[test]
fn duplicate_entity_copies_components() {
    let mut world = World::new();
    let source = world.new_entity();
    let c1 = Comp1::new();
    let c2 = Comp2::new();
    world.add(source, c1.clone());
    world.add(source, c2.clone());

    let copy = world.duplicate_entity(source);
    assert_ne!(source, copy);
    assert_eq!(world.entity_count(), 2);
    assert_eq!(world.get::<Comp1>(copy), Some(&c1));
    assert_eq!(world.get::<Comp2>(copy), Some(&c2));

    // The copy is independent of the source.
    world.get_mut::<Comp1>(copy).unwrap().a ^= 1;
    assert_eq!(world.get::<Comp1>(source), Some(&c1));
}

#[test]
fn zero_sized_components() {
    #[derive(Debug, Clone, Eq, PartialEq)]
    struct Hidden;

    let mut world = World::new();
    let a = world.new_entity();
    let b = world.new_entity();
    world.add(a, Hidden);
    world.add(a, Comp1::new());
    world.add(b, Comp1::new());

    assert!(world.has::<Hidden>(a));
    assert!(!world.has::<Hidden>(b));
    assert_eq!(world.view::<(Hidden,)>().count(), 1);
    assert_eq!(world.remove::<Hidden>(a), Hidden);
    assert!(!world.has::<Hidden>(a));
}

#[test]
fn entries_delegate_to_the_world() {
    let mut world = World::new();
    let id = world.new_entity();

    let c1 = Comp1::new();
    let mut entry = world.entry_mut(id).unwrap();
    entry.add(c1.clone());
    assert!(entry.has::<Comp1>());
    assert_eq!(entry.get::<Comp1>(), Some(&c1));
    entry.get_mut::<Comp1>().unwrap().a = 42;

    let entry = world.entry(id).unwrap();
    assert_eq!(entry.get::<Comp1>().unwrap().a, 42);

    world.entry_mut(id).unwrap().destroy();
    assert!(world.entry(id).is_none());
    assert!(!world.is_valid(id));
}

#[test]
fn clear_retains_archetypes() {
    let mut world = World::new();
    for _ in 0..4 {
        let id = world.new_entity();
        world.add(id, Comp1::new());
    }
    let archetypes = world.archetype_count();

    world.clear();
    assert_eq!(world.entity_count(), 0);
    assert_eq!(world.component_count(), 0);
    assert_eq!(world.archetype_count(), archetypes);

    // Ids restart from the bottom after a clear.
    assert_eq!(world.new_entity().to_index(), 0);
}

#[test]
#[should_panic(expected = "invalid entity id")]
fn deleting_twice_panics() {
    let mut world = World::new();
    let id = world.new_entity();
    world.delete_entity(id);
    world.delete_entity(id);
}

#[test]
#[should_panic(expected = "already present")]
fn double_add_panics() {
    let mut world = World::new();
    let id = world.new_entity();
    world.add(id, 1u32);
    world.add(id, 2u32);
}

#[test]
#[should_panic(expected = "not present")]
fn removing_an_absent_component_panics() {
    let mut world = World::new();
    let id = world.new_entity();
    let _ = world.remove::<Comp1>(id);
}
