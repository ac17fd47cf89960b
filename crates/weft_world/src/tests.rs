//! Cross-manager scenarios: query membership under churn, deferred
//! removal, scheduling order, reactive change delivery, and event
//! buffering.

use std::sync::{Arc, Mutex};

use serde_json::json;

use weft_core::{Component, Entity};

use crate::events::{COMPONENT_CHANGED, ENTITY_ADDED, ENTITY_REMOVED};
use crate::query::QuerySpec;
use crate::system::{QueryBinding, System, SystemAttrs, SystemContext, SystemInit};
use crate::world::World;
use crate::WorldError;

#[derive(Debug, Clone, Default, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Frozen;

impl Component for Frozen {
    fn type_name() -> &'static str {
        "Frozen"
    }
}

type Log = Arc<Mutex<Vec<&'static str>>>;

struct Recorder {
    name: &'static str,
    log: Log,
}

impl System for Recorder {
    fn execute(&mut self, _ctx: &mut SystemContext<'_>) {
        self.log.lock().unwrap().push(self.name);
    }
}

#[test]
fn test_add_remove_symmetry() {
    let mut world = World::new();
    let query = world
        .query_components(QuerySpec::new().with::<Position>())
        .unwrap();
    let added = world.queries.subscribe(query, ENTITY_ADDED);
    let removed = world.queries.subscribe(query, ENTITY_REMOVED);

    let entity = world.create_entity();
    assert!(world.query_entities(query).is_empty());

    world.add_component(entity, Position { x: 1.0, y: 2.0 });
    assert_eq!(world.query_entities(query), &[entity]);
    let events = world.queries.query_mut(query).dispatcher.drain(added);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity, entity);

    world.remove_component::<Position>(entity, true);
    assert!(world.query_entities(query).is_empty());
    let events = world.queries.query_mut(query).dispatcher.drain(removed);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity, entity);
}

#[test]
fn test_negated_query_membership() {
    let mut world = World::new();
    let query = world
        .query_components(QuerySpec::new().with::<Position>().without::<Frozen>())
        .unwrap();

    let e1 = world.create_entity();
    world.add_component(e1, Position::default());
    let e2 = world.create_entity();
    world.add_component(e2, Position::default());
    world.add_component(e2, Frozen);

    assert_eq!(world.query_entities(query), &[e1]);

    world.add_component(e1, Frozen);
    assert!(world.query_entities(query).is_empty());

    world.remove_component::<Frozen>(e2, true);
    assert_eq!(world.query_entities(query), &[e2]);
}

#[test]
fn test_deferred_removal_keeps_instance_until_frame_end() {
    let mut world = World::new();
    let entity = world.create_entity();
    world.add_component(entity, Position { x: 3.0, y: 4.0 });

    world.remove_component::<Position>(entity, false);

    assert!(!world.has_component::<Position>(entity));
    let staged = world.get_removed_component::<Position>(entity).unwrap();
    assert_eq!(*staged, Position { x: 3.0, y: 4.0 });
    let stats = world.stats();
    assert_eq!(stats.pools["Position"].used, 1);

    world.execute(0.016, 0.016);

    assert!(world.get_removed_component::<Position>(entity).is_none());
    let stats = world.stats();
    assert_eq!(stats.pools["Position"].used, 0);
    assert_eq!(stats.pools["Position"].free, stats.pools["Position"].size);
}

#[test]
fn test_priority_order_lower_runs_first() {
    let log: Log = Arc::default();
    let mut world = World::new();
    world
        .register_system_with(
            Recorder { name: "lo", log: log.clone() },
            SystemAttrs { priority: 1 },
        )
        .unwrap();
    world
        .register_system_with(
            Recorder { name: "hi", log: log.clone() },
            SystemAttrs { priority: -1 },
        )
        .unwrap();
    world
        .register_system_with(
            Recorder { name: "mid", log: log.clone() },
            SystemAttrs { priority: 0 },
        )
        .unwrap();

    world.execute(0.016, 0.016);
    assert_eq!(*log.lock().unwrap(), vec!["hi", "mid", "lo"]);
}

#[test]
fn test_priority_ties_break_by_registration_order() {
    let log: Log = Arc::default();
    let mut world = World::new();
    world
        .register_system(Recorder { name: "first", log: log.clone() })
        .unwrap();
    world
        .register_system(Recorder { name: "second", log: log.clone() })
        .unwrap();

    world.execute(0.016, 0.016);
    world.execute(0.016, 0.032);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["first", "second", "first", "second"]
    );
}

/// Observes change events on a reactive query binding.
struct Observer {
    /// Change counts seen per frame.
    seen: Arc<Mutex<Vec<Vec<Entity>>>>,
}

impl System for Observer {
    fn init(&mut self) -> SystemInit {
        SystemInit::new().query(
            QueryBinding::new("boxes", QuerySpec::new().with::<Position>()).on_changed(),
        )
    }

    fn execute(&mut self, ctx: &mut SystemContext<'_>) {
        let entities = ctx.changed("boxes").iter().map(|(e, _)| *e).collect();
        self.seen.lock().unwrap().push(entities);
    }
}

/// Mutates one entity's position exactly once.
struct Mutator {
    target: Entity,
    done: bool,
}

impl System for Mutator {
    fn execute(&mut self, ctx: &mut SystemContext<'_>) {
        if !self.done {
            self.done = true;
            if let Some(position) = ctx.world.get_component_mut::<Position>(self.target) {
                position.x += 1.0;
            }
        }
    }
}

#[test]
fn test_reactive_change_arrives_on_next_frame_and_clears() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut world = World::new();
    let entity = world.create_entity();
    world.add_component(entity, Position::default());

    world
        .register_system_with(Observer { seen: seen.clone() }, SystemAttrs { priority: 0 })
        .unwrap();
    world
        .register_system_with(
            Mutator { target: entity, done: false },
            SystemAttrs { priority: 1 },
        )
        .unwrap();

    world.execute(0.016, 0.016); // mutation happens after the observer's turn
    world.execute(0.016, 0.032); // observer sees it now
    world.execute(0.016, 0.048); // buffer was cleared after the observer's turn

    let frames = seen.lock().unwrap();
    assert_eq!(*frames, vec![vec![], vec![entity], vec![]]);
}

#[test]
fn test_mutable_borrow_fires_only_reactive_queries() {
    let mut world = World::new();
    let reactive = world
        .query_components(QuerySpec::new().with::<Position>())
        .unwrap();
    let passive = world
        .query_components(QuerySpec::new().with::<Position>().with::<Velocity>())
        .unwrap();
    world.queries.mark_reactive(reactive);
    let reactive_listener = world.queries.subscribe(reactive, COMPONENT_CHANGED);
    let passive_listener = world.queries.subscribe(passive, COMPONENT_CHANGED);

    let entity = world.create_entity();
    world.add_component(entity, Position::default());
    world.add_component(entity, Velocity::default());

    world.get_component_mut::<Position>(entity).unwrap().x = 5.0;

    let fired = world
        .queries
        .query_mut(reactive)
        .dispatcher
        .drain(reactive_listener);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].entity, entity);
    assert!(
        world
            .queries
            .query_mut(passive)
            .dispatcher
            .drain(passive_listener)
            .is_empty()
    );
}

/// Records, per executed frame, how many entities arrived on its
/// `boxes` binding; gated on a mandatory `gate` binding.
struct Gated {
    executions: Arc<Mutex<Vec<usize>>>,
}

impl System for Gated {
    fn init(&mut self) -> SystemInit {
        SystemInit::new()
            .query(QueryBinding::new("boxes", QuerySpec::new().with::<Position>()).on_added())
            .query(QueryBinding::new("gate", QuerySpec::new().with::<Velocity>()).mandatory())
    }

    fn execute(&mut self, ctx: &mut SystemContext<'_>) {
        self.executions
            .lock()
            .unwrap()
            .push(ctx.added("boxes").len());
    }
}

#[test]
fn test_mandatory_query_gates_but_still_clears_events() {
    let executions = Arc::new(Mutex::new(Vec::new()));
    let mut world = World::new();
    world
        .register_system(Gated { executions: executions.clone() })
        .unwrap();

    let e1 = world.create_entity();
    world.add_component(e1, Position::default());
    world.execute(0.016, 0.016); // gate empty: skipped, buffers cleared

    let e2 = world.create_entity();
    world.add_component(e2, Velocity::default());
    world.execute(0.016, 0.032); // gate holds e2: runs

    // The system ran exactly once, and e1's buffered arrival had been
    // cleared during the skipped frame.
    assert_eq!(*executions.lock().unwrap(), vec![0]);
}

/// Collects position-only change events from a two-component query.
struct FilteredObserver {
    seen: Arc<Mutex<Vec<Entity>>>,
}

impl System for FilteredObserver {
    fn init(&mut self) -> SystemInit {
        SystemInit::new().query(
            QueryBinding::new(
                "moving",
                QuerySpec::new().with::<Position>().with::<Velocity>(),
            )
            .on_component_changed::<Position>(),
        )
    }

    fn execute(&mut self, ctx: &mut SystemContext<'_>) {
        self.seen
            .lock()
            .unwrap()
            .extend(ctx.changed("moving").iter().map(|(e, _)| *e));
    }
}

struct DualMutator {
    target: Entity,
    done: bool,
}

impl System for DualMutator {
    fn execute(&mut self, ctx: &mut SystemContext<'_>) {
        if !self.done {
            self.done = true;
            ctx.world.get_component_mut::<Velocity>(self.target).unwrap().dx = 1.0;
            ctx.world.get_component_mut::<Position>(self.target).unwrap().x = 1.0;
        }
    }
}

#[test]
fn test_component_changed_filter_drops_other_types() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut world = World::new();
    let entity = world.create_entity();
    world.add_component(entity, Position::default());
    world.add_component(entity, Velocity::default());

    world
        .register_system_with(
            FilteredObserver { seen: seen.clone() },
            SystemAttrs { priority: 0 },
        )
        .unwrap();
    world
        .register_system_with(
            DualMutator { target: entity, done: false },
            SystemAttrs { priority: 1 },
        )
        .unwrap();

    world.execute(0.016, 0.016);
    world.execute(0.016, 0.032);

    // Both borrows fired change events; only the position one survived the
    // allow-list.
    assert_eq!(*seen.lock().unwrap(), vec![entity]);
}

/// Buffers a named world event.
struct Collector {
    payloads: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl System for Collector {
    fn init(&mut self) -> SystemInit {
        SystemInit::new().event("collisions", "collision")
    }

    fn execute(&mut self, ctx: &mut SystemContext<'_>) {
        self.payloads
            .lock()
            .unwrap()
            .extend(ctx.events("collisions").iter().cloned());
    }
}

#[test]
fn test_world_event_binding_buffers_until_turn() {
    let payloads = Arc::new(Mutex::new(Vec::new()));
    let mut world = World::new();
    world
        .register_system(Collector { payloads: payloads.clone() })
        .unwrap();

    world.emit_event("collision", json!({ "a": 1, "b": 2 }));
    world.execute(0.016, 0.016);
    world.execute(0.016, 0.032);

    let collected = payloads.lock().unwrap();
    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0], json!({ "a": 1, "b": 2 }));
}

#[test]
fn test_manual_event_listener_roundtrip() {
    let mut world = World::new();
    let listener = world.add_event_listener("scored");
    world.emit_event("scored", json!(10));
    world.emit_event("missed", json!(0));
    assert_eq!(world.take_events(listener), vec![json!(10)]);
    assert!(world.take_events(listener).is_empty());
    assert!(world.remove_event_listener(listener));
}

#[test]
fn test_query_objects_are_deduplicated() {
    let mut world = World::new();
    let a = world
        .query_components(QuerySpec::new().with::<Position>().with::<Velocity>())
        .unwrap();
    let b = world
        .query_components(QuerySpec::new().with::<Velocity>().with::<Position>())
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(world.queries.len(), 1);
}

#[test]
fn test_new_query_seeds_from_live_entities_without_events() {
    let mut world = World::new();
    let e1 = world.create_entity();
    world.add_component(e1, Position::default());
    let e2 = world.create_entity();
    world.add_component(e2, Position::default());
    world.add_component(e2, Frozen);

    let query = world
        .query_components(QuerySpec::new().with::<Position>().without::<Frozen>())
        .unwrap();
    assert_eq!(world.query_entities(query), &[e1]);
    // Seeding fired nothing.
    assert_eq!(world.queries.query(query).dispatcher.counters().fired, 0);
}

#[test]
fn test_removing_unknown_entity_is_a_contract_violation() {
    let mut world = World::new();
    let stale = Entity::from_raw(404);
    assert_eq!(
        world.remove_entity(stale, false),
        Err(WorldError::EntityNotFound(stale))
    );
}

#[test]
fn test_stop_and_play_gate_frames() {
    let log: Log = Arc::default();
    let mut world = World::new();
    world
        .register_system(Recorder { name: "tick", log: log.clone() })
        .unwrap();

    world.stop();
    world.execute(0.016, 0.016);
    assert!(log.lock().unwrap().is_empty());

    world.play();
    world.execute(0.016, 0.032);
    assert_eq!(*log.lock().unwrap(), vec!["tick"]);
}

#[test]
fn test_remove_system_by_type() {
    let log: Log = Arc::default();
    let mut world = World::new();
    world
        .register_system(Recorder { name: "tick", log: log.clone() })
        .unwrap();

    assert!(world.remove_system::<Recorder>());
    assert!(!world.remove_system::<Recorder>());
    world.execute(0.016, 0.016);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_get_system_and_toggle() {
    let log: Log = Arc::default();
    let mut world = World::new();
    world
        .register_system(Recorder { name: "tick", log: log.clone() })
        .unwrap();

    assert!(world.get_system::<Recorder>().is_some());
    assert_eq!(world.get_systems().count(), 1);

    assert!(world.set_system_enabled::<Recorder>(false));
    world.execute(0.016, 0.016);
    assert!(log.lock().unwrap().is_empty());

    assert!(world.set_system_enabled::<Recorder>(true));
    world.execute(0.016, 0.032);
    assert_eq!(*log.lock().unwrap(), vec!["tick"]);
}

/// Registers a fresh recorder from inside its own execute.
struct Bootstrapper {
    log: Log,
    done: bool,
}

impl System for Bootstrapper {
    fn execute(&mut self, ctx: &mut SystemContext<'_>) {
        if !self.done {
            self.done = true;
            ctx.world
                .register_system(Recorder { name: "inner", log: self.log.clone() })
                .unwrap();
        }
    }
}

#[test]
fn test_system_registered_mid_frame_runs_next_frame() {
    let log: Log = Arc::default();
    let mut world = World::new();
    world
        .register_system(Bootstrapper { log: log.clone(), done: false })
        .unwrap();

    world.execute(0.016, 0.016);
    assert!(log.lock().unwrap().is_empty());
    world.execute(0.016, 0.032);
    assert_eq!(*log.lock().unwrap(), vec!["inner"]);
}

/// Checks membership and back-edge integrity for a known set of queries.
fn assert_index_consistent(world: &World, queries: &[(crate::QueryId, fn(&World, Entity) -> bool)]) {
    for &(id, predicate) in queries {
        let matched = world.query_entities(id);
        for &entity in world.entities() {
            let expected = predicate(world, entity);
            let actual = matched.contains(&entity);
            assert_eq!(
                expected, actual,
                "membership mismatch for {entity} in query {:?}",
                id
            );
        }
        for &entity in matched {
            let record = world.entities.record(entity).unwrap();
            let edges = record.queries.iter().filter(|q| **q == id).count();
            assert_eq!(edges, 1, "back-edge count for {entity} in query {:?}", id);
        }
    }
}

#[test]
fn test_index_stays_consistent_under_churn() {
    let mut world = World::new();
    let q_pos = world
        .query_components(QuerySpec::new().with::<Position>())
        .unwrap();
    let q_both = world
        .query_components(QuerySpec::new().with::<Position>().with::<Velocity>())
        .unwrap();
    let q_thawed = world
        .query_components(QuerySpec::new().with::<Position>().without::<Frozen>())
        .unwrap();

    let checks: Vec<(crate::QueryId, fn(&World, Entity) -> bool)> = vec![
        (q_pos, |w, e| w.has_component::<Position>(e)),
        (q_both, |w, e| {
            w.has_component::<Position>(e) && w.has_component::<Velocity>(e)
        }),
        (q_thawed, |w, e| {
            w.has_component::<Position>(e) && !w.has_component::<Frozen>(e)
        }),
    ];

    let entities: Vec<Entity> = (0..5).map(|_| world.create_entity()).collect();
    for (i, &entity) in entities.iter().enumerate() {
        world.add_component(entity, Position::default());
        if i % 2 == 0 {
            world.add_component(entity, Velocity::default());
        }
        if i % 3 == 0 {
            world.add_component(entity, Frozen);
        }
    }
    assert_index_consistent(&world, &checks);

    world.remove_component::<Velocity>(entities[0], false);
    world.remove_component::<Frozen>(entities[3], true);
    world.add_component(entities[1], Frozen);
    assert_index_consistent(&world, &checks);

    world.remove_entity(entities[2], false).unwrap();
    world.remove_entity(entities[4], true).unwrap();
    world.execute(0.016, 0.016);
    assert_index_consistent(&world, &checks);

    // Churn again after the commit to catch staged-state leaks.
    let fresh = world.create_entity();
    world.add_component(fresh, Position::default());
    world.add_component(fresh, Velocity::default());
    world.remove_component::<Position>(fresh, false);
    assert_index_consistent(&world, &checks);
    world.execute(0.016, 0.032);
    assert_index_consistent(&world, &checks);
}

#[test]
fn test_stats_snapshot_shape() {
    let log: Log = Arc::default();
    let mut world = World::new();
    let entity = world.create_entity();
    world.add_component(entity, Position::default());
    world
        .query_components(QuerySpec::new().with::<Position>())
        .unwrap();
    world
        .register_system(Recorder { name: "tick", log })
        .unwrap();
    world.execute(0.016, 0.016);

    let stats = world.stats();
    assert_eq!(stats.entities, 1);
    assert_eq!(stats.queries["position"].num_entities, 1);
    assert_eq!(stats.queries["position"].num_components, 1);
    assert_eq!(stats.pools["Position"].used, 1);
    assert_eq!(stats.systems.len(), 1);
    assert!(stats.events.lifecycle.fired > 0);
    assert!(stats.to_json().is_object());

    world.reset_event_counters();
    let stats = world.stats();
    assert_eq!(stats.events.lifecycle.fired, 0);
    assert_eq!(stats.events.world.fired, 0);
}
