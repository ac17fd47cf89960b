use criterion::{Criterion, black_box, criterion_group, criterion_main};

use weft_core::Component;
use weft_world::{QueryBinding, QuerySpec, System, SystemContext, SystemInit, World};

#[derive(Debug, Clone, Copy, Default)]
struct Position {
    x: f32,
    y: f32,
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

#[derive(Debug, Clone, Copy, Default)]
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
struct Shadow;

impl Component for Shadow {
    fn type_name() -> &'static str {
        "Shadow"
    }
}

struct Movement;

impl System for Movement {
    fn init(&mut self) -> SystemInit {
        SystemInit::new().query(QueryBinding::new(
            "moving",
            QuerySpec::new().with::<Position>().with::<Velocity>(),
        ))
    }

    fn execute(&mut self, ctx: &mut SystemContext<'_>) {
        let delta = ctx.delta;
        for entity in ctx.entities("moving") {
            let Some(velocity) = ctx.world.get_component::<Velocity>(entity).copied() else {
                continue;
            };
            if let Some(position) = ctx.world.get_component_mut::<Position>(entity) {
                position.x += velocity.dx * delta;
                position.y += velocity.dy * delta;
            }
        }
    }
}

fn seeded_world(entities: u64) -> World {
    let mut world = World::new();
    world.register_system(Movement).unwrap();
    for i in 0..entities {
        let entity = world.create_entity();
        world.add_component(entity, Position::default());
        if i % 2 == 0 {
            world.add_component(entity, Velocity { dx: 1.0, dy: 0.5 });
        }
    }
    world
}

fn bench_spawn(c: &mut Criterion) {
    c.bench_function("spawn 1k entities with two components", |b| {
        b.iter(|| {
            let world = seeded_world(1_000);
            black_box(world.entity_count());
        });
    });
}

fn bench_frame_with_churn(c: &mut Criterion) {
    let mut world = seeded_world(10_000);
    c.bench_function("frame over 10k entities with shadow churn", |b| {
        let mut time = 0.0f32;
        b.iter(|| {
            // Toggle a component on a slice of entities so queries reindex
            // every frame.
            let targets: Vec<_> = world.entities().iter().copied().take(100).collect();
            for &entity in &targets {
                world.add_component(entity, Shadow);
            }
            for &entity in &targets {
                world.remove_component::<Shadow>(entity, false);
            }
            time += 0.016;
            world.execute(0.016, time);
            black_box(world.entity_count());
        });
    });
}

criterion_group!(benches, bench_spawn, bench_frame_with_churn);
criterion_main!(benches);
