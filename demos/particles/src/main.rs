//! Particle simulation demo.
//!
//! Spawns a deterministic burst of particles, then runs a fixed-timestep
//! frame loop: movement integrates velocities, decay expires lifetimes
//! (deferred removal), and a reporter watches entities leave the decay
//! query. Prints the world's diagnostics snapshot as JSON on exit.

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use demo_components::{Frozen, Lifetime, Position, Spark, Velocity};
use weft_world::{QueryBinding, QuerySpec, System, SystemAttrs, SystemContext, SystemInit, World};

/// Command-line options for the simulation.
#[derive(Debug, Parser)]
struct Args {
    /// Number of particles to spawn.
    #[arg(long, default_value_t = 64)]
    entities: usize,

    /// Number of frames to run (0 = until all particles expire).
    #[arg(long, default_value_t = 240)]
    frames: u64,

    /// Target frames per second.
    #[arg(long, default_value_t = 60.0)]
    hz: f64,
}

/// Integrates velocities into positions for unfrozen particles.
struct Movement;

impl System for Movement {
    fn init(&mut self) -> SystemInit {
        SystemInit::new().query(QueryBinding::new(
            "moving",
            QuerySpec::new()
                .with::<Position>()
                .with::<Velocity>()
                .without::<Frozen>(),
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

/// Counts down lifetimes and removes expired particles (deferred).
struct Decay;

impl System for Decay {
    fn init(&mut self) -> SystemInit {
        SystemInit::new().query(
            QueryBinding::new("decaying", QuerySpec::new().with::<Lifetime>()).mandatory(),
        )
    }

    fn execute(&mut self, ctx: &mut SystemContext<'_>) {
        let delta = ctx.delta;
        for entity in ctx.entities("decaying") {
            let expired = match ctx.world.get_component_mut::<Lifetime>(entity) {
                Some(lifetime) => {
                    lifetime.remaining -= delta;
                    lifetime.expired()
                }
                None => false,
            };
            if expired {
                // Deferred: the entity leaves every query now, its records
                // are reclaimed at frame end.
                let _ = ctx.world.remove_entity(entity, false);
            }
        }
    }
}

/// Logs entities leaving the decay query.
struct Reporter;

impl System for Reporter {
    fn init(&mut self) -> SystemInit {
        SystemInit::new().query(
            QueryBinding::new("decaying", QuerySpec::new().with::<Lifetime>()).on_removed(),
        )
    }

    fn execute(&mut self, ctx: &mut SystemContext<'_>) {
        let expired = ctx.removed("decaying");
        if !expired.is_empty() {
            info!(count = expired.len(), "particles expired");
        }
    }
}

fn spawn_burst(world: &mut World, count: usize) {
    for i in 0..count {
        let angle = i as f32 * 0.39;
        let speed = 2.0 + (i % 7) as f32;
        let entity = world.create_entity();
        world.add_component(entity, Position::new(0.0, 0.0));
        world.add_component(
            entity,
            Velocity::new(angle.cos() * speed, angle.sin() * speed),
        );
        world.add_component(entity, Lifetime::seconds(1.0 + (i % 5) as f32 * 0.5));
        world.add_component(entity, Spark::default());
        if i % 11 == 0 {
            world.add_component(entity, Frozen);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("demo_particles=info".parse()?))
        .init();

    let args = Args::parse();
    info!(
        entities = args.entities,
        frames = args.frames,
        hz = args.hz,
        "particle simulation starting"
    );

    let mut world = World::new();
    world.register_system_with(Movement, SystemAttrs { priority: 0 })?;
    world.register_system_with(Decay, SystemAttrs { priority: 1 })?;
    world.register_system_with(Reporter, SystemAttrs { priority: 10 })?;

    spawn_burst(&mut world, args.entities);

    let frame_budget = Duration::from_secs_f64(1.0 / args.hz);
    let delta = frame_budget.as_secs_f32();
    let mut time = 0.0f32;
    let mut frame = 0u64;

    while world.entity_count() > 0 {
        if args.frames > 0 && frame >= args.frames {
            break;
        }
        let started = Instant::now();

        time += delta;
        frame += 1;
        world.execute(delta, time);

        let elapsed = started.elapsed();
        if elapsed < frame_budget {
            std::thread::sleep(frame_budget - elapsed);
        } else {
            warn!(
                frame,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = frame_budget.as_millis() as u64,
                "frame exceeded time budget"
            );
        }
    }

    info!(frame, survivors = world.entity_count(), "simulation complete");
    println!("{}", serde_json::to_string_pretty(&world.stats().to_json())?);
    Ok(())
}
