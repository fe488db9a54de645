use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use hecs::World;
use log::info;

use grindline::components::{Follower, LocalTransform, PhysicsBody, SkatePhysics};
use grindline::config::SimConfig;
use grindline::engine::time::FrameClock;
use grindline::scene::prefabs::SkaterHandles;
use grindline::scene::test_scene::{load_test_scene, Scenario};
use grindline::systems::{
    follower_system, physics_step, report_detached_followers, skate_physics_system, SkateInput,
    WorldSurfaces, PHYSICS_DT,
};

#[derive(Parser)]
#[command(name = "grindline", about = "Headless skateboard locomotion runner")]
struct Args {
    /// Frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u64,
    /// Fixed frame step, seconds
    #[arg(long, default_value_t = PHYSICS_DT)]
    dt: f32,
    /// RON tuning file; defaults are used for anything it leaves out
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Scenario::Park)]
    scenario: Scenario,
    /// Log the skater state every N frames (0 disables)
    #[arg(long, default_value_t = 30)]
    report_every: u64,
}

/// Canned intents standing in for a player.
fn scripted_input(frame: u64) -> SkateInput {
    match frame {
        10 => SkateInput::pump(),
        90 => SkateInput::ollie(),
        200..=229 => SkateInput::lean(0.5),
        230 => SkateInput::release_lean(),
        _ => SkateInput::default(),
    }
}

fn report(world: &World, skater: &SkaterHandles, clock: &FrameClock) {
    let position = world
        .get::<&LocalTransform>(skater.body)
        .map(|t| t.position)
        .unwrap_or_default();
    let speed = world
        .get::<&PhysicsBody>(skater.body)
        .map(|b| b.velocity.length())
        .unwrap_or_default();
    let mode = world
        .get::<&SkatePhysics>(skater.body)
        .map(|s| s.current_mode())
        .unwrap_or_default();
    let grounded = world
        .get::<&Follower>(skater.follower)
        .map(|f| f.grounded)
        .unwrap_or(false);
    info!(
        "t={:.2}s frame={} mode={:?} grounded={} pos=({:.0}, {:.0}, {:.0}) speed={:.0}",
        clock.elapsed, clock.frame, mode, grounded, position.x, position.y, position.z, speed
    );
}

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !(args.dt > 0.0 && args.dt.is_finite()) {
        bail!("--dt must be a positive number of seconds, got {}", args.dt);
    }

    let config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading tuning from {}", path.display()))?,
        None => SimConfig::default(),
    };

    let mut world = World::new();
    let skater = load_test_scene(&mut world, args.scenario, &config)
        .context("building the skatepark")?;
    report_detached_followers(&world);
    info!(
        "scenario {:?}: {} frames at {:.4}s",
        args.scenario, args.frames, args.dt
    );

    let mut clock = FrameClock::new(args.dt);
    while clock.frame < args.frames {
        let input = scripted_input(clock.frame);
        {
            let surfaces = WorldSurfaces::new(&world);
            follower_system(&world, &surfaces, &input, clock.dt);
            skate_physics_system(&world, &surfaces, clock.dt);
        }
        physics_step(&mut world, clock.dt);
        clock.tick();

        if clock.every(args.report_every) {
            report(&world, &skater, &clock);
        }
    }

    let landings = world
        .get::<&Follower>(skater.follower)
        .map(|f| f.landings)
        .unwrap_or(0);
    let elapsed = clock.elapsed;
    info!("done after {elapsed:.2}s simulated, {landings} landings");
    Ok(())
}
