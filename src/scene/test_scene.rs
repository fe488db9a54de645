use glam::Vec3;
use hecs::World;

use crate::config::SimConfig;
use crate::error::RailError;
use crate::rail::{ArcRail, PolylineRail};
use crate::scene::prefabs::{
    spawn_ground, spawn_rail, spawn_ramp, spawn_skater, SkaterHandles, SKATER_RADIUS,
};

/// Which layout to build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Scenario {
    /// Flat-bar grind: roll straight onto a rail at board height.
    Rail,
    /// Roll up a ramp and get air off the lip.
    Ramp,
    /// Everything: ramp, straight rail and a curved ledge.
    #[default]
    Park,
}

/// Straight rail along +X at board height, starting at `start_x`.
fn flat_bar(start_x: f32) -> Result<PolylineRail, RailError> {
    PolylineRail::new(vec![
        Vec3::new(start_x, 0.0, SKATER_RADIUS),
        Vec3::new(start_x + 1000.0, 0.0, SKATER_RADIUS),
    ])
}

/// Build the scenario's skatepark and its skater.
pub fn load_test_scene(
    world: &mut World,
    scenario: Scenario,
    config: &SimConfig,
) -> Result<SkaterHandles, RailError> {
    spawn_ground(world);
    let start = Vec3::new(0.0, 0.0, SKATER_RADIUS);

    match scenario {
        Scenario::Rail => {
            spawn_rail(world, flat_bar(150.0)?);
        }
        Scenario::Ramp => {
            spawn_ramp(world, Vec3::new(400.0, 0.0, 0.0), 300.0, 400.0, 25.0);
        }
        Scenario::Park => {
            spawn_ramp(world, Vec3::new(2400.0, 0.0, 0.0), 300.0, 400.0, 25.0);
            spawn_rail(world, flat_bar(150.0)?);
            // Curved ledge off to the side of the run.
            let center = Vec3::new(0.0, 1500.0, 40.0);
            let ledge = ArcRail::new(center, 600.0, 0.0, std::f32::consts::PI)?;
            spawn_rail(world, ledge);
        }
    }

    Ok(spawn_skater(world, start, Vec3::new(600.0, 0.0, 0.0), config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Collider, Follower, SkatePhysics};
    use crate::rail::Rail;

    #[test]
    fn every_scenario_builds() {
        for scenario in [Scenario::Rail, Scenario::Ramp, Scenario::Park] {
            let mut world = World::new();
            let handles = load_test_scene(&mut world, scenario, &SimConfig::default()).unwrap();
            assert!(world.get::<&SkatePhysics>(handles.body).is_ok());
            assert!(world.get::<&Follower>(handles.follower).is_ok());
            assert!(world.query::<&Collider>().iter().count() >= 2);
        }
    }

    #[test]
    fn park_has_two_rails() {
        let mut world = World::new();
        load_test_scene(&mut world, Scenario::Park, &SimConfig::default()).unwrap();
        assert_eq!(world.query::<&Rail>().iter().count(), 2);
    }
}
