// tether_sim/src/simulation/plugins/world.rs

use nalgebra::Point3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::prelude::*;
use crate::simulation::config::structs::{SurfaceConfig, WorldConfig};
use crate::simulation::core::prng::SimulationRng;

/// A ground-truth horizontal surface of the simulated room.
#[derive(Component, Debug, Clone)]
pub struct GroundTruthSurface {
    pub size: [f64; 2],
}

/// The feature-point cloud the session reconstructs while tracking.
#[derive(Resource, Debug, Default, Clone)]
pub struct WorldFeatures(pub Vec<Point3<f64>>);

pub struct WorldSpawnerPlugin;

impl Plugin for WorldSpawnerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WorldFeatures>().add_systems(
            OnEnter(AppState::SceneBuilding),
            spawn_world.in_set(SceneBuildSet::World),
        );
    }
}

fn spawn_world(
    mut commands: Commands,
    config: Res<ScenarioConfig>,
    mut rng: ResMut<SimulationRng>,
    mut features: ResMut<WorldFeatures>,
) {
    for surface in &config.world.surfaces {
        let [x, y, z] = surface.center;
        info!(
            "[WORLD] Spawning surface '{}' at ({:.2}, {:.2}, {:.2}), {:.2} x {:.2} m",
            surface.name, x, y, z, surface.size[0], surface.size[1]
        );
        commands.spawn((
            Name::new(surface.name.clone()),
            GroundTruthSurface { size: surface.size },
            bevy::prelude::Transform::from_xyz(x as f32, y as f32, z as f32),
        ));
    }

    features.0 = sample_features(&config.world, &mut rng.0);
    info!("[WORLD] Sampled {} feature points", features.0.len());
}

/// Scatters feature points uniformly over every surface, with vertical noise.
pub fn sample_features(world: &WorldConfig, rng: &mut impl Rng) -> Vec<Point3<f64>> {
    let noise = match Normal::new(0.0, world.feature_noise_stddev) {
        Ok(noise) => noise,
        Err(e) => {
            warn!("Invalid feature noise ({}), sampling without noise", e);
            return sample_with(world, rng, |_| 0.0);
        }
    };
    sample_with(world, rng, |rng| noise.sample(rng))
}

fn sample_with<R: Rng>(
    world: &WorldConfig,
    rng: &mut R,
    mut vertical_noise: impl FnMut(&mut R) -> f64,
) -> Vec<Point3<f64>> {
    let mut points = Vec::with_capacity(world.surfaces.len() * world.features_per_surface);
    for SurfaceConfig { center, size, .. } in &world.surfaces {
        let [half_w, half_d] = [size[0] / 2.0, size[1] / 2.0];
        for _ in 0..world.features_per_surface {
            let dx = if half_w > 0.0 { rng.gen_range(-half_w..=half_w) } else { 0.0 };
            let dz = if half_d > 0.0 { rng.gen_range(-half_d..=half_d) } else { 0.0 };
            let dy = vertical_noise(rng);
            points.push(Point3::new(center[0] + dx, center[1] + dy, center[2] + dz));
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn features_stay_on_their_surface() {
        let world = WorldConfig {
            surfaces: vec![SurfaceConfig {
                name: "table".into(),
                center: [0.0, 0.75, -1.0],
                size: [1.0, 0.5],
            }],
            features_per_surface: 64,
            feature_noise_stddev: 0.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let points = sample_features(&world, &mut rng);

        assert_eq!(points.len(), 64);
        assert!(points.iter().all(|p| p.y == 0.75));
        assert!(points.iter().all(|p| p.x.abs() <= 0.5 && (p.z + 1.0).abs() <= 0.25));

        let again = sample_features(&world, &mut ChaCha8Rng::seed_from_u64(11));
        assert_eq!(points, again);
    }
}
