// ECS systems for updating the scene
// Systems operate on entities with specific component combinations

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::Rng;

use super::components::*;
use super::debug::DebugRecords;
use super::spider::{Creature, Leg};
use super::terrain::Terrain;

/// Number of cubes drawn along each leg between hip and foot.
const BONE_SAMPLES: usize = 6;

/// How far above the hip/foot midpoint the knee sits.
const KNEE_LIFT: f32 = 0.35;

/// Samples drawn along a debug ray.
const RAY_SAMPLES: usize = 12;

const BODY_COLOR: [f32; 3] = [0.35, 0.2, 0.15];
const LEG_COLOR: [f32; 3] = [0.25, 0.15, 0.1];
const FOOT_COLOR: [f32; 3] = [0.9, 0.3, 0.2];
const HIT_COLOR: [f32; 3] = [1.0, 0.1, 0.1];
const REST_COLOR: [f32; 3] = [0.2, 1.0, 0.4];

/// Spawn one flat tile per `stride`-th terrain sample, tinted by height.
pub fn spawn_terrain_tiles(world: &mut World, terrain: &Terrain, stride: u32, rng: &mut impl Rng) {
    let (lo, hi) = terrain.height_range();
    let span = (hi - lo).max(1e-3);
    let size = terrain.cell * stride.max(1) as f32;
    let mut count = 0;
    for p in terrain.sample_points(stride) {
        let k = (p.z - lo) / span;
        let jitter = rng.gen_range(-0.03..0.03);
        world.spawn((
            TerrainTile,
            // Top face flush with the surface.
            Transform::from_position(p - Vec3::Z * size * 0.5),
            Scale { size },
            Color { r: 0.25 + 0.3 * k + jitter, g: 0.45 + 0.2 * k + jitter, b: 0.2 + jitter },
        ));
        count += 1;
    }
    log::info!("Spawned {} terrain tiles", count);
}

/// Spawn the entities that draw the creature. Positions are filled in by `sync_spider_parts`.
pub fn spawn_spider_parts(world: &mut World) {
    world.spawn((SpiderPart::Body, Transform::default(), Scale { size: 0.5 }, Color::from_array(BODY_COLOR)));
    for leg in Leg::ALL {
        world.spawn((SpiderPart::Joint(leg), Transform::default(), Scale { size: 0.12 }, Color::from_array(LEG_COLOR)));
        world.spawn((SpiderPart::Foot(leg), Transform::default(), Scale { size: 0.1 }, Color::from_array(FOOT_COLOR)));
        for i in 1..BONE_SAMPLES {
            let t = i as f32 / BONE_SAMPLES as f32;
            world.spawn((SpiderPart::Bone { leg, t }, Transform::default(), Scale { size: 0.07 }, Color::from_array(LEG_COLOR)));
        }
    }
}

/// Point `t` along hip → knee → foot, with the knee raised along `up`.
fn bone_point(joint: Vec3, foot: Vec3, up: Vec3, t: f32) -> Vec3 {
    let knee = joint.lerp(foot, 0.5) + up * KNEE_LIFT;
    if t < 0.5 {
        joint.lerp(knee, t * 2.0)
    } else {
        knee.lerp(foot, (t - 0.5) * 2.0)
    }
}

/// Move the creature's entities to the creature's current pose.
pub fn sync_spider_parts<C: Creature>(world: &mut World, creature: &C) {
    let up = creature.up_vector();
    let mut query = world.query::<(&mut Transform, &SpiderPart)>();
    for (mut transform, part) in query.iter_mut(world) {
        transform.position = match *part {
            SpiderPart::Body => creature.translation(),
            SpiderPart::Joint(leg) => creature.leg_joint(leg),
            SpiderPart::Foot(leg) => creature.leg_position(leg),
            SpiderPart::Bone { leg, t } => bone_point(creature.leg_joint(leg), creature.leg_position(leg), up, t),
        };
    }
}

/// Decrease lifetime and despawn entities when lifetime expires
pub fn lifetime_system(world: &mut World, delta_time: f32) {
    let mut expired = Vec::new();
    let mut query = world.query::<(Entity, &mut Lifetime)>();
    for (entity, mut lifetime) in query.iter_mut(world) {
        lifetime.remaining -= delta_time;
        if lifetime.remaining <= 0.0 {
            expired.push(entity);
        }
    }
    for entity in expired {
        world.despawn(entity);
    }
}

/// Spawn one-frame markers for whatever debug layers are enabled.
pub fn spawn_debug_markers(world: &mut World, debug: &DebugRecords) {
    let marker = |position: Vec3, size: f32, color: [f32; 3]| {
        (Transform::from_position(position), Scale { size }, Color::from_array(color), Lifetime { remaining: 0.0 })
    };

    if debug.show_ground_rays {
        for ray in &debug.rays {
            for i in 0..=RAY_SAMPLES {
                let t = i as f32 / RAY_SAMPLES as f32;
                world.spawn(marker(ray.at(t), 0.03, ray.color));
            }
        }
        for &hit in &debug.hits {
            world.spawn(marker(hit, 0.1, HIT_COLOR));
        }
    }
    if debug.show_rest_positions {
        for sphere in &debug.rest_spheres {
            world.spawn(marker(sphere.center, sphere.radius * 2.0, REST_COLOR));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collision::Ray;
    use crate::engine::debug::RestSphere;
    use crate::engine::spider::Spider;

    #[test]
    fn spider_parts_follow_the_creature() {
        let mut world = World::new();
        spawn_spider_parts(&mut world);
        let spider = Spider::new(Vec3::new(1.0, 2.0, 0.6));
        sync_spider_parts(&mut world, &spider);

        let mut query = world.query::<(&Transform, &SpiderPart)>();
        let mut bones = 0;
        for (transform, part) in query.iter(&world) {
            match *part {
                SpiderPart::Body => assert_eq!(transform.position, spider.translation),
                SpiderPart::Joint(leg) => assert_eq!(transform.position, spider.leg_joint(leg)),
                SpiderPart::Foot(leg) => assert_eq!(transform.position, spider.leg_position(leg)),
                SpiderPart::Bone { .. } => bones += 1,
            }
        }
        assert_eq!(bones, 8 * (BONE_SAMPLES - 1));
    }

    #[test]
    fn knee_is_raised_between_hip_and_foot() {
        let joint = Vec3::new(0.0, 0.0, 1.0);
        let foot = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(bone_point(joint, foot, Vec3::Z, 0.0), joint);
        assert!(bone_point(joint, foot, Vec3::Z, 1.0).abs_diff_eq(foot, 1e-6));
        assert!(bone_point(joint, foot, Vec3::Z, 0.5).abs_diff_eq(Vec3::new(0.5, 0.0, 0.85), 1e-6));
    }

    #[test]
    fn debug_markers_last_one_frame() {
        let mut world = World::new();
        let debug = DebugRecords {
            show_ground_rays: true,
            rays: vec![Ray::new(Vec3::ZERO, -Vec3::Z)],
            hits: vec![-Vec3::Z],
            show_rest_positions: true,
            rest_spheres: vec![RestSphere { center: Vec3::X, radius: 0.07 }],
        };
        spawn_debug_markers(&mut world, &debug);
        assert_eq!(world.query::<&Lifetime>().iter(&world).count(), RAY_SAMPLES + 1 + 1 + 1);

        lifetime_system(&mut world, 1.0 / 60.0);
        assert_eq!(world.query::<&Lifetime>().iter(&world).count(), 0);
    }

    #[test]
    fn hidden_layers_spawn_nothing() {
        let mut world = World::new();
        let debug = DebugRecords {
            rays: vec![Ray::new(Vec3::ZERO, -Vec3::Z)],
            ..Default::default()
        };
        spawn_debug_markers(&mut world, &debug);
        assert_eq!(world.entities().len(), 0);
    }
}
