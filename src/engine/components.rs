// Core ECS components for the scene
// The renderer draws every entity that has a Transform, Scale and Color

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::spider::Leg;

/// Position of an entity in 3D space
#[derive(Component, Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position }
    }
}

/// Edge length of the cube drawn for this entity
#[derive(Component, Debug, Clone, Copy)]
pub struct Scale {
    pub size: f32,
}

/// RGB color for rendering
#[derive(Component, Debug, Clone, Copy)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub fn from_array([r, g, b]: [f32; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Seconds left before the entity is despawned by `lifetime_system`.
/// Debug markers are spawned with 0 so they last exactly one frame.
#[derive(Component, Debug, Clone, Copy)]
pub struct Lifetime {
    pub remaining: f32,
}

/// Ground sample drawn as a flat tile.
#[derive(Component, Debug, Clone, Copy)]
pub struct TerrainTile;

/// Which piece of the creature an entity draws.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub enum SpiderPart {
    Body,
    Joint(Leg),
    Foot(Leg),
    /// Point `t` of the way along the hip → knee → foot polyline.
    Bone { leg: Leg, t: f32 },
}
