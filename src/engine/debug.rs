// Debug records produced by the controller for the renderer to draw.

use glam::Vec3;

use super::collision::Ray;

/// A rest position and the radius a leg may drift from it before stepping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestSphere {
    pub center: Vec3,
    pub radius: f32,
}

#[derive(Debug, Default)]
pub struct DebugRecords {
    /// Draw grounding rays and their hit points.
    pub show_ground_rays: bool,
    pub rays: Vec<Ray>,
    pub hits: Vec<Vec3>,

    /// Draw each leg's rest sphere. Only recorded while enabled.
    pub show_rest_positions: bool,
    pub rest_spheres: Vec<RestSphere>,
}

impl DebugRecords {
    pub fn reset_stick(&mut self) {
        self.rays.clear();
        self.hits.clear();
    }

    pub fn reset_rest(&mut self) {
        self.rest_spheres.clear();
    }
}
