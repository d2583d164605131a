// Ray queries against the world.
//
// Rays are finite segments: `direction` carries the length, so a hit is only
// reported for points between `origin` and `origin + direction`.

use glam::Vec3;

const EPSILON: f32 = 1e-6;

/// Default color used when a ray is drawn by the debug renderer.
pub const RAY_COLOR: [f32; 3] = [1.0, 0.9, 0.2];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub color: [f32; 3],
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction, color: RAY_COLOR }
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    /// Point at parameter `t` (0 = origin, 1 = end of the segment).
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    pub fn end(&self) -> Vec3 {
        self.at(1.0)
    }
}

/// Answers "does this segment hit the world, and where?".
pub trait CollisionOracle {
    fn ray_collides(&self, ray: &Ray) -> Option<Vec3>;
}

impl<T: CollisionOracle + ?Sized> CollisionOracle for &T {
    fn ray_collides(&self, ray: &Ray) -> Option<Vec3> {
        (**self).ray_collides(ray)
    }
}

// ============================================================================
// PLANE
// ============================================================================

/// Infinite plane through `point`. Segments hit it from either side.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub point: Vec3,
    pub normal: Vec3,
}

impl Plane {
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self { point, normal: normal.normalize() }
    }

    /// Horizontal plane at height `z`.
    pub fn horizontal(z: f32) -> Self {
        Self::new(Vec3::new(0.0, 0.0, z), Vec3::Z)
    }
}

impl CollisionOracle for Plane {
    fn ray_collides(&self, ray: &Ray) -> Option<Vec3> {
        let denom = self.normal.dot(ray.direction);
        if denom.abs() < EPSILON {
            return None;
        }
        let t = self.normal.dot(self.point - ray.origin) / denom;
        (0.0..=1.0).contains(&t).then(|| ray.at(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downward_ray_hits_plane_below() {
        let plane = Plane::horizontal(0.5);
        let ray = Ray::new(Vec3::new(1.0, -2.0, 3.0), Vec3::new(0.0, 0.0, -5.0));
        let hit = plane.ray_collides(&ray).expect("ray crosses the plane");
        assert!(hit.abs_diff_eq(Vec3::new(1.0, -2.0, 0.5), 1e-6));
    }

    #[test]
    fn segment_that_stops_short_misses() {
        let plane = Plane::horizontal(0.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(plane.ray_collides(&ray), None);
    }

    #[test]
    fn parallel_ray_misses() {
        let plane = Plane::horizontal(0.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(plane.ray_collides(&ray), None);
    }

    #[test]
    fn ray_pointing_away_misses() {
        let plane = Plane::horizontal(0.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(plane.ray_collides(&ray), None);
    }
}
