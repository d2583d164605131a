// Procedural heightfield terrain (Z up) used as the demo's collision world.
//
// Heights live on a regular grid over the XY plane and are sampled
// bilinearly. Ray queries march the segment and refine the first surface
// crossing by bisection.

use glam::{UVec2, Vec2, Vec3};
use rand::Rng;

use super::collision::{CollisionOracle, Ray};

/// Bisection passes once a crossing has been bracketed.
const REFINE_ITERATIONS: u32 = 20;

#[derive(Debug, Clone)]
pub struct Terrain {
    /// Samples along X and Y.
    pub dims: UVec2,
    /// World units between neighbouring samples.
    pub cell: f32,
    /// World position of sample (0, 0).
    pub origin: Vec2,
    heights: Vec<f32>,
    min_z: f32,
    max_z: f32,
}

impl Terrain {
    pub fn from_heights(dims: UVec2, cell: f32, origin: Vec2, heights: Vec<f32>) -> Self {
        assert_eq!((dims.x as usize) * (dims.y as usize), heights.len());
        assert!(dims.x >= 2 && dims.y >= 2, "terrain needs at least 2x2 samples");
        let (mut min_z, mut max_z) = (f32::INFINITY, f32::NEG_INFINITY);
        for &h in &heights {
            min_z = min_z.min(h);
            max_z = max_z.max(h);
        }
        Self { dims, cell, origin, heights, min_z, max_z }
    }

    /// Square terrain of side `size` centered on the origin, made of `hills`
    /// random Gaussian bumps (negative amplitudes carve hollows).
    pub fn generate(rng: &mut impl Rng, size: f32, samples: u32, hills: usize) -> Self {
        let half = size * 0.5;
        let bumps: Vec<(Vec2, f32, f32)> = (0..hills)
            .map(|_| {
                let center = Vec2::new(rng.gen_range(-half..half), rng.gen_range(-half..half));
                let amplitude = rng.gen_range(-0.6..1.4);
                let sigma = rng.gen_range(1.0..4.0);
                (center, amplitude, sigma)
            })
            .collect();

        let cell = size / (samples - 1) as f32;
        let origin = Vec2::splat(-half);
        let mut heights = Vec::with_capacity((samples * samples) as usize);
        for iy in 0..samples {
            for ix in 0..samples {
                let p = origin + Vec2::new(ix as f32, iy as f32) * cell;
                let h: f32 = bumps
                    .iter()
                    .map(|&(c, a, s)| a * (-(p - c).length_squared() / (2.0 * s * s)).exp())
                    .sum();
                heights.push(h);
            }
        }
        log::info!("Generated {}x{} terrain with {} hills", samples, samples, hills);
        Self::from_heights(UVec2::splat(samples), cell, origin, heights)
    }

    #[inline]
    fn h(&self, x: u32, y: u32) -> f32 {
        self.heights[(y * self.dims.x + x) as usize]
    }

    /// Bilinear height at world (x, y). Positions outside the grid clamp to the border.
    pub fn sample_height(&self, x: f32, y: f32) -> f32 {
        let (nx, ny) = (self.dims.x, self.dims.y);
        let fx = ((x - self.origin.x) / self.cell).clamp(0.0, (nx - 1) as f32 - 1e-5);
        let fy = ((y - self.origin.y) / self.cell).clamp(0.0, (ny - 1) as f32 - 1e-5);
        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(nx - 1);
        let y1 = (y0 + 1).min(ny - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let a = self.h(x0, y0) * (1.0 - tx) + self.h(x1, y0) * tx;
        let b = self.h(x0, y1) * (1.0 - tx) + self.h(x1, y1) * tx;
        a * (1.0 - ty) + b * ty
    }

    /// World positions of every `stride`-th sample, used to draw the ground.
    pub fn sample_points(&self, stride: u32) -> impl Iterator<Item = Vec3> + '_ {
        let stride = stride.max(1);
        (0..self.dims.y).step_by(stride as usize).flat_map(move |iy| {
            (0..self.dims.x).step_by(stride as usize).map(move |ix| {
                let p = self.origin + Vec2::new(ix as f32, iy as f32) * self.cell;
                Vec3::new(p.x, p.y, self.h(ix, iy))
            })
        })
    }

    pub fn height_range(&self) -> (f32, f32) {
        (self.min_z, self.max_z)
    }

    /// Signed height of a point above the surface.
    #[inline]
    fn clearance(&self, p: Vec3) -> f32 {
        p.z - self.sample_height(p.x, p.y)
    }
}

impl CollisionOracle for Terrain {
    fn ray_collides(&self, ray: &Ray) -> Option<Vec3> {
        let (start, end) = (ray.origin, ray.end());
        if start.z.min(end.z) > self.max_z || start.z.max(end.z) < self.min_z {
            return None;
        }

        let length = ray.direction.length();
        let steps = ((length / (self.cell * 0.25)).ceil() as u32).max(1);

        let mut t_prev = 0.0;
        let mut f_prev = self.clearance(start);
        if f_prev == 0.0 {
            return Some(start);
        }
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            let f = self.clearance(ray.at(t));
            if f == 0.0 || (f > 0.0) != (f_prev > 0.0) {
                // Bracketed: the surface lies between t_prev and t.
                let (mut lo, mut hi) = (t_prev, t);
                for _ in 0..REFINE_ITERATIONS {
                    let mid = 0.5 * (lo + hi);
                    if (self.clearance(ray.at(mid)) > 0.0) == (f_prev > 0.0) {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                return Some(ray.at(0.5 * (lo + hi)));
            }
            t_prev = t;
            f_prev = f;
        }
        None
    }
}
