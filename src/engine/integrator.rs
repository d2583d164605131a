// Body velocity/position integration in bounded sub-steps.

use glam::Vec3;

/// Splits a frame delta into `floor(dt / max_dt)` steps of `max_dt` followed
/// by the leftover, so the yielded steps always add back up to `dt`.
/// A zero leftover is not yielded.
#[derive(Debug, Clone)]
pub struct FrameSteps {
    full_steps: u32,
    max_dt: f32,
    leftover: f32,
}

impl FrameSteps {
    pub fn new(dt: f32, max_dt: f32) -> Self {
        let dt = dt.max(0.0);
        if !(max_dt > 0.0) {
            return Self { full_steps: 0, max_dt: 0.0, leftover: dt };
        }
        let full_steps = (dt / max_dt).floor() as u32;
        let covered = (0..full_steps).fold(0.0_f32, |acc, _| acc + max_dt);
        Self { full_steps, max_dt, leftover: (dt - covered).max(0.0) }
    }
}

impl Iterator for FrameSteps {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.full_steps > 0 {
            self.full_steps -= 1;
            return Some(self.max_dt);
        }
        if self.leftover > 0.0 {
            return Some(std::mem::take(&mut self.leftover));
        }
        None
    }
}

/// Position, velocity and steering target of the creature body.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyKinematics {
    pub position: Vec3,
    pub velocity: Vec3,
    pub target_velocity: Vec3,
}

impl BodyKinematics {
    pub fn at(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }

    /// Steer velocity toward the target by at most `acceleration * dt`,
    /// landing exactly on the target instead of overshooting it.
    pub fn handle_velocity(&mut self, acceleration: f32, dt: f32) {
        let diff = self.target_velocity - self.velocity;
        let gap = diff.length();
        let reach = acceleration * dt;
        if gap <= reach {
            self.velocity = self.target_velocity;
            return;
        }
        self.velocity += diff / gap * reach;
    }

    pub fn handle_position(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    /// Run every sub-step of one frame.
    pub fn integrate(&mut self, dt: f32, max_dt: f32, acceleration: f32) {
        for step in FrameSteps::new(dt, max_dt) {
            self.handle_velocity(acceleration, step);
            self.handle_position(step);
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}
