// Third-person orbit camera
//
// Camera model:
//   - A "target" point (the creature body) the camera looks at
//   - Yaw/pitch around the target, measured in the Z-up world frame
//   - Distance along the look vector, shortened by the controller when terrain blocks the view
//   - Mouse drag (without shift) orbits yaw and pitch
//   - The view's up direction follows the creature's up-vector

use glam::{Mat4, Vec3};
use super::input::InputState;

pub struct OrbitCamera {
    /// Point the camera orbits around.
    target: Vec3,

    /// Distance from target along the look direction.
    pub distance_to_center: f32,

    /// Elevation angle in radians (0 = horizontal, PI/2 = straight down)
    pub pitch: f32,
    pub min_pitch: f32,
    pub max_pitch: f32,

    /// Horizontal rotation in radians (0 = camera behind the target on -X)
    pub yaw: f32,

    /// Up direction of the view.
    up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    /// Radians of orbit per pixel of mouse drag
    pub orbit_speed: f32,

    pub window_size: (u32, u32),
}

impl OrbitCamera {
    pub fn new(window_size: (u32, u32)) -> Self {
        Self {
            target: Vec3::ZERO,
            distance_to_center: 4.0,
            pitch: 30.0_f32.to_radians(),
            min_pitch: -10.0_f32.to_radians(),
            max_pitch: 85.0_f32.to_radians(),
            yaw: 0.0,
            up: Vec3::Z,
            fov: 50.0_f32.to_radians(),
            near: 0.05,
            far: 200.0,
            orbit_speed: 0.005,
            window_size,
        }
    }

    /// Orbit from the mouse. Call once per frame before rendering.
    pub fn update(&mut self, input: &InputState) {
        if input.mouse_left_held && !input.shift {
            let (dx, dy) = input.mouse_delta;
            self.yaw -= dx * self.orbit_speed;
            self.pitch = (self.pitch + dy * self.orbit_speed).clamp(self.min_pitch, self.max_pitch);
        }
        if input.window_size != (0, 0) {
            self.window_size = input.window_size;
        }
    }

    /// Point the camera at `target`, keeping its current orbit angles and distance.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        if up.length_squared() > 1e-10 {
            self.up = up.normalize();
        }
    }

    /// Unit vector from the target toward the eye.
    pub fn eye_direction(&self) -> Vec3 {
        Vec3::new(
            -self.yaw.cos() * self.pitch.cos(),
            -self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
        )
    }

    /// World-space position of the camera eye.
    pub fn camera_position(&self) -> Vec3 {
        self.target + self.eye_direction() * self.distance_to_center
    }

    /// View matrix: looks from the camera eye toward the target.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.camera_position(), self.target, self.up)
    }

    /// Perspective projection matrix.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self) -> Mat4 {
        let (w, h) = self.window_size;
        let aspect = if h > 0 { w as f32 / h as f32 } else { 1.0 };
        self.projection_matrix(aspect) * self.view_matrix()
    }
}
