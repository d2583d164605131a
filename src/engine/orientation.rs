// Body orientation from leg spread.
//
// The up-vector is the normal of the quad spanned by the front/back and
// left/right leg averages. The body is tilted onto that normal and lifted
// `body_height` above the average foot position.

use glam::{Quat, Vec3};

use super::collision::Ray;
use super::debug::DebugRecords;
use super::gait::LegState;
use super::spider::{Creature, LegMap, NUM_LEGS};

/// Up-vectors shorter than this (before normalizing) mean the legs are
/// collinear and carry no orientation.
pub const DEGENERATE_UP_EPSILON: f32 = 1e-5;

const UP_RAY_COLOR: [f32; 3] = [0.7, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightMode {
    /// Jump straight to the target translation.
    Snap,
    /// Move only along the new up-vector; horizontal motion belongs to the integrator.
    Follow,
}

impl HeightMode {
    pub fn from_reset(reset: bool) -> Self {
        if reset { HeightMode::Snap } else { HeightMode::Follow }
    }
}

/// Averages of the foot positions, split by canonical slot.
#[derive(Debug, Clone, Copy)]
struct LegSpread {
    total: Vec3,
    left: Vec3,
    right: Vec3,
    front: Vec3,
    back: Vec3,
}

impl LegSpread {
    fn measure(legs: &LegMap<LegState>) -> Self {
        let mut total = Vec3::ZERO;
        let (mut left, mut right, mut front, mut back) = (Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        let (mut left_n, mut right_n) = (0.0, 0.0);
        for (leg, state) in legs.iter() {
            let p = state.position;
            total += p;
            if leg.is_left() {
                left += p;
                left_n += 1.0;
            } else {
                right += p;
                right_n += 1.0;
            }
            let slot = leg.index();
            if slot <= 1 {
                front += p;
            } else if slot >= NUM_LEGS - 2 {
                back += p;
            }
        }
        Self {
            total: total / NUM_LEGS as f32,
            left: left / left_n,
            right: right / right_n,
            front: front / 2.0,
            back: back / 2.0,
        }
    }

    fn raw_up(&self) -> Vec3 {
        (self.front - self.back).cross(self.right - self.left)
    }
}

/// Unit normal of the leg spread, or `None` when the legs are (nearly) collinear.
pub fn leg_plane_normal(legs: &LegMap<LegState>) -> Option<Vec3> {
    let up = LegSpread::measure(legs).raw_up();
    (up.length() > DEGENERATE_UP_EPSILON).then(|| up.normalize())
}

/// Rotation taking the body's canonical up axis (+Z) onto `up`.
///
/// Half-angle construction: xyz = Z × up, w = |Z||up| + Z·up, then normalized.
/// Falls back to a half turn about X when `up` points straight down.
pub fn rotation_to_up(up: Vec3) -> Quat {
    let axis = Vec3::Z;
    let c = axis.cross(up);
    let w = (axis.length_squared() * up.length_squared()).sqrt() + axis.dot(up);
    let q = Quat::from_xyzw(c.x, c.y, c.z, w);
    if q.length_squared() <= DEGENERATE_UP_EPSILON * DEGENERATE_UP_EPSILON {
        return Quat::from_rotation_x(std::f32::consts::PI);
    }
    q.normalize()
}

/// Orient and lift the body from the current foot positions.
///
/// Returns `false` and leaves the creature untouched when the legs are
/// collinear. Otherwise sets the rotation, moves the translation according
/// to `mode`, refreshes the global transform and records the new up-vector as
/// a debug ray.
pub fn smooth_height<C: Creature + ?Sized>(
    creature: &mut C,
    legs: &LegMap<LegState>,
    body_height: f32,
    mode: HeightMode,
    debug: &mut DebugRecords,
) -> bool {
    let Some(up) = leg_plane_normal(legs) else {
        log::warn!("Degenerate leg spread, keeping previous orientation");
        return false;
    };

    creature.set_rotation(rotation_to_up(up));
    let up = creature.up_vector();

    let target = LegSpread::measure(legs).total + up * body_height;
    match mode {
        HeightMode::Snap => creature.set_translation(target),
        HeightMode::Follow => {
            let translation = creature.translation();
            let along_up = (target - translation).dot(up);
            creature.set_translation(translation + along_up * up);
        }
    }
    creature.update_global();

    debug.rays.push(Ray::new(creature.translation(), up).with_color(UP_RAY_COLOR));
    true
}
