// Creature model: leg identities, per-leg storage and the eight-legged spider body.
//
// World convention: Z is up. In body space the spider faces +X and its right
// side is +Y, so (front, right, up) = (X, Y, Z) and front × right = up.

use std::fmt::{self, Display};
use std::ops::{Index, IndexMut};

use glam::{Affine3A, Quat, Vec3};

pub const NUM_LEGS: usize = 8;

// ============================================================================
// LEGS
// ============================================================================

/// Leg identity. The discriminant is the canonical array slot: front pair
/// first, back pair last, left legs on even slots and right legs on odd slots.
/// The orientation solver relies on this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    FrontLeft = 0,
    FrontRight = 1,
    MiddleLeft = 2,
    MiddleRight = 3,
    Middle2Left = 4,
    Middle2Right = 5,
    BackLeft = 6,
    BackRight = 7,
}

impl Leg {
    pub const ALL: [Leg; NUM_LEGS] = [
        Leg::FrontLeft,
        Leg::FrontRight,
        Leg::MiddleLeft,
        Leg::MiddleRight,
        Leg::Middle2Left,
        Leg::Middle2Right,
        Leg::BackLeft,
        Leg::BackRight,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn is_left(self) -> bool {
        self.index() % 2 == 0
    }
}

impl Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Leg::FrontLeft => "front left",
            Leg::FrontRight => "front right",
            Leg::MiddleLeft => "middle left",
            Leg::MiddleRight => "middle right",
            Leg::Middle2Left => "middle2 left",
            Leg::Middle2Right => "middle2 right",
            Leg::BackLeft => "back left",
            Leg::BackRight => "back right",
        })
    }
}

/// Fixed-size map keyed by `Leg`. Iteration follows `Leg::ALL`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegMap<T>([T; NUM_LEGS]);

impl<T> LegMap<T> {
    pub fn from_fn(mut f: impl FnMut(Leg) -> T) -> Self {
        Self(std::array::from_fn(|i| f(Leg::ALL[i])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Leg, &T)> {
        Leg::ALL.into_iter().zip(self.0.iter())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T: Copy> LegMap<T> {
    pub fn splat(value: T) -> Self {
        Self([value; NUM_LEGS])
    }
}

impl<T> Index<Leg> for LegMap<T> {
    type Output = T;

    fn index(&self, leg: Leg) -> &T {
        &self.0[leg.index()]
    }
}

impl<T> IndexMut<Leg> for LegMap<T> {
    fn index_mut(&mut self, leg: Leg) -> &mut T {
        &mut self.0[leg.index()]
    }
}

/// Groups of legs whose drift is evaluated together when deciding a step.
pub type LegPartitions = Vec<Vec<Leg>>;

// ============================================================================
// CREATURE INTERFACE
// ============================================================================

/// What the locomotion controller needs from a legged body.
///
/// Joint and rest positions are read through the cached global transform,
/// so callers must call `update_global` after moving or rotating the body.
/// The orientation vectors are always derived from the current rotation.
pub trait Creature {
    fn translation(&self) -> Vec3;
    fn set_translation(&mut self, translation: Vec3);
    fn rotation(&self) -> Quat;
    fn set_rotation(&mut self, rotation: Quat);

    /// Rebuild the cached body-to-world transform.
    fn update_global(&mut self);

    /// World-space hip joint of a leg.
    fn leg_joint(&self, leg: Leg) -> Vec3;

    /// World-space rest position, shifted along the body's front and right
    /// axes by the normalized velocity components `vx` / `vy`.
    fn biased_rest_position(&self, leg: Leg, vx: f32, vy: f32) -> Vec3;

    fn rest_position(&self, leg: Leg) -> Vec3 {
        self.biased_rest_position(leg, 0.0, 0.0)
    }

    fn leg_position(&self, leg: Leg) -> Vec3;
    fn set_leg_position(&mut self, leg: Leg, position: Vec3);

    fn leg_partitions(&self) -> LegPartitions;

    fn up_vector(&self) -> Vec3 {
        self.rotation() * Vec3::Z
    }

    fn front_vector(&self) -> Vec3 {
        self.rotation() * Vec3::X
    }

    fn right_vector(&self) -> Vec3 {
        self.rotation() * Vec3::Y
    }
}

// ============================================================================
// SPIDER
// ============================================================================

/// Body-space hip positions, canonical order.
const JOINT_LAYOUT: [Vec3; NUM_LEGS] = [
    Vec3::new(0.45, -0.25, 0.0),
    Vec3::new(0.45, 0.25, 0.0),
    Vec3::new(0.15, -0.3, 0.0),
    Vec3::new(0.15, 0.3, 0.0),
    Vec3::new(-0.15, -0.3, 0.0),
    Vec3::new(-0.15, 0.3, 0.0),
    Vec3::new(-0.45, -0.25, 0.0),
    Vec3::new(-0.45, 0.25, 0.0),
];

/// Eight-legged body. Rest positions fan out radially from the hips and sit
/// `stance_height` below the body.
#[derive(Debug, Clone)]
pub struct Spider {
    pub translation: Vec3,
    rotation: Quat,
    /// Rest position distance from the body center, in multiples of the hip
    /// distance.
    pub rest_spread: f32,
    /// Height of the body above its rest positions.
    pub stance_height: f32,
    /// How far a rest position leans along the direction of travel at full speed.
    pub stride_bias: f32,
    feet: LegMap<Vec3>,
    global: Affine3A,
}

impl Spider {
    pub fn new(translation: Vec3) -> Self {
        let mut spider = Self {
            translation,
            rotation: Quat::IDENTITY,
            rest_spread: 2.5,
            stance_height: 0.6,
            stride_bias: 0.3,
            feet: LegMap::splat(Vec3::ZERO),
            global: Affine3A::IDENTITY,
        };
        spider.update_global();
        spider.feet = LegMap::from_fn(|leg| spider.rest_position(leg));
        spider
    }

    /// Body-space rest position, before any velocity bias.
    fn local_rest(&self, leg: Leg) -> Vec3 {
        let hip = JOINT_LAYOUT[leg.index()];
        Vec3::new(hip.x * self.rest_spread, hip.y * self.rest_spread, -self.stance_height)
    }
}

impl Creature for Spider {
    fn translation(&self) -> Vec3 {
        self.translation
    }

    fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
    }

    fn update_global(&mut self) {
        self.global = Affine3A::from_rotation_translation(self.rotation, self.translation);
    }

    fn leg_joint(&self, leg: Leg) -> Vec3 {
        self.global.transform_point3(JOINT_LAYOUT[leg.index()])
    }

    fn biased_rest_position(&self, leg: Leg, vx: f32, vy: f32) -> Vec3 {
        let bias = Vec3::new(vx, vy, 0.0) * self.stride_bias;
        self.global.transform_point3(self.local_rest(leg) + bias)
    }

    fn leg_position(&self, leg: Leg) -> Vec3 {
        self.feet[leg]
    }

    fn set_leg_position(&mut self, leg: Leg, position: Vec3) {
        self.feet[leg] = position;
    }

    fn leg_partitions(&self) -> LegPartitions {
        use Leg::*;
        vec![
            vec![FrontLeft, MiddleRight, Middle2Left, BackRight],
            vec![FrontRight, MiddleLeft, Middle2Right, BackLeft],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_puts_left_legs_on_even_slots() {
        for (slot, leg) in Leg::ALL.iter().enumerate() {
            assert_eq!(leg.index(), slot);
            assert_eq!(leg.is_left(), slot % 2 == 0, "{leg}");
        }
    }

    #[test]
    fn partitions_cover_every_leg_once() {
        let spider = Spider::new(Vec3::ZERO);
        let mut seen = LegMap::splat(0);
        for partition in spider.leg_partitions() {
            for leg in partition {
                seen[leg] += 1;
            }
        }
        assert!(seen.values().all(|&n| n == 1));
    }

    #[test]
    fn rest_positions_follow_the_body_transform() {
        let mut spider = Spider::new(Vec3::new(1.0, 2.0, 3.0));
        let rest = spider.rest_position(Leg::FrontRight);
        assert!(rest.abs_diff_eq(Vec3::new(2.125, 2.625, 2.4), 1e-5));

        spider.set_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        // Stale until the global transform is refreshed.
        assert!(spider.rest_position(Leg::FrontRight).abs_diff_eq(rest, 1e-6));
        spider.update_global();
        assert!(spider.front_vector().abs_diff_eq(Vec3::Y, 1e-6));
        assert!(spider.right_vector().abs_diff_eq(-Vec3::X, 1e-6));
        let turned = spider.rest_position(Leg::FrontRight);
        assert!(turned.abs_diff_eq(Vec3::new(1.0 - 0.625, 2.0 + 1.125, 2.4), 1e-5));
    }

    #[test]
    fn velocity_bias_leans_rest_position_forward() {
        let spider = Spider::new(Vec3::ZERO);
        let rest = spider.rest_position(Leg::BackLeft);
        let leaning = spider.biased_rest_position(Leg::BackLeft, 1.0, 0.0);
        assert!((leaning - rest).abs_diff_eq(Vec3::X * spider.stride_bias, 1e-6));
    }

    #[test]
    fn feet_start_on_rest_positions() {
        let spider = Spider::new(Vec3::new(0.0, 0.0, 1.0));
        for leg in Leg::ALL {
            assert!(spider.leg_position(leg).abs_diff_eq(spider.rest_position(leg), 1e-6));
        }
    }
}
