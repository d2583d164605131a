// Gait triggering: decides when a group of legs has drifted far enough from
// its rest positions to step, and describes the arc a stepping leg follows.

use std::f32::consts::PI;

use glam::Vec3;

use super::debug::RestSphere;
use super::params::{REST_RADIUS_MOVING, REST_RADIUS_STATIONARY, STATIONARY_SPEED};
use super::spider::{Creature, Leg, LegMap};

/// Per-leg locomotion state owned by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LegState {
    /// Where the foot currently is.
    pub position: Vec3,
    /// Where the current step lands.
    pub target: Vec3,
    /// Where the current step started.
    pub origin: Vec3,
    /// Offset of the last grounded position above (+) or below (-) the rest
    /// position, measured along the body's up-vector.
    pub rest_displacement: f32,
}

/// One stepping cycle in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct GaitEvent {
    pub partition: usize,
    pub legs: Vec<Leg>,
    /// Seconds since the step started.
    pub elapsed: f32,
}

/// Outcome of a trigger evaluation that fired.
#[derive(Debug, Clone, PartialEq)]
pub struct GaitTrigger {
    pub partition: usize,
    pub legs: Vec<Leg>,
}

impl GaitTrigger {
    pub fn into_event(self) -> GaitEvent {
        GaitEvent { partition: self.partition, legs: self.legs, elapsed: 0.0 }
    }
}

/// Distance a leg may drift from its rest position before it counts toward a
/// step. Standing creatures use a tighter tolerance than walking ones.
pub fn rest_radius(speed: f32) -> f32 {
    if speed < STATIONARY_SPEED {
        REST_RADIUS_STATIONARY
    } else {
        REST_RADIUS_MOVING
    }
}

/// Find the partition whose legs drifted furthest past their rest radius.
///
/// Each partition scores the mean of `(distance - radius)²` over its legs,
/// counting only legs beyond their radius. The highest score wins, ties going
/// to the lowest index. Returns `None` when no leg anywhere is beyond its
/// radius. When `rest_spheres` is given, every evaluated rest sphere is pushed
/// into it.
pub fn evaluate_trigger<C: Creature + ?Sized>(
    creature: &C,
    partitions: &[Vec<Leg>],
    legs: &LegMap<LegState>,
    speed: f32,
    move_all_legs: bool,
    mut rest_spheres: Option<&mut Vec<RestSphere>>,
) -> Option<GaitTrigger> {
    let up = creature.up_vector();
    let radius = rest_radius(speed);

    let mut triggered = false;
    let mut best: Option<(f32, usize, Vec<Leg>)> = None;

    for (index, partition) in partitions.iter().enumerate() {
        let mut variance = 0.0;
        let mut drifting = Vec::new();
        for &leg in partition {
            let rest = creature.rest_position(leg) + legs[leg].rest_displacement * up;
            let distance = (rest - legs[leg].position).length();
            if let Some(spheres) = rest_spheres.as_deref_mut() {
                spheres.push(RestSphere { center: rest, radius });
            }
            if distance > radius {
                variance += (distance - radius).powi(2);
                triggered = true;
            }
            if distance > radius / 2.0 {
                drifting.push(leg);
            }
        }
        if !partition.is_empty() {
            variance /= partition.len() as f32;
        }

        let beats_best = best.as_ref().is_none_or(|(max, _, _)| variance > *max);
        if beats_best {
            let to_move = if move_all_legs { partition.clone() } else { drifting };
            best = Some((variance, index, to_move));
        }
    }

    if !triggered {
        return None;
    }
    best.map(|(_, partition, legs)| GaitTrigger { partition, legs })
}

/// Interpolation weight and lift factor at `fraction` of a step.
///
/// The weight eases in and out from 0 to 1; the lift is a half-sine that peaks
/// at mid-step. Fractions outside `[0, 1]` are clamped so a finished step
/// rests exactly on its target.
pub fn step_profile(fraction: f32) -> (f32, f32) {
    let f = fraction.clamp(0.0, 1.0);
    let weight = (1.0 - (PI * f).cos()) / 2.0;
    let lift = if f >= 1.0 { 0.0 } else { (PI * f).sin() };
    (weight, lift)
}

/// Foot position at `fraction` of a step from `origin` to `target`.
pub fn step_position(origin: Vec3, target: Vec3, up: Vec3, height: f32, fraction: f32) -> Vec3 {
    let (weight, lift) = step_profile(fraction);
    origin.lerp(target, weight) + up * (lift * height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::spider::Spider;

    /// Spider whose feet all sit exactly on their rest positions.
    fn settled() -> (Spider, LegMap<LegState>) {
        let spider = Spider::new(Vec3::new(0.0, 0.0, 0.6));
        let legs = LegMap::from_fn(|leg| LegState {
            position: spider.rest_position(leg),
            ..Default::default()
        });
        (spider, legs)
    }

    #[test]
    fn stationary_radius_is_tighter_than_moving_radius() {
        assert_eq!(rest_radius(0.0), 0.07);
        assert_eq!(rest_radius(0.009), 0.07);
        assert_eq!(rest_radius(0.01), 0.2);
        assert_eq!(rest_radius(0.8), 0.2);
    }

    #[test]
    fn settled_legs_do_not_trigger() {
        let (spider, legs) = settled();
        let before = legs;
        let partitions = spider.leg_partitions();
        assert_eq!(evaluate_trigger(&spider, &partitions, &legs, 0.0, false, None), None);
        assert_eq!(evaluate_trigger(&spider, &partitions, &legs, 0.0, true, None), None);
        assert_eq!(legs, before);
    }

    #[test]
    fn single_drifting_leg_triggers_its_partition() {
        let (spider, mut legs) = settled();
        legs[Leg::MiddleLeft].position += Vec3::new(0.1, 0.0, 0.0);
        let trigger = evaluate_trigger(&spider, &spider.leg_partitions(), &legs, 0.0, false, None)
            .expect("0.1 drift exceeds the 0.07 stationary radius");
        assert_eq!(trigger.partition, 1);
        assert_eq!(trigger.legs, vec![Leg::MiddleLeft]);
    }

    #[test]
    fn same_drift_while_walking_stays_put() {
        let (spider, mut legs) = settled();
        legs[Leg::MiddleLeft].position += Vec3::new(0.1, 0.0, 0.0);
        assert_eq!(evaluate_trigger(&spider, &spider.leg_partitions(), &legs, 0.5, false, None), None);
    }

    #[test]
    fn move_all_legs_selects_whole_partition() {
        let (spider, mut legs) = settled();
        legs[Leg::FrontLeft].position += Vec3::new(0.0, 0.15, 0.0);
        let partitions = spider.leg_partitions();
        let trigger = evaluate_trigger(&spider, &partitions, &legs, 0.0, true, None).unwrap();
        assert_eq!(trigger.partition, 0);
        assert_eq!(trigger.legs, partitions[0]);
    }

    #[test]
    fn half_radius_drift_joins_the_step() {
        let (spider, mut legs) = settled();
        legs[Leg::FrontLeft].position += Vec3::new(0.3, 0.0, 0.0);
        // 0.05 is inside the radius but past half of it.
        legs[Leg::BackRight].position += Vec3::new(0.05, 0.0, 0.0);
        // Same partition, but within half the radius.
        legs[Leg::MiddleRight].position += Vec3::new(0.02, 0.0, 0.0);
        let trigger = evaluate_trigger(&spider, &spider.leg_partitions(), &legs, 0.0, false, None).unwrap();
        assert_eq!(trigger.legs, vec![Leg::FrontLeft, Leg::BackRight]);
    }

    #[test]
    fn larger_variance_wins() {
        let (spider, mut legs) = settled();
        legs[Leg::FrontLeft].position += Vec3::new(0.1, 0.0, 0.0);
        legs[Leg::FrontRight].position += Vec3::new(0.4, 0.0, 0.0);
        let trigger = evaluate_trigger(&spider, &spider.leg_partitions(), &legs, 0.0, false, None).unwrap();
        assert_eq!(trigger.partition, 1);
    }

    #[test]
    fn ties_go_to_the_first_partition() {
        let (spider, mut legs) = settled();
        legs[Leg::FrontLeft].position += Vec3::new(0.2, 0.0, 0.0);
        legs[Leg::FrontRight].position += Vec3::new(0.2, 0.0, 0.0);
        let trigger = evaluate_trigger(&spider, &spider.leg_partitions(), &legs, 0.0, false, None).unwrap();
        assert_eq!(trigger.partition, 0);
    }

    #[test]
    fn rest_displacement_shifts_the_rest_position_along_up() {
        let (spider, mut legs) = settled();
        legs[Leg::BackLeft].position += Vec3::new(0.0, 0.0, 0.5);
        legs[Leg::BackLeft].rest_displacement = 0.5;
        assert_eq!(evaluate_trigger(&spider, &spider.leg_partitions(), &legs, 0.0, false, None), None);
    }

    #[test]
    fn rest_spheres_are_recorded_for_every_leg() {
        let (spider, legs) = settled();
        let mut spheres = Vec::new();
        evaluate_trigger(&spider, &spider.leg_partitions(), &legs, 0.0, false, Some(&mut spheres));
        assert_eq!(spheres.len(), 8);
        assert!(spheres.iter().all(|s| s.radius == REST_RADIUS_STATIONARY));
    }

    #[test]
    fn step_profile_starts_peaks_and_lands() {
        let (w0, l0) = step_profile(0.0);
        assert_eq!((w0, l0), (0.0, 0.0));
        let (w_mid, l_mid) = step_profile(0.5);
        assert!((w_mid - 0.5).abs() < 1e-6);
        assert!((l_mid - 1.0).abs() < 1e-6);
        assert_eq!(step_profile(1.0), (1.0, 0.0));
        assert_eq!(step_profile(1.3), (1.0, 0.0));
    }

    #[test]
    fn completed_step_lands_on_target() {
        let origin = Vec3::new(0.0, 0.0, 0.0);
        let target = Vec3::new(0.3, 0.1, 0.05);
        let landed = step_position(origin, target, Vec3::Z, 0.2, 1.0);
        assert!(landed.abs_diff_eq(target, 1e-6));
        let mid = step_position(origin, target, Vec3::Z, 0.2, 0.5);
        assert!(mid.abs_diff_eq(origin.lerp(target, 0.5) + Vec3::Z * 0.2, 1e-6));
    }
}
