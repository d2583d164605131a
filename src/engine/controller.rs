// Procedural locomotion controller for the eight-legged creature.
//
// Per frame:
//   1. Integrate body velocity/position in sub-steps of at most `max_dt`.
//   2. Run the step animator once for the whole frame delta. While idle it
//      asks the trigger evaluator whether a leg partition must step.
//   3. Re-orient the body from the current foot positions.
//   4. Commit translation, rotation and feet to the creature.

use glam::Vec3;

use super::camera::OrbitCamera;
use super::clock::Clock;
use super::collision::{CollisionOracle, Ray};
use super::debug::DebugRecords;
use super::gait::{GaitEvent, LegState, evaluate_trigger, step_position};
use super::input::InputState;
use super::integrator::BodyKinematics;
use super::orientation::{HeightMode, smooth_height};
use super::params::{GROUND_RAY_LENGTH, Params};
use super::spider::{Creature, Leg, LegMap, LegPartitions};

/// Upper bound on gait events chained inside a single `animate` call. Only
/// reached after a long stall; leftover time is dropped.
const MAX_CHAINED_STEPS: u32 = 32;

const STEP_RAY_COLOR: [f32; 3] = [0.2, 0.8, 1.0];

/// Fraction of the hit distance the camera keeps when terrain is in the way.
const CAMERA_OCCLUSION_MARGIN: f32 = 0.95;

pub struct SpiderController<C: Creature, K: Clock> {
    creature: C,
    clock: K,
    camera: OrbitCamera,
    params: Params,
    partitions: LegPartitions,
    legs: LegMap<LegState>,
    /// Active step, `None` while idle.
    event: Option<GaitEvent>,
    body: BodyKinematics,
    old_t: f32,
    debug: DebugRecords,
}

impl<C: Creature, K: Clock> SpiderController<C, K> {
    pub fn new(mut creature: C, clock: K, params: Params, window_size: (u32, u32)) -> Self {
        creature.update_global();
        let partitions = creature.leg_partitions();
        let legs = LegMap::from_fn(|leg| {
            let p = creature.leg_position(leg);
            LegState { position: p, target: p, origin: p, rest_displacement: 0.0 }
        });
        let body = BodyKinematics::at(creature.translation());
        let old_t = clock.now();
        let mut camera = OrbitCamera::new(window_size);
        camera.distance_to_center = params.camera_max_distance;
        camera.look_at(creature.translation(), creature.up_vector());
        log::info!("Locomotion controller ready ({} leg partitions)", partitions.len());
        Self {
            creature,
            clock,
            camera,
            params,
            partitions,
            legs,
            event: None,
            body,
            old_t,
            debug: DebugRecords::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn creature(&self) -> &C {
        &self.creature
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn debug(&self) -> &DebugRecords {
        &self.debug
    }

    pub fn body(&self) -> &BodyKinematics {
        &self.body
    }

    pub fn gait_event(&self) -> Option<&GaitEvent> {
        self.event.as_ref()
    }

    pub fn leg(&self, leg: Leg) -> &LegState {
        &self.legs[leg]
    }

    /// Tunables and debug-layer switches, borrowed together for the settings UI.
    pub fn settings_mut(&mut self) -> (&mut Params, &mut DebugRecords) {
        (&mut self.params, &mut self.debug)
    }

    // ------------------------------------------------------------------------
    // Grounding
    // ------------------------------------------------------------------------

    /// Drop every foot onto the terrain below its hip and settle the body.
    ///
    /// Each ray starts `rest_position_distance` hip-lengths beyond the hip and
    /// reaches `GROUND_RAY_LENGTH` down the body's up-vector. Feet whose ray
    /// misses keep their last position and make the call return `false`.
    /// `reset` snaps the body onto the computed height instead of following
    /// it along the up-vector.
    pub fn ground_to_surface<O: CollisionOracle + ?Sized>(&mut self, oracle: &O, reset: bool) -> bool {
        self.creature.update_global();
        self.debug.reset_stick();

        let center = self.creature.translation();
        let down = -GROUND_RAY_LENGTH * self.creature.up_vector();
        let mut grounded = LegMap::splat(false);
        for leg in Leg::ALL {
            let joint = self.creature.leg_joint(leg);
            let start = joint + self.params.rest_position_distance * (joint - center);
            let ray = Ray::new(start, down);
            match oracle.ray_collides(&ray) {
                Some(hit) => {
                    self.legs[leg].position = hit;
                    self.creature.set_leg_position(leg, hit);
                    self.debug.hits.push(hit);
                    grounded[leg] = true;
                }
                None => {
                    self.legs[leg].position = self.creature.leg_position(leg);
                }
            }
            self.debug.rays.push(ray);
        }

        self.smooth_height(HeightMode::from_reset(reset));
        self.body.position = self.creature.translation();
        self.creature.update_global();

        let up = self.creature.up_vector();
        for (leg, _) in grounded.iter().filter(|(_, hit)| **hit) {
            let rest = self.creature.rest_position(leg);
            self.legs[leg].rest_displacement = (self.legs[leg].position - rest).dot(up);
        }

        let all_grounded = grounded.values().all(|&hit| hit);
        if !all_grounded {
            let missed: Vec<String> = grounded
                .iter()
                .filter(|(_, hit)| !**hit)
                .map(|(leg, _)| leg.to_string())
                .collect();
            log::info!("Grounding missed terrain for: {}", missed.join(", "));
        }
        all_grounded
    }

    fn smooth_height(&mut self, mode: HeightMode) -> bool {
        smooth_height(&mut self.creature, &self.legs, self.params.body_height, mode, &mut self.debug)
    }

    // ------------------------------------------------------------------------
    // Frame update
    // ------------------------------------------------------------------------

    /// Advance one frame using the time elapsed on the clock since the last call.
    pub fn update<O: CollisionOracle + ?Sized>(&mut self, oracle: &O) {
        let now = self.clock.now();
        let dt = (now - self.old_t).max(0.0);
        self.debug.reset_stick();

        self.body.integrate(dt, self.params.max_dt, self.params.acceleration);
        self.creature.set_translation(self.body.position);
        self.creature.update_global();

        self.animate(dt, oracle);
        self.smooth_height(HeightMode::Follow);
        // The height solver may have lifted or lowered the body.
        self.body.position = self.creature.translation();

        self.old_t = now;
        self.creature.update_global();
        for leg in Leg::ALL {
            self.creature.set_leg_position(leg, self.legs[leg].position);
        }
    }

    /// Step animator. Starts a gait event when idle and a partition has
    /// drifted, then moves the stepping legs along their arc. A step that
    /// finishes mid-frame hands its leftover time to the next step.
    fn animate<O: CollisionOracle + ?Sized>(&mut self, dt: f32, oracle: &O) {
        let mut remaining = dt;
        for _ in 0..MAX_CHAINED_STEPS {
            if self.event.is_none() {
                self.event = self.start_gait_event(oracle);
            }
            let duration = self.params.animation_duration();
            let up = self.creature.up_vector();
            let Some(event) = self.event.as_mut() else { return };

            event.elapsed += remaining;
            let fraction = if duration > 0.0 { event.elapsed / duration } else { 1.0 };
            for &leg in &event.legs {
                let state = &mut self.legs[leg];
                state.position = step_position(state.origin, state.target, up, self.params.animation_height, fraction);
            }

            let overshoot = event.elapsed - duration;
            if overshoot <= 0.0 {
                return;
            }
            log::debug!("Gait event on partition {} finished", event.partition);
            self.event = None;
            remaining = overshoot;
        }
        log::warn!("Dropped {:.3}s of step animation after {} chained steps", remaining, MAX_CHAINED_STEPS);
    }

    /// Evaluate the trigger and, if it fires, aim the selected legs at their
    /// velocity-biased rest positions on the terrain.
    fn start_gait_event<O: CollisionOracle + ?Sized>(&mut self, oracle: &O) -> Option<GaitEvent> {
        let rest_spheres = if self.debug.show_rest_positions {
            self.debug.reset_rest();
            Some(&mut self.debug.rest_spheres)
        } else {
            None
        };
        let trigger = evaluate_trigger(
            &self.creature,
            &self.partitions,
            &self.legs,
            self.body.speed(),
            self.params.move_all_legs,
            rest_spheres,
        )?;

        self.smooth_height(HeightMode::Follow);

        let up = self.creature.up_vector();
        let vx = self.creature.front_vector().dot(self.body.velocity) / self.params.max_speed;
        let vy = self.creature.right_vector().dot(self.body.velocity) / self.params.max_speed;
        let reach = -(self.params.max_leg_elevation - self.params.min_leg_elevation) * up;
        for &leg in &trigger.legs {
            let state = &mut self.legs[leg];
            state.origin = state.position;
            let rest = self.creature.biased_rest_position(leg, vx, vy);
            let ray = Ray::new(rest + self.params.max_leg_elevation * up, reach).with_color(STEP_RAY_COLOR);
            match oracle.ray_collides(&ray) {
                Some(hit) => {
                    state.target = hit;
                    state.rest_displacement = (hit - self.creature.rest_position(leg)).dot(up);
                }
                // Nothing to stand on: step in place.
                None => state.target = state.origin,
            }
            self.debug.rays.push(ray);
        }

        log::debug!("Gait event on partition {} moving {:?}", trigger.partition, trigger.legs);
        Some(trigger.into_event())
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// Turn held keys into a target velocity and keep the camera on the body.
    ///
    /// The camera is pulled in when a ray from the body toward the eye hits
    /// the terrain.
    pub fn handle_idle_frame<O: CollisionOracle + ?Sized>(&mut self, input: &InputState, oracle: &O) {
        let intent = input.move_intent(self.params.keyboard);
        let front = self.creature.front_vector();
        let right = self.creature.right_vector();
        let mut direction = Vec3::ZERO;
        if intent.forward {
            direction += front;
        }
        if intent.backward {
            direction -= front;
        }
        if intent.right {
            direction += right;
        }
        if intent.left {
            direction -= right;
        }
        self.body.target_velocity = self.params.max_speed * direction.normalize_or_zero();

        self.camera.update(input);
        let center = self.creature.translation();
        self.camera.distance_to_center = self.params.camera_max_distance;
        let director = (self.camera.camera_position() - center).try_normalize().unwrap_or(Vec3::Y);
        let ray = Ray::new(center, self.params.camera_max_distance * director);
        if let Some(hit) = oracle.ray_collides(&ray) {
            self.camera.distance_to_center = (hit - center).length() * CAMERA_OCCLUSION_MARGIN;
        }
        self.camera.look_at(center, self.creature.up_vector());
    }

    #[cfg(test)]
    fn clock_mut(&mut self) -> &mut K {
        &mut self.clock
    }

    #[cfg(test)]
    fn legs_mut(&mut self) -> &mut LegMap<LegState> {
        &mut self.legs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::ManualClock;
    use crate::engine::collision::Plane;
    use crate::engine::spider::Spider;

    type TestController = SpiderController<Spider, ManualClock>;

    fn controller_above(height: f32) -> TestController {
        SpiderController::new(
            Spider::new(Vec3::new(0.0, 0.0, height)),
            ManualClock::default(),
            Params::default(),
            (800, 600),
        )
    }

    /// Grounded on the plane z = 0 and settled.
    fn grounded() -> (TestController, Plane) {
        let plane = Plane::horizontal(0.0);
        let mut controller = controller_above(1.0);
        assert!(controller.ground_to_surface(&plane, true));
        (controller, plane)
    }

    /// Oracle with nothing in it.
    struct Void;

    /// Plane whose only hole is under the front left grounding ray.
    struct HoleUnderFrontLeft(Plane);

    impl CollisionOracle for HoleUnderFrontLeft {
        fn ray_collides(&self, ray: &Ray) -> Option<Vec3> {
            if ray.origin.x > 1.0 && ray.origin.y < 0.0 {
                return None;
            }
            self.0.ray_collides(ray)
        }
    }

    impl CollisionOracle for Void {
        fn ray_collides(&self, _ray: &Ray) -> Option<Vec3> {
            None
        }
    }

    #[test]
    fn grounding_places_feet_and_body() {
        let (controller, _) = grounded();
        for leg in Leg::ALL {
            let state = controller.leg(leg);
            assert!(state.position.z.abs() < 1e-5, "{leg} not on the plane");
            assert!(state.rest_displacement.abs() < 1e-5);
            assert!(controller.creature().leg_position(leg).abs_diff_eq(state.position, 1e-6));
        }
        let body = controller.creature().translation();
        assert!(body.abs_diff_eq(Vec3::new(0.0, 0.0, 0.6), 1e-5));
        assert!(controller.body().position.abs_diff_eq(body, 1e-6));
        assert_eq!(controller.debug().rays.len(), 9);
        assert_eq!(controller.debug().hits.len(), 8);
    }

    #[test]
    fn grounding_without_terrain_reports_failure() {
        let mut controller = controller_above(1.0);
        let before: Vec<Vec3> = Leg::ALL.iter().map(|&leg| controller.creature().leg_position(leg)).collect();
        assert!(!controller.ground_to_surface(&Void, true));
        for (i, leg) in Leg::ALL.into_iter().enumerate() {
            assert_eq!(controller.leg(leg).position, before[i]);
            assert_eq!(controller.leg(leg).rest_displacement, 0.0);
        }
        assert!(controller.debug().hits.is_empty());
    }

    #[test]
    fn regrounding_keeps_rest_displacement_of_missed_legs() {
        let (mut controller, plane) = grounded();
        controller.legs_mut()[Leg::FrontLeft].rest_displacement = 0.25;
        controller.legs_mut()[Leg::FrontRight].rest_displacement = 0.25;

        assert!(!controller.ground_to_surface(&HoleUnderFrontLeft(plane), true));
        assert_eq!(controller.leg(Leg::FrontLeft).rest_displacement, 0.25);
        for leg in Leg::ALL.into_iter().filter(|&leg| leg != Leg::FrontLeft) {
            assert!(controller.leg(leg).rest_displacement.abs() < 1e-5, "{leg} not refreshed");
        }
    }

    #[test]
    fn update_drops_grounding_hit_markers() {
        let (mut controller, plane) = grounded();
        assert_eq!(controller.debug().hits.len(), 8);
        controller.clock_mut().advance(1.0 / 60.0);
        controller.update(&plane);
        assert!(controller.debug().hits.is_empty());
    }

    #[test]
    fn grounding_on_a_slope_tilts_the_body_onto_the_normal() {
        let normal = Vec3::new(0.2, -0.3, 1.0).normalize();
        let plane = Plane::new(Vec3::ZERO, normal);
        let mut controller = controller_above(1.0);
        assert!(controller.ground_to_surface(&plane, true));
        assert!(controller.creature().up_vector().abs_diff_eq(normal, 1e-4));
    }

    #[test]
    fn settled_controller_is_idle_and_stays_idle() {
        let (mut controller, plane) = grounded();
        let legs_before = controller.legs;
        controller.animate(0.02, &plane);
        assert!(controller.gait_event().is_none());
        assert_eq!(controller.legs, legs_before);
    }

    #[test]
    fn drifting_leg_starts_a_step_for_its_partition() {
        let (mut controller, plane) = grounded();
        controller.legs_mut()[Leg::FrontLeft].position += Vec3::new(0.1, 0.0, 0.0);
        controller.animate(0.01, &plane);
        let event = controller.gait_event().expect("0.1 drift at rest must step");
        assert_eq!(event.partition, 0);
        assert_eq!(event.legs, vec![Leg::FrontLeft]);
        let rest = controller.creature().rest_position(Leg::FrontLeft);
        assert!(controller.leg(Leg::FrontLeft).target.abs_diff_eq(rest, 1e-4));
    }

    #[test]
    fn step_fed_its_full_duration_lands_on_target() {
        let (mut controller, plane) = grounded();
        controller.legs_mut()[Leg::FrontLeft].position += Vec3::new(0.1, 0.0, 0.0);
        let duration = controller.params().animation_duration();
        controller.animate(duration, &plane);

        let state = controller.leg(Leg::FrontLeft);
        assert!(state.position.abs_diff_eq(state.target, 1e-5));
        assert!(controller.gait_event().is_some(), "exactly the duration does not overshoot");
    }

    #[test]
    fn step_lifts_the_leg_at_mid_swing() {
        let (mut controller, plane) = grounded();
        controller.legs_mut()[Leg::FrontLeft].position += Vec3::new(0.1, 0.0, 0.0);
        let duration = controller.params().animation_duration();
        controller.animate(duration / 2.0, &plane);

        let state = controller.leg(Leg::FrontLeft);
        let expected = state.origin.lerp(state.target, 0.5) + Vec3::Z * controller.params().animation_height;
        assert!(state.position.abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn no_new_event_starts_mid_step() {
        let (mut controller, plane) = grounded();
        controller.legs_mut()[Leg::FrontLeft].position += Vec3::new(0.1, 0.0, 0.0);
        controller.animate(0.01, &plane);

        // Partition 1 now drifts far more, but the step in flight must finish first.
        controller.legs_mut()[Leg::FrontRight].position += Vec3::new(0.5, 0.0, 0.0);
        let stray = controller.leg(Leg::FrontRight).position;
        controller.animate(0.05, &plane);

        let event = controller.gait_event().unwrap();
        assert_eq!(event.partition, 0);
        assert!((event.elapsed - 0.06).abs() < 1e-6);
        assert_eq!(controller.leg(Leg::FrontRight).position, stray);
    }

    #[test]
    fn overshoot_carries_into_the_next_step() {
        let (mut controller, plane) = grounded();
        controller.legs_mut()[Leg::FrontLeft].position += Vec3::new(0.1, 0.0, 0.0);
        controller.animate(0.01, &plane);
        controller.legs_mut()[Leg::FrontRight].position += Vec3::new(0.5, 0.0, 0.0);

        let duration = controller.params().animation_duration();
        controller.animate(duration, &plane);

        let landed = controller.leg(Leg::FrontLeft);
        assert!(landed.position.abs_diff_eq(landed.target, 1e-5));
        let event = controller.gait_event().expect("front right steps with the carried time");
        assert_eq!(event.partition, 1);
        assert!((event.elapsed - 0.01).abs() < 1e-5);
    }

    #[test]
    fn long_stall_terminates() {
        let (mut controller, plane) = grounded();
        controller.legs_mut()[Leg::FrontLeft].position += Vec3::new(0.1, 0.0, 0.0);
        controller.animate(1_000.0, &plane);
        let landed = controller.leg(Leg::FrontLeft);
        assert!(landed.position.abs_diff_eq(landed.target, 1e-5));
        assert!(controller.gait_event().is_none());
    }

    #[test]
    fn chained_steps_stop_at_the_cap() {
        let (mut controller, plane) = grounded();
        // At full speed every landing on a biased rest position re-triggers.
        controller.body.velocity = Vec3::X * controller.params().max_speed;
        controller.legs_mut()[Leg::FrontLeft].position += Vec3::new(0.3, 0.0, 0.0);
        let duration = controller.params().animation_duration();

        controller.animate(duration * (MAX_CHAINED_STEPS + 8) as f32, &plane);

        assert!(controller.gait_event().is_none());
        let landed = controller.leg(Leg::FrontLeft);
        let biased = controller.creature().biased_rest_position(Leg::FrontLeft, 1.0, 0.0);
        assert!(landed.position.abs_diff_eq(biased, 1e-4));
        assert!(landed.position.abs_diff_eq(landed.target, 1e-5));
    }

    #[test]
    fn step_without_ground_stays_in_place() {
        let (mut controller, _) = grounded();
        controller.legs_mut()[Leg::FrontLeft].position += Vec3::new(0.1, 0.0, 0.0);
        let origin = controller.leg(Leg::FrontLeft).position;
        let duration = controller.params().animation_duration();
        controller.animate(duration, &Void);
        assert!(controller.leg(Leg::FrontLeft).position.abs_diff_eq(origin, 1e-5));
    }

    #[test]
    fn update_with_no_elapsed_time_keeps_everything() {
        let (mut controller, plane) = grounded();
        let before = (controller.body, controller.legs);
        controller.update(&plane);
        assert!(controller.body.position.abs_diff_eq(before.0.position, 1e-5));
        for leg in Leg::ALL {
            assert!(controller.leg(leg).position.abs_diff_eq(before.1[leg].position, 1e-5));
        }
        assert!(controller.gait_event().is_none());
    }

    #[test]
    fn held_forward_key_walks_the_body_forward() {
        let (mut controller, plane) = grounded();
        let mut input = InputState::new();
        input.hold_char("z");
        let start = controller.body().position;

        let mut stepped = false;
        for _ in 0..120 {
            controller.handle_idle_frame(&input, &plane);
            controller.clock_mut().advance(1.0 / 60.0);
            controller.update(&plane);
            stepped |= controller.gait_event().is_some();
        }

        let moved = controller.body().position - start;
        assert!(moved.x > 0.5, "body moved {moved:?}");
        assert!(moved.y.abs() < 0.05);
        assert!((controller.body().position.z - 0.6).abs() < 0.2);
        assert!((controller.body().velocity.length() - 0.8).abs() < 1e-4);
        assert!(stepped, "walking must trigger steps");
        for leg in Leg::ALL {
            let foot = controller.leg(leg).position;
            let rest = controller.creature().rest_position(leg);
            assert!((foot - rest).length() < 1.0, "{leg} left behind");
        }
    }

    #[test]
    fn diagonal_intent_is_normalized() {
        let (mut controller, plane) = grounded();
        controller.settings_mut().0.keyboard = crate::engine::input::KeyboardLayout::Qwerty;
        let mut input = InputState::new();
        input.hold_char("w");
        input.hold_char("d");
        controller.handle_idle_frame(&input, &plane);
        let target = controller.body().target_velocity;
        assert!((target.length() - 0.8).abs() < 1e-6);
        assert!(target.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0).normalize() * 0.8, 1e-6));
    }

    #[test]
    fn camera_is_pulled_in_when_terrain_blocks_it() {
        let (mut controller, _) = grounded();
        let input = InputState::new();

        controller.handle_idle_frame(&input, &Void);
        assert_eq!(controller.camera().distance_to_center, 4.0);

        // A wall one unit behind the body, across the camera's line of sight.
        let wall = Plane::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::X);
        controller.handle_idle_frame(&input, &wall);
        let distance = controller.camera().distance_to_center;
        let expected = 1.0 / controller.camera().pitch.cos() * 0.95;
        assert!((distance - expected).abs() < 1e-4, "camera at {distance}");
    }
}
