// Tuning values for the locomotion controller.
// Defaults are the values the creature was tuned with; the overlay edits them live.

use super::input::KeyboardLayout;

/// Length of the grounding rays cast below each hip.
pub const GROUND_RAY_LENGTH: f32 = 5.0;

/// Below this speed the creature counts as standing still.
pub const STATIONARY_SPEED: f32 = 0.01;

/// Rest radius while standing still. Tighter so idle legs settle neatly.
pub const REST_RADIUS_STATIONARY: f32 = 0.07;

/// Rest radius while walking.
pub const REST_RADIUS_MOVING: f32 = 0.2;

/// Base duration of one step, in seconds, at unit speed and unit animation speed.
pub const BASE_STEP_DURATION: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    /// Height of the body above the average leg position.
    pub body_height: f32,
    /// How far beyond the hip, in multiples of the hip distance, grounding rays start.
    pub rest_position_distance: f32,
    /// Velocity change per second while steering toward the target velocity.
    pub acceleration: f32,
    pub max_speed: f32,
    /// Step target rays start this far above the rest position...
    pub max_leg_elevation: f32,
    /// ...and end this far (negative = below) from it.
    pub min_leg_elevation: f32,
    pub animation_speed: f32,
    /// Peak lift of a stepping leg.
    pub animation_height: f32,
    /// Longest integration sub-step, in seconds.
    pub max_dt: f32,
    pub camera_max_distance: f32,
    /// Step every leg of the chosen partition instead of only the drifting ones.
    pub move_all_legs: bool,
    pub keyboard: KeyboardLayout,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            body_height: 0.6,
            rest_position_distance: 1.5,
            acceleration: 0.9,
            max_speed: 0.8,
            max_leg_elevation: 1.0,
            min_leg_elevation: -0.7,
            animation_speed: 1.0,
            animation_height: 0.2,
            max_dt: 0.04,
            camera_max_distance: 4.0,
            move_all_legs: false,
            keyboard: KeyboardLayout::Azerty,
        }
    }
}

impl Params {
    /// Duration of one gait event. Faster creatures take quicker steps.
    pub fn animation_duration(&self) -> f32 {
        BASE_STEP_DURATION / self.animation_speed / self.max_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_step_lasts_three_eighths_of_a_second() {
        let params = Params::default();
        assert_eq!(params.animation_speed, 1.0);
        assert_eq!(params.max_speed, 0.8);
        assert!((params.animation_duration() - 0.375).abs() < 1e-6);
    }

    #[test]
    fn faster_animation_shortens_steps() {
        let params = Params { animation_speed: 2.0, max_speed: 1.5, ..Params::default() };
        assert!((params.animation_duration() - 0.1).abs() < 1e-6);
    }
}
