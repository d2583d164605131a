// Engine module - locomotion core plus the ECS scene it drives
// The host in main.rs owns the window and renderer; everything here is windowing-agnostic
// except `input` and `debug_overlay`.

pub mod camera;
pub mod clock;
pub mod collision;
pub mod components;
pub mod controller;
pub mod debug;
pub mod debug_overlay;
pub mod gait;
pub mod input;
pub mod integrator;
pub mod orientation;
pub mod params;
pub mod spider;
pub mod systems;
pub mod terrain;

// Re-export commonly used items
pub use components::*;
