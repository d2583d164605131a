// Input state tracking for keyboard and mouse
// Abstracts winit events into a queryable per-frame snapshot

use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{Key, NamedKey};

/// Which keys steer the creature.
///
/// Letter layouts match on the character the key produces, so AZERTY users get
/// Z/Q/S/D where the keys are printed rather than where QWERTY puts W/A/S/D.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardLayout {
    Qwerty,
    Azerty,
    Arrows,
}

impl KeyboardLayout {
    pub const ALL: [KeyboardLayout; 3] = [KeyboardLayout::Qwerty, KeyboardLayout::Azerty, KeyboardLayout::Arrows];

    pub fn label(self) -> &'static str {
        match self {
            KeyboardLayout::Qwerty => "QWERTY",
            KeyboardLayout::Azerty => "AZERTY",
            KeyboardLayout::Arrows => "Keyboard Arrows",
        }
    }
}

/// Directions the player is currently asking for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

pub struct InputState {
    // Keyboard: characters are stored lowercase
    chars_held: HashSet<String>,
    named_held: HashSet<NamedKey>,
    pub shift: bool,

    // Mouse
    pub mouse_position: (f32, f32),
    mouse_prev_position: (f32, f32),
    pub mouse_delta: (f32, f32),
    pub mouse_left_held: bool,

    // Window dimensions
    pub window_size: (u32, u32),
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            chars_held: HashSet::new(),
            named_held: HashSet::new(),
            shift: false,
            mouse_position: (0.0, 0.0),
            mouse_prev_position: (0.0, 0.0),
            mouse_delta: (0.0, 0.0),
            mouse_left_held: false,
            window_size: (0, 0),
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the game's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                match &event.logical_key {
                    Key::Character(c) => self.set_char(c, pressed),
                    Key::Named(named) => {
                        if pressed {
                            self.named_held.insert(*named);
                        } else {
                            self.named_held.remove(named);
                        }
                    }
                    _ => {}
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.shift = modifiers.state().shift_key();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.mouse_left_held = *state == ElementState::Pressed;
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            WindowEvent::Focused(false) => {
                // Releases are lost while unfocused.
                self.chars_held.clear();
                self.named_held.clear();
                self.mouse_left_held = false;
            }
            _ => {}
        }
    }

    fn set_char(&mut self, c: &str, pressed: bool) {
        let c = c.to_lowercase();
        if pressed {
            self.chars_held.insert(c);
        } else {
            self.chars_held.remove(&c);
        }
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.mouse_delta = (
            self.mouse_position.0 - self.mouse_prev_position.0,
            self.mouse_position.1 - self.mouse_prev_position.1,
        );
        self.mouse_prev_position = self.mouse_position;
    }

    pub fn is_char_held(&self, c: &str) -> bool {
        self.chars_held.contains(c)
    }

    pub fn is_named_held(&self, key: NamedKey) -> bool {
        self.named_held.contains(&key)
    }

    pub fn move_intent(&self, layout: KeyboardLayout) -> MoveIntent {
        match layout {
            KeyboardLayout::Qwerty => MoveIntent {
                forward: self.is_char_held("w"),
                backward: self.is_char_held("s"),
                left: self.is_char_held("a"),
                right: self.is_char_held("d"),
            },
            KeyboardLayout::Azerty => MoveIntent {
                forward: self.is_char_held("z"),
                backward: self.is_char_held("s"),
                left: self.is_char_held("q"),
                right: self.is_char_held("d"),
            },
            KeyboardLayout::Arrows => MoveIntent {
                forward: self.is_named_held(NamedKey::ArrowUp),
                backward: self.is_named_held(NamedKey::ArrowDown),
                left: self.is_named_held(NamedKey::ArrowLeft),
                right: self.is_named_held(NamedKey::ArrowRight),
            },
        }
    }

    #[cfg(test)]
    pub fn hold_char(&mut self, c: &str) {
        self.set_char(c, true);
    }

    #[cfg(test)]
    pub fn hold_named(&mut self, key: NamedKey) {
        self.named_held.insert(key);
    }
}
