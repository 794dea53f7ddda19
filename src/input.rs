//! Six-button input handle.
//!
//! The actor owns one of these for its whole lifetime. External code
//! (player logic, AI, cutscenes) injects buttons with [`ActorInput::simulate_down`]
//! before each frame; the simulation reads them as "held this frame" or
//! "pressed this frame" (rising edge) and the handle is aged at the end
//! of the frame, so an injected button lasts exactly one frame.

use bevy::prelude::*;

/// The digital buttons understood by the physics actor.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Move left.
    Left,
    /// Move right.
    Right,
    /// Look up / charge modifier.
    Up,
    /// Duck / roll modifier.
    Down,
    /// Jump / spin charge.
    Fire1,
    /// Reserved.
    Fire2,
}

const BUTTON_COUNT: usize = 6;

/// A six-button programmable input device.
#[derive(Reflect, Debug, Clone, Default)]
pub struct ActorInput {
    current: [bool; BUTTON_COUNT],
    previous: [bool; BUTTON_COUNT],
    disabled: bool,
}

impl ActorInput {
    /// Create a handle with all buttons up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Is the button held this frame?
    pub fn down(&self, button: Button) -> bool {
        !self.disabled && self.current[button as usize]
    }

    /// Was the button pressed this frame (up on the previous frame)?
    pub fn pressed(&self, button: Button) -> bool {
        !self.disabled && self.current[button as usize] && !self.previous[button as usize]
    }

    /// Hold a button for the current frame.
    pub fn simulate_down(&mut self, button: Button) {
        self.current[button as usize] = true;
    }

    /// Release a button for the current frame.
    pub fn simulate_up(&mut self, button: Button) {
        self.current[button as usize] = false;
    }

    /// Release every button, forget edge history and re-enable the device.
    pub fn reset(&mut self) {
        self.current = [false; BUTTON_COUNT];
        self.previous = [false; BUTTON_COUNT];
        self.disabled = false;
    }

    /// Make every query report "up" until [`ActorInput::reset`] is called.
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    /// Age the device by one frame: the current state becomes history and
    /// all buttons are released, waiting for the next round of injection.
    pub(crate) fn advance(&mut self) {
        self.previous = self.current;
        self.current = [false; BUTTON_COUNT];
    }
}
