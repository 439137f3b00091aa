//! Key and pointer state shared between the host and the tick loop
//!
//! The host writes, the session reads once per frame. Latest value wins:
//! there is no event queue, only the current record.

use std::collections::HashSet;

use glam::Vec2;

use crate::sim::{PlayerIntent, Rect, TickInput};

/// Player one: up, down, ability
pub const P1_KEYS: [&str; 3] = ["w", "s", " "];
/// Player two: up, down, ability
pub const P2_KEYS: [&str; 3] = ["ArrowUp", "ArrowDown", "Enter"];
/// Toggles pause in single-player sessions
pub const PAUSE_KEY: &str = "Escape";

/// Active pointer drag on player one's car
#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    /// Distance from the car's top edge to the grab point
    grab_offset: f32,
    /// Latest requested top edge, `None` until the pointer moves
    target_y: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashSet<String>,
    pause_requested: bool,
    drag: Option<Drag>,
}

/// Single-character keys are matched case-insensitively (caps lock, shift)
fn normalize(key: &str) -> String {
    if key.chars().count() == 1 {
        key.to_lowercase()
    } else {
        key.to_string()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `key` belongs to the control scheme (hosts suppress its default action)
    pub fn is_bound(key: &str) -> bool {
        let key = normalize(key);
        key == PAUSE_KEY || P1_KEYS.contains(&key.as_str()) || P2_KEYS.contains(&key.as_str())
    }

    /// Record a key press. Returns whether the key is bound.
    pub fn key_down(&mut self, key: &str) -> bool {
        let key = normalize(key);
        if key == PAUSE_KEY {
            self.pause_requested = true;
            return true;
        }
        let bound = Self::is_bound(&key);
        if bound {
            self.held.insert(key);
        }
        bound
    }

    pub fn key_up(&mut self, key: &str) {
        self.held.remove(&normalize(key));
    }

    /// Start a drag if `at` lands on `car`. Returns whether the drag started.
    pub fn pointer_down(&mut self, at: Vec2, car: &Rect) -> bool {
        if !car.contains(at) {
            return false;
        }
        self.drag = Some(Drag {
            grab_offset: at.y - car.min.y,
            target_y: None,
        });
        true
    }

    pub fn pointer_move(&mut self, y: f32) {
        if let Some(drag) = &mut self.drag {
            drag.target_y = Some(y - drag.grab_offset);
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Forget everything held (focus lost)
    pub fn release_all(&mut self) {
        self.held.clear();
        self.drag = None;
    }

    /// Current record as a tick input
    pub fn snapshot(&self) -> TickInput {
        let intent = |[up, down, action]: [&str; 3]| PlayerIntent {
            up: self.held.contains(up),
            down: self.held.contains(down),
            action: self.held.contains(action),
        };
        TickInput {
            players: [intent(P1_KEYS), intent(P2_KEYS)],
            pause: self.pause_requested,
            drag_y: self.drag.and_then(|d| d.target_y),
        }
    }

    /// Drop one-shot requests after a tick consumed them
    pub fn clear_one_shots(&mut self) {
        self.pause_requested = false;
    }
}
