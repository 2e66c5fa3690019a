//! Abstract input actions and the per-frame pressed-action snapshot.
//!
//! Raw key codes and their bindings belong to the windowing shell; the
//! simulation only sees which abstract actions are held this frame.

use serde::{Deserialize, Serialize};

/// Abstract input action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Accelerate left
    MoveLeft,
    /// Accelerate right
    MoveRight,
    /// Jump (also mashes out of a knockdown)
    Jump,
    /// Dash in the facing direction
    Dash,
    /// Melee attack
    Attack,
    /// Spend a heal charge
    Heal,
    /// Menu / cancel; interpreted by the shell, not the simulation
    Cancel,
}

impl Action {
    /// Every action.
    pub const ALL: [Self; 7] = [
        Self::MoveLeft,
        Self::MoveRight,
        Self::Jump,
        Self::Dash,
        Self::Attack,
        Self::Heal,
        Self::Cancel,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Snapshot of the actions held during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputState {
    pressed: u8,
}

impl InputState {
    /// Creates an empty input state.
    #[must_use]
    pub const fn new() -> Self {
        Self { pressed: 0 }
    }

    /// Returns the state with `action` held.
    #[must_use]
    pub const fn with(mut self, action: Action) -> Self {
        self.pressed |= action.bit();
        self
    }

    /// Marks an action as held.
    pub fn press(&mut self, action: Action) {
        self.pressed |= action.bit();
    }

    /// Marks an action as released.
    pub fn release(&mut self, action: Action) {
        self.pressed &= !action.bit();
    }

    /// Whether an action is held.
    #[must_use]
    pub const fn pressed(&self, action: Action) -> bool {
        self.pressed & action.bit() != 0
    }

    /// Whether nothing is held.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pressed == 0
    }

    /// Iterates over held actions.
    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL.into_iter().filter(|&action| self.pressed(action))
    }
}

impl FromIterator<Action> for InputState {
    fn from_iter<T: IntoIterator<Item = Action>>(iter: T) -> Self {
        let mut state = Self::new();
        for action in iter {
            state.press(action);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release() {
        let mut input = InputState::new();
        assert!(input.is_empty());

        input.press(Action::Attack);
        input.press(Action::MoveLeft);
        assert!(input.pressed(Action::Attack));
        assert!(input.pressed(Action::MoveLeft));
        assert!(!input.pressed(Action::MoveRight));

        input.release(Action::Attack);
        assert!(!input.pressed(Action::Attack));
        assert!(!input.is_empty());
    }

    #[test]
    fn test_collect_and_iterate() {
        let input: InputState = [Action::Jump, Action::Dash].into_iter().collect();
        let held: Vec<Action> = input.iter().collect();
        assert_eq!(held, vec![Action::Jump, Action::Dash]);
    }

    #[test]
    fn test_with_builder() {
        let input = InputState::new().with(Action::Heal).with(Action::Cancel);
        assert!(input.pressed(Action::Heal));
        assert!(input.pressed(Action::Cancel));
    }
}
