//! Scripted input for headless runs.
//!
//! A script is a JSON document listing input steps, each lasting a number
//! of frames:
//!
//! ```json
//! {
//!   "name": "advance",
//!   "steps": [
//!     { "type": "hold", "actions": ["move_right"], "frames": 30 },
//!     { "type": "wait", "frames": 10 },
//!     { "type": "hold", "actions": ["attack"], "frames": 1 }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use ronin_gameplay::{Action, InputState};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors raised while loading a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Malformed JSON
    #[error("failed to parse input script: {0}")]
    Parse(#[from] serde_json::Error),
    /// Unreadable file
    #[error("failed to read input script {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// A step that never advances
    #[error("step {index} of script '{name}' lasts zero frames")]
    EmptyStep {
        /// Script name
        name: String,
        /// Step index
        index: usize,
    },
}

/// One step of an input script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputStep {
    /// Hold a set of actions
    Hold {
        /// Actions held every frame of the step
        actions: Vec<Action>,
        /// Number of frames
        frames: u64,
    },
    /// Hold nothing
    Wait {
        /// Number of frames
        frames: u64,
    },
}

impl InputStep {
    /// Frames covered by the step.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        match self {
            Self::Hold { frames, .. } | Self::Wait { frames } => *frames,
        }
    }

    fn input(&self) -> InputState {
        match self {
            Self::Hold { actions, .. } => actions.iter().copied().collect(),
            Self::Wait { .. } => InputState::new(),
        }
    }
}

/// A named input timeline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputScript {
    /// Script name
    pub name: String,
    /// Description of what the script does
    #[serde(default)]
    pub description: Option<String>,
    /// Steps in order
    pub steps: Vec<InputStep>,
    /// Loop back to the first step after the last
    #[serde(default)]
    pub repeat: bool,
}

impl InputScript {
    /// Parses and validates a script from JSON.
    pub fn from_json_str(source: &str) -> Result<Self, ScriptError> {
        let script: Self = serde_json::from_str(source)?;
        script.validate()?;
        Ok(script)
    }

    /// Loads a script file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let script = Self::from_json_str(&source)?;
        info!("Loaded script '{}' with {} steps", script.name, script.steps.len());
        Ok(script)
    }

    /// Rejects zero-length steps.
    pub fn validate(&self) -> Result<(), ScriptError> {
        match self.steps.iter().position(|step| step.frames() == 0) {
            Some(index) => Err(ScriptError::EmptyStep {
                name: self.name.clone(),
                index,
            }),
            None => Ok(()),
        }
    }

    /// Frames covered by one pass over the steps.
    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.steps.iter().map(InputStep::frames).sum()
    }

    /// Input held during `frame` (0-based).
    ///
    /// Frames past the end hold nothing unless the script repeats.
    #[must_use]
    pub fn input_at(&self, frame: u64) -> InputState {
        let total = self.total_frames();
        if total == 0 {
            return InputState::new();
        }
        let mut frame = if self.repeat { frame % total } else { frame };

        for step in &self.steps {
            if frame < step.frames() {
                return step.input();
            }
            frame -= step.frames();
        }
        InputState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ADVANCE: &str = r#"{
        "name": "advance",
        "steps": [
            { "type": "hold", "actions": ["move_right"], "frames": 3 },
            { "type": "wait", "frames": 2 },
            { "type": "hold", "actions": ["attack", "move_right"], "frames": 1 }
        ]
    }"#;

    #[test]
    fn test_timeline_lookup() {
        let script = InputScript::from_json_str(ADVANCE).expect("script");
        assert_eq!(script.total_frames(), 6);

        assert!(script.input_at(0).pressed(Action::MoveRight));
        assert!(script.input_at(2).pressed(Action::MoveRight));
        assert!(script.input_at(3).is_empty());
        assert!(script.input_at(4).is_empty());

        let swing = script.input_at(5);
        assert!(swing.pressed(Action::Attack));
        assert!(swing.pressed(Action::MoveRight));

        assert!(script.input_at(6).is_empty());
        assert!(script.input_at(1000).is_empty());
    }

    #[test]
    fn test_repeat_wraps() {
        let mut script = InputScript::from_json_str(ADVANCE).expect("script");
        script.repeat = true;
        assert!(script.input_at(6).pressed(Action::MoveRight));
        assert!(script.input_at(11).pressed(Action::Attack));
    }

    #[test]
    fn test_empty_script_holds_nothing() {
        let script = InputScript::default();
        assert_eq!(script.total_frames(), 0);
        assert!(script.input_at(0).is_empty());
    }

    #[test]
    fn test_zero_length_step_rejected() {
        let source = r#"{ "name": "bad", "steps": [ { "type": "wait", "frames": 0 } ] }"#;
        match InputScript::from_json_str(source) {
            Err(ScriptError::EmptyStep { name, index }) => {
                assert_eq!(name, "bad");
                assert_eq!(index, 0);
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        let source = r#"{ "name": "bad", "steps": [ { "type": "hold", "actions": ["fly"], "frames": 1 } ] }"#;
        assert!(matches!(InputScript::from_json_str(source), Err(ScriptError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("advance.json");
        std::fs::write(&path, ADVANCE).expect("write");

        let script = InputScript::load_from(&path).expect("script");
        assert_eq!(script.name, "advance");
        assert!(matches!(
            InputScript::load_from(temp_dir.path().join("missing.json")),
            Err(ScriptError::Io { .. })
        ));
    }
}
