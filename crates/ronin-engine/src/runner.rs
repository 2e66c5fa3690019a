//! Headless frame loop.
//!
//! Stands in for the windowing shell: steps a level at a fixed delta,
//! feeding it scripted input, and summarizes the outcome.

use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use ronin_gameplay::{FrameSnapshot, HudState, InputState, Level, LevelLayout, LevelStatus, Roster};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::script::InputScript;

/// Outcome of a headless run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Level name
    pub level: String,
    /// Script name, if one was loaded
    pub script: Option<String>,
    /// Frames simulated
    pub frames: u64,
    /// Simulation clock at the end of the run
    pub time_ms: u64,
    /// Final status
    pub status: LevelStatus,
    /// Frame at which the status left `Normal`
    pub decided_at: Option<u64>,
    /// Number of events raised, by event name
    pub events: BTreeMap<String, usize>,
    /// Events lost to a frame that overflowed the event bus
    pub dropped_events: usize,
    /// Final HUD values
    pub hud: HudState,
    /// Final render snapshot
    pub snapshot: FrameSnapshot,
}

/// A level bound to its input script and run settings.
#[derive(Debug)]
pub struct Session {
    level: Level,
    script: Option<InputScript>,
    dt: f32,
    frame_limit: u64,
    linger_frames: u64,
}

impl Session {
    /// Loads the roster, layout and script named by `config`.
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let roster = match &config.moveset_path {
            Some(path) => {
                let source =
                    fs::read_to_string(path).with_context(|| format!("reading move sets {}", path.display()))?;
                Roster::from_toml_str(&source).with_context(|| format!("parsing move sets {}", path.display()))?
            },
            None => Roster::builtin().context("loading built-in move sets")?,
        };

        let layout = match &config.layout_path {
            Some(path) => LevelLayout::load_from(path).with_context(|| format!("loading level {}", path.display()))?,
            None => LevelLayout::builtin().context("loading built-in level")?,
        };

        let script = config
            .script_path
            .as_ref()
            .map(|path| InputScript::load_from(path).with_context(|| format!("loading script {}", path.display())))
            .transpose()?;

        let level = Level::new(layout, roster, config.seed).context("building level")?;
        Ok(Self::new(level, script, config))
    }

    /// Wraps an already built level.
    #[must_use]
    pub fn new(level: Level, script: Option<InputScript>, config: &EngineConfig) -> Self {
        Self {
            level,
            script,
            dt: config.frame_dt(),
            frame_limit: config.frame_limit,
            linger_frames: config.linger_frames,
        }
    }

    /// The level being driven.
    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Runs until the frame limit, or until the status is decided and the
    /// linger frames have elapsed.
    pub fn run(&mut self) -> RunReport {
        let mut events: BTreeMap<String, usize> = BTreeMap::new();
        let mut decided_at = None;
        let mut frames = 0;

        while frames < self.frame_limit {
            let input = self
                .script
                .as_ref()
                .map_or_else(InputState::new, |script| script.input_at(frames));
            let status = self.level.update(self.dt, &input);
            frames += 1;

            for event in self.level.drain_events() {
                *events.entry(event.name().to_string()).or_default() += 1;
            }

            if status != LevelStatus::Normal && decided_at.is_none() {
                info!("Level '{}' ended {status:?} at frame {frames}", self.level.layout().name);
                decided_at = Some(frames);
            }
            if decided_at.is_some_and(|at| frames - at >= self.linger_frames) {
                break;
            }
        }

        debug!("Run finished after {frames} frames");
        RunReport {
            level: self.level.layout().name.clone(),
            script: self.script.as_ref().map(|script| script.name.clone()),
            frames,
            time_ms: self.level.now(),
            status: self.level.status(),
            decided_at,
            events,
            dropped_events: self.level.dropped_events(),
            hud: self.level.hud(),
            snapshot: self.level.snapshot(),
        }
    }
}
