//! # Ronin Engine
//!
//! Headless driver for Project Ronin levels.
//!
//! The windowing shell (rendering, audio playback, menus) lives outside the
//! simulation. This crate stands in for it:
//! - Runner configuration loaded from `ronin.toml`
//! - JSON input scripts replacing live key presses
//! - A fixed-step frame loop that reports the outcome as JSON

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod runner;
pub mod script;

pub use config::{EngineConfig, CONFIG_FILE, DEFAULT_LOG_FILTER};
pub use runner::{RunReport, Session};
pub use script::{InputScript, InputStep, ScriptError};
