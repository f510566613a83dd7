//! Engine configuration

use crossbeam::atomic::AtomicCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Errors raised while loading or validating a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML syntax or schema error
    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax or schema error
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value the engine cannot run with
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Runtime options for one engine instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial pacing target; zero or negative runs unbounded
    pub steps_per_second: f64,

    /// Ticks per host frame when unbounded
    pub max_steps_per_frame: usize,

    /// Consecutive steps a thread runs before it moves to the back of the queue
    pub time_slice: usize,

    /// Operand stack slots per thread
    pub max_stack_depth: usize,

    /// Call frames per thread before `StackOverflowError` is thrown
    pub max_call_depth: usize,

    /// Name of the thread created by `Engine::spawn_main`
    pub main_thread_name: String,

    /// Keep a journal of monitor acquisitions and releases
    pub record_monitor_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            steps_per_second: -1.0,
            max_steps_per_frame: 100_000,
            time_slice: 1,
            max_stack_depth: 64 * 1024,
            max_call_depth: 4096,
            main_thread_name: "main".to_string(),
            record_monitor_events: false,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = "must be greater than zero";
        if self.time_slice == 0 {
            return Err(ConfigError::Invalid { field: "time_slice", reason: zero });
        }
        if self.max_stack_depth == 0 {
            return Err(ConfigError::Invalid { field: "max_stack_depth", reason: zero });
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid { field: "max_call_depth", reason: zero });
        }
        if self.max_steps_per_frame == 0 {
            return Err(ConfigError::Invalid { field: "max_steps_per_frame", reason: zero });
        }
        if self.steps_per_second.is_nan() {
            return Err(ConfigError::Invalid {
                field: "steps_per_second",
                reason: "must be a number",
            });
        }
        Ok(())
    }
}

/// Shared steps-per-second setting
///
/// The host may change it between frames; it only affects how many ticks a
/// frame runs, never their order.
#[derive(Debug, Clone)]
pub struct SpeedControl(Arc<AtomicCell<f64>>);

impl SpeedControl {
    pub fn new(steps_per_second: f64) -> Self {
        Self(Arc::new(AtomicCell::new(steps_per_second)))
    }

    pub fn get(&self) -> f64 {
        self.0.load()
    }

    pub fn set(&self, steps_per_second: f64) {
        self.0.store(steps_per_second);
    }

    /// Zero or negative means as fast as possible
    pub fn is_unbounded(&self) -> bool {
        self.get() <= 0.0
    }
}
