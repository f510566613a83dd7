//! Shared helpers for engine integration tests

#![allow(dead_code)]

use kava_engine::{
    CollectingSink, Engine, EngineConfig, EngineResult, LibraryClass, ManualClock, StepContext,
    StepOutcome, Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

pub type Log = Arc<Mutex<Vec<String>>>;

pub struct Harness {
    pub engine: Engine,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<CollectingSink>,
    pub log: Log,
}

impl Harness {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_library(config, Vec::new())
    }

    pub fn with_library(config: EngineConfig, classes: Vec<LibraryClass>) -> Self {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(CollectingSink::new());
        let engine = Engine::builder(config)
            .with_library(classes)
            .with_clock(clock.clone())
            .with_sink(sink.clone())
            .build()
            .unwrap();
        Self {
            engine,
            clock,
            sink,
            log: Log::default(),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn object(&self) -> Value {
        self.engine.context().new_object("Object").unwrap()
    }
}

pub fn journaled() -> EngineConfig {
    EngineConfig {
        record_monitor_events: true,
        ..EngineConfig::default()
    }
}

/// Step appending `entry` to the log
pub fn record(
    log: &Log,
    entry: &str,
) -> impl Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static {
    let log = log.clone();
    let entry = entry.to_string();
    move |_| {
        log.lock().push(entry.clone());
        Ok(StepOutcome::Next)
    }
}

/// Step popping a caught exception and logging its class
pub fn record_caught(
    log: &Log,
) -> impl Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static {
    let log = log.clone();
    move |ctx| {
        let caught = ctx.pop()?;
        log.lock().push(caught.as_exception()?.identifier().to_string());
        Ok(StepOutcome::Next)
    }
}

/// Step returning a fixed outcome
pub fn emit(
    outcome: StepOutcome,
) -> impl Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static {
    move |_| Ok(outcome.clone())
}
