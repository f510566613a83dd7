//! Engine entry point
//!
//! [`EngineContext`] is the read-only part shared by every thread: the
//! configuration, the type graph with the installed library, and the speed
//! setting. [`Engine`] pairs it with a [`Scheduler`].

use crate::config::{EngineConfig, SpeedControl};
use crate::error::EngineResult;
use crate::exception::JavaException;
use crate::java_lang;
use crate::library::{LibraryClass, LibraryRegistry};
use crate::program::Program;
use crate::scheduler::{Clock, FrameReport, MonotonicClock, Scheduler, TickOutcome};
use crate::thread::ThreadId;
use crate::trace::{ExceptionSink, TracingSink};
use crate::value::{ObjectHandle, Value};
use kava_types::TypeGraph;
use std::sync::Arc;
use std::time::Duration;

/// Shared, immutable engine state
#[derive(Debug)]
pub struct EngineContext {
    config: EngineConfig,
    types: TypeGraph,
    library: LibraryRegistry,
    speed: SpeedControl,
}

impl EngineContext {
    /// Validate the configuration and install `java.lang` plus `classes`
    pub fn new(config: EngineConfig, classes: Vec<LibraryClass>) -> EngineResult<Self> {
        config.validate()?;
        let mut types = TypeGraph::new();
        let mut library = LibraryRegistry::new();
        library.install(&mut types, java_lang::classes())?;
        if !classes.is_empty() {
            library.install(&mut types, classes)?;
        }
        let speed = SpeedControl::new(config.steps_per_second);
        Ok(Self {
            config,
            types,
            library,
            speed,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn types(&self) -> &TypeGraph {
        &self.types
    }

    pub fn library(&self) -> &LibraryRegistry {
        &self.library
    }

    pub fn speed(&self) -> &SpeedControl {
        &self.speed
    }

    /// Exception of a declared class, catchable as any of its supertypes
    pub fn exception(&self, identifier: &str, message: Option<String>) -> EngineResult<Arc<JavaException>> {
        let id = self.types.require(identifier)?;
        Ok(Arc::new(JavaException::new(
            identifier,
            message,
            self.types.ancestors(id),
        )))
    }

    pub fn new_object(&self, class: &str) -> EngineResult<Value> {
        let id = self.types.require(class)?;
        Ok(Value::Object(ObjectHandle::new(id)))
    }
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    config: EngineConfig,
    classes: Vec<LibraryClass>,
    clock: Option<Arc<dyn Clock>>,
    sink: Option<Arc<dyn ExceptionSink>>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            clock: None,
            sink: None,
        }
    }

    /// Library classes installed after `java.lang`
    pub fn with_library(mut self, classes: Vec<LibraryClass>) -> Self {
        self.classes.extend(classes);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ExceptionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> EngineResult<Engine> {
        let context = Arc::new(EngineContext::new(self.config, self.classes)?);
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        tracing::debug!(
            classes = context.library().class_count(),
            "engine ready"
        );
        Ok(Engine {
            scheduler: Scheduler::new(context.clone(), clock, sink),
            context,
        })
    }
}

/// A program instance: shared context plus its scheduler
pub struct Engine {
    context: Arc<EngineContext>,
    scheduler: Scheduler,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Engine with the default clock and the tracing sink
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        EngineBuilder::new(config).build()
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.context
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Start the main thread
    pub fn spawn_main(&mut self, program: Arc<Program>, args: Vec<Value>) -> EngineResult<ThreadId> {
        let name = self.context.config().main_thread_name.clone();
        self.scheduler.spawn(name, program, args)
    }

    pub fn spawn(&mut self, name: impl Into<String>, program: Arc<Program>, args: Vec<Value>) -> EngineResult<ThreadId> {
        self.scheduler.spawn(name, program, args)
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.scheduler.tick()
    }

    /// Tick until nothing is runnable, at most `max_ticks` times
    pub fn run(&mut self, max_ticks: usize) -> TickOutcome {
        self.scheduler.run(max_ticks)
    }

    /// Run the ticks one host frame of length `frame` allows
    pub fn run_frame(&mut self, frame: Duration) -> FrameReport {
        self.scheduler.run_frame(frame)
    }

    /// Host handle for changing the pace between frames
    pub fn speed(&self) -> SpeedControl {
        self.context.speed().clone()
    }
}
