//! Kava Execution Engine
//!
//! Runs compiled Java-like programs on a single host thread:
//! - **Scheduler**: cooperative round-robin over Java threads with a
//!   configurable time slice and steps-per-second pacing (`scheduler` module)
//! - **Threads**: per-thread value stack, call frames and lifecycle states
//!   (`thread`, `stack` modules)
//! - **Exceptions**: try/catch/finally unwinding that releases monitors on the
//!   way out (`exception`, `trace` modules)
//! - **Synchronization**: reentrant monitors with wait sets, and counting
//!   semaphores (`sync` module)
//! - **Library**: class declarations with native, Java and template methods,
//!   installed into the type graph (`library`, `java_lang` modules)

#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod program;
pub mod stack;
pub mod thread;
pub mod value;

// ============================================================================
// Runtime
// ============================================================================

pub mod exception;
pub mod scheduler;
pub mod sync;
pub mod trace;

// ============================================================================
// Library
// ============================================================================

pub mod java_lang;
pub mod library;

pub use config::{ConfigError, EngineConfig, SpeedControl};
pub use engine::{Engine, EngineBuilder, EngineContext};
pub use error::{EngineError, EngineResult};
pub use exception::{CatchClause, JavaException, TryBlock, UNCATCHABLE};
pub use library::{
    LibraryClass, LibraryError, LibraryRegistry, MethodImplementation, NativeReturn,
};
pub use program::{IoToken, Program, SourceRange, Step, StepContext, StepOutcome};
pub use scheduler::{
    Clock, FrameReport, Halt, ManualClock, MonotonicClock, Scheduler, SchedulerStats,
    TickOutcome,
};
pub use stack::{CallFrame, Stack};
pub use sync::MonitorEvent;
pub use thread::{BlockReason, Thread, ThreadId, ThreadState};
pub use trace::{CollectingSink, ExceptionSink, StackTrace, TracingSink, UncaughtException};
pub use value::{ObjectHandle, ObjectId, Value};
