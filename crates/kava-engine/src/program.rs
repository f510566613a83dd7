//! Step programs and the step calling convention
//!
//! A method body is a [`Program`]: a list of [`Step`]s run one per scheduler
//! tick. A step never blocks; it reports what the thread does next as a
//! [`StepOutcome`], and the scheduler performs suspensions, calls, throws and
//! returns on the thread's behalf.

use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::exception::{JavaException, TryBlock};
use crate::library::MethodImplementation;
use crate::stack::Stack;
use crate::sync::SemaphoreRegistry;
use crate::thread::ThreadId;
use crate::value::Value;
use kava_types::TypeGraph;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source position of a step, 1-based
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceRange {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Range covering a single position
    pub fn at(line: u32, column: u32) -> Self {
        Self::new(line, column, line, column)
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{}", self.start_line, self.start_column)
    }
}

/// Handle identifying one pending host I/O operation
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IoToken(u64);

static NEXT_IO_TOKEN: AtomicU64 = AtomicU64::new(1);

impl IoToken {
    pub fn new() -> Self {
        IoToken(NEXT_IO_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for IoToken {
    fn default() -> Self {
        Self::new()
    }
}

/// What the thread does after a step
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Continue with the following step
    Next,
    /// Continue at the given step index
    Jump(usize),
    /// Call a method with the topmost `args` operands (receiver first)
    Invoke {
        method: MethodImplementation,
        args: usize,
    },
    /// Call the implementation found by dispatching on the receiver's class
    InvokeVirtual { signature: String, args: usize },
    /// Leave the current method, pushing the value onto the caller's stack
    Return(Option<Value>),
    /// Enter a try block
    EnterTry(TryBlock),
    /// Leave the innermost try block normally, running its finally block
    ExitTry,
    /// End of a finally block: resume whatever completion it interrupted
    EndFinally,
    /// Throw an exception
    Throw(Arc<JavaException>),
    /// Throw the exception on top of the operand stack
    Rethrow,
    /// Acquire an object's monitor, suspending while another thread owns it
    MonitorEnter(Value),
    /// Release one hold of an object's monitor
    MonitorExit(Value),
    /// `Object.wait`; `None` or `Some(0)` waits without a timeout
    Wait {
        monitor: Value,
        timeout_ms: Option<i64>,
    },
    /// `Object.notify`
    Notify(Value),
    /// `Object.notifyAll`
    NotifyAll(Value),
    /// Create and start a thread running `program` with the topmost `args` operands
    Spawn {
        name: String,
        program: Arc<Program>,
        args: usize,
    },
    /// `Thread.join`; `None` or `Some(0)` waits without a timeout
    Join {
        thread: ThreadId,
        timeout_ms: Option<i64>,
    },
    /// `Thread.sleep`
    Sleep(i64),
    /// Give up the rest of the time slice
    Yield,
    /// `Semaphore.acquire`
    SemaphoreAcquire { semaphore: Value, permits: usize },
    /// `Semaphore.release`
    SemaphoreRelease { semaphore: Value, permits: usize },
    /// Park until the host completes the I/O operation
    AwaitIo(IoToken),
    /// `System.exit`
    Exit(i32),
}

impl StepOutcome {
    /// Call a java-convention program
    pub fn call(program: Arc<Program>, args: usize) -> Self {
        StepOutcome::Invoke {
            method: MethodImplementation::Java(program),
            args,
        }
    }
}

/// Signature of a step function
pub type StepFn = dyn Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync;

/// One unit of compiled code
#[derive(Clone)]
pub struct Step {
    pub source: Option<SourceRange>,
    run: Arc<StepFn>,
}

impl Step {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static,
    {
        Self {
            source: None,
            run: Arc::new(f),
        }
    }

    pub fn at<F>(source: SourceRange, f: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static,
    {
        Self {
            source: Some(source),
            run: Arc::new(f),
        }
    }

    pub fn run(&self, ctx: &mut StepContext<'_>) -> EngineResult<StepOutcome> {
        (self.run)(ctx)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("source", &self.source).finish()
    }
}

/// Compiled body of one method
#[derive(Debug, Clone)]
pub struct Program {
    /// `Class.method`, shown in stack traces
    pub qualified_name: String,
    pub steps: Vec<Step>,
    /// Local slots, arguments included
    pub local_count: usize,
}

impl Program {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            steps: Vec::new(),
            local_count: 0,
        }
    }

    pub fn with_locals(mut self, local_count: usize) -> Self {
        self.local_count = local_count;
        self
    }

    /// Append a step without source information
    pub fn step<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static,
    {
        self.steps.push(Step::new(f));
        self
    }

    /// Append a step located at `source`
    pub fn step_at<F>(mut self, source: SourceRange, f: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> EngineResult<StepOutcome> + Send + Sync + 'static,
    {
        self.steps.push(Step::at(source, f));
        self
    }

    /// Append a step and return its index
    pub fn push_step(&mut self, step: Step) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_arc(self) -> Arc<Program> {
        Arc::new(self)
    }
}

/// View of the running thread handed to a step or native method
pub struct StepContext<'a> {
    thread: ThreadId,
    stack: &'a mut Stack,
    engine: &'a EngineContext,
    semaphores: &'a mut SemaphoreRegistry,
    now: Duration,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        thread: ThreadId,
        stack: &'a mut Stack,
        engine: &'a EngineContext,
        semaphores: &'a mut SemaphoreRegistry,
        now: Duration,
    ) -> Self {
        Self {
            thread,
            stack,
            engine,
            semaphores,
            now,
        }
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    /// Scheduler clock reading for this tick
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn engine(&self) -> &EngineContext {
        self.engine
    }

    pub fn types(&self) -> &TypeGraph {
        self.engine.types()
    }

    pub fn push(&mut self, value: Value) -> EngineResult<()> {
        self.stack.push(value)
    }

    pub fn pop(&mut self) -> EngineResult<Value> {
        self.stack.pop()
    }

    /// Pop `n` operands, bottom first
    pub fn pop_n(&mut self, n: usize) -> EngineResult<Vec<Value>> {
        self.stack.pop_n(n)
    }

    pub fn peek(&self) -> EngineResult<&Value> {
        self.stack.peek()
    }

    /// Operand stack depth, locals included
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn load_local(&self, index: usize) -> EngineResult<Value> {
        self.stack.load_local(index).cloned()
    }

    pub fn store_local(&mut self, index: usize, value: Value) -> EngineResult<()> {
        self.stack.store_local(index, value)
    }

    /// Build a catchable exception of a declared exception class
    pub fn exception(
        &self,
        identifier: &str,
        message: impl Into<String>,
    ) -> EngineResult<Arc<JavaException>> {
        self.engine.exception(identifier, Some(message.into()))
    }

    /// Shorthand for returning `StepOutcome::Throw`
    pub fn throw(&self, identifier: &str, message: impl Into<String>) -> EngineResult<StepOutcome> {
        Ok(StepOutcome::Throw(self.exception(identifier, message)?))
    }

    /// Allocate an instance of a declared class
    pub fn new_object(&self, class: &str) -> EngineResult<Value> {
        self.engine.new_object(class)
    }

    /// Attach a counting semaphore to an object
    pub fn create_semaphore(&mut self, object: &Value, permits: i64) -> EngineResult<()> {
        let id = object.as_object()?.id()?;
        self.semaphores.create(id, permits)?;
        Ok(())
    }

    /// Permits currently available on an object's semaphore
    pub fn available_permits(&self, object: &Value) -> EngineResult<i64> {
        let id = object.as_object()?.id()?;
        Ok(self.semaphores.get(id)?.available_permits())
    }

    /// Fault helper for steps that meet a value of the wrong kind
    pub fn mismatch(expected: &'static str, found: &Value) -> EngineError {
        EngineError::TypeMismatch {
            expected,
            found: found.kind(),
        }
    }
}
