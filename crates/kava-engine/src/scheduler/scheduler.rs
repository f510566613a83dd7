//! Cooperative thread scheduler
//!
//! One tick runs exactly one step of the thread at the head of the run
//! queue. A thread keeps the head for `time_slice` consecutive steps, then
//! moves to the back. Blocking removes a thread from the queue; waking puts
//! it at the back. Monitor hand-off, timers and I/O completions are the only
//! ways a blocked thread becomes runnable again.

use crate::engine::EngineContext;
use crate::error::{EngineError, EngineResult};
use crate::exception::{
    self, Completion, ExceptionOrigin, JavaException, PendingFinally, TryBlock, TryRegion, Unwind,
};
use crate::java_lang::{ILLEGAL_ARGUMENT, ILLEGAL_MONITOR_STATE, NULL_POINTER, STACK_OVERFLOW};
use crate::library::{MethodImplementation, NativeReturn};
use crate::program::{IoToken, Program, StepContext, StepOutcome};
use crate::scheduler::{Clock, FramePacer, TimerQueue};
use crate::sync::{
    EnterResult, Monitor, MonitorEvent, MonitorRegistry, Semaphore, SemaphoreRegistry,
};
use crate::thread::{BlockReason, Resume, Thread, ThreadId, ThreadState};
use crate::trace::{ExceptionSink, StackTrace, UncaughtException};
use crate::value::{ObjectId, Value};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Scheduler statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Ticks attempted, idle ones included
    pub ticks: u64,

    /// Steps executed
    pub steps: u64,

    /// Ticks that ran a different thread than the tick before
    pub context_switches: u64,

    /// Threads spawned, the main thread included
    pub threads_created: u64,

    /// Threads that reached `Terminated` by any path
    pub threads_terminated: u64,

    /// Exceptions that escaped a thread's last frame and were reported
    pub uncaught_exceptions: u64,
}

/// Why the program stopped as a whole
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// `System.exit`
    Exit(i32),
    /// Engine fault
    Fault(String),
    /// An uncatchable exception escaped a thread
    Uncatchable(String),
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The thread ran one step
    Stepped(ThreadId),
    /// Nothing runnable, but a timer or I/O completion is pending
    Idle,
    /// Every live thread is blocked and nothing can wake them
    Deadlocked,
    /// No live threads remain
    Finished,
    Halted(Halt),
}

impl TickOutcome {
    pub fn is_stepped(&self) -> bool {
        matches!(self, TickOutcome::Stepped(_))
    }
}

/// Ticks run during one host frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub ticks: usize,
    /// Outcome of the last tick
    pub outcome: TickOutcome,
}

/// Cooperative scheduler over the threads of one program
pub struct Scheduler {
    context: Arc<EngineContext>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ExceptionSink>,
    threads: FxHashMap<ThreadId, Thread>,
    run_queue: VecDeque<ThreadId>,
    timers: TimerQueue,
    monitors: MonitorRegistry,
    semaphores: SemaphoreRegistry,
    io_waiters: FxHashMap<IoToken, ThreadId>,
    pacer: FramePacer,
    /// Consecutive steps of the thread at the head
    slice_used: usize,
    yielded: bool,
    current: Option<ThreadId>,
    last_run: Option<ThreadId>,
    halted: Option<Halt>,
    stats: SchedulerStats,
}

impl Scheduler {
    pub fn new(context: Arc<EngineContext>, clock: Arc<dyn Clock>, sink: Arc<dyn ExceptionSink>) -> Self {
        let record = context.config().record_monitor_events;
        Self {
            context,
            clock,
            sink,
            threads: FxHashMap::default(),
            run_queue: VecDeque::new(),
            timers: TimerQueue::new(),
            monitors: MonitorRegistry::new(record),
            semaphores: SemaphoreRegistry::new(),
            io_waiters: FxHashMap::default(),
            pacer: FramePacer::new(),
            slice_used: 0,
            yielded: false,
            current: None,
            last_run: None,
            halted: None,
            stats: SchedulerStats::default(),
        }
    }

    // ========================================================================
    // Thread Lifecycle
    // ========================================================================

    /// Create a thread in state `New` whose first frame runs `program`
    pub fn create_thread(
        &mut self,
        name: impl Into<String>,
        program: Arc<Program>,
        args: Vec<Value>,
    ) -> EngineResult<ThreadId> {
        let mut thread = Thread::new(name, self.context.config().max_stack_depth);
        let count = args.len();
        for arg in args {
            thread.stack.push(arg)?;
        }
        thread.stack.push_frame(program, count, 0)?;
        let id = thread.id();
        debug!(thread = %id, name = thread.name(), "thread created");
        self.threads.insert(id, thread);
        self.stats.threads_created += 1;
        Ok(id)
    }

    /// Move a `New` thread to the back of the run queue
    pub fn start(&mut self, id: ThreadId) -> EngineResult<()> {
        self.thread_mut(id)?.transition(ThreadState::Runnable)?;
        self.run_queue.push_back(id);
        Ok(())
    }

    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        program: Arc<Program>,
        args: Vec<Value>,
    ) -> EngineResult<ThreadId> {
        let id = self.create_thread(name, program, args)?;
        self.start(id)?;
        Ok(id)
    }

    // ========================================================================
    // Ticking
    // ========================================================================

    /// Run one step of the thread at the head of the run queue
    pub fn tick(&mut self) -> TickOutcome {
        if let Some(halt) = &self.halted {
            return TickOutcome::Halted(halt.clone());
        }
        self.stats.ticks += 1;
        match self.tick_inner() {
            Ok(outcome) => outcome,
            Err(fault) => {
                let thread = self.current.take();
                self.fault(thread, fault)
            }
        }
    }

    /// Tick until something other than a step happens, at most `max_ticks` times
    pub fn run(&mut self, max_ticks: usize) -> TickOutcome {
        let mut last = TickOutcome::Idle;
        for _ in 0..max_ticks {
            last = self.tick();
            if !last.is_stepped() {
                break;
            }
        }
        last
    }

    /// Run as many ticks as the current speed allows in a frame of length `frame`
    pub fn run_frame(&mut self, frame: Duration) -> FrameReport {
        let budget = self.pacer.budget(
            frame,
            self.context.speed(),
            self.context.config().max_steps_per_frame,
        );
        let mut report = FrameReport {
            ticks: 0,
            outcome: TickOutcome::Idle,
        };
        while report.ticks < budget {
            report.outcome = self.tick();
            report.ticks += 1;
            if !report.outcome.is_stepped() {
                break;
            }
        }
        report
    }

    fn tick_inner(&mut self) -> EngineResult<TickOutcome> {
        let now = self.clock.now();
        self.fire_timers(now)?;

        let Some(&id) = self.run_queue.front() else {
            return Ok(self.idle_outcome());
        };
        if self.last_run != Some(id) {
            self.stats.context_switches += 1;
            self.last_run = Some(id);
        }
        self.current = Some(id);
        self.thread_mut(id)?.transition(ThreadState::Running)?;
        self.step_thread(id, now)?;
        self.current = None;

        if let Some(halt) = &self.halted {
            return Ok(TickOutcome::Halted(halt.clone()));
        }
        self.after_step(id)?;
        Ok(TickOutcome::Stepped(id))
    }

    fn after_step(&mut self, id: ThreadId) -> EngineResult<()> {
        let still_running = self
            .threads
            .get(&id)
            .is_some_and(|t| t.state() == ThreadState::Running);
        if still_running {
            self.thread_mut(id)?.transition(ThreadState::Runnable)?;
            self.slice_used += 1;
            if self.yielded || self.slice_used >= self.context.config().time_slice {
                if self.run_queue.front() == Some(&id) {
                    self.run_queue.pop_front();
                    self.run_queue.push_back(id);
                }
                self.slice_used = 0;
            }
        } else {
            self.run_queue.retain(|t| *t != id);
            self.slice_used = 0;
        }
        self.yielded = false;
        Ok(())
    }

    fn idle_outcome(&self) -> TickOutcome {
        let mut blocked = 0usize;
        let mut timed = false;
        let mut fresh = false;
        for thread in self.threads.values() {
            match thread.state() {
                ThreadState::Waiting => blocked += 1,
                ThreadState::TimedWaiting => {
                    blocked += 1;
                    timed = true;
                }
                ThreadState::New => fresh = true,
                _ => {}
            }
        }
        if blocked == 0 {
            return if fresh {
                TickOutcome::Idle
            } else {
                TickOutcome::Finished
            };
        }
        if timed || !self.io_waiters.is_empty() {
            return TickOutcome::Idle;
        }
        warn!(threads = blocked, "deadlock: every live thread is blocked");
        TickOutcome::Deadlocked
    }

    fn step_thread(&mut self, id: ThreadId, now: Duration) -> EngineResult<()> {
        self.stats.steps += 1;
        let context = self.context.clone();
        let thread = self.threads.get_mut(&id).ok_or(EngineError::UnknownThread(id))?;
        thread.count_step();

        match thread.resume.take() {
            Some(Resume::Push(value)) => thread.stack.push(value)?,
            Some(Resume::Throw(exception)) => return self.throw(id, exception),
            None => {}
        }

        let Some(frame) = thread.stack.current_frame() else {
            return self.terminate(id);
        };
        let program = frame.program.clone();
        let ip = frame.ip;
        let Some(step) = program.steps.get(ip) else {
            // running off the end returns void
            return self.perform_return(id, None);
        };

        let outcome = {
            let mut ctx = StepContext::new(id, &mut thread.stack, &context, &mut self.semaphores, now);
            step.run(&mut ctx)?
        };
        trace!(thread = %id, method = %program.qualified_name, ip, "step");
        self.apply(id, outcome, now)
    }

    fn apply(&mut self, id: ThreadId, outcome: StepOutcome, now: Duration) -> EngineResult<()> {
        match outcome {
            StepOutcome::Next => self.advance(id),
            StepOutcome::Jump(target) => self.jump(id, target),
            StepOutcome::Invoke { method, args } => self.invoke(id, method, args, now),
            StepOutcome::InvokeVirtual { signature, args } => {
                self.invoke_virtual(id, &signature, args, now)
            }
            StepOutcome::Return(value) => self.perform_return(id, value),
            StepOutcome::EnterTry(block) => self.enter_try(id, block),
            StepOutcome::ExitTry => self.exit_try(id),
            StepOutcome::EndFinally => self.end_finally(id),
            StepOutcome::Throw(exception) => self.throw(id, exception),
            StepOutcome::Rethrow => {
                let value = self.thread_mut(id)?.stack.pop()?;
                let exception = value.as_exception()?.clone();
                self.throw(id, exception)
            }
            StepOutcome::MonitorEnter(value) => self.monitor_enter(id, &value),
            StepOutcome::MonitorExit(value) => self.monitor_exit(id, &value),
            StepOutcome::Wait {
                monitor,
                timeout_ms,
            } => self.monitor_wait(id, &monitor, timeout_ms, now),
            StepOutcome::Notify(value) => self.notify(id, &value, false),
            StepOutcome::NotifyAll(value) => self.notify(id, &value, true),
            StepOutcome::Spawn {
                name,
                program,
                args,
            } => {
                let argv = self.thread_mut(id)?.stack.pop_n(args)?;
                let child = self.spawn(name, program, argv)?;
                self.thread_mut(id)?.stack.push(Value::Thread(child))?;
                self.advance(id)
            }
            StepOutcome::Join { thread, timeout_ms } => self.join(id, thread, timeout_ms, now),
            StepOutcome::Sleep(ms) => self.sleep(id, ms, now),
            StepOutcome::Yield => {
                self.yielded = true;
                self.advance(id)
            }
            StepOutcome::SemaphoreAcquire { semaphore, permits } => {
                self.semaphore_acquire(id, &semaphore, permits)
            }
            StepOutcome::SemaphoreRelease { semaphore, permits } => {
                self.semaphore_release(id, &semaphore, permits)
            }
            StepOutcome::AwaitIo(token) => {
                self.advance(id)?;
                self.io_waiters.insert(token, id);
                self.block(id, BlockReason::Io(token), None)
            }
            StepOutcome::Exit(status) => {
                info!(thread = %id, status, "program exit");
                self.halt(Halt::Exit(status));
                Ok(())
            }
        }
    }

    // ========================================================================
    // Control Flow
    // ========================================================================

    fn thread_mut(&mut self, id: ThreadId) -> EngineResult<&mut Thread> {
        self.threads.get_mut(&id).ok_or(EngineError::UnknownThread(id))
    }

    fn frame_ip(&mut self, id: ThreadId) -> EngineResult<&mut usize> {
        self.thread_mut(id)?
            .stack
            .current_frame_mut()
            .map(|f| &mut f.ip)
            .ok_or_else(|| EngineError::MalformedProgram(format!("thread {} has no frame", id)))
    }

    fn advance(&mut self, id: ThreadId) -> EngineResult<()> {
        *self.frame_ip(id)? += 1;
        Ok(())
    }

    fn jump(&mut self, id: ThreadId, target: usize) -> EngineResult<()> {
        let thread = self.thread_mut(id)?;
        let frame = thread
            .stack
            .current_frame_mut()
            .ok_or_else(|| EngineError::MalformedProgram(format!("thread {} has no frame", id)))?;
        if target > frame.program.len() {
            return Err(EngineError::MalformedProgram(format!(
                "jump to step {} past the end of {}",
                target, frame.program.qualified_name
            )));
        }
        frame.ip = target;
        Ok(())
    }

    fn invoke(
        &mut self,
        id: ThreadId,
        method: MethodImplementation,
        args: usize,
        now: Duration,
    ) -> EngineResult<()> {
        match method {
            MethodImplementation::Native(f) => {
                let context = self.context.clone();
                let thread = self.threads.get_mut(&id).ok_or(EngineError::UnknownThread(id))?;
                let argv = thread.stack.pop_n(args)?;
                let result = {
                    let mut ctx =
                        StepContext::new(id, &mut thread.stack, &context, &mut self.semaphores, now);
                    f(&mut ctx, &argv)?
                };
                match result {
                    NativeReturn::Void => self.advance(id),
                    NativeReturn::Value(value) => {
                        self.thread_mut(id)?.stack.push(value)?;
                        self.advance(id)
                    }
                    NativeReturn::Throw(exception) => self.throw(id, exception),
                }
            }
            MethodImplementation::Java(program) => {
                let max = self.context.config().max_call_depth;
                let thread = self.thread_mut(id)?;
                if thread.stack.frame_count() >= max {
                    let message = format!("call depth exceeded {}", max);
                    return self.throw_new(id, STACK_OVERFLOW, message);
                }
                let mark = thread.held_monitors().len();
                match thread.stack.push_frame(program, args, mark) {
                    Err(EngineError::StackOverflow { limit }) => {
                        let message = format!("operand stack exceeded {} slots", limit);
                        self.throw_new(id, STACK_OVERFLOW, message)
                    }
                    other => other,
                }
            }
            MethodImplementation::Template(template) => {
                Err(EngineError::TemplateInvocation(template))
            }
        }
    }

    fn invoke_virtual(
        &mut self,
        id: ThreadId,
        signature: &str,
        args: usize,
        now: Duration,
    ) -> EngineResult<()> {
        let receiver = {
            let slots = self.thread_mut(id)?.stack.as_slice();
            match args.checked_sub(1).and_then(|n| slots.len().checked_sub(n + 1)) {
                Some(at) => slots[at].clone(),
                None => {
                    return Err(EngineError::MalformedProgram(format!(
                        "virtual call {} without a receiver",
                        signature
                    )))
                }
            }
        };

        let types = self.context.types();
        let class = match &receiver {
            Value::Null => {
                let message = format!("Cannot invoke \"{}\" on null", signature);
                return self.throw_new(id, NULL_POINTER, message);
            }
            Value::Object(handle) => handle.class()?,
            Value::Exception(e) => types.require(e.identifier())?,
            Value::Thread(_) => types.require("Thread")?,
            Value::Primitive(p) if p.as_str().is_some() => types.require("String")?,
            other => return Err(StepContext::mismatch("object", other)),
        };
        let method = self
            .context
            .library()
            .dispatch(types, class, signature)
            .cloned()
            .ok_or_else(|| EngineError::UnresolvedMethod {
                class: types.name(class).to_string(),
                signature: signature.to_string(),
            })?;
        self.invoke(id, method, args, now)
    }

    /// Return from the current frame, running this frame's finally blocks first
    fn perform_return(&mut self, id: ThreadId, value: Option<Value>) -> EngineResult<()> {
        let thread = self.thread_mut(id)?;
        let frame_depth = thread.stack.frame_count();
        let mut released = Vec::new();

        while thread
            .try_regions
            .last()
            .is_some_and(|r| r.frame_depth == frame_depth)
        {
            let Some(region) = thread.try_regions.pop() else {
                break;
            };
            let index = thread.try_regions.len();
            thread.pending_finally.retain(|p| p.try_depth <= index);
            released.extend(thread.take_monitors_since(region.monitor_mark).into_iter().rev());

            if let Some(entry) = region.finally_entry {
                thread.pending_finally.push(PendingFinally {
                    completion: Completion::Return(value),
                    try_depth: index,
                    frame_depth,
                });
                thread.stack.truncate(region.stack_depth);
                if let Some(frame) = thread.stack.current_frame_mut() {
                    frame.ip = entry;
                }
                return self.release_monitors(id, released);
            }
        }

        // monitors entered by this frame outside any try region
        let frame_mark = thread
            .stack
            .current_frame()
            .map_or(0, |frame| frame.monitor_mark);
        released.extend(thread.take_monitors_since(frame_mark).into_iter().rev());

        thread.pending_finally.retain(|p| p.frame_depth < frame_depth);
        thread.stack.pop_frame()?;
        if thread.stack.frame_count() == 0 {
            self.release_monitors(id, released)?;
            return self.terminate(id);
        }
        if let Some(value) = value {
            thread.stack.push(value)?;
        }
        if let Some(caller) = thread.stack.current_frame_mut() {
            caller.ip += 1;
        }
        self.release_monitors(id, released)
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    fn enter_try(&mut self, id: ThreadId, block: TryBlock) -> EngineResult<()> {
        let thread = self.thread_mut(id)?;
        let region = TryRegion {
            clauses: block.clauses,
            finally_entry: block.finally_entry,
            stack_depth: thread.stack.depth(),
            frame_depth: thread.stack.frame_count(),
            monitor_mark: thread.held_monitors().len(),
        };
        thread.try_regions.push(region);
        self.advance(id)
    }

    fn exit_try(&mut self, id: ThreadId) -> EngineResult<()> {
        let thread = self.thread_mut(id)?;
        let frame_depth = thread.stack.frame_count();
        if !thread
            .try_regions
            .last()
            .is_some_and(|r| r.frame_depth == frame_depth)
        {
            return Err(EngineError::MalformedProgram(
                "ExitTry without a try region in the current frame".to_string(),
            ));
        }
        let Some(region) = thread.try_regions.pop() else {
            return Ok(());
        };
        let index = thread.try_regions.len();
        thread.pending_finally.retain(|p| p.try_depth <= index);

        let Some(frame) = thread.stack.current_frame_mut() else {
            return Ok(());
        };
        match region.finally_entry {
            Some(entry) => {
                let resume = frame.ip + 1;
                frame.ip = entry;
                thread.pending_finally.push(PendingFinally {
                    completion: Completion::Normal { resume },
                    try_depth: index,
                    frame_depth,
                });
            }
            None => frame.ip += 1,
        }
        Ok(())
    }

    fn end_finally(&mut self, id: ThreadId) -> EngineResult<()> {
        let thread = self.thread_mut(id)?;
        let frame_depth = thread.stack.frame_count();
        let pending = match thread.pending_finally.pop() {
            Some(p) if p.frame_depth == frame_depth => p,
            _ => {
                return Err(EngineError::MalformedProgram(
                    "EndFinally outside a finally block".to_string(),
                ))
            }
        };
        match pending.completion {
            Completion::Normal { resume } => self.jump(id, resume),
            Completion::Throw(exception) => self.throw(id, exception),
            Completion::Return(value) => self.perform_return(id, value),
        }
    }

    fn throw_new(&mut self, id: ThreadId, identifier: &str, message: String) -> EngineResult<()> {
        let exception = self.context.exception(identifier, Some(message))?;
        self.throw(id, exception)
    }

    /// Throw on thread `id`: record the throw site, then unwind
    fn throw(&mut self, id: ThreadId, exception: Arc<JavaException>) -> EngineResult<()> {
        let thread = self.threads.get_mut(&id).ok_or(EngineError::UnknownThread(id))?;
        if exception.origin().is_none() {
            exception.record_origin(ExceptionOrigin {
                thread: id,
                thread_name: thread.name().to_string(),
                source: thread.stack.current_frame().and_then(|f| f.current_source()),
                stack_trace: StackTrace::capture(thread.stack.frames()),
            });
        }
        debug!(thread = %id, exception = %exception, "throw");

        let monitors = &mut self.monitors;
        let mut woken = Vec::new();
        let result = exception::unwind(thread, &exception, |t, m| {
            woken.extend(release_hold(monitors, t, m)?);
            Ok(())
        })?;
        for next in woken {
            self.wake(next)?;
        }

        match result {
            Unwind::Caught { .. } | Unwind::Finally { .. } => Ok(()),
            Unwind::Uncaught => self.uncaught(id, exception),
        }
    }

    fn uncaught(&mut self, id: ThreadId, exception: Arc<JavaException>) -> EngineResult<()> {
        let name = self.thread_mut(id)?.name().to_string();
        self.stats.uncaught_exceptions += 1;
        self.terminate(id)?;
        self.sink
            .report_uncaught(&UncaughtException::new(&exception, id, &name));
        if !exception.is_catchable() {
            self.halt(Halt::Uncatchable(exception.identifier().to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Monitors
    // ========================================================================

    fn monitor_of(value: &Value) -> EngineResult<Option<ObjectId>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(handle) => Ok(Some(handle.id()?)),
            other => Err(StepContext::mismatch("object", other)),
        }
    }

    fn owns(&self, id: ThreadId, monitor: ObjectId) -> bool {
        self.monitors
            .get(monitor)
            .is_some_and(|m| m.is_owned_by(id))
    }

    fn not_owner(&mut self, id: ThreadId) -> EngineResult<()> {
        self.throw_new(
            id,
            ILLEGAL_MONITOR_STATE,
            "current thread is not owner".to_string(),
        )
    }

    fn monitor_enter(&mut self, id: ThreadId, value: &Value) -> EngineResult<()> {
        let Some(monitor) = Self::monitor_of(value)? else {
            return self.throw_new(id, NULL_POINTER, "Cannot synchronize on null".to_string());
        };
        self.advance(id)?;
        self.thread_mut(id)?.add_held_monitor(monitor);
        match self.monitors.get_or_create(monitor).enter(id, 1) {
            EnterResult::Acquired => {
                self.monitors.record(MonitorEvent::Acquired {
                    thread: id,
                    monitor: monitor.as_u64(),
                });
                Ok(())
            }
            EnterResult::Blocked => self.block(id, BlockReason::MonitorEnter(monitor), None),
        }
    }

    fn monitor_exit(&mut self, id: ThreadId, value: &Value) -> EngineResult<()> {
        let Some(monitor) = Self::monitor_of(value)? else {
            return self.throw_new(id, NULL_POINTER, "Cannot synchronize on null".to_string());
        };
        if !self.owns(id, monitor) {
            return self.not_owner(id);
        }
        let next = release_hold(&mut self.monitors, id, monitor)?;
        self.thread_mut(id)?.remove_held_monitor(monitor);
        self.advance(id)?;
        if let Some(next) = next {
            self.wake(next)?;
        }
        Ok(())
    }

    fn monitor_wait(
        &mut self,
        id: ThreadId,
        value: &Value,
        timeout_ms: Option<i64>,
        now: Duration,
    ) -> EngineResult<()> {
        let Some(monitor) = Self::monitor_of(value)? else {
            return self.throw_new(id, NULL_POINTER, "Cannot wait on null".to_string());
        };
        let timeout = timeout_ms.unwrap_or(0);
        if timeout < 0 {
            return self.throw_new(id, ILLEGAL_ARGUMENT, "timeout value is negative".to_string());
        }
        if !self.owns(id, monitor) {
            return self.not_owner(id);
        }

        self.advance(id)?;
        let (_, next) = self.monitors.get_mut(monitor)?.wait(id)?;
        self.monitors.record(MonitorEvent::Released {
            thread: id,
            monitor: monitor.as_u64(),
        });
        if let Some(next) = next {
            self.monitors.record(MonitorEvent::Acquired {
                thread: next,
                monitor: monitor.as_u64(),
            });
        }
        let deadline = (timeout > 0).then(|| now + Duration::from_millis(timeout as u64));
        self.block(id, BlockReason::MonitorWait(monitor), deadline)?;
        if let Some(next) = next {
            self.wake(next)?;
        }
        Ok(())
    }

    fn notify(&mut self, id: ThreadId, value: &Value, all: bool) -> EngineResult<()> {
        let Some(monitor) = Self::monitor_of(value)? else {
            return self.throw_new(id, NULL_POINTER, "Cannot notify on null".to_string());
        };
        if !self.owns(id, monitor) {
            return self.not_owner(id);
        }
        let target = self.monitors.get_mut(monitor)?;
        let woken = if all {
            target.notify_all(id)?
        } else {
            target.notify(id)?.into_iter().collect()
        };
        // notified threads now queue for the monitor itself
        for waiter in woken {
            let thread = self.thread_mut(waiter)?;
            if thread.state() == ThreadState::TimedWaiting {
                thread.transition(ThreadState::Waiting)?;
            }
            thread.blocked_on = Some(BlockReason::MonitorEnter(monitor));
            thread.wake_generation += 1;
        }
        self.advance(id)
    }

    fn release_monitors(&mut self, id: ThreadId, monitors: Vec<ObjectId>) -> EngineResult<()> {
        for monitor in monitors {
            if let Some(next) = release_hold(&mut self.monitors, id, monitor)? {
                self.wake(next)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Blocking and Waking
    // ========================================================================

    fn block(&mut self, id: ThreadId, reason: BlockReason, deadline: Option<Duration>) -> EngineResult<()> {
        let thread = self.thread_mut(id)?;
        let state = if deadline.is_some() {
            ThreadState::TimedWaiting
        } else {
            ThreadState::Waiting
        };
        thread.transition(state)?;
        trace!(thread = %id, reason = ?reason, "blocked");
        thread.blocked_on = Some(reason);
        let generation = thread.wake_generation;
        if let Some(at) = deadline {
            self.timers.schedule(id, generation, at);
        }
        Ok(())
    }

    fn wake(&mut self, id: ThreadId) -> EngineResult<()> {
        let thread = self.thread_mut(id)?;
        if thread.state() == ThreadState::Terminated {
            return Ok(());
        }
        thread.transition(ThreadState::Runnable)?;
        thread.blocked_on = None;
        thread.wake_generation += 1;
        self.run_queue.push_back(id);
        trace!(thread = %id, "woken");
        Ok(())
    }

    fn join(&mut self, id: ThreadId, target: ThreadId, timeout_ms: Option<i64>, now: Duration) -> EngineResult<()> {
        let timeout = timeout_ms.unwrap_or(0);
        if timeout < 0 {
            return self.throw_new(id, ILLEGAL_ARGUMENT, "timeout value is negative".to_string());
        }
        self.advance(id)?;
        let joined = self.thread_mut(target)?;
        if !joined.state().is_alive() {
            return Ok(());
        }
        joined.joiners.push(id);
        let deadline = (timeout > 0).then(|| now + Duration::from_millis(timeout as u64));
        self.block(id, BlockReason::Join(target), deadline)
    }

    fn sleep(&mut self, id: ThreadId, ms: i64, now: Duration) -> EngineResult<()> {
        if ms < 0 {
            return self.throw_new(id, ILLEGAL_ARGUMENT, "timeout value is negative".to_string());
        }
        self.advance(id)?;
        let deadline = now + Duration::from_millis(ms as u64);
        self.block(id, BlockReason::Sleep, Some(deadline))
    }

    fn fire_timers(&mut self, now: Duration) -> EngineResult<()> {
        for (id, generation) in self.timers.pop_due(now) {
            let Some(thread) = self.threads.get_mut(&id) else {
                continue;
            };
            if thread.wake_generation != generation || thread.state() != ThreadState::TimedWaiting {
                continue;
            }
            match thread.blocked_on.clone() {
                Some(BlockReason::Sleep) => self.wake(id)?,
                Some(BlockReason::Join(target)) => {
                    if let Some(joined) = self.threads.get_mut(&target) {
                        joined.joiners.retain(|j| *j != id);
                    }
                    self.wake(id)?;
                }
                Some(BlockReason::MonitorWait(monitor)) => {
                    let target = self.monitors.get_mut(monitor)?;
                    let Some(count) = target.cancel_wait(id) else {
                        continue;
                    };
                    match target.enter(id, count) {
                        EnterResult::Acquired => {
                            self.monitors.record(MonitorEvent::Acquired {
                                thread: id,
                                monitor: monitor.as_u64(),
                            });
                            self.wake(id)?;
                        }
                        EnterResult::Blocked => {
                            thread.transition(ThreadState::Waiting)?;
                            thread.blocked_on = Some(BlockReason::MonitorEnter(monitor));
                            thread.wake_generation += 1;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ========================================================================
    // Semaphores
    // ========================================================================

    fn semaphore_of(value: &Value) -> EngineResult<Option<ObjectId>> {
        Self::monitor_of(value)
    }

    fn semaphore_acquire(&mut self, id: ThreadId, value: &Value, permits: usize) -> EngineResult<()> {
        let Some(semaphore) = Self::semaphore_of(value)? else {
            return self.throw_new(id, NULL_POINTER, "Semaphore is null".to_string());
        };
        self.advance(id)?;
        if self.semaphores.get_mut(semaphore)?.try_acquire(id, permits) {
            return Ok(());
        }
        self.block(id, BlockReason::Semaphore(semaphore), None)
    }

    fn semaphore_release(&mut self, id: ThreadId, value: &Value, permits: usize) -> EngineResult<()> {
        let Some(semaphore) = Self::semaphore_of(value)? else {
            return self.throw_new(id, NULL_POINTER, "Semaphore is null".to_string());
        };
        self.advance(id)?;
        for resumed in self.semaphores.get_mut(semaphore)?.release(permits) {
            self.wake(resumed)?;
        }
        Ok(())
    }

    // ========================================================================
    // Termination
    // ========================================================================

    /// Terminate one thread, releasing everything it holds
    fn terminate(&mut self, id: ThreadId) -> EngineResult<()> {
        let thread = self.thread_mut(id)?;
        if thread.state() == ThreadState::Terminated {
            return Ok(());
        }
        thread.transition(ThreadState::Terminated)?;
        let held = thread.take_all_monitors();
        let joiners = std::mem::take(&mut thread.joiners);
        thread.blocked_on = None;
        thread.resume = None;
        thread.try_regions.clear();
        thread.pending_finally.clear();

        self.run_queue.retain(|t| *t != id);
        self.io_waiters.retain(|_, t| *t != id);

        let mut woken = Vec::new();
        for monitor in held {
            let Ok(target) = self.monitors.get_mut(monitor) else {
                continue;
            };
            let was_owner = target.is_owned_by(id);
            let next = target.abandon(id);
            if was_owner {
                self.monitors.record(MonitorEvent::Released {
                    thread: id,
                    monitor: monitor.as_u64(),
                });
            }
            if let Some(next) = next {
                self.monitors.record(MonitorEvent::Acquired {
                    thread: next,
                    monitor: monitor.as_u64(),
                });
                woken.push(next);
            }
            self.monitors.remove_if_idle(monitor);
        }
        woken.extend(self.semaphores.cancel_thread(id));
        woken.extend(joiners.into_iter().filter(|j| {
            self.threads
                .get(j)
                .is_some_and(|t| t.blocked_on == Some(BlockReason::Join(id)))
        }));
        for next in woken {
            self.wake(next)?;
        }

        self.stats.threads_terminated += 1;
        debug!(thread = %id, "thread terminated");
        Ok(())
    }

    /// Stop every thread
    fn halt(&mut self, halt: Halt) {
        for thread in self.threads.values_mut() {
            if thread.state() != ThreadState::Terminated && thread.transition(ThreadState::Terminated).is_ok() {
                self.stats.threads_terminated += 1;
            }
        }
        self.run_queue.clear();
        self.timers.clear();
        self.io_waiters.clear();
        info!(reason = ?halt, "program halted");
        self.halted = Some(halt);
    }

    fn fault(&mut self, thread: Option<ThreadId>, fault: EngineError) -> TickOutcome {
        self.sink.report_fault(thread, &fault);
        let halt = Halt::Fault(fault.to_string());
        self.halt(halt.clone());
        TickOutcome::Halted(halt)
    }

    // ========================================================================
    // Host I/O
    // ========================================================================

    /// Resume the thread awaiting `token`, pushing `value` if given
    pub fn complete_io(&mut self, token: IoToken, value: Option<Value>) -> EngineResult<()> {
        let id = self
            .io_waiters
            .remove(&token)
            .ok_or(EngineError::UnknownIoToken(token.as_u64()))?;
        self.thread_mut(id)?.resume = value.map(Resume::Push);
        self.wake(id)
    }

    /// Resume the thread awaiting `token` by throwing `exception` in it
    pub fn fail_io(&mut self, token: IoToken, exception: Arc<JavaException>) -> EngineResult<()> {
        let id = self
            .io_waiters
            .remove(&token)
            .ok_or(EngineError::UnknownIoToken(token.as_u64()))?;
        self.thread_mut(id)?.resume = Some(Resume::Throw(exception));
        self.wake(id)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.context
    }

    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.get(&id)
    }

    pub fn thread_state(&self, id: ThreadId) -> Option<ThreadState> {
        self.threads.get(&id).map(Thread::state)
    }

    /// Threads started and not yet terminated
    pub fn live_threads(&self) -> usize {
        self.threads.values().filter(|t| t.state().is_alive()).count()
    }

    /// Run queue, head first
    pub fn run_queue(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.run_queue.iter().copied()
    }

    pub fn monitor(&self, object: ObjectId) -> Option<&Monitor> {
        self.monitors.get(object)
    }

    pub fn monitor_owner(&self, object: ObjectId) -> Option<ThreadId> {
        self.monitors.get(object).and_then(Monitor::owner)
    }

    /// Monitor journal; empty unless `record_monitor_events` is set
    pub fn monitor_events(&self) -> &[MonitorEvent] {
        self.monitors.events()
    }

    pub fn semaphore(&self, object: ObjectId) -> Option<&Semaphore> {
        self.semaphores.get(object).ok()
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn halted(&self) -> Option<&Halt> {
        self.halted.as_ref()
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn set_speed(&self, steps_per_second: f64) {
        self.context.speed().set(steps_per_second);
    }
}

/// Release one hold of `monitor`, journaling the release and any hand-off
fn release_hold(
    monitors: &mut MonitorRegistry,
    thread: ThreadId,
    monitor: ObjectId,
) -> EngineResult<Option<ThreadId>> {
    let next = monitors.get_mut(monitor)?.exit(thread)?;
    monitors.record(MonitorEvent::Released {
        thread,
        monitor: monitor.as_u64(),
    });
    if let Some(next) = next {
        monitors.record(MonitorEvent::Acquired {
            thread: next,
            monitor: monitor.as_u64(),
        });
    }
    monitors.remove_if_idle(monitor);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::scheduler::ManualClock;
    use crate::trace::CollectingSink;

    fn scheduler() -> Scheduler {
        let context = Arc::new(EngineContext::new(EngineConfig::default(), Vec::new()).unwrap());
        Scheduler::new(
            context,
            Arc::new(ManualClock::new()),
            Arc::new(CollectingSink::new()),
        )
    }

    fn noop() -> Arc<Program> {
        Program::new("Noop.run")
            .step(|_| Ok(StepOutcome::Next))
            .into_arc()
    }

    #[test]
    fn test_empty_scheduler_is_finished() {
        let mut s = scheduler();
        assert_eq!(s.tick(), TickOutcome::Finished);
        assert_eq!(s.stats().ticks, 1);
    }

    #[test]
    fn test_created_thread_waits_for_start() {
        let mut s = scheduler();
        let id = s.create_thread("t", noop(), vec![]).unwrap();
        assert_eq!(s.thread_state(id), Some(ThreadState::New));
        assert_eq!(s.tick(), TickOutcome::Idle);

        s.start(id).unwrap();
        assert_eq!(s.tick(), TickOutcome::Stepped(id));
        assert_eq!(s.thread_state(id), Some(ThreadState::Runnable));
        assert!(s.start(id).is_err());
    }

    #[test]
    fn test_unknown_thread() {
        let mut s = scheduler();
        assert!(matches!(
            s.start(ThreadId::new()),
            Err(EngineError::UnknownThread(_))
        ));
    }

    #[test]
    fn test_context_switches_counted_on_change() {
        let mut s = scheduler();
        s.spawn("a", noop(), vec![]).unwrap();
        s.spawn("b", noop(), vec![]).unwrap();
        s.run(10);
        // a, b, a (return), b (return)
        assert_eq!(s.stats().context_switches, 4);
    }

    #[test]
    fn test_halt_clears_queue() {
        let mut s = scheduler();
        let a = s.spawn("a", noop(), vec![]).unwrap();
        s.halt(Halt::Exit(0));
        assert_eq!(s.thread_state(a), Some(ThreadState::Terminated));
        assert_eq!(s.run_queue().count(), 0);
        assert_eq!(s.tick(), TickOutcome::Halted(Halt::Exit(0)));
    }
}
