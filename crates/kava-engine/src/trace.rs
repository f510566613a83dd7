//! Stack traces and uncaught exception reporting

use crate::error::EngineError;
use crate::exception::JavaException;
use crate::program::SourceRange;
use crate::stack::CallFrame;
use crate::thread::ThreadId;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;

/// One line of a stack trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrameInfo {
    /// `Class.method`
    pub method: String,
    pub source: Option<SourceRange>,
}

impl fmt::Display for StackFrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "at {} ({})", self.method, source),
            None => write!(f, "at {}", self.method),
        }
    }
}

/// Frames at the throw site, innermost first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StackTrace {
    pub frames: Vec<StackFrameInfo>,
}

impl StackTrace {
    /// Capture the frames of a thread, innermost first
    pub fn capture(frames: &[CallFrame]) -> Self {
        Self {
            frames: frames
                .iter()
                .rev()
                .map(|frame| StackFrameInfo {
                    method: frame.program.qualified_name.clone(),
                    source: frame.current_source(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "    {}", frame)?;
        }
        Ok(())
    }
}

/// Report for an exception that escaped a thread
#[derive(Debug, Clone, Serialize)]
pub struct UncaughtException {
    pub identifier: String,
    pub message: Option<String>,
    pub thread_id: u64,
    pub thread_name: String,
    pub source: Option<SourceRange>,
    pub stack_trace: StackTrace,
}

impl UncaughtException {
    pub fn new(exception: &JavaException, thread: ThreadId, thread_name: &str) -> Self {
        let origin = exception.origin();
        Self {
            identifier: exception.identifier().to_string(),
            message: exception.message().map(str::to_string),
            thread_id: thread.as_u64(),
            thread_name: thread_name.to_string(),
            source: origin.and_then(|o| o.source.clone()),
            stack_trace: origin.map(|o| o.stack_trace.clone()).unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for UncaughtException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exception in thread \"{}\" {}", self.thread_name, self.identifier)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        if !self.stack_trace.is_empty() {
            write!(f, "\n{}", self.stack_trace)?;
        }
        Ok(())
    }
}

/// Destination for uncaught exceptions and system faults
pub trait ExceptionSink: Send + Sync {
    fn report_uncaught(&self, report: &UncaughtException);

    fn report_fault(&self, thread: Option<ThreadId>, fault: &EngineError);
}

/// Sink writing through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ExceptionSink for TracingSink {
    fn report_uncaught(&self, report: &UncaughtException) {
        tracing::error!(
            thread = %report.thread_name,
            exception = %report.identifier,
            "{}",
            report
        );
    }

    fn report_fault(&self, thread: Option<ThreadId>, fault: &EngineError) {
        match thread {
            Some(thread) => tracing::error!(%thread, "engine fault: {}", fault),
            None => tracing::error!("engine fault: {}", fault),
        }
    }
}

/// Sink keeping every report in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    uncaught: Mutex<Vec<UncaughtException>>,
    faults: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uncaught(&self) -> Vec<UncaughtException> {
        self.uncaught.lock().clone()
    }

    pub fn faults(&self) -> Vec<String> {
        self.faults.lock().clone()
    }
}

impl ExceptionSink for CollectingSink {
    fn report_uncaught(&self, report: &UncaughtException) {
        self.uncaught.lock().push(report.clone());
    }

    fn report_fault(&self, _thread: Option<ThreadId>, fault: &EngineError) {
        self.faults.lock().push(fault.to_string());
    }
}
