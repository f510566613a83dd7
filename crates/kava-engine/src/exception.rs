//! Exceptions, try regions and unwinding
//!
//! A try region records how deep the thread was when the region was entered:
//! operand slots, call frames and held monitors. Unwinding pops regions
//! innermost first and restores each of those marks, releasing monitors
//! acquired inside the region in reverse acquisition order.
//!
//! Finally blocks run with a [`PendingFinally`] describing the completion
//! they interrupted. `EndFinally` resumes it: continue after the try
//! statement, keep propagating an exception, or finish a return.

use crate::error::{EngineError, EngineResult};
use crate::program::SourceRange;
use crate::thread::{Thread, ThreadId};
use crate::trace::StackTrace;
use crate::value::{ObjectId, Value};
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Catch-set entry no clause can name
///
/// Exceptions carrying it skip every catch clause (finally blocks still run)
/// and halt the whole program when they escape a thread.
pub const UNCATCHABLE: &str = "$Uncatchable";

/// Where an exception was first thrown
#[derive(Debug, Clone)]
pub struct ExceptionOrigin {
    pub thread: ThreadId,
    pub thread_name: String,
    pub source: Option<SourceRange>,
    pub stack_trace: StackTrace,
}

/// A thrown Java exception
#[derive(Debug)]
pub struct JavaException {
    identifier: String,
    message: Option<String>,
    /// Own identifier followed by every supertype
    catchable_as: Vec<String>,
    origin: OnceLock<ExceptionOrigin>,
}

impl JavaException {
    /// `catchable_as` lists the supertypes; the own identifier is added if missing
    pub fn new(
        identifier: impl Into<String>,
        message: Option<String>,
        catchable_as: Vec<String>,
    ) -> Self {
        let identifier = identifier.into();
        let mut names = Vec::with_capacity(catchable_as.len() + 1);
        names.push(identifier.clone());
        names.extend(catchable_as.into_iter().filter(|n| *n != identifier));
        Self {
            identifier,
            message,
            catchable_as: names,
            origin: OnceLock::new(),
        }
    }

    /// Exception that bypasses every catch clause
    pub fn uncatchable(identifier: impl Into<String>, message: Option<String>) -> Self {
        Self::new(identifier, message, vec![UNCATCHABLE.to_string()])
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn catchable_as(&self) -> &[String] {
        &self.catchable_as
    }

    pub fn is_catchable(&self) -> bool {
        !self.catchable_as.iter().any(|n| n == UNCATCHABLE)
    }

    pub fn origin(&self) -> Option<&ExceptionOrigin> {
        self.origin.get()
    }

    /// Record the throw site; later rethrows keep the first one
    pub fn record_origin(&self, origin: ExceptionOrigin) -> bool {
        self.origin.set(origin).is_ok()
    }
}

impl fmt::Display for JavaException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.identifier, message),
            None => f.write_str(&self.identifier),
        }
    }
}

/// One `catch (A | B e)` clause
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub catchable: FxHashSet<String>,
    /// Step index of the handler, which starts with the exception pushed
    pub entry: usize,
}

impl CatchClause {
    pub fn new<I, S>(catchable: I, entry: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catchable: catchable.into_iter().map(Into::into).collect(),
            entry,
        }
    }

    pub fn matches(&self, exception: &JavaException) -> bool {
        exception.is_catchable()
            && exception
                .catchable_as()
                .iter()
                .any(|name| self.catchable.contains(name))
    }
}

/// Static shape of a try statement, as emitted by the compiler
#[derive(Debug, Clone, Default)]
pub struct TryBlock {
    /// In source order; the first match wins
    pub clauses: Vec<CatchClause>,
    pub finally_entry: Option<usize>,
}

impl TryBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catch<I, S>(mut self, catchable: I, entry: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clauses.push(CatchClause::new(catchable, entry));
        self
    }

    pub fn finally(mut self, entry: usize) -> Self {
        self.finally_entry = Some(entry);
        self
    }
}

/// A try statement the thread is inside of
#[derive(Debug, Clone)]
pub struct TryRegion {
    pub clauses: Vec<CatchClause>,
    pub finally_entry: Option<usize>,
    /// Absolute operand depth at entry
    pub stack_depth: usize,
    /// Frame count at entry
    pub frame_depth: usize,
    /// Length of the held-monitor list at entry
    pub monitor_mark: usize,
}

impl TryRegion {
    pub fn find_clause(&self, exception: &JavaException) -> Option<&CatchClause> {
        self.clauses.iter().find(|c| c.matches(exception))
    }
}

/// How a try statement was left before its finally block ran
#[derive(Debug, Clone)]
pub enum Completion {
    Normal { resume: usize },
    Throw(Arc<JavaException>),
    Return(Option<Value>),
}

#[derive(Debug, Clone)]
pub struct PendingFinally {
    pub completion: Completion,
    /// Number of try regions still open when the finally block started
    pub try_depth: usize,
    pub frame_depth: usize,
}

/// Result of unwinding one thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unwind {
    /// A catch clause took the exception
    Caught { entry: usize },
    /// A finally block runs before the exception keeps propagating
    Finally { entry: usize },
    /// No region left on the thread
    Uncaught,
}

/// Unwind `thread` until a region handles `exception`
///
/// `release` is called for every monitor acquired inside a popped region,
/// most recent first.
pub fn unwind<F>(thread: &mut Thread, exception: &Arc<JavaException>, mut release: F) -> EngineResult<Unwind>
where
    F: FnMut(ThreadId, ObjectId) -> EngineResult<()>,
{
    let id = thread.id();
    loop {
        let Some(region) = thread.try_regions.pop() else {
            return Ok(Unwind::Uncaught);
        };
        let index = thread.try_regions.len();
        thread.pending_finally.retain(|p| p.try_depth <= index);

        while thread.stack.frame_count() > region.frame_depth {
            thread.stack.pop_frame()?;
        }
        thread
            .pending_finally
            .retain(|p| p.frame_depth <= region.frame_depth);

        for monitor in thread.take_monitors_since(region.monitor_mark).into_iter().rev() {
            release(id, monitor)?;
        }
        thread.stack.truncate(region.stack_depth);

        if let Some(clause) = region.find_clause(exception) {
            let entry = clause.entry;
            if region.finally_entry.is_some() {
                // the finally block still runs once the handler finishes
                thread.try_regions.push(TryRegion {
                    clauses: Vec::new(),
                    ..region
                });
            }
            thread.stack.push(Value::Exception(exception.clone()))?;
            jump(thread, entry)?;
            return Ok(Unwind::Caught { entry });
        }

        if let Some(entry) = region.finally_entry {
            thread.pending_finally.push(PendingFinally {
                completion: Completion::Throw(exception.clone()),
                try_depth: index,
                frame_depth: region.frame_depth,
            });
            jump(thread, entry)?;
            return Ok(Unwind::Finally { entry });
        }
    }
}

fn jump(thread: &mut Thread, entry: usize) -> EngineResult<()> {
    let frame = thread
        .stack
        .current_frame_mut()
        .ok_or_else(|| EngineError::MalformedProgram("try region outlived its frame".to_string()))?;
    frame.ip = entry;
    Ok(())
}
