//! System faults
//!
//! Java-level exceptions never appear here: they are values flowing through
//! the unwinder. An `EngineError` is an engine invariant violation and halts
//! the whole program.

use crate::config::ConfigError;
use crate::library::LibraryError;
use crate::sync::{MonitorError, SemaphoreError};
use crate::thread::{ThreadId, ThreadState};
use crate::value::ObjectId;
use kava_types::TypeError;

/// Engine faults
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Operand stack exceeded its configured size
    #[error("Stack overflow (limit {limit} slots)")]
    StackOverflow {
        /// Configured slot limit
        limit: usize,
    },

    /// Pop from an empty operand stack
    #[error("Stack underflow")]
    StackUnderflow,

    /// Local slot outside the current frame
    #[error("Local index {index} out of bounds (frame has {count})")]
    LocalOutOfBounds {
        /// Requested slot
        index: usize,
        /// Slots in the frame
        count: usize,
    },

    /// State change the thread state machine does not allow
    #[error("Thread {thread} cannot move from {from:?} to {to:?}")]
    IllegalStateTransition {
        /// Thread being changed
        thread: ThreadId,
        /// Current state
        from: ThreadState,
        /// Requested state
        to: ThreadState,
    },

    /// Reference to a thread the scheduler does not own
    #[error("Unknown thread {0}")]
    UnknownThread(ThreadId),

    /// Use of an object handle after it was destroyed
    #[error("Object {0:?} used after it was destroyed")]
    DestroyedObject(ObjectId),

    /// Value of the wrong kind where the step program expected another
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected kind
        expected: &'static str,
        /// Found kind
        found: String,
    },

    /// Step program that breaks the calling convention
    #[error("Malformed program: {0}")]
    MalformedProgram(String),

    /// Inline template reached the scheduler instead of being expanded
    #[error("Template method {0} cannot be invoked at run time")]
    TemplateInvocation(String),

    /// Virtual call without an implementation anywhere in the class chain
    #[error("No implementation of {signature} in {class}")]
    UnresolvedMethod {
        /// Receiver class
        class: String,
        /// Dispatch key
        signature: String,
    },

    /// I/O completion for a token no thread waits on
    #[error("No thread awaits I/O token {0}")]
    UnknownIoToken(u64),

    /// Monitor protocol violation
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    /// Semaphore protocol violation
    #[error(transparent)]
    Semaphore(#[from] SemaphoreError),

    /// Library declaration error
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Type model inconsistency
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Engine result type
pub type EngineResult<T> = Result<T, EngineError>;
