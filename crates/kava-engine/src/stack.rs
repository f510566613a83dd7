//! Operand stack and call frames of one thread
//!
//! Locals and operands share one slot vector. A frame's locals start at its
//! base pointer; arguments are the first locals and are already on the stack
//! when the frame is pushed.
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ operands of frame N                 │  ← depth()
//! │ locals of frame N                   │  ← frame N base_pointer
//! ├─────────────────────────────────────┤
//! │ operands of frame N-1               │
//! │ locals of frame N-1                 │
//! └─────────────────────────────────────┘
//! ```

use crate::error::{EngineError, EngineResult};
use crate::program::{Program, SourceRange};
use crate::value::Value;
use std::sync::Arc;

/// One method activation
#[derive(Clone)]
pub struct CallFrame {
    /// Method body being executed
    pub program: Arc<Program>,

    /// Index of the step that runs next (or, for callers, the calling step)
    pub ip: usize,

    /// Start of this frame's locals in the slot vector
    pub base_pointer: usize,

    /// Number of local slots, arguments included
    pub local_count: usize,

    /// Count of monitors the thread held when the frame was entered
    pub monitor_mark: usize,
}

impl CallFrame {
    /// Source range of the step the frame is positioned at
    pub fn current_source(&self) -> Option<SourceRange> {
        self.program.steps.get(self.ip).and_then(|s| s.source.clone())
    }
}

impl std::fmt::Debug for CallFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallFrame")
            .field("program", &self.program.qualified_name)
            .field("ip", &self.ip)
            .field("base_pointer", &self.base_pointer)
            .field("local_count", &self.local_count)
            .field("monitor_mark", &self.monitor_mark)
            .finish()
    }
}

/// Operand and call frame stack
#[derive(Debug)]
pub struct Stack {
    slots: Vec<Value>,
    frames: Vec<CallFrame>,
    max_size: usize,
}

impl Stack {
    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            slots: Vec::with_capacity(max_size.min(256)),
            frames: Vec::new(),
            max_size,
        }
    }

    // ========================================================================
    // Operand Stack Operations
    // ========================================================================

    #[inline]
    pub fn push(&mut self, value: Value) -> EngineResult<()> {
        if self.slots.len() >= self.max_size {
            return Err(EngineError::StackOverflow {
                limit: self.max_size,
            });
        }
        self.slots.push(value);
        Ok(())
    }

    /// Pop an operand; never pops into the current frame's locals
    #[inline]
    pub fn pop(&mut self) -> EngineResult<Value> {
        if self.slots.len() <= self.operand_base() {
            return Err(EngineError::StackUnderflow);
        }
        self.slots.pop().ok_or(EngineError::StackUnderflow)
    }

    /// Pop `n` operands, returned bottom first
    pub fn pop_n(&mut self, n: usize) -> EngineResult<Vec<Value>> {
        if self.slots.len() < self.operand_base() + n {
            return Err(EngineError::StackUnderflow);
        }
        let at = self.slots.len() - n;
        Ok(self.slots.split_off(at))
    }

    #[inline]
    pub fn peek(&self) -> EngineResult<&Value> {
        if self.slots.len() <= self.operand_base() {
            return Err(EngineError::StackUnderflow);
        }
        self.slots.last().ok_or(EngineError::StackUnderflow)
    }

    /// Total slots in use, locals included
    #[inline]
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Drop slots above `depth`
    pub fn truncate(&mut self, depth: usize) {
        self.slots.truncate(depth);
    }

    fn operand_base(&self) -> usize {
        self.frames
            .last()
            .map(|f| f.base_pointer + f.local_count)
            .unwrap_or(0)
    }

    // ========================================================================
    // Call Frame Management
    // ========================================================================

    /// Push a frame whose first `arg_count` locals are the topmost operands
    pub fn push_frame(
        &mut self,
        program: Arc<Program>,
        arg_count: usize,
        monitor_mark: usize,
    ) -> EngineResult<()> {
        let local_count = program.local_count.max(arg_count);
        if self.slots.len() < self.operand_base() + arg_count {
            return Err(EngineError::StackUnderflow);
        }
        let base_pointer = self.slots.len() - arg_count;
        if base_pointer + local_count > self.max_size {
            return Err(EngineError::StackOverflow {
                limit: self.max_size,
            });
        }
        self.slots.resize(base_pointer + local_count, Value::Null);
        self.frames.push(CallFrame {
            program,
            ip: 0,
            base_pointer,
            local_count,
            monitor_mark,
        });
        Ok(())
    }

    /// Pop the current frame and release its slots
    pub fn pop_frame(&mut self) -> EngineResult<CallFrame> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| EngineError::MalformedProgram("no call frame to pop".to_string()))?;
        self.slots.truncate(frame.base_pointer);
        Ok(frame)
    }

    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn current_frame_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frames from outermost to innermost
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    // ========================================================================
    // Local Variable Access
    // ========================================================================

    fn local_slot(&self, index: usize) -> EngineResult<usize> {
        let frame = self
            .current_frame()
            .ok_or_else(|| EngineError::MalformedProgram("no active call frame".to_string()))?;
        if index >= frame.local_count {
            return Err(EngineError::LocalOutOfBounds {
                index,
                count: frame.local_count,
            });
        }
        Ok(frame.base_pointer + index)
    }

    pub fn load_local(&self, index: usize) -> EngineResult<&Value> {
        let slot = self.local_slot(index)?;
        Ok(&self.slots[slot])
    }

    pub fn store_local(&mut self, index: usize, value: Value) -> EngineResult<()> {
        let slot = self.local_slot(index)?;
        self.slots[slot] = value;
        Ok(())
    }

    /// All slots, bottom first
    pub fn as_slice(&self) -> &[Value] {
        &self.slots
    }

    pub fn stats(&self) -> StackStats {
        StackStats {
            depth: self.slots.len(),
            max_size: self.max_size,
            frame_count: self.frames.len(),
        }
    }
}

/// Stack statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackStats {
    /// Current slot count
    pub depth: usize,

    /// Maximum allowed slots
    pub max_size: usize,

    /// Number of active call frames
    pub frame_count: usize,
}
