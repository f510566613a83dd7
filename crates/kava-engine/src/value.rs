//! Runtime values
//!
//! Object handles carry a shared liveness flag. Destroying an object flips
//! the flag for every copy of the handle; each use checks it first and fails
//! with [`EngineError::DestroyedObject`].

use crate::error::{EngineError, EngineResult};
use crate::exception::JavaException;
use crate::thread::ThreadId;
use kava_types::{PrimitiveValue, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of a runtime object; also keys its monitor
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    /// Allocate a fresh id
    pub fn new() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Liveness flag shared by every handle to one object
#[derive(Debug)]
pub struct Destroyable {
    alive: AtomicBool,
}

impl Destroyable {
    pub fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn destroy(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl Default for Destroyable {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference to a heap object
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    id: ObjectId,
    class: TypeId,
    liveness: Arc<Destroyable>,
}

impl ObjectHandle {
    pub fn new(class: TypeId) -> Self {
        Self {
            id: ObjectId::new(),
            class,
            liveness: Arc::new(Destroyable::new()),
        }
    }

    /// Object id, failing if the object was destroyed
    pub fn id(&self) -> EngineResult<ObjectId> {
        self.check()?;
        Ok(self.id)
    }

    /// Object id without the liveness check
    pub fn raw_id(&self) -> ObjectId {
        self.id
    }

    pub fn class(&self) -> EngineResult<TypeId> {
        self.check()?;
        Ok(self.class)
    }

    pub fn check(&self) -> EngineResult<()> {
        if self.liveness.is_alive() {
            Ok(())
        } else {
            Err(EngineError::DestroyedObject(self.id))
        }
    }

    /// Destroy the object for every holder of a handle
    pub fn destroy(&self) {
        self.liveness.destroy();
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A value on the operand stack or in a local slot
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// `null`, also the initial value of every local
    #[default]
    Null,
    /// Primitive or string
    Primitive(PrimitiveValue),
    /// Class instance
    Object(ObjectHandle),
    /// Thrown or caught exception
    Exception(Arc<JavaException>),
    /// `java.lang.Thread` reference
    Thread(ThreadId),
}

impl Value {
    pub fn int(v: i32) -> Self {
        Value::Primitive(PrimitiveValue::Int(v))
    }

    pub fn long(v: i64) -> Self {
        Value::Primitive(PrimitiveValue::Long(v))
    }

    pub fn boolean(v: bool) -> Self {
        Value::Primitive(PrimitiveValue::Boolean(v))
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Primitive(PrimitiveValue::String(s.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short description used in fault messages
    pub fn kind(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Primitive(p) => p.ty().to_string(),
            Value::Object(_) => "object".to_string(),
            Value::Exception(e) => e.identifier().to_string(),
            Value::Thread(_) => "Thread".to_string(),
        }
    }

    pub fn as_primitive(&self) -> EngineResult<&PrimitiveValue> {
        match self {
            Value::Primitive(p) => Ok(p),
            other => Err(EngineError::TypeMismatch {
                expected: "primitive",
                found: other.kind(),
            }),
        }
    }

    /// Integral value widened to `i64`
    pub fn as_i64(&self) -> EngineResult<i64> {
        self.as_primitive()?
            .as_i64()
            .ok_or_else(|| EngineError::TypeMismatch {
                expected: "integral",
                found: self.kind(),
            })
    }

    pub fn as_bool(&self) -> EngineResult<bool> {
        self.as_primitive()?
            .as_bool()
            .ok_or_else(|| EngineError::TypeMismatch {
                expected: "boolean",
                found: self.kind(),
            })
    }

    pub fn as_object(&self) -> EngineResult<&ObjectHandle> {
        match self {
            Value::Object(handle) => Ok(handle),
            other => Err(EngineError::TypeMismatch {
                expected: "object",
                found: other.kind(),
            }),
        }
    }

    pub fn as_exception(&self) -> EngineResult<&Arc<JavaException>> {
        match self {
            Value::Exception(e) => Ok(e),
            other => Err(EngineError::TypeMismatch {
                expected: "exception",
                found: other.kind(),
            }),
        }
    }

    pub fn as_thread(&self) -> EngineResult<ThreadId> {
        match self {
            Value::Thread(id) => Ok(*id),
            other => Err(EngineError::TypeMismatch {
                expected: "Thread",
                found: other.kind(),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => Arc::ptr_eq(a, b),
            (Value::Thread(a), Value::Thread(b)) => a == b,
            _ => false,
        }
    }
}

impl From<PrimitiveValue> for Value {
    fn from(v: PrimitiveValue) -> Self {
        Value::Primitive(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Primitive(p) => write!(f, "{}", p),
            Value::Object(h) => write!(f, "Object@{:x}", h.raw_id().as_u64()),
            Value::Exception(e) => write!(f, "{}", e),
            Value::Thread(id) => write!(f, "Thread[{}]", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kava_types::{ClassDeclaration, TypeGraph};

    fn class_id() -> TypeId {
        let mut graph = TypeGraph::new();
        graph.declare(ClassDeclaration::class("Box")).unwrap()
    }

    #[test]
    fn test_object_ids_unique() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_destroy_is_shared_between_handles() {
        let handle = ObjectHandle::new(class_id());
        let copy = handle.clone();
        assert!(copy.id().is_ok());

        handle.destroy();
        assert!(!copy.is_alive());
        assert!(matches!(copy.id(), Err(EngineError::DestroyedObject(_))));
        assert!(matches!(copy.class(), Err(EngineError::DestroyedObject(_))));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::int(7).as_i64().unwrap(), 7);
        assert!(Value::boolean(true).as_bool().unwrap());
        assert!(Value::Null.as_i64().is_err());
        assert!(Value::string("x").as_object().is_err());
        assert!(Value::default().is_null());
    }

    #[test]
    fn test_value_equality() {
        let handle = ObjectHandle::new(class_id());
        assert_eq!(Value::Object(handle.clone()), Value::Object(handle));
        assert_ne!(
            Value::Object(ObjectHandle::new(class_id())),
            Value::Object(ObjectHandle::new(class_id()))
        );
        assert_eq!(Value::string("a"), Value::string("a"));
        assert_ne!(Value::int(1), Value::long(1));
    }
}
