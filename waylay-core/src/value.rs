//! Runtime values crossing the interception boundary.
//!
//! The engine shuttles arguments, receivers, results, and thrown exceptions
//! between the intercepted caller, the hooks, and the original method without
//! ever looking inside them. [`Value`] is the dynamically typed carrier,
//! [`ObjectRef`] the shared handle for reference-typed payloads, and
//! [`Throwable`] a thrown exception travelling as plain data.

use std::{any::Any, fmt, sync::Arc};

/// A shared handle to a runtime object.
///
/// The payload is opaque to the engine; only the embedder and the hooks know
/// what is behind it. The class name is carried alongside so hooks and the
/// assignability check can reason about the object without downcasting.
///
/// Equality is handle identity, matching reference equality in the hooked
/// runtime: two `ObjectRef`s are equal exactly when they share one payload.
#[derive(Clone)]
pub struct ObjectRef {
    class: Arc<str>,
    payload: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    /// Wraps a payload under the given runtime class name.
    pub fn new(class: impl Into<Arc<str>>, payload: impl Any + Send + Sync) -> Self {
        Self {
            class: class.into(),
            payload: Arc::new(payload),
        }
    }

    /// The runtime class name of the referenced object.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Borrows the payload as a concrete type, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    /// Whether both handles refer to the same payload.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.class)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

/// A dynamically typed argument or result value.
///
/// Mirrors the hooked runtime's value model: the eight primitive kinds, a
/// null reference, and an opaque object handle. `Char` is a UTF-16 code unit.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The null reference.
    Null,
    /// A boolean primitive.
    Bool(bool),
    /// A signed 8-bit primitive.
    Byte(i8),
    /// A signed 16-bit primitive.
    Short(i16),
    /// A signed 32-bit primitive.
    Int(i32),
    /// A signed 64-bit primitive.
    Long(i64),
    /// A 32-bit floating point primitive.
    Float(f32),
    /// A 64-bit floating point primitive.
    Double(f64),
    /// A UTF-16 code unit primitive.
    Char(u16),
    /// A reference to a runtime object.
    Object(ObjectRef),
}

impl Value {
    /// Whether this is the null reference.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The runtime class name, for object values.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Value::Object(obj) => Some(obj.class()),
            _ => None,
        }
    }

    /// A short label for the value's kind, used in log and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::Object(_) => "object",
        }
    }
}

/// A thrown exception moving through the dispatch pipeline as data.
///
/// Hooks throw by handing one of these to the engine; the original method
/// throws by returning one through the bridge. A `Throwable` is never a Rust
/// panic and never unwinds.
#[derive(Clone, Debug, PartialEq)]
pub struct Throwable {
    class: Arc<str>,
    message: Option<String>,
    cause: Option<Box<Throwable>>,
}

impl Throwable {
    /// A throwable of the given exception class with a message.
    pub fn new(class: impl Into<Arc<str>>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: Some(message.into()),
            cause: None,
        }
    }

    /// A throwable of the given exception class without a message.
    pub fn without_message(class: impl Into<Arc<str>>) -> Self {
        Self {
            class: class.into(),
            message: None,
            cause: None,
        }
    }

    /// Attaches a cause, consuming and returning the throwable.
    pub fn with_cause(mut self, cause: Throwable) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// The exception class name.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// The detail message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The chained cause, if any.
    pub fn cause(&self) -> Option<&Throwable> {
        self.cause.as_deref()
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.class, message),
            None => write!(f, "{}", self.class),
        }
    }
}

impl std::error::Error for Throwable {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
