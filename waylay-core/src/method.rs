//! Method identity and descriptors.

use std::{fmt, sync::Arc};

use bitflags::bitflags;

/// Opaque identifier of one interceptable method.
///
/// Assigned by the embedder when it resolves a real method; two descriptors
/// carrying the same id denote the same method. All registry bookkeeping is
/// keyed by this id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u64);

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Modifier bits the engine cares about.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MethodFlags: u32 {
        /// The method has no receiver.
        const STATIC = 1;
        /// The method has no body; hooking it is rejected.
        const ABSTRACT = 1 << 1;
        /// A constructor: no receiver at the dispatch boundary, no
        /// declared return type.
        const CONSTRUCTOR = 1 << 2;
    }
}

/// The eight primitive kinds of the hooked runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PrimType {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
}

/// A declared parameter or return type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDesc {
    /// The void return type.
    Void,
    /// A primitive type.
    Prim(PrimType),
    /// A reference type, by class name.
    Reference(Arc<str>),
}

impl TypeDesc {
    /// A reference type for the given class name.
    pub fn reference(class: impl Into<Arc<str>>) -> Self {
        TypeDesc::Reference(class.into())
    }

    /// The class name, for reference types.
    pub fn as_reference(&self) -> Option<&str> {
        match self {
            TypeDesc::Reference(class) => Some(class),
            _ => None,
        }
    }
}

/// Descriptor of one interceptable method.
///
/// Identity is the [`MethodId`] alone; the remaining fields describe the
/// method to hooks and to the final result-type check. Descriptors are
/// built by the embedder and passed around as `Arc<MethodDesc>`.
#[derive(Clone, Debug)]
pub struct MethodDesc {
    id: MethodId,
    class: Arc<str>,
    name: Arc<str>,
    params: Vec<TypeDesc>,
    return_type: Option<TypeDesc>,
    flags: MethodFlags,
}

impl MethodDesc {
    /// A descriptor with no parameters, a void return type, and no flags.
    pub fn new(id: MethodId, class: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            class: class.into(),
            name: name.into(),
            params: Vec::new(),
            return_type: Some(TypeDesc::Void),
            flags: MethodFlags::empty(),
        }
    }

    /// Sets the declared parameter types.
    pub fn params(mut self, params: Vec<TypeDesc>) -> Self {
        self.params = params;
        self
    }

    /// Sets the declared return type.
    pub fn returns(mut self, return_type: TypeDesc) -> Self {
        self.return_type = Some(return_type);
        self
    }

    /// Sets the modifier flags. `CONSTRUCTOR` clears the return type.
    pub fn flags(mut self, flags: MethodFlags) -> Self {
        self.flags = flags;
        if flags.contains(MethodFlags::CONSTRUCTOR) {
            self.return_type = None;
        }
        self
    }

    /// The method's identity.
    pub fn id(&self) -> MethodId {
        self.id
    }

    /// The declaring class name.
    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// The method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared parameter types.
    pub fn param_types(&self) -> &[TypeDesc] {
        &self.params
    }

    /// The declared return type; absent for constructors.
    pub fn return_type(&self) -> Option<&TypeDesc> {
        self.return_type.as_ref()
    }

    /// The modifier flags.
    pub fn modifiers(&self) -> MethodFlags {
        self.flags
    }

    /// Whether the method is static.
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    /// Whether the method is abstract.
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodFlags::ABSTRACT)
    }

    /// Whether this descriptor names a constructor.
    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodFlags::CONSTRUCTOR)
    }

    /// Whether an intercepted call carries a receiver at element 0 of the
    /// raw argument vector. Static methods and constructors do not.
    pub fn takes_receiver(&self) -> bool {
        !self.is_static() && !self.is_constructor()
    }
}

impl PartialEq for MethodDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MethodDesc {}

impl std::hash::Hash for MethodDesc {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for MethodDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.name)
    }
}
