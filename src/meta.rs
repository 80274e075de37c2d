//! Method and type metadata
//!
//! A minimal model of the metadata a compiler's front end hands to the IR:
//! resolved types, resolved methods and constant values. Positions only need
//! identity, names, signatures and the "is this value an instance of T"
//! predicate, so that is all this module provides.
//!
//! Types and methods are reference counted handles. Two handles are equal only
//! if they refer to the same registered entity (identity, not name equality).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global counter for unique type IDs
static TYPE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Global counter for unique method IDs
static METHOD_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_type_id() -> u64 {
    TYPE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

fn next_method_id() -> u64 {
    METHOD_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Fibonacci mixing of an identity into a 32-bit hash
#[inline]
fn mix_id(id: u64) -> i32 {
    (id.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as i32
}

#[derive(Debug)]
struct TypeInfo {
    id: u64,
    /// Internal name, e.g. `Ljava/lang/String;`
    name: String,
    supertypes: Vec<TypeRef>,
}

/// Handle to a resolved type
#[derive(Clone)]
pub struct TypeRef {
    inner: Arc<TypeInfo>,
}

impl TypeRef {
    /// Create a root type with no supertypes
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_supertypes(name, Vec::new())
    }

    /// Create a type that directly extends or implements `supertypes`
    pub fn with_supertypes(name: impl Into<String>, supertypes: Vec<TypeRef>) -> Self {
        Self {
            inner: Arc::new(TypeInfo {
                id: next_type_id(),
                name: name.into(),
                supertypes,
            }),
        }
    }

    /// Internal (descriptor) name of this type
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Direct supertypes
    #[inline]
    pub fn supertypes(&self) -> &[TypeRef] {
        &self.inner.supertypes
    }

    /// Source-form name: `Lfoo/Bar;` becomes `foo.Bar`
    ///
    /// Names that are not in descriptor form are returned unchanged.
    pub fn to_source_name(&self) -> String {
        let name = self.name();
        match name.strip_prefix('L').and_then(|n| n.strip_suffix(';')) {
            Some(inner) => inner.replace('/', "."),
            None => name.to_string(),
        }
    }

    /// Whether `self` is `other` or transitively extends it
    pub fn is_subtype_of(&self, other: &TypeRef) -> bool {
        let mut pending: Vec<&TypeRef> = vec![self];
        while let Some(ty) = pending.pop() {
            if ty == other {
                return true;
            }
            pending.extend(ty.supertypes());
        }
        false
    }

    /// Whether `value` is an instance of this type
    ///
    /// Only object constants are instances of anything; `null` and primitives
    /// never are.
    pub fn is_instance(&self, value: &Constant) -> bool {
        match value {
            Constant::Object(object) => object.ty.is_subtype_of(self),
            Constant::Null | Constant::Int(_) => false,
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.name())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_source_name())
    }
}

/// Method signature in descriptor form, e.g. `(II)V`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    descriptor: String,
}

impl Signature {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor)
    }
}

#[derive(Debug)]
struct MethodInfo {
    id: u64,
    name: String,
    signature: Signature,
    declaring_type: TypeRef,
    hash: i32,
}

/// Handle to a resolved method
///
/// Equality and hashing use the method's identity. Two methods with the same
/// name and signature on different types are different methods.
#[derive(Clone)]
pub struct MethodRef {
    inner: Arc<MethodInfo>,
}

impl MethodRef {
    pub fn new(declaring_type: TypeRef, name: impl Into<String>, signature: Signature) -> Self {
        let id = next_method_id();
        Self {
            inner: Arc::new(MethodInfo {
                id,
                name: name.into(),
                signature,
                declaring_type,
                hash: mix_id(id),
            }),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    #[inline]
    pub fn declaring_type(&self) -> &TypeRef {
        &self.inner.declaring_type
    }

    /// 32-bit identity hash, stable for the lifetime of the method
    #[inline]
    pub fn identity_hash(&self) -> i32 {
        self.inner.hash
    }

    /// Same name and signature, regardless of declaring type
    ///
    /// Call sites through interfaces resolve to a different declaring type than
    /// the inlined implementation, so this is the comparison the link verifier uses.
    pub fn matches_name_and_signature(&self, other: &MethodRef) -> bool {
        self.name() == other.name() && self.signature() == other.signature()
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MethodRef {}

impl Hash for MethodRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodRef({}.{}{})", self.declaring_type().to_source_name(), self.name(), self.signature())
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.declaring_type(), self.name(), self.signature())
    }
}

/// An object reference constant: its runtime type plus a handle identifying the object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectConstant {
    pub ty: TypeRef,
    pub handle: u64,
}

/// A compile-time constant value, used as the receiver payload of a frame
///
/// Compared by value: two object constants are equal when they have the same
/// type and handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Null,
    Int(i64),
    Object(ObjectConstant),
}

impl Constant {
    pub fn object(ty: TypeRef, handle: u64) -> Self {
        Constant::Object(ObjectConstant { ty, handle })
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => f.write_str("null"),
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Object(obj) => write!(f, "{}@{:x}", obj.ty, obj.handle),
        }
    }
}
