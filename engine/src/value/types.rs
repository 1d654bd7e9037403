//! Type descriptors for dynamic values.
//!
//! A [`Type`] plays the role a runtime type does in a reflective language: it
//! is the key under which struct-level hooks and interceptors are registered,
//! and the thing the struct shape cache memoizes on.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// =============================================================================
// Widths
// =============================================================================

/// Width of an integer type. `Size` is the platform-sized `int`/`uint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    Size,
    W8,
    W16,
    W32,
    W64,
}

/// Width of a floating point type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

// =============================================================================
// Type
// =============================================================================

/// Static type of a [`crate::Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float(FloatWidth),
    String,
    /// Instant in time. Never walked as a struct.
    Time,
    Struct(Arc<StructType>),
    Slice(Box<Type>),
    Array(Box<Type>, usize),
    Map(Box<Type>, Box<Type>),
    Pointer(Box<Type>),
    /// Dynamically typed slot, may hold a value of any type or nothing.
    Interface,
}

impl Type {
    /// Shorthand for the platform-sized signed integer.
    pub fn int() -> Self {
        Type::Int(IntWidth::Size)
    }

    /// Shorthand for the platform-sized unsigned integer.
    pub fn uint() -> Self {
        Type::Uint(IntWidth::Size)
    }

    pub fn float64() -> Self {
        Type::Float(FloatWidth::F64)
    }

    pub fn slice_of(elem: Type) -> Self {
        Type::Slice(Box::new(elem))
    }

    pub fn array_of(elem: Type, len: usize) -> Self {
        Type::Array(Box::new(elem), len)
    }

    pub fn map_of(key: Type, elem: Type) -> Self {
        Type::Map(Box::new(key), Box::new(elem))
    }

    pub fn pointer_to(elem: Type) -> Self {
        Type::Pointer(Box::new(elem))
    }

    /// Returns the struct descriptor if this is a struct type.
    pub fn as_struct(&self) -> Option<&Arc<StructType>> {
        match self {
            Type::Struct(st) => Some(st),
            _ => None,
        }
    }
}

impl From<Arc<StructType>> for Type {
    fn from(st: Arc<StructType>) -> Self {
        Type::Struct(st)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int(w) => write!(f, "int{}", width_suffix(*w)),
            Type::Uint(w) => write!(f, "uint{}", width_suffix(*w)),
            Type::Float(FloatWidth::F32) => f.write_str("float32"),
            Type::Float(FloatWidth::F64) => f.write_str("float64"),
            Type::String => f.write_str("string"),
            Type::Time => f.write_str("time"),
            Type::Struct(st) => f.write_str(st.name()),
            Type::Slice(elem) => write!(f, "[]{}", elem),
            Type::Array(elem, len) => write!(f, "[{}]{}", len, elem),
            Type::Map(key, elem) => write!(f, "map[{}]{}", key, elem),
            Type::Pointer(elem) => write!(f, "*{}", elem),
            Type::Interface => f.write_str("interface {}"),
        }
    }
}

fn width_suffix(w: IntWidth) -> &'static str {
    match w {
        IntWidth::Size => "",
        IntWidth::W8 => "8",
        IntWidth::W16 => "16",
        IntWidth::W32 => "32",
        IntWidth::W64 => "64",
    }
}

// =============================================================================
// Struct types
// =============================================================================

/// Named struct type with an ordered field list.
///
/// A struct type is identified by its name and its layout (field names, types,
/// tags, embedding and visibility). Two descriptors built separately with the
/// same name and fields are the same type; same name with different fields
/// are distinct types for hooks, interceptors and the shape cache.
#[derive(Debug)]
pub struct StructType {
    name: String,
    fields: Vec<FieldDef>,
    /// Hash of `name` and `fields`, computed once.
    layout: u64,
}

impl StructType {
    /// Create a struct type from its fields, in declaration order.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Arc<Self> {
        let name = name.into();
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        fields.hash(&mut hasher);
        Arc::new(Self {
            name,
            fields,
            layout: hasher.finish(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Index of the field with the given name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.layout == other.layout && self.name == other.name && self.fields == other.fields)
    }
}

impl Eq for StructType {}

impl Hash for StructType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.layout.hash(state);
    }
}

/// One field of a [`StructType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
    name: String,
    ty: Type,
    tags: BTreeMap<String, String>,
    embedded: bool,
    exported: bool,
}

impl FieldDef {
    /// An exported, non-embedded field without tags.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            tags: BTreeMap::new(),
            embedded: false,
            exported: true,
        }
    }

    /// An embedded (anonymous) struct field, named after its type.
    pub fn embedded(st: &Arc<StructType>) -> Self {
        Self {
            embedded: true,
            ..Self::new(st.name(), Type::Struct(Arc::clone(st)))
        }
    }

    /// Attach a tag string under `key` (e.g. `mod` -> `trim,lcase`).
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Mark the field unexported. Unexported fields are never transformed
    /// unless they are embedded.
    pub fn unexported(mut self) -> Self {
        self.exported = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// The tag string registered under `key`, if any.
    pub fn lookup_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn is_exported(&self) -> bool {
        self.exported
    }
}
