//! Dynamic value model.
//!
//! The engine walks [`Value`] trees instead of reflecting over native types.
//! A `&mut Value` is an addressable handle: functions mutate the slot in place.
//!
//! - [`Type`] / [`StructType`] / [`FieldDef`] - type descriptors
//! - [`Value`] - the value tree itself
//! - [`StructValue`] / [`MapValue`] - composite payloads
//! - [`primitive_value`] - parse a tag parameter into a typed value
//! - [`Value::from_json`] / [`Value::to_json`] - JSON bridge

mod convert;
mod json;
mod types;

pub use convert::primitive_value;
pub use types::{FieldDef, FloatWidth, IntWidth, StructType, Type};

use chrono::{DateTime, Utc};
use indexmap::{Equivalent, IndexMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// =============================================================================
// Kind
// =============================================================================

/// Flat discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Time,
    Struct,
    Slice,
    Array,
    Map,
    Pointer,
    Interface,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Time => "time",
            Kind::Struct => "struct",
            Kind::Slice => "slice",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Pointer => "ptr",
            Kind::Interface => "interface",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed, owned value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64, IntWidth),
    Uint(u64, IntWidth),
    Float(f64, FloatWidth),
    String(String),
    Time(DateTime<Utc>),
    Struct(StructValue),
    /// `items: None` is a nil slice.
    Slice { elem: Type, items: Option<Vec<Value>> },
    Array { elem: Type, items: Vec<Value> },
    Map(MapValue),
    /// `target: None` is a nil pointer.
    Pointer { elem: Type, target: Option<Box<Value>> },
    /// `None` is a nil interface.
    Interface(Option<Box<Value>>),
}

impl Value {
    // -------------------------------------------------------------------------
    // Constructors
    // -------------------------------------------------------------------------

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn int(i: i64) -> Self {
        Value::Int(i, IntWidth::Size)
    }

    pub fn uint(u: u64) -> Self {
        Value::Uint(u, IntWidth::Size)
    }

    pub fn float(f: f64) -> Self {
        Value::Float(f, FloatWidth::F64)
    }

    /// A non-nil pointer to `v`.
    pub fn pointer_to(v: Value) -> Self {
        Value::Pointer {
            elem: v.ty(),
            target: Some(Box::new(v)),
        }
    }

    pub fn nil_pointer(elem: Type) -> Self {
        Value::Pointer { elem, target: None }
    }

    /// An interface holding `v`.
    pub fn interface(v: Value) -> Self {
        Value::Interface(Some(Box::new(v)))
    }

    pub fn nil_interface() -> Self {
        Value::Interface(None)
    }

    pub fn slice(elem: Type, items: Vec<Value>) -> Self {
        Value::Slice {
            elem,
            items: Some(items),
        }
    }

    pub fn nil_slice(elem: Type) -> Self {
        Value::Slice { elem, items: None }
    }

    pub fn array(elem: Type, items: Vec<Value>) -> Self {
        Value::Array { elem, items }
    }

    pub fn map(key: Type, elem: Type, entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut map = MapValue::new(key, elem);
        for (k, v) in entries {
            map.insert(k, v);
        }
        Value::Map(map)
    }

    pub fn nil_map(key: Type, elem: Type) -> Self {
        Value::Map(MapValue::nil(key, elem))
    }

    /// The zero value of `ty`.
    pub fn zero(ty: &Type) -> Self {
        match ty {
            Type::Bool => Value::Bool(false),
            Type::Int(w) => Value::Int(0, *w),
            Type::Uint(w) => Value::Uint(0, *w),
            Type::Float(w) => Value::Float(0.0, *w),
            Type::String => Value::String(String::new()),
            Type::Time => Value::Time(DateTime::<Utc>::default()),
            Type::Struct(st) => Value::Struct(StructValue::new(Arc::clone(st))),
            Type::Slice(elem) => Value::nil_slice((**elem).clone()),
            Type::Array(elem, len) => Value::Array {
                elem: (**elem).clone(),
                items: (0..*len).map(|_| Value::zero(elem)).collect(),
            },
            Type::Map(key, elem) => Value::nil_map((**key).clone(), (**elem).clone()),
            Type::Pointer(elem) => Value::nil_pointer((**elem).clone()),
            Type::Interface => Value::Interface(None),
        }
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Int(..) => Kind::Int,
            Value::Uint(..) => Kind::Uint,
            Value::Float(..) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Time(_) => Kind::Time,
            Value::Struct(_) => Kind::Struct,
            Value::Slice { .. } => Kind::Slice,
            Value::Array { .. } => Kind::Array,
            Value::Map(_) => Kind::Map,
            Value::Pointer { .. } => Kind::Pointer,
            Value::Interface(_) => Kind::Interface,
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Bool,
            Value::Int(_, w) => Type::Int(*w),
            Value::Uint(_, w) => Type::Uint(*w),
            Value::Float(_, w) => Type::Float(*w),
            Value::String(_) => Type::String,
            Value::Time(_) => Type::Time,
            Value::Struct(sv) => Type::Struct(Arc::clone(sv.ty())),
            Value::Slice { elem, .. } => Type::slice_of(elem.clone()),
            Value::Array { elem, items } => Type::array_of(elem.clone(), items.len()),
            Value::Map(map) => Type::map_of(map.key_type().clone(), map.elem_type().clone()),
            Value::Pointer { elem, .. } => Type::pointer_to(elem.clone()),
            Value::Interface(_) => Type::Interface,
        }
    }

    /// True when the value equals the zero value of its type.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Bool(b) => !b,
            Value::Int(i, _) => *i == 0,
            Value::Uint(u, _) => *u == 0,
            Value::Float(f, _) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Time(t) => *t == DateTime::<Utc>::default(),
            Value::Struct(sv) => sv.values().iter().all(Value::is_zero),
            Value::Slice { items, .. } => items.is_none(),
            Value::Array { items, .. } => items.iter().all(Value::is_zero),
            Value::Map(map) => map.is_nil(),
            Value::Pointer { target, .. } => target.is_none(),
            Value::Interface(inner) => inner.is_none(),
        }
    }

    /// Whether the value is "set": non-nil for nilable kinds, non-zero otherwise.
    pub fn has_value(&self) -> bool {
        match self {
            Value::Slice { items, .. } => items.is_some(),
            Value::Map(map) => !map.is_nil(),
            Value::Pointer { target, .. } => target.is_some(),
            Value::Interface(inner) => inner.is_some(),
            other => !other.is_zero(),
        }
    }

    /// Follow non-nil pointers and interfaces to the concrete value.
    pub fn deref(&self) -> &Value {
        match self {
            Value::Pointer {
                target: Some(inner),
                ..
            }
            | Value::Interface(Some(inner)) => inner.deref(),
            other => other,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(sv) => Some(sv),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructValue> {
        match self {
            Value::Struct(sv) => Some(sv),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Elements of a slice or array; empty for a nil slice.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Slice { items, .. } => Some(items.as_deref().unwrap_or(&[])),
            Value::Array { items, .. } => Some(items),
            _ => None,
        }
    }
}

impl From<StructValue> for Value {
    fn from(sv: StructValue) -> Self {
        Value::Struct(sv)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::int(i)
    }
}

// =============================================================================
// Struct values
// =============================================================================

/// Instance of a [`StructType`]; one value per declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    ty: Arc<StructType>,
    fields: Vec<Value>,
}

impl StructValue {
    /// The zero value of `ty`.
    pub fn new(ty: Arc<StructType>) -> Self {
        let fields = ty.fields().iter().map(|f| Value::zero(f.ty())).collect();
        Self { ty, fields }
    }

    /// Builder-style setter. Unknown field names are ignored.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Assign a field by name, returning false when no such field exists.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn ty(&self) -> &Arc<StructType> {
        &self.ty
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.ty.field_index(name).and_then(|i| self.fields.get(i))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        let idx = self.ty.field_index(name)?;
        self.fields.get_mut(idx)
    }

    pub fn field_at_mut(&mut self, idx: usize) -> Option<&mut Value> {
        self.fields.get_mut(idx)
    }

    pub fn values(&self) -> &[Value] {
        &self.fields
    }
}

// =============================================================================
// Map values
// =============================================================================

/// Map from comparable values to values.
///
/// Lookups, inserts and removals are hashed. Entries iterate in insertion
/// order until something is removed; removal may move the last entry into the
/// freed position. Callers must not rely on order, matching ordinary map
/// semantics.
#[derive(Debug, Clone)]
pub struct MapValue {
    key: Type,
    elem: Type,
    entries: Option<IndexMap<MapKey, Value>>,
}

impl MapValue {
    /// An empty, allocated map.
    pub fn new(key: Type, elem: Type) -> Self {
        Self {
            key,
            elem,
            entries: Some(IndexMap::new()),
        }
    }

    /// A nil map.
    pub fn nil(key: Type, elem: Type) -> Self {
        Self {
            key,
            elem,
            entries: None,
        }
    }

    pub fn key_type(&self) -> &Type {
        &self.key
    }

    pub fn elem_type(&self) -> &Type {
        &self.elem
    }

    pub fn is_nil(&self) -> bool {
        self.entries.is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, IndexMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.as_ref()?.get(&KeyRef(key))
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        self.entries.as_mut()?.get_mut(&KeyRef(key))
    }

    /// Insert or replace. Inserting into a nil map allocates it.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.entries
            .get_or_insert_with(IndexMap::new)
            .insert(MapKey(key), value)
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.entries.as_mut()?.swap_remove(&KeyRef(key))
    }

    /// Snapshot of the current keys.
    pub fn keys(&self) -> Vec<Value> {
        self.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries
            .iter()
            .flatten()
            .map(|(k, v)| (&k.0, v))
    }
}

impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.elem == other.elem
            && self.is_nil() == other.is_nil()
            && self.len() == other.len()
            && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

// -----------------------------------------------------------------------------
// Map keys
// -----------------------------------------------------------------------------

/// Owned map key. Floats hash and compare by value, with `0.0 == -0.0` and a
/// NaN equal to a NaN of the same bits, so equality stays reflexive.
#[derive(Debug, Clone)]
struct MapKey(Value);

/// Borrowed lookup key, hashing exactly like [`MapKey`].
struct KeyRef<'a>(&'a Value);

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_key(&self.0, state);
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        key_eq(&self.0, &other.0)
    }
}

impl Eq for MapKey {}

impl Hash for KeyRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_key(self.0, state);
    }
}

impl Equivalent<MapKey> for KeyRef<'_> {
    fn equivalent(&self, key: &MapKey) -> bool {
        key_eq(self.0, &key.0)
    }
}

fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

fn hash_key<H: Hasher>(v: &Value, state: &mut H) {
    v.kind().hash(state);
    match v {
        Value::Bool(b) => b.hash(state),
        Value::Int(i, w) => (i, w).hash(state),
        Value::Uint(u, w) => (u, w).hash(state),
        Value::Float(f, w) => (float_bits(*f), w).hash(state),
        Value::String(s) => s.hash(state),
        Value::Time(t) => t.hash(state),
        Value::Struct(sv) => {
            sv.ty().hash(state);
            for field in sv.values() {
                hash_key(field, state);
            }
        }
        Value::Array { items, .. } => {
            for item in items {
                hash_key(item, state);
            }
        }
        Value::Pointer { target, .. } => {
            if let Some(inner) = target {
                hash_key(inner, state);
            }
        }
        Value::Interface(inner) => {
            if let Some(inner) = inner {
                hash_key(inner, state);
            }
        }
        // Not comparable as map keys; the kind alone is a valid hash.
        Value::Slice { .. } | Value::Map(_) => {}
    }
}

fn key_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x, wx), Value::Float(y, wy)) => wx == wy && float_bits(*x) == float_bits(*y),
        (Value::Struct(x), Value::Struct(y)) => {
            x.ty() == y.ty()
                && x.values().len() == y.values().len()
                && x.values().iter().zip(y.values()).all(|(p, q)| key_eq(p, q))
        }
        (Value::Array { elem: ex, items: x }, Value::Array { elem: ey, items: y }) => {
            ex == ey && x.len() == y.len() && x.iter().zip(y).all(|(p, q)| key_eq(p, q))
        }
        (Value::Pointer { elem: ex, target: x }, Value::Pointer { elem: ey, target: y }) => {
            ex == ey
                && match (x, y) {
                    (Some(p), Some(q)) => key_eq(p, q),
                    (None, None) => true,
                    _ => false,
                }
        }
        (Value::Interface(x), Value::Interface(y)) => match (x, y) {
            (Some(p), Some(q)) => key_eq(p, q),
            (None, None) => true,
            _ => false,
        },
        _ => a == b,
    }
}
