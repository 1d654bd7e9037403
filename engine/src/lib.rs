//! # Mold - tag-driven, in-place value transformation
//!
//! Mold normalizes and scrubs values in place. Struct fields carry tag strings
//! such as `trim,lcase` or `dive,keys,trim,endkeys,default=n/a`; the
//! transformer compiles them once, caches the result per struct type and runs
//! the named functions against every field, recursing through pointers,
//! interfaces, slices, arrays, maps and nested structs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Struct tags │────▶│ Tag compiler│────▶│   Shapes    │────▶│   Walker    │
//! │ "trim,lcase"│     │  (aliases)  │     │  (cached)   │     │ (in place)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                            ▲                                       │
//!                            │            ┌─────────────┐            │
//!                            └────────────│  Registry   │◀───────────┘
//!                                         │ fns, hooks, │
//!                                         │ interceptors│
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mold::{modifiers, Context, FieldDef, StructType, StructValue, Type, Value};
//!
//! let user = StructType::new(
//!     "User",
//!     vec![FieldDef::new("Email", Type::String).tag("mod", "trim,lcase")],
//! );
//! let mut v = Value::from(StructValue::new(user).with("Email", "  Joey@Example.COM "));
//!
//! let conform = modifiers::new();
//! conform.transform_struct(&Context::background(), &mut v)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`value`] - Dynamic values and type descriptors
//! - [`transform`] - Registry, tag compiler, walker and caches
//! - [`modifiers`] - Ready-made normalization functions (`mod` tag)
//! - [`scrubbers`] - Ready-made de-identification functions (`scrub` tag)
//! - [`schema`] - JSON schema documents declaring struct types
//! - [`config`] - Engine configuration from flags or environment
//! - [`logging`] - `tracing` subscriber setup for the binary

// Core modules
pub mod error;
pub mod value;

// Engine
pub mod transform;

// Function sets
pub mod modifiers;
pub mod scrubbers;

// Surfaces
pub mod config;
pub mod logging;
pub mod schema;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BoxError,
    ConfigError,
    InvalidTransformValue,
    JsonError,
    MoldError,
    MoldResult,
    ParseValueError,
    SchemaError,
};

// =============================================================================
// Re-exports - Values
// =============================================================================

pub use value::{
    primitive_value,
    FieldDef,
    FloatWidth,
    IntWidth,
    Kind,
    MapValue,
    StructType,
    StructValue,
    Type,
    Value,
};

// =============================================================================
// Re-exports - Engine
// =============================================================================

pub use transform::{
    Context,
    FieldLevel,
    InterceptorFn,
    StructLevel,
    StructLevelFn,
    Transform,
    TransformFn,
    Transformer,
};

// =============================================================================
// Re-exports - Schema & Config
// =============================================================================

pub use config::{EngineConfig, Preset};
pub use schema::{ResolvedSchema, Schema};
