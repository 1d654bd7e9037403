//! Transformation engine.
//!
//! This module handles tag-driven, in-place transformation:
//! - Registry: named functions, aliases, struct-level hooks, interceptors
//! - Tag compiler: tag strings to compiled chains
//! - Walker: runs chains against values, recursing into structs and containers
//! - Caches: compiled chains by tag string, struct shapes by type
//!
//! ## Example
//!
//! ```rust,ignore
//! use mold::{Context, Transformer, Value};
//!
//! let mut t = Transformer::new();
//! t.register("trim", |_, fl| {
//!     if let Some(s) = fl.field().as_str() {
//!         let trimmed = s.trim().to_string();
//!         fl.set(Value::String(trimmed));
//!     }
//!     Ok(())
//! });
//!
//! let mut v = Value::string("  joeybloggs  ");
//! t.transform_field(&Context::background(), &mut v, "trim")?;
//! assert_eq!(v.as_str(), Some("joeybloggs"));
//! ```

mod cache;
mod context;
mod level;
mod registry;
mod tag;
mod walker;

pub use context::Context;
pub use level::{FieldLevel, StructLevel};
pub use registry::{RESTRICTED_TAGS, RESTRICTED_TAG_CHARS};

use crate::error::{InvalidTransformValue, MoldError, MoldResult};
use crate::value::{StructType, Type, Value};
use cache::SnapshotCache;
use level::{follow, Hop, Route};
use std::collections::HashMap;
use std::sync::Arc;
use tag::{CompiledTag, IGNORE_TAG};
use walker::StructShape;

/// Transformation function: mutate `fl.field()` in place.
pub type TransformFn = Arc<dyn Fn(&Context, &mut FieldLevel<'_>) -> MoldResult<()> + Send + Sync>;

/// Hook run against a whole struct before its fields.
pub type StructLevelFn = Arc<dyn Fn(&Context, &mut StructLevel<'_>) -> MoldResult<()> + Send + Sync>;

/// Redirects a wrapper value to the inner value functions should act on.
pub type InterceptorFn = Arc<dyn Fn(&mut Value) -> &mut Value + Send + Sync>;

/// The subset of the engine handed to functions for recursive calls.
pub trait Transform {
    /// Transform a struct. See [`Transformer::transform_struct`].
    fn transform_struct(&self, ctx: &Context, v: &mut Value) -> MoldResult<()>;

    /// Run `tags` against a single value. See [`Transformer::transform_field`].
    fn transform_field(&self, ctx: &Context, v: &mut Value, tags: &str) -> MoldResult<()>;
}

/// Tag-driven transformer.
///
/// Populate the registries through `&mut self`, then share it (`&` or `Arc`)
/// across threads; registration is impossible once it is shared.
pub struct Transformer {
    tag_name: String,
    aliases: HashMap<String, String>,
    transformations: HashMap<String, TransformFn>,
    struct_level_fns: HashMap<Type, StructLevelFn>,
    interceptors: HashMap<Type, InterceptorFn>,
    shapes: SnapshotCache<Arc<StructType>, StructShape>,
    tags: SnapshotCache<String, CompiledTag>,
}

pub(crate) const DEFAULT_TAG_NAME: &str = "mold";

impl Transformer {
    /// A transformer reading the `mold` tag, with empty registries.
    pub fn new() -> Self {
        Self {
            tag_name: DEFAULT_TAG_NAME.to_string(),
            aliases: HashMap::new(),
            transformations: HashMap::new(),
            struct_level_fns: HashMap::new(),
            interceptors: HashMap::new(),
            shapes: SnapshotCache::new(),
            tags: SnapshotCache::new(),
        }
    }

    pub fn with_tag_name(tag_name: impl Into<String>) -> Self {
        let mut t = Self::new();
        t.set_tag_name(tag_name);
        t
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// Change the struct tag key that is read. Clears compiled shapes.
    pub fn set_tag_name(&mut self, tag_name: impl Into<String>) {
        self.tag_name = tag_name.into();
        self.clear_caches();
    }

    /// Apply the tags of every field of a struct, recursively.
    ///
    /// `v` is either the struct itself, a non-nil pointer to it, or an
    /// interface holding a non-nil pointer to it. A struct-level hook
    /// registered for the type runs before any field. The first error aborts
    /// the walk; fields already transformed stay transformed.
    pub fn transform_struct(&self, ctx: &Context, v: &mut Value) -> MoldResult<()> {
        const ENTRY: &str = "Struct";

        let mut route = argument_route(v, ENTRY)?;
        match follow(v, &route) {
            Value::Pointer { target: Some(_), .. } => route.push(Hop::Deref),
            Value::Pointer { elem, target: None } => {
                return Err(InvalidTransformValue {
                    entry: ENTRY,
                    ty: Some(Type::pointer_to(elem.clone())),
                }
                .into())
            }
            _ => {}
        }

        match follow(v, &route) {
            Value::Struct(_) => self.set_by_struct(ctx, v, &route),
            other => Err(MoldError::InvalidTransformation {
                ty: Type::pointer_to(other.ty()),
            }),
        }
    }

    /// Run the tag string `tags` against a single value.
    ///
    /// An empty tag or `-` is a no-op. Compiled chains are cached by tag string.
    pub fn transform_field(&self, ctx: &Context, v: &mut Value, tags: &str) -> MoldResult<()> {
        if tags.is_empty() || tags == IGNORE_TAG {
            return Ok(());
        }

        let route = argument_route(v, "Field")?;
        let chain = self.tags.get_or_try_insert_with(tags, || {
            tracing::debug!(tags, "compiling tag");
            self.compile_tag(tags, "")
        })?;
        self.set_by_field(ctx, follow(v, &route), Some(&*chain))
    }

    pub(crate) fn clear_caches(&self) {
        self.shapes.clear();
        self.tags.clear();
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Transformer {
    fn transform_struct(&self, ctx: &Context, v: &mut Value) -> MoldResult<()> {
        Transformer::transform_struct(self, ctx, v)
    }

    fn transform_field(&self, ctx: &Context, v: &mut Value, tags: &str) -> MoldResult<()> {
        Transformer::transform_field(self, ctx, v, tags)
    }
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("tag_name", &self.tag_name)
            .field("transformations", &self.registered_tags())
            .field("aliases", &self.registered_aliases())
            .field("cached_shapes", &self.shapes.len())
            .field("cached_tags", &self.tags.len())
            .finish()
    }
}

/// Route from an entry point argument to its target.
///
/// A plain slot is its own target. An interface slot is a dynamically typed
/// argument and must hold a non-nil pointer; a nil pointer or a non-pointer
/// inside it is reported with its type.
fn argument_route(v: &Value, entry: &'static str) -> MoldResult<Route> {
    match v {
        Value::Interface(None) => Err(InvalidTransformValue { entry, ty: None }.into()),
        Value::Interface(Some(inner)) => match inner.as_ref() {
            Value::Pointer {
                target: Some(_), ..
            } => Ok(vec![Hop::Deref, Hop::Deref]),
            other => Err(InvalidTransformValue {
                entry,
                ty: Some(other.ty()),
            }
            .into()),
        },
        _ => Ok(Route::new()),
    }
}
