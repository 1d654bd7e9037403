//! Accessors handed to transformation functions and struct-level hooks.
//!
//! A function never receives the field handle directly. It receives the slot
//! the walker started from plus the [`Route`] that unwraps it, so both the
//! parent slot and the unwrapped field can be lent out without aliasing.

use super::{InterceptorFn, Transform, Transformer};
use crate::value::{Type, Value};

// =============================================================================
// Routes
// =============================================================================

/// One unwrap step from a slot towards its concrete value.
#[derive(Clone)]
pub(crate) enum Hop {
    /// Into a non-nil pointer or interface.
    Deref,
    /// Through a registered interceptor for `ty`.
    Intercept { ty: Type, func: InterceptorFn },
}

impl std::fmt::Debug for Hop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hop::Deref => f.write_str("Deref"),
            Hop::Intercept { ty, .. } => write!(f, "Intercept({})", ty),
        }
    }
}

pub(crate) type Route = Vec<Hop>;

/// Re-derive the handle a route leads to.
///
/// Stops early when the tree no longer matches the route, e.g. after a
/// function replaced a pointer with nil.
pub(crate) fn follow<'v>(current: &'v mut Value, route: &[Hop]) -> &'v mut Value {
    let Some((hop, rest)) = route.split_first() else {
        return current;
    };
    match hop {
        Hop::Deref => match current {
            Value::Pointer {
                target: Some(inner),
                ..
            }
            | Value::Interface(Some(inner)) => follow(inner, rest),
            other => other,
        },
        Hop::Intercept { ty, func } => {
            if current.ty() != *ty {
                return current;
            }
            follow(func(current), rest)
        }
    }
}

// =============================================================================
// Field level
// =============================================================================

/// What a transformation function sees of the field it runs on.
pub struct FieldLevel<'a> {
    transformer: &'a Transformer,
    parent: &'a mut Value,
    route: &'a [Hop],
    param: &'a str,
}

impl<'a> FieldLevel<'a> {
    pub(crate) fn new(
        transformer: &'a Transformer,
        parent: &'a mut Value,
        route: &'a [Hop],
        param: &'a str,
    ) -> Self {
        Self {
            transformer,
            parent,
            route,
            param,
        }
    }

    /// The transformer running this chain, for recursive calls.
    pub fn transformer(&self) -> &'a dyn Transform {
        self.transformer
    }

    /// The slot the chain was started on, before unwrapping.
    pub fn parent(&mut self) -> &mut Value {
        self.parent
    }

    /// The unwrapped field. Nil pointers and interfaces are returned as-is so
    /// functions can allocate them.
    pub fn field(&mut self) -> &mut Value {
        follow(self.parent, self.route)
    }

    /// The parameter after `=` in the tag step, or `""`.
    pub fn param(&self) -> &'a str {
        self.param
    }

    /// Assign `value` to the field. An interface field takes the value boxed.
    pub fn set(&mut self, value: Value) {
        match self.field() {
            Value::Interface(slot) if !matches!(value, Value::Interface(_)) => {
                *slot = Some(Box::new(value));
            }
            field => *field = value,
        }
    }
}

// =============================================================================
// Struct level
// =============================================================================

/// What a struct-level hook sees of the struct it runs on.
pub struct StructLevel<'a> {
    transformer: &'a Transformer,
    parent: &'a mut Value,
    route: &'a [Hop],
}

impl<'a> StructLevel<'a> {
    pub(crate) fn new(transformer: &'a Transformer, parent: &'a mut Value, route: &'a [Hop]) -> Self {
        Self {
            transformer,
            parent,
            route,
        }
    }

    pub fn transformer(&self) -> &'a dyn Transform {
        self.transformer
    }

    pub fn parent(&mut self) -> &mut Value {
        self.parent
    }

    /// The struct being transformed.
    pub fn struct_value(&mut self) -> &mut Value {
        follow(self.parent, self.route)
    }
}
