//! Value walker: runs compiled chains against values.

use super::level::{follow, Hop, Route};
use super::tag::{CompiledTag, TagKind, IGNORE_TAG};
use super::{Context, FieldLevel, StructLevel, StructLevelFn, Transformer};
use crate::error::{MoldError, MoldResult};
use crate::value::{MapValue, StructType, Type, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// Interceptor redirections allowed while unwrapping a single value.
const MAX_INTERCEPTS: usize = 32;

/// Compiled view of a struct type: which fields to visit and with what chain.
pub(crate) struct StructShape {
    fields: Vec<ShapeField>,
    hook: Option<StructLevelFn>,
}

struct ShapeField {
    index: usize,
    /// `None` for untagged fields visited only to reach nested structs.
    chain: Option<CompiledTag>,
}

impl Transformer {
    // -------------------------------------------------------------------------
    // Shapes
    // -------------------------------------------------------------------------

    pub(crate) fn shape_for(&self, ty: &Arc<StructType>) -> MoldResult<Arc<StructShape>> {
        self.shapes.get_or_try_insert_with(ty, || self.extract_shape(ty))
    }

    fn extract_shape(&self, ty: &Arc<StructType>) -> MoldResult<StructShape> {
        let mut fields = Vec::new();

        for (index, def) in ty.fields().iter().enumerate() {
            if !def.is_exported() && !def.is_embedded() {
                continue;
            }

            let tag = def.lookup_tag(&self.tag_name).unwrap_or_default();
            if tag == IGNORE_TAG {
                continue;
            }

            let chain = if tag.is_empty() {
                if !self.may_hold_struct(def.ty()) {
                    continue;
                }
                None
            } else {
                Some(self.compile_tag(tag, def.name())?)
            };
            fields.push(ShapeField { index, chain });
        }

        let hook = self
            .struct_level_fns
            .get(&Type::Struct(Arc::clone(ty)))
            .cloned();

        debug!(
            struct_type = ty.name(),
            fields = fields.len(),
            hook = hook.is_some(),
            "compiled struct shape"
        );
        Ok(StructShape { fields, hook })
    }

    /// Whether an untagged field of type `ty` can unwrap to a struct.
    fn may_hold_struct(&self, ty: &Type) -> bool {
        matches!(ty, Type::Struct(_) | Type::Pointer(_) | Type::Interface) || self.interceptors.contains_key(ty)
    }

    // -------------------------------------------------------------------------
    // Unwrapping
    // -------------------------------------------------------------------------

    /// Route from `slot` through pointers, interfaces and interceptors to the
    /// concrete value. Stops at nil pointers and interfaces.
    pub(crate) fn extract(&self, slot: &mut Value) -> MoldResult<Route> {
        let mut route = Route::new();
        self.extract_into(slot, &mut route, 0)?;
        Ok(route)
    }

    fn extract_into(&self, current: &mut Value, route: &mut Route, intercepts: usize) -> MoldResult<()> {
        match current {
            Value::Pointer {
                target: Some(inner),
                ..
            }
            | Value::Interface(Some(inner)) => {
                route.push(Hop::Deref);
                self.extract_into(inner, route, intercepts)
            }
            Value::Pointer { .. } | Value::Interface(None) => Ok(()),
            other => {
                if self.interceptors.is_empty() {
                    return Ok(());
                }
                let ty = other.ty();
                let Some(func) = self.interceptors.get(&ty).cloned() else {
                    return Ok(());
                };
                if intercepts >= MAX_INTERCEPTS {
                    return Err(MoldError::InterceptorCycle {
                        ty,
                        limit: MAX_INTERCEPTS,
                    });
                }
                route.push(Hop::Intercept {
                    ty,
                    func: Arc::clone(&func),
                });
                self.extract_into(func(other), route, intercepts + 1)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Chains
    // -------------------------------------------------------------------------

    /// Run `chain` against the value in `orig`, then walk it if it turned out
    /// to be a struct.
    pub(crate) fn set_by_field(
        &self,
        ctx: &Context,
        orig: &mut Value,
        chain: Option<&CompiledTag>,
    ) -> MoldResult<()> {
        let route = self.extract(orig)?;
        let mut step = chain;

        while let Some(ct) = step {
            match &ct.kind {
                TagKind::EndKeys => return Ok(()),
                TagKind::Keys(_) => return Err(MoldError::InvalidDive),
                TagKind::Dive => {
                    let next = ct.next.as_deref();
                    return match follow(orig, &route) {
                        Value::Slice { items, .. } => {
                            self.set_by_iterable(ctx, items.iter_mut().flatten(), next)
                        }
                        Value::Array { items, .. } => self.set_by_iterable(ctx, items.iter_mut(), next),
                        Value::Map(map) => self.set_by_map(ctx, map, next),
                        _ => Err(MoldError::InvalidDive),
                    };
                }
                TagKind::Func { func, .. } => {
                    func(ctx, &mut FieldLevel::new(self, orig, &route, &ct.param))?;
                    step = ct.next.as_deref();
                }
            }
        }

        // A function may have allocated a nil pointer or set a struct into an
        // interface, so unwrap again before looking for a struct.
        let route = self.extract(orig)?;
        if matches!(follow(orig, &route), Value::Struct(_)) {
            self.set_by_struct(ctx, orig, &route)?;
        }
        Ok(())
    }

    fn set_by_iterable<'v>(
        &self,
        ctx: &Context,
        items: impl Iterator<Item = &'v mut Value>,
        chain: Option<&CompiledTag>,
    ) -> MoldResult<()> {
        for item in items {
            self.set_by_field(ctx, item, chain)?;
        }
        Ok(())
    }

    /// Dive into a map. Values are transformed on a copy and written back.
    /// With a `keys` step the entry is re-keyed; when two keys transform to
    /// the same key the one processed last wins. A failing entry is left as
    /// it was.
    fn set_by_map(&self, ctx: &Context, map: &mut MapValue, chain: Option<&CompiledTag>) -> MoldResult<()> {
        for key in map.keys() {
            let Some(value) = map.get(&key) else {
                continue;
            };
            let mut value = value.clone();

            match chain {
                Some(CompiledTag {
                    kind: TagKind::Keys(key_chain),
                    next,
                    ..
                }) => {
                    let mut new_key = key.clone();
                    self.set_by_field(ctx, &mut new_key, Some(&**key_chain))?;
                    if let Some(value_chain) = next.as_deref() {
                        self.set_by_field(ctx, &mut value, Some(value_chain))?;
                    }
                    if new_key != key {
                        map.remove(&key);
                    }
                    map.insert(new_key, value);
                }
                _ => {
                    self.set_by_field(ctx, &mut value, chain)?;
                    if let Some(slot) = map.get_mut(&key) {
                        *slot = value;
                    }
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Structs
    // -------------------------------------------------------------------------

    /// Walk the struct `route` leads to from `parent`: hook first, then every
    /// field of the shape in declaration order.
    pub(crate) fn set_by_struct(&self, ctx: &Context, parent: &mut Value, route: &[Hop]) -> MoldResult<()> {
        let ty = match follow(parent, route) {
            Value::Struct(sv) => Arc::clone(sv.ty()),
            _ => return Ok(()),
        };
        let shape = self.shape_for(&ty)?;

        if let Some(hook) = &shape.hook {
            trace!(struct_type = ty.name(), "running struct level hook");
            hook(ctx, &mut StructLevel::new(self, parent, route))?;
        }

        let Value::Struct(sv) = follow(parent, route) else {
            return Ok(());
        };
        if sv.ty() != &ty {
            return Ok(());
        }

        for field in &shape.fields {
            if let Some(slot) = sv.field_at_mut(field.index) {
                self.set_by_field(ctx, slot, field.chain.as_ref())?;
            }
        }
        Ok(())
    }
}
