//! Modifiers that work on fields of any kind.

use crate::error::{MoldError, MoldResult, ParseValueError};
use crate::transform::{Context, FieldLevel};
use crate::value::{primitive_value, MapValue, Type, Value};
use chrono::Utc;

/// Assign the parameter only when the field holds its zero value.
pub(super) fn default_value(ctx: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    if !fl.field().is_zero() {
        return Ok(());
    }
    set_value(ctx, fl)
}

/// Assign the parameter, parsed according to the field's type.
pub(super) fn set_value(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    let param = fl.param();
    assign(fl.field(), param)
}

/// Reset the field to the zero value of its type.
pub(super) fn empty(_: &Context, fl: &mut FieldLevel<'_>) -> MoldResult<()> {
    let field = fl.field();
    *field = Value::zero(&field.ty());
    Ok(())
}

fn assign(field: &mut Value, param: &str) -> MoldResult<()> {
    match field {
        Value::Bool(_) | Value::Int(..) | Value::Uint(..) | Value::Float(..) | Value::String(_) => {
            *field = primitive_value(&field.ty(), param)?;
        }
        Value::Time(_) if param.is_empty() || param.eq_ignore_ascii_case("utc") => {
            *field = Value::Time(Utc::now());
        }
        Value::Time(_) => {
            *field = primitive_value(&Type::Time, param)?;
        }
        Value::Slice { items, .. } => {
            let cap = capacity(param)?;
            *items = Some(Vec::with_capacity(cap));
        }
        Value::Map(map) => {
            capacity(param)?;
            *map = MapValue::new(map.key_type().clone(), map.elem_type().clone());
        }
        Value::Pointer { elem, target } => {
            let mut pointee = Value::zero(elem);
            if !param.is_empty() {
                assign(&mut pointee, param)?;
            }
            *target = Some(Box::new(pointee));
        }
        // Structs, arrays and empty interfaces have no textual form.
        Value::Struct(_) | Value::Array { .. } | Value::Interface(_) => {}
    }
    Ok(())
}

/// Optional size hint for new slices and maps.
fn capacity(param: &str) -> MoldResult<usize> {
    if param.is_empty() {
        return Ok(0);
    }
    param.parse::<usize>().map_err(|e| {
        MoldError::ParseValue(ParseValueError::Invalid {
            ty: Type::int(),
            cause: e.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::super::new;
    use super::*;
    use crate::value::{FieldDef, FloatWidth, IntWidth, StructType, StructValue};
    use chrono::{DateTime, TimeZone};

    fn apply(tag: &str, mut v: Value) -> Value {
        new().transform_field(&Context::background(), &mut v, tag).unwrap();
        v
    }

    #[test]
    fn test_default_on_zero_scalars() {
        assert_eq!(apply("default=test", Value::string("")), Value::string("test"));
        assert_eq!(apply("default=3", Value::int(0)), Value::int(3));
        assert_eq!(apply("default=4", Value::uint(0)), Value::uint(4));
        assert_eq!(
            apply("default=5", Value::Float(0.0, FloatWidth::F32)),
            Value::Float(5.0, FloatWidth::F32)
        );
        assert_eq!(apply("default=true", Value::Bool(false)), Value::Bool(true));
    }

    #[test]
    fn test_default_keeps_existing_value() {
        assert_eq!(apply("default=test", Value::string("kept")), Value::string("kept"));
        assert_eq!(apply("default=3", Value::int(7)), Value::int(7));
    }

    #[test]
    fn test_set_overwrites() {
        assert_eq!(apply("set=test", Value::string("old")), Value::string("test"));
        assert_eq!(
            apply("set=-8", Value::Int(1, IntWidth::W8)),
            Value::Int(-8, IntWidth::W8)
        );
    }

    #[test]
    fn test_set_reports_parse_errors() {
        let mut v = Value::Uint(0, IntWidth::W8);
        let err = new()
            .transform_field(&Context::background(), &mut v, "set=300")
            .unwrap_err();
        assert!(matches!(err, MoldError::ParseValue(ParseValueError::Invalid { .. })));
    }

    #[test]
    fn test_default_allocates_collections() {
        assert_eq!(
            apply("default", Value::nil_slice(Type::String)),
            Value::slice(Type::String, vec![])
        );
        assert_eq!(
            apply("default=4", Value::nil_map(Type::String, Type::int())),
            Value::map(Type::String, Type::int(), Vec::new())
        );
    }

    #[test]
    fn test_default_time() {
        let before = Utc::now();
        let v = apply("default=utc", Value::zero(&Type::Time));
        match v {
            Value::Time(t) => assert!(t >= before),
            other => panic!("expected time, got {:?}", other),
        }

        let v = apply("default=2020-01-02T03:04:05Z", Value::zero(&Type::Time));
        let expected: DateTime<Utc> = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(v, Value::Time(expected));
    }

    #[test]
    fn test_default_allocates_pointers() {
        assert_eq!(
            apply("default", Value::nil_pointer(Type::String)),
            Value::pointer_to(Value::string(""))
        );
        assert_eq!(
            apply("default=5", Value::nil_pointer(Type::int())),
            Value::pointer_to(Value::int(5))
        );
    }

    #[test]
    fn test_default_pointer_to_struct_is_walked() {
        let inner = StructType::new(
            "Inner",
            vec![FieldDef::new("Name", Type::String).tag("mod", "default=anon")],
        );
        let outer = StructType::new(
            "Outer",
            vec![FieldDef::new("Inner", Type::pointer_to(Type::Struct(inner.clone()))).tag("mod", "default")],
        );
        let mut v = Value::from(StructValue::new(outer));
        new().transform_struct(&Context::background(), &mut v).unwrap();

        let expected = Value::pointer_to(StructValue::new(inner).with("Name", "anon").into());
        assert_eq!(v.as_struct().unwrap().get("Inner"), Some(&expected));
    }

    #[test]
    fn test_empty_resets() {
        assert_eq!(apply("empty", Value::string("gone")), Value::string(""));
        assert_eq!(
            apply("empty", Value::slice(Type::int(), vec![Value::int(1)])),
            Value::nil_slice(Type::int())
        );
        assert_eq!(apply("empty", Value::Bool(true)), Value::Bool(false));
    }
}
