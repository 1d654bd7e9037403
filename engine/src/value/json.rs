//! Conversion between [`Value`] trees and `serde_json` documents.

use super::{primitive_value, IntWidth, MapValue, StructValue, Type, Value};
use crate::error::JsonError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as Json};
use std::sync::Arc;

impl Value {
    /// Decode `json` as a value of type `ty`.
    ///
    /// `null` decodes to the nil value of nilable types and to the zero value
    /// otherwise. Struct fields missing from the object keep their zero value.
    pub fn from_json(ty: &Type, json: &Json) -> Result<Value, JsonError> {
        decode(ty, json, "$")
    }

    /// Encode the value as JSON. Unexported struct fields are omitted.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i, _) => Json::from(*i),
            Value::Uint(u, _) => Json::from(*u),
            Value::Float(f, _) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::Time(t) => Json::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Struct(sv) => {
                let mut obj = Map::new();
                for (def, v) in sv.ty().fields().iter().zip(sv.values()) {
                    if def.is_exported() {
                        obj.insert(def.name().to_string(), v.to_json());
                    }
                }
                Json::Object(obj)
            }
            Value::Slice { items: None, .. } => Json::Null,
            Value::Slice {
                items: Some(items), ..
            }
            | Value::Array { items, .. } => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) if map.is_nil() => Json::Null,
            Value::Map(map) => {
                let obj = map
                    .iter()
                    .map(|(k, v)| (key_string(k), v.to_json()))
                    .collect();
                Json::Object(obj)
            }
            Value::Pointer { target, .. } => target.as_ref().map_or(Json::Null, |v| v.to_json()),
            Value::Interface(inner) => inner.as_ref().map_or(Json::Null, |v| v.to_json()),
        }
    }
}

fn key_string(key: &Value) -> String {
    match key.to_json() {
        Json::String(s) => s,
        other => other.to_string(),
    }
}

fn decode(ty: &Type, json: &Json, path: &str) -> Result<Value, JsonError> {
    let mismatch = || JsonError::Mismatch {
        path: path.to_string(),
        expected: ty.clone(),
        found: json_kind(json),
    };

    if json.is_null() {
        return Ok(Value::zero(ty));
    }

    match ty {
        Type::Bool => json.as_bool().map(Value::Bool).ok_or_else(mismatch),
        Type::Int(w) => {
            let i = json.as_i64().ok_or_else(mismatch)?;
            check_int_range(i, *w, path, ty)?;
            Ok(Value::Int(i, *w))
        }
        Type::Uint(w) => {
            let u = json.as_u64().ok_or_else(mismatch)?;
            check_uint_range(u, *w, path, ty)?;
            Ok(Value::Uint(u, *w))
        }
        Type::Float(w) => json
            .as_f64()
            .map(|f| Value::Float(f, *w))
            .ok_or_else(mismatch),
        Type::String => json
            .as_str()
            .map(Value::string)
            .ok_or_else(mismatch),
        Type::Time => {
            let s = json.as_str().ok_or_else(mismatch)?;
            DateTime::parse_from_rfc3339(s)
                .map(|t| Value::Time(t.with_timezone(&Utc)))
                .map_err(|e| JsonError::Invalid {
                    path: path.to_string(),
                    message: e.to_string(),
                })
        }
        Type::Struct(st) => {
            let obj = json.as_object().ok_or_else(mismatch)?;
            let mut sv = StructValue::new(Arc::clone(st));
            for (idx, def) in st.fields().iter().enumerate() {
                let Some(field_json) = obj.get(def.name()) else {
                    continue;
                };
                let decoded = decode(def.ty(), field_json, &format!("{}.{}", path, def.name()))?;
                if let Some(slot) = sv.field_at_mut(idx) {
                    *slot = decoded;
                }
            }
            Ok(Value::Struct(sv))
        }
        Type::Slice(elem) => {
            let arr = json.as_array().ok_or_else(mismatch)?;
            let items = decode_items(elem, arr, path)?;
            Ok(Value::slice((**elem).clone(), items))
        }
        Type::Array(elem, len) => {
            let arr = json.as_array().ok_or_else(mismatch)?;
            if arr.len() != *len {
                return Err(JsonError::Invalid {
                    path: path.to_string(),
                    message: format!("expected {} elements, found {}", len, arr.len()),
                });
            }
            let items = decode_items(elem, arr, path)?;
            Ok(Value::array((**elem).clone(), items))
        }
        Type::Map(key, elem) => {
            let obj = json.as_object().ok_or_else(mismatch)?;
            let mut map = MapValue::new((**key).clone(), (**elem).clone());
            for (k, v) in obj {
                let entry_path = format!("{}[{:?}]", path, k);
                let key_value = primitive_value(key, k).map_err(|e| JsonError::Invalid {
                    path: entry_path.clone(),
                    message: e.to_string(),
                })?;
                map.insert(key_value, decode(elem, v, &entry_path)?);
            }
            Ok(Value::Map(map))
        }
        Type::Pointer(elem) => Ok(Value::Pointer {
            elem: (**elem).clone(),
            target: Some(Box::new(decode(elem, json, path)?)),
        }),
        Type::Interface => Ok(infer_slot(json)),
    }
}

fn decode_items(elem: &Type, arr: &[Json], path: &str) -> Result<Vec<Value>, JsonError> {
    arr.iter()
        .enumerate()
        .map(|(i, item)| decode(elem, item, &format!("{}[{}]", path, i)))
        .collect()
}

/// Untyped decode for interface slots.
fn infer_slot(json: &Json) -> Value {
    match json {
        Json::Null => Value::nil_interface(),
        other => Value::interface(infer(other)),
    }
}

fn infer(json: &Json) -> Value {
    match json {
        Json::Null => Value::nil_interface(),
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::int(i),
            None => Value::float(n.as_f64().unwrap_or_default()),
        },
        Json::String(s) => Value::string(s.as_str()),
        Json::Array(arr) => Value::slice(Type::Interface, arr.iter().map(infer_slot).collect()),
        Json::Object(obj) => Value::map(
            Type::String,
            Type::Interface,
            obj.iter()
                .map(|(k, v)| (Value::string(k.as_str()), infer_slot(v))),
        ),
    }
}

fn check_int_range(i: i64, w: IntWidth, path: &str, ty: &Type) -> Result<(), JsonError> {
    let fits = match w {
        IntWidth::W8 => i8::try_from(i).is_ok(),
        IntWidth::W16 => i16::try_from(i).is_ok(),
        IntWidth::W32 => i32::try_from(i).is_ok(),
        IntWidth::Size | IntWidth::W64 => true,
    };
    out_of_range(fits, i, path, ty)
}

fn check_uint_range(u: u64, w: IntWidth, path: &str, ty: &Type) -> Result<(), JsonError> {
    let fits = match w {
        IntWidth::W8 => u8::try_from(u).is_ok(),
        IntWidth::W16 => u16::try_from(u).is_ok(),
        IntWidth::W32 => u32::try_from(u).is_ok(),
        IntWidth::Size | IntWidth::W64 => true,
    };
    out_of_range(fits, u, path, ty)
}

fn out_of_range(fits: bool, n: impl std::fmt::Display, path: &str, ty: &Type) -> Result<(), JsonError> {
    if fits {
        Ok(())
    } else {
        Err(JsonError::Invalid {
            path: path.to_string(),
            message: format!("{} overflows {}", n, ty),
        })
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FieldDef, StructType};
    use serde_json::json;

    fn user_type() -> Arc<StructType> {
        StructType::new(
            "User",
            vec![
                FieldDef::new("Name", Type::String),
                FieldDef::new("Age", Type::Uint(IntWidth::W8)),
                FieldDef::new("Nick", Type::pointer_to(Type::String)),
                FieldDef::new("Tags", Type::map_of(Type::int(), Type::String)),
                FieldDef::new("secret", Type::String).unexported(),
            ],
        )
    }

    #[test]
    fn test_decode_struct_with_missing_fields() {
        let ty = Type::Struct(user_type());
        let v = Value::from_json(&ty, &json!({"Name": " joe ", "Tags": {"1": "a"}})).unwrap();
        let sv = v.as_struct().unwrap();
        assert_eq!(sv.get("Name"), Some(&Value::string(" joe ")));
        assert_eq!(sv.get("Age"), Some(&Value::Uint(0, IntWidth::W8)));
        assert_eq!(sv.get("Nick"), Some(&Value::nil_pointer(Type::String)));
        let tags = sv.get("Tags").and_then(Value::as_map).unwrap();
        assert_eq!(tags.get(&Value::int(1)), Some(&Value::string("a")));
    }

    #[test]
    fn test_mismatch_reports_path() {
        let ty = Type::Struct(user_type());
        let err = Value::from_json(&ty, &json!({"Age": "old"})).unwrap_err();
        assert_eq!(err.to_string(), "$.Age: expected uint8, found string");

        let err = Value::from_json(&ty, &json!({"Age": 300})).unwrap_err();
        assert_eq!(err.to_string(), "$.Age: 300 overflows uint8");
    }

    #[test]
    fn test_encode_skips_unexported() {
        let ty = Type::Struct(user_type());
        let v = Value::from_json(&ty, &json!({"Name": "joe", "Nick": "j"})).unwrap();
        let out = v.to_json();
        assert_eq!(out["Name"], json!("joe"));
        assert_eq!(out["Nick"], json!("j"));
        assert_eq!(out["Tags"], Json::Null);
        assert!(out.get("secret").is_none());
    }

    #[test]
    fn test_interface_infers_shape() {
        let v = Value::from_json(&Type::Interface, &json!([1, "a"])).unwrap();
        assert_eq!(v.to_json(), json!([1, "a"]));
    }
}
