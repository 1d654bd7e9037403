//! Parsing of tag parameters into typed primitive values.

use super::{FloatWidth, IntWidth, Type, Value};
use crate::error::ParseValueError;
use chrono::{DateTime, Utc};

/// Parse `param` into a value of type `ty`.
///
/// Only scalar types and time are supported; everything else is
/// [`ParseValueError::Unsupported`].
pub fn primitive_value(ty: &Type, param: &str) -> Result<Value, ParseValueError> {
    let failed = |cause: String| ParseValueError::Invalid {
        ty: ty.clone(),
        cause,
    };

    match ty {
        Type::String => Ok(Value::String(param.to_string())),
        Type::Bool => parse_bool(param).map(Value::Bool).ok_or_else(|| {
            failed(format!("strconv.ParseBool: parsing {:?}: invalid syntax", param))
        }),
        Type::Int(w) => {
            let parsed = match w {
                IntWidth::W8 => param.parse::<i8>().map(i64::from),
                IntWidth::W16 => param.parse::<i16>().map(i64::from),
                IntWidth::W32 => param.parse::<i32>().map(i64::from),
                IntWidth::Size | IntWidth::W64 => param.parse::<i64>(),
            };
            parsed
                .map(|i| Value::Int(i, *w))
                .map_err(|e| failed(e.to_string()))
        }
        Type::Uint(w) => {
            let parsed = match w {
                IntWidth::W8 => param.parse::<u8>().map(u64::from),
                IntWidth::W16 => param.parse::<u16>().map(u64::from),
                IntWidth::W32 => param.parse::<u32>().map(u64::from),
                IntWidth::Size | IntWidth::W64 => param.parse::<u64>(),
            };
            parsed
                .map(|u| Value::Uint(u, *w))
                .map_err(|e| failed(e.to_string()))
        }
        Type::Float(w) => {
            let parsed = match w {
                FloatWidth::F32 => param.parse::<f32>().map(f64::from),
                FloatWidth::F64 => param.parse::<f64>(),
            };
            parsed
                .map(|f| Value::Float(f, *w))
                .map_err(|e| failed(e.to_string()))
        }
        Type::Time => DateTime::parse_from_rfc3339(param)
            .map(|t| Value::Time(t.with_timezone(&Utc)))
            .map_err(|e| failed(e.to_string())),
        other => Err(ParseValueError::Unsupported { ty: other.clone() }),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
