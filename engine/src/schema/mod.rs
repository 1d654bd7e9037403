//! Schema documents
//!
//! A schema declares struct types and their tags as JSON, so that tagged
//! shapes can be described outside of code:
//!
//! ```json
//! {
//!   "root": "User",
//!   "types": {
//!     "Address": { "fields": [ { "name": "Name", "type": "string", "tags": { "mod": "trim" } } ] },
//!     "User": {
//!       "fields": [
//!         { "name": "Email", "type": "string", "tags": { "mod": "trim,lcase", "scrub": "emails" } },
//!         { "name": "Addresses", "type": "[]Address" },
//!         { "name": "Misc", "type": "map[string]string", "tags": { "mod": "dive,keys,trim,endkeys,trim" } }
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! Type expressions are `string`, `bool`, `int`, `int8`..`int64`, `uint`,
//! `uint8`..`uint64`, `byte`, `float32`, `float64`, `time`, `interface`,
//! `*T`, `[]T`, `[N]T`, `map[K]V`, or the name of a type in `types`.
//! Struct types may not contain themselves, not even through a pointer.

use crate::error::{JsonError, SchemaError, SchemaResult};
use crate::value::{FieldDef, FloatWidth, IntWidth, StructType, Type, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// A schema document as written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Type that input documents decode as.
    pub root: String,

    #[serde(default)]
    pub types: BTreeMap<String, TypeDef>,
}

/// Declaration of one struct type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDef {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// Declaration of one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name. Embedded fields are named after their type and may omit it.
    #[serde(default)]
    pub name: String,

    /// Type expression.
    #[serde(rename = "type")]
    pub ty: String,

    /// Tag strings by tag key, e.g. `{"mod": "trim"}`.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub embedded: bool,

    #[serde(default = "default_exported")]
    pub exported: bool,
}

fn default_exported() -> bool {
    true
}

impl Schema {
    /// Parse a schema from a JSON string.
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a schema file.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the struct types the document declares.
    pub fn resolve(&self) -> SchemaResult<ResolvedSchema> {
        let mut resolver = Resolver {
            schema: self,
            built: HashMap::new(),
            in_progress: Vec::new(),
        };

        if !self.types.contains_key(&self.root) {
            return Err(SchemaError::UnknownType {
                name: self.root.clone(),
                owner: "root".to_string(),
            });
        }
        let root = resolver.struct_type(&self.root)?;
        for name in self.types.keys() {
            resolver.struct_type(name)?;
        }

        Ok(ResolvedSchema {
            root,
            types: resolver.built.into_iter().collect(),
        })
    }
}

// =============================================================================
// Resolution
// =============================================================================

struct Resolver<'s> {
    schema: &'s Schema,
    built: HashMap<String, Arc<StructType>>,
    /// Types currently being built, innermost last.
    in_progress: Vec<String>,
}

impl Resolver<'_> {
    fn struct_type(&mut self, name: &str) -> SchemaResult<Arc<StructType>> {
        if let Some(st) = self.built.get(name) {
            return Ok(Arc::clone(st));
        }
        if self.in_progress.iter().any(|n| n == name) {
            return Err(SchemaError::RecursiveType(name.to_string()));
        }
        let schema = self.schema;
        let Some(def) = schema.types.get(name) else {
            return Err(SchemaError::UnknownType {
                name: name.to_string(),
                owner: self.in_progress.last().cloned().unwrap_or_default(),
            });
        };

        self.in_progress.push(name.to_string());
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(def.fields.len());

        for spec in &def.fields {
            let ty = self.parse(&spec.ty)?;
            let mut field = if spec.embedded {
                match &ty {
                    Type::Struct(st) => FieldDef::embedded(st),
                    _ => return Err(SchemaError::MalformedType(spec.ty.clone())),
                }
            } else {
                FieldDef::new(spec.name.clone(), ty)
            };
            for (key, tag) in &spec.tags {
                field = field.tag(key.clone(), tag.clone());
            }
            if !spec.exported {
                field = field.unexported();
            }

            if !seen.insert(field.name().to_string()) {
                return Err(SchemaError::DuplicateField {
                    owner: name.to_string(),
                    field: field.name().to_string(),
                });
            }
            fields.push(field);
        }
        self.in_progress.pop();

        let st = StructType::new(name, fields);
        self.built.insert(name.to_string(), Arc::clone(&st));
        Ok(st)
    }

    fn parse(&mut self, expr: &str) -> SchemaResult<Type> {
        let expr = expr.trim();
        let malformed = || SchemaError::MalformedType(expr.to_string());

        if let Some(elem) = expr.strip_prefix('*') {
            return Ok(Type::pointer_to(self.parse(elem)?));
        }
        if let Some(elem) = expr.strip_prefix("[]") {
            return Ok(Type::slice_of(self.parse(elem)?));
        }
        if let Some(rest) = expr.strip_prefix('[') {
            let (len, elem) = rest.split_once(']').ok_or_else(malformed)?;
            let len = len.trim().parse::<usize>().map_err(|_| malformed())?;
            return Ok(Type::array_of(self.parse(elem)?, len));
        }
        if let Some(rest) = expr.strip_prefix("map[") {
            let close = matching_bracket(rest).ok_or_else(malformed)?;
            let key = self.parse(&rest[..close])?;
            let elem = self.parse(&rest[close + 1..])?;
            return Ok(Type::map_of(key, elem));
        }

        let ty = match expr {
            "" => return Err(malformed()),
            "bool" => Type::Bool,
            "string" => Type::String,
            "int" => Type::Int(IntWidth::Size),
            "int8" => Type::Int(IntWidth::W8),
            "int16" => Type::Int(IntWidth::W16),
            "int32" => Type::Int(IntWidth::W32),
            "int64" => Type::Int(IntWidth::W64),
            "uint" => Type::Uint(IntWidth::Size),
            "uint8" | "byte" => Type::Uint(IntWidth::W8),
            "uint16" => Type::Uint(IntWidth::W16),
            "uint32" => Type::Uint(IntWidth::W32),
            "uint64" => Type::Uint(IntWidth::W64),
            "float32" => Type::Float(FloatWidth::F32),
            "float64" => Type::Float(FloatWidth::F64),
            "time" => Type::Time,
            "interface" | "interface {}" | "any" => Type::Interface,
            name => Type::Struct(self.struct_type(name)?),
        };
        Ok(ty)
    }
}

/// Index of the `]` closing a `map[` whose `[` was already consumed.
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' if depth == 0 => return Some(i),
            ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

// =============================================================================
// Resolved schema
// =============================================================================

/// Struct types built from a [`Schema`].
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    root: Arc<StructType>,
    types: BTreeMap<String, Arc<StructType>>,
}

impl ResolvedSchema {
    pub fn root(&self) -> &Arc<StructType> {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&Arc<StructType>> {
        self.types.get(name)
    }

    /// Every declared type, by name.
    pub fn types(&self) -> impl Iterator<Item = &Arc<StructType>> {
        self.types.values()
    }

    /// Decode a JSON document as the root type.
    pub fn decode(&self, json: &Json) -> Result<Value, JsonError> {
        Value::from_json(&Type::Struct(Arc::clone(&self.root)), json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const USER_SCHEMA: &str = r#"{
        "root": "User",
        "types": {
            "Address": {
                "fields": [
                    { "name": "Name", "type": "string", "tags": { "mod": "trim" } }
                ]
            },
            "Base": {
                "fields": [ { "name": "ID", "type": "uint64" } ]
            },
            "User": {
                "fields": [
                    { "type": "Base", "embedded": true },
                    { "name": "Email", "type": "string", "tags": { "mod": "trim,lcase", "scrub": "emails" } },
                    { "name": "Home", "type": "*Address" },
                    { "name": "Tags", "type": "[]string" },
                    { "name": "Scores", "type": "[3]int" },
                    { "name": "Misc", "type": "map[string][]string" },
                    { "name": "secret", "type": "string", "exported": false }
                ]
            }
        }
    }"#;

    #[test]
    fn test_resolve_types() {
        let resolved = Schema::from_json(USER_SCHEMA).unwrap().resolve().unwrap();
        let user = resolved.root();
        assert_eq!(user.name(), "User");

        let rendered: Vec<String> = user.fields().iter().map(|f| f.ty().to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "Base",
                "string",
                "*Address",
                "[]string",
                "[3]int",
                "map[string][]string",
                "string"
            ]
        );

        let fields = user.fields();
        assert!(fields[0].is_embedded());
        assert_eq!(fields[0].name(), "Base");
        assert_eq!(fields[1].lookup_tag("scrub"), Some("emails"));
        assert!(!fields[6].is_exported());
        assert_eq!(resolved.types().count(), 3);
        assert!(resolved.get("Address").is_some());
    }

    #[test]
    fn test_shared_types_are_built_once() {
        let resolved = Schema::from_json(USER_SCHEMA).unwrap().resolve().unwrap();
        let home = match resolved.root().fields()[2].ty() {
            Type::Pointer(elem) => elem.as_struct().cloned().unwrap(),
            other => panic!("unexpected type {}", other),
        };
        assert!(Arc::ptr_eq(&home, resolved.get("Address").unwrap()));
    }

    #[test]
    fn test_unknown_type() {
        let schema = Schema::from_json(
            r#"{ "root": "A", "types": { "A": { "fields": [ { "name": "B", "type": "[]Missing" } ] } } }"#,
        )
        .unwrap();
        let err = schema.resolve().unwrap_err();
        assert_eq!(err.to_string(), "Unknown type 'Missing' referenced by A");

        let schema = Schema::from_json(r#"{ "root": "Nope" }"#).unwrap();
        assert!(matches!(schema.resolve(), Err(SchemaError::UnknownType { .. })));
    }

    #[test]
    fn test_recursive_type() {
        let schema = Schema::from_json(
            r#"{ "root": "Node", "types": { "Node": { "fields": [ { "name": "Next", "type": "*Node" } ] } } }"#,
        )
        .unwrap();
        assert!(matches!(schema.resolve(), Err(SchemaError::RecursiveType(name)) if name == "Node"));
    }

    #[test]
    fn test_malformed_expressions() {
        for expr in ["", "[x]int", "map[string", "[3"] {
            let json = format!(
                r#"{{ "root": "A", "types": {{ "A": {{ "fields": [ {{ "name": "F", "type": "{}" }} ] }} }} }}"#,
                expr
            );
            let err = Schema::from_json(&json).unwrap().resolve().unwrap_err();
            assert!(matches!(err, SchemaError::MalformedType(_)), "{}: {}", expr, err);
        }
    }

    #[test]
    fn test_duplicate_field() {
        let schema = Schema::from_json(
            r#"{ "root": "A", "types": { "A": { "fields": [
                { "name": "F", "type": "string" },
                { "name": "F", "type": "int" }
            ] } } }"#,
        )
        .unwrap();
        let err = schema.resolve().unwrap_err();
        assert_eq!(err.to_string(), "Duplicate field 'F' in type A");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(USER_SCHEMA.as_bytes()).unwrap();

        let schema = Schema::from_file(file.path()).unwrap();
        assert_eq!(schema.root, "User");
        assert_eq!(schema.types.len(), 3);

        let missing = Schema::from_file(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(SchemaError::Io(_))));
    }

    #[test]
    fn test_decode_root() {
        let resolved = Schema::from_json(USER_SCHEMA).unwrap().resolve().unwrap();
        let v = resolved
            .decode(&serde_json::json!({ "Email": " A@B.io ", "Base": { "ID": 7 } }))
            .unwrap();
        let sv = v.as_struct().unwrap();
        assert_eq!(sv.get("Email"), Some(&Value::string(" A@B.io ")));
        let base = sv.get("Base").and_then(Value::as_struct).unwrap();
        assert_eq!(base.get("ID"), Some(&Value::Uint(7, IntWidth::W64)));
    }
}
