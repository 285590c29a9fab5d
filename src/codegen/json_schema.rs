//! JSON Schema (draft 2020-12) for resolved schemas.
use serde_json::{Map, Value, json};

use crate::ir::{Check, Kind, ResolvedField, ResolvedSchema, ResolvedType};

const DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Top-level document: the object schema plus `$schema` and `title`.
pub fn document(schema: &ResolvedSchema) -> Value {
    let mut doc = Map::new();
    doc.insert("$schema".into(), Value::from(DIALECT));
    doc.insert("title".into(), Value::from(schema.name.clone()));
    if let Value::Object(body) = object_schema(schema) {
        doc.extend(body);
    }
    Value::Object(doc)
}

pub fn object_schema(schema: &ResolvedSchema) -> Value {
    let mut props = Map::new();
    let mut required = Vec::new();
    for (name, field) in &schema.fields {
        let (value, is_required) = match field {
            ResolvedField::Value(ty) => (type_schema(ty), ty.is_required()),
            ResolvedField::Object(sub) => (object_schema(sub), true),
        };
        if is_required {
            required.push(Value::from(name.clone()));
        }
        props.insert(name.clone(), value);
    }

    let mut map = Map::new();
    map.insert("type".into(), Value::from("object"));
    map.insert("properties".into(), Value::Object(props));
    if !required.is_empty() {
        map.insert("required".into(), Value::Array(required));
    }
    if !schema.scopes.is_empty() {
        let defs = schema
            .scopes
            .iter()
            .map(|(name, scope)| (name.clone(), object_schema(scope)))
            .collect::<Map<_, _>>();
        map.insert("$defs".into(), Value::Object(defs));
    }
    Value::Object(map)
}

pub fn type_schema(ty: &ResolvedType) -> Value {
    let mut o = match ty.kind {
        Kind::String => json!({ "type": "string" }),
        Kind::Number => json!({ "type": "number" }),
        Kind::Int | Kind::BigInt => json!({ "type": "integer" }),
        Kind::Boolean => json!({ "type": "boolean" }),
        Kind::Date => json!({ "type": "string", "format": "date-time" }),
        Kind::Any => json!({}),
    };

    if let Some(n) = ty.min_length() {
        o["minLength"] = Value::from(n);
    }
    if let Some(n) = ty.max_length() {
        o["maxLength"] = Value::from(n);
    }

    let mut patterns = Vec::new();
    for check in &ty.checks {
        match check {
            Check::Pattern(p) if p.is_case_insensitive() => patterns.push(format!("(?i){}", p.source)),
            Check::Pattern(p) => patterns.push(p.source.clone()),
            Check::StartsWith(s) => patterns.push(format!("^{}", regex::escape(s))),
            Check::EndsWith(s) => patterns.push(format!("{}$", regex::escape(s))),
            Check::Includes(s) => patterns.push(regex::escape(s)),
            Check::Email => o["format"] = Value::from("email"),
            Check::Url => o["format"] = Value::from("uri"),
            Check::Uuid => o["format"] = Value::from("uuid"),
            Check::Min(n) => o["minimum"] = n.to_json(),
            Check::Max(n) => o["maximum"] = n.to_json(),
            Check::Gt(n) => o["exclusiveMinimum"] = n.to_json(),
            Check::Lt(n) => o["exclusiveMaximum"] = n.to_json(),
            Check::MultipleOf(n) => o["multipleOf"] = n.to_json(),
            Check::MinDate(d) => o["formatMinimum"] = Value::from(d.clone()),
            Check::MaxDate(d) => o["formatMaximum"] = Value::from(d.clone()),
            // lengths are folded above; case and trim are transforms
            Check::MinLength(_) | Check::MaxLength(_) | Check::Length(_) => {}
            Check::Trim | Check::Lowercase | Check::Uppercase => {}
        }
    }
    match patterns.len() {
        0 => {}
        1 => o["pattern"] = Value::from(patterns.remove(0)),
        _ => {
            o["allOf"] = Value::Array(patterns.into_iter().map(|p| json!({ "pattern": p })).collect());
        }
    }

    if let Some(default) = &ty.default {
        o["default"] = default.clone();
    }
    if let Some(text) = &ty.description {
        o["description"] = Value::from(text.clone());
    }

    if ty.nullable {
        json!({ "oneOf": [o, { "type": "null" }] })
    } else {
        o
    }
}
