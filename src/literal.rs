//! Coercion of raw format-call arguments into typed literals.
//!
//! Forms are tried in order: boolean, integer, number, JSON (object/array/string),
//! `/pattern/flags`, and finally the trimmed raw text. Nothing here fails; an
//! argument that fits no form is just text.
use std::fmt;

use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};
use serde_json::Value;

static PATTERN_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(.+)/([gimsuy]*)$").unwrap_or_else(|e| panic!("pattern literal: {e}")));

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    /// Kept apart from `Number` so large integers survive unrounded.
    Int(i64),
    Number(OrderedFloat<f64>),
    Json(Value),
    Pattern(Pattern),
    Text(String),
}

/// A compiled `/source/flags` literal.
#[derive(Clone)]
pub struct Pattern {
    pub source: String,
    pub flags: String,
    pub regex: Regex,
}

impl Pattern {
    /// `g`, `y` and `u` are accepted but change nothing here.
    pub fn compile(source: &str, flags: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()?;
        Ok(Self { source: source.to_string(), flags: flags.to_string(), regex })
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.flags.contains('i')
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("/{}/{}", self.source, self.flags))
    }
}

pub fn coerce(raw: &str) -> Literal {
    let raw = raw.trim();
    match raw {
        "true" => return Literal::Bool(true),
        "false" => return Literal::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Literal::Int(i);
    }
    if let Ok(n) = raw.parse::<f64>() {
        // "inf"/"NaN" parse as floats but are words in the DSL
        if n.is_finite() && !raw.is_empty() {
            return Literal::Number(OrderedFloat(n));
        }
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(s)) => return Literal::Text(s),
        Ok(v @ (Value::Object(_) | Value::Array(_))) => return Literal::Json(v),
        _ => {}
    }
    if let Some(caps) = PATTERN_LITERAL.captures(raw) {
        if let Ok(pattern) = Pattern::compile(&caps[1], &caps[2]) {
            return Literal::Pattern(pattern);
        }
    }
    Literal::Text(raw.to_string())
}

impl Literal {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Literal::Bool(_) => "boolean",
            Literal::Int(_) | Literal::Number(_) => "number",
            Literal::Json(Value::Array(_)) => "array",
            Literal::Json(_) => "object",
            Literal::Pattern(_) => "regex",
            Literal::Text(_) => "string",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Number(n) => Some(n.0),
            _ => None,
        }
    }

    /// Exact integers only: a float counts when it is whole and within the
    /// range an `f64` represents without gaps.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            Literal::Number(n) if n.0.fract() == 0.0 && n.0.abs() <= MAX_SAFE_INTEGER => Some(n.0 as i64),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|i| usize::try_from(i).ok())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::from(*i),
            Literal::Number(n) => json_number(n.0),
            Literal::Json(v) => v.clone(),
            Literal::Pattern(p) => Value::String(format!("/{}/{}", p.source, p.flags)),
            Literal::Text(s) => Value::String(s.clone()),
        }
    }
}

/// 2^53 - 1
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

// Helper: prefer emitting integers when exact
pub fn json_number(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booleans_and_numbers() {
        assert_eq!(coerce("true"), Literal::Bool(true));
        assert_eq!(coerce("false"), Literal::Bool(false));
        assert_eq!(coerce("42"), Literal::Int(42));
        assert_eq!(coerce(" -1.5 "), Literal::Number(OrderedFloat(-1.5)));
        assert_eq!(coerce("42").as_usize(), Some(42));
        assert_eq!(coerce("-3").as_usize(), None);
    }

    #[test]
    fn large_integers_stay_exact() {
        let big = coerce("9007199254740993");
        assert_eq!(big, Literal::Int(9_007_199_254_740_993));
        assert_eq!(big.as_i64(), Some(9_007_199_254_740_993));
        assert_eq!(big.to_json(), json!(9_007_199_254_740_993_i64));
        // past i64: a float, and no longer an exact integer
        let huge = coerce("99999999999999999999");
        assert!(matches!(huge, Literal::Number(_)));
        assert_eq!(huge.as_i64(), None);
        assert_eq!(coerce("1e3").as_i64(), Some(1000));
    }

    #[test]
    fn json_objects_and_arrays_are_structured() {
        assert_eq!(coerce(r#"{"a":1}"#), Literal::Json(json!({"a": 1})));
        assert_eq!(coerce("[1, 2]"), Literal::Json(json!([1, 2])));
        assert_eq!(coerce(r#""quoted, text""#), Literal::Text("quoted, text".into()));
    }

    #[test]
    fn regex_literals_compile_with_flags() {
        let Literal::Pattern(p) = coerce("/ab+c/i") else { panic!("expected a pattern") };
        assert_eq!(p.source, "ab+c");
        assert!(p.is_case_insensitive());
        assert!(p.regex.is_match("xABBC"));
    }

    #[test]
    fn malformed_forms_fall_back_to_text() {
        assert_eq!(coerce("hello"), Literal::Text("hello".into()));
        assert_eq!(coerce("  padded "), Literal::Text("padded".into()));
        // unbalanced group: not a usable pattern
        assert_eq!(coerce("/(ab/"), Literal::Text("/(ab/".into()));
        assert_eq!(coerce("{not json}"), Literal::Text("{not json}".into()));
        assert_eq!(coerce("inf"), Literal::Text("inf".into()));
        assert_eq!(coerce(""), Literal::Text(String::new()));
    }

    #[test]
    fn integers_stay_integers_in_json() {
        assert_eq!(coerce("255").to_json(), json!(255));
        assert_eq!(coerce("2.5").to_json(), json!(2.5));
    }
}
