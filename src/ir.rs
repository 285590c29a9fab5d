// Resolved, strongly-typed schema graph. No syntax here; everything has been
// looked up, coerced and checked.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CompileError, Result};
use crate::literal::{Pattern, json_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    String,
    Number,
    Int,
    BigInt,
    Boolean,
    Date,
    Any,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::String,
        Kind::Number,
        Kind::Int,
        Kind::BigInt,
        Kind::Boolean,
        Kind::Date,
        Kind::Any,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Int => "int",
            Kind::BigInt => "bigint",
            Kind::Boolean => "boolean",
            Kind::Date => "date",
            Kind::Any => "any",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Kind::Number | Kind::Int | Kind::BigInt)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", content = "value", rename_all = "snake_case")]
pub enum Check {
    // strings
    MinLength(usize),
    MaxLength(usize),
    Length(usize),
    Pattern(Pattern),
    StartsWith(String),
    EndsWith(String),
    Includes(String),
    Email,
    Url,
    Uuid,
    Trim,
    Lowercase,
    Uppercase,
    // numbers
    Min(Bound),
    Max(Bound),
    Gt(Bound),
    Lt(Bound),
    MultipleOf(Bound),
    // dates, normalized to RFC 3339
    MinDate(String),
    MaxDate(String),
}

/// A numeric check argument. Integer kinds keep exact integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Bound {
    Int(i64),
    Float(OrderedFloat<f64>),
}

impl Bound {
    pub fn zero(kind: Kind) -> Self {
        if kind == Kind::Number { Bound::Float(OrderedFloat(0.0)) } else { Bound::Int(0) }
    }

    pub fn to_json(self) -> Value {
        match self {
            Bound::Int(i) => Value::from(i),
            Bound::Float(n) => json_number(n.0),
        }
    }
}

/// A resolved validator description: a primitive kind plus the checks and
/// modifiers applied to it, in application order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedType {
    pub kind: Kind,
    pub checks: Vec<Check>,
    pub optional: bool,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResolvedType {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            checks: Vec::new(),
            optional: false,
            nullable: false,
            default: None,
            description: None,
        }
    }

    fn with(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// The fixed primitive table. `email`, `uuid` and `url` are strings that
    /// come with their check already attached.
    pub fn primitive(name: &str) -> Option<Self> {
        let ty = match name {
            "string" => Self::new(Kind::String),
            "number" | "float" => Self::new(Kind::Number),
            "int" => Self::new(Kind::Int),
            "bigint" => Self::new(Kind::BigInt),
            "boolean" | "bool" => Self::new(Kind::Boolean),
            "date" => Self::new(Kind::Date),
            "any" | "unknown" => Self::new(Kind::Any),
            "email" => Self::new(Kind::String).with(Check::Email),
            "uuid" => Self::new(Kind::String).with(Check::Uuid),
            "url" => Self::new(Kind::String).with(Check::Url),
            _ => return None,
        };
        Some(ty)
    }

    /// Tightest lower length bound across `min`/`length` checks.
    pub fn min_length(&self) -> Option<usize> {
        self.checks
            .iter()
            .filter_map(|c| match c {
                Check::MinLength(n) | Check::Length(n) => Some(*n),
                _ => None,
            })
            .max()
    }

    pub fn max_length(&self) -> Option<usize> {
        self.checks
            .iter()
            .filter_map(|c| match c {
                Check::MaxLength(n) | Check::Length(n) => Some(*n),
                _ => None,
            })
            .min()
    }

    /// Required means neither optional nor defaulted.
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedField {
    Value(ResolvedType),
    Object(ResolvedSchema),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSchema {
    pub name: String,
    /// Dotted path from the top-level schema, e.g. `Basic.nested.deep`.
    pub path: String,
    pub fields: IndexMap<String, ResolvedField>,
    pub scopes: IndexMap<String, ResolvedSchema>,
}

impl ResolvedSchema {
    pub fn value(&self, field: &str) -> Option<&ResolvedType> {
        match self.fields.get(field)? {
            ResolvedField::Value(ty) => Some(ty),
            ResolvedField::Object(_) => None,
        }
    }

    pub fn object(&self, field: &str) -> Option<&ResolvedSchema> {
        match self.fields.get(field)? {
            ResolvedField::Object(schema) => Some(schema),
            ResolvedField::Value(_) => None,
        }
    }

    pub fn scope(&self, name: &str) -> Option<&ResolvedSchema> {
        self.scopes.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Primary,
    /// server-only; never sent to clients
    Private,
    Queryable,
}

/// `(schema path, field) → tags`, kept beside the validators rather than on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapabilityTable(BTreeMap<String, BTreeMap<String, BTreeSet<Capability>>>);

impl CapabilityTable {
    pub fn insert(&mut self, path: &str, field: &str, tags: &BTreeSet<Capability>) {
        if tags.is_empty() {
            return;
        }
        self.0
            .entry(path.to_string())
            .or_default()
            .entry(field.to_string())
            .or_default()
            .extend(tags.iter().copied());
    }

    pub fn get(&self, path: &str, field: &str) -> Option<&BTreeSet<Capability>> {
        self.0.get(path)?.get(field)
    }

    pub fn has(&self, path: &str, field: &str, tag: Capability) -> bool {
        self.get(path, field).is_some_and(|tags| tags.contains(&tag))
    }
}

/// A custom `type` after resolution, with the tags it passes on to fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomType {
    #[serde(flatten)]
    pub ty: ResolvedType,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<Capability>,
}

/// Output of one compilation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaGraph {
    pub types: IndexMap<String, CustomType>,
    pub schemas: IndexMap<String, ResolvedSchema>,
    pub capabilities: CapabilityTable,
}

impl SchemaGraph {
    pub fn schema(&self, name: &str) -> Result<&ResolvedSchema> {
        self.schemas
            .get(name)
            .ok_or_else(|| CompileError::UnknownSchema { name: name.to_string() })
    }

    pub fn custom_type(&self, name: &str) -> Option<&ResolvedType> {
        self.types.get(name).map(|c| &c.ty)
    }

    pub fn capabilities(&self, path: &str, field: &str) -> BTreeSet<Capability> {
        self.capabilities.get(path, field).cloned().unwrap_or_default()
    }

    pub fn has_capability(&self, path: &str, field: &str, tag: Capability) -> bool {
        self.capabilities.has(path, field, tag)
    }
}
