//! `(kind, format name) → typed transform`.
//!
//! Every directive a type can carry is registered here up front. Lookups of
//! unknown names fail with the valid names for that kind and the closest one.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use strsim::levenshtein;

use crate::error::{CompileError, Result};
use crate::ir::{Bound, Capability, Check, Kind};
use crate::literal::{Literal, Pattern};

#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Check(Check),
    Optional,
    Nullable,
    Default(Value),
    Describe(String),
    Tag(Capability),
}

/// Builds a transform from coerced arguments; the `Err` string is the reason.
pub type FormatFn = fn(Kind, &[Literal]) -> Result<Transform, String>;

#[derive(Default)]
pub struct FormatRegistry {
    entries: IndexMap<Kind, IndexMap<&'static str, FormatFn>>,
}

impl FormatRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kinds: &[Kind], name: &'static str, build: FormatFn) -> Result<()> {
        for kind in kinds {
            let formats = self.entries.entry(*kind).or_default();
            if formats.contains_key(name) {
                return Err(CompileError::DuplicateFormat { name: name.to_string(), kind: kind.to_string() });
            }
            formats.insert(name, build);
        }
        Ok(())
    }

    pub fn names(&self, kind: Kind) -> Vec<&'static str> {
        self.entries
            .get(&kind)
            .map(|formats| formats.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn apply(&self, kind: Kind, name: &str, args: &[Literal]) -> Result<Transform> {
        let Some(build) = self.entries.get(&kind).and_then(|f| f.get(name)) else {
            let valid = self.names(kind);
            return Err(CompileError::UnknownFormat {
                name: name.to_string(),
                kind: kind.to_string(),
                suggestion: suggest(name, &valid),
                valid: valid.into_iter().map(String::from).collect(),
            });
        };
        tracing::debug!(%kind, name, args = args.len(), "apply format");
        build(kind, args).map_err(|reason| CompileError::InvalidFormatArgs {
            name: name.to_string(),
            kind: kind.to_string(),
            reason,
        })
    }

    /// Everything the Stone language ships with.
    pub fn standard() -> Result<Self> {
        use Kind::*;
        let mut r = Self::empty();

        r.register(&Kind::ALL, "optional", |_, a| none(a).map(|_| Transform::Optional))?;
        r.register(&Kind::ALL, "nullable", |_, a| none(a).map(|_| Transform::Nullable))?;
        r.register(&Kind::ALL, "default", default_value)?;
        r.register(&Kind::ALL, "describe", |_, a| text(a).map(Transform::Describe))?;
        r.register(&Kind::ALL, "primary", |_, a| none(a).map(|_| Transform::Tag(Capability::Primary)))?;
        r.register(&Kind::ALL, "private", |_, a| none(a).map(|_| Transform::Tag(Capability::Private)))?;
        r.register(&Kind::ALL, "server", |_, a| none(a).map(|_| Transform::Tag(Capability::Private)))?;
        r.register(&Kind::ALL, "queryable", |_, a| none(a).map(|_| Transform::Tag(Capability::Queryable)))?;

        r.register(&[String], "min", |_, a| count(a).map(|n| check(Check::MinLength(n))))?;
        r.register(&[String], "max", |_, a| count(a).map(|n| check(Check::MaxLength(n))))?;
        r.register(&[String], "length", |_, a| count(a).map(|n| check(Check::Length(n))))?;
        r.register(&[String], "regex", |_, a| pattern(a).map(|p| check(Check::Pattern(p))))?;
        r.register(&[String], "startsWith", |_, a| text(a).map(|s| check(Check::StartsWith(s))))?;
        r.register(&[String], "endsWith", |_, a| text(a).map(|s| check(Check::EndsWith(s))))?;
        r.register(&[String], "includes", |_, a| text(a).map(|s| check(Check::Includes(s))))?;
        r.register(&[String], "email", |_, a| none(a).map(|_| check(Check::Email)))?;
        r.register(&[String], "url", |_, a| none(a).map(|_| check(Check::Url)))?;
        r.register(&[String], "uuid", |_, a| none(a).map(|_| check(Check::Uuid)))?;
        r.register(&[String], "trim", |_, a| none(a).map(|_| check(Check::Trim)))?;
        r.register(&[String], "lowercase", |_, a| none(a).map(|_| check(Check::Lowercase)))?;
        r.register(&[String], "uppercase", |_, a| none(a).map(|_| check(Check::Uppercase)))?;

        let numeric = [Number, Int, BigInt];
        r.register(&numeric, "min", |k, a| bound(k, a).map(|n| check(Check::Min(n))))?;
        r.register(&numeric, "gte", |k, a| bound(k, a).map(|n| check(Check::Min(n))))?;
        r.register(&numeric, "max", |k, a| bound(k, a).map(|n| check(Check::Max(n))))?;
        r.register(&numeric, "lte", |k, a| bound(k, a).map(|n| check(Check::Max(n))))?;
        r.register(&numeric, "gt", |k, a| bound(k, a).map(|n| check(Check::Gt(n))))?;
        r.register(&numeric, "lt", |k, a| bound(k, a).map(|n| check(Check::Lt(n))))?;
        r.register(&numeric, "multipleOf", |k, a| bound(k, a).map(|n| check(Check::MultipleOf(n))))?;
        r.register(&numeric, "positive", |k, a| none(a).map(|_| check(Check::Gt(Bound::zero(k)))))?;
        r.register(&numeric, "negative", |k, a| none(a).map(|_| check(Check::Lt(Bound::zero(k)))))?;
        r.register(&numeric, "nonnegative", |k, a| none(a).map(|_| check(Check::Min(Bound::zero(k)))))?;
        r.register(&numeric, "nonpositive", |k, a| none(a).map(|_| check(Check::Max(Bound::zero(k)))))?;

        r.register(&[Date], "min", |_, a| date(a).map(|d| check(Check::MinDate(d))))?;
        r.register(&[Date], "max", |_, a| date(a).map(|d| check(Check::MaxDate(d))))?;

        Ok(r)
    }
}

pub static STANDARD: Lazy<FormatRegistry> =
    Lazy::new(|| FormatRegistry::standard().unwrap_or_else(|e| panic!("standard formats: {e}")));

fn suggest(name: &str, valid: &[&'static str]) -> Option<String> {
    let lower = name.to_lowercase();
    valid
        .iter()
        .map(|candidate| {
            let distance = if candidate.to_lowercase() == lower { 0 } else { levenshtein(name, candidate) };
            (distance, *candidate)
        })
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

// ------------------------------ Arguments -------------------------------- //

fn check(c: Check) -> Transform {
    Transform::Check(c)
}

fn none(args: &[Literal]) -> Result<(), String> {
    match args {
        [] => Ok(()),
        _ => Err(format!("takes no arguments, got {}", args.len())),
    }
}

fn one(args: &[Literal]) -> Result<&Literal, String> {
    match args {
        [only] => Ok(only),
        _ => Err(format!("takes exactly one argument, got {}", args.len())),
    }
}

fn count(args: &[Literal]) -> Result<usize, String> {
    let arg = one(args)?;
    arg.as_usize()
        .ok_or_else(|| format!("expected a non-negative integer, got {}", arg.kind_name()))
}

/// Exact whole number for an integer kind; `int` is 32-bit.
fn integer(kind: Kind, arg: &Literal) -> Result<i64, String> {
    let i = arg.as_i64().ok_or_else(|| match arg {
        Literal::Int(_) | Literal::Number(_) => format!("{kind} needs an exact whole number, got {}", arg.to_json()),
        _ => format!("expected a number, got {}", arg.kind_name()),
    })?;
    if kind == Kind::Int && i32::try_from(i).is_err() {
        return Err(format!("{i} is out of range for int"));
    }
    Ok(i)
}

fn bound(kind: Kind, args: &[Literal]) -> Result<Bound, String> {
    let arg = one(args)?;
    match (kind, arg) {
        (Kind::Number, Literal::Int(i)) => Ok(Bound::Int(*i)),
        (Kind::Number, Literal::Number(n)) => Ok(Bound::Float(*n)),
        (Kind::Number, _) => Err(format!("expected a number, got {}", arg.kind_name())),
        _ => integer(kind, arg).map(Bound::Int),
    }
}

fn text(args: &[Literal]) -> Result<String, String> {
    let arg = one(args)?;
    arg.as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("expected a string, got {}", arg.kind_name()))
}

fn pattern(args: &[Literal]) -> Result<Pattern, String> {
    match one(args)? {
        Literal::Pattern(p) => Ok(p.clone()),
        Literal::Text(s) => Pattern::compile(s, "").map_err(|e| e.to_string()),
        other => Err(format!("expected a regex, got {}", other.kind_name())),
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
fn parse_date(s: &str) -> Option<String> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.to_rfc3339());
    }
    let day = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(day.and_hms_opt(0, 0, 0)?.and_utc().to_rfc3339())
}

fn date(args: &[Literal]) -> Result<String, String> {
    let arg = one(args)?;
    arg.as_str()
        .and_then(parse_date)
        .ok_or_else(|| format!("expected a date like 2024-01-31, got {}", arg.to_json()))
}

fn default_value(kind: Kind, args: &[Literal]) -> Result<Transform, String> {
    let arg = one(args)?;
    let value = match (kind, arg) {
        (Kind::Any, _) => arg.to_json(),
        (Kind::String, Literal::Text(s)) => Value::from(s.clone()),
        (Kind::Number, Literal::Int(_) | Literal::Number(_)) => arg.to_json(),
        (Kind::Int | Kind::BigInt, Literal::Int(_) | Literal::Number(_)) => Value::from(integer(kind, arg)?),
        (Kind::Boolean, Literal::Bool(b)) => Value::Bool(*b),
        // stored in the same RFC 3339 form as the date bounds
        (Kind::Date, Literal::Text(s)) => match parse_date(s) {
            Some(normalized) => Value::from(normalized),
            None => return Err(format!("expected a date like 2024-01-31, got {s:?}")),
        },
        _ => return Err(format!("default {} does not fit {kind}", arg.to_json())),
    };
    Ok(Transform::Default(value))
}

// ------------------------------- Tests ------------------------------------ //
