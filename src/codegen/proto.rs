//! Message-descriptor text (`message Name { ... }`) for resolved schemas.
use std::collections::HashSet;

use crate::error::{CompileError, Result};
use crate::ir::{Kind, ResolvedField, ResolvedSchema};

/// Wire scalar for a resolved kind; `Any` has none.
pub fn wire_scalar(kind: Kind) -> Option<&'static str> {
    match kind {
        Kind::String => Some("string"),
        Kind::Number => Some("double"),
        Kind::Int => Some("int32"),
        Kind::BigInt => Some("int64"),
        Kind::Boolean => Some("bool"),
        Kind::Date => Some("int64"),
        Kind::Any => None,
    }
}

/// `Basic.nested` → `BasicNested`, `home_address` → `HomeAddress`.
pub fn pascal_case(path: &str) -> String {
    path.split(['.', '_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[derive(Default)]
pub struct Codegen {
    out: String,
    indent: usize,
    /// Message names taken at each nesting depth of the output.
    names: Vec<HashSet<String>>,
}

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the schema's message followed by one sibling message per scope.
    pub fn emit(&mut self, schema: &ResolvedSchema) -> Result<()> {
        self.message(&schema.name, schema)?;
        self.scopes(schema)
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn scopes(&mut self, schema: &ResolvedSchema) -> Result<()> {
        for scope in schema.scopes.values() {
            self.message(&pascal_case(&scope.path), scope)?;
            self.scopes(scope)?;
        }
        Ok(())
    }

    fn message(&mut self, name: &str, schema: &ResolvedSchema) -> Result<()> {
        if self.names.len() <= self.indent {
            self.names.push(HashSet::new());
        }
        if !self.names[self.indent].insert(name.to_string()) {
            return Err(CompileError::DuplicateDefinition { name: name.to_string() });
        }
        if !self.out.is_empty() && self.indent == 0 {
            self.out.push('\n');
        }
        self.line(&format!("message {name} {{"));
        self.indent += 1;

        for (field, value) in &schema.fields {
            if let ResolvedField::Object(sub) = value {
                self.message(&pascal_case(field), sub)?;
            }
        }
        for (number, (field, value)) in (1..).zip(&schema.fields) {
            let line = match value {
                ResolvedField::Value(ty) => {
                    let scalar = wire_scalar(ty.kind).ok_or_else(|| CompileError::UnmappableKind {
                        field: format!("{}.{field}", schema.path),
                        kind: ty.kind.to_string(),
                    })?;
                    let label = if ty.optional { "optional " } else { "" };
                    format!("{label}{scalar} {field} = {number};")
                }
                ResolvedField::Object(_) => format!("{} {field} = {number};", pascal_case(field)),
            };
            self.line(&line);
        }

        self.indent -= 1;
        self.names.truncate(self.indent + 1);
        self.line("}");
        Ok(())
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }
}
