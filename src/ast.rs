// Syntax trees produced by the grammars. They live for one compilation pass;
// the resolver consumes them.

use indexmap::IndexMap;
use serde::Serialize;

/// A directive invocation such as `min(1)`; args stay raw until resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatCall {
    pub name: String,
    pub args: Vec<String>,
}

impl FormatCall {
    pub fn bare(name: impl Into<String>) -> Self {
        Self { name: name.into(), args: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeDefNode {
    pub name: String,
    /// `descriptors[0]` is the base or custom type; the rest are bare modifiers.
    pub descriptors: Vec<String>,
    pub formats: Vec<FormatCall>,
}

impl TypeDefNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Prop {
    Field(TypeDefNode),
    /// `:Name { ... }`, an object-typed field with its own body
    Nested(SchemaDefNode),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDefNode {
    pub name: String,
    pub props: IndexMap<String, Prop>,
    pub scopes: IndexMap<String, SchemaDefNode>,
}

impl SchemaDefNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Leaf field at a dotted path of scope names, e.g. `["nested", "deeper"]`.
    pub fn field_in(&self, scopes: &[&str], prop: &str) -> Option<&TypeDefNode> {
        let mut at = self;
        for scope in scopes {
            at = at.scopes.get(*scope)?;
        }
        match at.props.get(prop)? {
            Prop::Field(node) => Some(node),
            Prop::Nested(_) => None,
        }
    }
}

/// Every declaration of one source text, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyntaxUnit {
    pub types: IndexMap<String, TypeDefNode>,
    pub schemas: IndexMap<String, SchemaDefNode>,
}
