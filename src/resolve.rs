//! Syntax → resolved graph.
//!
//! Custom types may reference each other in any order, so they go through a
//! pending queue that is rescanned until nothing changes. A pass that makes no
//! progress means a cycle or an undefined name. Schemas resolve afterwards
//! against the finished type map.
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use indexmap::IndexMap;

use crate::ast::{FormatCall, Prop, SchemaDefNode, SyntaxUnit, TypeDefNode};
use crate::error::{CompileError, Result};
use crate::ir::{Capability, CapabilityTable, CustomType, ResolvedField, ResolvedSchema, ResolvedType, SchemaGraph};
use crate::literal::{Literal, coerce};
use crate::registry::{FormatRegistry, STANDARD, Transform};

type Types = IndexMap<String, CustomType>;

struct Pending {
    name: String,
    base: String,
    node: TypeDefNode,
}

pub struct Resolver<'r> {
    registry: &'r FormatRegistry,
    passes: usize,
}

/// Resolve with the standard format registry.
pub fn resolve(unit: SyntaxUnit) -> Result<SchemaGraph> {
    Resolver::new(&STANDARD).resolve(unit)
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r FormatRegistry) -> Self {
        Self { registry, passes: 0 }
    }

    /// Fixed-point passes taken by the last [`Resolver::resolve`].
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn resolve(&mut self, unit: SyntaxUnit) -> Result<SchemaGraph> {
        let mut graph = SchemaGraph::default();
        graph.types = self.resolve_types(unit.types)?;

        for (name, node) in unit.schemas {
            let schema = self.resolve_schema(&graph.types, &mut graph.capabilities, node, name.clone())?;
            graph.schemas.insert(name, schema);
        }
        tracing::info!(
            types = graph.types.len(),
            schemas = graph.schemas.len(),
            passes = self.passes,
            "resolved"
        );
        Ok(graph)
    }

    fn resolve_types(&mut self, nodes: IndexMap<String, TypeDefNode>) -> Result<Types> {
        let order: Vec<String> = nodes.keys().cloned().collect();
        let declared: HashSet<String> = order.iter().cloned().collect();
        let mut pending = VecDeque::with_capacity(nodes.len());
        for (name, node) in nodes {
            let (base, node) = take_base(node, &name)?;
            pending.push_back(Pending { name, base, node });
        }

        let bound = pending.len() + 1;
        let mut resolved = Types::new();
        self.passes = 0;
        while !pending.is_empty() {
            self.passes += 1;
            let before = pending.len();
            for _ in 0..before {
                let Some(entry) = pending.pop_front() else { break };
                // a declared custom type shadows a primitive of the same name,
                // even before it resolves; only a type may name itself as a primitive
                let shadowed = entry.base != entry.name
                    && declared.contains(&entry.base)
                    && !resolved.contains_key(&entry.base);
                if shadowed {
                    pending.push_back(entry);
                    continue;
                }
                match lookup(&resolved, &entry.base) {
                    Some((ty, tags)) => {
                        let (ty, tags) = self.build(ty, tags, entry.node)?;
                        tracing::debug!(name = %entry.name, base = %entry.base, kind = %ty.kind, "resolved type");
                        resolved.insert(entry.name, CustomType { ty, tags });
                    }
                    None => pending.push_back(entry),
                }
            }
            tracing::debug!(pass = self.passes, remaining = pending.len(), "type pass");
            if pending.len() == before {
                return Err(CompileError::UnresolvedType { chain: unresolved_chain(&pending) });
            }
            debug_assert!(self.passes <= bound);
        }

        // back to declaration order
        Ok(order
            .into_iter()
            .filter_map(|name| resolved.shift_remove(&name).map(|ty| (name, ty)))
            .collect())
    }

    fn resolve_schema(
        &self,
        types: &Types,
        caps: &mut CapabilityTable,
        node: SchemaDefNode,
        path: String,
    ) -> Result<ResolvedSchema> {
        let mut fields = IndexMap::with_capacity(node.props.len());
        for (prop, value) in node.props {
            let field = match value {
                Prop::Field(field) => {
                    let qualified = format!("{path}.{prop}");
                    let (base, field) = take_base(field, &qualified)?;
                    let Some((ty, tags)) = lookup(types, &base) else {
                        return Err(CompileError::UnresolvedType { chain: vec![qualified, base] });
                    };
                    let (ty, tags) = self.build(ty, tags, field)?;
                    caps.insert(&path, &prop, &tags);
                    ResolvedField::Value(ty)
                }
                Prop::Nested(sub) => {
                    let sub_path = format!("{path}.{prop}");
                    ResolvedField::Object(self.resolve_schema(types, caps, sub, sub_path)?)
                }
            };
            fields.insert(prop, field);
        }

        let mut scopes = IndexMap::with_capacity(node.scopes.len());
        for (name, scope) in node.scopes {
            let scope_path = format!("{path}.{name}");
            scopes.insert(name, self.resolve_schema(types, caps, scope, scope_path)?);
        }

        Ok(ResolvedSchema { name: node.name, path, fields, scopes })
    }

    /// Extra descriptors first, as bare calls, then the format calls.
    fn build(
        &self,
        mut ty: ResolvedType,
        mut tags: BTreeSet<Capability>,
        node: TypeDefNode,
    ) -> Result<(ResolvedType, BTreeSet<Capability>)> {
        let calls = node.descriptors.into_iter().map(FormatCall::bare).chain(node.formats);
        for call in calls {
            let args: Vec<Literal> = call.args.iter().map(|raw| coerce(raw)).collect();
            match self.registry.apply(ty.kind, &call.name, &args)? {
                Transform::Check(check) => ty.checks.push(check),
                Transform::Optional => ty.optional = true,
                Transform::Nullable => ty.nullable = true,
                Transform::Default(value) => ty.default = Some(value),
                Transform::Describe(text) => ty.description = Some(text),
                Transform::Tag(tag) => {
                    tags.insert(tag);
                }
            }
        }
        Ok((ty, tags))
    }
}

/// Moves `descriptors[0]` out of the node; it is not looked at again.
fn take_base(mut node: TypeDefNode, name: &str) -> Result<(String, TypeDefNode)> {
    if node.descriptors.is_empty() {
        return Err(CompileError::MissingBaseType { name: name.to_string() });
    }
    let base = node.descriptors.remove(0);
    Ok((base, node))
}

/// Custom types shadow primitives.
fn lookup(types: &Types, base: &str) -> Option<(ResolvedType, BTreeSet<Capability>)> {
    if let Some(custom) = types.get(base) {
        return Some((custom.ty.clone(), custom.tags.clone()));
    }
    ResolvedType::primitive(base).map(|ty| (ty, BTreeSet::new()))
}

/// Follows base names from the first stuck entry until a repeat or a name
/// that was never declared.
fn unresolved_chain(pending: &VecDeque<Pending>) -> Vec<String> {
    let bases: HashMap<&str, &str> = pending.iter().map(|p| (p.name.as_str(), p.base.as_str())).collect();
    let Some(first) = pending.front() else { return Vec::new() };

    let mut chain = vec![first.name.clone()];
    let mut seen = BTreeSet::from([first.name.as_str()]);
    let mut at = first.base.as_str();
    loop {
        chain.push(at.to_string());
        if !seen.insert(at) {
            break;
        }
        match bases.get(at) {
            Some(next) => at = next,
            None => break,
        }
    }
    chain
}

// ------------------------------- Tests ------------------------------------ //
