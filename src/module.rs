//! A schema bound as a storable module: it must carry exactly one top-level
//! field tagged `primary`.
use crate::codegen;
use crate::error::{CompileError, Result};
use crate::ir::{Capability, ResolvedField, ResolvedSchema, SchemaGraph};

#[derive(Debug, Clone)]
pub struct Module<'g> {
    graph: &'g SchemaGraph,
    schema: &'g ResolvedSchema,
    primary_key: String,
}

impl<'g> Module<'g> {
    pub fn bind(graph: &'g SchemaGraph, name: &str) -> Result<Self> {
        let schema = graph.schema(name)?;
        let mut primaries: Vec<String> = schema
            .fields
            .iter()
            .filter(|(_, field)| matches!(field, ResolvedField::Value(_)))
            .filter(|(field, _)| graph.has_capability(&schema.path, field, Capability::Primary))
            .map(|(field, _)| field.clone())
            .collect();

        let primary_key = match primaries.len() {
            0 => return Err(CompileError::MissingPrimaryKey { schema: name.to_string() }),
            1 => primaries.remove(0),
            _ => return Err(CompileError::AmbiguousPrimaryKey { schema: name.to_string(), fields: primaries }),
        };
        tracing::debug!(module = name, %primary_key, "bound module");
        Ok(Self { graph, schema, primary_key })
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &ResolvedSchema {
        self.schema
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn private_fields(&self) -> Vec<&str> {
        self.tagged(Capability::Private)
    }

    pub fn queryable_fields(&self) -> Vec<&str> {
        self.tagged(Capability::Queryable)
    }

    /// Descriptor text for the bound schema.
    pub fn build(&self) -> Result<String> {
        codegen::emit_descriptor(self.graph, &self.schema.name)
    }

    fn tagged(&self, tag: Capability) -> Vec<&str> {
        self.schema
            .fields
            .keys()
            .filter(|field| self.graph.has_capability(&self.schema.path, field, tag))
            .map(String::as_str)
            .collect()
    }
}
