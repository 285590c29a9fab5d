//! Output backends over a resolved [`SchemaGraph`].
pub mod json_schema;
pub mod proto;

use serde_json::Value;

use crate::error::Result;
use crate::ir::SchemaGraph;
use proto::Codegen;

/// Descriptor text for one schema and its scopes.
pub fn emit_descriptor(graph: &SchemaGraph, schema_name: &str) -> Result<String> {
    let mut cg = Codegen::new();
    cg.emit(graph.schema(schema_name)?)?;
    Ok(cg.into_string())
}

/// Every schema in the graph as one `.proto` file.
pub fn emit_descriptor_file(graph: &SchemaGraph, package: Option<&str>) -> Result<String> {
    let mut cg = Codegen::new();
    for schema in graph.schemas.values() {
        cg.emit(schema)?;
    }
    let mut out = String::from("syntax = \"proto3\";\n");
    if let Some(package) = package {
        out.push_str(&format!("\npackage {package};\n"));
    }
    let body = cg.into_string();
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
    }
    Ok(out)
}

pub fn json_schema(graph: &SchemaGraph, schema_name: &str) -> Result<Value> {
    Ok(json_schema::document(graph.schema(schema_name)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use crate::error::CompileError;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_has_header_package_and_every_schema() {
        let graph = compile("schema A { x: (string); } schema B { y: (int); }").unwrap();
        let out = emit_descriptor_file(&graph, Some("acme.v1")).unwrap();
        assert_eq!(
            out,
            "syntax = \"proto3\";

package acme.v1;

message A {
  string x = 1;
}

message B {
  int32 y = 1;
}
"
        );
    }

    #[test]
    fn scope_message_colliding_with_a_schema_is_rejected() {
        let graph = compile("schema Person { :@audit { a: (string); } } schema PersonAudit { b: (string); }").unwrap();
        assert_eq!(
            emit_descriptor_file(&graph, None).unwrap_err(),
            CompileError::DuplicateDefinition { name: "PersonAudit".into() }
        );
        assert!(emit_descriptor(&graph, "Person").is_ok());
    }

    #[test]
    fn unknown_schema_is_an_error() {
        let graph = compile("schema A { x: (string); }").unwrap();
        assert_eq!(
            emit_descriptor(&graph, "Nope").unwrap_err(),
            CompileError::UnknownSchema { name: "Nope".into() }
        );
        assert!(json_schema(&graph, "Nope").is_err());
    }
}
