//! Stone: a small schema DSL compiled into a resolved type graph, message
//! descriptors and JSON Schema.
//!
//! Pipeline: [`lexer`] → [`grammar`] (driven by [`machine`]) → [`resolve`]
//! (through the format [`registry`]) → [`codegen`].
pub mod ast;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod error;
pub mod grammar;
pub mod ir;
pub mod lexer;
pub mod literal;
pub mod machine;
pub mod module;
pub mod registry;
pub mod resolve;

pub use codegen::{emit_descriptor, emit_descriptor_file, json_schema};
pub use error::{CompileError, Result};
pub use grammar::parse_unit;
pub use ir::{Capability, Kind, SchemaGraph};
pub use module::Module;
pub use resolve::resolve;

/// Parse and resolve one compilation unit.
pub fn compile(source: &str) -> Result<SchemaGraph> {
    resolve(parse_unit(source)?)
}
