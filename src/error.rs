//! One error type for the whole compilation pipeline.
//!
//! Every variant is fatal for its compilation unit; no partial graph is ever
//! returned alongside one of these.
use crate::lexer::TokenKind;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("{line}:{col}: no token rule matches near `{snippet}`")]
    Lex {
        offset: usize,
        line: usize,
        col: usize,
        snippet: String,
    },

    #[error("{line}:{col}: unexpected {found} `{text}`, expected one of: {}", fmt_kinds(expected))]
    Grammar {
        line: usize,
        col: usize,
        found: TokenKind,
        text: String,
        expected: Vec<TokenKind>,
    },

    #[error("unexpected end of input, expected one of: {}", fmt_kinds(expected))]
    UnexpectedEof { expected: Vec<TokenKind> },

    #[error("{line}:{col}: closing brace without an open block")]
    UnbalancedClose { line: usize, col: usize },

    #[error("`{name}` is declared more than once")]
    DuplicateDefinition { name: String },

    #[error("`{name}` must name its base type as the first descriptor")]
    MissingBaseType { name: String },

    #[error("unresolved type: {}", chain.join(" -> "))]
    UnresolvedType { chain: Vec<String> },

    #[error(
        "unknown format `{name}` for {kind}{}; valid formats: {}",
        suggestion.as_ref().map(|s| format!(" (did you mean `{s}`?)")).unwrap_or_default(),
        valid.join(", ")
    )]
    UnknownFormat {
        name: String,
        kind: String,
        valid: Vec<String>,
        suggestion: Option<String>,
    },

    #[error("invalid arguments to `{name}` on {kind}: {reason}")]
    InvalidFormatArgs {
        name: String,
        kind: String,
        reason: String,
    },

    #[error("format `{name}` is registered twice for {kind}")]
    DuplicateFormat { name: String, kind: String },

    #[error("schema `{name}` is not defined")]
    UnknownSchema { name: String },

    #[error("schema `{schema}` has no field tagged `primary`")]
    MissingPrimaryKey { schema: String },

    #[error("schema `{schema}` tags more than one primary field: {}", fields.join(", "))]
    AmbiguousPrimaryKey { schema: String, fields: Vec<String> },

    #[error("field `{field}` has kind {kind} which has no wire scalar")]
    UnmappableKind { field: String, kind: String },
}

impl CompileError {
    /// Stable snake_case name of the variant, used by fixtures and the CLI.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Lex { .. } => "lex",
            CompileError::Grammar { .. } => "grammar",
            CompileError::UnexpectedEof { .. } => "unexpected_eof",
            CompileError::UnbalancedClose { .. } => "unbalanced_close",
            CompileError::DuplicateDefinition { .. } => "duplicate_definition",
            CompileError::MissingBaseType { .. } => "missing_base_type",
            CompileError::UnresolvedType { .. } => "unresolved_type",
            CompileError::UnknownFormat { .. } => "unknown_format",
            CompileError::InvalidFormatArgs { .. } => "invalid_format_args",
            CompileError::DuplicateFormat { .. } => "duplicate_format",
            CompileError::UnknownSchema { .. } => "unknown_schema",
            CompileError::MissingPrimaryKey { .. } => "missing_primary_key",
            CompileError::AmbiguousPrimaryKey { .. } => "ambiguous_primary_key",
            CompileError::UnmappableKind { .. } => "unmappable_kind",
        }
    }
}

fn fmt_kinds(kinds: &[TokenKind]) -> String {
    kinds
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
