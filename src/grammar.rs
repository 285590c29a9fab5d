//! Compilation-unit parser: dispatches `type` and `schema` declarations to
//! their grammars and collects them into a [`SyntaxUnit`].
pub mod schema_def;
pub mod type_def;

use crate::ast::SyntaxUnit;
use crate::error::{CompileError, Result};
use crate::lexer::TokenKind;
use crate::machine::{TokenStream, unexpected};

pub fn parse_unit(src: &str) -> Result<SyntaxUnit> {
    let mut tokens = TokenStream::new(src);
    let mut unit = SyntaxUnit::default();

    while let Some(token) = tokens.next_significant()? {
        match token.kind {
            TokenKind::TypeDef => {
                let node = type_def::parse(&mut tokens)?;
                ensure_unique(&unit, &node.name)?;
                tracing::debug!(name = %node.name, descriptors = ?node.descriptors, "parsed type");
                unit.types.insert(node.name.clone(), node);
            }
            TokenKind::SchemaDef => {
                let node = schema_def::parse(&mut tokens)?;
                ensure_unique(&unit, &node.name)?;
                tracing::debug!(name = %node.name, props = node.props.len(), scopes = node.scopes.len(), "parsed schema");
                unit.schemas.insert(node.name.clone(), node);
            }
            TokenKind::EndLine => continue,
            TokenKind::CloseCurly => {
                return Err(CompileError::UnbalancedClose { line: token.line, col: token.col });
            }
            _ => return Err(unexpected(&token, &[TokenKind::TypeDef, TokenKind::SchemaDef])),
        }
    }
    Ok(unit)
}

fn ensure_unique(unit: &SyntaxUnit, name: &str) -> Result<()> {
    if unit.types.contains_key(name) || unit.schemas.contains_key(name) {
        return Err(CompileError::DuplicateDefinition { name: name.to_string() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_declaration() {
        let unit = parse_unit("type id (string);").unwrap();
        assert_eq!(unit.types.len(), 1);
        assert_eq!(unit.types["id"].descriptors, vec!["string"]);
    }

    #[test]
    fn several_declarations_in_a_row() {
        let unit = parse_unit(
            "// leading comment
            type a (string);
            type b (a, max(3))
            schema S { x: (b); }
            schema T { y: (a); };
            type c (int);",
        )
        .unwrap();
        assert_eq!(unit.types.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(unit.schemas.keys().collect::<Vec<_>>(), vec!["S", "T"]);
        assert_eq!(unit.types["b"].descriptors, vec!["a"]);
        assert_eq!(unit.types["b"].formats[0].args, vec!["3"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = parse_unit("type a (string); schema a { x: (string); }").unwrap_err();
        assert_eq!(err, CompileError::DuplicateDefinition { name: "a".into() });
    }

    #[test]
    fn extra_closing_brace_is_unbalanced() {
        let err = parse_unit("schema A { x: (string); } }").unwrap_err();
        assert!(matches!(err, CompileError::UnbalancedClose { .. }));
    }

    #[test]
    fn stray_top_level_token() {
        let err = parse_unit("name: (string);").unwrap_err();
        assert!(matches!(err, CompileError::Grammar { found: TokenKind::PropIdentifier, .. }));
    }
}
