//! `schema Name { ... }` with scopes (`:@scope { }`) and nested sub-schemas
//! (`:Nested { }`) to any depth.
//!
//! Nesting is an explicit stack of owned frames. Opening a scope or nested
//! schema pushes a frame; its closing brace pops the frame and attaches the
//! finished node to whatever is now on top (or to the root block).
use once_cell::sync::Lazy;

use crate::ast::{Prop, SchemaDefNode, TypeDefNode};
use crate::error::{CompileError, Result};
use crate::lexer::{Token, TokenKind, TokenValue};
use crate::machine::{self, Flow, Handler, Step, TokenStream, TransitionTable, unexpected};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Scope,
    Nested,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    node: SchemaDefNode,
}

#[derive(Debug, Default)]
pub struct SchemaState {
    frames: Vec<Frame>,
    root_open: bool,
    awaiting_open: bool,
    in_parens: bool,
    last_property: Option<String>,
}

impl SchemaState {
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

fn current<'a>(state: &'a mut SchemaState, root: &'a mut SchemaDefNode) -> &'a mut SchemaDefNode {
    match state.frames.last_mut() {
        Some(frame) => &mut frame.node,
        None => root,
    }
}

fn last_field<'a>(
    state: &'a mut SchemaState,
    root: &'a mut SchemaDefNode,
    token: &Token,
) -> Result<&'a mut TypeDefNode> {
    let Some(prop) = state.last_property.clone() else {
        return Err(unexpected(token, &[TokenKind::PropIdentifier]));
    };
    match current(state, root).props.get_mut(&prop) {
        Some(Prop::Field(node)) => Ok(node),
        _ => Err(unexpected(token, &[TokenKind::PropIdentifier])),
    }
}

/// Props, nested schemas and scopes share one namespace per frame, so no two
/// of them end up with the same qualified path.
fn name_taken(node: &SchemaDefNode, name: &str) -> bool {
    node.props.contains_key(name) || node.scopes.contains_key(name)
}

fn handle_identifier(state: &mut SchemaState, block: &mut SchemaDefNode, token: &Token) -> Result<Flow> {
    let value = token.value.as_text().to_string();
    if block.name.is_empty() && !state.root_open {
        block.name = value;
        state.awaiting_open = true;
    } else if state.in_parens {
        last_field(state, block, token)?.descriptors.push(value);
    } else {
        return Err(unexpected(token, &[TokenKind::PropIdentifier, TokenKind::CloseCurly]));
    }
    Ok(Flow::Continue)
}

fn handle_open_curly(state: &mut SchemaState, _: &mut SchemaDefNode, token: &Token) -> Result<Flow> {
    if !state.awaiting_open {
        return Err(unexpected(token, &[TokenKind::Comma, TokenKind::CloseParen]));
    }
    state.awaiting_open = false;
    state.root_open = true;
    Ok(Flow::Continue)
}

fn handle_prop_identifier(state: &mut SchemaState, block: &mut SchemaDefNode, token: &Token) -> Result<Flow> {
    let name = token.value.as_text().to_string();
    let node = current(state, block);
    if name_taken(node, &name) {
        return Err(CompileError::DuplicateDefinition { name: format!("{}.{name}", node.name) });
    }
    node.props.insert(name.clone(), Prop::Field(TypeDefNode::named(name.as_str())));
    state.last_property = Some(name);
    Ok(Flow::Continue)
}

fn handle_open_paren(state: &mut SchemaState, _: &mut SchemaDefNode, _: &Token) -> Result<Flow> {
    state.in_parens = true;
    Ok(Flow::Continue)
}

fn handle_close_paren(state: &mut SchemaState, _: &mut SchemaDefNode, token: &Token) -> Result<Flow> {
    if !state.in_parens {
        return Err(unexpected(token, &[TokenKind::OpenCurly]));
    }
    state.in_parens = false;
    Ok(Flow::Continue)
}

fn handle_format(state: &mut SchemaState, block: &mut SchemaDefNode, token: &Token) -> Result<Flow> {
    if let TokenValue::Format(call) = &token.value {
        last_field(state, block, token)?.formats.push(call.clone());
    }
    Ok(Flow::Continue)
}

fn open_frame(state: &mut SchemaState, kind: FrameKind, token: &Token) -> Result<Flow> {
    state.frames.push(Frame { kind, node: SchemaDefNode::named(token.value.as_text()) });
    state.awaiting_open = true;
    state.last_property = None;
    Ok(Flow::Continue)
}

fn handle_scope_directive(state: &mut SchemaState, _: &mut SchemaDefNode, token: &Token) -> Result<Flow> {
    open_frame(state, FrameKind::Scope, token)
}

fn handle_nested_schema(state: &mut SchemaState, _: &mut SchemaDefNode, token: &Token) -> Result<Flow> {
    open_frame(state, FrameKind::Nested, token)
}

fn handle_close_curly(state: &mut SchemaState, block: &mut SchemaDefNode, token: &Token) -> Result<Flow> {
    if !state.root_open {
        return Err(CompileError::UnbalancedClose { line: token.line, col: token.col });
    }
    state.last_property = None;
    let Some(frame) = state.frames.pop() else {
        // the root block itself just closed
        state.root_open = false;
        return Ok(Flow::Finish);
    };
    let parent = current(state, block);
    let name = frame.node.name.clone();
    if name_taken(parent, &name) {
        return Err(CompileError::DuplicateDefinition { name: format!("{}.{name}", parent.name) });
    }
    match frame.kind {
        FrameKind::Scope => {
            parent.scopes.insert(name, frame.node);
        }
        FrameKind::Nested => {
            parent.props.insert(name, Prop::Nested(frame.node));
        }
    }
    Ok(Flow::Continue)
}

pub static TABLE: Lazy<TransitionTable<SchemaState, SchemaDefNode>> = Lazy::new(|| {
    use TokenKind::*;
    fn on(h: Handler<SchemaState, SchemaDefNode>) -> Option<Handler<SchemaState, SchemaDefNode>> {
        Some(h)
    }
    const MEMBER: &[TokenKind] = &[PropIdentifier, ScopeDirective, NestedSchema, CloseCurly];
    TransitionTable::new([
        (SchemaDef, Step { handler: None, next: &[Identifier] }),
        (Identifier, Step { handler: on(handle_identifier), next: &[OpenCurly, Comma, CloseParen] }),
        (OpenCurly, Step { handler: on(handle_open_curly), next: MEMBER }),
        (PropIdentifier, Step { handler: on(handle_prop_identifier), next: &[OpenParen] }),
        (OpenParen, Step { handler: on(handle_open_paren), next: &[Identifier, Format] }),
        (Comma, Step { handler: None, next: &[Identifier, Format, CloseParen] }),
        (Format, Step { handler: on(handle_format), next: &[Comma, CloseParen] }),
        (CloseParen, Step { handler: on(handle_close_paren), next: &[EndLine] }),
        (EndLine, Step { handler: None, next: MEMBER }),
        (ScopeDirective, Step { handler: on(handle_scope_directive), next: &[OpenCurly] }),
        (NestedSchema, Step { handler: on(handle_nested_schema), next: &[OpenCurly] }),
        (
            CloseCurly,
            Step {
                handler: on(handle_close_curly),
                next: &[PropIdentifier, ScopeDirective, NestedSchema, CloseCurly, EndLine],
            },
        ),
    ])
    .unwrap_or_else(|e| panic!("schema grammar: {e}"))
});

/// Parse one `schema` declaration; the `schema` keyword has already been read.
pub fn parse(tokens: &mut TokenStream<'_>) -> Result<SchemaDefNode> {
    let mut state = SchemaState::default();
    let node = machine::drive(tokens, &TABLE, TokenKind::SchemaDef, &mut state, SchemaDefNode::default())?;
    debug_assert_eq!(state.depth(), 0);
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(src: &str) -> Result<SchemaDefNode> {
        let mut tokens = TokenStream::new(src);
        let kw = tokens.next_significant().unwrap().unwrap();
        assert_eq!(kw.kind, TokenKind::SchemaDef);
        parse(&mut tokens)
    }

    #[test]
    fn props_land_on_the_root() {
        let node = parse_str("schema Basic { name: (customString, min(2)); age: (int); }").unwrap();
        assert_eq!(node.name, "Basic");
        assert_eq!(node.props.keys().collect::<Vec<_>>(), vec!["name", "age"]);
        let name = node.field_in(&[], "name").unwrap();
        assert_eq!(name.descriptors, vec!["customString"]);
        assert_eq!(name.formats[0].name, "min");
    }

    #[test]
    fn scopes_nest_and_pop_back_to_the_parent() {
        let node = parse_str(
            "schema S {
                top: (string);
                :@outer {
                    a: (string);
                    :@inner { b: (int); }
                    c: (boolean);
                }
                after: (number);
            }",
        )
        .unwrap();
        assert_eq!(node.props.keys().collect::<Vec<_>>(), vec!["top", "after"]);
        assert!(node.field_in(&["outer"], "a").is_some());
        assert!(node.field_in(&["outer"], "c").is_some());
        assert!(node.field_in(&["outer", "inner"], "b").is_some());
        assert!(node.field_in(&["outer"], "b").is_none());
    }

    #[test]
    fn nested_schema_becomes_a_prop() {
        let node = parse_str("schema S { :address { street: (string); } zip: (string); }").unwrap();
        let Some(Prop::Nested(address)) = node.props.get("address") else {
            panic!("address should be nested");
        };
        assert!(address.props.contains_key("street"));
        assert!(node.props.contains_key("zip"));
    }

    #[test]
    fn finishes_at_the_root_brace_and_leaves_the_rest() {
        let mut tokens = TokenStream::new("schema A { x: (string); } type t (string);");
        tokens.next_significant().unwrap();
        parse(&mut tokens).unwrap();
        let next = tokens.next_significant().unwrap().unwrap();
        assert_eq!(next.kind, TokenKind::TypeDef);
    }

    #[test]
    fn stray_open_brace_is_rejected() {
        let err = parse_str("schema A { x: (string { ); }").unwrap_err();
        assert!(matches!(err, CompileError::Grammar { found: TokenKind::OpenCurly, .. }));
    }

    #[test]
    fn duplicate_property_is_rejected() {
        let err = parse_str("schema A { x: (string); x: (int); }").unwrap_err();
        assert_eq!(err, CompileError::DuplicateDefinition { name: "A.x".into() });
    }

    #[test]
    fn scope_and_nested_schema_cannot_share_a_name() {
        let err = parse_str("schema S { :x { f: (string, private); } :@x { f: (string); } }").unwrap_err();
        assert_eq!(err, CompileError::DuplicateDefinition { name: "S.x".into() });

        let err = parse_str("schema S { :@x { f: (string); } :x { f: (string); } }").unwrap_err();
        assert_eq!(err, CompileError::DuplicateDefinition { name: "S.x".into() });

        let err = parse_str("schema S { :@x { f: (string); } x: (int); }").unwrap_err();
        assert_eq!(err, CompileError::DuplicateDefinition { name: "S.x".into() });
    }

    #[test]
    fn missing_close_is_an_eof_error() {
        let err = parse_str("schema A { :@s { x: (string); }").unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedEof { .. }));
    }
}
