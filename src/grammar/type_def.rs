use once_cell::sync::Lazy;

use crate::ast::TypeDefNode;
use crate::error::Result;
use crate::lexer::{Token, TokenKind, TokenValue};
use crate::machine::{self, Flow, Handler, Step, TokenStream, TransitionTable, unexpected};

#[derive(Debug, Default)]
pub struct TypeState {
    opened: bool,
}

fn handle_identifier(state: &mut TypeState, block: &mut TypeDefNode, token: &Token) -> Result<Flow> {
    if block.name.is_empty() {
        block.name = token.value.as_text().to_string();
    } else if state.opened {
        block.descriptors.push(token.value.as_text().to_string());
    } else {
        return Err(unexpected(token, &[TokenKind::OpenParen]));
    }
    Ok(Flow::Continue)
}

fn handle_open_paren(state: &mut TypeState, _: &mut TypeDefNode, token: &Token) -> Result<Flow> {
    if state.opened {
        return Err(unexpected(token, &[TokenKind::Comma, TokenKind::CloseParen]));
    }
    state.opened = true;
    Ok(Flow::Continue)
}

fn handle_close_paren(state: &mut TypeState, _: &mut TypeDefNode, token: &Token) -> Result<Flow> {
    if !state.opened {
        return Err(unexpected(token, &[TokenKind::OpenParen]));
    }
    Ok(Flow::Continue)
}

fn handle_format(_: &mut TypeState, block: &mut TypeDefNode, token: &Token) -> Result<Flow> {
    if let TokenValue::Format(call) = &token.value {
        block.formats.push(call.clone());
    }
    Ok(Flow::Continue)
}

pub static TABLE: Lazy<TransitionTable<TypeState, TypeDefNode>> = Lazy::new(|| {
    use TokenKind::*;
    fn on(h: Handler<TypeState, TypeDefNode>) -> Option<Handler<TypeState, TypeDefNode>> {
        Some(h)
    }
    TransitionTable::new([
        (TypeDef, Step { handler: None, next: &[Identifier] }),
        (Identifier, Step { handler: on(handle_identifier), next: &[OpenParen, Comma, CloseParen] }),
        (OpenParen, Step { handler: on(handle_open_paren), next: &[Identifier, Format] }),
        (Comma, Step { handler: None, next: &[Identifier, Format, CloseParen] }),
        (Format, Step { handler: on(handle_format), next: &[Comma, CloseParen] }),
        (CloseParen, Step { handler: on(handle_close_paren), next: &[] }),
    ])
    .unwrap_or_else(|e| panic!("type grammar: {e}"))
});

/// Parse one `type` declaration; the `type` keyword has already been read.
pub fn parse(tokens: &mut TokenStream<'_>) -> Result<TypeDefNode> {
    let mut state = TypeState::default();
    machine::drive(tokens, &TABLE, TokenKind::TypeDef, &mut state, TypeDefNode::default())
}
