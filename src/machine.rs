//! Transition-table driver shared by both grammars.
//!
//! The state is the kind of the last matched token. On each step the driver
//! reads the next significant token, checks it against the current state's
//! allowed-next list, makes it the current state, and then fires *that*
//! state's handler with the token that just matched. An empty allowed-next
//! list is terminal; a handler may also end the block early with
//! [`Flow::Finish`].
use indexmap::IndexMap;

use crate::error::{CompileError, Result};
use crate::lexer::{Lexer, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finish,
}

pub type Handler<S, B> = fn(&mut S, &mut B, &Token) -> Result<Flow>;

pub struct Step<S, B> {
    pub handler: Option<Handler<S, B>>,
    pub next: &'static [TokenKind],
}

pub struct TransitionTable<S, B> {
    steps: IndexMap<TokenKind, Step<S, B>>,
}

impl<S, B> TransitionTable<S, B> {
    /// Builds a table, refusing any `next` entry that names a kind the table
    /// does not define.
    pub fn new(steps: impl IntoIterator<Item = (TokenKind, Step<S, B>)>) -> Result<Self, String> {
        let steps: IndexMap<_, _> = steps.into_iter().collect();
        for (kind, step) in &steps {
            if let Some(missing) = step.next.iter().find(|k| !steps.contains_key(*k)) {
                return Err(format!("{kind} may be followed by {missing}, which has no entry"));
            }
        }
        Ok(Self { steps })
    }

    pub fn step(&self, kind: TokenKind) -> Option<&Step<S, B>> {
        self.steps.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = TokenKind> + '_ {
        self.steps.keys().copied()
    }
}

/// The lexer with trivia filtered out.
pub struct TokenStream<'src> {
    lexer: Lexer<'src>,
}

impl<'src> TokenStream<'src> {
    pub fn new(src: &'src str) -> Self {
        Self { lexer: Lexer::new(src) }
    }

    pub fn next_significant(&mut self) -> Result<Option<Token>> {
        for token in self.lexer.by_ref() {
            let token = token?;
            if !token.kind.is_trivia() {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }
}

pub fn unexpected(token: &Token, expected: &[TokenKind]) -> CompileError {
    CompileError::Grammar {
        line: token.line,
        col: token.col,
        found: token.kind,
        text: token.text.clone(),
        expected: expected.to_vec(),
    }
}

/// Walk `tokens` from `start` until a terminal state or a finishing handler.
pub fn drive<S, B>(
    tokens: &mut TokenStream<'_>,
    table: &TransitionTable<S, B>,
    start: TokenKind,
    state: &mut S,
    mut block: B,
) -> Result<B> {
    let mut current = start;
    loop {
        let Some(step) = table.step(current) else {
            return Err(CompileError::UnexpectedEof { expected: table.kinds().collect() });
        };
        if step.next.is_empty() {
            return Ok(block);
        }
        let Some(token) = tokens.next_significant()? else {
            return Err(CompileError::UnexpectedEof { expected: step.next.to_vec() });
        };
        if !step.next.contains(&token.kind) {
            return Err(unexpected(&token, step.next));
        }
        let Some(matched) = table.step(token.kind) else {
            return Err(unexpected(&token, step.next));
        };
        tracing::trace!(from = %current, to = %token.kind, text = %token.text, "transition");
        current = token.kind;
        if let Some(handler) = matched.handler {
            if handler(state, &mut block, &token)? == Flow::Finish {
                return Ok(block);
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
