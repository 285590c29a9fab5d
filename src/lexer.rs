//! Token grammar for Stone plus the rule-driven scanner that runs it.
//!
//! Scanning contract:
//! - every rule is tried at the current offset; the longest match wins
//! - ties go to the rule declared first (so `type` is a keyword, `types` is not)
//! - line/col advance across embedded newlines
//! - whitespace and comments come out as tokens; grammars skip them explicitly
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::ast::FormatCall;
use crate::error::{CompileError, Result};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TokenKind {
    Whitespace,
    Comment,
    OpenParen,
    CloseParen,
    OpenCurly,
    CloseCurly,
    Comma,
    EndLine,
    TypeDef,
    SchemaDef,
    ScopeDirective,
    Format,
    PropIdentifier,
    NestedSchema,
    Identifier,
    Regex,
    Number,
    Str,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::Comment => "comment",
            TokenKind::OpenParen => "`(`",
            TokenKind::CloseParen => "`)`",
            TokenKind::OpenCurly => "`{`",
            TokenKind::CloseCurly => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::EndLine => "`;`",
            TokenKind::TypeDef => "`type`",
            TokenKind::SchemaDef => "`schema`",
            TokenKind::ScopeDirective => "scope directive",
            TokenKind::Format => "format call",
            TokenKind::PropIdentifier => "property name",
            TokenKind::NestedSchema => "nested schema",
            TokenKind::Identifier => "identifier",
            TokenKind::Regex => "regex literal",
            TokenKind::Number => "number",
            TokenKind::Str => "string literal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenValue {
    Text(String),
    Format(FormatCall),
}

impl TokenValue {
    pub fn as_text(&self) -> &str {
        match self {
            TokenValue::Text(s) => s,
            TokenValue::Format(call) => &call.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub text: String,
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

type Transform = fn(&str) -> TokenValue;

pub struct Rule {
    pub kind: TokenKind,
    pattern: Regex,
    transform: Option<Transform>,
}

impl Rule {
    fn new(kind: TokenKind, pattern: &str, transform: Option<Transform>) -> Self {
        let anchored = format!("^(?:{pattern})");
        // rule patterns are literals in this file; a bad one is a programming error
        let pattern = Regex::new(&anchored).unwrap_or_else(|e| panic!("bad {kind} rule: {e}"));
        Self { kind, pattern, transform }
    }

    fn match_len(&self, rest: &str) -> Option<usize> {
        self.pattern.find(rest).map(|m| m.end()).filter(|&n| n > 0)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RULES
// ————————————————————————————————————————————————————————————————————————————

const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*";

/// Ordered rule table; declaration order is the tie-breaker.
pub static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use TokenKind::*;
    vec![
        Rule::new(Whitespace, r"\s+", None),
        Rule::new(Comment, r"//[^\n]*", None),
        Rule::new(OpenParen, r"\(", None),
        Rule::new(CloseParen, r"\)", None),
        Rule::new(OpenCurly, r"\{", None),
        Rule::new(CloseCurly, r"\}", None),
        Rule::new(Comma, r",", None),
        Rule::new(EndLine, r";", None),
        // keywords
        Rule::new(TypeDef, "type", None),
        Rule::new(SchemaDef, "schema", None),
        // directives
        Rule::new(ScopeDirective, &format!(":@{IDENT}"), Some(|s| TokenValue::Text(s[2..].to_string()))),
        // string and regex literals inside the parens may carry `)`
        Rule::new(
            Format,
            &format!(r#"{IDENT}\((?:/(?:\\.|[^/\\\n])*/[gimsuy]*|"(?:\\.|[^"\\\n])*"|[^)"/])*\)"#),
            Some(|s| TokenValue::Format(parse_format_call(s))),
        ),
        Rule::new(PropIdentifier, &format!("{IDENT}:"), Some(|s| TokenValue::Text(s[..s.len() - 1].to_string()))),
        Rule::new(NestedSchema, &format!(":{IDENT}"), Some(|s| TokenValue::Text(s[1..].to_string()))),
        Rule::new(Identifier, IDENT, None),
        Rule::new(Regex, r"/(?:\\.|[^/\\\n])*/[gimsuy]*", None),
        Rule::new(Number, r"-?[0-9]+(?:\.[0-9]+)?", None),
        Rule::new(Str, r#""(?:\\.|[^"\\\n])*""#, Some(unquote)),
    ]
});

fn unquote(s: &str) -> TokenValue {
    let inner = serde_json::from_str::<String>(s).unwrap_or_else(|_| s[1..s.len() - 1].to_string());
    TokenValue::Text(inner)
}

/// `name(a, b)` → `FormatCall { name, args }`.
pub fn parse_format_call(text: &str) -> FormatCall {
    let open = text.find('(').unwrap_or(text.len());
    let name = text[..open].to_string();
    let inner = text
        .get(open + 1..text.len().saturating_sub(1))
        .unwrap_or_default();
    FormatCall { name, args: split_args(inner) }
}

/// Split on top-level commas. Commas inside a `/regex/`, a quoted string, or a
/// JSON bracket pair belong to the argument.
pub fn split_args(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut in_regex = false;
    let mut escaped = false;
    let mut depth: usize = 0;

    for c in raw.chars() {
        if escaped {
            escaped = false;
            current.push(c);
            continue;
        }
        match c {
            '\\' if in_string || in_regex => escaped = true,
            '"' if !in_regex => in_string = !in_string,
            '/' if !in_string && in_regex => in_regex = false,
            '/' if !in_string && current.trim().is_empty() => in_regex = true,
            '{' | '[' if !in_string && !in_regex => depth += 1,
            '}' | ']' if !in_string && !in_regex => depth = depth.saturating_sub(1),
            ',' if !in_string && !in_regex && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    args.push(current.trim().to_string());
    args
}

// ————————————————————————————————————————————————————————————————————————————
// SCANNER
// ————————————————————————————————————————————————————————————————————————————

/// One scanning session over one source text. Build a new one per compilation.
pub struct Lexer<'src> {
    src: &'src str,
    rules: &'static [Rule],
    offset: usize,
    line: usize,
    col: usize,
    failed: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self { src, rules: &RULES, offset: 0, line: 1, col: 1, failed: false }
    }

    fn longest_match(&self) -> Option<(&'static Rule, usize)> {
        let rest = &self.src[self.offset..];
        let mut best: Option<(&'static Rule, usize)> = None;
        for rule in self.rules {
            if let Some(len) = rule.match_len(rest) {
                // strictly longer only: earlier rules keep ties
                if best.is_none_or(|(_, n)| len > n) {
                    best = Some((rule, len));
                }
            }
        }
        best
    }

    fn advance(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.offset += text.len();
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.src.len() {
            return None;
        }
        let Some((rule, len)) = self.longest_match() else {
            self.failed = true;
            let snippet: String = self.src[self.offset..].chars().take(16).collect();
            return Some(Err(CompileError::Lex {
                offset: self.offset,
                line: self.line,
                col: self.col,
                snippet,
            }));
        };
        let text = &self.src[self.offset..self.offset + len];
        let value = match rule.transform {
            Some(transform) => transform(text),
            None => TokenValue::Text(text.to_string()),
        };
        let token = Token {
            kind: rule.kind,
            value,
            text: text.to_string(),
            offset: self.offset,
            line: self.line,
            col: self.col,
        };
        self.advance(text);
        Some(Ok(token))
    }
}

/// Scan the whole input, trivia included.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    Lexer::new(src).collect()
}

// ------------------------------- Tests ------------------------------------ //
