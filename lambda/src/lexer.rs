use chumsky::prelude::*;

use crate::prelude::*;

#[derive(PartialEq, Eq, Hash, Clone, derive_more::Display, Debug)]
pub enum TokenKind {
    #[display(fmt = "{_0}")]
    Variable(Identifier),
    #[display(fmt = "\\")]
    Lambda,
    #[display(fmt = ".")]
    Dot,
    #[display(fmt = "(")]
    LParen,
    #[display(fmt = ")")]
    RParen,
    #[display(fmt = "{_0}")]
    Error(char),
    #[display(fmt = "end of input")]
    Eof,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    /// The source text the token was read from, e.g. `λ` or `\` for a lambda.
    pub text: String,
    pub span: Span,
    /// 1-based.
    pub line: usize,
    /// 1-based, counted in characters.
    pub column: usize,
}

fn lexer() -> impl SimpleParser<char, Vec<(TokenKind, Span)>> {
    let variable = filter(char::is_ascii_lowercase)
        .chain(filter(char::is_ascii_digit).repeated())
        .collect::<String>()
        .map(|name| TokenKind::Variable(Identifier::new(name)));
    let symbols = choice((
        one_of("\\λ").to(TokenKind::Lambda),
        just('.').to(TokenKind::Dot),
        just('(').to(TokenKind::LParen),
        just(')').to(TokenKind::RParen),
    ));
    let unknown = any().map(TokenKind::Error);
    let token = choice((variable, symbols, unknown)).map_with_span(|kind, span| (kind, span));

    let whitespace = filter(|c: &char| c.is_whitespace()).ignored();
    let comment = just('#')
        .then(filter(|c: &char| *c != '\n').repeated())
        .ignored();
    let trivia = whitespace.or(comment).repeated();

    trivia
        .clone()
        .ignore_then(token.then_ignore(trivia).repeated())
        .then_ignore(end())
}

/// `(line, column)` of every character, plus one entry for the end of input.
fn positions(chars: &[char]) -> Vec<(usize, usize)> {
    let mut ret = Vec::with_capacity(chars.len() + 1);
    let (mut line, mut column) = (1, 1);
    for c in chars {
        ret.push((line, column));
        if *c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    ret.push((line, column));
    ret
}

/// Splits `source` into tokens. Never fails: unrecognized characters become
/// `TokenKind::Error` tokens, and the result always ends with one `Eof`.
pub fn tokenize(source: &str) -> Vec<Token> {
    let chars = source.chars().collect::<Vec<_>>();
    let positions = positions(&chars);
    // Every character is accepted by the `Error` fallback, so this cannot fail.
    let lexemes = lexer().parse(source).unwrap_or_default();
    let mut tokens = lexemes
        .into_iter()
        .map(|(kind, span)| {
            let (line, column) = positions[span.start];
            Token {
                kind,
                text: chars[span.clone()].iter().collect(),
                span,
                line,
                column,
            }
        })
        .collect::<Vec<_>>();
    let (line, column) = positions[chars.len()];
    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        span: chars.len()..chars.len() + 1,
        line,
        column,
    });
    tokens
}
