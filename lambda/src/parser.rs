use chumsky::{prelude::*, Stream};
use thiserror::Error;

use crate::{
    lexer::{tokenize, Token, TokenKind},
    prelude::*,
    term::{variable_id, Term},
};

#[derive(PartialEq, Eq, Clone, Debug, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// Characters of the offending token.
    pub span: Span,
}

impl ParseError {
    fn at(token: &Token, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: token.line,
            column: token.column,
            span: token.span.clone(),
        }
    }
}

//   term   := lambda | app
//   lambda := LAMBDA VAR DOT term
//   app    := atom atom*
//   atom   := VAR | LPAREN term RPAREN
fn term_parser() -> impl SimpleParser<TokenKind, Term> {
    recursive(|term: Recursive<_, Term, _>| {
        let variable = select! { TokenKind::Variable(name) => name }
            .try_map(|name, span| {
                variable_id(&name)
                    .ok_or_else(|| Error::custom(span, format!("Variable {name} is out of range")))
            })
            .labelled("variable");

        let atom = choice((
            variable.clone().map(Term::Variable),
            term.clone()
                .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen)),
        ))
        .labelled("atom");

        // f x y = (f x) y
        let app = atom
            .clone()
            .then(atom.repeated())
            .foldl(|lhs, rhs| Term::Application(lhs.into(), rhs.into()))
            .labelled("application");

        let lambda = just(TokenKind::Lambda)
            .ignore_then(variable)
            .then_ignore(just(TokenKind::Dot))
            .then(term.refcounted())
            .map(|(var, body)| Term::Abstraction(var, body))
            .labelled("abstraction");

        choice((lambda, app))
    })
    .labelled("term")
}

fn describe(e: &Error<TokenKind>) -> String {
    use chumsky::error::SimpleReason;
    match e.reason() {
        SimpleReason::Custom(msg) => msg.clone(),
        SimpleReason::Unclosed { delimiter, .. } => format!("Unclosed delimiter {delimiter}"),
        SimpleReason::Unexpected => {
            if let Some(TokenKind::Error(c)) = e.found() {
                return format!("Unrecognized character {c:?}");
            }
            let found = e
                .found()
                .map(ToString::to_string)
                .unwrap_or_else(|| "end of input".to_string());
            let expected = e
                .expected()
                .map(|t| {
                    t.as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "end of input".to_string())
                })
                .collect::<Vec<_>>();
            let expected = if expected.is_empty() {
                e.label().unwrap_or("something else").to_string()
            } else {
                expected.join(", ")
            };
            format!("Unexpected {found}, expected {expected}")
        }
    }
}

/// Parses a token sequence as produced by [`tokenize`]. The sequence need not
/// carry the trailing `Eof`; one is assumed after the last token.
pub fn parse_tokens(tokens: &[Token]) -> Result<Term, ParseError> {
    let eof = match tokens.iter().find(|t| t.kind == TokenKind::Eof) {
        Some(eof) => eof.clone(),
        None => {
            let (line, column, start) = tokens
                .last()
                .map(|t| (t.line, t.column + t.text.chars().count(), t.span.end))
                .unwrap_or((1, 1, 0));
            Token {
                kind: TokenKind::Eof,
                text: String::new(),
                span: start..start + 1,
                line,
                column,
            }
        }
    };
    let tokens = tokens
        .iter()
        .take_while(|t| t.kind != TokenKind::Eof)
        .collect::<Vec<_>>();
    if tokens.is_empty() {
        return Err(ParseError::at(&eof, "Empty input"));
    }

    term_parser()
        .then_ignore(end())
        .parse(Stream::from_iter(
            eof.span.clone(),
            tokens.iter().map(|t| (t.kind.clone(), t.span.clone())),
        ))
        .map_err(|es| {
            // the first error is the one closest to where parsing stopped
            let e = es
                .into_iter()
                .next()
                .unwrap_or_else(|| Error::custom(eof.span.clone(), "Invalid term"));
            let at = tokens
                .iter()
                .find(|t| t.span.start == e.span().start)
                .copied()
                .unwrap_or(&eof);
            ParseError::at(at, describe(&e))
        })
}

pub fn parse(source: &str) -> Result<Term, ParseError> {
    parse_tokens(&tokenize(source))
}
