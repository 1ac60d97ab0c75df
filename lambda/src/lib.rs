//! Untyped lambda calculus: a lexer and parser for textual terms, a
//! normal-order tree reducer, and a hash-consing graph reducer that reduces
//! structurally identical subterms only once.
//!
//! ```text
//! source --tokenize--> [Token] --parse_tokens--> Term --naive::reduce / graph::reduce--> Term
//! ```

#[cfg(test)]
#[macro_use]
mod macros;

pub mod graph;
pub mod lexer;
pub mod naive;
pub mod parser;
pub mod prelude;
pub mod strategy;
pub mod term;

pub use graph::{GraphReducer, GraphStats};
pub use lexer::{tokenize, Token, TokenKind};
pub use naive::{is_normal_form, substitute};
pub use parser::{parse, parse_tokens, ParseError};
pub use strategy::{
    evaluate, EvaluationStrategy, Evaluation, ReduceConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_STEPS,
};
pub use term::{variable_id, variable_name, Term, VarId};

pub fn reduce_naive(term: &Term, max_steps: usize) -> Term {
    naive::reduce(term, max_steps)
}

pub fn reduce_graph(term: &Term, max_steps: usize) -> (Term, GraphStats) {
    let config = ReduceConfig {
        max_steps,
        ..ReduceConfig::default()
    };
    graph::reduce(term, &config)
}
