use thiserror::Error;

use crate::{
    graph::{self, GraphStats},
    naive,
    term::Term,
};

pub const DEFAULT_MAX_STEPS: usize = 1000;
pub const DEFAULT_MAX_DEPTH: usize = 1024;

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ReduceConfig {
    /// Beta reductions allowed before the partially reduced term is returned.
    pub max_steps: usize,
    /// Nesting allowed in the graph reducer's recursion.
    pub max_depth: usize,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Default, derive_more::Display, Debug)]
pub enum EvaluationStrategy {
    /// Leftmost-outermost, one step at a time on the tree.
    #[default]
    #[display(fmt = "normal-order")]
    NormalOrder,
    /// Function side normalized first, on the hash-consed graph.
    #[display(fmt = "eager-function-first")]
    EagerFunctionFirst,
}

#[derive(PartialEq, Eq, Clone, Debug, Error)]
#[error("Unknown strategy `{0}`, expected `naive` or `graph`")]
pub struct UnknownStrategy(String);

impl std::str::FromStr for EvaluationStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naive" | "normal" | "normal-order" => Ok(Self::NormalOrder),
            "graph" | "eager" | "eager-function-first" => Ok(Self::EagerFunctionFirst),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Evaluation {
    pub term: Term,
    /// Beta reductions performed.
    pub steps: usize,
    pub normal: bool,
    /// Only for `EagerFunctionFirst`.
    pub stats: Option<GraphStats>,
}

pub fn evaluate(term: &Term, strategy: EvaluationStrategy, config: &ReduceConfig) -> Evaluation {
    match strategy {
        EvaluationStrategy::NormalOrder => {
            let (term, steps) = naive::normalize(term, config.max_steps);
            Evaluation {
                normal: naive::is_normal_form(&term),
                term,
                steps,
                stats: None,
            }
        }
        EvaluationStrategy::EagerFunctionFirst => {
            let (term, stats) = graph::reduce(term, config);
            Evaluation {
                normal: naive::is_normal_form(&term),
                term,
                steps: stats.reductions,
                stats: Some(stats),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_from_str() {
        assert_eq!(
            "naive".parse::<EvaluationStrategy>(),
            Ok(EvaluationStrategy::NormalOrder)
        );
        assert_eq!(
            "graph".parse::<EvaluationStrategy>(),
            Ok(EvaluationStrategy::EagerFunctionFirst)
        );
        assert!("lazy".parse::<EvaluationStrategy>().is_err());
        assert_eq!(
            EvaluationStrategy::EagerFunctionFirst.to_string(),
            "eager-function-first"
        );
    }

    #[test]
    fn test_evaluate() {
        let term = parse("(\\x. x x) ((\\y.y) a)").unwrap();
        let config = ReduceConfig::default();

        let naive = evaluate(&term, EvaluationStrategy::NormalOrder, &config);
        assert_eq!(naive.term, parse("a a").unwrap());
        assert_eq!(naive.steps, 3);
        assert!(naive.normal);
        assert!(naive.stats.is_none());

        let graph = evaluate(&term, EvaluationStrategy::EagerFunctionFirst, &config);
        assert_eq!(graph.term, naive.term);
        assert_eq!(graph.steps, 2);
        assert!(graph.normal);
        assert!(graph.stats.is_some());
    }

    #[test]
    fn test_evaluate_exhausted() {
        let omega = parse("(\\x.x x) (\\x.x x)").unwrap();
        let config = ReduceConfig {
            max_steps: 10,
            ..ReduceConfig::default()
        };
        for strategy in [
            EvaluationStrategy::NormalOrder,
            EvaluationStrategy::EagerFunctionFirst,
        ] {
            let evaluation = evaluate(&omega, strategy, &config);
            assert!(!evaluation.normal, "{strategy}");
            assert!(evaluation.steps <= 10, "{strategy}");
        }
    }
}
