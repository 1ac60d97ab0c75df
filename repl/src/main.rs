use anyhow::Result;
use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use lambda::{
    evaluate, is_normal_form, naive, parse, tokenize, Evaluation, EvaluationStrategy, ParseError,
    ReduceConfig,
};

mod repl;

use repl::Flow;

fn build_report(e: &ParseError) -> Report {
    Report::build(ReportKind::Error, (), e.span.start)
        .with_message(format!(
            "Parse error at line {}, column {}",
            e.line, e.column
        ))
        .with_label(
            Label::new(e.span.clone())
                .with_message(format!("{}", e.message.as_str().fg(Color::Red)))
                .with_color(Color::Red),
        )
        .finish()
}

type CommandResult<'a> = Result<(), (&'a str, ParseError)>;

struct Session {
    strategy: EvaluationStrategy,
    config: ReduceConfig,
    history: Option<String>,
}

impl Session {
    fn tokenize(input: &str) {
        for token in tokenize(input) {
            println!(
                "{}:{}\t{:?}\t{:?}",
                token.line, token.column, token.kind, token.text
            );
        }
    }

    fn parse(input: &str) -> CommandResult {
        let term = parse(input).map_err(|e| (input, e))?;
        println!("{term}");
        Ok(())
    }

    fn normal(input: &str) -> CommandResult {
        let term = parse(input).map_err(|e| (input, e))?;
        println!("{}", is_normal_form(&term));
        Ok(())
    }

    fn step(input: &str) -> CommandResult {
        let term = parse(input).map_err(|e| (input, e))?;
        match naive::reduce_step(&term) {
            Some(next) => println!("{next}"),
            None => println!("{term}\n-- already in normal form"),
        }
        Ok(())
    }

    fn show(evaluation: &Evaluation) {
        println!("{}", evaluation.term);
        println!("-- {} steps", evaluation.steps);
        if let Some(stats) = &evaluation.stats {
            println!("-- {stats}");
        }
        if !evaluation.normal {
            println!("-- not in normal form");
        }
    }

    fn run<'i>(&self, input: &'i str, strategy: EvaluationStrategy) -> CommandResult<'i> {
        let term = parse(input).map_err(|e| (input, e))?;
        Self::show(&evaluate(&term, strategy, &self.config));
        Ok(())
    }

    fn set(&mut self, input: &str) {
        let (key, value) = input.trim().split_once(' ').unwrap_or((input.trim(), ""));
        let value = value.trim();
        match key {
            "strategy" => match value.parse() {
                Ok(strategy) => self.strategy = strategy,
                Err(e) => eprintln!("{e}"),
            },
            "steps" => match value.parse() {
                Ok(steps) => self.config.max_steps = steps,
                Err(e) => eprintln!("Invalid step budget `{value}`: {e}"),
            },
            "depth" => match value.parse() {
                Ok(depth) => self.config.max_depth = depth,
                Err(e) => eprintln!("Invalid depth budget `{value}`: {e}"),
            },
            "" => {}
            _ => eprintln!("Unknown setting {key}"),
        }
        println!(
            "strategy = {}, steps = {}, depth = {}",
            self.strategy, self.config.max_steps, self.config.max_depth
        );
    }

    fn show_help() {
        println!(
            "{}",
            r#"
term                    -- same as :eval term
:tokenize   term        -- show the tokens of the term
:parse      term        -- show the parsed term
:normal     term        -- tell whether the term is in normal form
:step       term        -- show one normal-order reduction step
:naive      term        -- reduce in normal order
:graph      term        -- reduce on the shared graph, with statistics
:eval       term        -- reduce with the current strategy
:set strategy naive|graph
:set steps  n           -- beta reductions allowed per evaluation
:set depth  n           -- recursion allowed in graph reduction
:help                   -- show this message
:quit                   -- leave
        "#
            .trim()
        );
    }

    fn handle_repl_input<'i>(&mut self, input: &'i str) -> CommandResult<'i> {
        let (cmd, input) = if let Some(stripped) = input.strip_prefix(':') {
            stripped
                .trim_start()
                .split_once(' ')
                .unwrap_or((stripped, ""))
        } else {
            ("", input)
        };
        match cmd {
            "to" | "tokenize" => Self::tokenize(input),
            "p" | "parse" => Self::parse(input)?,
            "n" | "normal" => Self::normal(input)?,
            "s" | "step" => Self::step(input)?,
            "naive" => self.run(input, EvaluationStrategy::NormalOrder)?,
            "graph" => self.run(input, EvaluationStrategy::EagerFunctionFirst)?,
            "" | "e" | "eval" => self.run(input, self.strategy)?,
            "set" => self.set(input),
            "h" | "help" => Self::show_help(),
            _ => {
                eprintln!("Unknown command {cmd}");
                Self::show_help();
            }
        }
        Ok(())
    }
}

impl repl::Repl for Session {
    type Error = anyhow::Error;

    fn prompt(&self) -> String {
        match self.strategy {
            EvaluationStrategy::NormalOrder => "λ naive> ".to_string(),
            EvaluationStrategy::EagerFunctionFirst => "λ graph> ".to_string(),
        }
    }

    fn history(&self) -> Option<&str> {
        self.history.as_deref()
    }

    fn evaluate(&mut self, input: &str) -> Result<Flow, Self::Error> {
        if matches!(input.trim(), ":q" | ":quit") {
            return Ok(Flow::Quit);
        }
        if let Err((input, e)) = self.handle_repl_input(input) {
            build_report(&e).eprint(Source::from(input))?;
        }
        Ok(Flow::Continue)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let session = Session {
        strategy: EvaluationStrategy::default(),
        config: ReduceConfig::default(),
        // an empty value turns history off
        history: match std::env::var("LAMBDA_HISTORY") {
            Ok(path) if path.is_empty() => None,
            Ok(path) => Some(path),
            Err(_) => Some("/tmp/lambda.history".to_string()),
        },
    };
    println!("Untyped lambda calculus. :h to show help");
    println!();
    repl::start(session)?;
    Ok(())
}
