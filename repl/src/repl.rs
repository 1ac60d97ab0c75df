use rustyline::{error::ReadlineError, Editor};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error<E> {
    #[error(transparent)]
    Readline(#[from] ReadlineError),
    #[error("Session failed: {0:?}")]
    Session(E),
}

/// What the loop does after an input has been handled.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Flow {
    Continue,
    Quit,
}

pub trait Repl {
    type Error: std::fmt::Debug;
    /// Asked again before every input, so it can follow the session's settings.
    fn prompt(&self) -> String;
    fn history(&self) -> Option<&str> {
        None
    }
    fn evaluate(&mut self, input: &str) -> Result<Flow, Self::Error>;
}

/// One input, or `None` once the user interrupts. A line ending in `\`
/// continues on the next line, under a prompt of dots as wide as `prompt`.
fn read_input(editor: &mut Editor<()>, prompt: &str) -> Result<Option<String>, ReadlineError> {
    let continuation = format!("{} ", ".".repeat(prompt.trim_end().chars().count()));
    let mut input = String::new();
    let mut prompt = prompt;
    loop {
        match editor.readline(prompt) {
            Ok(line) => match line.strip_suffix('\\') {
                Some(head) => {
                    input.push_str(head);
                    input.push('\n');
                    prompt = &continuation;
                }
                None => {
                    input.push_str(&line);
                    return Ok(Some(input));
                }
            },
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(None),
            Err(e) => return Err(e),
        }
    }
}

pub fn start<R: Repl>(mut repl: R) -> Result<(), Error<R::Error>> {
    let mut editor = Editor::<()>::new();
    if let Some(history) = repl.history() {
        editor.load_history(history).ok();
    }
    while let Some(input) = read_input(&mut editor, &repl.prompt())? {
        if input.trim().is_empty() {
            continue;
        }
        editor.add_history_entry(input.as_str());
        if let Some(history) = repl.history() {
            editor.save_history(history)?;
        }
        if repl.evaluate(&input).map_err(Error::Session)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}
