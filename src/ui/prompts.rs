//! ui::prompts
//!
//! The interaction port: every question the engine asks goes through
//! [`Interaction::prompt_choice`].
//!
//! # Design
//!
//! The engine decides the message and the accepted answers; an
//! implementation only collects a raw line and lets [`Prompt::interpret`]
//! turn it into a [`Choice`]. Two implementations exist:
//!
//! - [`TerminalPrompt`] reads from a line-oriented reader (stdin in the CLI)
//! - [`ScriptedPrompt`] replays queued answers and keeps a transcript, so a
//!   whole multi-step dialog can be asserted in tests
//!
//! # Token conventions
//!
//! Tokens are matched case-insensitively. A capitalized token is the default
//! for an empty answer. `q` always means quit.
//!
//! ```
//! use branchwise::ui::prompts::{Choice, Prompt};
//!
//! let prompt = Prompt::tokens("Push feature to origin?", &["y", "N", "q"]);
//! assert_eq!(prompt.render(), "Push feature to origin? (y, N, q)");
//! assert_eq!(prompt.interpret(""), Choice::Token("n".into()));
//! assert_eq!(prompt.interpret("Y"), Choice::Token("y".into()));
//! assert_eq!(prompt.interpret("q"), Choice::Quit);
//! assert_eq!(prompt.interpret("maybe"), Choice::Invalid("maybe".into()));
//! ```

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("not in interactive mode; rerun with --yes to accept every proposal")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(String),
}

/// What a prompt accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accepted {
    /// A fixed token set such as `(y, N, q)`.
    Tokens(Vec<String>),
    /// A 1-based index into a listing of `count` entries.
    Index { count: usize },
}

/// A question put to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub message: String,
    pub accepted: Accepted,
}

/// Interpreted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// An accepted token, lowercased. For index prompts, the number as typed.
    Token(String),
    /// The operator asked to stop.
    Quit,
    /// Input that matches nothing; carries the raw answer.
    Invalid(String),
    /// Nobody could be asked: no terminal, or the question cannot be
    /// answered by `--yes`.
    Unanswered,
}

impl Prompt {
    pub fn tokens(message: impl Into<String>, tokens: &[&str]) -> Self {
        Self {
            message: message.into(),
            accepted: Accepted::Tokens(tokens.iter().map(|t| t.to_string()).collect()),
        }
    }

    pub fn index(message: impl Into<String>, count: usize) -> Self {
        Self {
            message: message.into(),
            accepted: Accepted::Index { count },
        }
    }

    /// Text shown to the operator.
    pub fn render(&self) -> String {
        match &self.accepted {
            Accepted::Tokens(tokens) => format!("{} ({})", self.message, tokens.join(", ")),
            Accepted::Index { .. } => self.message.clone(),
        }
    }

    /// The token chosen by an empty answer, if any.
    pub fn default_token(&self) -> Option<&str> {
        match &self.accepted {
            Accepted::Tokens(tokens) => tokens
                .iter()
                .find(|t| t.chars().next().is_some_and(char::is_uppercase))
                .map(String::as_str),
            Accepted::Index { .. } => None,
        }
    }

    /// Whether `token` (any case) is one of the accepted answers.
    pub fn accepts(&self, token: &str) -> bool {
        match &self.accepted {
            Accepted::Tokens(tokens) => tokens.iter().any(|t| t.eq_ignore_ascii_case(token)),
            Accepted::Index { .. } => false,
        }
    }

    /// Turn a raw answer into a [`Choice`].
    pub fn interpret(&self, raw: &str) -> Choice {
        let answer = raw.trim();
        match &self.accepted {
            Accepted::Tokens(tokens) => {
                let chosen = if answer.is_empty() {
                    match self.default_token() {
                        Some(default) => default.to_lowercase(),
                        None => return Choice::Invalid(raw.to_string()),
                    }
                } else {
                    answer.to_lowercase()
                };
                if !tokens.iter().any(|t| t.to_lowercase() == chosen) {
                    return Choice::Invalid(raw.to_string());
                }
                if chosen == "q" {
                    Choice::Quit
                } else {
                    Choice::Token(chosen)
                }
            }
            Accepted::Index { .. } => {
                if answer.eq_ignore_ascii_case("q") {
                    Choice::Quit
                } else if !answer.is_empty() && answer.chars().all(|c| c.is_ascii_digit()) {
                    Choice::Token(answer.to_string())
                } else {
                    Choice::Invalid(raw.to_string())
                }
            }
        }
    }
}

/// Source of answers for the engine's questions.
pub trait Interaction {
    fn prompt_choice(&mut self, prompt: &Prompt) -> Choice;

    /// Show a message that needs no answer (warnings, advice), in order with
    /// the prompts around it.
    fn notify(&mut self, message: &str);
}

/// Line-oriented prompt over a reader and a writer.
///
/// With `assume_yes`, prompts that accept `y` are answered without reading.
/// Without a terminal, every other prompt is [`Choice::Unanswered`].
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
    interactive: bool,
    assume_yes: bool,
}

impl TerminalPrompt<std::io::StdinLock<'static>, std::io::Stderr> {
    /// Prompt on stderr, read answers from stdin.
    pub fn stdio(interactive: bool, assume_yes: bool) -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr(), interactive, assume_yes)
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W, interactive: bool, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            interactive,
            assume_yes,
        }
    }

    fn ask(&mut self, prompt: &Prompt) -> Result<Choice, PromptError> {
        if self.assume_yes && prompt.accepts("y") {
            writeln!(self.output, "{} y", prompt.render())
                .map_err(|e| PromptError::IoError(e.to_string()))?;
            return Ok(Choice::Token("y".into()));
        }
        if !self.interactive {
            return Err(PromptError::NotInteractive);
        }

        write!(self.output, "{} ", prompt.render())
            .and_then(|_| self.output.flush())
            .map_err(|e| PromptError::IoError(e.to_string()))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| PromptError::IoError(e.to_string()))?;
        if read == 0 {
            // EOF
            return Ok(Choice::Quit);
        }
        Ok(prompt.interpret(&line))
    }
}

impl<R: BufRead, W: Write> Interaction for TerminalPrompt<R, W> {
    fn prompt_choice(&mut self, prompt: &Prompt) -> Choice {
        match self.ask(prompt) {
            Ok(choice) => choice,
            Err(err) => {
                tracing::debug!(%err, prompt = %prompt.message, "prompt left unanswered");
                Choice::Unanswered
            }
        }
    }

    fn notify(&mut self, message: &str) {
        if let Err(err) = writeln!(self.output, "{message}") {
            tracing::warn!(%err, "failed to write notice");
        }
    }
}

/// Replays queued answers; quits once they run out.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    transcript: Vec<String>,
    unattended: bool,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
            unattended: false,
        }
    }

    /// A session nobody is watching: every prompt is
    /// [`Choice::Unanswered`].
    pub fn unattended() -> Self {
        Self {
            unattended: true,
            ..Self::default()
        }
    }

    /// Rendered prompts and notices, in the order they were issued.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Interaction for ScriptedPrompt {
    fn prompt_choice(&mut self, prompt: &Prompt) -> Choice {
        self.transcript.push(prompt.render());
        match self.answers.pop_front() {
            Some(answer) => prompt.interpret(&answer),
            None if self.unattended => Choice::Unanswered,
            None => Choice::Quit,
        }
    }

    fn notify(&mut self, message: &str) {
        self.transcript.push(message.to_string());
    }
}
