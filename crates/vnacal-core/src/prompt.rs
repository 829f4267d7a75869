//! Operator prompts
//!
//! The wizard stops between measurement stages until the operator confirms a
//! connection change. [`OperatorPrompt`] abstracts that exchange so it can be
//! scripted in tests or replaced by a GUI.

use std::io::{BufRead, Write};

use anyhow::{bail, Result};
use tracing::debug;

/// One selectable answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOption {
    /// Text shown to the operator
    pub label: String,
    /// Value returned when the option is chosen
    pub key: String,
    /// Further inputs accepted for this option, compared case-insensitively
    pub aliases: Vec<String>,
}

impl PromptOption {
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// "Continue" option answered by an empty line
    pub fn proceed() -> Self {
        Self::new("Continue", "c").with_alias("")
    }

    /// Whether `input` selects this option
    pub fn accepts(&self, input: &str) -> bool {
        let input = input.trim();
        input.eq_ignore_ascii_case(&self.key)
            || input.eq_ignore_ascii_case(&self.label)
            || self.aliases.iter().any(|a| input.eq_ignore_ascii_case(a))
    }
}

/// Something that can ask the operator a question
pub trait OperatorPrompt {
    /// Show `message` and block until one of `options` is chosen; returns its key
    fn ask(&mut self, message: &str, options: &[PromptOption]) -> Result<String>;
}

/// Line-based prompt over any reader and writer
///
/// Invalid answers are reported and the question is repeated. End of input
/// is an error.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl ConsolePrompt<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompt on the process terminal
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> OperatorPrompt for ConsolePrompt<R, W> {
    fn ask(&mut self, message: &str, options: &[PromptOption]) -> Result<String> {
        if options.is_empty() {
            bail!("Prompt needs at least one option");
        }
        let choices = options
            .iter()
            .map(|o| format!("[{}]{}", o.key, o.label))
            .collect::<Vec<_>>()
            .join("/");

        loop {
            write!(self.output, "{message} {choices}: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                bail!("Input closed while waiting for an answer to: {message}");
            }
            if let Some(option) = options.iter().find(|o| o.accepts(&line)) {
                debug!("Operator chose {:?}", option.key);
                return Ok(option.key.clone());
            }
            writeln!(self.output, "Invalid choice {:?}", line.trim())?;
        }
    }
}
