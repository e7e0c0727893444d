//! Operator prompts

use crate::{Error, Result};
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Source of operator answers and sink for operator-facing messages
pub trait InputProvider {
    /// Show `prompt` and read one line; `None` means the input is closed
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Show a message to the operator
    fn notify(&mut self, message: &str);
}

/// Interactive terminal input
#[derive(Debug, Default)]
pub struct StdinInput;

impl InputProvider for StdinInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn notify(&mut self, message: &str) {
        println!("{}", message);
    }
}

/// Pre-recorded answers, consumed in order
///
/// Prompts and messages are kept so callers can assert on the dialogue.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
    prompts: Vec<String>,
    messages: Vec<String>,
}

impl ScriptedInput {
    /// Create a provider answering with `answers`, then reporting closed input
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Prompts shown so far
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Messages shown so far
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl InputProvider for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front())
    }

    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

impl<T: InputProvider + ?Sized> InputProvider for &mut T {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        (**self).read_line(prompt)
    }

    fn notify(&mut self, message: &str) {
        (**self).notify(message)
    }
}

/// Ask with a default used when the answer is empty
pub fn ask(input: &mut impl InputProvider, label: &str, default: &str) -> Result<String> {
    let answer = input
        .read_line(&format!("{} [{}]: ", label, default))?
        .ok_or(Error::InputClosed)?;
    let answer = answer.trim();
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer.to_string())
    }
}

/// Ask until a non-empty answer is given
pub fn ask_required(input: &mut impl InputProvider, label: &str) -> Result<String> {
    loop {
        let answer = input
            .read_line(&format!("{}: ", label))?
            .ok_or(Error::InputClosed)?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        input.notify("A value is required.");
    }
}

/// Ask a yes/no question; only `y` or `yes` count as yes
pub fn confirm(input: &mut impl InputProvider, label: &str) -> Result<bool> {
    let answer = input
        .read_line(&format!("{} [y/N]: ", label))?
        .ok_or(Error::InputClosed)?;
    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}
