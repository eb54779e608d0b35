// Input side of the CLI. Commands ask for secrets and confirmations through
// the `Prompt` trait; the terminal implementation uses `dialoguer`.

use anyhow::{bail, Context, Result};
use dialoguer::{Confirm, Input, Password};
use std::collections::VecDeque;

pub trait Prompt {
    fn input(&mut self, prompt: &str) -> Result<String>;

    /// Reads a line without echoing it.
    fn password(&mut self, prompt: &str) -> Result<String>;

    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Interactive prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn input(&mut self, prompt: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .context("Failed to read input")
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        Password::new()
            .with_prompt(prompt)
            .interact()
            .context("Failed to read password")
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }
}

/// Replays prepared answers in order. Confirmations accept `y`/`yes`.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedPrompt {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, prompt: &str) -> Result<String> {
        match self.answers.pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("No answer left for prompt `{prompt}`"),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn input(&mut self, prompt: &str) -> Result<String> {
        self.next(prompt)
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        self.next(prompt)
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.next(prompt)?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_answers_in_order() {
        let mut prompt = ScriptedPrompt::new(["alice", "secret", "yes", "n"]);
        assert_eq!(prompt.input("user").unwrap(), "alice");
        assert_eq!(prompt.password("pw").unwrap(), "secret");
        assert!(prompt.confirm("sure?").unwrap());
        assert!(!prompt.confirm("sure?").unwrap());
        assert_eq!(prompt.remaining(), 0);
        assert!(prompt.input("more").is_err());
    }
}
