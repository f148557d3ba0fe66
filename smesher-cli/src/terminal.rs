//! Line-based prompting on the operator's terminal.
//!
//! Prompts and command output are written to `W`; answers are read from
//! `R`. The REPL and the prompts share the same reader so interactive
//! commands consume the lines the operator types after the command.

use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::Result;

/// Terminal input and output.
pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writer that command output goes to.
    pub fn out(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }

    /// Write `prompt` without a newline and make it visible.
    pub fn prompt(&mut self, prompt: &str) -> Result<()> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;
        Ok(())
    }

    /// Read one line without its line terminator. `None` at end of input.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        Ok(Some(line))
    }

    /// Like [`read_line`](Self::read_line), but end of input is an error.
    async fn require_line(&mut self) -> Result<String> {
        match self.read_line().await? {
            Some(line) => Ok(line),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for an answer",
            )
            .into()),
        }
    }

    /// Ask until a non-blank answer is given. Returns it trimmed.
    pub async fn input_not_blank(&mut self, prompt: &str) -> Result<String> {
        loop {
            self.prompt(prompt)?;
            let line = self.require_line().await?;
            let answer = line.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
        }
    }

    /// Ask a yes/no question until `y` or `n` is given.
    pub async fn yes_or_no(&mut self, question: &str) -> Result<bool> {
        loop {
            self.prompt(&format!("{} (y/n) ", question))?;
            let line = self.require_line().await?;
            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => {}
            }
        }
    }
}
