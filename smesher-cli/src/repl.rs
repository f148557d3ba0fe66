//! Interactive REPL mode.

use std::io::Write;
use strum::{EnumMessage, IntoEnumIterator};
use tokio::io::AsyncBufRead;

use crate::api_client::SmesherApi;
use crate::commands::{Command, Session};
use crate::error::Result;
use crate::tracing::prelude::*;

const PROMPT: &str = "smesher> ";

/// Interactive REPL around a [`Session`].
pub struct Repl<A, R, W> {
    session: Session<A, R, W>,
}

impl<A, R, W> Repl<A, R, W>
where
    A: SmesherApi,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(session: Session<A, R, W>) -> Self {
        Self { session }
    }

    pub fn into_session(self) -> Session<A, R, W> {
        self.session
    }

    /// Read and run commands until `quit`, `exit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        let out = self.session.terminal().out();
        writeln!(out, "Smesher CLI - Interactive Mode")?;
        writeln!(out, "Type 'help' for available commands, 'quit' or 'exit' to leave")?;
        writeln!(out)?;

        loop {
            self.session.terminal().prompt(PROMPT)?;
            let Some(line) = self.session.terminal().read_line().await? else {
                // EOF (Ctrl+D)
                writeln!(self.session.terminal().out())?;
                break;
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match input.to_lowercase().as_str() {
                "quit" | "exit" => {
                    writeln!(self.session.terminal().out(), "Goodbye!")?;
                    break;
                }
                "help" => {
                    self.show_help()?;
                    continue;
                }
                _ => {}
            }

            match input.parse::<Command>() {
                Ok(command) => self.session.run(command).await?,
                Err(_) => {
                    debug!(input = %input, "Unknown command");
                    writeln!(
                        self.session.terminal().out(),
                        "Unknown command '{}'. Type 'help' for available commands.",
                        input
                    )?;
                }
            }
        }

        Ok(())
    }

    fn show_help(&mut self) -> Result<()> {
        let out = self.session.terminal().out();
        writeln!(out, "Available Commands:")?;
        writeln!(out)?;
        for command in Command::iter() {
            writeln!(
                out,
                "  {:<22} - {}",
                command.to_string(),
                command.get_message().unwrap_or_default()
            )?;
        }
        writeln!(out)?;
        writeln!(out, "Interactive Commands:")?;
        writeln!(out, "  {:<22} - Show this help message", "help")?;
        writeln!(out, "  {:<22} - Exit the interactive mode", "quit, exit")?;
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::mock::{Call, MockApi};
    use crate::api_client::types::{ComputeApi, ComputeProvider, SmeshingStatus};
    use crate::commands::ComputeApiNames;
    use crate::terminal::Terminal;

    async fn run_repl(api: MockApi, input: &'static str) -> (MockApi, String, Result<()>) {
        let session = Session::new(
            api,
            Terminal::new(input.as_bytes(), Vec::new()),
            ComputeApiNames::new(),
        );
        let mut repl = Repl::new(session);
        let result = repl.run().await;
        let (api, terminal) = repl.into_session().into_parts();
        let (_, output) = terminal.into_parts();
        (api, String::from_utf8(output).unwrap(), result)
    }

    #[tokio::test]
    async fn runs_commands_until_quit() {
        let api = MockApi {
            status: Some(SmeshingStatus::Active),
            providers: Some(vec![ComputeProvider {
                id: 2,
                model: "Radeon".into(),
                compute_api: ComputeApi::Vulkan,
                performance: 10,
            }]),
            ..MockApi::new()
        };
        let (api, out, result) = run_repl(api, "\nstatus\nproviders\nquit\nstatus\n").await;
        result.unwrap();

        assert_eq!(
            api.calls(),
            vec![Call::SmeshingStatus, Call::ComputeProviders { benchmark: false }]
        );
        assert!(
            out.contains("smesher> > Proof of space data was created and is used for smeshing.\n")
        );
        assert!(out.contains("Compute api: VULKAN\n"));
        assert!(out.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn prompts_read_from_the_same_input() {
        let (api, out, result) = run_repl(MockApi::new(), "stop\ny\nexit\n").await;
        result.unwrap();
        assert_eq!(api.calls(), vec![Call::StopSmeshing { delete_files: true }]);
        assert!(out.contains("Smeshing stopped."));
    }

    #[tokio::test]
    async fn failed_command_keeps_repl_alive() {
        // No canned status: the call fails and is logged.
        let (api, out, result) = run_repl(MockApi::new(), "status\nsmesher-id\n").await;
        result.unwrap();
        assert_eq!(api.calls(), vec![Call::SmeshingStatus, Call::SmesherId]);
        assert!(!out.contains("Unexpected"));
    }

    #[tokio::test]
    async fn unknown_command_and_help() {
        let (api, out, result) = run_repl(MockApi::new(), "mine\nhelp\n").await;
        result.unwrap();
        assert!(api.calls().is_empty());
        assert!(out.contains("Unknown command 'mine'"));
        assert!(out.contains("set-rewards-address"));
        assert!(out.contains("Create proof of space data and start smeshing"));
    }

    #[tokio::test]
    async fn end_of_input_inside_a_prompt_ends_the_session() {
        let (_, _, result) = run_repl(MockApi::new(), "set-rewards-address\n").await;
        assert!(result.unwrap_err().ends_session());
    }
}
