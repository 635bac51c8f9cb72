//! Line-based command console
//!
//! Reads commands from standard input and forwards them to the scheduler's
//! run loop. One command per line:
//!
//! ```text
//! start | stop | pause | rate <hz> | theme | zoom in|out
//! export [path] | status | help | quit
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use cardioscope_native::scheduler::ControlCommand;
use cardioscope_native::viz::ZoomDirection;

/// Console help text.
pub const HELP: &str = "commands: start, stop, pause, rate <30-250>, theme, zoom in|out, \
                        export [path], status, help, quit";

/// One parsed console line.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleInput {
    /// Forward to the scheduler
    Command(ControlCommand),
    /// Print the help text
    Help,
}

/// Parse one console line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns error for an unknown command or a malformed argument.
pub fn parse_line(line: &str) -> anyhow::Result<Option<ConsoleInput>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match verb.to_ascii_lowercase().as_str() {
        "start" => ControlCommand::Start,
        "stop" => ControlCommand::Stop,
        "pause" => ControlCommand::Pause,
        "rate" => {
            let text = arg.ok_or_else(|| anyhow!("rate needs a value in Hz"))?;
            let hz = text
                .parse::<u16>()
                .with_context(|| format!("invalid sample rate {text:?}"))?;
            ControlCommand::SetSampleRate(hz)
        }
        "theme" => ControlCommand::ToggleTheme,
        "zoom" => match arg {
            Some("in" | "+") => ControlCommand::Zoom(ZoomDirection::In),
            Some("out" | "-") => ControlCommand::Zoom(ZoomDirection::Out),
            _ => bail!("zoom needs 'in' or 'out'"),
        },
        "export" | "save" => {
            // Paths may contain spaces
            let rest = line.trim_start()[verb.len()..].trim();
            ControlCommand::Export((!rest.is_empty()).then(|| PathBuf::from(rest)))
        }
        "status" => ControlCommand::Status,
        "help" | "?" => return Ok(Some(ConsoleInput::Help)),
        "quit" | "exit" | "q" => ControlCommand::Shutdown,
        other => bail!("unknown command {other:?}, type 'help'"),
    };

    Ok(Some(ConsoleInput::Command(command)))
}

/// Forward stdin commands until `quit`, end of input, or the run loop exits.
pub async fn read_commands(commands: mpsc::Sender<ControlCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("{HELP}");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Console input closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Console read failed");
                break;
            }
        };

        match parse_line(&line) {
            Ok(Some(ConsoleInput::Command(command))) => {
                let quit = command == ControlCommand::Shutdown;
                if commands.send(command).await.is_err() || quit {
                    break;
                }
            }
            Ok(Some(ConsoleInput::Help)) => info!("{HELP}"),
            Ok(None) => {}
            Err(e) => warn!("{e:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> ControlCommand {
        match parse_line(line).unwrap() {
            Some(ConsoleInput::Command(command)) => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(command("start"), ControlCommand::Start);
        assert_eq!(command("  STOP "), ControlCommand::Stop);
        assert_eq!(command("pause"), ControlCommand::Pause);
        assert_eq!(command("theme"), ControlCommand::ToggleTheme);
        assert_eq!(command("status"), ControlCommand::Status);
        assert_eq!(command("quit"), ControlCommand::Shutdown);
    }

    #[test]
    fn test_arguments() {
        assert_eq!(command("rate 120"), ControlCommand::SetSampleRate(120));
        assert_eq!(command("zoom in"), ControlCommand::Zoom(ZoomDirection::In));
        assert_eq!(command("zoom -"), ControlCommand::Zoom(ZoomDirection::Out));
        assert_eq!(command("export"), ControlCommand::Export(None));
        assert_eq!(
            command("export my sessions/today.csv"),
            ControlCommand::Export(Some(PathBuf::from("my sessions/today.csv")))
        );
    }

    #[test]
    fn test_blank_and_help() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("help").unwrap(), Some(ConsoleInput::Help));
    }

    #[test]
    fn test_errors() {
        assert!(parse_line("rate").is_err());
        assert!(parse_line("rate fast").is_err());
        assert!(parse_line("zoom sideways").is_err());
        assert!(parse_line("launch").is_err());
    }
}
