//! Command parsing for the stdin loop
//!
//! Each input line maps to either an action for the input queue or a
//! control command for the queue/loop itself.

use crate::actions::{Action, CounterAction, StatusAction};
use anyhow::{bail, Context};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Dispatch(Action),
    Lock,
    Unlock,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  inc | dec | add <n> | reset   change the counter
  say <text>                    set the status message
  busy on|off                   toggle the busy flag
  lock | unlock                 hold back / release queued input
  help | quit";

/// Parse one input line
pub fn parse(line: &str) -> anyhow::Result<Command> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word {
        "inc" => Command::Dispatch(Action::Counter(CounterAction::Increment)),
        "dec" => Command::Dispatch(Action::Counter(CounterAction::Decrement)),
        "reset" => Command::Dispatch(Action::Counter(CounterAction::Reset)),
        "add" => {
            let n = rest
                .parse()
                .with_context(|| format!("add expects a number, got '{}'", rest))?;
            Command::Dispatch(Action::Counter(CounterAction::Add(n)))
        }
        "say" if !rest.is_empty() => {
            Command::Dispatch(Action::Status(StatusAction::Message(rest.to_string())))
        }
        "busy" => match rest {
            "on" => Command::Dispatch(Action::Status(StatusAction::Busy(true))),
            "off" => Command::Dispatch(Action::Status(StatusAction::Busy(false))),
            _ => bail!("busy expects on or off"),
        },
        "lock" => Command::Lock,
        "unlock" => Command::Unlock,
        "help" | "" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => bail!("unknown command '{}', try help", line),
    };
    Ok(command)
}
