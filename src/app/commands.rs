//! Inbound operator commands.
//!
//! These replace the buttons of the operator panel.  The binary
//! reads one command per line from stdin and hands it to
//! [`Simulation::handle_command`](super::service::Simulation::handle_command).
//!
//! | Text            | Command                         |
//! |-----------------|---------------------------------|
//! | `fault <n>`     | inject a fault on ADC channel n |
//! | `fix <n>`       | clear the fault on channel n    |
//! | `pump on\|off`  | manual pump request             |
//! | `pump faulty\|ok` | break or repair the pump      |
//! | `status`        | log telemetry and active alarms |
//! | `quit`          | stop the simulation             |

use core::fmt;
use core::str::FromStr;

use crate::sensors::ChannelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    InjectFault(ChannelId),
    ClearFault(ChannelId),
    /// `true` = manual on, `false` = manual off.
    ManualPump(bool),
    SetPumpFaulty(bool),
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCommandError {
    Empty,
    UnknownCommand(String),
    MissingArgument(&'static str),
    BadArgument(String),
}

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownCommand(c) => write!(f, "unknown command '{c}'"),
            Self::MissingArgument(c) => write!(f, "'{c}' needs an argument"),
            Self::BadArgument(a) => write!(f, "bad argument '{a}'"),
        }
    }
}

impl std::error::Error for ParseCommandError {}

fn channel_arg(arg: Option<&str>, cmd: &'static str) -> Result<ChannelId, ParseCommandError> {
    let arg = arg.ok_or(ParseCommandError::MissingArgument(cmd))?;
    arg.parse::<u8>()
        .ok()
        .and_then(|n| ChannelId::try_from(n).ok())
        .ok_or_else(|| ParseCommandError::BadArgument(arg.to_owned()))
}

impl FromStr for OperatorCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let cmd = words.next().ok_or(ParseCommandError::Empty)?;
        let arg = words.next();

        match cmd.to_ascii_lowercase().as_str() {
            "fault" => Ok(Self::InjectFault(channel_arg(arg, "fault")?)),
            "fix" => Ok(Self::ClearFault(channel_arg(arg, "fix")?)),
            "pump" => match arg.map(str::to_ascii_lowercase).as_deref() {
                Some("on") => Ok(Self::ManualPump(true)),
                Some("off") => Ok(Self::ManualPump(false)),
                Some("faulty") => Ok(Self::SetPumpFaulty(true)),
                Some("ok") => Ok(Self::SetPumpFaulty(false)),
                Some(other) => Err(ParseCommandError::BadArgument(other.to_owned())),
                None => Err(ParseCommandError::MissingArgument("pump")),
            },
            "status" => Ok(Self::Status),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseCommandError::UnknownCommand(other.to_owned())),
        }
    }
}
