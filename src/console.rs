//! Line-oriented operator console.
//!
//! Stands in for a keyboard: `down ArrowUp`, `up ArrowUp`, `tap a`,
//! `speed 200`, `pid 1.0 0.1 0.01`, `pause`, `resume`, `status`, `quit`.

use crate::input::{InputEvent, KeyBindings};
use crate::protocol::PidGains;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Input(Vec<InputEvent>),
    SendConfig(PidGains),
    Pause,
    Resume,
    Status,
    Quit,
    Empty,
}

pub fn parse_line(line: &str, keys: &KeyBindings) -> Result<ConsoleCommand, String> {
    // keep a lone space: it is the default action key
    let (verb, rest) = match line.trim_end_matches(['\r', '\n']).split_once(' ') {
        Some((verb, rest)) => (verb, rest),
        None => (line.trim(), ""),
    };
    let key = |name: &str| {
        let name = match name.trim() {
            "" => " ",
            trimmed => trimmed,
        };
        keys.resolve(name)
            .ok_or_else(|| format!("unbound key {:?}", name))
    };

    match verb {
        "" => Ok(ConsoleCommand::Empty),
        "down" => Ok(ConsoleCommand::Input(vec![InputEvent::Pressed(key(rest)?)])),
        "up" => Ok(ConsoleCommand::Input(vec![InputEvent::Released(key(rest)?)])),
        "tap" => {
            let k = key(rest)?;
            Ok(ConsoleCommand::Input(vec![
                InputEvent::Pressed(k),
                InputEvent::Released(k),
            ]))
        }
        "speed" => {
            let limit = rest
                .trim()
                .parse::<u16>()
                .map_err(|e| format!("bad speed {:?}: {}", rest.trim(), e))?;
            Ok(ConsoleCommand::Input(vec![InputEvent::SpeedLimit(limit)]))
        }
        "pid" => {
            let values = rest
                .split_whitespace()
                .map(|v| v.parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| format!("bad gain: {}", e))?;
            match values[..] {
                [p, i, d] => Ok(ConsoleCommand::SendConfig(PidGains { p, i, d })),
                _ => Err("pid takes exactly three values: P I D".into()),
            }
        }
        "pause" => Ok(ConsoleCommand::Pause),
        "resume" => Ok(ConsoleCommand::Resume),
        "status" => Ok(ConsoleCommand::Status),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command {:?}", other)),
    }
}
