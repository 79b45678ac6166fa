//! Line-oriented remote command console.
//!
//! A helper thread reads stdin and forwards parsed commands over a channel;
//! the control loop drains it between ticks.

use std::io::BufRead;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    Open,
    Close,
    Stop,
    Home,
    Status,
    /// New open travel in turns.
    Turns(f32),
    /// New maximum speed in steps/s.
    Speed(f32),
    /// New acceleration in steps/s².
    Accel(f32),
    Log,
    Quit,
}

fn number(word: &str, arg: Option<&str>) -> eyre::Result<f32> {
    let Some(raw) = arg else {
        eyre::bail!("`{word}` needs a value");
    };
    raw.parse::<f32>()
        .map_err(|_| eyre::eyre!("`{word}` value `{raw}` is not a number"))
}

/// Parse one console line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> eyre::Result<Option<RemoteCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let word = words.next().unwrap_or_default().to_ascii_lowercase();
    let arg = words.next();
    if let Some(extra) = words.next() {
        eyre::bail!("unexpected `{extra}` after `{word}`");
    }
    let cmd = match word.as_str() {
        "open" => RemoteCommand::Open,
        "close" => RemoteCommand::Close,
        "stop" => RemoteCommand::Stop,
        "home" => RemoteCommand::Home,
        "status" => RemoteCommand::Status,
        "log" => RemoteCommand::Log,
        "quit" | "exit" => RemoteCommand::Quit,
        "turns" => RemoteCommand::Turns(number(&word, arg)?),
        "speed" => RemoteCommand::Speed(number(&word, arg)?),
        "accel" => RemoteCommand::Accel(number(&word, arg)?),
        other => eyre::bail!(
            "unknown command `{other}` (open|close|stop|home|status|turns N|speed N|accel N|log|quit)"
        ),
    };
    let takes_value = matches!(
        cmd,
        RemoteCommand::Turns(_) | RemoteCommand::Speed(_) | RemoteCommand::Accel(_)
    );
    if arg.is_some() && !takes_value {
        eyre::bail!("`{word}` takes no value");
    }
    Ok(Some(cmd))
}

/// Forward every parsed line from `reader` until EOF or until the receiver hangs up.
pub fn pump<R: BufRead>(reader: R, tx: &Sender<RemoteCommand>) {
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "console read failed");
                break;
            }
        };
        match parse_line(&line) {
            Ok(Some(cmd)) => {
                if tx.send(cmd).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("{e}"),
        }
    }
    tracing::debug!("console input closed");
}

pub fn spawn_stdin(tx: Sender<RemoteCommand>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("console".into())
        .spawn(move || pump(std::io::stdin().lock(), &tx))
}
