//! Line-oriented command protocol: tokenize a stdin line into a `Command`.
//!
//! Grounded on `communication::initialize::Configuration::from_args`'s
//! "tokenize, validate, bail on the first bad token" discipline, adapted
//! from argv tokens to whitespace-separated line tokens. Unknown commands
//! and malformed arguments are silently dropped rather than reported;
//! the command protocol itself, not the core, owns that leniency.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartMaster,
    CreateNode { id: u64, money: u64 },
    Send { src: u64, dst: u64, amount: u64 },
    Receive { dst: u64, src: Option<u64> },
    ReceiveAll,
    BeginSnapshot { id: u64 },
    CollectState,
    PrintSnapshot,
    KillAll,
}

/// Parses one line into a `Command`. Returns `None` for blank lines,
/// unrecognized command words, or argument lists that don't parse,
/// all silently ignored per the command protocol's error semantics.
pub fn parse(line: &str) -> Option<Command> {
    let mut tokens = line.split_whitespace();
    let command = tokens.next()?;
    match command {
        "StartMaster" => Some(Command::StartMaster),
        "CreateNode" => {
            let id = tokens.next()?.parse().ok()?;
            let money = tokens.next()?.parse().ok()?;
            Some(Command::CreateNode { id, money })
        }
        "Send" => {
            let src = tokens.next()?.parse().ok()?;
            let dst = tokens.next()?.parse().ok()?;
            let amount = tokens.next()?.parse().ok()?;
            Some(Command::Send { src, dst, amount })
        }
        "Receive" => {
            let dst = tokens.next()?.parse().ok()?;
            let src = match tokens.next() {
                Some(token) => Some(token.parse().ok()?),
                None => None,
            };
            Some(Command::Receive { dst, src })
        }
        "ReceiveAll" => Some(Command::ReceiveAll),
        "BeginSnapshot" => {
            let id = tokens.next()?.parse().ok()?;
            Some(Command::BeginSnapshot { id })
        }
        "CollectState" => Some(Command::CollectState),
        "PrintSnapshot" => Some(Command::PrintSnapshot),
        "KillAll" => Some(Command::KillAll),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_command() {
        assert_eq!(parse("StartMaster"), Some(Command::StartMaster));
        assert_eq!(parse("CreateNode 1 100"), Some(Command::CreateNode { id: 1, money: 100 }));
        assert_eq!(parse("Send 1 2 30"), Some(Command::Send { src: 1, dst: 2, amount: 30 }));
        assert_eq!(parse("Receive 2 1"), Some(Command::Receive { dst: 2, src: Some(1) }));
        assert_eq!(parse("Receive 2"), Some(Command::Receive { dst: 2, src: None }));
        assert_eq!(parse("ReceiveAll"), Some(Command::ReceiveAll));
        assert_eq!(parse("BeginSnapshot 1"), Some(Command::BeginSnapshot { id: 1 }));
        assert_eq!(parse("CollectState"), Some(Command::CollectState));
        assert_eq!(parse("PrintSnapshot"), Some(Command::PrintSnapshot));
        assert_eq!(parse("KillAll"), Some(Command::KillAll));
    }

    #[test]
    fn blank_lines_and_unknown_commands_are_ignored() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("Frobnicate 1 2"), None);
    }

    #[test]
    fn malformed_arguments_are_ignored_not_erroring() {
        assert_eq!(parse("CreateNode 1"), None); // missing money
        assert_eq!(parse("CreateNode abc 100"), None); // non-integer id
        assert_eq!(parse("Send 1 2"), None); // missing amount
    }

    #[test]
    fn leading_and_trailing_whitespace_is_tolerated() {
        assert_eq!(parse("  Send 1 2 30  "), Some(Command::Send { src: 1, dst: 2, amount: 30 }));
    }
}
