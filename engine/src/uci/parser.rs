use crate::EngineCommand;
use chess::{format_uci_move, parse_uci_move, Move};

/// Incoming message from UCI engine
#[derive(Debug, Clone)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `mv` is `None` when the engine answers `bestmove (none)`.
    BestMove { mv: Option<Move>, ponder: Option<Move> },
    /// Search progress. Its content is not used.
    Info,
    Option { name: String },
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, crate::UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"bestmove") => {
            let mv = match tokens.get(1) {
                None => return Err(crate::UciError::MalformedMessage(line.to_string())),
                Some(&"(none)") | Some(&"0000") => None,
                Some(s) => Some(parse_uci_move(s)?),
            };
            let ponder = if tokens.len() >= 4 && tokens[2] == "ponder" {
                parse_uci_move(tokens[3]).ok()
            } else {
                None
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }

        Some(&"info") => Ok(UciMessage::Info),

        Some(&"option") => {
            // option name <words...> type <t> ...
            let start = tokens
                .iter()
                .position(|t| *t == "name")
                .ok_or_else(|| crate::UciError::MalformedMessage(line.to_string()))?;
            let end = tokens
                .iter()
                .position(|t| *t == "type")
                .unwrap_or(tokens.len());
            if end <= start + 1 {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            }
            Ok(UciMessage::Option {
                name: tokens[start + 1..end].join(" "),
            })
        }

        _ => Err(crate::UciError::UnknownMessage(line.to_string())),
    }
}

/// Render a command as the line written to the engine's stdin.
pub fn format_command(cmd: &EngineCommand) -> String {
    let mut line = match cmd {
        EngineCommand::Uci => "uci".to_string(),
        EngineCommand::IsReady => "isready".to_string(),
        EngineCommand::NewGame => "ucinewgame".to_string(),
        EngineCommand::SetOption { name, value } => match value {
            Some(val) => format!("setoption name {} value {}", name, val),
            None => format!("setoption name {}", name),
        },
        EngineCommand::SetPosition { fen, moves } => {
            let mut position_cmd = format!("position fen {}", fen);
            if !moves.is_empty() {
                position_cmd.push_str(" moves");
                for mv in moves {
                    position_cmd.push(' ');
                    position_cmd.push_str(&format_uci_move(*mv));
                }
            }
            position_cmd
        }
        EngineCommand::Go { movetime } => format!("go movetime {}", movetime),
        EngineCommand::Stop => "stop".to_string(),
        EngineCommand::Quit => "quit".to_string(),
    };
    line.push('\n');
    line
}
