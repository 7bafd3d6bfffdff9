//! Line-oriented front end standing in for a board UI.
//!
//! Each command maps to one session operation. Square clicking is emulated
//! with `select`: the first square picks a piece, the second moves it.

use chess::{
    format_square, format_uci_move, parse_square, parse_uci_move, Move, MoveParseError,
    MoveRecord, Piece, Side, Square,
};

use crate::persistence::TranscriptStore;
use crate::session::{Mode, SessionError, SessionEvent, SessionHandle, SessionSnapshot};

pub const HELP: &str = "\
commands:
  new                     start a new game
  move <uci>              play a move, e.g. move e2e4
  select <square>         click a square (pick a piece, then its target)
  undo [n]                take back n moves (default 1)
  save <name>             save the move list
  load <name>             load a saved move list
  battle start|stop       run or pause worker-vs-worker play
  time <seconds>          worker time per move (0.1-60)
  level <0-20>            worker skill level
  mode hvh|hvw|hvw-black|wvw
  moves [square]          list legal moves
  history                 numbered move list
  show                    print the board
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    New,
    Move(Move),
    Select(Square),
    Undo(usize),
    Save(String),
    Load(String),
    BattleStart,
    BattleStop,
    Time(f64),
    Level(u8),
    Mode(Mode),
    Moves(Option<Square>),
    History,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command {0:?}, try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Move(#[from] MoveParseError),
    #[error("invalid square {0:?}")]
    Square(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let cmd = match (word.to_ascii_lowercase().as_str(), arg) {
        ("new", _) => Command::New,
        ("move" | "m", Some(mv)) => Command::Move(parse_uci_move(mv)?),
        ("move" | "m", None) => return Err(ParseError::Usage("move <uci>")),
        ("select" | "s", Some(sq)) => Command::Select(square(sq)?),
        ("select" | "s", None) => return Err(ParseError::Usage("select <square>")),
        ("undo" | "u", None) => Command::Undo(1),
        ("undo" | "u", Some(n)) => match n.parse() {
            Ok(n) if n > 0 => Command::Undo(n),
            _ => return Err(ParseError::Usage("undo [n]")),
        },
        ("save", Some(name)) => Command::Save(name.to_string()),
        ("save", None) => return Err(ParseError::Usage("save <name>")),
        ("load", Some(name)) => Command::Load(name.to_string()),
        ("load", None) => return Err(ParseError::Usage("load <name>")),
        ("battle", Some("start")) => Command::BattleStart,
        ("battle", Some("stop")) => Command::BattleStop,
        ("battle", _) => return Err(ParseError::Usage("battle start|stop")),
        ("time", Some(secs)) => Command::Time(
            secs.parse()
                .map_err(|_| ParseError::Usage("time <seconds>"))?,
        ),
        ("time", None) => return Err(ParseError::Usage("time <seconds>")),
        ("level", Some(level)) => Command::Level(
            level
                .parse()
                .map_err(|_| ParseError::Usage("level <0-20>"))?,
        ),
        ("level", None) => return Err(ParseError::Usage("level <0-20>")),
        ("mode", Some(mode)) => Command::Mode(
            Mode::parse(mode).ok_or(ParseError::Usage("mode hvh|hvw|hvw-black|wvw"))?,
        ),
        ("mode", None) => return Err(ParseError::Usage("mode hvh|hvw|hvw-black|wvw")),
        ("moves", sq) => Command::Moves(sq.map(square).transpose()?),
        ("history" | "h", _) => Command::History,
        ("show" | "board", _) => Command::Show,
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit" | "q", _) => Command::Quit,
        (other, _) => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(cmd))
}

fn square(s: &str) -> Result<Square, ParseError> {
    parse_square(s).ok_or_else(|| ParseError::Square(s.to_string()))
}

/// Result of clicking a square.
#[derive(Debug, Clone, PartialEq)]
pub enum Click {
    Selected(Square),
    Move(Move),
    Cleared,
    Ignored,
}

/// The currently selected square, if any.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: Option<Square>,
}

impl Selection {
    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// A square is selectable when a legal move starts on it. Pawns reaching
    /// the last rank promote to a queen.
    pub fn click(&mut self, square: Square, legal: &[Move]) -> Click {
        let selectable = legal.iter().any(|mv| mv.from == square);

        if let Some(from) = self.selected.take() {
            let chosen = legal.iter().find(|mv| {
                mv.from == from
                    && mv.to == square
                    && matches!(mv.promotion, None | Some(Piece::Queen))
            });
            if let Some(mv) = chosen {
                return Click::Move(*mv);
            }
            if selectable && square != from {
                self.selected = Some(square);
                return Click::Selected(square);
            }
            return Click::Cleared;
        }

        if selectable {
            self.selected = Some(square);
            Click::Selected(square)
        } else {
            Click::Ignored
        }
    }
}

/// Moves in numbered pairs, one full move per line: `1. e2e4 e7e5`.
pub fn render_move_list(records: &[MoveRecord]) -> String {
    let mut out = String::new();
    for record in records {
        match record.side {
            Side::White => {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&format!("{}. {}", record.move_number, record.wire));
            }
            Side::Black if out.is_empty() => {
                out.push_str(&format!("{}... {}", record.move_number, record.wire));
            }
            Side::Black => {
                out.push(' ');
                out.push_str(&record.wire);
            }
        }
    }
    out
}

/// Draw the piece placement of `fen` as text, white at the bottom.
pub fn render_board(fen: &str) -> String {
    let placement = fen.split_whitespace().next().unwrap_or_default();
    let mut out = String::new();

    for (i, row) in placement.split('/').enumerate() {
        out.push_str(&format!("{} ", 8 - i));
        for c in row.chars() {
            match c.to_digit(10) {
                Some(n) => (0..n).for_each(|_| out.push_str(" .")),
                None => {
                    out.push(' ');
                    out.push(c);
                }
            }
        }
        out.push('\n');
    }
    out.push_str("   a b c d e f g h");
    out
}

pub fn describe(snapshot: &SessionSnapshot) -> String {
    let mut out = render_board(&snapshot.fen);
    out.push_str(&format!(
        "\n{} | {} | {} to move | {}",
        snapshot.mode, snapshot.turn, snapshot.side_to_move, snapshot.outcome
    ));
    if let Some(last) = snapshot.last_move() {
        out.push_str(&format!(" | last {}", last));
    }
    out
}

/// One line for events worth showing; `None` for the rest.
pub fn describe_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::StateChanged(_) => None,
        SessionEvent::WorkerReady { side } => Some(format!("{} worker ready", side)),
        SessionEvent::WorkerMoved { side, mv } => Some(format!("{} worker plays {}", side, mv)),
        SessionEvent::WorkerUnavailable { side, reason } => Some(format!(
            "{} worker unavailable ({}), the side is yours",
            side, reason
        )),
        SessionEvent::WorkerFailed { side, reason } => {
            Some(format!("{} worker failed: {}", side, reason))
        }
        SessionEvent::GameOver { outcome } => Some(format!("game over: {}", outcome)),
    }
}

/// Executes parsed commands against a session.
pub struct Console {
    handle: SessionHandle,
    store: TranscriptStore,
    selection: Selection,
}

impl Console {
    pub fn new(handle: SessionHandle, store: TranscriptStore) -> Self {
        Self {
            handle,
            store,
            selection: Selection::default(),
        }
    }

    /// Run one command and return the text to print.
    pub async fn execute(&mut self, command: Command) -> Result<String, SessionError> {
        match command {
            Command::New => {
                self.selection.clear();
                let snap = self.handle.new_game().await?;
                Ok(describe(&snap))
            }
            Command::Move(mv) => {
                self.selection.clear();
                let snap = self.handle.make_move(mv).await?;
                Ok(describe(&snap))
            }
            Command::Select(square) => {
                let legal = self.handle.legal_moves(None).await?;
                match self.selection.click(square, &legal) {
                    Click::Selected(sq) => Ok(format!("selected {}", format_square(sq))),
                    Click::Move(mv) => {
                        let snap = self.handle.make_move(mv).await?;
                        Ok(describe(&snap))
                    }
                    Click::Cleared => Ok("selection cleared".to_string()),
                    Click::Ignored => Ok(format!("nothing to select on {}", format_square(square))),
                }
            }
            Command::Undo(n) => {
                self.selection.clear();
                let mut snap = None;
                for _ in 0..n {
                    snap = Some(self.handle.undo().await?);
                }
                match snap {
                    Some(snap) => Ok(describe(&snap)),
                    None => Ok(String::new()),
                }
            }
            Command::Save(name) => {
                let path = self.handle.save(&self.store, &name).await?;
                Ok(format!("saved to {}", path.display()))
            }
            Command::Load(name) => {
                self.selection.clear();
                let report = self.handle.load(&self.store, &name).await?;
                let applied = report.applied;
                let snap = self.handle.snapshot().await?;
                match report.check() {
                    Ok(_) => Ok(format!("loaded {} moves\n{}", applied, describe(&snap))),
                    Err(e) => Ok(format!(
                        "{}\nkept the first {} moves\n{}",
                        SessionError::Load(e),
                        applied,
                        describe(&snap)
                    )),
                }
            }
            Command::BattleStart => {
                let snap = self.handle.start_battle().await?;
                Ok(format!("battle running, {}", snap.turn))
            }
            Command::BattleStop => {
                let snap = self.handle.stop_battle().await?;
                Ok(format!("battle stopped, {}", snap.turn))
            }
            Command::Time(secs) => {
                let snap = self.handle.set_time_budget(secs).await?;
                Ok(format!("time budget {:?}", snap.settings.time_budget))
            }
            Command::Level(level) => {
                let snap = self.handle.set_skill_level(level).await?;
                Ok(format!("skill level {}", snap.settings.skill_level))
            }
            Command::Mode(mode) => {
                self.selection.clear();
                let snap = self.handle.set_mode(mode).await?;
                Ok(format!("mode {}, {}", snap.mode, snap.turn))
            }
            Command::Moves(from) => {
                let moves = self.handle.legal_moves(from).await?;
                let list: Vec<String> = moves.into_iter().map(format_uci_move).collect();
                Ok(if list.is_empty() {
                    "no legal moves".to_string()
                } else {
                    list.join(" ")
                })
            }
            Command::History => {
                let snap = self.handle.snapshot().await?;
                Ok(if snap.records.is_empty() {
                    "no moves yet".to_string()
                } else {
                    render_move_list(&snap.records)
                })
            }
            Command::Show => {
                let snap = self.handle.snapshot().await?;
                Ok(describe(&snap))
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
        }
    }
}
