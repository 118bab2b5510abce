//! Line protocol spoken with the external move-generation engine
//!
//! Outbound commands and inbound events are single lines of text. The
//! engine is an opaque collaborator behind this protocol: any engine that
//! honors these commands and emits these line prefixes is substitutable.
//!
//! Unknown inbound lines are not an error at this layer -
//! [`parse_event`] returns `None` and the session logs and drops them,
//! since engines legitimately emit ancillary chatter between meaningful
//! events.

use crate::types::{Mv, Square};
use std::fmt;

/// Inbound line prefix carrying the chosen best move
pub const BEST_MOVE_MARKER: &str = "bestmove";
/// Inbound line prefix carrying a fresh position encoding
pub const POSITION_MARKER: &str = "Fen:";
/// Inbound line prefix carrying the checking-piece square list
pub const CHECKERS_MARKER: &str = "Checkers:";
/// Inbound line prefix carrying the legal-move list
pub const LEGAL_MOVES_MARKER: &str = "Legal moves:";

/// Outbound command to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Start a new game
    NewGame,
    /// Ask the engine to confirm readiness
    ReadyCheck,
    /// Load a position, optionally with moves applied on top of it
    SetPosition { encoding: String, moves: Vec<Mv> },
    /// Set an engine configuration option
    SetOption { name: String, value: String },
    /// Request the bundle of state events (position echo, checkers,
    /// legal moves)
    RequestDisplay,
    /// Search for the best move within a depth and time budget
    Search { depth: u8, movetime_ms: u64 },
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::NewGame => write!(f, "ucinewgame"),
            EngineCommand::ReadyCheck => write!(f, "isready"),
            EngineCommand::SetPosition { encoding, moves } => {
                write!(f, "position fen {encoding}")?;
                if !moves.is_empty() {
                    write!(f, " moves")?;
                    for half_move in moves {
                        write!(f, " {half_move}")?;
                    }
                }
                Ok(())
            }
            EngineCommand::SetOption { name, value } => {
                write!(f, "setoption name {name} value {value}")
            }
            EngineCommand::RequestDisplay => write!(f, "d"),
            EngineCommand::Search { depth, movetime_ms } => {
                write!(f, "go depth {depth} movetime {movetime_ms}")
            }
        }
    }
}

/// Asynchronous event received from the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The move the engine chose
    BestMove(Mv),
    /// The engine's echo of the current position encoding
    Position(String),
    /// Squares of the pieces currently giving check (possibly empty)
    Checkers(Vec<Square>),
    /// The full legal-move list for the current position
    LegalMoves(Vec<Mv>),
}

/// Parse one inbound engine line into an event
///
/// Returns `None` for any line that is not one of the four recognized
/// prefixes, or whose payload does not parse - both are treated as
/// ancillary chatter and dropped by the session.
pub fn parse_event(line: &str) -> Option<EngineEvent> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(BEST_MOVE_MARKER) {
        let token = rest.split_whitespace().next()?;
        return token.parse().ok().map(EngineEvent::BestMove);
    }
    if let Some(rest) = line.strip_prefix(POSITION_MARKER) {
        return Some(EngineEvent::Position(rest.trim().to_string()));
    }
    if let Some(rest) = line.strip_prefix(CHECKERS_MARKER) {
        let mut squares = Vec::new();
        for token in rest.split_whitespace() {
            squares.push(token.parse().ok()?);
        }
        return Some(EngineEvent::Checkers(squares));
    }
    if let Some(rest) = line.strip_prefix(LEGAL_MOVES_MARKER) {
        let mut moves = Vec::new();
        for token in rest.split_whitespace() {
            moves.push(token.parse().ok()?);
        }
        return Some(EngineEvent::LegalMoves(moves));
    }
    None
}
