//! Core of a voice-driven chess opponent
//!
//! The caller (a voice assistant skill, a chat bot, a test harness) keeps
//! the durable game state as plain values: a position encoding string, a
//! move history, a small undo side channel, and a difficulty level. This
//! crate supplies everything between those values and an external
//! move-generation engine:
//!
//! - [`position`] - lazy codec over the position encoding string
//! - [`mutation`] - applying and reversing half-moves on a position
//! - [`history`] - the half-move log and undo reconstruction
//! - [`window`] - paginated legal-move listings sized for narration
//! - [`protocol`] / [`transport`] / [`session`] - the line protocol,
//!   the channel it travels over, and the request/response state machine
//!   talking to the engine
//!
//! # Examples
//!
//! ```
//! use voicechess_core::position::Position;
//! use voicechess_core::history::MoveHistory;
//!
//! # fn main() -> voicechess_core::error::ChessCoreResult<()> {
//! let mut position = Position::initial();
//! let mut history = MoveHistory::new();
//!
//! let record = position.apply_half_move(&"e2e4".parse()?)?;
//! history.push(record);
//!
//! assert_eq!(
//!     position.encode()?,
//!     "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
//! );
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod history;
pub mod mutation;
pub mod position;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;
pub mod window;

pub use error::{ChessCoreError, ChessCoreResult};
pub use history::{HalfMoveRecord, MoveHistory, UndoSideChannel};
pub use position::{CapturedPieces, Position, START_POSITION};
pub use protocol::{EngineCommand, EngineEvent};
pub use session::{Difficulty, EngineSession, SessionState};
pub use transport::{ChannelTransport, EngineTransport, ProcessTransport};
pub use types::{
    CastlingRights, GameState, MoveEffect, Mv, Piece, PieceKind, Side, Square,
};
pub use window::{build_window, AnnotatedMove, MoveGroup, MoveTag, MoveWindowPage};
