//! Engine session - request/response state machine over a transport
//!
//! An [`EngineSession`] owns one [`Position`] and one transport to an
//! external move-generation engine. High-level calls (`refresh_state`,
//! `request_best_move`) translate to protocol commands and await the
//! matching events, with at most one structured request in flight.
//!
//! # Examples
//!
//! ```no_run
//! use voicechess_core::position::Position;
//! use voicechess_core::session::{Difficulty, EngineSession};
//! use voicechess_core::transport::ProcessTransport;
//!
//! # async fn run() -> voicechess_core::error::ChessCoreResult<()> {
//! let transport = ProcessTransport::spawn("stockfish")?;
//! let mut session =
//!     EngineSession::connect(transport, Position::initial(), Difficulty::new(8)).await?;
//! session.refresh_state(&[]).await?;
//! let reply = session.request_best_move().await?;
//! println!("engine plays {reply}");
//! # Ok(())
//! # }
//! ```

use crate::error::{ChessCoreError, ChessCoreResult};
use crate::position::Position;
use crate::protocol::{parse_event, EngineCommand, EngineEvent};
use crate::transport::EngineTransport;
use crate::types::{GameState, Mv, PieceKind, Square};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Playing-strength setting, clamped to the engine's level range
///
/// The level maps to a search budget plus two handicap options: the
/// maximum evaluation error the engine may commit and the probability of
/// it playing an intentionally sub-optimal move, both shrinking as the
/// level rises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difficulty {
    level: u8,
}

impl Difficulty {
    pub const MIN_LEVEL: u8 = 0;
    pub const MAX_LEVEL: u8 = 20;

    /// Create a difficulty, clamping `level` into `[0, 20]`
    pub fn new(level: i32) -> Difficulty {
        Difficulty {
            level: level.clamp(Self::MIN_LEVEL as i32, Self::MAX_LEVEL as i32) as u8,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Search depth budget: `max(1, level / 2)`
    pub fn search_depth(&self) -> u8 {
        (self.level / 2).max(1)
    }

    /// Maximum evaluation error (centipawns) the engine may commit
    pub fn max_eval_error(&self) -> u32 {
        900 - 40 * self.level as u32
    }

    /// Probability weight of an intentionally sub-optimal move
    pub fn error_probability(&self) -> u32 {
        128 - 6 * self.level as u32
    }

    /// Per-move thinking time budget
    pub fn movetime_ms(&self) -> u64 {
        100 * (self.level as u64 + 1)
    }
}

impl Default for Difficulty {
    fn default() -> Difficulty {
        Difficulty::new(10)
    }
}

/// Where the session stands in its request cycle
///
/// The session returns to `Idle` only when a request resolves
/// successfully; a transport failure leaves it in the awaiting state and
/// the session is done for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingStateRefresh,
    AwaitingBestMove,
}

/// Live session against an external engine
pub struct EngineSession<T: EngineTransport> {
    transport: T,
    state: SessionState,
    position: Position,
    checkers: Option<Vec<Square>>,
    legal_moves: Option<Vec<Mv>>,
    game_state: Option<GameState>,
    difficulty: Difficulty,
}

impl<T: EngineTransport> EngineSession<T> {
    /// Open a session: handshake with the engine and configure its
    /// playing strength
    ///
    /// Sends the new-game/ready-check sequence followed by the three
    /// difficulty options. The engine's acknowledgements arrive as
    /// ordinary chatter and are dropped by the next structured request.
    pub async fn connect(
        transport: T,
        position: Position,
        difficulty: Difficulty,
    ) -> ChessCoreResult<EngineSession<T>> {
        let mut session = EngineSession {
            transport,
            state: SessionState::Idle,
            position,
            checkers: None,
            legal_moves: None,
            game_state: None,
            difficulty,
        };
        session.send(&EngineCommand::NewGame).await?;
        session.send(&EngineCommand::ReadyCheck).await?;
        for (name, value) in [
            ("Skill Level", difficulty.level() as u32),
            ("Skill Level Maximum Error", difficulty.max_eval_error()),
            ("Skill Level Probability", difficulty.error_probability()),
        ] {
            session
                .send(&EngineCommand::SetOption {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .await?;
        }
        debug!(level = difficulty.level(), "engine session connected");
        Ok(session)
    }

    async fn send(&mut self, command: &EngineCommand) -> ChessCoreResult<()> {
        let line = command.to_string();
        trace!(%line, "sending engine command");
        self.transport.send_line(&line).await
    }

    async fn next_event(&mut self) -> ChessCoreResult<EngineEvent> {
        loop {
            let line = self
                .transport
                .recv_line()
                .await?
                .ok_or(ChessCoreError::EngineDisconnected)?;
            match parse_event(&line) {
                Some(event) => return Ok(event),
                None => trace!(%line, "dropping engine chatter"),
            }
        }
    }

    fn require_idle(&self, request: &str) -> ChessCoreResult<()> {
        if self.state != SessionState::Idle {
            return Err(ChessCoreError::precondition(format!(
                "{request} issued while session is {:?}",
                self.state
            )));
        }
        Ok(())
    }

    /// Load the current position (plus `moves` on top of it) into the
    /// engine and pull back the fresh game state
    ///
    /// Resolves once the echoed position, checker list, and legal-move
    /// list have all arrived. On success the session's position is
    /// replaced by the engine's echo, the memoized game-state
    /// classification is invalidated, and the session returns to idle.
    pub async fn refresh_state(&mut self, moves: &[Mv]) -> ChessCoreResult<()> {
        self.require_idle("state refresh")?;
        self.state = SessionState::AwaitingStateRefresh;

        let encoding = self.position.encode()?;
        self.send(&EngineCommand::SetPosition {
            encoding,
            moves: moves.to_vec(),
        })
        .await?;
        self.send(&EngineCommand::RequestDisplay).await?;

        let mut echoed: Option<String> = None;
        let mut checkers: Option<Vec<Square>> = None;
        let mut legal_moves: Option<Vec<Mv>> = None;
        while echoed.is_none() || checkers.is_none() || legal_moves.is_none() {
            match self.next_event().await? {
                EngineEvent::Position(text) => echoed = Some(text),
                EngineEvent::Checkers(squares) => checkers = Some(squares),
                EngineEvent::LegalMoves(moves) => legal_moves = Some(moves),
                EngineEvent::BestMove(half_move) => {
                    warn!(%half_move, "unsolicited best move during state refresh");
                }
            }
        }

        let echoed = echoed.ok_or(ChessCoreError::EngineDisconnected)?;
        debug!(
            legal = legal_moves.as_ref().map(Vec::len).unwrap_or(0),
            "state refresh resolved"
        );
        self.position = Position::from_encoding(echoed);
        self.checkers = checkers;
        self.legal_moves = legal_moves;
        self.game_state = None;
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Ask the engine for its move in the current position
    ///
    /// Does not refresh the legal-move list; callers follow up with
    /// [`EngineSession::refresh_state`] after applying the reply.
    pub async fn request_best_move(&mut self) -> ChessCoreResult<Mv> {
        self.require_idle("best-move request")?;
        self.state = SessionState::AwaitingBestMove;

        self.send(&EngineCommand::Search {
            depth: self.difficulty.search_depth(),
            movetime_ms: self.difficulty.movetime_ms(),
        })
        .await?;

        loop {
            match self.next_event().await? {
                EngineEvent::BestMove(half_move) => {
                    debug!(%half_move, "best move resolved");
                    self.state = SessionState::Idle;
                    return Ok(half_move);
                }
                other => warn!(?other, "unsolicited event during best-move request"),
            }
        }
    }

    /// Whether `half_move` is legal in the last refreshed state
    ///
    /// A 4-character move also counts as legal when its queen-promotion
    /// form is in the list, so a spoken "a seven to a eight" matches the
    /// promotion move the engine reports as `a7a8q`.
    pub fn is_move_legal(&self, half_move: &Mv) -> ChessCoreResult<bool> {
        let legal = self.legal_moves_or_err()?;
        if legal.contains(half_move) {
            return Ok(true);
        }
        if half_move.promotion.is_none() {
            let queen_form = half_move.with_promotion(PieceKind::Queen);
            return Ok(legal.contains(&queen_form));
        }
        Ok(false)
    }

    /// Whether `half_move` is only valid as a promotion
    pub fn is_promotion(&self, half_move: &Mv) -> ChessCoreResult<bool> {
        let legal = self.legal_moves_or_err()?;
        let bare = half_move.bare();
        let queen_form = bare.with_promotion(PieceKind::Queen);
        Ok(legal.contains(&queen_form) && !legal.contains(&bare))
    }

    /// Classify the refreshed state, memoized until the next refresh
    pub fn classify_game_state(&mut self) -> ChessCoreResult<GameState> {
        if let Some(state) = self.game_state {
            return Ok(state);
        }
        let no_legal_moves = self.legal_moves_or_err()?.is_empty();
        let in_check = !self
            .checkers
            .as_ref()
            .ok_or_else(|| ChessCoreError::precondition("game state queried before a state refresh"))?
            .is_empty();

        let state = if no_legal_moves {
            if in_check {
                GameState::Checkmate
            } else {
                GameState::Stalemate
            }
        } else if self.position.halfmove_clock()? >= 50 {
            GameState::FiftyMoveDraw
        } else if in_check {
            GameState::Check
        } else {
            GameState::Ok
        };
        self.game_state = Some(state);
        Ok(state)
    }

    fn legal_moves_or_err(&self) -> ChessCoreResult<&[Mv]> {
        self.legal_moves
            .as_deref()
            .ok_or_else(|| ChessCoreError::precondition("legal moves queried before a state refresh"))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn position_mut(&mut self) -> &mut Position {
        &mut self.position
    }

    /// Legal moves from the last refresh, if one has completed
    pub fn legal_moves(&self) -> Option<&[Mv]> {
        self.legal_moves.as_deref()
    }

    /// Checking-piece squares from the last refresh, if one has completed
    pub fn checkers(&self) -> Option<&[Square]> {
        self.checkers.as_deref()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}
