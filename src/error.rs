//! Error types for the voice-chess core
//!
//! Provides custom error types for position decoding, move bookkeeping,
//! window building, and engine session operations.
//!
//! The taxonomy separates three families the callers treat differently:
//! - **Malformed input** (bad encoding strings, bad notation, bad cursors) -
//!   the caller asks the user to repeat themselves.
//! - **Precondition violations** (querying session state before a refresh,
//!   overlapping structured requests) - programming errors, asserted on in
//!   tests, never expected in correct call sequences.
//! - **Undo mismatches** - recorded metadata no longer matches the board, so
//!   the caller reports that the correction is unavailable instead of
//!   corrupting the position.

use thiserror::Error;

/// Errors that can occur in the voice-chess core
#[derive(Error, Debug)]
pub enum ChessCoreError {
    /// Position encoding string could not be decoded
    #[error("Malformed position encoding: {reason}")]
    MalformedPosition { reason: String },

    /// Move notation could not be parsed (expected 4 or 5 characters)
    #[error("Malformed move notation: {text}")]
    MalformedMove { text: String },

    /// Rank number outside the board (must be 1-8)
    #[error("Rank {rank} out of range (must be 1-8)")]
    RankOutOfRange { rank: i32 },

    /// Window cursor does not point into the legal-move list
    #[error("Window cursor {cursor} out of range for {move_count} moves")]
    WindowCursorOutOfRange { cursor: usize, move_count: usize },

    /// Operation called before its prerequisites were established,
    /// or while another structured request was outstanding
    #[error("Precondition violated: {message}")]
    Precondition { message: String },

    /// Recorded undo metadata does not match the current occupancy
    #[error("Undo metadata does not match current occupancy for move {notation}")]
    UndoMismatch { notation: String },

    /// The engine channel closed before the awaited event arrived
    #[error("Engine transport closed before the awaited event arrived")]
    EngineDisconnected,

    /// I/O failure on the engine transport
    #[error("Engine transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl ChessCoreError {
    pub(crate) fn malformed_position(reason: impl Into<String>) -> Self {
        ChessCoreError::MalformedPosition {
            reason: reason.into(),
        }
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        ChessCoreError::Precondition {
            message: message.into(),
        }
    }
}

/// Result type alias for voice-chess core operations
pub type ChessCoreResult<T> = Result<T, ChessCoreError>;
