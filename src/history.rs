//! Move history - append-only log of applied half-moves
//!
//! Each entry is a [`HalfMoveRecord`]: the moved piece, the notation, and a
//! single tagged side effect (capture, castling rook displacement, or
//! en-passant capture square). Records are appended when a half-move is
//! confirmed applied and consumed when reversing the most recent one or two
//! half-moves for the "undo my last move" feature.
//!
//! Reconstruction starts from the *current* (post-move) position string and
//! reverse-applies the last `n` records most-recent-first. Castling rights
//! and the full-move counter cannot be derived from occupancy alone, so the
//! caller persists an [`UndoSideChannel`] captured before those half-moves
//! were originally applied and hands it back here.

use crate::error::{ChessCoreError, ChessCoreResult};
use crate::position::Position;
use crate::types::{CastlingRights, MoveEffect, Mv, Piece};
use serde::{Deserialize, Serialize};

/// One applied half-move with the metadata needed to reverse it exactly
///
/// Never mutated after creation. At most one of capture/castling/en-passant
/// is set, enforced by the [`MoveEffect`] variant; a promotion travels inside
/// the 5-character notation instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalfMoveRecord {
    pub piece: Piece,
    pub half_move: Mv,
    pub effect: MoveEffect,
}

impl HalfMoveRecord {
    pub fn new(piece: Piece, half_move: Mv, effect: MoveEffect) -> HalfMoveRecord {
        HalfMoveRecord {
            piece,
            half_move,
            effect,
        }
    }
}

/// Pre-move fields the caller must persist for one level of undo
///
/// Captured at the time the half-moves being undone were originally applied;
/// an undo reconstruction cannot recover these from occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoSideChannel {
    pub castling_rights: CastlingRights,
    pub fullmove_number: u32,
}

/// Append-only log of the game's half-moves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveHistory {
    records: Vec<HalfMoveRecord>,
}

impl MoveHistory {
    pub fn new() -> MoveHistory {
        MoveHistory::default()
    }

    /// Construct a record and append it
    pub fn record_half_move(
        &mut self,
        piece: Piece,
        half_move: Mv,
        effect: MoveEffect,
    ) -> &HalfMoveRecord {
        self.records.push(HalfMoveRecord::new(piece, half_move, effect));
        self.records.last().expect("record just pushed")
    }

    /// Append a record produced elsewhere (typically by
    /// [`Position::apply_half_move`])
    pub fn push(&mut self, record: HalfMoveRecord) {
        self.records.push(record);
    }

    pub fn last(&self) -> Option<&HalfMoveRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HalfMoveRecord> {
        self.records.iter()
    }

    /// Drop the `n` most recent records after a successful undo
    pub fn truncate_last(&mut self, n: usize) {
        let keep = self.records.len().saturating_sub(n);
        self.records.truncate(keep);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Rebuild the position as it stood before the last `n` half-moves
    ///
    /// Starts from `current_encoding` (the post-move position string) and
    /// reverse-applies the last `n` records most-recent-first, then
    /// re-injects the non-recoverable fields from `side_channel`.
    ///
    /// Fails with [`ChessCoreError::UndoMismatch`] when a record no longer
    /// matches the occupancy, and with a precondition error when the history
    /// holds fewer than `n` records.
    pub fn reconstruct_before_last_n(
        &self,
        current_encoding: &str,
        n: usize,
        side_channel: &UndoSideChannel,
    ) -> ChessCoreResult<Position> {
        if n > self.records.len() {
            return Err(ChessCoreError::precondition(format!(
                "cannot undo {n} half-moves, history holds {}",
                self.records.len()
            )));
        }

        let mut position = Position::from_encoding(current_encoding);
        for record in self.records.iter().rev().take(n) {
            if !position.undo_half_move(record)? {
                return Err(ChessCoreError::UndoMismatch {
                    notation: record.half_move.to_string(),
                });
            }
        }
        position.load_non_recoverable_fields(
            side_channel.castling_rights,
            side_channel.fullmove_number,
        )?;
        Ok(position)
    }
}
