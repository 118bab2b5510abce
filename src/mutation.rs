//! Position mutator - in-place application and reversal of half-moves
//!
//! These methods live on [`Position`] and cover the two directions the
//! voice front end needs:
//!
//! - **Forward**: [`Position::apply_half_move`] applies a confirmed
//!   half-move (capture, castling, en passant, promotion) and returns the
//!   [`HalfMoveRecord`] carrying exactly the side-effect metadata required
//!   to reverse it later.
//! - **Reverse**: [`Position::undo_half_move`] reconstructs the pre-move
//!   occupancy from a record, with a sanity check that refuses to touch the
//!   board when the recorded metadata no longer matches it.
//!
//! Castling rights and the full-move counter cannot be recovered from
//! occupancy alone after an undo; callers re-inject them through
//! [`Position::load_non_recoverable_fields`] from the side channel they
//! persisted at apply time.

use crate::error::{ChessCoreError, ChessCoreResult};
use crate::history::HalfMoveRecord;
use crate::position::Position;
use crate::types::{Mv, MoveEffect, Piece, PieceKind, Side, Square};

/// The four canonical castling king-moves and their rook displacements
const CASTLING_ROOK_MOVES: [(&str, &str); 4] = [
    ("e1g1", "h1f1"),
    ("e1c1", "a1d1"),
    ("e8g8", "h8f8"),
    ("e8c8", "a8d8"),
];

fn square(name: &str) -> Square {
    name.parse().expect("static square label")
}

fn mv(notation: &str) -> Mv {
    notation.parse().expect("static move notation")
}

impl Position {
    /// Apply a confirmed half-move in place
    ///
    /// Handles capture, castling, en passant and promotion, updates the
    /// en-passant target, castling rights, half-move clock, side to move and
    /// full-move number, and marks the position dirty.
    ///
    /// Legality is not checked here - that is the external engine's job.
    /// The returned record holds the metadata needed to reverse the move.
    pub fn apply_half_move(&mut self, half_move: &Mv) -> ChessCoreResult<HalfMoveRecord> {
        let piece = self.piece_at(half_move.from)?.ok_or_else(|| {
            ChessCoreError::precondition(format!("no piece on origin square {}", half_move.from))
        })?;
        let is_castling = self.is_move_castling(half_move)?;
        let is_en_passant = self.is_en_passant(piece, half_move)?;
        let destination_piece = self.piece_at(half_move.to)?;

        let effect = if is_castling {
            let rook_move = Position::rook_move_for_castling(half_move).ok_or_else(|| {
                ChessCoreError::precondition(format!(
                    "{half_move} has no castling rook displacement"
                ))
            })?;
            MoveEffect::Castling { rook_move }
        } else if is_en_passant {
            let captured_square = Square::new(half_move.to.file(), half_move.from.rank())
                .expect("en-passant capture square stays on the board");
            MoveEffect::EnPassant { captured_square }
        } else if let Some(captured) = destination_piece {
            MoveEffect::Capture(captured)
        } else {
            MoveEffect::Quiet
        };

        let decoded = self.decoded_mut()?;

        // Occupancy
        decoded.board[half_move.from.index()] = None;
        decoded.board[half_move.to.index()] = Some(match half_move.promotion {
            Some(kind) => Piece::new(kind, piece.side),
            None => piece,
        });
        match effect {
            MoveEffect::Castling { rook_move } => {
                decoded.board[rook_move.to.index()] = decoded.board[rook_move.from.index()].take();
            }
            MoveEffect::EnPassant { captured_square } => {
                decoded.board[captured_square.index()] = None;
            }
            _ => {}
        }

        // En-passant target: set only by a double pawn push
        decoded.en_passant = if piece.kind == PieceKind::Pawn
            && half_move.from.rank().abs_diff(half_move.to.rank()) == 2
        {
            Square::new(
                half_move.from.file(),
                (half_move.from.rank() + half_move.to.rank()) / 2,
            )
        } else {
            None
        };

        // Castling rights decay with king and rook movement or rook capture
        if piece.kind == PieceKind::King {
            decoded.castling.clear_side(piece.side);
        }
        for rook_home in [half_move.from, half_move.to] {
            match rook_home.to_string().as_str() {
                "a1" => decoded.castling.white_queenside = false,
                "h1" => decoded.castling.white_kingside = false,
                "a8" => decoded.castling.black_queenside = false,
                "h8" => decoded.castling.black_kingside = false,
                _ => {}
            }
        }

        // Clocks and turn
        let was_capture = !matches!(effect, MoveEffect::Quiet | MoveEffect::Castling { .. });
        if piece.kind == PieceKind::Pawn || was_capture {
            decoded.halfmove_clock = 0;
        } else {
            decoded.halfmove_clock += 1;
        }
        if piece.side == Side::Black {
            decoded.fullmove_number += 1;
        }
        decoded.side_to_move = piece.side.opposite();

        self.dirty = true;
        Ok(HalfMoveRecord::new(piece, *half_move, effect))
    }

    /// Reverse a previously applied half-move
    ///
    /// Returns `Ok(false)` without mutating when the record's metadata does
    /// not match the current occupancy: the destination square must hold the
    /// piece the notation implies just arrived there (the promotion target
    /// for 5-character moves) and the origin square must be empty. This
    /// sanity check prevents stale undo metadata from corrupting the board.
    ///
    /// On success the moved piece returns to its origin, any captured piece
    /// (including an en-passant pawn) is restored, a recorded rook
    /// displacement is reversed, side to move flips, the full-move counter
    /// decrements when the reversed ply was made by the second-moving side,
    /// and the half-move clock decrements unless already zero.
    pub fn undo_half_move(&mut self, record: &HalfMoveRecord) -> ChessCoreResult<bool> {
        let half_move = record.half_move;
        let expected_on_destination = match half_move.promotion {
            Some(kind) => Piece::new(kind, record.piece.side),
            None => record.piece,
        };

        let decoded = self.decoded_mut()?;
        if decoded.board[half_move.to.index()] != Some(expected_on_destination)
            || decoded.board[half_move.from.index()].is_some()
        {
            return Ok(false);
        }

        decoded.board[half_move.from.index()] = Some(record.piece);
        decoded.board[half_move.to.index()] = None;
        match record.effect {
            MoveEffect::Quiet => {
                decoded.en_passant = None;
            }
            MoveEffect::Capture(captured) => {
                decoded.board[half_move.to.index()] = Some(captured);
                decoded.en_passant = None;
            }
            MoveEffect::EnPassant { captured_square } => {
                decoded.board[captured_square.index()] =
                    Some(Piece::new(PieceKind::Pawn, record.piece.side.opposite()));
                // The capture consumed this target; undoing re-arms it
                decoded.en_passant = Some(half_move.to);
            }
            MoveEffect::Castling { rook_move } => {
                decoded.board[rook_move.from.index()] = decoded.board[rook_move.to.index()].take();
                decoded.en_passant = None;
            }
        }

        decoded.side_to_move = record.piece.side;
        if record.piece.side == Side::Black && decoded.fullmove_number > 1 {
            decoded.fullmove_number -= 1;
        }
        decoded.halfmove_clock = decoded.halfmove_clock.saturating_sub(1);

        self.dirty = true;
        Ok(true)
    }

    /// Castling moves currently available to `side`
    ///
    /// Derived purely from occupancy and the castling-rights field: a wing is
    /// available only when its rights flag is set, the squares between king
    /// and rook are empty, and king and rook still stand on their home
    /// squares.
    pub fn available_castling_moves(&mut self, side: Side) -> ChessCoreResult<Vec<Mv>> {
        let decoded = self.decoded()?;
        let (kingside_right, queenside_right) = match side {
            Side::White => (decoded.castling.white_kingside, decoded.castling.white_queenside),
            Side::Black => (decoded.castling.black_kingside, decoded.castling.black_queenside),
        };
        let back_rank = match side {
            Side::White => "1",
            Side::Black => "8",
        };
        let king = Piece::new(PieceKind::King, side);
        let rook = Piece::new(PieceKind::Rook, side);
        let at = |name: String| decoded.board[square(&name).index()];

        let mut moves = Vec::new();
        if kingside_right
            && at(format!("e{back_rank}")) == Some(king)
            && at(format!("h{back_rank}")) == Some(rook)
            && at(format!("f{back_rank}")).is_none()
            && at(format!("g{back_rank}")).is_none()
        {
            moves.push(mv(&format!("e{back_rank}g{back_rank}")));
        }
        if queenside_right
            && at(format!("e{back_rank}")) == Some(king)
            && at(format!("a{back_rank}")) == Some(rook)
            && at(format!("b{back_rank}")).is_none()
            && at(format!("c{back_rank}")).is_none()
            && at(format!("d{back_rank}")).is_none()
        {
            moves.push(mv(&format!("e{back_rank}c{back_rank}")));
        }
        Ok(moves)
    }

    /// Whether `half_move` is among the castling moves currently available
    /// to either side
    pub fn is_move_castling(&mut self, half_move: &Mv) -> ChessCoreResult<bool> {
        for side in [Side::White, Side::Black] {
            if self.available_castling_moves(side)?.contains(half_move) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Rook displacement paired with one of the four canonical castling
    /// king-moves, or `None` for any other move
    pub fn rook_move_for_castling(half_move: &Mv) -> Option<Mv> {
        let notation = half_move.to_string();
        CASTLING_ROOK_MOVES
            .iter()
            .find(|(king_move, _)| *king_move == notation)
            .map(|(_, rook_move)| mv(rook_move))
    }

    /// Whether this piece moving to this destination is an en-passant capture
    pub fn is_en_passant(&mut self, piece: Piece, half_move: &Mv) -> ChessCoreResult<bool> {
        Ok(piece.kind == PieceKind::Pawn
            && self.en_passant_target()? == Some(half_move.to))
    }

    /// Re-inject the fields an undo cannot recover from occupancy alone
    ///
    /// After reversing half-moves, castling rights and the full-move counter
    /// come from the side channel the caller captured before those moves
    /// were applied.
    pub fn load_non_recoverable_fields(
        &mut self,
        castling: crate::types::CastlingRights,
        fullmove_number: u32,
    ) -> ChessCoreResult<()> {
        let decoded = self.decoded_mut()?;
        decoded.castling = castling;
        decoded.fullmove_number = fullmove_number;
        self.dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::START_POSITION;
    use crate::types::CastlingRights;

    fn parse_mv(s: &str) -> Mv {
        s.parse().unwrap()
    }

    #[test]
    fn test_apply_e2e4_scenario() {
        let mut position = Position::initial();
        let record = position.apply_half_move(&parse_mv("e2e4")).unwrap();

        assert_eq!(record.piece, Piece::new(PieceKind::Pawn, Side::White));
        assert_eq!(record.effect, MoveEffect::Quiet);

        let encoded = position.encode().unwrap();
        let fields: Vec<&str> = encoded.split(' ').collect();
        let ranks: Vec<&str> = fields[0].split('/').collect();
        assert_eq!(ranks[4], "4P3", "rank 4 must show the pawn on e4");
        assert_eq!(ranks[6], "PPPP1PPP", "rank 2 must no longer show a pawn on e2");
        assert_eq!(fields[1], "b", "side to move flips");
        assert_eq!(fields[3], "e3", "double push arms the en-passant target");
        assert_eq!(fields[4], "0", "half-move clock resets on a pawn push");
        assert_eq!(fields[5], "1", "full-move number waits for the second side");
    }

    #[test]
    fn test_apply_then_undo_roundtrip() {
        let mut position = Position::initial();
        let rights_before = position.castling_rights().unwrap();
        let fullmove_before = position.fullmove_number().unwrap();

        let record = position.apply_half_move(&parse_mv("e2e4")).unwrap();
        assert!(position.undo_half_move(&record).unwrap());
        position
            .load_non_recoverable_fields(rights_before, fullmove_before)
            .unwrap();

        assert_eq!(position.encode().unwrap(), START_POSITION);
    }

    #[test]
    fn test_undo_mismatch_leaves_board_untouched() {
        let mut position = Position::initial();
        // Record claims a knight just arrived on e4; the board disagrees
        let stale = HalfMoveRecord::new(
            Piece::new(PieceKind::Knight, Side::White),
            parse_mv("g1e4"),
            MoveEffect::Quiet,
        );
        assert!(!position.undo_half_move(&stale).unwrap());
        assert_eq!(position.encode().unwrap(), START_POSITION);
    }

    #[test]
    fn test_undo_rejects_occupied_origin() {
        let mut position = Position::initial();
        let record = position.apply_half_move(&parse_mv("e2e4")).unwrap();
        // Something re-occupied the origin square behind our back
        position.decoded_mut().unwrap().board[parse_mv("e2e4").from.index()] =
            Some(Piece::new(PieceKind::Pawn, Side::White));
        assert!(!position.undo_half_move(&record).unwrap());
    }

    #[test]
    fn test_full_move_counter_decrements_for_black_only() {
        let mut position = Position::initial();
        let white_record = position.apply_half_move(&parse_mv("e2e4")).unwrap();
        let black_record = position.apply_half_move(&parse_mv("e7e5")).unwrap();
        assert_eq!(position.fullmove_number().unwrap(), 2);

        assert!(position.undo_half_move(&black_record).unwrap());
        assert_eq!(position.fullmove_number().unwrap(), 1);
        assert!(position.undo_half_move(&white_record).unwrap());
        assert_eq!(position.fullmove_number().unwrap(), 1);
    }

    #[test]
    fn test_castling_availability() {
        // White kingside path cleared by hand; queenside still blocked
        let mut position =
            Position::from_encoding("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQK2R w KQkq - 0 1");
        let white = position.available_castling_moves(Side::White).unwrap();
        assert_eq!(white, vec![parse_mv("e1g1")]);
        let black = position.available_castling_moves(Side::Black).unwrap();
        assert!(black.is_empty());

        assert!(position.is_move_castling(&parse_mv("e1g1")).unwrap());
        assert!(!position.is_move_castling(&parse_mv("e1c1")).unwrap());
    }

    #[test]
    fn test_castling_requires_rights_flag() {
        // Same occupancy, but White's rights were spent
        let mut position =
            Position::from_encoding("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQK2R w kq - 0 1");
        assert!(position
            .available_castling_moves(Side::White)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_castling_requires_home_squares() {
        // Rights claim kingside castling but the rook has wandered off h1
        let mut position =
            Position::from_encoding("rnbqkbnr/pppppppp/8/8/8/7R/PPPPPPPP/RNBQK3 w KQkq - 0 1");
        assert!(position
            .available_castling_moves(Side::White)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rook_move_lookup_table() {
        assert_eq!(
            Position::rook_move_for_castling(&parse_mv("e1g1")),
            Some(parse_mv("h1f1"))
        );
        assert_eq!(
            Position::rook_move_for_castling(&parse_mv("e1c1")),
            Some(parse_mv("a1d1"))
        );
        assert_eq!(
            Position::rook_move_for_castling(&parse_mv("e8g8")),
            Some(parse_mv("h8f8"))
        );
        assert_eq!(
            Position::rook_move_for_castling(&parse_mv("e8c8")),
            Some(parse_mv("a8d8"))
        );
        assert_eq!(Position::rook_move_for_castling(&parse_mv("e2e4")), None);
    }

    #[test]
    fn test_castling_apply_and_undo() {
        let encoding = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQK2R w KQkq - 4 5";
        let mut position = Position::from_encoding(encoding);
        let rights_before = position.castling_rights().unwrap();

        let record = position.apply_half_move(&parse_mv("e1g1")).unwrap();
        assert_eq!(
            record.effect,
            MoveEffect::Castling {
                rook_move: parse_mv("h1f1")
            }
        );
        assert_eq!(
            position.piece_at(square("g1")).unwrap(),
            Some(Piece::new(PieceKind::King, Side::White))
        );
        assert_eq!(
            position.piece_at(square("f1")).unwrap(),
            Some(Piece::new(PieceKind::Rook, Side::White))
        );
        // King move spends both of White's rights
        let rights = position.castling_rights().unwrap();
        assert!(!rights.white_kingside && !rights.white_queenside);
        assert!(rights.black_kingside && rights.black_queenside);

        assert!(position.undo_half_move(&record).unwrap());
        position
            .load_non_recoverable_fields(rights_before, 5)
            .unwrap();
        assert_eq!(position.encode().unwrap(), encoding);
    }

    #[test]
    fn test_en_passant_apply_and_undo() {
        // Black just pushed d7d5; White's e5 pawn may capture en passant
        let encoding = "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3";
        let mut position = Position::from_encoding(encoding);
        let pawn = Piece::new(PieceKind::Pawn, Side::White);
        assert!(position.is_en_passant(pawn, &parse_mv("e5d6")).unwrap());
        assert!(!position.is_en_passant(pawn, &parse_mv("e5e6")).unwrap());

        let record = position.apply_half_move(&parse_mv("e5d6")).unwrap();
        assert_eq!(
            record.effect,
            MoveEffect::EnPassant {
                captured_square: square("d5")
            }
        );
        assert!(position.piece_at(square("d5")).unwrap().is_none());
        assert_eq!(position.piece_at(square("d6")).unwrap(), Some(pawn));
        assert!(position.en_passant_target().unwrap().is_none());

        assert!(position.undo_half_move(&record).unwrap());
        position
            .load_non_recoverable_fields(CastlingRights::all(), 3)
            .unwrap();
        assert_eq!(position.encode().unwrap(), encoding);
    }

    #[test]
    fn test_promotion_apply_and_undo() {
        let encoding = "8/P7/8/8/8/8/8/k6K w - - 3 40";
        let mut position = Position::from_encoding(encoding);

        let record = position.apply_half_move(&parse_mv("a7a8q")).unwrap();
        assert_eq!(
            position.piece_at(square("a8")).unwrap(),
            Some(Piece::new(PieceKind::Queen, Side::White))
        );
        assert_eq!(position.halfmove_clock().unwrap(), 0);

        assert!(position.undo_half_move(&record).unwrap());
        // Clock is only decremented on undo, so restore it by hand before
        // comparing; rights and counter come from the side channel
        position.decoded_mut().unwrap().halfmove_clock = 3;
        position.dirty = true;
        position
            .load_non_recoverable_fields(CastlingRights::none(), 40)
            .unwrap();
        assert_eq!(position.encode().unwrap(), encoding);
    }

    #[test]
    fn test_capture_apply_and_undo() {
        // White pawn e4 takes black pawn d5
        let encoding = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
        let mut position = Position::from_encoding(encoding);

        let record = position.apply_half_move(&parse_mv("e4d5")).unwrap();
        assert_eq!(
            record.effect,
            MoveEffect::Capture(Piece::new(PieceKind::Pawn, Side::Black))
        );
        assert_eq!(position.halfmove_clock().unwrap(), 0);

        assert!(position.undo_half_move(&record).unwrap());
        position
            .load_non_recoverable_fields(CastlingRights::all(), 2)
            .unwrap();
        assert_eq!(position.encode().unwrap(), encoding);
    }

    #[test]
    fn test_rook_move_spends_one_wing() {
        let mut position =
            Position::from_encoding("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQK2R w KQkq - 0 1");
        position.apply_half_move(&parse_mv("h1g1")).unwrap();
        let rights = position.castling_rights().unwrap();
        assert!(!rights.white_kingside);
        assert!(rights.white_queenside);
    }
}
