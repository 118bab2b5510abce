//! Move window builder - bounded, resumable pages of the legal-move list
//!
//! Narrating two dozen legal moves in one breath is useless to a listener,
//! so the move list is served in pages. [`build_window`] takes the full
//! legal-move list for a position, annotates every move with its category
//! (capture, promotion, castling, en passant), sorts it under one of two
//! orderings, and returns a bounded page of moves grouped by origin square
//! together with a cursor to resume from.
//!
//! # Windowing heuristic
//!
//! The target page size is [`WINDOW_TARGET`] moves. The scan stops once the
//! accumulated count reaches the target, unless that would split an origin
//! square's moves across pages, in which case it extends by up to
//! [`WINDOW_TOLERANCE`] extra moves to finish the group. Promotion moves
//! count as [`PROMOTION_SLOT_WEIGHT`] of a slot when deciding whether the
//! remaining tail fits in a single final page, since the four promotion
//! choices of one pawn move collapse into one narrated item. The weight is a
//! narration-brevity tunable, not a correctness requirement; the binding
//! property is that concatenating pages in cursor order yields every legal
//! move exactly once.

use crate::error::{ChessCoreError, ChessCoreResult};
use crate::position::Position;
use crate::types::{Mv, Piece, PieceKind, Square};

/// Target number of moves per page
pub const WINDOW_TARGET: usize = 10;

/// Extra moves allowed to finish an origin-square group
pub const WINDOW_TOLERANCE: usize = 5;

/// Slot weight of a promotion move when sizing the final page
pub const PROMOTION_SLOT_WEIGHT: f32 = 0.75;

/// Category annotation for one legal move
///
/// Exactly one case applies; en passant and castling subsume their capture
/// and king-move nature, and a promotion records whether it also captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTag {
    Quiet,
    Capture,
    EnPassant,
    Castling,
    Promotion { capture: bool },
}

impl MoveTag {
    fn is_capture(self) -> bool {
        matches!(
            self,
            MoveTag::Capture | MoveTag::EnPassant | MoveTag::Promotion { capture: true }
        )
    }

    /// Capture-priority tier: en passant first, promotions last
    fn tier(self) -> u8 {
        match self {
            MoveTag::EnPassant => 0,
            MoveTag::Promotion { .. } => 2,
            _ => 1,
        }
    }
}

/// A legal move with its category annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedMove {
    pub half_move: Mv,
    pub tag: MoveTag,
}

impl AnnotatedMove {
    fn slot_weight(&self) -> f32 {
        if self.half_move.is_promotion() {
            PROMOTION_SLOT_WEIGHT
        } else {
            1.0
        }
    }
}

/// Moves sharing one origin square within a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveGroup {
    pub origin: Square,
    pub piece: Piece,
    pub moves: Vec<AnnotatedMove>,
    pub is_castling_group: bool,
    pub is_en_passant_group: bool,
}

/// One bounded page of the legal-move list
///
/// Concatenating `groups` across pages in cursor order reconstructs every
/// legal move exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveWindowPage {
    pub is_last_page: bool,
    pub next_cursor: usize,
    pub groups: Vec<MoveGroup>,
}

impl MoveWindowPage {
    /// All moves on this page in window order
    pub fn moves(&self) -> impl Iterator<Item = &AnnotatedMove> {
        self.groups.iter().flat_map(|group| group.moves.iter())
    }
}

/// Build one page of the legal-move list starting at `start_index`
///
/// With `capture_first` set (the narration default) the whole list is sorted
/// en-passant moves first, then non-promotions, then promotions, captures
/// before non-captures within each tier, ties broken lexicographically by
/// notation. Otherwise moves are grouped by origin square first with the
/// same capture/promotion tie-breaks inside each group.
///
/// The cursor indexes into the sorted list; resuming with `next_cursor`
/// continues exactly where the previous page stopped.
pub fn build_window(
    position: &mut Position,
    all_legal_moves: &[Mv],
    start_index: usize,
    capture_first: bool,
) -> ChessCoreResult<MoveWindowPage> {
    if start_index >= all_legal_moves.len() {
        return Err(ChessCoreError::WindowCursorOutOfRange {
            cursor: start_index,
            move_count: all_legal_moves.len(),
        });
    }

    let sorted = annotate_and_sort(position, all_legal_moves, capture_first)?;
    let tail = &sorted[start_index..];

    let tail_weight: f32 = tail.iter().map(AnnotatedMove::slot_weight).sum();
    let taken = if tail_weight <= (WINDOW_TARGET + WINDOW_TOLERANCE) as f32 {
        // The promotion-weighted tail fits in one final page
        tail.len()
    } else {
        let mut count = 0.0f32;
        let mut taken = 0;
        while taken < tail.len() && count < WINDOW_TARGET as f32 {
            count += tail[taken].slot_weight();
            taken += 1;
        }
        // Finish the origin group rather than split it across pages
        let mut extra = 0;
        while taken < tail.len()
            && extra < WINDOW_TOLERANCE
            && tail[..taken]
                .iter()
                .any(|m| m.half_move.from == tail[taken].half_move.from)
        {
            taken += 1;
            extra += 1;
        }
        taken
    };

    let mut groups: Vec<MoveGroup> = Vec::new();
    for annotated in &tail[..taken] {
        let origin = annotated.half_move.from;
        let group_idx = match groups.iter().position(|g| g.origin == origin) {
            Some(idx) => idx,
            None => {
                let piece = position.piece_at(origin)?.ok_or_else(|| {
                    ChessCoreError::precondition(format!(
                        "legal move {} starts from empty square {origin}",
                        annotated.half_move
                    ))
                })?;
                groups.push(MoveGroup {
                    origin,
                    piece,
                    moves: Vec::new(),
                    is_castling_group: false,
                    is_en_passant_group: false,
                });
                groups.len() - 1
            }
        };
        groups[group_idx].moves.push(annotated.clone());
    }
    for group in &mut groups {
        group.is_castling_group = group.moves.iter().all(|m| m.tag == MoveTag::Castling);
        group.is_en_passant_group = group.moves.iter().all(|m| m.tag == MoveTag::EnPassant);
    }

    Ok(MoveWindowPage {
        is_last_page: start_index + taken == sorted.len(),
        next_cursor: start_index + taken,
        groups,
    })
}

fn annotate_and_sort(
    position: &mut Position,
    all_legal_moves: &[Mv],
    capture_first: bool,
) -> ChessCoreResult<Vec<AnnotatedMove>> {
    let mut castling_moves = position.available_castling_moves(crate::types::Side::White)?;
    castling_moves.extend(position.available_castling_moves(crate::types::Side::Black)?);
    let en_passant_target = position.en_passant_target()?;

    let mut annotated = Vec::with_capacity(all_legal_moves.len());
    for half_move in all_legal_moves {
        let piece = position.piece_at(half_move.from)?.ok_or_else(|| {
            ChessCoreError::precondition(format!(
                "legal move {half_move} starts from empty square {}",
                half_move.from
            ))
        })?;
        let destination_occupied = position.piece_at(half_move.to)?.is_some();

        let tag = if castling_moves.contains(half_move) && piece.kind == PieceKind::King {
            MoveTag::Castling
        } else if piece.kind == PieceKind::Pawn && en_passant_target == Some(half_move.to) {
            MoveTag::EnPassant
        } else if half_move.is_promotion() {
            MoveTag::Promotion {
                capture: destination_occupied,
            }
        } else if destination_occupied {
            MoveTag::Capture
        } else {
            MoveTag::Quiet
        };
        annotated.push(AnnotatedMove {
            half_move: *half_move,
            tag,
        });
    }

    if capture_first {
        annotated.sort_by_key(|m| {
            (
                m.tag.tier(),
                !m.tag.is_capture(),
                m.half_move.to_string(),
            )
        });
    } else {
        annotated.sort_by_key(|m| {
            (
                m.half_move.from.index(),
                m.tag.tier(),
                !m.tag.is_capture(),
                m.half_move.to_string(),
            )
        });
    }
    Ok(annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn parse_moves(list: &[&str]) -> Vec<Mv> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    /// Collect every move across pages, asserting cursor discipline
    fn collect_all_pages(
        position: &mut Position,
        moves: &[Mv],
        capture_first: bool,
    ) -> (Vec<Mv>, usize) {
        let mut cursor = 0;
        let mut collected = Vec::new();
        let mut pages = 0;
        loop {
            let page = build_window(position, moves, cursor, capture_first).unwrap();
            pages += 1;
            collected.extend(page.moves().map(|m| m.half_move));
            if page.is_last_page {
                return (collected, pages);
            }
            assert!(page.next_cursor > cursor, "cursor must advance");
            cursor = page.next_cursor;
        }
    }

    #[test]
    fn test_cursor_out_of_range() {
        let mut position = Position::initial();
        let moves = parse_moves(&["e2e4"]);
        assert!(matches!(
            build_window(&mut position, &moves, 1, true),
            Err(ChessCoreError::WindowCursorOutOfRange { .. })
        ));
        assert!(matches!(
            build_window(&mut position, &[], 0, true),
            Err(ChessCoreError::WindowCursorOutOfRange { .. })
        ));
    }

    #[test]
    fn test_single_page_within_tolerance() {
        // 13 moves <= target + tolerance: one page, one call
        let mut position = Position::initial();
        let moves = parse_moves(&[
            "a2a3", "a2a4", "b2b3", "b2b4", "c2c3", "c2c4", "d2d3", "d2d4", "e2e3", "e2e4",
            "f2f3", "f2f4", "g2g3",
        ]);
        let page = build_window(&mut position, &moves, 0, true).unwrap();
        assert!(page.is_last_page);
        assert_eq!(page.next_cursor, 13);
        assert_eq!(page.moves().count(), 13);
    }

    #[test]
    fn test_window_completeness_both_orderings() {
        // The 20 legal starting moves
        let mut position = Position::initial();
        let moves = parse_moves(&[
            "a2a3", "a2a4", "b2b3", "b2b4", "c2c3", "c2c4", "d2d3", "d2d4", "e2e3", "e2e4",
            "f2f3", "f2f4", "g2g3", "g2g4", "h2h3", "h2h4", "b1a3", "b1c3", "g1f3", "g1h3",
        ]);
        for capture_first in [true, false] {
            let (collected, _) = collect_all_pages(&mut position, &moves, capture_first);
            let mut sorted_in = moves.clone();
            let mut sorted_out = collected.clone();
            sorted_in.sort_by_key(|m| m.to_string());
            sorted_out.sort_by_key(|m| m.to_string());
            assert_eq!(sorted_in, sorted_out, "every move exactly once");
        }
    }

    #[test]
    fn test_completeness_with_34_moves() {
        // 34 legal moves in an open position; the union of all pages must
        // cover the list exactly once
        let mut position = Position::from_encoding("k7/8/8/8/3Q4/8/8/R3K2N w - - 0 30");
        let moves = parse_moves(&[
            "d4d5", "d4d6", "d4d7", "d4d8", "d4d3", "d4d2", "d4d1", "d4a4", "d4b4", "d4c4",
            "d4e4", "d4f4", "d4g4", "d4h4", "d4c3", "d4b2", "d4e5", "d4f6", "d4g7", "d4h8",
            "d4c5", "d4b6", "d4a7", "d4e3", "d4f2", "d4g1", "a1a2", "a1a3", "a1b1", "a1c1",
            "a1d1", "e1d2", "e1e2", "e1f2",
        ]);
        let (collected, pages) = collect_all_pages(&mut position, &moves, true);
        assert_eq!(collected.len(), 34);
        let mut sorted_in = moves.clone();
        let mut sorted_out = collected;
        sorted_in.sort_by_key(|m| m.to_string());
        sorted_out.sort_by_key(|m| m.to_string());
        assert_eq!(sorted_in, sorted_out);
        // Pages are bounded by target + tolerance, so 34 unweighted moves
        // need at least three of them
        assert!((3..=4).contains(&pages));
    }

    #[test]
    fn test_capture_priority_ordering() {
        // White to move: e4 pawn can capture d5 en passant or push; the
        // rook can capture h7 or move quietly; a promotion brings up the rear
        let mut position = Position::from_encoding(
            "rnbqk1n1/ppp1pPpp/8/3pP3/7R/8/PPPP2P1/RNBQKBN1 w Q d6 0 9",
        );
        let moves = parse_moves(&["e5d6", "e5e6", "h4h7", "h4h5", "f7g8q", "f7f8q"]);
        let page = build_window(&mut position, &moves, 0, true).unwrap();
        let ordered: Vec<String> = page.moves().map(|m| m.half_move.to_string()).collect();
        // En passant first, then captures before quiet moves, promotions last
        assert_eq!(ordered[0], "e5d6");
        assert_eq!(ordered[1], "h4h7");
        let promotion_positions: Vec<usize> = ordered
            .iter()
            .enumerate()
            .filter(|(_, n)| n.len() == 5)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(promotion_positions, vec![4, 5]);
        // The capturing promotion sorts before the quiet one
        assert_eq!(ordered[4], "f7g8q");
    }

    #[test]
    fn test_origin_grouping_keeps_squares_contiguous() {
        let mut position = Position::initial();
        let moves = parse_moves(&[
            "a2a3", "b1c3", "a2a4", "b1a3", "e2e4", "e2e3", "g1f3",
        ]);
        let page = build_window(&mut position, &moves, 0, false).unwrap();
        let origins: Vec<String> = page.groups.iter().map(|g| g.origin.to_string()).collect();
        assert_eq!(origins, vec!["b1", "g1", "a2", "e2"]);
        assert_eq!(page.groups[0].moves.len(), 2);
        assert_eq!(page.groups[0].piece.kind, PieceKind::Knight);
    }

    #[test]
    fn test_group_not_split_across_pages() {
        // 16 single-move origins followed by one 4-move queen group placed
        // so the target boundary would land inside it
        let mut position = Position::from_encoding(
            "k7/8/8/8/3Q4/8/PPPPPPPP/RNB1KBNR w - - 0 30",
        );
        let mut notations = vec![
            "a2a3", "b2b3", "c2c3", "d2d3", "e2e3", "f2f3", "g2g3", "h2h3", "a2a4",
        ];
        notations.extend(["d4d5", "d4d6", "d4d7", "d4d8"]);
        notations.extend(["b1a3", "b1c3", "g1f3", "g1h3"]);
        let moves = parse_moves(&notations);
        // 17 moves total: too many for one page, so the scan stops at the
        // target and extends only to finish an open group
        let first = build_window(&mut position, &moves, 0, false).unwrap();
        assert!(!first.is_last_page);
        for group in &first.groups {
            let total_from_origin = moves
                .iter()
                .filter(|m| m.from == group.origin)
                .count();
            assert_eq!(
                group.moves.len(),
                total_from_origin,
                "group {} must not be split",
                group.origin
            );
        }
        let second = build_window(&mut position, &moves, first.next_cursor, false).unwrap();
        assert!(second.is_last_page);
        assert_eq!(
            first.moves().count() + second.moves().count(),
            moves.len()
        );
    }

    #[test]
    fn test_promotion_weighting_extends_final_page() {
        // 8 quiet moves + 8 promotion variants: 16 raw moves, but the
        // weighted total 8 + 8 * 0.75 = 14 fits a single final page
        let mut position = Position::from_encoding(
            "k7/4PP2/8/8/8/8/1PPPPPP1/4K3 w - - 0 40",
        );
        let mut notations: Vec<String> = ["b2b3", "c2c3", "d2d3", "e2e3", "f2f3", "g2g3", "e1d1", "e1f1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for promo in ["q", "r", "b", "n"] {
            notations.push(format!("e7e8{promo}"));
            notations.push(format!("f7f8{promo}"));
        }
        let moves: Vec<Mv> = notations.iter().map(|s| s.parse().unwrap()).collect();
        let page = build_window(&mut position, &moves, 0, true).unwrap();
        assert!(page.is_last_page);
        assert_eq!(page.moves().count(), 16);
    }

    #[test]
    fn test_castling_group_tagging() {
        let mut position =
            Position::from_encoding("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1");
        let moves = parse_moves(&["e1g1", "e1c1"]);
        let page = build_window(&mut position, &moves, 0, true).unwrap();
        assert_eq!(page.groups.len(), 1);
        assert!(page.groups[0].is_castling_group);
        assert!(!page.groups[0].is_en_passant_group);

        // A mixed king group is not a castling group
        let moves = parse_moves(&["e1g1", "e1d1"]);
        let page = build_window(&mut position, &moves, 0, true).unwrap();
        assert!(!page.groups[0].is_castling_group);
    }

    #[test]
    fn test_en_passant_group_tagging() {
        let mut position = Position::from_encoding(
            "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3",
        );
        let moves = parse_moves(&["e5d6"]);
        let page = build_window(&mut position, &moves, 0, true).unwrap();
        assert!(page.groups[0].is_en_passant_group);
        assert_eq!(page.groups[0].moves[0].tag, MoveTag::EnPassant);
    }
}
