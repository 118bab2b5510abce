//! Position codec - authoritative chess state and its line encoding
//!
//! A [`Position`] owns the full chess state at a point in time: piece
//! placement, side to move, castling rights, en-passant target, half-move
//! clock and full-move number. It is constructed from (and re-encoded to) a
//! single-line positional string with six space-separated fields:
//!
//! ```text
//! rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1
//! ```
//!
//! # Lazy decoding
//!
//! Decoding is deferred until the first query. A caller that constructs a
//! `Position` only to pass the string through to a later [`Position::encode`]
//! pays O(1): the original input is returned byte-identical as long as no
//! mutation occurred. Pure reads never set the dirty flag, so decode followed
//! by re-encode is idempotent.
//!
//! # Ownership
//!
//! One session owns one `Position`; there is no shared ownership and no
//! internal locking. Mutation happens in place through the methods in
//! [`crate::mutation`].

use crate::error::{ChessCoreError, ChessCoreResult};
use crate::types::{CastlingRights, Piece, PieceKind, Side, Square};

/// Standard starting position encoding
pub const START_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Per-side starting multiset used by captured-piece accounting
const START_COUNTS: [(PieceKind, u8); 6] = [
    (PieceKind::Pawn, 8),
    (PieceKind::Rook, 2),
    (PieceKind::Knight, 2),
    (PieceKind::Bishop, 2),
    (PieceKind::Queen, 1),
    (PieceKind::King, 1),
];

/// Decoded field set of a positional string
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Decoded {
    pub board: [Option<Piece>; 64],
    pub side_to_move: Side,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

/// Authoritative chess state, lazily decoded from its line encoding
#[derive(Debug, Clone)]
pub struct Position {
    pub(crate) text: String,
    pub(crate) decoded: Option<Decoded>,
    pub(crate) dirty: bool,
}

/// Pieces missing from each side's starting multiset
///
/// `white` lists the white pieces no longer on the board (i.e. the pieces
/// White has lost), ordered by narration priority; same for `black`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapturedPieces {
    pub white: Vec<PieceKind>,
    pub black: Vec<PieceKind>,
}

impl Position {
    /// Wrap an encoding string without decoding it yet
    ///
    /// The string is validated on the first query method call, not here.
    pub fn from_encoding(text: impl Into<String>) -> Position {
        Position {
            text: text.into(),
            decoded: None,
            dirty: false,
        }
    }

    /// The standard starting position
    pub fn initial() -> Position {
        Position::from_encoding(START_POSITION)
    }

    /// Decode on first use; subsequent calls reuse the cached fields
    pub(crate) fn decoded(&mut self) -> ChessCoreResult<&Decoded> {
        if self.decoded.is_none() {
            self.decoded = Some(decode(&self.text)?);
        }
        Ok(self.decoded.as_ref().expect("just decoded"))
    }

    /// Mutable access for the mutator; callers must set `dirty` themselves
    pub(crate) fn decoded_mut(&mut self) -> ChessCoreResult<&mut Decoded> {
        if self.decoded.is_none() {
            self.decoded = Some(decode(&self.text)?);
        }
        Ok(self.decoded.as_mut().expect("just decoded"))
    }

    /// Piece standing on `square`, if any
    pub fn piece_at(&mut self, square: Square) -> ChessCoreResult<Option<Piece>> {
        Ok(self.decoded()?.board[square.index()])
    }

    /// All eight squares of rank `n` (1-8), a-file first, with their contents
    pub fn rank(&mut self, n: u8) -> ChessCoreResult<Vec<(Square, Option<Piece>)>> {
        if !(1..=8).contains(&n) {
            return Err(ChessCoreError::RankOutOfRange { rank: n as i32 });
        }
        let decoded = self.decoded()?;
        let rank_idx = n - 1;
        let mut out = Vec::with_capacity(8);
        for file in 0..8 {
            let square = Square::new(file, rank_idx).expect("file and rank in range");
            out.push((square, decoded.board[square.index()]));
        }
        Ok(out)
    }

    /// Squares holding the given colored piece, in board order
    pub fn pieces_of_type(&mut self, piece: Piece) -> ChessCoreResult<Vec<Square>> {
        let decoded = self.decoded()?;
        let mut out = Vec::new();
        for idx in 0..64u8 {
            if decoded.board[idx as usize] == Some(piece) {
                out.push(Square::from_index(idx).expect("index below 64"));
            }
        }
        Ok(out)
    }

    /// All pieces of one side, sorted king-queen-rook-bishop-knight-pawn
    ///
    /// The fixed piece-value priority keeps spoken summaries stable; ties
    /// within a kind break by board order.
    pub fn pieces_of_side(&mut self, side: Side) -> ChessCoreResult<Vec<(Square, Piece)>> {
        let decoded = self.decoded()?;
        let mut out: Vec<(Square, Piece)> = Vec::new();
        for idx in 0..64u8 {
            if let Some(piece) = decoded.board[idx as usize] {
                if piece.side == side {
                    out.push((Square::from_index(idx).expect("index below 64"), piece));
                }
            }
        }
        out.sort_by_key(|(square, piece)| (piece.kind.narration_priority(), square.index()));
        Ok(out)
    }

    /// Pieces each side has lost, computed by diffing the current placement
    /// against the standard starting multiset
    ///
    /// This is a pure function of the current placement, independent of move
    /// history, so it stays correct even when the history is lost. Pieces
    /// gained through promotion saturate at zero rather than reporting a
    /// negative count.
    pub fn captured_pieces(&mut self) -> ChessCoreResult<CapturedPieces> {
        let decoded = self.decoded()?;
        let mut counts = [[0u8; 6]; 2];
        for cell in decoded.board.iter().flatten() {
            let side_idx = match cell.side {
                Side::White => 0,
                Side::Black => 1,
            };
            counts[side_idx][cell.kind.narration_priority() as usize] += 1;
        }

        let mut result = CapturedPieces::default();
        for (kind, start_count) in START_COUNTS {
            let slot = kind.narration_priority() as usize;
            for _ in counts[0][slot]..start_count {
                result.white.push(kind);
            }
            for _ in counts[1][slot]..start_count {
                result.black.push(kind);
            }
        }
        result
            .white
            .sort_by_key(|kind| kind.narration_priority());
        result
            .black
            .sort_by_key(|kind| kind.narration_priority());
        Ok(result)
    }

    /// Side whose turn it is
    pub fn side_to_move(&mut self) -> ChessCoreResult<Side> {
        Ok(self.decoded()?.side_to_move)
    }

    /// Current castling rights
    pub fn castling_rights(&mut self) -> ChessCoreResult<CastlingRights> {
        Ok(self.decoded()?.castling)
    }

    /// Current en-passant target square, if any
    pub fn en_passant_target(&mut self) -> ChessCoreResult<Option<Square>> {
        Ok(self.decoded()?.en_passant)
    }

    /// Plies since the last capture or pawn push
    pub fn halfmove_clock(&mut self) -> ChessCoreResult<u32> {
        Ok(self.decoded()?.halfmove_clock)
    }

    /// Full-move number (increments after the second-moving side moves)
    pub fn fullmove_number(&mut self) -> ChessCoreResult<u32> {
        Ok(self.decoded()?.fullmove_number)
    }

    /// Re-encode the position to its line format
    ///
    /// Returns the original input unchanged when no mutation occurred since
    /// construction. After a mutation, all six fields are re-serialized and
    /// the dirty flag cleared.
    pub fn encode(&mut self) -> ChessCoreResult<String> {
        if self.dirty {
            let text = encode_decoded(self.decoded()?);
            self.text = text;
            self.dirty = false;
        }
        Ok(self.text.clone())
    }
}

fn decode(text: &str) -> ChessCoreResult<Decoded> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(ChessCoreError::malformed_position(format!(
            "expected 6 fields, found {}",
            fields.len()
        )));
    }

    let rank_groups: Vec<&str> = fields[0].split('/').collect();
    if rank_groups.len() != 8 {
        return Err(ChessCoreError::malformed_position(format!(
            "expected 8 rank groups, found {}",
            rank_groups.len()
        )));
    }

    let mut board = [None; 64];
    for (group_idx, group) in rank_groups.iter().enumerate() {
        // Groups run rank 8 down to rank 1
        let rank = 7 - group_idx;
        let mut file = 0usize;
        for c in group.chars() {
            if let Some(run) = c.to_digit(10) {
                if run == 0 || run > 8 {
                    return Err(ChessCoreError::malformed_position(format!(
                        "invalid empty-square run '{c}' in rank {}",
                        rank + 1
                    )));
                }
                file += run as usize;
            } else {
                let piece = Piece::from_char(c).ok_or_else(|| {
                    ChessCoreError::malformed_position(format!(
                        "unknown piece code '{c}' in rank {}",
                        rank + 1
                    ))
                })?;
                if file >= 8 {
                    return Err(ChessCoreError::malformed_position(format!(
                        "rank {} overflows 8 files",
                        rank + 1
                    )));
                }
                board[rank * 8 + file] = Some(piece);
                file += 1;
            }
        }
        if file != 8 {
            return Err(ChessCoreError::malformed_position(format!(
                "rank {} sums to {file} files, expected 8",
                rank + 1
            )));
        }
    }

    let side_to_move = match fields[1] {
        "w" => Side::White,
        "b" => Side::Black,
        other => {
            return Err(ChessCoreError::malformed_position(format!(
                "invalid side-to-move token '{other}'"
            )))
        }
    };

    let castling = CastlingRights::parse(fields[2])?;

    let en_passant = match fields[3] {
        "-" => None,
        square => Some(square.parse::<Square>().map_err(|_| {
            ChessCoreError::malformed_position(format!("invalid en-passant target '{square}'"))
        })?),
    };

    let halfmove_clock: u32 = fields[4].parse().map_err(|_| {
        ChessCoreError::malformed_position(format!("invalid half-move clock '{}'", fields[4]))
    })?;

    let fullmove_number: u32 = fields[5].parse().map_err(|_| {
        ChessCoreError::malformed_position(format!("invalid full-move number '{}'", fields[5]))
    })?;
    if fullmove_number == 0 {
        return Err(ChessCoreError::malformed_position(
            "full-move number must be positive",
        ));
    }

    Ok(Decoded {
        board,
        side_to_move,
        castling,
        en_passant,
        halfmove_clock,
        fullmove_number,
    })
}

fn encode_decoded(decoded: &Decoded) -> String {
    let mut text = String::with_capacity(72);
    for rank in (0..8).rev() {
        let mut empty_run = 0u8;
        for file in 0..8 {
            match decoded.board[rank * 8 + file] {
                Some(piece) => {
                    if empty_run > 0 {
                        text.push((b'0' + empty_run) as char);
                        empty_run = 0;
                    }
                    text.push(piece.to_char());
                }
                None => empty_run += 1,
            }
        }
        if empty_run > 0 {
            text.push((b'0' + empty_run) as char);
        }
        if rank > 0 {
            text.push('/');
        }
    }

    text.push(' ');
    text.push(decoded.side_to_move.token());
    text.push(' ');
    text.push_str(&decoded.castling.encode());
    text.push(' ');
    match decoded.en_passant {
        Some(square) => text.push_str(&square.to_string()),
        None => text.push('-'),
    }
    text.push(' ');
    text.push_str(&decoded.halfmove_clock.to_string());
    text.push(' ');
    text.push_str(&decoded.fullmove_number.to_string());
    text
}
