//! Core chess value types
//!
//! Defines the small copyable values the rest of the crate is built from:
//! sides, piece kinds, squares, move notation, castling rights, and the
//! tagged side-effect variant recorded alongside each applied half-move.
//!
//! Everything a caller persists between conversation turns derives
//! `serde::{Serialize, Deserialize}`, since the persisted state layout is an
//! opaque blob owned by the caller.

use crate::error::{ChessCoreError, ChessCoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// The other player
    pub fn opposite(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Single-character side-to-move token used in the position encoding
    pub fn token(self) -> char {
        match self {
            Side::White => 'w',
            Side::Black => 'b',
        }
    }

    pub fn from_token(c: char) -> Option<Side> {
        match c {
            'w' => Some(Side::White),
            'b' => Some(Side::Black),
            _ => None,
        }
    }
}

/// Piece type without color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceKind {
    /// Lowercase piece letter used in encodings and promotion suffixes
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Rook => 'r',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub fn from_letter(c: char) -> Option<PieceKind> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'r' => Some(PieceKind::Rook),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Narration priority: king first, pawns last.
    ///
    /// Used to keep `pieces_of_side` output stable for spoken summaries.
    pub fn narration_priority(self) -> u8 {
        match self {
            PieceKind::King => 0,
            PieceKind::Queen => 1,
            PieceKind::Rook => 2,
            PieceKind::Bishop => 3,
            PieceKind::Knight => 4,
            PieceKind::Pawn => 5,
        }
    }
}

/// A colored piece as it appears in the position encoding
///
/// Case encodes color: uppercase letters are White, lowercase are Black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub side: Side,
}

impl Piece {
    pub fn new(kind: PieceKind, side: Side) -> Piece {
        Piece { kind, side }
    }

    /// Parse a piece code character (`'P'`, `'n'`, ...)
    pub fn from_char(c: char) -> Option<Piece> {
        let kind = PieceKind::from_letter(c)?;
        let side = if c.is_ascii_uppercase() {
            Side::White
        } else {
            Side::Black
        };
        Some(Piece { kind, side })
    }

    /// Piece code character: uppercase for White, lowercase for Black
    pub fn to_char(self) -> char {
        match self.side {
            Side::White => self.kind.letter().to_ascii_uppercase(),
            Side::Black => self.kind.letter(),
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A board square, stored as a linear index (0 = a1, 63 = h8)
///
/// Index formula: `rank * 8 + file`, with rank 0 = rank 1 and file 0 = the
/// a-file. Parsed from and displayed as the two-character label ("e4").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Square(u8);

impl Square {
    /// Build a square from file (0-7) and rank (0-7) indices
    pub fn new(file: u8, rank: u8) -> Option<Square> {
        if file < 8 && rank < 8 {
            Some(Square(rank * 8 + file))
        } else {
            None
        }
    }

    pub fn from_index(index: u8) -> Option<Square> {
        if index < 64 {
            Some(Square(index))
        } else {
            None
        }
    }

    /// Linear board index (0-63)
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// File index (0 = a-file)
    #[inline]
    pub fn file(self) -> u8 {
        self.0 % 8
    }

    /// Rank index (0 = rank 1)
    #[inline]
    pub fn rank(self) -> u8 {
        self.0 / 8
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            (b'a' + self.file()) as char,
            (b'1' + self.rank()) as char
        )
    }
}

impl FromStr for Square {
    type Err = ChessCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ChessCoreError::MalformedMove {
                text: s.to_string(),
            });
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or_else(|| ChessCoreError::MalformedMove {
            text: s.to_string(),
        })
    }
}

/// A half-move in coordinate notation
///
/// Four characters (origin + destination, "e2e4") or five with a trailing
/// promotion piece letter ("a7a8q").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mv {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl Mv {
    pub fn new(from: Square, to: Square) -> Mv {
        Mv {
            from,
            to,
            promotion: None,
        }
    }

    /// The same move carrying a promotion suffix
    pub fn with_promotion(self, kind: PieceKind) -> Mv {
        Mv {
            promotion: Some(kind),
            ..self
        }
    }

    /// The 4-character form with any promotion suffix stripped
    pub fn bare(self) -> Mv {
        Mv {
            promotion: None,
            ..self
        }
    }

    pub fn is_promotion(self) -> bool {
        self.promotion.is_some()
    }
}

impl fmt::Display for Mv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.letter())?;
        }
        Ok(())
    }
}

impl FromStr for Mv {
    type Err = ChessCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() || (s.len() != 4 && s.len() != 5) {
            return Err(ChessCoreError::MalformedMove {
                text: s.to_string(),
            });
        }
        let from: Square = s[0..2].parse().map_err(|_| ChessCoreError::MalformedMove {
            text: s.to_string(),
        })?;
        let to: Square = s[2..4].parse().map_err(|_| ChessCoreError::MalformedMove {
            text: s.to_string(),
        })?;
        let promotion = match s.len() {
            5 => {
                let c = s.chars().nth(4).unwrap_or('?');
                let kind =
                    PieceKind::from_letter(c).ok_or_else(|| ChessCoreError::MalformedMove {
                        text: s.to_string(),
                    })?;
                // A king is never a promotion target
                if kind == PieceKind::King || kind == PieceKind::Pawn {
                    return Err(ChessCoreError::MalformedMove {
                        text: s.to_string(),
                    });
                }
                Some(kind)
            }
            _ => None,
        };
        Ok(Mv {
            from,
            to,
            promotion,
        })
    }
}

/// Castling rights for both sides and wings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub fn all() -> CastlingRights {
        CastlingRights {
            white_kingside: true,
            white_queenside: true,
            black_kingside: true,
            black_queenside: true,
        }
    }

    pub fn none() -> CastlingRights {
        CastlingRights {
            white_kingside: false,
            white_queenside: false,
            black_kingside: false,
            black_queenside: false,
        }
    }

    /// Parse the castling-rights field of a position encoding
    ///
    /// Accepts a subset of `KQkq` in any order, or `-` for no rights.
    pub fn parse(field: &str) -> ChessCoreResult<CastlingRights> {
        if field == "-" {
            return Ok(CastlingRights::none());
        }
        let mut rights = CastlingRights::none();
        for c in field.chars() {
            match c {
                'K' => rights.white_kingside = true,
                'Q' => rights.white_queenside = true,
                'k' => rights.black_kingside = true,
                'q' => rights.black_queenside = true,
                _ => {
                    return Err(ChessCoreError::malformed_position(format!(
                        "unknown castling-rights token '{c}'"
                    )))
                }
            }
        }
        Ok(rights)
    }

    /// Encode back to the `KQkq` / `-` field format
    pub fn encode(&self) -> String {
        let mut s = String::new();
        if self.white_kingside {
            s.push('K');
        }
        if self.white_queenside {
            s.push('Q');
        }
        if self.black_kingside {
            s.push('k');
        }
        if self.black_queenside {
            s.push('q');
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }

    /// Drop both rights for one side (the king moved)
    pub fn clear_side(&mut self, side: Side) {
        match side {
            Side::White => {
                self.white_kingside = false;
                self.white_queenside = false;
            }
            Side::Black => {
                self.black_kingside = false;
                self.black_queenside = false;
            }
        }
    }
}

/// Side effect recorded with an applied half-move
///
/// Exactly one case is active per record: capture, castling and en passant
/// are mutually exclusive move categories. Promotion is not a case here
/// because it is encoded jointly with the move notation (5 characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveEffect {
    /// Plain move, nothing captured or displaced
    Quiet,
    /// The piece that stood on the destination square
    Capture(Piece),
    /// The rook displacement performed together with the king move
    Castling { rook_move: Mv },
    /// The square the captured pawn actually stood on
    EnPassant { captured_square: Square },
}

/// Game-state classification for a refreshed position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Ok,
    Check,
    Checkmate,
    Stalemate,
    FiftyMoveDraw,
}
