//! Rules engine: legality, move application, terminal detection and the
//! canonical (FEN) position encoding.
//!
//! `chess::Board` gives us move generation and checkmate/stalemate, but it
//! keeps neither the half-move clock nor the full-move number, and it has no
//! notion of repetition. [`Position`] carries the counters and [`Game`] keeps
//! the repetition history on top of it.

use std::fmt;
use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Square};
use serde::{Deserialize, Serialize};

use crate::game::error::{IllegalMoveError, MalformedPositionError};
use crate::game::utils::{has_insufficient_material, piece_from_tag, piece_tag};

/// Encoding of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Half-moves without a capture or pawn move after which the game is drawn.
const FIFTY_MOVE_LIMIT: u32 = 100;

/// A proposed move as it arrives from a client. Nothing about it is checked
/// until it is resolved against a position.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
}

impl Move {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Move {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, piece: impl Into<String>) -> Self {
        self.promotion = Some(piece.into());
        self
    }

    fn from_chess_move(chess_move: ChessMove) -> Self {
        Move {
            from: chess_move.get_source().to_string(),
            to: chess_move.get_dest().to_string(),
            promotion: chess_move.get_promotion().map(|p| piece_tag(p).to_string()),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = &self.promotion {
            write!(f, "={}", promotion)?;
        }
        Ok(())
    }
}

/// Terminal status of a position, or `Ongoing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate,
    Stalemate,
    /// Fifty-move rule.
    Draw,
    ThreefoldRepetition,
    InsufficientMaterial,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        self != GameStatus::Ongoing
    }

    /// Reason tag sent to clients with `gameOver`.
    pub fn reason(self) -> Option<&'static str> {
        match self {
            GameStatus::Ongoing => None,
            GameStatus::Checkmate => Some("checkmate"),
            GameStatus::Stalemate => Some("stalemate"),
            GameStatus::Draw => Some("draw"),
            GameStatus::ThreefoldRepetition => Some("threefold repetition"),
            GameStatus::InsufficientMaterial => Some("insufficient material"),
        }
    }
}

/// Complete board state including the move counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            board: Board::default(),
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }
}

impl Position {
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The board prints the en-passant pawn's square and placeholder
        // counters; only its placement, side and castling fields are kept.
        let board = self.board.to_string();
        let fields: Vec<&str> = board.split_whitespace().take(3).collect();
        let en_passant = self
            .board
            .en_passant()
            .map(|pawn| pawn.ubackward(!self.board.side_to_move()).to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{} {} {} {}",
            fields.join(" "),
            en_passant,
            self.halfmove_clock,
            self.fullmove_number
        )
    }
}

impl FromStr for Position {
    type Err = MalformedPositionError;

    fn from_str(encoding: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = encoding.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(MalformedPositionError::FieldCount {
                found: fields.len(),
            });
        }

        let halfmove_clock = fields[4]
            .parse::<u32>()
            .map_err(|_| MalformedPositionError::Counter {
                field: "half-move",
                value: fields[4].to_string(),
            })?;
        let fullmove_number = fields[5]
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| MalformedPositionError::Counter {
                field: "full-move",
                value: fields[5].to_string(),
            })?;

        check_placement(fields[0]).map_err(|reason| MalformedPositionError::Board {
            fen: encoding.to_string(),
            reason,
        })?;
        let board =
            Board::from_str(&fields.join(" ")).map_err(|e| MalformedPositionError::Board {
                fen: encoding.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Position {
            board,
            halfmove_clock,
            fullmove_number,
        })
    }
}

/// Screens the piece placement field before it reaches the board parser:
/// eight ranks of eight squares, known piece letters only, one king per
/// side. The board parser aborts on a position without a king.
fn check_placement(placement: &str) -> Result<(), String> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(format!("expected 8 ranks, found {}", ranks.len()));
    }
    for king in ['K', 'k'] {
        let count = placement.chars().filter(|c| *c == king).count();
        if count != 1 {
            return Err(format!("expected one {:?}, found {}", king, count));
        }
    }
    for (index, rank) in ranks.iter().enumerate() {
        if (index == 0 || index == 7) && rank.contains(['p', 'P']) {
            return Err(format!("pawn on a back rank in {:?}", rank));
        }
        let mut squares = 0u32;
        let mut previous_was_digit = false;
        for c in rank.chars() {
            match c {
                '1'..='8' if !previous_was_digit => {
                    squares += c.to_digit(10).unwrap_or(0);
                    previous_was_digit = true;
                }
                'p' | 'n' | 'b' | 'r' | 'q' | 'k' | 'P' | 'N' | 'B' | 'R' | 'Q' | 'K' => {
                    squares += 1;
                    previous_was_digit = false;
                }
                _ => return Err(format!("unexpected {:?} in rank {:?}", c, rank)),
            }
        }
        if squares != 8 {
            return Err(format!("rank {:?} covers {} squares", rank, squares));
        }
    }
    Ok(())
}

/// Canonical text encoding of `position`.
pub fn serialize(position: &Position) -> String {
    position.to_string()
}

/// Restores a position from its canonical text encoding.
pub fn deserialize(encoding: &str) -> Result<Position, MalformedPositionError> {
    encoding.parse()
}

/// All legal moves starting on `square`. An unparseable square, an empty
/// square or a piece of the side not to move yields nothing.
pub fn legal_moves(position: &Position, square: &str) -> Vec<Move> {
    let Some(source) = parse_square(square) else {
        return Vec::new();
    };
    MoveGen::new_legal(&position.board)
        .filter(|m| m.get_source() == source)
        .map(Move::from_chess_move)
        .collect()
}

/// Applies `mv` if it is legal for the side to move. On failure `position`
/// is left as it was.
pub fn apply_move(position: &Position, mv: &Move) -> Result<Position, IllegalMoveError> {
    play_move(position, mv).map(|(next, _)| next)
}

/// Like [`apply_move`] but also returns the normalised move that was played.
fn play_move(position: &Position, mv: &Move) -> Result<(Position, Move), IllegalMoveError> {
    let chess_move = resolve_move(&position.board, mv)?;

    let moved = position.board.piece_on(chess_move.get_source());
    let captured = position.board.piece_on(chess_move.get_dest()).is_some();

    let halfmove_clock = if moved == Some(Piece::Pawn) || captured {
        0
    } else {
        position.halfmove_clock + 1
    };
    let fullmove_number = if position.side_to_move() == Color::Black {
        position.fullmove_number + 1
    } else {
        position.fullmove_number
    };

    let next = Position {
        board: position.board.make_move_new(chess_move),
        halfmove_clock,
        fullmove_number,
    };
    Ok((next, Move::from_chess_move(chess_move)))
}

/// Status of `position` given the hashes of every position reached so far
/// (including the current one). Checkmate wins over every other status.
pub fn status(position: &Position, history: &[u64]) -> GameStatus {
    match position.board.status() {
        BoardStatus::Checkmate => return GameStatus::Checkmate,
        BoardStatus::Stalemate => return GameStatus::Stalemate,
        BoardStatus::Ongoing => {}
    }

    if position.halfmove_clock >= FIFTY_MOVE_LIMIT {
        return GameStatus::Draw;
    }

    let hash = position.board.get_hash();
    if history.iter().filter(|h| **h == hash).count() >= 3 {
        return GameStatus::ThreefoldRepetition;
    }

    if has_insufficient_material(&position.board) {
        return GameStatus::InsufficientMaterial;
    }

    GameStatus::Ongoing
}

fn parse_square(text: &str) -> Option<Square> {
    let text = text.trim().to_ascii_lowercase();
    if text.len() != 2 {
        return None;
    }
    Square::from_str(&text).ok()
}

/// Finds the legal move matching `mv`. The promotion piece only matters for
/// pawn moves onto the last rank, where it is required.
fn resolve_move(board: &Board, mv: &Move) -> Result<ChessMove, IllegalMoveError> {
    let from = parse_square(&mv.from).ok_or_else(|| IllegalMoveError::InvalidSquare {
        square: mv.from.clone(),
        mv: mv.clone(),
    })?;
    let to = parse_square(&mv.to).ok_or_else(|| IllegalMoveError::InvalidSquare {
        square: mv.to.clone(),
        mv: mv.clone(),
    })?;
    let promotion = match &mv.promotion {
        Some(tag) => Some(
            piece_from_tag(tag).ok_or_else(|| IllegalMoveError::InvalidPromotion {
                piece: tag.clone(),
                mv: mv.clone(),
            })?,
        ),
        None => None,
    };

    MoveGen::new_legal(board)
        .find(|m| {
            m.get_source() == from
                && m.get_dest() == to
                && (m.get_promotion().is_none() || m.get_promotion() == promotion)
        })
        .ok_or_else(|| IllegalMoveError::NotLegal { mv: mv.clone() })
}

/// The authoritative position plus the repetition history needed for
/// threefold detection.
#[derive(Debug, Clone)]
pub struct Game {
    position: Position,
    history: Vec<u64>,
}

impl Default for Game {
    fn default() -> Self {
        Game::from_position(Position::default())
    }
}

impl Game {
    pub fn new() -> Self {
        Game::default()
    }

    /// Starts a fresh repetition history at `position`.
    pub fn from_position(position: Position) -> Self {
        Game {
            history: vec![position.board.get_hash()],
            position,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn fen(&self) -> String {
        serialize(&self.position)
    }

    /// Plays `mv`, returning the normalised move. All-or-nothing.
    pub fn play(&mut self, mv: &Move) -> Result<Move, IllegalMoveError> {
        let (next, applied) = play_move(&self.position, mv)?;
        self.history.push(next.board.get_hash());
        self.position = next;
        Ok(applied)
    }

    pub fn status(&self) -> GameStatus {
        status(&self.position, &self.history)
    }
}
