use chess::{Board, Piece};

/// Bitboard of the light squares (b1, a2, ...).
const LIGHT_SQUARES: u64 = 0x55AA_55AA_55AA_55AA;

/// Lowercase letter used for a promotion piece on the wire.
pub fn piece_tag(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "p",
        Piece::Knight => "n",
        Piece::Bishop => "b",
        Piece::Rook => "r",
        Piece::Queen => "q",
        Piece::King => "k",
    }
}

/// Parse a promotion piece letter. Only pieces a pawn can become are accepted.
pub fn piece_from_tag(tag: &str) -> Option<Piece> {
    match tag.trim().to_ascii_lowercase().as_str() {
        "q" => Some(Piece::Queen),
        "r" => Some(Piece::Rook),
        "b" => Some(Piece::Bishop),
        "n" => Some(Piece::Knight),
        _ => None,
    }
}

/// Check if neither side has enough material left to deliver mate.
///
/// Covers king against king, king and a single minor piece against king, and
/// any number of bishops (either side) that all stand on one square colour.
pub fn has_insufficient_material(board: &Board) -> bool {
    let total = board.combined().popcnt();
    let knights = board.pieces(Piece::Knight).popcnt();
    let bishops = board.pieces(Piece::Bishop).0;
    let bishop_count = bishops.count_ones();

    match total {
        2 => true,
        3 => knights == 1 || bishop_count == 1,
        _ if total == bishop_count + 2 => {
            let on_light = (bishops & LIGHT_SQUARES).count_ones();
            on_light == 0 || on_light == bishop_count
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn board(fen: &str) -> Board {
        Board::from_str(fen).expect("valid test position")
    }

    #[test]
    fn lone_minor_piece_cannot_mate() {
        assert!(has_insufficient_material(&board("8/8/4k3/8/8/3KN3/8/8 w - - 0 1")));
        assert!(has_insufficient_material(&board("8/8/4k3/8/8/3KB3/8/8 w - - 0 1")));
    }

    #[test]
    fn same_coloured_bishops_cannot_mate() {
        // c1 and f4 are both dark squares.
        assert!(has_insufficient_material(&board("8/8/4k3/8/5b2/3K4/8/2B5 w - - 0 1")));
        // c1 is dark, f5 is light.
        assert!(!has_insufficient_material(&board("8/8/4k3/5b2/8/3K4/8/2B5 w - - 0 1")));
    }

    #[test]
    fn pawns_and_heavy_pieces_are_sufficient() {
        assert!(!has_insufficient_material(&board("8/8/4k3/8/8/3K4/4P3/8 w - - 0 1")));
        assert!(!has_insufficient_material(&board("8/8/4k3/8/8/3K4/8/7R w - - 0 1")));
        assert!(!has_insufficient_material(&board("8/8/4k3/8/8/3KNN2/8/8 w - - 0 1")));
        assert!(!has_insufficient_material(&Board::default()));
    }

    #[test]
    fn wire_tags() {
        assert_eq!(piece_from_tag("Q"), Some(Piece::Queen));
        assert_eq!(piece_from_tag("k"), None);
        assert_eq!(piece_tag(Piece::Knight), "n");
    }
}
