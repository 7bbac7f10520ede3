//! Connect Four: seven columns, six rows, four in a row wins.

use linefour_protocol::Player;

use crate::{GameEngine, InvalidMove, Move};

/// Number of columns on the board.
pub const COLUMNS: usize = 7;

/// Number of rows in each column.
pub const ROWS: usize = 6;

/// Pieces in a line needed to win.
const LINE: usize = 4;

/// Directions checked for a winning line, as (column step, row step).
/// Each is scanned both ways, so four cover all eight neighbours.
const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// A Connect Four board.
///
/// Row 0 is the bottom of a column; pieces stack upwards. Player One
/// always moves first and the players strictly alternate.
#[derive(Debug, Clone, Default)]
pub struct ConnectFour {
    cells: [[Option<Player>; ROWS]; COLUMNS],
    heights: [usize; COLUMNS],
    moves: Vec<Move>,
    winner: Option<Player>,
}

impl ConnectFour {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// The player who won, if the game is decided.
    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    /// The player expected to move next.
    pub fn next_player(&self) -> Player {
        match self.moves.last() {
            Some(last) => last.player.other(),
            None => Player::One,
        }
    }

    fn cell(&self, column: isize, row: isize) -> Option<Player> {
        if column < 0 || row < 0 {
            return None;
        }
        let (column, row) = (column as usize, row as usize);
        if column >= COLUMNS || row >= ROWS {
            return None;
        }
        self.cells[column][row]
    }

    /// Counts `player`'s pieces in a line through (column, row).
    fn line_length(
        &self,
        player: Player,
        column: usize,
        row: usize,
        (dc, dr): (isize, isize),
    ) -> usize {
        let mut length = 1;
        for sign in [1, -1] {
            let (mut c, mut r) = (column as isize, row as isize);
            loop {
                c += dc * sign;
                r += dr * sign;
                if self.cell(c, r) != Some(player) {
                    break;
                }
                length += 1;
            }
        }
        length
    }
}

impl GameEngine for ConnectFour {
    fn attempt_move(
        &mut self,
        player: Player,
        column: usize,
    ) -> Result<usize, InvalidMove> {
        if self.winner.is_some() {
            return Err(InvalidMove::GameOver);
        }
        if player != self.next_player() {
            return Err(InvalidMove::NotYourTurn);
        }
        if column >= COLUMNS {
            return Err(InvalidMove::ColumnOutOfRange { max: COLUMNS - 1 });
        }
        let row = self.heights[column];
        if row == ROWS {
            return Err(InvalidMove::ColumnFull);
        }

        self.cells[column][row] = Some(player);
        self.heights[column] += 1;
        self.moves.push(Move { player, column, row });

        let won = DIRECTIONS
            .iter()
            .any(|dir| self.line_length(player, column, row, *dir) >= LINE);
        if won {
            self.winner = Some(player);
            tracing::debug!(%player, column, row, "winning move");
        }

        Ok(row)
    }

    fn last_move_won(&self) -> bool {
        match (self.moves.last(), self.winner) {
            (Some(last), Some(winner)) => last.player == winner,
            _ => false,
        }
    }

    fn moves(&self) -> &[Move] {
        &self.moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plays `columns` alternately starting with Player One.
    fn play_all(game: &mut ConnectFour, columns: &[usize]) {
        for &column in columns {
            let player = game.next_player();
            game.attempt_move(player, column).expect("move should be valid");
        }
    }

    #[test]
    fn test_attempt_move_stacks_pieces_upwards() {
        let mut game = ConnectFour::new();

        assert_eq!(game.attempt_move(Player::One, 3), Ok(0));
        assert_eq!(game.attempt_move(Player::Two, 3), Ok(1));
        assert_eq!(game.attempt_move(Player::One, 0), Ok(0));
    }

    #[test]
    fn test_attempt_move_player_two_first_is_not_your_turn() {
        let mut game = ConnectFour::new();

        let result = game.attempt_move(Player::Two, 0);

        assert_eq!(result, Err(InvalidMove::NotYourTurn));
        assert!(game.moves().is_empty());
    }

    #[test]
    fn test_attempt_move_same_player_twice_is_not_your_turn() {
        let mut game = ConnectFour::new();
        game.attempt_move(Player::One, 0).unwrap();

        assert_eq!(
            game.attempt_move(Player::One, 1),
            Err(InvalidMove::NotYourTurn)
        );
    }

    #[test]
    fn test_attempt_move_full_column_rejected_without_mutation() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[2, 2, 2, 2, 2, 2]);
        let before = game.moves().to_vec();

        let result = game.attempt_move(Player::One, 2);

        assert_eq!(result, Err(InvalidMove::ColumnFull));
        assert_eq!(result.unwrap_err().to_string(), "This slot is full.");
        assert_eq!(game.moves(), before.as_slice());
        assert_eq!(game.next_player(), Player::One);
    }

    #[test]
    fn test_attempt_move_out_of_range_rejected() {
        let mut game = ConnectFour::new();

        let result = game.attempt_move(Player::One, COLUMNS);

        assert_eq!(result, Err(InvalidMove::ColumnOutOfRange { max: 6 }));
        assert_eq!(
            result.unwrap_err().to_string(),
            "Column must be between 0 and 6."
        );
    }

    #[test]
    fn test_last_move_won_vertical() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 1, 0, 1, 0, 1]);
        assert!(!game.last_move_won());

        game.attempt_move(Player::One, 0).unwrap();

        assert!(game.last_move_won());
        assert_eq!(game.winner(), Some(Player::One));
    }

    #[test]
    fn test_last_move_won_horizontal() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 0, 1, 1, 2, 2]);

        game.attempt_move(Player::One, 3).unwrap();

        assert!(game.last_move_won());
    }

    #[test]
    fn test_last_move_won_diagonal_rising() {
        // One builds (0,0) (1,1) (2,2) (3,3); Two fills underneath.
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 1, 1, 2, 2, 3, 2, 3, 3, 6]);
        assert!(!game.last_move_won());

        game.attempt_move(Player::One, 3).unwrap();

        assert!(game.last_move_won());
    }

    #[test]
    fn test_last_move_won_diagonal_falling() {
        // One builds (3,0) (2,1) (1,2) (0,3).
        let mut game = ConnectFour::new();
        play_all(&mut game, &[3, 2, 2, 1, 1, 0, 1, 0, 0, 6]);

        game.attempt_move(Player::One, 0).unwrap();

        assert!(game.last_move_won());
    }

    #[test]
    fn test_three_in_a_row_is_not_a_win() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 6, 1, 6, 2]);

        assert!(!game.last_move_won());
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn test_attempt_move_after_win_is_game_over() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[0, 1, 0, 1, 0, 1, 0]);

        assert_eq!(
            game.attempt_move(Player::Two, 1),
            Err(InvalidMove::GameOver)
        );
        assert!(game.last_move_won(), "rejected move must not clear the win");
    }

    #[test]
    fn test_moves_records_history_in_order() {
        let mut game = ConnectFour::new();
        play_all(&mut game, &[3, 3, 4]);

        assert_eq!(
            game.moves(),
            &[
                Move { player: Player::One, column: 3, row: 0 },
                Move { player: Player::Two, column: 3, row: 1 },
                Move { player: Player::One, column: 4, row: 0 },
            ]
        );
    }
}
