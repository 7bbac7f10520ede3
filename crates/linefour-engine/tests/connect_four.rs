//! Whole games played through the `GameEngine` trait.

use linefour_engine::{COLUMNS, ConnectFour, GameEngine, InvalidMove, Move, ROWS};
use linefour_protocol::Player;

/// Plays `columns` with strictly alternating players, starting with One.
/// Returns the row of every move.
fn play_all<G: GameEngine>(game: &mut G, columns: &[usize]) -> Vec<usize> {
    let mut player = Player::One;
    columns
        .iter()
        .map(|&column| {
            let row = game
                .attempt_move(player, column)
                .unwrap_or_else(|e| panic!("move to {column} refused: {e}"));
            player = player.other();
            row
        })
        .collect()
}

#[test]
fn test_full_board_without_a_line_is_a_draw() {
    let mut game = ConnectFour::default();
    let columns = [
        0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 4, 3, 3, 3, 3, 3,
        3, 4, 4, 4, 4, 4, 5, 5, 5, 5, 5, 5, 6, 6, 6, 6, 6, 6,
    ];

    play_all(&mut game, &columns);

    assert_eq!(game.moves().len(), ROWS * COLUMNS);
    assert_eq!(game.winner(), None);
    assert!(!game.last_move_won());
    for column in 0..COLUMNS {
        assert_eq!(
            game.attempt_move(Player::One, column),
            Err(InvalidMove::ColumnFull)
        );
    }
}

#[test]
fn test_history_replays_onto_a_fresh_board() {
    let mut original = ConnectFour::default();
    play_all(&mut original, &[3, 3, 2, 4, 2, 5]);

    let mut copy = ConnectFour::default();
    for Move { player, column, row } in original.moves().to_vec() {
        assert_eq!(copy.attempt_move(player, column), Ok(row));
    }

    assert_eq!(copy.moves(), original.moves());
}

#[test]
fn test_player_two_can_win() {
    let mut game = ConnectFour::default();

    play_all(&mut game, &[0, 6, 1, 6, 0, 6, 1, 6]);

    assert!(game.last_move_won());
    assert_eq!(game.winner(), Some(Player::Two));
    assert_eq!(
        game.attempt_move(Player::One, 2),
        Err(InvalidMove::GameOver)
    );
}

#[test]
fn test_win_with_a_gap_filled_last() {
    let mut game = ConnectFour::default();

    // One: 0, 1, 3 then 2 closes the bottom row.
    let rows = play_all(&mut game, &[0, 0, 1, 1, 3, 3, 2]);

    assert_eq!(rows.last(), Some(&0));
    assert_eq!(game.winner(), Some(Player::One));
}

#[test]
fn test_refused_moves_do_not_count_as_turns() {
    let mut game = ConnectFour::default();

    assert_eq!(
        game.attempt_move(Player::One, COLUMNS),
        Err(InvalidMove::ColumnOutOfRange { max: COLUMNS - 1 })
    );
    assert_eq!(game.attempt_move(Player::Two, 0), Err(InvalidMove::NotYourTurn));

    assert_eq!(game.attempt_move(Player::One, 0), Ok(0));
    assert_eq!(game.next_player(), Player::Two);
}
