//! Game engine: one game's mutable state and the action state machine
//!
//! A [`Game`] starts `InProgress` and ends either `Lost` or `Won`. Any
//! physically invalid interaction (stepping off the board, bumping into
//! debris, cleaning something that is not debris, ...) loses the game.
//! Calling an action while the game is over, or with the wrong carry state,
//! is a silent no-op that returns `false`.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::board::{generate, Board, Cell, Position};

/// Smallest accepted board side
pub const MIN_DIMENSION: usize = 3;
/// Largest accepted board side
pub const MAX_DIMENSION: usize = 50;

/// Errors raised while constructing a game
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Invalid board dimensions {width}x{height}, each side must be between 3 and 50")]
    InvalidDimensions { width: usize, height: usize },
    #[error("Board must contain exactly one robot, found {found}")]
    RobotCount { found: usize },
    #[error("Board must contain at most one flower, found {found}")]
    FlowerCount { found: usize },
    #[error("Board must contain exactly one princess, found {found}")]
    PrincessCount { found: usize },
}

/// Opaque, unique game identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(Uuid);

impl GameId {
    /// Fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GameId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle status of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    InProgress,
    Lost,
    Won,
}

impl GameStatus {
    /// Lost and Won are terminal
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }
}

/// Direction the robot acts towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// `(dx, dy)` step for this direction; `y` grows downwards
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Neighbouring position in this direction
    pub const fn step(self, from: Position) -> Position {
        let (dx, dy) = self.offset();
        from.offset(dx, dy)
    }
}

/// The four mutating actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Move,
    CleanDebris,
    PickUpFlower,
    DropFlower,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Move,
        Action::CleanDebris,
        Action::PickUpFlower,
        Action::DropFlower,
    ];

    /// Stable lowercase name, used for logs and metric labels
    pub fn name(self) -> &'static str {
        match self {
            Action::Move => "move",
            Action::CleanDebris => "clean",
            Action::PickUpFlower => "pickup",
            Action::DropFlower => "drop",
        }
    }
}

/// State of a single game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    id: GameId,
    board: Board,
    robot: Position,
    flower: Option<Position>,
    carries_flower: bool,
    status: GameStatus,
}

impl Game {
    /// Create a game with a freshly generated board seeded from OS entropy
    pub fn new(width: usize, height: usize) -> Result<Self, GameError> {
        Self::with_rng(width, height, &mut ChaCha20Rng::from_entropy())
    }

    /// Create a game whose board is fully determined by `seed`
    pub fn with_seed(width: usize, height: usize, seed: u64) -> Result<Self, GameError> {
        Self::with_rng(width, height, &mut ChaCha20Rng::seed_from_u64(seed))
    }

    /// Create a game using the given random number generator for board layout
    pub fn with_rng<R: rand::Rng + ?Sized>(
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        validate_dimensions(width, height)?;

        let board = generate(width, height, rng);
        let game = Self::from_board(board)?;
        debug!(game_id = %game.id, width, height, "generated board");
        Ok(game)
    }

    /// Create a game from a prepared board.
    ///
    /// The board must hold exactly one robot, exactly one princess and at
    /// most one flower. A board without a flower starts with the robot
    /// carrying it.
    pub fn from_board(board: Board) -> Result<Self, GameError> {
        validate_dimensions(board.width(), board.height())?;

        let robots: Vec<Position> = board.positions_of(Cell::Robot).collect();
        if robots.len() != 1 {
            return Err(GameError::RobotCount { found: robots.len() });
        }
        let princesses = board.count(Cell::Princess);
        if princesses != 1 {
            return Err(GameError::PrincessCount { found: princesses });
        }
        let flowers: Vec<Position> = board.positions_of(Cell::Flower).collect();
        if flowers.len() > 1 {
            return Err(GameError::FlowerCount { found: flowers.len() });
        }

        let flower = flowers.first().copied();
        Ok(Self {
            id: GameId::new(),
            board,
            robot: robots[0],
            flower,
            carries_flower: flower.is_none(),
            status: GameStatus::InProgress,
        })
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn width(&self) -> usize {
        self.board.width()
    }

    pub fn height(&self) -> usize {
        self.board.height()
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn robot_carries_flower(&self) -> bool {
        self.carries_flower
    }

    pub fn robot_position(&self) -> Position {
        self.robot
    }

    /// Position of the flower while it lies on the board
    pub fn flower_position(&self) -> Option<Position> {
        self.flower
    }

    /// Rendered board, see [`Board::render`]
    pub fn render_board(&self) -> String {
        self.board.render()
    }

    /// Dispatch one of the four actions
    pub fn perform(&mut self, action: Action, direction: Direction) -> bool {
        match action {
            Action::Move => self.move_robot(direction),
            Action::CleanDebris => self.clean_debris(direction),
            Action::PickUpFlower => self.pick_up_flower(direction),
            Action::DropFlower => self.drop_flower(direction),
        }
    }

    /// Move the robot one cell. Only empty cells and the princess can be
    /// entered; the princess cell is overwritten by the robot.
    pub fn move_robot(&mut self, direction: Direction) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let Some(target) = self.target(direction) else {
            return self.lose(Action::Move, direction);
        };

        match self.board.get(target) {
            Some(Cell::Empty | Cell::Princess) => {
                self.board.set(self.robot, Cell::Empty);
                self.board.set(target, Cell::Robot);
                self.robot = target;
                true
            }
            _ => self.lose(Action::Move, direction),
        }
    }

    /// Clear a debris cell next to the robot
    pub fn clean_debris(&mut self, direction: Direction) -> bool {
        if self.status.is_terminal() || self.carries_flower {
            return false;
        }
        let Some(target) = self.target(direction) else {
            return self.lose(Action::CleanDebris, direction);
        };

        match self.board.get(target) {
            Some(Cell::Debris) => {
                self.board.set(target, Cell::Empty);
                true
            }
            _ => self.lose(Action::CleanDebris, direction),
        }
    }

    /// Pick up the flower next to the robot
    pub fn pick_up_flower(&mut self, direction: Direction) -> bool {
        if self.status.is_terminal() || self.carries_flower {
            return false;
        }
        let Some(target) = self.target(direction) else {
            return self.lose(Action::PickUpFlower, direction);
        };

        match self.board.get(target) {
            Some(Cell::Flower) => {
                self.board.set(target, Cell::Empty);
                self.carries_flower = true;
                self.flower = None;
                true
            }
            _ => self.lose(Action::PickUpFlower, direction),
        }
    }

    /// Drop the carried flower. Dropping it on the princess wins the game;
    /// the board is left untouched in that case.
    pub fn drop_flower(&mut self, direction: Direction) -> bool {
        if self.status.is_terminal() || !self.carries_flower {
            return false;
        }
        let Some(target) = self.target(direction) else {
            return self.lose(Action::DropFlower, direction);
        };

        match self.board.get(target) {
            Some(Cell::Princess) => {
                self.carries_flower = false;
                self.status = GameStatus::Won;
                debug!(game_id = %self.id, "flower delivered, game won");
                true
            }
            Some(Cell::Empty) => {
                self.board.set(target, Cell::Flower);
                self.flower = Some(target);
                self.carries_flower = false;
                true
            }
            _ => self.lose(Action::DropFlower, direction),
        }
    }

    /// Neighbour of the robot in `direction`, `None` if it is off the board
    fn target(&self, direction: Direction) -> Option<Position> {
        let target = direction.step(self.robot);
        self.board.contains(target).then_some(target)
    }

    fn lose(&mut self, action: Action, direction: Direction) -> bool {
        self.status = GameStatus::Lost;
        debug!(
            game_id = %self.id,
            action = action.name(),
            ?direction,
            robot = %self.robot,
            "illegal action, game lost"
        );
        false
    }
}

fn validate_dimensions(width: usize, height: usize) -> Result<(), GameError> {
    let range = MIN_DIMENSION..=MAX_DIMENSION;
    if range.contains(&width) && range.contains(&height) {
        Ok(())
    } else {
        Err(GameError::InvalidDimensions { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::debris_count;

    fn game(layout: &str) -> Game {
        Game::from_board(Board::parse(layout).unwrap()).unwrap()
    }

    /// Snapshot of everything an action may mutate
    fn snapshot(game: &Game) -> (String, Position, Option<Position>, bool, GameStatus) {
        (
            game.render_board(),
            game.robot_position(),
            game.flower_position(),
            game.robot_carries_flower(),
            game.status(),
        )
    }

    #[test]
    fn test_new_game_initial_state() {
        let game = Game::with_seed(6, 4, 42).unwrap();

        assert_eq!(game.width(), 6);
        assert_eq!(game.height(), 4);
        assert_eq!(game.status(), GameStatus::InProgress);
        assert!(!game.robot_carries_flower());
        assert_eq!(game.robot_position(), Position::new(0, 0));

        let flower = game.flower_position().unwrap();
        assert_eq!(game.board().get(flower), Some(Cell::Flower));
        assert_eq!(game.board().count(Cell::Debris), debris_count(6, 4));
    }

    #[test]
    fn test_new_game_rejects_bad_dimensions() {
        assert_eq!(
            Game::new(2, 10).unwrap_err(),
            GameError::InvalidDimensions { width: 2, height: 10 }
        );
        assert!(Game::new(10, 51).is_err());
        assert!(Game::new(0, 0).is_err());
        assert!(Game::new(3, 3).is_ok());
        assert!(Game::new(50, 50).is_ok());
    }

    #[test]
    fn test_seeded_games_share_layout_but_not_id() {
        let a = Game::with_seed(10, 10, 5).unwrap();
        let b = Game::with_seed(10, 10, 5).unwrap();
        assert_eq!(a.render_board(), b.render_board());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_from_board_validation() {
        let no_robot = Board::parse("VVV\nVFV\nVVP").unwrap();
        assert_eq!(
            Game::from_board(no_robot).unwrap_err(),
            GameError::RobotCount { found: 0 }
        );

        let two_flowers = Board::parse("RFV\nVFV\nVVP").unwrap();
        assert_eq!(
            Game::from_board(two_flowers).unwrap_err(),
            GameError::FlowerCount { found: 2 }
        );

        let no_princess = Board::parse("RVV\nVFV\nVVV").unwrap();
        assert_eq!(
            Game::from_board(no_princess).unwrap_err(),
            GameError::PrincessCount { found: 0 }
        );

        let three_princesses = Board::parse("RPV\nVFV\nVPP").unwrap();
        assert_eq!(
            Game::from_board(three_princesses).unwrap_err(),
            GameError::PrincessCount { found: 3 }
        );

        let carried = game("RVV\nVVV\nVVP");
        assert!(carried.robot_carries_flower());
        assert_eq!(carried.flower_position(), None);
    }

    #[test]
    fn test_move_out_of_bounds_loses() {
        for direction in [Direction::Up, Direction::Left] {
            let mut game = game("RVV\nVFV\nVVP");
            assert!(!game.move_robot(direction));
            assert_eq!(game.status(), GameStatus::Lost);
            // Only the status changes
            assert_eq!(game.robot_position(), Position::new(0, 0));
            assert_eq!(game.render_board(), "RVV\nVFV\nVVP");
        }
    }

    #[test]
    fn test_move_onto_empty() {
        let mut game = game("RVV\nVFV\nVVP");

        assert!(game.move_robot(Direction::Right));
        assert_eq!(game.robot_position(), Position::new(1, 0));
        assert_eq!(game.render_board(), "VRV\nVFV\nVVP");
        assert_eq!(game.status(), GameStatus::InProgress);
    }

    #[test]
    fn test_move_onto_flower_or_debris_loses() {
        // Flower generated at (1, 0)
        let mut game_flower = game("RFV\nVDV\nDVP");
        assert!(!game_flower.move_robot(Direction::Right));
        assert_eq!(game_flower.status(), GameStatus::Lost);

        let mut game_debris = game("RVV\nDFV\nVVP");
        assert!(!game_debris.move_robot(Direction::Down));
        assert_eq!(game_debris.status(), GameStatus::Lost);
    }

    #[test]
    fn test_move_then_bump_into_flower() {
        // Flower generated at (1, 1)
        let mut game = game("RVD\nVFV\nDVP");

        assert!(game.move_robot(Direction::Right));
        assert_eq!(game.robot_position(), Position::new(1, 0));
        assert!(!game.move_robot(Direction::Down));
        assert_eq!(game.status(), GameStatus::Lost);
    }

    #[test]
    fn test_move_through_princess_consumes_marker() {
        let mut game = game("VVV\nFVV\nVRP");

        assert!(game.move_robot(Direction::Right));
        assert_eq!(game.robot_position(), Position::new(2, 2));
        assert!(game.move_robot(Direction::Up));

        // The princess cell is not restored after the robot leaves
        assert_eq!(game.render_board(), "VVV\nFVR\nVVV");
        assert_eq!(game.board().count(Cell::Princess), 0);
    }

    #[test]
    fn test_clean_debris() {
        let mut game = game("RDV\nVFV\nVVP");

        assert!(game.clean_debris(Direction::Right));
        assert_eq!(game.board().get(Position::new(1, 0)), Some(Cell::Empty));
        assert_eq!(game.status(), GameStatus::InProgress);
        assert_eq!(game.robot_position(), Position::new(0, 0));
    }

    #[test]
    fn test_clean_non_debris_loses() {
        let mut on_empty = game("RVV\nVFV\nVVP");
        assert!(!on_empty.clean_debris(Direction::Right));
        assert_eq!(on_empty.status(), GameStatus::Lost);

        let mut on_flower = game("RFV\nVVV\nVVP");
        assert!(!on_flower.clean_debris(Direction::Right));
        assert_eq!(on_flower.status(), GameStatus::Lost);

        let mut on_princess = game("VVV\nFVV\nVRP");
        assert!(!on_princess.clean_debris(Direction::Right));
        assert_eq!(on_princess.status(), GameStatus::Lost);

        let mut off_board = game("RDV\nVFV\nVVP");
        assert!(!off_board.clean_debris(Direction::Up));
        assert_eq!(off_board.status(), GameStatus::Lost);
        assert_eq!(off_board.board().get(Position::new(1, 0)), Some(Cell::Debris));
    }

    #[test]
    fn test_pick_up_flower() {
        let mut game = game("RFV\nVVV\nVVP");

        assert!(game.pick_up_flower(Direction::Right));
        assert!(game.robot_carries_flower());
        assert_eq!(game.flower_position(), None);
        assert_eq!(game.board().count(Cell::Flower), 0);
        assert_eq!(game.board().get(Position::new(1, 0)), Some(Cell::Empty));
    }

    #[test]
    fn test_pick_up_non_flower_loses() {
        let mut on_empty = game("RVV\nVFV\nVVP");
        assert!(!on_empty.pick_up_flower(Direction::Down));
        assert_eq!(on_empty.status(), GameStatus::Lost);
        assert!(!on_empty.robot_carries_flower());

        let mut off_board = game("RFV\nVVV\nVVP");
        assert!(!off_board.pick_up_flower(Direction::Left));
        assert_eq!(off_board.status(), GameStatus::Lost);
    }

    #[test]
    fn test_drop_on_empty_places_flower() {
        let mut game = game("RFV\nVVV\nVVP");
        assert!(game.pick_up_flower(Direction::Right));

        assert!(game.drop_flower(Direction::Down));
        assert!(!game.robot_carries_flower());
        assert_eq!(game.flower_position(), Some(Position::new(0, 1)));
        assert_eq!(game.render_board(), "RVV\nFVV\nVVP");
        assert_eq!(game.status(), GameStatus::InProgress);
    }

    #[test]
    fn test_drop_on_princess_wins() {
        let mut game = game("VVV\nVFR\nVVP");
        assert!(game.pick_up_flower(Direction::Left));

        assert!(game.drop_flower(Direction::Down));
        assert_eq!(game.status(), GameStatus::Won);
        assert!(!game.robot_carries_flower());
        assert_eq!(game.flower_position(), None);
        assert_eq!(game.render_board(), "VVV\nVVR\nVVP");
    }

    #[test]
    fn test_drop_on_occupied_cell_loses() {
        let mut on_debris = game("RFV\nDVV\nVVP");
        assert!(on_debris.pick_up_flower(Direction::Right));
        assert!(!on_debris.drop_flower(Direction::Down));
        assert_eq!(on_debris.status(), GameStatus::Lost);
        // The flower stays with the robot once the game is lost
        assert!(on_debris.robot_carries_flower());

        let mut off_board = game("RFV\nVVV\nVVP");
        assert!(off_board.pick_up_flower(Direction::Right));
        assert!(!off_board.drop_flower(Direction::Up));
        assert_eq!(off_board.status(), GameStatus::Lost);
    }

    #[test]
    fn test_carry_state_mismatch_is_noop() {
        let mut not_carrying = game("RFV\nVVV\nVVP");
        let before = snapshot(&not_carrying);
        assert!(!not_carrying.drop_flower(Direction::Down));
        assert_eq!(snapshot(&not_carrying), before);

        let mut carrying = game("RDV\nVVV\nVVP");
        let before = snapshot(&carrying);
        assert!(!carrying.pick_up_flower(Direction::Right));
        assert!(!carrying.clean_debris(Direction::Right));
        assert_eq!(snapshot(&carrying), before);
    }

    #[test]
    fn test_terminal_game_ignores_actions() {
        let mut game = game("RFV\nDVV\nVVP");
        assert!(!game.move_robot(Direction::Up));
        assert_eq!(game.status(), GameStatus::Lost);

        let before = snapshot(&game);
        for action in Action::ALL {
            for direction in Direction::ALL {
                assert!(!game.perform(action, direction));
                assert_eq!(snapshot(&game), before);
            }
        }
    }

    #[test]
    fn test_full_playthrough() {
        // R D V
        // F V V
        // V V P
        let mut game = game("RDV\nFVV\nVVP");

        assert!(game.clean_debris(Direction::Right));
        assert!(game.pick_up_flower(Direction::Down));
        assert!(game.move_robot(Direction::Right));
        assert!(game.move_robot(Direction::Down));
        assert!(game.move_robot(Direction::Right));
        assert_eq!(game.robot_position(), Position::new(2, 1));
        assert!(game.drop_flower(Direction::Down));

        assert_eq!(game.status(), GameStatus::Won);
        assert!(!game.robot_carries_flower());
        // The delivered flower is not drawn on the princess cell
        assert_eq!(game.render_board(), "VVV\nVVR\nVVP");

        let before = snapshot(&game);
        assert!(!game.move_robot(Direction::Left));
        assert_eq!(snapshot(&game), before);
    }

    #[test]
    fn test_direction_offsets() {
        let origin = Position::new(5, 5);
        assert_eq!(Direction::Up.step(origin), Position::new(5, 4));
        assert_eq!(Direction::Down.step(origin), Position::new(5, 6));
        assert_eq!(Direction::Left.step(origin), Position::new(4, 5));
        assert_eq!(Direction::Right.step(origin), Position::new(6, 5));
    }

    #[test]
    fn test_game_id_roundtrip() {
        let id = GameId::new();
        let parsed: GameId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<GameId>().is_err());
    }
}
