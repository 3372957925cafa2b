//! Board representation and random board generation
//!
//! A board is a fixed-size row-major grid of [`Cell`]s. Generation places the
//! robot in the top-left corner, the princess in the bottom-right corner, one
//! flower somewhere else, and covers roughly 30% of the grid with debris.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fraction of the board covered by debris after generation
pub const DEBRIS_RATIO: f64 = 0.3;

/// Content of a single board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Robot,
    Princess,
    Flower,
    Debris,
    Empty,
}

impl Cell {
    /// Character used for this cell in rendered boards
    pub fn symbol(self) -> char {
        match self {
            Cell::Robot => 'R',
            Cell::Princess => 'P',
            Cell::Flower => 'F',
            Cell::Debris => 'D',
            Cell::Empty => 'V',
        }
    }

    /// Inverse of [`Cell::symbol`]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'R' => Some(Cell::Robot),
            'P' => Some(Cell::Princess),
            'F' => Some(Cell::Flower),
            'D' => Some(Cell::Debris),
            'V' => Some(Cell::Empty),
            _ => None,
        }
    }
}

/// Grid coordinate; `x` grows to the right and `y` grows downwards.
///
/// Coordinates are signed so that a step off the top or left edge is
/// representable and can be detected with [`Board::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position shifted by the given offset
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Error returned when parsing a rendered board fails
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseBoardError {
    #[error("Board is empty")]
    Empty,
    #[error("Row {row} has {actual} cells but the first row has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Unknown cell symbol {symbol:?} at ({x}, {y})")]
    UnknownSymbol { symbol: char, x: usize, y: usize },
}

/// Fixed-size rectangular grid of cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Create a board where every cell is empty
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
        }
    }

    /// Parse a board from its rendered form (see [`Board::render`])
    pub fn parse(text: &str) -> Result<Self, ParseBoardError> {
        // `lines` already tolerates a single trailing newline
        let rows: Vec<&str> = text.lines().collect();
        let width = rows.first().map(|row| row.chars().count()).unwrap_or(0);
        if width == 0 {
            return Err(ParseBoardError::Empty);
        }

        let mut cells = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let actual = row.chars().count();
            if actual != width {
                return Err(ParseBoardError::RaggedRow {
                    row: y,
                    expected: width,
                    actual,
                });
            }
            for (x, symbol) in row.chars().enumerate() {
                let cell = Cell::from_symbol(symbol)
                    .ok_or(ParseBoardError::UnknownSymbol { symbol, x, y })?;
                cells.push(cell);
            }
        }

        Ok(Self {
            width,
            height: rows.len(),
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the position lies on the board
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.y as usize * self.width + pos.x as usize)
        } else {
            None
        }
    }

    /// Cell at the given position, `None` when out of bounds
    pub fn get(&self, pos: Position) -> Option<Cell> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// Overwrite the cell at `pos`. Out-of-bounds writes are ignored.
    pub(crate) fn set(&mut self, pos: Position, cell: Cell) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = cell;
        }
    }

    /// Number of cells holding the given content
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// All positions holding the given content, in row-major order
    pub fn positions_of(&self, cell: Cell) -> impl Iterator<Item = Position> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, c)| **c == cell)
            .map(move |(i, _)| Position::new((i % width) as i32, (i / width) as i32))
    }

    /// Row-major text grid, one character per cell, rows joined by `\n`
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.cells.chunks(self.width.max(1)).enumerate() {
            if y > 0 {
                f.write_str("\n")?;
            }
            for cell in row {
                write!(f, "{}", cell.symbol())?;
            }
        }
        Ok(())
    }
}

/// Number of debris cells placed on a freshly generated board
pub fn debris_count(width: usize, height: usize) -> usize {
    ((width * height) as f64 * DEBRIS_RATIO) as usize
}

fn random_position<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Position {
    Position::new(
        rng.gen_range(0..width) as i32,
        rng.gen_range(0..height) as i32,
    )
}

/// Generate a new board.
///
/// The robot starts at `(0, 0)` and the princess waits at
/// `(width - 1, height - 1)`. The flower lands on any other cell, then debris
/// is rejection-sampled onto empty cells until exactly
/// [`debris_count`] cells are covered.
///
/// Callers must ensure `width * height > 2`; [`crate::Game::new`] enforces
/// the 3x3 minimum.
pub fn generate<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Board {
    debug_assert!(width * height > 2, "board too small for generation");

    let mut board = Board::empty(width, height);

    let robot = Position::new(0, 0);
    let princess = Position::new(width as i32 - 1, height as i32 - 1);
    board.set(robot, Cell::Robot);
    board.set(princess, Cell::Princess);

    loop {
        let pos = random_position(width, height, rng);
        if pos != robot && pos != princess {
            board.set(pos, Cell::Flower);
            break;
        }
    }

    let target = debris_count(width, height);
    let mut placed = 0;
    while placed < target {
        let pos = random_position(width, height, rng);
        if board.get(pos) == Some(Cell::Empty) {
            board.set(pos, Cell::Debris);
            placed += 1;
        }
    }

    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_debris_count_matches_floor() {
        assert_eq!(debris_count(3, 3), 2);
        assert_eq!(debris_count(10, 10), 30);
        assert_eq!(debris_count(3, 5), 4);
        assert_eq!(debris_count(50, 50), 750);
    }

    #[test]
    fn test_generate_fixed_corners() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let board = generate(5, 4, &mut rng);

        assert_eq!(board.width(), 5);
        assert_eq!(board.height(), 4);
        assert_eq!(board.get(Position::new(0, 0)), Some(Cell::Robot));
        assert_eq!(board.get(Position::new(4, 3)), Some(Cell::Princess));
    }

    #[test]
    fn test_generate_is_deterministic_for_seed() {
        let a = generate(12, 9, &mut ChaCha20Rng::seed_from_u64(99));
        let b = generate(12, 9, &mut ChaCha20Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_layout() {
        let board = Board::parse("RDV\nVFV\nVVP").unwrap();
        let rendered = board.render();

        assert_eq!(rendered, "RDV\nVFV\nVVP");
        assert!(!rendered.ends_with('\n'));
        // Rendering is a pure projection
        assert_eq!(board.render(), rendered);
    }

    #[test]
    fn test_parse_tolerates_trailing_newline() {
        let board = Board::parse("RVV\nVFV\nVVP\n").unwrap();
        assert_eq!(board.height(), 3);
        assert_eq!(board.render(), "RVV\nVFV\nVVP");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Board::parse(""), Err(ParseBoardError::Empty));
        assert_eq!(
            Board::parse("RVV\nVV"),
            Err(ParseBoardError::RaggedRow { row: 1, expected: 3, actual: 2 })
        );
        assert_eq!(
            Board::parse("RVV\n\nVVP"),
            Err(ParseBoardError::RaggedRow { row: 1, expected: 3, actual: 0 })
        );
        assert_eq!(Board::parse("\n"), Err(ParseBoardError::Empty));
        assert_eq!(
            Board::parse("RXV"),
            Err(ParseBoardError::UnknownSymbol { symbol: 'X', x: 1, y: 0 })
        );
    }

    #[test]
    fn test_contains_and_get_out_of_bounds() {
        let board = Board::empty(3, 4);
        assert!(board.contains(Position::new(2, 3)));
        assert!(!board.contains(Position::new(3, 0)));
        assert!(!board.contains(Position::new(0, 4)));
        assert!(!board.contains(Position::new(-1, 0)));
        assert!(!board.contains(Position::new(0, -1)));
        assert_eq!(board.get(Position::new(-1, 0)), None);
    }

    #[test]
    fn test_positions_of_row_major() {
        let board = Board::parse("DVD\nVVV\nDVV").unwrap();
        let debris: Vec<_> = board.positions_of(Cell::Debris).collect();
        assert_eq!(
            debris,
            vec![Position::new(0, 0), Position::new(2, 0), Position::new(0, 2)]
        );
    }

    proptest! {
        #[test]
        fn prop_generated_board_invariants(width in 3usize..=50, height in 3usize..=50, seed in any::<u64>()) {
            let board = generate(width, height, &mut ChaCha20Rng::seed_from_u64(seed));
            let corner = Position::new(width as i32 - 1, height as i32 - 1);

            prop_assert_eq!(board.count(Cell::Robot), 1);
            prop_assert_eq!(board.get(Position::new(0, 0)), Some(Cell::Robot));
            prop_assert_eq!(board.count(Cell::Princess), 1);
            prop_assert_eq!(board.get(corner), Some(Cell::Princess));
            prop_assert_eq!(board.count(Cell::Flower), 1);
            prop_assert_eq!(board.count(Cell::Debris), debris_count(width, height));

            let flower = board.positions_of(Cell::Flower).next().unwrap();
            prop_assert_ne!(flower, Position::new(0, 0));
            prop_assert_ne!(flower, corner);

            let rendered = board.render();
            prop_assert_eq!(rendered.lines().count(), height);
            prop_assert!(rendered.lines().all(|row| row.chars().count() == width));
            prop_assert_eq!(Board::parse(&rendered).unwrap(), board);
        }
    }
}
