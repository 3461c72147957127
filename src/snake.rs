use serde::{Deserialize, Serialize};
use Direction::*;

/// A grid position. Signed so a candidate head one step past the wall is
/// still representable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Cell::new(self.x + dx, self.y + dy)
    }

    pub fn in_bounds(self, width: i32, height: i32) -> bool {
        (0..width).contains(&self.x) && (0..height).contains(&self.y)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Cell::new(x, y)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// y grows downwards, like terminal rows.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Up => (0, -1),
            Down => (0, 1),
            Left => (-1, 0),
            Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Up => Down,
            Down => Up,
            Left => Right,
            Right => Left,
        }
    }

    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }
}

/// The snake body, head first. Moving never fails: bounds and self checks
/// belong to the collision oracle and happen before `move_to` is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    body: Vec<Cell>,
    grow_next_move: bool,
}

impl Snake {
    /// Lays out `length` cells in a straight line trailing behind `head`.
    pub fn new(head: Cell, direction: Direction, length: usize) -> Self {
        let back = direction.opposite();
        let mut body = Vec::with_capacity(length.max(1));
        let mut cell = head;
        body.push(cell);
        for _ in 1..length {
            cell = cell.step(back);
            body.push(cell);
        }
        Snake { body, grow_next_move: false }
    }

    /// A snake laid out head first, or `None` for an empty body.
    pub fn from_cells(cells: Vec<Cell>) -> Option<Self> {
        if cells.is_empty() {
            return None;
        }
        Some(Snake { body: cells, grow_next_move: false })
    }

    pub fn body(&self) -> &[Cell] {
        &self.body
    }

    pub fn head(&self) -> Cell {
        self.body[0]
    }

    pub fn tail(&self) -> Cell {
        self.body[self.body.len() - 1]
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn occupies(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }

    pub fn growth_pending(&self) -> bool {
        self.grow_next_move
    }

    /// Inserts a new head one cell towards `direction` and returns it. The old
    /// tail is dropped unless growth was pending.
    pub fn move_to(&mut self, direction: Direction) -> Cell {
        let new_head = self.head().step(direction);
        self.body.insert(0, new_head);

        if self.grow_next_move {
            self.grow_next_move = false;
        } else {
            self.body.pop();
        }

        new_head
    }

    /// Takes effect on the next move only.
    pub fn grow(&mut self) {
        self.grow_next_move = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(raw: &[(i32, i32)]) -> Vec<Cell> {
        raw.iter().copied().map(Cell::from).collect()
    }

    #[test]
    fn new_snake_trails_behind_head() {
        let snake = Snake::new(Cell::new(5, 5), Right, 3);
        assert_eq!(snake.body(), cells(&[(5, 5), (4, 5), (3, 5)]).as_slice());

        let snake = Snake::new(Cell::new(5, 5), Up, 3);
        assert_eq!(snake.body(), cells(&[(5, 5), (5, 6), (5, 7)]).as_slice());
    }

    #[test]
    fn move_keeps_length() {
        let mut snake = Snake::new(Cell::new(5, 5), Right, 3);
        let head = snake.move_to(Right);
        assert_eq!(head, Cell::new(6, 5));
        assert_eq!(snake.body(), cells(&[(6, 5), (5, 5), (4, 5)]).as_slice());
    }

    #[test]
    fn grow_applies_to_next_move_only() {
        let mut snake = Snake::new(Cell::new(5, 5), Right, 3);
        snake.grow();
        assert_eq!(snake.len(), 3);
        assert!(snake.growth_pending());

        snake.move_to(Down);
        assert_eq!(snake.body(), cells(&[(5, 6), (5, 5), (4, 5), (3, 5)]).as_slice());
        assert!(!snake.growth_pending());

        snake.move_to(Down);
        assert_eq!(snake.len(), 4);
        assert_eq!(snake.tail(), Cell::new(4, 5));
    }

    #[test]
    fn from_cells_needs_a_head() {
        assert!(Snake::from_cells(vec![]).is_none());
        let snake = Snake::from_cells(cells(&[(2, 2), (1, 2)])).unwrap();
        assert_eq!(snake.head(), Cell::new(2, 2));
        assert!(!snake.growth_pending());
    }

    #[test]
    fn opposites() {
        assert!(Up.is_opposite(Down));
        assert!(Left.is_opposite(Right));
        assert!(!Up.is_opposite(Left));
        assert!(!Right.is_opposite(Right));
    }

    #[test]
    fn bounds() {
        assert!(Cell::new(0, 0).in_bounds(10, 10));
        assert!(Cell::new(9, 9).in_bounds(10, 10));
        assert!(!Cell::new(-1, 0).in_bounds(10, 10));
        assert!(!Cell::new(0, 10).in_bounds(10, 10));
    }
}
