use crate::snake::{Cell, Direction};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Collision {
    Wall,
    SelfBody,
}

/// Classifies the move of `body`'s head one cell towards `direction`.
///
/// The self check runs against the whole pre-move body except the head, tail
/// included. Stepping into the cell the tail is about to vacate therefore
/// counts as a collision; this keeps the game's difficulty as players know it.
pub fn check(direction: Direction, body: &[Cell], width: i32, height: i32) -> Option<Collision> {
    let head = *body.first()?;
    let next = head.step(direction);

    if !next.in_bounds(width, height) {
        Some(Collision::Wall)
    } else if body[1..].contains(&next) {
        Some(Collision::SelfBody)
    } else {
        None
    }
}

pub fn will_collide(direction: Direction, body: &[Cell], width: i32, height: i32) -> bool {
    check(direction, body, width, height).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snake::Direction::*;

    fn body(raw: &[(i32, i32)]) -> Vec<Cell> {
        raw.iter().copied().map(Cell::from).collect()
    }

    #[test]
    fn walls_on_every_side() {
        assert_eq!(check(Left, &body(&[(0, 5)]), 10, 10), Some(Collision::Wall));
        assert_eq!(check(Right, &body(&[(9, 5)]), 10, 10), Some(Collision::Wall));
        assert_eq!(check(Up, &body(&[(5, 0)]), 10, 10), Some(Collision::Wall));
        assert_eq!(check(Down, &body(&[(5, 9)]), 10, 10), Some(Collision::Wall));
        assert_eq!(check(Right, &body(&[(8, 5)]), 10, 10), None);
    }

    #[test]
    fn running_into_own_body() {
        // Head at (5,6) facing up into (5,5).
        let b = body(&[(5, 6), (6, 6), (6, 5), (5, 5), (4, 5)]);
        assert_eq!(check(Up, &b, 10, 10), Some(Collision::SelfBody));
        assert!(!will_collide(Left, &b, 10, 10));
    }

    #[test]
    fn tail_cell_counts_as_occupied() {
        // A 2x2 loop: the head's next cell is the tail, which would vacate.
        let b = body(&[(5, 6), (6, 6), (6, 5), (5, 5)]);
        assert!(will_collide(Up, &b, 10, 10));
    }

    #[test]
    fn neck_is_a_collision() {
        let b = body(&[(5, 5), (4, 5), (3, 5)]);
        assert!(will_collide(Left, &b, 10, 10));
    }

    #[test]
    fn empty_body_never_collides() {
        assert!(!will_collide(Up, &[], 10, 10));
    }

    #[test]
    fn exhaustive_against_reference_rule() {
        let b = body(&[(1, 1), (1, 2), (2, 2), (2, 1), (3, 1)]);
        for d in [Up, Down, Left, Right] {
            let next = b[0].step(d);
            let expected = !next.in_bounds(4, 4) || b[1..].contains(&next);
            assert_eq!(will_collide(d, &b, 4, 4), expected, "direction {:?}", d);
        }
    }
}
