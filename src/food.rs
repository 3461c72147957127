use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::snake::Cell;

/// Picks where the next piece of food goes.
pub trait FoodSpawner {
    /// A cell inside `width` x `height` not listed in `occupied`, or `None`
    /// when the board is full.
    fn spawn(&mut self, occupied: &[Cell], width: i32, height: i32) -> Option<Cell>;
}

/// Uniform choice over every free cell.
pub struct RandomSpawner<R = StdRng> {
    rng: R,
}

impl RandomSpawner<StdRng> {
    pub fn new() -> Self {
        RandomSpawner { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        RandomSpawner { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for RandomSpawner<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> FoodSpawner for RandomSpawner<R> {
    fn spawn(&mut self, occupied: &[Cell], width: i32, height: i32) -> Option<Cell> {
        let free: Vec<Cell> = (0..height)
            .flat_map(|y| (0..width).map(move |x| Cell::new(x, y)))
            .filter(|cell| !occupied.contains(cell))
            .collect();

        free.choose(&mut self.rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_lands_on_the_snake() {
        let mut spawner = RandomSpawner::seeded(7);
        let occupied: Vec<Cell> = (0..4).flat_map(|y| (0..3).map(move |x| Cell::new(x, y))).collect();

        for _ in 0..200 {
            let cell = spawner.spawn(&occupied, 4, 4).unwrap();
            assert_eq!(cell.x, 3);
            assert!(cell.in_bounds(4, 4));
        }
    }

    #[test]
    fn full_board_yields_nothing() {
        let mut spawner = RandomSpawner::seeded(1);
        let occupied = vec![Cell::new(0, 0), Cell::new(1, 0)];
        assert_eq!(spawner.spawn(&occupied, 2, 1), None);
    }

    #[test]
    fn covers_every_free_cell() {
        let mut spawner = RandomSpawner::seeded(42);
        let occupied = vec![Cell::new(1, 1)];
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(spawner.spawn(&occupied, 3, 3).unwrap());
        }
        assert_eq!(seen.len(), 8);
        assert!(!seen.contains(&Cell::new(1, 1)));
    }
}
