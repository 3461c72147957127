//! Snake with a grace period.
//!
//! The library is the game core: grid model, collision oracle, difficulty
//! profiles and the tick-driven state machine in [`game`]. Everything the core
//! needs from the outside (effects, score storage, drawing, food placement,
//! time) comes in through the traits in [`collab`], [`food`] and [`clock`].

pub mod clock;
pub mod collab;
pub mod collision;
pub mod error;
pub mod food;
pub mod game;
pub mod scores;
mod serde_duration;
pub mod settings;
pub mod snake;
pub mod speed;
pub mod timer;

pub use error::{Error, Result};
pub use game::{Collaborators, Command, Game, GameConfig, TickOutcome};
