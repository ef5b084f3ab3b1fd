//! Headless game implementations.

pub mod alien_assault;
pub mod space_rocks;

pub use alien_assault::AlienAssault;
pub use space_rocks::SpaceRocks;
