//! Betrank core logic.
//!
//! Everything here is pure: no I/O, no database. Randomness is passed in by
//! the caller so generation is reproducible under a seeded RNG.

pub mod csv;
pub mod generation;
pub mod online;
pub mod sharing;
pub mod voting;
