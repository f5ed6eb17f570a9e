//! Core types shared by cells and combinators.
//!
//! - [`settlement`]: the three-state lifecycle tag and the settled outcome value

pub mod settlement;

pub use settlement::{Settlement, State};
