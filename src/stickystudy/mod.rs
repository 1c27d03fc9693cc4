pub mod cards;
pub mod config;
pub mod deck;
pub mod error;
pub mod io;
pub mod model;
pub mod sync;

pub use error::{Result, StudyError};
