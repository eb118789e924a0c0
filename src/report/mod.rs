//! Report generation and table exports.

pub mod export;
pub mod generator;

pub use export::*;
pub use generator::*;
