pub mod canonical;
pub mod digest;
pub mod generator;

pub use generator::{Generator, GeneratorConfig, DEFAULT_SENTINEL};
