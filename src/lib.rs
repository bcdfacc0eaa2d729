pub mod cli;
pub mod config;
pub mod error;
pub mod formatting;
pub mod nutrients;
pub mod pipeline;
pub mod pivot;
pub mod portion;
pub mod schema;
pub mod source;
pub mod tables;
pub mod wide;

/// Sentinel written wherever a text value is missing or could not be derived.
pub const NO_VALUE: &str = "no_value";
