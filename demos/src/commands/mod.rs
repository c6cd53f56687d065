//! CLI command implementations.

pub mod chain;
pub mod clean;
pub mod common;
pub mod count;
pub mod run;
pub mod script;
