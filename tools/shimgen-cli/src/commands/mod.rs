//! CLI Command Implementations

pub mod advisory;
pub mod check;
pub mod generate;
