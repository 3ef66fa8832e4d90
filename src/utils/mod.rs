//! Generic utility primitives with zero domain knowledge.
//!
//! - `process` - Shell command execution with captured output
//! - `template` - String template rendering

pub mod process;
pub mod template;
