//! CLI module for RagBuddy
//!
//! Argument parsing, terminal rendering and chat input.

pub mod args;
pub mod display;
pub mod input;

pub use args::{Args, Commands, Verbosity};
pub use display::DisplayManager;
pub use input::{ChatInput, InputHandler};
