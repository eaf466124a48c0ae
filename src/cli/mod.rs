//! CLI module for matquery
//!
//! Handles command-line argument parsing and terminal rendering.

pub mod args;
pub mod output;

pub use args::{Args, Commands, Verbosity};
pub use output::{render_error, render_registry, render_resolution};
