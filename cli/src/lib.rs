//! CLI utilities for readaloud.
//!
//! Context-based configuration and output helpers shared by the command-line
//! tools.

pub mod config;
pub mod output;

pub use config::{Config, Context, load_config, mask_token};
pub use output::{Output, OutputFormat, guess_extension, write_binary};
