//! CLI commands module.

mod config;
mod synth;
mod util;
mod voices;

pub use config::ConfigCommand;
pub use synth::SynthCommand;
pub use voices::VoicesCommand;

pub(crate) use util::*;
