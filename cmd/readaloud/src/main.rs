//! Read-aloud CLI - Japanese text-to-speech from the command line.

use clap::{Parser, Subcommand};

mod commands;

use commands::{ConfigCommand, SynthCommand, VoicesCommand};

/// Read-aloud CLI - Japanese text-to-speech from the command line.
///
/// Synthesizes text into MP3 audio through the read-aloud streaming
/// service and saves it to a file.
///
/// Configuration is stored in ~/.giztoy/readaloud/ and supports multiple
/// contexts, similar to kubectl's context management. No context is
/// required: the public service endpoint is used by default.
#[derive(Parser)]
#[command(name = "readaloud")]
#[command(about = "Read-aloud speech synthesis CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.giztoy/readaloud/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Context name to use
    #[arg(short = 'c', long, global = true)]
    pub context: Option<String>,

    /// Output file
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Input request file (YAML or JSON)
    #[arg(short = 'f', long = "file", global = true)]
    pub input: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    /// Synthesize text into an audio file
    Synth(SynthCommand),
    /// List built-in voices
    Voices(VoicesCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .init();
    }

    let _ = rustls::crypto::ring::default_provider().install_default();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli).await,
        Commands::Synth(cmd) => cmd.run(&cli).await,
        Commands::Voices(cmd) => cmd.run(&cli).await,
    }
}
