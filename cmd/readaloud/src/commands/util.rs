//! Utility functions for CLI commands.

use std::path::Path;
use std::time::Duration;

use readaloud::{Client, Verbosity};
use readaloud_cli::config::{Config, Context, load_config};
use readaloud_cli::output::{Output, OutputFormat};

use crate::Cli;

const APP_NAME: &str = "readaloud";

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(APP_NAME, cli.config.as_deref())
}

/// Gets the context to use, if any.
///
/// Without `-c` and without a current context the defaults apply. A context
/// named with `-c` must exist.
pub fn get_context(cli: &Cli) -> anyhow::Result<Option<Context>> {
    let cfg = get_config(cli)?;

    match (cfg.resolve_context(cli.context.as_deref()), cli.context.as_deref()) {
        (Some(ctx), _) => Ok(Some(ctx.clone())),
        (None, Some(name)) => anyhow::bail!("context '{}' not found", name),
        (None, None) => Ok(None),
    }
}

/// Loads a request from a YAML or JSON file.
pub fn load_request<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)?;
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml");

    let result = match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };

    Ok(result)
}

/// Outputs a result as JSON or YAML to stdout.
pub fn output_result<T: serde::Serialize>(result: &T, as_json: bool) -> anyhow::Result<()> {
    let format = if as_json {
        OutputFormat::Json
    } else {
        OutputFormat::Yaml
    };
    Output::new(format, None).write(result)
}

/// Prints verbose output if enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints error message.
pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m✗\x1b[0m {}", msg);
}

/// Prints info message.
pub fn print_info(msg: &str) {
    eprintln!("\x1b[34mℹ\x1b[0m {}", msg);
}

/// Formats bytes to human readable string.
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Overrides taken from command flags or request files.
#[derive(Debug, Default)]
pub struct ClientOverrides {
    pub timeout: Option<Duration>,
    pub language: Option<String>,
    pub rate: Option<String>,
    pub pitch: Option<String>,
}

/// Creates a read-aloud client from the context and overrides.
pub fn create_client(
    cli: &Cli,
    ctx: Option<&Context>,
    overrides: &ClientOverrides,
) -> anyhow::Result<Client> {
    let mut builder = Client::builder();

    if let Some(ctx) = ctx {
        if !ctx.endpoint.is_empty() {
            builder = builder.endpoint(&ctx.endpoint);
        }
        if !ctx.token.is_empty() {
            builder = builder.trusted_client_token(&ctx.token);
        }
        if let Some(timeout) = ctx.timeout_duration() {
            builder = builder.timeout(timeout);
        }
        if !ctx.language.is_empty() {
            builder = builder.language(&ctx.language);
        }
        if !ctx.output_format.is_empty() {
            builder = builder.output_format(&ctx.output_format);
        }
    }

    if let Some(timeout) = overrides.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(language) = &overrides.language {
        builder = builder.language(language);
    }
    if overrides.rate.is_some() || overrides.pitch.is_some() {
        builder = builder.prosody(
            overrides.rate.as_deref().unwrap_or(readaloud::ssml::DEFAULT_PROSODY),
            overrides.pitch.as_deref().unwrap_or(readaloud::ssml::DEFAULT_PROSODY),
        );
    }
    if cli.verbose {
        builder = builder.verbosity(Verbosity::Verbose);
    }

    Ok(builder.build()?)
}
