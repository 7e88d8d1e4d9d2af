//! Configuration management commands.

use clap::{Args, Subcommand};

use readaloud_cli::config::{Context as CliContext, mask_token};

use super::{get_config, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Contexts allow you to keep several endpoint and voice setups,
/// similar to kubectl's context management.
///
/// Configuration is stored in ~/.giztoy/readaloud/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add a new context
    #[command(name = "add-context")]
    AddContext {
        /// Context name
        name: String,
        /// WebSocket endpoint
        #[arg(long)]
        endpoint: Option<String>,
        /// Trusted client token
        #[arg(long)]
        token: Option<String>,
        /// Session timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Default voice
        #[arg(long)]
        default_voice: Option<String>,
        /// Markup language
        #[arg(long)]
        language: Option<String>,
        /// Audio output format
        #[arg(long)]
        output_format: Option<String>,
    },
    /// Delete a context
    #[command(name = "delete-context")]
    DeleteContext {
        /// Context name
        name: String,
    },
    /// Set the current context
    #[command(name = "use-context")]
    UseContext {
        /// Context name
        name: String,
    },
    /// Display the current context
    #[command(name = "get-context")]
    GetContext,
    /// List all contexts
    #[command(name = "list-contexts", alias = "get-contexts")]
    ListContexts,
    /// View the current configuration
    View,
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::AddContext {
                name,
                endpoint,
                token,
                timeout,
                default_voice,
                language,
                output_format,
            } => {
                let mut cfg = get_config(cli)?;

                let ctx = CliContext {
                    endpoint: endpoint.clone().unwrap_or_default(),
                    token: token.clone().unwrap_or_default(),
                    timeout: timeout.unwrap_or(0),
                    default_voice: default_voice.clone().unwrap_or_default(),
                    language: language.clone().unwrap_or_default(),
                    output_format: output_format.clone().unwrap_or_default(),
                    ..Default::default()
                };

                cfg.add_context(name, ctx)?;
                print_success(&format!("Context \"{}\" added successfully", name));
                Ok(())
            }

            ConfigSubcommand::DeleteContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.delete_context(name)?;
                print_success(&format!("Context \"{}\" deleted", name));
                Ok(())
            }

            ConfigSubcommand::UseContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.use_context(name)?;
                print_success(&format!("Switched to context \"{}\"", name));
                Ok(())
            }

            ConfigSubcommand::GetContext => {
                let cfg = get_config(cli)?;
                if cfg.current_context.is_empty() {
                    println!("No current context set");
                } else {
                    println!("{}", cfg.current_context);
                }
                Ok(())
            }

            ConfigSubcommand::ListContexts => {
                let cfg = get_config(cli)?;

                if cfg.contexts.is_empty() {
                    println!("No contexts configured");
                    return Ok(());
                }

                println!(
                    "{:<8} {:<20} {:<24} {:<40}",
                    "CURRENT", "NAME", "DEFAULT_VOICE", "ENDPOINT"
                );

                for name in cfg.list_contexts() {
                    let Some(ctx) = cfg.get_context(name) else {
                        continue;
                    };
                    let current = if name == cfg.current_context { "*" } else { "" };
                    println!(
                        "{:<8} {:<20} {:<24} {:<40}",
                        current,
                        name,
                        or_dash(&ctx.default_voice),
                        or_dash(&ctx.endpoint)
                    );
                }

                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;

                println!("Config file: {}", cfg.path().display());
                println!("Current context: {}", cfg.current_context);
                println!("Contexts: {}", cfg.contexts.len());

                if !cfg.contexts.is_empty() {
                    println!("\nContext details:");

                    for name in cfg.list_contexts() {
                        let Some(ctx) = cfg.get_context(name) else {
                            continue;
                        };
                        println!("\n  [{}]", name);
                        println!("    Endpoint: {}", or_dash(&ctx.endpoint));
                        if !ctx.token.is_empty() {
                            println!("    Token: {}", mask_token(&ctx.token));
                        }
                        if ctx.timeout > 0 {
                            println!("    Timeout: {}s", ctx.timeout);
                        }
                        if !ctx.default_voice.is_empty() {
                            println!("    Default Voice: {}", ctx.default_voice);
                        }
                        if !ctx.language.is_empty() {
                            println!("    Language: {}", ctx.language);
                        }
                        if !ctx.output_format.is_empty() {
                            println!("    Output Format: {}", ctx.output_format);
                        }
                        for (key, value) in &ctx.extra {
                            println!("    {}: {}", key, value);
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
