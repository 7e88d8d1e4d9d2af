//! Synthesis command.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use readaloud::{DEFAULT_VOICE, SessionState, SynthesisRequest, escape_text, find_voice, suggest_filename};
use readaloud_cli::output::{guess_extension, write_binary};

use super::{
    ClientOverrides, create_client, format_bytes, get_context, load_request, output_result,
    print_error, print_info, print_success, print_verbose,
};
use crate::Cli;

/// Synthesize text into an audio file.
///
/// The text comes from -t or from a request file given with -f. The audio
/// is written to -o, or to a name derived from the text.
#[derive(Args)]
pub struct SynthCommand {
    /// Text to synthesize (alternative to -f file)
    #[arg(short = 't', long)]
    text: Option<String>,
    /// Voice short name (e.g., ja-JP-NanamiNeural)
    #[arg(short = 'V', long)]
    voice: Option<String>,
    /// Session timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Markup language (e.g., ja-JP)
    #[arg(long)]
    language: Option<String>,
    /// Prosody rate (e.g., medium, +10%)
    #[arg(long)]
    rate: Option<String>,
    /// Prosody pitch (e.g., medium, -5Hz)
    #[arg(long)]
    pitch: Option<String>,
    /// Escape XML special characters in the text
    #[arg(long)]
    escape: bool,
}

/// Synthesis request from a YAML/JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
struct SynthFileRequest {
    text: String,
    #[serde(default)]
    voice: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    rate: Option<String>,
    #[serde(default)]
    pitch: Option<String>,
}

/// Summary printed with --json.
#[derive(Debug, Serialize)]
struct SynthSummary {
    file: String,
    bytes: usize,
    mime_type: String,
    voice: String,
    request_id: String,
}

impl SynthCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let file_req: Option<SynthFileRequest> = match &cli.input {
            Some(path) => Some(load_request(path)?),
            None => None,
        };

        let text = match (&self.text, &file_req) {
            (Some(text), _) => text.clone(),
            (None, Some(req)) => req.text.clone(),
            (None, None) => anyhow::bail!("either -t text or -f file is required"),
        };
        let text = if self.escape { escape_text(&text) } else { text };

        let ctx = get_context(cli)?;
        let voice = self
            .voice
            .clone()
            .or_else(|| file_req.as_ref().and_then(|r| r.voice.clone()))
            .or_else(|| {
                ctx.as_ref()
                    .map(|c| c.default_voice.clone())
                    .filter(|v| !v.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_VOICE.to_string());

        if find_voice(&voice).is_none() {
            print_verbose(cli, &format!("Voice {} is not in the built-in catalog", voice));
        }

        let overrides = ClientOverrides {
            timeout: self.timeout.map(Duration::from_secs),
            language: self
                .language
                .clone()
                .or_else(|| file_req.as_ref().and_then(|r| r.language.clone())),
            rate: self
                .rate
                .clone()
                .or_else(|| file_req.as_ref().and_then(|r| r.rate.clone())),
            pitch: self
                .pitch
                .clone()
                .or_else(|| file_req.as_ref().and_then(|r| r.pitch.clone())),
        };
        let client = create_client(cli, ctx.as_ref(), &overrides)?;

        let request = SynthesisRequest::new(text, voice);
        request.validate()?;

        print_info(&format!(
            "Synthesizing {} characters with {}...",
            request.text.chars().count(),
            request.voice
        ));

        let session = client.session();
        let printer = cli
            .verbose
            .then(|| tokio::spawn(print_transitions(session.transitions(), std::io::stderr())));

        let outcome = session.run(&request).await;
        if let Some(printer) = printer {
            let _ = printer.await;
        }

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                print_error(&describe_error(&e));
                return Err(e.into());
            }
        };

        let path = match &cli.output {
            Some(path) => PathBuf::from(path),
            None => {
                let name = suggest_filename(&request.text, chrono::Utc::now());
                let ext = guess_extension(client.config().messages.output_format_str());
                PathBuf::from(name).with_extension(ext)
            }
        };
        write_binary(&result.audio, &path)?;

        print_success(&format!(
            "Audio saved to {} ({})",
            path.display(),
            format_bytes(result.len())
        ));

        if cli.json {
            output_result(
                &SynthSummary {
                    file: path.display().to_string(),
                    bytes: result.len(),
                    mime_type: result.mime_type.to_string(),
                    voice: request.voice.clone(),
                    request_id: result.request_id.clone(),
                },
                true,
            )?;
        }

        Ok(())
    }
}

/// Prints each state change until the session is done.
async fn print_transitions<W: Write>(
    mut transitions: broadcast::Receiver<SessionState>,
    mut out: W,
) -> W {
    loop {
        match transitions.recv().await {
            Ok(state) => {
                let _ = writeln!(out, "[verbose] state: {}", state);
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return out,
        }
    }
}

fn describe_error(e: &readaloud::Error) -> String {
    if e.is_timeout() {
        format!("Synthesis timed out: {}", e)
    } else if e.is_empty_result() {
        "The service finished without sending audio".to_string()
    } else if e.is_transport() {
        format!("Connection failed: {}", e)
    } else {
        format!("Synthesis failed: {}", e)
    }
}
