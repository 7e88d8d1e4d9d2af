//! Output utilities for the readaloud CLI.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

/// Structured output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// YAML format (default).
    #[default]
    Yaml,
    /// JSON format.
    Json,
}

/// Output configuration.
pub struct Output {
    pub format: OutputFormat,
    pub file: Option<String>,
}

impl Output {
    /// Creates a new output configuration.
    pub fn new(format: OutputFormat, file: Option<String>) -> Self {
        Self { format, file }
    }

    /// Renders `value` in the configured format.
    pub fn render<T: Serialize>(&self, value: &T) -> anyhow::Result<String> {
        Ok(match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
        })
    }

    /// Writes `value` to the output file, or stdout.
    pub fn write<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let output = self.render(value)?;
        match &self.file {
            Some(path) => write_binary(output.as_bytes(), path)?,
            None => println!("{}", output),
        }
        Ok(())
    }
}

/// Writes binary data to a file, creating parent directories.
pub fn write_binary(data: &[u8], path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data)?;
    Ok(())
}

/// Guesses a file extension from a service output format name such as
/// `audio-24khz-48kbitrate-mono-mp3`.
pub fn guess_extension(format: &str) -> &'static str {
    let format = format.to_lowercase();
    if format.starts_with("riff-") {
        return "wav";
    }
    if format.starts_with("webm-") {
        return "webm";
    }
    if format.starts_with("ogg-") {
        return "ogg";
    }
    match format.rsplit('-').next().unwrap_or_default() {
        "mp3" => "mp3",
        "pcm" => "pcm",
        "opus" => "opus",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_extension() {
        assert_eq!(guess_extension("audio-24khz-48kbitrate-mono-mp3"), "mp3");
        assert_eq!(guess_extension("riff-24khz-16bit-mono-pcm"), "wav");
        assert_eq!(guess_extension("raw-16khz-16bit-mono-pcm"), "pcm");
        assert_eq!(guess_extension("webm-24khz-16bit-mono-opus"), "webm");
        assert_eq!(guess_extension("something"), "bin");
    }

    #[test]
    fn test_render_json_and_yaml() {
        #[derive(Serialize)]
        struct Row {
            name: &'static str,
        }

        let json = Output::new(OutputFormat::Json, None).render(&Row { name: "a" }).unwrap();
        assert_eq!(json, "{\n  \"name\": \"a\"\n}");
        let yaml = Output::new(OutputFormat::Yaml, None).render(&Row { name: "a" }).unwrap();
        assert_eq!(yaml, "name: a\n");
    }

    #[test]
    fn test_write_binary_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("a.mp3");
        write_binary(b"ID3", &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3");
    }
}
