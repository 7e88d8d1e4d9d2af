//! Voice catalog command.

use clap::{Args, ValueEnum};

use readaloud::{DEFAULT_VOICE, Gender, VOICES, Voice};
use readaloud_cli::output::{Output, OutputFormat};

use crate::Cli;

/// List built-in voices.
#[derive(Args)]
pub struct VoicesCommand {
    /// Only list voices of this gender
    #[arg(long, value_enum)]
    gender: Option<GenderFilter>,
}

#[derive(Clone, Copy, ValueEnum)]
enum GenderFilter {
    Female,
    Male,
}

impl GenderFilter {
    fn matches(self, gender: Gender) -> bool {
        matches!(
            (self, gender),
            (GenderFilter::Female, Gender::Female) | (GenderFilter::Male, Gender::Male)
        )
    }
}

impl VoicesCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let voices: Vec<&Voice> = VOICES
            .iter()
            .filter(|v| self.gender.is_none_or(|g| g.matches(v.gender)))
            .collect();

        if cli.json || cli.output.is_some() {
            let format = if cli.json {
                OutputFormat::Json
            } else {
                OutputFormat::Yaml
            };
            return Output::new(format, cli.output.clone()).write(&voices);
        }

        println!("{:<8} {:<24} {:<8} {:<8}", "DEFAULT", "NAME", "LOCALE", "GENDER");
        for voice in voices {
            let default = if voice.name == DEFAULT_VOICE { "*" } else { "" };
            let gender = match voice.gender {
                Gender::Female => "female",
                Gender::Male => "male",
            };
            println!(
                "{:<8} {:<24} {:<8} {:<8}",
                default, voice.name, voice.locale, gender
            );
        }

        Ok(())
    }
}
