//! Built-in voice catalog.

use serde::Serialize;

/// Default voice.
pub const DEFAULT_VOICE: &str = "ja-JP-NanamiNeural";

/// Voice gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// A voice offered by the read-aloud service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Voice {
    /// Short name sent in the markup.
    pub name: &'static str,
    /// Locale of the voice.
    pub locale: &'static str,
    pub gender: Gender,
}

/// Japanese neural voices.
pub const VOICES: &[Voice] = &[
    Voice {
        name: "ja-JP-NanamiNeural",
        locale: "ja-JP",
        gender: Gender::Female,
    },
    Voice {
        name: "ja-JP-KeitaNeural",
        locale: "ja-JP",
        gender: Gender::Male,
    },
    Voice {
        name: "ja-JP-AoiNeural",
        locale: "ja-JP",
        gender: Gender::Female,
    },
    Voice {
        name: "ja-JP-DaichiNeural",
        locale: "ja-JP",
        gender: Gender::Male,
    },
    Voice {
        name: "ja-JP-MayuNeural",
        locale: "ja-JP",
        gender: Gender::Female,
    },
    Voice {
        name: "ja-JP-NaokiNeural",
        locale: "ja-JP",
        gender: Gender::Male,
    },
    Voice {
        name: "ja-JP-ShioriNeural",
        locale: "ja-JP",
        gender: Gender::Female,
    },
];

/// Looks up a catalog voice by short name.
pub fn find_voice(name: &str) -> Option<&'static Voice> {
    VOICES.iter().find(|v| v.name == name)
}
