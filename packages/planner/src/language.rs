// ABOUTME: Language selector for generated content
// ABOUTME: Maps the selector tags to display names used in backend language instructions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Auto,
    English,
    Hindi,
    Kannada,
    Tamil,
    Telugu,
    Marathi,
    Bengali,
    Gujarati,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::Auto,
        Language::English,
        Language::Hindi,
        Language::Kannada,
        Language::Tamil,
        Language::Telugu,
        Language::Marathi,
        Language::Bengali,
        Language::Gujarati,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Language::Auto => "auto",
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Kannada => "kn",
            Language::Tamil => "ta",
            Language::Telugu => "te",
            Language::Marathi => "mr",
            Language::Bengali => "bn",
            Language::Gujarati => "gu",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Auto => "Auto-detect",
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Kannada => "Kannada",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
            Language::Marathi => "Marathi",
            Language::Bengali => "Bengali",
            Language::Gujarati => "Gujarati",
        }
    }

    /// Name of the language generated content must be written in.
    ///
    /// An explicit selection wins. With `Auto`, the language detected by the
    /// analysis stage is used (known tags and names are normalised, anything else
    /// is passed through verbatim).
    pub fn resolve(&self, detected: Option<&str>) -> String {
        if *self != Language::Auto {
            return self.display_name().to_string();
        }
        match detected.map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => match raw.parse::<Language>() {
                Ok(Language::Auto) | Err(_) => raw.to_string(),
                Ok(lang) => lang.display_name().to_string(),
            },
            None => "the same language the user wrote in".to_string(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.tag() == needle || lang.display_name().to_lowercase() == needle)
            .ok_or_else(|| format!("Unsupported language: '{}'", s))
    }
}
