//! Language module - coarse language classification of document text

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dominant language of a text
///
/// Drives token estimation: Chinese text is counted per character, English
/// per word, mixed text as a combination of both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Chinese (more than 70% CJK characters)
    #[default]
    Zh,

    /// English (fewer than 30% CJK characters)
    En,

    /// Anything in between
    Mixed,
}

impl Language {
    /// Classify text by the share of CJK unified ideographs
    ///
    /// The ratio is taken over the character count of the trimmed text.
    /// Empty or whitespace-only text is classified as `Zh`.
    ///
    /// # Examples
    ///
    /// ```
    /// use factwire_domain::Language;
    ///
    /// assert_eq!(Language::detect("央行宣布加息"), Language::Zh);
    /// assert_eq!(Language::detect("The central bank raised rates"), Language::En);
    /// ```
    pub fn detect(text: &str) -> Self {
        let total = text.trim().chars().count();
        if total == 0 {
            return Language::Zh;
        }

        let cjk = text.chars().filter(|c| is_cjk(*c)).count();
        let ratio = cjk as f64 / total as f64;

        if ratio > 0.7 {
            Language::Zh
        } else if ratio < 0.3 {
            Language::En
        } else {
            Language::Mixed
        }
    }

    /// Get the language code
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
            Language::Mixed => "mixed",
        }
    }

    /// Parse a language code
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "zh" | "zh-cn" | "chinese" => Some(Language::Zh),
            "en" | "english" => Some(Language::En),
            "mixed" => Some(Language::Mixed),
            _ => None,
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid language: {}", s))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a character is a CJK unified ideograph (U+4E00..=U+9FFF)
pub fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}
