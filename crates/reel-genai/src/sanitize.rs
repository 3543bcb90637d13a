//! Prompt sanitization for content-policy escalation.
//!
//! The term lists are data, not behavior: they are carried by a
//! [`ContentFilter`] value that callers construct (defaults, JSON file, or
//! explicit lists) and inject into the generation adapter.

use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, GenerationResult};

/// Framing applied at level 2 around the stripped prompt.
pub const CORPORATE_FRAMING_PREFIX: &str =
    "A professional, clean, corporate illustration suitable for all audiences:";

/// Prompt substituted at level 3, independent of the input.
pub const GENERIC_FALLBACK_PROMPT: &str =
    "An abstract news illustration with soft geometric shapes, \
     muted blue and gray tones, clean modern editorial style, no people, no text";

const DEFAULT_VIOLENCE_TERMS: &[&str] = &[
    "kill", "killed", "killing", "murder", "blood", "bloody", "gore", "weapon", "weapons", "gun",
    "guns", "shooting", "shot", "stab", "stabbing", "bomb", "bombing", "explosion", "attack",
    "terror", "terrorist", "war", "massacre", "corpse", "dead", "death", "violence", "violent",
    "assault", "torture",
];

const DEFAULT_SEXUAL_TERMS: &[&str] = &[
    "nude", "naked", "sex", "sexual", "sexy", "erotic", "porn", "explicit", "lingerie", "seductive",
];

const DEFAULT_HATE_TERMS: &[&str] = &[
    "hate", "racist", "racism", "nazi", "supremacist", "slur", "extremist", "genocide",
];

/// How aggressively a prompt has been rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizationLevel {
    /// Prompt as written by the planner
    Original,
    /// Flagged terms removed
    StripTerms,
    /// Stripped prompt wrapped in all-audiences framing
    CorporateFraming,
    /// Prompt replaced by a fixed generic illustration
    GenericFallback,
}

impl SanitizationLevel {
    /// The next, stricter level, if any.
    pub fn escalate(self) -> Option<Self> {
        match self {
            SanitizationLevel::Original => Some(SanitizationLevel::StripTerms),
            SanitizationLevel::StripTerms => Some(SanitizationLevel::CorporateFraming),
            SanitizationLevel::CorporateFraming => Some(SanitizationLevel::GenericFallback),
            SanitizationLevel::GenericFallback => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            SanitizationLevel::Original => 0,
            SanitizationLevel::StripTerms => 1,
            SanitizationLevel::CorporateFraming => 2,
            SanitizationLevel::GenericFallback => 3,
        }
    }
}

impl fmt::Display for SanitizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.as_u8())
    }
}

/// Term lists as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermLists {
    #[serde(default)]
    pub violence: Vec<String>,
    #[serde(default)]
    pub sexual: Vec<String>,
    #[serde(default)]
    pub hate: Vec<String>,
}

impl TermLists {
    /// Built-in lists.
    pub fn builtin() -> Self {
        let owned = |terms: &[&str]| terms.iter().map(|t| t.to_string()).collect();
        Self {
            violence: owned(DEFAULT_VIOLENCE_TERMS),
            sexual: owned(DEFAULT_SEXUAL_TERMS),
            hate: owned(DEFAULT_HATE_TERMS),
        }
    }

    fn all_terms(&self) -> impl Iterator<Item = &str> {
        self.violence
            .iter()
            .chain(self.sexual.iter())
            .chain(self.hate.iter())
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }
}

/// Compiled content filter.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    lists: TermLists,
    pattern: Option<Regex>,
}

impl Default for ContentFilter {
    fn default() -> Self {
        // The built-in terms are plain words, so compilation cannot fail.
        Self::new(TermLists::builtin()).unwrap_or_else(|_| Self {
            lists: TermLists::default(),
            pattern: None,
        })
    }
}

impl ContentFilter {
    /// Compile a filter from term lists (case-insensitive, word-boundary match).
    pub fn new(lists: TermLists) -> GenerationResult<Self> {
        let alternatives: Vec<String> = lists.all_terms().map(regex::escape).collect();

        let pattern = if alternatives.is_empty() {
            None
        } else {
            let source = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
            Some(
                Regex::new(&source)
                    .map_err(|e| {
                        GenerationError::config_error(format!("Invalid content filter: {}", e))
                    })?,
            )
        };

        Ok(Self { lists, pattern })
    }

    /// Load term lists from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> GenerationResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GenerationError::config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let lists: TermLists = serde_json::from_str(&raw)?;
        Self::new(lists)
    }

    /// Built-in lists, or the file named by `CONTENT_FILTER_FILE` when set.
    pub fn from_env() -> GenerationResult<Self> {
        match std::env::var("CONTENT_FILTER_FILE") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn lists(&self) -> &TermLists {
        &self.lists
    }

    /// Remove flagged terms and normalize whitespace.
    pub fn strip_terms(&self, prompt: &str) -> String {
        let stripped = match &self.pattern {
            Some(re) => re.replace_all(prompt, " ").into_owned(),
            None => prompt.to_string(),
        };
        normalize_whitespace(&stripped)
    }

    /// Rewrite a prompt at the given level.
    ///
    /// Each level is a pure function of the original prompt, so applying the
    /// same level twice yields the same text.
    pub fn sanitize(&self, prompt: &str, level: SanitizationLevel) -> String {
        match level {
            SanitizationLevel::Original => prompt.to_string(),
            SanitizationLevel::StripTerms => self.strip_terms(prompt),
            SanitizationLevel::CorporateFraming => {
                let core = self.strip_terms(prompt);
                if core.is_empty() {
                    CORPORATE_FRAMING_PREFIX.to_string()
                } else {
                    format!("{} {}", CORPORATE_FRAMING_PREFIX, core)
                }
            }
            SanitizationLevel::GenericFallback => GENERIC_FALLBACK_PROMPT.to_string(),
        }
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
