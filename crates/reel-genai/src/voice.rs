//! Semantic voice keys and their provider voice identifiers.

/// Provider voice used for unknown keys.
pub const DEFAULT_VOICE_ID: &str = "alloy";

const VOICE_TABLE: &[(&str, &str)] = &[
    ("authoritative_male", "onyx"),
    ("warm_female", "nova"),
    ("neutral", "alloy"),
    ("energetic_male", "echo"),
    ("calm_female", "shimmer"),
    ("storyteller", "fable"),
];

/// Map a caller-facing voice key to the provider voice identifier.
///
/// Keys are matched case-insensitively; unknown keys fall back to
/// [`DEFAULT_VOICE_ID`].
pub fn resolve_voice(key: &str) -> &'static str {
    let key = key.trim();
    VOICE_TABLE
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, id)| *id)
        .unwrap_or(DEFAULT_VOICE_ID)
}

/// All known semantic keys.
pub fn known_voice_keys() -> impl Iterator<Item = &'static str> {
    VOICE_TABLE.iter().map(|(k, _)| *k)
}

/// Whether the key is in the voice table.
pub fn is_known_voice(key: &str) -> bool {
    let key = key.trim();
    known_voice_keys().any(|k| k.eq_ignore_ascii_case(key))
}
