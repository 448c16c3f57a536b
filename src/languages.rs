// Supported languages for the Transcription Gateway
//
// The gateway advertises a fixed set of Indian-context languages. The set only
// decides whether a requested language is forwarded to the model as-is; the
// model itself can process many more.

/// Language codes and display names, in advertised order
pub const SUPPORTED_LANGUAGES: [(&str, &str); 9] = [
    ("en", "english"),
    ("hi", "hindi"),
    ("ta", "tamil"),
    ("te", "telugu"),
    ("bn", "bengali"),
    ("mr", "marathi"),
    ("gu", "gujarati"),
    ("kn", "kannada"),
    ("ml", "malayalam"),
];

/// Returns true if the code is one of the supported languages
pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
}

/// Supported language codes, in advertised order
pub fn supported_codes() -> Vec<&'static str> {
    SUPPORTED_LANGUAGES.iter().map(|(code, _)| *code).collect()
}

/// Display name for a supported language code
pub fn display_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Language to hand to the model for a full transcription.
///
/// Unsupported codes fall back to auto-detection (`None`) rather than an error.
pub fn resolve_requested(code: &str) -> Option<String> {
    if is_supported(code) {
        Some(code.to_string())
    } else {
        None
    }
}
