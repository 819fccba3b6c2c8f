//! Tolerant JSON extraction from raw provider output
//!
//! Model output is not guaranteed well-formed: replies arrive wrapped in
//! prose, markdown fences, or worse. Extraction slices from the first `{`
//! to the last `}` and accepts the substring only if it parses; everything
//! else degrades to a synthesized `{"text": ...}` object so downstream
//! consumers always receive valid JSON.

/// Notice substituted when the reply held no parsable JSON object
pub const FORMAT_FALLBACK_NOTICE: &str =
    "I received your message but had trouble formatting a proper response. Please try again.";

/// Notice substituted when the provider call itself failed or timed out
pub const PROVIDER_ERROR_NOTICE: &str =
    "Sorry, I encountered an error processing your request.";

/// Synthesize a valid plain-text reply object
#[must_use]
pub fn fallback_text(notice: &str) -> String {
    serde_json::json!({ "text": notice }).to_string()
}

/// Extract the JSON object out of raw provider output.
///
/// Locates the first `{` and the last `}`; if the slice between them parses
/// as JSON it is returned verbatim. Otherwise, or when no brace pair
/// exists, a [`FORMAT_FALLBACK_NOTICE`] text object is synthesized.
#[must_use]
pub fn extract_json(raw: &str) -> String {
    if let (Some(first), Some(last)) = (raw.find('{'), raw.rfind('}')) {
        if last > first {
            let candidate = &raw[first..=last];
            if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
                return candidate.to_owned();
            }
            tracing::warn!(
                len = candidate.len(),
                "brace-delimited slice of provider output did not parse; substituting fallback"
            );
        }
    } else {
        tracing::warn!("provider output held no brace pair; substituting fallback");
    }
    fallback_text(FORMAT_FALLBACK_NOTICE)
}
