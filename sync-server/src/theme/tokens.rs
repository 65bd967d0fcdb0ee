//! Style-token extraction
//!
//! Heuristic, not a schema: top-level settings keys are bucketed by substring
//! markers. Keys matching no marker are dropped from the tokens (they stay in
//! whatever section owns them). The classifier is a standalone function so an
//! explicit allow-list can replace it without touching the parser.

use serde_json::Value;

use crate::db::models::StyleTokens;

/// Token bucket a settings key can classify into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBucket {
    Colors,
    Typography,
}

const COLOR_MARKERS: &[&str] = &["color", "colour", "background", "gradient"];
const TYPOGRAPHY_MARKERS: &[&str] = &["font", "heading", "type_scale"];

/// Classify one settings key, or None when it is not a style token
///
/// Color markers win when a key matches both buckets ("heading_color" is a
/// color, not typography).
pub fn classify_token(key: &str) -> Option<TokenBucket> {
    let lower = key.to_ascii_lowercase();
    if COLOR_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(TokenBucket::Colors);
    }
    if TYPOGRAPHY_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(TokenBucket::Typography);
    }
    None
}

/// Extract style tokens from top-level theme settings
pub fn extract_style_tokens(settings: &Value) -> StyleTokens {
    extract_style_tokens_with(settings, classify_token)
}

/// Extraction with a caller-supplied classifier
pub fn extract_style_tokens_with(
    settings: &Value,
    classifier: fn(&str) -> Option<TokenBucket>,
) -> StyleTokens {
    let Some(settings) = settings.as_object() else {
        return StyleTokens::default();
    };

    let mut tokens = StyleTokens::default();

    for (key, value) in settings {
        // Named color schemes get captured whole, not key-by-key
        if key == "color_schemes" {
            if let Some(schemes) = value.as_object() {
                tokens.color_schemes = schemes.clone();
            }
            continue;
        }

        match classifier(key) {
            Some(TokenBucket::Colors) => {
                tokens.colors.insert(key.clone(), value.clone());
            }
            Some(TokenBucket::Typography) => {
                tokens.typography.insert(key.clone(), value.clone());
            }
            None => {}
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_bucket_by_marker() {
        let settings = json!({
            "primary_color": "#111111",
            "page_background": "#ffffff",
            "heading_font": "serif",
            "type_scale": 1.2,
            "checkout_button_label": "Buy",
        });

        let tokens = extract_style_tokens(&settings);
        assert!(tokens.colors.contains_key("primary_color"));
        assert!(tokens.colors.contains_key("page_background"));
        assert!(tokens.typography.contains_key("type_scale"));
        // Unrecognized keys are dropped from tokens entirely
        assert!(!tokens.colors.contains_key("checkout_button_label"));
        assert!(!tokens.typography.contains_key("checkout_button_label"));
    }

    #[test]
    fn color_marker_wins_over_typography() {
        assert_eq!(classify_token("heading_color"), Some(TokenBucket::Colors));
        assert_eq!(classify_token("heading_font"), Some(TokenBucket::Typography));
        assert_eq!(classify_token("menu_items"), None);
    }

    #[test]
    fn color_schemes_captured_whole() {
        let settings = json!({
            "color_schemes": {
                "scheme-1": { "background": "#fff", "text": "#000" },
            },
        });

        let tokens = extract_style_tokens(&settings);
        assert_eq!(tokens.color_schemes.len(), 1);
        assert!(tokens.color_schemes.contains_key("scheme-1"));
    }
}
