//! Carousel page rendering.
//!
//! The page carries an explicit `{{SUBDIR}}` placeholder inside its script.
//! The subdirectory is inserted as a JSON string literal with every character
//! that could terminate the script block escaped.

pub const SUBDIR_PLACEHOLDER: &str = "{{SUBDIR}}";

/// Substitute `subdir` into the carousel template.
pub fn render_carousel(template: &str, subdir: &str) -> String {
    template.replace(SUBDIR_PLACEHOLDER, &script_string_literal(subdir))
}

/// JSON string literal safe to embed inside `<script>`.
pub fn script_string_literal(value: &str) -> String {
    // serde_json only fails on non-string keys; a &str always serializes
    let json = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string());
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}
