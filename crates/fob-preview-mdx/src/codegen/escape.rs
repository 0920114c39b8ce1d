//! String escaping and identifier checks for generated JavaScript.

/// Escape text for a double-quoted JavaScript string literal.
///
/// U+2028 and U+2029 are escaped as well; older engines treat them as line
/// terminators even inside string literals.
pub fn escape_js_string(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 8);

    for ch in text.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\x08' => result.push_str("\\b"),
            '\x0C' => result.push_str("\\f"),
            '\u{2028}' => result.push_str("\\u2028"),
            '\u{2029}' => result.push_str("\\u2029"),
            ch if ch.is_control() => result.push_str(&format!("\\u{:04x}", ch as u32)),
            _ => result.push(ch),
        }
    }

    result
}

/// Double-quoted JavaScript string literal for `text`.
pub fn js_string(text: &str) -> String {
    format!("\"{}\"", escape_js_string(text))
}

const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Whether `name` can be used as a bare binding or unquoted property key.
pub fn is_valid_identifier(name: &str) -> bool {
    if RESERVED.contains(&name) {
        return false;
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '$' || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '$' || c == '_')
}

/// Object key for `name`, quoted when it is not a plain identifier.
pub fn property_key(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '$' || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '$' || c == '_');

    if plain {
        name.to_string()
    } else {
        js_string(name)
    }
}
