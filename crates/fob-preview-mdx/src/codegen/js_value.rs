//! JavaScript values that track whether they still need escaping.

use super::escape::js_string;

/// A generated child value.
///
/// Keeping text separate from code avoids double escaping when children are
/// merged or wrapped.
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    /// Already valid JavaScript, e.g. `_jsx(...)` or `props.name`.
    Raw(String),
    /// Plain text, escaped on output.
    Text(String),
}

impl JsValue {
    pub fn raw(s: impl Into<String>) -> Self {
        Self::Raw(s.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn to_js(&self) -> String {
        match self {
            JsValue::Raw(s) => s.clone(),
            JsValue::Text(s) => js_string(s),
        }
    }
}

/// Merge adjacent text values.
pub fn merge_text(values: Vec<JsValue>) -> Vec<JsValue> {
    let mut merged: Vec<JsValue> = Vec::with_capacity(values.len());
    for value in values {
        match (merged.last_mut(), value) {
            (Some(JsValue::Text(prev)), JsValue::Text(next)) => prev.push_str(&next),
            (_, value) => merged.push(value),
        }
    }
    merged
}
