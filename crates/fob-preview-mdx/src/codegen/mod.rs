//! JavaScript generation helpers shared by both compilers.

mod context;
mod element;
mod escape;
mod js_value;

pub use context::{CodegenContext, DEFAULT_COMPONENTS, JsxFlavor, Scope, Tag};
pub use element::{Prop, object_literal, render_element};
pub use escape::{escape_js_string, is_valid_identifier, js_string, property_key};
pub use js_value::{JsValue, merge_text};
