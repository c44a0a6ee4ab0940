//! Document content input type.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Content accepted by the create-document tool.
///
/// Agent runtimes hand tool arguments back in two shapes: a plain string, or
/// an object with a `text` field when the value round-tripped through a
/// string-formatting pipeline. Both unwrap to the same upload bytes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum DocContent {
    /// Raw text.
    Text(String),
    /// Text wrapped in a `{"text": ...}` envelope.
    Wrapped { text: String },
}

impl DocContent {
    /// Unwrap to the text that gets uploaded.
    pub fn into_text(self) -> String {
        match self {
            DocContent::Text(text) => text,
            DocContent::Wrapped { text } => text,
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            DocContent::Text(text) => text,
            DocContent::Wrapped { text } => text,
        }
    }
}

impl From<String> for DocContent {
    fn from(text: String) -> Self {
        DocContent::Text(text)
    }
}

impl From<&str> for DocContent {
    fn from(text: &str) -> Self {
        DocContent::Text(text.to_string())
    }
}
