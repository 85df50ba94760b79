//! Server-side view rendering.
//!
//! Templates are plain files in the configured view directory. A template
//! refers to options with `{{ name }}` placeholders; string options are
//! inserted as text, anything else as compact JSON. All inserted values are
//! HTML-escaped. Unknown placeholders render as nothing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

/// Failure to render a view.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("invalid template name '{0}'")]
    InvalidName(String),
    #[error("failed to read template '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unterminated placeholder in template '{0}'")]
    Unterminated(String),
}

/// Turns a named template plus options into markup.
#[async_trait]
pub trait ViewRenderer: Send + Sync {
    async fn render(&self, template: &str, options: &Value) -> Result<String, ViewError>;
}

/// Renders templates stored under a directory.
#[derive(Debug, Clone)]
pub struct TemplateDirectory {
    root: PathBuf,
}

impl TemplateDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, ViewError> {
        let valid = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        if !valid {
            return Err(ViewError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl ViewRenderer for TemplateDirectory {
    async fn render(&self, template: &str, options: &Value) -> Result<String, ViewError> {
        let path = self.resolve(template)?;
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ViewError::Io {
                name: template.to_string(),
                source,
            })?;
        substitute(template, &source, options)
    }
}

fn substitute(name: &str, source: &str, options: &Value) -> Result<String, ViewError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after
            .find("}}")
            .ok_or_else(|| ViewError::Unterminated(name.to_string()))?;
        let key = after[..close].trim();

        match options.get(key) {
            Some(Value::String(text)) => out.push_str(&escape_html(text)),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&escape_html(&other.to_string())),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);

    Ok(out)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
