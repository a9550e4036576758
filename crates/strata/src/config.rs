//! Render configuration.
//!
//! ```
//! use strata::RenderConfig;
//!
//! let config = RenderConfig::from_yaml("line_width: 40\nlint: true").unwrap();
//! assert_eq!(config.line_width, 40);
//! assert!(config.lint);
//! assert_eq!(config.newline, "\n");
//! ```

use serde::{Deserialize, Serialize};
use strata_writer::{AutoIndentWriter, NoIndentWriter, TemplateWriter, DEFAULT_NEWLINE, NO_WRAP};

use crate::error::ConfigError;

/// Default bound on nested template renders.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Settings applied to every render of an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Wrap column; `0` disables wrapping.
    pub line_width: usize,
    pub newline: String,
    /// Collect recursion traces and report unused attributes.
    pub lint: bool,
    pub max_depth: usize,
    /// Apply indentation. When false, a [`NoIndentWriter`] is used.
    pub indent: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            line_width: NO_WRAP,
            newline: DEFAULT_NEWLINE.to_string(),
            lint: false,
            max_depth: DEFAULT_MAX_DEPTH,
            indent: true,
        }
    }
}

impl RenderConfig {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    pub fn with_newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    pub fn with_lint(mut self, lint: bool) -> Self {
        self.lint = lint;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Builds the string writer this configuration selects.
    pub(crate) fn string_writer(&self, line_width: usize) -> StringWriter {
        if self.indent {
            StringWriter::Indent(
                AutoIndentWriter::new(String::new())
                    .with_newline(self.newline.as_str())
                    .with_line_width(line_width),
            )
        } else {
            StringWriter::Plain(
                NoIndentWriter::new(String::new())
                    .with_newline(self.newline.as_str())
                    .with_line_width(line_width),
            )
        }
    }
}

/// A writer over an owned `String`, indenting or not.
pub(crate) enum StringWriter {
    Indent(AutoIndentWriter<String>),
    Plain(NoIndentWriter<String>),
}

impl StringWriter {
    pub(crate) fn as_writer(&mut self) -> &mut dyn TemplateWriter {
        match self {
            StringWriter::Indent(w) => w,
            StringWriter::Plain(w) => w,
        }
    }

    pub(crate) fn into_string(self) -> String {
        match self {
            StringWriter::Indent(w) => w.into_inner(),
            StringWriter::Plain(w) => w.into_inner(),
        }
    }
}
