//! Auto-indenting, line-wrapping text writer.
//!
//! This crate turns a stream of text fragments into final output while
//! honoring an indentation stack, anchor columns and an optional line width.
//! It knows nothing about templates: the evaluator in `strata` drives it
//! through the [`TemplateWriter`] trait.
//!
//! # Example
//!
//! ```rust
//! use strata_writer::{AutoIndentWriter, TemplateWriter};
//!
//! let mut out = AutoIndentWriter::new(String::new());
//! out.push_indentation("  ");
//! out.write("Terence\nJim\nSriram").unwrap();
//! out.pop_indentation();
//!
//! assert_eq!(out.into_inner(), "  Terence\n  Jim\n  Sriram");
//! ```
//!
//! # Indentation
//!
//! Indentation is emitted lazily: a newline only marks the writer as being at
//! the start of a line, and the concatenated indentation stack is written in
//! front of the next visible character. A trailing newline therefore never
//! leaves dangling whitespace.
//!
//! # Wrapping and Anchors
//!
//! With a non-zero line width, [`TemplateWriter::write_wrap`] emits the wrap
//! string (normally `"\n"`) whenever the next token would run past the width.
//! After a wrapped newline the writer indents to the current indentation or,
//! when it lies further right, to the innermost anchor column recorded by
//! [`TemplateWriter::push_anchor_point`]. Tokens are never split.

use std::fmt::{self, Write};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Newline sequence used when none is configured.
pub const DEFAULT_NEWLINE: &str = "\n";

/// Line width meaning "never wrap".
pub const NO_WRAP: usize = 0;

/// Sink interface used by the template evaluator.
///
/// All methods are synchronous and return the number of characters
/// actually emitted (indentation and newline sequences included).
pub trait TemplateWriter {
    /// Pushes an indentation string that prefixes every subsequent line.
    fn push_indentation(&mut self, indent: &str);

    /// Pops the innermost indentation string.
    fn pop_indentation(&mut self) -> Option<String>;

    /// Records the current column as the wrap target for nested output.
    fn push_anchor_point(&mut self);

    /// Discards the innermost anchor column.
    fn pop_anchor_point(&mut self);

    /// Sets the wrap width. [`NO_WRAP`] disables wrapping.
    fn set_line_width(&mut self, width: usize);

    /// Writes text, translating `\n` (and `\r\n`) into the configured newline
    /// and indenting each new line before its first character.
    fn write(&mut self, text: &str) -> Result<usize, fmt::Error>;

    /// Writes a separator between iterated values.
    fn write_separator(&mut self, text: &str) -> Result<usize, fmt::Error> {
        self.write(text)
    }

    /// Emits `wrap` if a token of display width `next_width` would not fit on
    /// the current line. Pass `1` when the width of the next token is unknown.
    fn write_wrap(&mut self, wrap: &str, next_width: usize) -> Result<usize, fmt::Error>;

    /// Wraps if needed, then writes `text` as one unsplittable token.
    fn write_token(&mut self, text: &str, wrap: Option<&str>) -> Result<usize, fmt::Error> {
        let mut n = 0;
        if let Some(wrap) = wrap {
            n += self.write_wrap(wrap, first_line_width(text))?;
        }
        Ok(n + self.write(text)?)
    }

    /// Absolute number of characters emitted so far.
    fn index(&self) -> usize;

    /// Current display column on the output line.
    fn column(&self) -> usize;

    /// Whether nothing visible has been written since the last newline.
    fn at_start_of_line(&self) -> bool;
}

/// Display width of `text` up to its first newline.
pub fn first_line_width(text: &str) -> usize {
    let line = text.split('\n').next().unwrap_or("");
    line.trim_end_matches('\r').width()
}

/// Writer that maintains indentation and anchor stacks and wraps long lines.
#[derive(Debug, Clone)]
pub struct AutoIndentWriter<W> {
    out: W,
    indents: Vec<String>,
    anchors: Vec<usize>,
    newline: String,
    line_width: usize,
    at_start_of_line: bool,
    column: usize,
    index: usize,
}

impl<W: Write> AutoIndentWriter<W> {
    /// Creates a writer over `out` using `\n` newlines and no wrapping.
    pub fn new(out: W) -> Self {
        Self {
            out,
            indents: Vec::new(),
            anchors: Vec::new(),
            newline: DEFAULT_NEWLINE.to_string(),
            line_width: NO_WRAP,
            at_start_of_line: true,
            column: 0,
            index: 0,
        }
    }

    /// Sets the newline sequence emitted for every `\n`.
    pub fn with_newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    /// Sets the wrap width.
    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    /// Returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Borrows the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Current indentation depth.
    pub fn indent_depth(&self) -> usize {
        self.indents.len()
    }

    fn newline(&mut self) -> Result<usize, fmt::Error> {
        self.out.write_str(&self.newline)?;
        let n = self.newline.chars().count();
        self.index += n;
        self.column = 0;
        Ok(n)
    }

    /// Writes the indentation stack, then pads to the innermost anchor if it
    /// lies beyond the indentation.
    fn indent(&mut self, with_indents: bool) -> Result<usize, fmt::Error> {
        let mut n = 0;
        let mut width = 0;
        if with_indents {
            for indent in &self.indents {
                self.out.write_str(indent)?;
                n += indent.chars().count();
                width += indent.width();
            }
        }
        if let Some(&anchor) = self.anchors.last() {
            if anchor > width {
                let pad = anchor - width;
                for _ in 0..pad {
                    self.out.write_char(' ')?;
                }
                n += pad;
                width += pad;
            }
        }
        self.column += width;
        self.index += n;
        Ok(n)
    }

    fn write_impl(&mut self, text: &str, with_indents: bool) -> Result<usize, fmt::Error> {
        let mut n = 0;
        for c in text.chars() {
            match c {
                '\r' => continue,
                '\n' => {
                    n += self.newline()?;
                    self.at_start_of_line = true;
                }
                _ => {
                    if self.at_start_of_line {
                        n += self.indent(with_indents)?;
                        self.at_start_of_line = false;
                    }
                    self.out.write_char(c)?;
                    n += 1;
                    self.index += 1;
                    self.column += c.width().unwrap_or(0);
                }
            }
        }
        Ok(n)
    }

    fn wrap_impl(
        &mut self,
        wrap: &str,
        next_width: usize,
        with_indents: bool,
    ) -> Result<usize, fmt::Error> {
        if self.line_width == NO_WRAP
            || self.at_start_of_line
            || self.column + next_width <= self.line_width
        {
            return Ok(0);
        }
        let mut n = 0;
        for c in wrap.chars() {
            match c {
                '\r' => continue,
                '\n' => {
                    n += self.newline()?;
                    n += self.indent(with_indents)?;
                }
                _ => {
                    self.out.write_char(c)?;
                    n += 1;
                    self.index += 1;
                    self.column += c.width().unwrap_or(0);
                }
            }
        }
        Ok(n)
    }
}

impl<W: Write> TemplateWriter for AutoIndentWriter<W> {
    fn push_indentation(&mut self, indent: &str) {
        self.indents.push(indent.to_string());
    }

    fn pop_indentation(&mut self) -> Option<String> {
        self.indents.pop()
    }

    fn push_anchor_point(&mut self) {
        self.anchors.push(self.column);
    }

    fn pop_anchor_point(&mut self) {
        self.anchors.pop();
    }

    fn set_line_width(&mut self, width: usize) {
        self.line_width = width;
    }

    fn write(&mut self, text: &str) -> Result<usize, fmt::Error> {
        self.write_impl(text, true)
    }

    fn write_wrap(&mut self, wrap: &str, next_width: usize) -> Result<usize, fmt::Error> {
        self.wrap_impl(wrap, next_width, true)
    }

    fn index(&self) -> usize {
        self.index
    }

    fn column(&self) -> usize {
        self.column
    }

    fn at_start_of_line(&self) -> bool {
        self.at_start_of_line
    }
}

/// Writer that ignores indentation but still honors anchors and wrapping.
///
/// Useful for output where leading whitespace is significant and must come
/// only from the template text itself.
#[derive(Debug, Clone)]
pub struct NoIndentWriter<W> {
    inner: AutoIndentWriter<W>,
}

impl<W: Write> NoIndentWriter<W> {
    /// Creates a writer over `out`.
    pub fn new(out: W) -> Self {
        Self {
            inner: AutoIndentWriter::new(out),
        }
    }

    /// Sets the newline sequence emitted for every `\n`.
    pub fn with_newline(mut self, newline: impl Into<String>) -> Self {
        self.inner = self.inner.with_newline(newline);
        self
    }

    /// Sets the wrap width.
    pub fn with_line_width(mut self, width: usize) -> Self {
        self.inner = self.inner.with_line_width(width);
        self
    }

    /// Returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W: Write> TemplateWriter for NoIndentWriter<W> {
    fn push_indentation(&mut self, _indent: &str) {}

    fn pop_indentation(&mut self) -> Option<String> {
        None
    }

    fn push_anchor_point(&mut self) {
        self.inner.push_anchor_point();
    }

    fn pop_anchor_point(&mut self) {
        self.inner.pop_anchor_point();
    }

    fn set_line_width(&mut self, width: usize) {
        self.inner.set_line_width(width);
    }

    fn write(&mut self, text: &str) -> Result<usize, fmt::Error> {
        self.inner.write_impl(text, false)
    }

    fn write_wrap(&mut self, wrap: &str, next_width: usize) -> Result<usize, fmt::Error> {
        self.inner.wrap_impl(wrap, next_width, false)
    }

    fn index(&self) -> usize {
        self.inner.index
    }

    fn column(&self) -> usize {
        self.inner.column
    }

    fn at_start_of_line(&self) -> bool {
        self.inner.at_start_of_line
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn word() -> impl Strategy<Value = String> {
        "[a-z]{1,8}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn unindented_text_passes_through(text in "[a-z \n]{0,64}") {
            let mut out = AutoIndentWriter::new(String::new());
            out.write(&text).unwrap();
            prop_assert_eq!(out.into_inner(), text);
        }

        #[test]
        fn every_nonempty_line_is_indented(lines in prop::collection::vec(word(), 1..10)) {
            let mut out = AutoIndentWriter::new(String::new());
            out.push_indentation("> ");
            out.write(&lines.join("\n")).unwrap();
            let rendered = out.into_inner();
            for line in rendered.lines() {
                prop_assert!(line.starts_with("> "));
            }
        }

        #[test]
        fn wrapping_never_splits_tokens(
            words in prop::collection::vec(word(), 1..30),
            width in 8usize..40,
        ) {
            let mut out = AutoIndentWriter::new(String::new()).with_line_width(width);
            for (i, w) in words.iter().enumerate() {
                if i > 0 {
                    out.write_separator(" ").unwrap();
                }
                out.write_token(w, Some("\n")).unwrap();
            }
            let rendered = out.into_inner();
            let rejoined: Vec<&str> = rendered.split_whitespace().collect();
            prop_assert_eq!(rejoined, words.iter().map(String::as_str).collect::<Vec<_>>());
        }

        #[test]
        fn wrapped_lines_respect_width(
            words in prop::collection::vec(word(), 1..30),
            width in 8usize..40,
        ) {
            let mut out = AutoIndentWriter::new(String::new()).with_line_width(width);
            for w in &words {
                out.write_token(w, Some("\n")).unwrap();
            }
            for line in out.into_inner().lines() {
                prop_assert!(line.len() <= width);
            }
        }
    }
}
