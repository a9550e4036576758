//! Type-keyed attribute renderers.
//!
//! A renderer turns a scalar into text, optionally under a named format
//! (`format="upper"`). Renderers are registered per Rust type, on a group or
//! on a single instance, and looked up by the scalar's [`TypeId`].

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{RenderError, Result};
use crate::value::Scalar;

/// Formats scalars of one type.
pub trait AttributeRenderer {
    /// Renders `value`. An unknown `format` must be reported as
    /// [`RenderError::UnsupportedFormatName`].
    fn format(&self, value: &Scalar, format: Option<&str>) -> Result<String>;
}

impl<F> AttributeRenderer for F
where
    F: Fn(&Scalar, Option<&str>) -> Result<String>,
{
    fn format(&self, value: &Scalar, format: Option<&str>) -> Result<String> {
        self(value, format)
    }
}

/// Renderers keyed by value type.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: HashMap<TypeId, Rc<dyn AttributeRenderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with [`StringRenderer`] and [`NumberRenderer`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<String>(StringRenderer);
        registry.register::<i64>(NumberRenderer);
        registry.register::<f64>(NumberRenderer);
        registry
    }

    /// Registers `renderer` for values of type `T`, replacing any previous one.
    ///
    /// Strings, integers and floats are keyed as `String`, `i64` and `f64`.
    pub fn register<T: 'static>(&mut self, renderer: impl AttributeRenderer + 'static) {
        self.renderers.insert(TypeId::of::<T>(), Rc::new(renderer));
    }

    pub fn get(&self, type_id: TypeId) -> Option<Rc<dyn AttributeRenderer>> {
        self.renderers.get(&type_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("len", &self.renderers.len())
            .finish()
    }
}

fn unsupported(format: &str, value: &Scalar) -> RenderError {
    RenderError::UnsupportedFormatName {
        format: format.to_string(),
        type_name: value.type_name().to_string(),
    }
}

/// String formats: `upper`, `lower`, `cap`, `url-encode`, `xml-encode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringRenderer;

impl AttributeRenderer for StringRenderer {
    fn format(&self, value: &Scalar, format: Option<&str>) -> Result<String> {
        let s = value.to_string();
        let Some(format) = format else {
            return Ok(s);
        };
        match format {
            "upper" => Ok(s.to_uppercase()),
            "lower" => Ok(s.to_lowercase()),
            "cap" => Ok(capitalize(&s)),
            "url-encode" => Ok(url_encode(&s)),
            "xml-encode" => Ok(xml_encode(&s)),
            other => Err(unsupported(other, value)),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Form encoding: unreserved characters pass, space becomes `+`.
fn url_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

fn xml_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// printf-style number formats such as `%d`, `%05d`, `%x` or `%.2f`.
///
/// Text around the directive is kept, so `"$%.2f"` renders `$3.50`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberRenderer;

impl AttributeRenderer for NumberRenderer {
    fn format(&self, value: &Scalar, format: Option<&str>) -> Result<String> {
        let Some(format) = format else {
            return Ok(value.to_string());
        };
        let directive = Directive::parse(format).ok_or_else(|| unsupported(format, value))?;
        let body = directive
            .apply(value)
            .ok_or_else(|| unsupported(format, value))?;
        Ok(format!("{}{}{}", directive.prefix, body, directive.suffix))
    }
}

#[derive(Debug, PartialEq)]
struct Directive<'a> {
    prefix: &'a str,
    suffix: &'a str,
    zero: bool,
    left: bool,
    plus: bool,
    width: usize,
    precision: Option<usize>,
    conversion: char,
}

impl<'a> Directive<'a> {
    fn parse(format: &'a str) -> Option<Self> {
        let start = format.find('%')?;
        let rest = &format[start + 1..];
        let mut directive = Directive {
            prefix: &format[..start],
            suffix: "",
            zero: false,
            left: false,
            plus: false,
            width: 0,
            precision: None,
            conversion: 'd',
        };
        let mut chars = rest.char_indices().peekable();
        while let Some(&(_, c)) = chars.peek() {
            match c {
                '0' => directive.zero = true,
                '-' => directive.left = true,
                '+' => directive.plus = true,
                _ => break,
            }
            chars.next();
        }
        while let Some(&(_, c)) = chars.peek() {
            let Some(digit) = c.to_digit(10) else { break };
            directive.width = directive.width * 10 + digit as usize;
            chars.next();
        }
        if let Some(&(_, '.')) = chars.peek() {
            chars.next();
            let mut precision = 0;
            while let Some(&(_, c)) = chars.peek() {
                let Some(digit) = c.to_digit(10) else { break };
                precision = precision * 10 + digit as usize;
                chars.next();
            }
            directive.precision = Some(precision);
        }
        let (at, conversion) = chars.next()?;
        if !matches!(conversion, 'd' | 'x' | 'X' | 'o' | 'f' | 's') {
            return None;
        }
        directive.conversion = conversion;
        directive.suffix = &rest[at + conversion.len_utf8()..];
        Some(directive)
    }

    fn apply(&self, value: &Scalar) -> Option<String> {
        let body = match (self.conversion, value) {
            ('d', Scalar::Int(i)) => i.to_string(),
            ('d', Scalar::Float(f)) => (f.trunc() as i64).to_string(),
            ('x', Scalar::Int(i)) => format!("{:x}", i),
            ('X', Scalar::Int(i)) => format!("{:X}", i),
            ('o', Scalar::Int(i)) => format!("{:o}", i),
            ('f', Scalar::Int(i)) => format!("{:.*}", self.precision.unwrap_or(6), *i as f64),
            ('f', Scalar::Float(f)) => format!("{:.*}", self.precision.unwrap_or(6), f),
            ('s', other) => other.to_string(),
            _ => return None,
        };
        Some(self.pad(body))
    }

    fn pad(&self, body: String) -> String {
        let (sign, digits) = match body.strip_prefix('-') {
            Some(digits) => ("-", digits.to_string()),
            None if self.plus && self.conversion != 's' => ("+", body),
            None => ("", body),
        };
        let len = sign.len() + digits.chars().count();
        if len >= self.width {
            return format!("{}{}", sign, digits);
        }
        let fill = self.width - len;
        if self.left {
            format!("{}{}{}", sign, digits, " ".repeat(fill))
        } else if self.zero && self.conversion != 's' {
            format!("{}{}{}", sign, "0".repeat(fill), digits)
        } else {
            format!("{}{}{}", " ".repeat(fill), sign, digits)
        }
    }
}
