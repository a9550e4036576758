//! Error types for template definition and rendering.
//!
//! Two families exist. [`RenderError`] is returned from lookups and render
//! calls and aborts the operation that produced it. [`DefinitionError`] is
//! never returned: definition calls report it through the engine's
//! [`ErrorListener`](crate::ErrorListener) and keep loading, so that a single
//! load can surface every problem at once.

use std::fmt;

use thiserror::Error;

/// Errors raised while instantiating or rendering templates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// An expression read a name that no scope declares.
    #[error("no such attribute: {name} (referenced in {template})")]
    NoSuchAttribute { name: String, template: String },

    /// Template lookup exhausted the group chain.
    #[error("no such template: {name}")]
    NoSuchTemplate { name: String },

    /// `super.` used from a group without a super-group.
    #[error("super.{name} referenced from group {group}, which has no super-group")]
    NoSuperGroup { group: String, name: String },

    /// Attribute names cannot contain a `.`.
    #[error("invalid attribute name: {0}")]
    InvalidAttributeName(String),

    /// A call site or application supplied the wrong number of arguments.
    #[error("{template} expects {expected} argument(s) but was given {found}")]
    FormalArgMismatch {
        template: String,
        expected: usize,
        found: usize,
    },

    /// Property access on a value that does not have that property.
    #[error("no such property: {property} on {type_name}")]
    NoSuchProperty { property: String, type_name: String },

    /// An instance was reached from itself, or the render depth bound was hit.
    #[error("infinite recursion{}", format_trace(.trace))]
    InfiniteRecursion { trace: Vec<String> },

    /// A renderer was asked for a format it does not know.
    #[error("unsupported format name '{format}' for {type_name}")]
    UnsupportedFormatName { format: String, type_name: String },

    /// An aggregate spec like `items.{first,last}` was malformed or did not
    /// match the number of values.
    #[error("malformed aggregate: {0}")]
    MalformedAggregate(String),

    /// The instance id does not refer to a live instance of this engine.
    #[error("invalid template instance #{0}")]
    InvalidInstance(usize),

    /// The group id does not refer to a group of this engine.
    #[error("invalid group #{0}")]
    InvalidGroup(usize),

    /// The output sink refused a write.
    #[error("write failed: {0}")]
    Write(#[from] fmt::Error),
}

fn format_trace(trace: &[String]) -> String {
    if trace.is_empty() {
        String::new()
    } else {
        format!(" through {}", trace.join(" -> "))
    }
}

/// Problems detected while defining templates, regions and interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// A non-region template was defined twice in one group.
    #[error("template {template} redefined in group {group}")]
    TemplateRedefinition { group: String, template: String },

    /// A region was given a second body at the same group level.
    #[error("region @{template}.{region} redefined in group {group}")]
    RegionRedefinition {
        group: String,
        template: String,
        region: String,
    },

    /// A region definition names a template or region that does not exist.
    #[error("template {template} has no region named {region}")]
    UnknownRegion { template: String, region: String },

    /// An interface requires a template the group does not define.
    #[error("group {group} does not satisfy interface {interface}: missing template {template}")]
    MissingTemplate {
        group: String,
        interface: String,
        template: String,
    },

    /// An interface template exists with a different argument list.
    #[error(
        "group {group} does not satisfy interface {interface}: {template} has arguments ({}) but the interface requires ({})",
        .found.join(", "),
        .expected.join(", ")
    )]
    MismatchedArguments {
        group: String,
        interface: String,
        template: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Linking the super-group would make the group chain cyclic.
    #[error("making {super_group} the super-group of {group} would create a cycle")]
    SuperGroupCycle { group: String, super_group: String },

    /// A definition named a group id this engine never handed out.
    #[error("unknown group #{0}")]
    UnknownGroup(usize),
}

/// Failure to load a [`RenderConfig`](crate::RenderConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Diagnostics emitted only in lint mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An attribute was set on an instance but never read during its render.
    UnusedAttribute { template: String, attribute: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnusedAttribute {
                template,
                attribute,
            } => write!(f, "attribute {} set on {} was never used", attribute, template),
        }
    }
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;
