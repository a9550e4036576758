//! # Strata - Grouped Text Templates
//!
//! `strata` renders text from templates organized into groups. Templates are
//! pure views: they hold literal text and expressions, and all data is pushed
//! in as attributes before rendering. A parser front end hands the engine
//! pre-tokenized [`chunk`]s; the engine resolves names, applies templates to
//! lists and writes the result with automatic indentation and line wrapping.
//!
//! ## Core Concepts
//!
//! - [`Engine`]: owns groups and template instances, renders instances
//! - [`Group`]: named template collection with an optional super-group,
//!   regions, dictionaries, renderers and interfaces
//! - [`TemplateDef`]: a template blueprint (formal arguments plus body)
//! - [`Value`]: attribute values (absent, scalar, list, map, template, iterator)
//! - [`AttributeRenderer`]: type-keyed formatting, e.g. `format="upper"`
//! - [`RenderConfig`]: line width, newline, lint mode, depth bound
//!
//! ## Quick Start
//!
//! ```rust
//! use strata::chunk::{text, Expr, TemplateCall};
//! use strata::{Engine, TemplateDef, Value};
//!
//! let mut engine = Engine::new();
//! let group = engine.define_group("html");
//!
//! // bold(x) ::= "<b><x></b>"
//! engine.define_template(
//!     group,
//!     TemplateDef::with_args("bold", ["x"], vec![text("<b>"), Expr::attr("x").into(), text("</b>")]),
//! );
//! // names(xs) ::= "<xs:bold(); separator=\", \">"
//! engine.define_template(
//!     group,
//!     TemplateDef::with_args(
//!         "names",
//!         ["xs"],
//!         vec![Expr::attr("xs").apply(TemplateCall::named("bold")).separator(", ").into()],
//!     ),
//! );
//!
//! let names = engine.instance_of(group, "names").unwrap();
//! engine.set(names, "xs", Value::list(["Ter", "Tom"])).unwrap();
//! assert_eq!(engine.render(names).unwrap(), "<b>Ter</b>, <b>Tom</b>");
//! ```
//!
//! ## Inheritance
//!
//! A group may name a super-group. Lookups start at the group an instance was
//! created from and walk upward, so a subgroup that redefines `bold` changes
//! the output of templates defined only in the super-group. Regions (`@r()`)
//! are named holes a subgroup can fill, and `@super.r()` reaches the body the
//! super-group gave the same region.
//!
//! ## Errors
//!
//! Render-time problems come back as [`RenderError`]. Problems found while
//! defining templates never abort the load; they are reported to the
//! engine's [`ErrorListener`] ([`TracingListener`] by default, or an
//! [`ErrorBuffer`] to collect them).

pub mod chunk;
mod config;
mod engine;
mod error;
mod group;
mod interpreter;
mod listener;
pub mod prelude;
mod renderer;
mod template;
mod value;

pub use config::{RenderConfig, DEFAULT_MAX_DEPTH};
pub use engine::{Engine, GroupId, InstanceId};
pub use error::{ConfigError, DefinitionError, RenderError, Result, Warning};
pub use group::{DelimiterStyle, Group, Interface, TemplateSignature};
pub use listener::{ErrorBuffer, ErrorListener, TracingListener};
pub use renderer::{AttributeRenderer, NumberRenderer, RendererRegistry, StringRenderer};
pub use template::{region_name, FormalArg, RegionKind, TemplateDef};
pub use value::{MapDefault, Mapping, Model, Scalar, Value, ValueIter};

// Writer types, so callers can render into their own sinks.
pub use strata_writer::{AutoIndentWriter, NoIndentWriter, TemplateWriter};
