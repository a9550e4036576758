//! Common imports for defining and rendering templates.
//!
//! ```rust
//! use strata::prelude::*;
//!
//! let mut engine = Engine::new();
//! let group = engine.define_group("g");
//! engine.define_template(group, TemplateDef::new("hi", vec![text("hi "), Expr::attr("who").into()]));
//! let hi = engine.instance_of(group, "hi").unwrap();
//! engine.set(hi, "who", "there").unwrap();
//! assert_eq!(engine.render(hi).unwrap(), "hi there");
//! ```

pub use crate::chunk::{
    embedded_region, region, super_region, text, Chunk, Conditional, Expr, MapLiteral,
    TemplateCall,
};
pub use crate::{
    Engine, ErrorBuffer, FormalArg, GroupId, InstanceId, Mapping, RenderConfig, RenderError,
    TemplateDef, Value,
};
