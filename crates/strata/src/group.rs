//! Template groups and interfaces.
//!
//! A group is a named collection of templates plus everything resolved at the
//! group level: its super-group link, renderers, dictionaries, region bodies
//! and the interfaces it promises to implement. Groups are created and linked
//! through the [`Engine`](crate::Engine), which owns them.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::chunk::MapLiteral;
use crate::engine::GroupId;
use crate::renderer::RendererRegistry;
use crate::template::TemplateDef;

/// Delimiter pair the group's templates were written with. The engine does
/// not interpret it; front ends use it to pick a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelimiterStyle {
    /// `<expr>`
    #[default]
    Angle,
    /// `$expr$`
    Dollar,
}

/// One template an interface requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSignature {
    pub name: String,
    pub args: Vec<String>,
    pub optional: bool,
}

impl TemplateSignature {
    pub fn new<A: Into<String>>(name: impl Into<String>, args: impl IntoIterator<Item = A>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
            optional: false,
        }
    }

    /// Marks the template as optional: it may be absent, but if present its
    /// arguments must still match.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A named set of template signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub templates: Vec<TemplateSignature>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            templates: Vec::new(),
        }
    }

    pub fn template(mut self, signature: TemplateSignature) -> Self {
        self.templates.push(signature);
        self
    }
}

#[derive(Debug)]
pub struct Group {
    pub(crate) name: String,
    pub(crate) delimiters: DelimiterStyle,
    pub(crate) templates: IndexMap<String, Rc<TemplateDef>>,
    pub(crate) super_group: Option<GroupId>,
    pub(crate) interfaces: Vec<Interface>,
    pub(crate) renderers: RendererRegistry,
    pub(crate) dictionaries: IndexMap<String, MapLiteral>,
}

impl Group {
    pub(crate) fn new(name: String, delimiters: DelimiterStyle) -> Self {
        Self {
            name,
            delimiters,
            templates: IndexMap::new(),
            super_group: None,
            interfaces: Vec::new(),
            renderers: RendererRegistry::new(),
            dictionaries: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn delimiters(&self) -> DelimiterStyle {
        self.delimiters
    }

    pub fn super_group(&self) -> Option<GroupId> {
        self.super_group
    }

    /// Templates defined directly in this group, regions included.
    pub fn template(&self, name: &str) -> Option<&Rc<TemplateDef>> {
        self.templates.get(name)
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn dictionary(&self, name: &str) -> Option<&MapLiteral> {
        self.dictionaries.get(name)
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }
}
