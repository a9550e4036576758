//! The engine: group registry, instance arena and render entry points.
//!
//! Groups and template instances are owned by the [`Engine`] and addressed by
//! copyable ids. Instances created by the caller live until the engine is
//! dropped; instances created while rendering (includes, applications,
//! inline templates) are released when the top-level render call returns.

use std::rc::Rc;

use indexmap::IndexMap;
use strata_writer::TemplateWriter;

use crate::chunk::{Chunk, MapLiteral};
use crate::config::RenderConfig;
use crate::error::{DefinitionError, RenderError, Result};
use crate::group::{DelimiterStyle, Group, Interface};
use crate::interpreter::Interpreter;
use crate::listener::{ErrorListener, TracingListener};
use crate::renderer::{AttributeRenderer, RendererRegistry};
use crate::template::{collect_regions, region_name, RegionKind, TemplateDef};
use crate::value::{Mapping, Value};

/// Handle to a group owned by an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) usize);

/// Handle to a template instance owned by an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) usize);

/// Iteration variable bound by an application.
#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Bound(Value),
    /// The driving sequence of a parallel application ran out.
    Unbound,
}

#[derive(Debug)]
pub(crate) struct InstanceData {
    pub(crate) def: Rc<TemplateDef>,
    pub(crate) attributes: IndexMap<String, Value>,
    pub(crate) enclosing: Option<InstanceId>,
    /// Group the instance was created from; lookups start here.
    pub(crate) group: GroupId,
    /// Group owning the definition; dictionaries and `super.` resolve from here.
    pub(crate) native_group: GroupId,
    pub(crate) renderers: Option<RendererRegistry>,
    pub(crate) iteration: Vec<(String, Binding)>,
}

impl InstanceData {
    pub(crate) fn new(def: Rc<TemplateDef>, group: GroupId, native_group: GroupId) -> Self {
        Self {
            def,
            attributes: IndexMap::new(),
            enclosing: None,
            group,
            native_group,
            renderers: None,
            iteration: Vec::new(),
        }
    }
}

/// Owns groups and instances and renders them.
///
/// ```
/// use strata::chunk::{text, Expr};
/// use strata::{Engine, TemplateDef};
///
/// let mut engine = Engine::new();
/// let group = engine.define_group("demo");
/// engine.define_template(
///     group,
///     TemplateDef::new("greet", vec![text("Hello, "), Expr::attr("name").into(), text("!")]),
/// );
/// let hello = engine.instance_of(group, "greet").unwrap();
/// engine.set(hello, "name", "World").unwrap();
/// assert_eq!(engine.render(hello).unwrap(), "Hello, World!");
/// ```
pub struct Engine {
    pub(crate) groups: Vec<Group>,
    pub(crate) instances: Vec<InstanceData>,
    pub(crate) config: RenderConfig,
    pub(crate) builtins: RendererRegistry,
    listener: Box<dyn ErrorListener>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(RenderConfig::default())
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self {
            groups: Vec::new(),
            instances: Vec::new(),
            config,
            builtins: RendererRegistry::with_builtins(),
            listener: Box::new(TracingListener),
        }
    }

    /// Replaces the listener that receives definition errors and warnings.
    pub fn with_listener(mut self, listener: impl ErrorListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RenderConfig {
        &mut self.config
    }

    // Groups

    pub fn define_group(&mut self, name: impl Into<String>) -> GroupId {
        self.define_group_with(name, DelimiterStyle::default())
    }

    pub fn define_group_with(&mut self, name: impl Into<String>, delimiters: DelimiterStyle) -> GroupId {
        let name = name.into();
        tracing::debug!(group = %name, "define group");
        self.groups.push(Group::new(name, delimiters));
        GroupId(self.groups.len() - 1)
    }

    /// The group behind `id`, or `None` for an id this engine did not issue.
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id.0)
    }

    /// Reports an id this engine did not issue. Definition methods return
    /// early on `false`.
    fn known_group(&self, id: GroupId) -> bool {
        let known = id.0 < self.groups.len();
        if !known {
            self.report(DefinitionError::UnknownGroup(id.0));
        }
        known
    }

    pub fn find_group(&self, name: &str) -> Option<GroupId> {
        self.groups.iter().position(|g| g.name == name).map(GroupId)
    }

    /// Links `super_group` as the parent of `group`. A link that would make
    /// the chain cyclic is reported and ignored.
    pub fn set_super_group(&mut self, group: GroupId, super_group: GroupId) {
        if !self.known_group(group) || !self.known_group(super_group) {
            return;
        }
        let mut cursor = Some(super_group);
        while let Some(g) = cursor {
            if g == group {
                self.report(DefinitionError::SuperGroupCycle {
                    group: self.groups[group.0].name.clone(),
                    super_group: self.groups[super_group.0].name.clone(),
                });
                return;
            }
            cursor = self.groups[g.0].super_group;
        }
        self.groups[group.0].super_group = Some(super_group);
    }

    /// `group`, then its super-group, and so on.
    pub(crate) fn chain(groups: &[Group], start: GroupId) -> impl Iterator<Item = GroupId> + '_ {
        let start = Some(start).filter(|g| g.0 < groups.len());
        std::iter::successors(start, move |g| groups.get(g.0).and_then(|g| g.super_group))
    }

    /// Finds `name` starting at `start`, returning the definition and the
    /// group it was found in.
    pub(crate) fn find_template(
        groups: &[Group],
        start: GroupId,
        name: &str,
    ) -> Option<(Rc<TemplateDef>, GroupId)> {
        Self::chain(groups, start)
            .find_map(|g| groups.get(g.0)?.templates.get(name).map(|def| (def.clone(), g)))
    }

    /// Adds a template to `group`.
    ///
    /// Regions the body declares are registered alongside it: an embedded
    /// `@r ... @end` body as the region's default, a bare `@r()` as an empty
    /// placeholder unless the group already has a body for it.
    pub fn define_template(&mut self, group: GroupId, mut def: TemplateDef) {
        if !self.known_group(group) {
            return;
        }
        let name = def.name().to_string();
        if self.groups[group.0].templates.contains_key(&name) {
            self.report(DefinitionError::TemplateRedefinition {
                group: self.groups[group.0].name.clone(),
                template: name,
            });
            return;
        }
        tracing::debug!(group = %self.groups[group.0].name, template = %name, "define template");

        for (region, body) in collect_regions(def.chunks()) {
            let key = region_name(&name, &region);
            let existing = self.groups[group.0].templates.get(&key).and_then(|d| d.region_kind());
            let kind = match (&body, existing) {
                (Some(_), Some(RegionKind::Embedded | RegionKind::Explicit)) => {
                    self.report(DefinitionError::RegionRedefinition {
                        group: self.groups[group.0].name.clone(),
                        template: name.clone(),
                        region,
                    });
                    continue;
                }
                (Some(_), _) => RegionKind::Embedded,
                (None, Some(_)) => continue,
                (None, None) => RegionKind::Implicit,
            };
            let mut region_def =
                TemplateDef::region(&name, &region, body.unwrap_or_default(), kind);
            region_def.set_owning_group(group);
            tracing::trace!(region = %key, ?kind, "register region");
            self.groups[group.0].templates.insert(key, Rc::new(region_def));
        }

        def.set_owning_group(group);
        self.groups[group.0].templates.insert(name, Rc::new(def));
    }

    /// Gives region `region` of `template` a body in `group`.
    ///
    /// The template must be visible from `group` and declare the region. A
    /// subgroup may override a region its super-group defined; defining the
    /// same region twice in one group is an error.
    pub fn define_region(
        &mut self,
        group: GroupId,
        template: &str,
        region: &str,
        chunks: Vec<Chunk>,
    ) {
        if !self.known_group(group) {
            return;
        }
        let declared = Self::find_template(&self.groups, group, template)
            .is_some_and(|(def, _)| def.regions().iter().any(|r| r == region));
        if !declared {
            self.report(DefinitionError::UnknownRegion {
                template: template.to_string(),
                region: region.to_string(),
            });
            return;
        }
        let key = region_name(template, region);
        let existing = self.groups[group.0].templates.get(&key).and_then(|d| d.region_kind());
        if matches!(existing, Some(RegionKind::Embedded | RegionKind::Explicit)) {
            self.report(DefinitionError::RegionRedefinition {
                group: self.groups[group.0].name.clone(),
                template: template.to_string(),
                region: region.to_string(),
            });
            return;
        }
        tracing::debug!(group = %self.groups[group.0].name, region = %key, "define region");
        let mut def = TemplateDef::region(template, region, chunks, RegionKind::Explicit);
        def.set_owning_group(group);
        self.groups[group.0].templates.insert(key, Rc::new(def));
    }

    /// Registers a group-level map visible to every template of the group
    /// and its subgroups.
    pub fn define_dictionary(&mut self, group: GroupId, name: impl Into<String>, map: MapLiteral) {
        if self.known_group(group) {
            self.groups[group.0].dictionaries.insert(name.into(), map);
        }
    }

    pub fn register_interface(&mut self, group: GroupId, interface: Interface) {
        if self.known_group(group) {
            self.groups[group.0].interfaces.push(interface);
        }
    }

    /// Checks every interface registered on `group`, reporting each missing
    /// template or argument mismatch. Returns whether all were satisfied.
    pub fn check_satisfies_interfaces(&self, group: GroupId) -> bool {
        if !self.known_group(group) {
            return false;
        }
        let mut satisfied = true;
        let group_name = &self.groups[group.0].name;
        for interface in &self.groups[group.0].interfaces {
            for sig in &interface.templates {
                match Self::find_template(&self.groups, group, &sig.name) {
                    None if sig.optional => {}
                    None => {
                        satisfied = false;
                        self.report(DefinitionError::MissingTemplate {
                            group: group_name.clone(),
                            interface: interface.name.clone(),
                            template: sig.name.clone(),
                        });
                    }
                    Some((def, _)) => {
                        let found = def.arg_names();
                        if found != sig.args {
                            satisfied = false;
                            self.report(DefinitionError::MismatchedArguments {
                                group: group_name.clone(),
                                interface: interface.name.clone(),
                                template: sig.name.clone(),
                                expected: sig.args.clone(),
                                found,
                            });
                        }
                    }
                }
            }
        }
        satisfied
    }

    /// Registers a renderer for values of type `T` on `group`.
    pub fn register_renderer<T: 'static>(
        &mut self,
        group: GroupId,
        renderer: impl AttributeRenderer + 'static,
    ) {
        if self.known_group(group) {
            self.groups[group.0].renderers.register::<T>(renderer);
        }
    }

    fn report(&self, error: DefinitionError) {
        self.listener.definition_error(&error);
    }

    // Instances

    /// Creates an instance of `name` as seen from `group`.
    pub fn instance_of(&mut self, group: GroupId, name: &str) -> Result<InstanceId> {
        let start = self.group(group).ok_or(RenderError::InvalidGroup(group.0))?;
        let Some((def, found_in)) = Self::find_template(&self.groups, group, name) else {
            tracing::debug!(group = %start.name, template = %name, "template lookup missed");
            return Err(RenderError::NoSuchTemplate {
                name: name.to_string(),
            });
        };
        let native = def.owning_group().unwrap_or(found_in);
        self.instances.push(InstanceData::new(def, group, native));
        Ok(InstanceId(self.instances.len() - 1))
    }

    fn data(&self, id: InstanceId) -> Result<&InstanceData> {
        self.instances.get(id.0).ok_or(RenderError::InvalidInstance(id.0))
    }

    fn data_mut(&mut self, id: InstanceId) -> Result<&mut InstanceData> {
        self.instances
            .get_mut(id.0)
            .ok_or(RenderError::InvalidInstance(id.0))
    }

    /// Adds `value` to attribute `name`.
    ///
    /// The first set stores the value. Each further set turns the attribute
    /// into a multi-value and appends; a multi-value or iterator being added
    /// contributes its elements.
    pub fn set(&mut self, id: InstanceId, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if name.contains('.') {
            return Err(RenderError::InvalidAttributeName(name.to_string()));
        }
        if let Value::Template(child) = &value {
            let child = *child;
            self.data(child)?;
            if child != id {
                self.instances[child.0].enclosing = Some(id);
            }
        }
        let data = self.data_mut(id)?;
        if !data.def.accepts(name) {
            return Err(RenderError::NoSuchAttribute {
                name: name.to_string(),
                template: data.def.name().to_string(),
            });
        }
        match data.attributes.get_mut(name) {
            None => {
                data.attributes.insert(name.to_string(), value);
            }
            Some(current) => {
                let mut items = match std::mem::take(current) {
                    Value::Multi(items) => items,
                    Value::Iterator(iter) => iter.drain(),
                    other => vec![other],
                };
                match value {
                    Value::Multi(more) => items.extend(more),
                    Value::Iterator(iter) => items.extend(iter.drain()),
                    other => items.push(other),
                }
                *current = Value::Multi(items);
            }
        }
        Ok(())
    }

    /// Adds one mapping built from an aggregate spec such as
    /// `"items.{first,last}"` and one value per listed property.
    pub fn set_aggregate(&mut self, id: InstanceId, spec: &str, values: Vec<Value>) -> Result<()> {
        let malformed = || RenderError::MalformedAggregate(spec.to_string());
        let (name, props) = spec.split_once(".{").ok_or_else(malformed)?;
        let props = props.strip_suffix('}').ok_or_else(malformed)?;
        let props: Vec<&str> = props.split(',').map(str::trim).collect();
        if name.is_empty()
            || props.iter().any(|p| p.is_empty() || p.contains(['.', '{', '}']))
            || props.len() != values.len()
        {
            return Err(malformed());
        }
        let mut mapping = Mapping::new();
        for (prop, value) in props.into_iter().zip(values) {
            mapping.insert(prop, value);
        }
        self.set(id, name.trim(), Value::Mapping(mapping))
    }

    /// Removes an attribute, returning its value.
    pub fn remove(&mut self, id: InstanceId, name: &str) -> Result<Option<Value>> {
        Ok(self.data_mut(id)?.attributes.shift_remove(name))
    }

    pub fn attribute(&self, id: InstanceId, name: &str) -> Result<Option<&Value>> {
        Ok(self.data(id)?.attributes.get(name))
    }

    pub fn template_name(&self, id: InstanceId) -> Result<&str> {
        Ok(self.data(id)?.def.name())
    }

    /// The instance this one was assigned into, if any.
    pub fn enclosing_instance(&self, id: InstanceId) -> Result<Option<InstanceId>> {
        Ok(self.data(id)?.enclosing)
    }

    /// The group template lookups from this instance start at.
    pub fn instantiating_group(&self, id: InstanceId) -> Result<GroupId> {
        Ok(self.data(id)?.group)
    }

    /// Registers a renderer that applies to this instance and everything
    /// rendered inside it.
    pub fn register_instance_renderer<T: 'static>(
        &mut self,
        id: InstanceId,
        renderer: impl AttributeRenderer + 'static,
    ) -> Result<()> {
        self.data_mut(id)?
            .renderers
            .get_or_insert_with(RendererRegistry::new)
            .register::<T>(renderer);
        Ok(())
    }

    // Rendering

    pub fn render(&mut self, id: InstanceId) -> Result<String> {
        self.render_with_width(id, self.config.line_width)
    }

    /// Renders with a one-off line width.
    pub fn render_with_width(&mut self, id: InstanceId, line_width: usize) -> Result<String> {
        let mut writer = self.config.string_writer(line_width);
        self.write(id, writer.as_writer())?;
        Ok(writer.into_string())
    }

    /// Renders into `out`, returning the number of characters written.
    pub fn write(&mut self, id: InstanceId, out: &mut dyn TemplateWriter) -> Result<usize> {
        self.data(id)?;
        let mark = self.instances.len();
        let (result, warnings) = {
            let mut interp = Interpreter::new(self);
            let result = interp.exec(out, id, None);
            (result, interp.finish())
        };
        self.instances.truncate(mark);
        for warning in &warnings {
            self.listener.warning(warning);
        }
        result
    }

    #[cfg(test)]
    pub(crate) fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{embedded_region, region, text, Expr};
    use crate::group::TemplateSignature;
    use crate::listener::ErrorBuffer;

    fn engine() -> (Engine, ErrorBuffer, GroupId) {
        let errors = ErrorBuffer::new();
        let mut engine = Engine::new().with_listener(errors.clone());
        let group = engine.define_group("g");
        (engine, errors, group)
    }

    #[test]
    fn test_set_accumulates_into_multi() {
        let (mut engine, _, g) = engine();
        engine.define_template(g, TemplateDef::new("t", vec![]));
        let t = engine.instance_of(g, "t").unwrap();

        engine.set(t, "x", "a").unwrap();
        assert_eq!(engine.attribute(t, "x").unwrap(), Some(&Value::from("a")));

        engine.set(t, "x", Value::list(["b", "c"])).unwrap();
        engine.set(t, "x", Value::Absent).unwrap();
        assert_eq!(
            engine.attribute(t, "x").unwrap(),
            Some(&Value::list([Value::from("a"), "b".into(), "c".into(), Value::Absent]))
        );
    }

    #[test]
    fn test_set_absent_first_then_value() {
        let (mut engine, _, g) = engine();
        engine.define_template(g, TemplateDef::new("t", vec![]));
        let t = engine.instance_of(g, "t").unwrap();
        engine.set(t, "x", Value::Absent).unwrap();
        assert_eq!(engine.attribute(t, "x").unwrap(), Some(&Value::Absent));
        engine.set(t, "x", "y").unwrap();
        assert_eq!(
            engine.attribute(t, "x").unwrap(),
            Some(&Value::list([Value::Absent, "y".into()]))
        );
    }

    #[test]
    fn test_set_appends_iterator_elements() {
        let (mut engine, _, g) = engine();
        engine.define_template(g, TemplateDef::new("t", vec![]));
        let t = engine.instance_of(g, "t").unwrap();
        engine.set(t, "xs", Value::list(["a", "b"])).unwrap();
        engine.set(t, "xs", Value::iter(["c", "d"])).unwrap();
        assert_eq!(
            engine.attribute(t, "xs").unwrap(),
            Some(&Value::list(["a", "b", "c", "d"]))
        );
    }

    #[test]
    fn test_set_rejects_bad_names() {
        let (mut engine, _, g) = engine();
        engine.define_template(g, TemplateDef::with_args("t", ["a"], vec![]));
        let t = engine.instance_of(g, "t").unwrap();
        assert_eq!(
            engine.set(t, "a.b", 1),
            Err(RenderError::InvalidAttributeName("a.b".into()))
        );
        assert!(matches!(
            engine.set(t, "b", 1),
            Err(RenderError::NoSuchAttribute { .. })
        ));
        assert!(engine.set(t, "a", 1).is_ok());
    }

    #[test]
    fn test_set_template_records_enclosing() {
        let (mut engine, _, g) = engine();
        engine.define_template(g, TemplateDef::new("page", vec![]));
        engine.define_template(g, TemplateDef::new("body", vec![]));
        let page = engine.instance_of(g, "page").unwrap();
        let body = engine.instance_of(g, "body").unwrap();
        engine.set(page, "body", body).unwrap();
        assert_eq!(engine.enclosing_instance(body).unwrap(), Some(page));
        assert_eq!(engine.enclosing_instance(page).unwrap(), None);
    }

    #[test]
    fn test_set_aggregate() {
        let (mut engine, _, g) = engine();
        engine.define_template(g, TemplateDef::new("t", vec![]));
        let t = engine.instance_of(g, "t").unwrap();
        engine
            .set_aggregate(t, "items.{first, last}", vec!["Ter".into(), "Parr".into()])
            .unwrap();
        let Some(Value::Mapping(m)) = engine.attribute(t, "items").unwrap() else {
            panic!("expected a mapping");
        };
        assert_eq!(m.get("first"), Some(&Value::from("Ter")));
        assert_eq!(m.get("last"), Some(&Value::from("Parr")));

        for bad in ["items", "items.{a", ".{a}", "items.{a,}", "items.{a.b}"] {
            assert!(
                matches!(
                    engine.set_aggregate(t, bad, vec!["x".into()]),
                    Err(RenderError::MalformedAggregate(_))
                ),
                "{bad}"
            );
        }
        assert!(matches!(
            engine.set_aggregate(t, "items.{a,b}", vec!["x".into()]),
            Err(RenderError::MalformedAggregate(_))
        ));
    }

    #[test]
    fn test_remove() {
        let (mut engine, _, g) = engine();
        engine.define_template(g, TemplateDef::new("t", vec![]));
        let t = engine.instance_of(g, "t").unwrap();
        engine.set(t, "x", 1).unwrap();
        assert_eq!(engine.remove(t, "x").unwrap(), Some(Value::from(1)));
        assert_eq!(engine.attribute(t, "x").unwrap(), None);
    }

    #[test]
    fn test_unknown_instance() {
        let (mut engine, _, _) = engine();
        assert_eq!(
            engine.set(InstanceId(9), "x", 1),
            Err(RenderError::InvalidInstance(9))
        );
    }

    #[test]
    fn test_template_redefinition_reported() {
        let (mut engine, errors, g) = engine();
        engine.define_template(g, TemplateDef::new("t", vec![text("1")]));
        engine.define_template(g, TemplateDef::new("t", vec![text("2")]));
        assert_eq!(
            errors.errors(),
            vec![DefinitionError::TemplateRedefinition {
                group: "g".into(),
                template: "t".into()
            }]
        );
        let t = engine.instance_of(g, "t").unwrap();
        assert_eq!(engine.render(t).unwrap(), "1");
    }

    #[test]
    fn test_super_group_cycle_reported() {
        let (mut engine, errors, a) = engine();
        let b = engine.define_group("b");
        engine.set_super_group(b, a);
        engine.set_super_group(a, b);
        assert_eq!(engine.group(a).unwrap().super_group(), None);
        assert_eq!(engine.group(b).unwrap().super_group(), Some(a));
        assert!(matches!(
            errors.errors().as_slice(),
            [DefinitionError::SuperGroupCycle { .. }]
        ));
    }

    #[test]
    fn test_regions_registered_with_template() {
        let (mut engine, _, g) = engine();
        engine.define_template(
            g,
            TemplateDef::new("a", vec![region("r"), embedded_region("s", vec![text("S")])]),
        );
        let group = engine.group(g).unwrap();
        assert_eq!(
            group.template("region__a__r").and_then(|d| d.region_kind()),
            Some(RegionKind::Implicit)
        );
        assert_eq!(
            group.template("region__a__s").and_then(|d| d.region_kind()),
            Some(RegionKind::Embedded)
        );
    }

    #[test]
    fn test_unknown_region_reported() {
        let (mut engine, errors, g) = engine();
        engine.define_template(g, TemplateDef::new("a", vec![region("r")]));
        engine.define_region(g, "a", "nope", vec![]);
        engine.define_region(g, "missing", "r", vec![]);
        assert_eq!(errors.errors().len(), 2);
        assert!(errors
            .errors()
            .iter()
            .all(|e| matches!(e, DefinitionError::UnknownRegion { .. })));
    }

    #[test]
    fn test_interfaces() {
        let (mut engine, errors, g) = engine();
        engine.define_template(g, TemplateDef::with_args("method", ["name"], vec![]));
        engine.register_interface(
            g,
            Interface::new("Lang")
                .template(TemplateSignature::new("method", ["name", "args"]))
                .template(TemplateSignature::new("field", ["name"]))
                .template(TemplateSignature::new("comment", ["text"]).optional()),
        );
        assert!(!engine.check_satisfies_interfaces(g));
        let errs = errors.errors();
        assert_eq!(errs.len(), 2);
        assert!(matches!(&errs[0], DefinitionError::MismatchedArguments { template, .. } if template == "method"));
        assert!(matches!(&errs[1], DefinitionError::MissingTemplate { template, .. } if template == "field"));
    }

    #[test]
    fn test_interface_satisfied_through_super_group() {
        let (mut engine, errors, base) = engine();
        let sub = engine.define_group("sub");
        engine.set_super_group(sub, base);
        engine.define_template(base, TemplateDef::with_args("f", ["x"], vec![]));
        engine.register_interface(
            sub,
            Interface::new("I").template(TemplateSignature::new("f", ["x"])),
        );
        assert!(engine.check_satisfies_interfaces(sub));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_temporaries_released_after_render() {
        let (mut engine, _, g) = engine();
        engine.define_template(g, TemplateDef::new("item", vec![text("x")]));
        engine.define_template(
            g,
            TemplateDef::new(
                "list",
                vec![Expr::attr("xs")
                    .apply(crate::chunk::TemplateCall::named("item"))
                    .into()],
            ),
        );
        let list = engine.instance_of(g, "list").unwrap();
        engine.set(list, "xs", Value::list([1, 2, 3])).unwrap();
        let before = engine.instance_count();
        assert_eq!(engine.render(list).unwrap(), "xxx");
        assert_eq!(engine.instance_count(), before);
    }

    #[test]
    fn test_foreign_group_id_is_rejected() {
        let mut other = Engine::new();
        other.define_group("x");
        let foreign = other.define_group("y");

        let (mut engine, errors, g) = engine();
        assert!(engine.group(foreign).is_none());
        assert_eq!(
            engine.instance_of(foreign, "t"),
            Err(RenderError::InvalidGroup(foreign.0))
        );

        engine.define_template(foreign, TemplateDef::new("t", vec![text("t")]));
        engine.define_region(foreign, "t", "r", vec![]);
        engine.define_dictionary(foreign, "d", MapLiteral::default());
        engine.set_super_group(g, foreign);
        assert!(!engine.check_satisfies_interfaces(foreign));
        assert_eq!(errors.errors(), vec![DefinitionError::UnknownGroup(foreign.0); 5]);
        assert_eq!(engine.group(g).unwrap().super_group(), None);
        assert!(engine.instance_of(g, "t").is_err());
    }

    #[test]
    fn test_instance_of_missing_template() {
        let (mut engine, _, g) = engine();
        assert_eq!(
            engine.instance_of(g, "nope"),
            Err(RenderError::NoSuchTemplate { name: "nope".into() })
        );
    }
}
