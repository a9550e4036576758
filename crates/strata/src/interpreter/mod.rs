//! Tree-walking evaluator.
//!
//! An [`Interpreter`] lives for one top-level render. It walks the lowered
//! nodes of each instance, evaluates expressions to [`Value`]s and writes
//! them through a [`TemplateWriter`]. Instances it creates are appended to
//! the engine's arena and released by the engine afterwards.

mod guard;
mod ops;
mod scope;

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use strata_writer::{TemplateWriter, NO_WRAP};

use crate::chunk::{Args, DefaultEntry, Expr, MapLiteral, Options, TemplateCall, TemplateRef};
use crate::engine::{Binding, Engine, GroupId, InstanceData, InstanceId};
use crate::error::{RenderError, Result, Warning};
use crate::renderer::AttributeRenderer;
use crate::template::{region_name, Node, TemplateDef};
use crate::value::{MapDefault, Mapping, Scalar, Value};

use self::guard::RecursionGuard;
pub(crate) use self::scope::Scope;

/// Output state shared by a template body and the conditionals inside it.
#[derive(Debug, Default)]
struct LineState {
    written: usize,
    after_newline: bool,
}

/// Expression options after evaluation.
#[derive(Debug, Default)]
struct WriteOptions {
    separator: Option<String>,
    wrap: Option<String>,
    anchor: bool,
    null: Option<String>,
    format: Option<String>,
}

pub(crate) struct Interpreter<'e> {
    engine: &'e mut Engine,
    guard: RecursionGuard,
    defaults: HashMap<(InstanceId, String), Value>,
    /// Attributes read so far; only tracked in lint mode.
    reads: Option<HashSet<(InstanceId, String)>>,
    rendered: Vec<InstanceId>,
    /// Ids at or above this were created during the render.
    first_temporary: usize,
    /// Set while evaluating an expression that carries a `null` option.
    lenient_loop_vars: bool,
}

impl<'e> Interpreter<'e> {
    pub(crate) fn new(engine: &'e mut Engine) -> Self {
        let lint = engine.config.lint;
        let guard = RecursionGuard::new(lint, engine.config.max_depth);
        let first_temporary = engine.instances.len();
        Self {
            engine,
            guard,
            defaults: HashMap::new(),
            reads: lint.then(HashSet::new),
            rendered: Vec::new(),
            first_temporary,
            lenient_loop_vars: false,
        }
    }

    /// Lint warnings for caller-created instances whose attributes were set
    /// but never read.
    pub(crate) fn finish(self) -> Vec<Warning> {
        let Some(reads) = self.reads else {
            return Vec::new();
        };
        let mut warnings = Vec::new();
        for id in self.rendered {
            let data = &self.engine.instances[id.0];
            for name in data.attributes.keys() {
                if !reads.contains(&(id, name.clone())) {
                    warnings.push(Warning::UnusedAttribute {
                        template: data.def.name().to_string(),
                        attribute: name.clone(),
                    });
                }
            }
        }
        warnings
    }

    fn data(&self, id: InstanceId) -> Result<&InstanceData> {
        self.engine
            .instances
            .get(id.0)
            .ok_or(RenderError::InvalidInstance(id.0))
    }

    /// Renders one instance. `parent` is the frame that wrote it.
    pub(crate) fn exec(
        &mut self,
        out: &mut dyn TemplateWriter,
        id: InstanceId,
        parent: Option<&Scope<'_>>,
    ) -> Result<usize> {
        let def = self.data(id)?.def.clone();
        self.guard.enter(id, def.name())?;
        if self.reads.is_some() && id.0 < self.first_temporary && !self.rendered.contains(&id) {
            self.rendered.push(id);
        }
        tracing::trace!(template = def.name(), depth = self.guard.depth(), "render instance");
        let scope = Scope {
            instance: id,
            parent,
        };
        let mut line = LineState::default();
        let result = self.exec_nodes(out, &scope, def.nodes(), &mut line);
        self.guard.exit();
        result
    }

    fn exec_nodes(
        &mut self,
        out: &mut dyn TemplateWriter,
        scope: &Scope<'_>,
        nodes: &[Node],
        line: &mut LineState,
    ) -> Result<usize> {
        let mut n = 0;
        for node in nodes {
            match node {
                Node::Text(text) => {
                    let w = out.write(text)?;
                    n += w;
                    line.written += w;
                    line.after_newline = false;
                }
                Node::Newline => {
                    // A line that produced nothing vanishes with its newline.
                    if line.after_newline || line.written > 0 {
                        n += out.write("\n")?;
                    }
                    line.written = 0;
                    line.after_newline = true;
                }
                Node::Expr { chunk, indent } => {
                    let w = indented(out, indent.as_deref(), |out| {
                        self.write_expr(out, scope, &chunk.expr, &chunk.options)
                    })?;
                    n += w;
                    line.written += w;
                    line.after_newline = false;
                }
                Node::If {
                    branches,
                    otherwise,
                    indent,
                } => {
                    let mut body = otherwise;
                    for (test, nodes) in branches {
                        if self.eval(scope, test)?.is_truthy() {
                            body = nodes;
                            break;
                        }
                    }
                    line.after_newline = false;
                    n += indented(out, indent.as_deref(), |out| {
                        self.exec_nodes(out, scope, body, line)
                    })?;
                }
                Node::Region {
                    name,
                    super_call,
                    indent,
                } => {
                    let w = indented(out, indent.as_deref(), |out| {
                        self.exec_region(out, scope, name, *super_call)
                    })?;
                    n += w;
                    line.written += w;
                    line.after_newline = false;
                }
            }
        }
        Ok(n)
    }

    fn exec_region(
        &mut self,
        out: &mut dyn TemplateWriter,
        scope: &Scope<'_>,
        region: &str,
        super_call: bool,
    ) -> Result<usize> {
        let data = self.data(scope.instance)?;
        let name = region_name(data.def.region_owner(), region);
        let start = if super_call {
            self.super_group_of(scope, &name)?
        } else {
            data.group
        };
        match Engine::find_template(&self.engine.groups, start, &name) {
            Some((def, _)) => {
                let id = self.create(def, scope)?;
                self.exec(out, id, Some(scope))
            }
            None if super_call => Err(RenderError::NoSuchTemplate { name }),
            None => Ok(0),
        }
    }

    /// Evaluates an expression chunk and writes it with its options.
    fn write_expr(
        &mut self,
        out: &mut dyn TemplateWriter,
        scope: &Scope<'_>,
        expr: &Expr,
        options: &Options,
    ) -> Result<usize> {
        let lenient = std::mem::replace(&mut self.lenient_loop_vars, options.null.is_some());
        let value = self.eval(scope, expr);
        self.lenient_loop_vars = lenient;
        let value = value?;
        if options.is_empty() {
            return self.write_value(out, scope, value, &WriteOptions::default());
        }
        let opts = WriteOptions {
            separator: self.option_text(scope, options.separator.as_ref())?,
            wrap: self.option_text(scope, options.wrap.as_ref())?,
            anchor: options.anchor,
            null: self.option_text(scope, options.null.as_ref())?,
            format: self.option_text(scope, options.format.as_ref())?,
        };
        if opts.anchor {
            out.push_anchor_point();
        }
        let result = self.write_value(out, scope, value, &opts);
        if opts.anchor {
            out.pop_anchor_point();
        }
        result
    }

    fn option_text(&mut self, scope: &Scope<'_>, expr: Option<&Expr>) -> Result<Option<String>> {
        match expr {
            Some(expr) => {
                let value = self.eval(scope, expr)?;
                Ok(Some(self.to_text(scope, value)?))
            }
            None => Ok(None),
        }
    }

    fn write_value(
        &mut self,
        out: &mut dyn TemplateWriter,
        scope: &Scope<'_>,
        value: Value,
        opts: &WriteOptions,
    ) -> Result<usize> {
        match value {
            Value::Absent => match &opts.null {
                Some(null) => Ok(out.write_token(null, opts.wrap.as_deref())?),
                None => Ok(0),
            },
            Value::Scalar(scalar) => {
                let text = self.render_scalar(scope, &scalar, opts.format.as_deref())?;
                Ok(out.write_token(&text, opts.wrap.as_deref())?)
            }
            Value::Template(id) => {
                let mut n = 0;
                if let Some(wrap) = &opts.wrap {
                    n += out.write_wrap(wrap, 1)?;
                }
                Ok(n + self.exec(out, id, Some(scope))?)
            }
            Value::Multi(items) => self.write_elements(out, scope, items, opts),
            Value::Iterator(iter) => self.write_elements(out, scope, iter.drain(), opts),
            Value::Mapping(map) => {
                let keys = map.keys().map(Value::from).collect();
                self.write_elements(out, scope, keys, opts)
            }
        }
    }

    /// Absent elements become the `null` text or are dropped; separators go
    /// between the elements that remain.
    fn write_elements(
        &mut self,
        out: &mut dyn TemplateWriter,
        scope: &Scope<'_>,
        items: Vec<Value>,
        opts: &WriteOptions,
    ) -> Result<usize> {
        let mut n = 0;
        let mut first = true;
        for item in items {
            let item = match (item, &opts.null) {
                (Value::Absent, Some(null)) => Value::from(null.as_str()),
                (Value::Absent, None) => continue,
                (item, _) => item,
            };
            if !first {
                if let Some(separator) = &opts.separator {
                    n += out.write_separator(separator)?;
                }
            }
            first = false;
            n += self.write_value(out, scope, item, opts)?;
        }
        Ok(n)
    }

    fn render_scalar(&mut self, scope: &Scope<'_>, scalar: &Scalar, format: Option<&str>) -> Result<String> {
        match self.find_renderer(scope, scalar)? {
            Some(renderer) => renderer.format(scalar, format),
            None => Ok(scalar.to_string()),
        }
    }

    /// Instance registries along the render stack, then the instantiating
    /// group chain, then the owning group chain, then the built-ins.
    fn find_renderer(
        &self,
        scope: &Scope<'_>,
        scalar: &Scalar,
    ) -> Result<Option<Rc<dyn AttributeRenderer>>> {
        let type_id = scalar.type_id();
        let mut cursor = Some(scope);
        while let Some(frame) = cursor {
            if let Some(found) = self
                .data(frame.instance)?
                .renderers
                .as_ref()
                .and_then(|registry| registry.get(type_id))
            {
                return Ok(Some(found));
            }
            cursor = frame.parent;
        }
        let data = self.data(scope.instance)?;
        let groups = &self.engine.groups;
        let found = Engine::chain(groups, data.group)
            .chain(Engine::chain(groups, data.native_group))
            .find_map(|g| groups.get(g.0)?.renderers.get(type_id));
        Ok(found.or_else(|| self.engine.builtins.get(type_id)))
    }

    /// Renders any value to a string.
    fn to_text(&mut self, scope: &Scope<'_>, value: Value) -> Result<String> {
        if let Value::Absent = value {
            return Ok(String::new());
        }
        let mut writer = self.engine.config.string_writer(NO_WRAP);
        self.write_value(writer.as_writer(), scope, value, &WriteOptions::default())?;
        Ok(writer.into_string())
    }

    fn render_instance_to_string(&mut self, id: InstanceId, parent: &Scope<'_>) -> Result<String> {
        let mut writer = self.engine.config.string_writer(NO_WRAP);
        self.exec(writer.as_writer(), id, Some(parent))?;
        Ok(writer.into_string())
    }

    pub(crate) fn eval(&mut self, scope: &Scope<'_>, expr: &Expr) -> Result<Value> {
        let value = match expr {
            Expr::Attr(name) => self.resolve(scope, name)?,
            Expr::Str(s) => Value::from(s.as_str()),
            Expr::Bool(b) => Value::from(*b),
            Expr::Property(target, name) => {
                let target = self.eval(scope, target)?;
                self.property(target, name)?
            }
            Expr::IndirectProperty(target, key) => {
                let target = self.eval(scope, target)?;
                let key = self.eval(scope, key)?;
                let key = self.to_text(scope, key)?;
                self.property(target, &key)?
            }
            Expr::Include(call) => Value::Template(self.include(scope, call)?),
            Expr::Apply { targets, templates } => {
                if let [target] = targets.as_slice() {
                    let driver = self.eval(scope, target)?;
                    self.apply(scope, driver, templates)?
                } else {
                    let drivers = targets
                        .iter()
                        .map(|target| self.eval(scope, target))
                        .collect::<Result<Vec<_>>>()?;
                    self.apply_parallel(scope, drivers, templates)?
                }
            }
            Expr::Anonymous(anon) => {
                let owner = self.data(scope.instance)?.def.clone();
                Value::Template(self.create(anon.def(owner.region_owner()), scope)?)
            }
            Expr::Map(map) => Value::Mapping(self.eval_map(scope, map)?),
            Expr::Cat(items) => self.cat(scope, items)?,
            Expr::Op(op, arg) => {
                let arg = self.eval(scope, arg)?;
                ops::apply(*op, arg)
            }
            Expr::ToStr(inner) => {
                let inner = self.eval(scope, inner)?;
                Value::from(self.to_text(scope, inner)?)
            }
            Expr::Not(inner) => Value::from(!self.eval(scope, inner)?.is_truthy()),
            Expr::And(a, b) => {
                Value::from(self.eval(scope, a)?.is_truthy() && self.eval(scope, b)?.is_truthy())
            }
            Expr::Or(a, b) => {
                Value::from(self.eval(scope, a)?.is_truthy() || self.eval(scope, b)?.is_truthy())
            }
        };
        Ok(value)
    }

    pub(crate) fn eval_map(&mut self, scope: &Scope<'_>, map: &MapLiteral) -> Result<Mapping> {
        let mut mapping = Mapping::new();
        for (key, expr) in &map.entries {
            let value = self.eval(scope, expr)?;
            mapping.insert(key.as_str(), value);
        }
        let default = match &map.default {
            None => None,
            Some(DefaultEntry::Key) => Some(MapDefault::Key),
            Some(DefaultEntry::Value(expr)) => {
                Some(MapDefault::Value(Box::new(self.eval(scope, expr)?)))
            }
        };
        mapping.set_default(default);
        Ok(mapping)
    }

    /// `[a, b, ...]`: a list if any operand is one, otherwise a string.
    fn cat(&mut self, scope: &Scope<'_>, items: &[Expr]) -> Result<Value> {
        let values = items
            .iter()
            .map(|item| self.eval(scope, item))
            .collect::<Result<Vec<_>>>()?;
        if values
            .iter()
            .any(|v| matches!(v, Value::Multi(_) | Value::Iterator(_)))
        {
            let mut flat = Vec::new();
            for value in values {
                match value {
                    Value::Multi(items) => flat.extend(items),
                    Value::Iterator(iter) => flat.extend(iter.drain()),
                    Value::Absent => {}
                    other => flat.push(other),
                }
            }
            return Ok(Value::Multi(flat));
        }
        let mut text = String::new();
        for value in values {
            text.push_str(&self.to_text(scope, value)?);
        }
        Ok(Value::from(text))
    }

    // Template instantiation

    /// Adds a render-time instance. It inherits the creator's instantiating
    /// group, so calls inside it dispatch the same way the creator's do.
    fn create(&mut self, def: Rc<TemplateDef>, creator: &Scope<'_>) -> Result<InstanceId> {
        let creator_data = self.data(creator.instance)?;
        let native = def.owning_group().unwrap_or(creator_data.native_group);
        let mut data = InstanceData::new(def, creator_data.group, native);
        data.enclosing = Some(creator.instance);
        self.engine.instances.push(data);
        Ok(InstanceId(self.engine.instances.len() - 1))
    }

    /// Super-group of the group that owns the executing template's
    /// definition. Anonymous templates use their creator's.
    fn super_group_of(&self, scope: &Scope<'_>, name: &str) -> Result<GroupId> {
        let native = self.data(scope.instance)?.native_group;
        let group = self
            .engine
            .group(native)
            .ok_or(RenderError::InvalidGroup(native.0))?;
        group.super_group.ok_or_else(|| RenderError::NoSuperGroup {
            group: group.name.clone(),
            name: name.to_string(),
        })
    }

    /// Finds the definition a call refers to.
    fn lookup(&mut self, scope: &Scope<'_>, template: &TemplateRef) -> Result<Rc<TemplateDef>> {
        let (name, start) = match template {
            TemplateRef::Anonymous(anon) => {
                let owner = self.data(scope.instance)?.def.clone();
                return Ok(anon.def(owner.region_owner()));
            }
            TemplateRef::Named(name) => (name.clone(), self.data(scope.instance)?.group),
            TemplateRef::Super(name) => (name.clone(), self.super_group_of(scope, name)?),
            TemplateRef::Indirect(expr) => {
                let value = self.eval(scope, expr)?;
                let name = self.to_text(scope, value)?;
                (name, self.data(scope.instance)?.group)
            }
        };
        match Engine::find_template(&self.engine.groups, start, &name) {
            Some((def, _)) => Ok(def),
            None => {
                tracing::debug!(template = %name, "template lookup missed");
                Err(RenderError::NoSuchTemplate { name })
            }
        }
    }

    fn instantiate(&mut self, scope: &Scope<'_>, template: &TemplateRef) -> Result<InstanceId> {
        let def = self.lookup(scope, template)?;
        self.create(def, scope)
    }

    fn include(&mut self, scope: &Scope<'_>, call: &TemplateCall) -> Result<InstanceId> {
        let id = self.instantiate(scope, &call.template)?;
        self.bind_args(scope, id, &call.args, 0)?;
        Ok(id)
    }

    fn bind(&mut self, id: InstanceId, name: &str, value: Value) {
        self.engine.instances[id.0]
            .attributes
            .insert(name.to_string(), value);
    }

    /// Binds call-site arguments. Positional arguments fill formal arguments
    /// from index `start`; the application binds the ones before it.
    fn bind_args(&mut self, scope: &Scope<'_>, id: InstanceId, args: &Args, start: usize) -> Result<()> {
        if args.is_empty() {
            return Ok(());
        }
        let def = self.data(id)?.def.clone();
        let formals = def.formal_args().unwrap_or(&[]);
        let open = formals.get(start..).unwrap_or(&[]);
        let mismatch = |found: usize| RenderError::FormalArgMismatch {
            template: def.name().to_string(),
            expected: formals.len(),
            found: found + start,
        };
        if args.positional.len() > open.len() {
            return Err(mismatch(args.positional.len()));
        }
        // A lone unnamed argument only binds to a template's sole formal.
        if start == 0 && args.positional.len() == 1 && args.named.is_empty() && formals.len() != 1 {
            return Err(mismatch(1));
        }
        for (arg, expr) in open.iter().zip(&args.positional) {
            let value = self.eval(scope, expr)?;
            self.bind(id, &arg.name, value);
        }
        for (name, expr) in &args.named {
            if !def.accepts(name) {
                return Err(RenderError::NoSuchAttribute {
                    name: name.clone(),
                    template: def.name().to_string(),
                });
            }
            let value = self.eval(scope, expr)?;
            self.bind(id, name, value);
        }
        if args.pass_through {
            for arg in formals {
                if self.data(id)?.attributes.contains_key(&arg.name) {
                    continue;
                }
                match self.resolve(scope, &arg.name) {
                    Ok(Value::Absent) if arg.default.is_some() => {}
                    Ok(value) => self.bind(id, &arg.name, value),
                    Err(RenderError::NoSuchAttribute { .. }) => {}
                    Err(err) => return Err(err),
                }
            }
        }
        if !args.positional.is_empty() {
            let attributes = &self.data(id)?.attributes;
            let missing = open
                .iter()
                .any(|arg| arg.default.is_none() && !attributes.contains_key(&arg.name));
            if missing {
                return Err(mismatch(args.positional.len()));
            }
        }
        Ok(())
    }

    /// `driver:t()` and `driver:t(),u()`.
    fn apply(&mut self, scope: &Scope<'_>, driver: Value, templates: &[TemplateCall]) -> Result<Value> {
        if templates.is_empty() {
            return Ok(driver);
        }
        let items = match driver {
            Value::Absent => return Ok(Value::Absent),
            other => match ops::elements(other) {
                Ok(items) => items,
                Err(single) => {
                    let id = self.apply_one(scope, &templates[0], single, 0)?;
                    return Ok(Value::Template(id));
                }
            },
        };
        let mut mapped = Vec::with_capacity(items.len());
        let mut i0 = 0;
        for item in items {
            if item.is_absent() {
                mapped.push(Value::Absent);
                continue;
            }
            let call = &templates[i0 % templates.len()];
            mapped.push(Value::Template(self.apply_one(scope, call, item, i0)?));
            i0 += 1;
        }
        Ok(Value::Multi(mapped))
    }

    fn apply_one(&mut self, scope: &Scope<'_>, call: &TemplateCall, item: Value, i0: usize) -> Result<InstanceId> {
        let id = self.instantiate(scope, &call.template)?;
        let def = self.data(id)?.def.clone();
        let formals = def.formal_args().unwrap_or(&[]);
        if def.is_anonymous() && formals.len() > 1 {
            return Err(RenderError::FormalArgMismatch {
                template: def.name().to_string(),
                expected: formals.len(),
                found: 1,
            });
        }
        self.engine.instances[id.0].iteration = vec![
            ("it".to_string(), Binding::Bound(item.clone())),
            ("i".to_string(), Binding::Bound(Value::from(i0 + 1))),
            ("i0".to_string(), Binding::Bound(Value::from(i0))),
        ];
        if let Some(first) = formals.first() {
            if !call.args.named.iter().any(|(name, _)| *name == first.name) {
                self.bind(id, &first.name, item);
            }
        }
        self.bind_args(scope, id, &call.args, 1)?;
        Ok(id)
    }

    /// `a,b:{x,y | ...}`: walks all drivers in lockstep up to the longest.
    fn apply_parallel(&mut self, scope: &Scope<'_>, drivers: Vec<Value>, templates: &[TemplateCall]) -> Result<Value> {
        let [call] = templates else {
            return Err(RenderError::FormalArgMismatch {
                template: "parallel application".to_string(),
                expected: 1,
                found: templates.len(),
            });
        };
        let def = self.lookup(scope, &call.template)?;
        let names = def.arg_names();
        if names.len() != drivers.len() {
            return Err(RenderError::FormalArgMismatch {
                template: def.name().to_string(),
                expected: names.len(),
                found: drivers.len(),
            });
        }
        let columns: Vec<Vec<Value>> = drivers
            .into_iter()
            .map(|driver| match ops::elements(driver) {
                Ok(items) => items,
                Err(Value::Absent) => Vec::new(),
                Err(single) => vec![single],
            })
            .collect();
        let len = columns.iter().map(Vec::len).max().unwrap_or(0);
        let mut mapped = Vec::with_capacity(len);
        for i0 in 0..len {
            let id = self.create(def.clone(), scope)?;
            let mut iteration = vec![
                ("i".to_string(), Binding::Bound(Value::from(i0 + 1))),
                ("i0".to_string(), Binding::Bound(Value::from(i0))),
            ];
            for (name, column) in names.iter().zip(&columns) {
                match column.get(i0) {
                    Some(value) => self.bind(id, name, value.clone()),
                    None if self.lenient_loop_vars => {}
                    None => iteration.push((name.clone(), Binding::Unbound)),
                }
            }
            self.engine.instances[id.0].iteration = iteration;
            self.bind_args(scope, id, &call.args, names.len())?;
            mapped.push(Value::Template(id));
        }
        Ok(Value::Multi(mapped))
    }
}

/// Runs `f` with `indent` pushed on the writer.
fn indented<R>(
    out: &mut dyn TemplateWriter,
    indent: Option<&str>,
    f: impl FnOnce(&mut dyn TemplateWriter) -> Result<R>,
) -> Result<R> {
    match indent {
        Some(indent) => {
            out.push_indentation(indent);
            let result = f(out);
            out.pop_indentation();
            result
        }
        None => f(out),
    }
}
