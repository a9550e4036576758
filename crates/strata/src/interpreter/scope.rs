//! Attribute resolution.
//!
//! Names resolve dynamically: the current instance first, then each
//! enclosing render frame outward. A template that declares a name as a
//! formal argument stops the walk, even when the argument was never set.
//! Group dictionaries are the last stop.

use super::Interpreter;
use crate::chunk::Expr;
use crate::engine::{Binding, Engine, InstanceId};
use crate::error::{RenderError, Result};
use crate::value::Value;

/// One frame of the render stack.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'s> {
    pub(crate) instance: InstanceId,
    pub(crate) parent: Option<&'s Scope<'s>>,
}

impl Interpreter<'_> {
    pub(crate) fn resolve(&mut self, scope: &Scope<'_>, name: &str) -> Result<Value> {
        let mut cursor = Some(scope);
        while let Some(frame) = cursor {
            let data = self.data(frame.instance)?;
            if let Some((_, binding)) = data.iteration.iter().find(|(n, _)| n == name) {
                return match binding {
                    Binding::Bound(value) => Ok(value.clone()),
                    Binding::Unbound => Err(self.no_such_attribute(scope, name)),
                };
            }
            if let Some(value) = data.attributes.get(name) {
                let value = value.clone();
                self.mark_read(frame.instance, name);
                return Ok(value);
            }
            if let Some(arg) = data.def.formal_arg(name) {
                if arg.default.is_some() {
                    return self.default_value(frame, name);
                }
                return Ok(Value::Absent);
            }
            cursor = frame.parent;
        }
        match self.dictionary(scope, name)? {
            Some(value) => Ok(value),
            None => Err(self.no_such_attribute(scope, name)),
        }
    }

    /// Evaluates the default of formal argument `name` in the frame that
    /// declares it. The result is kept for the rest of the render.
    fn default_value(&mut self, frame: &Scope<'_>, name: &str) -> Result<Value> {
        let key = (frame.instance, name.to_string());
        if let Some(value) = self.defaults.get(&key) {
            return Ok(value.clone());
        }
        let def = self.data(frame.instance)?.def.clone();
        let Some(default) = def.formal_arg(name).and_then(|arg| arg.default.as_ref()) else {
            return Ok(Value::Absent);
        };
        // A default that refers to itself sees Absent.
        self.defaults.insert(key.clone(), Value::Absent);
        tracing::trace!(template = def.name(), arg = name, "evaluate default argument");
        let value = match default {
            Expr::Anonymous(anon) if anon.is_single_to_str() => {
                let id = self.create(anon.def(def.region_owner()), frame)?;
                Value::from(self.render_instance_to_string(id, frame)?)
            }
            other => self.eval(frame, other)?,
        };
        self.defaults.insert(key, value.clone());
        Ok(value)
    }

    fn dictionary(&mut self, scope: &Scope<'_>, name: &str) -> Result<Option<Value>> {
        let native = self.data(scope.instance)?.native_group;
        let groups = &self.engine.groups;
        let found = Engine::chain(groups, native)
            .find_map(|g| groups.get(g.0)?.dictionaries.get(name).cloned());
        match found {
            Some(map) => Ok(Some(Value::Mapping(self.eval_map(scope, &map)?))),
            None => Ok(None),
        }
    }

    /// `value.name`
    pub(crate) fn property(&mut self, value: Value, name: &str) -> Result<Value> {
        match value {
            Value::Absent => Ok(Value::Absent),
            Value::Mapping(map) => Ok(map.lookup(name)),
            Value::Template(id) => {
                let found = self.data(id)?.attributes.get(name).cloned();
                if found.is_some() {
                    self.mark_read(id, name);
                }
                Ok(found.unwrap_or_default())
            }
            Value::Scalar(crate::value::Scalar::Object(obj)) => {
                obj.property(name).ok_or_else(|| RenderError::NoSuchProperty {
                    property: name.to_string(),
                    type_name: obj.type_name().to_string(),
                })
            }
            other => Err(RenderError::NoSuchProperty {
                property: name.to_string(),
                type_name: other.type_name().to_string(),
            }),
        }
    }

    fn no_such_attribute(&self, scope: &Scope<'_>, name: &str) -> RenderError {
        let template = self
            .data(scope.instance)
            .map(|data| data.def.name().to_string())
            .unwrap_or_default();
        RenderError::NoSuchAttribute {
            name: name.to_string(),
            template,
        }
    }

    fn mark_read(&mut self, id: InstanceId, name: &str) {
        if let Some(reads) = &mut self.reads {
            reads.insert((id, name.to_string()));
        }
    }
}
