//! Attribute values.
//!
//! The [`Value`] enum is what templates see: every attribute, expression
//! result and iteration element is one of its variants. Caller data enters
//! either through the `From` conversions, through [`Value::from_serialize`]
//! for anything implementing `serde::Serialize`, or as a typed
//! [`Model`] object whose properties templates can read and whose type keys
//! renderer lookup.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::engine::InstanceId;

/// A caller-supplied object exposed to templates.
///
/// # Example
///
/// ```
/// use std::any::Any;
/// use std::fmt;
/// use strata::{Model, Value};
///
/// struct User { name: String, age: i64 }
///
/// impl fmt::Display for User {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "{}", self.name)
///     }
/// }
///
/// impl Model for User {
///     fn property(&self, name: &str) -> Option<Value> {
///         match name {
///             "name" => Some(self.name.clone().into()),
///             "age" => Some(self.age.into()),
///             _ => None,
///         }
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Model: fmt::Display + 'static {
    /// Returns the named property, or `None` if the object has no such property.
    fn property(&self, name: &str) -> Option<Value>;

    /// Upcast used to key renderers by the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Name used in diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A single non-collection value.
#[derive(Clone)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Object(Rc<dyn Model>),
}

impl Scalar {
    /// Type key used for renderer dispatch.
    pub fn type_id(&self) -> TypeId {
        match self {
            Scalar::Str(_) => TypeId::of::<String>(),
            Scalar::Int(_) => TypeId::of::<i64>(),
            Scalar::Float(_) => TypeId::of::<f64>(),
            Scalar::Bool(_) => TypeId::of::<bool>(),
            Scalar::Object(obj) => obj.as_any().type_id(),
        }
    }

    /// Human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Str(_) => "string",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "bool",
            Scalar::Object(obj) => obj.type_name(),
        }
    }

    /// Returns the string slice for `Str` scalars.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Object(obj) => write!(f, "{}", obj),
        }
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Scalar::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Scalar::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Scalar::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Scalar::Object(obj) => write!(f, "Object({})", obj.type_name()),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a == b,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Object(a), Scalar::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Fallback used when a mapping lookup misses.
#[derive(Debug, Clone, PartialEq)]
pub enum MapDefault {
    /// Yield the key that was looked up.
    Key,
    /// Yield a fixed value.
    Value(Box<Value>),
}

/// String-keyed, insertion-ordered map with an optional default entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: IndexMap<String, Value>,
    default: Option<MapDefault>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets the fallback for missing keys, builder style.
    pub fn with_default(mut self, default: MapDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn set_default(&mut self, default: Option<MapDefault>) {
        self.default = default;
    }

    /// Raw entry access; ignores the default.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Property-style lookup: exact key, then the `keys`/`values` pseudo
    /// properties, then the default entry, then `Absent`.
    pub fn lookup(&self, key: &str) -> Value {
        if let Some(value) = self.entries.get(key) {
            return value.clone();
        }
        match key {
            "keys" => return Value::Multi(self.keys().map(Value::from).collect()),
            "values" => return Value::Multi(self.entries.values().cloned().collect()),
            _ => {}
        }
        match &self.default {
            Some(MapDefault::Key) => Value::from(key),
            Some(MapDefault::Value(value)) => (**value).clone(),
            None => Value::Absent,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
struct Cursor {
    remaining: VecDeque<Value>,
}

/// Single-pass iterator value.
///
/// Clones share one cursor, so the second of two references to the same
/// iterator attribute sees whatever the first left behind (usually nothing).
#[derive(Clone)]
pub struct ValueIter(Rc<RefCell<Cursor>>);

impl ValueIter {
    pub fn new(items: impl IntoIterator<Item = Value>) -> Self {
        Self(Rc::new(RefCell::new(Cursor {
            remaining: items.into_iter().collect(),
        })))
    }

    /// Consumes and returns the next element.
    pub fn next_value(&self) -> Option<Value> {
        self.0.borrow_mut().remaining.pop_front()
    }

    pub fn has_next(&self) -> bool {
        !self.0.borrow().remaining.is_empty()
    }

    /// Consumes everything left.
    pub fn drain(&self) -> Vec<Value> {
        self.0.borrow_mut().remaining.drain(..).collect()
    }
}

impl fmt::Debug for ValueIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueIter({} remaining)", self.0.borrow().remaining.len())
    }
}

impl PartialEq for ValueIter {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Absent,
    Scalar(Scalar),
    Multi(Vec<Value>),
    Mapping(Mapping),
    Template(InstanceId),
    Iterator(ValueIter),
}

impl Value {
    /// Wraps a typed object.
    pub fn object<M: Model>(model: M) -> Self {
        Value::Scalar(Scalar::Object(Rc::new(model)))
    }

    /// Builds a single-pass iterator value.
    pub fn iter<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::Iterator(ValueIter::new(items.into_iter().map(Into::into)))
    }

    /// Builds a multi-valued attribute.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::Multi(items.into_iter().map(Into::into).collect())
    }

    /// Converts serializable data: objects become mappings, arrays become
    /// multi-values and `null` becomes `Absent`.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self, serde_json::Error> {
        Ok(serde_json::to_value(data)?.into())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Truth test used by conditionals.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Absent => false,
            Value::Scalar(Scalar::Bool(b)) => *b,
            Value::Scalar(_) => true,
            Value::Multi(items) => !items.is_empty(),
            Value::Mapping(map) => !map.is_empty(),
            Value::Template(_) => true,
            Value::Iterator(iter) => iter.has_next(),
        }
    }

    /// Returns the string slice for string scalars.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(scalar) => scalar.as_str(),
            _ => None,
        }
    }

    /// Human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Scalar(scalar) => scalar.type_name(),
            Value::Multi(_) => "list",
            Value::Mapping(_) => "map",
            Value::Template(_) => "template",
            Value::Iterator(_) => "iterator",
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::Str(s))
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Scalar(Scalar::Str(s.clone()))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Scalar(Scalar::Float(n))
    }
}

macro_rules! int_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Scalar(Scalar::Int(n as i64))
                }
            }
        )*
    };
}

int_value!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}

impl From<InstanceId> for Value {
    fn from(id: InstanceId) -> Self {
        Value::Template(id)
    }
}

impl From<ValueIter> for Value {
    fn from(iter: ValueIter) -> Self {
        Value::Iterator(iter)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Multi(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Absent, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Absent,
            Json::Bool(b) => b.into(),
            Json::Number(n) => match n.as_i64() {
                Some(i) => i.into(),
                None => n.as_f64().map_or(Value::Absent, Value::from),
            },
            Json::String(s) => s.into(),
            Json::Array(items) => Value::Multi(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                let mut mapping = Mapping::new();
                for (key, value) in map {
                    mapping.insert(key, Value::from(value));
                }
                Value::Mapping(mapping)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Point {
        x: i64,
    }

    impl fmt::Display for Point {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "({})", self.x)
        }
    }

    impl Model for Point {
        fn property(&self, name: &str) -> Option<Value> {
            (name == "x").then(|| self.x.into())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Absent.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(Value::from(true).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(!Value::Multi(vec![]).is_truthy());
        assert!(Value::list(["a"]).is_truthy());
        assert!(!Value::Mapping(Mapping::new()).is_truthy());
        assert!(Value::iter(["a"]).is_truthy());
        assert!(!Value::iter(Vec::<String>::new()).is_truthy());
    }

    #[test]
    fn test_object_type_id_is_concrete() {
        let scalar = Scalar::Object(Rc::new(Point { x: 1 }));
        assert_eq!(scalar.type_id(), TypeId::of::<Point>());
        assert_eq!(scalar.to_string(), "(1)");
        assert_eq!(Scalar::Str("a".into()).type_id(), TypeId::of::<String>());
    }

    #[test]
    fn test_iterator_is_single_pass_across_clones() {
        let value = Value::iter(["a", "b"]);
        let Value::Iterator(first) = value.clone() else {
            panic!("expected iterator");
        };
        let Value::Iterator(second) = value else {
            panic!("expected iterator");
        };
        assert_eq!(first.drain().len(), 2);
        assert!(!second.has_next());
        assert_eq!(second.next_value(), None);
    }

    #[test]
    fn test_mapping_lookup_order() {
        let map = Mapping::new()
            .with("int", "0")
            .with_default(MapDefault::Key);
        assert_eq!(map.lookup("int"), Value::from("0"));
        assert_eq!(map.lookup("UserRecord"), Value::from("UserRecord"));
        assert_eq!(map.lookup("keys"), Value::list(["int"]));

        let plain = Mapping::new().with("a", 1);
        assert_eq!(plain.lookup("b"), Value::Absent);

        let fixed = Mapping::new().with_default(MapDefault::Value(Box::new("null".into())));
        assert_eq!(fixed.lookup("anything"), Value::from("null"));
    }

    #[test]
    fn test_from_serialize() {
        let value = Value::from_serialize(&json!({
            "name": "Ter",
            "tags": ["a", null],
            "age": 42,
            "ratio": 0.5,
        }))
        .unwrap();
        let Value::Mapping(map) = value else {
            panic!("expected mapping");
        };
        assert_eq!(map.lookup("name"), Value::from("Ter"));
        assert_eq!(
            map.lookup("tags"),
            Value::Multi(vec!["a".into(), Value::Absent])
        );
        assert_eq!(map.lookup("age"), Value::from(42));
        assert_eq!(map.lookup("ratio"), Value::from(0.5));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["name", "tags", "age", "ratio"]);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<&str>), Value::Absent);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
