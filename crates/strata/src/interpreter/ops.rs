//! List operators. They work on value shape only and never render.

use crate::chunk::Operator;
use crate::value::Value;

pub(crate) fn apply(op: Operator, value: Value) -> Value {
    match op {
        Operator::First => first(value),
        Operator::Rest => rest(value),
        Operator::Last => last(value),
        Operator::Length => length(value),
        Operator::Strip => strip(value),
        Operator::Trunc => trunc(value),
        Operator::Reverse => reverse(value),
    }
}

/// Elements of a collection value; anything else is handed back as `Err`.
pub(crate) fn elements(value: Value) -> Result<Vec<Value>, Value> {
    match value {
        Value::Multi(items) => Ok(items),
        Value::Iterator(iter) => Ok(iter.drain()),
        Value::Mapping(map) => Ok(map.keys().map(Value::from).collect()),
        other => Err(other),
    }
}

fn first(value: Value) -> Value {
    match value {
        // Only one element is consumed.
        Value::Iterator(iter) => iter.next_value().unwrap_or_default(),
        other => match elements(other) {
            Ok(items) => items.into_iter().next().unwrap_or_default(),
            Err(single) => single,
        },
    }
}

fn rest(value: Value) -> Value {
    match elements(value) {
        Ok(items) if items.len() > 1 => Value::Multi(items.into_iter().skip(1).collect()),
        _ => Value::Absent,
    }
}

fn last(value: Value) -> Value {
    match elements(value) {
        Ok(items) => items.into_iter().last().unwrap_or_default(),
        Err(single) => single,
    }
}

fn length(value: Value) -> Value {
    let n = match elements(value) {
        Ok(items) => items.len(),
        Err(Value::Absent) => 0,
        Err(_) => 1,
    };
    Value::from(n)
}

fn strip(value: Value) -> Value {
    match elements(value) {
        Ok(items) => Value::Multi(
            items
                .into_iter()
                .filter(|item| !item.is_absent())
                .map(|item| match item {
                    Value::Multi(nested) => {
                        Value::Multi(nested.into_iter().filter(|v| !v.is_absent()).collect())
                    }
                    other => other,
                })
                .collect(),
        ),
        Err(single) => single,
    }
}

fn trunc(value: Value) -> Value {
    match elements(value) {
        Ok(mut items) if items.len() > 1 => {
            items.pop();
            Value::Multi(items)
        }
        _ => Value::Absent,
    }
}

fn reverse(value: Value) -> Value {
    match elements(value) {
        Ok(mut items) => {
            items.reverse();
            Value::Multi(items)
        }
        Err(single) => single,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn data() -> Value {
        Value::list([Value::from("Hi"), Value::Absent, "mom".into(), Value::Absent])
    }

    #[test]
    fn test_length_counts_absent_entries() {
        assert_eq!(apply(Operator::Length, data()), Value::from(4));
        let stripped = apply(Operator::Strip, data());
        assert_eq!(stripped, Value::list(["Hi", "mom"]));
        assert_eq!(apply(Operator::Length, stripped), Value::from(2));
    }

    #[test]
    fn test_singleton_behaviour() {
        let single = Value::from("x");
        assert_eq!(apply(Operator::First, single.clone()), single);
        assert_eq!(apply(Operator::Last, single.clone()), single);
        assert_eq!(apply(Operator::Rest, single.clone()), Value::Absent);
        assert_eq!(apply(Operator::Trunc, single.clone()), Value::Absent);
        assert_eq!(apply(Operator::Length, single), Value::from(1));

        let one = Value::list(["x"]);
        assert_eq!(apply(Operator::First, one.clone()), Value::from("x"));
        assert_eq!(apply(Operator::Rest, one), Value::Absent);
    }

    #[test]
    fn test_absent_input() {
        assert_eq!(apply(Operator::Length, Value::Absent), Value::from(0));
        assert_eq!(apply(Operator::First, Value::Absent), Value::Absent);
        assert_eq!(apply(Operator::Strip, Value::Absent), Value::Absent);
    }

    #[test]
    fn test_first_rest_last_trunc() {
        let xs = Value::list([1, 2, 3]);
        assert_eq!(apply(Operator::First, xs.clone()), Value::from(1));
        assert_eq!(apply(Operator::Rest, xs.clone()), Value::list([2, 3]));
        assert_eq!(apply(Operator::Last, xs.clone()), Value::from(3));
        assert_eq!(apply(Operator::Trunc, xs.clone()), Value::list([1, 2]));
        assert_eq!(apply(Operator::Reverse, xs), Value::list([3, 2, 1]));
    }

    #[test]
    fn test_strip_one_nested_level() {
        let nested = Value::list([
            Value::list([Value::from("a"), Value::Absent]),
            Value::Absent,
            Value::from("b"),
        ]);
        assert_eq!(
            apply(Operator::Strip, nested),
            Value::list([Value::list(["a"]), Value::from("b")])
        );
    }

    #[test]
    fn test_iterator_first_consumes_one() {
        let iter = Value::iter([1, 2, 3]);
        assert_eq!(apply(Operator::First, iter.clone()), Value::from(1));
        assert_eq!(apply(Operator::Length, iter.clone()), Value::from(2));
        assert_eq!(apply(Operator::Length, iter), Value::from(0));
    }

    #[test]
    fn test_mapping_iterates_keys() {
        let map = crate::value::Mapping::new().with("a", 1).with("b", 2);
        assert_eq!(apply(Operator::First, map.clone().into()), Value::from("a"));
        assert_eq!(apply(Operator::Length, map.into()), Value::from(2));
    }

    fn arb_list() -> impl Strategy<Value = Vec<Option<i64>>> {
        prop::collection::vec(prop::option::of(any::<i64>()), 0..20)
    }

    fn to_value(items: &[Option<i64>]) -> Value {
        Value::list(items.iter().copied())
    }

    proptest! {
        #[test]
        fn prop_strip_removes_exactly_absent(items in arb_list()) {
            let present = items.iter().filter(|x| x.is_some()).count();
            let stripped = apply(Operator::Strip, to_value(&items));
            prop_assert_eq!(apply(Operator::Length, stripped), Value::from(present));
        }

        #[test]
        fn prop_length_counts_everything(items in arb_list()) {
            prop_assert_eq!(apply(Operator::Length, to_value(&items)), Value::from(items.len()));
        }

        #[test]
        fn prop_reverse_is_involution(items in arb_list()) {
            let value = to_value(&items);
            let twice = apply(Operator::Reverse, apply(Operator::Reverse, value.clone()));
            prop_assert_eq!(twice, value);
        }

        #[test]
        fn prop_trunc_then_last_rebuilds(items in prop::collection::vec(any::<i64>(), 2..20)) {
            let value = Value::list(items.clone());
            let Value::Multi(mut front) = apply(Operator::Trunc, value.clone()) else {
                return Err(TestCaseError::fail("trunc of a long list is a list"));
            };
            front.push(apply(Operator::Last, value.clone()));
            prop_assert_eq!(Value::Multi(front), value);
        }
    }
}
