//! Indexing, slicing and item assignment.

use crate::error::{Fault, FaultKind};
use crate::ops::ensure_len;
use crate::value::{Key, Value, range_len};

/// An evaluated subscript: `x[i]` or `x[a:b:c]`.
#[derive(Debug, Clone)]
pub(crate) enum Selector {
    Item(Value),
    Slice {
        lower: Option<i64>,
        upper: Option<i64>,
        step: Option<i64>,
    },
}

/// Bounds of a slice after clamping against a length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: i64,
    stop: i64,
    step: i64,
}

impl Span {
    fn resolve(len: usize, lower: Option<i64>, upper: Option<i64>, step: Option<i64>) -> Result<Self, Fault> {
        let step = step.unwrap_or(1);
        if step == 0 {
            return Err(Fault::value_error("slice step cannot be zero"));
        }
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let clamp = |bound: i64| {
            if bound < 0 {
                let shifted = bound.saturating_add(len);
                if shifted < 0 {
                    if step < 0 { -1 } else { 0 }
                } else {
                    shifted
                }
            } else if bound >= len {
                if step < 0 { len - 1 } else { len }
            } else {
                bound
            }
        };
        let (default_start, default_stop) = if step < 0 { (len - 1, -1) } else { (0, len) };
        Ok(Self {
            start: lower.map_or(default_start, clamp),
            stop: upper.map_or(default_stop, clamp),
            step,
        })
    }

    fn len(self) -> usize {
        range_len(self.start, self.stop, self.step)
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn indices(self) -> impl Iterator<Item = usize> {
        (0..self.len()).map(move |k| (self.start + k as i64 * self.step) as usize)
    }
}

fn resolve_item(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn int_index(container: &Value, index: &Value) -> Result<i64, Fault> {
    index.as_int().ok_or_else(|| {
        let owner = match container {
            Value::Str(_) => "string",
            other => other.type_name(),
        };
        Fault::type_error(format!(
            "{owner} indices must be integers or slices, not {}",
            index.type_name()
        ))
    })
}

fn out_of_range(container: &Value) -> Fault {
    let owner = match container {
        Value::Str(_) => "string",
        other => other.type_name(),
    };
    Fault::new(FaultKind::IndexError, format!("{owner} index out of range"))
}

fn key_error(key: &Value) -> Fault {
    Fault::new(FaultKind::KeyError, key.repr())
}

/// `object[selector]`.
///
/// # Errors
///
/// Returns `IndexError`, `KeyError` or `TypeError` faults as Python would.
pub(crate) fn get(object: &Value, selector: &Selector) -> Result<Value, Fault> {
    match (object, selector) {
        (Value::Dict(map), Selector::Item(key)) => map
            .borrow()
            .get(&Key::from_value(key)?)
            .cloned()
            .ok_or_else(|| key_error(key)),
        (Value::Dict(_), Selector::Slice { .. }) => {
            Err(Fault::type_error("unhashable type: 'slice'"))
        }
        (Value::Str(s), Selector::Item(index)) => {
            let index = int_index(object, index)?;
            if s.is_ascii() {
                let idx = resolve_item(index, s.len()).ok_or_else(|| out_of_range(object))?;
                return Ok(Value::from(&s[idx..=idx]));
            }
            let chars: Vec<char> = s.chars().collect();
            let idx = resolve_item(index, chars.len()).ok_or_else(|| out_of_range(object))?;
            Ok(Value::from(chars[idx].to_string()))
        }
        (Value::Str(s), Selector::Slice { lower, upper, step }) => {
            let chars: Vec<char> = s.chars().collect();
            let span = Span::resolve(chars.len(), *lower, *upper, *step)?;
            Ok(Value::from(span.indices().map(|idx| chars[idx]).collect::<String>()))
        }
        (Value::List(items), _) => {
            let items = items.borrow();
            select(object, &items, selector).map(|picked| match picked {
                Picked::One(value) => value,
                Picked::Many(values) => Value::list(values),
            })
        }
        (Value::Tuple(items), _) => select(object, items, selector).map(|picked| match picked {
            Picked::One(value) => value,
            Picked::Many(values) => Value::tuple(values),
        }),
        (Value::Range { start, stop, step }, Selector::Item(index)) => {
            let len = range_len(*start, *stop, *step);
            let idx = resolve_item(int_index(object, index)?, len).ok_or_else(|| {
                Fault::new(FaultKind::IndexError, "range object index out of range")
            })?;
            let offset = i64::try_from(idx).map_err(|_| Fault::overflow())?;
            offset
                .checked_mul(*step)
                .and_then(|delta| start.checked_add(delta))
                .map(Value::Int)
                .ok_or_else(Fault::overflow)
        }
        (Value::Range { start, stop, step }, Selector::Slice { lower, upper, step: by }) => {
            let span = Span::resolve(range_len(*start, *stop, *step), *lower, *upper, *by)?;
            let at = |k: i64| k.checked_mul(*step).and_then(|delta| start.checked_add(delta));
            match (at(span.start), at(span.stop), step.checked_mul(span.step)) {
                (Some(start), Some(stop), Some(step)) => Ok(Value::Range { start, stop, step }),
                _ => Err(Fault::overflow()),
            }
        }
        _ => Err(Fault::type_error(format!(
            "'{}' object is not subscriptable",
            object.type_name()
        ))),
    }
}

enum Picked {
    One(Value),
    Many(Vec<Value>),
}

fn select(object: &Value, items: &[Value], selector: &Selector) -> Result<Picked, Fault> {
    match selector {
        Selector::Item(index) => {
            let idx = resolve_item(int_index(object, index)?, items.len())
                .ok_or_else(|| out_of_range(object))?;
            Ok(Picked::One(items[idx].clone()))
        }
        Selector::Slice { lower, upper, step } => {
            let span = Span::resolve(items.len(), *lower, *upper, *step)?;
            Ok(Picked::Many(span.indices().map(|idx| items[idx].clone()).collect()))
        }
    }
}

/// `object[selector] = value`.
///
/// # Errors
///
/// Returns a `TypeError` fault for immutable containers and `IndexError` or
/// `ValueError` faults for bad positions.
pub(crate) fn set(object: &Value, selector: &Selector, value: Value, max_len: usize) -> Result<(), Fault> {
    match (object, selector) {
        (Value::Dict(map), Selector::Item(key)) => {
            let key = Key::from_value(key)?;
            let mut map = map.borrow_mut();
            if !map.contains_key(&key) {
                ensure_len(map.len() + 1, max_len)?;
            }
            map.insert(key, value);
            Ok(())
        }
        (Value::List(items), Selector::Item(index)) => {
            let index = int_index(object, index)?;
            let mut items = items.borrow_mut();
            let idx = resolve_item(index, items.len()).ok_or_else(|| {
                Fault::new(FaultKind::IndexError, "list assignment index out of range")
            })?;
            items[idx] = value;
            Ok(())
        }
        (Value::List(items), Selector::Slice { lower, upper, step }) => {
            if let Some(len) = value.len() {
                ensure_len(len, max_len)?;
            }
            let replacement: Vec<Value> = value.iter()?.collect();
            let mut items = items.borrow_mut();
            let span = Span::resolve(items.len(), *lower, *upper, *step)?;
            if span.step == 1 {
                let start = usize::try_from(span.start).unwrap_or(0);
                let stop = usize::try_from(span.stop).unwrap_or(0).max(start);
                ensure_len(items.len() - (stop - start) + replacement.len(), max_len)?;
                items.splice(start..stop, replacement);
                return Ok(());
            }
            if span.len() != replacement.len() {
                return Err(Fault::value_error(format!(
                    "attempt to assign sequence of size {} to extended slice of size {}",
                    replacement.len(),
                    span.len()
                )));
            }
            for (idx, item) in span.indices().zip(replacement) {
                items[idx] = item;
            }
            Ok(())
        }
        _ => Err(Fault::type_error(format!(
            "'{}' object does not support item assignment",
            object.type_name()
        ))),
    }
}

/// `del object[selector]`.
///
/// # Errors
///
/// Returns `KeyError`, `IndexError` or `TypeError` faults as Python would.
pub(crate) fn delete(object: &Value, selector: &Selector) -> Result<(), Fault> {
    match (object, selector) {
        (Value::Dict(map), Selector::Item(key)) => map
            .borrow_mut()
            .shift_remove(&Key::from_value(key)?)
            .map(|_| ())
            .ok_or_else(|| key_error(key)),
        (Value::List(items), Selector::Item(index)) => {
            let index = int_index(object, index)?;
            let mut items = items.borrow_mut();
            let idx = resolve_item(index, items.len()).ok_or_else(|| {
                Fault::new(FaultKind::IndexError, "list assignment index out of range")
            })?;
            items.remove(idx);
            Ok(())
        }
        (Value::List(items), Selector::Slice { lower, upper, step }) => {
            let mut items = items.borrow_mut();
            let span = Span::resolve(items.len(), *lower, *upper, *step)?;
            let mut doomed = vec![false; items.len()];
            for idx in span.indices() {
                doomed[idx] = true;
            }
            let mut position = 0;
            items.retain(|_| {
                let keep = !doomed[position];
                position += 1;
                keep
            });
            Ok(())
        }
        _ => Err(Fault::type_error(format!(
            "'{}' object doesn't support item deletion",
            object.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(lower: Option<i64>, upper: Option<i64>, step: Option<i64>) -> Selector {
        Selector::Slice { lower, upper, step }
    }

    fn numbers() -> Value {
        Value::list((0..6).map(Value::Int).collect())
    }

    #[test]
    fn slices_follow_python_clamping() {
        let list = numbers();
        assert_eq!(get(&list, &slice(Some(1), Some(4), None)).unwrap().repr(), "[1, 2, 3]");
        assert_eq!(get(&list, &slice(None, None, Some(-1))).unwrap().repr(), "[5, 4, 3, 2, 1, 0]");
        assert_eq!(get(&list, &slice(Some(-2), None, None)).unwrap().repr(), "[4, 5]");
        assert_eq!(get(&list, &slice(Some(-100), Some(100), Some(2))).unwrap().repr(), "[0, 2, 4]");
        assert_eq!(get(&list, &slice(Some(4), Some(1), None)).unwrap().repr(), "[]");
        let text = Value::from("héllo");
        assert_eq!(get(&text, &slice(None, None, Some(-1))).unwrap().repr(), "'olléh'");
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = get(&numbers(), &slice(None, None, Some(0))).unwrap_err();
        assert_eq!(err.kind(), FaultKind::ValueError);
    }

    #[test]
    fn negative_item_indices() {
        assert_eq!(get(&numbers(), &Selector::Item(Value::Int(-1))).unwrap().repr(), "5");
        let err = get(&Value::from("abc"), &Selector::Item(Value::Int(3))).unwrap_err();
        assert_eq!(err.message(), "string index out of range");
    }

    #[test]
    fn range_slicing_stays_lazy() {
        let range = Value::Range { start: 0, stop: 10, step: 1 };
        let sliced = get(&range, &slice(Some(2), None, Some(3))).unwrap();
        assert_eq!(sliced.iter().unwrap().map(|v| v.repr()).collect::<Vec<_>>(), ["2", "5", "8"]);
    }

    #[test]
    fn slice_assignment_resizes() {
        let list = numbers();
        set(&list, &slice(Some(1), Some(5), None), Value::list(vec![Value::Int(9)]), 100).unwrap();
        assert_eq!(list.repr(), "[0, 9, 5]");
        let err = set(&list, &slice(None, None, Some(2)), Value::list(Vec::new()), 100).unwrap_err();
        assert_eq!(err.kind(), FaultKind::ValueError);
    }

    #[test]
    fn deletion() {
        let list = numbers();
        delete(&list, &slice(None, None, Some(2))).unwrap();
        assert_eq!(list.repr(), "[1, 3, 5]");
        let err = delete(&Value::tuple(Vec::new()), &Selector::Item(Value::Int(0))).unwrap_err();
        assert_eq!(err.kind(), FaultKind::TypeError);
    }
}
