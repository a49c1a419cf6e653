//! Runtime values of the interpreter.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::ast::FunctionDef;
use crate::builtins::Builtin;
use crate::error::{Fault, FaultKind};

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type DictRef = Rc<RefCell<IndexMap<Key, Value>>>;
pub type SetRef = Rc<RefCell<IndexSet<Key>>>;

/// Container depth past which reprs elide and comparisons or hashing fault.
const MAX_NESTING: usize = 500;

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(ListRef),
    Tuple(Rc<Vec<Value>>),
    Dict(DictRef),
    Set(SetRef),
    Range { start: i64, stop: i64, step: i64 },
    Function(Rc<Function>),
    Builtin(Builtin),
    Method(Rc<BoundMethod>),
}

/// A user-defined function with defaults evaluated at definition time.
#[derive(Debug)]
pub struct Function {
    pub def: Rc<FunctionDef>,
    pub defaults: Vec<Option<Value>>,
}

/// A method looked up on a receiver, e.g. `names.append`.
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub name: &'static str,
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

// Uniquely owned children move onto a heap worklist; release never recurses
// more than one level.
impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.release_children(&mut pending);
        while let Some(mut value) = pending.pop() {
            value.release_children(&mut pending);
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(Rc::from(value))
    }
}

impl Value {
    #[must_use]
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn tuple(items: Vec<Value>) -> Self {
        Self::Tuple(Rc::new(items))
    }

    #[must_use]
    pub fn dict(entries: IndexMap<Key, Value>) -> Self {
        Self::Dict(Rc::new(RefCell::new(entries)))
    }

    #[must_use]
    pub fn set(items: IndexSet<Key>) -> Self {
        Self::Set(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::Range { .. } => "range",
            Self::Function(_) => "function",
            Self::Builtin(_) => "builtin_function_or_method",
            Self::Method(_) => "method",
        }
    }

    fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Tuple(_) | Self::Dict(_))
    }

    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.borrow().is_empty(),
            Self::Tuple(items) => !items.is_empty(),
            Self::Dict(map) => !map.borrow().is_empty(),
            Self::Set(set) => !set.borrow().is_empty(),
            Self::Range { start, stop, step } => range_len(*start, *stop, *step) > 0,
            Self::Function(_) | Self::Builtin(_) | Self::Method(_) => true,
        }
    }

    /// Element count for sized values.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        Some(match self {
            Self::Str(s) => s.chars().count(),
            Self::List(items) => items.borrow().len(),
            Self::Tuple(items) => items.len(),
            Self::Dict(map) => map.borrow().len(),
            Self::Set(set) => set.borrow().len(),
            Self::Range { start, stop, step } => range_len(*start, *stop, *step),
            _ => return None,
        })
    }

    pub(crate) fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    /// `str(value)`.
    #[must_use]
    pub fn to_str(&self) -> String {
        match self {
            Self::Str(s) => s.to_string(),
            _ => self.repr(),
        }
    }

    /// `repr(value)`; self-referencing containers print as `[...]`.
    #[must_use]
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out, &mut Vec::new());
        out
    }

    fn release_children(&mut self, pending: &mut Vec<Value>) {
        match self {
            Self::List(items) => {
                if let Some(cell) = Rc::get_mut(items) {
                    pending.append(cell.get_mut());
                }
            }
            Self::Tuple(items) => {
                if let Some(items) = Rc::get_mut(items) {
                    pending.append(items);
                }
            }
            Self::Dict(map) => {
                if let Some(cell) = Rc::get_mut(map) {
                    pending.extend(cell.get_mut().drain(..).map(|(_, value)| value));
                }
            }
            Self::Function(function) => {
                if let Some(function) = Rc::get_mut(function) {
                    pending.extend(function.defaults.drain(..).flatten());
                }
            }
            Self::Method(method) => {
                if let Some(method) = Rc::get_mut(method) {
                    pending.push(std::mem::replace(&mut method.receiver, Self::None));
                }
            }
            _ => {}
        }
    }

    fn write_repr(&self, out: &mut String, seen: &mut Vec<usize>) {
        if seen.len() >= MAX_NESTING && self.is_container() {
            out.push_str("...");
            return;
        }
        match self {
            Self::None => out.push_str("None"),
            Self::Bool(true) => out.push_str("True"),
            Self::Bool(false) => out.push_str("False"),
            Self::Int(i) => out.push_str(&i.to_string()),
            Self::Float(f) => out.push_str(&format_float(*f)),
            Self::Str(s) => out.push_str(&quote_str(s)),
            Self::List(items) => {
                let id = Rc::as_ptr(items).cast::<()>() as usize;
                if seen.contains(&id) {
                    out.push_str("[...]");
                    return;
                }
                seen.push(id);
                out.push('[');
                write_items(out, seen, items.borrow().iter());
                out.push(']');
                seen.pop();
            }
            Self::Tuple(items) => {
                seen.push(Rc::as_ptr(items).cast::<()>() as usize);
                out.push('(');
                write_items(out, seen, items.iter());
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
                seen.pop();
            }
            Self::Dict(map) => {
                let id = Rc::as_ptr(map).cast::<()>() as usize;
                if seen.contains(&id) {
                    out.push_str("{...}");
                    return;
                }
                seen.push(id);
                out.push('{');
                for (idx, (key, value)) in map.borrow().iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    key.to_value().write_repr(out, seen);
                    out.push_str(": ");
                    value.write_repr(out, seen);
                }
                out.push('}');
                seen.pop();
            }
            Self::Set(set) => {
                let set = set.borrow();
                if set.is_empty() {
                    out.push_str("set()");
                    return;
                }
                out.push('{');
                let values: Vec<Value> = set.iter().map(Key::to_value).collect();
                write_items(out, seen, values.iter());
                out.push('}');
            }
            Self::Range { start, stop, step } => {
                if *step == 1 {
                    out.push_str(&format!("range({start}, {stop})"));
                } else {
                    out.push_str(&format!("range({start}, {stop}, {step})"));
                }
            }
            Self::Function(func) => out.push_str(&format!("<function {}>", func.def.name)),
            Self::Builtin(builtin) => {
                out.push_str(&format!("<built-in function {}>", builtin.name()));
            }
            Self::Method(method) => out.push_str(&format!(
                "<built-in method {} of {} object>",
                method.name,
                method.receiver.type_name()
            )),
        }
    }

    /// Snapshot iterator; ranges stay lazy.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` fault for values that are not iterable.
    pub(crate) fn iter(&self) -> Result<ValueIter, Fault> {
        let items: Vec<Value> = match self {
            Self::Range { start, stop, step } => {
                return Ok(ValueIter::Range {
                    next: *start,
                    stop: *stop,
                    step: *step,
                });
            }
            Self::Str(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
            Self::List(items) => items.borrow().clone(),
            Self::Tuple(items) => items.as_ref().clone(),
            Self::Dict(map) => map.borrow().keys().map(Key::to_value).collect(),
            Self::Set(set) => set.borrow().iter().map(Key::to_value).collect(),
            other => {
                return Err(Fault::type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                )));
            }
        };
        Ok(ValueIter::Items(items.into_iter()))
    }
}

fn write_items<'a>(out: &mut String, seen: &mut Vec<usize>, items: impl Iterator<Item = &'a Value>) {
    for (idx, item) in items.enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        item.write_repr(out, seen);
    }
}

/// Iterator over a value's elements.
pub(crate) enum ValueIter {
    Range { next: i64, stop: i64, step: i64 },
    Items(std::vec::IntoIter<Value>),
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            Self::Range { next, stop, step } => {
                let done = if *step > 0 { *next >= *stop } else { *next <= *stop };
                if done {
                    return None;
                }
                let current = *next;
                *next = next.checked_add(*step).unwrap_or(*stop);
                Some(Value::Int(current))
            }
            Self::Items(items) => items.next(),
        }
    }
}

pub(crate) fn range_len(start: i64, stop: i64, step: i64) -> usize {
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let count = if step > 0 && start < stop {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    };
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// Python's `repr` of a float.
#[must_use]
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{value:e}");
        let (mantissa, exponent) = formatted
            .split_once('e')
            .unwrap_or((formatted.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.abs());
    }
    if value.fract() == 0.0 {
        return format!("{value:.1}");
    }
    format!("{value}")
}

/// Quotes a string the way Python's `repr` does.
#[must_use]
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c < ' ' || c == '\x7f' => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

// ─── Hashing ───────────────────────────────────────────────────────────────

/// Hashable projection of a value, used for dict keys and set members.
///
/// Integral floats collapse onto `Int` so that `1.0` and `1` are one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(Rc<str>),
    Tuple(Rc<[Key]>),
}

impl Key {
    /// # Errors
    ///
    /// Returns a `TypeError` fault for mutable values and a `RecursionError`
    /// fault for tuples nested too deeply to hash.
    pub fn from_value(value: &Value) -> Result<Self, Fault> {
        Self::from_value_at(value, 0)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_value_at(value: &Value, depth: usize) -> Result<Self, Fault> {
        Ok(match value {
            Value::None => Self::None,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(i) => Self::Int(*i),
            Value::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Self::Int(*f as i64)
                } else {
                    Self::Float(f.to_bits())
                }
            }
            Value::Str(s) => Self::Str(Rc::clone(s)),
            Value::Tuple(items) => {
                if depth >= MAX_NESTING {
                    return Err(too_deep("while hashing"));
                }
                Self::Tuple(
                    items
                        .iter()
                        .map(|item| Self::from_value_at(item, depth + 1))
                        .collect::<Result<Vec<_>, _>>()?
                        .into(),
                )
            }
            other => {
                return Err(Fault::type_error(format!(
                    "unhashable type: '{}'",
                    other.type_name()
                )));
            }
        })
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::None => Value::None,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Float(bits) => Value::Float(f64::from_bits(*bits)),
            Self::Str(s) => Value::Str(Rc::clone(s)),
            Self::Tuple(items) => Value::tuple(items.iter().map(Self::to_value).collect()),
        }
    }
}

// ─── Comparison ────────────────────────────────────────────────────────────

fn too_deep(context: &str) -> Fault {
    Fault::new(
        FaultKind::RecursionError,
        format!("maximum recursion depth exceeded {context}"),
    )
}

/// `a == b`.
///
/// # Errors
///
/// Returns a `RecursionError` fault when the operands nest too deeply.
pub fn values_equal(a: &Value, b: &Value) -> Result<bool, Fault> {
    equal_at(a, b, 0)
}

fn equal_at(a: &Value, b: &Value, depth: usize) -> Result<bool, Fault> {
    if depth >= MAX_NESTING && a.is_container() && b.is_container() {
        return Err(too_deep("in comparison"));
    }
    Ok(match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            Rc::ptr_eq(x, y) || sequences_equal(&x.borrow(), &y.borrow(), depth)?
        }
        (Value::Tuple(x), Value::Tuple(y)) => Rc::ptr_eq(x, y) || sequences_equal(x, y, depth)?,
        (Value::Dict(x), Value::Dict(y)) => {
            if Rc::ptr_eq(x, y) {
                return Ok(true);
            }
            let (x, y) = (x.borrow(), y.borrow());
            if x.len() != y.len() {
                return Ok(false);
            }
            for (key, value) in x.iter() {
                match y.get(key) {
                    Some(other) if equal_at(value, other, depth + 1)? => {}
                    _ => return Ok(false),
                }
            }
            true
        }
        (Value::Set(x), Value::Set(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().all(|key| y.contains(key))
        }
        (
            Value::Range { start, stop, step },
            Value::Range {
                start: s2,
                stop: e2,
                step: st2,
            },
        ) => (start, stop, step) == (s2, e2, st2),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        (Value::Method(x), Value::Method(y)) => Rc::ptr_eq(x, y),
        (Value::Int(x), Value::Int(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => match (a.as_int(), b.as_int()) {
                (Some(i), Some(j)) => i == j,
                _ => x == y,
            },
            _ => false,
        },
    })
}

fn sequences_equal(a: &[Value], b: &[Value], depth: usize) -> Result<bool, Fault> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (x, y) in a.iter().zip(b) {
        if !equal_at(x, y, depth + 1)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Index of the first item equal to `target`.
pub(crate) fn position_equal(items: &[Value], target: &Value) -> Result<Option<usize>, Fault> {
    for (idx, item) in items.iter().enumerate() {
        if values_equal(item, target)? {
            return Ok(Some(idx));
        }
    }
    Ok(None)
}

/// `a is b`: identity for containers, equality for immutable scalars.
#[must_use]
pub fn values_identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
        (Value::Tuple(x), Value::Tuple(y)) => Rc::ptr_eq(x, y),
        (Value::Dict(x), Value::Dict(y)) => Rc::ptr_eq(x, y),
        (Value::Set(x), Value::Set(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        (Value::Method(x), Value::Method(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// Ordering for `<`, `<=`, `>` and `>=`; `None` when unordered (NaN).
///
/// # Errors
///
/// Returns a `TypeError` fault naming `symbol` for incomparable types and a
/// `RecursionError` fault when the operands nest too deeply.
pub fn compare(a: &Value, b: &Value, symbol: &str) -> Result<Option<Ordering>, Fault> {
    compare_at(a, b, symbol, 0)
}

fn compare_at(a: &Value, b: &Value, symbol: &str, depth: usize) -> Result<Option<Ordering>, Fault> {
    if depth >= MAX_NESTING && a.is_container() && b.is_container() {
        return Err(too_deep("in comparison"));
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        (Value::List(x), Value::List(y)) => {
            let (x, y) = (x.borrow().clone(), y.borrow().clone());
            compare_sequences(&x, &y, symbol, depth)
        }
        (Value::Tuple(x), Value::Tuple(y)) => compare_sequences(x, y, symbol, depth),
        _ => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => Ok(Some(x.cmp(&y))),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(x.partial_cmp(&y)),
                _ => Err(Fault::type_error(format!(
                    "'{symbol}' not supported between instances of '{}' and '{}'",
                    a.type_name(),
                    b.type_name()
                ))),
            },
        },
    }
}

fn compare_sequences(
    a: &[Value],
    b: &[Value],
    symbol: &str,
    depth: usize,
) -> Result<Option<Ordering>, Fault> {
    for (x, y) in a.iter().zip(b) {
        if !equal_at(x, y, depth + 1)? {
            return compare_at(x, y, symbol, depth + 1);
        }
    }
    Ok(Some(a.len().cmp(&b.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_print_like_python() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(-0.0), "-0.0");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn repr_quotes_strings() {
        assert_eq!(quote_str("hi"), "'hi'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("a\nb"), "'a\\nb'");
    }

    #[test]
    fn container_reprs() {
        let list = Value::list(vec![Value::Int(1), Value::from("a"), Value::None]);
        assert_eq!(list.repr(), "[1, 'a', None]");
        assert_eq!(Value::tuple(vec![Value::Int(1)]).repr(), "(1,)");
        let mut map = IndexMap::new();
        map.insert(Key::Str("k".into()), Value::Bool(true));
        assert_eq!(Value::dict(map).repr(), "{'k': True}");
        assert_eq!(Value::set(IndexSet::new()).repr(), "set()");
    }

    #[test]
    fn self_referencing_list_repr_terminates() {
        let list = Value::list(Vec::new());
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.repr(), "[[...]]");
    }

    #[test]
    fn numeric_equality_crosses_types() {
        assert!(values_equal(&Value::Int(1), &Value::Float(1.0)).unwrap());
        assert!(values_equal(&Value::Bool(true), &Value::Int(1)).unwrap());
        assert!(!values_equal(&Value::Int(1), &Value::from("1")).unwrap());
    }

    #[test]
    fn integral_float_keys_collapse() {
        assert_eq!(
            Key::from_value(&Value::Float(2.0)).unwrap(),
            Key::from_value(&Value::Int(2)).unwrap()
        );
        assert!(Key::from_value(&Value::list(Vec::new())).is_err());
    }

    #[test]
    fn ranges_iterate_lazily() {
        let collected: Vec<i64> = Value::Range {
            start: 10,
            stop: 0,
            step: -3,
        }
        .iter()
        .unwrap()
        .filter_map(|v| v.as_int())
        .collect();
        assert_eq!(collected, vec![10, 7, 4, 1]);
        assert_eq!(range_len(0, 10, 3), 4);
        assert_eq!(range_len(5, 0, 1), 0);
    }

    #[test]
    fn mixed_comparison_is_type_error() {
        let err = compare(&Value::Int(1), &Value::from("a"), "<").unwrap_err();
        assert!(err.message().contains("'int' and 'str'"));
    }

    fn nested_tuples(depth: usize) -> Value {
        let mut value = Value::tuple(Vec::new());
        for _ in 0..depth {
            value = Value::tuple(vec![value]);
        }
        value
    }

    #[test]
    fn deep_tuples_are_bounded() {
        let deep = nested_tuples(100_000);
        let text = deep.repr();
        assert!(text.starts_with("(((("));
        assert!(text.contains("..."));
        assert!(text.len() < 10 * MAX_NESTING);

        let other = nested_tuples(100_000);
        let err = values_equal(&deep, &other).unwrap_err();
        assert_eq!(err.kind(), FaultKind::RecursionError);
        let err = compare(&deep, &other, "<").unwrap_err();
        assert_eq!(err.kind(), FaultKind::RecursionError);
        let err = Key::from_value(&deep).unwrap_err();
        assert_eq!(err.kind(), FaultKind::RecursionError);

        assert!(values_equal(&nested_tuples(10), &nested_tuples(10)).unwrap());
        assert!(Key::from_value(&nested_tuples(10)).is_ok());
    }

    #[test]
    fn dropping_a_long_chain_does_not_recurse() {
        let mut head = Value::list(Vec::new());
        for _ in 0..1_000_000 {
            head = Value::list(vec![head]);
        }
        drop(head);
    }
}
