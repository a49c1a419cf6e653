//! Per-type method tables. Attribute access resolves only through these.

use std::cmp::Ordering;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::builtins::{Args, collect_items, pairs_into_map};
use crate::error::{Fault, FaultKind};
use crate::format::str_format;
use crate::interp::{Interpreter, scan_cost};
use crate::ops::ensure_len;
use crate::value::{
    BoundMethod, DictRef, Key, ListRef, SetRef, Value, compare, position_equal, values_equal,
};

const STR_METHODS: &[&str] = &[
    "upper", "lower", "strip", "lstrip", "rstrip", "split", "join", "replace", "startswith",
    "endswith", "title", "capitalize", "find", "count", "isdigit", "isalpha", "format", "index",
    "isalnum", "isspace", "isupper", "islower", "zfill", "ljust", "rjust", "center",
];

const LIST_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "index", "count", "sort", "reverse", "clear",
    "copy",
];

const DICT_METHODS: &[&str] = &[
    "get", "keys", "values", "items", "pop", "update", "clear", "copy", "setdefault",
];

const SET_METHODS: &[&str] = &[
    "add", "remove", "discard", "clear", "copy", "union", "intersection", "difference",
];

fn table(receiver: &Value) -> &'static [&'static str] {
    match receiver {
        Value::Str(_) => STR_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Set(_) => SET_METHODS,
        _ => &[],
    }
}

/// `receiver.name`, bound for a later call.
///
/// # Errors
///
/// Returns an `AttributeError` fault for names outside the receiver's table.
pub(crate) fn bind(receiver: &Value, name: &str) -> Result<Value, Fault> {
    let found = table(receiver).iter().copied().find(|candidate| *candidate == name);
    match found {
        Some(name) => Ok(Value::Method(Rc::new(BoundMethod {
            receiver: receiver.clone(),
            name,
        }))),
        None => Err(Fault::new(
            FaultKind::AttributeError,
            format!(
                "'{}' object has no attribute '{name}'",
                receiver.type_name()
            ),
        )),
    }
}

/// Methods whose result is a fresh container sized by the receiver.
const BUILDERS: &[&str] = &[
    "split", "copy", "keys", "values", "items", "union", "intersection", "difference",
];

/// Steps billed up front for methods that walk their receiver.
fn receiver_cost(receiver: &Value, name: &str) -> u64 {
    let walks = match receiver {
        Value::Str(_) => true,
        Value::List(_) => !matches!(name, "append" | "pop" | "clear"),
        Value::Dict(_) | Value::Set(_) => BUILDERS.contains(&name),
        _ => false,
    };
    if walks { scan_cost(receiver) } else { 0 }
}

/// # Errors
///
/// Returns the fault the method raises for its arguments.
pub(crate) fn call(
    interp: &mut Interpreter,
    method: &BoundMethod,
    positional: Vec<Value>,
    keywords: Vec<(Rc<str>, Value)>,
) -> Result<Value, Fault> {
    interp.charge(receiver_cost(&method.receiver, method.name))?;
    let mut args = Args::new(method.name, positional, keywords);
    let value = match &method.receiver {
        Value::Str(s) => str_method(interp, s, method.name, &mut args),
        Value::List(list) => list_method(interp, list, method.name, &mut args),
        Value::Dict(map) => dict_method(interp, map, method.name, &mut args),
        Value::Set(set) => set_method(interp, set, method.name, &mut args),
        other => Err(Fault::new(
            FaultKind::AttributeError,
            format!(
                "'{}' object has no attribute '{}'",
                other.type_name(),
                method.name
            ),
        )),
    }?;
    if BUILDERS.contains(&method.name) {
        interp.charge_output(&value)?;
    }
    Ok(value)
}

fn expect_str<'a>(value: &'a Value, what: &str) -> Result<&'a str, Fault> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(Fault::type_error(format!(
            "{what} must be str, not {}",
            other.type_name()
        ))),
    }
}

fn optional_str(value: Option<Value>, what: &str) -> Result<Option<Rc<str>>, Fault> {
    match &value {
        None | Some(Value::None) => Ok(None),
        Some(Value::Str(s)) => Ok(Some(Rc::clone(s))),
        Some(other) => Err(Fault::type_error(format!(
            "{what} must be str or None, not {}",
            other.type_name()
        ))),
    }
}

fn int_arg(value: &Value) -> Result<i64, Fault> {
    value.as_int().ok_or_else(|| {
        Fault::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Normalises a possibly negative index against `len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = to_i64(len);
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn char_index(haystack: &str, byte_idx: usize) -> i64 {
    to_i64(haystack[..byte_idx].chars().count())
}

// ─── str ───────────────────────────────────────────────────────────────────

fn str_method(
    interp: &mut Interpreter,
    s: &Rc<str>,
    name: &str,
    args: &mut Args,
) -> Result<Value, Fault> {
    let max = interp.max_collection_len();
    if name == "format" {
        let keywords = args.take_keywords();
        return Ok(Value::from(str_format(s, args.positional(), &keywords)?));
    }
    if name == "split" {
        let sep = optional_str(args.param(0, "sep"), "sep")?;
        let maxsplit = args.param(1, "maxsplit").map(|v| int_arg(&v)).transpose()?;
        args.arity(0, 2)?;
        args.finish()?;
        return split(s, sep.as_deref(), maxsplit.unwrap_or(-1));
    }
    args.finish()?;

    match name {
        "upper" | "lower" | "title" | "capitalize" | "isdigit" | "isalpha" | "isalnum"
        | "isspace" | "isupper" | "islower" => {
            args.arity(0, 0)?;
            Ok(match name {
                "upper" => Value::from(s.to_uppercase()),
                "lower" => Value::from(s.to_lowercase()),
                "title" => Value::from(title_case(s)),
                "capitalize" => {
                    let mut chars = s.chars();
                    let capitalized = match chars.next() {
                        Some(first) => {
                            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                        }
                        None => String::new(),
                    };
                    Value::from(capitalized)
                }
                "isdigit" => Value::Bool(!s.is_empty() && s.chars().all(char::is_numeric)),
                "isalpha" => Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic)),
                "isalnum" => Value::Bool(!s.is_empty() && s.chars().all(char::is_alphanumeric)),
                "isspace" => Value::Bool(!s.is_empty() && s.chars().all(char::is_whitespace)),
                "isupper" => Value::Bool(
                    s.chars().any(char::is_uppercase) && !s.chars().any(char::is_lowercase),
                ),
                _ => Value::Bool(
                    s.chars().any(char::is_lowercase) && !s.chars().any(char::is_uppercase),
                ),
            })
        }
        "strip" | "lstrip" | "rstrip" => {
            args.arity(0, 1)?;
            let chars = optional_str(args.get(0).cloned(), "strip arg")?;
            let strip_set = |c: char| match &chars {
                Some(set) => set.contains(c),
                None => c.is_whitespace(),
            };
            let stripped = match name {
                "strip" => s.trim_matches(strip_set),
                "lstrip" => s.trim_start_matches(strip_set),
                _ => s.trim_end_matches(strip_set),
            };
            Ok(Value::from(stripped))
        }
        "join" => {
            args.arity(1, 1)?;
            let items = collect_items(interp, &args.positional()[0])?;
            let mut parts = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                match item {
                    Value::Str(part) => parts.push(part.to_string()),
                    other => {
                        return Err(Fault::type_error(format!(
                            "sequence item {idx}: expected str instance, {} found",
                            other.type_name()
                        )));
                    }
                }
            }
            let joined = parts.join(&**s);
            ensure_len(joined.len(), max)?;
            Ok(Value::from(joined))
        }
        "replace" => {
            args.arity(2, 3)?;
            let old = expect_str(&args.positional()[0], "replace() argument 1")?;
            let new = expect_str(&args.positional()[1], "replace() argument 2")?;
            let count = args.get(2).map(int_arg).transpose()?.unwrap_or(-1);
            let occurrences = if old.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(old).count()
            };
            let estimate = s.len() + occurrences.saturating_mul(new.len());
            ensure_len(estimate, max)?;
            let replaced = match usize::try_from(count) {
                Ok(count) => s.replacen(old, new, count),
                Err(_) => s.replace(old, new),
            };
            Ok(Value::from(replaced))
        }
        "startswith" | "endswith" => {
            args.arity(1, 1)?;
            let candidates: Vec<Value> = match &args.positional()[0] {
                Value::Tuple(items) => items.as_ref().clone(),
                other => vec![other.clone()],
            };
            let mut matched = false;
            for candidate in &candidates {
                let affix = expect_str(candidate, &format!("{name} first arg"))?;
                matched |= if name == "startswith" {
                    s.starts_with(affix)
                } else {
                    s.ends_with(affix)
                };
            }
            Ok(Value::Bool(matched))
        }
        "find" | "index" => {
            args.arity(1, 1)?;
            let needle = expect_str(&args.positional()[0], "must be str")?;
            match s.find(needle) {
                Some(byte_idx) => Ok(Value::Int(char_index(s, byte_idx))),
                None if name == "find" => Ok(Value::Int(-1)),
                None => Err(Fault::value_error("substring not found")),
            }
        }
        "count" => {
            args.arity(1, 1)?;
            let needle = expect_str(&args.positional()[0], "must be str")?;
            let count = if needle.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(needle).count()
            };
            Ok(Value::Int(to_i64(count)))
        }
        "zfill" => {
            args.arity(1, 1)?;
            let width = usize::try_from(int_arg(&args.positional()[0])?).unwrap_or(0);
            ensure_len(width, max)?;
            let len = s.chars().count();
            if len >= width {
                return Ok(Value::Str(Rc::clone(s)));
            }
            let (sign, digits) = match s.chars().next() {
                Some(c @ ('+' | '-')) => (c.to_string(), &s[1..]),
                _ => (String::new(), &s[..]),
            };
            Ok(Value::from(format!("{sign}{}{digits}", "0".repeat(width - len))))
        }
        "ljust" | "rjust" | "center" => {
            args.arity(1, 2)?;
            let width = usize::try_from(int_arg(&args.positional()[0])?).unwrap_or(0);
            ensure_len(width, max)?;
            let fill = match args.get(1) {
                Some(value) => {
                    let fill = expect_str(value, "fill character")?;
                    let mut chars = fill.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => c,
                        _ => {
                            return Err(Fault::type_error(
                                "The fill character must be exactly one character long",
                            ));
                        }
                    }
                }
                None => ' ',
            };
            let len = s.chars().count();
            if len >= width {
                return Ok(Value::Str(Rc::clone(s)));
            }
            let missing = width - len;
            let (left, right) = match name {
                "ljust" => (0, missing),
                "rjust" => (missing, 0),
                _ => {
                    let left = missing / 2 + (missing & width & 1);
                    (left, missing - left)
                }
            };
            let pad = |n: usize| fill.to_string().repeat(n);
            Ok(Value::from(format!("{}{s}{}", pad(left), pad(right))))
        }
        _ => Err(unknown_method("str", name)),
    }
}

fn unknown_method(type_name: &str, name: &str) -> Fault {
    Fault::new(
        FaultKind::AttributeError,
        format!("'{type_name}' object has no attribute '{name}'"),
    )
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_cased = false;
    for ch in s.chars() {
        if previous_cased {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        previous_cased = ch.is_alphabetic();
    }
    out
}

fn split(s: &str, sep: Option<&str>, maxsplit: i64) -> Result<Value, Fault> {
    let limit = usize::try_from(maxsplit).ok();
    let parts: Vec<Value> = match sep {
        Some("") => return Err(Fault::value_error("empty separator")),
        Some(sep) => match limit {
            Some(limit) => s.splitn(limit + 1, sep).map(Value::from).collect(),
            None => s.split(sep).map(Value::from).collect(),
        },
        None => {
            let mut parts = Vec::new();
            let mut rest = s.trim_start();
            while !rest.is_empty() {
                if limit.is_some_and(|limit| parts.len() >= limit) {
                    parts.push(Value::from(rest));
                    break;
                }
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                parts.push(Value::from(&rest[..end]));
                rest = rest[end..].trim_start();
            }
            parts
        }
    };
    Ok(Value::list(parts))
}

// ─── list ──────────────────────────────────────────────────────────────────

fn list_method(
    interp: &mut Interpreter,
    list: &ListRef,
    name: &str,
    args: &mut Args,
) -> Result<Value, Fault> {
    let max = interp.max_collection_len();
    if name == "sort" {
        let key = args.keyword("key").filter(|k| !matches!(k, Value::None));
        let reverse = args.keyword("reverse").is_some_and(|r| r.truthy());
        args.arity(0, 0)?;
        args.finish()?;
        return sort(interp, list, key, reverse).map(|()| Value::None);
    }
    args.finish()?;

    match name {
        "append" => {
            args.arity(1, 1)?;
            let mut items = list.borrow_mut();
            ensure_len(items.len() + 1, max)?;
            items.push(args.positional()[0].clone());
            Ok(Value::None)
        }
        "extend" => {
            args.arity(1, 1)?;
            let extra = collect_items(interp, &args.positional()[0])?;
            let mut items = list.borrow_mut();
            ensure_len(items.len() + extra.len(), max)?;
            items.extend(extra);
            Ok(Value::None)
        }
        "insert" => {
            args.arity(2, 2)?;
            let index = int_arg(&args.positional()[0])?;
            let mut items = list.borrow_mut();
            ensure_len(items.len() + 1, max)?;
            let len = to_i64(items.len());
            let index = if index < 0 { (index + len).max(0) } else { index.min(len) };
            items.insert(usize::try_from(index).unwrap_or(0), args.positional()[1].clone());
            Ok(Value::None)
        }
        "pop" => {
            args.arity(0, 1)?;
            let index = args.get(0).map(int_arg).transpose()?.unwrap_or(-1);
            let mut items = list.borrow_mut();
            if items.is_empty() {
                return Err(Fault::new(FaultKind::IndexError, "pop from empty list"));
            }
            let idx = resolve_index(index, items.len())
                .ok_or_else(|| Fault::new(FaultKind::IndexError, "pop index out of range"))?;
            Ok(items.remove(idx))
        }
        "remove" => {
            args.arity(1, 1)?;
            let target = &args.positional()[0];
            let found = position_equal(&list.borrow(), target)?;
            match found {
                Some(idx) => {
                    list.borrow_mut().remove(idx);
                    Ok(Value::None)
                }
                None => Err(Fault::value_error("list.remove(x): x not in list")),
            }
        }
        "index" => {
            args.arity(1, 1)?;
            let target = &args.positional()[0];
            let found = position_equal(&list.borrow(), target)?;
            found
                .map(|idx| Value::Int(to_i64(idx)))
                .ok_or_else(|| Fault::value_error(format!("{} is not in list", target.repr())))
        }
        "count" => {
            args.arity(1, 1)?;
            let target = &args.positional()[0];
            let mut count = 0;
            for item in list.borrow().iter() {
                if values_equal(item, target)? {
                    count += 1;
                }
            }
            Ok(Value::Int(to_i64(count)))
        }
        "reverse" => {
            args.arity(0, 0)?;
            list.borrow_mut().reverse();
            Ok(Value::None)
        }
        "clear" => {
            args.arity(0, 0)?;
            list.borrow_mut().clear();
            Ok(Value::None)
        }
        "copy" => {
            args.arity(0, 0)?;
            Ok(Value::list(list.borrow().clone()))
        }
        _ => Err(unknown_method("list", name)),
    }
}

/// Stable sort; the list reads as empty while keys are computed.
fn sort(
    interp: &mut Interpreter,
    list: &ListRef,
    key: Option<Value>,
    reverse: bool,
) -> Result<(), Fault> {
    let items = std::mem::take(&mut *list.borrow_mut());
    let len = u64::try_from(items.len()).unwrap_or(u64::MAX);
    if let Err(fault) = interp.charge(len.saturating_mul(u64::from(len.max(1).ilog2()))) {
        restore(list, items);
        return Err(fault);
    }
    let ranks = match &key {
        Some(func) => {
            let mut ranks = Vec::with_capacity(items.len());
            for item in &items {
                match interp.call_value(func, vec![item.clone()], Vec::new()) {
                    Ok(rank) => ranks.push(rank),
                    Err(fault) => {
                        restore(list, items);
                        return Err(fault);
                    }
                }
            }
            ranks
        }
        None => items.clone(),
    };
    let mut keyed: Vec<(Value, Value)> = ranks.into_iter().zip(items).collect();

    if reverse {
        keyed.reverse();
    }
    let mut failure: Option<Fault> = None;
    keyed.sort_by(|(a, _), (b, _)| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        match compare(a, b, "<") {
            Ok(ordering) => ordering.unwrap_or(Ordering::Equal),
            Err(fault) => {
                failure = Some(fault);
                Ordering::Equal
            }
        }
    });
    if reverse {
        keyed.reverse();
    }
    restore(list, keyed.into_iter().map(|(_, item)| item).collect());
    failure.map_or(Ok(()), Err)
}

/// Puts `sorted` back, keeping anything appended by a key function.
fn restore(list: &ListRef, sorted: Vec<Value>) {
    let mut items = list.borrow_mut();
    let appended = std::mem::replace(&mut *items, sorted);
    items.extend(appended);
}

// ─── dict ──────────────────────────────────────────────────────────────────

fn dict_method(
    interp: &mut Interpreter,
    map: &DictRef,
    name: &str,
    args: &mut Args,
) -> Result<Value, Fault> {
    if name == "update" {
        args.arity(0, 1)?;
        let mut entries = indexmap::IndexMap::new();
        if let Some(source) = args.get(0).cloned() {
            pairs_into_map(interp, &source, &mut entries)?;
        }
        for (key, value) in args.take_keywords() {
            entries.insert(Key::Str(key), value);
        }
        let mut target = map.borrow_mut();
        target.extend(entries);
        ensure_len(target.len(), interp.max_collection_len())?;
        return Ok(Value::None);
    }
    args.finish()?;

    let missing_key = |key: &Value| Fault::new(FaultKind::KeyError, key.repr());
    match name {
        "get" => {
            args.arity(1, 2)?;
            let key = Key::from_value(&args.positional()[0])?;
            let default = args.get(1).cloned().unwrap_or(Value::None);
            Ok(map.borrow().get(&key).cloned().unwrap_or(default))
        }
        "keys" | "values" | "items" => {
            args.arity(0, 0)?;
            let map = map.borrow();
            let items = match name {
                "keys" => map.keys().map(Key::to_value).collect(),
                "values" => map.values().cloned().collect(),
                _ => map
                    .iter()
                    .map(|(key, value)| Value::tuple(vec![key.to_value(), value.clone()]))
                    .collect(),
            };
            Ok(Value::list(items))
        }
        "pop" => {
            args.arity(1, 2)?;
            let key_value = &args.positional()[0];
            let key = Key::from_value(key_value)?;
            let removed = map.borrow_mut().shift_remove(&key);
            match (removed, args.get(1)) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(missing_key(key_value)),
            }
        }
        "setdefault" => {
            args.arity(1, 2)?;
            let key = Key::from_value(&args.positional()[0])?;
            let default = args.get(1).cloned().unwrap_or(Value::None);
            let mut map = map.borrow_mut();
            if !map.contains_key(&key) {
                ensure_len(map.len() + 1, interp.max_collection_len())?;
            }
            Ok(map.entry(key).or_insert(default).clone())
        }
        "clear" => {
            args.arity(0, 0)?;
            map.borrow_mut().clear();
            Ok(Value::None)
        }
        "copy" => {
            args.arity(0, 0)?;
            Ok(Value::dict(map.borrow().clone()))
        }
        _ => Err(unknown_method("dict", name)),
    }
}

// ─── set ───────────────────────────────────────────────────────────────────

fn set_method(
    interp: &mut Interpreter,
    set: &SetRef,
    name: &str,
    args: &mut Args,
) -> Result<Value, Fault> {
    args.finish()?;
    match name {
        "add" => {
            args.arity(1, 1)?;
            let key = Key::from_value(&args.positional()[0])?;
            let mut set = set.borrow_mut();
            if !set.contains(&key) {
                ensure_len(set.len() + 1, interp.max_collection_len())?;
            }
            set.insert(key);
            Ok(Value::None)
        }
        "remove" => {
            args.arity(1, 1)?;
            let value = &args.positional()[0];
            if set.borrow_mut().shift_remove(&Key::from_value(value)?) {
                Ok(Value::None)
            } else {
                Err(Fault::new(FaultKind::KeyError, value.repr()))
            }
        }
        "discard" => {
            args.arity(1, 1)?;
            set.borrow_mut().shift_remove(&Key::from_value(&args.positional()[0])?);
            Ok(Value::None)
        }
        "clear" => {
            args.arity(0, 0)?;
            set.borrow_mut().clear();
            Ok(Value::None)
        }
        "copy" => {
            args.arity(0, 0)?;
            Ok(Value::set(set.borrow().clone()))
        }
        "union" | "intersection" | "difference" => {
            args.arity(1, 1)?;
            let mut other = IndexSet::new();
            for item in collect_items(interp, &args.positional()[0])? {
                other.insert(Key::from_value(&item)?);
            }
            let current = set.borrow().clone();
            let result: IndexSet<Key> = match name {
                "union" => current.union(&other).cloned().collect(),
                "intersection" => current.intersection(&other).cloned().collect(),
                _ => current.difference(&other).cloned().collect(),
            };
            ensure_len(result.len(), interp.max_collection_len())?;
            Ok(Value::set(result))
        }
        _ => Err(unknown_method("set", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_respects_tables() {
        assert!(bind(&Value::from("x"), "upper").is_ok());
        let err = bind(&Value::from("x"), "__class__").unwrap_err();
        assert_eq!(err.kind(), FaultKind::AttributeError);
        assert_eq!(err.message(), "'str' object has no attribute '__class__'");
        assert!(bind(&Value::Int(1), "real").is_err());
    }

    #[test]
    fn whitespace_split_collapses_runs() {
        let parts = split("  a  b c ", None, -1).unwrap();
        assert_eq!(parts.repr(), "['a', 'b', 'c']");
        let parts = split("a b c", None, 1).unwrap();
        assert_eq!(parts.repr(), "['a', 'b c']");
        let parts = split("a,,b", Some(","), -1).unwrap();
        assert_eq!(parts.repr(), "['a', '', 'b']");
    }

    #[test]
    fn title_capitalises_words() {
        assert_eq!(title_case("hello wORLD it's"), "Hello World It'S");
    }

    #[test]
    fn negative_indices_resolve() {
        assert_eq!(resolve_index(-1, 3), Some(2));
        assert_eq!(resolve_index(3, 3), None);
        assert_eq!(resolve_index(-4, 3), None);
    }
}
