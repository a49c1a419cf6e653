//! The allow-listed builtin functions. No other global name resolves.

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::ast::BinOp;
use crate::error::{Fault, FaultKind};
use crate::interp::Interpreter;
use crate::ops::{binary_op, ensure_len};
use crate::value::{Key, Value, compare};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Input,
    Range,
    Len,
    Str,
    Int,
    Float,
    List,
    Dict,
    Set,
    Tuple,
    Sum,
    Min,
    Max,
    Abs,
    Round,
}

impl Builtin {
    pub const ALL: [Builtin; 16] = [
        Self::Print,
        Self::Input,
        Self::Range,
        Self::Len,
        Self::Str,
        Self::Int,
        Self::Float,
        Self::List,
        Self::Dict,
        Self::Set,
        Self::Tuple,
        Self::Sum,
        Self::Min,
        Self::Max,
        Self::Abs,
        Self::Round,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Input => "input",
            Self::Range => "range",
            Self::Len => "len",
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Set => "set",
            Self::Tuple => "tuple",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Abs => "abs",
            Self::Round => "round",
        }
    }

    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }
}

// ─── Argument handling ─────────────────────────────────────────────────────

/// Call arguments with the callee's name for error messages.
pub(crate) struct Args {
    name: &'static str,
    positional: Vec<Value>,
    keywords: Vec<(Rc<str>, Value)>,
}

impl Args {
    pub(crate) fn new(
        name: &'static str,
        positional: Vec<Value>,
        keywords: Vec<(Rc<str>, Value)>,
    ) -> Self {
        Self {
            name,
            positional,
            keywords,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.positional.len()
    }

    pub(crate) fn get(&self, idx: usize) -> Option<&Value> {
        self.positional.get(idx)
    }

    pub(crate) fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Positional argument `idx`, falling back to keyword `key`.
    pub(crate) fn param(&mut self, idx: usize, key: &str) -> Option<Value> {
        let keyword = self.keyword(key);
        self.positional.get(idx).cloned().or(keyword)
    }

    /// Removes and returns keyword `key`.
    pub(crate) fn keyword(&mut self, key: &str) -> Option<Value> {
        let pos = self.keywords.iter().position(|(name, _)| name.as_ref() == key)?;
        Some(self.keywords.remove(pos).1)
    }

    pub(crate) fn take_keywords(&mut self) -> Vec<(Rc<str>, Value)> {
        std::mem::take(&mut self.keywords)
    }

    pub(crate) fn arity(&self, min: usize, max: usize) -> Result<(), Fault> {
        let given = self.positional.len();
        if (min..=max).contains(&given) {
            return Ok(());
        }
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        let message = if max == 0 {
            format!("{}() takes no arguments ({given} given)", self.name)
        } else if min == max {
            format!(
                "{}() takes exactly {min} argument{} ({given} given)",
                self.name,
                plural(min)
            )
        } else if given < min {
            format!(
                "{} expected at least {min} argument{}, got {given}",
                self.name,
                plural(min)
            )
        } else {
            format!(
                "{} expected at most {max} argument{}, got {given}",
                self.name,
                plural(max)
            )
        };
        Err(Fault::type_error(message))
    }

    /// Rejects keywords nobody consumed.
    pub(crate) fn finish(&self) -> Result<(), Fault> {
        match self.keywords.first() {
            Some((key, _)) => Err(Fault::type_error(format!(
                "'{key}' is an invalid keyword argument for {}()",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

fn expect_int(value: &Value) -> Result<i64, Fault> {
    value.as_int().ok_or_else(|| {
        Fault::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

/// Materialises an iterable, charging the budget per element.
pub(crate) fn collect_items(interp: &mut Interpreter, value: &Value) -> Result<Vec<Value>, Fault> {
    let max = interp.max_collection_len();
    if let Some(len) = value.len() {
        ensure_len(len, max)?;
    }
    let mut items = Vec::new();
    for item in value.iter()? {
        interp.allocate(1)?;
        items.push(item);
    }
    Ok(items)
}

/// Builds dict entries from a mapping or an iterable of pairs.
pub(crate) fn pairs_into_map(
    interp: &mut Interpreter,
    source: &Value,
    map: &mut IndexMap<Key, Value>,
) -> Result<(), Fault> {
    if let Value::Dict(other) = source {
        let entries: Vec<(Key, Value)> = other
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        map.extend(entries);
        return Ok(());
    }
    for (idx, item) in collect_items(interp, source)?.into_iter().enumerate() {
        let pair = match &item {
            Value::List(_) | Value::Tuple(_) | Value::Str(_) => collect_items(interp, &item)?,
            _ => {
                return Err(Fault::type_error(format!(
                    "cannot convert dictionary update sequence element #{idx} to a sequence"
                )));
            }
        };
        let [key, value] = <[Value; 2]>::try_from(pair).map_err(|pair| {
            Fault::value_error(format!(
                "dictionary update sequence element #{idx} has length {}; 2 is required",
                pair.len()
            ))
        })?;
        map.insert(Key::from_value(&key)?, value);
    }
    ensure_len(map.len(), interp.max_collection_len())
}

// ─── Dispatch ──────────────────────────────────────────────────────────────

/// # Errors
///
/// Returns the fault the builtin raises for its arguments.
pub(crate) fn call(
    builtin: Builtin,
    interp: &mut Interpreter,
    positional: Vec<Value>,
    keywords: Vec<(Rc<str>, Value)>,
) -> Result<Value, Fault> {
    let mut args = Args::new(builtin.name(), positional, keywords);
    match builtin {
        Builtin::Print => print(interp, &mut args),
        Builtin::Input => {
            args.arity(0, 1)?;
            args.finish()?;
            if let Some(prompt) = args.get(0) {
                interp.write(&prompt.to_str())?;
            }
            Ok(Value::Str(interp.simulated_input()))
        }
        Builtin::Range => range(&args),
        Builtin::Len => {
            args.arity(1, 1)?;
            args.finish()?;
            let value = &args.positional()[0];
            let len = value.len().ok_or_else(|| {
                Fault::type_error(format!("object of type '{}' has no len()", value.type_name()))
            })?;
            Ok(Value::Int(i64::try_from(len).map_err(|_| Fault::overflow())?))
        }
        Builtin::Str => {
            args.arity(0, 1)?;
            args.finish()?;
            let text = Value::from(args.get(0).map(Value::to_str).unwrap_or_default());
            interp.charge_output(&text)?;
            Ok(text)
        }
        Builtin::Int => to_int(&mut args),
        Builtin::Float => {
            args.arity(0, 1)?;
            args.finish()?;
            to_float(args.get(0).unwrap_or(&Value::Float(0.0)))
        }
        Builtin::List => {
            args.arity(0, 1)?;
            args.finish()?;
            let items = match args.get(0) {
                Some(source) => collect_items(interp, source)?,
                None => Vec::new(),
            };
            Ok(Value::list(items))
        }
        Builtin::Tuple => {
            args.arity(0, 1)?;
            args.finish()?;
            match args.get(0) {
                Some(Value::Tuple(items)) => Ok(Value::Tuple(Rc::clone(items))),
                Some(source) => Ok(Value::tuple(collect_items(interp, source)?)),
                None => Ok(Value::tuple(Vec::new())),
            }
        }
        Builtin::Set => {
            args.arity(0, 1)?;
            args.finish()?;
            let mut set = IndexSet::new();
            if let Some(source) = args.get(0) {
                for item in collect_items(interp, source)? {
                    set.insert(Key::from_value(&item)?);
                }
            }
            Ok(Value::set(set))
        }
        Builtin::Dict => {
            args.arity(0, 1)?;
            let mut map = IndexMap::new();
            if let Some(source) = args.get(0).cloned() {
                pairs_into_map(interp, &source, &mut map)?;
            }
            for (key, value) in args.take_keywords() {
                map.insert(Key::Str(key), value);
            }
            Ok(Value::dict(map))
        }
        Builtin::Sum => sum(interp, &mut args),
        Builtin::Min => extreme(interp, &mut args, true),
        Builtin::Max => extreme(interp, &mut args, false),
        Builtin::Abs => {
            args.arity(1, 1)?;
            args.finish()?;
            match &args.positional()[0] {
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => match other.as_int() {
                    Some(i) => i.checked_abs().map(Value::Int).ok_or_else(Fault::overflow),
                    None => Err(Fault::type_error(format!(
                        "bad operand type for abs(): '{}'",
                        other.type_name()
                    ))),
                },
            }
        }
        Builtin::Round => round(&mut args),
    }
}

fn print(interp: &mut Interpreter, args: &mut Args) -> Result<Value, Fault> {
    let text_option = |label: &str, value: Option<Value>, default: &str| -> Result<String, Fault> {
        match &value {
            None | Some(Value::None) => Ok(default.to_string()),
            Some(Value::Str(s)) => Ok(s.to_string()),
            Some(other) => Err(Fault::type_error(format!(
                "{label} must be None or a string, not {}",
                other.type_name()
            ))),
        }
    };
    let sep = text_option("sep", args.keyword("sep"), " ")?;
    let end = text_option("end", args.keyword("end"), "\n")?;
    args.finish()?;

    let mut line = String::new();
    for (idx, value) in args.positional().iter().enumerate() {
        if idx > 0 {
            line.push_str(&sep);
        }
        line.push_str(&value.to_str());
    }
    line.push_str(&end);
    interp.write(&line)?;
    Ok(Value::None)
}

fn range(args: &Args) -> Result<Value, Fault> {
    args.arity(1, 3)?;
    args.finish()?;
    let ints = args
        .positional()
        .iter()
        .map(expect_int)
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(Fault::type_error("range expected at most 3 arguments")),
    };
    if step == 0 {
        return Err(Fault::value_error("range() arg 3 must not be zero"));
    }
    Ok(Value::Range { start, stop, step })
}

fn to_int(args: &mut Args) -> Result<Value, Fault> {
    args.arity(0, 2)?;
    let base = args.param(1, "base");
    args.finish()?;
    let Some(value) = args.get(0) else {
        return Ok(Value::Int(0));
    };

    if let Some(base) = base {
        let Value::Str(text) = value else {
            return Err(Fault::type_error(
                "int() can't convert non-string with explicit base",
            ));
        };
        let base = expect_int(&base)?;
        let radix = u32::try_from(base)
            .ok()
            .filter(|b| (2..=36).contains(b))
            .ok_or_else(|| Fault::value_error("int() base must be >= 2 and <= 36"))?;
        return parse_int(text, radix).map(Value::Int);
    }

    match value {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(f) => float_to_int(*f).map(Value::Int),
        Value::Str(text) => parse_int(text, 10).map(Value::Int),
        other => Err(Fault::type_error(format!(
            "int() argument must be a string or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn float_to_int(f: f64) -> Result<i64, Fault> {
    if f.is_nan() {
        return Err(Fault::value_error("cannot convert float NaN to integer"));
    }
    if f.is_infinite() {
        return Err(Fault::new(
            FaultKind::OverflowError,
            "cannot convert float infinity to integer",
        ));
    }
    let truncated = f.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(Fault::overflow());
    }
    Ok(truncated as i64)
}

fn parse_int(text: &str, radix: u32) -> Result<i64, Fault> {
    let invalid = || {
        Fault::value_error(format!(
            "invalid literal for int() with base {radix}: {}",
            Value::from(text).repr()
        ))
    };
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = match radix {
        16 => digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits),
        8 => digits
            .strip_prefix("0o")
            .or_else(|| digits.strip_prefix("0O"))
            .unwrap_or(digits),
        2 => digits
            .strip_prefix("0b")
            .or_else(|| digits.strip_prefix("0B"))
            .unwrap_or(digits),
        _ => digits,
    };
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return Err(invalid());
    }
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    if !cleaned.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid());
    }
    let signed = if negative {
        format!("-{cleaned}")
    } else {
        cleaned
    };
    i64::from_str_radix(&signed, radix).map_err(|_| Fault::overflow())
}

fn to_float(value: &Value) -> Result<Value, Fault> {
    match value {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(text) => {
            let trimmed = text.trim();
            let lowered = trimmed.to_ascii_lowercase();
            let unsigned = lowered.trim_start_matches(['+', '-']);
            let negative = lowered.starts_with('-');
            let special = match unsigned {
                "inf" | "infinity" => Some(f64::INFINITY),
                "nan" => Some(f64::NAN),
                _ => None,
            };
            if let Some(special) = special {
                if lowered.len() - unsigned.len() <= 1 {
                    return Ok(Value::Float(if negative { -special } else { special }));
                }
            }
            let valid_chars = !trimmed.is_empty()
                && trimmed
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-' | '_'));
            let cleaned: String = trimmed.chars().filter(|&c| c != '_').collect();
            match cleaned.parse::<f64>() {
                Ok(f) if valid_chars => Ok(Value::Float(f)),
                _ => Err(Fault::value_error(format!(
                    "could not convert string to float: {}",
                    value.repr()
                ))),
            }
        }
        other => other.as_f64().map(Value::Float).ok_or_else(|| {
            Fault::type_error(format!(
                "float() argument must be a string or a real number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn sum(interp: &mut Interpreter, args: &mut Args) -> Result<Value, Fault> {
    args.arity(1, 2)?;
    let start = args.param(1, "start").unwrap_or(Value::Int(0));
    args.finish()?;
    if matches!(start, Value::Str(_)) {
        return Err(Fault::type_error(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }
    let max = interp.max_collection_len();
    let mut total = start;
    for item in args.positional()[0].iter()? {
        interp.tick()?;
        total = binary_op(BinOp::Add, &total, &item, max)?;
    }
    Ok(total)
}

fn extreme(interp: &mut Interpreter, args: &mut Args, want_min: bool) -> Result<Value, Fault> {
    let name = if want_min { "min" } else { "max" };
    let key = args.keyword("key").filter(|k| !matches!(k, Value::None));
    let default = args.keyword("default");
    args.finish()?;
    if args.len() == 0 {
        return Err(Fault::type_error(format!(
            "{name} expected at least 1 argument, got 0"
        )));
    }
    let candidates = if args.len() == 1 {
        collect_items(interp, &args.positional()[0])?
    } else {
        if default.is_some() {
            return Err(Fault::type_error(format!(
                "Cannot specify a default for {name}() with multiple positional arguments"
            )));
        }
        args.positional().to_vec()
    };

    let symbol = if want_min { "<" } else { ">" };
    let mut best: Option<(Value, Value)> = None;
    for candidate in candidates {
        interp.tick()?;
        let rank = match &key {
            Some(func) => interp.call_value(func, vec![candidate.clone()], Vec::new())?,
            None => candidate.clone(),
        };
        let better = match &best {
            None => true,
            Some((best_rank, _)) => {
                let ordering = compare(&rank, best_rank, symbol)?;
                matches!(
                    (ordering, want_min),
                    (Some(std::cmp::Ordering::Less), true) | (Some(std::cmp::Ordering::Greater), false)
                )
            }
        };
        if better {
            best = Some((rank, candidate));
        }
    }
    match (best, default) {
        (Some((_, value)), _) => Ok(value),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(Fault::value_error(format!(
            "{name}() iterable argument is empty"
        ))),
    }
}

fn round(args: &mut Args) -> Result<Value, Fault> {
    args.arity(1, 2)?;
    let ndigits = args.param(1, "ndigits").filter(|n| !matches!(n, Value::None));
    args.finish()?;
    let value = &args.positional()[0];

    match (value, ndigits) {
        (Value::Float(f), None) => float_to_int(f.round_ties_even()).map(Value::Int),
        (Value::Float(f), Some(ndigits)) => {
            let ndigits = expect_int(&ndigits)?;
            Ok(Value::Float(round_float(*f, ndigits)))
        }
        (other, ndigits) => {
            let Some(n) = other.as_int() else {
                return Err(Fault::type_error(format!(
                    "type {} doesn't define __round__ method",
                    other.type_name()
                )));
            };
            match ndigits {
                Some(ndigits) => Ok(Value::Int(round_int(n, expect_int(&ndigits)?))),
                None => Ok(Value::Int(n)),
            }
        }
    }
}

fn round_float(f: f64, ndigits: i64) -> f64 {
    if !f.is_finite() {
        return f;
    }
    if ndigits >= 0 {
        let precision = usize::try_from(ndigits.min(320)).unwrap_or(320);
        // Decimal formatting rounds the exact binary value, as Python does.
        return format!("{f:.precision$}").parse().unwrap_or(f);
    }
    let exponent = i32::try_from(-ndigits).unwrap_or(i32::MAX).min(400);
    let factor = 10f64.powi(exponent);
    if factor.is_infinite() {
        return 0.0 * f;
    }
    (f / factor).round_ties_even() * factor
}

fn round_int(n: i64, ndigits: i64) -> i64 {
    if ndigits >= 0 {
        return n;
    }
    let Some(factor) = u32::try_from(-ndigits)
        .ok()
        .and_then(|exp| 10i64.checked_pow(exp))
    else {
        return 0;
    };
    let quotient = n.div_euclid(factor);
    let remainder = n.rem_euclid(factor);
    let twice = i128::from(remainder) * 2;
    let rounded = match twice.cmp(&i128::from(factor)) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + (quotient & 1),
    };
    rounded.saturating_mul(factor)
}
