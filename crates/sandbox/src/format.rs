//! Format-spec mini-language shared by f-strings, `str.format` and `%`.

use std::rc::Rc;

use crate::builtins::float_to_int;
use crate::error::{Fault, FaultKind};
use crate::value::{Value, format_float};

/// Width and precision past this are treated as a runaway allocation.
const MAX_FORMAT_WIDTH: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Spec {
    fill: char,
    align: Option<char>,
    sign: char,
    alternate: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

impl Default for Spec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            sign: '-',
            alternate: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        }
    }
}

fn invalid_spec() -> Fault {
    Fault::value_error("Invalid format specifier")
}

fn read_number(chars: &[char], i: &mut usize) -> Result<Option<usize>, Fault> {
    let start = *i;
    while chars.get(*i).is_some_and(char::is_ascii_digit) {
        *i += 1;
    }
    if start == *i {
        return Ok(None);
    }
    let digits: String = chars[start..*i].iter().collect();
    let value = digits.parse::<usize>().unwrap_or(usize::MAX);
    if value > MAX_FORMAT_WIDTH {
        return Err(Fault::new(
            FaultKind::MemoryError,
            format!("format width exceeds the limit of {MAX_FORMAT_WIDTH}"),
        ));
    }
    Ok(Some(value))
}

fn parse_spec(text: &str) -> Result<Spec, Fault> {
    let chars: Vec<char> = text.chars().collect();
    let mut spec = Spec::default();
    let mut i = 0;
    let is_align = |c: Option<&char>| matches!(c, Some('<' | '>' | '^' | '='));

    if chars.len() >= 2 && is_align(chars.get(1)) {
        spec.fill = chars[0];
        spec.align = Some(chars[1]);
        i = 2;
    } else if is_align(chars.first()) {
        spec.align = Some(chars[0]);
        i = 1;
    }
    if let Some(&sign @ ('+' | '-' | ' ')) = chars.get(i) {
        spec.sign = sign;
        i += 1;
    }
    if chars.get(i) == Some(&'#') {
        spec.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        if spec.align.is_none() {
            spec.fill = '0';
            spec.align = Some('=');
        }
        i += 1;
    }
    spec.width = read_number(&chars, &mut i)?.unwrap_or(0);
    if let Some(&group @ (',' | '_')) = chars.get(i) {
        spec.grouping = Some(group);
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        spec.precision = Some(read_number(&chars, &mut i)?.ok_or_else(|| {
            Fault::value_error("Format specifier missing precision")
        })?);
    }
    if let Some(&kind) = chars.get(i) {
        spec.kind = Some(kind);
        i += 1;
    }
    if i != chars.len() {
        return Err(invalid_spec());
    }
    Ok(spec)
}

fn unknown_code(kind: char, value: &Value) -> Fault {
    Fault::value_error(format!(
        "Unknown format code '{kind}' for object of type '{}'",
        value.type_name()
    ))
}

/// Formats `value` according to `spec`, as `format(value, spec)` would.
///
/// # Errors
///
/// Returns a `ValueError` for malformed specs or codes that do not apply to
/// the value's type.
pub fn format_value(value: &Value, spec_text: &str) -> Result<String, Fault> {
    if spec_text.is_empty() {
        return Ok(value.to_str());
    }
    let spec = parse_spec(spec_text)?;

    match value {
        Value::Str(s) => {
            if let Some(kind) = spec.kind.filter(|&k| k != 's') {
                return Err(unknown_code(kind, value));
            }
            if spec.sign != '-' || spec.grouping.is_some() {
                return Err(invalid_spec());
            }
            let body: String = match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.to_string(),
            };
            Ok(pad(&spec, "", &body, '<'))
        }
        Value::Bool(b) if spec.kind.is_none() => {
            let body = if *b { "True" } else { "False" };
            Ok(pad(&spec, "", body, '<'))
        }
        Value::Int(_) | Value::Bool(_) => {
            let n = value.as_int().unwrap_or(0);
            match spec.kind {
                None | Some('d' | 'n') => {
                    let digits = group_digits(&n.unsigned_abs().to_string(), spec.grouping);
                    Ok(pad(&spec, sign_prefix(&spec, n < 0), &digits, '>'))
                }
                Some(kind @ ('x' | 'X' | 'o' | 'b')) => {
                    let magnitude = n.unsigned_abs();
                    let (digits, prefix) = match kind {
                        'x' => (format!("{magnitude:x}"), "0x"),
                        'X' => (format!("{magnitude:X}"), "0X"),
                        'o' => (format!("{magnitude:o}"), "0o"),
                        _ => (format!("{magnitude:b}"), "0b"),
                    };
                    let mut lead = sign_prefix(&spec, n < 0).to_string();
                    if spec.alternate {
                        lead.push_str(prefix);
                    }
                    Ok(pad(&spec, &lead, &digits, '>'))
                }
                Some('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%') => {
                    #[allow(clippy::cast_precision_loss)]
                    let as_float = Value::Float(n as f64);
                    format_value(&as_float, spec_text)
                }
                Some(kind) => Err(unknown_code(kind, value)),
            }
        }
        Value::Float(f) => format_float_spec(*f, &spec, value),
        _ => Err(Fault::type_error(format!(
            "unsupported format string passed to {}.__format__",
            value.type_name()
        ))),
    }
}

fn format_float_spec(f: f64, spec: &Spec, value: &Value) -> Result<String, Fault> {
    let negative = f.is_sign_negative() && !f.is_nan();
    let magnitude = f.abs();
    let body = if !magnitude.is_finite() {
        let text = if magnitude.is_nan() { "nan" } else { "inf" };
        if matches!(spec.kind, Some('F' | 'E' | 'G')) {
            text.to_uppercase()
        } else {
            text.to_string()
        }
    } else {
        match spec.kind {
            None => match spec.precision {
                None => format_float(magnitude),
                Some(p) => general(magnitude, p, true),
            },
            Some('f' | 'F') => {
                let precision = spec.precision.unwrap_or(6);
                let fixed = format!("{magnitude:.precision$}");
                group_fixed(&fixed, spec.grouping)
            }
            Some(kind @ ('e' | 'E')) => {
                let sci = scientific(magnitude, spec.precision.unwrap_or(6));
                if kind == 'E' { sci.to_uppercase() } else { sci }
            }
            Some(kind @ ('g' | 'G')) => {
                let text = general(magnitude, spec.precision.unwrap_or(6), spec.alternate);
                if kind == 'G' { text.to_uppercase() } else { text }
            }
            Some('%') => {
                let precision = spec.precision.unwrap_or(6);
                let percent = magnitude * 100.0;
                let fixed = format!("{percent:.precision$}");
                format!("{}%", group_fixed(&fixed, spec.grouping))
            }
            Some(kind) => return Err(unknown_code(kind, value)),
        }
    };
    let body = if spec.kind.is_none() && spec.grouping.is_some() && magnitude.is_finite() {
        group_fixed(&body, spec.grouping)
    } else {
        body
    };
    Ok(pad(spec, sign_prefix(spec, negative), &body, '>'))
}

/// `1.5e+03` style with `precision` digits after the point.
fn scientific(magnitude: f64, precision: usize) -> String {
    let raw = format!("{magnitude:.precision$e}");
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

/// The `g` presentation: fixed or scientific depending on the exponent.
fn general(magnitude: f64, precision: usize, keep_point: bool) -> String {
    let precision = precision.max(1);
    if magnitude == 0.0 {
        return if keep_point { "0.0".to_string() } else { "0".to_string() };
    }
    let sci = scientific(magnitude, precision - 1);
    let exponent: i64 = sci
        .split_once('e')
        .and_then(|(_, exp)| exp.parse().ok())
        .unwrap_or(0);
    let precision_i = i64::try_from(precision).unwrap_or(i64::MAX);
    let text = if (-4..precision_i).contains(&exponent) {
        let decimals = usize::try_from(precision_i - 1 - exponent).unwrap_or(0);
        format!("{magnitude:.decimals$}")
    } else {
        sci
    };
    let (number, exponent) = match text.split_once('e') {
        Some((number, exp)) => (number.to_string(), format!("e{exp}")),
        None => (text.clone(), String::new()),
    };
    let mut number = if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        number
    };
    if keep_point && exponent.is_empty() && !number.contains('.') {
        number.push_str(".0");
    }
    format!("{number}{exponent}")
}

fn sign_prefix(spec: &Spec, negative: bool) -> &'static str {
    match (negative, spec.sign) {
        (true, _) => "-",
        (false, '+') => "+",
        (false, ' ') => " ",
        _ => "",
    }
}

fn group_digits(digits: &str, separator: Option<char>) -> String {
    let Some(separator) = separator else {
        return digits.to_string();
    };
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

fn group_fixed(fixed: &str, separator: Option<char>) -> String {
    match fixed.split_once('.') {
        Some((int_part, frac)) => format!("{}.{frac}", group_digits(int_part, separator)),
        None => group_digits(fixed, separator),
    }
}

fn pad(spec: &Spec, prefix: &str, body: &str, default_align: char) -> String {
    let len = prefix.chars().count() + body.chars().count();
    if len >= spec.width {
        return format!("{prefix}{body}");
    }
    let missing = spec.width - len;
    let fill = |count: usize| spec.fill.to_string().repeat(count);
    match spec.align.unwrap_or(default_align) {
        '<' => format!("{prefix}{body}{}", fill(missing)),
        '^' => {
            let left = missing / 2;
            format!("{}{prefix}{body}{}", fill(left), fill(missing - left))
        }
        '=' => format!("{prefix}{}{body}", fill(missing)),
        _ => format!("{}{prefix}{body}", fill(missing)),
    }
}

/// Applies an `!r` or `!s` conversion.
pub(crate) fn convert(value: Value, conversion: Option<char>) -> Value {
    match conversion {
        Some('r' | 'a') => Value::from(value.repr()),
        Some('s') => Value::from(value.to_str()),
        _ => value,
    }
}

// ─── str.format ────────────────────────────────────────────────────────────

/// `template.format(*args, **kwargs)`.
///
/// # Errors
///
/// Returns `IndexError`/`KeyError` for missing fields and `ValueError` for
/// malformed templates.
pub fn str_format(
    template: &str,
    args: &[Value],
    kwargs: &[(Rc<str>, Value)],
) -> Result<String, Fault> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::new();
    let mut auto_index = 0usize;
    let mut i = 0;
    while let Some(&ch) = chars.get(i) {
        match ch {
            '{' if chars.get(i + 1) == Some(&'{') => {
                out.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                out.push('}');
                i += 2;
            }
            '}' => return Err(Fault::value_error("Single '}' encountered in format string")),
            '{' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == '}')
                    .map(|offset| i + offset)
                    .ok_or_else(|| Fault::value_error("Single '{' encountered in format string"))?;
                let field: String = chars[i + 1..close].iter().collect();
                let (head, spec) = field.split_once(':').unwrap_or((field.as_str(), ""));
                let (name, conversion) = match head.split_once('!') {
                    Some((name, conv)) => (name, conv.chars().next()),
                    None => (head, None),
                };
                let value = if name.is_empty() {
                    let value = args.get(auto_index).cloned().ok_or_else(|| {
                        Fault::new(
                            FaultKind::IndexError,
                            format!(
                                "Replacement index {auto_index} out of range for positional args tuple"
                            ),
                        )
                    })?;
                    auto_index += 1;
                    value
                } else if let Ok(index) = name.parse::<usize>() {
                    args.get(index).cloned().ok_or_else(|| {
                        Fault::new(
                            FaultKind::IndexError,
                            format!(
                                "Replacement index {index} out of range for positional args tuple"
                            ),
                        )
                    })?
                } else {
                    kwargs
                        .iter()
                        .find(|(key, _)| key.as_ref() == name)
                        .map(|(_, value)| value.clone())
                        .ok_or_else(|| Fault::new(FaultKind::KeyError, format!("'{name}'")))?
                };
                out.push_str(&format_value(&convert(value, conversion), spec)?);
                i = close + 1;
            }
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }
    Ok(out)
}

// ─── printf-style ──────────────────────────────────────────────────────────

/// `template % args`.
///
/// # Errors
///
/// Returns a `TypeError` when the argument count does not match the template.
pub fn percent_format(template: &str, args: &Value) -> Result<Value, Fault> {
    let values: Vec<Value> = match args {
        Value::Tuple(items) => items.as_ref().clone(),
        other => vec![other.clone()],
    };
    let mut values = values.into_iter();
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while let Some(&ch) = chars.get(i) {
        i += 1;
        if ch != '%' {
            out.push(ch);
            continue;
        }
        if chars.get(i) == Some(&'%') {
            out.push('%');
            i += 1;
            continue;
        }

        let mut spec = String::new();
        let mut left = false;
        let mut zero = false;
        while let Some(&flag @ ('-' | '+' | ' ' | '0' | '#')) = chars.get(i) {
            match flag {
                '-' => left = true,
                '0' => zero = true,
                '+' | ' ' => spec.push(flag),
                _ => {}
            }
            i += 1;
        }
        if left {
            spec.insert(0, '<');
        } else if zero {
            spec.push('0');
        }
        while let Some(&digit) = chars.get(i).filter(|c| c.is_ascii_digit() || **c == '.') {
            spec.push(digit);
            i += 1;
        }
        let Some(&code) = chars.get(i) else {
            return Err(Fault::value_error("incomplete format"));
        };
        i += 1;

        let value = values
            .next()
            .ok_or_else(|| Fault::type_error("not enough arguments for format string"))?;
        let text = match code {
            's' => format_value(&Value::from(value.to_str()), &spec)?,
            'r' | 'a' => format_value(&Value::from(value.repr()), &spec)?,
            'd' | 'i' | 'u' => {
                let int = match &value {
                    Value::Float(f) => Value::Int(float_to_int(*f)?),
                    other if other.as_int().is_some() => other.clone(),
                    other => {
                        return Err(Fault::type_error(format!(
                            "%{code} format: a real number is required, not {}",
                            other.type_name()
                        )));
                    }
                };
                format_value(&int, &format!("{spec}d"))?
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'x' | 'X' | 'o' => {
                if value.as_f64().is_none() {
                    return Err(Fault::type_error(format!(
                        "must be real number, not {}",
                        value.type_name()
                    )));
                }
                format_value(&value, &format!("{spec}{code}"))?
            }
            other => {
                return Err(Fault::value_error(format!(
                    "unsupported format character '{other}'"
                )));
            }
        };
        out.push_str(&text);
    }
    if values.next().is_some() {
        return Err(Fault::type_error(
            "not all arguments converted during string formatting",
        ));
    }
    Ok(Value::from(out))
}
