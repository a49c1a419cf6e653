//! Arithmetic and membership with Python semantics on 64-bit integers.

use crate::ast::{BinOp, UnaryOp};
use crate::error::{Fault, FaultKind};
use crate::format::percent_format;
use crate::value::{Key, Value, position_equal};

/// Fails with `MemoryError` when a collection would grow past `max`.
pub(crate) fn ensure_len(len: usize, max: usize) -> Result<(), Fault> {
    if len > max {
        return Err(Fault::new(
            FaultKind::MemoryError,
            format!("collection exceeds the limit of {max} elements"),
        ));
    }
    Ok(())
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> Fault {
    Fault::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_) | Value::Bool(_))
}

/// # Errors
///
/// Returns the fault Python would raise for the operands.
pub(crate) fn binary_op(op: BinOp, left: &Value, right: &Value, max_len: usize) -> Result<Value, Fault> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_op(op, a, b);
    }
    if is_numeric(left) && is_numeric(right) {
        if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
            return float_op(op, a, b);
        }
    }

    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            ensure_len(a.len() + b.len(), max_len)?;
            Ok(Value::from(format!("{a}{b}")))
        }
        (BinOp::Add, Value::Str(_), other) => Err(Fault::type_error(format!(
            "can only concatenate str (not \"{}\") to str",
            other.type_name()
        ))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            ensure_len(a.len() + b.len(), max_len)?;
            Ok(Value::list(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinOp::Add, Value::List(_), other) => Err(Fault::type_error(format!(
            "can only concatenate list (not \"{}\") to list",
            other.type_name()
        ))),
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            ensure_len(a.len() + b.len(), max_len)?;
            Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinOp::Sub, Value::Set(a), Value::Set(b)) => {
            let b = b.borrow();
            Ok(Value::set(
                a.borrow().iter().filter(|key| !b.contains(*key)).cloned().collect(),
            ))
        }
        (BinOp::Mul, seq, count) | (BinOp::Mul, count, seq)
            if count.as_int().is_some() && is_sequence(seq) =>
        {
            repeat(seq, count.as_int().unwrap_or(0), max_len)
        }
        (BinOp::Mod, Value::Str(template), args) => percent_format(template, args),
        _ => Err(unsupported(op, left, right)),
    }
}

fn is_sequence(value: &Value) -> bool {
    matches!(value, Value::Str(_) | Value::List(_) | Value::Tuple(_))
}

fn repeat(seq: &Value, count: i64, max_len: usize) -> Result<Value, Fault> {
    let times = usize::try_from(count.max(0)).unwrap_or(0);
    let len = seq.len().unwrap_or(0);
    let total = len.checked_mul(times).unwrap_or(usize::MAX);
    ensure_len(total, max_len)?;
    let repeated = |items: &[Value]| -> Vec<Value> {
        std::iter::repeat_n(items, times).flatten().cloned().collect()
    };
    match seq {
        Value::Str(s) => Ok(Value::from(s.repeat(times))),
        Value::List(items) => Ok(Value::list(repeated(items.borrow().as_slice()))),
        Value::Tuple(items) => Ok(Value::tuple(repeated(items.as_slice()))),
        other => Err(Fault::type_error(format!(
            "can't multiply sequence of type '{}' by int",
            other.type_name()
        ))),
    }
}

#[allow(clippy::cast_precision_loss)]
fn int_op(op: BinOp, a: i64, b: i64) -> Result<Value, Fault> {
    let zero = |message: &str| Fault::new(FaultKind::ZeroDivisionError, message);
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(zero("division by zero"));
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(zero("integer division or modulo by zero"));
            }
            a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(zero("integer modulo by zero"));
            }
            let r = a.checked_rem(b).unwrap_or(0);
            Some(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
        }
        BinOp::Pow => return int_pow(a, b),
    };
    result.map(Value::Int).ok_or_else(Fault::overflow)
}

#[allow(clippy::cast_precision_loss)]
fn int_pow(base: i64, exp: i64) -> Result<Value, Fault> {
    if exp < 0 {
        if base == 0 {
            return Err(Fault::new(
                FaultKind::ZeroDivisionError,
                "0.0 cannot be raised to a negative power",
            ));
        }
        return float_op(BinOp::Pow, base as f64, exp as f64);
    }
    match (base, u32::try_from(exp)) {
        (_, Ok(exp)) => base.checked_pow(exp).map(Value::Int).ok_or_else(Fault::overflow),
        (0 | 1, Err(_)) => Ok(Value::Int(base)),
        (-1, Err(_)) => Ok(Value::Int(if exp % 2 == 0 { 1 } else { -1 })),
        _ => Err(Fault::overflow()),
    }
}

fn float_op(op: BinOp, a: f64, b: f64) -> Result<Value, Fault> {
    let zero = |message: &str| Fault::new(FaultKind::ZeroDivisionError, message);
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(zero("float division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(zero("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(zero("float modulo by zero"));
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(zero("0.0 cannot be raised to a negative power"));
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Err(Fault::value_error("complex results are not supported"));
            }
            let result = a.powf(b);
            if result.is_infinite() && a.is_finite() && b.is_finite() {
                return Err(Fault::new(FaultKind::OverflowError, "float result out of range"));
            }
            result
        }
    };
    Ok(Value::Float(result))
}

/// # Errors
///
/// Returns a `TypeError` fault for non-numeric operands.
pub(crate) fn unary_op(op: UnaryOp, operand: &Value) -> Result<Value, Fault> {
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.truthy())),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Value::Float(f)) => Ok(Value::Float(*f)),
        (op, value) => {
            let Some(i) = value.as_int() else {
                let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
                return Err(Fault::type_error(format!(
                    "bad operand type for unary {symbol}: '{}'",
                    value.type_name()
                )));
            };
            if op == UnaryOp::Neg {
                i.checked_neg().map(Value::Int).ok_or_else(Fault::overflow)
            } else {
                Ok(Value::Int(i))
            }
        }
    }
}

/// `item in container`.
///
/// # Errors
///
/// Returns a `TypeError` fault for containers that do not support membership.
pub(crate) fn contains(container: &Value, item: &Value) -> Result<bool, Fault> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_ref())),
            other => Err(Fault::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(position_equal(&items.borrow(), item)?.is_some()),
        Value::Tuple(items) => Ok(position_equal(items, item)?.is_some()),
        Value::Dict(map) => Ok(map.borrow().contains_key(&Key::from_value(item)?)),
        Value::Set(set) => Ok(set.borrow().contains(&Key::from_value(item)?)),
        Value::Range { start, stop, step } => {
            let Some(x) = item.as_int() else {
                return Ok(false);
            };
            let within = if *step > 0 {
                *start <= x && x < *stop
            } else {
                *stop < x && x <= *start
            };
            Ok(within && (i128::from(x) - i128::from(*start)) % i128::from(*step) == 0)
        }
        other => Err(Fault::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 1_000;

    fn eval(op: BinOp, a: Value, b: Value) -> Result<Value, Fault> {
        binary_op(op, &a, &b, MAX)
    }

    fn int(v: &Result<Value, Fault>) -> Option<i64> {
        v.as_ref().ok().and_then(Value::as_int)
    }

    #[test]
    fn floor_division_and_modulo_follow_divisor_sign() {
        assert_eq!(int(&eval(BinOp::FloorDiv, Value::Int(-7), Value::Int(2))), Some(-4));
        assert_eq!(int(&eval(BinOp::Mod, Value::Int(-7), Value::Int(2))), Some(1));
        assert_eq!(int(&eval(BinOp::Mod, Value::Int(7), Value::Int(-2))), Some(-1));
        let Ok(Value::Float(f)) = eval(BinOp::Mod, Value::Float(-7.5), Value::Int(2)) else {
            panic!("expected float");
        };
        assert!((f - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn true_division_always_yields_float() {
        let Ok(Value::Float(f)) = eval(BinOp::Div, Value::Int(7), Value::Int(2)) else {
            panic!("expected float");
        };
        assert!((f - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn division_by_zero_faults() {
        let err = eval(BinOp::Div, Value::Int(1), Value::Int(0)).unwrap_err();
        assert_eq!(err.kind(), FaultKind::ZeroDivisionError);
        assert_eq!(err.message(), "division by zero");
    }

    #[test]
    fn overflow_faults() {
        let err = eval(BinOp::Mul, Value::Int(i64::MAX), Value::Int(2)).unwrap_err();
        assert_eq!(err.kind(), FaultKind::OverflowError);
        let err = eval(BinOp::Pow, Value::Int(10), Value::Int(30)).unwrap_err();
        assert_eq!(err.kind(), FaultKind::OverflowError);
    }

    #[test]
    fn string_concatenation_with_int_is_type_error() {
        let err = eval(BinOp::Add, Value::from("n="), Value::Int(1)).unwrap_err();
        assert_eq!(err.message(), "can only concatenate str (not \"int\") to str");
    }

    #[test]
    fn repetition_is_bounded() {
        let ok = eval(BinOp::Mul, Value::Int(3), Value::from("ab")).unwrap();
        assert_eq!(ok.to_str(), "ababab");
        let err = eval(BinOp::Mul, Value::from("ab"), Value::Int(1_000)).unwrap_err();
        assert_eq!(err.kind(), FaultKind::MemoryError);
    }

    #[test]
    fn list_and_tuple_repetition() {
        let list = Value::list(vec![Value::Int(1), Value::list(Vec::new())]);
        let twice = eval(BinOp::Mul, list, Value::Int(2)).unwrap();
        assert_eq!(twice.repr(), "[1, [], 1, []]");
        let tuple = Value::tuple(vec![Value::from("a")]);
        assert_eq!(eval(BinOp::Mul, Value::Int(3), tuple).unwrap().repr(), "('a', 'a', 'a')");
        let empty = eval(BinOp::Mul, Value::list(vec![Value::Int(1)]), Value::Int(-2)).unwrap();
        assert_eq!(empty.repr(), "[]");
    }

    #[test]
    fn repeating_a_non_sequence_is_type_error() {
        let err = repeat(&Value::Int(4), 2, MAX).unwrap_err();
        assert_eq!(err.kind(), FaultKind::TypeError);
    }

    #[test]
    fn bools_act_as_ints() {
        assert_eq!(int(&eval(BinOp::Add, Value::Bool(true), Value::Bool(true))), Some(2));
    }

    #[test]
    fn membership() {
        assert!(contains(&Value::from("hello"), &Value::from("ell")).unwrap());
        let range = Value::Range { start: 0, stop: 10, step: 3 };
        assert!(contains(&range, &Value::Int(9)).unwrap());
        assert!(!contains(&range, &Value::Int(10)).unwrap());
        assert!(contains(&Value::Int(1), &Value::Int(1)).is_err());
    }

    #[test]
    fn negation_overflow() {
        let err = unary_op(UnaryOp::Neg, &Value::Int(i64::MIN)).unwrap_err();
        assert_eq!(err.kind(), FaultKind::OverflowError);
    }
}
