//! Restricted builtins. Each native takes a snapshot of any container it
//! reads before touching nested values.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::RuntimeError;
use crate::guarded::{guarded_get, guarded_iter};
use crate::machine::{compare_values, VM};
use crate::native::{arg_f64, arg_int, expect_args};
use crate::value::Value;

/// Largest list `range()` will build.
pub const RANGE_LIMIT: i64 = 1_000_000;

pub fn native_len(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("len", args, 1)?;
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(l) => l.lock().len(),
        Value::Map(m) => m.lock().len(),
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "len() expects string, list or map, got {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(n as i64))
}

pub fn native_typeof(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("typeof", args, 1)?;
    Ok(Value::str(args[0].type_name()))
}

pub fn native_str(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("str", args, 1)?;
    Ok(Value::str(&args[0].display()))
}

pub fn native_int(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("int", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(f) => float_to_int(f.trunc()),
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            RuntimeError::TypeMismatch(format!("int() cannot parse {:?}", &**s))
        }),
        other => Err(RuntimeError::TypeMismatch(format!(
            "int() cannot convert {}",
            other.type_name()
        ))),
    }
}

pub fn native_float(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("float", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            RuntimeError::TypeMismatch(format!("float() cannot parse {:?}", &**s))
        }),
        other => Err(RuntimeError::TypeMismatch(format!(
            "float() cannot convert {}",
            other.type_name()
        ))),
    }
}

pub fn native_abs(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("abs", args, 1)?;
    match &args[0] {
        Value::Int(n) => n.checked_abs().map(Value::Int).ok_or(RuntimeError::IntegerOverflow),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(RuntimeError::TypeMismatch(format!(
            "abs() expects a number, got {}",
            other.type_name()
        ))),
    }
}

/// `min(a, b, ...)` or `min(list)`.
pub fn native_min(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    extreme("min", args, Ordering::Less)
}

/// `max(a, b, ...)` or `max(list)`.
pub fn native_max(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    extreme("max", args, Ordering::Greater)
}

fn extreme(name: &str, args: &[Value], keep: Ordering) -> Result<Value, RuntimeError> {
    let candidates = match args {
        [single] => single.list_snapshot().ok_or_else(|| {
            RuntimeError::TypeMismatch(format!("{name}() of a single value expects a list"))
        })?,
        _ => args.to_vec(),
    };
    let mut iter = candidates.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| RuntimeError::ArityMismatch(format!("{name}() of an empty sequence")))?;
    for v in iter {
        if compare_values(&v, &best)? == keep {
            best = v;
        }
    }
    Ok(best)
}

/// `round(x)` rounds half away from zero to an int; `round(x, n)` keeps
/// `n` decimals and returns a float.
pub fn native_round(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    match args {
        [x] => match x {
            Value::Int(n) => Ok(Value::Int(*n)),
            _ => float_to_int(arg_f64("round", x)?.round()),
        },
        [x, digits] => {
            let f = arg_f64("round", x)?;
            let d = arg_int("round", digits)?.clamp(-15, 15);
            let scale = 10f64.powi(d as i32);
            Ok(Value::Float((f * scale).round() / scale))
        }
        _ => Err(RuntimeError::ArityMismatch(format!(
            "round() takes 1 or 2 arguments, got {}",
            args.len()
        ))),
    }
}

/// `range(end)`, `range(start, end)` or `range(start, end, step)`.
pub fn native_range(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    let (start, end, step) = match args {
        [end] => (0, arg_int("range", end)?, 1),
        [start, end] => (arg_int("range", start)?, arg_int("range", end)?, 1),
        [start, end, step] => (
            arg_int("range", start)?,
            arg_int("range", end)?,
            arg_int("range", step)?,
        ),
        _ => {
            return Err(RuntimeError::ArityMismatch(format!(
                "range() takes 1 to 3 arguments, got {}",
                args.len()
            )))
        }
    };
    if step == 0 {
        return Err(RuntimeError::TypeMismatch("range() step must not be zero".into()));
    }

    let span = if step > 0 {
        end.saturating_sub(start)
    } else {
        start.saturating_sub(end)
    };
    let count = if span <= 0 {
        0
    } else {
        (span - 1) / step.saturating_abs() + 1
    };
    if count > RANGE_LIMIT {
        return Err(RuntimeError::OutOfBounds(format!(
            "range() of {count} elements exceeds {RANGE_LIMIT}"
        )));
    }

    let items = (0..count).map(|i| Value::Int(start + i * step)).collect();
    Ok(Value::list(items))
}

pub fn native_push(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("push", args, 2)?;
    match &args[0] {
        Value::List(l) => {
            l.lock().push(args[1].clone());
            Ok(Value::Nil)
        }
        other => Err(RuntimeError::TypeMismatch(format!(
            "push() expects a list, got {}",
            other.type_name()
        ))),
    }
}

/// Removes and returns the last element; `nil` on an empty list.
pub fn native_pop(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("pop", args, 1)?;
    match &args[0] {
        Value::List(l) => Ok(l.lock().pop().unwrap_or(Value::Nil)),
        other => Err(RuntimeError::TypeMismatch(format!(
            "pop() expects a list, got {}",
            other.type_name()
        ))),
    }
}

pub fn native_keys(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("keys", args, 1)?;
    match &args[0] {
        Value::Map(_) => Ok(Value::list(guarded_iter(&args[0]))),
        other => Err(RuntimeError::TypeMismatch(format!(
            "keys() expects a map, got {}",
            other.type_name()
        ))),
    }
}

pub fn native_callable(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("callable", args, 1)?;
    Ok(Value::Bool(args[0].is_callable()))
}

/// `getitem(container, key)`: the guarded get, `nil` when absent.
pub fn native_getitem(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("getitem", args, 2)?;
    Ok(guarded_get(&args[0], &args[1]).unwrap_or(Value::Nil))
}

/// `iterate(obj)`: the guarded iteration as a list.
pub fn native_iterate(_vm: &mut VM, args: &[Value]) -> Result<Value, RuntimeError> {
    expect_args("iterate", args, 1)?;
    Ok(Value::list(guarded_iter(&args[0])))
}

fn float_to_int(f: f64) -> Result<Value, RuntimeError> {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(Value::Int(f as i64))
    } else {
        Err(RuntimeError::IntegerOverflow)
    }
}

/// Map from string keys, used by hosts building snapshot values.
pub fn map_of<I, K>(entries: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    let map: BTreeMap<String, Value> = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
    Value::map(map)
}
