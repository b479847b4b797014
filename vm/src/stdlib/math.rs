use std::sync::Arc;

use crate::error::RuntimeError;
use crate::machine::VM;
use crate::native::{arg_f64, expect_args, NativeObj};
use crate::value::{Module, Value};

fn unary(name: &'static str, f: fn(f64) -> f64) -> Value {
    NativeObj::value(name, 1, move |_vm: &mut VM, args: &[Value]| {
        expect_args(name, args, 1)?;
        Ok(Value::Float(f(arg_f64(name, &args[0])?)))
    })
}

fn binary(name: &'static str, f: fn(f64, f64) -> f64) -> Value {
    NativeObj::value(name, 2, move |_vm: &mut VM, args: &[Value]| {
        expect_args(name, args, 2)?;
        Ok(Value::Float(f(arg_f64(name, &args[0])?, arg_f64(name, &args[1])?)))
    })
}

/// Rounding functions hand back ints, like the rest of the pixel math.
fn to_int(name: &'static str, f: fn(f64) -> f64) -> Value {
    NativeObj::value(name, 1, move |_vm: &mut VM, args: &[Value]| {
        expect_args(name, args, 1)?;
        if let Value::Int(n) = args[0] {
            return Ok(Value::Int(n));
        }
        let r = f(arg_f64(name, &args[0])?);
        if r.is_finite() && r >= i64::MIN as f64 && r < i64::MAX as f64 {
            Ok(Value::Int(r as i64))
        } else {
            Err(RuntimeError::IntegerOverflow)
        }
    })
}

/// The `math` module.
pub fn module() -> Value {
    let m = Module::new("math")
        .with("pi", Value::Float(std::f64::consts::PI))
        .with("tau", Value::Float(std::f64::consts::TAU))
        .with("e", Value::Float(std::f64::consts::E))
        .with("inf", Value::Float(f64::INFINITY))
        .with("sqrt", unary("sqrt", f64::sqrt))
        .with("sin", unary("sin", f64::sin))
        .with("cos", unary("cos", f64::cos))
        .with("tan", unary("tan", f64::tan))
        .with("asin", unary("asin", f64::asin))
        .with("acos", unary("acos", f64::acos))
        .with("atan", unary("atan", f64::atan))
        .with("atan2", binary("atan2", f64::atan2))
        .with("floor", to_int("floor", f64::floor))
        .with("ceil", to_int("ceil", f64::ceil))
        .with("trunc", to_int("trunc", f64::trunc))
        .with("pow", binary("pow", f64::powf))
        .with("exp", unary("exp", f64::exp))
        .with("log", unary("log", f64::ln))
        .with("hypot", binary("hypot", f64::hypot))
        .with("fabs", unary("fabs", f64::abs));
    Value::Module(Arc::new(m))
}
