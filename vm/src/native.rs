use std::sync::Arc;

use crate::error::RuntimeError;
use crate::machine::VM;
use crate::value::Value;

// The unified signature for every host-provided function.
// args: the call's arguments, copied out of the caller's registers.
// Closures let host natives capture their own state (console context,
// RNG, thread handles) instead of reaching for globals.
pub type NativeFn = Arc<dyn Fn(&mut VM, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

pub struct NativeObj {
    pub name: String,
    pub func: NativeFn,
    pub arity: isize, // -1 for variadic
}

impl NativeObj {
    pub fn new<F>(name: &str, arity: isize, func: F) -> Self
    where
        F: Fn(&mut VM, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            func: Arc::new(func),
            arity,
        }
    }

    /// Wrap a native as a guest value.
    pub fn value<F>(name: &str, arity: isize, func: F) -> Value
    where
        F: Fn(&mut VM, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Value::Native(Arc::new(Self::new(name, arity, func)))
    }
}

/// Fail with an arity error unless `args` has exactly `n` entries.
pub fn expect_args(name: &str, args: &[Value], n: usize) -> Result<(), RuntimeError> {
    if args.len() != n {
        return Err(RuntimeError::ArityMismatch(format!(
            "{name}() takes {n} argument{}, got {}",
            if n == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

/// Numeric argument as `f64`, or a type error naming the function.
pub fn arg_f64(name: &str, v: &Value) -> Result<f64, RuntimeError> {
    v.as_f64().ok_or_else(|| {
        RuntimeError::TypeMismatch(format!("{name}() expects a number, got {}", v.type_name()))
    })
}

/// Integer argument, or a type error naming the function.
pub fn arg_int(name: &str, v: &Value) -> Result<i64, RuntimeError> {
    v.as_int().ok_or_else(|| {
        RuntimeError::TypeMismatch(format!("{name}() expects an int, got {}", v.type_name()))
    })
}
