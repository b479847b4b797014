//! Safe modules and restricted builtins.
//!
//! Nothing here reaches the filesystem, the process or the environment.

pub mod core;
pub mod math;
pub mod random;

use crate::globals::CapabilityTableBuilder;
use crate::native::NativeObj;

/// Register the restricted builtins, in their documented order.
pub fn register_builtins(b: &mut CapabilityTableBuilder) {
    use self::core::*;

    b.register("len", NativeObj::value("len", 1, native_len))
        .register("typeof", NativeObj::value("typeof", 1, native_typeof))
        .register("str", NativeObj::value("str", 1, native_str))
        .register("int", NativeObj::value("int", 1, native_int))
        .register("float", NativeObj::value("float", 1, native_float))
        .register("abs", NativeObj::value("abs", 1, native_abs))
        .register("min", NativeObj::value("min", -1, native_min))
        .register("max", NativeObj::value("max", -1, native_max))
        .register("round", NativeObj::value("round", -1, native_round))
        .register("range", NativeObj::value("range", -1, native_range))
        .register("push", NativeObj::value("push", 2, native_push))
        .register("pop", NativeObj::value("pop", 1, native_pop))
        .register("keys", NativeObj::value("keys", 1, native_keys))
        .register("callable", NativeObj::value("callable", 1, native_callable));
}

/// Register the vetted modules `math` and `random`.
pub fn register_modules(b: &mut CapabilityTableBuilder, seed: Option<u64>) {
    b.register("math", math::module())
        .register("random", random::module(seed));
}

/// Modules a guest may name in an `import` statement.
pub const SAFE_MODULES: &[&str] = &["math", "random"];
