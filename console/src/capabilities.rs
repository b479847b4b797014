//! The console's capability table.
//!
//! [`build`] is the single list of every name guest code can reach. Host
//! functions capture an `Arc` to the console context; nothing here touches
//! the filesystem, the process or the environment.

use std::sync::Arc;

use vm::native::expect_args;
use vm::stdlib::core::{native_getitem, native_iterate};
use vm::stdlib::{register_builtins, register_modules};
use vm::{CapabilityTable, CapabilityTableBuilder, NativeObj, Value};

use crate::context::ConsoleContext;
use crate::drawing::{blit, coordinate, draw_builtin_sprite, sprite_from_grid};
use crate::thread::thread_constructor;

/// Host functions, in registration order.
pub const HOST_FUNCTIONS: &[&str] = &[
    "draw_sprite",
    "draw_custom_sprite",
    "get_input",
    "quit",
    "print",
    "getitem",
    "iterate",
    "Thread",
];

pub fn build(ctx: &Arc<ConsoleContext>) -> Arc<CapabilityTable> {
    let mut b = CapabilityTableBuilder::new();
    register_modules(&mut b, ctx.random_seed());
    register_builtins(&mut b);
    register_host_functions(&mut b, ctx);
    b.build()
}

fn register_host_functions(b: &mut CapabilityTableBuilder, ctx: &Arc<ConsoleContext>) {
    let c = Arc::clone(ctx);
    b.register(
        "draw_sprite",
        NativeObj::value("draw_sprite", 2, move |_vm, args| {
            expect_args("draw_sprite", args, 2)?;
            let x = coordinate("draw_sprite", &args[0])?;
            let y = coordinate("draw_sprite", &args[1])?;
            draw_builtin_sprite(&mut c.lock().framebuffer, x, y);
            Ok(Value::Nil)
        }),
    );

    let c = Arc::clone(ctx);
    b.register(
        "draw_custom_sprite",
        NativeObj::value("draw_custom_sprite", 3, move |_vm, args| {
            expect_args("draw_custom_sprite", args, 3)?;
            // Validate before taking the console lock.
            let sprite = sprite_from_grid(&args[0])?;
            let x = coordinate("draw_custom_sprite", &args[1])?;
            let y = coordinate("draw_custom_sprite", &args[2])?;
            if let Some(sprite) = sprite {
                blit(&mut c.lock().framebuffer, &sprite, x, y);
            }
            Ok(Value::Nil)
        }),
    );

    let c = Arc::clone(ctx);
    b.register(
        "get_input",
        NativeObj::value("get_input", 0, move |_vm, args| {
            expect_args("get_input", args, 0)?;
            let input = c.lock().input;
            Ok(input.to_value())
        }),
    );

    let c = Arc::clone(ctx);
    b.register(
        "quit",
        NativeObj::value("quit", 0, move |_vm, args| {
            expect_args("quit", args, 0)?;
            c.request_quit();
            Ok(Value::Nil)
        }),
    );

    let c = Arc::clone(ctx);
    b.register(
        "print",
        NativeObj::value("print", -1, move |_vm, args| {
            let line = args.iter().map(Value::display).collect::<Vec<_>>().join(" ");
            c.push_output(line);
            Ok(Value::Nil)
        }),
    );

    b.register("getitem", NativeObj::value("getitem", 2, native_getitem))
        .register("iterate", NativeObj::value("iterate", 1, native_iterate))
        .register("Thread", thread_constructor(Arc::clone(ctx)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use vm::{Environment, VM};

    fn table() -> (Arc<ConsoleContext>, Arc<CapabilityTable>) {
        let ctx = Arc::new(ConsoleContext::new().with_random_seed(Some(1)));
        let table = build(&ctx);
        (ctx, table)
    }

    #[test]
    fn registration_order_is_fixed() {
        let (_, table) = table();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(&names[..3], ["math", "random", "len"]);
        assert_eq!(&names[names.len() - HOST_FUNCTIONS.len()..], HOST_FUNCTIONS);
        assert_eq!(table.len(), 2 + 14 + HOST_FUNCTIONS.len());
    }

    #[test]
    fn nothing_ambient_is_exposed() {
        let (_, table) = table();
        for name in ["open", "exec", "eval", "import", "__import__", "os", "sys", "env"] {
            assert!(!table.contains(name), "{name}");
        }
    }

    #[test]
    fn print_joins_arguments_with_spaces() {
        let (ctx, table) = table();
        let mut vm = VM::new(Environment::new(Arc::clone(&table)));
        let print = table.get("print").cloned().unwrap();
        vm.call(&print, &[Value::str("x"), Value::Int(3), Value::Nil])
            .unwrap();
        vm.call(&print, &[]).unwrap();
        assert_eq!(ctx.drain_output(), vec!["x 3 nil", ""]);
    }

    #[test]
    fn quit_sets_the_context_flag() {
        let (ctx, table) = table();
        let mut vm = VM::new(Environment::new(Arc::clone(&table)));
        let quit = table.get("quit").cloned().unwrap();
        vm.call(&quit, &[]).unwrap();
        assert!(ctx.quit_requested());
    }

    #[test]
    fn draw_sprite_rejects_non_numeric_coordinates() {
        let (ctx, table) = table();
        let mut vm = VM::new(Environment::new(Arc::clone(&table)));
        let draw = table.get("draw_sprite").cloned().unwrap();
        assert!(vm.call(&draw, &[Value::str("a"), Value::Int(0)]).is_err());
        vm.call(&draw, &[Value::Float(1.7), Value::Int(0)]).unwrap();
        assert_eq!(ctx.framebuffer().get(1 + 2, 0), Some(1));
    }
}
