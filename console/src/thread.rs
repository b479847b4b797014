//! `Thread(fn)`: the one concurrency surface guest code gets.
//!
//! A handle exposes exactly `start()` and `join()`. The body runs in a
//! fresh interpreter that shares the capability table and the guest
//! namespace with the frame loop.

use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, warn};
use vm::native::expect_args;
use vm::{HostObject, NativeObj, RuntimeError, Value, VM};

use crate::context::ConsoleContext;

enum Slot {
    Ready(Value),
    Running(JoinHandle<()>),
    Finished,
}

struct ThreadInner {
    ctx: Arc<ConsoleContext>,
    slot: Mutex<Slot>,
}

/// Guest-visible thread handle.
pub struct ThreadHandle {
    inner: Arc<ThreadInner>,
}

/// Marks the thread finished in the registry even if the body panics.
struct RunningGuard(Arc<ConsoleContext>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.threads().finished();
    }
}

impl ThreadHandle {
    pub fn new(ctx: Arc<ConsoleContext>, target: Value) -> Self {
        Self {
            inner: Arc::new(ThreadInner {
                ctx,
                slot: Mutex::new(Slot::Ready(target)),
            }),
        }
    }
}

impl ThreadInner {
    fn start(&self, vm: &VM) -> Result<(), RuntimeError> {
        let mut slot = self.slot.lock();
        let target = match std::mem::replace(&mut *slot, Slot::Finished) {
            Slot::Ready(target) => target,
            other => {
                *slot = other;
                return Err(RuntimeError::SystemError("thread already started".into()));
            }
        };

        let env = vm.env.clone();
        let budget = vm.instruction_budget;
        self.ctx.threads().started();
        let guard = RunningGuard(Arc::clone(&self.ctx));

        let spawned = std::thread::Builder::new()
            .name("cart-thread".into())
            .spawn(move || {
                let _guard = guard;
                let mut worker = VM::new(env).with_budget(budget);
                match worker.call(&target, &[]) {
                    Ok(_) => debug!("guest thread finished"),
                    Err(e) => {
                        let (function, line) = worker
                            .last_error_location
                            .clone()
                            .unwrap_or_else(|| ("<native>".into(), 0));
                        warn!(%function, line, error = %e, "guest thread failed");
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                *slot = Slot::Running(handle);
                Ok(())
            }
            Err(e) => Err(RuntimeError::SystemError(format!(
                "could not spawn thread: {e}"
            ))),
        }
    }

    fn join(&self) {
        let handle = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Finished) {
                Slot::Running(handle) => handle,
                other => {
                    *slot = other;
                    return;
                }
            }
        };
        if handle.join().is_err() {
            warn!("guest thread panicked");
        }
    }
}

impl HostObject for ThreadHandle {
    fn type_name(&self) -> &'static str {
        "Thread"
    }

    fn member(&self, name: &str) -> Option<Value> {
        let inner = Arc::clone(&self.inner);
        match name {
            "start" => Some(NativeObj::value("start", 0, move |vm, args| {
                expect_args("start", args, 0)?;
                inner.start(vm)?;
                Ok(Value::Nil)
            })),
            "join" => Some(NativeObj::value("join", 0, move |_vm, args| {
                expect_args("join", args, 0)?;
                inner.join();
                Ok(Value::Nil)
            })),
            _ => None,
        }
    }
}

/// The `Thread(fn)` constructor registered as a capability.
pub fn thread_constructor(ctx: Arc<ConsoleContext>) -> Value {
    NativeObj::value("Thread", 1, move |_vm, args| {
        expect_args("Thread", args, 1)?;
        if !args[0].is_callable() {
            return Err(RuntimeError::TypeMismatch(format!(
                "Thread() expects a function, got {}",
                args[0].type_name()
            )));
        }
        Ok(Value::Object(Arc::new(ThreadHandle::new(
            Arc::clone(&ctx),
            args[0].clone(),
        ))))
    })
}
