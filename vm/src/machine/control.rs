use std::sync::Arc;

use crate::error::RuntimeError;
use crate::function::{Closure, UpvalueSource};
use crate::opcode::{instruction::*, OpCode};
use crate::value::Value;

use super::frame::CallFrame;
use super::stack::StackOps;
use super::vm::{FRAMES_MAX, STACK_MAX};

/// Trait for call and closure instruction handlers
pub trait ControlFlowOps {
    fn handle_control(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError>;

    /// Invoke `func_val` with the arguments in `stack[args_start..]`.
    ///
    /// Script functions get a new frame whose registers start at
    /// `args_start`; natives run to completion and write `dest` directly.
    fn call_value_at(
        &mut self,
        func_val: Value,
        args_start: usize,
        args_count: usize,
        dest: Option<usize>,
    ) -> Result<Option<Value>, RuntimeError>;

    fn push_frame(
        &mut self,
        closure: Arc<Closure>,
        base: usize,
        dest: Option<usize>,
    ) -> Result<(), RuntimeError>;
}

impl ControlFlowOps for super::vm::VM {
    fn handle_control(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;

        match op {
            OpCode::Call => {
                let b = decode_b(instruction) as usize;
                let c = decode_c(instruction) as usize;
                let func_val = self.get_reg(base, b);
                self.call_value_at(func_val, base + b + 1, c, Some(base + a))?;
            }

            OpCode::Closure => {
                let bx = decode_bx(instruction) as usize;
                let parent = self.current_closure()?;
                let proto = parent
                    .proto
                    .functions
                    .get(bx)
                    .cloned()
                    .ok_or(RuntimeError::InvalidOperand)?;

                let mut upvalues = Vec::with_capacity(proto.upvalues.len());
                for source in &proto.upvalues {
                    let val = match *source {
                        UpvalueSource::Local(reg) => self.get_reg(base, reg as usize),
                        UpvalueSource::Upvalue(idx) => parent
                            .upvalues
                            .get(idx as usize)
                            .cloned()
                            .ok_or(RuntimeError::InvalidOperand)?,
                    };
                    upvalues.push(val);
                }

                let closure = Closure { proto, upvalues };
                self.set_reg(base, a, Value::Function(Arc::new(closure)));
            }

            OpCode::GetUpvalue => {
                let bx = decode_bx(instruction) as usize;
                let val = self
                    .current_closure()?
                    .upvalues
                    .get(bx)
                    .cloned()
                    .ok_or(RuntimeError::InvalidOperand)?;
                self.set_reg(base, a, val);
            }

            OpCode::LoadSelf => {
                let closure = self.current_closure()?;
                self.set_reg(base, a, Value::Function(closure));
            }

            _ => unreachable!(),
        }

        Ok(())
    }

    fn call_value_at(
        &mut self,
        func_val: Value,
        args_start: usize,
        args_count: usize,
        dest: Option<usize>,
    ) -> Result<Option<Value>, RuntimeError> {
        if args_start + args_count > self.stack.len() {
            return Err(RuntimeError::StackOverflow);
        }

        match func_val {
            Value::Function(closure) => {
                let arity = closure.proto.arity as usize;
                if arity != args_count {
                    return Err(RuntimeError::ArityMismatch(format!(
                        "{}() takes {} argument{}, got {}",
                        closure.proto.name,
                        arity,
                        if arity == 1 { "" } else { "s" },
                        args_count
                    )));
                }
                self.push_frame(closure, args_start, dest)?;
                Ok(None)
            }
            Value::Native(native) => {
                if native.arity != -1 && native.arity as usize != args_count {
                    return Err(RuntimeError::ArityMismatch(format!(
                        "{}() takes {} argument{}, got {}",
                        native.name,
                        native.arity,
                        if native.arity == 1 { "" } else { "s" },
                        args_count
                    )));
                }
                let args: Vec<Value> = self.stack[args_start..args_start + args_count].to_vec();
                let func = native.func.clone();
                let res = func(self, &args)?;
                if let Some(slot) = dest {
                    self.stack[slot] = res.clone();
                }
                Ok(Some(res))
            }
            other => Err(RuntimeError::NotCallable(format!(
                "{} is not callable",
                other.type_name()
            ))),
        }
    }

    fn push_frame(
        &mut self,
        closure: Arc<Closure>,
        base: usize,
        dest: Option<usize>,
    ) -> Result<(), RuntimeError> {
        if self.frames.len() >= FRAMES_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        let needed = base + closure.proto.max_slots as usize + 1;
        if needed > STACK_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        if self.stack.len() < needed {
            self.stack.resize(needed, Value::Nil);
        }
        self.frames.push(CallFrame::new(closure, base, dest));
        Ok(())
    }
}
