use std::sync::Arc;

use crate::error::RuntimeError;
use crate::function::{Closure, FunctionProto};
use crate::globals::Environment;
use crate::opcode::{instruction::*, OpCode};
use crate::value::Value;

use super::arithmetic::ArithmeticOps;
use super::control::ControlFlowOps;
use super::data::DataOps;
use super::frame::CallFrame;
use super::globals::GlobalOps;
use super::stack::StackOps;

/// The Virtual Machine struct
///
/// One `VM` runs one guest thread of control. Several VMs may share an
/// [`Environment`]; everything else here is private to this interpreter.
pub struct VM {
    pub stack: Vec<Value>,
    pub frames: Vec<CallFrame>,
    pub env: Environment,

    /// Instructions allowed per host-initiated call; `None` is unlimited.
    pub instruction_budget: Option<u64>,
    remaining: u64,

    /// Function name and source line of the most recent runtime error.
    pub last_error_location: Option<(String, u32)>,
}

pub const STACK_MAX: usize = 65_536;
pub const FRAMES_MAX: usize = 256;

impl VM {
    pub fn new(env: Environment) -> Self {
        Self {
            stack: Vec::with_capacity(256),
            frames: Vec::with_capacity(64),
            env,
            instruction_budget: None,
            remaining: 0,
            last_error_location: None,
        }
    }

    pub fn with_budget(mut self, budget: Option<u64>) -> Self {
        self.instruction_budget = budget;
        self
    }

    /// Run a compiled top-level unit once and return its final value.
    pub fn run_main(&mut self, proto: Arc<FunctionProto>) -> Result<Value, RuntimeError> {
        let main = Value::Function(Arc::new(Closure::new(proto)));
        self.call(&main, &[])
    }

    /// Call a guest or native callable from the host.
    ///
    /// Re-entrant: a native running inside this VM may call back in. On
    /// error, frames pushed by this call are discarded and
    /// `last_error_location` points at the innermost failing instruction.
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        let entry_depth = self.frames.len();
        if entry_depth == 0 {
            self.remaining = self.instruction_budget.unwrap_or(0);
            self.last_error_location = None;
        }

        let base = self.stack_top();
        let needed = base + args.len() + 1;
        if needed > STACK_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        if self.stack.len() < needed {
            self.stack.resize(needed, Value::Nil);
        }
        for (i, arg) in args.iter().enumerate() {
            self.stack[base + i] = arg.clone();
        }

        let result = match self.call_value_at(callee.clone(), base, args.len(), None) {
            Ok(Some(native_result)) => Ok(native_result),
            Ok(None) => self.interpret(entry_depth),
            Err(e) => Err(e),
        };

        if result.is_err() {
            self.record_error_location();
            self.frames.truncate(entry_depth);
        }
        result
    }

    /// First stack slot not owned by a live frame.
    fn stack_top(&self) -> usize {
        self.frames
            .last()
            .map(|f| f.base + f.closure.proto.max_slots as usize + 1)
            .unwrap_or(0)
    }

    fn record_error_location(&mut self) {
        if self.last_error_location.is_some() {
            return;
        }
        if let Some(frame) = self.frames.last() {
            self.last_error_location =
                Some((frame.closure.proto.name.clone(), frame.current_line()));
        }
    }

    pub(super) fn current_closure(&self) -> Result<Arc<Closure>, RuntimeError> {
        self.frames
            .last()
            .map(|f| f.closure.clone())
            .ok_or_else(|| RuntimeError::SystemError("no active frame".into()))
    }

    pub(super) fn jump_to(&mut self, dest: usize) -> Result<(), RuntimeError> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| RuntimeError::SystemError("no active frame".into()))?;
        frame.ip = dest;
        Ok(())
    }

    fn charge_instruction(&mut self) -> Result<(), RuntimeError> {
        if let Some(budget) = self.instruction_budget {
            if self.remaining == 0 {
                return Err(RuntimeError::BudgetExhausted(budget));
            }
            self.remaining -= 1;
        }
        Ok(())
    }

    /// Main interpretation loop: runs until the frame stack drops back to
    /// `entry_depth` and returns the value of the frame that got there.
    fn interpret(&mut self, entry_depth: usize) -> Result<Value, RuntimeError> {
        while self.frames.len() > entry_depth {
            self.charge_instruction()?;

            let frame_idx = self.frames.len() - 1;
            let (ip, base) = {
                let f = &self.frames[frame_idx];
                (f.ip, f.base)
            };

            let instruction = {
                let chunk = &self.frames[frame_idx].closure.proto.chunk;
                match chunk.get(ip) {
                    Some(inst) => *inst,
                    // Falling off the end returns nil
                    None => {
                        if let Some(done) = self.return_value(Value::Nil, entry_depth) {
                            return Ok(done);
                        }
                        continue;
                    }
                }
            };
            self.frames[frame_idx].ip += 1;

            let op_byte = decode_opcode(instruction);
            let op = OpCode::from_u8(op_byte).ok_or(RuntimeError::InvalidOpcode(op_byte))?;

            use crate::opcode::OpCode::*;

            match op {
                LoadConst => {
                    let a = decode_a(instruction) as usize;
                    let bx = decode_bx(instruction) as usize;
                    let val = self.frames[frame_idx]
                        .closure
                        .proto
                        .constants
                        .get(bx)
                        .cloned()
                        .ok_or(RuntimeError::InvalidOperand)?;
                    self.set_reg(base, a, val);
                }
                LoadNil => self.set_reg(base, decode_a(instruction) as usize, Value::Nil),
                LoadTrue => self.set_reg(base, decode_a(instruction) as usize, Value::Bool(true)),
                LoadFalse => {
                    self.set_reg(base, decode_a(instruction) as usize, Value::Bool(false))
                }
                Move => {
                    let a = decode_a(instruction) as usize;
                    let b = decode_b(instruction) as usize;
                    let val = self.get_reg(base, b);
                    self.set_reg(base, a, val);
                }

                // Arithmetic & comparison (delegated to arithmetic.rs)
                Add | Sub | Mul | Div | Mod | Pow | Neg => {
                    self.handle_arithmetic(op, instruction, base)?;
                }
                Eq | NotEq | Lt | Le | Gt | Ge | LogNot => {
                    self.handle_comparison(op, instruction, base)?;
                }

                // Calls & closures (delegated to control.rs)
                Call | OpCode::Closure | GetUpvalue | LoadSelf => {
                    self.handle_control(op, instruction, base)?;
                }

                Return => {
                    let a = decode_a(instruction) as usize;
                    let has_value = decode_b(instruction) == 1;
                    let val = if has_value {
                        self.get_reg(base, a)
                    } else {
                        Value::Nil
                    };
                    if let Some(done) = self.return_value(val, entry_depth) {
                        return Ok(done);
                    }
                }

                // Globals (delegated to globals.rs)
                DefGlobalVar | DefGlobalLet | GetGlobal | SetGlobal => {
                    self.handle_globals(op, instruction, base)?;
                }

                Jump => {
                    self.frames[frame_idx].ip = decode_bx(instruction) as usize;
                }
                JumpIfFalse | JumpIfTrue => {
                    let a = decode_a(instruction) as usize;
                    let truthy = self.stack[base + a].is_truthy();
                    if truthy == (op == JumpIfTrue) {
                        self.frames[frame_idx].ip = decode_bx(instruction) as usize;
                    }
                }

                // Data & iteration (delegated to data.rs)
                BuildList | BuildMap | GetIndex | SetIndex | GetMember => {
                    self.handle_data(op, instruction, base)?;
                }
                GetIter | ForIter | ForRange => {
                    self.handle_iteration(op, instruction, base)?;
                }

                Nop => {}
            }
        }

        Ok(Value::Nil)
    }

    /// Pop the current frame and deliver `val`. Returns `Some` when that
    /// frame was the one the current `interpret` call is waiting for.
    fn return_value(&mut self, val: Value, entry_depth: usize) -> Option<Value> {
        let frame = self.frames.pop()?;
        if self.frames.len() == entry_depth {
            return Some(val);
        }
        if let Some(slot) = frame.dest {
            self.stack[slot] = val;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globals::CapabilityTableBuilder;
    use crate::opcode::instruction::{encode_abc, encode_abx};

    fn proto(chunk: Vec<u32>, constants: Vec<Value>, max_slots: u16) -> Arc<FunctionProto> {
        let line_info = vec![1; chunk.len()];
        Arc::new(FunctionProto {
            name: "main".into(),
            arity: 0,
            max_slots,
            chunk,
            line_info,
            constants,
            functions: vec![],
            upvalues: vec![],
        })
    }

    fn vm() -> VM {
        VM::new(Environment::new(CapabilityTableBuilder::new().build()))
    }

    #[test]
    fn hand_assembled_addition() {
        let chunk = vec![
            encode_abx(OpCode::LoadConst.as_u8(), 0, 0),
            encode_abx(OpCode::LoadConst.as_u8(), 1, 1),
            encode_abc(OpCode::Add.as_u8(), 0, 0, 1),
            encode_abc(OpCode::Return.as_u8(), 0, 1, 0),
        ];
        let p = proto(chunk, vec![Value::Int(40), Value::Int(2)], 2);
        let result = vm().run_main(p).unwrap();
        assert!(result.equals(&Value::Int(42)));
    }

    #[test]
    fn falling_off_the_end_returns_nil() {
        let p = proto(vec![encode_abx(OpCode::LoadTrue.as_u8(), 0, 0)], vec![], 1);
        assert!(vm().run_main(p).unwrap().is_nil());
    }

    #[test]
    fn invalid_opcode_is_an_error() {
        let p = proto(vec![encode_abc(200, 0, 0, 0)], vec![], 1);
        let mut machine = vm();
        assert_eq!(machine.run_main(p).unwrap_err(), RuntimeError::InvalidOpcode(200));
        assert_eq!(machine.last_error_location, Some(("main".to_string(), 1)));
        assert!(machine.frames.is_empty());
    }

    #[test]
    fn budget_stops_infinite_loop() {
        let p = proto(vec![encode_abx(OpCode::Jump.as_u8(), 0, 0)], vec![], 1);
        let mut machine = vm().with_budget(Some(1_000));
        assert_eq!(machine.run_main(p).unwrap_err(), RuntimeError::BudgetExhausted(1_000));
        assert!(machine.frames.is_empty());
    }

    #[test]
    fn calling_a_non_callable_fails() {
        let mut machine = vm();
        let err = machine.call(&Value::Int(3), &[]).unwrap_err();
        assert!(matches!(err, RuntimeError::NotCallable(_)));
    }
}
