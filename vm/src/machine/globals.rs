use crate::error::RuntimeError;
use crate::globals::GlobalEntry;
use crate::opcode::{instruction::*, OpCode};
use crate::value::Value;

use super::stack::StackOps;

/// Trait for global variable instruction handlers
pub trait GlobalOps {
    fn handle_globals(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError>;
}

impl GlobalOps for super::vm::VM {
    fn handle_globals(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;
        let bx = decode_bx(instruction) as usize;

        let name = match self.current_closure()?.proto.constants.get(bx) {
            Some(Value::Str(s)) => s.clone(),
            Some(_) => {
                return Err(RuntimeError::TypeMismatch(
                    "global name must be a string constant".into(),
                ))
            }
            None => return Err(RuntimeError::InvalidOperand),
        };

        match op {
            OpCode::DefGlobalVar | OpCode::DefGlobalLet => {
                if self.env.capabilities.contains(&name) {
                    return Err(RuntimeError::ImmutableAssignment(name.to_string()));
                }
                let val = self.get_reg(base, a);
                let mutable = op == OpCode::DefGlobalVar;
                self.env
                    .namespace
                    .write()
                    .insert(name.to_string(), GlobalEntry::new(val, mutable));
            }

            OpCode::GetGlobal => {
                let val = self
                    .env
                    .lookup(&name)
                    .ok_or_else(|| RuntimeError::UndefinedName(name.to_string()))?;
                self.set_reg(base, a, val);
            }

            OpCode::SetGlobal => {
                let val = self.get_reg(base, a);
                let mut namespace = self.env.namespace.write();
                match namespace.get_mut(&*name) {
                    Some(entry) if entry.mutable => entry.value = val,
                    Some(_) => return Err(RuntimeError::ImmutableAssignment(name.to_string())),
                    None if self.env.capabilities.contains(&name) => {
                        return Err(RuntimeError::ImmutableAssignment(name.to_string()))
                    }
                    None => return Err(RuntimeError::UndefinedName(name.to_string())),
                }
            }

            _ => unreachable!(),
        }

        Ok(())
    }
}
