use std::collections::BTreeMap;

use crate::error::RuntimeError;
use crate::guarded::{guarded_get, guarded_iter, list_slot};
use crate::opcode::instruction::{decode_a, decode_b, decode_bx, decode_c};
use crate::opcode::OpCode;
use crate::value::Value;

use super::stack::StackOps;

pub trait DataOps {
    fn handle_data(&mut self, op: OpCode, instruction: u32, base: usize) -> Result<(), RuntimeError>;
    fn handle_iteration(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError>;
}

impl DataOps for super::vm::VM {
    fn handle_data(&mut self, op: OpCode, instruction: u32, base: usize) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;
        let b = decode_b(instruction) as usize;
        let c = decode_c(instruction) as usize;

        match op {
            OpCode::BuildList => {
                // R[A] = [ R[B] ... R[B+C-1] ]
                if base + b + c > self.stack.len() {
                    return Err(RuntimeError::OutOfBounds(format!(
                        "BUILD_LIST needs {c} slots"
                    )));
                }
                let list = self.stack[base + b..base + b + c].to_vec();
                self.set_reg(base, a, Value::list(list));
            }

            OpCode::BuildMap => {
                // C is the number of PAIRS; 2*C registers are consumed.
                if base + b + c * 2 > self.stack.len() {
                    return Err(RuntimeError::OutOfBounds(format!(
                        "BUILD_MAP needs {} slots",
                        c * 2
                    )));
                }
                let mut map = BTreeMap::new();
                for i in 0..c {
                    let key = self.get_reg(base, b + i * 2);
                    let val = self.get_reg(base, b + i * 2 + 1);
                    let Value::Str(k) = key else {
                        return Err(RuntimeError::TypeMismatch(format!(
                            "map keys must be strings, got {}",
                            key.type_name()
                        )));
                    };
                    map.insert(k.to_string(), val);
                }
                self.set_reg(base, a, Value::map(map));
            }

            OpCode::GetIndex => {
                let container = self.get_reg(base, b);
                let key = self.get_reg(base, c);
                let val = guarded_get(&container, &key).unwrap_or(Value::Nil);
                self.set_reg(base, a, val);
            }

            OpCode::SetIndex => {
                // R[A][R[B]] = R[C]
                let target = self.get_reg(base, a);
                let key = self.get_reg(base, b);
                let val = self.get_reg(base, c);
                set_index(&target, &key, val)?;
            }

            OpCode::GetMember => {
                let object = self.get_reg(base, b);
                let key = self.get_reg(base, c);
                let name = key.as_str().ok_or(RuntimeError::InvalidOperand)?;
                let val = get_member(&object, name)?;
                self.set_reg(base, a, val);
            }

            _ => unreachable!(),
        }

        Ok(())
    }

    fn handle_iteration(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;

        match op {
            OpCode::GetIter => {
                // R[A] = snapshot, R[A+1] = cursor
                let b = decode_b(instruction) as usize;
                let source = self.get_reg(base, b);
                self.set_reg(base, a, Value::list(guarded_iter(&source)));
                self.set_reg(base, a + 1, Value::Int(0));
            }

            OpCode::ForIter => {
                let cursor = self.get_reg(base, a + 1).as_int().unwrap_or(0);
                let next = match self.get_reg(base, a) {
                    Value::List(items) => usize::try_from(cursor)
                        .ok()
                        .and_then(|i| items.lock().get(i).cloned()),
                    _ => None,
                };
                match next {
                    Some(val) => {
                        self.set_reg(base, a + 1, Value::Int(cursor + 1));
                        self.set_reg(base, a + 2, val);
                    }
                    None => self.jump_to(decode_bx(instruction) as usize)?,
                }
            }

            OpCode::ForRange => {
                // R[A] = end (exclusive), R[A+1] = next value
                let end = self.get_reg(base, a);
                let current = self.get_reg(base, a + 1);
                let (Value::Int(end), Value::Int(current)) = (&end, &current) else {
                    return Err(RuntimeError::TypeMismatch(format!(
                        "range bounds must be ints, got {} and {}",
                        current.type_name(),
                        end.type_name()
                    )));
                };
                if current < end {
                    self.set_reg(base, a + 1, Value::Int(current + 1));
                    self.set_reg(base, a + 2, Value::Int(*current));
                } else {
                    self.jump_to(decode_bx(instruction) as usize)?;
                }
            }

            _ => unreachable!(),
        }

        Ok(())
    }
}

/// `target[key] = val` for guest code. Unlike reads, writes to an invalid
/// slot are runtime errors.
pub(crate) fn set_index(target: &Value, key: &Value, val: Value) -> Result<(), RuntimeError> {
    match (target, key) {
        (Value::List(list), Value::Int(i)) => {
            let mut items = list.lock();
            let len = items.len();
            let idx = list_slot(*i, len).ok_or_else(|| {
                RuntimeError::OutOfBounds(format!("index {i} out of range for list of length {len}"))
            })?;
            items[idx] = val;
            Ok(())
        }
        (Value::Map(map), Value::Str(k)) => {
            map.lock().insert(k.to_string(), val);
            Ok(())
        }
        (Value::List(_), _) | (Value::Map(_), _) => Err(RuntimeError::TypeMismatch(format!(
            "cannot index {} with {}",
            target.type_name(),
            key.type_name()
        ))),
        _ => Err(RuntimeError::TypeMismatch(format!(
            "{} does not support item assignment",
            target.type_name()
        ))),
    }
}

/// `object.name`: only modules and host objects have members.
pub(crate) fn get_member(object: &Value, name: &str) -> Result<Value, RuntimeError> {
    let found = match object {
        Value::Module(module) => module.members.get(name).cloned(),
        Value::Object(obj) => obj.member(name),
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "{} has no members",
                other.type_name()
            )))
        }
    };
    found.ok_or_else(|| {
        RuntimeError::UndefinedName(format!("{}.{}", object.type_name(), name))
    })
}
