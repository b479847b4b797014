use std::cmp::Ordering;

use crate::error::RuntimeError;
use crate::opcode::{instruction::*, OpCode};
use crate::value::Value;

use super::stack::StackOps;

/// Trait for arithmetic and comparison instruction handlers
pub trait ArithmeticOps {
    fn handle_arithmetic(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError>;

    fn handle_comparison(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError>;
}

impl ArithmeticOps for super::vm::VM {
    fn handle_arithmetic(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;
        let b = decode_b(instruction) as usize;
        let vb = self.get_reg(base, b);

        let res = if op == OpCode::Neg {
            match vb {
                Value::Int(n) => Value::Int(n.checked_neg().ok_or(RuntimeError::IntegerOverflow)?),
                Value::Float(f) => Value::Float(-f),
                other => {
                    return Err(RuntimeError::TypeMismatch(format!(
                        "cannot negate {}",
                        other.type_name()
                    )))
                }
            }
        } else {
            let c = decode_c(instruction) as usize;
            let vc = self.get_reg(base, c);
            binary_op(op, &vb, &vc)?
        };

        self.set_reg(base, a, res);
        Ok(())
    }

    fn handle_comparison(
        &mut self,
        op: OpCode,
        instruction: u32,
        base: usize,
    ) -> Result<(), RuntimeError> {
        let a = decode_a(instruction) as usize;
        let b = decode_b(instruction) as usize;
        let vb = self.get_reg(base, b);

        let result = match op {
            OpCode::LogNot => vb.is_falsey(),
            OpCode::Eq => vb.equals(&self.get_reg(base, decode_c(instruction) as usize)),
            OpCode::NotEq => !vb.equals(&self.get_reg(base, decode_c(instruction) as usize)),
            _ => {
                let vc = self.get_reg(base, decode_c(instruction) as usize);
                let ord = compare_values(&vb, &vc)?;
                match op {
                    OpCode::Lt => ord == Ordering::Less,
                    OpCode::Le => ord != Ordering::Greater,
                    OpCode::Gt => ord == Ordering::Greater,
                    OpCode::Ge => ord != Ordering::Less,
                    _ => unreachable!(),
                }
            }
        };

        self.set_reg(base, a, Value::Bool(result));
        Ok(())
    }
}

/// Ordering for `<`, `<=`, `>`, `>=`, `min` and `max`.
///
/// Numbers compare numerically across int/float, strings lexicographically.
/// NaN and every other pairing are type errors.
pub fn compare_values(x: &Value, y: &Value) -> Result<Ordering, RuntimeError> {
    match (x, y) {
        (Value::Int(l), Value::Int(r)) => Ok(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
        _ => match (x.as_f64(), y.as_f64()) {
            (Some(l), Some(r)) => l.partial_cmp(&r).ok_or_else(|| {
                RuntimeError::TypeMismatch("cannot order NaN".to_string())
            }),
            _ => Err(RuntimeError::TypeMismatch(format!(
                "cannot compare {} with {}",
                x.type_name(),
                y.type_name()
            ))),
        },
    }
}

/// Binary arithmetic for `+ - * / % ^`.
///
/// Integers use checked arithmetic; any float operand promotes the
/// operation to `f64`. `/` and `%` on integers floor, so `-1 % 128` is 127.
pub fn binary_op(op: OpCode, x: &Value, y: &Value) -> Result<Value, RuntimeError> {
    match (x, y) {
        (Value::Int(l), Value::Int(r)) => int_op(op, *l, *r),
        (Value::Str(l), Value::Str(r)) if op == OpCode::Add => {
            let mut s = String::with_capacity(l.len() + r.len());
            s.push_str(l);
            s.push_str(r);
            Ok(Value::str(&s))
        }
        (Value::List(_), Value::List(_)) if op == OpCode::Add => {
            let mut items = x.list_snapshot().unwrap_or_default();
            items.extend(y.list_snapshot().unwrap_or_default());
            Ok(Value::list(items))
        }
        _ => match (x.as_f64(), y.as_f64()) {
            (Some(l), Some(r)) => Ok(Value::Float(float_op(op, l, r))),
            _ => Err(RuntimeError::TypeMismatch(format!(
                "unsupported operands for {}: {} and {}",
                op.name(),
                x.type_name(),
                y.type_name()
            ))),
        },
    }
}

fn int_op(op: OpCode, l: i64, r: i64) -> Result<Value, RuntimeError> {
    let res = match op {
        OpCode::Add => l.checked_add(r),
        OpCode::Sub => l.checked_sub(r),
        OpCode::Mul => l.checked_mul(r),
        OpCode::Div => {
            if r == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            floor_div(l, r)
        }
        OpCode::Mod => {
            if r == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            floor_div(l, r).and_then(|q| q.checked_mul(r)).and_then(|p| l.checked_sub(p))
        }
        OpCode::Pow => {
            if r < 0 {
                return Ok(Value::Float((l as f64).powf(r as f64)));
            }
            u32::try_from(r).ok().and_then(|e| l.checked_pow(e))
        }
        _ => return Err(RuntimeError::InvalidOperand),
    };
    res.map(Value::Int).ok_or(RuntimeError::IntegerOverflow)
}

fn floor_div(l: i64, r: i64) -> Option<i64> {
    let q = l.checked_div(r)?;
    if l % r != 0 && ((l < 0) != (r < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn float_op(op: OpCode, l: f64, r: f64) -> f64 {
    match op {
        OpCode::Add => l + r,
        OpCode::Sub => l - r,
        OpCode::Mul => l * r,
        OpCode::Div => l / r,
        OpCode::Mod => l - r * (l / r).floor(),
        OpCode::Pow => l.powf(r),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(op: OpCode, l: i64, r: i64) -> Result<Value, RuntimeError> {
        binary_op(op, &Value::Int(l), &Value::Int(r))
    }

    #[test]
    fn floor_division_and_modulo() {
        assert!(int(OpCode::Div, 7, 2).unwrap().equals(&Value::Int(3)));
        assert!(int(OpCode::Div, -7, 2).unwrap().equals(&Value::Int(-4)));
        assert!(int(OpCode::Mod, -1, 128).unwrap().equals(&Value::Int(127)));
        assert!(int(OpCode::Mod, 7, -3).unwrap().equals(&Value::Int(-2)));
        assert_eq!(int(OpCode::Div, 1, 0).unwrap_err(), RuntimeError::DivisionByZero);
        assert_eq!(int(OpCode::Mod, 1, 0).unwrap_err(), RuntimeError::DivisionByZero);
        assert_eq!(int(OpCode::Div, i64::MIN, -1).unwrap_err(), RuntimeError::IntegerOverflow);
    }

    #[test]
    fn checked_overflow() {
        assert_eq!(int(OpCode::Add, i64::MAX, 1).unwrap_err(), RuntimeError::IntegerOverflow);
        assert_eq!(int(OpCode::Pow, 2, 64).unwrap_err(), RuntimeError::IntegerOverflow);
        assert!(int(OpCode::Pow, 2, 10).unwrap().equals(&Value::Int(1024)));
        assert!(int(OpCode::Pow, 2, -1).unwrap().equals(&Value::Float(0.5)));
    }

    #[test]
    fn mixed_operands_promote() {
        let r = binary_op(OpCode::Add, &Value::Int(1), &Value::Float(0.5)).unwrap();
        assert!(matches!(r, Value::Float(f) if f == 1.5));
        let r = binary_op(OpCode::Mod, &Value::Float(-1.0), &Value::Int(4)).unwrap();
        assert!(matches!(r, Value::Float(f) if f == 3.0));
    }

    #[test]
    fn concatenation() {
        let r = binary_op(OpCode::Add, &Value::str("ab"), &Value::str("cd")).unwrap();
        assert_eq!(r.display(), "abcd");
        let r = binary_op(OpCode::Sub, &Value::str("ab"), &Value::str("cd"));
        assert!(matches!(r, Err(RuntimeError::TypeMismatch(_))));
        let r = binary_op(OpCode::Add, &Value::str("n="), &Value::Int(1));
        assert!(matches!(r, Err(RuntimeError::TypeMismatch(_))));
    }

    #[test]
    fn ordering() {
        assert_eq!(compare_values(&Value::Int(1), &Value::Float(1.5)).unwrap(), Ordering::Less);
        assert_eq!(compare_values(&Value::str("b"), &Value::str("a")).unwrap(), Ordering::Greater);
        assert!(compare_values(&Value::Int(1), &Value::str("1")).is_err());
        assert!(compare_values(&Value::Nil, &Value::Nil).is_err());
    }
}
