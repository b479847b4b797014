//! Human-readable listing of compiled bytecode.

use std::fmt::Write;

use crate::function::{FunctionProto, UpvalueSource};
use crate::opcode::{instruction::*, OpCode};

/// Disassemble `proto` and every nested function it owns.
pub fn disassemble(proto: &FunctionProto) -> String {
    let mut out = String::new();
    write_function(&mut out, proto, "");
    out
}

fn write_function(out: &mut String, proto: &FunctionProto, path: &str) {
    let label = if path.is_empty() {
        proto.name.clone()
    } else {
        format!("{path}/{}", proto.name)
    };
    let _ = writeln!(
        out,
        "== {} (arity {}, {} slots, {} constants) ==",
        label,
        proto.arity,
        proto.max_slots,
        proto.constants.len()
    );
    for (i, src) in proto.upvalues.iter().enumerate() {
        let _ = match src {
            UpvalueSource::Local(r) => writeln!(out, "     upvalue {i} <- R{r}"),
            UpvalueSource::Upvalue(u) => writeln!(out, "     upvalue {i} <- U{u}"),
        };
    }

    for (i, inst) in proto.chunk.iter().enumerate() {
        let _ = writeln!(out, "{}", format_instruction(proto, i, *inst));
    }

    for child in &proto.functions {
        out.push('\n');
        write_function(out, child, &label);
    }
}

fn format_instruction(proto: &FunctionProto, i: usize, inst: u32) -> String {
    let op_byte = decode_opcode(inst);
    let line = proto.line_at(i);
    let a = decode_a(inst);
    let b = decode_b(inst);
    let c = decode_c(inst);
    let bx = decode_bx(inst);

    let Some(op) = OpCode::from_u8(op_byte) else {
        return format!("{i:04} {line:>4} UNKNOWN({op_byte})");
    };
    let name = op.name();
    let constant = |idx: u16| {
        proto
            .constants
            .get(idx as usize)
            .map(|v| v.repr())
            .unwrap_or_else(|| "?".to_string())
    };

    let operands = match op {
        OpCode::LoadConst => format!("R{a}, K[{bx}] ({})", constant(bx)),
        OpCode::DefGlobalLet | OpCode::DefGlobalVar | OpCode::GetGlobal | OpCode::SetGlobal => {
            format!("R{a}, Name[{bx}] ({})", constant(bx))
        }
        OpCode::LoadNil | OpCode::LoadTrue | OpCode::LoadFalse | OpCode::LoadSelf => format!("R{a}"),
        OpCode::Move | OpCode::Neg | OpCode::LogNot => format!("R{a}, R{b}"),
        OpCode::Return => {
            if b == 1 {
                format!("R{a}")
            } else {
                String::new()
            }
        }
        OpCode::Call => format!("R{a}, R{b}, {c} args"),
        OpCode::Closure => {
            let target = proto
                .functions
                .get(bx as usize)
                .map(|f| f.name.as_str())
                .unwrap_or("?");
            format!("R{a}, F[{bx}] ({target})")
        }
        OpCode::GetUpvalue => format!("R{a}, U{bx}"),
        OpCode::Jump => format!("-> {bx:04}"),
        OpCode::JumpIfFalse | OpCode::JumpIfTrue | OpCode::ForIter | OpCode::ForRange => {
            format!("R{a}, -> {bx:04}")
        }
        OpCode::GetIter => format!("R{a}, R{b}"),
        OpCode::BuildList => format!("R{a}, R{b}..+{c}"),
        OpCode::BuildMap => format!("R{a}, R{b}..+{} ({c} pairs)", c as usize * 2),
        OpCode::Nop => String::new(),
        _ => format!("R{a}, R{b}, R{c}"),
    };

    format!("{i:04} {line:>4} {name:<15} {operands}").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::Arc;

    #[test]
    fn lists_constants_and_nested_functions() {
        let inner = FunctionProto {
            name: "helper".into(),
            arity: 1,
            max_slots: 2,
            chunk: vec![encode_abc(OpCode::Return.as_u8(), 0, 1, 0)],
            line_info: vec![3],
            constants: vec![],
            functions: vec![],
            upvalues: vec![UpvalueSource::Local(0)],
        };
        let main = FunctionProto {
            name: "main".into(),
            arity: 0,
            max_slots: 1,
            chunk: vec![
                encode_abx(OpCode::LoadConst.as_u8(), 0, 0),
                encode_abx(OpCode::Closure.as_u8(), 0, 0),
                encode_abc(OpCode::Return.as_u8(), 0, 0, 0),
            ],
            line_info: vec![1, 2, 4],
            constants: vec![Value::str("hi")],
            functions: vec![Arc::new(inner)],
            upvalues: vec![],
        };
        let text = disassemble(&main);
        assert!(text.contains("== main (arity 0, 1 slots, 1 constants) =="));
        assert!(text.contains(r#"LOAD_CONST      R0, K[0] ("hi")"#));
        assert!(text.contains("CLOSURE         R0, F[0] (helper)"));
        assert!(text.contains("== main/helper (arity 1"));
        assert!(text.contains("upvalue 0 <- R0"));
        assert!(text.lines().any(|l| l.ends_with("RETURN")));
    }
}
