use cart_parser::ast::{BinOp, Block, ElseBranch, Expr, ForIterable, Stmt};
use vm::opcode::instruction::{decode_a, decode_opcode, encode_abx};
use vm::opcode::OpCode;

use crate::codegen::Compiler;
use crate::error::CompileError;
use crate::expressions::ExpressionCompiler;
use crate::scopes::ScopeCompiler;
use crate::statements::StatementCompiler;
use crate::types::LoopContext;

pub trait ControlFlowCompiler {
    fn compile_block(&mut self, block: &Block, target_reg: u8) -> Result<(), CompileError>;
    fn compile_if(
        &mut self,
        condition: &Expr,
        then_block: &Block,
        else_branch: Option<&ElseBranch>,
    ) -> Result<u8, CompileError>;
    fn compile_while(&mut self, condition: &Expr, body: &Block) -> Result<u8, CompileError>;
    fn compile_for(
        &mut self,
        var: &str,
        iterable: &ForIterable,
        body: &Block,
    ) -> Result<u8, CompileError>;
    fn compile_forever(&mut self, body: &Block) -> Result<u8, CompileError>;
    fn compile_logical(&mut self, op: &BinOp, lhs: &Expr, rhs: &Expr) -> Result<u8, CompileError>;

    // Low level
    fn emit_jump(&mut self, op: OpCode, a: u8) -> usize;
    fn patch_jump(&mut self, idx: usize) -> Result<(), CompileError>;
    fn enter_loop(&mut self, start_label: u16);
    fn exit_loop(&mut self) -> Result<(), CompileError>;

    // Statements
    fn compile_break(&mut self) -> Result<(), CompileError>;
    fn compile_continue(&mut self) -> Result<(), CompileError>;
}

impl ControlFlowCompiler for Compiler {
    fn emit_jump(&mut self, op: OpCode, a: u8) -> usize {
        self.emit_abx(op, a, 0xFFFF);
        self.current_ref().bytecode.len() - 1
    }

    fn patch_jump(&mut self, idx: usize) -> Result<(), CompileError> {
        let jump_target = self.current_ref().label()?;
        let bytecode = &mut self.current().bytecode;
        let instr = bytecode[idx];
        // Re-encode with new Bx
        bytecode[idx] = encode_abx(decode_opcode(instr), decode_a(instr), jump_target);
        Ok(())
    }

    fn enter_loop(&mut self, start_label: u16) {
        self.current().loop_stack.push(LoopContext {
            start_label,
            break_jumps: Vec::new(),
        });
    }

    fn exit_loop(&mut self) -> Result<(), CompileError> {
        if let Some(loop_ctx) = self.current().loop_stack.pop() {
            for jump_idx in loop_ctx.break_jumps {
                self.patch_jump(jump_idx)?;
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &Block, target_reg: u8) -> Result<(), CompileError> {
        let initial_reg_top = self.current_ref().reg_top;
        self.begin_scope();

        let mut last_processed = false;
        if let Some((last, init)) = block.stmts.split_last() {
            for stmt in init {
                self.compile_stmt(stmt)?;
            }
            // A trailing expression is the block's value.
            if let Stmt::Expr(expr) = last {
                self.compile_expr_into(expr, target_reg)?;
                last_processed = true;
            } else {
                self.compile_stmt(last)?;
            }
        }

        if !last_processed {
            self.emit_abx(OpCode::LoadNil, target_reg, 0);
        }

        self.end_scope();
        debug_assert_eq!(
            self.current_ref().reg_top,
            initial_reg_top,
            "Register Hygiene Error"
        );
        self.current().reg_top = initial_reg_top;
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expr,
        then_block: &Block,
        else_branch: Option<&ElseBranch>,
    ) -> Result<u8, CompileError> {
        let target_reg = self.alloc_reg()?;

        let cond_reg = self.compile_expr(condition)?;
        let jump_else = self.emit_jump(OpCode::JumpIfFalse, cond_reg);
        self.free_reg(cond_reg);

        self.compile_block(then_block, target_reg)?;
        let jump_end = self.emit_jump(OpCode::Jump, 0);

        self.patch_jump(jump_else)?;
        match else_branch {
            Some(ElseBranch::Block(block)) => self.compile_block(block, target_reg)?,
            Some(ElseBranch::If(expr)) => self.compile_expr_into(expr, target_reg)?,
            None => self.emit_abx(OpCode::LoadNil, target_reg, 0),
        }
        self.patch_jump(jump_end)?;

        Ok(target_reg)
    }

    fn compile_while(&mut self, condition: &Expr, body: &Block) -> Result<u8, CompileError> {
        let start_label = self.current_ref().label()?;

        let cond_reg = self.compile_expr(condition)?;
        let jump_exit = self.emit_jump(OpCode::JumpIfFalse, cond_reg);
        self.free_reg(cond_reg);

        self.enter_loop(start_label);
        let body_reg = self.alloc_reg()?;
        self.compile_block(body, body_reg)?;
        self.free_reg(body_reg);
        self.emit_abx(OpCode::Jump, 0, start_label);

        self.patch_jump(jump_exit)?;
        self.exit_loop()?;

        // Loops evaluate to nil.
        let target_reg = self.alloc_reg()?;
        self.emit_abx(OpCode::LoadNil, target_reg, 0);
        Ok(target_reg)
    }

    fn compile_for(
        &mut self,
        var: &str,
        iterable: &ForIterable,
        body: &Block,
    ) -> Result<u8, CompileError> {
        // R[base], R[base+1]: iteration state. R[base+2]: loop variable.
        let base = self.alloc_contiguous(3)?;
        let step_op = match iterable {
            ForIterable::Range { start, end } => {
                self.compile_expr_into(start, base + 1)?;
                self.compile_expr_into(end, base)?;
                OpCode::ForRange
            }
            ForIterable::Expr(expr) => {
                let src = self.compile_expr(expr)?;
                self.emit_abc(OpCode::GetIter, base, src, 0);
                self.free_reg(src);
                OpCode::ForIter
            }
        };

        let start_label = self.current_ref().label()?;
        self.enter_loop(start_label);
        let jump_exit = self.emit_jump(step_op, base);

        self.begin_scope();
        self.declare_local(var, base + 2, true);
        let body_reg = self.alloc_reg()?;
        self.compile_block(body, body_reg)?;
        self.free_reg(body_reg);
        // Releases the loop variable's register.
        self.end_scope();

        self.emit_abx(OpCode::Jump, 0, start_label);
        self.patch_jump(jump_exit)?;
        self.exit_loop()?;

        self.free_reg(base + 1);
        self.free_reg(base);

        let target_reg = self.alloc_reg()?;
        self.emit_abx(OpCode::LoadNil, target_reg, 0);
        Ok(target_reg)
    }

    fn compile_forever(&mut self, body: &Block) -> Result<u8, CompileError> {
        let start_label = self.current_ref().label()?;
        self.enter_loop(start_label);

        let body_reg = self.alloc_reg()?;
        self.compile_block(body, body_reg)?;
        self.free_reg(body_reg);
        self.emit_abx(OpCode::Jump, 0, start_label);

        // Only `break` (or `return`) leaves the loop.
        self.exit_loop()?;

        let target_reg = self.alloc_reg()?;
        self.emit_abx(OpCode::LoadNil, target_reg, 0);
        Ok(target_reg)
    }

    /// `&&` / `||` evaluate to the deciding operand.
    fn compile_logical(&mut self, op: &BinOp, lhs: &Expr, rhs: &Expr) -> Result<u8, CompileError> {
        let jump_op = match op {
            BinOp::And => OpCode::JumpIfFalse,
            _ => OpCode::JumpIfTrue,
        };
        let target_reg = self.compile_expr(lhs)?;
        let jump_end = self.emit_jump(jump_op, target_reg);
        self.compile_expr_into(rhs, target_reg)?;
        self.patch_jump(jump_end)?;
        Ok(target_reg)
    }

    fn compile_break(&mut self) -> Result<(), CompileError> {
        if self.current_ref().loop_stack.is_empty() {
            return Err(self.syntax_error("`break` outside of a loop"));
        }
        let jump = self.emit_jump(OpCode::Jump, 0);
        if let Some(ctx) = self.current().loop_stack.last_mut() {
            ctx.break_jumps.push(jump);
        }
        Ok(())
    }

    fn compile_continue(&mut self) -> Result<(), CompileError> {
        let Some(start_label) = self.current_ref().loop_stack.last().map(|l| l.start_label) else {
            return Err(self.syntax_error("`continue` outside of a loop"));
        };
        self.emit_abx(OpCode::Jump, 0, start_label);
        Ok(())
    }
}
