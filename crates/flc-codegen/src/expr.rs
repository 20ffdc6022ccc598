//! Expression-level emission: translating `flc_ir::Expression` into WASM
//! instructions, per the calling convention fixed by [`crate::intrinsics`]
//! and [`crate::module`].

use wasm_encoder::{BlockType, Instruction, MemArg, ValType};

use flc_ir::{Case, Expression, LNName};

use crate::error::CodegenError;
use crate::module::{Compiler, PACK_TAG_OFFSET};

/// Tracks WASM local allocation for a single function body: locals
/// `0..param_count` are the function's parameters; every `Let` or `Match`
/// binder claims the next index.
pub struct LocalAlloc {
    param_count: u32,
    next: u32,
}

impl LocalAlloc {
    pub fn new(param_count: u32) -> Self {
        LocalAlloc { param_count, next: param_count }
    }

    pub fn fresh(&mut self) -> u32 {
        let idx = self.next;
        self.next += 1;
        idx
    }

    /// The `(count, type)` groups to declare on the `wasm_encoder::Function`
    /// -- one `i32` local per binder introduced during emission.
    pub fn declared_extra(&self) -> Vec<(u32, ValType)> {
        let extra = self.next - self.param_count;
        if extra == 0 {
            Vec::new()
        } else {
            vec![(extra, ValType::I32)]
        }
    }
}

fn mem(offset: u32) -> MemArg {
    MemArg { offset: offset as u64, align: 2, memory_index: 0 }
}

/// Load argument `i` of the pointer-to-argument-vector in local 0 -- the
/// shared shape of every table-callable wrapper's body.
pub fn push_arg_load(buf: &mut Vec<Instruction<'static>>, i: u32) {
    buf.push(Instruction::LocalGet(0));
    buf.push(Instruction::I32Load(mem(i * 4)));
}

pub fn emit_expr(
    buf: &mut Vec<Instruction<'static>>,
    locals: &mut LocalAlloc,
    compiler: &Compiler,
    expr: &Expression,
) -> Result<(), CodegenError> {
    match expr {
        Expression::Int(n) => {
            buf.push(Instruction::I32Const(*n));
            Ok(())
        }
        Expression::Bool(b) => {
            buf.push(Instruction::I32Const(if *b { 1 } else { 0 }));
            Ok(())
        }
        Expression::GetLocal(i) => {
            buf.push(Instruction::LocalGet(*i));
            Ok(())
        }
        Expression::Var(LNName::Bound(_)) => Err(CodegenError::InternalBound),
        Expression::Var(LNName::Free(name)) => {
            let arity = compiler.arity(name).unwrap_or(0);
            let table_index = compiler.table_index(name).unwrap_or(0);
            buf.push(Instruction::I32Const(arity as i32));
            buf.push(Instruction::I32Const(table_index as i32));
            buf.push(Instruction::Call(compiler.rt.make_closure));
            Ok(())
        }
        Expression::Application(_, _) => {
            let (head, args) = unfold(expr);
            emit_application(buf, locals, compiler, head, &args)
        }
        Expression::Pack(tag, values) => {
            buf.push(Instruction::I32Const(*tag as i32));
            buf.push(Instruction::I32Const(values.len() as i32));
            buf.push(Instruction::Call(compiler.rt.make_pack));
            for (i, v) in values.iter().enumerate() {
                buf.push(Instruction::I32Const(i as i32));
                emit_expr(buf, locals, compiler, v)?;
                buf.push(Instruction::Call(compiler.rt.write_pack_field));
            }
            Ok(())
        }
        Expression::If(c, t, e) => {
            emit_expr(buf, locals, compiler, c)?;
            buf.push(Instruction::If(BlockType::Result(ValType::I32)));
            emit_expr(buf, locals, compiler, t)?;
            buf.push(Instruction::Else);
            emit_expr(buf, locals, compiler, e)?;
            buf.push(Instruction::End);
            Ok(())
        }
        Expression::Let(value, body) => {
            emit_expr(buf, locals, compiler, value)?;
            let idx = locals.fresh();
            buf.push(Instruction::LocalSet(idx));
            let instantiated = flc_ir::instantiate(body, &[Expression::GetLocal(idx)]);
            emit_expr(buf, locals, compiler, &instantiated)
        }
        Expression::Match(scrutinee, cases) => {
            emit_expr(buf, locals, compiler, scrutinee)?;
            let scrutinee_local = locals.fresh();
            buf.push(Instruction::LocalSet(scrutinee_local));
            let tag_local = locals.fresh();
            buf.push(Instruction::LocalGet(scrutinee_local));
            buf.push(Instruction::Call(compiler.rt.read_pack_tag));
            buf.push(Instruction::LocalSet(tag_local));
            let _ = PACK_TAG_OFFSET;
            emit_match_cases(buf, locals, compiler, tag_local, scrutinee_local, cases)
        }
    }
}

fn emit_match_cases(
    buf: &mut Vec<Instruction<'static>>,
    locals: &mut LocalAlloc,
    compiler: &Compiler,
    tag_local: u32,
    scrutinee_local: u32,
    cases: &[Case],
) -> Result<(), CodegenError> {
    let Some((first, rest)) = cases.split_first() else {
        buf.push(Instruction::Unreachable);
        return Ok(());
    };

    buf.push(Instruction::LocalGet(tag_local));
    buf.push(Instruction::I32Const(first.tag as i32));
    buf.push(Instruction::I32Eq);
    buf.push(Instruction::If(BlockType::Result(ValType::I32)));

    let mut replacements = Vec::with_capacity(first.binders as usize);
    for i in 0..first.binders {
        buf.push(Instruction::LocalGet(scrutinee_local));
        buf.push(Instruction::I32Const(i as i32));
        buf.push(Instruction::Call(compiler.rt.read_pack_field));
        let idx = locals.fresh();
        buf.push(Instruction::LocalSet(idx));
        replacements.push(Expression::GetLocal(idx));
    }
    let instantiated = flc_ir::instantiate(&first.body, &replacements);
    emit_expr(buf, locals, compiler, &instantiated)?;

    buf.push(Instruction::Else);
    emit_match_cases(buf, locals, compiler, tag_local, scrutinee_local, rest)?;
    buf.push(Instruction::End);
    Ok(())
}

/// Unfold a left-nested `Application` chain into its head and its arguments,
/// left to right.
fn unfold(expr: &Expression) -> (&Expression, Vec<&Expression>) {
    let mut args = Vec::new();
    let mut head = expr;
    while let Expression::Application(f, a) = head {
        args.push(a.as_ref());
        head = f.as_ref();
    }
    args.reverse();
    (head, args)
}

fn emit_application(
    buf: &mut Vec<Instruction<'static>>,
    locals: &mut LocalAlloc,
    compiler: &Compiler,
    head: &Expression,
    args: &[&Expression],
) -> Result<(), CodegenError> {
    if let Expression::Var(LNName::Free(name)) = head {
        if let Some(arity) = compiler.arity(name) {
            if arity as usize == args.len() {
                for a in args {
                    emit_expr(buf, locals, compiler, a)?;
                }
                let inner_index = compiler
                    .func_index(&flc_common::Name::new(format!("{}$inner", name)))
                    .unwrap_or_else(|| compiler.func_index(name).expect("registered"));
                buf.push(Instruction::Call(inner_index));
                return Ok(());
            }
        }
    }
    emit_expr(buf, locals, compiler, head)?;
    for a in args {
        emit_expr(buf, locals, compiler, a)?;
        buf.push(Instruction::Call(compiler.rt.apply_closure));
    }
    Ok(())
}
