//! The fixed runtime primitives every compiled module carries: the bump
//! allocator, the closure/pack memory layout operations, and the arithmetic
//! and equality builtins.
//!
//! These are plain, hand-emitted WASM functions -- there's no surface-level
//! IR for any of them. `add`/`sub`/`div`/`eq_int` follow the same
//! `$inner` + argument-vector-wrapper shape as user declarations so that
//! `Application`'s direct-call fast path treats them identically.

use wasm_encoder::{
    BlockType, Function, Instruction, MemArg, ValType,
};

use flc_common::Name;

use crate::module::{
    Compiler, CLOSURE_APPLIED_OFFSET, CLOSURE_ARGS_OFFSET, CLOSURE_ARITY_OFFSET,
    CLOSURE_CODE_OFFSET, PACK_FIELDS_OFFSET, PACK_TAG_OFFSET, WATERMARK_GLOBAL,
};

fn mem(offset: u32) -> MemArg {
    MemArg { offset: offset as u64, align: 2, memory_index: 0 }
}

pub fn register_builtins(compiler: &mut Compiler) {
    let i32_ = || ValType::I32;
    let unary = compiler.get_or_insert_type(vec![i32_()], vec![i32_()]);
    let binary = compiler.get_or_insert_type(vec![i32_(), i32_()], vec![i32_()]);
    let ternary = compiler.get_or_insert_type(vec![i32_(), i32_(), i32_()], vec![i32_()]);
    let wrapper = compiler.get_or_insert_type(vec![i32_()], vec![i32_()]);
    compiler.rt.wrapper_type = wrapper;

    compiler.rt.allocate = compiler.reserve_function(unary);
    compiler.rt.make_closure = compiler.reserve_function(binary);
    compiler.rt.copy_closure = compiler.reserve_function(unary);
    compiler.rt.apply_closure = compiler.reserve_function(binary);
    compiler.rt.make_pack = compiler.reserve_function(binary);
    compiler.rt.write_pack_field = compiler.reserve_function(ternary);
    compiler.rt.read_pack_field = compiler.reserve_function(binary);
    compiler.rt.read_pack_tag = compiler.reserve_function(unary);

    for name in ["add", "sub", "div", "eq_int"] {
        let inner_index = compiler.reserve_function(binary);
        compiler.set_func_index(Name::new(format!("{}$inner", name)), inner_index);
        let wrapper_index = compiler.reserve_function(wrapper);
        compiler.set_func_index(Name::new(name), wrapper_index);
        compiler.set_arity(Name::new(name), 2);
        compiler.register_table_entry(Name::new(name), wrapper_index);
    }

    emit_allocate(compiler);
    emit_make_closure(compiler);
    emit_copy_closure(compiler);
    emit_apply_closure(compiler);
    emit_make_pack(compiler);
    emit_write_pack_field(compiler);
    emit_read_pack_field(compiler);
    emit_read_pack_tag(compiler);
    emit_binop(compiler, "add", Instruction::I32Add);
    emit_binop(compiler, "sub", Instruction::I32Sub);
    emit_binop(compiler, "div", Instruction::I32DivS);
    emit_binop(compiler, "eq_int", Instruction::I32Eq);

    for name in [
        "allocate",
        "make_closure",
        "copy_closure",
        "apply_closure",
        "make_pack",
        "write_pack_field",
        "read_pack_field",
        "read_pack_tag",
    ] {
        let idx = compiler.func_index(&Name::new(name)).expect("registered above");
        compiler.export_function(name, idx);
    }
    for name in ["add", "sub", "div", "eq_int"] {
        let inner_idx = compiler.func_index(&Name::new(format!("{}$inner", name))).unwrap();
        let wrapper_idx = compiler.func_index(&Name::new(name)).unwrap();
        compiler.export_function(&format!("{}$inner", name), inner_idx);
        compiler.export_function(name, wrapper_idx);
    }
}

fn finish(compiler: &mut Compiler, name: &str, locals: Vec<(u32, ValType)>, body: Vec<Instruction<'static>>) {
    let mut f = Function::new(locals);
    for ins in &body {
        f.instruction(ins);
    }
    f.instruction(&Instruction::End);
    compiler.define_function(&f);
    let _ = name;
}

/// `allocate(n) -> ptr`: bump `watermark` by `n`, return the old value.
fn emit_allocate(compiler: &mut Compiler) {
    let body = vec![
        Instruction::GlobalGet(WATERMARK_GLOBAL),
        Instruction::LocalGet(0),
        Instruction::GlobalGet(WATERMARK_GLOBAL),
        Instruction::I32Add,
        Instruction::GlobalSet(WATERMARK_GLOBAL),
    ];
    finish(compiler, "allocate", vec![], body);
}

/// `make_closure(arity, table_index) -> ptr`.
fn emit_make_closure(compiler: &mut Compiler) {
    // local 2: ptr
    let body = vec![
        Instruction::I32Const(CLOSURE_ARGS_OFFSET as i32),
        Instruction::LocalGet(0),
        Instruction::I32Const(4),
        Instruction::I32Mul,
        Instruction::I32Add,
        Instruction::Call(compiler.rt.allocate),
        Instruction::LocalSet(2),
        Instruction::LocalGet(2),
        Instruction::I32Const(CLOSURE_ARITY_OFFSET as i32),
        Instruction::I32Add,
        Instruction::LocalGet(0),
        Instruction::I32Store(mem(0)),
        Instruction::LocalGet(2),
        Instruction::I32Const(CLOSURE_APPLIED_OFFSET as i32),
        Instruction::I32Add,
        Instruction::I32Const(0),
        Instruction::I32Store(mem(0)),
        Instruction::LocalGet(2),
        Instruction::I32Const(CLOSURE_CODE_OFFSET as i32),
        Instruction::I32Add,
        Instruction::LocalGet(1),
        Instruction::I32Store(mem(0)),
        Instruction::LocalGet(2),
    ];
    finish(compiler, "make_closure", vec![(1, ValType::I32)], body);
}

/// `copy_closure(ptr) -> ptr`: clone a closure so applying it is
/// non-destructive for whatever still holds the original.
fn emit_copy_closure(compiler: &mut Compiler) {
    // locals: 1 = arity, 2 = size, 3 = new_ptr
    let body = vec![
        Instruction::LocalGet(0),
        Instruction::I32Load(mem(CLOSURE_ARITY_OFFSET)),
        Instruction::LocalSet(1),
        Instruction::I32Const(CLOSURE_ARGS_OFFSET as i32),
        Instruction::LocalGet(1),
        Instruction::I32Const(4),
        Instruction::I32Mul,
        Instruction::I32Add,
        Instruction::LocalSet(2),
        Instruction::LocalGet(2),
        Instruction::Call(compiler.rt.allocate),
        Instruction::LocalSet(3),
        Instruction::LocalGet(3),
        Instruction::LocalGet(0),
        Instruction::LocalGet(2),
        Instruction::MemoryCopy { dst_mem: 0, src_mem: 0 },
        Instruction::LocalGet(3),
    ];
    finish(compiler, "copy_closure", vec![(1, ValType::I32); 3], body);
}

/// `apply_closure(closure, arg) -> i32`: copy, store the argument, and
/// either return the (now more-applied) copy or, once saturated, invoke the
/// stored table index indirectly.
fn emit_apply_closure(compiler: &mut Compiler) {
    // params: 0 closure, 1 arg. locals: 2 copy, 3 arity, 4 applied, 5 argptr
    let body = vec![
        Instruction::LocalGet(0),
        Instruction::Call(compiler.rt.copy_closure),
        Instruction::LocalSet(2),
        Instruction::LocalGet(2),
        Instruction::I32Load(mem(CLOSURE_ARITY_OFFSET)),
        Instruction::LocalSet(3),
        Instruction::LocalGet(2),
        Instruction::I32Load(mem(CLOSURE_APPLIED_OFFSET)),
        Instruction::LocalSet(4),
        // args[applied] = arg
        Instruction::LocalGet(2),
        Instruction::LocalGet(4),
        Instruction::I32Const(4),
        Instruction::I32Mul,
        Instruction::I32Const(CLOSURE_ARGS_OFFSET as i32),
        Instruction::I32Add,
        Instruction::I32Add,
        Instruction::LocalGet(1),
        Instruction::I32Store(mem(0)),
        Instruction::LocalGet(4),
        Instruction::I32Const(1),
        Instruction::I32Add,
        Instruction::LocalGet(3),
        Instruction::I32LtS,
        Instruction::If(BlockType::Result(ValType::I32)),
        // still partial: bump `applied`, return the copy
        Instruction::LocalGet(2),
        Instruction::I32Const(CLOSURE_APPLIED_OFFSET as i32),
        Instruction::I32Add,
        Instruction::LocalGet(4),
        Instruction::I32Const(1),
        Instruction::I32Add,
        Instruction::I32Store(mem(0)),
        Instruction::LocalGet(2),
        Instruction::Else,
        // saturated: call through the table with a pointer to the arg vector
        Instruction::LocalGet(2),
        Instruction::I32Const(CLOSURE_ARGS_OFFSET as i32),
        Instruction::I32Add,
        Instruction::LocalSet(5),
        Instruction::LocalGet(5),
        Instruction::LocalGet(2),
        Instruction::I32Load(mem(CLOSURE_CODE_OFFSET)),
        Instruction::CallIndirect { ty: compiler.rt.wrapper_type, table: 0 },
        Instruction::End,
    ];
    finish(compiler, "apply_closure", vec![(1, ValType::I32); 4], body);
}

/// `make_pack(tag, arity) -> ptr`.
fn emit_make_pack(compiler: &mut Compiler) {
    let body = vec![
        Instruction::I32Const(PACK_FIELDS_OFFSET as i32),
        Instruction::LocalGet(1),
        Instruction::I32Const(4),
        Instruction::I32Mul,
        Instruction::I32Add,
        Instruction::Call(compiler.rt.allocate),
        Instruction::LocalSet(2),
        Instruction::LocalGet(2),
        Instruction::I32Const(PACK_TAG_OFFSET as i32),
        Instruction::I32Add,
        Instruction::LocalGet(0),
        Instruction::I32Store(mem(0)),
        Instruction::LocalGet(2),
    ];
    finish(compiler, "make_pack", vec![(1, ValType::I32)], body);
}

/// `write_pack_field(pack, offset, field) -> pack` (returns `pack` to chain).
fn emit_write_pack_field(compiler: &mut Compiler) {
    let body = vec![
        Instruction::LocalGet(0),
        Instruction::I32Const(PACK_FIELDS_OFFSET as i32),
        Instruction::LocalGet(1),
        Instruction::I32Const(4),
        Instruction::I32Mul,
        Instruction::I32Add,
        Instruction::I32Add,
        Instruction::LocalGet(2),
        Instruction::I32Store(mem(0)),
        Instruction::LocalGet(0),
    ];
    finish(compiler, "write_pack_field", vec![], body);
}

/// `read_pack_field(pack, offset) -> i32`.
fn emit_read_pack_field(compiler: &mut Compiler) {
    let body = vec![
        Instruction::LocalGet(0),
        Instruction::I32Const(PACK_FIELDS_OFFSET as i32),
        Instruction::LocalGet(1),
        Instruction::I32Const(4),
        Instruction::I32Mul,
        Instruction::I32Add,
        Instruction::I32Add,
        Instruction::I32Load(mem(0)),
    ];
    finish(compiler, "read_pack_field", vec![], body);
}

/// `read_pack_tag(pack) -> i32`.
fn emit_read_pack_tag(compiler: &mut Compiler) {
    let body = vec![Instruction::LocalGet(0), Instruction::I32Load(mem(PACK_TAG_OFFSET))];
    finish(compiler, "read_pack_tag", vec![], body);
}

/// `name$inner(a, b) -> i32` plus `name(argptr) -> i32`, the argument-vector
/// wrapper every table-callable function shares.
fn emit_binop(compiler: &mut Compiler, name: &str, op: Instruction<'static>) {
    let body = vec![Instruction::LocalGet(0), Instruction::LocalGet(1), op];
    finish(compiler, &format!("{}$inner", name), vec![], body);

    let inner_index = compiler.func_index(&Name::new(format!("{}$inner", name))).unwrap();
    let wrapper_body = vec![
        Instruction::LocalGet(0),
        Instruction::I32Load(mem(0)),
        Instruction::LocalGet(0),
        Instruction::I32Load(mem(4)),
        Instruction::Call(inner_index),
    ];
    finish(compiler, name, vec![], wrapper_body);
}
