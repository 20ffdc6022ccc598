//! The WASM module builder.
//!
//! Owns every `wasm-encoder` section and the bookkeeping needed to wire a
//! [`flc_ir::Declaration`] list into them: the structural type registry, the
//! function index space (inner functions plus their argument-vector
//! wrappers), and the funcref table that backs `apply_closure`'s
//! `call_indirect`.

use rustc_hash::FxHashMap;
use wasm_encoder::{
    CodeSection, ConstExpr, ElementSection, Elements, ExportKind, ExportSection, Function,
    FunctionSection, GlobalSection, GlobalType, MemorySection, MemoryType, Module, RefType,
    TableSection, TableType, TypeSection, ValType,
};

use flc_common::Name;
use flc_ir::{Declaration, Expression};

use crate::error::CodegenError;
use crate::expr::{self, LocalAlloc};
use crate::intrinsics;

/// The fixed global holding the bump-allocator's watermark.
pub const WATERMARK_GLOBAL: u32 = 0;

/// Closure layout, in 4-byte words: `[arity][applied][table_index][args...]`.
pub const CLOSURE_ARITY_OFFSET: u32 = 0;
pub const CLOSURE_APPLIED_OFFSET: u32 = 4;
pub const CLOSURE_CODE_OFFSET: u32 = 8;
pub const CLOSURE_ARGS_OFFSET: u32 = 12;

/// Pack layout, in 4-byte words: `[tag][fields...]`.
pub const PACK_TAG_OFFSET: u32 = 0;
pub const PACK_FIELDS_OFFSET: u32 = 4;

/// Every fixed runtime primitive's function index, populated once at the
/// start of [`compile`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RuntimeIndices {
    pub allocate: u32,
    pub make_closure: u32,
    pub copy_closure: u32,
    pub apply_closure: u32,
    pub make_pack: u32,
    pub write_pack_field: u32,
    pub read_pack_field: u32,
    pub read_pack_tag: u32,
    /// The uniform `i32 -> i32` (argument-vector) calling convention shared
    /// by every table-callable function.
    pub wrapper_type: u32,
}

pub struct Compiler {
    types: TypeSection,
    type_index_of: FxHashMap<(Vec<ValType>, Vec<ValType>), u32>,
    functions: FunctionSection,
    codes: CodeSection,
    exports: ExportSection,
    next_func_index: u32,
    /// `name` or `name$inner` -> function index.
    func_index_of: FxHashMap<Name, u32>,
    /// The *logical* arity of a declaration or builtin (the number of
    /// arguments its `$inner` form takes), keyed by its bare name.
    arity_of: FxHashMap<Name, u32>,
    /// Position in the funcref table, keyed by the table-callable wrapper's
    /// bare name.
    table_index_of: FxHashMap<Name, u32>,
    table_funcs: Vec<u32>,
    pub rt: RuntimeIndices,
}

impl Compiler {
    fn new() -> Self {
        Compiler {
            types: TypeSection::new(),
            type_index_of: FxHashMap::default(),
            functions: FunctionSection::new(),
            codes: CodeSection::new(),
            exports: ExportSection::new(),
            next_func_index: 0,
            func_index_of: FxHashMap::default(),
            arity_of: FxHashMap::default(),
            table_index_of: FxHashMap::default(),
            table_funcs: Vec::new(),
            rt: RuntimeIndices::default(),
        }
    }

    pub fn get_or_insert_type(&mut self, params: Vec<ValType>, results: Vec<ValType>) -> u32 {
        let key = (params.clone(), results.clone());
        if let Some(&idx) = self.type_index_of.get(&key) {
            return idx;
        }
        let idx = self.type_index_of.len() as u32;
        self.types.ty().function(params, results);
        self.type_index_of.insert(key, idx);
        idx
    }

    /// Reserve a function index and its type, without yet supplying a body.
    /// Returns the function index; the caller must later push exactly one
    /// matching entry to the code section, in the same relative order as
    /// every other reservation made so far.
    pub fn reserve_function(&mut self, type_index: u32) -> u32 {
        let idx = self.next_func_index;
        self.next_func_index += 1;
        self.functions.function(type_index);
        idx
    }

    pub fn define_function(&mut self, body: &Function) {
        self.codes.function(body);
    }

    pub fn export_function(&mut self, name: &str, func_index: u32) {
        self.exports.export(name, ExportKind::Func, func_index);
    }

    pub fn register_table_entry(&mut self, name: Name, func_index: u32) {
        let table_index = self.table_funcs.len() as u32;
        self.table_funcs.push(func_index);
        self.table_index_of.insert(name, table_index);
    }

    pub fn set_arity(&mut self, name: Name, arity: u32) {
        self.arity_of.insert(name, arity);
    }

    pub fn set_func_index(&mut self, name: Name, func_index: u32) {
        self.func_index_of.insert(name, func_index);
    }

    pub fn func_index(&self, name: &Name) -> Option<u32> {
        self.func_index_of.get(name).copied()
    }

    pub fn arity(&self, name: &Name) -> Option<u32> {
        self.arity_of.get(name).copied()
    }

    pub fn table_index(&self, name: &Name) -> Option<u32> {
        self.table_index_of.get(name).copied()
    }
}

/// Compile a program's hoisted declarations and residual top-level
/// expression into a finished `.wasm` module's bytes.
pub fn compile(
    declarations: &[Declaration],
    body: &flc_ir::Expression,
) -> Result<Vec<u8>, CodegenError> {
    let mut compiler = Compiler::new();

    intrinsics::register_builtins(&mut compiler);

    // Pass 1: reserve every user declaration's `$inner` and wrapper function
    // indices up front, so a declaration's body may directly call any other
    // declaration (including itself, and declarations defined later in the
    // list -- mutual recursion) without forward-reference trouble.
    let mut seen = rustc_hash::FxHashSet::default();
    for decl in declarations {
        if !seen.insert(decl.name.clone()) {
            return Err(CodegenError::DuplicateDeclaration { name: decl.name.clone() });
        }
        let arity = decl.arguments.len() as u32;
        let inner_params = vec![ValType::I32; arity as usize];
        let inner_type = compiler.get_or_insert_type(inner_params, vec![ValType::I32]);
        let inner_index = compiler.reserve_function(inner_type);
        let inner_name = Name::new(format!("{}$inner", decl.name));
        compiler.set_func_index(inner_name, inner_index);

        let wrapper_type = compiler.rt.wrapper_type;
        let wrapper_index = compiler.reserve_function(wrapper_type);
        compiler.set_func_index(decl.name.clone(), wrapper_index);
        compiler.set_arity(decl.name.clone(), arity);
        compiler.register_table_entry(decl.name.clone(), wrapper_index);
    }

    // Pass 2: emit bodies, in the same order indices were reserved.
    for decl in declarations {
        emit_declaration(&mut compiler, decl)?;
    }

    // The residual top-level expression becomes the exported entry point.
    let entry_type = compiler.get_or_insert_type(vec![], vec![ValType::I32]);
    let entry_index = compiler.reserve_function(entry_type);
    let mut locals = LocalAlloc::new(0);
    let mut buf = Vec::new();
    expr::emit_expr(&mut buf, &mut locals, &compiler, body)?;
    let mut f = Function::new(locals.declared_extra());
    for ins in &buf {
        f.instruction(ins);
    }
    f.instruction(&wasm_encoder::Instruction::End);
    compiler.define_function(&f);
    compiler.export_function("main", entry_index);

    Ok(assemble(compiler, declarations))
}

fn emit_declaration(compiler: &mut Compiler, decl: &Declaration) -> Result<(), CodegenError> {
    let param_count = decl.arguments.len() as u32;
    let mut locals = LocalAlloc::new(param_count);
    let mut buf = Vec::new();
    let params: Vec<Expression> = (0..param_count).map(Expression::GetLocal).collect();
    let body = flc_ir::instantiate(&decl.body, &params);
    expr::emit_expr(&mut buf, &mut locals, compiler, &body)?;

    let mut f = Function::new(locals.declared_extra());
    for ins in &buf {
        f.instruction(ins);
    }
    f.instruction(&wasm_encoder::Instruction::End);
    compiler.define_function(&f);

    let inner_name = format!("{}$inner", decl.name);
    let inner_index = compiler.func_index(&Name::new(inner_name.clone())).expect("reserved in pass 1");
    compiler.export_function(&inner_name, inner_index);

    // The wrapper: load each argument out of the argument vector (param 0,
    // a pointer) and forward them positionally to `$inner`.
    let mut wbuf = Vec::new();
    for i in 0..param_count {
        expr::push_arg_load(&mut wbuf, i);
    }
    wbuf.push(wasm_encoder::Instruction::Call(inner_index));
    wbuf.push(wasm_encoder::Instruction::End);
    let mut wf = Function::new(vec![]);
    for ins in &wbuf {
        wf.instruction(ins);
    }
    compiler.define_function(&wf);
    let wrapper_index = compiler.func_index(&decl.name).expect("reserved in pass 1");
    compiler.export_function(decl.name.as_str(), wrapper_index);

    Ok(())
}

fn assemble(compiler: Compiler, declarations: &[Declaration]) -> Vec<u8> {
    let Compiler { types, functions, codes, exports, table_funcs, .. } = compiler;
    let _ = declarations;

    // One linear memory, 65535 pages up front and no maximum -- the bump
    // allocator never shrinks or grows it, so the whole address space is
    // reserved at instantiation.
    let mut memories = MemorySection::new();
    memories.memory(MemoryType {
        minimum: 65535,
        maximum: None,
        memory64: false,
        shared: false,
        page_size_log2: None,
    });

    let mut globals = GlobalSection::new();
    globals.global(
        GlobalType { val_type: ValType::I32, mutable: true, shared: false },
        &ConstExpr::i32_const(0),
    );

    let mut tables = TableSection::new();
    tables.table(TableType {
        element_type: RefType::FUNCREF,
        minimum: table_funcs.len() as u64,
        maximum: Some(table_funcs.len() as u64),
        table64: false,
        shared: false,
    });

    let mut elements = ElementSection::new();
    elements.active(None, &ConstExpr::i32_const(0), Elements::Functions(table_funcs.into()));

    let mut module = Module::new();
    module.section(&types);
    module.section(&functions);
    module.section(&tables);
    module.section(&memories);
    module.section(&globals);
    module.section(&exports);
    module.section(&elements);
    module.section(&codes);
    module.finish()
}
