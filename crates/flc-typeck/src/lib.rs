//! Hindley-Milner type inference for the core compiler.
//!
//! Consumes the surface syntax model (`flc-syntax`) and a `TypeMap` and
//! produces the program's principal type, or the first fatal `TypeError`
//! encountered. This crate does not recover from errors locally: the first
//! one found is returned.

pub mod env;
pub mod error;
pub mod infer;
pub mod ty;
pub mod typemap;
pub mod unify;

pub use env::Environment;
pub use error::TypeError;
pub use ty::{Monotype, Polytype, TyVar, Unknown};
pub use typemap::TypeMap;
pub use unify::InferCtx;

use flc_common::Name;
use flc_syntax::{Expr, TypeDecl};

/// A `CheckState` is created per input program and discarded afterward: it
/// owns the unification table and the resulting type map.
pub struct CheckState {
    pub ctx: InferCtx,
    pub type_map: TypeMap,
}

/// The environment containing exactly the runtime's arithmetic and equality
/// primitives -- `add`, `sub`, `div`, `eq_int` -- and nothing else. This is
/// the one "prelude" the checker provides; it deliberately stops short of
/// anything like an `isEven` convenience binding, which is an embedder
/// concern, not the checker's.
pub fn builtin_environment() -> Environment {
    let env = Environment::new();
    let int_binop = Polytype::mono(Monotype::function(
        Monotype::int(),
        Monotype::function(Monotype::int(), Monotype::int()),
    ));
    let eq_int = Polytype::mono(Monotype::function(
        Monotype::int(),
        Monotype::function(Monotype::int(), Monotype::bool()),
    ));
    let env = env.bind_name(Name::new("add"), int_binop.clone(), |e| e.clone());
    let env = env.bind_name(Name::new("sub"), int_binop.clone(), |e| e.clone());
    let env = env.bind_name(Name::new("div"), int_binop, |e| e.clone());
    env.bind_name(Name::new("eq_int"), eq_int, |e| e.clone())
}

/// Build the initial `TypeMap` (seeded with `Int`/`Bool`) from the parser's
/// declarations, then infer the principal (zonked, generalized) type of
/// `expr` under the builtin arithmetic/equality environment.
pub fn check_program(
    type_decls: &[TypeDecl],
    expr: &Expr,
) -> Result<(CheckState, Polytype), TypeError> {
    let mut type_map = typemap::prelude_type_map();
    typemap::register_type_decls(&mut type_map, type_decls)?;

    let mut ctx = InferCtx::new();
    let env = builtin_environment();
    let ty = infer::infer(&mut ctx, &type_map, &env, expr)?;
    let resolved = ctx.resolve(&ty);
    let scheme = ctx.generalize(&env, &resolved);

    Ok((CheckState { ctx, type_map }, scheme))
}
