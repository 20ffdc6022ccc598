//! Building a `TypeMap` from the surface `TypeDecl`s the parser hands the
//! checker.

use rustc_hash::FxHashMap;

use flc_common::Name;
use flc_syntax::{ConstructorDecl, TypeDecl, TypeExpr};

use crate::error::TypeError;
use crate::ty::{DataConstructor, Monotype, TyVar, TypeInfo};

pub type TypeMap = FxHashMap<Name, TypeInfo>;

/// Seed a `TypeMap` with `Int` and `Bool` -- the two built-in nullary types
/// every program can rely on regardless of what ADTs it declares.
pub fn prelude_type_map() -> TypeMap {
    let mut map = TypeMap::default();
    map.insert(
        Name::new("Int"),
        TypeInfo { ty_args: Vec::new(), constructors: Vec::new() },
    );
    map.insert(
        Name::new("Bool"),
        TypeInfo { ty_args: Vec::new(), constructors: Vec::new() },
    );
    map
}

/// Register every declared ADT into `map`, converting each constructor's
/// surface `TypeExpr` argument types into `Monotype`s over the declaration's
/// own rigid type parameters.
pub fn register_type_decls(map: &mut TypeMap, decls: &[TypeDecl]) -> Result<(), TypeError> {
    // Pre-seed every declared name with an empty skeleton first, so a
    // constructor field can refer to its own (or a mutually recursive
    // sibling's) type before that declaration's constructors are filled in --
    // `List<a> { Cons(a, List<a>), Nil() }` needs `List` to already be a key
    // of `map` while `Cons`'s argument types are being lowered.
    for decl in decls {
        let ty_args: Vec<TyVar> = decl.ty_args.iter().map(|n| TyVar(n.clone())).collect();
        map.insert(decl.name.clone(), TypeInfo { ty_args, constructors: Vec::new() });
    }
    for decl in decls {
        let ty_args = map[&decl.name].ty_args.clone();
        let mut constructors = Vec::with_capacity(decl.constructors.len());
        for ctor in &decl.constructors {
            constructors.push(lower_constructor(map, &ty_args, ctor)?);
        }
        map.get_mut(&decl.name).unwrap().constructors = constructors;
    }
    Ok(())
}

fn lower_constructor(
    map: &TypeMap,
    ty_args: &[TyVar],
    ctor: &ConstructorDecl,
) -> Result<DataConstructor, TypeError> {
    let arg_types = ctor
        .arg_types
        .iter()
        .map(|t| lower_type_expr(map, ty_args, t))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DataConstructor { name: ctor.name.clone(), arg_types })
}

fn lower_type_expr(
    map: &TypeMap,
    ty_args: &[TyVar],
    expr: &TypeExpr,
) -> Result<Monotype, TypeError> {
    match expr {
        TypeExpr::Var(name) => {
            let var = TyVar(name.clone());
            if ty_args.contains(&var) {
                Ok(Monotype::Var(var))
            } else {
                Err(TypeError::UnknownType { name: name.clone() })
            }
        }
        TypeExpr::Con(name, args) => {
            if !map.contains_key(name) {
                return Err(TypeError::UnknownType { name: name.clone() });
            }
            let args = args
                .iter()
                .map(|a| lower_type_expr(map, ty_args, a))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Monotype::Constructor(name.clone(), args))
        }
    }
}
