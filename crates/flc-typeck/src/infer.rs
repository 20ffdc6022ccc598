//! The inference judgement: `infer(e)` traverses a surface expression and
//! produces its monotype, threading the mutable `InferCtx` and a persistent
//! `Environment`.

use rustc_hash::FxHashMap;

use flc_common::Name;
use flc_syntax::{Expr, Pattern};

use crate::env::Environment;
use crate::error::TypeError;
use crate::ty::{self, Monotype, Polytype, TyVar};
use crate::typemap::TypeMap;
use crate::unify::InferCtx;

pub fn infer(
    ctx: &mut InferCtx,
    type_map: &TypeMap,
    env: &Environment,
    expr: &Expr,
) -> Result<Monotype, TypeError> {
    match expr {
        Expr::Int(_) => Ok(Monotype::int()),
        Expr::Bool(_) => Ok(Monotype::bool()),

        Expr::Var(name) => {
            let poly = env
                .lookup(name)
                .ok_or_else(|| TypeError::UnknownVariable { name: name.clone() })?
                .clone();
            Ok(ctx.instantiate(&poly))
        }

        Expr::Lambda(x, body) => {
            let alpha = ctx.fresh_unknown();
            let t_body = env.bind_name(x.clone(), Polytype::mono(alpha.clone()), |env2| {
                infer(ctx, type_map, env2, body)
            })?;
            Ok(Monotype::function(alpha, t_body))
        }

        Expr::App(f, a) => {
            let t_f = infer(ctx, type_map, env, f)?;
            let t_a = infer(ctx, type_map, env, a)?;
            let beta = ctx.fresh_unknown();
            ctx.unify(&t_f, &Monotype::function(t_a, beta.clone()))?;
            Ok(beta)
        }

        Expr::Let(x, e1, e2) => {
            let t1 = infer(ctx, type_map, env, e1)?;
            let scheme = ctx.generalize(env, &t1);
            env.bind_name(x.clone(), scheme, |env2| infer(ctx, type_map, env2, e2))
        }

        Expr::LetRec(f, e1, e2) => {
            let alpha = ctx.fresh_unknown();
            let t1 = env.bind_name(f.clone(), Polytype::mono(alpha.clone()), |env2| {
                infer(ctx, type_map, env2, e1)
            })?;
            ctx.unify(&alpha, &t1)?;
            let scheme = ctx.generalize(env, &t1);
            env.bind_name(f.clone(), scheme, |env2| infer(ctx, type_map, env2, e2))
        }

        Expr::If(c, t, e) => {
            let t_c = infer(ctx, type_map, env, c)?;
            ctx.unify(&t_c, &Monotype::bool())?;
            let t_t = infer(ctx, type_map, env, t)?;
            let t_e = infer(ctx, type_map, env, e)?;
            ctx.unify(&t_t, &t_e)?;
            Ok(t_t)
        }

        Expr::Match(scrutinee, cases) => {
            let t_s = infer(ctx, type_map, env, scrutinee)?;
            let rho = ctx.fresh_unknown();
            for case in cases {
                let bindings = infer_pattern(ctx, type_map, &case.pattern, &t_s)?;
                let t_body =
                    bind_all(env, bindings, |env2| infer(ctx, type_map, env2, &case.body))?;
                ctx.unify(&t_body, &rho)?;
            }
            Ok(rho)
        }

        Expr::Construction(ty_name, ctor_name, args) => {
            let info = type_map
                .get(ty_name)
                .ok_or_else(|| TypeError::UnknownType { name: ty_name.clone() })?;
            let ctor = info.find_constructor(ctor_name).ok_or_else(|| {
                TypeError::UnknownConstructor { ty: ty_name.clone(), ctor: ctor_name.clone() }
            })?;
            let subst: FxHashMap<TyVar, Monotype> =
                info.ty_args.iter().map(|v| (v.clone(), ctx.fresh_unknown())).collect();
            let applied_args: Vec<Monotype> =
                info.ty_args.iter().map(|v| subst[v].clone()).collect();
            let result_ty = Monotype::Constructor(ty_name.clone(), applied_args);

            let declared = ctor.arg_types.clone();
            if args.len() != declared.len() {
                return Err(TypeError::ArityMismatch {
                    ty: ty_name.clone(),
                    ctor: ctor_name.clone(),
                    expected: declared.len(),
                    found: args.len(),
                });
            }
            for (arg_expr, declared_ty) in args.iter().zip(declared.iter()) {
                let expected = ty::substitute_ty_vars(declared_ty, &subst);
                let actual = infer(ctx, type_map, env, arg_expr)?;
                ctx.unify(&actual, &expected)?;
            }
            Ok(result_ty)
        }
    }
}

/// Type a pattern against `expected`, returning the `(name, type)` bindings
/// it introduces in left-to-right order. Shadowing within one pattern is
/// permitted -- later bindings simply appear later in the returned list.
pub fn infer_pattern(
    ctx: &mut InferCtx,
    type_map: &TypeMap,
    pattern: &Pattern,
    expected: &Monotype,
) -> Result<Vec<(Name, Monotype)>, TypeError> {
    match pattern {
        Pattern::Var(name) => Ok(vec![(name.clone(), expected.clone())]),
        Pattern::Constructor { ty, ctor, fields } => {
            let info = type_map
                .get(ty)
                .ok_or_else(|| TypeError::UnknownType { name: ty.clone() })?;
            let data_ctor = info.find_constructor(ctor).ok_or_else(|| {
                TypeError::UnknownConstructor { ty: ty.clone(), ctor: ctor.clone() }
            })?;
            let subst: FxHashMap<TyVar, Monotype> =
                info.ty_args.iter().map(|v| (v.clone(), ctx.fresh_unknown())).collect();
            let applied_args: Vec<Monotype> =
                info.ty_args.iter().map(|v| subst[v].clone()).collect();
            let applied_ty = Monotype::Constructor(ty.clone(), applied_args);
            ctx.unify(expected, &applied_ty)?;

            let declared = data_ctor.arg_types.clone();
            if fields.len() != declared.len() {
                return Err(TypeError::ArityMismatch {
                    ty: ty.clone(),
                    ctor: ctor.clone(),
                    expected: declared.len(),
                    found: fields.len(),
                });
            }
            let mut bindings = Vec::new();
            for (field_pat, declared_ty) in fields.iter().zip(declared.iter()) {
                let field_expected = ty::substitute_ty_vars(declared_ty, &subst);
                bindings.extend(infer_pattern(ctx, type_map, field_pat, &field_expected)?);
            }
            Ok(bindings)
        }
    }
}

/// Fold a list of pattern-introduced bindings into nested `bind_name` scopes
/// before running `action` under all of them at once.
fn bind_all<T>(
    env: &Environment,
    mut bindings: Vec<(Name, Monotype)>,
    action: impl FnOnce(&Environment) -> T,
) -> T {
    if bindings.is_empty() {
        return action(env);
    }
    let (name, ty) = bindings.remove(0);
    env.bind_name(name, Polytype::mono(ty), |env2| bind_all(env2, bindings, action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flc_syntax::{ConstructorDecl, MatchCase, TypeDecl};

    fn run(expr: Expr) -> Result<Monotype, TypeError> {
        let mut ctx = InferCtx::new();
        let type_map = crate::typemap::prelude_type_map();
        let env = Environment::new();
        infer(&mut ctx, &type_map, &env, &expr).map(|t| ctx.resolve(&t))
    }

    #[test]
    fn identity_polymorphism() {
        // let id = \x. x in id
        let expr = Expr::Let(
            Name::new("id"),
            Box::new(Expr::Lambda(Name::new("x"), Box::new(Expr::Var(Name::new("x"))))),
            Box::new(Expr::Var(Name::new("id"))),
        );
        let mut ctx = InferCtx::new();
        let type_map = crate::typemap::prelude_type_map();
        let env = Environment::new();
        let ty = infer(&mut ctx, &type_map, &env, &expr).unwrap();
        match ctx.resolve(&ty) {
            Monotype::Function(arg, result) => assert_eq!(*arg, *result),
            other => panic!("expected a function type, got {:?}", other),
        }
    }

    #[test]
    fn occurs_check_on_self_application() {
        // \x. x x
        let expr = Expr::Lambda(
            Name::new("x"),
            Box::new(Expr::App(
                Box::new(Expr::Var(Name::new("x"))),
                Box::new(Expr::Var(Name::new("x"))),
            )),
        );
        let result = run(expr);
        assert!(matches!(result, Err(TypeError::OccursCheck { .. })));
    }

    #[test]
    fn if_branches_must_agree() {
        let ok = Expr::If(
            Box::new(Expr::Bool(true)),
            Box::new(Expr::Int(1)),
            Box::new(Expr::Int(2)),
        );
        assert_eq!(run(ok).unwrap(), Monotype::int());

        let bad = Expr::If(
            Box::new(Expr::Int(1)),
            Box::new(Expr::Int(1)),
            Box::new(Expr::Int(2)),
        );
        assert!(matches!(run(bad), Err(TypeError::UnifyMismatch { .. })));
    }

    #[test]
    fn maybe_match_infers_applied_constructor_type() {
        let mut type_map = crate::typemap::prelude_type_map();
        let decl = TypeDecl {
            name: Name::new("Maybe"),
            ty_args: vec![Name::new("a")],
            constructors: vec![
                ConstructorDecl { name: Name::new("Nothing"), arg_types: vec![] },
                ConstructorDecl {
                    name: Name::new("Just"),
                    arg_types: vec![flc_syntax::TypeExpr::Var(Name::new("a"))],
                },
            ],
        };
        crate::typemap::register_type_decls(&mut type_map, &[decl]).unwrap();

        // \m. match m { Maybe::Just(x) -> x, Maybe::Nothing() -> 0 }
        let expr = Expr::Lambda(
            Name::new("m"),
            Box::new(Expr::Match(
                Box::new(Expr::Var(Name::new("m"))),
                vec![
                    MatchCase {
                        pattern: Pattern::Constructor {
                            ty: Name::new("Maybe"),
                            ctor: Name::new("Just"),
                            fields: vec![Pattern::Var(Name::new("x"))],
                        },
                        body: Expr::Var(Name::new("x")),
                    },
                    MatchCase {
                        pattern: Pattern::Constructor {
                            ty: Name::new("Maybe"),
                            ctor: Name::new("Nothing"),
                            fields: vec![],
                        },
                        body: Expr::Int(0),
                    },
                ],
            )),
        );

        let mut ctx = InferCtx::new();
        let env = Environment::new();
        let ty = infer(&mut ctx, &type_map, &env, &expr).unwrap();
        let resolved = ctx.resolve(&ty);
        match resolved {
            Monotype::Function(arg, result) => {
                assert_eq!(*arg, Monotype::Constructor(Name::new("Maybe"), vec![Monotype::int()]));
                assert_eq!(*result, Monotype::int());
            }
            other => panic!("expected a function type, got {:?}", other),
        }
    }

    #[test]
    fn construction_infers_applied_type_not_int() {
        let mut type_map = crate::typemap::prelude_type_map();
        let decl = TypeDecl {
            name: Name::new("Maybe"),
            ty_args: vec![Name::new("a")],
            constructors: vec![ConstructorDecl {
                name: Name::new("Just"),
                arg_types: vec![flc_syntax::TypeExpr::Var(Name::new("a"))],
            }],
        };
        crate::typemap::register_type_decls(&mut type_map, &[decl]).unwrap();

        let expr = Expr::Construction(Name::new("Maybe"), Name::new("Just"), vec![Expr::Int(1)]);
        let mut ctx = InferCtx::new();
        let env = Environment::new();
        let ty = infer(&mut ctx, &type_map, &env, &expr).unwrap();
        assert_eq!(
            ctx.resolve(&ty),
            Monotype::Constructor(Name::new("Maybe"), vec![Monotype::int()])
        );
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let expr = Expr::Var(Name::new("nope"));
        assert!(matches!(run(expr), Err(TypeError::UnknownVariable { .. })));
    }

    #[test]
    fn no_builtin_prelude_bindings_beyond_int_and_bool() {
        // The checker must not pre-insert an `isEven`-style binding; only
        // `Int`/`Bool` exist in a fresh environment.
        let expr = Expr::Var(Name::new("isEven"));
        assert!(matches!(run(expr), Err(TypeError::UnknownVariable { .. })));
    }

    #[test]
    fn fibonacci_via_let_rec_type_checks_as_int() {
        // let rec fib = \x. if eq_int x 1 then 1 else if eq_int x 2 then 1
        //                   else add (fib (sub x 1)) (fib (sub x 2))
        // in fib 10
        fn int_binop() -> Polytype {
            Polytype::mono(Monotype::function(
                Monotype::int(),
                Monotype::function(Monotype::int(), Monotype::int()),
            ))
        }
        fn eq_int_ty() -> Polytype {
            Polytype::mono(Monotype::function(
                Monotype::int(),
                Monotype::function(Monotype::int(), Monotype::bool()),
            ))
        }

        let body = Expr::If(
            Box::new(Expr::App(
                Box::new(Expr::App(
                    Box::new(Expr::Var(Name::new("eq_int"))),
                    Box::new(Expr::Var(Name::new("x"))),
                )),
                Box::new(Expr::Int(1)),
            )),
            Box::new(Expr::Int(1)),
            Box::new(Expr::If(
                Box::new(Expr::App(
                    Box::new(Expr::App(
                        Box::new(Expr::Var(Name::new("eq_int"))),
                        Box::new(Expr::Var(Name::new("x"))),
                    )),
                    Box::new(Expr::Int(2)),
                )),
                Box::new(Expr::Int(1)),
                Box::new(Expr::App(
                    Box::new(Expr::App(
                        Box::new(Expr::Var(Name::new("add"))),
                        Box::new(Expr::App(
                            Box::new(Expr::Var(Name::new("fib"))),
                            Box::new(Expr::App(
                                Box::new(Expr::App(
                                    Box::new(Expr::Var(Name::new("sub"))),
                                    Box::new(Expr::Var(Name::new("x"))),
                                )),
                                Box::new(Expr::Int(1)),
                            )),
                        )),
                    )),
                    Box::new(Expr::App(
                        Box::new(Expr::Var(Name::new("fib"))),
                        Box::new(Expr::App(
                            Box::new(Expr::App(
                                Box::new(Expr::Var(Name::new("sub"))),
                                Box::new(Expr::Var(Name::new("x"))),
                            )),
                            Box::new(Expr::Int(2)),
                        )),
                    )),
                )),
            )),
        );

        let expr = Expr::LetRec(
            Name::new("fib"),
            Box::new(Expr::Lambda(Name::new("x"), Box::new(body))),
            Box::new(Expr::App(Box::new(Expr::Var(Name::new("fib"))), Box::new(Expr::Int(10)))),
        );

        let mut ctx = InferCtx::new();
        let type_map = crate::typemap::prelude_type_map();
        let env = Environment::new();
        let env = env.bind_name(Name::new("add"), int_binop(), |e| e.clone());
        let env = env.bind_name(Name::new("sub"), int_binop(), |e| e.clone());
        let env = env.bind_name(Name::new("eq_int"), eq_int_ty(), |e| e.clone());

        let ty = infer(&mut ctx, &type_map, &env, &expr).unwrap();
        assert_eq!(ctx.resolve(&ty), Monotype::int());
    }
}
