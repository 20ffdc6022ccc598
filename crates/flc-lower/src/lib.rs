//! Closure conversion and IR lowering.
//!
//! Turns the surface expression tree (`flc-syntax`) into the flat,
//! locally-nameless IR (`flc-ir`): every lambda is hoisted into its own
//! top-level `Declaration`, and each occurrence of the value it used to be
//! is rewritten into a partial application of that declaration to its
//! captured free variables. The residual expression left behind only ever
//! references declarations (its own hoisted functions, or a runtime
//! primitive like `add`) and locally bound names.

mod error;
mod freevars;

pub use error::LowerError;

use rustc_hash::FxHashMap;

use flc_common::{FreshSupply, Name};
use flc_ir::{Case, Declaration, Expression, LNName};
use flc_syntax::{Expr, MatchCase, Pattern};
use flc_typeck::TypeMap;

/// Every hoisted declaration plus the residual top-level expression.
#[derive(Debug, PartialEq)]
pub struct LoweredProgram {
    pub declarations: Vec<Declaration>,
    pub body: Expression,
}

pub fn lower_program(type_map: &TypeMap, expr: &Expr) -> Result<LoweredProgram, LowerError> {
    let mut lowerer = Lowerer {
        type_map,
        fresh: FreshSupply::new(),
        declarations: Vec::new(),
        renames: FxHashMap::default(),
    };
    let body = lowerer.lower(&[], expr)?;
    Ok(LoweredProgram { declarations: lowerer.declarations, body })
}

/// A `Vec` of frames, innermost last -- the binder stack currently open
/// while lowering the body of the declaration being built.
type Scope = [Vec<Name>];

/// Where a hoisted lambda's identity was rewritten to: the flat declaration
/// it became, plus the free variables it closed over, in the order they
/// were bound as that declaration's leading parameters.
#[derive(Clone)]
struct Hoisted {
    declaration: Name,
    captures: Vec<Name>,
}

struct Lowerer<'a> {
    type_map: &'a TypeMap,
    fresh: FreshSupply,
    declarations: Vec<Declaration>,
    renames: FxHashMap<Name, Hoisted>,
}

fn resolve_index(scope: &Scope, name: &Name) -> Option<u32> {
    let mut base = 0u32;
    for frame in scope.iter().rev() {
        if let Some(pos) = frame.iter().position(|n| n == name) {
            return Some(base + pos as u32);
        }
        base += frame.len() as u32;
    }
    None
}

fn push_frame(scope: &Scope, frame: Vec<Name>) -> Vec<Vec<Name>> {
    let mut extended = scope.to_vec();
    extended.push(frame);
    extended
}

impl<'a> Lowerer<'a> {
    fn lower(&mut self, scope: &Scope, expr: &Expr) -> Result<Expression, LowerError> {
        match expr {
            Expr::Int(n) => Ok(Expression::Int(*n)),
            Expr::Bool(b) => Ok(Expression::Bool(*b)),
            Expr::Var(name) => Ok(self.resolve_var(scope, name)),
            Expr::Lambda(param, body) => self.lower_anonymous_lambda(scope, param, body),
            Expr::App(f, a) => {
                let f = self.lower(scope, f)?;
                let a = self.lower(scope, a)?;
                Ok(Expression::Application(Box::new(f), Box::new(a)))
            }
            Expr::Let(name, value, cont) => self.lower_let(scope, name, value, cont, false),
            Expr::LetRec(name, value, cont) => self.lower_let(scope, name, value, cont, true),
            Expr::If(c, t, e) => Ok(Expression::If(
                Box::new(self.lower(scope, c)?),
                Box::new(self.lower(scope, t)?),
                Box::new(self.lower(scope, e)?),
            )),
            Expr::Match(scrutinee, cases) => self.lower_match(scope, scrutinee, cases),
            Expr::Construction(ty, ctor, args) => self.lower_construction(scope, ty, ctor, args),
        }
    }

    /// Resolve a surface name to either a de Bruijn reference into the
    /// currently open scope, a rewritten closure-valued call (for a name
    /// that used to denote a hoisted lambda), or a bare free reference (a
    /// runtime primitive, or another already-hoisted declaration).
    fn resolve_var(&self, scope: &Scope, name: &Name) -> Expression {
        if let Some(index) = resolve_index(scope, name) {
            return Expression::Var(LNName::Bound(index));
        }
        if let Some(hoisted) = self.renames.get(name).cloned() {
            let mut result = Expression::Var(LNName::Free(hoisted.declaration));
            for capture in &hoisted.captures {
                let arg = self.resolve_var(scope, capture);
                result = Expression::Application(Box::new(result), Box::new(arg));
            }
            return result;
        }
        Expression::Var(LNName::Free(name.clone()))
    }

    /// `\param. body` occurring somewhere other than as the immediate value
    /// of a `let`/`let rec` binding: hoist it under a freshly generated
    /// name and leave a partial application to its captures in its place.
    fn lower_anonymous_lambda(
        &mut self,
        scope: &Scope,
        param: &Name,
        body: &Expr,
    ) -> Result<Expression, LowerError> {
        let hoisted_name = self.fresh.next_name("lambda");
        let captures = self.hoist_lambda(scope, None, &hoisted_name, param, body)?;
        let mut result = Expression::Var(LNName::Free(hoisted_name));
        for capture in &captures {
            let arg = self.resolve_var(scope, capture);
            result = Expression::Application(Box::new(result), Box::new(arg));
        }
        Ok(result)
    }

    /// Build the hoisted `Declaration` for a lambda and return its capture
    /// list (in the order they become the declaration's leading arguments).
    /// `self_name`, when given, is the `let rec` name the lambda is bound
    /// to -- visible, as a recursive call, from inside its own body.
    fn hoist_lambda(
        &mut self,
        scope: &Scope,
        self_name: Option<&Name>,
        hoisted_name: &Name,
        param: &Name,
        body: &Expr,
    ) -> Result<Vec<Name>, LowerError> {
        let mut excluded: rustc_hash::FxHashSet<Name> = std::iter::once(param.clone()).collect();
        if let Some(n) = self_name {
            excluded.insert(n.clone());
        }
        let captures = freevars::free_variables(&excluded, body);

        let frame: Vec<Name> = captures.iter().cloned().chain(std::iter::once(param.clone())).collect();
        let body_scope = vec![frame];

        let previous_self_rename = self_name.map(|n| {
            let previous = self.renames.get(n).cloned();
            self.renames.insert(
                n.clone(),
                Hoisted { declaration: hoisted_name.clone(), captures: captures.clone() },
            );
            (n.clone(), previous)
        });

        let lowered_body = self.lower(&body_scope, body)?;

        if let Some((n, previous)) = previous_self_rename {
            match previous {
                Some(h) => {
                    self.renames.insert(n, h);
                }
                None => {
                    self.renames.remove(&n);
                }
            }
        }

        let mut arguments = captures.clone();
        arguments.push(param.clone());
        self.declarations.push(Declaration {
            name: hoisted_name.clone(),
            arguments,
            body: lowered_body,
        });
        Ok(captures)
    }

    fn lower_let(
        &mut self,
        scope: &Scope,
        name: &Name,
        value: &Expr,
        cont: &Expr,
        recursive: bool,
    ) -> Result<Expression, LowerError> {
        if let Expr::Lambda(param, body) = value {
            let hoisted_name = self.fresh.next_name(name.as_str());
            let self_name = if recursive { Some(name) } else { None };
            let captures = self.hoist_lambda(scope, self_name, &hoisted_name, param, body)?;

            let previous = self.renames.insert(
                name.clone(),
                Hoisted { declaration: hoisted_name, captures },
            );
            let result = self.lower(scope, cont);
            match previous {
                Some(h) => {
                    self.renames.insert(name.clone(), h);
                }
                None => {
                    self.renames.remove(name);
                }
            }
            result
        } else {
            if recursive {
                return Err(LowerError::NonFunctionLetRec { name: name.clone() });
            }
            let lowered_value = self.lower(scope, value)?;
            let inner_scope = push_frame(scope, vec![name.clone()]);
            let lowered_cont = self.lower(&inner_scope, cont)?;
            Ok(Expression::Let(Box::new(lowered_value), Box::new(lowered_cont)))
        }
    }

    fn lower_match(
        &mut self,
        scope: &Scope,
        scrutinee: &Expr,
        cases: &[MatchCase],
    ) -> Result<Expression, LowerError> {
        let lowered_scrutinee = self.lower(scope, scrutinee)?;
        let mut lowered_cases = Vec::with_capacity(cases.len());
        for case in cases {
            let (ty, ctor, field_names) = match &case.pattern {
                Pattern::Var(_) => return Err(LowerError::WildcardMatchArmNotSupported),
                Pattern::Constructor { ty, ctor, fields } => (ty, ctor, fields),
            };
            let tag = self.constructor_tag(ty, ctor)?;
            let mut names = Vec::with_capacity(field_names.len());
            for field in field_names {
                match field {
                    Pattern::Var(name) => names.push(name.clone()),
                    Pattern::Constructor { .. } => {
                        return Err(LowerError::NestedPatternNotSupported {
                            ty: ty.clone(),
                            ctor: ctor.clone(),
                        });
                    }
                }
            }
            let binders = names.len() as u32;
            let inner_scope = push_frame(scope, names);
            let body = self.lower(&inner_scope, &case.body)?;
            lowered_cases.push(Case { tag, binders, body });
        }
        Ok(Expression::Match(Box::new(lowered_scrutinee), lowered_cases))
    }

    fn constructor_tag(&self, ty: &Name, ctor: &Name) -> Result<u32, LowerError> {
        let info = self
            .type_map
            .get(ty)
            .ok_or_else(|| LowerError::UnknownType { name: ty.clone() })?;
        info.constructors
            .iter()
            .position(|c| &c.name == ctor)
            .map(|i| i as u32)
            .ok_or_else(|| LowerError::UnknownConstructor { ty: ty.clone(), ctor: ctor.clone() })
    }

    fn lower_construction(
        &mut self,
        scope: &Scope,
        ty: &Name,
        ctor: &Name,
        args: &[Expr],
    ) -> Result<Expression, LowerError> {
        let tag = self.constructor_tag(ty, ctor)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.lower(scope, arg)?);
        }
        Ok(Expression::Pack(tag, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flc_typeck::typemap::{prelude_type_map, register_type_decls};
    use flc_syntax::{ConstructorDecl, TypeDecl, TypeExpr};

    fn maybe_type_map() -> TypeMap {
        let mut map = prelude_type_map();
        let decl = TypeDecl {
            name: Name::new("Maybe"),
            ty_args: vec![Name::new("a")],
            constructors: vec![
                ConstructorDecl { name: Name::new("Nothing"), arg_types: vec![] },
                ConstructorDecl {
                    name: Name::new("Just"),
                    arg_types: vec![TypeExpr::Var(Name::new("a"))],
                },
            ],
        };
        register_type_decls(&mut map, &[decl]).unwrap();
        map
    }

    #[test]
    fn plain_lambda_hoists_with_no_captures() {
        let map = prelude_type_map();
        let expr = Expr::Lambda(Name::new("x"), Box::new(Expr::Var(Name::new("x"))));
        let lowered = lower_program(&map, &expr).unwrap();
        assert_eq!(lowered.declarations.len(), 1);
        let decl = &lowered.declarations[0];
        assert_eq!(decl.arguments, vec![Name::new("x")]);
        assert_eq!(decl.body, Expression::Var(LNName::Bound(0)));
        assert_eq!(lowered.body, Expression::Var(LNName::Free(decl.name.clone())));
    }

    #[test]
    fn lambda_captures_outer_let_binding() {
        let map = prelude_type_map();
        // let y = 1 in \x. add x y
        let inner = Expr::Lambda(
            Name::new("x"),
            Box::new(Expr::App(
                Box::new(Expr::App(
                    Box::new(Expr::Var(Name::new("add"))),
                    Box::new(Expr::Var(Name::new("x"))),
                )),
                Box::new(Expr::Var(Name::new("y"))),
            )),
        );
        let expr = Expr::Let(Name::new("y"), Box::new(Expr::Int(1)), Box::new(inner));
        let lowered = lower_program(&map, &expr).unwrap();
        assert_eq!(lowered.declarations.len(), 1);
        let decl = &lowered.declarations[0];
        // captures (y) come before the lambda's own parameter (x).
        assert_eq!(decl.arguments, vec![Name::new("y"), Name::new("x")]);
        // body: add (Bound(1)) (Bound(0))  -- x is position 1, y is position 0
        assert_eq!(
            decl.body,
            Expression::Application(
                Box::new(Expression::Application(
                    Box::new(Expression::Var(LNName::Free(Name::new("add")))),
                    Box::new(Expression::Var(LNName::Bound(1))),
                )),
                Box::new(Expression::Var(LNName::Bound(0))),
            )
        );
        // at the use site, the closure is applied to `y` resolved in the outer `Let` frame (Bound(0))
        match &lowered.body {
            Expression::Let(_, cont) => match cont.as_ref() {
                Expression::Application(f, a) => {
                    assert_eq!(**f, Expression::Var(LNName::Free(decl.name.clone())));
                    assert_eq!(**a, Expression::Var(LNName::Bound(0)));
                }
                other => panic!("expected Application, got {:?}", other),
            },
            other => panic!("expected Let, got {:?}", other),
        }
    }

    #[test]
    fn let_rec_self_reference_lowers_to_free_self_call() {
        let map = prelude_type_map();
        // let rec f = \x. f x in 0
        let body = Expr::App(
            Box::new(Expr::Var(Name::new("f"))),
            Box::new(Expr::Var(Name::new("x"))),
        );
        let expr = Expr::LetRec(
            Name::new("f"),
            Box::new(Expr::Lambda(Name::new("x"), Box::new(body))),
            Box::new(Expr::Int(0)),
        );
        let lowered = lower_program(&map, &expr).unwrap();
        let decl = &lowered.declarations[0];
        assert_eq!(decl.arguments, vec![Name::new("x")]);
        // self-call: Free(decl.name) applied to Bound(0) (its own x, re-supplied -- no captures here)
        assert_eq!(
            decl.body,
            Expression::Application(
                Box::new(Expression::Var(LNName::Free(decl.name.clone()))),
                Box::new(Expression::Var(LNName::Bound(0))),
            )
        );
    }

    #[test]
    fn match_on_maybe_assigns_tags_in_declared_order() {
        let map = maybe_type_map();
        let expr = Expr::Match(
            Box::new(Expr::Construction(Name::new("Maybe"), Name::new("Nothing"), vec![])),
            vec![
                MatchCase {
                    pattern: Pattern::Constructor {
                        ty: Name::new("Maybe"),
                        ctor: Name::new("Nothing"),
                        fields: vec![],
                    },
                    body: Expr::Int(0),
                },
                MatchCase {
                    pattern: Pattern::Constructor {
                        ty: Name::new("Maybe"),
                        ctor: Name::new("Just"),
                        fields: vec![Pattern::Var(Name::new("v"))],
                    },
                    body: Expr::Var(Name::new("v")),
                },
            ],
        );
        let lowered = lower_program(&map, &expr).unwrap();
        match lowered.body {
            Expression::Match(_, cases) => {
                assert_eq!(cases[0].tag, 0);
                assert_eq!(cases[0].binders, 0);
                assert_eq!(cases[1].tag, 1);
                assert_eq!(cases[1].binders, 1);
                assert_eq!(cases[1].body, Expression::Var(LNName::Bound(0)));
            }
            other => panic!("expected Match, got {:?}", other),
        }
    }

    #[test]
    fn non_function_let_rec_is_rejected() {
        let map = prelude_type_map();
        let expr = Expr::LetRec(Name::new("x"), Box::new(Expr::Int(1)), Box::new(Expr::Int(0)));
        let err = lower_program(&map, &expr).unwrap_err();
        assert_eq!(err, LowerError::NonFunctionLetRec { name: Name::new("x") });
    }
}
