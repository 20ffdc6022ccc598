//! End-to-end pipeline tests: surface `Expr` in, a finished `.wasm` module
//! out, exercising type-checking, lowering, and codegen together.

use flc_common::Name;
use flc_syntax::{ConstructorDecl, Expr, MatchCase, Pattern, TypeDecl, TypeExpr};

const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

fn compile(type_decls: &[TypeDecl], expr: &Expr) -> Vec<u8> {
    let (check_state, _scheme) = flc_typeck::check_program(type_decls, expr)
        .expect("program should type-check");
    let lowered = flc_lower::lower_program(&check_state.type_map, expr)
        .expect("program should lower");
    flc_codegen::compile(&lowered.declarations, &lowered.body)
        .expect("program should generate code")
}

fn var(name: &str) -> Expr {
    Expr::Var(Name::new(name))
}

fn app2(f: &str, a: Expr, b: Expr) -> Expr {
    Expr::App(Box::new(Expr::App(Box::new(var(f)), Box::new(a))), Box::new(b))
}

/// `let rec fib = \x. if eq_int x 1 then 1 else if eq_int x 2 then 1
/// else add (fib (sub x 1)) (fib (sub x 2)) in fib 10`
#[test]
fn fibonacci_type_checks_and_compiles() {
    let body = Expr::If(
        Box::new(app2("eq_int", var("x"), Expr::Int(1))),
        Box::new(Expr::Int(1)),
        Box::new(Expr::If(
            Box::new(app2("eq_int", var("x"), Expr::Int(2))),
            Box::new(Expr::Int(1)),
            Box::new(app2(
                "add",
                Expr::App(Box::new(var("fib")), Box::new(app2("sub", var("x"), Expr::Int(1)))),
                Expr::App(Box::new(var("fib")), Box::new(app2("sub", var("x"), Expr::Int(2)))),
            )),
        )),
    );
    let expr = Expr::LetRec(
        Name::new("fib"),
        Box::new(Expr::Lambda(Name::new("x"), Box::new(body))),
        Box::new(Expr::App(Box::new(var("fib")), Box::new(Expr::Int(10)))),
    );

    let (check_state, scheme) = flc_typeck::check_program(&[], &expr).unwrap();
    assert_eq!(scheme.to_string(), "Int");

    let lowered = flc_lower::lower_program(&check_state.type_map, &expr).unwrap();
    assert_eq!(lowered.declarations.len(), 1);

    let bytes = flc_codegen::compile(&lowered.declarations, &lowered.body).unwrap();
    assert_eq!(&bytes[0..4], &WASM_MAGIC);
}

fn list_type_decl() -> TypeDecl {
    TypeDecl {
        name: Name::new("List"),
        ty_args: vec![Name::new("a")],
        constructors: vec![
            ConstructorDecl {
                name: Name::new("Cons"),
                arg_types: vec![
                    TypeExpr::Var(Name::new("a")),
                    TypeExpr::Con(Name::new("List"), vec![TypeExpr::Var(Name::new("a"))]),
                ],
            },
            ConstructorDecl { name: Name::new("Nil"), arg_types: vec![] },
        ],
    }
}

fn cons(head: Expr, tail: Expr) -> Expr {
    Expr::Construction(Name::new("List"), Name::new("Cons"), vec![head, tail])
}

fn nil() -> Expr {
    Expr::Construction(Name::new("List"), Name::new("Nil"), vec![])
}

fn list_pattern_case(ctor: &str, fields: Vec<Pattern>, body: Expr) -> MatchCase {
    MatchCase {
        pattern: Pattern::Constructor { ty: Name::new("List"), ctor: Name::new(ctor), fields },
        body,
    }
}

/// `type List<a> { Cons(a, List<a>), Nil() }`; maps `\x. sub x 1` over
/// `Cons(1, Cons(2, Nil()))` and sums the result.
#[test]
fn mapping_and_summing_a_list_type_checks_and_compiles() {
    let type_decl = list_type_decl();

    let map_body = Expr::Match(
        Box::new(var("xs")),
        vec![
            list_pattern_case("Nil", vec![], nil()),
            list_pattern_case(
                "Cons",
                vec![Pattern::Var(Name::new("h")), Pattern::Var(Name::new("t"))],
                cons(
                    Expr::App(Box::new(var("f")), Box::new(var("h"))),
                    Expr::App(
                        Box::new(Expr::App(Box::new(var("mapList")), Box::new(var("f")))),
                        Box::new(var("t")),
                    ),
                ),
            ),
        ],
    );
    let map_list = Expr::Lambda(
        Name::new("f"),
        Box::new(Expr::Lambda(Name::new("xs"), Box::new(map_body))),
    );

    let sum_body = Expr::Match(
        Box::new(var("xs")),
        vec![
            list_pattern_case("Nil", vec![], Expr::Int(0)),
            list_pattern_case(
                "Cons",
                vec![Pattern::Var(Name::new("h")), Pattern::Var(Name::new("t"))],
                app2("add", var("h"), Expr::App(Box::new(var("sumList")), Box::new(var("t")))),
            ),
        ],
    );
    let sum_list = Expr::Lambda(Name::new("xs"), Box::new(sum_body));

    let decrement = Expr::Lambda(
        Name::new("x"),
        Box::new(app2("sub", var("x"), Expr::Int(1))),
    );
    let source_list = cons(Expr::Int(1), cons(Expr::Int(2), nil()));
    let mapped = Expr::App(
        Box::new(Expr::App(Box::new(var("mapList")), Box::new(decrement))),
        Box::new(source_list),
    );
    let summed = Expr::App(Box::new(var("sumList")), Box::new(mapped));

    let expr = Expr::LetRec(
        Name::new("mapList"),
        Box::new(map_list),
        Box::new(Expr::LetRec(Name::new("sumList"), Box::new(sum_list), Box::new(summed))),
    );

    let (check_state, scheme) = flc_typeck::check_program(&[type_decl.clone()], &expr).unwrap();
    assert_eq!(scheme.to_string(), "Int");

    let bytes = compile(&[type_decl], &expr);
    assert_eq!(&bytes[0..4], &WASM_MAGIC);
}
