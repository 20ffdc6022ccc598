//! Free-variable computation over the surface expression tree.
//!
//! Used to compute a hoisted lambda's capture list. Names are returned in
//! order of first appearance so capture order -- and therefore the hoisted
//! declaration's argument order -- is deterministic.

use rustc_hash::FxHashSet;

use flc_common::Name;
use flc_syntax::{Expr, Pattern};

pub fn free_variables(bound: &FxHashSet<Name>, expr: &Expr) -> Vec<Name> {
    let mut order = Vec::new();
    let mut seen = FxHashSet::default();
    collect(bound, expr, &mut order, &mut seen);
    order
}

fn record(name: &Name, bound: &FxHashSet<Name>, order: &mut Vec<Name>, seen: &mut FxHashSet<Name>) {
    if !bound.contains(name) && seen.insert(name.clone()) {
        order.push(name.clone());
    }
}

fn with(bound: &FxHashSet<Name>, extra: Name) -> FxHashSet<Name> {
    let mut b = bound.clone();
    b.insert(extra);
    b
}

fn collect(bound: &FxHashSet<Name>, expr: &Expr, order: &mut Vec<Name>, seen: &mut FxHashSet<Name>) {
    match expr {
        Expr::Int(_) | Expr::Bool(_) => {}
        Expr::Var(name) => record(name, bound, order, seen),
        Expr::Lambda(param, body) => collect(&with(bound, param.clone()), body, order, seen),
        Expr::App(f, a) => {
            collect(bound, f, order, seen);
            collect(bound, a, order, seen);
        }
        Expr::Let(name, value, cont) => {
            collect(bound, value, order, seen);
            collect(&with(bound, name.clone()), cont, order, seen);
        }
        Expr::LetRec(name, value, cont) => {
            let inner = with(bound, name.clone());
            collect(&inner, value, order, seen);
            collect(&inner, cont, order, seen);
        }
        Expr::If(c, t, e) => {
            collect(bound, c, order, seen);
            collect(bound, t, order, seen);
            collect(bound, e, order, seen);
        }
        Expr::Match(scrutinee, cases) => {
            collect(bound, scrutinee, order, seen);
            for case in cases {
                let mut inner = bound.clone();
                collect_pattern_names(&case.pattern, &mut inner);
                collect(&inner, &case.body, order, seen);
            }
        }
        Expr::Construction(_, _, args) => {
            for a in args {
                collect(bound, a, order, seen);
            }
        }
    }
}

fn collect_pattern_names(pattern: &Pattern, out: &mut FxHashSet<Name>) {
    match pattern {
        Pattern::Var(name) => {
            out.insert(name.clone());
        }
        Pattern::Constructor { fields, .. } => {
            for field in fields {
                collect_pattern_names(field, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_outer_name_not_own_param() {
        // \x. add x y -- captures `y`, not `x` or `add` (a free builtin, still "free").
        let body = Expr::App(
            Box::new(Expr::App(
                Box::new(Expr::Var(Name::new("add"))),
                Box::new(Expr::Var(Name::new("x"))),
            )),
            Box::new(Expr::Var(Name::new("y"))),
        );
        let bound: FxHashSet<Name> = std::iter::once(Name::new("x")).collect();
        let free = free_variables(&bound, &body);
        assert_eq!(free, vec![Name::new("add"), Name::new("y")]);
    }
}
