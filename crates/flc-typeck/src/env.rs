//! The type environment: a mapping from names to polytypes, with scoped
//! bindings.
//!
//! `bind_name` must preserve stack discipline: the binding it introduces is
//! visible only for the dynamic extent of `action`, restored exactly
//! afterward (removed if previously absent, reinstated if previously
//! present) even if `action` unwinds. Rather than mutate a shared table and
//! restore it on drop, `Environment` is a small, cheaply-cloned persistent
//! map: `bind_name` clones the map, extends the clone, and hands it to
//! `action`. The caller's own `Environment` is never touched, so restoration
//! is automatic -- there is nothing to undo, and a panic inside `action`
//! cannot leave stale bindings behind.

use rustc_hash::FxHashMap;

use flc_common::Name;

use crate::ty::{Monotype, Polytype, Unknown};
use crate::unify::InferCtx;

#[derive(Clone, Debug, Default)]
pub struct Environment {
    bindings: FxHashMap<Name, Polytype>,
}

impl Environment {
    pub fn new() -> Self {
        Environment { bindings: FxHashMap::default() }
    }

    pub fn lookup(&self, name: &Name) -> Option<&Polytype> {
        self.bindings.get(name)
    }

    /// Bind `name` to `polytype` for the dynamic extent of `action`.
    pub fn bind_name<T>(
        &self,
        name: Name,
        polytype: Polytype,
        action: impl FnOnce(&Environment) -> T,
    ) -> T {
        let mut extended = self.clone();
        extended.bindings.insert(name, polytype);
        action(&extended)
    }

    /// The union of free unknown ids across all currently-bound polytype
    /// bodies, computed over zonked forms.
    pub fn unknowns(&self, ctx: &mut InferCtx) -> rustc_hash::FxHashSet<Unknown> {
        let mut out = rustc_hash::FxHashSet::default();
        for polytype in self.bindings.values() {
            let resolved = ctx.resolve(&polytype.body);
            collect_unknowns(&resolved, &mut out);
        }
        out
    }
}

fn collect_unknowns(ty: &Monotype, out: &mut rustc_hash::FxHashSet<Unknown>) {
    match ty {
        Monotype::Var(_) => {}
        Monotype::Unknown(u) => {
            out.insert(*u);
        }
        Monotype::Function(arg, result) => {
            collect_unknowns(arg, out);
            collect_unknowns(result, out);
        }
        Monotype::Constructor(_, args) => {
            for a in args {
                collect_unknowns(a, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_name_does_not_leak_past_action() {
        let env = Environment::new();
        let x = Name::new("x");
        let inside = env.bind_name(x.clone(), Polytype::mono(Monotype::int()), |inner| {
            inner.lookup(&x).cloned()
        });
        assert!(inside.is_some());
        assert!(env.lookup(&x).is_none());
    }

    #[test]
    fn bind_name_nests_and_restores_shadowing() {
        let env = Environment::new();
        let x = Name::new("x");
        env.bind_name(x.clone(), Polytype::mono(Monotype::int()), |outer| {
            let outer_ty = outer.lookup(&x).cloned().unwrap();
            outer.bind_name(x.clone(), Polytype::mono(Monotype::bool()), |inner| {
                assert_eq!(inner.lookup(&x).unwrap().body, Monotype::bool());
            });
            // after the nested bind_name returns, outer's view is unchanged
            assert_eq!(outer.lookup(&x).unwrap().body, outer_ty.body);
        });
    }
}
