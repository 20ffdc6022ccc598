//! Substitution, zonking, unification, instantiation and generalization.
//!
//! Implements the core of Hindley-Milner inference using `ena`'s union-find
//! table keyed by `Unknown`. The table is the growing `Substitution`
//! described by the spec: `solve_type` records `u -> t`, and `resolve`
//! (zonk) walks it to a fixed point.

use ena::unify::InPlaceUnificationTable;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::env::Environment;
use crate::error::TypeError;
use crate::ty::{self, Monotype, Polytype, TyVar, Unknown};

/// Owns the unification table and the monotonic fresh-unknown supply.
pub struct InferCtx {
    table: InPlaceUnificationTable<Unknown>,
}

impl InferCtx {
    pub fn new() -> Self {
        InferCtx { table: InPlaceUnificationTable::new() }
    }

    /// Produce a fresh, unbound metavariable.
    pub fn fresh_unknown(&mut self) -> Monotype {
        Monotype::Unknown(self.table.new_key(None))
    }

    /// Zonk: recursively resolve all unknowns in a monotype through the
    /// current substitution.
    pub fn resolve(&mut self, ty: &Monotype) -> Monotype {
        match ty {
            Monotype::Unknown(u) => match self.table.probe_value(*u) {
                Some(inner) => self.resolve(&inner),
                None => Monotype::Unknown(self.table.find(*u)),
            },
            Monotype::Var(_) => ty.clone(),
            Monotype::Function(arg, result) => {
                Monotype::function(self.resolve(arg), self.resolve(result))
            }
            Monotype::Constructor(name, args) => {
                Monotype::Constructor(name.clone(), args.iter().map(|a| self.resolve(a)).collect())
            }
        }
    }

    /// `u` occurs anywhere inside `t` after zonking, with the reflexive
    /// identity `Unknown(u)` itself always allowed to pass.
    fn occurs_check(&mut self, u: Unknown, t: &Monotype) -> bool {
        match t {
            Monotype::Unknown(v) => {
                if *v == u {
                    return false;
                }
                match self.table.probe_value(*v) {
                    Some(inner) => self.occurs_check(u, &inner),
                    None => false,
                }
            }
            Monotype::Var(_) => false,
            Monotype::Function(arg, result) => {
                self.occurs_check(u, arg) || self.occurs_check(u, result)
            }
            Monotype::Constructor(_, args) => args.iter().any(|a| self.occurs_check(u, a)),
        }
    }

    fn solve_type(&mut self, u: Unknown, t: Monotype) -> Result<(), TypeError> {
        if self.occurs_check(u, &t) {
            return Err(TypeError::OccursCheck { unknown: u, ty: t });
        }
        self.table
            .unify_var_value(u, Some(t))
            .expect("solve_type: binding after a passed occurs check cannot fail");
        Ok(())
    }

    /// Unify two monotypes, recording constraints in the substitution.
    pub fn unify(&mut self, t1: &Monotype, t2: &Monotype) -> Result<(), TypeError> {
        let t1 = self.resolve(t1);
        let t2 = self.resolve(t2);

        match (&t1, &t2) {
            (Monotype::Unknown(u1), Monotype::Unknown(u2)) if u1 == u2 => Ok(()),
            (Monotype::Unknown(u1), Monotype::Unknown(u2)) => {
                self.table
                    .unify_var_var(*u1, *u2)
                    .expect("unifying two unbound unknowns cannot fail");
                Ok(())
            }
            (Monotype::Unknown(u), other) | (other, Monotype::Unknown(u)) => {
                self.solve_type(*u, other.clone())
            }
            (a, b) if a == b => Ok(()),
            (Monotype::Constructor(n1, a1), Monotype::Constructor(n2, a2)) if n1 == n2 => {
                for (x, y) in a1.iter().zip(a2.iter()) {
                    self.unify(x, y)?;
                }
                Ok(())
            }
            (Monotype::Function(arg1, res1), Monotype::Function(arg2, res2)) => {
                self.unify(arg1, arg2)?;
                self.unify(res1, res2)
            }
            (a, b) => Err(TypeError::UnifyMismatch {
                expected: a.clone(),
                found: b.clone(),
            }),
        }
    }

    /// Replace each quantified variable of `polytype` with a fresh unknown.
    pub fn instantiate(&mut self, polytype: &Polytype) -> Monotype {
        if polytype.vars.is_empty() {
            return polytype.body.clone();
        }
        let subst: FxHashMap<TyVar, Monotype> = polytype
            .vars
            .iter()
            .map(|v| (v.clone(), self.fresh_unknown()))
            .collect();
        ty::substitute_ty_vars(&polytype.body, &subst)
    }

    /// Zonk `t`, quantify over every free unknown not free in `env`,
    /// assigning deterministic single-letter names in order of first
    /// encounter.
    pub fn generalize(&mut self, env: &Environment, t: &Monotype) -> Polytype {
        let resolved = self.resolve(t);
        let env_unknowns = env.unknowns(self);
        let mut order = Vec::new();
        collect_unknowns_ordered(&resolved, &mut order, &mut FxHashSet::default());

        let mut mapping: FxHashMap<Unknown, TyVar> = FxHashMap::default();
        let mut vars = Vec::new();
        let mut next_letter = 0u32;
        for u in order {
            if env_unknowns.contains(&u) {
                continue;
            }
            let letter = fresh_letter(&mut next_letter);
            mapping.insert(u, letter.clone());
            vars.push(letter);
        }

        let body = replace_unknowns_with_vars(&resolved, &mapping);
        Polytype { vars, body }
    }
}

impl Default for InferCtx {
    fn default() -> Self {
        Self::new()
    }
}

fn fresh_letter(next: &mut u32) -> TyVar {
    let letter = (b'a' + (*next % 26) as u8) as char;
    let suffix = *next / 26;
    *next += 1;
    let name = if suffix == 0 {
        letter.to_string()
    } else {
        format!("{}{}", letter, suffix)
    };
    TyVar(flc_common::Name::new(name))
}

fn collect_unknowns_ordered(ty: &Monotype, out: &mut Vec<Unknown>, seen: &mut FxHashSet<Unknown>) {
    match ty {
        Monotype::Var(_) => {}
        Monotype::Unknown(u) => {
            if seen.insert(*u) {
                out.push(*u);
            }
        }
        Monotype::Function(arg, result) => {
            collect_unknowns_ordered(arg, out, seen);
            collect_unknowns_ordered(result, out, seen);
        }
        Monotype::Constructor(_, args) => {
            for a in args {
                collect_unknowns_ordered(a, out, seen);
            }
        }
    }
}

fn replace_unknowns_with_vars(ty: &Monotype, mapping: &FxHashMap<Unknown, TyVar>) -> Monotype {
    match ty {
        Monotype::Var(_) => ty.clone(),
        Monotype::Unknown(u) => match mapping.get(u) {
            Some(v) => Monotype::Var(v.clone()),
            None => ty.clone(),
        },
        Monotype::Function(arg, result) => Monotype::function(
            replace_unknowns_with_vars(arg, mapping),
            replace_unknowns_with_vars(result, mapping),
        ),
        Monotype::Constructor(name, args) => Monotype::Constructor(
            name.clone(),
            args.iter().map(|a| replace_unknowns_with_vars(a, mapping)).collect(),
        ),
    }
}
