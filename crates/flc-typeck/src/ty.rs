//! Type representation for the core type system.
//!
//! Defines monotypes, type variables, unification metavariables (`Unknown`),
//! and polymorphic type schemes (`Polytype`). These form the foundation of
//! Hindley-Milner type inference.

use std::fmt;

use flc_common::Name;
use rustc_hash::FxHashMap;

/// A rigid type variable, identified by name.
///
/// Rigid variables appear only inside a `Polytype`'s quantifier list or a
/// data constructor's declared argument types (e.g. the `a` in
/// `type Maybe<a> { ... }`). They are never touched by unification directly;
/// `instantiate` replaces them with fresh `Unknown`s at each use site.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyVar(pub Name);

impl fmt::Display for TyVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unification metavariable, identified by a fresh integer from the
/// checker's monotonic supply. The `ena` crate resolves these through a
/// union-find table owned by `InferCtx`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Unknown(pub u32);

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// A monotype: a type without universal quantification.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Monotype {
    /// A rigid type variable -- only meaningful under a `Polytype`'s binder.
    Var(TyVar),
    /// A unification metavariable.
    Unknown(Unknown),
    /// A function type: `arg -> result`.
    Function(Box<Monotype>, Box<Monotype>),
    /// An applied type constructor: `name<arguments...>`. Nullary constructors
    /// (e.g. `Int`) have an empty argument list.
    Constructor(Name, Vec<Monotype>),
}

impl Monotype {
    pub fn int() -> Monotype {
        Monotype::Constructor(Name::new("Int"), Vec::new())
    }

    pub fn bool() -> Monotype {
        Monotype::Constructor(Name::new("Bool"), Vec::new())
    }

    pub fn function(arg: Monotype, result: Monotype) -> Monotype {
        Monotype::Function(Box::new(arg), Box::new(result))
    }

    pub fn constructor(name: impl Into<Name>, arguments: Vec<Monotype>) -> Monotype {
        Monotype::Constructor(name.into(), arguments)
    }
}

impl fmt::Display for Monotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Monotype::Var(v) => write!(f, "{}", v),
            Monotype::Unknown(u) => write!(f, "{}", u),
            Monotype::Function(arg, result) => write!(f, "({} -> {})", arg, result),
            Monotype::Constructor(name, args) => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
        }
    }
}

/// A polymorphic type scheme: a monotype closed under a prenex universal
/// quantifier over `vars`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polytype {
    pub vars: Vec<TyVar>,
    pub body: Monotype,
}

impl Polytype {
    /// A monomorphic scheme -- no quantified variables.
    pub fn mono(body: Monotype) -> Self {
        Polytype { vars: Vec::new(), body }
    }
}

impl fmt::Display for Polytype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.vars.is_empty() {
            write!(f, "{}", self.body)
        } else {
            write!(f, "forall")?;
            for v in &self.vars {
                write!(f, " {}", v)?;
            }
            write!(f, ". {}", self.body)
        }
    }
}

/// A data constructor belonging to a declared ADT: `(name, argTypes)`. Argument
/// types may reference the owning declaration's `ty_args`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataConstructor {
    pub name: Name,
    pub arg_types: Vec<Monotype>,
}

/// Everything the checker knows about a declared ADT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    pub ty_args: Vec<TyVar>,
    pub constructors: Vec<DataConstructor>,
}

impl TypeInfo {
    pub fn find_constructor(&self, name: &Name) -> Option<&DataConstructor> {
        self.constructors.iter().find(|c| &c.name == name)
    }
}

/// Replace each rigid `Var` in `ty` found in `subst` with its mapped
/// monotype. Used to apply a declaration's `ty_args -> fresh unknown`
/// mapping to a constructor's declared argument types, and to instantiate a
/// `Polytype`'s quantified variables.
pub fn substitute_ty_vars(ty: &Monotype, subst: &FxHashMap<TyVar, Monotype>) -> Monotype {
    match ty {
        Monotype::Var(v) => subst.get(v).cloned().unwrap_or_else(|| ty.clone()),
        Monotype::Unknown(_) => ty.clone(),
        Monotype::Function(arg, result) => Monotype::function(
            substitute_ty_vars(arg, subst),
            substitute_ty_vars(result, subst),
        ),
        Monotype::Constructor(name, args) => Monotype::Constructor(
            name.clone(),
            args.iter().map(|a| substitute_ty_vars(a, subst)).collect(),
        ),
    }
}

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for Unknown {
    type Value = Option<Monotype>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        Unknown(u)
    }

    fn tag() -> &'static str {
        "Unknown"
    }
}

impl ena::unify::EqUnifyValue for Monotype {}
