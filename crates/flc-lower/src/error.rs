use std::fmt;

use flc_common::Name;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LowerError {
    /// `let rec name = <non-lambda>` -- recursion without a function to tie
    /// the knot through isn't representable once closures are hoisted to
    /// flat top-level declarations.
    NonFunctionLetRec { name: Name },
    /// A constructor pattern field itself destructures a constructor
    /// (`Cons(x, Cons(y, rest))`); only flat, single-level field patterns
    /// lower to a `flc_ir::Case`.
    NestedPatternNotSupported { ty: Name, ctor: Name },
    /// A bare `Pattern::Var` (catch-all) match arm -- `flc_ir::Case` always
    /// dispatches on a concrete constructor tag, so every arm must name one.
    WildcardMatchArmNotSupported,
    UnknownType { name: Name },
    UnknownConstructor { ty: Name, ctor: Name },
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerError::NonFunctionLetRec { name } => {
                write!(f, "`let rec {}` must bind a lambda", name)
            }
            LowerError::NestedPatternNotSupported { ty, ctor } => {
                write!(f, "nested constructor patterns are not supported: {}::{}", ty, ctor)
            }
            LowerError::WildcardMatchArmNotSupported => {
                write!(f, "catch-all match arms are not supported; every arm must name a constructor")
            }
            LowerError::UnknownType { name } => write!(f, "unknown type `{}`", name),
            LowerError::UnknownConstructor { ty, ctor } => {
                write!(f, "type `{}` has no constructor `{}`", ty, ctor)
            }
        }
    }
}

impl std::error::Error for LowerError {}
