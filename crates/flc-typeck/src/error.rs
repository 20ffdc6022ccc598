//! Type error types.
//!
//! Every error kind carries the zonked types or names involved so the
//! `Display` impl can render the pretty form of the offending term without a
//! separate pretty-printer.

use std::fmt;

use flc_common::Name;

use crate::ty::{Monotype, Unknown};

/// A type error encountered during type checking. Every error is fatal to
/// the whole compilation -- the checker does not recover locally.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    /// Reference to an unbound name during inference.
    UnknownVariable { name: Name },
    /// Missing entry in the type map.
    UnknownType { name: Name },
    /// Missing constructor on an otherwise-known type.
    UnknownConstructor { ty: Name, ctor: Name },
    /// A constructor was applied to (or matched against) the wrong number
    /// of fields.
    ArityMismatch { ty: Name, ctor: Name, expected: usize, found: usize },
    /// A unification variable would have to be solved to a term containing
    /// itself.
    OccursCheck { unknown: Unknown, ty: Monotype },
    /// Two types were required to be equal but have incompatible shapes.
    UnifyMismatch { expected: Monotype, found: Monotype },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UnknownVariable { name } => {
                write!(f, "unknown variable: {}", name)
            }
            TypeError::UnknownType { name } => {
                write!(f, "unknown type: {}", name)
            }
            TypeError::UnknownConstructor { ty, ctor } => {
                write!(f, "unknown constructor {} on type {}", ctor, ty)
            }
            TypeError::ArityMismatch { ty, ctor, expected, found } => {
                write!(
                    f,
                    "{}::{} expects {} field(s), found {}",
                    ty, ctor, expected, found
                )
            }
            TypeError::OccursCheck { unknown, ty } => {
                write!(f, "occurs check failed: {} occurs in {}", unknown, ty)
            }
            TypeError::UnifyMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for TypeError {}
