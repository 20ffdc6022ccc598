use std::fmt;

use flc_common::Name;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodegenError {
    /// Two declarations were hoisted under the same name -- a bug in
    /// `flc-lower`, not a property of the input program.
    DuplicateDeclaration { name: Name },
    /// A `Bound` reference survived down to expression emission without
    /// being resolved by an enclosing `instantiate` call.
    InternalBound,
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::DuplicateDeclaration { name } => {
                write!(f, "duplicate declaration `{}`", name)
            }
            CodegenError::InternalBound => {
                write!(f, "internal error: unresolved bound variable reached codegen")
            }
        }
    }
}

impl std::error::Error for CodegenError {}
