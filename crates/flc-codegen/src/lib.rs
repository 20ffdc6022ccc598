//! WASM code generation from the locally-nameless IR.
//!
//! Consumes the hoisted declarations and residual expression `flc-lower`
//! produces and emits a finished `.wasm` module: one function pair
//! (`name$inner` / `name`) per declaration, the fixed runtime primitives,
//! and an exported `main` computing the program's residual expression.

mod error;
mod expr;
mod intrinsics;
mod module;

pub use error::CodegenError;
pub use module::compile;

#[cfg(test)]
mod tests {
    use super::*;
    use flc_common::Name;
    use flc_ir::{Declaration, Expression, LNName};

    #[test]
    fn compiles_empty_program_to_a_module() {
        let bytes = compile(&[], &Expression::Int(42)).unwrap();
        // A minimal but well-formed module always starts with the magic
        // number and version, regardless of what it contains.
        assert_eq!(&bytes[0..4], b"\0asm");
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
    }

    #[test]
    fn saturated_direct_call_reuses_inner_function() {
        // decl double(x) = add x x ; main = double 21
        let decl = Declaration {
            name: Name::new("double"),
            arguments: vec![Name::new("x")],
            body: Expression::Application(
                Box::new(Expression::Application(
                    Box::new(Expression::Var(LNName::Free(Name::new("add")))),
                    Box::new(Expression::Var(LNName::Bound(0))),
                )),
                Box::new(Expression::Var(LNName::Bound(0))),
            ),
        };
        let body = Expression::Application(
            Box::new(Expression::Var(LNName::Free(Name::new("double")))),
            Box::new(Expression::Int(21)),
        );
        let bytes = compile(&[decl], &body).unwrap();
        assert_eq!(&bytes[0..4], b"\0asm");
    }

    #[test]
    fn duplicate_declaration_name_is_rejected() {
        let decl = |name: &str| Declaration {
            name: Name::new(name),
            arguments: vec![],
            body: Expression::Int(0),
        };
        let err = compile(&[decl("f"), decl("f")], &Expression::Int(0)).unwrap_err();
        assert_eq!(err, CodegenError::DuplicateDeclaration { name: Name::new("f") });
    }

    #[test]
    fn bound_variable_reaching_codegen_is_internal_error() {
        let err = compile(&[], &Expression::Var(LNName::Bound(0))).unwrap_err();
        assert_eq!(err, CodegenError::InternalBound);
    }
}
