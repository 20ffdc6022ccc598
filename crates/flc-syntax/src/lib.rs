//! Surface syntax model.
//!
//! This is the data contract the (out of scope) lexer/parser hands to the
//! type checker: an expression tree plus a list of ADT declarations. Nothing
//! in this crate builds these values from source text -- they arrive
//! pre-parsed, over the wire as JSON (see `flcc`'s input format) or
//! constructed directly by tests.

use flc_common::Name;
use serde::{Deserialize, Serialize};

/// A surface type expression, as it appears in a constructor's declared
/// argument types. References either one of the owning declaration's type
/// parameters (`Var`) or a named type applied to arguments (`Con`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeExpr {
    Var(Name),
    Con(Name, Vec<TypeExpr>),
}

/// One data constructor in an ADT declaration: `Cons(a, List<a>)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    pub name: Name,
    pub arg_types: Vec<TypeExpr>,
}

/// A top-level ADT declaration: `type Maybe<a> { Nothing(), Just(a) }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: Name,
    pub ty_args: Vec<Name>,
    pub constructors: Vec<ConstructorDecl>,
}

/// A pattern in a `match` arm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    /// Binds the scrutinee (or sub-field) to a name unconditionally.
    Var(Name),
    /// `Type::Ctor(field_patterns...)`.
    Constructor {
        ty: Name,
        ctor: Name,
        fields: Vec<Pattern>,
    },
}

/// One arm of a `match` expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub body: Expr,
}

/// The surface expression language.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Int(i32),
    Bool(bool),
    Var(Name),
    Lambda(Name, Box<Expr>),
    App(Box<Expr>, Box<Expr>),
    Let(Name, Box<Expr>, Box<Expr>),
    /// `let rec f = \x. ... in body` -- `f` is visible inside its own bound
    /// expression as well as in `body`.
    LetRec(Name, Box<Expr>, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    Match(Box<Expr>, Vec<MatchCase>),
    /// `Type::Ctor(args...)`.
    Construction(Name, Name, Vec<Expr>),
}
