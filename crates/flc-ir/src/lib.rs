//! The locally-nameless intermediate representation.
//!
//! Closure conversion (in `flc-lower`) hoists every surface lambda into a
//! flat, top-level `Declaration`, leaving a residual `Expression` that only
//! ever calls into those declarations or the runtime's built-in functions.
//!
//! ## Binder discipline
//!
//! Three kinds of syntactic position introduce a *frame* of bound names:
//! a `Declaration`'s argument list (one frame of width `arguments.len()`),
//! a `Let` (a frame of width one), and a `Match` `Case` (a frame of width
//! `binders`). `Bound(i)` is a standard width-aware de Bruijn index: `i`
//! counts past the combined width of every frame nested strictly inside the
//! reference's own binding frame before reaching the reference's position
//! within its frame. Concretely, a reference to position `p` of a frame that
//! itself encloses frames of total width `w` (between the binder and the
//! reference) is written `Bound(w + p)`.
//!
//! [`instantiate`] opens exactly one (the outermost un-opened) frame at a
//! time: it walks `expr`, tracking `base` -- the combined width of every
//! nested frame crossed so far while opening this one -- and rewrites
//! `Bound(i)` with `replacements[i - base]` whenever `i` falls in
//! `base .. base + replacements.len()`. A `Bound(i)` with `i < base` belongs
//! to a frame nested inside the one being opened and is left alone; a later,
//! separate `instantiate` call made when codegen reaches that inner frame
//! resolves it, starting its own traversal at `base = 0`.

use flc_common::Name;

/// A locally-nameless name: either a de Bruijn reference into the nearest
/// enclosing frame, or a free reference to a top-level declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LNName {
    Bound(u32),
    Free(Name),
}

/// One arm of an `IR.Match`.
#[derive(Clone, Debug, PartialEq)]
pub struct Case {
    pub tag: u32,
    /// Number of fields this constructor carries -- the width of the frame
    /// this case's `body` is opened under.
    pub binders: u32,
    pub body: Expression,
}

/// The IR expression language.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Int(i32),
    Bool(bool),
    Var(LNName),
    Application(Box<Expression>, Box<Expression>),
    Pack(u32, Vec<Expression>),
    Match(Box<Expression>, Vec<Case>),
    If(Box<Expression>, Box<Expression>, Box<Expression>),
    /// A let-binding: `body` is opened under a width-one frame for the value
    /// of `expr`.
    Let(Box<Expression>, Box<Expression>),
    /// A reference to a concrete, already-assigned WASM local -- the
    /// addressing mode codegen rewrites `Bound` references to once a frame
    /// has been materialized as real locals.
    GetLocal(u32),
}

/// A hoisted top-level function: `body` is opened under a width-`arguments.len()`
/// frame, with `Bound(i)` referring to `arguments[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub name: Name,
    pub arguments: Vec<Name>,
    pub body: Expression,
}

/// Single-shot substitution over the outermost frame's `Bound` references.
///
/// Replaces every `Bound(i)` found at `depth == 0` with `replacements[i]`;
/// `Bound` references found after crossing into a nested frame (`depth > 0`)
/// refer to that nested frame's own binders and are left alone. This is the
/// `instantiate` operation named in the IR's binder discipline.
pub fn instantiate(expr: &Expression, replacements: &[Expression]) -> Expression {
    go(expr, 0, replacements)
}

fn go(expr: &Expression, base: u32, replacements: &[Expression]) -> Expression {
    match expr {
        Expression::Int(_) | Expression::Bool(_) | Expression::GetLocal(_) => expr.clone(),
        Expression::Var(LNName::Free(name)) => Expression::Var(LNName::Free(name.clone())),
        Expression::Var(LNName::Bound(i)) => {
            if *i >= base && (*i - base) < replacements.len() as u32 {
                replacements[(*i - base) as usize].clone()
            } else {
                expr.clone()
            }
        }
        Expression::Application(f, a) => Expression::Application(
            Box::new(go(f, base, replacements)),
            Box::new(go(a, base, replacements)),
        ),
        Expression::Pack(tag, values) => Expression::Pack(
            *tag,
            values.iter().map(|v| go(v, base, replacements)).collect(),
        ),
        Expression::Match(scrutinee, cases) => Expression::Match(
            Box::new(go(scrutinee, base, replacements)),
            cases
                .iter()
                .map(|c| Case {
                    tag: c.tag,
                    binders: c.binders,
                    body: go(&c.body, base + c.binders, replacements),
                })
                .collect(),
        ),
        Expression::If(c, t, e) => Expression::If(
            Box::new(go(c, base, replacements)),
            Box::new(go(t, base, replacements)),
            Box::new(go(e, base, replacements)),
        ),
        Expression::Let(e, body) => Expression::Let(
            Box::new(go(e, base, replacements)),
            Box::new(go(body, base + 1, replacements)),
        ),
    }
}
