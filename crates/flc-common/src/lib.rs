//! Shared primitives used across every stage of the compiler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An identifier. Equality is structural -- two names are the same name iff
/// their underlying strings are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name(pub String);

impl Name {
    pub fn new(s: impl Into<String>) -> Self {
        Name(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.to_string())
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name(s)
    }
}

/// A monotonically increasing counter used for fresh-name supplies
/// (unification metavariables, hoisted declaration names, registered
/// locals). Never resets; never reused.
#[derive(Debug, Default)]
pub struct FreshSupply {
    next: u32,
}

impl FreshSupply {
    pub fn new() -> Self {
        FreshSupply { next: 0 }
    }

    pub fn next(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// A fresh `Name` built from `hint`, guaranteed distinct from every other
    /// name this supply has produced.
    pub fn next_name(&mut self, hint: &str) -> Name {
        Name::new(format!("{}${}", hint, self.next()))
    }
}
