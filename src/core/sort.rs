/*!

A `Sort` is a named type drawn from the ambient data specification (§3.1). Unlike the teacher's
term-rewriting sorts, PRES sorts carry no subsort lattice: they are flat, interned names, and the
only question the core ever asks of one is "can you enumerate your ground values?" -- a question
answered by the [`RewriteOracle`](crate::oracle::RewriteOracle), not by the `Sort` itself.

*/

use std::fmt;

use crate::abstractions::IString;

/// A sort is identified by name alone. `Bool` and `Real` are distinguished because the core's
/// expression algebra gives them special meaning (§3.1); all other sorts are opaque domains for
/// quantified variables.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Sort(IString);

impl Sort {
    pub fn new(name: IString) -> Self {
        Self(name)
    }

    pub fn name(&self) -> IString {
        self.0
    }

    pub fn bool() -> Self {
        Self(IString::from("Bool"))
    }

    pub fn real() -> Self {
        Self(IString::from("Real"))
    }

    pub fn is_bool(&self) -> bool {
        self.0 == IString::from("Bool")
    }

    pub fn is_real(&self) -> bool {
        self.0 == IString::from("Real")
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Sort {
    fn from(name: &str) -> Self {
        Self::new(IString::from(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_and_real_are_distinguished() {
        assert!(Sort::bool().is_bool());
        assert!(!Sort::bool().is_real());
        assert!(Sort::real().is_real());
    }

    #[test]
    fn custom_sort_roundtrips_its_name() {
        let s = Sort::from("Queue");
        assert_eq!(s.name(), IString::from("Queue"));
        assert_eq!(s.to_string(), "Queue");
    }
}
