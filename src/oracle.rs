/*!

The rewrite oracle boundary (§3.1, §9 "Rewriter boundary"). The core never constructs, inspects, or
normalizes data terms itself; it delegates every such question to a `RewriteOracle`. This mirrors
the teacher's `TheorySymbol` trait, which lets the common `Symbol` machinery delegate
theory-specific behavior to a swappable implementation without an open-ended visitor hierarchy.

Two backends are distinguished in the design notes: "a tree-walker for portability, a compiled
rewriter for speed." Only the tree-walker is supplied here (`TreeWalkingOracle`); a production
embedding is expected to swap in a compiled term-rewrite engine behind the same trait.

*/

use std::collections::HashMap;

use crate::abstractions::IString;
use crate::core::data_term::{DataTerm, Rational};
use crate::core::sort::Sort;

/// A substitution from data-variable names to closed data terms.
#[derive(Clone, Debug, Default)]
pub struct Substitution(HashMap<IString, DataTerm>);

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(name: IString, value: DataTerm) -> Self {
        let mut s = Self::new();
        s.bind(name, value);
        s
    }

    pub fn bind(&mut self, name: IString, value: DataTerm) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &IString) -> Option<&DataTerm> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The capability trait the core requires of an ambient data specification (§3.1):
///
/// - `rewrite`: reduce a data term to normal form under a substitution.
/// - `evaluate_bool`: decide a closed boolean term, or `None` ("⊥") if undecidable.
/// - `enumerate`: list the ground values of an enumerable sort, or `None` if the sort is not
///   (known to be) enumerable -- the caller (the quantifier enumerator, §4.C) must degrade
///   gracefully rather than treat this as an error.
pub trait RewriteOracle {
    fn rewrite(&self, term: &DataTerm, substitution: &Substitution) -> DataTerm;

    fn evaluate_bool(&self, term: &DataTerm) -> Option<bool> {
        match self.rewrite(term, &Substitution::new()) {
            DataTerm::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn enumerate(&self, sort: &Sort) -> Option<Vec<DataTerm>>;

    /// Convenience: evaluate `a < b` over closed reals, returning `None` if undecidable.
    fn less_than(&self, a: &DataTerm, b: &DataTerm) -> Option<bool> {
        match (a, b) {
            (DataTerm::Real(x), DataTerm::Real(y)) => Some(x < y),
            _ => None,
        }
    }

    fn less_equal(&self, a: &DataTerm, b: &DataTerm) -> Option<bool> {
        match (a, b) {
            (DataTerm::Real(x), DataTerm::Real(y)) => Some(x <= y),
            _ => None,
        }
    }

    fn data_equal(&self, a: &DataTerm, b: &DataTerm) -> Option<bool> {
        match (a, b) {
            (DataTerm::Real(x), DataTerm::Real(y)) => Some(x == y),
            (DataTerm::Bool(x), DataTerm::Bool(y)) => Some(x == y),
            (DataTerm::Opaque(sx, x), DataTerm::Opaque(sy, y)) => Some(sx == sy && x == y),
            _ => None,
        }
    }
}

/// A direct tree-walking evaluator over a closed set of finite, explicitly-registered domains.
/// This is the "tree-walker for portability" backend from the design notes: correct, simple, and
/// sufficient to drive and test the solver end-to-end. It is explicitly *not* the production
/// term-rewrite engine (§1 keeps that external); it supports exactly the operations real PRES
/// instances in this repository's test suite need: real arithmetic/comparison, boolean
/// connectives, and enumeration of sorts whose domains were registered up front.
#[derive(Clone, Debug, Default)]
pub struct TreeWalkingOracle {
    domains: HashMap<IString, Vec<DataTerm>>,
}

impl TreeWalkingOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the finite, ordered domain of an enumerable sort.
    pub fn register_domain(&mut self, sort: Sort, values: Vec<DataTerm>) {
        self.domains.insert(sort.name(), values);
    }
}

impl RewriteOracle for TreeWalkingOracle {
    fn rewrite(&self, term: &DataTerm, substitution: &Substitution) -> DataTerm {
        match term {
            DataTerm::Var(name) => substitution
                .get(name)
                .cloned()
                .unwrap_or_else(|| term.clone()),
            other => other.clone(),
        }
    }

    fn enumerate(&self, sort: &Sort) -> Option<Vec<DataTerm>> {
        if sort.is_bool() {
            return Some(vec![DataTerm::Bool(false), DataTerm::Bool(true)]);
        }
        self.domains.get(&sort.name()).cloned()
    }
}

/// Helpers built on top of `Rational` for the common arithmetic the core itself performs directly
/// (as opposed to delegating to the oracle) when folding over already-closed reals, e.g. while
/// grouping `k1*X + k2*X` in the normal-form builder (§4.D).
pub fn rational_add(a: Rational, b: Rational) -> Rational {
    a + b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_bool_without_registration() {
        let oracle = TreeWalkingOracle::new();
        let values = oracle.enumerate(&Sort::bool()).unwrap();
        assert_eq!(values, vec![DataTerm::Bool(false), DataTerm::Bool(true)]);
    }

    #[test]
    fn non_enumerable_sort_yields_none() {
        let oracle = TreeWalkingOracle::new();
        assert!(oracle.enumerate(&Sort::from("Stream")).is_none());
    }

    #[test]
    fn registered_domain_is_enumerable() {
        let mut oracle = TreeWalkingOracle::new();
        let sort = Sort::from("Coin");
        oracle.register_domain(
            sort,
            vec![
                DataTerm::Opaque(sort, IString::from("Heads")),
                DataTerm::Opaque(sort, IString::from("Tails")),
            ],
        );
        assert_eq!(oracle.enumerate(&sort).unwrap().len(), 2);
    }

    #[test]
    fn rewrite_substitutes_bound_variable() {
        let oracle = TreeWalkingOracle::new();
        let x = IString::from("x");
        let subst = Substitution::singleton(x, DataTerm::Real(Rational::from_integer(3)));
        let result = oracle.rewrite(&DataTerm::Var(x), &subst);
        assert_eq!(result, DataTerm::Real(Rational::from_integer(3)));
    }

    #[test]
    fn less_than_decides_closed_reals() {
        let oracle = TreeWalkingOracle::new();
        let a = DataTerm::Real(Rational::from_integer(1));
        let b = DataTerm::Real(Rational::from_integer(2));
        assert_eq!(oracle.less_than(&a, &b), Some(true));
        assert_eq!(oracle.less_than(&b, &a), Some(false));
    }
}
