/*!

The PRES expression algebra (§3.2). Every variant maps directly to one row of the table in the
spec; the set is closed, so dispatch throughout the core is exhaustive pattern matching rather than
an open-ended visitor hierarchy (§9, "Operator dispatch").

Expressions are immutable once constructed. Subterms are shared via `Rc` rather than owned via
`Box`, exactly as §3.4 allows ("sharing between expressions is permitted... exploited by the
normal-form builder to cache subterms by structural identity") -- the normal-form builder's
sibling-deduplication step (§4.D) relies on `Expr`'s structural `Eq`/`Hash` impl, which `Rc`
forwards to its pointee.

*/

use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use smallvec::SmallVec;

use crate::abstractions::IString;
use crate::core::data_term::DataTerm;
use crate::core::sort::Sort;

/// A shared, immutable PRES expression node.
pub type BxExpr = Rc<Expr>;

/// One data-sort-valued variable bound by a quantifier (`Infimum`/`Supremum`/`Sum`), paired with
/// its domain sort.
pub type Binder = (IString, Sort);

/// The small, fixed argument list of a `Var` occurrence. Most propositional variables take a
/// handful of data arguments; `SmallVec` avoids a heap allocation for the common case. After
/// instantiation (§3.3 invariant) this list is always empty.
pub type VarArgs = SmallVec<[DataTerm; 4]>;

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Expr {
    /// Interpreted as ±∞ when `true`/`false`, else as its real value (§3.2).
    Data(DataTerm),
    /// A fixed-point variable reference; `args` is empty once the PRES has been instantiated.
    Var(IString, VarArgs),
    /// Arithmetic negation; swaps ±∞.
    Minus(BxExpr),
    /// `min` over the extended reals.
    And(BxExpr, BxExpr),
    /// `max` over the extended reals.
    Or(BxExpr, BxExpr),
    /// `max(-l, r)` over the extended reals.
    Imp(BxExpr, BxExpr),
    /// Extended-real addition; see §4.H for the ±∞ tie-break.
    Plus(BxExpr, BxExpr),
    /// `k * e`, `k` a positive real data term, written `k` on the left.
    ConstMul(DataTerm, BxExpr),
    /// `e * k`, `k` a positive real data term, written `k` on the right. Kept distinct from
    /// `ConstMul` only to retain the associativity shape the instantiator/normalizer produced it
    /// in; semantically identical.
    ConstMulAlt(BxExpr, DataTerm),
    /// Greatest lower bound of `body` over every valuation of `xs`.
    Infimum(Vec<Binder>, BxExpr),
    /// Least upper bound of `body` over every valuation of `xs`.
    Supremum(Vec<Binder>, BxExpr),
    /// Pointwise sum of `body` over every valuation of `xs`.
    Sum(Vec<Binder>, BxExpr),
    /// `= +∞` characteristic predicate.
    EqInf(BxExpr),
    /// `= -∞` characteristic predicate.
    EqNInf(BxExpr),
    /// `if c < 0 then t else if c = 0 then t ⊔ e else e`.
    CondSm(BxExpr, BxExpr, BxExpr),
    /// `if c < 0 then t else if c = 0 then t else e`.
    CondEq(BxExpr, BxExpr, BxExpr),
}

thread_local! {
    // `true`/`false`/`0` are by far the most frequently constructed literals (every `And`/`Or`
    // short-circuit and every `m`-fold's identity element produces one) -- interning them avoids
    // re-allocating the same `Rc<Expr>` node on every call. `Rc` isn't `Sync`, so these live behind
    // a thread-local `OnceCell` rather than a `once_cell::sync` static.
    static TT: OnceCell<BxExpr> = OnceCell::new();
    static FF: OnceCell<BxExpr> = OnceCell::new();
    static ZERO: OnceCell<BxExpr> = OnceCell::new();
}

impl Expr {
    pub fn data(d: DataTerm) -> BxExpr {
        Rc::new(Expr::Data(d))
    }

    pub fn tt() -> BxExpr {
        TT.with(|cell| cell.get_or_init(|| Expr::data(DataTerm::Bool(true))).clone())
    }

    pub fn ff() -> BxExpr {
        FF.with(|cell| cell.get_or_init(|| Expr::data(DataTerm::Bool(false))).clone())
    }

    pub fn zero() -> BxExpr {
        ZERO.with(|cell| {
            cell.get_or_init(|| Expr::data(DataTerm::Real(crate::core::data_term::Rational::zero())))
                .clone()
        })
    }

    pub fn var(name: impl Into<IString>, args: VarArgs) -> BxExpr {
        Rc::new(Expr::Var(name.into(), args))
    }

    pub fn minus(e: BxExpr) -> BxExpr {
        Rc::new(Expr::Minus(e))
    }

    pub fn and(l: BxExpr, r: BxExpr) -> BxExpr {
        Rc::new(Expr::And(l, r))
    }

    pub fn or(l: BxExpr, r: BxExpr) -> BxExpr {
        Rc::new(Expr::Or(l, r))
    }

    pub fn imp(l: BxExpr, r: BxExpr) -> BxExpr {
        Rc::new(Expr::Imp(l, r))
    }

    pub fn plus(l: BxExpr, r: BxExpr) -> BxExpr {
        Rc::new(Expr::Plus(l, r))
    }

    pub fn const_mul(k: DataTerm, e: BxExpr) -> BxExpr {
        Rc::new(Expr::ConstMul(k, e))
    }

    pub fn eqinf(e: BxExpr) -> BxExpr {
        Rc::new(Expr::EqInf(e))
    }

    pub fn eqninf(e: BxExpr) -> BxExpr {
        Rc::new(Expr::EqNInf(e))
    }

    pub fn condsm(c: BxExpr, t: BxExpr, e: BxExpr) -> BxExpr {
        Rc::new(Expr::CondSm(c, t, e))
    }

    pub fn condeq(c: BxExpr, t: BxExpr, e: BxExpr) -> BxExpr {
        Rc::new(Expr::CondEq(c, t, e))
    }

    /// `true` if this expression is the ground literal `Data(Bool(b))`.
    pub fn as_bool_literal(&self) -> Option<bool> {
        match self {
            Expr::Data(DataTerm::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// `true` for the two expression shapes the normal-form builder must not flatten through
    /// (§4.D): they are preserved as the outermost constructor.
    pub fn is_conditional(&self) -> bool {
        matches!(self, Expr::CondSm(..) | Expr::CondEq(..))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::pretty::pretty_print(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_allocation_identity() {
        let a = Expr::and(Expr::tt(), Expr::ff());
        let b = Expr::and(Expr::tt(), Expr::ff());
        assert_eq!(a, b);
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn conditional_detection() {
        let c = Expr::condsm(Expr::zero(), Expr::tt(), Expr::ff());
        assert!(c.is_conditional());
        assert!(!Expr::tt().is_conditional());
    }
}
