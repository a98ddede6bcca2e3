/*!

Components F, G, and H: the single-equation linear-fixed-point solver (§4.E), the Gauss driver
built on top of it (§4.F), and the numerical fixed-point iterator (§4.G) offered as an alternative
driver selected by `Options::algorithm`.

*/

pub mod gauss;
pub mod numerical;
pub mod single_equation;

pub use gauss::solve_gauss;
pub use numerical::solve_numerical;
pub use single_equation::solve_single_equation;

use std::rc::Rc;

use crate::abstractions::IString;
use crate::core::expression::{BxExpr, Expr};

/// Replace every ground occurrence of the propositional variable `name` in `expr` by `value`
/// (§4.F's back-substitution step, and §4.E's "fold the just-computed solution back into the
/// three-way condition"). Unlike [`crate::rewrite::enumerate::substitute_data_var`], this
/// substitutes a *propositional* variable, never a data variable -- the two never collide because a
/// ground `Var` always carries an empty argument list.
pub(crate) fn substitute_prop_var(expr: &BxExpr, name: IString, value: &BxExpr) -> BxExpr {
    match expr.as_ref() {
        Expr::Data(_) => expr.clone(),
        Expr::Var(n, args) => {
            if args.is_empty() && *n == name {
                value.clone()
            } else {
                expr.clone()
            }
        }
        Expr::Minus(e) => Expr::minus(substitute_prop_var(e, name, value)),
        Expr::And(l, r) => Expr::and(substitute_prop_var(l, name, value), substitute_prop_var(r, name, value)),
        Expr::Or(l, r) => Expr::or(substitute_prop_var(l, name, value), substitute_prop_var(r, name, value)),
        Expr::Imp(l, r) => Expr::imp(substitute_prop_var(l, name, value), substitute_prop_var(r, name, value)),
        Expr::Plus(l, r) => Expr::plus(substitute_prop_var(l, name, value), substitute_prop_var(r, name, value)),
        Expr::ConstMul(k, e) => Expr::const_mul(k.clone(), substitute_prop_var(e, name, value)),
        Expr::ConstMulAlt(e, k) => {
            Rc::new(Expr::ConstMulAlt(substitute_prop_var(e, name, value), k.clone()))
        }
        Expr::EqInf(e) => Expr::eqinf(substitute_prop_var(e, name, value)),
        Expr::EqNInf(e) => Expr::eqninf(substitute_prop_var(e, name, value)),
        Expr::CondSm(c, t, e) => Expr::condsm(
            substitute_prop_var(c, name, value),
            substitute_prop_var(t, name, value),
            substitute_prop_var(e, name, value),
        ),
        Expr::CondEq(c, t, e) => Expr::condeq(
            substitute_prop_var(c, name, value),
            substitute_prop_var(t, name, value),
            substitute_prop_var(e, name, value),
        ),
        // A ground RES right-hand side never contains a quantifier (§3.3 invariant); recursing into
        // the body keeps this function total rather than partial on malformed input.
        Expr::Infimum(xs, body) => Rc::new(Expr::Infimum(xs.clone(), substitute_prop_var(body, name, value))),
        Expr::Supremum(xs, body) => Rc::new(Expr::Supremum(xs.clone(), substitute_prop_var(body, name, value))),
        Expr::Sum(xs, body) => Rc::new(Expr::Sum(xs.clone(), substitute_prop_var(body, name, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expression::VarArgs;

    #[test]
    fn substitutes_ground_occurrences_only() {
        let x = IString::from("X");
        let replacement = Expr::data(crate::core::data_term::DataTerm::Real(
            crate::core::data_term::Rational::from_integer(7),
        ));
        let expr = Expr::and(Expr::var(x, VarArgs::new()), Expr::var(IString::from("Y"), VarArgs::new()));
        let result = substitute_prop_var(&expr, x, &replacement);
        assert_eq!(result, Expr::and(replacement, Expr::var(IString::from("Y"), VarArgs::new())));
    }
}
