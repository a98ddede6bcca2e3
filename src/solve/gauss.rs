/*!

Component G: the Gauss elimination driver (§4.F). Step 1 guarantees the first equation defines the
initial variable, prepending a synthetic `nu z = initial_var` equation and redirecting `initial` to
`z` when it doesn't (the instantiator's block-rank resort can displace the initial variable away
from index 0). The driver then iterates the resulting RES's equations in reverse order; each
equation's right-hand side is normalized to simple normal form (conjunctive exactly when its sign is
`Mu`) and handed to [`solve_single_equation`], then the resulting closed form is back-substituted
into every earlier equation's right-hand side before moving on. The last equation solved (the first,
in declaration order) carries the answer for the RES's `initial` variable.

This driver can fail with `ErrorKind::Undecidable` when a line's gradient can't be compared against
1 by the oracle; `Options::algorithm == NumericalDirected` is how a caller opts into falling back to
[`crate::solve::solve_numerical`] when that happens (§7).

*/

use crate::abstractions::{HashSet, IString};
use crate::core::equation::{ResEquation, ResSystem, Sign};
use crate::core::expression::{BxExpr, Expr, VarArgs};
use crate::error::{CoreResult, ErrorKind};
use crate::oracle::RewriteOracle;
use crate::rewrite::normal_form::normalize;
use crate::rewrite::simplify::simplify;
use crate::solve::{solve_single_equation, substitute_prop_var};

/// §4.F Step 1: if `system`'s first equation doesn't already define `system.initial`, prepend a
/// fresh `nu z = initial_var` equation and redirect `initial` to `z`, so the elimination loop below
/// can always read the answer off index 0 once it's done.
fn ensure_initial_at_front(system: &ResSystem) -> ResSystem {
    if system.equations.first().map(|eq| eq.var) == Some(system.initial) {
        return system.clone();
    }

    let existing: HashSet<IString> = system.equations.iter().map(|eq| eq.var).collect();
    let mut fresh = IString::from("z");
    let mut suffix = 0u64;
    while existing.contains(&fresh) {
        suffix += 1;
        fresh = IString::from(format!("z#{suffix}").as_str());
    }

    let mut equations = Vec::with_capacity(system.equations.len() + 1);
    equations.push(ResEquation::new(Sign::Nu, fresh, Expr::var(system.initial, VarArgs::new())));
    equations.extend(system.equations.iter().cloned());
    ResSystem::new(equations, fresh)
}

/// Solve every equation of `system` by reverse-order Gauss elimination, returning the closed form
/// bound to `system.initial`.
pub fn solve_gauss(system: &ResSystem, oracle: &dyn RewriteOracle) -> CoreResult<BxExpr> {
    if system.index_of(&system.initial).is_none() {
        return Err(ErrorKind::InvalidReference(system.initial));
    }
    let system = ensure_initial_at_front(system);
    let system = &system;

    let mut rhss: Vec<BxExpr> = system.equations.iter().map(|eq| eq.rhs.clone()).collect();

    for i in (0..rhss.len()).rev() {
        let sign = system.equations[i].sign;
        let var = system.equations[i].var;

        log::debug!("gauss: solving equation {i} ({sign:?} {var})");
        let normalized = normalize(&rhss[i], sign.is_mu(), oracle)?;
        let solution = solve_single_equation(sign, var, &normalized, oracle)?;
        let solution = simplify(&solution, oracle)?;
        log::trace!("gauss: {var} = {solution}");

        rhss[i] = solution.clone();
        for earlier in rhss.iter_mut().take(i) {
            *earlier = substitute_prop_var(earlier, var, &solution);
        }
    }

    Ok(rhss[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::IString;
    use crate::core::data_term::{DataTerm, Rational};
    use crate::core::equation::{ResEquation, Sign};
    use crate::core::expression::{Expr, VarArgs};
    use crate::oracle::TreeWalkingOracle;

    fn var(name: &str) -> BxExpr {
        Expr::var(IString::from(name), VarArgs::new())
    }

    fn real(n: i64) -> BxExpr {
        Expr::data(DataTerm::Real(Rational::from_integer(n)))
    }

    #[test]
    fn two_equation_chain_back_substitutes() {
        // mu X = (1/2)*Y + 1 ; mu Y = 4  =>  Y = 4, X = (1/2)*4 + 1 = 3.
        let o = TreeWalkingOracle::new();
        let x = IString::from("X");
        let y = IString::from("Y");
        let rhs_x = Expr::plus(Expr::const_mul(DataTerm::Real(Rational::new(1, 2)), var("Y")), real(1));
        let equations = vec![
            ResEquation::new(Sign::Mu, x, rhs_x),
            ResEquation::new(Sign::Mu, y, real(4)),
        ];
        let system = ResSystem::new(equations, x);
        let solution = solve_gauss(&system, &o).unwrap();
        assert_eq!(solution, real(3));
    }

    #[test]
    fn single_equation_system_solves_directly() {
        let o = TreeWalkingOracle::new();
        let x = IString::from("X");
        let equations = vec![ResEquation::new(Sign::Nu, x, real(7))];
        let system = ResSystem::new(equations, x);
        let solution = solve_gauss(&system, &o).unwrap();
        assert_eq!(solution, real(7));
    }

    #[test]
    fn initial_variable_displaced_from_index_zero_is_still_solved_correctly() {
        // mu P = true ; nu Q = P ; init Q. A block-rank resort (as the instantiator performs) can
        // leave the system in the order [P, Q] even though Q is the initial variable; Step 1 of
        // §4.F must still recover the correct closed form Q = true rather than a dangling `P`.
        let o = TreeWalkingOracle::new();
        let p = IString::from("P");
        let q = IString::from("Q");
        let equations = vec![
            ResEquation::new(Sign::Mu, p, Expr::tt()),
            ResEquation::new(Sign::Nu, q, var("P")),
        ];
        let system = ResSystem::new(equations, q);
        let solution = solve_gauss(&system, &o).unwrap();
        assert_eq!(solution, Expr::tt());
    }
}
