/*!

The public entry point (§6.1): `solve_pres` ties the instantiator (§4.C), the simple-normal-form
builder (§4.D), and the chosen driver (§4.F or §4.G) together into a single call from a PRES and an
`Options` to a `Solution`.

*/

use crate::core::equation::Pres;
use crate::error::{CoreResult, ErrorKind};
use crate::core::expression::BxExpr;
use crate::instantiate::instantiate;
use crate::oracle::RewriteOracle;
use crate::options::{Algorithm, Options};
use crate::solve::{solve_gauss, solve_numerical};

/// The result of solving a PRES's initial variable: either a closed-form, `X`-free expression
/// (Gauss elimination) or a numeric approximation (the numerical driver).
#[derive(Clone, Debug, PartialEq)]
pub enum Solution {
    Symbolic(BxExpr),
    Numeric(f64),
}

/// Instantiate `pres` against `oracle`, then solve it with the driver selected by `options`.
pub fn solve_pres(pres: &Pres, oracle: &dyn RewriteOracle, options: &Options) -> CoreResult<Solution> {
    let system = instantiate(pres, oracle, options.todo_strategy, options.random_seed)?;

    match options.algorithm {
        Algorithm::GaussElimination => Ok(Solution::Symbolic(solve_gauss(&system, oracle)?)),
        Algorithm::Numerical => Ok(Solution::Numeric(solve_numerical(&system, options.precision, oracle)?)),
        Algorithm::NumericalDirected => match solve_gauss(&system, oracle) {
            Ok(solution) => Ok(Solution::Symbolic(solution)),
            Err(ErrorKind::Undecidable(_)) => Ok(Solution::Numeric(solve_numerical(&system, options.precision, oracle)?)),
            Err(other) => Err(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::IString;
    use crate::core::data_term::{DataTerm, Rational};
    use crate::core::equation::{PresEquation, Sign};
    use crate::core::expression::{Expr, VarArgs};
    use crate::oracle::TreeWalkingOracle;

    fn var(name: &str) -> BxExpr {
        Expr::var(IString::from(name), VarArgs::new())
    }

    fn pres_of(equations: Vec<PresEquation>, initial: &str) -> Pres {
        Pres::new(equations, IString::from(initial), Vec::new())
    }

    fn as_bool_extreme(solution: &Solution) -> f64 {
        match solution {
            Solution::Symbolic(e) => match e.as_bool_literal() {
                Some(true) => f64::INFINITY,
                Some(false) => f64::NEG_INFINITY,
                None => panic!("expected a boolean-literal symbolic solution, got {e:?}"),
            },
            Solution::Numeric(v) => *v,
        }
    }

    #[test]
    fn s1_mutual_recursion_settles_on_minus_infinity() {
        let _ = env_logger::builder().is_test(true).try_init();
        let o = TreeWalkingOracle::new();
        let equations = vec![
            PresEquation::new(Sign::Mu, IString::from("X1"), vec![], var("X2")),
            PresEquation::new(Sign::Nu, IString::from("X2"), vec![], var("X1")),
        ];
        let pres = pres_of(equations, "X1");
        let options = Options::default();
        let solution = solve_pres(&pres, &o, &options).unwrap();
        assert_eq!(as_bool_extreme(&solution), f64::NEG_INFINITY);
    }

    #[test]
    fn s2_mutual_recursion_settles_on_plus_infinity() {
        let o = TreeWalkingOracle::new();
        let equations = vec![
            PresEquation::new(Sign::Nu, IString::from("X1"), vec![], var("X2")),
            PresEquation::new(Sign::Mu, IString::from("X2"), vec![], var("X1")),
        ];
        let pres = pres_of(equations, "X1");
        let options = Options::default();
        let solution = solve_pres(&pres, &o, &options).unwrap();
        assert_eq!(as_bool_extreme(&solution), f64::INFINITY);
    }

    #[test]
    fn s3_three_block_mutual_recursion_settles_on_minus_infinity() {
        // mu X1 = X2 /\ X1 ; nu X2 = X1 \/ X3 ; mu X3 = X1 \/ X2 ; init X1  =>  -infinity.
        let o = TreeWalkingOracle::new();
        let equations = vec![
            PresEquation::new(Sign::Mu, IString::from("X1"), vec![], Expr::and(var("X2"), var("X1"))),
            PresEquation::new(Sign::Nu, IString::from("X2"), vec![], Expr::or(var("X1"), var("X3"))),
            PresEquation::new(Sign::Mu, IString::from("X3"), vec![], Expr::or(var("X1"), var("X2"))),
        ];
        let pres = pres_of(equations, "X1");
        let options = Options::default();
        let solution = solve_pres(&pres, &o, &options).unwrap();
        assert_eq!(as_bool_extreme(&solution), f64::NEG_INFINITY);
    }

    #[test]
    fn s4_plus_true_diverges_to_plus_infinity() {
        let o = TreeWalkingOracle::new();
        let equations = vec![PresEquation::new(
            Sign::Mu,
            IString::from("X"),
            vec![],
            Expr::plus(var("X"), Expr::tt()),
        )];
        let pres = pres_of(equations, "X");
        let options = Options { algorithm: Algorithm::Numerical, ..Options::default() };
        let solution = solve_pres(&pres, &o, &options).unwrap();
        assert_eq!(as_bool_extreme(&solution), f64::INFINITY);
    }

    #[test]
    fn s5_shallow_line_with_or_zero_floor_solves_to_two() {
        // mu X = ((1/2)*X + 1) \/ 0  =>  X = 2.
        let o = TreeWalkingOracle::new();
        let half = DataTerm::Real(Rational::new(1, 2));
        let rhs = Expr::or(
            Expr::plus(Expr::const_mul(half, var("X")), Expr::data(DataTerm::Real(Rational::from_integer(1)))),
            Expr::data(DataTerm::Real(Rational::zero())),
        );
        let equations = vec![PresEquation::new(Sign::Mu, IString::from("X"), vec![], rhs)];
        let pres = pres_of(equations, "X");
        let options = Options::default();
        let solution = solve_pres(&pres, &o, &options).unwrap();
        match solution {
            Solution::Symbolic(e) => {
                assert_eq!(e, Expr::data(DataTerm::Real(Rational::from_integer(2))));
            }
            Solution::Numeric(_) => panic!("expected a symbolic result from the Gauss driver"),
        }
    }

    #[test]
    fn s6_conditional_table_solves_to_one() {
        // mu X = 1 /\ (X + 1) => X = 1.
        let o = TreeWalkingOracle::new();
        let rhs = Expr::and(
            Expr::data(DataTerm::Real(Rational::from_integer(1))),
            Expr::plus(var("X"), Expr::data(DataTerm::Real(Rational::from_integer(1)))),
        );
        let equations = vec![PresEquation::new(Sign::Mu, IString::from("X"), vec![], rhs)];
        let pres = pres_of(equations, "X");
        let options = Options::default();
        let solution = solve_pres(&pres, &o, &options).unwrap();
        match solution {
            Solution::Symbolic(e) => {
                assert_eq!(e, Expr::data(DataTerm::Real(Rational::from_integer(1))));
            }
            Solution::Numeric(_) => panic!("expected a symbolic result from the Gauss driver"),
        }
    }

    #[test]
    fn plain_gauss_surfaces_undecidable_gradient_rather_than_guessing() {
        // An opaque (non-real) coefficient makes the shallow/steep classification undecidable for
        // the tree-walking oracle; pure GaussElimination must surface that rather than guess.
        let o = TreeWalkingOracle::new();
        let rhs = Expr::plus(
            Expr::const_mul(DataTerm::Opaque(crate::core::sort::Sort::real(), IString::from("k")), var("X")),
            Expr::data(DataTerm::Real(Rational::from_integer(1))),
        );
        let equations = vec![PresEquation::new(Sign::Mu, IString::from("X"), vec![], rhs)];
        let pres = pres_of(equations, "X");
        let options = Options::default();
        let result = solve_pres(&pres, &o, &options);
        assert!(matches!(result, Err(ErrorKind::Undecidable(_))));
    }

    #[test]
    fn numerical_directed_surfaces_the_downstream_error_when_fallback_also_fails() {
        // NumericalDirected does attempt the numerical driver after Undecidable, but an opaque
        // coefficient is just as unevaluable there -- the resulting error must still propagate
        // rather than being swallowed.
        let o = TreeWalkingOracle::new();
        let rhs = Expr::plus(
            Expr::const_mul(DataTerm::Opaque(crate::core::sort::Sort::real(), IString::from("k")), var("X")),
            Expr::data(DataTerm::Real(Rational::from_integer(1))),
        );
        let equations = vec![PresEquation::new(Sign::Mu, IString::from("X"), vec![], rhs)];
        let pres = pres_of(equations, "X");
        let options = Options { algorithm: Algorithm::NumericalDirected, ..Options::default() };
        let result = solve_pres(&pres, &o, &options);
        assert!(matches!(result, Err(ErrorKind::Unsupported(_))));
    }
}
