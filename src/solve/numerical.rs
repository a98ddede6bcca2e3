/*!

Component H: the numerical fixed-point driver (§4.G), a nested block-wise Kleene iteration over
`f64`. Offered as an alternative to [`crate::solve::solve_gauss`] (selected by `Options::algorithm`)
that always terminates with a numeric answer, at the cost of never producing a `Solution::Symbolic`
one and of only being as accurate as the configured precision demands.

Two evaluators are provided, matching §4.G's "two representations" requirement: [`eval_tree`] walks
the `Expr` tree directly, while [`compile`]/[`eval_compiled`] first flatten the tree into a tagged
[`Op`] program with real-literal constants deduplicated through a pool keyed by `OrderedFloat`. Both
are exercised in lock-step by the driver's tests to confirm they agree bit-for-bit on every case.

*/

use std::ops::Range;

use ordered_float::OrderedFloat;

use crate::abstractions::{HashMap, IString, NaturalNumber};
use crate::core::data_term::DataTerm;
use crate::core::equation::{blocks, ResSystem, Sign};
use crate::core::expression::{BxExpr, Expr};
use crate::error::{CoreResult, ErrorKind};

/// Run the nested Kleene iteration (§4.G) to `10^{-precision}` accuracy, returning the value bound
/// to `system.initial`.
pub fn solve_numerical(system: &ResSystem, precision: NaturalNumber, oracle: &dyn crate::oracle::RewriteOracle) -> CoreResult<f64> {
    let index: HashMap<IString, usize> = system
        .equations
        .iter()
        .enumerate()
        .map(|(i, eq)| (eq.var, i))
        .collect();

    let rhss: Vec<BxExpr> = system.equations.iter().map(|eq| eq.rhs.clone()).collect();
    let signs: Vec<Sign> = system.equations.iter().map(|eq| eq.sign).collect();
    let epsilon = 10f64.powi(-(precision as i32));

    let mut values = vec![0.0f64; rhss.len()];
    let block_ranges = blocks(&system.equations);

    iterate(&block_ranges, 0, &signs, &rhss, &index, &mut values, epsilon, oracle)?;

    let i = system
        .index_of(&system.initial)
        .ok_or_else(|| ErrorKind::InvalidReference(system.initial))?;
    Ok(values[i])
}

fn iterate(
    block_ranges: &[Range<usize>],
    start: usize,
    signs: &[Sign],
    rhss: &[BxExpr],
    index: &HashMap<IString, usize>,
    values: &mut [f64],
    epsilon: f64,
    oracle: &dyn crate::oracle::RewriteOracle,
) -> CoreResult<()> {
    let Some(range) = block_ranges.iter().find(|r| r.start == start) else {
        return Ok(());
    };
    let range = range.clone();

    let init = if signs[range.start].is_mu() { f64::NEG_INFINITY } else { f64::INFINITY };
    for i in range.clone() {
        values[i] = init;
    }

    log::debug!("numerical: entering block {range:?} ({:?})", signs[range.start]);
    let mut rounds: u64 = 0;
    loop {
        let before_round: Vec<f64> = values.to_vec();

        iterate(block_ranges, range.end, signs, rhss, index, values, epsilon, oracle)?;

        let mut inner_iterations: u64 = 0;
        loop {
            let previous: Vec<f64> = range.clone().map(|i| values[i]).collect();
            for i in range.clone() {
                values[i] = eval_tree(&rhss[i], values, index, oracle)?;
            }
            inner_iterations += 1;
            // `inf - inf` is NaN, so an equality check must come first: a value that has settled at
            // an infinity would otherwise never read as converged.
            let converged = range
                .clone()
                .zip(previous.iter())
                .all(|(i, prev)| values[i] == *prev || (values[i] - prev).abs() <= epsilon);
            if converged {
                break;
            }
        }
        rounds += 1;
        log::trace!("numerical: block {range:?} round {rounds} took {inner_iterations} inner iterations");

        let stable = values
            .iter()
            .zip(before_round.iter())
            .all(|(a, b)| a == b || (a - b).abs() <= epsilon);
        if stable {
            break;
        }
    }
    log::debug!("numerical: block {range:?} stabilized after {rounds} outer rounds");

    Ok(())
}

fn data_to_f64(d: &DataTerm) -> CoreResult<f64> {
    match d {
        DataTerm::Bool(true) => Ok(f64::INFINITY),
        DataTerm::Bool(false) => Ok(f64::NEG_INFINITY),
        DataTerm::Real(r) => Ok(r.to_f64()),
        DataTerm::Opaque(..) | DataTerm::Var(_) => Err(ErrorKind::Unsupported(format!(
            "numerical driver cannot evaluate a non-numeric data term {d}"
        ))),
    }
}

/// `(+∞) + x = +∞` for every `x`; `(−∞) + x = −∞` for every `x ≠ +∞` (§4.H).
fn ext_plus(a: f64, b: f64) -> f64 {
    if a == f64::INFINITY || b == f64::INFINITY {
        f64::INFINITY
    } else if a == f64::NEG_INFINITY || b == f64::NEG_INFINITY {
        f64::NEG_INFINITY
    } else {
        a + b
    }
}

fn ext_const_mul(k: f64, e: f64) -> f64 {
    if k == 0.0 {
        0.0
    } else {
        k * e
    }
}

/// Direct recursive-descent evaluator (§4.G's representation (i)).
pub fn eval_tree(expr: &BxExpr, values: &[f64], index: &HashMap<IString, usize>, oracle: &dyn crate::oracle::RewriteOracle) -> CoreResult<f64> {
    match expr.as_ref() {
        Expr::Data(d) => data_to_f64(d),
        Expr::Var(name, _) => {
            let i = index
                .get(name)
                .ok_or_else(|| ErrorKind::InvalidReference(*name))?;
            Ok(values[*i])
        }
        Expr::Minus(e) => Ok(-eval_tree(e, values, index, oracle)?),
        Expr::And(l, r) => Ok(eval_tree(l, values, index, oracle)?.min(eval_tree(r, values, index, oracle)?)),
        Expr::Or(l, r) => Ok(eval_tree(l, values, index, oracle)?.max(eval_tree(r, values, index, oracle)?)),
        Expr::Imp(l, r) => Ok((-eval_tree(l, values, index, oracle)?).max(eval_tree(r, values, index, oracle)?)),
        Expr::Plus(l, r) => Ok(ext_plus(eval_tree(l, values, index, oracle)?, eval_tree(r, values, index, oracle)?)),
        Expr::ConstMul(k, e) => {
            let k = data_to_f64(k)?;
            if k == 0.0 {
                Ok(0.0)
            } else {
                Ok(ext_const_mul(k, eval_tree(e, values, index, oracle)?))
            }
        }
        Expr::ConstMulAlt(e, k) => {
            let k = data_to_f64(k)?;
            if k == 0.0 {
                Ok(0.0)
            } else {
                Ok(ext_const_mul(k, eval_tree(e, values, index, oracle)?))
            }
        }
        Expr::EqInf(e) => Ok(if eval_tree(e, values, index, oracle)? == f64::INFINITY { f64::INFINITY } else { f64::NEG_INFINITY }),
        Expr::EqNInf(e) => Ok(if eval_tree(e, values, index, oracle)? == f64::NEG_INFINITY { f64::INFINITY } else { f64::NEG_INFINITY }),
        Expr::CondSm(c, t, e) => {
            let c = eval_tree(c, values, index, oracle)?;
            if c < 0.0 {
                eval_tree(t, values, index, oracle)
            } else if c == 0.0 {
                Ok(eval_tree(t, values, index, oracle)?.max(eval_tree(e, values, index, oracle)?))
            } else {
                eval_tree(e, values, index, oracle)
            }
        }
        Expr::CondEq(c, t, e) => {
            let c = eval_tree(c, values, index, oracle)?;
            if c <= 0.0 {
                eval_tree(t, values, index, oracle)
            } else {
                eval_tree(e, values, index, oracle)
            }
        }
        Expr::Infimum(..) | Expr::Supremum(..) | Expr::Sum(..) => Err(ErrorKind::Unsupported(
            "numerical driver requires quantifiers to have already been enumerated away".to_string(),
        )),
    }
}

/// A flattened, variable-indexed program (§4.G's representation (ii)). Real-literal constants are
/// deduplicated into `pool` via [`OrderedFloat`], the only vehicle in the standard hashable-f64
/// ecosystem for using a float as a `HashMap` key.
pub struct CompiledProgram {
    ops: Vec<Op>,
    pool: Vec<f64>,
}

enum Op {
    Const(usize),
    Var(usize),
    Minus(Box<Op>),
    And(Box<Op>, Box<Op>),
    Or(Box<Op>, Box<Op>),
    Imp(Box<Op>, Box<Op>),
    Plus(Box<Op>, Box<Op>),
    ConstMul(usize, Box<Op>),
    EqInf(Box<Op>),
    EqNInf(Box<Op>),
    CondSm(Box<Op>, Box<Op>, Box<Op>),
    CondEq(Box<Op>, Box<Op>, Box<Op>),
}

struct Compiler {
    pool: Vec<f64>,
    seen: HashMap<OrderedFloat<f64>, usize>,
}

impl Compiler {
    fn new() -> Self {
        Compiler { pool: Vec::new(), seen: HashMap::new() }
    }

    fn intern(&mut self, v: f64) -> usize {
        *self.seen.entry(OrderedFloat(v)).or_insert_with(|| {
            self.pool.push(v);
            self.pool.len() - 1
        })
    }
}

/// Compile `expr` into a [`CompiledProgram`] against a fixed variable-name index.
pub fn compile(expr: &BxExpr, index: &HashMap<IString, usize>) -> CoreResult<CompiledProgram> {
    let mut compiler = Compiler::new();
    let ops = vec![compile_node(expr, index, &mut compiler)?];
    Ok(CompiledProgram { ops, pool: compiler.pool })
}

fn compile_node(expr: &BxExpr, index: &HashMap<IString, usize>, compiler: &mut Compiler) -> CoreResult<Op> {
    Ok(match expr.as_ref() {
        Expr::Data(d) => Op::Const(compiler.intern(data_to_f64(d)?)),
        Expr::Var(name, _) => {
            let i = *index.get(name).ok_or_else(|| ErrorKind::InvalidReference(*name))?;
            Op::Var(i)
        }
        Expr::Minus(e) => Op::Minus(Box::new(compile_node(e, index, compiler)?)),
        Expr::And(l, r) => Op::And(Box::new(compile_node(l, index, compiler)?), Box::new(compile_node(r, index, compiler)?)),
        Expr::Or(l, r) => Op::Or(Box::new(compile_node(l, index, compiler)?), Box::new(compile_node(r, index, compiler)?)),
        Expr::Imp(l, r) => Op::Imp(Box::new(compile_node(l, index, compiler)?), Box::new(compile_node(r, index, compiler)?)),
        Expr::Plus(l, r) => Op::Plus(Box::new(compile_node(l, index, compiler)?), Box::new(compile_node(r, index, compiler)?)),
        Expr::ConstMul(k, e) => Op::ConstMul(compiler.intern(data_to_f64(k)?), Box::new(compile_node(e, index, compiler)?)),
        Expr::ConstMulAlt(e, k) => Op::ConstMul(compiler.intern(data_to_f64(k)?), Box::new(compile_node(e, index, compiler)?)),
        Expr::EqInf(e) => Op::EqInf(Box::new(compile_node(e, index, compiler)?)),
        Expr::EqNInf(e) => Op::EqNInf(Box::new(compile_node(e, index, compiler)?)),
        Expr::CondSm(c, t, e) => Op::CondSm(
            Box::new(compile_node(c, index, compiler)?),
            Box::new(compile_node(t, index, compiler)?),
            Box::new(compile_node(e, index, compiler)?),
        ),
        Expr::CondEq(c, t, e) => Op::CondEq(
            Box::new(compile_node(c, index, compiler)?),
            Box::new(compile_node(t, index, compiler)?),
            Box::new(compile_node(e, index, compiler)?),
        ),
        Expr::Infimum(..) | Expr::Supremum(..) | Expr::Sum(..) => {
            return Err(ErrorKind::Unsupported(
                "numerical driver requires quantifiers to have already been enumerated away".to_string(),
            ))
        }
    })
}

/// Evaluate a [`CompiledProgram`] (§4.G's representation (ii)).
pub fn eval_compiled(program: &CompiledProgram, values: &[f64]) -> f64 {
    eval_op(&program.ops[0], &program.pool, values)
}

fn eval_op(op: &Op, pool: &[f64], values: &[f64]) -> f64 {
    match op {
        Op::Const(i) => pool[*i],
        Op::Var(i) => values[*i],
        Op::Minus(e) => -eval_op(e, pool, values),
        Op::And(l, r) => eval_op(l, pool, values).min(eval_op(r, pool, values)),
        Op::Or(l, r) => eval_op(l, pool, values).max(eval_op(r, pool, values)),
        Op::Imp(l, r) => (-eval_op(l, pool, values)).max(eval_op(r, pool, values)),
        Op::Plus(l, r) => ext_plus(eval_op(l, pool, values), eval_op(r, pool, values)),
        Op::ConstMul(k, e) => {
            let k = pool[*k];
            if k == 0.0 {
                0.0
            } else {
                ext_const_mul(k, eval_op(e, pool, values))
            }
        }
        Op::EqInf(e) => if eval_op(e, pool, values) == f64::INFINITY { f64::INFINITY } else { f64::NEG_INFINITY },
        Op::EqNInf(e) => if eval_op(e, pool, values) == f64::NEG_INFINITY { f64::INFINITY } else { f64::NEG_INFINITY },
        Op::CondSm(c, t, e) => {
            let c = eval_op(c, pool, values);
            if c < 0.0 {
                eval_op(t, pool, values)
            } else if c == 0.0 {
                eval_op(t, pool, values).max(eval_op(e, pool, values))
            } else {
                eval_op(e, pool, values)
            }
        }
        Op::CondEq(c, t, e) => {
            let c = eval_op(c, pool, values);
            if c <= 0.0 {
                eval_op(t, pool, values)
            } else {
                eval_op(e, pool, values)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_term::Rational;
    use crate::core::equation::{ResEquation, Sign};
    use crate::core::expression::VarArgs;
    use crate::oracle::TreeWalkingOracle;

    fn var(name: &str) -> BxExpr {
        Expr::var(IString::from(name), VarArgs::new())
    }

    fn real(n: i64) -> BxExpr {
        Expr::data(DataTerm::Real(Rational::from_integer(n)))
    }

    #[test]
    fn single_shallow_equation_converges_to_its_algebraic_solution() {
        // mu X = (1/2)*X + 3  =>  X = 6.
        let o = TreeWalkingOracle::new();
        let x = IString::from("X");
        let rhs = Expr::plus(Expr::const_mul(DataTerm::Real(Rational::new(1, 2)), var("X")), real(3));
        let system = ResSystem::new(vec![ResEquation::new(Sign::Mu, x, rhs)], x);
        let value = solve_numerical(&system, 8, &o).unwrap();
        assert!((value - 6.0).abs() < 1e-6);
    }

    #[test]
    fn tree_and_compiled_evaluators_agree() {
        let x = IString::from("X");
        let mut index = HashMap::new();
        index.insert(x, 0usize);
        let rhs = Expr::and(Expr::plus(real(1), real(2)), Expr::minus(real(5)));
        let o = TreeWalkingOracle::new();
        let values = [0.0f64];
        let tree_result = eval_tree(&rhs, &values, &index, &o).unwrap();
        let program = compile(&rhs, &index).unwrap();
        let compiled_result = eval_compiled(&program, &values);
        assert_eq!(tree_result, compiled_result);
        assert_eq!(tree_result, -5.0);
    }

    #[test]
    fn const_mul_by_zero_short_circuits_rather_than_producing_nan() {
        let x = IString::from("X");
        let mut index = HashMap::new();
        index.insert(x, 0usize);
        let rhs = Expr::const_mul(DataTerm::Real(Rational::zero()), Expr::data(DataTerm::Bool(true)));
        let o = TreeWalkingOracle::new();
        let values = [0.0f64];
        let result = eval_tree(&rhs, &values, &index, &o).unwrap();
        assert_eq!(result, 0.0);
    }
}
