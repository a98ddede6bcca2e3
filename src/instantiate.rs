/*!

Component D: the instantiator (§4.C). Breadth-first (or depth-first, or randomly-sampled) todo-set
exploration that rewrites each equation's right-hand side under every reachable valuation of its
parameters, producing a ground, parameter-free [`ResSystem`] whose variables are in bijection with
the reachable instantiations of the seed PRES.

Grounded on `examples/original_source/.../ressolve.h` and the general shape of a worklist-driven
graph exploration; mirrors the teacher's `rewriting_context`-style "apply a rule, discover new
obligations, enqueue them" control flow without any of the teacher's term-DAG machinery (the PRES
expression tree here is already a plain `Rc`-shared tree, so there is nothing to compile to bytecode
first).

*/

use std::collections::VecDeque;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::abstractions::{HashMap, IString};
use crate::core::data_term::DataTerm;
use crate::core::equation::{pres_block_ranks, Pres, PresEquation, ResEquation, ResSystem};
use crate::core::expression::{BxExpr, Expr, VarArgs};
use crate::error::{CoreResult, ErrorKind};
use crate::oracle::{RewriteOracle, Substitution};
use crate::options::TodoStrategy;
use crate::rewrite::enumerate::substitute_data_var;

/// A ground instantiation `p(c̄)`: a propositional variable name paired with its (already
/// oracle-normalized) closed argument list. The key of the instantiator's `seen` map (§4.C).
type Instantiation = (IString, Vec<DataTerm>);

/// The todo-set itself, implementing the three strategies of §4.C. `Highway` uses reservoir
/// sampling so that, after `n` total insertions, each surviving pending slot holds its item with
/// uniform probability `N/n` -- exactly the "replace a uniformly chosen already-pending state with
/// probability N/n" rule (§4.C, §9).
enum TodoSet {
    Fifo(VecDeque<Instantiation>),
    Lifo(VecDeque<Instantiation>),
    Highway { pending: Vec<Instantiation>, capacity: usize, seen_count: u64, rng: StdRng },
}

impl TodoSet {
    fn new(strategy: TodoStrategy, seed: u64) -> Self {
        match strategy {
            TodoStrategy::BreadthFirst => TodoSet::Fifo(VecDeque::new()),
            TodoStrategy::DepthFirst => TodoSet::Lifo(VecDeque::new()),
            TodoStrategy::Highway(capacity) => TodoSet::Highway {
                pending: Vec::with_capacity(capacity),
                capacity,
                seen_count: 0,
                rng: StdRng::seed_from_u64(seed),
            },
        }
    }

    fn push(&mut self, item: Instantiation) {
        match self {
            TodoSet::Fifo(q) | TodoSet::Lifo(q) => q.push_back(item),
            TodoSet::Highway { pending, capacity, seen_count, rng } => {
                *seen_count += 1;
                if pending.len() < *capacity {
                    pending.push(item);
                } else if *capacity > 0 {
                    // Item number `seen_count` survives into slot `j` with probability `1/seen_count`;
                    // summed over all `capacity` slots that's the advertised `capacity/seen_count`.
                    let j = rng.gen_range(0..*seen_count) as usize;
                    if j < *capacity {
                        pending[j] = item;
                    }
                }
            }
        }
    }

    fn pop(&mut self) -> Option<Instantiation> {
        match self {
            TodoSet::Fifo(q) => q.pop_front(),
            TodoSet::Lifo(q) => q.pop_back(),
            TodoSet::Highway { pending, .. } => pending.pop(),
        }
    }
}

/// Tracks minted RES variable names for each ground instantiation seen so far, and drives the
/// `Var(q, d̄) -> Var(minted_name, [])` substitution performed while grounding a dequeued
/// equation's right-hand side (§4.C).
struct Namer {
    seen: HashMap<Instantiation, IString>,
    next_id: u64,
}

impl Namer {
    fn new() -> Self {
        Namer { seen: HashMap::new(), next_id: 0 }
    }

    /// Returns the minted name for `inst`, minting and enqueueing a fresh one if this is the first
    /// time it has been seen.
    fn name_of(&mut self, inst: Instantiation, todo: &mut TodoSet) -> IString {
        if let Some(name) = self.seen.get(&inst) {
            return *name;
        }
        let minted = IString::from(format!("{}#{}", inst.0, self.next_id).as_str());
        self.next_id += 1;
        self.seen.insert(inst.clone(), minted);
        todo.push(inst);
        minted
    }
}

/// Normalize a ground argument list through the oracle so that syntactically different but
/// semantically equal arguments (e.g. `1+1` and `2`) map to the same instantiation.
fn normalize_args(args: &[DataTerm], oracle: &dyn RewriteOracle) -> Vec<DataTerm> {
    let empty = Substitution::new();
    args.iter().map(|a| oracle.rewrite(a, &empty)).collect()
}

/// Replace every `Var(q, d̄)` in `expr` by `Var(name_of(q(d̄)), [])`, normalizing each argument list
/// through the oracle first and minting/enqueueing a fresh ground instantiation the first time one
/// is encountered (§4.C).
fn ground_vars(expr: &BxExpr, namer: &mut Namer, todo: &mut TodoSet, oracle: &dyn RewriteOracle) -> BxExpr {
    match expr.as_ref() {
        Expr::Data(_) => expr.clone(),
        Expr::Var(name, args) => {
            let normalized = normalize_args(args, oracle);
            let ground_name = namer.name_of((*name, normalized), todo);
            Expr::var(ground_name, VarArgs::new())
        }
        Expr::Minus(e) => Expr::minus(ground_vars(e, namer, todo, oracle)),
        Expr::And(l, r) => Expr::and(ground_vars(l, namer, todo, oracle), ground_vars(r, namer, todo, oracle)),
        Expr::Or(l, r) => Expr::or(ground_vars(l, namer, todo, oracle), ground_vars(r, namer, todo, oracle)),
        Expr::Imp(l, r) => Expr::imp(ground_vars(l, namer, todo, oracle), ground_vars(r, namer, todo, oracle)),
        Expr::Plus(l, r) => Expr::plus(ground_vars(l, namer, todo, oracle), ground_vars(r, namer, todo, oracle)),
        Expr::ConstMul(k, e) => Expr::const_mul(k.clone(), ground_vars(e, namer, todo, oracle)),
        Expr::ConstMulAlt(e, k) => Rc::new(Expr::ConstMulAlt(ground_vars(e, namer, todo, oracle), k.clone())),
        Expr::EqInf(e) => Expr::eqinf(ground_vars(e, namer, todo, oracle)),
        Expr::EqNInf(e) => Expr::eqninf(ground_vars(e, namer, todo, oracle)),
        Expr::CondSm(c, t, e) => Expr::condsm(
            ground_vars(c, namer, todo, oracle),
            ground_vars(t, namer, todo, oracle),
            ground_vars(e, namer, todo, oracle),
        ),
        Expr::CondEq(c, t, e) => Expr::condeq(
            ground_vars(c, namer, todo, oracle),
            ground_vars(t, namer, todo, oracle),
            ground_vars(e, namer, todo, oracle),
        ),
        // Quantifiers must already have been eliminated by the enumerator (§4.B) before an
        // equation's body reaches the instantiator; none of the finite PRES this core accepts
        // should leave one behind. A quantifier over a non-enumerable sort is left in place by
        // design, and its body is still visited.
        Expr::Infimum(xs, body) => Rc::new(Expr::Infimum(xs.clone(), ground_vars(body, namer, todo, oracle))),
        Expr::Supremum(xs, body) => Rc::new(Expr::Supremum(xs.clone(), ground_vars(body, namer, todo, oracle))),
        Expr::Sum(xs, body) => Rc::new(Expr::Sum(xs.clone(), ground_vars(body, namer, todo, oracle))),
    }
}

/// Substitute a PRES equation's formal parameters `x̄` by the closed ground arguments `c̄`, rewrite
/// (§4.A) and enumerate (§4.B) the result, then ground every remaining `Var` occurrence (§4.C).
fn instantiate_one(
    eq: &PresEquation,
    args: &[DataTerm],
    namer: &mut Namer,
    todo: &mut TodoSet,
    oracle: &dyn RewriteOracle,
) -> CoreResult<BxExpr> {
    let mut substituted = eq.rhs.clone();
    for ((name, _sort), value) in eq.params.iter().zip(args.iter()) {
        substituted = substitute_data_var(&substituted, *name, value);
    }
    let rewritten = crate::rewrite::simplify::simplify(&substituted, oracle)?;
    let expanded = crate::rewrite::enumerate::enumerate_quantifiers(&rewritten, oracle)?;
    let cleaned = crate::rewrite::simplify::simplify(&expanded, oracle)?;
    Ok(ground_vars(&cleaned, namer, todo, oracle))
}

/// Produce a RES by reachability from `pres.initial_name(pres.initial_args)` (§4.C). `strategy`
/// selects the todo-queue discipline and `seed` drives `TodoStrategy::Highway`'s reservoir sampler.
pub fn instantiate(
    pres: &Pres,
    oracle: &dyn RewriteOracle,
    strategy: TodoStrategy,
    seed: u64,
) -> CoreResult<ResSystem> {
    let mut namer = Namer::new();
    let mut todo = TodoSet::new(strategy, seed);

    let initial_args = normalize_args(&pres.initial_args, oracle);
    let initial_inst: Instantiation = (pres.initial_name, initial_args);
    if pres.equation(&initial_inst.0).is_none() {
        return Err(ErrorKind::InvalidReference(initial_inst.0));
    }
    let initial_name = namer.name_of(initial_inst, &mut todo);

    let mut emitted: Vec<ResEquation> = Vec::new();
    while let Some((name, args)) = todo.pop() {
        let eq = pres.equation(&name).ok_or(ErrorKind::InvalidReference(name))?;
        log::debug!("instantiating {name}({args:?}) under {strategy:?}");
        let rhs = instantiate_one(eq, &args, &mut namer, &mut todo, oracle)?;
        let ground_name = *namer.seen.get(&(name, args)).expect("just dequeued, must be in `seen`");
        log::trace!("minted {ground_name} for {name}, rhs = {rhs}");
        emitted.push(ResEquation::new(eq.sign, ground_name, rhs));
    }

    // Re-sort by the *original* PRES block rank of each equation's defining variable so the
    // ground system preserves block alternation (§4.C, "Block ordering"); the sort is stable, so
    // dequeue order is preserved within a rank.
    let rank_of: HashMap<IString, usize> = pres
        .equations
        .iter()
        .zip(pres_block_ranks(&pres.equations))
        .map(|(eq, rank)| (eq.name, rank))
        .collect();
    let original_p: HashMap<IString, IString> =
        namer.seen.iter().map(|((p, _), ground)| (*ground, *p)).collect();
    emitted.sort_by_key(|eq| *rank_of.get(&original_p[&eq.var]).unwrap_or(&0));

    Ok(ResSystem::new(emitted, initial_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_term::Rational;
    use crate::core::equation::{PresEquation, Sign};
    use crate::core::sort::Sort;
    use crate::oracle::TreeWalkingOracle;

    fn var(name: &str, args: VarArgs) -> BxExpr {
        Expr::var(IString::from(name), args)
    }

    #[test]
    fn grounds_a_parameterless_mutual_recursion() {
        // mu X1 = X2 ; nu X2 = X1 ; init X1  -- scenario S1 of spec §8.
        let oracle = TreeWalkingOracle::new();
        let x1 = PresEquation::new(Sign::Mu, IString::from("X1"), vec![], var("X2", VarArgs::new()));
        let x2 = PresEquation::new(Sign::Nu, IString::from("X2"), vec![], var("X1", VarArgs::new()));
        let pres = Pres::new(vec![x1, x2], IString::from("X1"), vec![]);

        let res = instantiate(&pres, &oracle, TodoStrategy::BreadthFirst, 0).unwrap();
        assert_eq!(res.equations.len(), 2);
        assert_eq!(res.index_of(&res.initial), Some(0));
    }

    #[test]
    fn grounds_distinct_parameter_values_to_distinct_variables() {
        // mu P(n: Real) = P(n) ; init P(0) and P(1) would be distinct instantiations; here we only
        // reach P(0), so exactly one ground equation is produced self-referentially.
        let n = IString::from("n");
        let body = var("P", VarArgs::from_elem(DataTerm::Var(n), 1));
        let eq = PresEquation::new(Sign::Mu, IString::from("P"), vec![(n, Sort::real())], body);
        let pres = Pres::new(vec![eq], IString::from("P"), vec![DataTerm::Real(Rational::zero())]);
        let oracle = TreeWalkingOracle::new();

        let res = instantiate(&pres, &oracle, TodoStrategy::BreadthFirst, 0).unwrap();
        assert_eq!(res.equations.len(), 1);
        assert_eq!(res.equations[0].var, res.initial);
    }

    #[test]
    fn invalid_reference_on_unknown_initial_variable() {
        let pres = Pres::new(vec![], IString::from("Missing"), vec![]);
        let oracle = TreeWalkingOracle::new();
        let result = instantiate(&pres, &oracle, TodoStrategy::BreadthFirst, 0);
        assert!(matches!(result, Err(ErrorKind::InvalidReference(_))));
    }

    #[test]
    fn highway_strategy_is_deterministic_given_a_seed() {
        // Build a small fan-out PRES so the highway's bounded reservoir actually has to choose.
        let n = IString::from("n");
        let one: VarArgs = VarArgs::from_elem(DataTerm::Var(n), 1);
        let body = Expr::and(var("P", one.clone()), var("Q", one.clone()));
        let p_eq = PresEquation::new(Sign::Mu, IString::from("P"), vec![(n, Sort::real())], Expr::tt());
        let q_eq = PresEquation::new(Sign::Mu, IString::from("Q"), vec![(n, Sort::real())], Expr::ff());
        let root = PresEquation::new(Sign::Mu, IString::from("R"), vec![(n, Sort::real())], body);
        let pres = Pres::new(vec![root, p_eq, q_eq], IString::from("R"), vec![DataTerm::Real(Rational::zero())]);
        let oracle = TreeWalkingOracle::new();

        let a = instantiate(&pres, &oracle, TodoStrategy::Highway(2), 42).unwrap();
        let b = instantiate(&pres, &oracle, TodoStrategy::Highway(2), 42).unwrap();
        assert_eq!(a.equations.len(), b.equations.len());
        let names_a: Vec<_> = a.equations.iter().map(|e| e.var).collect();
        let names_b: Vec<_> = b.equations.iter().map(|e| e.var).collect();
        assert_eq!(names_a, names_b);
    }
}
