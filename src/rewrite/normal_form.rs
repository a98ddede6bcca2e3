/*!

Component E: the normal-form builder (§4.D). Rewrites an RES right-hand side into *simple normal
form* (SNF), parameterized by a `conjunctive` flag: conjunctive SNF is `true` or a meet (`And`) of
disjuncts, each disjunct a join (`Or`) of monomials; disjunctive SNF is the dual. `CondSm`/`CondEq`
are never flattened through -- they bubble to the absolute outermost position of the whole
expression, exactly as the pushdown table prescribes, and their three children are normalized
recursively with the same flag.

The builder proceeds in three passes:

1. [`push_minus`] eliminates `Imp` (rewritten to `Or(Minus(l), r)`) and drives every remaining
   `Minus` down to a variable, so the §3.2 invariant ("after normalization, `Minus` appears only on
   variables") holds of the output.
2. [`build`] walks the Minus-free tree bottom-up, producing either a flat meet-of-joins (or
   join-of-meets) structure ([`Snf::Flat`]) or a `CondSm`/`CondEq` wrapper around two recursively
   built sub-structures ([`Snf::Cond`]), bubbling conditionals outward through `And`/`Or`/`Plus`/
   `ConstMul` exactly as the pushdown table requires.
3. [`to_expr`] collapses the `Snf` back into an `Expr` tree, folding sibling `Plus` terms with an
   identical non-constant factor (the "grouping step") and deduplicating sibling conjuncts/disjuncts
   by structural identity.

*/

use std::collections::HashSet;

use crate::abstractions::IString;
use crate::core::data_term::{DataTerm, Rational};
use crate::core::expression::{BxExpr, Expr, VarArgs};
use crate::error::{CoreResult, ErrorKind};
use crate::oracle::RewriteOracle;

/// Normalize `expr` into SNF. `conjunctive = true` selects CNF (meet of joins); `false` selects DNF
/// (join of meets). Signals `ErrorKind::Unsupported` if an `Infimum`/`Supremum`/`Sum` survives into
/// the builder -- it must already have been eliminated by the quantifier enumerator (§4.B).
pub fn normalize(expr: &BxExpr, conjunctive: bool, oracle: &dyn RewriteOracle) -> CoreResult<BxExpr> {
    let desugared = push_minus(expr)?;
    let snf = build(&desugared, conjunctive, oracle)?;
    let collapsed = to_expr(snf, conjunctive, oracle)?;
    crate::rewrite::simplify::simplify(&collapsed, oracle)
}

/// Rewrite `Imp` away and drive `Minus` down to variables.
fn push_minus(expr: &BxExpr) -> CoreResult<BxExpr> {
    match expr.as_ref() {
        Expr::Data(_) | Expr::Var(..) => Ok(expr.clone()),
        Expr::Minus(e) => Ok(negate(&push_minus(e)?)),
        Expr::And(l, r) => Ok(Expr::and(push_minus(l)?, push_minus(r)?)),
        Expr::Or(l, r) => Ok(Expr::or(push_minus(l)?, push_minus(r)?)),
        Expr::Imp(l, r) => Ok(Expr::or(negate(&push_minus(l)?), push_minus(r)?)),
        Expr::Plus(l, r) => Ok(Expr::plus(push_minus(l)?, push_minus(r)?)),
        Expr::ConstMul(k, e) => Ok(Expr::const_mul(k.clone(), push_minus(e)?)),
        Expr::ConstMulAlt(e, k) => Ok(std::rc::Rc::new(Expr::ConstMulAlt(push_minus(e)?, k.clone()))),
        Expr::EqInf(e) => Ok(Expr::eqinf(push_minus(e)?)),
        Expr::EqNInf(e) => Ok(Expr::eqninf(push_minus(e)?)),
        Expr::CondSm(c, t, e) => Ok(Expr::condsm(push_minus(c)?, push_minus(t)?, push_minus(e)?)),
        Expr::CondEq(c, t, e) => Ok(Expr::condeq(push_minus(c)?, push_minus(t)?, push_minus(e)?)),
        Expr::Infimum(..) | Expr::Supremum(..) | Expr::Sum(..) => {
            Err(ErrorKind::Unsupported("quantifier survived to normal-form builder".to_string()))
        }
    }
}

/// Negate an already-Minus-pushed expression. `EqInf`/`EqNInf`/`CondSm`/`CondEq` are left wrapped in
/// a literal `Minus` -- negating a three-way conditional or an infinity predicate does not reduce to
/// one of the eight conditional-free operators in general, so this is the conservative, documented
/// boundary (see DESIGN.md).
fn negate(expr: &BxExpr) -> BxExpr {
    match expr.as_ref() {
        Expr::Data(DataTerm::Bool(b)) => Expr::data(DataTerm::Bool(!b)),
        Expr::Data(DataTerm::Real(r)) => Expr::data(DataTerm::Real(-*r)),
        Expr::Data(_) => Expr::minus(expr.clone()),
        Expr::Var(..) => Expr::minus(expr.clone()),
        Expr::Minus(inner) => inner.clone(),
        Expr::And(l, r) => Expr::or(negate(l), negate(r)),
        Expr::Or(l, r) => Expr::and(negate(l), negate(r)),
        Expr::Plus(l, r) => Expr::plus(negate(l), negate(r)),
        Expr::ConstMul(k, e) => Expr::const_mul(k.clone(), negate(e)),
        Expr::ConstMulAlt(e, k) => std::rc::Rc::new(Expr::ConstMulAlt(negate(e), k.clone())),
        _ => Expr::minus(expr.clone()),
    }
}

/// A partially built SNF: either a flat meet-of-joins (join-of-meets for DNF), or a preserved
/// `CondSm`/`CondEq` layer whose branches are themselves (possibly still-flat, possibly
/// still-conditional) SNF structures.
enum Snf {
    Flat(Groups),
    Cond { is_condsm: bool, c: BxExpr, t: Box<Snf>, e: Box<Snf> },
}

/// The major dimension (outer list) is combined by `And` when `conjunctive`, `Or` otherwise; the
/// minor dimension (each inner list) by the opposite connective.
type Groups = Vec<Vec<BxExpr>>;

fn singleton(atom: BxExpr) -> Snf {
    Snf::Flat(vec![vec![atom]])
}

fn build(expr: &BxExpr, conjunctive: bool, oracle: &dyn RewriteOracle) -> CoreResult<Snf> {
    match expr.as_ref() {
        Expr::Data(_) | Expr::Var(..) | Expr::Minus(_) | Expr::EqInf(_) | Expr::EqNInf(_) => {
            Ok(singleton(expr.clone()))
        }
        Expr::CondSm(c, t, e) => {
            let c = to_expr(build(c, conjunctive, oracle)?, conjunctive, oracle)?;
            let t = build(t, conjunctive, oracle)?;
            let e = build(e, conjunctive, oracle)?;
            Ok(Snf::Cond { is_condsm: true, c, t: Box::new(t), e: Box::new(e) })
        }
        Expr::CondEq(c, t, e) => {
            let c = to_expr(build(c, conjunctive, oracle)?, conjunctive, oracle)?;
            let t = build(t, conjunctive, oracle)?;
            let e = build(e, conjunctive, oracle)?;
            Ok(Snf::Cond { is_condsm: false, c, t: Box::new(t), e: Box::new(e) })
        }
        Expr::And(l, r) => combine(build(l, conjunctive, oracle)?, build(r, conjunctive, oracle)?, true, conjunctive),
        Expr::Or(l, r) => combine(build(l, conjunctive, oracle)?, build(r, conjunctive, oracle)?, false, conjunctive),
        Expr::Plus(l, r) => combine_plus(build(l, conjunctive, oracle)?, build(r, conjunctive, oracle)?),
        Expr::ConstMul(k, e) | Expr::ConstMulAlt(e, k) => map_const_mul(k.clone(), build(e, conjunctive, oracle)?),
        Expr::Imp(..) => unreachable!("Imp eliminated by push_minus"),
        Expr::Infimum(..) | Expr::Supremum(..) | Expr::Sum(..) => {
            Err(ErrorKind::Unsupported("quantifier survived to normal-form builder".to_string()))
        }
    }
}

/// Combine two already-built SNF structures under `And` (`is_and = true`) or `Or` (`is_and =
/// false`), bubbling any `CondSm`/`CondEq` layer out through the combination (the pushdown rule
/// `And(CondSm(c,t,e), r) -> CondSm(c, And(t,r), And(e,r))` and its siblings).
fn combine(a: Snf, b: Snf, is_and: bool, conjunctive: bool) -> CoreResult<Snf> {
    match (a, b) {
        (Snf::Cond { is_condsm, c, t, e }, other) => {
            let new_t = combine(*t, clone_snf(&other), is_and, conjunctive)?;
            let new_e = combine(*e, other, is_and, conjunctive)?;
            Ok(Snf::Cond { is_condsm, c, t: Box::new(new_t), e: Box::new(new_e) })
        }
        (other, Snf::Cond { is_condsm, c, t, e }) => {
            let new_t = combine(clone_snf(&other), *t, is_and, conjunctive)?;
            let new_e = combine(other, *e, is_and, conjunctive)?;
            Ok(Snf::Cond { is_condsm, c, t: Box::new(new_t), e: Box::new(new_e) })
        }
        (Snf::Flat(ga), Snf::Flat(gb)) => {
            let combined = if is_and == conjunctive { combine_major(ga, gb) } else { combine_minor(ga, gb) };
            Ok(Snf::Flat(combined))
        }
    }
}

fn combine_plus(a: Snf, b: Snf) -> CoreResult<Snf> {
    match (a, b) {
        (Snf::Cond { is_condsm, c, t, e }, other) => {
            let new_t = combine_plus(*t, clone_snf(&other))?;
            let new_e = combine_plus(*e, other)?;
            Ok(Snf::Cond { is_condsm, c, t: Box::new(new_t), e: Box::new(new_e) })
        }
        (other, Snf::Cond { is_condsm, c, t, e }) => {
            let new_t = combine_plus(clone_snf(&other), *t)?;
            let new_e = combine_plus(other, *e)?;
            Ok(Snf::Cond { is_condsm, c, t: Box::new(new_t), e: Box::new(new_e) })
        }
        (Snf::Flat(ga), Snf::Flat(gb)) => Ok(Snf::Flat(groups_plus(ga, gb))),
    }
}

fn map_const_mul(k: DataTerm, a: Snf) -> CoreResult<Snf> {
    match a {
        Snf::Cond { is_condsm, c, t, e } => Ok(Snf::Cond {
            is_condsm,
            c,
            t: Box::new(map_const_mul(k.clone(), *t)?),
            e: Box::new(map_const_mul(k, *e)?),
        }),
        Snf::Flat(g) => Ok(Snf::Flat(groups_const_mul(k, g))),
    }
}

/// `Snf` has no derived `Clone` (it would force cloning `Box`ed recursive structures we usually want
/// to move); this is the explicit, intentional copy used only when bubbling a conditional forces the
/// *other* operand to be combined with both of its branches.
fn clone_snf(snf: &Snf) -> Snf {
    match snf {
        Snf::Flat(g) => Snf::Flat(g.clone()),
        Snf::Cond { is_condsm, c, t, e } => {
            Snf::Cond { is_condsm: *is_condsm, c: c.clone(), t: Box::new(clone_snf(t)), e: Box::new(clone_snf(e)) }
        }
    }
}

fn combine_major(mut a: Groups, b: Groups) -> Groups {
    a.extend(b);
    a
}

fn combine_minor(a: Groups, b: Groups) -> Groups {
    let mut result = Vec::with_capacity(a.len() * b.len().max(1));
    for da in &a {
        for db in &b {
            let mut merged = da.clone();
            merged.extend(db.iter().cloned());
            dedup(&mut merged);
            result.push(merged);
        }
    }
    result
}

fn groups_plus(a: Groups, b: Groups) -> Groups {
    let mut result = Vec::with_capacity(a.len() * b.len().max(1));
    for da in &a {
        for db in &b {
            let mut minor = Vec::with_capacity(da.len() * db.len().max(1));
            for ma in da {
                for mb in db {
                    minor.push(Expr::plus(ma.clone(), mb.clone()));
                }
            }
            result.push(minor);
        }
    }
    result
}

fn groups_const_mul(k: DataTerm, a: Groups) -> Groups {
    a.into_iter()
        .map(|da| da.into_iter().map(|m| Expr::const_mul(k.clone(), m)).collect())
        .collect()
}

fn dedup(items: &mut Vec<BxExpr>) {
    let mut seen: Vec<BxExpr> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
}

/// Collapse an `Snf` back into an `Expr` tree, merging linear terms within each monomial group and
/// deduplicating sibling disjuncts/conjuncts.
fn to_expr(snf: Snf, conjunctive: bool, oracle: &dyn RewriteOracle) -> CoreResult<BxExpr> {
    match snf {
        Snf::Cond { is_condsm, c, t, e } => {
            let t = to_expr(*t, conjunctive, oracle)?;
            let e = to_expr(*e, conjunctive, oracle)?;
            Ok(if is_condsm { Expr::condsm(c, t, e) } else { Expr::condeq(c, t, e) })
        }
        Snf::Flat(groups) => {
            let mut disjuncts = Vec::with_capacity(groups.len());
            for minor in groups {
                let mut merged: Vec<BxExpr> =
                    minor.iter().map(|m| merge_linear_terms(m, oracle)).collect::<CoreResult<_>>()?;
                dedup(&mut merged);
                disjuncts.push(fold_connective(merged, !conjunctive));
            }
            dedup(&mut disjuncts);
            Ok(fold_connective(disjuncts, conjunctive))
        }
    }
}

/// Fold a non-empty list with `And` (`is_and = true`) or `Or`; an empty list folds to the
/// connective's identity (`true` for `And`, `false` for `Or`).
fn fold_connective(items: Vec<BxExpr>, is_and: bool) -> BxExpr {
    if items.is_empty() {
        return if is_and { Expr::tt() } else { Expr::ff() };
    }
    items.into_iter().reduce(|a, b| if is_and { Expr::and(a, b) } else { Expr::or(a, b) }).unwrap()
}

/// Fold a single monomial's `Plus`-chain into the canonical shape `c1*X1 + ... + c'*eqninf(Xk) + f`:
/// sibling terms with an identical non-constant factor are merged (their coefficients summed) and
/// constant reals are collapsed into one leading term (§4.D "Grouping step").
fn merge_linear_terms(expr: &BxExpr, oracle: &dyn RewriteOracle) -> CoreResult<BxExpr> {
    let mut coeffs: Vec<(IString, Rational)> = Vec::new();
    let mut eqninf_vars: Vec<IString> = Vec::new();
    let mut eqninf_seen: HashSet<IString> = HashSet::new();
    let mut rest: Vec<BxExpr> = Vec::new();

    collect_linear(expr, &mut coeffs, &mut eqninf_vars, &mut eqninf_seen, &mut rest);

    let mut terms: Vec<BxExpr> = Vec::new();
    for (name, coeff) in coeffs {
        if coeff.is_zero() {
            continue;
        }
        let atom = Expr::var(name, VarArgs::new());
        let term = if coeff == Rational::one() {
            atom
        } else if coeff == -Rational::one() {
            Expr::minus(atom)
        } else if coeff.is_positive() {
            Expr::const_mul(DataTerm::Real(coeff), atom)
        } else {
            Expr::minus(Expr::const_mul(DataTerm::Real(-coeff), atom))
        };
        terms.push(term);
    }
    for name in eqninf_vars {
        terms.push(Expr::eqninf(Expr::var(name, VarArgs::new())));
    }

    let mut constant: Option<Rational> = None;
    let mut other_rest = Vec::new();
    for r in rest {
        if let Expr::Data(DataTerm::Real(v)) = r.as_ref() {
            constant = Some(match constant {
                Some(acc) => acc + *v,
                None => *v,
            });
        } else {
            other_rest.push(r);
        }
    }
    if let Some(c) = constant {
        if !c.is_zero() || (terms.is_empty() && other_rest.is_empty()) {
            terms.push(Expr::data(oracle.rewrite(&DataTerm::Real(c), &crate::oracle::Substitution::new())));
        }
    }
    terms.extend(other_rest);

    if terms.is_empty() {
        return Ok(Expr::zero());
    }
    Ok(terms.into_iter().reduce(Expr::plus).unwrap())
}

fn collect_linear(
    expr: &BxExpr,
    coeffs: &mut Vec<(IString, Rational)>,
    eqninf_vars: &mut Vec<IString>,
    eqninf_seen: &mut HashSet<IString>,
    rest: &mut Vec<BxExpr>,
) {
    match expr.as_ref() {
        Expr::Plus(l, r) => {
            collect_linear(l, coeffs, eqninf_vars, eqninf_seen, rest);
            collect_linear(r, coeffs, eqninf_vars, eqninf_seen, rest);
        }
        Expr::Var(name, args) if args.is_empty() => add_coeff(coeffs, *name, Rational::one()),
        Expr::Minus(inner) => match inner.as_ref() {
            Expr::Var(name, args) if args.is_empty() => add_coeff(coeffs, *name, -Rational::one()),
            _ => rest.push(expr.clone()),
        },
        Expr::ConstMul(k, e) | Expr::ConstMulAlt(e, k) => match (k.as_real(), e.as_ref()) {
            (Some(kr), Expr::Var(name, args)) if args.is_empty() => add_coeff(coeffs, *name, kr),
            (Some(kr), Expr::Minus(inner)) => match inner.as_ref() {
                Expr::Var(name, args) if args.is_empty() => add_coeff(coeffs, *name, -kr),
                _ => rest.push(expr.clone()),
            },
            (Some(_), Expr::EqNInf(inner)) => match inner.as_ref() {
                Expr::Var(name, args) if args.is_empty() => add_eqninf(eqninf_vars, eqninf_seen, *name),
                _ => rest.push(expr.clone()),
            },
            _ => rest.push(expr.clone()),
        },
        Expr::EqNInf(inner) => match inner.as_ref() {
            Expr::Var(name, args) if args.is_empty() => add_eqninf(eqninf_vars, eqninf_seen, *name),
            _ => rest.push(expr.clone()),
        },
        _ => rest.push(expr.clone()),
    }
}

fn add_coeff(coeffs: &mut Vec<(IString, Rational)>, name: IString, delta: Rational) {
    for (n, c) in coeffs.iter_mut() {
        if *n == name {
            *c = *c + delta;
            return;
        }
    }
    coeffs.push((name, delta));
}

fn add_eqninf(eqninf_vars: &mut Vec<IString>, seen: &mut HashSet<IString>, name: IString) {
    if seen.insert(name) {
        eqninf_vars.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::TreeWalkingOracle;

    fn oracle() -> TreeWalkingOracle {
        TreeWalkingOracle::new()
    }

    fn var(name: &str) -> BxExpr {
        Expr::var(IString::from(name), VarArgs::new())
    }

    fn real(n: i64) -> DataTerm {
        DataTerm::Real(Rational::from_integer(n))
    }

    #[test]
    fn flattens_nested_and_into_single_meet() {
        let o = oracle();
        let e = Expr::and(Expr::and(var("X"), var("Y")), var("Z"));
        let result = normalize(&e, true, &o).unwrap();
        // CNF of a pure conjunction is just the conjunction itself (three singleton disjuncts).
        assert_eq!(result, Expr::and(Expr::and(var("X"), var("Y")), var("Z")));
    }

    #[test]
    fn distributes_or_over_and_in_cnf() {
        let o = oracle();
        // Or(And(X, Y), Z) -> And(Or(X, Z), Or(Y, Z)) in CNF.
        let e = Expr::or(Expr::and(var("X"), var("Y")), var("Z"));
        let result = normalize(&e, true, &o).unwrap();
        assert_eq!(result, Expr::and(Expr::or(var("X"), var("Z")), Expr::or(var("Y"), var("Z"))));
    }

    #[test]
    fn merges_linear_terms_with_identical_factor() {
        let o = oracle();
        let half = DataTerm::Real(Rational::new(1, 2));
        let third = DataTerm::Real(Rational::new(1, 3));
        let e = Expr::plus(Expr::const_mul(half, var("X")), Expr::const_mul(third, var("X")));
        let result = normalize(&e, true, &o).unwrap();
        assert_eq!(result, Expr::const_mul(DataTerm::Real(Rational::new(5, 6)), var("X")));
    }

    #[test]
    fn const_mul_distributes_over_and() {
        let o = oracle();
        let k = real(2);
        let e = Expr::const_mul(k.clone(), Expr::and(var("X"), var("Y")));
        let result = normalize(&e, true, &o).unwrap();
        assert_eq!(result, Expr::and(Expr::const_mul(k.clone(), var("X")), Expr::const_mul(k, var("Y"))));
    }

    #[test]
    fn bubbles_condsm_out_through_and() {
        let o = oracle();
        let cond = Expr::condsm(Expr::zero(), var("T"), var("E"));
        let e = Expr::and(cond, var("R"));
        let result = normalize(&e, true, &o).unwrap();
        match result.as_ref() {
            Expr::CondSm(_, t, e2) => {
                assert_eq!(*t, Expr::and(var("T"), var("R")));
                assert_eq!(*e2, Expr::and(var("E"), var("R")));
            }
            other => panic!("expected a bubbled CondSm, got {other:?}"),
        }
    }

    #[test]
    fn minus_pushes_down_to_variable_via_imp() {
        let o = oracle();
        // Imp(X, Y) = Or(Minus(X), Y); no further push needed since X is already a variable.
        let e = Expr::imp(var("X"), var("Y"));
        let result = normalize(&e, true, &o).unwrap();
        assert_eq!(result, Expr::or(Expr::minus(var("X")), var("Y")));
    }

    #[test]
    fn minus_of_and_de_morgans_into_or_of_negations() {
        let o = oracle();
        let e = Expr::minus(Expr::and(var("X"), var("Y")));
        let result = normalize(&e, true, &o).unwrap();
        assert_eq!(result, Expr::or(Expr::minus(var("X")), Expr::minus(var("Y"))));
    }

    #[test]
    fn unsupported_when_quantifier_survives() {
        let o = oracle();
        let body = var("X");
        let e = std::rc::Rc::new(Expr::Infimum(vec![(IString::from("x"), crate::core::sort::Sort::bool())], body));
        assert!(matches!(normalize(&e, true, &o), Err(ErrorKind::Unsupported(_))));
    }

    #[test]
    fn idempotent_on_a_flattened_conjunction() {
        let o = oracle();
        let e = Expr::and(var("X"), var("Y"));
        let once = normalize(&e, true, &o).unwrap();
        let twice = normalize(&once, true, &o).unwrap();
        assert_eq!(once, twice);
    }
}
