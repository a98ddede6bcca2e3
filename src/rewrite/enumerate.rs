/*!

Component C: the quantifier enumerator (§4.B). Replaces `Infimum(xs, body)` by the fold
`body[x ↦ v₁] ⊓ … ⊓ body[x ↦ vₙ]` where `{v₁,…,vₙ} = enumerate(sort(x))` -- similarly `Supremum` with
`⊔` and `Sum` with `+`. Operates bound-variable by bound-variable, left to right; a variable whose
sort is not enumerable is left bound in a residual quantifier while the rest of the list is still
expanded. This is the sole mechanism by which quantifiers over finite data disappear before the
expression reaches the normal-form builder.

*/

use std::rc::Rc;

use crate::abstractions::IString;
use crate::core::data_term::DataTerm;
use crate::core::expression::{Binder, BxExpr, Expr, VarArgs};
use crate::error::CoreResult;
use crate::oracle::RewriteOracle;

#[derive(Copy, Clone)]
enum QKind {
    Inf,
    Sup,
    Sum,
}

/// Recursively expand every `Infimum`/`Supremum`/`Sum` reachable in `expr`.
pub fn enumerate_quantifiers(expr: &BxExpr, oracle: &dyn RewriteOracle) -> CoreResult<BxExpr> {
    match expr.as_ref() {
        Expr::Data(_) | Expr::Var(..) => Ok(expr.clone()),

        Expr::Minus(e) => Ok(Expr::minus(enumerate_quantifiers(e, oracle)?)),
        Expr::And(l, r) => Ok(Expr::and(enumerate_quantifiers(l, oracle)?, enumerate_quantifiers(r, oracle)?)),
        Expr::Or(l, r) => Ok(Expr::or(enumerate_quantifiers(l, oracle)?, enumerate_quantifiers(r, oracle)?)),
        Expr::Imp(l, r) => Ok(Expr::imp(enumerate_quantifiers(l, oracle)?, enumerate_quantifiers(r, oracle)?)),
        Expr::Plus(l, r) => Ok(Expr::plus(enumerate_quantifiers(l, oracle)?, enumerate_quantifiers(r, oracle)?)),

        Expr::ConstMul(k, e) => Ok(Expr::const_mul(k.clone(), enumerate_quantifiers(e, oracle)?)),
        Expr::ConstMulAlt(e, k) => Ok(Rc::new(Expr::ConstMulAlt(enumerate_quantifiers(e, oracle)?, k.clone()))),

        Expr::EqInf(e) => Ok(Expr::eqinf(enumerate_quantifiers(e, oracle)?)),
        Expr::EqNInf(e) => Ok(Expr::eqninf(enumerate_quantifiers(e, oracle)?)),

        Expr::CondSm(c, t, e) => Ok(Expr::condsm(
            enumerate_quantifiers(c, oracle)?,
            enumerate_quantifiers(t, oracle)?,
            enumerate_quantifiers(e, oracle)?,
        )),
        Expr::CondEq(c, t, e) => Ok(Expr::condeq(
            enumerate_quantifiers(c, oracle)?,
            enumerate_quantifiers(t, oracle)?,
            enumerate_quantifiers(e, oracle)?,
        )),

        Expr::Infimum(xs, body) => {
            let body = enumerate_quantifiers(body, oracle)?;
            expand(QKind::Inf, xs, &body, oracle)
        }
        Expr::Supremum(xs, body) => {
            let body = enumerate_quantifiers(body, oracle)?;
            expand(QKind::Sup, xs, &body, oracle)
        }
        Expr::Sum(xs, body) => {
            let body = enumerate_quantifiers(body, oracle)?;
            expand(QKind::Sum, xs, &body, oracle)
        }
    }
}

fn expand(kind: QKind, xs: &[Binder], body: &BxExpr, oracle: &dyn RewriteOracle) -> CoreResult<BxExpr> {
    let Some((head, rest_xs)) = xs.split_first() else {
        return Ok(body.clone());
    };
    let (name, sort) = head.clone();
    match oracle.enumerate(&sort) {
        Some(values) => {
            if values.is_empty() {
                return Ok(identity_for(kind));
            }
            let mut acc: Option<BxExpr> = None;
            for v in values {
                let substituted = substitute_data_var(body, name, &v);
                let folded = expand(kind, rest_xs, &substituted, oracle)?;
                acc = Some(match acc {
                    None => folded,
                    Some(a) => combine(kind, a, folded),
                });
            }
            Ok(acc.unwrap())
        }
        None => {
            let folded = expand(kind, rest_xs, body, oracle)?;
            Ok(wrap_quantifier(kind, vec![(name, sort)], folded))
        }
    }
}

fn identity_for(kind: QKind) -> BxExpr {
    match kind {
        QKind::Inf => Expr::tt(),
        QKind::Sup => Expr::ff(),
        QKind::Sum => Expr::zero(),
    }
}

fn combine(kind: QKind, a: BxExpr, b: BxExpr) -> BxExpr {
    match kind {
        QKind::Inf => Expr::and(a, b),
        QKind::Sup => Expr::or(a, b),
        QKind::Sum => Expr::plus(a, b),
    }
}

fn wrap_quantifier(kind: QKind, xs: Vec<Binder>, body: BxExpr) -> BxExpr {
    match kind {
        QKind::Inf => Rc::new(Expr::Infimum(xs, body)),
        QKind::Sup => Rc::new(Expr::Supremum(xs, body)),
        QKind::Sum => Rc::new(Expr::Sum(xs, body)),
    }
}

/// Replace every occurrence of the data variable `name` with `value`, not descending into a nested
/// quantifier that rebinds `name` (shadowing). `pub(crate)` because the instantiator (§4.C) reuses
/// it to apply a PRES equation's parameter substitution `x̄ ↦ c̄` before rewriting/enumerating.
pub(crate) fn substitute_data_var(expr: &BxExpr, name: IString, value: &DataTerm) -> BxExpr {
    match expr.as_ref() {
        Expr::Data(d) => Expr::data(substitute_in_data(d, name, value)),
        Expr::Var(n, args) => {
            let new_args: VarArgs = args.iter().map(|a| substitute_in_data(a, name, value)).collect();
            Expr::var(*n, new_args)
        }
        Expr::Minus(e) => Expr::minus(substitute_data_var(e, name, value)),
        Expr::And(l, r) => Expr::and(substitute_data_var(l, name, value), substitute_data_var(r, name, value)),
        Expr::Or(l, r) => Expr::or(substitute_data_var(l, name, value), substitute_data_var(r, name, value)),
        Expr::Imp(l, r) => Expr::imp(substitute_data_var(l, name, value), substitute_data_var(r, name, value)),
        Expr::Plus(l, r) => Expr::plus(substitute_data_var(l, name, value), substitute_data_var(r, name, value)),
        Expr::ConstMul(k, e) => Expr::const_mul(substitute_in_data(k, name, value), substitute_data_var(e, name, value)),
        Expr::ConstMulAlt(e, k) => Rc::new(Expr::ConstMulAlt(
            substitute_data_var(e, name, value),
            substitute_in_data(k, name, value),
        )),
        Expr::EqInf(e) => Expr::eqinf(substitute_data_var(e, name, value)),
        Expr::EqNInf(e) => Expr::eqninf(substitute_data_var(e, name, value)),
        Expr::CondSm(c, t, e) => Expr::condsm(
            substitute_data_var(c, name, value),
            substitute_data_var(t, name, value),
            substitute_data_var(e, name, value),
        ),
        Expr::CondEq(c, t, e) => Expr::condeq(
            substitute_data_var(c, name, value),
            substitute_data_var(t, name, value),
            substitute_data_var(e, name, value),
        ),
        Expr::Infimum(xs, body) => rebind_or_substitute(xs, body, name, value, QKind::Inf),
        Expr::Supremum(xs, body) => rebind_or_substitute(xs, body, name, value, QKind::Sup),
        Expr::Sum(xs, body) => rebind_or_substitute(xs, body, name, value, QKind::Sum),
    }
}

fn rebind_or_substitute(xs: &[Binder], body: &BxExpr, name: IString, value: &DataTerm, kind: QKind) -> BxExpr {
    if xs.iter().any(|(n, _)| *n == name) {
        wrap_quantifier(kind, xs.to_vec(), body.clone())
    } else {
        wrap_quantifier(kind, xs.to_vec(), substitute_data_var(body, name, value))
    }
}

fn substitute_in_data(d: &DataTerm, name: IString, value: &DataTerm) -> DataTerm {
    match d {
        DataTerm::Var(n) if *n == name => value.clone(),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_term::Rational;
    use crate::core::sort::Sort;
    use crate::oracle::TreeWalkingOracle;

    #[test]
    fn infimum_over_bool_expands_to_conjunction() {
        let oracle = TreeWalkingOracle::new();
        let x = IString::from("x");
        let mut args: VarArgs = VarArgs::new();
        args.push(DataTerm::Var(x));
        let body = Expr::var(IString::from("P"), args);
        let expr = Rc::new(Expr::Infimum(vec![(x, Sort::bool())], body));
        let result = enumerate_quantifiers(&expr, &oracle).unwrap();

        let mut false_args: VarArgs = VarArgs::new();
        false_args.push(DataTerm::Bool(false));
        let mut true_args: VarArgs = VarArgs::new();
        true_args.push(DataTerm::Bool(true));
        let expected = Expr::and(
            Expr::var(IString::from("P"), false_args),
            Expr::var(IString::from("P"), true_args),
        );
        assert_eq!(result, expected);
    }

    #[test]
    fn sum_over_registered_domain_folds_with_plus() {
        let mut oracle = TreeWalkingOracle::new();
        let sort = Sort::from("Coin");
        oracle.register_domain(
            sort,
            vec![
                DataTerm::Opaque(sort, IString::from("Heads")),
                DataTerm::Opaque(sort, IString::from("Tails")),
            ],
        );
        let x = IString::from("c");
        let body = Expr::data(DataTerm::Real(Rational::from_integer(1)));
        let expr = Rc::new(Expr::Sum(vec![(x, sort)], body));
        let result = enumerate_quantifiers(&expr, &oracle).unwrap();
        assert_eq!(
            result,
            Expr::plus(
                Expr::data(DataTerm::Real(Rational::from_integer(1))),
                Expr::data(DataTerm::Real(Rational::from_integer(1)))
            )
        );
    }

    #[test]
    fn non_enumerable_sort_leaves_quantifier_in_place() {
        let oracle = TreeWalkingOracle::new();
        let x = IString::from("s");
        let sort = Sort::from("Stream");
        let body = Expr::data(DataTerm::Bool(true));
        let expr = Rc::new(Expr::Infimum(vec![(x, sort)], body));
        let result = enumerate_quantifiers(&expr, &oracle).unwrap();
        assert_eq!(result, expr);
    }
}
