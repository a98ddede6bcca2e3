/*!

Component B: the shallow, exhaustively-applied-bottom-up algebraic simplifier (§4.A). It maps PRES
expressions to PRES expressions, preserving denotation under any interpretation satisfying §3.2. It
is the leaf of the solver: every other component calls down into it, never the reverse.

*/

use crate::core::data_term::{DataTerm, Rational};
use crate::core::expression::{BxExpr, Expr};
use crate::error::{CoreResult, ErrorKind};
use crate::oracle::{RewriteOracle, Substitution};

/// Simplify `expr` bottom-up using the rules of §4.A. Does not raise on well-formed input; signals
/// `ErrorKind::InvariantViolation` if a subterm violates a structural invariant of §3.2 (e.g.
/// `ConstMul` with a non-positive constant).
pub fn simplify(expr: &BxExpr, oracle: &dyn RewriteOracle) -> CoreResult<BxExpr> {
    match expr.as_ref() {
        Expr::Data(d) => Ok(Expr::data(oracle.rewrite(d, &Substitution::new()))),

        Expr::Var(..) => Ok(expr.clone()),

        Expr::Minus(e) => {
            let e = simplify(e, oracle)?;
            Ok(simplify_minus(e))
        }

        Expr::And(l, r) => {
            let l = simplify(l, oracle)?;
            let r = simplify(r, oracle)?;
            Ok(simplify_and(l, r))
        }

        Expr::Or(l, r) => {
            let l = simplify(l, oracle)?;
            let r = simplify(r, oracle)?;
            Ok(simplify_or(l, r))
        }

        Expr::Imp(l, r) => {
            let l = simplify(l, oracle)?;
            let r = simplify(r, oracle)?;
            Ok(simplify_imp(l, r))
        }

        Expr::Plus(l, r) => {
            let l = simplify(l, oracle)?;
            let r = simplify(r, oracle)?;
            Ok(simplify_plus(l, r))
        }

        Expr::ConstMul(k, e) => {
            let e = simplify(e, oracle)?;
            simplify_const_mul(k.clone(), e)
        }

        Expr::ConstMulAlt(e, k) => {
            let e = simplify(e, oracle)?;
            simplify_const_mul(k.clone(), e)
        }

        Expr::EqInf(e) => {
            let e = simplify(e, oracle)?;
            Ok(simplify_eqinf(e))
        }

        Expr::EqNInf(e) => {
            let e = simplify(e, oracle)?;
            Ok(simplify_eqninf(e))
        }

        Expr::CondSm(c, t, e) => {
            let c = simplify(c, oracle)?;
            let t = simplify(t, oracle)?;
            let e = simplify(e, oracle)?;
            Ok(match c.as_bool_literal() {
                Some(false) => t,
                Some(true) => Expr::or(t, e),
                None => Expr::condsm(c, t, e),
            })
        }

        Expr::CondEq(c, t, e) => {
            let c = simplify(c, oracle)?;
            let t = simplify(t, oracle)?;
            let e = simplify(e, oracle)?;
            Ok(match c.as_bool_literal() {
                Some(false) => Expr::or(t, e),
                Some(true) => t,
                None => Expr::condeq(c, t, e),
            })
        }

        // Infimum/Supremum/Sum are the quantifier enumerator's responsibility (§4.B); the
        // simplifier only recurses into the body so folding still happens underneath a quantifier
        // that could not (yet) be eliminated.
        Expr::Infimum(xs, body) => Ok(std::rc::Rc::new(Expr::Infimum(xs.clone(), simplify(body, oracle)?))),
        Expr::Supremum(xs, body) => Ok(std::rc::Rc::new(Expr::Supremum(xs.clone(), simplify(body, oracle)?))),
        Expr::Sum(xs, body) => Ok(std::rc::Rc::new(Expr::Sum(xs.clone(), simplify(body, oracle)?))),
    }
}

fn simplify_minus(e: BxExpr) -> BxExpr {
    match e.as_ref() {
        Expr::Minus(inner) => inner.clone(),
        Expr::Data(DataTerm::Bool(true)) => Expr::ff(),
        Expr::Data(DataTerm::Bool(false)) => Expr::tt(),
        Expr::Data(DataTerm::Real(r)) => Expr::data(DataTerm::Real(-*r)),
        _ => Expr::minus(e),
    }
}

fn simplify_and(l: BxExpr, r: BxExpr) -> BxExpr {
    match (l.as_bool_literal(), r.as_bool_literal()) {
        (Some(true), _) => r,
        (Some(false), _) => Expr::ff(),
        (_, Some(true)) => l,
        (_, Some(false)) => Expr::ff(),
        _ => match (l.as_ref(), r.as_ref()) {
            (Expr::Data(DataTerm::Real(a)), Expr::Data(DataTerm::Real(b))) => {
                Expr::data(DataTerm::Real((*a).min(*b)))
            }
            _ => Expr::and(l, r),
        },
    }
}

fn simplify_or(l: BxExpr, r: BxExpr) -> BxExpr {
    match (l.as_bool_literal(), r.as_bool_literal()) {
        (Some(false), _) => r,
        (Some(true), _) => Expr::tt(),
        (_, Some(false)) => l,
        (_, Some(true)) => Expr::tt(),
        _ => match (l.as_ref(), r.as_ref()) {
            (Expr::Data(DataTerm::Real(a)), Expr::Data(DataTerm::Real(b))) => {
                Expr::data(DataTerm::Real((*a).max(*b)))
            }
            _ => Expr::or(l, r),
        },
    }
}

fn simplify_imp(l: BxExpr, r: BxExpr) -> BxExpr {
    // Imp(l, r) = max(-l, r); the boolean-literal corners fold the same way And/Or's do.
    match l.as_bool_literal() {
        Some(false) => Expr::tt(), // -(-inf) = +inf dominates
        Some(true) => r,           // -(+inf) = -inf is the additive identity for max
        None => Expr::imp(l, r),
    }
}

fn simplify_plus(l: BxExpr, r: BxExpr) -> BxExpr {
    if is_zero(&l) {
        return r;
    }
    if is_zero(&r) {
        return l;
    }
    // (+inf) + x = +inf unconditionally (§4.H), checked before the (-inf) case so that
    // (-inf) + (+inf) resolves to +inf rather than -inf.
    if l.as_bool_literal() == Some(true) || r.as_bool_literal() == Some(true) {
        return Expr::tt();
    }
    if l.as_bool_literal() == Some(false) || r.as_bool_literal() == Some(false) {
        return Expr::ff();
    }
    match (l.as_ref(), r.as_ref()) {
        (Expr::Data(DataTerm::Real(a)), Expr::Data(DataTerm::Real(b))) => Expr::data(DataTerm::Real(*a + *b)),
        _ => Expr::plus(l, r),
    }
}

fn is_zero(e: &BxExpr) -> bool {
    matches!(e.as_ref(), Expr::Data(DataTerm::Real(r)) if r.is_zero())
}

fn simplify_const_mul(k: DataTerm, e: BxExpr) -> CoreResult<BxExpr> {
    let k_real = match &k {
        DataTerm::Real(r) => Some(*r),
        _ => None,
    };
    if let Some(r) = k_real {
        if r.is_negative() {
            return Err(ErrorKind::InvariantViolation(format!(
                "ConstMul requires a non-negative constant, got {r}"
            )));
        }
        if r.is_zero() {
            return Ok(Expr::zero());
        }
        if r == Rational::one() {
            return Ok(e);
        }
        if is_infinity_preserving(&e) {
            return Ok(e);
        }
        if let Expr::Data(DataTerm::Real(er)) = e.as_ref() {
            return Ok(Expr::data(DataTerm::Real(r * *er)));
        }
    }
    Ok(Expr::const_mul(k, e))
}

/// `true` for the expression shapes whose value is invariant under multiplication by a positive
/// scalar: the two infinities and the two infinity predicates (§4.A).
fn is_infinity_preserving(e: &BxExpr) -> bool {
    matches!(
        e.as_ref(),
        Expr::Data(DataTerm::Bool(_)) | Expr::EqInf(_) | Expr::EqNInf(_)
    )
}

fn simplify_eqinf(e: BxExpr) -> BxExpr {
    match e.as_ref() {
        Expr::Data(DataTerm::Real(_)) => Expr::ff(),
        Expr::Data(DataTerm::Bool(true)) => Expr::tt(),
        Expr::Data(DataTerm::Bool(false)) => Expr::ff(),
        _ => Expr::eqinf(e),
    }
}

fn simplify_eqninf(e: BxExpr) -> BxExpr {
    match e.as_ref() {
        Expr::Data(DataTerm::Real(_)) => Expr::tt(),
        Expr::Data(DataTerm::Bool(true)) => Expr::ff(),
        Expr::Data(DataTerm::Bool(false)) => Expr::tt(),
        _ => Expr::eqninf(e),
    }
}
