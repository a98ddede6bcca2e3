/*!

Component F: the single-equation linear-fixed-point solver (§4.E). Given a fixed-point sign `σ`, a
variable `X`, and its right-hand side already in simple normal form (SNF, conjunctive when `σ = μ`,
disjunctive when `σ = ν` -- §4.D), produces a closed-form solution: an `X`-free expression denoting
the unique fixed point.

`CondSm`/`CondEq` and the top-level `And`(μ)/`Or`(ν) are peeled off recursively; once neither
remains, the residual body is a plain meet-or-join of "lines" of the shape
`cⱼ·X + c'ⱼ·eqninf(X) + fⱼ`, solved by [`solve_fixed_point_inner`] via the closed-form table. The
table's μ/ν halves are deliberately asymmetric (which lines are skipped when `eqninf(X)` also
appears, whether `m`'s rest-term is folded via `∨` or `∧`) and are preserved exactly rather than
re-derived, as the source material that defines them instructs.

*/

use std::rc::Rc;

use enumflags2::{bitflags, BitFlags};

use crate::core::data_term::{DataTerm, Rational};
use crate::core::equation::Sign;
use crate::core::expression::{BxExpr, Expr};
use crate::error::{CoreResult, ErrorKind};
use crate::oracle::RewriteOracle;
use crate::abstractions::IString;
use crate::solve::substitute_prop_var;

/// Which parts a [`Line`] turned out to carry, cached at classification time rather than
/// re-derived from its `Option` fields every time `split_lines`/the fold helpers ask -- mirrors the
/// original's three independent `bool` flags (`c_j_term_present`, `f_j_term_present`,
/// `eqninf_term_present`) as a single packed set.
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum LineShape {
    HasCoefficient,
    HasConstantTerm,
    HasEqNInf,
}

/// Solve `σ X = rhs` for `X`, returning an `X`-free closed form.
pub fn solve_single_equation(sign: Sign, v: IString, rhs: &BxExpr, oracle: &dyn RewriteOracle) -> CoreResult<BxExpr> {
    match (sign, rhs.as_ref()) {
        (Sign::Mu, Expr::CondSm(c, t, e)) => {
            let sol_t = solve_single_equation(Sign::Mu, v, t, oracle)?;
            let te = crate::rewrite::normal_form::normalize(&Expr::or(t.clone(), e.clone()), true, oracle)?;
            let sol_te = solve_single_equation(Sign::Mu, v, &te, oracle)?;
            let new_condition = substitute_prop_var(c, v, &sol_t);
            Ok(Expr::condsm(new_condition, sol_t, sol_te))
        }
        (Sign::Nu, Expr::CondSm(c, t, e)) => {
            let sol_t = solve_single_equation(Sign::Nu, v, t, oracle)?;
            let sol_e = solve_single_equation(Sign::Nu, v, e, oracle)?;
            let new_condition = substitute_prop_var(c, v, &Expr::or(sol_t.clone(), sol_e.clone()));
            Ok(Expr::condsm(new_condition, sol_t, sol_e))
        }
        (Sign::Mu, Expr::CondEq(c, t, e)) => {
            let sol_t = solve_single_equation(Sign::Mu, v, t, oracle)?;
            let sol_e = solve_single_equation(Sign::Mu, v, e, oracle)?;
            let new_condition = substitute_prop_var(c, v, &Expr::and(sol_t.clone(), sol_e.clone()));
            Ok(Expr::condeq(new_condition, sol_t, sol_e))
        }
        (Sign::Nu, Expr::CondEq(c, t, e)) => {
            let sol_e = solve_single_equation(Sign::Nu, v, e, oracle)?;
            let te = crate::rewrite::normal_form::normalize(&Expr::and(t.clone(), e.clone()), false, oracle)?;
            let sol_te = solve_single_equation(Sign::Nu, v, &te, oracle)?;
            let new_condition = substitute_prop_var(c, v, &sol_e);
            Ok(Expr::condeq(new_condition, sol_te, sol_e))
        }
        (Sign::Mu, Expr::And(l, r)) => {
            let sl = solve_single_equation(Sign::Mu, v, l, oracle)?;
            let sr = solve_single_equation(Sign::Mu, v, r, oracle)?;
            Ok(Expr::and(sl, sr))
        }
        (Sign::Nu, Expr::Or(l, r)) => {
            let sl = solve_single_equation(Sign::Nu, v, l, oracle)?;
            let sr = solve_single_equation(Sign::Nu, v, r, oracle)?;
            Ok(Expr::or(sl, sr))
        }
        _ => solve_fixed_point_inner(sign, v, rhs, oracle),
    }
}

/// One monomial `cⱼ·X + c'ⱼ·eqninf(X) + fⱼ` of an SNF body, isolated for variable `v`: `c_j` is its
/// coefficient on `v` (absent if `v` does not occur bare/scaled in this monomial), `eqninf_present`
/// records whether `eqninf(v)` occurs, and `f_j` is everything else, Plus-folded together.
#[derive(Clone, Default)]
struct Line {
    c_j: Option<DataTerm>,
    f_j: Option<BxExpr>,
    eqninf_present: bool,
}

impl Line {
    fn shape(&self) -> BitFlags<LineShape> {
        let mut shape = BitFlags::empty();
        if self.c_j.is_some() {
            shape |= LineShape::HasCoefficient;
        }
        if self.f_j.is_some() {
            shape |= LineShape::HasConstantTerm;
        }
        if self.eqninf_present {
            shape |= LineShape::HasEqNInf;
        }
        shape
    }

    fn add_f_j(&mut self, term: BxExpr) {
        self.f_j = Some(match self.f_j.take() {
            Some(existing) => Expr::plus(existing, term),
            None => term,
        });
    }

    /// Mirrors the original's `update_c_j`: a monomial should carry `v`'s coefficient at most once
    /// after the normal-form builder's grouping step, but this still combines repeats rather than
    /// silently overwrite, matching the source algorithm's defensiveness.
    fn add_c_j(&mut self, k: DataTerm) -> CoreResult<()> {
        self.c_j = Some(match self.c_j.take() {
            Some(existing) => DataTerm::Real(coeff_as_rational(&existing)? + coeff_as_rational(&k)?),
            None => k,
        });
        Ok(())
    }
}

fn coeff_as_rational(term: &DataTerm) -> CoreResult<Rational> {
    term.as_real()
        .ok_or_else(|| ErrorKind::InvariantViolation(format!("line coefficient {term} did not reduce to a real number")))
}

/// Classify one monomial `t` (already free of any surviving `And`/`Or` of its own) as a [`Line`] in
/// `v`.
fn collect_line(line: &mut Line, v: IString, t: &BxExpr) -> CoreResult<()> {
    match t.as_ref() {
        Expr::Plus(l, r) => {
            collect_line(line, v, l)?;
            collect_line(line, v, r)
        }
        Expr::Var(name, args) if args.is_empty() && *name == v => line.add_c_j(DataTerm::Real(Rational::one())),
        Expr::ConstMul(k, e) | Expr::ConstMulAlt(e, k) if is_bare_var(e, v) => line.add_c_j(k.clone()),
        Expr::EqNInf(e) if is_bare_var(e, v) => {
            line.eqninf_present = true;
            Ok(())
        }
        Expr::Var(..) | Expr::ConstMul(..) | Expr::ConstMulAlt(..) | Expr::EqNInf(..) | Expr::Data(_) => {
            line.add_f_j(t.clone());
            Ok(())
        }
        other => Err(ErrorKind::Unsupported(format!(
            "single-equation solver expected a linear monomial, found {other:?}"
        ))),
    }
}

fn is_bare_var(e: &BxExpr, v: IString) -> bool {
    matches!(e.as_ref(), Expr::Var(name, args) if args.is_empty() && *name == v)
}

/// Split the (already `And`/`Or`-flattened) SNF body `t` into its constituent lines in `v`.
fn collect_lines(v: IString, t: &BxExpr) -> CoreResult<Vec<Line>> {
    let mut found = Vec::new();
    collect_lines_into(&mut found, v, t)?;
    Ok(found)
}

fn collect_lines_into(found: &mut Vec<Line>, v: IString, t: &BxExpr) -> CoreResult<()> {
    match t.as_ref() {
        Expr::And(l, r) | Expr::Or(l, r) => {
            collect_lines_into(found, v, l)?;
            collect_lines_into(found, v, r)
        }
        _ => {
            let mut line = Line::default();
            collect_line(&mut line, v, t)?;
            log::trace!("classified line for {v} as {:?}", line.shape());
            found.push(line);
            Ok(())
        }
    }
}

struct SplitLines {
    /// The fold of every line's `f_j` that carries no coefficient on `v` at all (§4.E's `m`):
    /// constant lines, references to other variables, and -- as a deliberate, documented deviation
    /// from folding unconditionally -- flat `eqninf`-only lines, but only when such a line's `f_j`
    /// is actually present (see DESIGN.md).
    m: BxExpr,
    shallow: Vec<Line>,
    steep: Vec<Line>,
    flat: Vec<Line>,
}

fn split_lines(lines: Vec<Line>, minimal: bool, oracle: &dyn RewriteOracle) -> CoreResult<SplitLines> {
    let mut shallow = Vec::new();
    let mut steep = Vec::new();
    let mut flat = Vec::new();
    let mut m: Option<BxExpr> = None;

    for line in lines {
        match &line.c_j {
            Some(c) => {
                let is_shallow = oracle
                    .less_than(c, &DataTerm::Real(Rational::one()))
                    .ok_or_else(|| ErrorKind::Undecidable(format!("cannot determine steepness of gradient {c}")))?;
                if is_shallow {
                    shallow.push(line);
                } else {
                    steep.push(line);
                }
            }
            None => {
                if line.eqninf_present {
                    flat.push(line.clone());
                }
                if let Some(f) = &line.f_j {
                    m = Some(match m {
                        Some(acc) => {
                            if minimal {
                                Expr::or(acc, f.clone())
                            } else {
                                Expr::and(acc, f.clone())
                            }
                        }
                        None => f.clone(),
                    });
                }
            }
        }
    }

    let m = m.unwrap_or_else(|| if minimal { Expr::ff() } else { Expr::tt() });
    log::debug!(
        "split {} line(s) into {} shallow, {} steep, {} flat",
        shallow.len() + steep.len() + flat.len(),
        shallow.len(),
        steep.len(),
        flat.len()
    );
    Ok(SplitLines { m, shallow, steep, flat })
}

/// Fold every line's `f_j` (ignoring any coefficient) across an arbitrary set of line groups.
fn fold_f_j<'a>(lines: impl Iterator<Item = &'a Line>, is_and: bool) -> BxExpr {
    let mut acc: Option<BxExpr> = None;
    for line in lines {
        if let Some(f) = &line.f_j {
            acc = Some(match acc {
                Some(a) => {
                    if is_and {
                        Expr::and(a, f.clone())
                    } else {
                        Expr::or(a, f.clone())
                    }
                }
                None => f.clone(),
            });
        }
    }
    acc.unwrap_or_else(|| if is_and { Expr::tt() } else { Expr::ff() })
}

fn any_eqninf(groups: &[&[Line]]) -> BxExpr {
    let present = groups.iter().any(|g| g.iter().any(|l| l.eqninf_present));
    if present {
        Expr::tt()
    } else {
        Expr::ff()
    }
}

/// Fold shallow lines' `fⱼ / (1 - cⱼ)` terms. `skip_eqninf` excludes lines that also carry an
/// `eqninf(v)` term (the ν-side restriction; μ folds every shallow line regardless).
fn fold_cj_fj(lines: &[Line], is_and: bool, skip_eqninf: bool) -> CoreResult<BxExpr> {
    let mut acc: Option<BxExpr> = None;
    for line in lines {
        if skip_eqninf && line.eqninf_present {
            continue;
        }
        if let Some(f) = &line.f_j {
            let c = coeff_as_rational(line.c_j.as_ref().expect("a shallow line always carries c_j"))?;
            let coeff = Rational::one() / (Rational::one() - c);
            let term = Expr::const_mul(DataTerm::Real(coeff), f.clone());
            acc = Some(match acc {
                Some(a) => {
                    if is_and {
                        Expr::and(a, term)
                    } else {
                        Expr::or(a, term)
                    }
                }
                None => term,
            });
        }
    }
    Ok(acc.unwrap_or_else(|| if is_and { Expr::tt() } else { Expr::ff() }))
}

/// Fold steep lines' `fⱼ + (cⱼ - 1)·U` terms (`0` in place of `(cⱼ-1)·U` when `cⱼ = 1`).
fn fold_fj_cj(
    lines: &[Line],
    u: &BxExpr,
    is_and: bool,
    skip_eqninf: bool,
    oracle: &dyn RewriteOracle,
) -> CoreResult<BxExpr> {
    let mut acc: Option<BxExpr> = None;
    for line in lines {
        if skip_eqninf && line.eqninf_present {
            continue;
        }
        let c = line.c_j.as_ref().expect("a steep line always carries c_j");
        let is_one = oracle
            .data_equal(c, &DataTerm::Real(Rational::one()))
            .ok_or_else(|| ErrorKind::Undecidable(format!("cannot determine whether gradient {c} equals one")))?;
        let mut term = if is_one {
            Expr::zero()
        } else {
            let c = coeff_as_rational(c)?;
            Expr::const_mul(DataTerm::Real(c - Rational::one()), u.clone())
        };
        if let Some(f) = &line.f_j {
            term = Expr::plus(f.clone(), term);
        }
        acc = Some(match acc {
            Some(a) => {
                if is_and {
                    Expr::and(a, term)
                } else {
                    Expr::or(a, term)
                }
            }
            None => term,
        });
    }
    Ok(acc.unwrap_or_else(|| if is_and { Expr::tt() } else { Expr::ff() }))
}

/// Solve a body already known to be a plain meet/join of lines in `v`: the closed-form table of
/// §4.E.
fn solve_fixed_point_inner(sign: Sign, v: IString, t: &BxExpr, oracle: &dyn RewriteOracle) -> CoreResult<BxExpr> {
    let lines = collect_lines(v, t)?;
    let minimal = sign.is_mu();
    let SplitLines { m, shallow, steep, flat } = split_lines(lines, minimal, oracle)?;

    let solution = if minimal {
        let shallow_fold = fold_cj_fj(&shallow, false, false)?;
        let u = Expr::or(m.clone(), shallow_fold);
        let cond1 = fold_fj_cj(&steep, &u, false, false, oracle)?;
        let cond2 = any_eqninf(&[&shallow, &steep, &flat]);
        let eqinf_cond = Expr::eqinf(fold_f_j(shallow.iter().chain(steep.iter()).chain(flat.iter()), false));
        let eqninf_m = Expr::eqninf(m);
        let cond4 = Expr::or(cond1, cond2);
        let exp1 = Expr::condeq(cond4, u, Expr::tt());
        let exp2 = Expr::condeq(eqninf_m, Expr::ff(), exp1);
        Expr::condeq(eqinf_cond, exp2, Expr::tt())
    } else {
        let shallow_fold = fold_cj_fj(&shallow, true, true)?;
        let u = Expr::and(m.clone(), shallow_fold);
        let cond1 = fold_fj_cj(&steep, &u, true, true, oracle)?;
        let eqinf_m = Expr::eqinf(m);
        let cond1_ = Expr::condsm(cond1, Expr::ff(), u);
        Expr::condeq(eqinf_m, cond1_, Expr::tt())
    };

    crate::rewrite::simplify::simplify(&solution, oracle)
}
