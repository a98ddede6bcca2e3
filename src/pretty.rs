/*!

A compact debug printer for PRES expressions and RES systems (§6.2's pretty-printer collaborator).
This is not a source-language pretty-printer (out of scope, §1 Non-goals) -- it exists purely so
`Expr`'s `Display` impl, `log::debug!` call sites throughout the solver, and the `Solution::Symbolic`
diagnostic path can render a term without dumping its full `Debug` tree.

*/

use std::fmt::Write;

use crate::core::equation::ResSystem;
use crate::core::expression::Expr;

pub fn pretty_print(expr: &Expr) -> String {
    let mut buf = String::new();
    write_expr(&mut buf, expr);
    buf
}

/// Render every equation of a RES, one `sign var = rhs;` line at a time, with the initial variable
/// called out on its own trailing line. Diagnostic use only (§6.2's pretty-printer collaborator);
/// not consumed by any other component.
pub fn pretty_print_res(system: &ResSystem) -> String {
    let mut buf = String::new();
    for eq in &system.equations {
        let sign = if eq.sign.is_mu() { "mu" } else { "nu" };
        let _ = writeln!(buf, "{sign} {} = {};", eq.var, pretty_print(&eq.rhs));
    }
    let _ = write!(buf, "init {};", system.initial);
    buf
}

fn write_expr(buf: &mut String, expr: &Expr) {
    match expr {
        Expr::Data(d) => {
            let _ = write!(buf, "{d}");
        }
        Expr::Var(name, args) => {
            let _ = write!(buf, "{name}");
            if !args.is_empty() {
                let _ = write!(buf, "(");
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        let _ = write!(buf, ", ");
                    }
                    let _ = write!(buf, "{a}");
                }
                let _ = write!(buf, ")");
            }
        }
        Expr::Minus(e) => {
            let _ = write!(buf, "-");
            write_child(buf, e);
        }
        Expr::And(l, r) => write_infix(buf, l, "/\\", r),
        Expr::Or(l, r) => write_infix(buf, l, "\\/", r),
        Expr::Imp(l, r) => write_infix(buf, l, "=>", r),
        Expr::Plus(l, r) => write_infix(buf, l, "+", r),
        Expr::ConstMul(k, e) => {
            let _ = write!(buf, "{k}*");
            write_child(buf, e);
        }
        Expr::ConstMulAlt(e, k) => {
            write_child(buf, e);
            let _ = write!(buf, "*{k}");
        }
        Expr::Infimum(xs, body) => write_quantifier(buf, "inf", xs, body),
        Expr::Supremum(xs, body) => write_quantifier(buf, "sup", xs, body),
        Expr::Sum(xs, body) => write_quantifier(buf, "sum", xs, body),
        Expr::EqInf(e) => {
            let _ = write!(buf, "eqinf(");
            write_expr(buf, e);
            let _ = write!(buf, ")");
        }
        Expr::EqNInf(e) => {
            let _ = write!(buf, "eqninf(");
            write_expr(buf, e);
            let _ = write!(buf, ")");
        }
        Expr::CondSm(c, t, e) => write_cond(buf, "condsm", c, t, e),
        Expr::CondEq(c, t, e) => write_cond(buf, "condeq", c, t, e),
    }
}

fn write_child(buf: &mut String, e: &Expr) {
    let needs_parens = matches!(
        e,
        Expr::And(..) | Expr::Or(..) | Expr::Imp(..) | Expr::Plus(..) | Expr::CondSm(..) | Expr::CondEq(..)
    );
    if needs_parens {
        let _ = write!(buf, "(");
        write_expr(buf, e);
        let _ = write!(buf, ")");
    } else {
        write_expr(buf, e);
    }
}

fn write_infix(buf: &mut String, l: &Expr, op: &str, r: &Expr) {
    write_child(buf, l);
    let _ = write!(buf, " {op} ");
    write_child(buf, r);
}

fn write_quantifier(buf: &mut String, keyword: &str, xs: &[(crate::abstractions::IString, crate::core::sort::Sort)], body: &Expr) {
    let _ = write!(buf, "{keyword} ");
    for (i, (name, sort)) in xs.iter().enumerate() {
        if i > 0 {
            let _ = write!(buf, ", ");
        }
        let _ = write!(buf, "{name}: {sort}");
    }
    let _ = write!(buf, " . ");
    write_expr(buf, body);
}

fn write_cond(buf: &mut String, keyword: &str, c: &Expr, t: &Expr, e: &Expr) {
    let _ = write!(buf, "{keyword}(");
    write_expr(buf, c);
    let _ = write!(buf, ", ");
    write_expr(buf, t);
    let _ = write!(buf, ", ");
    write_expr(buf, e);
    let _ = write!(buf, ")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_term::{DataTerm, Rational};

    #[test]
    fn renders_boolean_connectives_infix() {
        let e = Expr::and(Expr::tt(), Expr::ff());
        assert_eq!(pretty_print(&e), "true /\\ false");
    }

    #[test]
    fn renders_var_with_arguments() {
        let args: crate::core::expression::VarArgs =
            smallvec::smallvec![DataTerm::Real(Rational::from_integer(3))];
        let e = Expr::var(crate::abstractions::IString::from("X"), args);
        assert_eq!(pretty_print(&e), "X(3)");
    }

    #[test]
    fn parenthesizes_conditionals_nested_under_plus() {
        let cond = Expr::condsm(Expr::zero(), Expr::tt(), Expr::ff());
        let e = Expr::plus(cond, Expr::zero());
        assert_eq!(pretty_print(&e), "(condsm(0, true, false)) + 0");
    }

    #[test]
    fn renders_a_res_system_one_equation_per_line() {
        use crate::abstractions::IString;
        use crate::core::equation::{ResEquation, ResSystem, Sign};
        use crate::core::expression::VarArgs;

        let x = IString::from("X");
        let y = IString::from("Y");
        let equations = vec![
            ResEquation::new(Sign::Mu, x, Expr::var(y, VarArgs::new())),
            ResEquation::new(Sign::Nu, y, Expr::tt()),
        ];
        let system = ResSystem::new(equations, x);
        assert_eq!(pretty_print_res(&system), "mu X = Y;\nnu Y = true;\ninit X;");
    }
}
