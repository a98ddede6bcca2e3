/*!

PRES equations and systems (§3.3), and the ground RES they instantiate to. Block structure --
maximal contiguous runs of equations sharing a fixed-point sign -- is implicit in equation order,
never modeled as its own type; [`blocks`] and [`block_ranks`] recover it on demand for the Gauss
and numerical drivers.

*/

use std::ops::Range;

use crate::abstractions::IString;
use crate::core::data_term::DataTerm;
use crate::core::expression::{BxExpr, Binder};

/// The fixed-point sign of an equation. By convention (§3.3), the outermost block (rank 0) is a
/// `Mu` block; rank and sign alternate from there. This is a documentation convention for
/// numbering blocks, not a constraint the core enforces on arbitrary input -- an input PRES may
/// legally open on either sign.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Sign {
    Mu,
    Nu,
}

impl Sign {
    pub fn flip(self) -> Sign {
        match self {
            Sign::Mu => Sign::Nu,
            Sign::Nu => Sign::Mu,
        }
    }

    pub fn is_mu(self) -> bool {
        matches!(self, Sign::Mu)
    }
}

/// A single PRES equation `(sigma, p(x_bar), e)` (§3.3): fixed-point sign, the defined variable's
/// name and formal parameters, and a right-hand side whose free variables are contained in the
/// parameter list.
#[derive(Clone, Debug)]
pub struct PresEquation {
    pub sign: Sign,
    pub name: IString,
    pub params: Vec<Binder>,
    pub rhs: BxExpr,
}

impl PresEquation {
    pub fn new(sign: Sign, name: IString, params: Vec<Binder>, rhs: BxExpr) -> Self {
        Self { sign, name, params, rhs }
    }
}

/// An ordered sequence of PRES equations plus an initial instantiation `p0(v_bar_0)` (§3.3).
#[derive(Clone, Debug)]
pub struct Pres {
    pub equations: Vec<PresEquation>,
    pub initial_name: IString,
    pub initial_args: Vec<DataTerm>,
}

impl Pres {
    pub fn new(equations: Vec<PresEquation>, initial_name: IString, initial_args: Vec<DataTerm>) -> Self {
        Self { equations, initial_name, initial_args }
    }

    pub fn equation(&self, name: &IString) -> Option<&PresEquation> {
        self.equations.iter().find(|eq| &eq.name == name)
    }
}

/// A ground RES equation: the parameter list has been eliminated (§3.3 invariant), so `var` is a
/// plain, argument-free name and every `Var` occurrence in `rhs` likewise carries no arguments.
#[derive(Clone, Debug)]
pub struct ResEquation {
    pub sign: Sign,
    pub var: IString,
    pub rhs: BxExpr,
}

impl ResEquation {
    pub fn new(sign: Sign, var: IString, rhs: BxExpr) -> Self {
        Self { sign, var, rhs }
    }
}

/// A parameter-free equation system plus the name of the variable whose value is sought.
#[derive(Clone, Debug)]
pub struct ResSystem {
    pub equations: Vec<ResEquation>,
    pub initial: IString,
}

impl ResSystem {
    pub fn new(equations: Vec<ResEquation>, initial: IString) -> Self {
        Self { equations, initial }
    }

    pub fn index_of(&self, name: &IString) -> Option<usize> {
        self.equations.iter().position(|eq| &eq.var == name)
    }
}

/// The maximal contiguous index ranges over which a sign sequence is constant, in order. An empty
/// sequence has no blocks. Shared by [`blocks`]/[`block_ranks`] (RES) and [`pres_block_ranks`]
/// (PRES), since block structure depends only on the sign column, not on which equation type
/// carries it.
fn signs_blocks(signs: &[Sign]) -> Vec<Range<usize>> {
    let mut result = Vec::new();
    let mut start = 0;
    while start < signs.len() {
        let sign = signs[start];
        let mut end = start + 1;
        while end < signs.len() && signs[end] == sign {
            end += 1;
        }
        result.push(start..end);
        start = end;
    }
    result
}

fn signs_block_ranks(signs: &[Sign]) -> Vec<usize> {
    let mut ranks = vec![0usize; signs.len()];
    for (rank, range) in signs_blocks(signs).into_iter().enumerate() {
        for i in range {
            ranks[i] = rank;
        }
    }
    ranks
}

/// The maximal contiguous index ranges over which the equation sign is constant, in equation
/// order. An empty system has no blocks.
pub fn blocks(equations: &[ResEquation]) -> Vec<Range<usize>> {
    let signs: Vec<Sign> = equations.iter().map(|eq| eq.sign).collect();
    signs_blocks(&signs)
}

/// For each equation, the 0-based index (from the outermost, i.e. from equation 0) of the block it
/// belongs to.
pub fn block_ranks(equations: &[ResEquation]) -> Vec<usize> {
    let signs: Vec<Sign> = equations.iter().map(|eq| eq.sign).collect();
    signs_block_ranks(&signs)
}

/// The block rank of each PRES equation in declaration order (§3.3: "maximal contiguous runs of
/// equal sign form a block"). Used by the instantiator (§4.C) to re-sort emitted RES equations so
/// the ground system preserves the original block alternation structure.
pub fn pres_block_ranks(equations: &[PresEquation]) -> Vec<usize> {
    let signs: Vec<Sign> = equations.iter().map(|eq| eq.sign).collect();
    signs_block_ranks(&signs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expression::Expr;

    fn eq(sign: Sign, name: &str) -> ResEquation {
        ResEquation::new(sign, IString::from(name), Expr::tt())
    }

    #[test]
    fn blocks_groups_maximal_runs_of_equal_sign() {
        let equations = vec![
            eq(Sign::Mu, "a"),
            eq(Sign::Mu, "b"),
            eq(Sign::Nu, "c"),
            eq(Sign::Mu, "d"),
        ];
        let ranges = blocks(&equations);
        assert_eq!(ranges, vec![0..2, 2..3, 3..4]);
    }

    #[test]
    fn block_ranks_assigns_same_rank_within_a_block() {
        let equations = vec![eq(Sign::Mu, "a"), eq(Sign::Mu, "b"), eq(Sign::Nu, "c")];
        assert_eq!(block_ranks(&equations), vec![0, 0, 1]);
    }

    #[test]
    fn empty_system_has_no_blocks() {
        assert!(blocks(&[]).is_empty());
    }
}
