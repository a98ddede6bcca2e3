/*!

The configuration surface of §6.1's `options` struct, modelled directly on the original
`pressolve_options` (`examples/original_source/.../pressolve_options.h`): which driver to run,
how the instantiator explores the reachable state space, and how precise a numerical answer must
be. §6.3 keeps CLI flag *parsing* external; this module only carries the shape those flags would
populate (`-a {g|n|m}`, `-p N`, `-u`) so a wrapper can build an `Options` directly without this
crate depending on an argument parser.

*/

use crate::abstractions::NaturalNumber;

/// Which driver `solve_pres` (§6.1) invokes.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Algorithm {
    /// Component G: exact, algebraic back-substitution (§4.F). Can fail with
    /// `ErrorKind::Undecidable` when a gradient comparison can't be decided.
    GaussElimination,
    /// Component H: nested Kleene iteration in `f64` (§4.G). Always produces an answer (up to the
    /// precision contract) but never a `Solution::Symbolic` one.
    Numerical,
    /// Gauss elimination, falling back to the numerical driver on `ErrorKind::Undecidable`. This
    /// fallback is an explicit, caller-visible option (§7: "this is caller-visible and must be
    /// explicit"), never automatic.
    NumericalDirected,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::GaussElimination
    }
}

/// The instantiator's todo-queue discipline (§4.C).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TodoStrategy {
    /// FIFO exploration; the default.
    BreadthFirst,
    /// LIFO exploration.
    DepthFirst,
    /// Bounded-memory reservoir sample of at most `N` pending instantiations. The resulting RES is
    /// a proper under-approximation: instantiations the sampler drops are never assigned an
    /// equation (§4.C, §9 "Highway strategy and determinism").
    Highway(usize),
}

impl Default for TodoStrategy {
    fn default() -> Self {
        TodoStrategy::BreadthFirst
    }
}

/// Mirrors `pressolve_options`: the full configuration surface of §6.1.
#[derive(Clone, Debug)]
pub struct Options {
    pub algorithm: Algorithm,
    /// Number of significant decimal digits the numerical driver's fixed point must be accurate
    /// to (§4.G's precision contract); ignored by pure Gauss elimination.
    pub precision: NaturalNumber,
    /// Mirrors the original's `replace_constants_by_variables`: an optimization hint for the data
    /// rewriter backend, opaque to the core itself (§3.1 treats the oracle as a black box).
    pub replace_constants_by_variables: bool,
    /// Mirrors the original's `remove_unused_rewrite_rules`: likewise an opaque rewriter-backend
    /// hint, carried only so `Options` round-trips the full original surface.
    pub remove_unused_rewrite_rules: bool,
    pub todo_strategy: TodoStrategy,
    /// Seed for the `TodoStrategy::Highway` reservoir sampler (§5, §9): reproducibility requires
    /// this to come from configuration, never from wall-clock entropy.
    pub random_seed: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            algorithm: Algorithm::default(),
            precision: 10,
            replace_constants_by_variables: false,
            remove_unused_rewrite_rules: true,
            todo_strategy: TodoStrategy::default(),
            random_seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_gauss_elimination_breadth_first() {
        let options = Options::default();
        assert_eq!(options.algorithm, Algorithm::GaussElimination);
        assert_eq!(options.todo_strategy, TodoStrategy::BreadthFirst);
    }
}
