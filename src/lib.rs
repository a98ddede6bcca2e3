/*!

A solver for Parameterised Real Equation Systems (PRES): systems of fixed-point equations over a
real-valued, extended-real (`±∞`) semantics. Given a PRES and the name of an initial variable,
[`api::solve_pres`] instantiates the system to a ground RES (`instantiate`), puts each equation's
right-hand side into simple normal form (`rewrite::normal_form`), and solves it by one of two
drivers: exact Gauss elimination (`solve::gauss`) or nested numerical Kleene iteration
(`solve::numerical`).

The data-term rewriter is treated throughout as an external black box behind the [`oracle`]
capability trait; `oracle::TreeWalkingOracle` is the reference, portable backend used by this
crate's own tests.

*/

pub mod abstractions;
pub mod api;
pub mod core;
pub mod error;
pub mod instantiate;
pub mod options;
pub mod oracle;
pub mod pretty;
pub mod rewrite;
pub mod solve;

pub use api::{solve_pres, Solution};
pub use core::{BxExpr, Expr, Pres, PresEquation, ResEquation, ResSystem, Sign};
pub use error::{CoreResult, ErrorKind};
pub use options::{Algorithm, Options, TodoStrategy};
pub use oracle::{RewriteOracle, Substitution, TreeWalkingOracle};
