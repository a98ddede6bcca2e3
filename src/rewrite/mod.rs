/*!

Components B, C, and E: the three rewriting passes the solver drives an expression through before
it ever reaches the instantiator or a fixed-point solver. [`simplify::simplify`] folds constants and
drops units; [`enumerate::enumerate_quantifiers`] expands finite-domain quantifiers;
[`normal_form::normalize`] pushes an expression into conjunctive or disjunctive normal form modulo
the two conditionals.

*/

pub mod enumerate;
pub mod normal_form;
pub mod simplify;

pub use enumerate::enumerate_quantifiers;
pub use normal_form::normalize;
pub use simplify::simplify;
