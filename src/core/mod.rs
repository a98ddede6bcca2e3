/*!

The term algebra: the in-memory representation of PRES expressions and their structural
invariants (§3.2), the sorts their data subterms range over (§3.1), and the equation/system types
that own them (§3.3, §3.4).

*/

pub mod data_term;
pub mod equation;
pub mod expression;
pub mod sort;

pub use data_term::{DataTerm, Rational};
pub use equation::{Pres, PresEquation, ResEquation, ResSystem, Sign};
pub use expression::{BxExpr, Expr, VarArgs};
pub use sort::Sort;
