/*!

Error kinds raised by the core, per §7 of the solver contract. The policy is surface-and-abort:
no component retries, and no component recovers an error produced by a component it calls into.
The Gauss driver may *offer* a fall back to the numerical driver on `Undecidable`, but that is
caller-visible (an explicit `Options` choice), never automatic.

*/

use std::fmt;

use simple_error::SimpleError;

use crate::abstractions::IString;

/// The sign of an operator appeared where the algorithm required it to have already been
/// eliminated -- e.g. a lingering `Infimum`/`Supremum`/`Sum` reaching the normal-form builder.
#[derive(Clone, Debug)]
pub enum ErrorKind {
    /// An operator appeared where eliminations were required (e.g. a surviving quantifier
    /// reaching the normal-form builder). Raised by the instantiator and the normal-form builder.
    Unsupported(String),

    /// The reachable instantiation set is infinite and no Highway cap was configured. Raised by
    /// the instantiator.
    Unbounded,

    /// An equation or the initial instantiation references an unknown propositional variable.
    /// Raised by the instantiator and the single-equation solver.
    InvalidReference(IString),

    /// A structural invariant of §3.2/§3.3 was violated (e.g. `ConstMul` with a non-positive
    /// constant reaching the rewriter).
    InvariantViolation(String),

    /// The rewrite oracle could not decide whether a line's gradient is less than one. Raised by
    /// the single-equation solver; the Gauss driver may fall back to the numerical driver here.
    Undecidable(String),

    /// The rewrite oracle returned an error for a well-formed query.
    OracleFailure(SimpleError),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Unsupported(what) => write!(f, "unsupported operator survived elimination: {what}"),
            ErrorKind::Unbounded => write!(f, "reachable instantiation set is unbounded"),
            ErrorKind::InvalidReference(name) => write!(f, "reference to undeclared variable `{name}`"),
            ErrorKind::InvariantViolation(what) => write!(f, "structural invariant violated: {what}"),
            ErrorKind::Undecidable(what) => write!(f, "gradient comparison undecidable: {what}"),
            ErrorKind::OracleFailure(e) => write!(f, "rewrite oracle failure: {e}"),
        }
    }
}

impl std::error::Error for ErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ErrorKind::OracleFailure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SimpleError> for ErrorKind {
    fn from(e: SimpleError) -> Self {
        ErrorKind::OracleFailure(e)
    }
}

pub type CoreResult<T> = Result<T, ErrorKind>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_invalid_reference_with_name() {
        let e = ErrorKind::InvalidReference(IString::from("X1"));
        assert_eq!(e.to_string(), "reference to undeclared variable `X1`");
    }

    #[test]
    fn oracle_failure_wraps_simple_error() {
        let e: ErrorKind = SimpleError::new("bad query").into();
        assert!(e.to_string().contains("bad query"));
    }
}
