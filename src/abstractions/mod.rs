#![allow(unused)]

// A fast hash set and hash map
pub use std::collections::{HashSet, HashMap};



use ustr::Ustr;
/// Interned strings. Create an interned string with `IString::from(..)`
pub type IString = Ustr;



// Numeric Types
/// Nonnegative Integers
pub type NaturalNumber = u64;
/// Signed Integers
pub type Integer       = i64;
/// Floating Point Numbers, the representation used by the numerical driver (§4.G).
pub type Float         = f64;
